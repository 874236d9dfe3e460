// Error types surfaced by the evaluation core.
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ArenaId, MatchNumber};

#[derive(Error, Debug)]
pub enum Error {
    #[error("malformed compstate file {}: {message}", .path.display())]
    Schema { path: PathBuf, message: String },

    #[error("{}: reference to unknown {kind} {name:?}", .path.display())]
    Reference {
        path: PathBuf,
        kind: &'static str,
        name: String,
    },

    #[error(
        "league plan has {planned} matches but only {available} slots fit the league periods"
    )]
    PlanExceedsPeriods { planned: usize, available: usize },

    #[error("match {num} in arena {arena} finished without a scoresheet")]
    MissingScore { arena: ArenaId, num: MatchNumber },

    #[error("out of time in period {period:?}: no slot fits before its latest end")]
    OutOfTime { period: String },

    #[error("scorer returned invalid data for {}: {message}", .path.display())]
    Scorer { path: PathBuf, message: String },

    #[error("scoresheet {} does not match the scheduled match: {message}", .path.display())]
    ScoresheetMismatch { path: PathBuf, message: String },
}

impl Error {
    // Map onto the process exit codes reserved by the wrapping CLI. Code 5
    // (internal inconsistency) stays reserved: an unresolved tie is not an
    // error here, the knockout scheduler answers it with a tiebreaker match.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Schema { .. } => 2,
            Error::Reference { .. } => 2,
            Error::PlanExceedsPeriods { .. } => 3,
            Error::OutOfTime { .. } => 3,
            Error::MissingScore { .. } => 4,
            Error::Scorer { .. } => 4,
            Error::ScoresheetMismatch { .. } => 4,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
