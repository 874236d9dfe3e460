// Computational core for a robotics competition: evaluates a compstate
// directory into an immutable model answering schedule, standings, knockout
// and award queries.
pub mod comp;
pub mod compstate;
pub mod error;
pub mod io;
pub mod knockout;
pub mod operations;
pub mod schedule;
pub mod scoring;
pub mod standings;
pub mod team;
pub mod types;
pub mod winners;

pub use comp::{Arena, Competition, CompetitionState};
pub use error::{Error, Result};
pub use schedule::period::{Delay, Match, MatchKind, MatchPeriod, TeamSlot};
pub use scoring::{GameScorer, ScoreSheet, Scorer};
pub use standings::Standing;
pub use winners::AwardKind;
