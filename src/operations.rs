// Match operations: release state, reset windows and staging queries.
use std::path::PathBuf;

use serde::Serialize;
use time::{Duration, OffsetDateTime};

use crate::compstate::OperationsFile;
use crate::error::{Error, Result};
use crate::schedule::period::Match;
use crate::schedule::MatchSchedule;
use crate::types::MatchNumber;

// The state of a match from the operations point of view.
//
// Matches start FUTURE. Once the organisers release a match it is RELEASED;
// a match past its release threshold but not yet released is HELD.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchState {
    Future,
    Held,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArenaTimes {
    pub release_threshold: OffsetDateTime,
    pub start: OffsetDateTime,
    pub end: OffsetDateTime,
}

// Matches with a useful relation to one instant.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentMatches {
    pub time: OffsetDateTime,
    pub matches: Vec<Match>,
    pub staging_matches: Vec<Match>,
    pub shepherding_matches: Vec<Match>,
}

#[derive(Debug, Clone)]
pub struct MatchOperations {
    release_threshold: Duration,
    reset_duration: Duration,
    released_match: Option<(MatchNumber, OffsetDateTime)>,
}

impl MatchOperations {
    // Build from the optional operations file. Without one, everything is
    // considered released: queries still work, nothing is ever held.
    pub fn build(config: Option<&OperationsFile>, schedule: &MatchSchedule) -> Result<Self> {
        let record = match config {
            Some(file) => &file.operations,
            None => {
                let released = schedule
                    .matches
                    .last()
                    .and_then(|slot| slot.values().next())
                    .map(|last| (last.num, last.start_time));
                return Ok(Self {
                    release_threshold: Duration::ZERO,
                    reset_duration: Duration::ZERO,
                    released_match: released,
                });
            }
        };

        let release_threshold = Duration::seconds(record.release_threshold);
        let reset_duration = Duration::seconds(record.reset_duration);

        // A reset shorter than the threshold would release matches faster
        // than arenas can be turned around.
        if reset_duration < release_threshold {
            return Err(Error::Schema {
                path: PathBuf::from("operations.yaml"),
                message: format!(
                    "reset duration ({reset_duration}) must be at least the release threshold \
                     ({release_threshold})"
                ),
            });
        }

        let released_match = match &record.released_match {
            Some(released) => {
                if released.number as usize >= schedule.n_matches() {
                    return Err(Error::Schema {
                        path: PathBuf::from("operations.yaml"),
                        message: format!(
                            "released match {} is out of range 0-{}",
                            released.number,
                            schedule.n_matches().saturating_sub(1),
                        ),
                    });
                }
                Some((released.number, released.time))
            }
            None => None,
        };

        Ok(Self {
            release_threshold,
            reset_duration,
            released_match,
        })
    }

    pub fn reset_duration(&self) -> Duration {
        self.reset_duration
    }

    pub fn arena_times(&self, scheduled: &Match) -> ArenaTimes {
        ArenaTimes {
            release_threshold: scheduled.start_time - self.release_threshold,
            start: scheduled.start_time,
            end: scheduled.end_time,
        }
    }

    pub fn match_state(&self, scheduled: &Match, now: OffsetDateTime) -> MatchState {
        if let Some((released_num, _)) = self.released_match {
            if scheduled.num <= released_num {
                return MatchState::Released;
            }
        }

        if self.arena_times(scheduled).release_threshold <= now {
            return MatchState::Held;
        }

        return MatchState::Future;
    }

    // All the matches with a useful relation to the given time. The time
    // should normally be "now"; passing one timestamp into several queries
    // keeps a set of views of the compstate consistent with each other.
    pub fn current_matches(
        &self,
        schedule: &MatchSchedule,
        when: OffsetDateTime,
    ) -> CurrentMatches {
        let mut matches = Vec::new();
        let mut staging_matches = Vec::new();
        let mut shepherding_matches = Vec::new();

        for scheduled in schedule.all_matches() {
            if scheduled.start_time <= when && when < scheduled.end_time {
                matches.push(scheduled.clone());
            }

            let staging = match schedule.staging_times(scheduled) {
                Some(staging) => staging,
                None => continue,
            };

            if when > staging.closes {
                // Already done staging.
                continue;
            }

            if staging.opens <= when {
                staging_matches.push(scheduled.clone());
            }

            if let Some(first_signal) = staging.signal_shepherds.values().min() {
                if *first_signal <= when {
                    shepherding_matches.push(scheduled.clone());
                }
            }
        }

        CurrentMatches {
            time: when,
            matches,
            staging_matches,
            shepherding_matches,
        }
    }
}
