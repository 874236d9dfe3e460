// Match periods and the records scheduled into them.
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::{Duration, OffsetDateTime};

use crate::types::{ArenaId, MatchNumber, TeamId};

// What part of the competition a match (or period) belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    League,
    Knockout,
    Tiebreaker,
}

// One space for a team in an arena.
// Empty is an intentional bye; Tbd is a knockout space whose occupant is not
// yet known because a prerequisite match has not resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamSlot {
    Team(TeamId),
    Empty,
    Tbd,
}

impl TeamSlot {
    pub fn team(&self) -> Option<&TeamId> {
        match self {
            TeamSlot::Team(id) => Some(id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TeamSlot::Empty
    }
}

impl fmt::Display for TeamSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TeamSlot::Team(id) => write!(f, "{id}"),
            TeamSlot::Empty => write!(f, "-"),
            TeamSlot::Tbd => write!(f, "???"),
        }
    }
}

impl Serialize for TeamSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            TeamSlot::Team(id) => serializer.serialize_some(id),
            TeamSlot::Empty => serializer.serialize_none(),
            TeamSlot::Tbd => serializer.serialize_some("???"),
        }
    }
}

impl<'de> Deserialize<'de> for TeamSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value: Option<String> = Option::deserialize(deserializer)?;
        Ok(match value.as_deref() {
            None => TeamSlot::Empty,
            Some("???") => TeamSlot::Tbd,
            Some(id) => TeamSlot::Team(id.to_string()),
        })
    }
}

// One game in one arena, stamped with its wall-clock window.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize)]
pub struct Match {
    pub num: MatchNumber,
    pub display_name: String,
    pub arena: ArenaId,
    pub teams: Vec<TeamSlot>,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    pub kind: MatchKind,
    // Whether in-match ties must be broken (via league positions, or failing
    // that a tiebreaker match) before teams progress from this match.
    pub use_resolved_ranking: bool,
}

impl Match {
    pub fn id(&self) -> (ArenaId, MatchNumber) {
        (self.arena.clone(), self.num)
    }

    // The teams actually taking part, in zone order.
    pub fn participants(&self) -> impl Iterator<Item = &TeamId> {
        self.teams.iter().filter_map(TeamSlot::team)
    }

    pub fn involves(&self, team: &str) -> bool {
        self.participants().any(|id| id == team)
    }
}

// All arena appearances of one match number. Every member shares the number
// and the start time.
pub type MatchSlot = BTreeMap<ArenaId, Match>;

// A planned contiguous window during which matches of one kind may run.
// Delays may push matches up to max_end_time, never beyond.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize)]
pub struct MatchPeriod {
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub max_end_time: OffsetDateTime,
    pub description: String,
    pub kind: MatchKind,
    pub matches: Vec<MatchSlot>,
}

impl fmt::Display for MatchPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}:{:02}\u{2013}{}:{:02})",
            self.description,
            self.start_time.hour(),
            self.start_time.minute(),
            self.end_time.hour(),
            self.end_time.minute(),
        )
    }
}

// A shift applied to every not-yet-emitted slot from `time` onwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize)]
pub struct Delay {
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    #[serde(serialize_with = "serialize_seconds")]
    pub duration: Duration,
}

fn serialize_seconds<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.whole_seconds())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_slot_from_yaml() {
        let slots: Vec<TeamSlot> = serde_yaml::from_str("[ABC, null, '???']").unwrap();
        assert_eq!(
            vec![
                TeamSlot::Team("ABC".to_string()),
                TeamSlot::Empty,
                TeamSlot::Tbd,
            ],
            slots,
        );
    }

    #[test]
    fn team_slot_display() {
        assert_eq!("ABC", TeamSlot::Team("ABC".to_string()).to_string());
        assert_eq!("-", TeamSlot::Empty.to_string());
        assert_eq!("???", TeamSlot::Tbd.to_string());
    }

    #[test]
    fn match_kind_from_yaml() {
        let kind: MatchKind = serde_yaml::from_str("league").unwrap();
        assert_eq!(MatchKind::League, kind);
        let kind: MatchKind = serde_yaml::from_str("knockout").unwrap();
        assert_eq!(MatchKind::Knockout, kind);
    }
}
