// The on-disk compstate: raw file records and the directory loader.
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::io;
use crate::schedule::period::{MatchKind, TeamSlot};
use crate::scoring::ScoreSheet;
use crate::standings::RankCriteria;
use crate::types::{ArenaId, MatchId, MatchNumber, TeamId};
use crate::winners::AwardKind;

// arenas.yaml
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ArenasFile {
    pub arenas: BTreeMap<ArenaId, ArenaRecord>,
    pub teams_per_arena: usize,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ArenaRecord {
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colour: Option<String>,
}

// teams.yaml
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct TeamsFile {
    pub teams: BTreeMap<TeamId, TeamRecord>,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct TeamRecord {
    pub name: String,
    #[serde(default)]
    pub rookie: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dropped_out_after: Option<MatchNumber>,
}

// league.yaml
#[derive(Debug, Clone, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct LeagueFile {
    pub matches: BTreeMap<MatchNumber, BTreeMap<ArenaId, Vec<TeamSlot>>>,
}

// schedule.yaml
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ScheduleFile {
    pub match_slot_length_seconds: i64,
    pub match_period_gap_seconds: i64,
    pub match_periods: Vec<PeriodRecord>,
    #[serde(default)]
    pub delays: Vec<DelayRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staging: Option<StagingOffsets>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knockout: Option<KnockoutConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub league_tie_break: Option<Vec<RankCriteria>>,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct PeriodRecord {
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
    // Defaults to end_time: a period with no slack must end on time.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub max_end_time: Option<OffsetDateTime>,
    #[serde(rename = "type")]
    pub kind: MatchKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
pub struct DelayRecord {
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    // Seconds.
    pub delay: i64,
}

// The staging block: all offsets are seconds before a match's start.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct StagingOffsets {
    pub opens: i64,
    pub closes: i64,
    pub duration: i64,
    #[serde(default)]
    pub signal_shepherds: BTreeMap<String, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_teams: Option<i64>,
}

// The optional knockout section: seeded from the league unless a static plan
// is supplied.
#[derive(Debug, Clone, Default, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct KnockoutConfig {
    #[serde(default)]
    pub mode: KnockoutMode,
    // Caps how many teams are seeded into the first round.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arity: Option<usize>,
    #[serde(default, rename = "static", skip_serializing_if = "Option::is_none")]
    pub static_plan: Option<StaticPlan>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnockoutMode {
    #[default]
    Seeded,
    Static,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct StaticPlan {
    // round -> position within round -> match description.
    pub matches: BTreeMap<u32, BTreeMap<u32, StaticMatchRecord>>,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct StaticMatchRecord {
    pub arena: ArenaId,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    // Each entry is a team id, "S<n>" for league seed n, a three-digit
    // round/match/position reference into earlier rounds, or null for a bye.
    pub teams: Vec<Option<String>>,
}

// awards.yaml: award kind to one team or several.
pub type AwardsFile = BTreeMap<AwardKind, OneOrManyTeams>;

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrManyTeams {
    One(TeamId),
    Many(Vec<TeamId>),
}

impl OneOrManyTeams {
    pub fn into_vec(self) -> Vec<TeamId> {
        match self {
            OneOrManyTeams::One(team) => vec![team],
            OneOrManyTeams::Many(teams) => teams,
        }
    }
}

// shepherding.yaml; the region structure is opaque to the core.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ShepherdingFile {
    pub regions: serde_yaml::Value,
}

// operations.yaml
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct OperationsFile {
    pub operations: OperationsRecord,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct OperationsRecord {
    // Seconds.
    pub release_threshold: i64,
    pub reset_duration: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub released_match: Option<ReleasedMatchRecord>,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ReleasedMatchRecord {
    pub number: MatchNumber,
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
}

// Everything read from one compstate directory, parsed but not yet evaluated.
#[derive(Debug, Clone)]
pub struct RawCompstate {
    pub arenas: ArenasFile,
    pub teams: TeamsFile,
    pub league: LeagueFile,
    pub schedule: ScheduleFile,
    pub awards: BTreeMap<AwardKind, Vec<TeamId>>,
    pub shepherding: Option<ShepherdingFile>,
    pub operations: Option<OperationsFile>,
    pub league_sheets: BTreeMap<MatchId, (PathBuf, ScoreSheet)>,
    pub knockout_sheets: BTreeMap<MatchId, (PathBuf, ScoreSheet)>,
    pub tiebreaker_sheets: BTreeMap<MatchId, (PathBuf, ScoreSheet)>,
}

impl RawCompstate {
    // Read a compstate directory. `deployments.yaml` and `external/` are
    // deliberately not consulted.
    pub fn load(root: &Path) -> Result<Self> {
        let arenas: ArenasFile = io::read_yaml(&root.join("arenas.yaml"))?;
        let teams: TeamsFile = io::read_yaml(&root.join("teams.yaml"))?;
        let league: LeagueFile = io::read_yaml(&root.join("league.yaml"))?;
        let schedule: ScheduleFile = io::read_yaml(&root.join("schedule.yaml"))?;

        let awards_path = root.join("awards.yaml");
        let awards: AwardsFile = io::read_yaml_if_exists(&awards_path)?.unwrap_or_default();
        let awards: BTreeMap<AwardKind, Vec<TeamId>> = awards
            .into_iter()
            .map(|(kind, teams)| (kind, teams.into_vec()))
            .collect();

        let shepherding = io::read_yaml_if_exists(&root.join("shepherding.yaml"))?;
        let operations = io::read_yaml_if_exists(&root.join("operations.yaml"))?;

        let state = Self {
            arenas,
            teams,
            league,
            schedule,
            awards,
            shepherding,
            operations,
            league_sheets: load_sheets(&root.join("league"))?,
            knockout_sheets: load_sheets(&root.join("knockout"))?,
            tiebreaker_sheets: load_sheets(&root.join("tiebreaker"))?,
        };

        state.validate(root)?;
        return Ok(state);
    }

    // Cross-file consistency checks that do not need the evaluated model.
    pub fn validate(&self, root: &Path) -> Result<()> {
        self.validate_league_plan(&root.join("league.yaml"))?;
        self.validate_awards(&root.join("awards.yaml"))?;

        for sheets in [
            &self.league_sheets,
            &self.knockout_sheets,
            &self.tiebreaker_sheets,
        ] {
            for (path, sheet) in sheets.values() {
                for team in sheet.participants() {
                    self.check_team(path, team)?;
                }
            }
        }

        return Ok(());
    }

    fn validate_league_plan(&self, path: &Path) -> Result<()> {
        for (index, (num, slot)) in self.league.matches.iter().enumerate() {
            if *num as usize != index {
                return Err(Error::Schema {
                    path: path.to_path_buf(),
                    message: format!(
                        "match numbers must be contiguous from 0; expected {index}, found {num}"
                    ),
                });
            }

            let mut seen: BTreeSet<&TeamId> = BTreeSet::new();
            for (arena, row) in slot {
                if !self.arenas.arenas.contains_key(arena) {
                    return Err(Error::Reference {
                        path: path.to_path_buf(),
                        kind: "arena",
                        name: arena.clone(),
                    });
                }

                if row.len() != self.arenas.teams_per_arena {
                    return Err(Error::Schema {
                        path: path.to_path_buf(),
                        message: format!(
                            "match {num} in arena {arena} has {} team slots, expected {}",
                            row.len(),
                            self.arenas.teams_per_arena,
                        ),
                    });
                }

                for entry in row {
                    if let Some(team) = entry.team() {
                        self.check_team(path, team)?;
                        if !seen.insert(team) {
                            return Err(Error::Schema {
                                path: path.to_path_buf(),
                                message: format!("team {team} appears twice in match {num}"),
                            });
                        }
                    }
                }
            }
        }

        return Ok(());
    }

    fn validate_awards(&self, path: &Path) -> Result<()> {
        for teams in self.awards.values() {
            for team in teams {
                self.check_team(path, team)?;
            }
        }
        return Ok(());
    }

    fn check_team(&self, path: &Path, team: &TeamId) -> Result<()> {
        if self.teams.teams.contains_key(team) {
            return Ok(());
        }
        Err(Error::Reference {
            path: path.to_path_buf(),
            kind: "team",
            name: team.clone(),
        })
    }
}

fn load_sheets(dir: &Path) -> Result<BTreeMap<MatchId, (PathBuf, ScoreSheet)>> {
    let mut sheets = BTreeMap::new();
    for (arena, num, path) in io::scoresheet_files(dir)? {
        let sheet: ScoreSheet = io::read_yaml(&path)?;
        sheets.insert((arena, num), (path, sheet));
    }
    return Ok(sheets);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_file_parses_the_documented_shape() {
        let schedule: ScheduleFile = serde_yaml::from_str(
            "
match_slot_length_seconds: 300
match_period_gap_seconds: 180
match_periods:
  - description: League, day one
    start_time: 2024-04-13T10:00:00+01:00
    end_time: 2024-04-13T11:00:00+01:00
    max_end_time: 2024-04-13T11:10:00+01:00
    type: league
  - description: Knockouts
    start_time: 2024-04-13T14:00:00+01:00
    end_time: 2024-04-13T16:00:00+01:00
    type: knockout
delays:
  - time: 2024-04-13T10:05:00+01:00
    delay: 120
staging:
  opens: 300
  closes: 120
  duration: 180
  signal_shepherds: {Blue: 241, Green: 181}
  signal_teams: 240
",
        )
        .unwrap();

        assert_eq!(300, schedule.match_slot_length_seconds);
        assert_eq!(2, schedule.match_periods.len());
        assert_eq!(MatchKind::League, schedule.match_periods[0].kind);
        assert_eq!(None, schedule.match_periods[1].max_end_time);
        assert_eq!(1, schedule.delays.len());
        assert_eq!(120, schedule.delays[0].delay);
        let staging = schedule.staging.unwrap();
        assert_eq!(Some(&241), staging.signal_shepherds.get("Blue"));
        assert_eq!(None, schedule.knockout);
    }

    #[test]
    fn schedule_file_round_trips_through_yaml() {
        let schedule: ScheduleFile = serde_yaml::from_str(
            "
match_slot_length_seconds: 300
match_period_gap_seconds: 180
match_periods:
  - description: League
    start_time: 2024-04-13T10:00:00+01:00
    end_time: 2024-04-13T11:00:00+01:00
    type: league
delays:
  - time: 2024-04-13T10:05:00+01:00
    delay: 120
",
        )
        .unwrap();

        let reserialised = serde_yaml::to_string(&schedule).unwrap();
        let reparsed: ScheduleFile = serde_yaml::from_str(&reserialised).unwrap();
        assert_eq!(schedule, reparsed);
    }

    #[test]
    fn knockout_config_defaults_to_seeded() {
        let config: KnockoutConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(KnockoutMode::Seeded, config.mode);

        let config: KnockoutConfig = serde_yaml::from_str(
            "
mode: static
static:
  matches:
    0:
      0:
        arena: A
        start_time: 2024-04-13T15:00:00+01:00
        teams: [S1, S4, S2, S3]
",
        )
        .unwrap();
        assert_eq!(KnockoutMode::Static, config.mode);
        let plan = config.static_plan.unwrap();
        assert_eq!(
            vec![
                Some("S1".to_string()),
                Some("S4".to_string()),
                Some("S2".to_string()),
                Some("S3".to_string()),
            ],
            plan.matches[&0][&0].teams,
        );
    }

    #[test]
    fn awards_accept_one_team_or_many() {
        let awards: AwardsFile = serde_yaml::from_str(
            "
winner: ABC
committee: [DEF, GHI]
best_paint_job: JKL
",
        )
        .unwrap();

        assert_eq!(
            Some(vec!["ABC".to_string()]),
            awards.get(&AwardKind::Winner).cloned().map(OneOrManyTeams::into_vec),
        );
        assert_eq!(
            Some(vec!["DEF".to_string(), "GHI".to_string()]),
            awards
                .get(&AwardKind::Committee)
                .cloned()
                .map(OneOrManyTeams::into_vec),
        );
        assert!(awards.contains_key(&AwardKind::Other("best_paint_job".to_string())));
    }

    fn minimal_state(league_yaml: &str) -> RawCompstate {
        RawCompstate {
            arenas: serde_yaml::from_str(
                "{arenas: {A: {display_name: Alpha}, B: {display_name: Beta}}, teams_per_arena: 4}",
            )
            .unwrap(),
            teams: serde_yaml::from_str(
                "{teams: {AAA: {name: As}, BBB: {name: Bs}, CCC: {name: Cs}, DDD: {name: Ds}}}",
            )
            .unwrap(),
            league: serde_yaml::from_str(league_yaml).unwrap(),
            schedule: serde_yaml::from_str(
                "
match_slot_length_seconds: 300
match_period_gap_seconds: 180
match_periods:
  - {description: League, start_time: 2024-04-13T10:00:00+00:00, end_time: 2024-04-13T11:00:00+00:00, type: league}
",
            )
            .unwrap(),
            awards: BTreeMap::new(),
            shepherding: None,
            operations: None,
            league_sheets: BTreeMap::new(),
            knockout_sheets: BTreeMap::new(),
            tiebreaker_sheets: BTreeMap::new(),
        }
    }

    #[test]
    fn plan_validation_accepts_a_clean_plan() {
        let state = minimal_state(
            "{matches: {0: {A: [AAA, BBB, CCC, DDD]}, 1: {A: [DDD, CCC, BBB, AAA]}}}",
        );
        assert!(state.validate(Path::new(".")).is_ok());
    }

    #[test]
    fn plan_validation_rejects_gaps_in_numbering() {
        let state = minimal_state("{matches: {0: {A: [AAA, BBB, CCC, DDD]}, 2: {A: [DDD, CCC, BBB, AAA]}}}");
        let err = state.validate(Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn plan_validation_rejects_wrong_capacity() {
        let state = minimal_state("{matches: {0: {A: [AAA, BBB]}}}");
        let err = state.validate(Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }

    #[test]
    fn plan_validation_rejects_unknown_references() {
        let state = minimal_state("{matches: {0: {A: [AAA, BBB, CCC, ZZZ]}}}");
        let err = state.validate(Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Reference { kind: "team", .. }));

        let state = minimal_state("{matches: {0: {C: [AAA, BBB, CCC, DDD]}}}");
        let err = state.validate(Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Reference { kind: "arena", .. }));
    }

    #[test]
    fn plan_validation_rejects_a_team_in_two_arenas_at_once() {
        let state = minimal_state(
            "{matches: {0: {A: [AAA, BBB, null, null], B: [CCC, AAA, null, null]}}}",
        );
        let err = state.validate(Path::new(".")).unwrap_err();
        assert!(matches!(err, Error::Schema { .. }));
    }
}
