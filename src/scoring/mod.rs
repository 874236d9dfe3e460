// Scoring: the scoresheet record, the pluggable scorer seam and validation.
pub mod ranker;
pub mod scores;

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schedule::period::TeamSlot;
use crate::types::{GamePoints, TeamId};

// The raw per-match scoresheet as stored in the compstate.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct ScoreSheet {
    // Recorded timings; opaque to the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<serde_yaml::Value>,
    pub teams: Vec<TeamSlot>,
    pub scores: SheetScores,
}

#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize, Deserialize)]
pub struct SheetScores {
    pub game: BTreeMap<TeamId, GamePoints>,
    #[serde(default)]
    pub disqualified: Vec<TeamId>,
    // Teams which turned up. Absent when every listed team was present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub present: Option<Vec<TeamId>>,
}

impl ScoreSheet {
    // The teams the sheet says took part, in zone order.
    pub fn participants(&self) -> impl Iterator<Item = &TeamId> {
        self.teams.iter().filter_map(TeamSlot::team)
    }

    // Teams which count as not having competed: disqualified or absent.
    // Both rank below every scoring team and receive no league points, unlike
    // a bye, which is simply an unoccupied slot.
    pub fn non_competing(&self) -> BTreeSet<TeamId> {
        let mut out: BTreeSet<TeamId> = self.scores.disqualified.iter().cloned().collect();

        if let Some(present) = &self.scores.present {
            let present: BTreeSet<&TeamId> = present.iter().collect();
            for team in self.participants() {
                if !present.contains(team) {
                    out.insert(team.clone());
                }
            }
        }

        return out;
    }
}

// Whether a sheet describes the same game as a scheduled match: the same
// number of zones, occupied by the same teams. Zone allocation itself does
// not affect scoring.
pub fn sheet_covers(sheet_teams: &[TeamSlot], scheduled_teams: &[TeamSlot]) -> bool {
    if sheet_teams.len() != scheduled_teams.len() {
        return false;
    }

    let mut on_sheet: Vec<&TeamId> = sheet_teams.iter().filter_map(TeamSlot::team).collect();
    let mut scheduled: Vec<&TeamId> = scheduled_teams.iter().filter_map(TeamSlot::team).collect();
    on_sheet.sort();
    scheduled.sort();

    // A schedule slot still waiting on a prerequisite has no occupant, so a
    // sheet can never cover it.
    let tbd = scheduled_teams.iter().any(|slot| *slot == TeamSlot::Tbd)
        || sheet_teams.iter().any(|slot| *slot == TeamSlot::Tbd);

    return !tbd && on_sheet == scheduled;
}

// The per-game scoring module, supplied by the compstate. The core only ever
// sees this seam: hosts may wrap the compstate's own scoring script, or
// register a native implementation.
pub trait Scorer {
    // Raw game points per participating team.
    fn calculate_scores(&self, sheet: &ScoreSheet) -> Result<BTreeMap<TeamId, GamePoints>>;

    // Teams disqualified by game rules.
    fn teams_disqualified(&self, sheet: &ScoreSheet) -> Result<Vec<TeamId>>;
}

// The built-in scorer: trusts the sheet's own `scores` block.
#[derive(Debug, Clone, Copy, Default)]
pub struct GameScorer;

impl Scorer for GameScorer {
    fn calculate_scores(&self, sheet: &ScoreSheet) -> Result<BTreeMap<TeamId, GamePoints>> {
        Ok(sheet.scores.game.clone())
    }

    fn teams_disqualified(&self, sheet: &ScoreSheet) -> Result<Vec<TeamId>> {
        Ok(sheet.scores.disqualified.clone())
    }
}

// A scorer's output for one sheet, checked against the sheet itself.
#[derive(Debug)]
pub struct ScoredSheet {
    pub game_points: BTreeMap<TeamId, GamePoints>,
    pub excluded: BTreeSet<TeamId>,
}

// Run the scorer over a sheet and validate its output: every participant is
// scored exactly once, and nothing else is.
pub fn score_sheet(scorer: &dyn Scorer, path: &Path, sheet: &ScoreSheet) -> Result<ScoredSheet> {
    let game_points = scorer.calculate_scores(sheet)?;
    let disqualified = scorer.teams_disqualified(sheet)?;

    let participants: BTreeSet<&TeamId> = sheet.participants().collect();

    for team in game_points.keys() {
        if !participants.contains(team) {
            return Err(scorer_error(path, format!("scored unknown team {team:?}")));
        }
    }
    for team in &participants {
        if !game_points.contains_key(*team) {
            return Err(scorer_error(path, format!("no score for team {team:?}")));
        }
    }

    let mut seen = BTreeSet::new();
    for team in &disqualified {
        if !participants.contains(team) {
            return Err(scorer_error(
                path,
                format!("disqualified unknown team {team:?}"),
            ));
        }
        if !seen.insert(team.clone()) {
            return Err(scorer_error(
                path,
                format!("disqualified team {team:?} twice"),
            ));
        }
    }

    let mut excluded = sheet.non_competing();
    excluded.extend(seen);

    Ok(ScoredSheet {
        game_points,
        excluded,
    })
}

fn scorer_error(path: &Path, message: String) -> Error {
    Error::Scorer {
        path: path.to_path_buf(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn sheet(yaml: &str) -> ScoreSheet {
        serde_yaml::from_str(yaml).unwrap()
    }

    const BASIC: &str = "
times: {}
teams: [ABC, DEF, null, GHI]
scores:
  game: {ABC: 4, DEF: 0, GHI: 8}
  disqualified: [DEF]
  present: [ABC, DEF]
";

    #[test]
    fn sheet_round_trips_the_compstate_shape() {
        let sheet = sheet(BASIC);
        assert_eq!(
            vec!["ABC", "DEF", "GHI"],
            sheet.participants().collect::<Vec<_>>(),
        );
        assert_eq!(Some(&4), sheet.scores.game.get("ABC"));
    }

    #[test]
    fn non_competing_merges_disqualified_and_absent() {
        let sheet = sheet(BASIC);
        // DEF is disqualified, GHI is not listed as present.
        let expected: BTreeSet<TeamId> =
            ["DEF".to_string(), "GHI".to_string()].into_iter().collect();
        assert_eq!(expected, sheet.non_competing());
    }

    #[test]
    fn missing_present_list_means_everyone_was_there() {
        let sheet = sheet(
            "
teams: [ABC, DEF]
scores:
  game: {ABC: 1, DEF: 2}
",
        );
        assert!(sheet.non_competing().is_empty());
    }

    #[test]
    fn game_scorer_reads_the_sheet() {
        let sheet = sheet(BASIC);
        let scored = score_sheet(&GameScorer, &PathBuf::from("league/A/0.yaml"), &sheet).unwrap();

        assert_eq!(Some(&8), scored.game_points.get("GHI"));
        assert!(scored.excluded.contains("DEF"));
        assert!(scored.excluded.contains("GHI"));
        assert!(!scored.excluded.contains("ABC"));
    }

    #[test]
    fn a_scorer_must_score_every_participant() {
        struct ForgetfulScorer;
        impl Scorer for ForgetfulScorer {
            fn calculate_scores(&self, _: &ScoreSheet) -> Result<BTreeMap<TeamId, GamePoints>> {
                Ok([("ABC".to_string(), 1)].into_iter().collect())
            }
            fn teams_disqualified(&self, _: &ScoreSheet) -> Result<Vec<TeamId>> {
                Ok(Vec::new())
            }
        }

        let sheet = sheet(BASIC);
        let err = score_sheet(&ForgetfulScorer, &PathBuf::from("league/A/0.yaml"), &sheet)
            .unwrap_err();
        assert!(matches!(err, Error::Scorer { .. }));
    }

    #[test]
    fn a_scorer_may_not_invent_teams() {
        struct InventiveScorer;
        impl Scorer for InventiveScorer {
            fn calculate_scores(&self, sheet: &ScoreSheet) -> Result<BTreeMap<TeamId, GamePoints>> {
                let mut scores = sheet.scores.game.clone();
                scores.insert("ZZZ".to_string(), 3);
                Ok(scores)
            }
            fn teams_disqualified(&self, _: &ScoreSheet) -> Result<Vec<TeamId>> {
                Ok(Vec::new())
            }
        }

        let sheet = sheet(BASIC);
        let err = score_sheet(&InventiveScorer, &PathBuf::from("league/A/0.yaml"), &sheet)
            .unwrap_err();
        assert!(matches!(err, Error::Scorer { .. }));
    }
}
