// Award resolution: the league and knockout champions plus configured awards.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::scoring::scores::{Ranking, Scores};
use crate::standings::LeagueStandings;
use crate::types::{MatchId, TeamId};

// The kinds of award a competition can hand out. The computed kinds are
// listed explicitly; anything else in awards.yaml passes through untouched.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardKind {
    LeagueWinner,
    Winner,
    Second,
    Third,
    Rookie,
    Committee,
    Image,
    #[serde(untagged)]
    Other(String),
}

// The final's ranking with any tiebreaker outcomes folded in: each tiebreaker
// replaces the tie group it was played for with its own (stricter) ordering.
pub fn resolve_final_ranking(
    scores: &Scores,
    final_id: &MatchId,
    final_tiebreakers: &[MatchId],
) -> Option<Ranking> {
    let mut ranking = scores.knockout.ranking(final_id, false)?;

    for tiebreaker_id in final_tiebreakers {
        let resolution = match scores.tiebreaker.ranking(tiebreaker_id) {
            Some(resolution) => resolution,
            None => break,
        };

        let mut played_for: Vec<&TeamId> = resolution.order().collect();
        played_for.sort();

        let position = ranking.groups.iter().position(|group| {
            let mut members: Vec<&TeamId> = group.iter().collect();
            members.sort();
            members == played_for
        });

        if let Some(index) = position {
            let mut rebuilt = Vec::with_capacity(ranking.groups.len() + resolution.groups.len());
            rebuilt.extend(ranking.groups[..index].iter().cloned());
            rebuilt.extend(resolution.groups.iter().cloned());
            rebuilt.extend(ranking.groups[index + 1..].iter().cloned());
            ranking.groups = rebuilt;
        }
    }

    return Some(ranking);
}

// The knockout champion, once the bracket (and any tiebreakers) resolve to a
// single team at the top.
pub fn knockout_winner(
    scores: &Scores,
    final_id: &MatchId,
    final_tiebreakers: &[MatchId],
) -> Option<TeamId> {
    let ranking = resolve_final_ranking(scores, final_id, final_tiebreakers)?;
    match ranking.winners() {
        Some([winner]) => Some(winner.clone()),
        _ => None,
    }
}

// Work out who gets what.
//
// The podium comes from the final's resolved ranking: a team is Second only
// if it holds position 2 outright (a shared first place leaves Second empty
// until a tiebreaker settles it). The league winner needs the league to have
// finished and the top of the table to be unshared. Entries from awards.yaml
// override anything computed here and contribute every other kind.
pub fn compute_awards(
    standings: &LeagueStandings,
    scores: &Scores,
    league_complete: bool,
    final_id: Option<&MatchId>,
    final_tiebreakers: &[MatchId],
    configured: &BTreeMap<AwardKind, Vec<TeamId>>,
) -> BTreeMap<AwardKind, Vec<TeamId>> {
    let mut awards = BTreeMap::new();

    if league_complete {
        if let Some(leader) = standings.unique_leader() {
            awards.insert(AwardKind::LeagueWinner, vec![leader.clone()]);
        }
    }

    if let Some(final_id) = final_id {
        if let Some(ranking) = resolve_final_ranking(scores, final_id, final_tiebreakers) {
            let mut position = 1usize;
            for group in &ranking.groups {
                let kind = match position {
                    1 => Some(AwardKind::Winner),
                    2 => Some(AwardKind::Second),
                    3 => Some(AwardKind::Third),
                    _ => None,
                };
                // A shared place occupies the positions it spans, so a wide
                // group can leave later podium spots unawarded.
                if let Some(kind) = kind {
                    awards.insert(kind, group.clone());
                }
                position += group.len();
            }
        }
    }

    for (kind, teams) in configured {
        awards.insert(kind.clone(), teams.clone());
    }

    return awards;
}
