// Functions and types for ranking teams within the league.
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use ordinal::Ordinal;
use serde::{Deserialize, Serialize};

use crate::scoring::scores::TeamLeagueRecord;
use crate::types::{LeaguePoints, Position, TeamId};

// What ranking criteria the league standings use, in precedence order.
#[derive(Debug, Clone, Copy)]
#[derive(Eq, Hash, PartialEq)]
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankCriteria {
    LeaguePoints,
    FewestLastPlaces,
    OutrightWins,
    GamePoints,
}

// The chain applied when a competition does not configure its own.
pub const DEFAULT_RANK_CRITERIA: [RankCriteria; 4] = [
    RankCriteria::LeaguePoints,
    RankCriteria::FewestLastPlaces,
    RankCriteria::OutrightWins,
    RankCriteria::GamePoints,
];

type CmpFunc = fn(&TeamLeagueRecord, &TeamLeagueRecord) -> Ordering;

// Compare functions here. Better comes first.

fn compare_league_points(a: &TeamLeagueRecord, b: &TeamLeagueRecord) -> Ordering {
    b.league_points.total_cmp(&a.league_points)
}

fn compare_fewest_last_places(a: &TeamLeagueRecord, b: &TeamLeagueRecord) -> Ordering {
    a.last_places.cmp(&b.last_places)
}

fn compare_outright_wins(a: &TeamLeagueRecord, b: &TeamLeagueRecord) -> Ordering {
    b.outright_wins.cmp(&a.outright_wins)
}

fn compare_game_points(a: &TeamLeagueRecord, b: &TeamLeagueRecord) -> Ordering {
    b.game_points.cmp(&a.game_points)
}

// Get the available sort functions.
pub fn get_sort_functions() -> HashMap<RankCriteria, CmpFunc> {
    let mut functions: HashMap<RankCriteria, CmpFunc> = HashMap::new();
    functions.insert(RankCriteria::LeaguePoints, compare_league_points);
    functions.insert(RankCriteria::FewestLastPlaces, compare_fewest_last_places);
    functions.insert(RankCriteria::OutrightWins, compare_outright_wins);
    functions.insert(RankCriteria::GamePoints, compare_game_points);
    return functions;
}

fn compare_by_chain(
    chain: &[RankCriteria],
    functions: &HashMap<RankCriteria, CmpFunc>,
    a: &TeamLeagueRecord,
    b: &TeamLeagueRecord,
) -> Ordering {
    for criteria in chain {
        let ordering = functions[criteria](a, b);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    return Ordering::Equal;
}

// One rung of the league table. Tied teams share a position; the group after
// a tie skips by the width of the tie ("1, 2, 2, 4").
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize)]
pub struct Standing {
    pub position: Position,
    pub teams: Vec<TeamId>,
    pub points: LeaguePoints,
}

// The cumulative league table.
#[derive(Debug, Clone, Default)]
pub struct LeagueStandings {
    standings: Vec<Standing>,
    positions: BTreeMap<TeamId, Position>,
}

impl LeagueStandings {
    // Rank the accumulated records. Teams equal under the whole chain share a
    // position; alphabetical order within a group is presentation only and
    // carries no sporting meaning.
    pub fn build(
        records: &BTreeMap<TeamId, TeamLeagueRecord>,
        chain: &[RankCriteria],
    ) -> Self {
        let functions = get_sort_functions();

        // The map iterates alphabetically and the sort is stable, so the
        // fallback ordering is the canonical one.
        let mut ranked: Vec<(&TeamId, &TeamLeagueRecord)> = records.iter().collect();
        ranked.sort_by(|a, b| compare_by_chain(chain, &functions, a.1, b.1));

        let mut standings: Vec<Standing> = Vec::new();
        let mut positions = BTreeMap::new();

        for (index, &(team, record)) in ranked.iter().enumerate() {
            let tied_with_previous = index > 0
                && compare_by_chain(chain, &functions, ranked[index - 1].1, record)
                    == Ordering::Equal;

            if !tied_with_previous {
                standings.push(Standing {
                    position: (index + 1) as Position,
                    teams: Vec::new(),
                    points: record.league_points,
                });
            }

            let group = standings.last_mut().expect("group exists after push");
            group.teams.push(team.clone());
            positions.insert(team.clone(), group.position);
        }

        Self {
            standings,
            positions,
        }
    }

    pub fn standings(&self) -> &[Standing] {
        &self.standings
    }

    pub fn position_of(&self, team: &str) -> Option<Position> {
        self.positions.get(team).copied()
    }

    pub fn positions(&self) -> &BTreeMap<TeamId, Position> {
        &self.positions
    }

    // Teams best first; tied teams adjacent in canonical order.
    pub fn order(&self) -> impl Iterator<Item = &TeamId> {
        self.standings.iter().flat_map(|standing| &standing.teams)
    }

    // Whether the top of the table is a single team.
    pub fn unique_leader(&self) -> Option<&TeamId> {
        match self.standings.first() {
            Some(standing) => match standing.teams.as_slice() {
                [leader] => Some(leader),
                _ => None,
            },
            None => None,
        }
    }

    // The standings as a printable table.
    pub fn display(&self) -> String {
        let mut out = String::new();
        for standing in &self.standings {
            for team in &standing.teams {
                if !out.is_empty() {
                    out.push('\n');
                }
                let _ = write!(
                    out,
                    "{}\t{}\t{}",
                    Ordinal(standing.position),
                    team,
                    standing.points,
                );
            }
        }
        return out;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(
        league_points: LeaguePoints,
        game_points: i64,
        outright_wins: u32,
        last_places: u32,
    ) -> TeamLeagueRecord {
        TeamLeagueRecord {
            league_points,
            game_points,
            outright_wins,
            last_places,
            matches_played: 1,
        }
    }

    fn build(records: Vec<(&str, TeamLeagueRecord)>) -> LeagueStandings {
        let map: BTreeMap<TeamId, TeamLeagueRecord> = records
            .into_iter()
            .map(|(team, record)| (team.to_string(), record))
            .collect();
        LeagueStandings::build(&map, &DEFAULT_RANK_CRITERIA)
    }

    #[test]
    fn more_points_means_a_better_position() {
        let standings = build(vec![
            ("ABC", record(0.0, 0, 0, 0)),
            ("DEF", record(4.0, 5, 1, 0)),
        ]);

        assert_eq!(Some(1), standings.position_of("DEF"));
        assert_eq!(Some(2), standings.position_of("ABC"));
        assert_eq!(
            vec!["DEF", "ABC"],
            standings.order().cloned().collect::<Vec<_>>(),
        );
    }

    #[test]
    fn league_point_ties_fall_through_the_chain() {
        // Equal points; DEF has fewer last places.
        let standings = build(vec![
            ("ABC", record(4.0, 9, 1, 2)),
            ("DEF", record(4.0, 5, 1, 1)),
        ]);
        assert_eq!(Some(1), standings.position_of("DEF"));

        // Equal points and last places; GHI has more outright wins.
        let standings = build(vec![
            ("GHI", record(4.0, 5, 2, 1)),
            ("JKL", record(4.0, 9, 1, 1)),
        ]);
        assert_eq!(Some(1), standings.position_of("GHI"));

        // Only game points differ.
        let standings = build(vec![
            ("MNO", record(4.0, 5, 1, 1)),
            ("PQR", record(4.0, 9, 1, 1)),
        ]);
        assert_eq!(Some(1), standings.position_of("PQR"));
    }

    #[test]
    fn full_ties_share_a_position_and_the_next_group_skips() {
        let standings = build(vec![
            ("ABC", record(4.0, 5, 1, 0)),
            ("DEF", record(4.0, 5, 1, 0)),
            ("GHI", record(0.0, 0, 0, 1)),
        ]);

        assert_eq!(Some(1), standings.position_of("ABC"));
        assert_eq!(Some(1), standings.position_of("DEF"));
        assert_eq!(Some(3), standings.position_of("GHI"));

        let table = standings.standings();
        assert_eq!(2, table.len());
        assert_eq!(vec!["ABC".to_string(), "DEF".to_string()], table[0].teams);
        assert_eq!(4.0, table[0].points);
    }

    #[test]
    fn unique_leader_requires_an_unshared_top_spot() {
        let tied = build(vec![
            ("ABC", record(4.0, 5, 1, 0)),
            ("DEF", record(4.0, 5, 1, 0)),
        ]);
        assert_eq!(None, tied.unique_leader());

        let clear = build(vec![
            ("ABC", record(4.0, 5, 1, 0)),
            ("DEF", record(2.0, 5, 1, 0)),
        ]);
        assert_eq!(Some(&"ABC".to_string()), clear.unique_leader());
    }

    #[test]
    fn display_uses_ordinals() {
        let standings = build(vec![
            ("ABC", record(4.0, 5, 1, 0)),
            ("DEF", record(2.0, 3, 0, 1)),
        ]);
        assert_eq!("1st\tABC\t4\n2nd\tDEF\t2", standings.display());
    }
}
