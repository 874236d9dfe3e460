// Score books for the league, the knockouts and any tiebreakers.
use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::scoring::ranker;
use crate::scoring::ScoredSheet;
use crate::types::{GamePoints, LeaguePoints, MatchId, MatchNumber, Position, TeamId};

// Everything derived from one match's scoresheet.
#[derive(Debug, Clone, PartialEq)]
#[derive(Serialize)]
pub struct GameScore {
    pub match_id: MatchId,
    pub game_points: BTreeMap<TeamId, GamePoints>,
    // Disqualified or absent teams.
    pub excluded: BTreeSet<TeamId>,
    pub positions: BTreeMap<Position, Vec<TeamId>>,
    pub league_points: BTreeMap<TeamId, LeaguePoints>,
}

impl GameScore {
    pub fn build(match_id: MatchId, scored: ScoredSheet) -> Self {
        let positions = ranker::game_positions(&scored.game_points, &scored.excluded);
        let league_points = ranker::ranked_points(&positions, &scored.excluded);

        Self {
            match_id,
            game_points: scored.game_points,
            excluded: scored.excluded,
            positions,
            league_points,
        }
    }

    // The bottom position group, if being in it means anything: a match where
    // every team shares one group has no meaningful last place unless teams
    // were disqualified or absent.
    fn last_place_group(&self) -> Option<&Vec<TeamId>> {
        if self.positions.len() > 1 || !self.excluded.is_empty() {
            self.positions.last_key_value().map(|(_, group)| group)
        } else {
            None
        }
    }
}

// A ranking as best-to-worst groups; a group of more than one team is a tie
// that the available information could not split.
#[derive(Debug, Clone, PartialEq, Eq)]
#[derive(Serialize)]
pub struct Ranking {
    pub groups: Vec<Vec<TeamId>>,
}

// The outcome of asking a ranking for its top `n`: either a strictly
// determined list, or the tie group straddling the boundary. Ties are data
// for the knockout scheduler to act on, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advancing {
    Determined(Vec<TeamId>),
    NeedsTiebreaker(Vec<TeamId>),
}

impl Ranking {
    pub fn is_strict(&self) -> bool {
        self.groups.iter().all(|group| group.len() == 1)
    }

    // Best-to-worst order; within a surviving tie the order is canonical but
    // not meaningful.
    pub fn order(&self) -> impl Iterator<Item = &TeamId> {
        self.groups.iter().flatten()
    }

    pub fn winners(&self) -> Option<&[TeamId]> {
        self.groups.first().map(Vec::as_slice)
    }

    // The top `n` teams in rank order, if the cut falls between groups.
    pub fn advancing(&self, n: usize) -> Advancing {
        let mut taken = Vec::new();
        for group in &self.groups {
            if taken.len() == n {
                break;
            }
            if taken.len() + group.len() > n {
                return Advancing::NeedsTiebreaker(group.clone());
            }
            taken.extend(group.iter().cloned());
        }

        return Advancing::Determined(taken);
    }
}

// Accumulated league record for one team, across completed league matches.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[derive(Serialize)]
pub struct TeamLeagueRecord {
    pub league_points: LeaguePoints,
    pub game_points: GamePoints,
    pub outright_wins: u32,
    pub last_places: u32,
    pub matches_played: u32,
}

// Scores for all completed league matches plus the per-team accumulation.
#[derive(Debug, Clone, Default)]
pub struct LeagueScores {
    pub games: BTreeMap<MatchId, GameScore>,
    pub teams: BTreeMap<TeamId, TeamLeagueRecord>,
}

impl LeagueScores {
    pub fn build<'a>(
        team_ids: impl IntoIterator<Item = &'a TeamId>,
        games: BTreeMap<MatchId, GameScore>,
    ) -> Self {
        let mut teams: BTreeMap<TeamId, TeamLeagueRecord> = team_ids
            .into_iter()
            .map(|id| (id.clone(), TeamLeagueRecord::default()))
            .collect();

        for game in games.values() {
            let last_place_group = game.last_place_group().cloned().unwrap_or_default();

            for (team, game_points) in &game.game_points {
                let record = teams.entry(team.clone()).or_default();
                record.matches_played += 1;
                record.game_points += *game_points;
                record.league_points += game.league_points.get(team).copied().unwrap_or(0.0);

                if last_place_group.contains(team) {
                    record.last_places += 1;
                }
            }

            // An outright win is a strictly highest score by a competing team.
            if let Some((_, winners)) = game.positions.first_key_value() {
                if let [winner] = winners.as_slice() {
                    if !game.excluded.contains(winner) {
                        if let Some(record) = teams.get_mut(winner) {
                            record.outright_wins += 1;
                        }
                    }
                }
            }
        }

        Self { games, teams }
    }

    pub fn last_scored_match(&self) -> Option<MatchNumber> {
        self.games.keys().map(|(_, num)| *num).max()
    }

    pub fn is_scored(&self, match_id: &MatchId) -> bool {
        self.games.contains_key(match_id)
    }
}

// Scores for knockout matches. In-match ties are broken by league position
// where the match allows resolution; whatever still ties is reported as a
// shared group for the scheduler to deal with.
#[derive(Debug, Clone, Default)]
pub struct KnockoutScores {
    pub games: BTreeMap<MatchId, GameScore>,
    league_positions: BTreeMap<TeamId, Position>,
}

impl KnockoutScores {
    pub fn build(
        games: BTreeMap<MatchId, GameScore>,
        league_positions: BTreeMap<TeamId, Position>,
    ) -> Self {
        Self {
            games,
            league_positions,
        }
    }

    pub fn last_scored_match(&self) -> Option<MatchNumber> {
        self.games.keys().map(|(_, num)| *num).max()
    }

    // The match's ranking for progression purposes. With `use_resolved` the
    // game-score tie groups are split by league position; the final must win
    // on game score alone, so it never resolves.
    pub fn ranking(&self, match_id: &MatchId, use_resolved: bool) -> Option<Ranking> {
        let game = self.games.get(match_id)?;
        Some(ranking_of(game, use_resolved, &self.league_positions))
    }
}

// Scores for tiebreaker matches. A tiebreaker must produce a strict order by
// itself, so no external resolution is ever applied.
#[derive(Debug, Clone, Default)]
pub struct TiebreakerScores {
    pub games: BTreeMap<MatchId, GameScore>,
}

impl TiebreakerScores {
    pub fn build(games: BTreeMap<MatchId, GameScore>) -> Self {
        Self { games }
    }

    pub fn last_scored_match(&self) -> Option<MatchNumber> {
        self.games.keys().map(|(_, num)| *num).max()
    }

    pub fn ranking(&self, match_id: &MatchId) -> Option<Ranking> {
        let game = self.games.get(match_id)?;
        Some(ranking_of(game, false, &BTreeMap::new()))
    }
}

// Build the progression ranking for one scored match; see KnockoutScores.
pub fn ranking_of(
    game: &GameScore,
    use_resolved: bool,
    league_positions: &BTreeMap<TeamId, Position>,
) -> Ranking {
    let mut groups = Vec::new();

    for group in game.positions.values() {
        if !use_resolved || group.len() == 1 {
            groups.push(group.clone());
            continue;
        }

        // Break the tie by league position: a better league finish ranks
        // first. Teams sharing a league position stay tied.
        let mut members: Vec<(&TeamId, Position)> = group
            .iter()
            .map(|team| (team, league_positions.get(team).copied().unwrap_or(Position::MAX)))
            .collect();
        members.sort_by_key(|(_, position)| *position);

        let mut current: Vec<TeamId> = Vec::new();
        let mut current_position = None;
        for (team, position) in members {
            if current_position != Some(position) && !current.is_empty() {
                groups.push(std::mem::take(&mut current));
            }
            current_position = Some(position);
            current.push(team.clone());
        }
        if !current.is_empty() {
            groups.push(current);
        }
    }

    return Ranking { groups };
}

// All three books together.
#[derive(Debug, Clone, Default)]
pub struct Scores {
    pub league: LeagueScores,
    pub knockout: KnockoutScores,
    pub tiebreaker: TiebreakerScores,
}

impl Scores {
    // The most recently scored match. A tiebreaker postdates the knockouts,
    // which postdate the league, so the books are consulted in that order.
    pub fn last_scored_match(&self) -> Option<MatchNumber> {
        self.tiebreaker
            .last_scored_match()
            .or_else(|| self.knockout.last_scored_match())
            .or_else(|| self.league.last_scored_match())
    }

    pub fn is_scored(&self, match_id: &MatchId) -> bool {
        self.league.games.contains_key(match_id)
            || self.knockout.games.contains_key(match_id)
            || self.tiebreaker.games.contains_key(match_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scored(pairs: &[(&str, GamePoints)], excluded: &[&str]) -> ScoredSheet {
        ScoredSheet {
            game_points: pairs.iter().map(|(t, p)| (t.to_string(), *p)).collect(),
            excluded: excluded.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn id(arena: &str, num: MatchNumber) -> MatchId {
        (arena.to_string(), num)
    }

    fn names(teams: &[&str]) -> Vec<TeamId> {
        teams.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn league_accumulation() {
        let m0 = GameScore::build(
            id("A", 0),
            scored(&[("JMS", 4), ("PAS", 0), ("RUN", 8), ("ICE", 2)], &["JMS", "PAS"]),
        );
        let m1 = GameScore::build(
            id("B", 1),
            scored(&[("JMS", 3), ("PAS", 3), ("RUN", 1), ("ICE", 9)], &[]),
        );

        let ids = names(&["ICE", "JMS", "PAS", "RUN"]);
        let games: BTreeMap<MatchId, GameScore> =
            [(m0.match_id.clone(), m0), (m1.match_id.clone(), m1)]
                .into_iter()
                .collect();
        let league = LeagueScores::build(ids.iter(), games);

        // Match 0: RUN first (4), ICE second (3), JMS/PAS excluded (0).
        // Match 1: ICE first (4), JMS/PAS tied second (2.5 each), RUN last (1).
        let run = league.teams.get("RUN").unwrap();
        assert_eq!(5.0, run.league_points);
        assert_eq!(9, run.game_points);
        assert_eq!(1, run.outright_wins);
        assert_eq!(1, run.last_places);

        let ice = league.teams.get("ICE").unwrap();
        assert_eq!(7.0, ice.league_points);
        assert_eq!(1, ice.outright_wins);
        assert_eq!(0, ice.last_places);

        let jms = league.teams.get("JMS").unwrap();
        assert_eq!(2.5, jms.league_points);
        assert_eq!(1, jms.last_places);

        assert_eq!(Some(1), league.last_scored_match());
    }

    #[test]
    fn teams_without_scores_get_empty_records() {
        let league = LeagueScores::build(names(&["ABC"]).iter(), BTreeMap::new());
        assert_eq!(
            Some(&TeamLeagueRecord::default()),
            league.teams.get("ABC"),
        );
        assert_eq!(None, league.last_scored_match());
    }

    fn league_positions(pairs: &[(&str, Position)]) -> BTreeMap<TeamId, Position> {
        pairs.iter().map(|(t, p)| (t.to_string(), *p)).collect()
    }

    #[test]
    fn knockout_tie_broken_by_league_position() {
        let game = GameScore::build(
            id("A", 3),
            scored(&[("JMS", 7), ("PAS", 7), ("RUN", 7), ("ICE", 7)], &[]),
        );
        let games = [(game.match_id.clone(), game)].into_iter().collect();
        let positions =
            league_positions(&[("RUN", 1), ("JMS", 2), ("ICE", 3), ("PAS", 4)]);
        let knockout = KnockoutScores::build(games, positions);

        let ranking = knockout.ranking(&id("A", 3), true).unwrap();
        assert!(ranking.is_strict());
        assert_eq!(
            names(&["RUN", "JMS", "ICE", "PAS"]),
            ranking.order().cloned().collect::<Vec<_>>(),
        );
        assert_eq!(
            Advancing::Determined(names(&["RUN", "JMS"])),
            ranking.advancing(2),
        );
    }

    #[test]
    fn the_final_does_not_resolve_ties() {
        let game = GameScore::build(
            id("A", 3),
            scored(&[("JMS", 7), ("PAS", 5), ("RUN", 7), ("ICE", 5)], &[]),
        );
        let games = [(game.match_id.clone(), game)].into_iter().collect();
        let positions =
            league_positions(&[("RUN", 1), ("JMS", 2), ("ICE", 3), ("PAS", 4)]);
        let knockout = KnockoutScores::build(games, positions);

        let ranking = knockout.ranking(&id("A", 3), false).unwrap();
        assert_eq!(
            vec![names(&["JMS", "RUN"]), names(&["ICE", "PAS"])],
            ranking.groups,
        );
        assert_eq!(
            Advancing::NeedsTiebreaker(names(&["JMS", "RUN"])),
            ranking.advancing(1),
        );
    }

    #[test]
    fn a_tie_below_the_boundary_is_not_an_obstacle() {
        let game = GameScore::build(
            id("A", 3),
            scored(&[("JMS", 7), ("PAS", 5), ("RUN", 9), ("ICE", 5)], &[]),
        );
        let games = [(game.match_id.clone(), game)].into_iter().collect();
        let knockout = KnockoutScores::build(games, BTreeMap::new());

        // 3rd/4th are tied but the top two are clear.
        let ranking = knockout.ranking(&id("A", 3), false).unwrap();
        assert_eq!(
            Advancing::Determined(names(&["RUN", "JMS"])),
            ranking.advancing(2),
        );
    }

    #[test]
    fn shared_league_positions_leave_a_residual_tie() {
        let game = GameScore::build(
            id("A", 4),
            scored(&[("JMS", 7), ("PAS", 7), ("RUN", 2), ("ICE", 1)], &[]),
        );
        let games = [(game.match_id.clone(), game)].into_iter().collect();
        let positions =
            league_positions(&[("JMS", 1), ("PAS", 1), ("RUN", 3), ("ICE", 4)]);
        let knockout = KnockoutScores::build(games, positions);

        let ranking = knockout.ranking(&id("A", 4), true).unwrap();
        assert_eq!(
            Advancing::NeedsTiebreaker(names(&["JMS", "PAS"])),
            ranking.advancing(1),
        );
        // Both progress together though: the pair boundary is fine.
        assert_eq!(
            Advancing::Determined(names(&["JMS", "PAS"])),
            ranking.advancing(2),
        );
    }

    #[test]
    fn last_scored_match_prefers_the_latest_book() {
        let league_game = GameScore::build(id("A", 5), scored(&[("JMS", 1)], &[]));
        let knockout_game = GameScore::build(id("A", 9), scored(&[("JMS", 1)], &[]));

        let scores = Scores {
            league: LeagueScores::build(
                names(&["JMS"]).iter(),
                [(league_game.match_id.clone(), league_game)].into_iter().collect(),
            ),
            knockout: KnockoutScores::build(
                [(knockout_game.match_id.clone(), knockout_game)].into_iter().collect(),
                BTreeMap::new(),
            ),
            tiebreaker: TiebreakerScores::default(),
        };

        assert_eq!(Some(9), scores.last_scored_match());
    }
}
