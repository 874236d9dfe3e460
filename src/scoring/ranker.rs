// Normalising raw game scores into per-match positions and league points.
use std::collections::{BTreeMap, BTreeSet};

use crate::types::{GamePoints, LeaguePoints, Position, TeamId};

// Rank a match's teams by raw game points, highest first. Disqualified and
// absent teams are excluded from the scoring order and share a single group
// below everyone who scored. Tied teams share a position and the next group
// skips by the width of the tie.
pub fn game_positions(
    game_points: &BTreeMap<TeamId, GamePoints>,
    excluded: &BTreeSet<TeamId>,
) -> BTreeMap<Position, Vec<TeamId>> {
    let mut scoring: Vec<(&TeamId, GamePoints)> = game_points
        .iter()
        .filter(|(team, _)| !excluded.contains(*team))
        .map(|(team, points)| (team, *points))
        .collect();

    // BTreeMap iteration already gives alphabetical order within a group.
    scoring.sort_by(|a, b| b.1.cmp(&a.1));

    let mut positions: BTreeMap<Position, Vec<TeamId>> = BTreeMap::new();
    let mut group_position: Position = 1;
    let mut group_points: Option<GamePoints> = None;

    for (index, (team, points)) in scoring.iter().enumerate() {
        if group_points != Some(*points) {
            group_position = (index + 1) as Position;
            group_points = Some(*points);
        }
        positions
            .entry(group_position)
            .or_default()
            .push((*team).clone());
    }

    let bottom: Vec<TeamId> = game_points
        .keys()
        .filter(|team| excluded.contains(*team))
        .cloned()
        .collect();
    if !bottom.is_empty() {
        positions.insert((scoring.len() + 1) as Position, bottom);
    }

    return positions;
}

// Award league points for one match from a fixed schedule keyed by the number
// of participants: n points for first down to 1 for last. A tie group shares
// the average of the schedule entries it spans. Disqualified and absent teams
// always receive zero; the schedule entries they occupy are withheld.
pub fn ranked_points(
    positions: &BTreeMap<Position, Vec<TeamId>>,
    excluded: &BTreeSet<TeamId>,
) -> BTreeMap<TeamId, LeaguePoints> {
    let num_participants: usize = positions.values().map(Vec::len).sum();
    let mut awarded = BTreeMap::new();

    for (position, group) in positions {
        // The schedule entry for rank r (1-based) is n - r + 1; a group at
        // position p spanning w entries averages the first and last of them.
        let first = schedule_entry(num_participants, *position);
        let last = schedule_entry(num_participants, *position + group.len() as Position - 1);
        let share = (first + last) / 2.0;

        for team in group {
            let points = if excluded.contains(team) { 0.0 } else { share };
            awarded.insert(team.clone(), points);
        }
    }

    return awarded;
}

fn schedule_entry(num_participants: usize, rank: Position) -> LeaguePoints {
    num_participants as LeaguePoints - f64::from(rank) + 1.0
}
