// The seeded knockout scheduler: bracket built from league standings.
use std::collections::BTreeSet;

use crate::error::Result;
use crate::knockout::{seeding, KnockoutContext, KnockoutOutcome, SchedulerCore, TieOutcome};
use crate::schedule::period::TeamSlot;
use crate::schedule::MatchSchedule;
use crate::scoring::scores::Advancing;
use crate::types::{MatchId, MatchNumber, TeamId};

// Build the whole seeded bracket and fill it in as far as the scores allow.
//
// Every knockout match takes its own slot from the knockout periods, cycling
// through the arenas in order. Team slots whose occupants depend on unplayed
// matches stay Tbd; tiebreakers are inserted the moment a progression step
// becomes under-determined, ahead of the round they feed.
pub fn add_knockouts(
    ctx: &KnockoutContext<'_>,
    schedule: &mut MatchSchedule,
    arity: Option<usize>,
) -> Result<KnockoutOutcome> {
    let mut core = SchedulerCore::build(ctx, schedule);

    let first_knockout_num = core.schedule.n_league_matches as MatchNumber;
    let participants = core.schedule.league_participants();
    let eligible = ctx
        .registry
        .knockout_eligible(first_knockout_num, &participants);

    let num_seeds = match arity {
        Some(cap) => eligible.len().min(cap),
        None => eligible.len(),
    };
    if num_seeds == 0 {
        return core.finish(Vec::new());
    }

    let layout = seeding::first_round_matches(num_seeds, ctx.capacity);
    let seeds = compute_seeds(&mut core, &eligible, num_seeds)?;

    let mut rounds: Vec<Vec<MatchId>> = Vec::new();

    // First round, straight from the seeding fold.
    let mut rounds_remaining = log2(layout.len());
    let mut round_ids = Vec::new();
    for (index, seed_indexes) in layout.iter().enumerate() {
        let teams: Vec<TeamSlot> = seed_indexes
            .iter()
            .map(|seed| match &seeds {
                Some(seeds) => TeamSlot::Team(seeds[*seed].clone()),
                None => TeamSlot::Tbd,
            })
            .collect();
        round_ids.push(core.add_knockout_match(teams, rounds_remaining, index)?);
    }
    rounds.push(round_ids);

    // Later rounds: the top two of each adjacent pair of matches meet.
    while rounds.last().map(Vec::len).unwrap_or(0) > 1 {
        let prev = rounds.last().cloned().unwrap_or_default();
        rounds_remaining -= 1;

        // Work out who advances before placing the round, so that any
        // tiebreakers play ahead of the matches waiting on them.
        let mut teams_per_match: Vec<Vec<TeamSlot>> = Vec::new();
        for pair in prev.chunks(2) {
            let mut teams = Vec::new();
            for predecessor in pair {
                teams.extend(advancing_from(&mut core, predecessor)?);
            }
            teams_per_match.push(teams);
        }

        let mut ids = Vec::new();
        for (index, teams) in teams_per_match.into_iter().enumerate() {
            ids.push(core.add_knockout_match(teams, rounds_remaining, index)?);
        }
        rounds.push(ids);
    }

    if let Some(final_id) = rounds.last().and_then(|round| round.last()).cloned() {
        core.settle_final(&final_id)?;
    }

    return core.finish(rounds);
}

// The seed list, best first, once the league is in a state to provide one.
// A standings tie group straddling the last seat goes to a tiebreaker; ties
// wholly inside or outside the cut need no settling and keep their canonical
// order.
fn compute_seeds(
    core: &mut SchedulerCore<'_, '_>,
    eligible: &[TeamId],
    num_seeds: usize,
) -> Result<Option<Vec<TeamId>>> {
    if !core.ctx.league_complete {
        return Ok(None);
    }

    let eligible_set: BTreeSet<&TeamId> = eligible.iter().collect();
    let mut seeds: Vec<TeamId> = Vec::new();

    for standing in core.ctx.standings.standings() {
        if seeds.len() >= num_seeds {
            break;
        }

        let members: Vec<TeamId> = standing
            .teams
            .iter()
            .filter(|team| eligible_set.contains(team))
            .cloned()
            .collect();
        if members.is_empty() {
            continue;
        }

        if seeds.len() + members.len() <= num_seeds {
            seeds.extend(members);
            continue;
        }

        let seats = num_seeds - seeds.len();
        match core.break_tie(&members, seats, false)? {
            TieOutcome::Resolved(winners) => {
                seeds.extend(winners);
            }
            TieOutcome::Pending => return Ok(None),
        }
        break;
    }

    return Ok(Some(seeds));
}

// The two slots a predecessor sends up, best first. Unscored predecessors
// send Tbd; a tie across the advancing boundary goes to a tiebreaker.
fn advancing_from(
    core: &mut SchedulerCore<'_, '_>,
    predecessor: &MatchId,
) -> Result<Vec<TeamSlot>> {
    let ranking = match core.ranking_for(predecessor) {
        Some(ranking) => ranking,
        None => return Ok(vec![TeamSlot::Tbd, TeamSlot::Tbd]),
    };

    let total: usize = ranking.groups.iter().map(Vec::len).sum();
    let want = total.min(2);

    let tied = match ranking.advancing(want) {
        Advancing::Determined(teams) => {
            return Ok(teams.into_iter().map(TeamSlot::Team).collect());
        }
        Advancing::NeedsTiebreaker(tied) => tied,
    };

    // Whoever ranks strictly ahead of the tied group still advances; the
    // group itself fights for the remaining seats.
    let mut advancing: Vec<TeamSlot> = Vec::new();
    for tier in &ranking.groups {
        if *tier == tied {
            break;
        }
        advancing.extend(tier.iter().cloned().map(TeamSlot::Team));
    }

    let seats = want - advancing.len();
    match core.break_tie(&tied, seats, false)? {
        TieOutcome::Resolved(winners) => {
            advancing.extend(winners.into_iter().map(TeamSlot::Team));
        }
        TieOutcome::Pending => {
            while advancing.len() < want {
                advancing.push(TeamSlot::Tbd);
            }
        }
    }

    return Ok(advancing);
}

fn log2(n: usize) -> u32 {
    n.trailing_zeros()
}
