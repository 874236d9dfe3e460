// The static knockout scheduler: an explicit bracket from the compstate.
use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::compstate::StaticPlan;
use crate::error::{Error, Result};
use crate::knockout::{KnockoutContext, KnockoutOutcome, SchedulerCore, TieOutcome};
use crate::schedule::period::TeamSlot;
use crate::schedule::MatchSchedule;
use crate::types::{MatchId, MatchNumber, TeamId};

// How a static plan names the occupant of a team slot.
#[derive(Debug, Clone, PartialEq, Eq)]
enum TeamRef {
    Team(TeamId),
    // 1-based league seed.
    Seed(usize),
    // Position within an earlier planned match: round, match, position, all
    // 0-based, written as three digits ("012" = round 0, match 1, runner-up).
    Outcome {
        round: u32,
        match_index: usize,
        position: usize,
    },
    Bye,
}

fn parse_team_ref(raw: Option<&str>) -> TeamRef {
    let raw = match raw {
        Some(raw) => raw,
        None => return TeamRef::Bye,
    };

    if let Some(seed) = raw.strip_prefix('S') {
        if let Ok(seed) = seed.parse::<usize>() {
            return TeamRef::Seed(seed);
        }
    }

    if raw.len() == 3 && raw.chars().all(|c| c.is_ascii_digit()) {
        let digits: Vec<u32> = raw.chars().filter_map(|c| c.to_digit(10)).collect();
        return TeamRef::Outcome {
            round: digits[0],
            match_index: digits[1] as usize,
            position: digits[2] as usize,
        };
    }

    return TeamRef::Team(raw.to_string());
}

// Build the bracket exactly as planned, resolving seed and outcome
// references as far as the scores allow.
pub fn add_knockouts(
    ctx: &KnockoutContext<'_>,
    schedule: &mut MatchSchedule,
    plan: &StaticPlan,
) -> Result<KnockoutOutcome> {
    let mut core = SchedulerCore::build(ctx, schedule);

    // Any tiebreaker this bracket needs plays after the whole planned
    // schedule, in the nearest slot that clears it.
    let last_planned = plan
        .matches
        .values()
        .flat_map(|round| round.values())
        .map(|record| record.start_time)
        .max();
    if let Some(last) = last_planned {
        core.slots.skip_until_after(last)?;
    }

    let first_knockout_num = core.schedule.n_league_matches as MatchNumber;
    let participants = core.schedule.league_participants();
    let eligible = ctx
        .registry
        .knockout_eligible(first_knockout_num, &participants);
    let seeds = seeds_in_order(&core, &eligible);

    let total_rounds = plan.matches.len() as u32;
    let mut rounds: Vec<Vec<MatchId>> = Vec::new();

    for (round, planned) in &plan.matches {
        let rounds_remaining = total_rounds - 1 - round;
        let mut ids = Vec::new();

        for (index, record) in planned {
            if record.teams.len() != ctx.capacity {
                return Err(Error::Schema {
                    path: PathBuf::from("schedule.yaml"),
                    message: format!(
                        "static knockout match {round}.{index} names {} teams, expected {}",
                        record.teams.len(),
                        ctx.capacity,
                    ),
                });
            }
            if !ctx.arenas.contains(&record.arena) {
                return Err(Error::Reference {
                    path: PathBuf::from("schedule.yaml"),
                    kind: "arena",
                    name: record.arena.clone(),
                });
            }

            let mut teams = Vec::new();
            for raw in &record.teams {
                teams.push(resolve_ref(
                    &mut core,
                    &rounds,
                    *round,
                    parse_team_ref(raw.as_deref()),
                    &seeds,
                    eligible.len(),
                )?);
            }

            let id = core.add_planned_match(record, teams, rounds_remaining, *index as usize)?;
            ids.push(id);
        }

        rounds.push(ids);
    }

    if let Some(final_id) = rounds.last().and_then(|round| round.last()).cloned() {
        core.settle_final(&final_id)?;
    }

    return core.finish(rounds);
}

// Seeds for S<n> references: final standings order, eligible teams only.
// A plan curated by the organisers resolves inner standings ties canonically.
fn seeds_in_order(core: &SchedulerCore<'_, '_>, eligible: &[TeamId]) -> Option<Vec<TeamId>> {
    if !core.ctx.league_complete {
        return None;
    }

    let eligible_set: BTreeSet<&TeamId> = eligible.iter().collect();
    Some(
        core.ctx
            .standings
            .order()
            .filter(|team| eligible_set.contains(team))
            .cloned()
            .collect(),
    )
}

fn resolve_ref(
    core: &mut SchedulerCore<'_, '_>,
    rounds: &[Vec<MatchId>],
    current_round: u32,
    team_ref: TeamRef,
    seeds: &Option<Vec<TeamId>>,
    num_eligible: usize,
) -> Result<TeamSlot> {
    match team_ref {
        TeamRef::Bye => Ok(TeamSlot::Empty),

        TeamRef::Team(team) => {
            if !core.ctx.registry.contains(&team) {
                return Err(Error::Reference {
                    path: PathBuf::from("schedule.yaml"),
                    kind: "team",
                    name: team,
                });
            }
            Ok(TeamSlot::Team(team))
        }

        TeamRef::Seed(seed) => {
            // The seed must exist regardless of whether the league has
            // finished yet.
            if seed == 0 || seed > num_eligible {
                return Err(Error::Reference {
                    path: PathBuf::from("schedule.yaml"),
                    kind: "seed",
                    name: format!("S{seed}"),
                });
            }
            match seeds {
                Some(seeds) => Ok(TeamSlot::Team(seeds[seed - 1].clone())),
                None => Ok(TeamSlot::Tbd),
            }
        }

        TeamRef::Outcome {
            round,
            match_index,
            position,
        } => {
            if round >= current_round {
                return Err(Error::Reference {
                    path: PathBuf::from("schedule.yaml"),
                    kind: "match",
                    name: format!("{round}{match_index}{position}"),
                });
            }

            let target = rounds
                .get(round as usize)
                .and_then(|r| r.get(match_index))
                .cloned()
                .ok_or_else(|| Error::Reference {
                    path: PathBuf::from("schedule.yaml"),
                    kind: "match",
                    name: format!("{round}{match_index}{position}"),
                })?;

            let ranking = match core.ranking_for(&target) {
                Some(ranking) => ranking,
                None => return Ok(TeamSlot::Tbd),
            };

            let total: usize = ranking.groups.iter().map(Vec::len).sum();
            if position >= total {
                return Err(Error::Reference {
                    path: PathBuf::from("schedule.yaml"),
                    kind: "position",
                    name: format!("{round}{match_index}{position}"),
                });
            }

            // Find the group holding the wanted position; a tie across it
            // needs a tiebreaker before the reference can resolve.
            let mut covered = 0usize;
            for group in &ranking.groups {
                if position < covered + group.len() {
                    if group.len() == 1 {
                        return Ok(TeamSlot::Team(group[0].clone()));
                    }
                    let seats = position - covered + 1;
                    return match core.break_tie(group, seats, false)? {
                        TieOutcome::Resolved(ordered) => {
                            Ok(TeamSlot::Team(ordered[position - covered].clone()))
                        }
                        TieOutcome::Pending => Ok(TeamSlot::Tbd),
                    };
                }
                covered += group.len();
            }

            Ok(TeamSlot::Tbd)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn team_refs_parse() {
        assert_eq!(TeamRef::Bye, parse_team_ref(None));
        assert_eq!(TeamRef::Seed(3), parse_team_ref(Some("S3")));
        assert_eq!(TeamRef::Seed(10), parse_team_ref(Some("S10")));
        assert_eq!(
            TeamRef::Outcome {
                round: 0,
                match_index: 1,
                position: 2,
            },
            parse_team_ref(Some("012")),
        );
        assert_eq!(
            TeamRef::Team("ABC".to_string()),
            parse_team_ref(Some("ABC")),
        );
        // Too short or too long to be an outcome reference.
        assert_eq!(TeamRef::Team("01".to_string()), parse_team_ref(Some("01")));
        assert_eq!(
            TeamRef::Team("0123".to_string()),
            parse_team_ref(Some("0123")),
        );
    }
}
