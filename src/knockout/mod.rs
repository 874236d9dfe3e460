// Knockout scheduling: bracket construction, progression and tiebreakers.
pub mod automatic;
pub mod seeding;
pub mod static_schedule;

use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::{Error, Result};
use crate::schedule::period::{Match, MatchKind, TeamSlot};
use crate::schedule::{KnockoutSlotSource, MatchSchedule};
use crate::scoring::scores::{ranking_of, GameScore, KnockoutScores, TiebreakerScores};
use crate::scoring::{score_sheet, ScoreSheet, Scorer};
use crate::standings::LeagueStandings;
use crate::team::TeamRegistry;
use crate::types::{ArenaId, MatchId, Position, TeamId};

// Everything the schedulers need to read.
pub struct KnockoutContext<'a> {
    pub arenas: Vec<ArenaId>,
    pub capacity: usize,
    pub registry: &'a TeamRegistry,
    pub standings: &'a LeagueStandings,
    pub league_complete: bool,
    pub scorer: &'a dyn Scorer,
    pub knockout_sheets: &'a BTreeMap<MatchId, (PathBuf, ScoreSheet)>,
    pub tiebreaker_sheets: &'a BTreeMap<MatchId, (PathBuf, ScoreSheet)>,
}

// The bracket structure: which matches make up which rounds.
#[derive(Debug, Clone, Default)]
pub struct Bracket {
    // Rounds in play order; the last round is the final.
    pub rounds: Vec<Vec<MatchId>>,
    // Every tiebreaker match, in schedule order.
    pub tiebreakers: Vec<MatchId>,
    // The subset spawned by ties in the final, in play order.
    pub final_tiebreakers: Vec<MatchId>,
}

impl Bracket {
    // The bracket final.
    pub fn final_match_id(&self) -> Option<&MatchId> {
        self.rounds.last()?.last()
    }

    // The match which actually decides the champion: the final, unless its
    // tie went to a tiebreaker.
    pub fn deciding_match_id(&self) -> Option<&MatchId> {
        self.final_tiebreakers.last().or_else(|| self.final_match_id())
    }
}

// What knockout scheduling produced.
#[derive(Debug, Clone, Default)]
pub struct KnockoutOutcome {
    pub bracket: Bracket,
    pub scores: KnockoutScores,
    pub tiebreaker_scores: TiebreakerScores,
}

// Get a human-readable match display name.
pub fn match_display_name(rounds_remaining: u32, round_index: usize, num: u32) -> String {
    match rounds_remaining {
        0 => format!("Final (#{num})"),
        1 => format!("Semi {} (#{num})", round_index + 1),
        2 => format!("Quarter {} (#{num})", round_index + 1),
        _ => format!("Match {num}"),
    }
}

// How a tie resolution attempt came out: either a strict list of teams for
// the contested seats, or still waiting on an unplayed tiebreaker.
pub enum TieOutcome {
    Resolved(Vec<TeamId>),
    Pending,
}

// Shared machinery for both scheduler variants: slot/arena allocation, match
// numbering, scoresheet consumption and tiebreaker insertion.
pub struct SchedulerCore<'a, 'c> {
    pub ctx: &'c KnockoutContext<'a>,
    pub schedule: &'c mut MatchSchedule,
    pub slots: KnockoutSlotSource,
    pub knockout_games: BTreeMap<MatchId, GameScore>,
    pub tiebreaker_games: BTreeMap<MatchId, GameScore>,
    pub tiebreakers: Vec<MatchId>,
    pub final_tiebreakers: Vec<MatchId>,
    arena_cursor: usize,
}

impl<'a, 'c> SchedulerCore<'a, 'c> {
    pub fn build(ctx: &'c KnockoutContext<'a>, schedule: &'c mut MatchSchedule) -> Self {
        let slots = schedule.knockout_slots();
        Self {
            ctx,
            schedule,
            slots,
            knockout_games: BTreeMap::new(),
            tiebreaker_games: BTreeMap::new(),
            tiebreakers: Vec::new(),
            final_tiebreakers: Vec::new(),
            arena_cursor: 0,
        }
    }

    fn next_arena(&mut self) -> ArenaId {
        let arena = self.ctx.arenas[self.arena_cursor % self.ctx.arenas.len()].clone();
        self.arena_cursor += 1;
        return arena;
    }

    // Append one knockout match into the next available slot.
    pub fn add_knockout_match(
        &mut self,
        mut teams: Vec<TeamSlot>,
        rounds_remaining: u32,
        round_index: usize,
    ) -> Result<MatchId> {
        while teams.len() < self.ctx.capacity {
            teams.push(TeamSlot::Empty);
        }

        let (period_index, start) = self.slots.next_slot()?;
        let num = self.schedule.next_match_number();
        let arena = self.next_arena();

        let appended = Match {
            num,
            display_name: match_display_name(rounds_remaining, round_index, num),
            arena: arena.clone(),
            teams,
            start_time: start,
            end_time: start + self.schedule.slot_length,
            kind: MatchKind::Knockout,
            // Only the final admits a tie on game score alone.
            use_resolved_ranking: rounds_remaining != 0,
        };

        let id: MatchId = (arena, num);
        self.consume_sheet(&appended, false)?;
        self.schedule.append(period_index, appended);
        return Ok(id);
    }

    // Append a tiebreaker match between exactly the tied teams, in the next
    // available slot. Zone order is shuffled, stably: the same tied teams
    // always land in the same zones.
    pub fn add_tiebreaker(&mut self, tied: &[TeamId], for_final: bool) -> Result<MatchId> {
        let mut teams: Vec<TeamSlot> = tied
            .iter()
            .map(|team| TeamSlot::Team(team.clone()))
            .collect();
        while teams.len() < self.ctx.capacity {
            teams.push(TeamSlot::Empty);
        }
        stable_shuffle(&mut teams, tied);

        let (period_index, start) = self.slots.next_slot()?;
        let num = self.schedule.next_match_number();
        let arena = self.next_arena();

        let appended = Match {
            num,
            display_name: format!("Tiebreaker (#{num})"),
            arena: arena.clone(),
            teams,
            start_time: start,
            end_time: start + self.schedule.slot_length,
            kind: MatchKind::Tiebreaker,
            use_resolved_ranking: false,
        };

        let id: MatchId = (arena, num);
        self.consume_sheet(&appended, true)?;
        self.schedule.append(period_index, appended);

        self.tiebreakers.push(id.clone());
        if for_final {
            self.final_tiebreakers.push(id.clone());
        }
        return Ok(id);
    }

    // Append a statically-planned knockout match at its configured time. The
    // match must fall inside a knockout period.
    pub fn add_planned_match(
        &mut self,
        record: &crate::compstate::StaticMatchRecord,
        teams: Vec<TeamSlot>,
        rounds_remaining: u32,
        round_index: usize,
    ) -> Result<MatchId> {
        let start = record.start_time;
        let period_index = self
            .schedule
            .periods
            .iter()
            .position(|p| {
                p.kind == MatchKind::Knockout && p.start_time <= start && start <= p.max_end_time
            })
            .ok_or_else(|| Error::Schema {
                path: PathBuf::from("schedule.yaml"),
                message: format!(
                    "static knockout match at {start} falls outside every knockout period"
                ),
            })?;

        let num = self.schedule.next_match_number();
        let display_name = match &record.display_name {
            Some(name) => name.clone(),
            None => match_display_name(rounds_remaining, round_index, num),
        };

        let appended = Match {
            num,
            display_name,
            arena: record.arena.clone(),
            teams,
            start_time: start,
            end_time: start + self.schedule.slot_length,
            kind: MatchKind::Knockout,
            use_resolved_ranking: rounds_remaining != 0,
        };

        let id: MatchId = (record.arena.clone(), num);
        self.consume_sheet(&appended, false)?;
        self.schedule.append(period_index, appended);
        return Ok(id);
    }

    // If the compstate holds a sheet for this match, score it. The sheet must
    // agree with the scheduled match about who played where.
    fn consume_sheet(&mut self, scheduled: &Match, tiebreaker: bool) -> Result<()> {
        let sheets = if tiebreaker {
            self.ctx.tiebreaker_sheets
        } else {
            self.ctx.knockout_sheets
        };

        let (path, sheet) = match sheets.get(&scheduled.id()) {
            Some(entry) => entry,
            None => return Ok(()),
        };

        if !crate::scoring::sheet_covers(&sheet.teams, &scheduled.teams) {
            return Err(Error::ScoresheetMismatch {
                path: path.clone(),
                message: format!(
                    "sheet teams {:?} differ from scheduled teams {:?}",
                    sheet.teams, scheduled.teams,
                ),
            });
        }

        let scored = score_sheet(self.ctx.scorer, path, sheet)?;
        let game = GameScore::build(scheduled.id(), scored);

        if tiebreaker {
            self.tiebreaker_games.insert(scheduled.id(), game);
        } else {
            self.knockout_games.insert(scheduled.id(), game);
        }
        return Ok(());
    }

    // Settle a tie for a limited number of seats by playing tiebreakers.
    // Each attempt involves exactly the still-tied teams; a tiebreaker that
    // itself ties at the contested boundary spawns another.
    pub fn break_tie(
        &mut self,
        group: &[TeamId],
        seats: usize,
        for_final: bool,
    ) -> Result<TieOutcome> {
        let mut resolved: Vec<TeamId> = Vec::new();
        let mut contested: Vec<TeamId> = group.to_vec();
        let mut seats_left = seats;

        loop {
            let id = self.add_tiebreaker(&contested, for_final)?;

            let game = match self.tiebreaker_games.get(&id) {
                Some(game) => game,
                None => return Ok(TieOutcome::Pending),
            };

            let ranking = ranking_of(game, false, &BTreeMap::new());
            let mut still_contested: Option<Vec<TeamId>> = None;

            for tier in &ranking.groups {
                if seats_left == 0 {
                    break;
                }
                if tier.len() <= seats_left {
                    seats_left -= tier.len();
                    resolved.extend(tier.iter().cloned());
                } else {
                    still_contested = Some(tier.clone());
                    break;
                }
            }

            match still_contested {
                Some(tier) => contested = tier,
                None => return Ok(TieOutcome::Resolved(resolved)),
            }
        }
    }

    // The progression ranking of an already-scheduled knockout match.
    pub fn ranking_for(&self, id: &MatchId) -> Option<crate::scoring::scores::Ranking> {
        let game = self.knockout_games.get(id)?;
        let scheduled = self.schedule.match_at(&id.0, id.1)?;
        Some(ranking_of(
            game,
            scheduled.use_resolved_ranking,
            self.league_positions(),
        ))
    }

    fn league_positions(&self) -> &BTreeMap<TeamId, Position> {
        self.ctx.standings.positions()
    }

    // If the final has been played and its top spot is shared, settle it.
    pub fn settle_final(&mut self, final_id: &MatchId) -> Result<()> {
        let winners = match self.ranking_for(final_id) {
            Some(ranking) => match ranking.winners() {
                Some(group) if group.len() > 1 => group.to_vec(),
                _ => return Ok(()),
            },
            None => return Ok(()),
        };

        self.break_tie(&winners, 1, true)?;
        return Ok(());
    }

    // Wrap up: no scoresheet may be left referring to a match that was never
    // scheduled.
    pub fn finish(self, rounds: Vec<Vec<MatchId>>) -> Result<KnockoutOutcome> {
        for (id, (path, _)) in self.ctx.knockout_sheets {
            if !self.knockout_games.contains_key(id) {
                return Err(Error::ScoresheetMismatch {
                    path: path.clone(),
                    message: "no knockout match was scheduled here".to_string(),
                });
            }
        }
        for (id, (path, _)) in self.ctx.tiebreaker_sheets {
            if !self.tiebreaker_games.contains_key(id) {
                return Err(Error::ScoresheetMismatch {
                    path: path.clone(),
                    message: "no tiebreaker match was scheduled here".to_string(),
                });
            }
        }

        let league_positions = self.league_positions().clone();
        Ok(KnockoutOutcome {
            bracket: Bracket {
                rounds,
                tiebreakers: self.tiebreakers,
                final_tiebreakers: self.final_tiebreakers,
            },
            scores: KnockoutScores::build(self.knockout_games, league_positions),
            tiebreaker_scores: TiebreakerScores::build(self.tiebreaker_games),
        })
    }
}

// Shuffle zone allocations without disturbing determinism: the generator is
// seeded from the tied teams themselves.
fn stable_shuffle(teams: &mut [TeamSlot], tied: &[TeamId]) {
    let mut sorted: Vec<&TeamId> = tied.iter().collect();
    sorted.sort();

    let mut hasher = DefaultHasher::new();
    for team in sorted {
        team.hash(&mut hasher);
    }

    let mut rng = StdRng::seed_from_u64(hasher.finish());
    teams.shuffle(&mut rng);
}
