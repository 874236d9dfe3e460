// The match schedule: periods crossed with the match plan.
pub mod clock;
pub mod period;

use std::collections::BTreeMap;

use time::{Duration, OffsetDateTime};

use crate::compstate::{LeagueFile, ScheduleFile, StagingOffsets};
use crate::error::{Error, Result};
use crate::schedule::clock::MatchPeriodClock;
use crate::schedule::period::{Delay, Match, MatchKind, MatchPeriod, MatchSlot};
use crate::team::TeamRegistry;
use crate::types::{MatchNumber, TeamId};

// Absolute staging window for one match.
#[derive(Debug, Clone, PartialEq)]
pub struct StagingTimes {
    pub opens: OffsetDateTime,
    pub closes: OffsetDateTime,
    pub duration: Duration,
    pub signal_shepherds: BTreeMap<String, OffsetDateTime>,
    pub signal_teams: Option<OffsetDateTime>,
}

// The competition's full timetable. League matches are bound at build time;
// the knockout scheduler appends its matches afterwards.
#[derive(Debug, Clone)]
pub struct MatchSchedule {
    pub slot_length: Duration,
    pub inter_match_gap: Duration,
    pub periods: Vec<MatchPeriod>,
    pub delays: Vec<Delay>,
    // Indexed by match number: matches[num] holds every arena appearance.
    pub matches: Vec<MatchSlot>,
    pub n_league_matches: usize,
    pub staging: Option<StagingOffsets>,
}

impl MatchSchedule {
    // Bind the league plan into the league periods. Matches are taken in
    // number order; each slot holds one match number across however many
    // arenas the plan names for it.
    pub fn build(
        file: &ScheduleFile,
        plan: &LeagueFile,
        registry: &TeamRegistry,
    ) -> Result<Self> {
        let mut delays: Vec<Delay> = file
            .delays
            .iter()
            .map(|d| Delay {
                time: d.time,
                duration: Duration::seconds(d.delay),
            })
            .collect();
        delays.sort_by_key(|d| d.time);

        let periods: Vec<MatchPeriod> = file
            .match_periods
            .iter()
            .map(|p| MatchPeriod {
                start_time: p.start_time,
                end_time: p.end_time,
                max_end_time: p.max_end_time.unwrap_or(p.end_time),
                description: p.description.clone(),
                kind: p.kind,
                matches: Vec::new(),
            })
            .collect();

        let mut schedule = Self {
            slot_length: Duration::seconds(file.match_slot_length_seconds),
            inter_match_gap: Duration::seconds(file.match_period_gap_seconds),
            periods,
            delays,
            matches: Vec::new(),
            n_league_matches: plan.matches.len(),
            staging: file.staging.clone(),
        };

        schedule.bind_league(plan, registry)?;
        return Ok(schedule);
    }

    fn bind_league(&mut self, plan: &LeagueFile, registry: &TeamRegistry) -> Result<()> {
        let mut numbers = plan.matches.keys().copied();
        let mut next = numbers.next();

        for period_index in 0..self.periods.len() {
            if self.periods[period_index].kind != MatchKind::League {
                continue;
            }

            let mut clock = MatchPeriodClock::build(
                &self.periods[period_index],
                &self.delays,
                self.slot_length,
                self.inter_match_gap,
            );

            while let Some(num) = next {
                let start = match clock.slot_start() {
                    Ok(start) => start,
                    Err(_) => break,
                };

                let mut slot = MatchSlot::new();
                for (arena, row) in &plan.matches[&num] {
                    let mut teams = row.clone();
                    registry.blank_dropped_out(&mut teams, num);

                    slot.insert(
                        arena.clone(),
                        Match {
                            num,
                            display_name: format!("Match {num}"),
                            arena: arena.clone(),
                            teams,
                            start_time: start,
                            end_time: start + self.slot_length,
                            kind: MatchKind::League,
                            use_resolved_ranking: false,
                        },
                    );
                }

                self.periods[period_index].matches.push(slot.clone());
                self.matches.push(slot);
                next = numbers.next();
                clock.advance();
            }
        }

        if next.is_some() {
            return Err(Error::PlanExceedsPeriods {
                planned: plan.matches.len(),
                available: self.matches.len(),
            });
        }

        return Ok(());
    }

    // The number the next appended match will get.
    pub fn next_match_number(&self) -> MatchNumber {
        self.matches.len() as MatchNumber
    }

    // Append a knockout or tiebreaker match, recording it both globally and
    // in the period it plays in.
    pub fn append(&mut self, period_index: usize, appended: Match) {
        let mut slot = MatchSlot::new();
        slot.insert(appended.arena.clone(), appended);
        self.periods[period_index].matches.push(slot.clone());
        self.matches.push(slot);
    }

    // A slot source over the knockout periods, in order.
    pub fn knockout_slots(&self) -> KnockoutSlotSource {
        let clocks = self
            .periods
            .iter()
            .enumerate()
            .filter(|(_, p)| p.kind == MatchKind::Knockout)
            .map(|(index, p)| {
                (
                    index,
                    MatchPeriodClock::build(p, &self.delays, self.slot_length, self.inter_match_gap),
                )
            })
            .collect();

        KnockoutSlotSource { clocks, index: 0 }
    }

    pub fn all_matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().flat_map(|slot| slot.values())
    }

    pub fn match_at(&self, arena: &str, num: MatchNumber) -> Option<&Match> {
        self.matches.get(num as usize)?.get(arena)
    }

    pub fn n_matches(&self) -> usize {
        self.matches.len()
    }

    // Matches in play at the given instant.
    pub fn matches_at(&self, when: OffsetDateTime) -> Vec<&Match> {
        self.all_matches()
            .filter(|m| m.start_time <= when && when < m.end_time)
            .collect()
    }

    // The next slot to begin after the given instant, with its matches.
    pub fn next_slot_after(&self, when: OffsetDateTime) -> Option<(OffsetDateTime, Vec<&Match>)> {
        let mut best: Option<(OffsetDateTime, Vec<&Match>)> = None;

        for slot in &self.matches {
            let start = match slot.values().next() {
                Some(first) => first.start_time,
                None => continue,
            };
            if start <= when {
                continue;
            }

            let better = match &best {
                Some((current, _)) => start < *current,
                None => true,
            };
            if better {
                best = Some((start, slot.values().collect()));
            }
        }

        return best;
    }

    // The cumulative delay in effect at the given instant.
    pub fn delay_at(&self, when: OffsetDateTime) -> Duration {
        self.delays
            .iter()
            .filter(|d| d.time <= when)
            .map(|d| d.duration)
            .sum()
    }

    // Teams appearing in at least one league match.
    pub fn league_participants(&self) -> std::collections::BTreeSet<TeamId> {
        self.matches[..self.n_league_matches]
            .iter()
            .flat_map(|slot| slot.values())
            .flat_map(|m| m.participants().cloned())
            .collect()
    }

    // The staging window for one match, if staging is configured.
    pub fn staging_times(&self, scheduled: &Match) -> Option<StagingTimes> {
        let offsets = self.staging.as_ref()?;
        let start = scheduled.start_time;

        Some(StagingTimes {
            opens: start - Duration::seconds(offsets.opens),
            closes: start - Duration::seconds(offsets.closes),
            duration: Duration::seconds(offsets.duration),
            signal_shepherds: offsets
                .signal_shepherds
                .iter()
                .map(|(name, seconds)| (name.clone(), start - Duration::seconds(*seconds)))
                .collect(),
            signal_teams: offsets
                .signal_teams
                .map(|seconds| start - Duration::seconds(seconds)),
        })
    }
}

// Slots drawn from the knockout periods, one period at a time.
pub struct KnockoutSlotSource {
    clocks: Vec<(usize, MatchPeriodClock)>,
    index: usize,
}

impl KnockoutSlotSource {
    // The next available slot: (period index, start time).
    pub fn next_slot(&mut self) -> Result<(usize, OffsetDateTime)> {
        while let Some((period_index, clock)) = self.clocks.get_mut(self.index) {
            match clock.slot_start() {
                Ok(start) => {
                    clock.advance();
                    return Ok((*period_index, start));
                }
                Err(_) => self.index += 1,
            }
        }

        Err(Error::OutOfTime {
            period: "knockout".to_string(),
        })
    }

    // Skip forward until the next slot starts strictly after the given time.
    pub fn skip_until_after(&mut self, when: OffsetDateTime) -> Result<()> {
        loop {
            let peek = {
                let (_, clock) = match self.clocks.get_mut(self.index) {
                    Some(entry) => entry,
                    None => return Ok(()),
                };
                clock.slot_start()
            };

            match peek {
                Ok(start) if start <= when => {
                    self.clocks[self.index].1.advance();
                }
                Ok(_) => return Ok(()),
                Err(_) => self.index += 1,
            }
        }
    }
}
