// A slot cursor over one match period, accounting for delays.
use time::{Duration, OffsetDateTime};

use crate::error::{Error, Result};
use crate::schedule::period::{Delay, MatchPeriod};

// Yields the start times at which matches may be scheduled within a period.
// The cursor starts at the period start (plus any delays already triggered)
// and steps by slot length + inter-match gap. A slot is only available while
// it still ends by the period's latest permissible end.
#[derive(Debug, Clone)]
pub struct MatchPeriodClock {
    description: String,
    max_end_time: OffsetDateTime,
    slot_length: Duration,
    step: Duration,
    delays: Vec<Delay>,
    next_delay: usize,
    cursor: OffsetDateTime,
}

impl MatchPeriodClock {
    // Build a clock for one period. Delays outside the period belong to other
    // periods and are ignored here.
    pub fn build(
        period: &MatchPeriod,
        delays: &[Delay],
        slot_length: Duration,
        inter_match_gap: Duration,
    ) -> Self {
        let mut applicable: Vec<Delay> = delays
            .iter()
            .filter(|d| period.start_time <= d.time && d.time <= period.max_end_time)
            .copied()
            .collect();
        applicable.sort_by_key(|d| d.time);

        let mut clock = Self {
            description: period.description.clone(),
            max_end_time: period.max_end_time,
            slot_length,
            step: slot_length + inter_match_gap,
            delays: applicable,
            next_delay: 0,
            cursor: period.start_time,
        };

        clock.apply_delays();
        return clock;
    }

    // Shift the cursor by every delay triggered at or before it. Each shift
    // can trigger further delays, so keep checking until none apply.
    fn apply_delays(&mut self) {
        while let Some(delay) = self.delays.get(self.next_delay) {
            if delay.time > self.cursor {
                break;
            }
            self.cursor += delay.duration;
            self.next_delay += 1;
        }
    }

    // The start time of the next slot, if one still fits in the period.
    pub fn slot_start(&self) -> Result<OffsetDateTime> {
        if self.cursor + self.slot_length > self.max_end_time {
            return Err(Error::OutOfTime {
                period: self.description.clone(),
            });
        }
        Ok(self.cursor)
    }

    // Move the cursor past the current slot. Delays triggered by the move
    // shift the following slots; the slot just passed is frozen.
    pub fn advance(&mut self) {
        self.cursor += self.step;
        self.apply_delays();
    }

    // Iterate the remaining slot starts.
    pub fn slots(&mut self) -> Slots<'_> {
        Slots { clock: self }
    }

    // The already-computable slot containing `now`, if any.
    pub fn current_slot(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        let mut probe = self.clone();
        while let Ok(start) = probe.slot_start() {
            if start > now {
                return None;
            }
            if now < start + probe.slot_length {
                return Some(start);
            }
            probe.advance();
        }

        return None;
    }
}

pub struct Slots<'c> {
    clock: &'c mut MatchPeriodClock,
}

impl Iterator for Slots<'_> {
    type Item = OffsetDateTime;

    fn next(&mut self) -> Option<OffsetDateTime> {
        let start = self.clock.slot_start().ok()?;
        self.clock.advance();
        Some(start)
    }
}
