// Property tests for the match period clock.
use proptest::prelude::*;
use time::macros::datetime;
use time::Duration;

use compcore::schedule::clock::MatchPeriodClock;
use compcore::{Delay, MatchKind, MatchPeriod};

fn base() -> time::OffsetDateTime {
    datetime!(2024-04-13 10:00 UTC)
}

fn period(length_min: i64, slack_min: i64) -> MatchPeriod {
    MatchPeriod {
        start_time: base(),
        end_time: base() + Duration::minutes(length_min),
        max_end_time: base() + Duration::minutes(length_min + slack_min),
        description: "period".to_string(),
        kind: MatchKind::League,
        matches: Vec::new(),
    }
}

proptest! {
    // Successive slots strictly increase and every slot fits the period.
    #[test]
    fn slots_are_monotonic_and_fit(
        length_min in 1i64..180,
        slot_min in 1i64..12,
        gap_min in 0i64..6,
        delay_offsets in proptest::collection::vec((0i64..180, 0i64..30), 0..4),
    ) {
        let period = period(length_min, 0);
        let delays: Vec<Delay> = delay_offsets
            .iter()
            .map(|(at, duration)| Delay {
                time: base() + Duration::minutes(*at),
                duration: Duration::minutes(*duration),
            })
            .collect();

        let mut clock = MatchPeriodClock::build(
            &period,
            &delays,
            Duration::minutes(slot_min),
            Duration::minutes(gap_min),
        );

        let slots: Vec<_> = clock.slots().collect();
        for pair in slots.windows(2) {
            prop_assert!(pair[0] < pair[1]);
        }
        for slot in &slots {
            prop_assert!(*slot + Duration::minutes(slot_min) <= period.max_end_time);
        }
    }

    // A delay during the period shifts exactly the slots at or after its
    // trigger time, by exactly its duration. Slots before the trigger are
    // untouched; a shifted slot disappears only when it no longer fits.
    #[test]
    fn a_delay_shifts_later_slots_by_its_duration(
        length_min in 10i64..120,
        slot_min in 1i64..12,
        gap_min in 0i64..6,
        trigger_min in 0i64..120,
        delay_min in 0i64..20,
    ) {
        prop_assume!(trigger_min <= length_min);

        let shared_period = period(length_min, delay_min);
        let delay = Delay {
            time: base() + Duration::minutes(trigger_min),
            duration: Duration::minutes(delay_min),
        };

        let slot_length = Duration::minutes(slot_min);
        let gap = Duration::minutes(gap_min);

        let mut without = MatchPeriodClock::build(&shared_period, &[], slot_length, gap);
        let mut with = MatchPeriodClock::build(&shared_period, &[delay], slot_length, gap);

        let plain: Vec<_> = without.slots().collect();
        let delayed: Vec<_> = with.slots().collect();

        prop_assert!(delayed.len() <= plain.len());
        for (actual, expected) in delayed.iter().zip(&plain) {
            if *expected >= delay.time {
                prop_assert_eq!(*expected + delay.duration, *actual);
            } else {
                prop_assert_eq!(expected, actual);
            }
        }

        // Whatever fell off the end only did so because the shift pushed it
        // past the period's latest permissible end.
        for dropped in &plain[delayed.len()..] {
            prop_assert!(*dropped >= delay.time);
            prop_assert!(
                *dropped + delay.duration + slot_length > shared_period.max_end_time
            );
        }
    }
}
