//! Unit tests for rpl-sched.

use rpl_core::Tick;

use crate::{
    Dispatch, DispatchError, Placement, SchedError, Scheduler, StopReason, SubOrder,
};

// ── Helpers ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Act {
    Note,
    /// Re-register the same tag `n` ticks later.
    Again(u64),
    Cancel(u32),
    Fail,
    Panic,
}

#[derive(Default)]
struct Recorder {
    fired:       Vec<(Tick, u32)>,
    tick_starts: Vec<Tick>,
}

impl Dispatch<u32, Act> for Recorder {
    fn on_tick_start(&mut self, tick: Tick) {
        self.tick_starts.push(tick);
    }

    fn dispatch(
        &mut self,
        sched:  &mut Scheduler<u32, Act>,
        tag:    u32,
        action: Act,
    ) -> Result<(), DispatchError> {
        self.fired.push((sched.now(), tag));
        match action {
            Act::Note => {}
            Act::Again(n) => {
                sched.schedule_in(n, tag, SubOrder::Stack, Act::Note);
            }
            Act::Cancel(other) => {
                sched.cancel(&other);
            }
            Act::Fail => return Err("boom".into()),
            Act::Panic => panic!("callback exploded"),
        }
        Ok(())
    }
}

fn sched() -> Scheduler<u32, Act> {
    Scheduler::new()
}

// ── Placement ─────────────────────────────────────────────────────────────────

#[cfg(test)]
mod placement {
    use super::*;

    #[test]
    fn strict_rejects_present_tick() {
        let mut s = sched();
        let err = s
            .schedule_at(Tick(0), 1, SubOrder::Stack, Act::Note, Placement::Strict)
            .unwrap_err();
        assert!(matches!(err, SchedError::PastOrPresentTick { requested: Tick(0), now: Tick(0) }));
        assert!(s.is_empty());
    }

    #[test]
    fn auto_correct_lands_on_next_tick() {
        let mut s = sched();
        let at = s
            .schedule_at(Tick(0), 1, SubOrder::Stack, Act::Note, Placement::AutoCorrect)
            .unwrap();
        assert_eq!(at, Tick(1));
        assert_eq!(s.scheduled_at(&1), Some(Tick(1)));
    }

    #[test]
    fn auto_correct_after_advancing() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(10), 1, SubOrder::Stack, Act::Note);
        s.run_until(Tick(10), &mut Recorder::default()).unwrap();
        assert_eq!(s.now(), Tick(10));
        let at = s.schedule_at_or_next(Tick(4), 2, SubOrder::Stack, Act::Note);
        assert_eq!(at, Tick(11));
    }

    #[test]
    fn future_tick_is_kept() {
        let mut s = sched();
        let at = s
            .schedule_at(Tick(5), 1, SubOrder::Stack, Act::Note, Placement::Strict)
            .unwrap();
        assert_eq!(at, Tick(5));
    }

    #[test]
    fn zero_delay_means_next_tick() {
        let mut s = sched();
        assert_eq!(s.schedule_in(0, 1, SubOrder::Stack, Act::Note), Tick(1));
        assert_eq!(s.schedule_in(3, 2, SubOrder::Stack, Act::Note), Tick(3));
    }
}

// ── Tags ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tags {
    use super::*;

    #[test]
    fn re_registering_a_tag_replaces_the_event() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(3), 7, SubOrder::Stack, Act::Note);
        s.schedule_at_or_next(Tick(5), 7, SubOrder::Stack, Act::Note);
        assert_eq!(s.len(), 1);
        assert_eq!(s.scheduled_at(&7), Some(Tick(5)));

        let mut rec = Recorder::default();
        s.run(&mut rec).unwrap();
        assert_eq!(rec.fired, vec![(Tick(5), 7)]);
    }

    #[test]
    fn cancel_unknown_tag_is_noop() {
        let mut s = sched();
        assert!(s.cancel(&42).is_none());
    }

    #[test]
    fn cancel_cleans_empty_levels() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(3), 1, SubOrder::Stack, Act::Note);
        s.schedule_at_or_next(Tick(9), 2, SubOrder::Stack, Act::Note);
        assert_eq!(s.cancel(&1), Some(Act::Note));
        assert_eq!(s.next_tick(), Some(Tick(9)));
        assert!(!s.is_scheduled(&1));
        assert!(s.is_scheduled(&2));
    }
}

// ── Run loop ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod run_loop {
    use super::*;

    #[test]
    fn same_tick_orders_by_sub_order_then_registration() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(2), 1, SubOrder::Stack, Act::Note);
        s.schedule_at_or_next(Tick(2), 2, SubOrder::Admin, Act::Note);
        s.schedule_at_or_next(Tick(2), 3, SubOrder::Stack, Act::Note);
        s.schedule_at_or_next(Tick(1), 4, SubOrder::Stack, Act::Note);

        let mut rec = Recorder::default();
        let out = s.run(&mut rec).unwrap();
        let tags: Vec<u32> = rec.fired.iter().map(|&(_, t)| t).collect();
        assert_eq!(tags, vec![4, 2, 1, 3]);
        assert_eq!(out.reason, StopReason::Drained);
        assert_eq!(out.last_tick, Tick(2));
        assert_eq!(rec.tick_starts, vec![Tick(1), Tick(2)]);
    }

    #[test]
    fn callbacks_can_schedule_future_events() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(1), 1, SubOrder::Stack, Act::Again(4));
        let mut rec = Recorder::default();
        s.run(&mut rec).unwrap();
        assert_eq!(rec.fired, vec![(Tick(1), 1), (Tick(5), 1)]);
        assert_eq!(s.dispatched(), 2);
    }

    #[test]
    fn cancelled_same_tick_event_does_not_fire() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(1), 1, SubOrder::Admin, Act::Cancel(2));
        s.schedule_at_or_next(Tick(1), 2, SubOrder::Stack, Act::Note);
        let mut rec = Recorder::default();
        s.run(&mut rec).unwrap();
        assert_eq!(rec.fired, vec![(Tick(1), 1)]);
    }

    #[test]
    fn termination_runs_end_tick_then_stops() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(5), 1, SubOrder::Stack, Act::Note);
        s.schedule_at_or_next(Tick(10), 2, SubOrder::Stack, Act::Note);
        s.schedule_at_or_next(Tick(11), 3, SubOrder::Stack, Act::Note);
        s.terminate_at(Tick(10));

        let mut rec = Recorder::default();
        let out = s.run(&mut rec).unwrap();
        assert_eq!(out.reason, StopReason::Terminated);
        assert_eq!(out.last_tick, Tick(10));
        assert_eq!(rec.fired.len(), 2);
        assert!(s.is_scheduled(&3));
    }

    #[test]
    fn termination_between_events_parks_clock_at_end() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(20), 1, SubOrder::Stack, Act::Note);
        s.terminate_at(Tick(10));
        let out = s.run(&mut Recorder::default()).unwrap();
        assert_eq!(out.last_tick, Tick(10));
        assert_eq!(out.reason, StopReason::Terminated);
    }

    #[test]
    fn run_until_pauses_and_resumes() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(3), 1, SubOrder::Stack, Act::Note);
        s.schedule_at_or_next(Tick(8), 2, SubOrder::Stack, Act::Note);

        let mut rec = Recorder::default();
        let out = s.run_until(Tick(5), &mut rec).unwrap();
        assert_eq!(out.reason, StopReason::Paused);
        assert_eq!(s.now(), Tick(5));
        assert_eq!(rec.fired.len(), 1);

        let out = s.run(&mut rec).unwrap();
        assert_eq!(out.reason, StopReason::Drained);
        assert_eq!(rec.fired.len(), 2);
    }

    #[test]
    fn dispatch_error_aborts_the_run() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(2), 1, SubOrder::Stack, Act::Fail);
        s.schedule_at_or_next(Tick(3), 2, SubOrder::Stack, Act::Note);
        let mut rec = Recorder::default();
        let err = s.run(&mut rec).unwrap_err();
        assert!(matches!(err, SchedError::Dispatch { tick: Tick(2), .. }));
        assert_eq!(err.tick(), Some(Tick(2)));
        assert_eq!(rec.fired.len(), 1);
    }

    #[test]
    fn panic_is_captured_with_its_message() {
        let mut s = sched();
        s.schedule_at_or_next(Tick(4), 1, SubOrder::Stack, Act::Panic);
        let err = s.run(&mut Recorder::default()).unwrap_err();
        match err {
            SchedError::Panicked { tick, message } => {
                assert_eq!(tick, Tick(4));
                assert!(message.contains("callback exploded"), "got {message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
