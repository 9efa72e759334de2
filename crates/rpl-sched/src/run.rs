//! The drain loop.
//!
//! Each iteration jumps to the earliest tick holding events (empty ticks are
//! skipped, which is observably the same as stepping one tick at a time),
//! then hands the due events to the [`Dispatch`] implementation one by one in
//! `(SubOrder, registration)` order.  Dispatchers receive `&mut Scheduler`
//! and may register follow-up events; strict placement rejects the current
//! tick, so nothing registered during a tick can run within that same tick.

use std::any::Any;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};

use rpl_core::Tick;

use crate::{DispatchError, SchedError, SchedResult, Scheduler};

/// Executes the actions popped by the run loop.
///
/// `on_tick_start` has a default no-op implementation.
pub trait Dispatch<T, A> {
    /// Called once per non-empty tick, before its first event.
    fn on_tick_start(&mut self, _tick: Tick) {}

    fn dispatch(
        &mut self,
        sched:  &mut Scheduler<T, A>,
        tag:    T,
        action: A,
    ) -> Result<(), DispatchError>;
}

/// Why a run returned.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// No events left.
    Drained,
    /// The termination tick was reached.
    Terminated,
    /// `run_until` hit its limit with events still pending.
    Paused,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RunOutcome {
    pub last_tick: Tick,
    pub reason:    StopReason,
}

impl<T, A> Scheduler<T, A>
where
    T: Eq + Hash + Clone,
{
    /// Drain events until the queue empties or the termination tick passes.
    pub fn run<D: Dispatch<T, A>>(&mut self, dispatcher: &mut D) -> SchedResult<RunOutcome> {
        self.drain(None, dispatcher)
    }

    /// Like [`run`][Self::run] but stops before any tick later than `limit`.
    ///
    /// On `Paused` the clock is left at `limit`.
    pub fn run_until<D: Dispatch<T, A>>(
        &mut self,
        limit:      Tick,
        dispatcher: &mut D,
    ) -> SchedResult<RunOutcome> {
        self.drain(Some(limit), dispatcher)
    }

    fn drain<D: Dispatch<T, A>>(
        &mut self,
        limit:      Option<Tick>,
        dispatcher: &mut D,
    ) -> SchedResult<RunOutcome> {
        loop {
            if self.end_tick().is_some_and(|end| self.now() >= end) {
                return Ok(self.outcome(StopReason::Terminated));
            }
            let Some(next) = self.next_tick() else {
                return Ok(self.outcome(StopReason::Drained));
            };
            if let Some(end) = self.end_tick() {
                if next > end {
                    self.advance_to(end);
                    return Ok(self.outcome(StopReason::Terminated));
                }
            }
            if let Some(limit) = limit {
                if next > limit {
                    self.advance_to(limit);
                    return Ok(self.outcome(StopReason::Paused));
                }
            }

            self.advance_to(next);
            dispatcher.on_tick_start(next);
            while let Some((tag, action)) = self.pop_due(next) {
                self.dispatch_one(next, tag, action, dispatcher)?;
            }

            if self.end_tick() == Some(next) {
                return Ok(self.outcome(StopReason::Terminated));
            }
        }
    }

    fn dispatch_one<D: Dispatch<T, A>>(
        &mut self,
        tick:       Tick,
        tag:        T,
        action:     A,
        dispatcher: &mut D,
    ) -> SchedResult<()> {
        let result = panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(self, tag, action)));
        match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => {
                tracing::error!(%tick, error = %source, "event dispatch failed");
                Err(SchedError::Dispatch { tick, source })
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(%tick, %message, "event panicked");
                Err(SchedError::Panicked { tick, message })
            }
        }
    }

    fn outcome(&self, reason: StopReason) -> RunOutcome {
        RunOutcome { last_tick: self.now(), reason }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
