//! `Scheduler` — sparse, tag-addressed event queue.
//!
//! # Layout
//!
//! ```text
//! queue: BTreeMap<Tick, BTreeMap<(SubOrder, seq), (tag, action)>>
//! index: FxHashMap<tag, (Tick, SubOrder, seq)>
//! ```
//!
//! The outer map keeps ticks in order; the inner map orders same-tick events
//! first by `SubOrder` and then by registration sequence.  The index makes
//! `cancel` and re-registration O(log W) instead of a scan, and guarantees at
//! most one live event per tag.

use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;

use rpl_core::Tick;
use rustc_hash::FxHashMap;

use crate::{SchedError, SchedResult};

// ── Ordering and placement ────────────────────────────────────────────────────

/// Intra-tick priority class.  Admin events run before stack events.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SubOrder {
    /// Harness bookkeeping (termination, probes).
    Admin,
    /// Protocol timers.
    Stack,
}

/// How `schedule_at` treats a tick that is not in the future.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Fail with `PastOrPresentTick`.
    Strict,
    /// Silently move the event to `now + 1`.
    AutoCorrect,
}

type Slot = (SubOrder, u64);

// ── Scheduler ─────────────────────────────────────────────────────────────────

/// Discrete-event queue keyed by a unique tag `T`, carrying actions `A`.
pub struct Scheduler<T, A> {
    now:        Tick,
    queue:      BTreeMap<Tick, BTreeMap<Slot, (T, A)>>,
    index:      FxHashMap<T, (Tick, Slot)>,
    seq:        u64,
    end:        Option<Tick>,
    dispatched: u64,
}

impl<T, A> Default for Scheduler<T, A>
where
    T: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, A> Scheduler<T, A>
where
    T: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            now:        Tick::ZERO,
            queue:      BTreeMap::new(),
            index:      FxHashMap::default(),
            seq:        0,
            end:        None,
            dispatched: 0,
        }
    }

    /// The tick currently being processed (or last processed).
    #[inline]
    pub fn now(&self) -> Tick {
        self.now
    }

    /// Register `action` under `tag` at `tick`.
    ///
    /// Any event already registered under `tag` is cancelled first.  Returns
    /// the tick the event actually landed on.
    pub fn schedule_at(
        &mut self,
        tick:      Tick,
        tag:       T,
        order:     SubOrder,
        action:    A,
        placement: Placement,
    ) -> SchedResult<Tick> {
        let tick = if tick > self.now {
            tick
        } else {
            match placement {
                Placement::Strict => {
                    return Err(SchedError::PastOrPresentTick { requested: tick, now: self.now });
                }
                Placement::AutoCorrect => self.now.next(),
            }
        };
        Ok(self.insert(tick, tag, order, action))
    }

    /// Infallible form of `schedule_at` with auto-correct placement.
    pub fn schedule_at_or_next(&mut self, tick: Tick, tag: T, order: SubOrder, action: A) -> Tick {
        let tick = if tick > self.now { tick } else { self.now.next() };
        self.insert(tick, tag, order, action)
    }

    /// Register `action` `delay` ticks from now (a zero delay means next tick).
    pub fn schedule_in(&mut self, delay: u64, tag: T, order: SubOrder, action: A) -> Tick {
        self.schedule_at_or_next(self.now + delay, tag, order, action)
    }

    fn insert(&mut self, tick: Tick, tag: T, order: SubOrder, action: A) -> Tick {
        self.cancel(&tag);
        let slot = (order, self.seq);
        self.seq += 1;
        self.index.insert(tag.clone(), (tick, slot));
        self.queue.entry(tick).or_default().insert(slot, (tag, action));
        tick
    }

    /// Remove the event registered under `tag`, returning its action.
    ///
    /// No-op when the tag is unknown.
    pub fn cancel(&mut self, tag: &T) -> Option<A> {
        let (tick, slot) = self.index.remove(tag)?;
        let level = self.queue.get_mut(&tick)?;
        let (_, action) = level.remove(&slot)?;
        if level.is_empty() {
            self.queue.remove(&tick);
        }
        Some(action)
    }

    #[inline]
    pub fn is_scheduled(&self, tag: &T) -> bool {
        self.index.contains_key(tag)
    }

    /// Tick at which `tag` will fire, if registered.
    pub fn scheduled_at(&self, tag: &T) -> Option<Tick> {
        self.index.get(tag).map(|&(tick, _)| tick)
    }

    /// Request the run loop to stop after processing `tick`.
    pub fn terminate_at(&mut self, tick: Tick) {
        self.end = Some(tick);
    }

    /// The registered termination tick, if any.
    pub fn end_tick(&self) -> Option<Tick> {
        self.end
    }

    /// The earliest tick holding at least one event.
    pub fn next_tick(&self) -> Option<Tick> {
        self.queue.keys().next().copied()
    }

    /// Number of pending events.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Total events handed to a dispatcher so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched
    }

    // ── Run-loop internals ────────────────────────────────────────────────

    /// Move the clock forward to `tick`.  Never moves it backwards.
    pub(crate) fn advance_to(&mut self, tick: Tick) {
        if tick > self.now {
            self.now = tick;
        }
    }

    /// Deregister and return the first event due at `tick`.
    ///
    /// Popping one event at a time means an event cancelled by an earlier
    /// event of the same tick never fires.
    pub(crate) fn pop_due(&mut self, tick: Tick) -> Option<(T, A)> {
        let level = self.queue.get_mut(&tick)?;
        let (_, (tag, action)) = level.pop_first()?;
        if level.is_empty() {
            self.queue.remove(&tick);
        }
        self.index.remove(&tag);
        self.dispatched += 1;
        Some((tag, action))
    }
}

impl<T, A> fmt::Debug for Scheduler<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("now", &self.now)
            .field("pending", &self.index.len())
            .field("ticks", &self.queue.len())
            .field("end", &self.end)
            .finish()
    }
}
