//! Simulation time model.
//!
//! # Design
//!
//! Time is represented as a monotonically increasing `Tick` counter, one tick
//! per network time-slot (the ASN of a TSCH network).  Protocol timers such as
//! Trickle reason in milliseconds; `SlotClock` holds the mapping:
//!
//!   ticks = ceil(ms / slot_duration_ms)
//!
//! Rounding up means a timer never fires before its nominal deadline.  A
//! zero-length delay still maps to zero ticks; the scheduler's auto-correct
//! placement is what pushes such events to the next tick.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute simulation tick counter (absolute slot number).
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// The tick immediately after `self`.
    #[inline]
    pub fn next(self) -> Tick {
        Tick(self.0 + 1)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── SlotClock ────────────────────────────────────────────────────────────────

/// Converts protocol durations (milliseconds) into slot ticks.
///
/// `SlotClock` is `Copy` and holds no heap data; every component that needs
/// it receives its own copy at construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlotClock {
    /// Duration of one slot (one tick) in milliseconds.
    pub slot_duration_ms: u32,
    /// Number of slots in one scheduling frame.
    pub slotframe_length: u32,
}

impl SlotClock {
    pub fn new(slot_duration_ms: u32, slotframe_length: u32) -> Self {
        debug_assert!(slot_duration_ms > 0 && slotframe_length > 0);
        Self { slot_duration_ms, slotframe_length }
    }

    /// How many ticks span `ms` milliseconds (rounds up).
    #[inline]
    pub fn ticks_for_ms(&self, ms: f64) -> u64 {
        if ms <= 0.0 {
            return 0;
        }
        (ms / self.slot_duration_ms as f64).ceil() as u64
    }

    /// Duration of one slotframe in milliseconds.
    #[inline]
    pub fn slotframe_ms(&self) -> f64 {
        self.slot_duration_ms as f64 * self.slotframe_length as f64
    }
}

impl Default for SlotClock {
    /// 10 ms slots, 101-slot frames (the 6TiSCH minimal configuration).
    fn default() -> Self {
        Self::new(10, 101)
    }
}
