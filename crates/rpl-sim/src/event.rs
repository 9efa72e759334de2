//! Event tags and continuation actions registered with the scheduler.

use rpl_core::{ChannelProbe, NodeId, Tick};
use rpl_dodag::{Message, RplTimer, RplTimers};
use rpl_sched::{Scheduler, SubOrder};

/// Identity of a pending event.  One live event per tag.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Tag {
    Boot(NodeId),
    Timer(NodeId, RplTimer),
    /// A frame in flight, numbered in send order.
    Frame(u64),
}

/// A frame handed to the radio of `to`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    pub from:    NodeId,
    pub to:      NodeId,
    pub message: Message,
}

/// What to do when an event fires.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Action {
    Boot(NodeId),
    Timer(NodeId, RplTimer),
    Deliver(Frame),
}

pub type EventQueue = Scheduler<Tag, Action>;

/// One node's view of the event queue.
pub(crate) struct NodeTimers<'s> {
    pub node:  NodeId,
    pub queue: &'s mut EventQueue,
}

impl RplTimers for NodeTimers<'_> {
    fn now(&self) -> Tick {
        self.queue.now()
    }

    fn schedule(&mut self, at: Tick, timer: RplTimer) -> Tick {
        self.queue.schedule_at_or_next(
            at,
            Tag::Timer(self.node, timer),
            SubOrder::Stack,
            Action::Timer(self.node, timer),
        )
    }

    fn cancel(&mut self, timer: RplTimer) {
        self.queue.cancel(&Tag::Timer(self.node, timer));
    }
}

/// Counts frames sent or heard on a node's shared control cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SharedCell {
    pub ops: u64,
}

impl ChannelProbe for SharedCell {
    fn shared_cell_ops(&self) -> Option<u64> {
        Some(self.ops)
    }
}
