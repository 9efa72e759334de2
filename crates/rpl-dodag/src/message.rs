//! Control messages as typed records.  Nothing here is ever encoded to
//! bytes.

use rpl_core::{Address, DioKind, LinkAddr};

/// DODAG Information Solicitation.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dis {
    pub src: Address,
    pub dst: Address,
}

/// DODAG Information Object.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dio {
    pub src:             Address,
    pub dst:             Address,
    pub rank:            u32,
    pub dodag_id:        Address,
    pub kind:            DioKind,
    /// Sent in answer to a DIS and flagged as such.
    pub answers_request: bool,
}

/// Destination Advertisement Object (non-storing mode).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Dao {
    /// Global address of the advertising node.
    pub src:    Address,
    /// The DODAG root.
    pub dst:    Address,
    /// Global address of the advertising node's preferred parent.
    pub parent: Address,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Message {
    Dis(Dis),
    Dio(Dio),
    Dao(Dao),
}

impl Message {
    pub fn dst(&self) -> Address {
        match self {
            Message::Dis(m) => m.dst,
            Message::Dio(m) => m.dst,
            Message::Dao(m) => m.dst,
        }
    }

    /// Sent to the all-RPL-nodes group rather than one node.
    #[inline]
    pub fn is_multicast(&self) -> bool {
        self.dst().is_multicast()
    }
}

/// A message handed to the link layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Outgoing {
    /// [`LinkAddr::BROADCAST`] for multicast messages.
    pub next_hop: LinkAddr,
    pub message:  Message,
}
