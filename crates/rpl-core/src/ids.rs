//! Strongly typed identifier wrappers and node addressing.
//!
//! Every simulated node (mote) has a dense `NodeId` used to index harness
//! storage, a link-layer address (`LinkAddr`, the EUI-64 the MAC would carry)
//! and two IPv6 addresses derived from it.  Neighbor tables key on `LinkAddr`;
//! DAO and source routes use the global IPv6 address.

use std::fmt;
use std::net::Ipv6Addr;

use serde::{Deserialize, Serialize};

/// Generate a typed ID wrapper around a primitive integer.
macro_rules! typed_id {
    ($(#[$attr:meta])* $vis:vis struct $name:ident($inner:ty);) => {
        $(#[$attr])*
        #[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
        $vis struct $name(pub $inner);

        impl $name {
            /// Sentinel meaning "no valid ID".
            pub const INVALID: $name = $name(<$inner>::MAX);

            /// Cast to `usize` for direct use as a `Vec` index.
            #[inline(always)]
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl TryFrom<usize> for $name {
            type Error = std::num::TryFromIntError;
            fn try_from(n: usize) -> Result<$name, Self::Error> {
                <$inner>::try_from(n).map($name)
            }
        }
    };
}

typed_id! {
    /// Index of a simulated node in harness storage.
    pub struct NodeId(u32);
}

typed_id! {
    /// Slot of a neighbor record in a node's neighbor arena.
    pub struct NeighborId(u32);
}

// ── Link-layer address ────────────────────────────────────────────────────────

/// 64-bit link-layer (MAC) address.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Debug, Serialize, Deserialize)]
pub struct LinkAddr(pub u64);

impl LinkAddr {
    /// Broadcast link-layer address.
    pub const BROADCAST: LinkAddr = LinkAddr(u64::MAX);

    /// Deterministic MAC address of a simulated node.
    #[inline]
    pub fn of(node: NodeId) -> LinkAddr {
        LinkAddr(0x0200_0000_0000_0000 | node.0 as u64)
    }

    /// Recover the node behind a simulated MAC address.
    pub fn node(self) -> Option<NodeId> {
        if self == Self::BROADCAST || self.0 & 0xff00_0000_0000_0000 != 0x0200_0000_0000_0000 {
            return None;
        }
        u32::try_from(self.0 & 0x00ff_ffff_ffff_ffff).ok().map(NodeId)
    }

    /// Interface identifier (lower 64 bits of an IPv6 address).
    #[inline]
    fn iid(self) -> [u16; 4] {
        let b = self.0;
        [(b >> 48) as u16, (b >> 32) as u16, (b >> 16) as u16, b as u16]
    }
}

impl fmt::Display for LinkAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}-{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

// ── IPv6 addressing ───────────────────────────────────────────────────────────

/// IPv6 address type used throughout the RPL layer.
pub type Address = Ipv6Addr;

/// Default global prefix (fd00::/64).
pub const DEFAULT_PREFIX: [u16; 4] = [0xfd00, 0, 0, 0];

/// Link-local prefix (fe80::/64).
pub const LINK_LOCAL_PREFIX: [u16; 4] = [0xfe80, 0, 0, 0];

/// The all-RPL-nodes multicast address (ff02::1a).
pub const ALL_RPL_NODES: Address = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0x1a);

fn with_prefix(prefix: [u16; 4], link: LinkAddr) -> Address {
    let [a, b, c, d] = link.iid();
    Ipv6Addr::new(prefix[0], prefix[1], prefix[2], prefix[3], a, b, c, d)
}

/// Global address of the node owning `link` under the default prefix.
#[inline]
pub fn global_addr(link: LinkAddr) -> Address {
    with_prefix(DEFAULT_PREFIX, link)
}

/// Link-local address of the node owning `link`.
#[inline]
pub fn link_local_addr(link: LinkAddr) -> Address {
    with_prefix(LINK_LOCAL_PREFIX, link)
}

/// Recover the link-layer address embedded in a derived IPv6 address.
pub fn link_of(addr: &Address) -> LinkAddr {
    let s = addr.segments();
    LinkAddr(
        ((s[4] as u64) << 48) | ((s[5] as u64) << 32) | ((s[6] as u64) << 16) | s[7] as u64,
    )
}
