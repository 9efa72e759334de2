//! Child → parent relations reported by DAOs, kept at the root.

use rpl_core::Address;
use rustc_hash::FxHashMap;

#[derive(Clone, Debug, Default)]
pub struct SourceRoutes {
    parents: FxHashMap<Address, Address>,
}

impl SourceRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record (or overwrite) the parent reported by `child`.
    pub fn insert(&mut self, child: Address, parent: Address) {
        self.parents.insert(child, parent);
    }

    pub fn parent_of(&self, child: &Address) -> Option<Address> {
        self.parents.get(child).copied()
    }

    /// Hops from `root` down to `dst`, `root` excluded, `dst` last.
    ///
    /// `None` when the chain breaks before reaching `root` or revisits an
    /// address.
    pub fn route(&self, root: Address, dst: Address) -> Option<Vec<Address>> {
        let mut route = Vec::new();
        let mut cur = dst;
        while cur != root {
            route.push(cur);
            cur = self.parent_of(&cur)?;
            if route.contains(&cur) {
                tracing::debug!(%dst, at = %cur, "routing loop in DAO parent chain");
                return None;
            }
        }
        route.reverse();
        Some(route)
    }

    pub fn len(&self) -> usize {
        self.parents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}
