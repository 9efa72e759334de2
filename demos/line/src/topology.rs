//! The demo network: a line of motes with a lossy link in the middle.

use rpl_core::NodeId;
use rpl_sim::{SimResult, Topology};

/// `count` motes in a line.  Links are symmetric with delivery ratio `pdr`,
/// except the middle hop, which drops roughly one frame in three.
pub fn build_line(count: usize, pdr: f64) -> SimResult<Topology> {
    let mut t = Topology::line(count, pdr)?;
    if count >= 3 {
        let mid = (count / 2) as u32;
        t.connect(NodeId(mid - 1), NodeId(mid), pdr.min(0.66))?;
    }
    Ok(t)
}
