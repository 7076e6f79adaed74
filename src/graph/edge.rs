use std::fmt;

/// Stable index of a node in the fixed-size node table of a [`ContactGraph`](super::ContactGraph).
pub type NodeId = usize;

/// An undirected edge between two distinct nodes.
///
/// The endpoints are stored in ascending order so that `Edge::new(a, b) == Edge::new(b, a)`;
/// this is what lets edge sets be compared and recorded without caring about direction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    low: NodeId,
    high: NodeId,
}

impl Edge {
    /// Returns `None` for a self-loop.
    #[must_use]
    pub fn new(a: NodeId, b: NodeId) -> Option<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Some(Edge { low: a, high: b }),
            std::cmp::Ordering::Greater => Some(Edge { low: b, high: a }),
            std::cmp::Ordering::Equal => None,
        }
    }

    #[must_use]
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.low, self.high)
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.low, self.high)
    }
}
