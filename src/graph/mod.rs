//! A module for modeling contact networks.
//!
//! A [`ContactGraph`] is an undirected graph over a fixed population of nodes `0..N`. Nodes are
//! never added or removed after construction; only the edge set changes, and only between ticks
//! (interventions and background drift). During a tick the engine reads degrees and neighbor
//! lists against the graph as it stood when the tick started.
//!
//! Storage is arena-style: one adjacency list per node, indexed by [`NodeId`], plus an insertion
//! ordered edge set giving O(1) membership tests and O(1) access to the i-th edge for uniform
//! sampling. Mutation never fails: self-loops, duplicate insertions and removals of absent edges
//! are silently ignored, because an intervention may try to restore an edge that background
//! drift has already put back.

pub mod edge;
pub mod generators;

use std::collections::VecDeque;
use std::ops::Range;

pub use edge::{Edge, NodeId};
pub use generators::Topology;
use indexmap::IndexSet;
use rustc_hash::FxBuildHasher;

use crate::hashing::HashSet;
use crate::random::sample_multiple_from_known_length;
use crate::rand::Rng;

/// The underlying storage type representing the adjacency list
type AdjacencyList = Vec<NodeId>;
/// The set of all edges, iterated in a deterministic order
type EdgeSet = IndexSet<Edge, FxBuildHasher>;

#[derive(Clone, Debug, Default)]
pub struct ContactGraph {
    /// The backing storage vector for the adjacency lists.
    adjacency_lists: Vec<AdjacencyList>,
    edges: EdgeSet,
}

impl ContactGraph {
    /// Creates a graph with `node_count` isolated nodes.
    #[must_use]
    pub fn new(node_count: usize) -> Self {
        ContactGraph {
            adjacency_lists: vec![AdjacencyList::new(); node_count],
            edges: EdgeSet::default(),
        }
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adjacency_lists.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn nodes(&self) -> Range<NodeId> {
        0..self.node_count()
    }

    /// Number of neighbors of `node`. Nodes outside the graph have degree zero.
    #[must_use]
    pub fn degree(&self, node: NodeId) -> usize {
        self.adjacency_lists.get(node).map_or(0, Vec::len)
    }

    /// The neighbors of `node`, in no particular order.
    #[must_use]
    pub fn neighbors(&self, node: NodeId) -> &[NodeId] {
        self.adjacency_lists.get(node).map_or(&[], Vec::as_slice)
    }

    #[must_use]
    pub fn has_edge(&self, a: NodeId, b: NodeId) -> bool {
        Edge::new(a, b).is_some_and(|edge| self.edges.contains(&edge))
    }

    #[must_use]
    pub fn contains_edge(&self, edge: &Edge) -> bool {
        self.edges.contains(edge)
    }

    /// All edges in insertion order (modulo removals).
    pub fn edges(&self) -> impl ExactSizeIterator<Item = &Edge> {
        self.edges.iter()
    }

    /// The edge set as a sorted vector, convenient for comparing two graph states.
    #[must_use]
    pub fn sorted_edges(&self) -> Vec<Edge> {
        let mut edges: Vec<Edge> = self.edges.iter().copied().collect();
        edges.sort_unstable();
        edges
    }

    /// Inserts `edge`. Returns `false` (and leaves the graph unchanged) if the edge already exists
    /// or an endpoint is not a node of this graph.
    pub fn insert_edge(&mut self, edge: Edge) -> bool {
        let (a, b) = edge.endpoints();
        if b >= self.node_count() || !self.edges.insert(edge) {
            return false;
        }
        self.adjacency_lists[a].push(b);
        self.adjacency_lists[b].push(a);
        true
    }

    /// Removes `edge`. Returns `false` if it was not present.
    pub fn delete_edge(&mut self, edge: &Edge) -> bool {
        if !self.edges.swap_remove(edge) {
            return false;
        }
        let (a, b) = edge.endpoints();
        remove_neighbor(&mut self.adjacency_lists[a], b);
        remove_neighbor(&mut self.adjacency_lists[b], a);
        true
    }

    /// Adds an edge between `a` and `b`. Self-loops and duplicates are ignored.
    pub fn add_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        Edge::new(a, b).is_some_and(|edge| self.insert_edge(edge))
    }

    /// Removes the edge between `a` and `b` if there is one.
    pub fn remove_edge(&mut self, a: NodeId, b: NodeId) -> bool {
        Edge::new(a, b).is_some_and(|edge| self.delete_edge(&edge))
    }

    /// Adds every edge of `edges`, skipping those already present. Returns the number added.
    pub fn add_edges<'a>(&mut self, edges: impl IntoIterator<Item = &'a Edge>) -> usize {
        edges
            .into_iter()
            .filter(|edge| self.insert_edge(**edge))
            .count()
    }

    /// Removes every edge of `edges`, skipping those absent. Returns the number removed.
    pub fn remove_edges<'a>(&mut self, edges: impl IntoIterator<Item = &'a Edge>) -> usize {
        edges
            .into_iter()
            .filter(|edge| self.delete_edge(edge))
            .count()
    }

    /// Chooses `count` distinct present edges uniformly at random (fewer if the graph has fewer).
    pub fn sample_present_edges<R: Rng>(&self, rng: &mut R, count: usize) -> Vec<Edge> {
        self.sample_present_edges_excluding(rng, count, &HashSet::default())
    }

    /// Like [`sample_present_edges`](Self::sample_present_edges), never choosing an edge of
    /// `excluded`.
    pub fn sample_present_edges_excluding<R: Rng>(
        &self,
        rng: &mut R,
        count: usize,
        excluded: &HashSet<Edge>,
    ) -> Vec<Edge> {
        if excluded.is_empty() {
            return sample_multiple_from_known_length(rng, self.edges.iter().copied(), count);
        }
        let candidates: Vec<Edge> = self
            .edges
            .iter()
            .filter(|edge| !excluded.contains(edge))
            .copied()
            .collect();
        sample_multiple_from_known_length(rng, candidates, count)
    }

    /// Chooses `count` distinct node pairs that are not currently edges, by rejection sampling
    /// over uniformly drawn pairs. The request is capped at the number of absent pairs.
    pub fn sample_absent_edges<R: Rng>(&self, rng: &mut R, count: usize) -> Vec<Edge> {
        self.sample_absent_edges_excluding(rng, count, &HashSet::default())
    }

    /// Like [`sample_absent_edges`](Self::sample_absent_edges), never choosing a pair of
    /// `excluded`.
    pub fn sample_absent_edges_excluding<R: Rng>(
        &self,
        rng: &mut R,
        count: usize,
        excluded: &HashSet<Edge>,
    ) -> Vec<Edge> {
        let n = self.node_count();
        let excluded_absent = excluded
            .iter()
            .filter(|edge| edge.endpoints().1 < n && !self.edges.contains(*edge))
            .count();
        let absent_pairs = (n * n.saturating_sub(1) / 2)
            .saturating_sub(self.edge_count())
            .saturating_sub(excluded_absent);
        let count = count.min(absent_pairs);

        let mut chosen = EdgeSet::default();
        while chosen.len() < count {
            let a = rng.random_range(0..n);
            let b = rng.random_range(0..n);
            if let Some(edge) = Edge::new(a, b) {
                if !self.edges.contains(&edge) && !excluded.contains(&edge) {
                    chosen.insert(edge);
                }
            }
        }
        chosen.into_iter().collect()
    }

    /// Returns `true` if every node can reach every other node. The empty graph is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        let n = self.node_count();
        if n == 0 {
            return true;
        }
        let mut visited = vec![false; n];
        let mut queue = VecDeque::from([0]);
        visited[0] = true;
        let mut reached = 1;
        while let Some(node) = queue.pop_front() {
            for &neighbor in &self.adjacency_lists[node] {
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    reached += 1;
                    queue.push_back(neighbor);
                }
            }
        }
        reached == n
    }
}

fn remove_neighbor(list: &mut AdjacencyList, neighbor: NodeId) {
    if let Some(pos) = list.iter().position(|&n| n == neighbor) {
        list.swap_remove(pos);
    }
}

#[cfg(test)]
mod test {
    use super::{ContactGraph, Edge};
    use crate::rand::rngs::SmallRng;
    use crate::rand::SeedableRng;

    fn path_graph(n: usize) -> ContactGraph {
        let mut graph = ContactGraph::new(n);
        for i in 1..n {
            graph.add_edge(i - 1, i);
        }
        graph
    }

    #[test]
    fn add_edge() {
        let mut graph = ContactGraph::new(3);
        assert!(graph.add_edge(0, 2));
        assert!(graph.has_edge(2, 0));
        assert_eq!(graph.degree(0), 1);
        assert_eq!(graph.degree(2), 1);
        assert_eq!(graph.degree(1), 0);
        assert_eq!(graph.neighbors(0), &[2]);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn add_edge_twice_is_a_no_op() {
        let mut graph = ContactGraph::new(3);
        assert!(graph.add_edge(0, 1));
        assert!(!graph.add_edge(1, 0));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.degree(0), 1);
    }

    #[test]
    fn add_edge_to_self_is_a_no_op() {
        let mut graph = ContactGraph::new(3);
        assert!(!graph.add_edge(1, 1));
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(graph.degree(1), 0);
    }

    #[test]
    fn add_edge_outside_graph_is_a_no_op() {
        let mut graph = ContactGraph::new(3);
        assert!(!graph.add_edge(1, 7));
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn add_remove_add_edge() {
        let mut graph = ContactGraph::new(3);
        graph.add_edge(0, 1);
        assert!(graph.remove_edge(1, 0));
        assert!(!graph.has_edge(0, 1));
        assert_eq!(graph.degree(0), 0);
        assert!(graph.add_edge(0, 1));
        assert!(graph.has_edge(0, 1));
    }

    #[test]
    fn remove_nonexistent_edge() {
        let mut graph = ContactGraph::new(3);
        assert!(!graph.remove_edge(0, 1));
        assert!(!graph.remove_edge(0, 0));
    }

    #[test]
    fn bulk_add_and_remove_count_changes() {
        let mut graph = path_graph(4);
        let extra = [Edge::new(0, 1).unwrap(), Edge::new(0, 3).unwrap()];
        assert_eq!(graph.add_edges(&extra), 1);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(graph.remove_edges(&extra), 2);
        assert_eq!(graph.remove_edges(&extra), 0);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn remove_then_restore_gives_same_edge_set() {
        let mut graph = path_graph(10);
        graph.add_edge(0, 5);
        let before = graph.sorted_edges();
        let mut rng = SmallRng::seed_from_u64(9);
        let removed = graph.sample_present_edges(&mut rng, 4);
        assert_eq!(graph.remove_edges(&removed), 4);
        assert_eq!(graph.add_edges(&removed), 4);
        assert_eq!(graph.sorted_edges(), before);
    }

    #[test]
    fn sample_absent_edges_are_absent_and_distinct() {
        let graph = path_graph(6);
        let mut rng = SmallRng::seed_from_u64(1);
        let absent = graph.sample_absent_edges(&mut rng, 5);
        assert_eq!(absent.len(), 5);
        for edge in &absent {
            assert!(!graph.contains_edge(edge));
        }
        let mut sorted = absent.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 5);
    }

    #[test]
    fn sample_absent_edges_caps_at_complement() {
        // A path on 4 nodes has 3 edges out of 6 possible pairs.
        let graph = path_graph(4);
        let mut rng = SmallRng::seed_from_u64(1);
        assert_eq!(graph.sample_absent_edges(&mut rng, 100).len(), 3);
    }

    #[test]
    fn connectivity() {
        let mut graph = path_graph(5);
        assert!(graph.is_connected());
        graph.remove_edge(2, 3);
        assert!(!graph.is_connected());
        assert!(ContactGraph::new(0).is_connected());
        assert!(!ContactGraph::new(2).is_connected());
    }
}
