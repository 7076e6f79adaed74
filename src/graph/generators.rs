//! Random graph families used to build the initial contact network.
//!
//! The three generators follow the classic constructions: G(n, p) for uniform random graphs,
//! Barabási–Albert preferential attachment grown from a star, and Watts–Strogatz small-world
//! rewiring of a ring lattice, retried until the result is connected.

use std::fmt::{self, Display};

use log::trace;

use super::{ContactGraph, NodeId};
use crate::error::SirvdError;
use crate::hashing::{HashMap, HashSet};
use crate::rand::Rng;
use crate::random::sample_single_from_known_length;

/// Number of attempts made to draw a connected small-world graph.
pub const CONNECTED_WATTS_STROGATZ_TRIES: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Topology {
    /// Every pair of nodes is joined independently with probability `p`.
    ErdosRenyi { p: f64 },
    /// Each new node attaches to `m` existing nodes chosen proportionally to degree.
    BarabasiAlbert { m: usize },
    /// Ring lattice with `k` nearest neighbors, each edge rewired with probability `p`.
    WattsStrogatz { k: usize, p: f64 },
}

impl Topology {
    pub const ERDOS_RENYI: &'static str = "erdos_renyi";
    pub const BARABASI_ALBERT: &'static str = "barabasi_albert";
    pub const WATTS_STROGATZ: &'static str = "watts_strogatz";

    /// Resolves a topology by name, filling in defaults for missing parameters
    /// (`p = 0.1`, `m = 3`, `k = 4`). Unknown kinds and parameters the kind does not take are
    /// configuration errors.
    pub fn from_kind(kind: &str, parameters: &HashMap<String, f64>) -> Result<Self, SirvdError> {
        let (topology, accepted) = match kind {
            Self::ERDOS_RENYI => (Self::ERDOS_RENYI, &["p"] as &[&str]),
            Self::BARABASI_ALBERT => (Self::BARABASI_ALBERT, &["m"] as &[&str]),
            Self::WATTS_STROGATZ => (Self::WATTS_STROGATZ, &["k", "p"] as &[&str]),
            _ => return Err(SirvdError::UnsupportedTopology(kind.to_string())),
        };
        if let Some(unknown) = parameters
            .keys()
            .filter(|name| !accepted.contains(&name.as_str()))
            .min()
        {
            return Err(SirvdError::InvalidTopologyParameter {
                topology,
                parameter: unknown.clone(),
                reason: format!("not a parameter of this topology (expected {})", accepted.join(", ")),
            });
        }

        let get = |name: &str, default: f64| parameters.get(name).copied().unwrap_or(default);
        let topology = match kind {
            Self::ERDOS_RENYI => Topology::ErdosRenyi { p: get("p", 0.1) },
            Self::BARABASI_ALBERT => Topology::BarabasiAlbert {
                m: whole_number(Self::BARABASI_ALBERT, "m", get("m", 3.0))?,
            },
            Self::WATTS_STROGATZ => Topology::WattsStrogatz {
                k: whole_number(Self::WATTS_STROGATZ, "k", get("k", 4.0))?,
                p: get("p", 0.1),
            },
            _ => return Err(SirvdError::UnsupportedTopology(kind.to_string())),
        };
        topology.validate_probability()?;
        Ok(topology)
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Topology::ErdosRenyi { .. } => Self::ERDOS_RENYI,
            Topology::BarabasiAlbert { .. } => Self::BARABASI_ALBERT,
            Topology::WattsStrogatz { .. } => Self::WATTS_STROGATZ,
        }
    }

    fn validate_probability(&self) -> Result<(), SirvdError> {
        match *self {
            Topology::ErdosRenyi { p } | Topology::WattsStrogatz { p, .. }
                if !(0.0..=1.0).contains(&p) =>
            {
                Err(SirvdError::InvalidTopologyParameter {
                    topology: self.name(),
                    parameter: "p".to_string(),
                    reason: format!("{p} is not a probability"),
                })
            }
            _ => Ok(()),
        }
    }

    /// Checks the parameters against a population of `node_count` nodes.
    pub fn validate(&self, node_count: usize) -> Result<(), SirvdError> {
        self.validate_probability()?;
        match *self {
            Topology::ErdosRenyi { .. } => Ok(()),
            Topology::BarabasiAlbert { m } if m < 1 || m >= node_count => {
                Err(SirvdError::InvalidTopologyParameter {
                    topology: self.name(),
                    parameter: "m".to_string(),
                    reason: format!("must satisfy 1 <= m < {node_count}, got {m}"),
                })
            }
            Topology::WattsStrogatz { k, .. } if k < 2 || k > node_count => {
                Err(SirvdError::InvalidTopologyParameter {
                    topology: self.name(),
                    parameter: "k".to_string(),
                    reason: format!("must satisfy 2 <= k <= {node_count}, got {k}"),
                })
            }
            _ => Ok(()),
        }
    }

    /// Draws a graph with `node_count` nodes from this family.
    pub fn generate<R: Rng>(&self, node_count: usize, rng: &mut R) -> Result<ContactGraph, SirvdError> {
        self.validate(node_count)?;
        let graph = match *self {
            Topology::ErdosRenyi { p } => erdos_renyi(node_count, p, rng),
            Topology::BarabasiAlbert { m } => barabasi_albert(node_count, m, rng),
            Topology::WattsStrogatz { k, p } => connected_watts_strogatz(node_count, k, p, rng)?,
        };
        trace!(
            "generated {} graph with {} nodes and {} edges",
            self,
            graph.node_count(),
            graph.edge_count()
        );
        Ok(graph)
    }
}

impl Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Topology::ErdosRenyi { p } => write!(f, "{}(p={p})", self.name()),
            Topology::BarabasiAlbert { m } => write!(f, "{}(m={m})", self.name()),
            Topology::WattsStrogatz { k, p } => write!(f, "{}(k={k}, p={p})", self.name()),
        }
    }
}

fn whole_number(topology: &'static str, parameter: &'static str, value: f64) -> Result<usize, SirvdError> {
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(value as usize)
    } else {
        Err(SirvdError::InvalidTopologyParameter {
            topology,
            parameter: parameter.to_string(),
            reason: format!("expected a non-negative integer, got {value}"),
        })
    }
}

fn complete_graph(n: usize) -> ContactGraph {
    let mut graph = ContactGraph::new(n);
    for u in 0..n {
        for v in (u + 1)..n {
            graph.add_edge(u, v);
        }
    }
    graph
}

fn erdos_renyi<R: Rng>(n: usize, p: f64, rng: &mut R) -> ContactGraph {
    if p >= 1.0 {
        return complete_graph(n);
    }
    let mut graph = ContactGraph::new(n);
    if p <= 0.0 {
        return graph;
    }
    for u in 0..n {
        for v in (u + 1)..n {
            if rng.random::<f64>() < p {
                graph.add_edge(u, v);
            }
        }
    }
    graph
}

fn barabasi_albert<R: Rng>(n: usize, m: usize, rng: &mut R) -> ContactGraph {
    // Start from a star on m + 1 nodes centered on node 0.
    let mut graph = ContactGraph::new(n);
    for leaf in 1..=m {
        graph.add_edge(0, leaf);
    }
    // Each node appears once per incident edge, so uniform picks are degree-proportional.
    let mut repeated_nodes: Vec<NodeId> = (0..=m)
        .flat_map(|node| std::iter::repeat_n(node, graph.degree(node)))
        .collect();

    for source in (m + 1)..n {
        let mut targets: Vec<NodeId> = Vec::with_capacity(m);
        let mut seen = HashSet::default();
        while targets.len() < m {
            if let Some(&node) = sample_single_from_known_length(rng, repeated_nodes.iter()) {
                if seen.insert(node) {
                    targets.push(node);
                }
            }
        }
        for &target in &targets {
            graph.add_edge(source, target);
        }
        repeated_nodes.extend_from_slice(&targets);
        repeated_nodes.extend(std::iter::repeat_n(source, m));
    }
    graph
}

fn watts_strogatz<R: Rng>(n: usize, k: usize, p: f64, rng: &mut R) -> ContactGraph {
    if k == n {
        return complete_graph(n);
    }
    let mut graph = ContactGraph::new(n);
    for offset in 1..=(k / 2) {
        for u in 0..n {
            graph.add_edge(u, (u + offset) % n);
        }
    }
    for offset in 1..=(k / 2) {
        for u in 0..n {
            if rng.random::<f64>() >= p {
                continue;
            }
            let v = (u + offset) % n;
            let mut w = rng.random_range(0..n);
            let mut saturated = false;
            while w == u || graph.has_edge(u, w) {
                w = rng.random_range(0..n);
                if graph.degree(u) >= n - 1 {
                    saturated = true;
                    break;
                }
            }
            if !saturated {
                graph.remove_edge(u, v);
                graph.add_edge(u, w);
            }
        }
    }
    graph
}

fn connected_watts_strogatz<R: Rng>(
    n: usize,
    k: usize,
    p: f64,
    rng: &mut R,
) -> Result<ContactGraph, SirvdError> {
    for attempt in 1..=CONNECTED_WATTS_STROGATZ_TRIES {
        let graph = watts_strogatz(n, k, p, rng);
        if graph.is_connected() {
            return Ok(graph);
        }
        trace!("small-world attempt {attempt} was disconnected, retrying");
    }
    Err(SirvdError::GraphNotConnected {
        tries: CONNECTED_WATTS_STROGATZ_TRIES,
    })
}
