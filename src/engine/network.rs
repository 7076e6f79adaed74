use std::cmp::Reverse;

use log::{debug, trace};

use super::{Engine, SeedingPolicy};
use crate::define_rng;
use crate::error::SirvdError;
use crate::graph::{ContactGraph, NodeId, Topology};
use crate::intervention::{DynamicTopology, InterventionScheduler};
use crate::observables::Compartments;
use crate::random::{sample_multiple_from_known_length, RngStore};
use crate::rates::{RateSchedule, RateSource};
use crate::status::{next_state, InfectionStatus, Neighborhood};

define_rng!(GraphRng);
define_rng!(SeedingRng);
define_rng!(NodeRng);

/// Stochastic SIRVD dynamics on a contact graph.
///
/// Every tick evaluates all nodes against the committed states and the graph as they stood at
/// the start of the tick, writes the results into a separate buffer and swaps it in at once.
/// Only then, if the topology is dynamic, are interventions and drift applied to the graph.
pub struct NetworkEngine {
    graph: ContactGraph,
    states: Vec<InfectionStatus>,
    next_states: Vec<InfectionStatus>,
    rates: RateSource,
    step_size: f64,
    dynamic: Option<DynamicTopology>,
    rngs: RngStore,
}

impl NetworkEngine {
    /// Generates the contact graph from `topology` and puts every node in Susceptible.
    pub fn new(
        population: usize,
        topology: Topology,
        rates: RateSource,
        step_size: f64,
        dynamic: Option<DynamicTopology>,
        seed: u64,
    ) -> Result<Self, SirvdError> {
        if population == 0 {
            return Err(SirvdError::InvalidPopulation(population));
        }
        let mut rngs = RngStore::new(seed);
        let graph = rngs.sample(GraphRng, |rng| topology.generate(population, rng))?;
        Self::assemble(graph, rates, step_size, dynamic, rngs)
    }

    /// Builds an engine over an existing graph.
    pub fn from_graph(
        graph: ContactGraph,
        rates: RateSource,
        step_size: f64,
        dynamic: Option<DynamicTopology>,
        seed: u64,
    ) -> Result<Self, SirvdError> {
        if graph.node_count() == 0 {
            return Err(SirvdError::InvalidPopulation(0));
        }
        Self::assemble(graph, rates, step_size, dynamic, RngStore::new(seed))
    }

    fn assemble(
        graph: ContactGraph,
        rates: RateSource,
        step_size: f64,
        dynamic: Option<DynamicTopology>,
        rngs: RngStore,
    ) -> Result<Self, SirvdError> {
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(SirvdError::InvalidStepSize(step_size));
        }
        rates.validate()?;
        let population = graph.node_count();
        Ok(NetworkEngine {
            graph,
            states: vec![InfectionStatus::Susceptible; population],
            next_states: vec![InfectionStatus::Susceptible; population],
            rates,
            step_size,
            dynamic,
            rngs,
        })
    }

    #[must_use]
    pub fn graph(&self) -> &ContactGraph {
        &self.graph
    }

    #[must_use]
    pub fn states(&self) -> &[InfectionStatus] {
        &self.states
    }

    #[must_use]
    pub fn is_dynamic(&self) -> bool {
        self.dynamic.is_some()
    }

    #[must_use]
    pub fn dynamic(&self) -> Option<&DynamicTopology> {
        self.dynamic.as_ref()
    }

    fn node_key(&self, tick: usize, node: NodeId) -> u64 {
        (tick as u64)
            .wrapping_mul(self.states.len() as u64)
            .wrapping_add(node as u64)
    }

    fn neighborhood(&self, node: NodeId) -> Neighborhood {
        let neighbors = self.graph.neighbors(node);
        Neighborhood {
            degree: neighbors.len(),
            infected_neighbors: neighbors
                .iter()
                .filter(|&&neighbor| self.states[neighbor] == InfectionStatus::Infected)
                .count(),
        }
    }

    /// Nodes ordered by initial degree, ties broken by node id.
    fn nodes_by_degree(&self, descending: bool) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self.graph.nodes().collect();
        if descending {
            nodes.sort_by_key(|&node| Reverse(self.graph.degree(node)));
        } else {
            nodes.sort_by_key(|&node| self.graph.degree(node));
        }
        nodes
    }
}

impl Engine for NetworkEngine {
    fn name(&self) -> &'static str {
        "network"
    }

    fn population(&self) -> usize {
        self.states.len()
    }

    fn set_interventions(&mut self, scheduler: InterventionScheduler) -> Result<(), SirvdError> {
        match &mut self.dynamic {
            Some(dynamic) => {
                dynamic.scheduler = scheduler;
                Ok(())
            }
            None if scheduler.is_empty() => Ok(()),
            None => Err(SirvdError::InterventionsRequireDynamicTopology),
        }
    }

    fn prepare(&mut self, ticks: usize) -> Result<(), SirvdError> {
        self.rates.ensure_covers(ticks)
    }

    fn initialize_infection(&mut self, count: usize, policy: SeedingPolicy) -> Result<(), SirvdError> {
        let population = self.population();
        if count > population {
            return Err(SirvdError::TooManyInitialInfections {
                requested: count,
                population,
            });
        }
        let seeded: Vec<NodeId> = match policy {
            SeedingPolicy::Random => self.rngs.sample(SeedingRng, |rng| {
                sample_multiple_from_known_length(rng, 0..population, count)
            }),
            SeedingPolicy::HighestDegree => self.nodes_by_degree(true).into_iter().take(count).collect(),
            SeedingPolicy::LowestDegree => self.nodes_by_degree(false).into_iter().take(count).collect(),
        };
        trace!("seeding infections at nodes {seeded:?}");
        for node in seeded {
            self.states[node] = InfectionStatus::Infected;
        }
        Ok(())
    }

    fn evolve(&mut self, tick: usize) -> Result<f64, SirvdError> {
        let rates = self.rates.rates_at(tick)?;
        let mut new_infections = 0usize;

        for node in self.graph.nodes() {
            let current = self.states[node];
            if current.is_absorbing() {
                self.next_states[node] = current;
                continue;
            }
            let neighborhood = if current == InfectionStatus::Susceptible {
                self.neighborhood(node)
            } else {
                Neighborhood::default()
            };
            let draw = self.rngs.uniform_for_key(NodeRng, self.node_key(tick, node));
            let transition = next_state(current, neighborhood, &rates, self.step_size, draw);
            if transition.newly_infected {
                new_infections += 1;
            }
            self.next_states[node] = transition.next;
        }
        std::mem::swap(&mut self.states, &mut self.next_states);

        if let Some(dynamic) = &mut self.dynamic {
            dynamic.apply(tick, &mut self.graph, &mut self.rngs);
        }
        debug!(
            "tick {tick}: {new_infections} new infections, {} edges",
            self.graph.edge_count()
        );
        #[allow(clippy::cast_precision_loss)]
        Ok(new_infections as f64)
    }

    fn record_state(&self) -> Compartments {
        Compartments::count(&self.states)
    }

    fn parameters(&self, ticks: usize) -> Result<RateSchedule, SirvdError> {
        self.rates.series(ticks)
    }
}
