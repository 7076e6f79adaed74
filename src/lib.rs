//! Epidemic simulation with the SIRVD model.
//!
//! Every individual is in one of five states: Susceptible, Infected, Recovered, Vaccinated or
//! Dead. A run advances a population through discrete ticks and records the size of each
//! compartment, plus the new infections, after every tick. Two engines implement the dynamics:
//!
//! * A stochastic network engine. Individuals are nodes of a contact graph (Erdős–Rényi,
//!   Barabási–Albert or Watts–Strogatz) and a susceptible node is infected with a probability
//!   that grows with the share of its infected neighbors. The graph may be static or dynamic;
//!   a dynamic graph drifts a little every tick and can be reshaped by lockdowns, which remove
//!   contacts for a window of ticks, and events, which add them.
//! * A deterministic compartmental engine that integrates the aggregate rate equations with a
//!   forward-Euler step.
//!
//! Rates are constant, given as per-tick schedules, or back-calculated from reported data with
//! the [`historical`] module. A run is normally described by a [`SimulationConfig`], validated
//! by [`SimulationConfig::build`] and executed by the [`SimulationDriver`], which returns a
//! [`SimulationResult`] with the observables, derived analytics and the rates that were used.
//!
//! Randomness comes from named streams seeded from a single base seed (see [`random`]), so two
//! runs with the same configuration and seed produce identical results.
pub mod analytics;
pub mod config;
pub mod driver;
pub mod engine;
pub mod error;
pub mod graph;
pub mod hashing;
pub mod historical;
pub mod intervention;
pub mod log;
pub mod macros;
pub mod numeric;
pub mod observables;
pub mod prelude;
pub mod progress;
pub mod random;
pub mod rates;
pub mod report;
pub mod result;
pub mod runner;
pub mod status;

pub use config::{Simulation, SimulationConfig};
pub use driver::{RunOptions, SimulationDriver};
pub use engine::{CompartmentalEngine, Engine, Model, NetworkEngine, SeedingPolicy};
pub use error::SirvdError;
pub use result::SimulationResult;

// Re-exports used by `define_rng!`
pub use paste;
pub use rand;
