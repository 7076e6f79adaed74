pub use crate::analytics::AdditionalData;
pub use crate::config::{ModelConfig, RatesConfig, Simulation, SimulationConfig};
pub use crate::driver::{RunOptions, SimulationDriver};
pub use crate::engine::{CompartmentalEngine, Engine, Model, NetworkEngine, SeedingPolicy};
pub use crate::error::SirvdError;
pub use crate::graph::{ContactGraph, Edge, NodeId, Topology};
pub use crate::intervention::{
    BackgroundDrift, DynamicTopology, InterventionKind, InterventionScheduler, InterventionWindow,
};
pub use crate::log::{debug, error, info, trace, warn};
pub use crate::observables::{Compartments, Observables};
pub use crate::random::RngStore;
pub use crate::rates::{RateSchedule, RateSource, Rates};
pub use crate::result::SimulationResult;
pub use crate::status::InfectionStatus;
pub use crate::{assert_almost_eq, define_rng};
