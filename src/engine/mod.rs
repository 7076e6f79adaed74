//! Evolution strategies behind the simulation driver.
//!
//! An [`Engine`] owns the state of one run and knows how to seed it, advance it one tick and
//! report its compartments. Two implementations exist: the stochastic [`NetworkEngine`] and the
//! deterministic [`CompartmentalEngine`]. [`Model`] is the closed sum of both, chosen when the
//! configuration is built.

mod compartmental;
mod network;

pub use compartmental::CompartmentalEngine;
pub use network::NetworkEngine;
use serde::{Deserialize, Serialize};

use crate::error::SirvdError;
use crate::intervention::InterventionScheduler;
use crate::observables::Compartments;
use crate::rates::RateSchedule;

/// Rule for choosing which nodes start out infected.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedingPolicy {
    /// Uniform sample without replacement.
    #[default]
    Random,
    /// Nodes with the largest initial degree first.
    HighestDegree,
    /// Nodes with the smallest initial degree first.
    LowestDegree,
}

pub trait Engine {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn population(&self) -> usize;

    /// Installs scheduled interventions. Engines that cannot mutate a topology reject any
    /// non-empty schedule.
    fn set_interventions(&mut self, scheduler: InterventionScheduler) -> Result<(), SirvdError>;

    /// Checks, before anything runs, that the engine can execute `ticks` ticks.
    fn prepare(&mut self, ticks: usize) -> Result<(), SirvdError>;

    /// Marks `count` individuals as infected according to `policy`.
    fn initialize_infection(&mut self, count: usize, policy: SeedingPolicy) -> Result<(), SirvdError>;

    /// Advances to `tick` (ticks start at 1) and returns the number of new infections.
    fn evolve(&mut self, tick: usize) -> Result<f64, SirvdError>;

    fn record_state(&self) -> Compartments;

    /// Rates used by ticks `1..=ticks`.
    fn parameters(&self, ticks: usize) -> Result<RateSchedule, SirvdError>;
}

pub enum Model {
    Network(Box<NetworkEngine>),
    Compartmental(CompartmentalEngine),
}

impl From<NetworkEngine> for Model {
    fn from(engine: NetworkEngine) -> Self {
        Model::Network(Box::new(engine))
    }
}

impl From<CompartmentalEngine> for Model {
    fn from(engine: CompartmentalEngine) -> Self {
        Model::Compartmental(engine)
    }
}

impl Model {
    #[must_use]
    pub fn as_network(&self) -> Option<&NetworkEngine> {
        match self {
            Model::Network(engine) => Some(engine),
            Model::Compartmental(_) => None,
        }
    }

    fn engine(&self) -> &dyn Engine {
        match self {
            Model::Network(engine) => engine.as_ref(),
            Model::Compartmental(engine) => engine,
        }
    }

    fn engine_mut(&mut self) -> &mut dyn Engine {
        match self {
            Model::Network(engine) => engine.as_mut(),
            Model::Compartmental(engine) => engine,
        }
    }
}

impl Engine for Model {
    fn name(&self) -> &'static str {
        self.engine().name()
    }

    fn population(&self) -> usize {
        self.engine().population()
    }

    fn set_interventions(&mut self, scheduler: InterventionScheduler) -> Result<(), SirvdError> {
        self.engine_mut().set_interventions(scheduler)
    }

    fn prepare(&mut self, ticks: usize) -> Result<(), SirvdError> {
        self.engine_mut().prepare(ticks)
    }

    fn initialize_infection(&mut self, count: usize, policy: SeedingPolicy) -> Result<(), SirvdError> {
        self.engine_mut().initialize_infection(count, policy)
    }

    fn evolve(&mut self, tick: usize) -> Result<f64, SirvdError> {
        self.engine_mut().evolve(tick)
    }

    fn record_state(&self) -> Compartments {
        self.engine().record_state()
    }

    fn parameters(&self, ticks: usize) -> Result<RateSchedule, SirvdError> {
        self.engine().parameters(ticks)
    }
}
