//! The in-memory configuration of a run and its JSON form.
//!
//! ```json
//! {
//!   "population": 1000,
//!   "duration": 100.0,
//!   "step_size": 1.0,
//!   "initial_infected": 5,
//!   "seeding": "highest_degree",
//!   "seed": 42,
//!   "model": {
//!     "network": {
//!       "topology": { "kind": "watts_strogatz", "parameters": { "k": 6, "p": 0.05 } },
//!       "dynamic": { "drift_add": 0.01, "drift_remove": 0.01 }
//!     }
//!   },
//!   "rates": {
//!     "constant": { "infection_rate": 0.3, "recovery_rate": 0.1, "fatality_rate": 0.001,
//!                   "vaccination_rate": 0.0, "breakthrough_rate": 0.0 }
//!   },
//!   "interventions": { "lockdowns": [[10, 30]], "events": [[50, 52]] }
//! }
//! ```
//!
//! `model` may also be `"compartmental"`, and `rates` may be a `schedule` of five sequences or a
//! `historical` extraction. Every check that can fail happens in [`SimulationConfig::build`], so
//! a [`Simulation`] that was built runs all of its ticks unless the engine itself fails.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::driver::{RunOptions, SimulationDriver};
use crate::engine::{CompartmentalEngine, Engine, Model, NetworkEngine, SeedingPolicy};
use crate::error::SirvdError;
use crate::graph::Topology;
use crate::hashing::HashMap;
use crate::historical::{CsvDataProvider, ParameterExtractor};
use crate::intervention::{
    BackgroundDrift, DynamicTopology, InterventionKind, InterventionScheduler, InterventionWindow,
    DEFAULT_DRIFT_FRACTION, DEFAULT_EVENT_AGGREGATION, DEFAULT_LOCKDOWN_REDUCTION,
};
use crate::rates::{RateSchedule, RateSource, Rates};
use crate::result::SimulationResult;

fn default_step_size() -> f64 {
    1.0
}

fn default_initial_infected() -> usize {
    1
}

fn default_drift_fraction() -> f64 {
    DEFAULT_DRIFT_FRACTION
}

fn default_lockdown_reduction() -> f64 {
    DEFAULT_LOCKDOWN_REDUCTION
}

fn default_event_aggregation() -> f64 {
    DEFAULT_EVENT_AGGREGATION
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    pub population: usize,
    /// Simulated time span. May be omitted when the rates come from a schedule, in which case
    /// the run covers the whole schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default = "default_step_size")]
    pub step_size: f64,
    #[serde(default = "default_initial_infected")]
    pub initial_infected: usize,
    #[serde(default)]
    pub seeding: SeedingPolicy,
    #[serde(default)]
    pub seed: u64,
    pub model: ModelConfig,
    pub rates: RatesConfig,
    #[serde(default)]
    pub interventions: InterventionsConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelConfig {
    Network {
        topology: TopologyConfig,
        /// Present for a network whose edges change between ticks.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        dynamic: Option<DriftConfig>,
    },
    Compartmental,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TopologyConfig {
    pub kind: String,
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DriftConfig {
    #[serde(default = "default_drift_fraction")]
    pub drift_add: f64,
    #[serde(default = "default_drift_fraction")]
    pub drift_remove: f64,
}

impl Default for DriftConfig {
    fn default() -> Self {
        DriftConfig {
            drift_add: DEFAULT_DRIFT_FRACTION,
            drift_remove: DEFAULT_DRIFT_FRACTION,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatesConfig {
    Constant(Rates),
    Schedule(RateSchedule),
    Historical(HistoricalConfig),
}

/// Rates back-calculated from reported data in `data_dir` (see [`CsvDataProvider`]).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoricalConfig {
    pub data_dir: PathBuf,
    pub country: String,
    /// First day of the schedule, inclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<NaiveDate>,
    /// Last day of the schedule, exclusive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<NaiveDate>,
    pub average_recovery_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_breakthrough_time: Option<f64>,
    /// JSON file the extraction is read from if it exists and written to otherwise.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache: Option<PathBuf>,
}

/// Lockdown and event windows, `[start, end]` in ticks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InterventionsConfig {
    #[serde(default)]
    pub lockdowns: Vec<(usize, usize)>,
    #[serde(default)]
    pub events: Vec<(usize, usize)>,
    #[serde(default = "default_lockdown_reduction")]
    pub lockdown_reduction: f64,
    #[serde(default = "default_event_aggregation")]
    pub event_aggregation: f64,
}

impl Default for InterventionsConfig {
    fn default() -> Self {
        InterventionsConfig {
            lockdowns: Vec::new(),
            events: Vec::new(),
            lockdown_reduction: DEFAULT_LOCKDOWN_REDUCTION,
            event_aggregation: DEFAULT_EVENT_AGGREGATION,
        }
    }
}

impl TopologyConfig {
    pub fn resolve(&self) -> Result<Topology, SirvdError> {
        Topology::from_kind(&self.kind, &self.parameters)
    }
}

impl RatesConfig {
    /// Builds the rate source, reading historical data if needed.
    pub fn build(&self, population: usize) -> Result<RateSource, SirvdError> {
        let source = match self {
            RatesConfig::Constant(rates) => RateSource::Constant(*rates),
            RatesConfig::Schedule(schedule) => RateSource::Schedule(schedule.clone()),
            RatesConfig::Historical(historical) => RateSource::Schedule(historical.schedule(population)?),
        };
        source.validate()?;
        Ok(source)
    }
}

impl HistoricalConfig {
    pub fn schedule(&self, population: usize) -> Result<RateSchedule, SirvdError> {
        let extractor = ParameterExtractor::new(
            population,
            self.average_recovery_time,
            self.average_breakthrough_time,
        )?;
        let provider = CsvDataProvider::from_dir(&self.data_dir);
        let extracted = extractor
            .extract_cached(&provider, &self.country, self.cache.as_deref())?
            .window(self.start, self.end);
        if extracted.schedule.is_empty() {
            return Err(SirvdError::InsufficientHistoricalData(format!(
                "no rates for {} between {:?} and {:?}",
                self.country, self.start, self.end
            )));
        }
        info!(
            "historical schedule for {}: {} days from {}",
            self.country,
            extracted.schedule.len(),
            extracted.time[0]
        );
        Ok(extracted.schedule)
    }
}

impl InterventionsConfig {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lockdowns.is_empty() && self.events.is_empty()
    }

    pub fn scheduler(&self) -> Result<InterventionScheduler, SirvdError> {
        let lockdowns = self
            .lockdowns
            .iter()
            .map(|&(start, end)| InterventionWindow::new(InterventionKind::Lockdown, start, end));
        let events = self
            .events
            .iter()
            .map(|&(start, end)| InterventionWindow::new(InterventionKind::Event, start, end));
        let windows = lockdowns.chain(events).collect::<Result<Vec<_>, _>>()?;
        InterventionScheduler::new(windows, self.lockdown_reduction, self.event_aggregation)
    }
}

impl SimulationConfig {
    /// Reads a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SirvdError> {
        let path = path.as_ref();
        debug!("loading configuration from {}", path.display());
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SirvdError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validates the configuration and constructs the engine. Nothing is simulated yet; every
    /// configuration error surfaces here.
    pub fn build(&self) -> Result<Simulation, SirvdError> {
        if self.population == 0 {
            return Err(SirvdError::InvalidPopulation(self.population));
        }
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(SirvdError::InvalidStepSize(self.step_size));
        }
        if self.initial_infected > self.population {
            return Err(SirvdError::TooManyInitialInfections {
                requested: self.initial_infected,
                population: self.population,
            });
        }

        let rates = self.rates.build(self.population)?;
        #[allow(clippy::cast_precision_loss)]
        let duration = match (self.duration, rates.len()) {
            (Some(duration), _) => duration,
            (None, Some(length)) => length as f64 * self.step_size,
            (None, None) => {
                return Err(SirvdError::SirvdError(
                    "`duration` is required with constant rates".to_string(),
                ))
            }
        };
        let options = RunOptions {
            duration,
            step_size: self.step_size,
            initial_infected: self.initial_infected,
            seeding: self.seeding,
            progress: false,
        };
        rates.ensure_covers(options.ticks()?)?;
        let scheduler = self.interventions.scheduler()?;

        let mut model: Model = match &self.model {
            ModelConfig::Network { topology, dynamic } => {
                let topology = topology.resolve()?;
                if dynamic.is_none() && !scheduler.is_empty() {
                    return Err(SirvdError::InterventionsRequireDynamicTopology);
                }
                let dynamic = dynamic
                    .map(|drift| -> Result<DynamicTopology, SirvdError> {
                        Ok(DynamicTopology {
                            scheduler: InterventionScheduler::new(
                                Vec::new(),
                                DEFAULT_LOCKDOWN_REDUCTION,
                                DEFAULT_EVENT_AGGREGATION,
                            )?,
                            drift: BackgroundDrift::new(drift.drift_add, drift.drift_remove)?,
                        })
                    })
                    .transpose()?;
                NetworkEngine::new(
                    self.population,
                    topology,
                    rates,
                    self.step_size,
                    dynamic,
                    self.seed,
                )?
                .into()
            }
            ModelConfig::Compartmental => {
                CompartmentalEngine::new(self.population, rates, self.step_size)?.into()
            }
        };
        model.set_interventions(scheduler)?;
        info!("built {} model for {} individuals", model.name(), self.population);
        Ok(Simulation { model, options })
    }
}

/// A validated model ready to run.
pub struct Simulation {
    pub model: Model,
    pub options: RunOptions,
}

impl Simulation {
    #[must_use]
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.options.progress = progress;
        self
    }

    pub fn into_driver(self) -> SimulationDriver<Model> {
        SimulationDriver::new(self.model, self.options)
    }

    pub fn run(self) -> Result<SimulationResult, SirvdError> {
        self.into_driver().run()
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use tempfile::tempdir;

    use super::{ModelConfig, RatesConfig, SimulationConfig};
    use crate::engine::{Engine, SeedingPolicy};
    use crate::error::SirvdError;

    fn network_config(extra: &str) -> String {
        format!(
            r#"{{
                "population": 100,
                "duration": 10.0,
                "initial_infected": 3,
                "seed": 7,
                "model": {{ "network": {{ "topology": {{ "kind": "erdos_renyi", "parameters": {{ "p": 0.1 }} }} {extra} }} }},
                "rates": {{ "constant": {{ "infection_rate": 0.4, "recovery_rate": 0.1,
                    "fatality_rate": 0.01, "vaccination_rate": 0.0, "breakthrough_rate": 0.0 }} }},
                "interventions": {{ "lockdowns": [[2, 5]] }}
            }}"#
        )
    }

    #[test]
    fn defaults_are_filled_in() {
        let config = SimulationConfig::from_json_str(
            r#"{ "population": 50, "duration": 5, "model": "compartmental",
                 "rates": { "constant": { "infection_rate": 0.3, "recovery_rate": 0.1,
                 "fatality_rate": 0.0, "vaccination_rate": 0.0, "breakthrough_rate": 0.0 } } }"#,
        )
        .unwrap();
        assert_eq!(config.step_size, 1.0);
        assert_eq!(config.initial_infected, 1);
        assert_eq!(config.seeding, SeedingPolicy::Random);
        assert_eq!(config.model, ModelConfig::Compartmental);
        assert!(config.interventions.is_empty());
        assert!(matches!(config.rates, RatesConfig::Constant(_)));

        let simulation = config.build().unwrap();
        assert_eq!(simulation.model.name(), "compartmental");
        assert_eq!(simulation.options.ticks().unwrap(), 5);
    }

    #[test]
    fn dynamic_network_accepts_windows() {
        let config =
            SimulationConfig::from_json_str(&network_config(r#", "dynamic": { "drift_add": 0.0 }"#))
                .unwrap();
        let simulation = config.build().unwrap();
        let network = simulation.model.as_network().unwrap();
        assert!(network.is_dynamic());
        assert_eq!(network.dynamic().unwrap().scheduler.windows().count(), 1);

        let result = simulation.run().unwrap();
        assert_eq!(result.observables.len(), 11);
    }

    #[test]
    fn static_network_rejects_windows() {
        let config = SimulationConfig::from_json_str(&network_config("")).unwrap();
        assert!(matches!(
            config.build(),
            Err(SirvdError::InterventionsRequireDynamicTopology)
        ));
    }

    #[test]
    fn compartmental_rejects_windows() {
        let mut config = SimulationConfig::from_json_str(&network_config("")).unwrap();
        config.model = ModelConfig::Compartmental;
        assert!(matches!(config.build(), Err(SirvdError::InterventionsNotSupported)));
    }

    #[test]
    fn unknown_topology_is_rejected() {
        let json = network_config("").replace("erdos_renyi", "hypercube");
        let config = SimulationConfig::from_json_str(&json).unwrap();
        assert!(matches!(
            config.build(),
            Err(SirvdError::UnsupportedTopology(kind)) if kind == "hypercube"
        ));
    }

    #[test]
    fn schedule_sets_duration_and_must_cover_it() {
        let json = r#"{
            "population": 100,
            "model": "compartmental",
            "rates": { "schedule": {
                "infection_rate": [0.3, 0.3, 0.3, 0.3, 0.3],
                "recovery_rate": [0.1, 0.1, 0.1, 0.1, 0.1],
                "fatality_rate": [0.0, 0.0, 0.0, 0.0, 0.0],
                "vaccination_rate": [0.0, 0.0, 0.0, 0.0, 0.0],
                "breakthrough_rate": [0.0, 0.0, 0.0, 0.0, 0.0] } }
        }"#;
        let mut config = SimulationConfig::from_json_str(json).unwrap();
        let simulation = config.build().unwrap();
        assert_eq!(simulation.options.ticks().unwrap(), 5);
        assert_eq!(simulation.run().unwrap().parameters.len(), 5);

        config.duration = Some(6.0);
        assert!(matches!(
            config.build(),
            Err(SirvdError::RateScheduleExhausted { tick: 6, length: 5 })
        ));
    }

    #[test]
    fn mismatched_schedule_is_rejected() {
        let json = r#"{
            "population": 100, "duration": 2,
            "model": "compartmental",
            "rates": { "schedule": {
                "infection_rate": [0.3, 0.3], "recovery_rate": [0.1],
                "fatality_rate": [0.0, 0.0], "vaccination_rate": [0.0, 0.0],
                "breakthrough_rate": [0.0, 0.0] } }
        }"#;
        let config = SimulationConfig::from_json_str(json).unwrap();
        assert!(matches!(
            config.build(),
            Err(SirvdError::RateScheduleLengthMismatch { recovery: 1, .. })
        ));
    }

    #[test]
    fn constant_rates_need_a_duration() {
        let mut config = SimulationConfig::from_json_str(&network_config("")).unwrap();
        config.duration = None;
        assert!(matches!(config.build(), Err(SirvdError::SirvdError(_))));
    }

    #[test]
    fn too_many_initial_infections() {
        let mut config = SimulationConfig::from_json_str(&network_config(r#", "dynamic": {}"#)).unwrap();
        config.initial_infected = 101;
        assert!(matches!(
            config.build(),
            Err(SirvdError::TooManyInitialInfections {
                requested: 101,
                population: 100
            })
        ));
    }

    #[test]
    fn load_from_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, network_config(r#", "dynamic": {}"#)).unwrap();
        let config = SimulationConfig::load(&path).unwrap();
        assert_eq!(config.population, 100);
        assert_eq!(config.interventions.lockdowns, vec![(2, 5)]);
        assert!(matches!(
            SimulationConfig::load(temp_dir.path().join("absent.json")),
            Err(SirvdError::IoError(_))
        ));
    }

    #[test]
    fn historical_rates_from_csv() {
        let temp_dir = tempdir().unwrap();
        let dir = temp_dir.path();
        fs::write(
            dir.join("deaths.csv"),
            "Entity,Day,Data\nItaly,2021-01-01,0\nItaly,2021-01-04,1\nItaly,2021-01-07,0\n",
        )
        .unwrap();
        fs::write(
            dir.join("vaccinated.csv"),
            "Entity,Day,Data\nItaly,2021-01-01,0\nItaly,2021-01-07,0\n",
        )
        .unwrap();
        fs::write(
            dir.join("infected_cases.csv"),
            "Entity,Day,Data\nItaly,2021-01-01,2\nItaly,2021-01-03,4\nItaly,2021-01-07,4\n",
        )
        .unwrap();
        let json = format!(
            r#"{{
                "population": 1000,
                "model": "compartmental",
                "initial_infected": 2,
                "rates": {{ "historical": {{ "data_dir": {:?}, "country": "Italy",
                    "average_recovery_time": 7.0, "cache": {:?} }} }}
            }}"#,
            dir,
            dir.join("cache").join("italy.json")
        );
        let config = SimulationConfig::from_json_str(&json).unwrap();
        let simulation = config.build().unwrap();
        // Six aligned days; estimates start on the second, so four steps remain.
        assert_eq!(simulation.options.ticks().unwrap(), 4);
        assert!(dir.join("cache").join("italy.json").exists());
        assert_eq!(simulation.run().unwrap().parameters.len(), 4);
    }
}
