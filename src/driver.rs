//! The engine-agnostic simulation loop.
//!
//! A run validates everything that can fail up front (tick count, rate coverage), seeds the
//! initial infections, records tick 0, then evolves and records `ceil(duration / step_size)`
//! ticks before computing the derived analytics. Any error from the engine stops the run and is
//! returned to the caller; there are no partial results.

use log::info;

use crate::analytics::AdditionalData;
use crate::engine::{Engine, SeedingPolicy};
use crate::error::SirvdError;
use crate::observables::Observables;
use crate::progress::TimelineProgress;
use crate::result::SimulationResult;

/// Largest tick count a run may request.
pub const MAX_TICKS: u32 = u32::MAX;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RunOptions {
    /// Simulated time span of the run.
    pub duration: f64,
    /// Simulated time per tick.
    pub step_size: f64,
    pub initial_infected: usize,
    pub seeding: SeedingPolicy,
    /// Show a timeline progress bar.
    pub progress: bool,
}

impl RunOptions {
    /// Number of ticks needed to cover `duration`. Fails when that exceeds [`MAX_TICKS`].
    pub fn ticks(&self) -> Result<usize, SirvdError> {
        if !self.step_size.is_finite() || self.step_size <= 0.0 {
            return Err(SirvdError::InvalidStepSize(self.step_size));
        }
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(SirvdError::InvalidDuration(self.duration));
        }
        let ticks = (self.duration / self.step_size).ceil();
        if ticks > f64::from(MAX_TICKS) {
            return Err(SirvdError::InvalidDuration(self.duration));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Ok(ticks as usize)
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        RunOptions {
            duration: 100.0,
            step_size: 1.0,
            initial_infected: 1,
            seeding: SeedingPolicy::Random,
            progress: false,
        }
    }
}

pub struct SimulationDriver<E: Engine> {
    engine: E,
    options: RunOptions,
}

impl<E: Engine> SimulationDriver<E> {
    pub fn new(engine: E, options: RunOptions) -> Self {
        SimulationDriver { engine, options }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn into_engine(self) -> E {
        self.engine
    }

    /// Executes the run and returns its result.
    pub fn run(&mut self) -> Result<SimulationResult, SirvdError> {
        self.run_observed(|_, _| {})
    }

    /// Like [`run`](Self::run), calling `observer` with the tick and the engine after tick 0 is
    /// recorded and after every evolved tick.
    pub fn run_observed(
        &mut self,
        mut observer: impl FnMut(usize, &E),
    ) -> Result<SimulationResult, SirvdError> {
        let options = self.options;
        let ticks = options.ticks()?;
        self.engine.prepare(ticks)?;
        let parameters = self.engine.parameters(ticks)?;

        info!(
            "starting {} run: population {}, {} ticks of {}, {} initial infections",
            self.engine.name(),
            self.engine.population(),
            ticks,
            options.step_size,
            options.initial_infected
        );
        self.engine
            .initialize_infection(options.initial_infected, options.seeding)?;

        let mut observables = Observables::with_capacity(ticks + 1);
        #[allow(clippy::cast_precision_loss)]
        observables.record(0.0, self.engine.record_state(), options.initial_infected as f64);
        observer(0, &self.engine);

        let progress = options.progress.then(|| TimelineProgress::start(ticks));
        for tick in 1..=ticks {
            let new_infected = self.engine.evolve(tick)?;
            #[allow(clippy::cast_precision_loss)]
            let time = tick as f64 * options.step_size;
            observables.record(time, self.engine.record_state(), new_infected);
            observer(tick, &self.engine);
            if let Some(progress) = &progress {
                progress.update(tick);
            }
        }

        let additional_data = AdditionalData::compute(&observables);
        info!(
            "{} run finished: peak of {} infected at tick {}, epidemic duration {} ticks",
            self.engine.name(),
            additional_data.infected_peak,
            additional_data.infected_peak_time,
            additional_data.epidemic_duration
        );
        Ok(SimulationResult {
            observables,
            additional_data,
            parameters,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{RunOptions, SimulationDriver, MAX_TICKS};
    use crate::engine::{CompartmentalEngine, Engine, NetworkEngine, SeedingPolicy};
    use crate::error::SirvdError;
    use crate::graph::Topology;
    use crate::rates::{RateSchedule, RateSource, Rates};

    fn options(duration: f64, step_size: f64) -> RunOptions {
        RunOptions {
            duration,
            step_size,
            initial_infected: 5,
            ..RunOptions::default()
        }
    }

    #[test]
    fn tick_count_rounds_up() {
        assert_eq!(options(10.0, 1.0).ticks().unwrap(), 10);
        assert_eq!(options(10.0, 3.0).ticks().unwrap(), 4);
        assert_eq!(options(0.0, 1.0).ticks().unwrap(), 0);
        assert!(matches!(options(10.0, 0.0).ticks(), Err(SirvdError::InvalidStepSize(_))));
        assert!(matches!(options(-1.0, 1.0).ticks(), Err(SirvdError::InvalidDuration(_))));
    }

    #[test]
    fn tick_count_is_bounded() {
        assert!(matches!(options(1e30, 1.0).ticks(), Err(SirvdError::InvalidDuration(_))));
        assert!(matches!(options(1.0, 1e-300).ticks(), Err(SirvdError::InvalidDuration(_))));
        assert_eq!(options(f64::from(MAX_TICKS), 1.0).ticks().unwrap(), MAX_TICKS as usize);
    }

    #[test]
    fn records_initial_state_and_every_tick() {
        let rates = RateSource::Constant(Rates::new(0.3, 0.1, 0.0, 0.0, 0.0));
        let engine = CompartmentalEngine::new(1000, rates, 0.5).unwrap();
        let result = SimulationDriver::new(engine, options(10.0, 0.5)).run().unwrap();

        assert_eq!(result.observables.len(), 21);
        assert_eq!(result.ticks(), 20);
        assert_eq!(result.observables.time[0], 0.0);
        assert_eq!(result.observables.time[20], 10.0);
        assert_eq!(result.observables.new_infected[0], 5.0);
        assert_eq!(result.observables.infected[0], 5.0);
        assert_eq!(result.parameters.len(), 20);
        assert_eq!(result.additional_data.reproduction_rate.len(), 21);
    }

    #[test]
    fn short_schedule_fails_before_tick_zero() {
        let schedule: RateSchedule = std::iter::repeat_n(Rates::new(0.3, 0.1, 0.0, 0.0, 0.0), 5).collect();
        let engine = CompartmentalEngine::new(100, RateSource::Schedule(schedule), 1.0).unwrap();
        let mut driver = SimulationDriver::new(engine, options(6.0, 1.0));
        let mut observed = 0;
        let result = driver.run_observed(|_, _| observed += 1);
        assert!(matches!(
            result,
            Err(SirvdError::RateScheduleExhausted { tick: 6, length: 5 })
        ));
        assert_eq!(observed, 0);
        // The engine was never seeded.
        assert_eq!(driver.engine().record_state().infected, 0.0);
    }

    #[test]
    fn observer_sees_every_tick() {
        let rates = RateSource::Constant(Rates::new(0.5, 0.1, 0.01, 0.0, 0.0));
        let engine = NetworkEngine::new(200, Topology::ErdosRenyi { p: 0.05 }, rates, 1.0, None, 11).unwrap();
        let mut driver = SimulationDriver::new(
            engine,
            RunOptions {
                seeding: SeedingPolicy::HighestDegree,
                ..options(15.0, 1.0)
            },
        );
        let mut seen = Vec::new();
        let result = driver
            .run_observed(|tick, engine| {
                seen.push(tick);
                assert_eq!(engine.record_state().total(), 200.0);
            })
            .unwrap();
        assert_eq!(seen, (0..=15).collect::<Vec<_>>());
        assert_eq!(result.observables.len(), 16);
    }
}
