use log::warn;

use super::{Engine, SeedingPolicy};
use crate::error::SirvdError;
use crate::intervention::InterventionScheduler;
use crate::numeric::almost_eq;
use crate::observables::Compartments;
use crate::rates::{RateSchedule, RateSource};

/// Relative tolerance for the population-conservation check.
const CONSERVATION_TOLERANCE: f64 = 1e-9;

/// Deterministic SIRVD model integrated with forward Euler steps over continuous quantities.
///
/// With `β, μ, ψ, ν, σ` the infection, recovery, fatality, vaccination and breakthrough rates and
/// `N = S + I + R + V + D`:
///
/// ```text
/// S' = -βSI/N - νS + σR
/// I' =  βSI/N - μI - ψI
/// R' =  μI - σR
/// V' =  νS
/// D' =  ψI
/// ```
///
/// The new-infection signal of a tick is the incidence flux `βSI/N` times the step size.
pub struct CompartmentalEngine {
    population: usize,
    compartments: Compartments,
    rates: RateSource,
    step_size: f64,
}

impl CompartmentalEngine {
    pub fn new(population: usize, rates: RateSource, step_size: f64) -> Result<Self, SirvdError> {
        if population == 0 {
            return Err(SirvdError::InvalidPopulation(population));
        }
        if !step_size.is_finite() || step_size <= 0.0 {
            return Err(SirvdError::InvalidStepSize(step_size));
        }
        rates.validate()?;
        #[allow(clippy::cast_precision_loss)]
        let compartments = Compartments {
            susceptible: population as f64,
            ..Compartments::default()
        };
        Ok(CompartmentalEngine {
            population,
            compartments,
            rates,
            step_size,
        })
    }

    #[must_use]
    pub fn compartments(&self) -> Compartments {
        self.compartments
    }
}

impl Engine for CompartmentalEngine {
    fn name(&self) -> &'static str {
        "compartmental"
    }

    fn population(&self) -> usize {
        self.population
    }

    fn set_interventions(&mut self, scheduler: InterventionScheduler) -> Result<(), SirvdError> {
        if scheduler.is_empty() {
            Ok(())
        } else {
            Err(SirvdError::InterventionsNotSupported)
        }
    }

    fn prepare(&mut self, ticks: usize) -> Result<(), SirvdError> {
        self.rates.ensure_covers(ticks)
    }

    #[allow(clippy::cast_precision_loss)]
    fn initialize_infection(&mut self, count: usize, policy: SeedingPolicy) -> Result<(), SirvdError> {
        if count > self.population {
            return Err(SirvdError::TooManyInitialInfections {
                requested: count,
                population: self.population,
            });
        }
        if policy != SeedingPolicy::Random {
            warn!("the compartmental model does not support targeted infection, seeding uniformly");
        }
        self.compartments = Compartments {
            susceptible: (self.population - count) as f64,
            infected: count as f64,
            ..Compartments::default()
        };
        Ok(())
    }

    fn evolve(&mut self, tick: usize) -> Result<f64, SirvdError> {
        let rates = self.rates.rates_at(tick)?;
        let Compartments {
            susceptible: s,
            infected: i,
            recovered: r,
            vaccinated: v,
            dead: d,
        } = self.compartments;
        let total = self.compartments.total();
        let dt = self.step_size;

        let incidence = if total > 0.0 {
            rates.infection_rate * s * i / total
        } else {
            0.0
        };
        self.compartments = Compartments {
            susceptible: s + (-incidence - rates.vaccination_rate * s + rates.breakthrough_rate * r) * dt,
            infected: i + (incidence - rates.recovery_rate * i - rates.fatality_rate * i) * dt,
            recovered: r + (rates.recovery_rate * i - rates.breakthrough_rate * r) * dt,
            vaccinated: v + rates.vaccination_rate * s * dt,
            dead: d + rates.fatality_rate * i * dt,
        };

        let new_total = self.compartments.total();
        if !almost_eq(new_total, total, CONSERVATION_TOLERANCE * total.max(1.0)) {
            warn!("tick {tick}: compartment total drifted from {total} to {new_total}");
        }
        Ok(incidence * dt)
    }

    fn record_state(&self) -> Compartments {
        self.compartments
    }

    fn parameters(&self, ticks: usize) -> Result<RateSchedule, SirvdError> {
        self.rates.series(ticks)
    }
}
