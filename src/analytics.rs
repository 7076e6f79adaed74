//! Quantities derived from a finished run's observables.

use serde::{Deserialize, Serialize};

use crate::numeric::ratio_or_zero;
use crate::observables::Observables;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AdditionalData {
    /// `|new infections at t| / infected at t - 1`, zero at tick 0 and wherever nobody was
    /// infected the tick before.
    pub reproduction_rate: Vec<f64>,
    /// Tick at which the infected count first reached its maximum.
    pub infected_peak_time: usize,
    pub infected_peak: f64,
    /// First tick after 0 with fewer than one infected, or the number of recorded points if
    /// that never happens.
    pub epidemic_duration: usize,
    /// Final deaths over all infections of the run, seeds included. Zero if nobody was infected.
    pub case_fatality_rate: f64,
}

impl AdditionalData {
    #[must_use]
    pub fn compute(observables: &Observables) -> Self {
        let (infected_peak_time, infected_peak) = infected_peak(&observables.infected);
        AdditionalData {
            reproduction_rate: reproduction_rate(observables),
            infected_peak_time,
            infected_peak,
            epidemic_duration: epidemic_duration(&observables.infected),
            case_fatality_rate: case_fatality_rate(observables),
        }
    }
}

#[must_use]
pub fn epidemic_duration(infected: &[f64]) -> usize {
    infected
        .iter()
        .enumerate()
        .skip(1)
        .find(|&(_, &count)| count < 1.0)
        .map_or(infected.len(), |(tick, _)| tick)
}

#[must_use]
pub fn reproduction_rate(observables: &Observables) -> Vec<f64> {
    let mut series = Vec::with_capacity(observables.len());
    if observables.is_empty() {
        return series;
    }
    series.push(0.0);
    series.extend(
        observables
            .new_infected
            .iter()
            .skip(1)
            .zip(&observables.infected)
            .map(|(&new, &previous)| ratio_or_zero(new.abs(), previous)),
    );
    series
}

/// Position and value of the first maximum. `(0, 0.0)` for an empty series.
#[must_use]
pub fn infected_peak(infected: &[f64]) -> (usize, f64) {
    let mut peak = (0, infected.first().copied().unwrap_or(0.0));
    for (tick, &count) in infected.iter().enumerate().skip(1) {
        if count > peak.1 {
            peak = (tick, count);
        }
    }
    peak
}

#[must_use]
pub fn case_fatality_rate(observables: &Observables) -> f64 {
    let total_infected: f64 = observables.new_infected.iter().sum();
    let deaths = observables.dead.last().copied().unwrap_or(0.0);
    ratio_or_zero(deaths, total_infected)
}
