//! Transition rates.
//!
//! A [`RateSource`] answers one question: which five rates apply to the transition into tick `t`?
//! Constant sources return the same [`Rates`] for every tick. Schedule sources hold five
//! equal-length sequences and return entry `t - 1`, so a schedule of length `T` drives exactly
//! `T` ticks. Asking for a tick past the end is a configuration error, reported by
//! [`RateSource::ensure_covers`] before the run starts.

use serde::{Deserialize, Serialize};

use crate::error::SirvdError;

/// The five per-unit-time rates of the SIRVD model.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rates {
    /// S -> I, scaled by the infected share of a node's neighbors (or by I/N in aggregate).
    pub infection_rate: f64,
    /// I -> R
    pub recovery_rate: f64,
    /// I -> D
    pub fatality_rate: f64,
    /// S -> V
    pub vaccination_rate: f64,
    /// R -> S
    pub breakthrough_rate: f64,
}

impl Rates {
    #[must_use]
    pub fn new(
        infection_rate: f64,
        recovery_rate: f64,
        fatality_rate: f64,
        vaccination_rate: f64,
        breakthrough_rate: f64,
    ) -> Self {
        Rates {
            infection_rate,
            recovery_rate,
            fatality_rate,
            vaccination_rate,
            breakthrough_rate,
        }
    }

    fn named(&self) -> [(&'static str, f64); 5] {
        [
            ("infection_rate", self.infection_rate),
            ("recovery_rate", self.recovery_rate),
            ("fatality_rate", self.fatality_rate),
            ("vaccination_rate", self.vaccination_rate),
            ("breakthrough_rate", self.breakthrough_rate),
        ]
    }

    /// Rates must be finite and non-negative. They may exceed 1; the per-tick probability
    /// is `rate * step_size` and is used as a threshold, not renormalized.
    pub fn validate(&self) -> Result<(), SirvdError> {
        for (name, value) in self.named() {
            if !value.is_finite() || value < 0.0 {
                return Err(SirvdError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}

/// Five rate sequences indexed by tick. Also used as the per-tick echo of the rates a run
/// actually used (the `parameters` group of a persisted result).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RateSchedule {
    pub infection_rate: Vec<f64>,
    pub recovery_rate: Vec<f64>,
    pub fatality_rate: Vec<f64>,
    pub vaccination_rate: Vec<f64>,
    pub breakthrough_rate: Vec<f64>,
}

impl RateSchedule {
    /// Builds a schedule, rejecting sequences of different lengths or invalid entries.
    pub fn new(
        infection_rate: Vec<f64>,
        recovery_rate: Vec<f64>,
        fatality_rate: Vec<f64>,
        vaccination_rate: Vec<f64>,
        breakthrough_rate: Vec<f64>,
    ) -> Result<Self, SirvdError> {
        let schedule = RateSchedule {
            infection_rate,
            recovery_rate,
            fatality_rate,
            vaccination_rate,
            breakthrough_rate,
        };
        schedule.validate()?;
        Ok(schedule)
    }

    pub fn validate(&self) -> Result<(), SirvdError> {
        let len = self.infection_rate.len();
        if [
            self.recovery_rate.len(),
            self.fatality_rate.len(),
            self.vaccination_rate.len(),
            self.breakthrough_rate.len(),
        ]
        .iter()
        .any(|&other| other != len)
        {
            return Err(SirvdError::RateScheduleLengthMismatch {
                infection: self.infection_rate.len(),
                recovery: self.recovery_rate.len(),
                fatality: self.fatality_rate.len(),
                vaccination: self.vaccination_rate.len(),
                breakthrough: self.breakthrough_rate.len(),
            });
        }
        (0..len).try_for_each(|index| self.entry(index).validate())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.infection_rate.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.infection_rate.is_empty()
    }

    fn entry(&self, index: usize) -> Rates {
        Rates {
            infection_rate: self.infection_rate[index],
            recovery_rate: self.recovery_rate[index],
            fatality_rate: self.fatality_rate[index],
            vaccination_rate: self.vaccination_rate[index],
            breakthrough_rate: self.breakthrough_rate[index],
        }
    }

    /// The rates at position `index`, if the schedule is long enough.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<Rates> {
        (index < self.len()).then(|| self.entry(index))
    }

    pub fn push(&mut self, rates: Rates) {
        self.infection_rate.push(rates.infection_rate);
        self.recovery_rate.push(rates.recovery_rate);
        self.fatality_rate.push(rates.fatality_rate);
        self.vaccination_rate.push(rates.vaccination_rate);
        self.breakthrough_rate.push(rates.breakthrough_rate);
    }

    /// The first `len` entries.
    #[must_use]
    pub fn truncated(&self, len: usize) -> RateSchedule {
        let take = |values: &Vec<f64>| values.iter().copied().take(len).collect();
        RateSchedule {
            infection_rate: take(&self.infection_rate),
            recovery_rate: take(&self.recovery_rate),
            fatality_rate: take(&self.fatality_rate),
            vaccination_rate: take(&self.vaccination_rate),
            breakthrough_rate: take(&self.breakthrough_rate),
        }
    }
}

impl FromIterator<Rates> for RateSchedule {
    fn from_iter<T: IntoIterator<Item = Rates>>(iter: T) -> Self {
        let mut schedule = RateSchedule::default();
        for rates in iter {
            schedule.push(rates);
        }
        schedule
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum RateSource {
    Constant(Rates),
    Schedule(RateSchedule),
}

impl RateSource {
    pub fn validate(&self) -> Result<(), SirvdError> {
        match self {
            RateSource::Constant(rates) => rates.validate(),
            RateSource::Schedule(schedule) => schedule.validate(),
        }
    }

    /// Number of ticks the source can drive, or `None` when unbounded.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            RateSource::Constant(_) => None,
            RateSource::Schedule(schedule) => Some(schedule.len()),
        }
    }

    /// The rates governing the transition into `tick` (ticks start at 1).
    pub fn rates_at(&self, tick: usize) -> Result<Rates, SirvdError> {
        match self {
            RateSource::Constant(rates) => Ok(*rates),
            RateSource::Schedule(schedule) => tick
                .checked_sub(1)
                .and_then(|index| schedule.get(index))
                .ok_or(SirvdError::RateScheduleExhausted {
                    tick,
                    length: schedule.len(),
                }),
        }
    }

    /// Fails if a run of `ticks` ticks would read past the end of the schedule.
    pub fn ensure_covers(&self, ticks: usize) -> Result<(), SirvdError> {
        match self.len() {
            Some(length) if length < ticks => Err(SirvdError::RateScheduleExhausted {
                tick: length + 1,
                length,
            }),
            _ => Ok(()),
        }
    }

    /// The rates used by each of the ticks `1..=ticks`.
    pub fn series(&self, ticks: usize) -> Result<RateSchedule, SirvdError> {
        self.ensure_covers(ticks)?;
        Ok(match self {
            RateSource::Constant(rates) => std::iter::repeat_n(*rates, ticks).collect(),
            RateSource::Schedule(schedule) => schedule.truncated(ticks),
        })
    }
}

#[cfg(test)]
mod test {
    use super::{RateSchedule, RateSource, Rates};
    use crate::error::SirvdError;

    fn schedule(len: usize) -> RateSchedule {
        (0..len)
            .map(|i| Rates::new(0.1 * i as f64, 0.2, 0.01, 0.0, 0.0))
            .collect()
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let result = RateSchedule::new(vec![0.1; 5], vec![0.1; 5], vec![0.1; 4], vec![0.0; 5], vec![0.0; 5]);
        assert!(matches!(
            result,
            Err(SirvdError::RateScheduleLengthMismatch { fatality: 4, infection: 5, .. })
        ));
    }

    #[test]
    fn negative_rates_are_rejected() {
        let rates = Rates::new(0.1, -0.2, 0.0, 0.0, 0.0);
        assert!(matches!(
            rates.validate(),
            Err(SirvdError::InvalidRate { name: "recovery_rate", .. })
        ));
        // Rates above one are legal.
        assert!(Rates::new(3.0, 0.0, 0.0, 2.0, 0.0).validate().is_ok());
    }

    #[test]
    fn schedule_is_indexed_from_tick_one() {
        let source = RateSource::Schedule(schedule(3));
        assert_eq!(source.rates_at(1).unwrap().infection_rate, 0.0);
        assert!((source.rates_at(3).unwrap().infection_rate - 0.2).abs() < 1e-12);
        assert!(matches!(
            source.rates_at(4),
            Err(SirvdError::RateScheduleExhausted { tick: 4, length: 3 })
        ));
        assert!(source.rates_at(0).is_err());
    }

    #[test]
    fn schedule_must_cover_run() {
        let source = RateSource::Schedule(schedule(5));
        assert!(source.ensure_covers(5).is_ok());
        assert!(matches!(
            source.ensure_covers(6),
            Err(SirvdError::RateScheduleExhausted { tick: 6, length: 5 })
        ));
    }

    #[test]
    fn constant_series_repeats() {
        let rates = Rates::new(0.3, 0.1, 0.0, 0.0, 0.0);
        let series = RateSource::Constant(rates).series(4).unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.get(3), Some(rates));
    }

    #[test]
    fn schedule_series_is_truncated_to_run() {
        let series = RateSource::Schedule(schedule(10)).series(4).unwrap();
        assert_eq!(series, schedule(4));
    }
}
