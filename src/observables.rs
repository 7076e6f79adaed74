//! Per-tick time series recorded by the driver.

use serde::{Deserialize, Serialize};

use crate::status::InfectionStatus;

/// Size of each compartment at one observation point. Network engines report whole
/// headcounts; the compartmental engine reports continuous quantities.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Compartments {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
    pub vaccinated: f64,
    pub dead: f64,
}

impl Compartments {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered + self.vaccinated + self.dead
    }

    /// Counts nodes per state.
    #[allow(clippy::cast_precision_loss)]
    pub fn count<'a>(states: impl IntoIterator<Item = &'a InfectionStatus>) -> Self {
        let mut counts = [0usize; 5];
        for status in states {
            counts[status.index()] += 1;
        }
        let [susceptible, infected, recovered, vaccinated, dead] = counts.map(|count| count as f64);
        Compartments {
            susceptible,
            infected,
            recovered,
            vaccinated,
            dead,
        }
    }
}

/// Ordered series, one entry per recorded tick (tick 0 included).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Observables {
    #[serde(rename = "Time")]
    pub time: Vec<f64>,
    #[serde(rename = "S")]
    pub susceptible: Vec<f64>,
    #[serde(rename = "I")]
    pub infected: Vec<f64>,
    #[serde(rename = "R")]
    pub recovered: Vec<f64>,
    #[serde(rename = "V")]
    pub vaccinated: Vec<f64>,
    #[serde(rename = "D")]
    pub dead: Vec<f64>,
    /// Newly infected during the tick; at tick 0 this is the number of seeded infections.
    #[serde(rename = "I_new")]
    pub new_infected: Vec<f64>,
}

impl Observables {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Observables {
            time: Vec::with_capacity(capacity),
            susceptible: Vec::with_capacity(capacity),
            infected: Vec::with_capacity(capacity),
            recovered: Vec::with_capacity(capacity),
            vaccinated: Vec::with_capacity(capacity),
            dead: Vec::with_capacity(capacity),
            new_infected: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, time: f64, compartments: Compartments, new_infected: f64) {
        self.time.push(time);
        self.susceptible.push(compartments.susceptible);
        self.infected.push(compartments.infected);
        self.recovered.push(compartments.recovered);
        self.vaccinated.push(compartments.vaccinated);
        self.dead.push(compartments.dead);
        self.new_infected.push(new_infected);
    }

    /// Number of recorded points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// The compartments recorded at position `index`.
    #[must_use]
    pub fn at(&self, index: usize) -> Option<Compartments> {
        (index < self.len()).then(|| Compartments {
            susceptible: self.susceptible[index],
            infected: self.infected[index],
            recovered: self.recovered[index],
            vaccinated: self.vaccinated[index],
            dead: self.dead[index],
        })
    }
}

#[cfg(test)]
mod test {
    use super::{Compartments, Observables};
    use crate::status::InfectionStatus;

    #[test]
    fn counts_states() {
        let states = [
            InfectionStatus::Susceptible,
            InfectionStatus::Infected,
            InfectionStatus::Susceptible,
            InfectionStatus::Dead,
        ];
        let counts = Compartments::count(&states);
        assert_eq!(counts.susceptible, 2.0);
        assert_eq!(counts.infected, 1.0);
        assert_eq!(counts.dead, 1.0);
        assert_eq!(counts.total(), 4.0);
        assert_eq!(counts.recovered, 0.0);
    }

    #[test]
    fn serializes_with_short_keys() {
        let mut observables = Observables::default();
        observables.record(0.0, Compartments { susceptible: 9.0, infected: 1.0, ..Default::default() }, 1.0);
        let json = serde_json::to_value(&observables).unwrap();
        assert_eq!(json["S"][0], 9.0);
        assert_eq!(json["I_new"][0], 1.0);
        assert_eq!(json["Time"][0], 0.0);
        assert_eq!(observables.at(0).unwrap().infected, 1.0);
        assert!(observables.at(1).is_none());
    }
}
