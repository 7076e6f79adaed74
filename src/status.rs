//! Per-node disease state and the transition rule applied to it once per tick.
//!
//! [`next_state`] is a pure function: given a node's committed state, what it can see of its
//! neighborhood, the tick's rates and one uniform draw, it returns the state the node will hold
//! after the tick. Competing exits share the draw as sequential thresholds: for a susceptible
//! node infection is tested first on `[0, p_inf)` and vaccination on `[p_inf, p_inf + p_vac)`.
//! When `p_inf + p_vac > 1` the remaining vaccination mass is simply unreachable; the
//! probabilities are not renormalized. The same holds for fatality then recovery.

use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter};

use crate::rates::Rates;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, EnumIter, EnumCount,
)]
pub enum InfectionStatus {
    #[serde(rename = "S")]
    Susceptible,
    #[serde(rename = "I")]
    Infected,
    #[serde(rename = "R")]
    Recovered,
    #[serde(rename = "V")]
    Vaccinated,
    #[serde(rename = "D")]
    Dead,
}

impl InfectionStatus {
    /// Vaccinated and Dead nodes never leave their state.
    #[must_use]
    pub fn is_absorbing(self) -> bool {
        matches!(self, InfectionStatus::Vaccinated | InfectionStatus::Dead)
    }

    /// Position of this state in a `[S, I, R, V, D]` array.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// What a node can see of the graph at the start of a tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Neighborhood {
    pub degree: usize,
    pub infected_neighbors: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Transition {
    pub next: InfectionStatus,
    /// Set only for a Susceptible -> Infected transition.
    pub newly_infected: bool,
}

impl Transition {
    fn to(next: InfectionStatus) -> Self {
        Transition {
            next,
            newly_infected: false,
        }
    }
}

/// Probability that a susceptible node with this neighborhood becomes infected in one tick.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn infection_probability(neighborhood: Neighborhood, infection_rate: f64, step_size: f64) -> f64 {
    if neighborhood.degree == 0 {
        return 0.0;
    }
    infection_rate * (neighborhood.infected_neighbors as f64 / neighborhood.degree as f64) * step_size
}

/// Computes the state of a node after one tick. `draw` is uniform on `[0, 1)`.
#[must_use]
pub fn next_state(
    current: InfectionStatus,
    neighborhood: Neighborhood,
    rates: &Rates,
    step_size: f64,
    draw: f64,
) -> Transition {
    match current {
        InfectionStatus::Susceptible => {
            let p_inf = infection_probability(neighborhood, rates.infection_rate, step_size);
            let p_vac = rates.vaccination_rate * step_size;
            if draw < p_inf {
                Transition {
                    next: InfectionStatus::Infected,
                    newly_infected: true,
                }
            } else if draw - p_inf < p_vac {
                Transition::to(InfectionStatus::Vaccinated)
            } else {
                Transition::to(current)
            }
        }
        InfectionStatus::Infected => {
            let p_fatal = rates.fatality_rate * step_size;
            let p_rec = rates.recovery_rate * step_size;
            if draw < p_fatal {
                Transition::to(InfectionStatus::Dead)
            } else if draw - p_fatal < p_rec {
                Transition::to(InfectionStatus::Recovered)
            } else {
                Transition::to(current)
            }
        }
        InfectionStatus::Recovered => {
            if draw < rates.breakthrough_rate * step_size {
                Transition::to(InfectionStatus::Susceptible)
            } else {
                Transition::to(current)
            }
        }
        InfectionStatus::Vaccinated | InfectionStatus::Dead => Transition::to(current),
    }
}

#[cfg(test)]
mod test {
    use strum::IntoEnumIterator;

    use super::{infection_probability, next_state, InfectionStatus, Neighborhood};
    use crate::rates::Rates;

    const ALL_ON: Rates = Rates {
        infection_rate: 1.0,
        recovery_rate: 1.0,
        fatality_rate: 1.0,
        vaccination_rate: 1.0,
        breakthrough_rate: 1.0,
    };

    fn exposed(infected_neighbors: usize, degree: usize) -> Neighborhood {
        Neighborhood {
            degree,
            infected_neighbors,
        }
    }

    #[test]
    fn indices_follow_compartment_order() {
        let indices: Vec<usize> = InfectionStatus::iter().map(InfectionStatus::index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn isolated_node_is_never_infected() {
        assert_eq!(infection_probability(exposed(0, 0), 5.0, 1.0), 0.0);
        let rates = Rates::new(0.5, 0.0, 0.0, 0.0, 0.0);
        for draw in [0.0, 0.25, 0.5, 0.999] {
            let transition = next_state(InfectionStatus::Susceptible, exposed(0, 0), &rates, 1.0, draw);
            assert_eq!(transition.next, InfectionStatus::Susceptible);
            assert!(!transition.newly_infected);
        }
    }

    #[test]
    fn susceptible_thresholds_are_sequential() {
        // p_inf = 0.5 * 2/4 = 0.25, p_vac = 0.5
        let rates = Rates::new(0.5, 0.0, 0.0, 0.5, 0.0);
        let neighborhood = exposed(2, 4);
        let at = |draw| next_state(InfectionStatus::Susceptible, neighborhood, &rates, 1.0, draw);
        assert!(at(0.1).newly_infected);
        assert_eq!(at(0.1).next, InfectionStatus::Infected);
        assert_eq!(at(0.3).next, InfectionStatus::Vaccinated);
        assert_eq!(at(0.74).next, InfectionStatus::Vaccinated);
        assert_eq!(at(0.8).next, InfectionStatus::Susceptible);
    }

    #[test]
    fn threshold_sum_above_one_is_not_renormalized() {
        // p_inf = 0.9, p_vac = 0.9: vaccination only reachable for draws in [0.9, 1).
        let rates = Rates::new(0.9, 0.0, 0.0, 0.9, 0.0);
        let at = |draw| next_state(InfectionStatus::Susceptible, exposed(1, 1), &rates, 1.0, draw).next;
        assert_eq!(at(0.89), InfectionStatus::Infected);
        assert_eq!(at(0.95), InfectionStatus::Vaccinated);
    }

    #[test]
    fn infected_thresholds_check_fatality_first() {
        let rates = Rates::new(0.0, 0.5, 0.1, 0.0, 0.0);
        let at = |draw| next_state(InfectionStatus::Infected, exposed(0, 3), &rates, 1.0, draw).next;
        assert_eq!(at(0.05), InfectionStatus::Dead);
        assert_eq!(at(0.3), InfectionStatus::Recovered);
        assert_eq!(at(0.7), InfectionStatus::Infected);
    }

    #[test]
    fn infected_threshold_sum_above_one_always_leaves() {
        // p_fatal = 0.6, p_rec = 0.7: recovery covers the rest of [0, 1), nobody stays infected.
        let rates = Rates::new(0.0, 0.7, 0.6, 0.0, 0.0);
        let at = |draw| next_state(InfectionStatus::Infected, exposed(0, 3), &rates, 1.0, draw).next;
        assert_eq!(at(0.0), InfectionStatus::Dead);
        assert_eq!(at(0.59), InfectionStatus::Dead);
        assert_eq!(at(0.61), InfectionStatus::Recovered);
        assert_eq!(at(0.99), InfectionStatus::Recovered);
    }

    #[test]
    fn step_size_scales_probabilities() {
        let rates = Rates::new(0.0, 0.0, 0.0, 0.0, 0.4);
        let at = |step, draw| next_state(InfectionStatus::Recovered, exposed(0, 0), &rates, step, draw).next;
        assert_eq!(at(1.0, 0.3), InfectionStatus::Susceptible);
        assert_eq!(at(0.5, 0.3), InfectionStatus::Recovered);
    }

    #[test]
    fn absorbing_states_never_change() {
        for status in [InfectionStatus::Vaccinated, InfectionStatus::Dead] {
            assert!(status.is_absorbing());
            for draw in [0.0, 0.5, 0.99] {
                let transition = next_state(status, exposed(5, 5), &ALL_ON, 1.0, draw);
                assert_eq!(transition.next, status);
                assert!(!transition.newly_infected);
            }
        }
    }
}
