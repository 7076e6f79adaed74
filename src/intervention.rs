//! Structural changes to the contact graph between ticks.
//!
//! Two mechanisms run after the states of a tick are committed:
//!
//! * An [`InterventionScheduler`] walks each [`InterventionWindow`] through
//!   `Pending -> Active -> Closed`. When a lockdown opens it removes a fraction of the current
//!   edges, when an event opens it adds a fraction of new random edges, and in both cases the
//!   exact edge set touched is recorded on that window. Closing the window applies the inverse
//!   to the recorded set and releases it. Recordings are per window, so overlapping windows of
//!   the same kind never share or overwrite each other's edges. A window opening while windows
//!   of the other kind are active leaves their recorded edges alone.
//! * [`BackgroundDrift`] adds and removes a small fraction of edges every tick.
//!
//! Lockdowns are processed before events, and drift runs last.

use std::fmt::{self, Display};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::define_rng;
use crate::error::SirvdError;
use crate::graph::{ContactGraph, Edge};
use crate::hashing::HashSet;
use crate::rand::Rng;
use crate::random::RngStore;

define_rng!(InterventionRng);
define_rng!(DriftRng);

pub const DEFAULT_LOCKDOWN_REDUCTION: f64 = 0.9;
pub const DEFAULT_EVENT_AGGREGATION: f64 = 0.5;
pub const DEFAULT_DRIFT_FRACTION: f64 = 0.01;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionKind {
    /// Removes edges while active.
    Lockdown,
    /// Adds edges while active.
    Event,
}

impl Display for InterventionKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            InterventionKind::Lockdown => write!(f, "lockdown"),
            InterventionKind::Event => write!(f, "event"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InterventionWindow {
    pub kind: InterventionKind,
    pub start: usize,
    pub end: usize,
}

impl InterventionWindow {
    /// Windows open at the end of tick `start` and close at the end of tick `end`.
    /// Requires `1 <= start < end`.
    pub fn new(kind: InterventionKind, start: usize, end: usize) -> Result<Self, SirvdError> {
        if start == 0 || start >= end {
            return Err(SirvdError::InvalidInterventionWindow { start, end });
        }
        Ok(InterventionWindow { kind, start, end })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WindowState {
    Pending,
    Active,
    Closed,
}

#[derive(Debug)]
struct ScheduledWindow {
    window: InterventionWindow,
    state: WindowState,
    recorded: Vec<Edge>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn fraction_of(count: usize, fraction: f64) -> usize {
    (count as f64 * fraction).floor() as usize
}

fn check_fraction(name: &'static str, value: f64) -> Result<f64, SirvdError> {
    if (0.0..=1.0).contains(&value) {
        Ok(value)
    } else {
        Err(SirvdError::InvalidFraction { name, value })
    }
}

#[derive(Debug)]
pub struct InterventionScheduler {
    windows: Vec<ScheduledWindow>,
    lockdown_reduction: f64,
    event_aggregation: f64,
}

impl InterventionScheduler {
    /// `lockdown_reduction` is the fraction of current edges a lockdown removes;
    /// `event_aggregation` is the number of edges an event adds, as a fraction of current edges.
    pub fn new(
        windows: impl IntoIterator<Item = InterventionWindow>,
        lockdown_reduction: f64,
        event_aggregation: f64,
    ) -> Result<Self, SirvdError> {
        let mut windows: Vec<ScheduledWindow> = windows
            .into_iter()
            .map(|window| ScheduledWindow {
                window,
                state: WindowState::Pending,
                recorded: Vec::new(),
            })
            .collect();
        // Stable, so windows of one kind keep their configured order.
        windows.sort_by_key(|scheduled| scheduled.window.kind);
        Ok(InterventionScheduler {
            windows,
            lockdown_reduction: check_fraction("lockdown_reduction", lockdown_reduction)?,
            event_aggregation: check_fraction("event_aggregation", event_aggregation)?,
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn windows(&self) -> impl Iterator<Item = (&InterventionWindow, WindowState)> {
        self.windows
            .iter()
            .map(|scheduled| (&scheduled.window, scheduled.state))
    }

    /// Edges currently held by the `index`-th window (in processing order).
    #[must_use]
    pub fn recorded_edges(&self, index: usize) -> &[Edge] {
        self.windows
            .get(index)
            .map_or(&[], |scheduled| scheduled.recorded.as_slice())
    }

    /// Edges recorded by the active windows of `kind`.
    fn held_by_active(&self, kind: InterventionKind) -> HashSet<Edge> {
        self.windows
            .iter()
            .filter(|scheduled| scheduled.state == WindowState::Active && scheduled.window.kind == kind)
            .flat_map(|scheduled| scheduled.recorded.iter().copied())
            .collect()
    }

    /// Opens every pending window starting at `tick` and closes every active window ending at
    /// `tick`.
    ///
    /// An opening window never touches an edge recorded by an active window of the other kind,
    /// so every window can revert exactly what it changed however lockdowns and events overlap.
    pub fn apply<R: Rng>(&mut self, tick: usize, graph: &mut ContactGraph, rng: &mut R) {
        for index in 0..self.windows.len() {
            let window = self.windows[index].window;
            match self.windows[index].state {
                WindowState::Pending if tick == window.start => {
                    let recorded = match window.kind {
                        InterventionKind::Lockdown => {
                            let held = self.held_by_active(InterventionKind::Event);
                            let count = fraction_of(graph.edge_count(), self.lockdown_reduction);
                            let removed = graph.sample_present_edges_excluding(rng, count, &held);
                            graph.remove_edges(&removed);
                            removed
                        }
                        InterventionKind::Event => {
                            let held = self.held_by_active(InterventionKind::Lockdown);
                            let count = fraction_of(graph.edge_count(), self.event_aggregation);
                            let added = graph.sample_absent_edges_excluding(rng, count, &held);
                            graph.add_edges(&added);
                            added
                        }
                    };
                    info!(
                        "{} #{index} opened at tick {tick}: {} edges {}",
                        window.kind,
                        recorded.len(),
                        match window.kind {
                            InterventionKind::Lockdown => "removed",
                            InterventionKind::Event => "added",
                        }
                    );
                    let scheduled = &mut self.windows[index];
                    scheduled.recorded = recorded;
                    scheduled.state = WindowState::Active;
                }
                WindowState::Active if tick == window.end => {
                    let scheduled = &mut self.windows[index];
                    let recorded = std::mem::take(&mut scheduled.recorded);
                    scheduled.state = WindowState::Closed;
                    let changed = match window.kind {
                        InterventionKind::Lockdown => graph.add_edges(&recorded),
                        InterventionKind::Event => graph.remove_edges(&recorded),
                    };
                    info!(
                        "{} #{index} closed at tick {tick}: {changed} of {} recorded edges reverted",
                        window.kind,
                        recorded.len()
                    );
                }
                _ => {}
            }
        }
    }
}

/// Organic change of the network: each tick, `add_fraction` and `remove_fraction` of the
/// current edge count are added (as new random pairs) and removed (among present edges).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundDrift {
    add_fraction: f64,
    remove_fraction: f64,
}

impl BackgroundDrift {
    pub fn new(add_fraction: f64, remove_fraction: f64) -> Result<Self, SirvdError> {
        Ok(BackgroundDrift {
            add_fraction: check_fraction("drift_add", add_fraction)?,
            remove_fraction: check_fraction("drift_remove", remove_fraction)?,
        })
    }

    #[must_use]
    pub fn disabled() -> Self {
        BackgroundDrift {
            add_fraction: 0.0,
            remove_fraction: 0.0,
        }
    }

    /// Returns the number of edges added and removed.
    pub fn apply<R: Rng>(&self, graph: &mut ContactGraph, rng: &mut R) -> (usize, usize) {
        let edge_count = graph.edge_count();
        let to_add = graph.sample_absent_edges(rng, fraction_of(edge_count, self.add_fraction));
        let to_remove = graph.sample_present_edges(rng, fraction_of(edge_count, self.remove_fraction));
        (graph.add_edges(&to_add), graph.remove_edges(&to_remove))
    }
}

impl Default for BackgroundDrift {
    fn default() -> Self {
        BackgroundDrift {
            add_fraction: DEFAULT_DRIFT_FRACTION,
            remove_fraction: DEFAULT_DRIFT_FRACTION,
        }
    }
}

/// Everything that mutates the graph of a dynamic network between ticks.
#[derive(Debug)]
pub struct DynamicTopology {
    pub scheduler: InterventionScheduler,
    pub drift: BackgroundDrift,
}

impl DynamicTopology {
    /// Runs scheduled interventions for `tick`, then background drift.
    pub fn apply(&mut self, tick: usize, graph: &mut ContactGraph, rngs: &mut RngStore) {
        let scheduler = &mut self.scheduler;
        rngs.sample(InterventionRng, |rng| scheduler.apply(tick, graph, rng));
        let (added, removed) = rngs.sample(DriftRng, |rng| self.drift.apply(graph, rng));
        debug!("tick {tick}: drift added {added} and removed {removed} edges");
    }
}
