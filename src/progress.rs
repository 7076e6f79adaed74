//! A timeline progress bar for long runs.
//!
//! The bar counts ticks. It is created by the driver when a run starts and finalized when the
//! last tick is reached. Only one progress bar can be active at a time; starting a second run
//! with progress enabled replaces the first bar.
//!
//! When the `progress_bar` feature is disabled the type still exists but does nothing, so call
//! sites need no feature gates.

#[cfg(feature = "progress_bar")]
use progress_bar::{
    finalize_progress_bar, init_progress_bar, set_progress_bar_action, set_progress_bar_progress,
    Color, Style,
};

use crate::log::trace;

#[derive(Debug)]
pub struct TimelineProgress {
    max_tick: usize,
}

impl TimelineProgress {
    /// Initialize the progress bar with the number of ticks in the run.
    #[must_use]
    pub fn start(max_tick: usize) -> Self {
        trace!("initializing timeline progress bar with {} ticks", max_tick);
        #[cfg(feature = "progress_bar")]
        {
            init_progress_bar(max_tick);
            set_progress_bar_action("Tick", Color::Blue, Style::Bold);
        }
        TimelineProgress { max_tick }
    }

    /// Updates the bar with the current tick. Finalizes the bar once `tick >= max_tick`.
    #[cfg_attr(not(feature = "progress_bar"), allow(unused_variables))]
    pub fn update(&self, tick: usize) {
        let tick = tick.min(self.max_tick);
        #[cfg(feature = "progress_bar")]
        {
            set_progress_bar_progress(tick);
            if tick == self.max_tick {
                finalize_progress_bar();
            }
        }
    }

    #[must_use]
    pub fn max_tick(&self) -> usize {
        self.max_tick
    }
}
