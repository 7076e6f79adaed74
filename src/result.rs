//! The immutable outcome of one run and its JSON persistence.
//!
//! The persisted document has three groups:
//!
//! ```json
//! {
//!   "observables": { "Time": [..], "S": [..], "I": [..], "R": [..], "V": [..], "D": [..], "I_new": [..] },
//!   "additional_data": { "reproduction_rate": [..], "infected_peak_time": 0, "infected_peak": 0.0,
//!                        "epidemic_duration": 0, "case_fatality_rate": 0.0 },
//!   "parameters": { "infection_rate": [..], "recovery_rate": [..], "fatality_rate": [..],
//!                   "vaccination_rate": [..], "breakthrough_rate": [..] }
//! }
//! ```
//!
//! Floats are written with enough digits to read back bit-for-bit.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analytics::AdditionalData;
use crate::error::SirvdError;
use crate::observables::Observables;
use crate::rates::RateSchedule;
use crate::report::create_output_file;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub observables: Observables,
    pub additional_data: AdditionalData,
    /// Rates used by ticks `1..`, one entry per tick.
    pub parameters: RateSchedule,
}

impl SimulationResult {
    /// Number of ticks executed (recorded points minus the initial one).
    #[must_use]
    pub fn ticks(&self) -> usize {
        self.observables.len().saturating_sub(1)
    }

    pub fn to_json_string(&self) -> Result<String, SirvdError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, SirvdError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the result to `path`, which must end in `.json`. Parent directories are created.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SirvdError> {
        let mut writer = BufWriter::new(create_output_file(path.as_ref(), "json")?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SirvdError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
