//! A per-tick CSV report of a finished run, one row per recorded tick.
//!
//! The report flattens a [`SimulationResult`] into columns that spreadsheet and plotting tools
//! read directly: the compartments, the new-infection count, the reproduction rate and the five
//! rates that drove the transition into the tick (empty at tick 0).

use std::ffi::OsStr;
use std::fs::{create_dir_all, File};
use std::path::Path;

use serde::Serialize;

use crate::error::SirvdError;
use crate::result::SimulationResult;

#[derive(Debug, Serialize)]
struct TickRecord {
    tick: usize,
    time: f64,
    susceptible: f64,
    infected: f64,
    recovered: f64,
    vaccinated: f64,
    dead: f64,
    new_infected: f64,
    reproduction_rate: f64,
    infection_rate: Option<f64>,
    recovery_rate: Option<f64>,
    fatality_rate: Option<f64>,
    vaccination_rate: Option<f64>,
    breakthrough_rate: Option<f64>,
}

// Checks that the path has the expected extension. Creates the file and all parent directories
// if they do not exist.
pub(crate) fn create_output_file(path: &Path, extension: &str) -> Result<File, SirvdError> {
    match path.extension().and_then(OsStr::to_str) {
        Some(found) if found == extension => {
            if let Some(parent) = path.parent() {
                create_dir_all(parent)?;
            }
            Ok(File::create(path)?)
        }
        _ => Err(SirvdError::UnsupportedFileFormat(format!(
            "output file {} must have the .{extension} extension",
            path.display()
        ))),
    }
}

/// Writes the tick report of `result` to `path`, which must end in `.csv`.
pub fn write_tick_report(path: impl AsRef<Path>, result: &SimulationResult) -> Result<(), SirvdError> {
    let file = create_output_file(path.as_ref(), "csv")?;
    let mut writer = csv::Writer::from_writer(file);
    let observables = &result.observables;

    for tick in 0..observables.len() {
        let rates = tick
            .checked_sub(1)
            .and_then(|index| result.parameters.get(index));
        writer.serialize(TickRecord {
            tick,
            time: observables.time[tick],
            susceptible: observables.susceptible[tick],
            infected: observables.infected[tick],
            recovered: observables.recovered[tick],
            vaccinated: observables.vaccinated[tick],
            dead: observables.dead[tick],
            new_infected: observables.new_infected[tick],
            reproduction_rate: result
                .additional_data
                .reproduction_rate
                .get(tick)
                .copied()
                .unwrap_or(0.0),
            infection_rate: rates.map(|r| r.infection_rate),
            recovery_rate: rates.map(|r| r.recovery_rate),
            fatality_rate: rates.map(|r| r.fatality_rate),
            vaccination_rate: rates.map(|r| r.vaccination_rate),
            breakthrough_rate: rates.map(|r| r.breakthrough_rate),
        })?;
    }
    writer.flush()?;
    Ok(())
}
