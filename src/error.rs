use std::fmt::{self, Display};
use std::io;

/// Provides `SirvdError` and maps to other errors to
/// convert to a `SirvdError`
#[derive(Debug)]
#[allow(clippy::module_name_repetitions)]
pub enum SirvdError {
    IoError(io::Error),
    JsonError(serde_json::Error),
    CsvError(csv::Error),
    DateParseError(chrono::ParseError),

    // Configuration errors. These halt a run before (or at) the offending operation.
    UnsupportedTopology(String),
    InvalidTopologyParameter {
        topology: &'static str,
        parameter: String,
        reason: String,
    },
    GraphNotConnected {
        tries: usize,
    },
    RateScheduleLengthMismatch {
        infection: usize,
        recovery: usize,
        fatality: usize,
        vaccination: usize,
        breakthrough: usize,
    },
    RateScheduleExhausted {
        tick: usize,
        length: usize,
    },
    InvalidRate {
        name: &'static str,
        value: f64,
    },
    InvalidFraction {
        name: &'static str,
        value: f64,
    },
    InterventionsNotSupported,
    InterventionsRequireDynamicTopology,
    InvalidInterventionWindow {
        start: usize,
        end: usize,
    },
    TooManyInitialInfections {
        requested: usize,
        population: usize,
    },
    InvalidPopulation(usize),
    InvalidStepSize(f64),
    InvalidDuration(f64),

    // Errors from the historical data collaborators.
    CountryNotFound(String),
    InsufficientHistoricalData(String),
    UnsupportedFileFormat(String),

    SirvdError(String),
}

impl SirvdError {
    /// Configuration errors are the fatal class: they describe a run that must
    /// not start (or continue) rather than a recoverable I/O condition.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        !matches!(
            self,
            SirvdError::IoError(_)
                | SirvdError::JsonError(_)
                | SirvdError::CsvError(_)
                | SirvdError::DateParseError(_)
                | SirvdError::CountryNotFound(_)
                | SirvdError::InsufficientHistoricalData(_)
                | SirvdError::UnsupportedFileFormat(_)
        )
    }
}

impl From<io::Error> for SirvdError {
    fn from(error: io::Error) -> Self {
        SirvdError::IoError(error)
    }
}

impl From<serde_json::Error> for SirvdError {
    fn from(error: serde_json::Error) -> Self {
        SirvdError::JsonError(error)
    }
}

impl From<csv::Error> for SirvdError {
    fn from(error: csv::Error) -> Self {
        SirvdError::CsvError(error)
    }
}

impl From<chrono::ParseError> for SirvdError {
    fn from(error: chrono::ParseError) -> Self {
        SirvdError::DateParseError(error)
    }
}

impl From<String> for SirvdError {
    fn from(error: String) -> Self {
        SirvdError::SirvdError(error)
    }
}

impl From<&str> for SirvdError {
    fn from(error: &str) -> Self {
        SirvdError::SirvdError(error.to_string())
    }
}

impl std::error::Error for SirvdError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SirvdError::IoError(error) => Some(error),
            SirvdError::JsonError(error) => Some(error),
            SirvdError::CsvError(error) => Some(error),
            SirvdError::DateParseError(error) => Some(error),
            _ => None,
        }
    }
}

impl Display for SirvdError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SirvdError::IoError(error) => write!(f, "I/O error: {error}"),
            SirvdError::JsonError(error) => write!(f, "JSON error: {error}"),
            SirvdError::CsvError(error) => write!(f, "CSV error: {error}"),
            SirvdError::DateParseError(error) => write!(f, "date parse error: {error}"),
            SirvdError::UnsupportedTopology(kind) => {
                write!(f, "unsupported graph type `{kind}`")
            }
            SirvdError::InvalidTopologyParameter {
                topology,
                parameter,
                reason,
            } => write!(f, "invalid parameter `{parameter}` for {topology}: {reason}"),
            SirvdError::GraphNotConnected { tries } => write!(
                f,
                "could not generate a connected small-world graph in {tries} attempts"
            ),
            SirvdError::RateScheduleLengthMismatch {
                infection,
                recovery,
                fatality,
                vaccination,
                breakthrough,
            } => write!(
                f,
                "rate schedules are not of the same length (infection={infection}, \
                 recovery={recovery}, fatality={fatality}, vaccination={vaccination}, \
                 breakthrough={breakthrough})"
            ),
            SirvdError::RateScheduleExhausted { tick, length } => write!(
                f,
                "simulation needs rates for tick {tick} but the rate schedule only has {length} entries"
            ),
            SirvdError::InvalidRate { name, value } => {
                write!(f, "rate `{name}` must be finite and non-negative, got {value}")
            }
            SirvdError::InvalidFraction { name, value } => {
                write!(f, "fraction `{name}` must lie in [0, 1], got {value}")
            }
            SirvdError::InterventionsNotSupported => write!(
                f,
                "the compartmental model does not support lockdowns and events"
            ),
            SirvdError::InterventionsRequireDynamicTopology => write!(
                f,
                "lockdowns and events require a network model with dynamic topology"
            ),
            SirvdError::InvalidInterventionWindow { start, end } => write!(
                f,
                "intervention window ({start}, {end}) must satisfy 1 <= start < end"
            ),
            SirvdError::TooManyInitialInfections {
                requested,
                population,
            } => write!(
                f,
                "cannot seed {requested} initial infections in a population of {population}"
            ),
            SirvdError::InvalidPopulation(population) => {
                write!(f, "population must be positive, got {population}")
            }
            SirvdError::InvalidStepSize(step_size) => {
                write!(f, "step size must be finite and positive, got {step_size}")
            }
            SirvdError::InvalidDuration(duration) => {
                write!(
                    f,
                    "duration must be finite and non-negative and span at most {} ticks, got {duration}",
                    crate::driver::MAX_TICKS
                )
            }
            SirvdError::CountryNotFound(country) => {
                write!(f, "country `{country}` not present in data")
            }
            SirvdError::InsufficientHistoricalData(message) => {
                write!(f, "insufficient historical data: {message}")
            }
            SirvdError::UnsupportedFileFormat(message) => write!(f, "{message}"),
            SirvdError::SirvdError(message) => write!(f, "{message}"),
        }
    }
}
