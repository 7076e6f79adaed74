//! Rate schedules derived from real epidemiological data.
//!
//! A [`HistoricalDataProvider`] turns raw per-country time series into aligned daily counts, and a
//! [`ParameterExtractor`] back-calculates the five daily rates from them. The result feeds a run as
//! an ordinary [`RateSource::Schedule`](crate::rates::RateSource::Schedule).

pub mod extractor;
pub mod provider;

pub use extractor::{ExtractedParameters, ParameterExtractor};
pub use provider::{CsvDataProvider, HistoricalDataProvider, HistoricalSeries};
