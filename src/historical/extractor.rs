//! Back-calculation of daily SIRVD rates from aligned historical series.
//!
//! Starting from the first day with at least one new infection, the extractor walks the series
//! one day at a time, estimating `S`, `I` and `R` with discrete balance equations and solving for
//! the rates that explain the observed day-to-day changes:
//!
//! ```text
//! ψ_t = ΔD / I_t          ν_t = ΔV / S_t          α_t = I_new[t+1] / (S_t I_t)
//! μ   = 1 / recovery_time σ   = 1 / breakthrough_time (0 without breakthrough)
//!
//! S_{t+1} = S_t - I_new[t+1] - ΔV + σ R_t
//! I_{t+1} = I_t + I_new[t+1] - μ I_t - ψ_t I_t
//! R_{t+1} = R_t + μ I_t - σ R_t
//! ```
//!
//! The infection rate of the schedule is `α_t N`, matching the `β S I / N` incidence used by
//! the engines.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use chrono::NaiveDate;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::provider::{HistoricalDataProvider, HistoricalSeries};
use crate::error::SirvdError;
use crate::numeric::ratio_or_zero;
use crate::rates::{RateSchedule, Rates};
use crate::report::create_output_file;

/// Estimated compartments per day plus the rates between consecutive days. The schedule is one
/// entry shorter than the series: entry `t` drives the step from day `t` to day `t + 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractedParameters {
    pub time: Vec<NaiveDate>,
    pub susceptible: Vec<f64>,
    pub infected: Vec<f64>,
    pub recovered: Vec<f64>,
    pub vaccinated: Vec<f64>,
    pub dead: Vec<f64>,
    pub schedule: RateSchedule,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParameterExtractor {
    population: usize,
    average_recovery_time: f64,
    average_breakthrough_time: Option<f64>,
}

fn positive(name: &str, value: f64) -> Result<f64, SirvdError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SirvdError::SirvdError(format!(
            "`{name}` must be finite and positive, got {value}"
        )))
    }
}

impl ParameterExtractor {
    /// `average_breakthrough_time` of `None` means immunity never wanes.
    pub fn new(
        population: usize,
        average_recovery_time: f64,
        average_breakthrough_time: Option<f64>,
    ) -> Result<Self, SirvdError> {
        if population == 0 {
            return Err(SirvdError::InvalidPopulation(population));
        }
        Ok(ParameterExtractor {
            population,
            average_recovery_time: positive("average_recovery_time", average_recovery_time)?,
            average_breakthrough_time: average_breakthrough_time
                .map(|time| positive("average_breakthrough_time", time))
                .transpose()?,
        })
    }

    /// Runs the back-calculation over `series`.
    #[allow(clippy::cast_precision_loss)]
    pub fn extract(&self, series: &HistoricalSeries) -> Result<ExtractedParameters, SirvdError> {
        let start = series
            .new_infections
            .iter()
            .position(|&count| count >= 1.0)
            .ok_or_else(|| {
                SirvdError::InsufficientHistoricalData("no day with new infections".to_string())
            })?;
        if series.len() < start + 3 {
            return Err(SirvdError::InsufficientHistoricalData(format!(
                "need at least two days after the first infection on {}",
                series.time[start]
            )));
        }
        debug!("extracting parameters from {}", series.time[start + 1]);

        let n = self.population as f64;
        let mu = 1.0 / self.average_recovery_time;
        let sigma = self.average_breakthrough_time.map_or(0.0, |time| 1.0 / time);

        let time = series.time[start + 1..].to_vec();
        let vaccinated = series.vaccinated[start + 1..].to_vec();
        let dead = series.deaths[start + 1..].to_vec();
        let new_infections = &series.new_infections[start + 1..];

        let seeded = series.new_infections[start];
        let mut susceptible = vec![n - seeded];
        let mut infected = vec![seeded];
        let mut recovered = vec![0.0];
        let mut schedule = RateSchedule::default();

        for t in 0..time.len() - 1 {
            let (s, i, r) = (susceptible[t], infected[t], recovered[t]);
            let delta_dead = dead[t + 1] - dead[t];
            let delta_vaccinated = vaccinated[t + 1] - vaccinated[t];
            let incoming = new_infections[t + 1];

            let psi = ratio_or_zero(delta_dead, i);
            let nu = ratio_or_zero(delta_vaccinated, s);
            let alpha = ratio_or_zero(incoming, s * i);

            schedule.push(Rates {
                infection_rate: alpha * n,
                recovery_rate: mu,
                fatality_rate: psi,
                vaccination_rate: nu,
                breakthrough_rate: sigma,
            });
            susceptible.push(s - incoming - delta_vaccinated + sigma * r);
            infected.push(i + incoming - mu * i - psi * i);
            recovered.push(r + mu * i - sigma * r);
        }

        Ok(ExtractedParameters {
            time,
            susceptible,
            infected,
            recovered,
            vaccinated,
            dead,
            schedule,
        })
    }

    /// Fetches and extracts, or loads a previous extraction from `cache` if that file exists.
    /// A fresh extraction is written to `cache`.
    pub fn extract_cached(
        &self,
        provider: &dyn HistoricalDataProvider,
        country: &str,
        cache: Option<&Path>,
    ) -> Result<ExtractedParameters, SirvdError> {
        if let Some(cache) = cache.filter(|path| path.exists()) {
            info!("loading extracted parameters from {}", cache.display());
            return ExtractedParameters::load(cache);
        }
        info!("extracting parameters for {country}");
        let extracted = self.extract(&provider.fetch(country, None, None)?)?;
        if let Some(cache) = cache {
            extracted.save(cache)?;
        }
        Ok(extracted)
    }
}

impl ExtractedParameters {
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Keeps the days in `[start, end)`. Either bound may be omitted.
    #[must_use]
    pub fn window(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> ExtractedParameters {
        let from = start.map_or(0, |start| self.time.partition_point(|day| *day < start));
        let to = end
            .map_or(self.len(), |end| self.time.partition_point(|day| *day < end))
            .max(from);
        let slice = |values: &Vec<f64>| values[from..to].to_vec();
        let rates_to = to.min(self.schedule.len()).max(from.min(self.schedule.len()));
        let rates_from = from.min(rates_to);
        let rates = |values: &Vec<f64>| values[rates_from..rates_to].to_vec();
        ExtractedParameters {
            time: self.time[from..to].to_vec(),
            susceptible: slice(&self.susceptible),
            infected: slice(&self.infected),
            recovered: slice(&self.recovered),
            vaccinated: slice(&self.vaccinated),
            dead: slice(&self.dead),
            schedule: RateSchedule {
                infection_rate: rates(&self.schedule.infection_rate),
                recovery_rate: rates(&self.schedule.recovery_rate),
                fatality_rate: rates(&self.schedule.fatality_rate),
                vaccination_rate: rates(&self.schedule.vaccination_rate),
                breakthrough_rate: rates(&self.schedule.breakthrough_rate),
            },
        }
    }

    /// Writes the extraction as JSON, `observables` and `parameters` grouped like a result.
    pub fn save(&self, path: &Path) -> Result<(), SirvdError> {
        let mut writer = BufWriter::new(create_output_file(path, "json")?);
        serde_json::to_writer_pretty(&mut writer, &CachedExtraction::from(self))?;
        writer.flush()?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SirvdError> {
        let cached: CachedExtraction = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        let extracted = ExtractedParameters::try_from(cached)?;
        extracted.schedule.validate()?;
        Ok(extracted)
    }
}

mod slash_date {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const FORMAT: &str = "%Y/%m/%d";

    pub fn serialize<S: Serializer>(dates: &[NaiveDate], serializer: S) -> Result<S::Ok, S::Error> {
        dates
            .iter()
            .map(|date| date.format(FORMAT).to_string())
            .collect::<Vec<_>>()
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<NaiveDate>, D::Error> {
        Vec::<String>::deserialize(deserializer)?
            .iter()
            .map(|text| NaiveDate::parse_from_str(text, FORMAT).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[derive(Serialize, Deserialize)]
struct CachedObservables {
    #[serde(rename = "Time", with = "slash_date")]
    time: Vec<NaiveDate>,
    #[serde(rename = "S")]
    susceptible: Vec<f64>,
    #[serde(rename = "I")]
    infected: Vec<f64>,
    #[serde(rename = "R")]
    recovered: Vec<f64>,
    #[serde(rename = "V")]
    vaccinated: Vec<f64>,
    #[serde(rename = "D")]
    dead: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CachedParameters {
    infection_rate: Vec<f64>,
    fatality_rate: Vec<f64>,
    vaccination_rate: Vec<f64>,
    recovery_rate: Vec<f64>,
    breakthrough_rate: Vec<f64>,
}

#[derive(Serialize, Deserialize)]
struct CachedExtraction {
    observables: CachedObservables,
    parameters: CachedParameters,
}

impl From<&ExtractedParameters> for CachedExtraction {
    fn from(extracted: &ExtractedParameters) -> Self {
        let schedule = extracted.schedule.clone();
        CachedExtraction {
            observables: CachedObservables {
                time: extracted.time.clone(),
                susceptible: extracted.susceptible.clone(),
                infected: extracted.infected.clone(),
                recovered: extracted.recovered.clone(),
                vaccinated: extracted.vaccinated.clone(),
                dead: extracted.dead.clone(),
            },
            parameters: CachedParameters {
                infection_rate: schedule.infection_rate,
                fatality_rate: schedule.fatality_rate,
                vaccination_rate: schedule.vaccination_rate,
                recovery_rate: schedule.recovery_rate,
                breakthrough_rate: schedule.breakthrough_rate,
            },
        }
    }
}

impl TryFrom<CachedExtraction> for ExtractedParameters {
    type Error = SirvdError;

    fn try_from(cached: CachedExtraction) -> Result<Self, SirvdError> {
        let CachedExtraction {
            observables,
            parameters,
        } = cached;
        let days = observables.time.len();
        if [
            observables.susceptible.len(),
            observables.infected.len(),
            observables.recovered.len(),
            observables.vaccinated.len(),
            observables.dead.len(),
        ]
        .iter()
        .any(|&len| len != days)
        {
            return Err(SirvdError::InsufficientHistoricalData(
                "cached observables are not of the same length".to_string(),
            ));
        }
        Ok(ExtractedParameters {
            time: observables.time,
            susceptible: observables.susceptible,
            infected: observables.infected,
            recovered: observables.recovered,
            vaccinated: observables.vaccinated,
            dead: observables.dead,
            schedule: RateSchedule {
                infection_rate: parameters.infection_rate,
                recovery_rate: parameters.recovery_rate,
                fatality_rate: parameters.fatality_rate,
                vaccination_rate: parameters.vaccination_rate,
                breakthrough_rate: parameters.breakthrough_rate,
            },
        })
    }
}
