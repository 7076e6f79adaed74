use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use log::{debug, trace};
use serde::Deserialize;

use crate::error::SirvdError;

pub const DEATHS_FILE: &str = "deaths.csv";
pub const VACCINATED_FILE: &str = "vaccinated.csv";
pub const NEW_INFECTIONS_FILE: &str = "infected_cases.csv";

/// Aligned daily series for one country. All vectors have the length of `time`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HistoricalSeries {
    pub time: Vec<NaiveDate>,
    /// Cumulative deaths.
    pub deaths: Vec<f64>,
    /// Cumulative vaccinations.
    pub vaccinated: Vec<f64>,
    /// New infections reported that day.
    pub new_infections: Vec<f64>,
}

impl HistoricalSeries {
    #[must_use]
    pub fn len(&self) -> usize {
        self.time.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Source of aligned daily series.
pub trait HistoricalDataProvider {
    /// Returns the series of `country` between `start` and `end` (both inclusive). Without a
    /// `start` the axis begins at the earliest first report; without an `end` it stops the day
    /// before the earliest last report.
    fn fetch(
        &self,
        country: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<HistoricalSeries, SirvdError>;
}

/// Reads three CSV files with columns `Entity,Day,Data`, dates formatted `%Y-%m-%d`. The death
/// file reports daily increments; the vaccination file is cumulative; the infection file holds
/// daily new cases.
#[derive(Clone, Debug)]
pub struct CsvDataProvider {
    deaths: PathBuf,
    vaccinated: PathBuf,
    new_infections: PathBuf,
}

#[derive(Debug, Deserialize)]
struct Row {
    #[serde(rename = "Entity")]
    entity: String,
    #[serde(rename = "Day")]
    day: String,
    #[serde(rename = "Data")]
    data: f64,
}

/// One country's raw reports, ordered by day.
type Reports = BTreeMap<NaiveDate, f64>;

impl CsvDataProvider {
    #[must_use]
    pub fn new(deaths: PathBuf, vaccinated: PathBuf, new_infections: PathBuf) -> Self {
        CsvDataProvider {
            deaths,
            vaccinated,
            new_infections,
        }
    }

    /// Uses the standard file names inside `dir`.
    #[must_use]
    pub fn from_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(
            dir.join(DEATHS_FILE),
            dir.join(VACCINATED_FILE),
            dir.join(NEW_INFECTIONS_FILE),
        )
    }
}

fn read_country(path: &Path, country: &str) -> Result<Reports, SirvdError> {
    trace!("reading {} for {country}", path.display());
    let mut reader = csv::Reader::from_path(path)?;
    let mut reports = Reports::new();
    for row in reader.deserialize() {
        let row: Row = row?;
        if row.entity == country {
            let day = NaiveDate::parse_from_str(&row.day, "%Y-%m-%d")?;
            reports.insert(day, row.data);
        }
    }
    if reports.is_empty() {
        return Err(SirvdError::CountryNotFound(country.to_string()));
    }
    Ok(reports)
}

/// Values of `reports` on each day of `axis`: 0 before the first report, the last reported value
/// on days without a report. With `accumulate`, reports are summed instead.
fn align(reports: &Reports, axis: &[NaiveDate], accumulate: bool) -> Vec<f64> {
    let mut values = Vec::with_capacity(axis.len());
    let Some(&first_day) = axis.first() else {
        return values;
    };
    let mut current = if accumulate {
        reports.range(..first_day).map(|(_, value)| value).sum::<f64>()
    } else {
        reports.range(..first_day).next_back().map_or(0.0, |(_, &value)| value)
    };
    for day in axis {
        if let Some(&value) = reports.get(day) {
            current = if accumulate { current + value } else { value };
        }
        values.push(current);
    }
    values
}

/// Days from `start` to `end` inclusive.
pub fn daily_axis(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start
        .iter_days()
        .take_while(|day| *day <= end)
        .collect()
}

pub(crate) fn align_reports(
    deaths: &Reports,
    vaccinated: &Reports,
    new_infections: &Reports,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<HistoricalSeries, SirvdError> {
    let all = [deaths, vaccinated, new_infections];
    let first_days = all.iter().filter_map(|reports| reports.keys().next().copied());
    let last_days = all.iter().filter_map(|reports| reports.keys().next_back().copied());

    let start = match start {
        Some(start) => start,
        None => first_days
            .min()
            .ok_or_else(|| SirvdError::InsufficientHistoricalData("no reports".to_string()))?,
    };
    let end = match end {
        Some(end) => end,
        None => last_days
            .min()
            .and_then(|day| day.checked_sub_days(Days::new(1)))
            .ok_or_else(|| SirvdError::InsufficientHistoricalData("no reports".to_string()))?,
    };
    if end < start {
        return Err(SirvdError::InsufficientHistoricalData(format!(
            "empty date range {start} to {end}"
        )));
    }

    let time = daily_axis(start, end);
    debug!("aligned historical data on {} days from {start} to {end}", time.len());
    Ok(HistoricalSeries {
        deaths: align(deaths, &time, true),
        vaccinated: align(vaccinated, &time, false),
        new_infections: align(new_infections, &time, false),
        time,
    })
}

impl HistoricalDataProvider for CsvDataProvider {
    fn fetch(
        &self,
        country: &str,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<HistoricalSeries, SirvdError> {
        let deaths = read_country(&self.deaths, country)?;
        let vaccinated = read_country(&self.vaccinated, country)?;
        let new_infections = read_country(&self.new_infections, country)?;
        align_reports(&deaths, &vaccinated, &new_infections, start, end)
    }
}

#[cfg(test)]
mod test {
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::tempdir;

    use super::{CsvDataProvider, HistoricalDataProvider, DEATHS_FILE, NEW_INFECTIONS_FILE, VACCINATED_FILE};
    use crate::error::SirvdError;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2021, 3, d).unwrap()
    }

    fn write_fixture(dir: &std::path::Path) {
        fs::write(
            dir.join(DEATHS_FILE),
            "Entity,Day,Data\n\
             Italy,2021-03-02,1\n\
             Italy,2021-03-04,2\n\
             France,2021-03-01,9\n\
             Italy,2021-03-06,1\n",
        )
        .unwrap();
        fs::write(
            dir.join(VACCINATED_FILE),
            "Entity,Day,Data\n\
             Italy,2021-03-01,10\n\
             Italy,2021-03-03,30\n\
             Italy,2021-03-07,70\n",
        )
        .unwrap();
        fs::write(
            dir.join(NEW_INFECTIONS_FILE),
            "Entity,Day,Data\n\
             Italy,2021-03-01,5\n\
             Italy,2021-03-02,6\n\
             Italy,2021-03-05,8\n\
             Italy,2021-03-06,4\n",
        )
        .unwrap();
    }

    #[test]
    fn aligns_fills_and_accumulates() {
        let temp_dir = tempdir().unwrap();
        write_fixture(temp_dir.path());
        let series = CsvDataProvider::from_dir(temp_dir.path())
            .fetch("Italy", None, None)
            .unwrap();

        // From the earliest first report to the day before the earliest last report.
        assert_eq!(series.time, (1..=5).map(day).collect::<Vec<_>>());
        assert_eq!(series.deaths, vec![0.0, 1.0, 1.0, 3.0, 3.0]);
        assert_eq!(series.vaccinated, vec![10.0, 10.0, 30.0, 30.0, 30.0]);
        assert_eq!(series.new_infections, vec![5.0, 6.0, 6.0, 6.0, 8.0]);
    }

    #[test]
    fn explicit_window_counts_earlier_deaths() {
        let temp_dir = tempdir().unwrap();
        write_fixture(temp_dir.path());
        let series = CsvDataProvider::from_dir(temp_dir.path())
            .fetch("Italy", Some(day(3)), Some(day(6)))
            .unwrap();
        assert_eq!(series.len(), 4);
        assert_eq!(series.deaths, vec![1.0, 3.0, 3.0, 4.0]);
        assert_eq!(series.new_infections, vec![6.0, 6.0, 8.0, 4.0]);
    }

    #[test]
    fn unknown_country_is_reported() {
        let temp_dir = tempdir().unwrap();
        write_fixture(temp_dir.path());
        let result = CsvDataProvider::from_dir(temp_dir.path()).fetch("Atlantis", None, None);
        assert!(matches!(result, Err(SirvdError::CountryNotFound(country)) if country == "Atlantis"));
    }

    #[test]
    fn missing_files_are_reported() {
        let temp_dir = tempdir().unwrap();
        let result = CsvDataProvider::from_dir(temp_dir.path()).fetch("Italy", None, None);
        assert!(matches!(result, Err(SirvdError::CsvError(_))));
    }

    #[test]
    fn malformed_dates_are_reported() {
        let temp_dir = tempdir().unwrap();
        write_fixture(temp_dir.path());
        fs::write(temp_dir.path().join(DEATHS_FILE), "Entity,Day,Data\nItaly,03/02/2021,1\n").unwrap();
        let result = CsvDataProvider::from_dir(temp_dir.path()).fetch("Italy", None, None);
        assert!(matches!(result, Err(SirvdError::DateParseError(_))));
    }
}
