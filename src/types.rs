use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The five tabular sources the pipeline reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feed {
    Confirmed,
    Deaths,
    Recovered,
    Snapshot,
    Continents,
}

impl Feed {
    pub fn name(&self) -> &'static str {
        match self {
            Feed::Confirmed => "confirmed",
            Feed::Deaths => "deaths",
            Feed::Recovered => "recovered",
            Feed::Snapshot => "snapshot",
            Feed::Continents => "continents",
        }
    }
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Case category selectable in the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseKind {
    Confirmed,
    Deaths,
    Recovered,
}

/// One row of the long fact table: a location on a date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactRow {
    pub location: String,
    pub date: NaiveDate,
    pub total_confirmed: i64,
    pub new_confirmed: i64,
    pub total_deaths: i64,
    pub new_deaths: i64,
    pub total_recovered: i64,
    pub new_recovered: i64,
    pub continent: String,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub iso3: Option<String>,
}

impl FactRow {
    pub fn value(&self, column: FactColumn) -> i64 {
        match column {
            FactColumn::TotalConfirmed => self.total_confirmed,
            FactColumn::NewConfirmed => self.new_confirmed,
            FactColumn::TotalDeaths => self.total_deaths,
            FactColumn::NewDeaths => self.new_deaths,
            FactColumn::TotalRecovered => self.total_recovered,
            FactColumn::NewRecovered => self.new_recovered,
        }
    }

    pub fn has_coordinates(&self) -> bool {
        self.lat.is_some() && self.long.is_some()
    }
}

/// Numeric columns of the fact table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactColumn {
    TotalConfirmed,
    NewConfirmed,
    TotalDeaths,
    NewDeaths,
    TotalRecovered,
    NewRecovered,
}

impl FactColumn {
    pub fn total(kind: CaseKind) -> Self {
        match kind {
            CaseKind::Confirmed => FactColumn::TotalConfirmed,
            CaseKind::Deaths => FactColumn::TotalDeaths,
            CaseKind::Recovered => FactColumn::TotalRecovered,
        }
    }

    pub fn new_count(kind: CaseKind) -> Self {
        match kind {
            CaseKind::Confirmed => FactColumn::NewConfirmed,
            CaseKind::Deaths => FactColumn::NewDeaths,
            CaseKind::Recovered => FactColumn::NewRecovered,
        }
    }
}

/// Point-in-time per-location totals from the snapshot feed, with continent joined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    pub location: String,
    pub last_update: NaiveDate,
    pub lat: Option<f64>,
    pub long: Option<f64>,
    pub confirmed: i64,
    pub deaths: i64,
    pub recovered: i64,
    pub active: i64,
    pub incident_rate: Option<f64>,
    pub mortality_rate: Option<f64>,
    pub iso3: Option<String>,
    pub continent: String,
}

impl SnapshotRow {
    pub fn value(&self, column: SnapshotColumn) -> i64 {
        match column {
            SnapshotColumn::Confirmed => self.confirmed,
            SnapshotColumn::Deaths => self.deaths,
            SnapshotColumn::Recovered => self.recovered,
            SnapshotColumn::Active => self.active,
        }
    }
}

/// Count columns of the snapshot table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotColumn {
    Confirmed,
    Deaths,
    Recovered,
    Active,
}

/// Global sums of new counts for one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub new_confirmed: i64,
    pub new_deaths: i64,
}

/// Which lookup a location failed to match during a join
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lookup {
    /// Location absent from the continent lookup; dropped from the fact table
    Continent,
    /// Location absent from the snapshot; coordinates and ISO3 left empty
    Geocoding,
    /// (location, date) present in one time series but not the others
    Series,
}

/// A tolerated join miss, reported but never raised
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinGap {
    pub location: String,
    pub lookup: Lookup,
}

/// Snapshot totals for one continent, with the per-location breakdown
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContinentTotal {
    pub continent: String,
    pub total: i64,
    pub locations: Vec<(String, i64)>,
}

/// Headline snapshot figures for one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationStatus {
    pub location: String,
    pub confirmed: i64,
    pub deaths: i64,
    pub mortality_rate: Option<f64>,
}
