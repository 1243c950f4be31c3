use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::constants::OTHER_CONTINENT;
use crate::metrics;
use crate::pipeline::difference::{DiffPoint, DiffSeries};
use crate::pipeline::normalize::{ContinentLookup, SnapshotRecord};
use crate::types::{FactRow, JoinGap, Lookup, SnapshotRow};

/// Coordinates and ISO3 code taken from the snapshot feed
#[derive(Debug, Clone, Default, PartialEq)]
struct Geocode {
    lat: Option<f64>,
    long: Option<f64>,
    iso3: Option<String>,
}

/// Collects join misses once per (location, lookup)
#[derive(Debug, Default)]
pub struct GapLog {
    seen: BTreeSet<(String, Lookup)>,
}

impl GapLog {
    pub fn record(&mut self, location: &str, lookup: Lookup) {
        if self.seen.insert((location.to_string(), lookup)) {
            debug!(location, ?lookup, "Join gap");
            metrics::record_join_gap(lookup);
        }
    }

    pub fn into_gaps(self) -> Vec<JoinGap> {
        self.seen
            .into_iter()
            .map(|(location, lookup)| JoinGap { location, lookup })
            .collect()
    }
}

/// Build the fact table.
///
/// - confirmed ⋈ deaths ⋈ recovered on (location, date): inner
/// - continent on location: inner, unmatched locations are dropped
/// - coordinates and ISO3 from the snapshot on location: left
///
/// Output is ordered by (location, date).
pub fn join_facts(
    confirmed: &DiffSeries,
    deaths: &DiffSeries,
    recovered: &DiffSeries,
    continents: &ContinentLookup,
    snapshot: &[SnapshotRecord],
    gaps: &mut GapLog,
) -> Vec<FactRow> {
    let mut geocodes: HashMap<&str, Geocode> = HashMap::new();
    for record in snapshot {
        geocodes
            .entry(record.location.as_str())
            .or_insert_with(|| Geocode {
                lat: record.lat,
                long: record.long,
                iso3: record.iso3.clone(),
            });
    }

    let mut facts = Vec::with_capacity(confirmed.points.len());
    for (key, c) in &confirmed.points {
        let (location, date) = key;
        let (Some(d), Some(r)) = (deaths.points.get(key), recovered.points.get(key)) else {
            gaps.record(location, Lookup::Series);
            continue;
        };
        let Some(continent) = continents.get(location) else {
            gaps.record(location, Lookup::Continent);
            continue;
        };
        let geocode = match geocodes.get(location.as_str()) {
            Some(geocode) => geocode.clone(),
            None => {
                gaps.record(location, Lookup::Geocoding);
                Geocode::default()
            }
        };

        facts.push(fact_row(location, *date, c, d, r, continent, geocode));
    }

    // Keys only the deaths or recovered series carry are dropped by the inner join
    for series in [deaths, recovered] {
        for (location, date) in series.points.keys() {
            if !confirmed.points.contains_key(&(location.clone(), *date)) {
                gaps.record(location, Lookup::Series);
            }
        }
    }

    facts
}

fn fact_row(
    location: &str,
    date: chrono::NaiveDate,
    confirmed: &DiffPoint,
    deaths: &DiffPoint,
    recovered: &DiffPoint,
    continent: &str,
    geocode: Geocode,
) -> FactRow {
    FactRow {
        location: location.to_string(),
        date,
        total_confirmed: confirmed.total,
        new_confirmed: confirmed.new,
        total_deaths: deaths.total,
        new_deaths: deaths.new,
        total_recovered: recovered.total,
        new_recovered: recovered.new,
        continent: continent.to_string(),
        lat: geocode.lat,
        long: geocode.long,
        iso3: geocode.iso3,
    }
}

/// Left join continent into the snapshot. Unmatched locations land in the
/// "Other" bucket so snapshot totals never lose a row.
pub fn join_snapshot(records: Vec<SnapshotRecord>, continents: &ContinentLookup) -> Vec<SnapshotRow> {
    records
        .into_iter()
        .map(|record| {
            let continent = continents
                .get(&record.location)
                .unwrap_or(OTHER_CONTINENT)
                .to_string();
            SnapshotRow {
                location: record.location,
                last_update: record.last_update,
                lat: record.lat,
                long: record.long,
                confirmed: record.confirmed,
                deaths: record.deaths,
                recovered: record.recovered,
                active: record.active,
                incident_rate: record.incident_rate,
                mortality_rate: record.mortality_rate,
                iso3: record.iso3,
                continent,
            }
        })
        .collect()
}
