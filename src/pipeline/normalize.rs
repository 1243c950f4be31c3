use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;

use crate::constants::*;
use crate::error::{PipelineError, Result};
use crate::sources::RawTable;
use crate::types::Feed;

/// A time-series feed with only the location key and the date columns left
#[derive(Debug, Clone, PartialEq)]
pub struct WideSeries {
    pub feed: Feed,
    /// Date column headers, unparsed, in source order
    pub date_headers: Vec<String>,
    pub rows: Vec<WideRow>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub location: String,
    /// One cell per entry of `date_headers`
    pub values: Vec<String>,
}

/// A normalized snapshot row, before the continent join
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotRecord {
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
}

/// Location → continent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContinentLookup {
    by_location: HashMap<String, String>,
}

impl ContinentLookup {
    /// Build from pairs; the first occurrence of a location wins
    pub fn from_pairs<I, L, C>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, C)>,
        L: Into<String>,
        C: Into<String>,
    {
        let mut by_location = HashMap::new();
        for (location, continent) in pairs {
            by_location
                .entry(location.into())
                .or_insert_with(|| continent.into());
        }
        Self { by_location }
    }

    pub fn get(&self, location: &str) -> Option<&str> {
        self.by_location.get(location).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_location.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_location.is_empty()
    }
}

/// Rename the country column to the location key and drop the sub-region
/// and coordinate columns. Every other column is a date column.
pub fn normalize_series(table: &RawTable) -> Result<WideSeries> {
    let location_idx = table.column_index(SERIES_COUNTRY)?;
    let dropped = [
        location_idx,
        table.column_index(SERIES_SUBREGION)?,
        table.column_index(SERIES_LAT)?,
        table.column_index(SERIES_LONG)?,
    ];

    let date_columns: Vec<usize> = (0..table.headers.len())
        .filter(|idx| !dropped.contains(idx))
        .collect();
    let date_headers = date_columns
        .iter()
        .map(|&idx| table.headers[idx].clone())
        .collect();

    let rows = table
        .rows
        .iter()
        .map(|row| WideRow {
            location: row[location_idx].trim().to_string(),
            values: date_columns.iter().map(|&idx| row[idx].clone()).collect(),
        })
        .collect();

    Ok(WideSeries {
        feed: table.feed,
        date_headers,
        rows,
    })
}

/// Keep the snapshot fields the derived tables use, coerced to their types.
/// `People_Tested`, `People_Hospitalized` and `UID` are dropped.
pub fn normalize_snapshot(table: &RawTable) -> Result<Vec<SnapshotRecord>> {
    let feed = table.feed;
    let location_idx = table.column_index(SNAPSHOT_COUNTRY)?;
    let last_update_idx = table.column_index(SNAPSHOT_LAST_UPDATE)?;
    let lat_idx = table.column_index(SNAPSHOT_LAT)?;
    let long_idx = table.column_index(SNAPSHOT_LONG)?;
    let confirmed_idx = table.column_index(SNAPSHOT_CONFIRMED)?;
    let deaths_idx = table.column_index(SNAPSHOT_DEATHS)?;
    let recovered_idx = table.column_index(SNAPSHOT_RECOVERED)?;
    let active_idx = table.column_index(SNAPSHOT_ACTIVE)?;
    let iso3_idx = table.column_index(SNAPSHOT_ISO3)?;
    let incident_idx = table.optional_column_index(SNAPSHOT_INCIDENT_RATE);
    let mortality_idx = table.optional_column_index(SNAPSHOT_MORTALITY_RATE);

    let mut records = Vec::with_capacity(table.len());
    for (i, row) in table.rows.iter().enumerate() {
        let row_no = i + 1;
        let count = |idx: usize, column: &str| parse_snapshot_count(feed, column, row_no, &row[idx]);
        let float = |idx: usize, column: &str| parse_optional_float(feed, column, row_no, &row[idx]);

        let iso3 = row[iso3_idx].trim();
        records.push(SnapshotRecord {
            location: row[location_idx].trim().to_string(),
            last_update: parse_timestamp_date(feed, SNAPSHOT_LAST_UPDATE, row_no, &row[last_update_idx])?,
            lat: float(lat_idx, SNAPSHOT_LAT)?,
            long: float(long_idx, SNAPSHOT_LONG)?,
            confirmed: count(confirmed_idx, SNAPSHOT_CONFIRMED)?,
            deaths: count(deaths_idx, SNAPSHOT_DEATHS)?,
            recovered: count(recovered_idx, SNAPSHOT_RECOVERED)?,
            active: count(active_idx, SNAPSHOT_ACTIVE)?,
            incident_rate: incident_idx
                .map(|idx| float(idx, SNAPSHOT_INCIDENT_RATE))
                .transpose()?
                .flatten(),
            mortality_rate: mortality_idx
                .map(|idx| float(idx, SNAPSHOT_MORTALITY_RATE))
                .transpose()?
                .flatten(),
            iso3: (!iso3.is_empty()).then(|| iso3.to_string()),
        });
    }
    Ok(records)
}

pub fn normalize_continents(table: &RawTable) -> Result<ContinentLookup> {
    let country_idx = table.column_index(CONTINENT_COUNTRY)?;
    let continent_idx = table.column_index(CONTINENT_NAME)?;

    Ok(ContinentLookup::from_pairs(table.rows.iter().map(|row| {
        (
            row[country_idx].trim().to_string(),
            row[continent_idx].trim().to_string(),
        )
    })))
}

/// Integer coercion. Integral decimal spellings such as `12.0` are accepted.
pub fn parse_count(feed: Feed, column: &str, row: usize, raw: &str) -> Result<i64> {
    let value = raw.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Ok(n);
    }
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive
    match value.parse::<f64>() {
        Ok(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => Ok(f as i64),
        _ => Err(PipelineError::parse(feed, column, row, raw, "integer")),
    }
}

/// Snapshot counts: blank cells are reported as zero, anything else must be
/// an integer.
fn parse_snapshot_count(feed: Feed, column: &str, row: usize, raw: &str) -> Result<i64> {
    if raw.trim().is_empty() {
        return Ok(0);
    }
    parse_count(feed, column, row, raw)
}

fn parse_optional_float(feed: Feed, column: &str, row: usize, raw: &str) -> Result<Option<f64>> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse::<f64>()
        .map(Some)
        .map_err(|_| PipelineError::parse(feed, column, row, raw, "number"))
}

fn parse_timestamp_date(feed: Feed, column: &str, row: usize, raw: &str) -> Result<NaiveDate> {
    NaiveDateTime::parse_from_str(raw.trim(), SNAPSHOT_TIMESTAMP_FORMAT)
        .map(|ts| ts.date())
        .map_err(|_| PipelineError::parse(feed, column, row, raw, "timestamp (%Y-%m-%d %H:%M:%S)"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(feed: Feed, csv: &str) -> RawTable {
        RawTable::from_csv(feed, "inline", csv.as_bytes()).unwrap()
    }

    const SNAPSHOT_HEADER: &str = "Country_Region,Last_Update,Lat,Long_,Confirmed,Deaths,Recovered,Active,Incident_Rate,People_Tested,People_Hospitalized,Mortality_Rate,UID,ISO3";

    #[test]
    fn test_normalize_series_keeps_location_and_dates() {
        let raw = table(
            Feed::Confirmed,
            "Province/State,Country/Region,Lat,Long,1/22/20,1/23/20\n\
             ,Italy,41.9,12.6,0,3\n\
             Isle of Man,United Kingdom ,54.2,-4.5,1,2\n",
        );
        let series = normalize_series(&raw).unwrap();
        assert_eq!(series.date_headers, vec!["1/22/20", "1/23/20"]);
        assert_eq!(series.rows[0].location, "Italy");
        assert_eq!(series.rows[1].location, "United Kingdom");
        assert_eq!(series.rows[1].values, vec!["1", "2"]);
    }

    #[test]
    fn test_normalize_series_missing_column_is_schema_error() {
        let raw = table(Feed::Deaths, "Country/Region,Lat,Long,1/22/20\nItaly,41.9,12.6,0\n");
        let err = normalize_series(&raw).unwrap_err();
        match err {
            PipelineError::Schema { feed, column } => {
                assert_eq!(feed, Feed::Deaths);
                assert_eq!(column, "Province/State");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_normalize_snapshot_coerces_fields() {
        let raw = table(
            Feed::Snapshot,
            &format!(
                "{SNAPSHOT_HEADER}\n\
                 Italy,2020-03-10 04:21:03,41.9,12.6,100,5,10.0,85,1.5,,,5.0,380,ITA\n\
                 Diamond Princess,2020-03-10 04:21:03,,,700,7,,693,,,,,9999,\n"
            ),
        );
        let records = normalize_snapshot(&raw).unwrap();
        assert_eq!(records.len(), 2);

        let italy = &records[0];
        assert_eq!(italy.last_update, NaiveDate::from_ymd_opt(2020, 3, 10).unwrap());
        assert_eq!(italy.lat, Some(41.9));
        assert_eq!(italy.recovered, 10);
        assert_eq!(italy.mortality_rate, Some(5.0));
        assert_eq!(italy.iso3.as_deref(), Some("ITA"));

        let ship = &records[1];
        assert_eq!(ship.lat, None);
        assert_eq!(ship.recovered, 0);
        assert_eq!(ship.iso3, None);
    }

    #[test]
    fn test_normalize_snapshot_bad_timestamp_is_parse_error() {
        let raw = table(
            Feed::Snapshot,
            &format!("{SNAPSHOT_HEADER}\nItaly,10/03/2020,41.9,12.6,1,0,0,1,,,,,380,ITA\n"),
        );
        let err = normalize_snapshot(&raw).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Parse { feed: Feed::Snapshot, row: 1, ref column, .. } if column == "Last_Update"
        ));
    }

    #[test]
    fn test_continent_lookup_first_wins() {
        let raw = table(
            Feed::Continents,
            "Continent,Country\nEurope,Russia\nAsia,Russia\nAfrica, Kenya \n",
        );
        let lookup = normalize_continents(&raw).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.get("Russia"), Some("Europe"));
        assert_eq!(lookup.get("Kenya"), Some("Africa"));
        assert_eq!(lookup.get("Atlantis"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count(Feed::Confirmed, "1/22/20", 1, " 42 ").unwrap(), 42);
        assert_eq!(parse_count(Feed::Confirmed, "1/22/20", 1, "7.0").unwrap(), 7);
        assert!(parse_count(Feed::Confirmed, "1/22/20", 1, "7.5").is_err());
        assert!(parse_count(Feed::Confirmed, "1/22/20", 1, "").is_err());
        assert!(parse_count(Feed::Confirmed, "1/22/20", 1, "n/a").is_err());
    }

    #[test]
    fn test_parse_count_rejects_out_of_range_decimals() {
        let err = parse_count(Feed::Confirmed, "1/22/20", 3, "1e30").unwrap_err();
        assert!(matches!(err, PipelineError::Parse { row: 3, expected: "integer", .. }));
        assert!(parse_count(Feed::Confirmed, "1/22/20", 1, "-1e30").is_err());
        assert!(parse_count(Feed::Confirmed, "1/22/20", 1, "9223372036854775808.0").is_err());
        assert!(parse_count(Feed::Confirmed, "1/22/20", 1, "inf").is_err());
        assert_eq!(parse_count(Feed::Confirmed, "1/22/20", 1, "1e3").unwrap(), 1000);
    }
}
