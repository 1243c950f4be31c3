use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::constants::SERIES_DATE_FORMAT;
use crate::error::{PipelineError, Result};
use crate::pipeline::normalize::{parse_count, WideSeries};
use crate::types::Feed;

/// Cumulative totals keyed by (location, date). Sub-region rows are already
/// summed, and iteration order is by location then date.
#[derive(Debug, Clone, PartialEq)]
pub struct LongSeries {
    pub feed: Feed,
    pub totals: BTreeMap<(String, NaiveDate), i64>,
}

impl LongSeries {
    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }
}

/// Parse a date column header such as `1/22/20`. Header errors are reported
/// against row 0.
pub fn parse_series_date(feed: Feed, header: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(header.trim(), SERIES_DATE_FORMAT)
        .map_err(|_| PipelineError::parse(feed, header, 0, header, "date (%m/%d/%y)"))
}

/// Pivot one-column-per-date into one entry per (location, date), coercing
/// values to integers and summing rows that share a key.
pub fn melt(series: &WideSeries) -> Result<LongSeries> {
    let feed = series.feed;
    let dates = series
        .date_headers
        .iter()
        .map(|header| parse_series_date(feed, header))
        .collect::<Result<Vec<_>>>()?;

    let mut totals: BTreeMap<(String, NaiveDate), i64> = BTreeMap::new();
    for (i, row) in series.rows.iter().enumerate() {
        for ((date, header), raw) in dates.iter().zip(&series.date_headers).zip(&row.values) {
            let value = parse_count(feed, header, i + 1, raw)?;
            let total = totals.entry((row.location.clone(), *date)).or_insert(0);
            *total = total.checked_add(value).ok_or_else(|| {
                PipelineError::parse(feed, header, i + 1, raw, "integer (sum overflows)")
            })?;
        }
    }

    Ok(LongSeries { feed, totals })
}
