//! Pipeline metrics
//!
//! Thin wrappers over the `metrics` facade. Without an installed recorder every
//! call is a no-op; the CLI installs a Prometheus recorder and writes the
//! rendered snapshot next to the exported tables.

use std::fmt;

use crate::types::{Feed, Lookup};

/// All metric names emitted by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    FetchSuccess,
    FetchError,
    FetchRetries,
    FetchDuration,
    FetchBytes,
    RowsLoaded,
    RowsProduced,
    JoinGaps,
    BuildDuration,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::FetchSuccess => "epi_fetch_success_total",
            MetricName::FetchError => "epi_fetch_error_total",
            MetricName::FetchRetries => "epi_fetch_retries_total",
            MetricName::FetchDuration => "epi_fetch_duration_seconds",
            MetricName::FetchBytes => "epi_fetch_bytes",
            MetricName::RowsLoaded => "epi_rows_loaded_total",
            MetricName::RowsProduced => "epi_rows_produced_total",
            MetricName::JoinGaps => "epi_join_gaps_total",
            MetricName::BuildDuration => "epi_build_duration_seconds",
        }
    }

    pub fn all() -> &'static [MetricName] {
        &[
            MetricName::FetchSuccess,
            MetricName::FetchError,
            MetricName::FetchRetries,
            MetricName::FetchDuration,
            MetricName::FetchBytes,
            MetricName::RowsLoaded,
            MetricName::RowsProduced,
            MetricName::JoinGaps,
            MetricName::BuildDuration,
        ]
    }
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn record_fetch_success(feed: Feed, duration_secs: f64, bytes: usize) {
    ::metrics::counter!(MetricName::FetchSuccess.as_str(), "feed" => feed.name()).increment(1);
    ::metrics::histogram!(MetricName::FetchDuration.as_str(), "feed" => feed.name())
        .record(duration_secs);
    ::metrics::histogram!(MetricName::FetchBytes.as_str(), "feed" => feed.name())
        .record(bytes as f64);
}

pub fn record_fetch_error(feed: Feed) {
    ::metrics::counter!(MetricName::FetchError.as_str(), "feed" => feed.name()).increment(1);
}

pub fn record_fetch_retry(feed: Feed) {
    ::metrics::counter!(MetricName::FetchRetries.as_str(), "feed" => feed.name()).increment(1);
}

pub fn record_rows_loaded(feed: Feed, rows: usize) {
    ::metrics::counter!(MetricName::RowsLoaded.as_str(), "feed" => feed.name())
        .increment(rows as u64);
}

/// Row count of a derived table (`facts`, `latest`, `snapshot`, `daily`)
pub fn record_rows_produced(table: &'static str, rows: usize) {
    ::metrics::counter!(MetricName::RowsProduced.as_str(), "table" => table)
        .increment(rows as u64);
}

pub fn record_join_gap(lookup: Lookup) {
    let label = match lookup {
        Lookup::Continent => "continent",
        Lookup::Geocoding => "geocoding",
        Lookup::Series => "series",
    };
    ::metrics::counter!(MetricName::JoinGaps.as_str(), "lookup" => label).increment(1);
}

pub fn record_build_duration(duration_secs: f64) {
    ::metrics::histogram!(MetricName::BuildDuration.as_str()).record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_follow_convention() {
        for name in MetricName::all() {
            assert!(name.as_str().starts_with("epi_"));
            assert_eq!(name.to_string(), name.as_str());
        }
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_fetch_success(Feed::Confirmed, 0.25, 1024);
        record_fetch_error(Feed::Snapshot);
        record_join_gap(Lookup::Continent);
        record_rows_produced("facts", 10);
    }
}
