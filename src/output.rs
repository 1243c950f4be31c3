use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::types::{
    CaseKind, ContinentTotal, DailySummary, FactColumn, FactRow, JoinGap, LocationStatus,
    SnapshotColumn, SnapshotRow,
};

/// The derived tables of one pipeline run.
///
/// Built once by [`crate::pipeline::Pipeline`] and read by reference
/// afterwards; there is no way to mutate it from outside the crate.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub(crate) facts: Vec<FactRow>,
    pub(crate) latest: Vec<FactRow>,
    pub(crate) snapshot: Vec<SnapshotRow>,
    pub(crate) daily: Vec<DailySummary>,
    pub(crate) locations: Vec<String>,
    pub(crate) as_of: NaiveDate,
    pub(crate) reported_date: NaiveDate,
    pub(crate) join_gaps: Vec<JoinGap>,
}

impl PipelineOutput {
    /// Fact table, ordered by (location, date)
    pub fn facts(&self) -> &[FactRow] {
        &self.facts
    }

    /// Fact rows for the as-of date
    pub fn latest(&self) -> &[FactRow] {
        &self.latest
    }

    /// Snapshot table with continent joined
    pub fn snapshot(&self) -> &[SnapshotRow] {
        &self.snapshot
    }

    /// Global daily summary, ordered by date
    pub fn daily(&self) -> &[DailySummary] {
        &self.daily
    }

    /// Sorted distinct location names of the fact table
    pub fn locations(&self) -> &[String] {
        &self.locations
    }

    pub fn as_of(&self) -> NaiveDate {
        self.as_of
    }

    /// Last-update date reported by the snapshot feed, before the lag fallback
    pub fn reported_date(&self) -> NaiveDate {
        self.reported_date
    }

    pub fn join_gaps(&self) -> &[JoinGap] {
        &self.join_gaps
    }

    /// Chronological rows for one location
    pub fn rows_for_location(&self, location: &str) -> &[FactRow] {
        // Facts are sorted by location, so the rows form one contiguous run
        let start = self.facts.partition_point(|row| row.location.as_str() < location);
        let end = start
            + self.facts[start..].partition_point(|row| row.location.as_str() == location);
        &self.facts[start..end]
    }

    pub fn rows_for_date(&self, date: NaiveDate) -> Vec<&FactRow> {
        self.facts.iter().filter(|row| row.date == date).collect()
    }

    pub fn global_sum(&self, column: FactColumn) -> i64 {
        self.facts.iter().map(|row| row.value(column)).sum()
    }

    /// Sum of a column over the as-of date, e.g. new cases today
    pub fn latest_sum(&self, column: FactColumn) -> i64 {
        self.latest.iter().map(|row| row.value(column)).sum()
    }

    pub fn snapshot_sum(&self, column: SnapshotColumn) -> i64 {
        self.snapshot.iter().map(|row| row.value(column)).sum()
    }

    /// As-of rows with the most new confirmed cases first
    pub fn top_latest(&self, n: usize) -> Vec<&FactRow> {
        let mut rows: Vec<&FactRow> = self.latest.iter().collect();
        rows.sort_by(|a, b| {
            b.new_confirmed
                .cmp(&a.new_confirmed)
                .then_with(|| a.location.cmp(&b.location))
        });
        rows.truncate(n);
        rows
    }

    /// Snapshot totals per continent with per-location children, continents
    /// and locations in name order
    pub fn continent_breakdown(&self, column: SnapshotColumn) -> Vec<ContinentTotal> {
        let mut by_continent: BTreeMap<&str, BTreeMap<&str, i64>> = BTreeMap::new();
        for row in &self.snapshot {
            *by_continent
                .entry(row.continent.as_str())
                .or_default()
                .entry(row.location.as_str())
                .or_insert(0) += row.value(column);
        }

        by_continent
            .into_iter()
            .map(|(continent, locations)| ContinentTotal {
                continent: continent.to_string(),
                total: locations.values().sum(),
                locations: locations
                    .into_iter()
                    .map(|(location, value)| (location.to_string(), value))
                    .collect(),
            })
            .collect()
    }

    /// Snapshot figures for one location, if the snapshot reports it
    pub fn location_status(&self, location: &str) -> Option<LocationStatus> {
        self.snapshot
            .iter()
            .find(|row| row.location == location)
            .map(|row| LocationStatus {
                location: row.location.clone(),
                confirmed: row.confirmed,
                deaths: row.deaths,
                mortality_rate: row.mortality_rate,
            })
    }

    /// Rows that can be drawn on a map, ordered by date: ISO3 present, with
    /// the cumulative total for `kind`
    pub fn map_rows(&self, kind: CaseKind) -> Vec<(NaiveDate, &str, &str, i64)> {
        let column = FactColumn::total(kind);
        let mut rows: Vec<_> = self
            .facts
            .iter()
            .filter_map(|row| {
                row.iso3
                    .as_deref()
                    .map(|iso3| (row.date, row.location.as_str(), iso3, row.value(column)))
            })
            .collect();
        rows.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(b.1)));
        rows
    }
}
