use chrono::NaiveDate;
use tracing::{info, warn};

use crate::constants::SNAPSHOT_LAST_UPDATE;
use crate::error::{PipelineError, Result};
use crate::types::{FactRow, Feed, SnapshotRow};

/// Most recent `Last_Update` date reported by the snapshot feed
pub fn reported_date(snapshot: &[SnapshotRow]) -> Result<NaiveDate> {
    snapshot
        .iter()
        .map(|row| row.last_update)
        .max()
        .ok_or_else(|| PipelineError::schema(Feed::Snapshot, SNAPSHOT_LAST_UPDATE))
}

/// The as-of date: the reported date when the fact table has rows for it,
/// otherwise the day before. The time-series feeds usually trail the
/// snapshot by a day; a longer lag can still yield an empty latest view.
pub fn select_as_of(reported: NaiveDate, facts: &[FactRow]) -> NaiveDate {
    if facts.iter().any(|row| row.date == reported) {
        return reported;
    }
    let fallback = reported.pred_opt().unwrap_or(reported);
    info!(%reported, %fallback, "Reported date absent from time series, using previous day");
    fallback
}

pub fn latest_rows(facts: &[FactRow], as_of: NaiveDate) -> Vec<FactRow> {
    let rows: Vec<FactRow> = facts.iter().filter(|row| row.date == as_of).cloned().collect();
    if rows.is_empty() {
        warn!(%as_of, "No fact rows for the as-of date");
    }
    rows
}
