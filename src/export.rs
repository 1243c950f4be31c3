use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::Result;
use crate::output::PipelineOutput;
use crate::types::{FactColumn, JoinGap, SnapshotColumn};

/// Headline figures shown at the top of a dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Headline {
    pub new_confirmed: i64,
    pub new_deaths: i64,
    pub total_confirmed: i64,
    pub total_deaths: i64,
    pub total_active: i64,
}

impl Headline {
    pub fn from_output(output: &PipelineOutput) -> Self {
        Self {
            new_confirmed: output.latest_sum(FactColumn::NewConfirmed),
            new_deaths: output.latest_sum(FactColumn::NewDeaths),
            total_confirmed: output.snapshot_sum(SnapshotColumn::Confirmed),
            total_deaths: output.snapshot_sum(SnapshotColumn::Deaths),
            total_active: output.snapshot_sum(SnapshotColumn::Active),
        }
    }
}

/// JSON summary of a run, written next to the exported tables
#[derive(Debug, Serialize)]
pub struct RunReport<'a> {
    pub generated_at: DateTime<Utc>,
    pub as_of: NaiveDate,
    pub reported_date: NaiveDate,
    pub fact_rows: usize,
    pub latest_rows: usize,
    pub snapshot_rows: usize,
    pub daily_rows: usize,
    pub locations: usize,
    pub headline: Headline,
    pub join_gaps: &'a [JoinGap],
}

/// Write every derived table as CSV plus a timestamped JSON run report.
/// Returns the paths written.
pub fn write_tables(output: &PipelineOutput, dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    written.push(write_csv(dir, "facts.csv", output.facts())?);
    written.push(write_csv(dir, "latest.csv", output.latest())?);
    written.push(write_csv(dir, "snapshot.csv", output.snapshot())?);
    written.push(write_csv(dir, "daily_summary.csv", output.daily())?);

    let locations_path = dir.join("locations.csv");
    let mut writer = csv::Writer::from_path(&locations_path)?;
    writer.write_record(["location"])?;
    for location in output.locations() {
        writer.write_record([location])?;
    }
    writer.flush()?;
    written.push(locations_path);

    written.push(write_report(output, dir)?);

    info!("💾 Exported {} files to {}", written.len(), dir.display());
    Ok(written)
}

fn write_csv<T: Serialize>(dir: &Path, name: &str, rows: &[T]) -> Result<PathBuf> {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(path)
}

fn write_report(output: &PipelineOutput, dir: &Path) -> Result<PathBuf> {
    let now = Utc::now();
    let report = RunReport {
        generated_at: now,
        as_of: output.as_of(),
        reported_date: output.reported_date(),
        fact_rows: output.facts().len(),
        latest_rows: output.latest().len(),
        snapshot_rows: output.snapshot().len(),
        daily_rows: output.daily().len(),
        locations: output.locations().len(),
        headline: Headline::from_output(output),
        join_gaps: output.join_gaps(),
    };

    let filename = format!("run_{}.json", now.format("%Y%m%d_%H%M%S"));
    let path = dir.join(filename);
    fs::write(&path, serde_json::to_string_pretty(&report)?)?;
    Ok(path)
}
