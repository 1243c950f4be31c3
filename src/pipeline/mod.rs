//! Data preparation pipeline
//!
//! `load → normalize → reshape → difference → join → latest / summary`.
//! A run either produces a complete [`PipelineOutput`] or fails before any
//! derived table is exposed.

pub mod difference;
pub mod join;
pub mod latest;
pub mod normalize;
pub mod reshape;
pub mod summary;

use std::time::Instant;
use tracing::{info, info_span, instrument};

use crate::config::Config;
use crate::error::Result;
use crate::metrics;
use crate::output::PipelineOutput;
use crate::sources::{RawSources, RawTable, SourceLoader, SourceSet};

use difference::DiffSeries;
use join::GapLog;

pub struct Pipeline;

impl Pipeline {
    /// Fetch every feed named in `config` and build the derived tables
    #[instrument(skip(config))]
    pub fn run(config: &Config) -> Result<PipelineOutput> {
        let loader = SourceLoader::from_config(config)?;
        Self::build(&config.source_set(), &loader)
    }

    pub fn build(sources: &SourceSet, loader: &SourceLoader) -> Result<PipelineOutput> {
        info!("🚀 Starting pipeline");
        let started = Instant::now();

        let raw = loader.load_all(sources)?;
        let output = Self::build_from_raw(&raw)?;

        let secs = started.elapsed().as_secs_f64();
        metrics::record_build_duration(secs);
        info!("✅ Pipeline finished in {:.2}s", secs);
        Ok(output)
    }

    /// Build the derived tables from already fetched sources. No I/O.
    pub fn build_from_raw(raw: &RawSources) -> Result<PipelineOutput> {
        let continents = normalize::normalize_continents(&raw.continents)?;
        let snapshot_records = normalize::normalize_snapshot(&raw.snapshot)?;
        info!(
            continents = continents.len(),
            snapshot_rows = snapshot_records.len(),
            "Normalized lookup feeds"
        );

        let confirmed = Self::time_series(&raw.confirmed)?;
        let deaths = Self::time_series(&raw.deaths)?;
        let recovered = Self::time_series(&raw.recovered)?;

        let mut gaps = GapLog::default();
        let facts = join::join_facts(
            &confirmed,
            &deaths,
            &recovered,
            &continents,
            &snapshot_records,
            &mut gaps,
        );
        let snapshot = join::join_snapshot(snapshot_records, &continents);

        let reported_date = latest::reported_date(&snapshot)?;
        let as_of = latest::select_as_of(reported_date, &facts);
        let latest = latest::latest_rows(&facts, as_of);
        let daily = summary::daily_summary(&facts);

        // Facts are ordered by location, so adjacent dedup yields a sorted list
        let mut locations: Vec<String> = facts.iter().map(|row| row.location.clone()).collect();
        locations.dedup();

        let join_gaps = gaps.into_gaps();
        info!(
            facts = facts.len(),
            latest = latest.len(),
            daily = daily.len(),
            locations = locations.len(),
            join_gaps = join_gaps.len(),
            %as_of,
            "Built derived tables"
        );
        metrics::record_rows_produced("facts", facts.len());
        metrics::record_rows_produced("latest", latest.len());
        metrics::record_rows_produced("snapshot", snapshot.len());
        metrics::record_rows_produced("daily", daily.len());

        Ok(PipelineOutput {
            facts,
            latest,
            snapshot,
            daily,
            locations,
            as_of,
            reported_date,
            join_gaps,
        })
    }

    /// Normalize, melt and difference one wide time-series feed
    fn time_series(table: &RawTable) -> Result<DiffSeries> {
        let span = info_span!("time_series", feed = %table.feed);
        let _enter = span.enter();

        let wide = normalize::normalize_series(table)?;
        let long = reshape::melt(&wide)?;
        let diffed = difference::difference(&long);
        info!(
            raw_rows = wide.rows.len(),
            dates = wide.date_headers.len(),
            grouped = long.len(),
            "Reshaped time series"
        );
        Ok(diffed)
    }
}
