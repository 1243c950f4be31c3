//! Source loading
//!
//! Fetches each feed by reference (URL or local path) and parses it into a
//! [`RawTable`]. Unreachable or non-tabular sources fail with
//! [`PipelineError::Fetch`]; column checks are left to the normalizer.

pub mod http;
pub mod retry;

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::metrics;
use crate::types::Feed;

pub use http::{Fetcher, HttpFetcher};
pub use retry::{FetchFailure, RetryPolicy};

/// Where a feed lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    Url(String),
    Path(PathBuf),
}

impl SourceRef {
    /// `http://` and `https://` references are URLs; anything else is a path
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        let lower = reference.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceRef::Url(reference.to_string())
        } else {
            SourceRef::Path(PathBuf::from(reference))
        }
    }

    pub fn describe(&self) -> String {
        match self {
            SourceRef::Url(url) => url.clone(),
            SourceRef::Path(path) => path.display().to_string(),
        }
    }
}

/// References to all five feeds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSet {
    pub confirmed: SourceRef,
    pub deaths: SourceRef,
    pub recovered: SourceRef,
    pub snapshot: SourceRef,
    pub continents: SourceRef,
}

impl SourceSet {
    pub fn get(&self, feed: Feed) -> &SourceRef {
        match feed {
            Feed::Confirmed => &self.confirmed,
            Feed::Deaths => &self.deaths,
            Feed::Recovered => &self.recovered,
            Feed::Snapshot => &self.snapshot,
            Feed::Continents => &self.continents,
        }
    }
}

/// A parsed CSV source: header names plus string cells, untyped
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub feed: Feed,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    /// Parse CSV bytes. Ragged rows, invalid UTF-8 and header-less input are
    /// treated as a malformed source.
    pub fn from_csv(feed: Feed, location: &str, bytes: &[u8]) -> Result<Self> {
        let malformed =
            |e: csv::Error| PipelineError::fetch(feed, location, format!("malformed CSV: {e}"));

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(bytes);

        let headers: Vec<String> = reader
            .headers()
            .map_err(malformed)?
            .iter()
            .map(str::to_string)
            .collect();
        if headers.iter().all(|h| h.is_empty()) {
            return Err(PipelineError::fetch(
                feed,
                location,
                "malformed CSV: no header row",
            ));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(malformed)?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self {
            feed,
            headers,
            rows,
        })
    }

    /// Index of a required column
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.optional_column_index(name)
            .ok_or_else(|| PipelineError::schema(self.feed, name))
    }

    pub fn optional_column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// The five feeds as fetched, before normalization
#[derive(Debug, Clone)]
pub struct RawSources {
    pub confirmed: RawTable,
    pub deaths: RawTable,
    pub recovered: RawTable,
    pub snapshot: RawTable,
    pub continents: RawTable,
}

pub struct SourceLoader {
    http: Box<dyn Fetcher>,
    retry: RetryPolicy,
}

impl SourceLoader {
    pub fn new(http: Box<dyn Fetcher>, retry: RetryPolicy) -> Self {
        Self { http, retry }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http = HttpFetcher::new(
            Duration::from_secs(config.fetch.timeout_seconds),
            &config.fetch.user_agent,
        )?;
        Ok(Self::new(Box::new(http), config.retry_policy()))
    }

    /// Fetch raw bytes. HTTP fetches are retried per the policy; file reads are not.
    pub fn fetch_bytes(&self, feed: Feed, source: &SourceRef) -> Result<Vec<u8>> {
        let location = source.describe();
        let started = Instant::now();

        let fetched = match source {
            SourceRef::Url(url) => self
                .retry
                .run(feed, |_| self.http.get(url))
                .map_err(|failure| failure.message),
            SourceRef::Path(path) => RetryPolicy::none()
                .run(feed, |_| {
                    fs::read(path).map_err(|e| FetchFailure::permanent(e.to_string()))
                })
                .map_err(|failure| failure.message),
        };

        match fetched {
            Ok(bytes) => {
                metrics::record_fetch_success(feed, started.elapsed().as_secs_f64(), bytes.len());
                Ok(bytes)
            }
            Err(message) => {
                metrics::record_fetch_error(feed);
                Err(PipelineError::fetch(feed, location, message))
            }
        }
    }

    #[instrument(skip(self, feed, source), fields(feed = %feed, source = %source.describe()))]
    pub fn load(&self, feed: Feed, source: &SourceRef) -> Result<RawTable> {
        let bytes = self.fetch_bytes(feed, source)?;
        let table = RawTable::from_csv(feed, &source.describe(), &bytes)?;
        info!(
            "Loaded {} rows x {} columns ({} bytes)",
            table.len(),
            table.headers.len(),
            bytes.len()
        );
        metrics::record_rows_loaded(feed, table.len());
        Ok(table)
    }

    pub fn load_all(&self, sources: &SourceSet) -> Result<RawSources> {
        Ok(RawSources {
            confirmed: self.load(Feed::Confirmed, &sources.confirmed)?,
            deaths: self.load(Feed::Deaths, &sources.deaths)?,
            recovered: self.load(Feed::Recovered, &sources.recovered)?,
            snapshot: self.load(Feed::Snapshot, &sources.snapshot)?,
            continents: self.load(Feed::Continents, &sources.continents)?,
        })
    }
}
