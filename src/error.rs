use crate::types::Feed;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to fetch {feed} source '{location}': {message}")]
    Fetch {
        feed: Feed,
        location: String,
        message: String,
    },

    #[error("{feed} source is missing expected column '{column}'")]
    Schema { feed: Feed, column: String },

    #[error("{feed} source, column '{column}', row {row}: cannot parse '{value}' as {expected}")]
    Parse {
        feed: Feed,
        column: String,
        row: usize,
        value: String,
        expected: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),
}

impl PipelineError {
    pub fn fetch(feed: Feed, location: impl Into<String>, message: impl Into<String>) -> Self {
        PipelineError::Fetch {
            feed,
            location: location.into(),
            message: message.into(),
        }
    }

    pub fn schema(feed: Feed, column: impl Into<String>) -> Self {
        PipelineError::Schema {
            feed,
            column: column.into(),
        }
    }

    pub fn parse(
        feed: Feed,
        column: impl Into<String>,
        row: usize,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        PipelineError::Parse {
            feed,
            column: column.into(),
            row,
            value: value.into(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
