use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{PipelineError, Result};
use crate::sources::{RetryPolicy, SourceRef, SourceSet};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sources: SourcesConfig,
    pub fetch: FetchConfig,
    pub output: OutputConfig,
}

/// Location of each feed: an `http(s)://` URL or a local path
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub confirmed: String,
    pub deaths: String,
    pub recovered: String,
    pub snapshot: String,
    pub continents: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            confirmed: constants::CONFIRMED_URL.to_string(),
            deaths: constants::DEATHS_URL.to_string(),
            recovered: constants::RECOVERED_URL.to_string(),
            snapshot: constants::SNAPSHOT_URL.to_string(),
            continents: constants::CONTINENTS_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_attempts: 3,
            retry_delay_ms: 500,
            user_agent: concat!("epi_pipeline/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from `EPI_PIPELINE_CONFIG`, or from
    /// `pipeline.toml` in the working directory. Falls back to built-in defaults
    /// when no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var(constants::CONFIG_ENV_VAR).ok().map(PathBuf::from));

        let config = match explicit {
            Some(path) => Self::from_file(&path)?,
            None => {
                let default_path = Path::new(constants::DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    tracing::debug!("No config file found, using built-in defaults");
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            PipelineError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch.max_attempts == 0 {
            return Err(PipelineError::Config(
                "fetch.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.fetch.timeout_seconds == 0 {
            return Err(PipelineError::Config(
                "fetch.timeout_seconds must be greater than 0".to_string(),
            ));
        }

        let sources = [
            ("confirmed", &self.sources.confirmed),
            ("deaths", &self.sources.deaths),
            ("recovered", &self.sources.recovered),
            ("snapshot", &self.sources.snapshot),
            ("continents", &self.sources.continents),
        ];
        for (name, value) in sources {
            if value.trim().is_empty() {
                return Err(PipelineError::Config(format!(
                    "sources.{name} must not be empty"
                )));
            }
        }
        Ok(())
    }

    pub fn source_set(&self) -> SourceSet {
        SourceSet {
            confirmed: SourceRef::parse(&self.sources.confirmed),
            deaths: SourceRef::parse(&self.sources.deaths),
            recovered: SourceRef::parse(&self.sources.recovered),
            snapshot: SourceRef::parse(&self.sources.snapshot),
            continents: SourceRef::parse(&self.sources.continents),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.fetch.max_attempts,
            base_delay_ms: self.fetch.retry_delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_point_at_public_feeds() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sources.snapshot, constants::SNAPSHOT_URL);
        assert_eq!(config.fetch.max_attempts, 3);
        assert!(matches!(config.source_set().confirmed, SourceRef::Url(_)));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[sources]\nconfirmed = \"data/confirmed.csv\"\n\n[fetch]\nmax_attempts = 5"
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.fetch.max_attempts, 5);
        assert_eq!(config.fetch.timeout_seconds, 30);
        assert_eq!(config.sources.deaths, constants::DEATHS_URL);
        assert_eq!(
            config.source_set().confirmed,
            SourceRef::Path(PathBuf::from("data/confirmed.csv"))
        );
    }

    #[test]
    fn test_rejects_zero_attempts() {
        let mut config = Config::default();
        config.fetch.max_attempts = 0;
        assert!(matches!(config.validate(), Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_rejects_empty_source() {
        let mut config = Config::default();
        config.sources.continents = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sources.continents"));
    }
}
