pub mod config;
pub mod constants;
pub mod error;
pub mod export;
pub mod logging;
pub mod metrics;
pub mod output;
pub mod pipeline;
pub mod sources;
pub mod types;

pub use error::{PipelineError, Result};
pub use output::PipelineOutput;
pub use pipeline::Pipeline;
