use flight_sweep_core::ConfigurationError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SweepError>;

/// Errors that abort a whole batch.
///
/// Per-run problems never show up here; they are reported as
/// [`RunOutcome::Failure`](crate::executor::RunOutcome::Failure).
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("invalid scenario: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("scenario expanded to zero parameter sets")]
    EmptyBatch,

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("run {sweep_index} exhausted system resources: {message}")]
    ResourceExhausted { sweep_index: usize, message: String },

    #[error("aggregation invariant violated: {0}")]
    Aggregation(String),

    #[error(transparent)]
    Export(#[from] ExportError),
}

/// Errors raised while writing aggregation results to disk.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("no results to export")]
    Empty,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),
}
