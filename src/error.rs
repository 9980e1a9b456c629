use thiserror::Error;

#[derive(Error, Debug)]
pub enum SalesEngineError {
    #[error("Invalid growth rate {0}: must be a finite percentage")]
    InvalidGrowthRate(f64),

    #[error("Invalid grouping: {0}")]
    InvalidGrouping(String),

    #[error("Measure column '{0}' is requested with conflicting aggregations")]
    ConflictingMeasure(String),

    #[error("Invalid top-N limit: must be at least 1")]
    InvalidTopN,

    #[error("Row {row} has {found} cells but the header declares {expected} columns")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Pivot row '{row}' totals {pivot_total} but the grouped sum is {table_total}")]
    MarginMismatch {
        row: String,
        pivot_total: f64,
        table_total: f64,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SalesEngineError>;
