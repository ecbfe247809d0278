#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

impl MetricsError {
    /// True for failures caused by the caller's input rather than by I/O or
    /// the database.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            MetricsError::InvalidArgument(_)
                | MetricsError::InvalidRange(_)
                | MetricsError::InvalidRecord(_)
                | MetricsError::InvalidConfiguration(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, MetricsError>;
