//! Error types for specsieve

/// Result type alias using specsieve's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for specsieve operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Tabular data that could not be parsed
    #[error("table '{table_id}' is malformed: {reason}")]
    Table { table_id: String, reason: String },

    /// A segmentation phase failed
    #[error("segmentation phase '{phase}' failed: {reason}")]
    Segmentation { phase: String, reason: String },

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// CSV reader/writer errors
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// YAML configuration errors
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a new malformed-table error
    pub fn table(table_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Table {
            table_id: table_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a new segmentation error
    pub fn segmentation(phase: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Segmentation {
            phase: phase.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
