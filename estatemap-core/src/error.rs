//! Error types for estatemap operations

use thiserror::Error;

/// Failures of one source fetch.
///
/// Cloneable so a single outcome can be handed to every caller that was
/// waiting on the same in-flight refresh.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("Source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    #[error("No range configured for dataset key '{key}'")]
    InvalidDatasetKey { key: String },

    #[error("Unexpected upstream response: {reason}")]
    UpstreamFormat { reason: String },
}

impl FetchError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            reason: reason.into(),
        }
    }

    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidDatasetKey { key: key.into() }
    }

    pub fn upstream_format(reason: impl Into<String>) -> Self {
        Self::UpstreamFormat {
            reason: reason.into(),
        }
    }

    /// Stable short label, used as a metric/log field.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::InvalidDatasetKey { .. } => "invalid_dataset_key",
            Self::UpstreamFormat { .. } => "upstream_format",
        }
    }
}

/// Per-row problems. Never surfaced past the normalizer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RowError {
    #[error("Malformed row: missing {field}")]
    MalformedRow { field: &'static str },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required configuration field: {field}")]
    MissingRequired { field: String },

    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse {source_name}: {reason}")]
    Parse { source_name: String, reason: String },
}

impl ConfigError {
    pub fn invalid(
        field: impl Into<String>,
        value: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }
}

/// Master error type for all estatemap errors.
#[derive(Debug, Clone, Error)]
pub enum EstateError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Row error: {0}")]
    Row(#[from] RowError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for estatemap operations.
pub type EstateResult<T> = Result<T, EstateError>;
