use changelens_graphs::GraphError;
use serde::{Deserialize, Serialize};

/// Top-level changelens error type.
///
/// Only configuration problems and an empty change set abort a run. Per-file
/// extraction failures are recorded as [`DegradeReason`]s on the file instead.
#[derive(thiserror::Error, Debug)]
pub enum LensError {
    /// Error in configuration parsing, validation or rule compilation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// No file changes were supplied.
    #[error("Empty change set: nothing to analyze")]
    EmptyChangeSet,

    /// Filesystem I/O error while reading configuration.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors in changelens configuration parsing and validation.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// The configuration file does not exist at the expected path.
    #[error("Config file not found: {0}")]
    NotFound(String),

    /// Configuration values are present but semantically invalid, including
    /// role, capability and area patterns that fail to compile.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// Configuration file syntax could not be parsed (TOML error).
    #[error("Parse error: {0}")]
    Parse(String),
}

/// Per-file extraction failures. Never propagated past the extractor.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// Source text could not be parsed, or was too large to try.
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// Path of the file that failed to parse.
        path: String,
        /// Description of the parse failure.
        message: String,
    },

    /// Parsing ran past the per-file budget.
    #[error("Extraction of {path} exceeded its {budget_ms}ms budget")]
    Timeout { path: String, budget_ms: u64 },
}

impl ExtractError {
    /// Map a structure-engine failure for `path` onto the per-file taxonomy.
    pub fn from_graph(path: &str, err: GraphError) -> Self {
        match err {
            GraphError::Timeout { budget_ms, .. } => Self::Timeout {
                path: path.to_string(),
                budget_ms,
            },
            GraphError::Parse { message, .. } => Self::Parse {
                path: path.to_string(),
                message,
            },
            other => Self::Parse {
                path: path.to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Why a file's entities were dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DegradeReason {
    ParseFailure { message: String },
    ExtractionTimeout { budget_ms: u64 },
}

impl From<&ExtractError> for DegradeReason {
    fn from(err: &ExtractError) -> Self {
        match err {
            ExtractError::Parse { message, .. } => Self::ParseFailure {
                message: message.clone(),
            },
            ExtractError::Timeout { budget_ms, .. } => Self::ExtractionTimeout {
                budget_ms: *budget_ms,
            },
        }
    }
}

/// Convenience alias for `Result<T, LensError>`.
pub type Result<T> = std::result::Result<T, LensError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn graph_errors_map_onto_extract_errors() {
        let timeout = ExtractError::from_graph(
            "a.rs",
            GraphError::Timeout {
                path: "a.rs".into(),
                budget_ms: 5,
            },
        );
        assert_eq!(
            DegradeReason::from(&timeout),
            DegradeReason::ExtractionTimeout { budget_ms: 5 }
        );

        let other = ExtractError::from_graph("a.rs", GraphError::TreeSitter("boom".into()));
        assert!(matches!(
            DegradeReason::from(&other),
            DegradeReason::ParseFailure { message } if message.contains("boom")
        ));
    }

    #[test]
    fn config_errors_convert_into_lens_errors() {
        let err: LensError = ConfigError::Invalid("bad weight".into()).into();
        assert_eq!(err.to_string(), "Configuration error: Invalid config: bad weight");
    }
}
