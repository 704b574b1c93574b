//! Error types for scenario execution

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Invalid range for {kind}: min={min}, max={max}")]
    InvalidRange { kind: String, min: i64, max: i64 },

    #[error("Unknown field: {0}")]
    UnknownField(String),

    #[error("Duplicate field in form: {0}")]
    DuplicateField(String),

    #[error("Invalid form '{form}': {reason}")]
    InvalidForm { form: String, reason: String },

    #[error("Form spec parse error: {0}")]
    SpecParse(String),

    #[error("Validation failed: {check}\n  expected: {expected}\n  actual:   {actual}")]
    Validation {
        check: String,
        expected: String,
        actual: String,
    },

    #[error("Timed out after {waited_ms} ms waiting for interception @{alias}")]
    InterceptionTimeout { alias: String, waited_ms: u64 },

    #[error("No interception registered under alias @{0}")]
    UnknownAlias(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Browser bridge not available: {0}")]
    BridgeUnavailable(String),

    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("No credentials for role '{0}'")]
    MissingCredentials(String),

    #[error("Target {url} unreachable after {attempts} attempts")]
    TargetUnreachable { url: String, attempts: usize },

    #[error("Background error not covered by policy: {0}")]
    Background(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Pattern error: {0}")]
    Regex(#[from] regex::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Coarse failure buckets used in reports for triage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Validation,
    InterceptionTimeout,
    Driver,
    Setup,
    Background,
}

impl EngineError {
    pub fn validation(
        check: impl Into<String>,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        EngineError::Validation {
            check: check.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn category(&self) -> FailureCategory {
        match self {
            EngineError::Validation { .. } => FailureCategory::Validation,
            EngineError::InterceptionTimeout { .. } => FailureCategory::InterceptionTimeout,
            EngineError::Driver(_)
            | EngineError::BridgeUnavailable(_)
            | EngineError::UnknownAlias(_)
            | EngineError::InvalidStateTransition { .. } => FailureCategory::Driver,
            EngineError::Background(_) => FailureCategory::Background,
            _ => FailureCategory::Setup,
        }
    }
}
