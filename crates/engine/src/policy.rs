//! Scoped allow-list for background errors
//!
//! Application pages throw and drop requests for reasons unrelated to the
//! assertion under test. The policy names exactly which of those may be
//! ignored; everything else fails the scenario that observed it.

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::driver::{BackgroundError, BackgroundKind};
use crate::error::EngineResult;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPolicy {
    /// Ignore uncaught application exceptions
    #[serde(default = "default_true")]
    pub suppress_uncaught: bool,

    /// Regexes for background errors known to be transient
    #[serde(default = "default_transient_patterns")]
    pub transient_patterns: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_transient_patterns() -> Vec<String> {
    vec!["NetworkError".to_string()]
}

impl Default for ErrorPolicy {
    fn default() -> Self {
        Self {
            suppress_uncaught: true,
            transient_patterns: default_transient_patterns(),
        }
    }
}

impl ErrorPolicy {
    /// Suppress nothing
    pub fn strict() -> Self {
        Self {
            suppress_uncaught: false,
            transient_patterns: Vec::new(),
        }
    }
}

/// Compiled [`ErrorPolicy`]
#[derive(Debug, Clone)]
pub struct ErrorFilter {
    suppress_uncaught: bool,
    transient: Vec<Regex>,
}

impl ErrorFilter {
    pub fn new(policy: &ErrorPolicy) -> EngineResult<Self> {
        let transient = policy
            .transient_patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            suppress_uncaught: policy.suppress_uncaught,
            transient,
        })
    }

    pub fn allows(&self, error: &BackgroundError) -> bool {
        let transient = self.transient.iter().any(|re| re.is_match(&error.message));
        match error.kind {
            BackgroundKind::UncaughtException => self.suppress_uncaught || transient,
            BackgroundKind::NetworkFailure => transient,
        }
    }

    /// Split into (suppressed, unexpected)
    pub fn partition(
        &self,
        errors: Vec<BackgroundError>,
    ) -> (Vec<BackgroundError>, Vec<BackgroundError>) {
        errors.into_iter().partition(|e| self.allows(e))
    }
}
