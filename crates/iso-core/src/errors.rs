//! Structured error types shared across the quantification crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Structured payload attached to every [`QuantError`] variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Stable machine readable error code.
    pub code: String,
    /// Human readable diagnostic message.
    pub message: String,
    /// Contextual key value pairs (sample indices, intervals, values).
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// Optional hint that may help the caller resolve the issue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Creates a new error payload with the provided code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Adds a context entry to the payload.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Sets a human readable hint for remediation.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the quantification engine.
///
/// MCMC correctness cannot be locally repaired, so every variant is
/// terminal for the run that produced it: callers propagate rather than
/// retry. The variants mirror the failure taxonomy of the sampling core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail")]
pub enum QuantError {
    /// The objective function or a derived quantity diverged to a
    /// non-finite value after local recovery was exhausted.
    #[error("numeric error: {0}")]
    Numeric(ErrorInfo),
    /// A caller-supplied value violated a precondition (non-finite
    /// initial point, non-finite hyperparameter, inverted interval).
    #[error("precondition error: {0}")]
    Precondition(ErrorInfo),
    /// Worker or sampler lifecycle misuse (double start, lost worker).
    #[error("lifecycle error: {0}")]
    Lifecycle(ErrorInfo),
    /// Invalid run configuration.
    #[error("config error: {0}")]
    Config(ErrorInfo),
    /// A per-sample collaborator (loader, fragment model) failed.
    #[error("sample error: {0}")]
    Sample(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (code: {})", self.message, self.code)?;
        if !self.context.is_empty() {
            write!(f, " | context: [")?;
            for (idx, (key, value)) in self.context.iter().enumerate() {
                if idx > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{key}={value}")?;
            }
            write!(f, "]")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " | hint: {hint}")?;
        }
        Ok(())
    }
}

impl QuantError {
    /// Returns a reference to the payload describing the error.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            QuantError::Numeric(info)
            | QuantError::Precondition(info)
            | QuantError::Lifecycle(info)
            | QuantError::Config(info)
            | QuantError::Sample(info) => info,
        }
    }

    /// Builds the canonical error for a non-finite value observed where a
    /// finite one was required.
    pub fn non_finite(value: f64, site: &str) -> Self {
        QuantError::Precondition(
            ErrorInfo::new("non-finite", format!("{value} found where finite value expected"))
                .with_context("site", site),
        )
    }
}
