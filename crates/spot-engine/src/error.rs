//! Error types for the spot engine
//!
//! Only validation and provider failures are errors. Missing zones, missing
//! price history and predicted prices are handled as fallbacks and surface
//! as reduced confidence instead.

use crate::models::CloudProvider;
use std::fmt;
use std::time::Duration;

/// Malformed requirements, reported before any provider call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("validation error [field={field}]: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Failure reported by an external data provider
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// The provider has no credentials or is switched off.
    #[error("{provider} provider unavailable: {reason}")]
    Unavailable {
        provider: CloudProvider,
        reason: String,
    },

    /// The call exceeded the configured deadline.
    #[error("{operation} timed out after {}ms", .elapsed.as_millis())]
    Timeout {
        operation: &'static str,
        elapsed: Duration,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{provider} {operation} failed for region={region}: {message}")]
    Fetch {
        provider: CloudProvider,
        region: String,
        operation: &'static str,
        message: String,
    },

    /// No provider set is registered for the requested vendor.
    #[error("unsupported cloud provider: {0}")]
    UnsupportedProvider(CloudProvider),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Stage of the analysis pipeline an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPhase {
    Validation,
    FetchSpotData,
    FetchSpecs,
}

impl AnalysisPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisPhase::Validation => "validation",
            AnalysisPhase::FetchSpotData => "fetch_spot_data",
            AnalysisPhase::FetchSpecs => "fetch_specs",
        }
    }
}

impl fmt::Display for AnalysisPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fatal error of one analysis call
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("analysis error [phase=validation]: {0}")]
    Validation(#[from] ValidationError),

    #[error("analysis error [phase={phase}]: {source}")]
    Provider {
        phase: AnalysisPhase,
        #[source]
        source: ProviderError,
    },
}

impl AnalysisError {
    pub fn provider(phase: AnalysisPhase, source: ProviderError) -> Self {
        AnalysisError::Provider { phase, source }
    }

    pub fn phase(&self) -> AnalysisPhase {
        match self {
            AnalysisError::Validation(_) => AnalysisPhase::Validation,
            AnalysisError::Provider { phase, .. } => *phase,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
