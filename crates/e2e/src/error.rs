//! Error types for E2E runs

use checkout_common::{Marker, Visibility};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("UI mismatch: expected {marker:?} {expected:?} but it was {observed:?}")]
    ValidationMismatch {
        marker: Marker,
        expected: Visibility,
        observed: Visibility,
    },

    #[error("Persisted state mismatch on {what}: expected {expected}, found {observed}")]
    PersistedStateMismatch {
        what: String,
        expected: String,
        observed: String,
    },

    #[error("Timeout after {timeout:?} waiting for {marker:?} to be {expected:?}")]
    UiAssertionTimeout {
        marker: Marker,
        expected: Visibility,
        timeout: Duration,
    },

    #[error("Cleanup failed, store can no longer be trusted: {0}")]
    CleanupFailure(String),

    #[error("SUT failed to start: {0}")]
    SutStartup(String),

    #[error("SUT availability check failed after {0} attempts")]
    SutHealthCheck(usize),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Scenario error: {0}")]
    Scenario(#[from] checkout_common::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Triage bucket for a failed scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    Validation,
    PersistedState,
    Timeout,
    Cleanup,
    Infrastructure,
}

impl E2eError {
    pub fn category(&self) -> FailureCategory {
        match self {
            E2eError::ValidationMismatch { .. } => FailureCategory::Validation,
            E2eError::PersistedStateMismatch { .. } => FailureCategory::PersistedState,
            E2eError::UiAssertionTimeout { .. } | E2eError::Timeout(_) => FailureCategory::Timeout,
            E2eError::CleanupFailure(_) => FailureCategory::Cleanup,
            _ => FailureCategory::Infrastructure,
        }
    }

    /// Fatal errors stop the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(self, E2eError::CleanupFailure(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;
