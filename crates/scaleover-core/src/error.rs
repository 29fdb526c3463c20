//! Scaleover error types.

use std::time::Duration;

use thiserror::Error;

use crate::platform::PlatformError;

/// Errors that abort a scaleover run.
#[derive(Debug, Error)]
pub enum ScaleoverError {
    /// The named group does not exist. `message` is the platform's own text.
    #[error("{message}")]
    NotFound { name: String, message: String },

    #[error("apps do not share a route: {source_app} and {target_app}")]
    NoSharedRoute {
        source_app: String,
        target_app: String,
    },

    #[error("invalid duration {0:?}: expected a non-negative value such as 1m")]
    InvalidDuration(String),

    #[error("invalid migration plan: {0}")]
    InvalidPlan(String),

    #[error("{command} failed for {group}: {message}")]
    PlatformCommand {
        group: String,
        command: String,
        message: String,
    },

    #[error("instances of {group} not running after {waited:?}")]
    ReadinessTimeout { group: String, waited: Duration },

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),
}

pub type ScaleoverResult<T> = Result<T, ScaleoverError>;
