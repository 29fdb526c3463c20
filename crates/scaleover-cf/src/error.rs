//! Cloud Foundry client errors.

use scaleover_core::PlatformError;
use thiserror::Error;

pub type CfResult<T> = Result<T, CfError>;

#[derive(Debug, Error)]
pub enum CfError {
    #[error("failed to execute {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cf {args} exited with code {code}: {stderr}")]
    Exit {
        args: String,
        code: i32,
        stderr: String,
    },

    #[error("invalid response from {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path}: {detail}")]
    Api { path: String, detail: String },

    #[error("App {0} not found")]
    AppNotFound(String),
}

impl From<CfError> for PlatformError {
    fn from(err: CfError) -> Self {
        match err {
            CfError::AppNotFound(_) => PlatformError::NotFound(err.to_string()),
            CfError::Exit { args, stderr, .. } => PlatformError::Command {
                command: format!("cf {args}"),
                message: stderr,
            },
            CfError::Spawn { .. } => PlatformError::Transport(err.to_string()),
            CfError::Json { .. } | CfError::Api { .. } => PlatformError::Decode(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_not_found_maps_to_platform_not_found() {
        let err: PlatformError = CfError::AppNotFound("blue".to_string()).into();
        assert_eq!(err, PlatformError::NotFound("App blue not found".to_string()));
    }

    #[test]
    fn exit_maps_to_command_with_stderr() {
        let err: PlatformError = CfError::Exit {
            args: "stop blue".to_string(),
            code: 1,
            stderr: "Not logged in.".to_string(),
        }
        .into();
        assert_eq!(
            err,
            PlatformError::Command {
                command: "cf stop blue".to_string(),
                message: "Not logged in.".to_string(),
            }
        );
    }
}
