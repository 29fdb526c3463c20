//! Scaling state of one instance group.

use std::fmt;

use tracing::debug;

use crate::error::{ScaleoverError, ScaleoverResult};
use crate::platform::{GroupStatus, PlatformClient, PlatformError};

/// Requested lifecycle of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lifecycle {
    #[default]
    Unknown,
    Started,
    Stopped,
}

impl Lifecycle {
    /// Parse a platform state string. Anything unrecognised is `Unknown`.
    pub fn from_platform(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "started" => Self::Started,
            "stopped" => Self::Stopped,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Started => "started",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Known scaling state of one group.
///
/// `count_requested` is whatever was last sent to (or observed from) the
/// platform, which can run ahead of `count_running` while instances are
/// being provisioned.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    pub name: String,
    pub count_running: u32,
    pub count_requested: u32,
    pub lifecycle: Lifecycle,
    /// Display order is preserved; comparisons treat this as a set.
    pub routes: Vec<String>,
}

impl AppState {
    /// A state with no routes, for building fixtures and dry runs.
    pub fn new(name: &str, count_requested: u32, count_running: u32, lifecycle: Lifecycle) -> Self {
        Self {
            name: name.to_string(),
            count_running,
            count_requested,
            lifecycle,
            routes: Vec::new(),
        }
    }

    pub fn with_routes<I, S>(mut self, routes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.routes = routes.into_iter().map(Into::into).collect();
        self
    }

    /// Derive state from a raw platform snapshot.
    ///
    /// A stopped group may report a stale nonzero requested count, so the
    /// requested count of a stopped group is always 0.
    pub fn from_status(name: &str, status: GroupStatus) -> Self {
        let count_requested = if status.lifecycle == Lifecycle::Stopped {
            0
        } else {
            status.requested_count
        };
        Self {
            name: name.to_string(),
            count_running: status.running_count,
            count_requested,
            lifecycle: status.lifecycle,
            routes: status.routes,
        }
    }
}

/// Fetch a fresh state for `name`.
///
/// A missing group surfaces as [`ScaleoverError::NotFound`] carrying the
/// platform's message.
pub async fn fetch_app_state<P>(platform: &P, name: &str) -> ScaleoverResult<AppState>
where
    P: PlatformClient + ?Sized,
{
    let status = platform.group_status(name).await.map_err(|e| match e {
        PlatformError::NotFound(message) => ScaleoverError::NotFound {
            name: name.to_string(),
            message,
        },
        other => ScaleoverError::Platform(other),
    })?;
    let state = AppState::from_status(name, status);
    debug!(
        group = %state.name,
        lifecycle = %state.lifecycle,
        requested = state.count_requested,
        running = state.count_running,
        routes = state.routes.len(),
        "fetched group status"
    );
    Ok(state)
}
