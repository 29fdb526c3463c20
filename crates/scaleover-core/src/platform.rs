//! Platform capability: the hosting platform the groups live on.
//!
//! The engine never talks to a platform directly; it is handed a
//! [`PlatformClient`] so tests can inject an in-memory platform and the CLI
//! can inject one backed by the `cf` binary. Commands are issued strictly in
//! sequence, one in flight at a time.

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::state::Lifecycle;

/// Boxed future alias for platform calls.
pub type PlatformFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, PlatformError>> + Send + 'a>>;

/// Errors reported by a platform client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    /// The named group does not exist.
    #[error("{0}")]
    NotFound(String),

    #[error("{command} failed: {message}")]
    Command { command: String, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("decode error: {0}")]
    Decode(String),
}

/// Raw status snapshot of one group as the platform reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStatus {
    pub lifecycle: Lifecycle,
    pub running_count: u32,
    /// May be stale (nonzero) for a stopped group.
    pub requested_count: u32,
    /// Fully-qualified hosts, e.g. `app.example.com`.
    pub routes: Vec<String>,
}

/// Reported state of a single instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Running,
    Starting,
    Crashed,
    Down,
    Unknown,
}

impl InstanceState {
    /// Parse a platform state string (`"RUNNING"`, `"starting"`, ...).
    pub fn from_platform(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "starting" => Self::Starting,
            "crashed" => Self::Crashed,
            "down" => Self::Down,
            _ => Self::Unknown,
        }
    }
}

/// Health entry for one instance of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceHealth {
    pub index: u32,
    pub state: InstanceState,
}

/// Access to the hosting platform.
pub trait PlatformClient: Send + Sync {
    /// Fetch the current status of a group.
    fn group_status<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, GroupStatus>;

    /// Fetch per-instance health. Only used by the readiness gate.
    fn instance_health<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, Vec<InstanceHealth>>;

    /// Set the desired instance count.
    fn set_desired_count<'a>(&'a self, name: &'a str, count: u32) -> PlatformFuture<'a, ()>;

    fn start<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, ()>;

    fn stop<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, ()>;
}
