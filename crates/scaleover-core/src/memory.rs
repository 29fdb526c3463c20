//! In-memory platform.
//!
//! Holds named groups in a map, applies commands to them immediately and
//! records every command in issue order. Tests use it to assert on the
//! exact command sequence; the CLI uses it for dry runs seeded from a real
//! platform snapshot.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::platform::{
    GroupStatus, InstanceHealth, InstanceState, PlatformClient, PlatformError, PlatformFuture,
};
use crate::state::{AppState, Lifecycle};

/// A command issued to the platform.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlatformCommand {
    Start { group: String },
    Stop { group: String },
    SetDesiredCount { group: String, count: u32 },
}

impl PlatformCommand {
    pub fn group(&self) -> &str {
        match self {
            Self::Start { group } | Self::Stop { group } | Self::SetDesiredCount { group, .. } => {
                group
            }
        }
    }
}

#[derive(Debug, Default)]
struct MemoryGroup {
    status: Option<GroupStatus>,
    /// Scripted `instance_health` responses, consumed front to back.
    health_script: VecDeque<Result<Vec<InstanceHealth>, PlatformError>>,
    /// When set, every command against this group fails with this message.
    command_failure: Option<String>,
}

#[derive(Debug, Default)]
struct Inner {
    groups: HashMap<String, MemoryGroup>,
    commands: Vec<PlatformCommand>,
    health_polls: u32,
}

/// Platform held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    inner: Mutex<Inner>,
}

impl InMemoryPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a group.
    pub fn insert_group(&self, name: &str, status: GroupStatus) {
        let mut inner = self.lock();
        inner.groups.entry(name.to_string()).or_default().status = Some(status);
    }

    /// Insert a group from an already-derived state.
    pub fn insert_state(&self, state: &AppState) {
        self.insert_group(
            &state.name,
            GroupStatus {
                lifecycle: state.lifecycle,
                running_count: state.count_running,
                requested_count: state.count_requested,
                routes: state.routes.clone(),
            },
        );
    }

    /// Queue a scripted `instance_health` response for `name`.
    ///
    /// Once the script is exhausted, health is derived from the group's
    /// running count.
    pub fn push_health(&self, name: &str, response: Result<Vec<InstanceHealth>, PlatformError>) {
        let mut inner = self.lock();
        inner
            .groups
            .entry(name.to_string())
            .or_default()
            .health_script
            .push_back(response);
    }

    /// Make every subsequent command against `name` fail.
    pub fn fail_commands_for(&self, name: &str, message: &str) {
        let mut inner = self.lock();
        inner.groups.entry(name.to_string()).or_default().command_failure =
            Some(message.to_string());
    }

    pub fn group(&self, name: &str) -> Option<GroupStatus> {
        self.lock().groups.get(name).and_then(|g| g.status.clone())
    }

    /// All commands issued so far, in order.
    pub fn commands(&self) -> Vec<PlatformCommand> {
        self.lock().commands.clone()
    }

    pub fn commands_for(&self, name: &str) -> Vec<PlatformCommand> {
        self.lock()
            .commands
            .iter()
            .filter(|c| c.group() == name)
            .cloned()
            .collect()
    }

    /// Number of `instance_health` calls served.
    pub fn health_polls(&self) -> u32 {
        self.lock().health_polls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-command.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn apply(&self, command: PlatformCommand) -> Result<(), PlatformError> {
        let mut inner = self.lock();
        let name = command.group().to_string();
        let group = inner
            .groups
            .get_mut(&name)
            .ok_or_else(|| PlatformError::NotFound(format!("App {name} not found")))?;

        if let Some(message) = &group.command_failure {
            return Err(PlatformError::Command {
                command: command_label(&command),
                message: message.clone(),
            });
        }

        let status = group
            .status
            .as_mut()
            .ok_or_else(|| PlatformError::NotFound(format!("App {name} not found")))?;

        match &command {
            PlatformCommand::Start { .. } => {
                status.lifecycle = Lifecycle::Started;
                status.running_count = status.requested_count;
            }
            PlatformCommand::Stop { .. } => {
                status.lifecycle = Lifecycle::Stopped;
                status.running_count = 0;
            }
            PlatformCommand::SetDesiredCount { count, .. } => {
                status.requested_count = *count;
                if status.lifecycle == Lifecycle::Started {
                    status.running_count = *count;
                }
            }
        }

        inner.commands.push(command);
        Ok(())
    }
}

fn command_label(command: &PlatformCommand) -> String {
    match command {
        PlatformCommand::Start { .. } => "start".to_string(),
        PlatformCommand::Stop { .. } => "stop".to_string(),
        PlatformCommand::SetDesiredCount { count, .. } => format!("scale -i {count}"),
    }
}

impl PlatformClient for InMemoryPlatform {
    fn group_status<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, GroupStatus> {
        let result = self
            .group(name)
            .ok_or_else(|| PlatformError::NotFound(format!("App {name} not found")));
        Box::pin(async move { result })
    }

    fn instance_health<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, Vec<InstanceHealth>> {
        let result = {
            let mut inner = self.lock();
            inner.health_polls += 1;
            match inner.groups.get_mut(name) {
                None => Err(PlatformError::NotFound(format!("App {name} not found"))),
                Some(group) => match group.health_script.pop_front() {
                    Some(scripted) => scripted,
                    None => Ok(derived_health(group.status.as_ref())),
                },
            }
        };
        Box::pin(async move { result })
    }

    fn set_desired_count<'a>(&'a self, name: &'a str, count: u32) -> PlatformFuture<'a, ()> {
        let result = self.apply(PlatformCommand::SetDesiredCount {
            group: name.to_string(),
            count,
        });
        Box::pin(async move { result })
    }

    fn start<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, ()> {
        let result = self.apply(PlatformCommand::Start {
            group: name.to_string(),
        });
        Box::pin(async move { result })
    }

    fn stop<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, ()> {
        let result = self.apply(PlatformCommand::Stop {
            group: name.to_string(),
        });
        Box::pin(async move { result })
    }
}

fn derived_health(status: Option<&GroupStatus>) -> Vec<InstanceHealth> {
    let running = status.map_or(0, |s| s.running_count);
    (0..running)
        .map(|index| InstanceHealth {
            index,
            state: InstanceState::Running,
        })
        .collect()
}
