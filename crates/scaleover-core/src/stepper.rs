//! Scale stepper: one up/down step applied to a pair of groups.
//!
//! Each operation takes a state by value, issues the platform commands and
//! returns the updated state. The stop/start transition rules live here:
//!
//! - scaling up a group that is not started starts it
//! - scaling a group down to zero (or below) stops it and pins its
//!   requested count at 1, the smallest count the platform accepts

use tracing::{debug, info};

use crate::error::{ScaleoverError, ScaleoverResult};
use crate::platform::{PlatformClient, PlatformError};
use crate::readiness::{ReadinessGate, ReadinessOutcome};
use crate::state::{AppState, Lifecycle};

/// Requested count a stopped group is left at.
pub const STOP_FLOOR: u32 = 1;

/// Result of scaling the source down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDown {
    pub state: AppState,
    /// Set when the step waited on the target's readiness.
    pub readiness: Option<ReadinessOutcome>,
}

/// Issues step commands against one platform.
pub struct ScaleStepper<'a, P: PlatformClient + ?Sized> {
    platform: &'a P,
}

impl<'a, P: PlatformClient + ?Sized> ScaleStepper<'a, P> {
    pub fn new(platform: &'a P) -> Self {
        Self { platform }
    }

    /// Add up to `batch_size` instances to `target`, never past `ceiling`.
    /// A target already asking for more than `ceiling` keeps its count.
    ///
    /// Starts the group first if it is not already started.
    pub async fn scale_up(
        &self,
        target: AppState,
        ceiling: u32,
        batch_size: u32,
    ) -> ScaleoverResult<AppState> {
        let mut next = target;
        let previous = next.count_requested;
        next.count_requested = previous.max(previous.saturating_add(batch_size).min(ceiling));

        if next.lifecycle != Lifecycle::Started {
            self.platform
                .start(&next.name)
                .await
                .map_err(|e| command_error(&next.name, "start", e))?;
            info!(group = %next.name, "started");
            next.lifecycle = Lifecycle::Started;
        }

        self.platform
            .set_desired_count(&next.name, next.count_requested)
            .await
            .map_err(|e| command_error(&next.name, "scale", e))?;
        debug!(
            group = %next.name,
            from = previous,
            to = next.count_requested,
            "scaled up"
        );

        Ok(next)
    }

    /// Remove up to `batch_size` instances from `source`, never below
    /// `leave_floor`.
    ///
    /// With a gate, waits for `target_name` to be ready before touching the
    /// source. `leave_floor` is signed: it has already been reduced by the
    /// instances the target was running before the run began.
    pub async fn scale_down(
        &self,
        source: AppState,
        leave_floor: i64,
        batch_size: u32,
        target_name: &str,
        gate: Option<&ReadinessGate>,
    ) -> ScaleoverResult<StepDown> {
        let readiness = match gate {
            Some(gate) => Some(gate.await_ready(self.platform, target_name).await?),
            None => None,
        };

        let mut next = source;
        let previous = next.count_requested;
        let requested = (i64::from(next.count_requested) - i64::from(batch_size)).max(leave_floor);

        if requested <= 0 {
            next.count_requested = STOP_FLOOR;
            self.platform
                .stop(&next.name)
                .await
                .map_err(|e| command_error(&next.name, "stop", e))?;
            info!(group = %next.name, "stopped");
            next.lifecycle = Lifecycle::Stopped;
        } else {
            next.count_requested = u32::try_from(requested).unwrap_or(u32::MAX);
        }

        self.platform
            .set_desired_count(&next.name, next.count_requested)
            .await
            .map_err(|e| command_error(&next.name, "scale", e))?;
        debug!(
            group = %next.name,
            from = previous,
            to = next.count_requested,
            "scaled down"
        );

        Ok(StepDown {
            state: next,
            readiness,
        })
    }
}

fn command_error(group: &str, command: &str, err: PlatformError) -> ScaleoverError {
    let message = match err {
        PlatformError::Command { message, .. } => message,
        other => other.to_string(),
    };
    ScaleoverError::PlatformCommand {
        group: group.to_string(),
        command: command.to_string(),
        message,
    }
}
