//! Readiness gate: wait for a group's instances to report running.
//!
//! Polls per-instance health at a fixed interval until every instance is
//! `Running`, then sleeps the post-start settle time once. The wait is
//! bounded by an optional deadline.
//!
//! A failed health fetch ends the wait without an error: the caller goes on
//! to scale the source down without confirmed readiness. The outcome
//! records this as [`ReadinessOutcome::Abandoned`] so it can be reported.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{ScaleoverError, ScaleoverResult};
use crate::plan::MigrationPlan;
use crate::platform::{InstanceState, PlatformClient};

/// How a readiness wait ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadinessOutcome {
    /// Every instance reported running.
    Ready { polls: u32 },
    /// The health fetch failed and the wait was given up.
    Abandoned { reason: String, polls: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadinessGate {
    pub poll_interval: Duration,
    pub post_start_sleep: Duration,
    /// `None` polls until ready or a fetch fails.
    pub deadline: Option<Duration>,
}

impl ReadinessGate {
    pub fn from_plan(plan: &MigrationPlan) -> Self {
        Self {
            poll_interval: plan.readiness_poll_interval,
            post_start_sleep: plan.post_start_sleep,
            deadline: plan.readiness_timeout,
        }
    }

    /// Block until every instance of `group` is running.
    pub async fn await_ready<P>(&self, platform: &P, group: &str) -> ScaleoverResult<ReadinessOutcome>
    where
        P: PlatformClient + ?Sized,
    {
        let started = Instant::now();
        let mut polls = 0u32;

        loop {
            polls += 1;
            let instances = match platform.instance_health(group).await {
                Ok(instances) => instances,
                Err(e) => {
                    warn!(
                        %group,
                        polls,
                        error = %e,
                        "cannot fetch instance health, scaling down without confirmed readiness"
                    );
                    return Ok(ReadinessOutcome::Abandoned {
                        reason: e.to_string(),
                        polls,
                    });
                }
            };

            let pending = instances
                .iter()
                .filter(|i| i.state != InstanceState::Running)
                .count();

            if pending == 0 {
                debug!(%group, polls, instances = instances.len(), "all instances running");
                if !self.post_start_sleep.is_zero() {
                    info!(%group, sleep = ?self.post_start_sleep, "waiting for instances to settle");
                    tokio::time::sleep(self.post_start_sleep).await;
                }
                return Ok(ReadinessOutcome::Ready { polls });
            }

            let elapsed = started.elapsed();
            let mut delay = self.poll_interval;
            if let Some(deadline) = self.deadline {
                if elapsed >= deadline {
                    return Err(ScaleoverError::ReadinessTimeout {
                        group: group.to_string(),
                        waited: elapsed,
                    });
                }
                delay = delay.min(deadline - elapsed);
            }

            debug!(%group, pending, total = instances.len(), "instances not yet running");
            tokio::time::sleep(delay).await;
        }
    }
}
