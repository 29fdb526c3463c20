//! Migration plan: the configuration snapshot for one scaleover run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ScaleoverError, ScaleoverResult};

/// Default bound on a single readiness wait.
pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_secs(600);

/// Default readiness poll interval.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// How to move instances from the source group to the target group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationPlan {
    /// Instances the source keeps. 0 stops it entirely.
    pub leave: u32,
    /// Instances moved per step.
    pub batch_size: u32,
    /// Total wall-clock budget across all steps.
    #[serde(with = "duration_ms")]
    pub rollover_duration: Duration,
    /// Block each scale-down until the target's instances are running.
    pub wait_for_start: bool,
    /// Settle time after the target reports running. Only used with
    /// `wait_for_start`.
    #[serde(with = "duration_ms")]
    pub post_start_sleep: Duration,
    /// Require the two groups to share a route.
    pub enforce_routes: bool,
    /// Upper bound on one readiness wait. `None` waits forever.
    #[serde(with = "option_duration_ms")]
    pub readiness_timeout: Option<Duration>,
    #[serde(with = "duration_ms")]
    pub readiness_poll_interval: Duration,
}

impl Default for MigrationPlan {
    fn default() -> Self {
        Self {
            leave: 0,
            batch_size: 1,
            rollover_duration: Duration::ZERO,
            wait_for_start: false,
            post_start_sleep: Duration::ZERO,
            enforce_routes: true,
            readiness_timeout: Some(DEFAULT_READINESS_TIMEOUT),
            readiness_poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl MigrationPlan {
    pub fn validate(&self) -> ScaleoverResult<()> {
        if self.batch_size == 0 {
            return Err(ScaleoverError::InvalidPlan(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.wait_for_start && self.readiness_poll_interval.is_zero() {
            return Err(ScaleoverError::InvalidPlan(
                "readiness poll interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Delay between steps: the total duration spread over the original
    /// source count. Fixed for the whole run.
    pub fn sleep_interval(&self, orig_instances: u32) -> Duration {
        if orig_instances == 0 {
            return Duration::ZERO;
        }
        self.rollover_duration / orig_instances
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod option_duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}
