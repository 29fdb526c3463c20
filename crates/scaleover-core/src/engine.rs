//! Scaleover engine: drives the migration state machine.
//!
//! The engine validates preconditions, then alternates target scale-ups and
//! source scale-downs until the original source count has been moved,
//! sleeping a fixed interval between steps. Every step commits
//! platform-visible changes; there is no rollback on abort.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ScaleoverResult;
use crate::plan::MigrationPlan;
use crate::platform::PlatformClient;
use crate::readiness::{ReadinessGate, ReadinessOutcome};
use crate::routes::{require_shared_route, shared_routes};
use crate::state::{AppState, Lifecycle, fetch_app_state};
use crate::stepper::ScaleStepper;

/// Current phase of a scaleover run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum EnginePhase {
    /// Not started.
    Idle,
    /// Checking preconditions.
    Validating,
    /// Executing step N.
    Stepping { step: u32 },
    /// All instances moved (or nothing to move).
    Complete,
    /// Stopped on an error. Committed steps stay in place.
    Aborted { reason: String },
}

/// What a progress observer sees after every step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    /// 0 for the snapshot taken before the first step.
    pub step: u32,
    pub source_name: String,
    pub source_lifecycle: Lifecycle,
    pub source_requested: u32,
    pub target_name: String,
    pub target_lifecycle: Lifecycle,
    pub target_requested: u32,
}

impl ProgressSnapshot {
    pub fn new(step: u32, source: &AppState, target: &AppState) -> Self {
        Self {
            step,
            source_name: source.name.clone(),
            source_lifecycle: source.lifecycle,
            source_requested: source.count_requested,
            target_name: target.name.clone(),
            target_lifecycle: target.lifecycle,
            target_requested: target.count_requested,
        }
    }
}

/// Receives progress snapshots for display.
pub trait ProgressSink {
    fn observe(&mut self, snapshot: &ProgressSnapshot);
}

/// Discards progress.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn observe(&mut self, _snapshot: &ProgressSnapshot) {}
}

impl ProgressSink for Vec<ProgressSnapshot> {
    fn observe(&mut self, snapshot: &ProgressSnapshot) {
        self.push(snapshot.clone());
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &mut S {
    fn observe(&mut self, snapshot: &ProgressSnapshot) {
        (**self).observe(snapshot);
    }
}

/// Final state of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaleoverReport {
    pub source: AppState,
    pub target: AppState,
    pub steps: u32,
    /// Readiness waits that ended on a fetch error rather than readiness.
    pub abandoned_waits: u32,
}

/// Runs one scaleover with a fixed plan.
#[derive(Debug)]
pub struct ScaleoverEngine {
    plan: MigrationPlan,
    phase: EnginePhase,
}

impl ScaleoverEngine {
    pub fn new(plan: MigrationPlan) -> Self {
        Self {
            plan,
            phase: EnginePhase::Idle,
        }
    }

    pub fn phase(&self) -> &EnginePhase {
        &self.phase
    }

    /// Move instances from `source` to `target`.
    ///
    /// Both states must be fresh snapshots. On error the engine is left in
    /// [`EnginePhase::Aborted`].
    pub async fn run<P, S>(
        &mut self,
        platform: &P,
        source: AppState,
        target: AppState,
        sink: &mut S,
    ) -> ScaleoverResult<ScaleoverReport>
    where
        P: PlatformClient + ?Sized,
        S: ProgressSink + ?Sized,
    {
        match self.drive(platform, source, target, sink).await {
            Ok(report) => {
                self.phase = EnginePhase::Complete;
                Ok(report)
            }
            Err(e) => {
                warn!(phase = ?self.phase, error = %e, "scaleover aborted");
                self.phase = EnginePhase::Aborted {
                    reason: e.to_string(),
                };
                Err(e)
            }
        }
    }

    async fn drive<P, S>(
        &mut self,
        platform: &P,
        mut source: AppState,
        mut target: AppState,
        sink: &mut S,
    ) -> ScaleoverResult<ScaleoverReport>
    where
        P: PlatformClient + ?Sized,
        S: ProgressSink + ?Sized,
    {
        self.phase = EnginePhase::Validating;
        self.plan.validate()?;

        if self.plan.enforce_routes {
            require_shared_route(&source, &target)?;
            debug!(
                source = %source.name,
                target = %target.name,
                shared = ?shared_routes(&source, &target),
                "groups share a route"
            );
        }

        sink.observe(&ProgressSnapshot::new(0, &source, &target));

        let orig_instances = source.count_requested;
        if orig_instances == 0 {
            info!(source = %source.name, "no instances of the source app to scale over");
            return Ok(ScaleoverReport {
                source,
                target,
                steps: 0,
                abandoned_waits: 0,
            });
        }

        // Instances the target already runs count as moved.
        let batch_size = self.plan.batch_size;
        let mut count = i64::from(orig_instances) - i64::from(target.count_running);
        let leave_floor = i64::from(self.plan.leave) - i64::from(target.count_running);
        let sleep_interval = self.plan.sleep_interval(orig_instances);
        let gate = self
            .plan
            .wait_for_start
            .then(|| ReadinessGate::from_plan(&self.plan));

        info!(
            source = %source.name,
            target = %target.name,
            instances = orig_instances,
            remaining = count,
            batch_size,
            interval = ?sleep_interval,
            "starting scaleover"
        );

        let stepper = ScaleStepper::new(platform);
        let mut steps = 0u32;
        let mut abandoned_waits = 0u32;

        while count > 0 {
            steps += 1;
            self.phase = EnginePhase::Stepping { step: steps };

            target = stepper.scale_up(target, orig_instances, batch_size).await?;
            let down = stepper
                .scale_down(source, leave_floor, batch_size, &target.name, gate.as_ref())
                .await?;
            source = down.state;
            if let Some(ReadinessOutcome::Abandoned { .. }) = down.readiness {
                abandoned_waits += 1;
            }

            count -= i64::from(batch_size);

            let snapshot = ProgressSnapshot::new(steps, &source, &target);
            info!(
                step = steps,
                source = %snapshot.source_name,
                source_requested = snapshot.source_requested,
                target = %snapshot.target_name,
                target_requested = snapshot.target_requested,
                "step complete"
            );
            sink.observe(&snapshot);

            if count > 0 && sleep_interval > Duration::ZERO {
                tokio::time::sleep(sleep_interval).await;
            }
        }

        info!(
            source = %source.name,
            target = %target.name,
            steps,
            "scaleover complete"
        );

        Ok(ScaleoverReport {
            source,
            target,
            steps,
            abandoned_waits,
        })
    }
}

/// Fetch both groups by name and run the scaleover.
///
/// A missing group aborts before any command is issued.
pub async fn run_migration<P, S>(
    platform: &P,
    source_name: &str,
    target_name: &str,
    plan: MigrationPlan,
    sink: &mut S,
) -> ScaleoverResult<ScaleoverReport>
where
    P: PlatformClient + ?Sized,
    S: ProgressSink + ?Sized,
{
    let source = fetch_app_state(platform, source_name).await?;
    let target = fetch_app_state(platform, target_name).await?;
    ScaleoverEngine::new(plan).run(platform, source, target, sink).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScaleoverError;
    use crate::memory::InMemoryPlatform;

    fn pair(source: AppState, target: AppState) -> (InMemoryPlatform, AppState, AppState) {
        let platform = InMemoryPlatform::new();
        platform.insert_state(&source);
        platform.insert_state(&target);
        (platform, source, target)
    }

    fn no_routes_plan() -> MigrationPlan {
        MigrationPlan {
            enforce_routes: false,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn engine_starts_idle_and_completes() {
        let (platform, source, target) = pair(
            AppState::new("blue", 2, 2, Lifecycle::Started),
            AppState::new("green", 0, 0, Lifecycle::Stopped),
        );
        let mut engine = ScaleoverEngine::new(no_routes_plan());
        assert_eq!(engine.phase(), &EnginePhase::Idle);

        let report = engine
            .run(&platform, source, target, &mut NullProgress)
            .await
            .unwrap();
        assert_eq!(engine.phase(), &EnginePhase::Complete);
        assert_eq!(report.steps, 2);
    }

    #[tokio::test]
    async fn target_always_scales_up_before_source_scales_down() {
        let (platform, source, target) = pair(
            AppState::new("blue", 3, 3, Lifecycle::Started),
            AppState::new("green", 0, 0, Lifecycle::Started),
        );
        ScaleoverEngine::new(no_routes_plan())
            .run(&platform, source, target, &mut NullProgress)
            .await
            .unwrap();

        let groups: Vec<String> = platform
            .commands()
            .iter()
            .map(|c| c.group().to_string())
            .collect();
        assert_eq!(
            groups,
            vec!["green", "blue", "green", "blue", "green", "blue", "blue"]
        );
    }

    #[tokio::test]
    async fn progress_is_emitted_after_every_step() {
        let (platform, source, target) = pair(
            AppState::new("blue", 3, 3, Lifecycle::Started),
            AppState::new("green", 0, 0, Lifecycle::Stopped),
        );
        let mut seen: Vec<ProgressSnapshot> = Vec::new();
        ScaleoverEngine::new(no_routes_plan())
            .run(&platform, source, target, &mut seen)
            .await
            .unwrap();

        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].step, 0);
        assert_eq!(seen[0].target_lifecycle, Lifecycle::Stopped);
        assert_eq!(seen[1].target_requested, 1);
        assert_eq!(seen[1].source_requested, 2);
        assert_eq!(seen[3].source_lifecycle, Lifecycle::Stopped);
        assert_eq!(seen[3].target_requested, 3);
    }

    #[tokio::test]
    async fn target_already_running_shortens_the_run() {
        let (platform, source, target) = pair(
            AppState::new("blue", 4, 4, Lifecycle::Started),
            AppState::new("green", 2, 2, Lifecycle::Started),
        );
        let report = ScaleoverEngine::new(no_routes_plan())
            .run(&platform, source, target, &mut NullProgress)
            .await
            .unwrap();

        // Only the two instances the target lacks are moved.
        assert_eq!(report.steps, 2);
        assert_eq!(report.target.count_requested, 4);
        assert_eq!(report.source.count_requested, 2);
        assert_eq!(report.source.lifecycle, Lifecycle::Started);
    }

    #[tokio::test(start_paused = true)]
    async fn sleeps_between_steps_but_not_after_the_last() {
        let (platform, source, target) = pair(
            AppState::new("blue", 4, 4, Lifecycle::Started),
            AppState::new("green", 0, 0, Lifecycle::Stopped),
        );
        let plan = MigrationPlan {
            rollover_duration: Duration::from_secs(40),
            ..no_routes_plan()
        };

        let before = tokio::time::Instant::now();
        ScaleoverEngine::new(plan)
            .run(&platform, source, target, &mut NullProgress)
            .await
            .unwrap();
        // 4 steps, 10s apart.
        assert_eq!(before.elapsed(), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn invalid_plan_aborts_before_commands() {
        let (platform, source, target) = pair(
            AppState::new("blue", 4, 4, Lifecycle::Started),
            AppState::new("green", 0, 0, Lifecycle::Stopped),
        );
        let mut engine = ScaleoverEngine::new(MigrationPlan {
            batch_size: 0,
            ..no_routes_plan()
        });

        let err = engine
            .run(&platform, source, target, &mut NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ScaleoverError::InvalidPlan(_)));
        assert!(matches!(engine.phase(), EnginePhase::Aborted { .. }));
        assert!(platform.commands().is_empty());
    }

    #[tokio::test]
    async fn command_failure_aborts_mid_run() {
        let (platform, source, target) = pair(
            AppState::new("blue", 4, 4, Lifecycle::Started),
            AppState::new("green", 0, 0, Lifecycle::Stopped),
        );
        platform.fail_commands_for("blue", "org quota exceeded");
        let mut engine = ScaleoverEngine::new(no_routes_plan());

        let err = engine
            .run(&platform, source, target, &mut NullProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, ScaleoverError::PlatformCommand { .. }));
        match engine.phase() {
            EnginePhase::Aborted { reason } => assert!(reason.contains("org quota exceeded")),
            other => panic!("expected Aborted, got {other:?}"),
        }
        // The target scale-up of the first step was already committed.
        assert_eq!(platform.commands_for("green").len(), 2);
    }

    #[tokio::test]
    async fn run_migration_reports_missing_group() {
        let platform = InMemoryPlatform::new();
        platform.insert_state(&AppState::new("blue", 2, 2, Lifecycle::Started));

        let err = run_migration(
            &platform,
            "blue",
            "green",
            no_routes_plan(),
            &mut NullProgress,
        )
        .await
        .unwrap_err();
        match err {
            ScaleoverError::NotFound { name, message } => {
                assert_eq!(name, "green");
                assert_eq!(message, "App green not found");
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
        assert!(platform.commands().is_empty());
    }

    #[test]
    fn phase_serializes_tagged() {
        let json = serde_json::to_string(&EnginePhase::Stepping { step: 3 }).unwrap();
        assert_eq!(json, r#"{"phase":"stepping","step":3}"#);
    }
}
