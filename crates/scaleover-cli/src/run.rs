//! Scaleover execution against a platform.

use std::time::Duration;

use anyhow::Context;
use scaleover_core::{
    InMemoryPlatform, MigrationPlan, PlatformClient, PlatformCommand, ProgressSink,
    ScaleoverEngine, ScaleoverReport, fetch_app_state, run_migration,
};
use tracing::info;

/// Run the scaleover for real.
pub async fn scaleover<P, S>(
    platform: &P,
    source: &str,
    target: &str,
    plan: MigrationPlan,
    progress: &mut S,
) -> anyhow::Result<ScaleoverReport>
where
    P: PlatformClient + ?Sized,
    S: ProgressSink + ?Sized,
{
    info!(%source, %target, plan = ?plan, "scaleover requested");
    run_migration(platform, source, target, plan, progress)
        .await
        .with_context(|| format!("scaleover of {source} to {target} failed"))
}

/// Simulate the scaleover from the platform's current state.
///
/// Reads both groups from `platform` and replays the run against an
/// in-memory copy with no delays. Returns the commands a real run would
/// issue; `platform` itself is never mutated.
pub async fn dry_run<P, S>(
    platform: &P,
    source: &str,
    target: &str,
    plan: MigrationPlan,
    progress: &mut S,
) -> anyhow::Result<Vec<PlatformCommand>>
where
    P: PlatformClient + ?Sized,
    S: ProgressSink + ?Sized,
{
    let source_state = fetch_app_state(platform, source).await?;
    let target_state = fetch_app_state(platform, target).await?;

    let simulated = InMemoryPlatform::new();
    simulated.insert_state(&source_state);
    simulated.insert_state(&target_state);

    let plan = MigrationPlan {
        rollover_duration: Duration::ZERO,
        post_start_sleep: Duration::ZERO,
        ..plan
    };
    ScaleoverEngine::new(plan)
        .run(&simulated, source_state, target_state, progress)
        .await
        .with_context(|| format!("dry run of {source} to {target} failed"))?;

    Ok(simulated.commands())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaleover_core::{AppState, Lifecycle, NullProgress, ScaleoverError};

    fn platform() -> InMemoryPlatform {
        let platform = InMemoryPlatform::new();
        platform.insert_state(
            &AppState::new("blue", 2, 2, Lifecycle::Started).with_routes(["app.example.com"]),
        );
        platform.insert_state(
            &AppState::new("green", 0, 0, Lifecycle::Stopped).with_routes(["app.example.com"]),
        );
        platform
    }

    #[tokio::test]
    async fn dry_run_leaves_platform_untouched() {
        let platform = platform();
        let plan = MigrationPlan {
            rollover_duration: Duration::from_secs(3600),
            ..Default::default()
        };

        let commands = dry_run(&platform, "blue", "green", plan, &mut NullProgress)
            .await
            .unwrap();
        assert!(platform.commands().is_empty());
        assert_eq!(
            commands,
            vec![
                PlatformCommand::Start {
                    group: "green".to_string()
                },
                PlatformCommand::SetDesiredCount {
                    group: "green".to_string(),
                    count: 1
                },
                PlatformCommand::SetDesiredCount {
                    group: "blue".to_string(),
                    count: 1
                },
                PlatformCommand::SetDesiredCount {
                    group: "green".to_string(),
                    count: 2
                },
                PlatformCommand::Stop {
                    group: "blue".to_string()
                },
                PlatformCommand::SetDesiredCount {
                    group: "blue".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[tokio::test]
    async fn scaleover_error_keeps_the_cause() {
        let platform = platform();
        let err = scaleover(
            &platform,
            "blue",
            "red",
            MigrationPlan::default(),
            &mut NullProgress,
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "scaleover of blue to red failed");
        let cause = err.downcast_ref::<ScaleoverError>().unwrap();
        assert_eq!(cause.to_string(), "App red not found");
    }

    #[tokio::test]
    async fn scaleover_runs_to_completion() {
        let platform = platform();
        let report = scaleover(
            &platform,
            "blue",
            "green",
            MigrationPlan::default(),
            &mut NullProgress,
        )
        .await
        .unwrap();
        assert_eq!(report.steps, 2);
        assert_eq!(platform.group("green").unwrap().requested_count, 2);
    }
}
