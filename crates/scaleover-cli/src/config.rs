//! Plan options from the command line and an optional scaleover.toml.
//!
//! File values are applied over the built-in defaults, then command-line
//! flags over the file. Durations are parsed here, before any group is
//! fetched, so a bad duration never reaches the platform.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use clap::Args;
use scaleover_core::{MigrationPlan, parse_duration};
use serde::{Deserialize, Serialize};

/// Plan flags shared by the command line.
#[derive(Debug, Clone, Default, Args)]
pub struct PlanArgs {
    /// Skip the check that both apps share a route
    #[arg(long)]
    pub no_route_check: bool,

    /// How many source instances to keep running (0 stops the source)
    #[arg(long, value_name = "N")]
    pub leave: Option<u32>,

    /// How many instances to scale up and down per step
    #[arg(long, value_name = "N")]
    pub batch_size: Option<u32>,

    /// Wait for new target instances to be running before each scale-down
    #[arg(long)]
    pub wait_for_start: bool,

    /// Extra settle time after target instances report running, e.g. 10s.
    /// Only used with --wait-for-start
    #[arg(long, value_name = "DURATION")]
    pub post_start_sleep: Option<String>,

    /// Give up waiting for target instances after this long, e.g. 5m.
    /// 0 waits forever
    #[arg(long, value_name = "DURATION")]
    pub ready_timeout: Option<String>,
}

/// Contents of a scaleover.toml.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub leave: Option<u32>,
    pub batch_size: Option<u32>,
    pub route_check: Option<bool>,
    pub wait_for_start: Option<bool>,
    pub post_start_sleep: Option<String>,
    pub ready_timeout: Option<String>,
}

impl FileConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }
}

fn parse_timeout(s: &str) -> anyhow::Result<Option<Duration>> {
    let timeout = parse_duration(s)?;
    Ok((!timeout.is_zero()).then_some(timeout))
}

/// Build the plan for one run.
pub fn build_plan(
    rollover_duration: &str,
    args: &PlanArgs,
    file: Option<&FileConfig>,
) -> anyhow::Result<MigrationPlan> {
    let mut plan = MigrationPlan {
        rollover_duration: parse_duration(rollover_duration)?,
        ..Default::default()
    };

    if let Some(file) = file {
        if let Some(leave) = file.leave {
            plan.leave = leave;
        }
        if let Some(batch_size) = file.batch_size {
            plan.batch_size = batch_size;
        }
        if let Some(route_check) = file.route_check {
            plan.enforce_routes = route_check;
        }
        if let Some(wait) = file.wait_for_start {
            plan.wait_for_start = wait;
        }
        if let Some(sleep) = &file.post_start_sleep {
            plan.post_start_sleep = parse_duration(sleep).context("post_start_sleep")?;
        }
        if let Some(timeout) = &file.ready_timeout {
            plan.readiness_timeout = parse_timeout(timeout).context("ready_timeout")?;
        }
    }

    if args.no_route_check {
        plan.enforce_routes = false;
    }
    if let Some(leave) = args.leave {
        plan.leave = leave;
    }
    if let Some(batch_size) = args.batch_size {
        plan.batch_size = batch_size;
    }
    if args.wait_for_start {
        plan.wait_for_start = true;
    }
    if let Some(sleep) = &args.post_start_sleep {
        plan.post_start_sleep = parse_duration(sleep).context("--post-start-sleep")?;
    }
    if let Some(timeout) = &args.ready_timeout {
        plan.readiness_timeout = parse_timeout(timeout).context("--ready-timeout")?;
    }

    plan.validate()?;
    Ok(plan)
}
