//! `PlatformClient` that drives the `cf` binary.
//!
//! Status reads go through `cf curl` against the v3 API; commands use the
//! regular `cf scale`, `cf start` and `cf stop` subcommands so the user's
//! logged-in session and targeted org/space apply.

use std::path::{Path, PathBuf};

use scaleover_core::{
    GroupStatus, InstanceHealth, InstanceState, Lifecycle, PlatformClient, PlatformFuture,
};
use serde::de::DeserializeOwned;
use tokio::process::Command;
use tracing::debug;

use crate::api::{self, AppResource, Page, ProcessResource, ProcessStat, RouteResource};
use crate::error::{CfError, CfResult};

/// Cloud Foundry platform backed by the `cf` CLI.
#[derive(Debug, Clone)]
pub struct CfCliPlatform {
    binary: PathBuf,
}

impl Default for CfCliPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl CfCliPlatform {
    /// Use `cf` from `PATH`.
    pub fn new() -> Self {
        Self::with_binary("cf")
    }

    pub fn with_binary(binary: impl AsRef<Path>) -> Self {
        Self {
            binary: binary.as_ref().to_path_buf(),
        }
    }

    /// Run `cf` with `args` and return stdout.
    async fn run(&self, args: &[&str]) -> CfResult<String> {
        debug!(binary = %self.binary.display(), args = ?args, "running cf");

        let output = Command::new(&self.binary)
            .args(args)
            .env("CF_COLOR", "false")
            .output()
            .await
            .map_err(|source| CfError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
            return Err(CfError::Exit {
                args: args.join(" "),
                code: output.status.code().unwrap_or(-1),
                // cf prints most failures on stdout.
                stderr: if stderr.is_empty() { stdout } else { stderr },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn curl<T: DeserializeOwned>(&self, path: &str) -> CfResult<T> {
        let body = self.run(&["curl", path]).await?;
        api::decode(path, &body)
    }

    async fn app(&self, name: &str) -> CfResult<AppResource> {
        let path = format!("/v3/apps?names={}", api::encode_query_value(name));
        let page: Page<AppResource> = self.curl(&path).await?;
        page.resources
            .into_iter()
            .find(|app| app.name == name)
            .ok_or_else(|| CfError::AppNotFound(name.to_string()))
    }

    async fn stats(&self, guid: &str) -> CfResult<Vec<ProcessStat>> {
        let page: Page<ProcessStat> = self
            .curl(&format!("/v3/apps/{guid}/processes/web/stats"))
            .await?;
        Ok(page.resources)
    }

    async fn fetch_status(&self, name: &str) -> CfResult<GroupStatus> {
        let app = self.app(name).await?;
        let process: ProcessResource = self
            .curl(&format!("/v3/apps/{}/processes/web", app.guid))
            .await?;
        let stats = self.stats(&app.guid).await?;
        let routes: Page<RouteResource> =
            self.curl(&format!("/v3/apps/{}/routes", app.guid)).await?;

        let running_count = stats
            .iter()
            .filter(|s| InstanceState::from_platform(&s.state) == InstanceState::Running)
            .count() as u32;

        Ok(GroupStatus {
            lifecycle: Lifecycle::from_platform(&app.state),
            running_count,
            requested_count: process.instances,
            routes: routes.resources.iter().map(RouteResource::fqdn).collect(),
        })
    }

    async fn fetch_health(&self, name: &str) -> CfResult<Vec<InstanceHealth>> {
        let app = self.app(name).await?;
        let stats = self.stats(&app.guid).await?;
        Ok(stats
            .into_iter()
            .map(|s| InstanceHealth {
                index: s.index,
                state: InstanceState::from_platform(&s.state),
            })
            .collect())
    }
}

impl PlatformClient for CfCliPlatform {
    fn group_status<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, GroupStatus> {
        Box::pin(async move { self.fetch_status(name).await.map_err(Into::into) })
    }

    fn instance_health<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, Vec<InstanceHealth>> {
        Box::pin(async move { self.fetch_health(name).await.map_err(Into::into) })
    }

    fn set_desired_count<'a>(&'a self, name: &'a str, count: u32) -> PlatformFuture<'a, ()> {
        Box::pin(async move {
            let count = count.to_string();
            self.run(&["scale", name, "-i", count.as_str()])
                .await
                .map(drop)
                .map_err(Into::into)
        })
    }

    fn start<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, ()> {
        Box::pin(async move { self.run(&["start", name]).await.map(drop).map_err(Into::into) })
    }

    fn stop<'a>(&'a self, name: &'a str) -> PlatformFuture<'a, ()> {
        Box::pin(async move { self.run(&["stop", name]).await.map(drop).map_err(Into::into) })
    }
}
