//! scaleover-cf: Cloud Foundry platform for the scaleover engine.
//!
//! Implements `scaleover_core::PlatformClient` on top of the `cf` CLI, so
//! the scaleover runs with whatever session `cf login` / `cf target` set up.
//!
//! ```text
//! group_status     cf curl /v3/apps?names=NAME
//!                  cf curl /v3/apps/GUID/processes/web        (requested)
//!                  cf curl /v3/apps/GUID/processes/web/stats  (running)
//!                  cf curl /v3/apps/GUID/routes
//! instance_health  cf curl /v3/apps/GUID/processes/web/stats
//! commands         cf scale NAME -i N | cf start NAME | cf stop NAME
//! ```

pub mod api;
pub mod client;
pub mod error;

pub use client::CfCliPlatform;
pub use error::{CfError, CfResult};
