//! scaleover-core: gradual migration of load between two instance groups.
//!
//! Moves instances from a running "source" group to a "target" group in
//! batches spread over a configured duration. The target is always scaled
//! up before the source is scaled down, so capacity is added before it is
//! removed.
//!
//! # Components
//!
//! - **`state`**: `AppState`, the known scaling state of one group
//! - **`routes`**: shared-route precondition
//! - **`readiness`**: wait for target instances to report running
//! - **`stepper`**: one scale-up / scale-down step with stop/start rules
//! - **`engine`**: the step loop and its phases
//! - **`platform`**: the `PlatformClient` capability the engine drives
//! - **`memory`**: an in-memory platform for tests and dry runs
//!
//! # Step schedule
//!
//! ```text
//! orig     = source.requested
//! count    = orig - target.running
//! floor    = leave - target.running
//! interval = duration / orig
//!
//! while count > 0:
//!     target.requested = min(target.requested + batch, orig)   (start if needed)
//!     source.requested = max(source.requested - batch, floor)  (stop at <= 0)
//!     count -= batch
//!     sleep(interval) unless done
//! ```

pub mod duration;
pub mod engine;
pub mod error;
pub mod memory;
pub mod plan;
pub mod platform;
pub mod readiness;
pub mod routes;
pub mod state;
pub mod stepper;

pub use duration::parse_duration;
pub use engine::{
    EnginePhase, NullProgress, ProgressSink, ProgressSnapshot, ScaleoverEngine, ScaleoverReport,
    run_migration,
};
pub use error::{ScaleoverError, ScaleoverResult};
pub use memory::{InMemoryPlatform, PlatformCommand};
pub use plan::MigrationPlan;
pub use platform::{
    GroupStatus, InstanceHealth, InstanceState, PlatformClient, PlatformError, PlatformFuture,
};
pub use readiness::{ReadinessGate, ReadinessOutcome};
pub use routes::{require_shared_route, shared_routes, shares_route};
pub use state::{AppState, Lifecycle, fetch_app_state};
pub use stepper::{STOP_FLOOR, ScaleStepper, StepDown};
