//! Per-command coordination of manifest, build pipeline and supervisor.

mod controller;
pub mod foreground;
pub mod targets;

pub use controller::{
    BatchReport, BuildOptions, BuildOutcome, DevOptions, Launch, LifecycleController, StartOptions,
};
pub use foreground::{ForegroundOutcome, Teardown};
pub use targets::{Fallback, Targets};
