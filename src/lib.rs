#[macro_use]
pub mod output;

pub mod build;
pub mod clienv;
pub mod completions;
pub mod env_loader;
pub mod error;
pub mod lifecycle;
pub mod manifest;
pub mod paths;
pub mod project_config;
pub mod scaffold;
pub mod supervisor;
pub mod tsconfig;

pub use error::{Result, YapError};
pub use lifecycle::LifecycleController;
pub use manifest::{Manifest, ServiceDescriptor, ServiceKind};
pub use supervisor::{Pm2, ProcessSpec, Supervisor};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
