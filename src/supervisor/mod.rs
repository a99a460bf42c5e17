//! Process supervision.
//!
//! Every lifecycle action goes through the [`Supervisor`] trait. The
//! production implementation is [`Pm2`]; tests substitute in-memory fakes.

mod pm2;
mod spec;
mod status;

pub use pm2::{ChildLogStream, Pm2};
pub use spec::ProcessSpec;
pub use status::{parse_jlist, Listing, ProcessInfo, ProcessState};

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;

/// Which supervised entries an action applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    All,
    Name(String),
}

impl Target {
    pub fn name(name: impl Into<String>) -> Self {
        Target::Name(name.into())
    }

    pub fn as_str(&self) -> &str {
        match self {
            Target::All => "all",
            Target::Name(name) => name,
        }
    }
}

impl From<Option<&str>> for Target {
    fn from(name: Option<&str>) -> Self {
        name.map(Target::name).unwrap_or(Target::All)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a best-effort delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilentOutcome {
    Deleted,
    /// The supervisor rejected the delete (usually: nothing to delete)
    Ignored,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogQuery {
    pub target: Target,
    pub lines: u32,
    pub follow: bool,
}

impl LogQuery {
    pub fn new(target: Target) -> Self {
        Self {
            target,
            lines: 100,
            follow: true,
        }
    }

    pub fn lines(mut self, lines: u32) -> Self {
        self.lines = lines;
        self
    }

    pub fn follow(mut self, follow: bool) -> Self {
        self.follow = follow;
        self
    }
}

/// A live log stream that outlives the call that opened it.
#[async_trait]
pub trait LogHandle: Send {
    /// Wait for the stream to end on its own; returns the exit code if any.
    async fn wait(&mut self) -> Result<Option<i32>>;

    /// Ask the stream to stop.
    async fn terminate(&mut self);
}

#[async_trait]
pub trait Supervisor: Send + Sync {
    /// Register and launch a process
    async fn start(&self, spec: &ProcessSpec) -> Result<()>;

    async fn stop(&self, target: &Target) -> Result<()>;

    async fn restart(&self, target: &Target) -> Result<()>;

    async fn delete(&self, target: &Target) -> Result<()>;

    /// Delete `name` if tracked; never fails and prints nothing.
    async fn delete_silent(&self, name: &str) -> SilentOutcome;

    /// Structured listing only; fails instead of printing a fallback view.
    async fn processes(&self) -> Result<Vec<ProcessInfo>>;

    async fn status(&self) -> Result<Listing>;

    /// Print log lines and return when the supervisor command exits.
    async fn logs(&self, query: &LogQuery) -> Result<()>;

    /// Open a log stream without waiting for it.
    async fn open_logs(&self, query: &LogQuery) -> Result<Box<dyn LogHandle>>;

    /// Truncate the supervisor's own log files.
    async fn flush(&self, target: &Target) -> Result<()>;
}
