use super::{
    parse_jlist, Listing, LogHandle, LogQuery, ProcessInfo, ProcessSpec, SilentOutcome, Supervisor, Target,
};
use crate::clienv;
use crate::env_loader::EnvMap;
use crate::error::{Result, YapError};
use async_trait::async_trait;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::{Child, Command};
use tracing::{debug, trace, warn};

/// Ephemeral pm2 ecosystem file, removed when dropped.
struct DescriptorFile {
    path: PathBuf,
}

impl DescriptorFile {
    fn write(dir: &Path, spec: &ProcessSpec) -> Result<Self> {
        let safe_name: String = spec
            .name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        let millis = chrono::Utc::now().timestamp_millis();
        let file = Self {
            path: dir.join(format!("yap-pm2-{safe_name}-{millis}.json")),
        };

        let content = serde_json::to_string_pretty(&spec.to_descriptor())?;
        fs::write(&file.path, content)?;
        trace!(path = %file.path.display(), "Wrote supervisor descriptor");
        Ok(file)
    }
}

impl Drop for DescriptorFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => trace!(path = %self.path.display(), "Removed supervisor descriptor"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

/// pm2 driven through its command line.
pub struct Pm2 {
    program: String,
    args: Vec<String>,
    descriptor_dir: PathBuf,
    cwd: Option<PathBuf>,
}

impl Pm2 {
    pub fn new() -> Self {
        let (program, args) = clienv::supervisor_command();
        Self {
            program,
            args,
            descriptor_dir: clienv::descriptor_dir(),
            cwd: None,
        }
    }

    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            descriptor_dir: clienv::descriptor_dir(),
            cwd: None,
        }
    }

    pub fn descriptor_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.descriptor_dir = dir.into();
        self
    }

    /// Run supervisor commands from `dir` (so `npx` finds the project's pm2)
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    fn command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).args(args);
        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    fn describe(&self, args: &[&str]) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run with inherited stdio, layering `env` onto the child only.
    async fn exec(&self, args: &[&str], env: Option<&EnvMap>) -> Result<()> {
        debug!("Running supervisor command: {}", self.describe(args));

        let mut cmd = self.command(args);
        if let Some(env) = env {
            cmd.envs(env);
        }
        let status = cmd.status().await?;

        debug!("Supervisor command finished with exit code: {:?}", status.code());
        if !status.success() {
            return Err(YapError::SupervisorCommandFailed {
                command: self.describe(args),
                code: status.code(),
            });
        }
        Ok(())
    }

    async fn exec_capture(&self, args: &[&str]) -> Result<String> {
        debug!("Capturing supervisor command: {}", self.describe(args));

        let output = self
            .command(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await?;

        if !output.status.success() {
            return Err(YapError::SupervisorCommandFailed {
                command: self.describe(args),
                code: output.status.code(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn log_args(query: &LogQuery) -> Vec<String> {
        let mut args = vec!["logs".to_string()];
        if let Target::Name(name) = &query.target {
            args.push(name.clone());
        }
        args.push("--lines".to_string());
        args.push(query.lines.to_string());
        if !query.follow {
            args.push("--nostream".to_string());
        }
        args
    }
}

impl Default for Pm2 {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Supervisor for Pm2 {
    async fn start(&self, spec: &ProcessSpec) -> Result<()> {
        let descriptor = DescriptorFile::write(&self.descriptor_dir, spec)?;
        let path = descriptor.path.to_string_lossy().into_owned();
        self.exec(&["start", &path], Some(&spec.env)).await
    }

    async fn stop(&self, target: &Target) -> Result<()> {
        self.exec(&["stop", target.as_str()], None).await
    }

    async fn restart(&self, target: &Target) -> Result<()> {
        self.exec(&["restart", target.as_str()], None).await
    }

    async fn delete(&self, target: &Target) -> Result<()> {
        self.exec(&["delete", target.as_str()], None).await
    }

    async fn delete_silent(&self, name: &str) -> SilentOutcome {
        let status = self
            .command(&["delete", name])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) if s.success() => SilentOutcome::Deleted,
            Ok(s) => {
                trace!(name, code = ?s.code(), "Silent delete ignored");
                SilentOutcome::Ignored
            }
            Err(e) => {
                trace!(name, error = %e, "Silent delete could not run");
                SilentOutcome::Ignored
            }
        }
    }

    async fn processes(&self) -> Result<Vec<ProcessInfo>> {
        let output = self.exec_capture(&["jlist"]).await?;
        Ok(parse_jlist(&output)?)
    }

    async fn status(&self) -> Result<Listing> {
        match self.processes().await {
            Ok(list) => return Ok(Listing::Structured(list)),
            Err(e) => debug!("Structured listing failed: {}", e),
        }

        self.exec(&["list"], None).await?;
        Ok(Listing::Fallback)
    }

    async fn logs(&self, query: &LogQuery) -> Result<()> {
        let args = Self::log_args(query);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        self.exec(&args, None).await
    }

    async fn open_logs(&self, query: &LogQuery) -> Result<Box<dyn LogHandle>> {
        let args = Self::log_args(query);
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        debug!("Opening log stream: {}", self.describe(&args));

        let child = self.command(&args).stdin(Stdio::null()).spawn()?;
        Ok(Box::new(ChildLogStream { child }))
    }

    async fn flush(&self, target: &Target) -> Result<()> {
        match target {
            Target::All => self.exec(&["flush"], None).await,
            Target::Name(name) => self.exec(&["flush", name], None).await,
        }
    }
}

/// Log stream backed by a running supervisor process.
pub struct ChildLogStream {
    child: Child,
}

#[async_trait]
impl LogHandle for ChildLogStream {
    async fn wait(&mut self) -> Result<Option<i32>> {
        let status = self.child.wait().await?;
        Ok(status.code())
    }

    async fn terminate(&mut self) {
        #[cfg(unix)]
        {
            if let Some(pid) = self.child.id() {
                unsafe {
                    libc::kill(pid as i32, libc::SIGTERM);
                }
            }
        }
        #[cfg(not(unix))]
        {
            let _ = self.child.start_kill();
        }

        let timeout = tokio::time::Duration::from_secs(5);
        if tokio::time::timeout(timeout, self.child.wait()).await.is_err() {
            warn!("Log stream did not stop in time, force killing");
            let _ = self.child.kill().await;
        }
    }
}
