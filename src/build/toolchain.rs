use crate::clienv;
use async_trait::async_trait;
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use tokio::process::Command;
use tracing::debug;

/// External compiler: turns a config file into an emitted tree.
///
/// Exit status 0 means every output under the configured `outDir` has been
/// written.
#[async_trait]
pub trait Toolchain: Send + Sync {
    /// Compile the project described by `config_path`, inheriting stdio.
    async fn compile(&self, config_path: &Path, cwd: &Path) -> std::io::Result<ExitStatus>;

    /// Whether the compiler can be invoked at all.
    async fn check_installed(&self, cwd: &Path) -> bool;
}

/// `tsc` (by default through `npx`).
pub struct Tsc {
    program: String,
    args: Vec<String>,
}

impl Tsc {
    pub fn new() -> Self {
        let (program, args) = clienv::compiler_command();
        Self { program, args }
    }

    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn command(&self, cwd: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(cwd);
        cmd
    }
}

impl Default for Tsc {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Toolchain for Tsc {
    async fn compile(&self, config_path: &Path, cwd: &Path) -> std::io::Result<ExitStatus> {
        debug!("Running compiler: {} {:?} -p {}", self.program, self.args, config_path.display());
        let status = self
            .command(cwd)
            .arg("-p")
            .arg(config_path)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await?;
        debug!("Compiler finished with exit code: {:?}", status.code());
        Ok(status)
    }

    async fn check_installed(&self, cwd: &Path) -> bool {
        let output = self
            .command(cwd)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await;
        match output {
            Ok(output) => {
                debug!(version = %String::from_utf8_lossy(&output.stdout).trim(), "Compiler probe");
                output.status.success()
            }
            Err(e) => {
                debug!("Compiler probe failed: {}", e);
                false
            }
        }
    }
}
