pub(crate) mod build;
pub(crate) mod completions;
pub(crate) mod dev;
pub(crate) mod init;
pub(crate) mod list;
pub(crate) mod logs;
pub(crate) mod start;
pub(crate) mod stop;

use std::path::PathBuf;
use yap::paths::resolve_project_root;
use yap::Pm2;

/// Monorepo root above the current directory, and a supervisor running there.
pub(crate) fn workspace() -> anyhow::Result<(PathBuf, Pm2)> {
    let cwd = std::env::current_dir()?;
    let root = resolve_project_root(&cwd)?;
    tracing::debug!(root = %root.display(), "Resolved project root");
    let pm2 = Pm2::new().current_dir(&root);
    Ok((root, pm2))
}

pub(crate) fn warn_skipped(skipped: &[String]) {
    if !skipped.is_empty() {
        yap::out_warn!("Unknown services (skipped): {}", skipped.join(", "));
    }
}
