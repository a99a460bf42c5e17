//! `yap init`: starter files for a monorepo.

use crate::env_loader::{ENV_DEVELOPMENT, ENV_EXAMPLE, ENV_PRODUCTION};
use crate::error::{Result, YapError};
use crate::manifest::Manifest;
use crate::paths::ensure_dir;
use crate::project_config::AuthorConfig;
use std::fs;
use std::path::Path;

const GITIGNORE_ENTRIES: &[&str] = &["# yap", "logs/", ".env.local", "*.log"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    pub created: Vec<String>,
    /// Files that already existed and were left alone
    pub skipped: Vec<String>,
    pub gitignore_updated: bool,
}

/// Write whichever starter files are missing under `root`.
pub fn init(root: &Path, manifest: &Manifest) -> Result<InitReport> {
    let apps: Vec<String> = manifest.applications().into_iter().map(|s| s.name).collect();
    if apps.is_empty() {
        return Err(YapError::NoTargets("none".to_string()));
    }

    let mut report = InitReport::default();
    let config = AuthorConfig::template(&apps)?;

    let files = [
        (crate::clienv::AUTHOR_CONFIG_FILE, config.as_str()),
        (".env.example", ENV_EXAMPLE),
        (".env.development", ENV_DEVELOPMENT),
        (".env.production", ENV_PRODUCTION),
    ];
    for (name, content) in files {
        let path = root.join(name);
        if path.exists() {
            tracing::debug!(file = name, "Exists, skipping");
            report.skipped.push(name.to_string());
            continue;
        }
        fs::write(&path, content)?;
        report.created.push(name.to_string());
    }

    ensure_dir(&root.join(crate::clienv::LOG_DIR))?;
    report.gitignore_updated = update_gitignore(root)?;
    Ok(report)
}

/// Append missing yap entries to an existing `.gitignore`.
fn update_gitignore(root: &Path) -> Result<bool> {
    let path = root.join(".gitignore");
    if !path.is_file() {
        return Ok(false);
    }

    let mut content = fs::read_to_string(&path)?;
    let missing: Vec<&str> = GITIGNORE_ENTRIES
        .iter()
        .copied()
        .filter(|entry| !content.lines().any(|line| line.trim() == *entry))
        .collect();
    if missing.is_empty() {
        return Ok(false);
    }

    if !content.is_empty() && !content.ends_with('\n') {
        content.push('\n');
    }
    content.push('\n');
    content.push_str(&missing.join("\n"));
    content.push('\n');
    fs::write(&path, content)?;
    Ok(true)
}
