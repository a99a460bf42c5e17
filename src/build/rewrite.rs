//! Post-compile rewriting of `@libs/<name>` references into relative paths.
//!
//! tsc leaves `paths` aliases untouched in its output, so the emitted tree
//! only runs inside the monorepo's alias resolution. This pass makes it
//! self-contained.

use super::synth::ALIAS_PREFIX;
use crate::error::Result;
use crate::manifest::ServiceDescriptor;
use crate::paths::{normalize, relative_path};
use regex::{Captures, Regex};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const MODULE_EXTENSIONS: &[&str] = &["js", "cjs", "mjs"];

struct LibPattern {
    regex: Regex,
    /// Emitted source directory of the library
    emitted_src: PathBuf,
    entry_file: String,
}

pub struct AliasRewriter {
    patterns: Vec<LibPattern>,
}

impl AliasRewriter {
    /// Library sources land below `service_out_dir` at the same relative
    /// location they have in the monorepo (`<out>/libs/<name>/src` for the
    /// conventional layout).
    pub fn new(libs: &[ServiceDescriptor], service_out_dir: &Path) -> Result<Self> {
        let patterns = libs
            .iter()
            .map(|lib| -> Result<LibPattern> {
                let alias = regex::escape(&format!("{ALIAS_PREFIX}{}", lib.name));
                let pattern = format!(
                    r#"(require\(\s*|import\(\s*|from\s*|import\s+)["']{alias}(/[^"']*)?["']"#
                );
                let regex = Regex::new(&pattern).map_err(std::io::Error::other)?;
                Ok(LibPattern {
                    regex,
                    emitted_src: service_out_dir.join(&lib.source_root),
                    entry_file: lib.entry_file.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Rewrite one file's content. Returns `None` when nothing matched.
    pub fn rewrite_source(&self, file: &Path, content: &str) -> Option<String> {
        let file_dir = file.parent().unwrap_or_else(|| Path::new(""));
        let mut current = content.to_string();
        let mut modified = false;

        for lib in &self.patterns {
            if !lib.regex.is_match(&current) {
                continue;
            }
            modified = true;
            let base = relative_path(file_dir, &lib.emitted_src);
            current = lib
                .regex
                .replace_all(&current, |caps: &Captures| {
                    let target = match caps.get(2) {
                        Some(sub) => join_module_path(&base, sub.as_str().trim_start_matches('/')),
                        None => join_module_path(&base, &lib.entry_file),
                    };
                    format!("{}\"{}\"", &caps[1], target)
                })
                .into_owned();
        }

        modified.then_some(current)
    }

    /// Rewrite every emitted module file under `tree_root`; returns the
    /// number of files written back.
    pub fn rewrite_tree(&self, tree_root: &Path) -> Result<usize> {
        let mut changed = 0;

        for entry in WalkDir::new(tree_root).into_iter() {
            let entry = entry.map_err(|e| {
                std::io::Error::other(format!("failed to walk {}: {e}", tree_root.display()))
            })?;
            if !entry.file_type().is_file() || !is_module_file(entry.path()) {
                continue;
            }

            let content = fs::read_to_string(entry.path())?;
            if let Some(rewritten) = self.rewrite_source(entry.path(), &content) {
                fs::write(entry.path(), rewritten)?;
                tracing::trace!(file = %entry.path().display(), "Rewrote path aliases");
                changed += 1;
            }
        }

        tracing::debug!(root = %tree_root.display(), files = changed, "Alias rewrite finished");
        Ok(changed)
    }
}

/// Rewrite alias references in the emitted tree rooted at `tree_root`.
pub fn rewrite(tree_root: &Path, libs: &[ServiceDescriptor], service_out_dir: &Path) -> Result<usize> {
    AliasRewriter::new(libs, service_out_dir)?.rewrite_tree(tree_root)
}

fn is_module_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| MODULE_EXTENSIONS.contains(&ext))
}

fn join_module_path(base: &str, rest: &str) -> String {
    let joined = normalize(&Path::new(base).join(rest));
    let path = joined
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if path.starts_with('.') {
        path
    } else {
        format!("./{path}")
    }
}
