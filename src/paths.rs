//! Path helpers shared by the build pipeline and the lifecycle commands.
//!
//! All relative paths produced here use `/` separators regardless of host,
//! because they end up inside generated JSON configs and JavaScript sources.

use crate::clienv::MANIFEST_FILE;
use crate::error::{Result, YapError};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Lexically normalize a path: drop `.` and fold `..` into its parent.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Directory-relative path from `from` to `to`, forward-slash separated.
///
/// Returns an empty string when both point at the same directory.
pub fn relative_path(from: &Path, to: &Path) -> String {
    let from = normalize(from);
    let to = normalize(to);

    let from_parts: Vec<_> = from.components().collect();
    let to_parts: Vec<_> = to.components().collect();

    let common = from_parts
        .iter()
        .zip(to_parts.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut segments: Vec<String> = Vec::new();
    for _ in common..from_parts.len() {
        segments.push("..".to_string());
    }
    for part in &to_parts[common..] {
        segments.push(part.as_os_str().to_string_lossy().into_owned());
    }
    segments.join("/")
}

/// Walk upward from `start` to the first directory holding `nest-cli.json`.
pub fn find_project_root(start: &Path) -> Option<PathBuf> {
    let mut current = Some(start);
    while let Some(dir) = current {
        if dir.join(MANIFEST_FILE).is_file() {
            tracing::debug!(root = %dir.display(), "Found project root");
            return Some(dir.to_path_buf());
        }
        current = dir.parent();
    }
    None
}

pub fn resolve_project_root(start: &Path) -> Result<PathBuf> {
    find_project_root(start).ok_or_else(|| YapError::ProjectRootNotFound {
        start: start.to_path_buf(),
    })
}

/// If `cwd` sits inside `<root>/apps/<name>`, return `<name>`.
pub fn detect_current_app(root: &Path, cwd: &Path) -> Option<String> {
    let apps = normalize(&root.join("apps"));
    let cwd = normalize(cwd);
    let rest = cwd.strip_prefix(&apps).ok()?;
    match rest.components().next()? {
        Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
        _ => None,
    }
}

/// TypeScript entry of an application: `root/app_root/src/<entry>.ts`.
pub fn app_entry(root: &Path, app_root: &str, entry_file: &str) -> PathBuf {
    root.join(app_root).join("src").join(format!("{entry_file}.ts"))
}

/// Compiled entry of an application.
///
/// tsc keeps the directory structure below the monorepo root, so the entry
/// lands at `dist/<name>/<app_root>/src/<entry>.js`.
pub fn dist_entry(dist: &Path, name: &str, app_root: &str, entry_file: &str) -> PathBuf {
    dist.join(name)
        .join(app_root)
        .join("src")
        .join(format!("{entry_file}.js"))
}

pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path)?;
    Ok(())
}

pub fn clean_dir(path: &Path) -> Result<()> {
    if path.exists() {
        tracing::debug!(path = %path.display(), "Cleaning directory");
        fs::remove_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_normalize_keeps_leading_parents() {
        assert_eq!(normalize(Path::new("../../a/./b/..")), PathBuf::from("../../a"));
        assert_eq!(normalize(Path::new("/repo/../..")), PathBuf::from("/"));
        assert_eq!(normalize(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_relative_path_up_and_down() {
        assert_eq!(
            relative_path(Path::new("/repo/apps/api"), Path::new("/repo/libs/shared/src")),
            "../../libs/shared/src"
        );
        assert_eq!(relative_path(Path::new("/repo/apps/api"), Path::new("/repo")), "../..");
        assert_eq!(
            relative_path(Path::new("/repo"), Path::new("/repo/dist/api")),
            "dist/api"
        );
    }

    #[test]
    fn test_relative_path_same_dir_is_empty() {
        assert_eq!(relative_path(Path::new("/repo/a"), Path::new("/repo/a/")), "");
        assert_eq!(relative_path(Path::new("/repo/./a"), Path::new("/repo/b/../a")), "");
    }

    #[test]
    fn test_find_project_root_walks_upward() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("nest-cli.json"), "{}").unwrap();
        let nested = temp.path().join("apps/api/src");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested).unwrap(), temp.path());
    }

    #[test]
    fn test_resolve_project_root_missing() {
        let temp = TempDir::new().unwrap();
        let err = resolve_project_root(temp.path());
        // A nest-cli.json above the temp dir would make this meaningless.
        if find_project_root(temp.path()).is_none() {
            assert!(matches!(err, Err(YapError::ProjectRootNotFound { .. })));
        }
    }

    #[test]
    fn test_detect_current_app() {
        let root = Path::new("/repo");
        assert_eq!(
            detect_current_app(root, Path::new("/repo/apps/api/src/users")),
            Some("api".to_string())
        );
        assert_eq!(detect_current_app(root, Path::new("/repo/apps")), None);
        assert_eq!(detect_current_app(root, Path::new("/repo/libs/shared")), None);
        assert_eq!(detect_current_app(root, Path::new("/elsewhere")), None);
    }

    #[test]
    fn test_entry_paths() {
        assert_eq!(
            app_entry(Path::new("/repo"), "apps/api", "main"),
            PathBuf::from("/repo/apps/api/src/main.ts")
        );
        assert_eq!(
            dist_entry(Path::new("/repo/dist"), "api", "apps/api", "main"),
            PathBuf::from("/repo/dist/api/apps/api/src/main.js")
        );
    }

    #[test]
    fn test_clean_and_ensure_dir() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("out/api");
        ensure_dir(&dir).unwrap();
        fs::write(dir.join("x.js"), "").unwrap();
        clean_dir(&temp.path().join("out")).unwrap();
        assert!(!temp.path().join("out").exists());
        clean_dir(&temp.path().join("out")).unwrap();
    }
}
