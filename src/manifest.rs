//! Monorepo manifest (`nest-cli.json`) scanning.

use crate::clienv::MANIFEST_FILE;
use crate::error::{Result, YapError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Application,
    Library,
}

impl ServiceKind {
    fn default_entry(&self) -> &'static str {
        match self {
            ServiceKind::Application => "main",
            ServiceKind::Library => "index",
        }
    }
}

/// A named unit of the monorepo, resolved from its manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceDescriptor {
    pub name: String,
    pub kind: ServiceKind,
    /// Project root, relative to the monorepo root
    pub root: String,
    /// Source root, relative to the monorepo root
    pub source_root: String,
    /// Entry module name without extension
    pub entry_file: String,
    pub ts_config_path: Option<String>,
}

impl ServiceDescriptor {
    pub fn is_application(&self) -> bool {
        self.kind == ServiceKind::Application
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectEntry {
    #[serde(rename = "type")]
    kind: ServiceKind,
    root: String,
    source_root: String,
    #[serde(default)]
    entry_file: Option<String>,
    #[serde(default)]
    compiler_options: Option<ProjectCompilerOptions>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectCompilerOptions {
    #[serde(default)]
    ts_config_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawManifest {
    projects: serde_json::Map<String, serde_json::Value>,
}

/// Result of checking requested names against the manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Validation {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

/// Parsed manifest, projects kept in declaration order.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    services: Vec<ServiceDescriptor>,
}

impl Manifest {
    /// Load `<root>/nest-cli.json`.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(MANIFEST_FILE);
        tracing::trace!(path = %path.display(), "Loading manifest");

        if !path.is_file() {
            return Err(YapError::ManifestNotFound { path });
        }

        let content = fs::read_to_string(&path)?;
        Self::parse(&content, path)
    }

    pub fn parse(content: &str, path: PathBuf) -> Result<Self> {
        let malformed = |reason: String| YapError::ManifestMalformed {
            path: path.clone(),
            reason,
        };

        let raw: RawManifest =
            serde_json::from_str(content).map_err(|e| malformed(e.to_string()))?;

        let mut services = Vec::with_capacity(raw.projects.len());
        for (name, value) in raw.projects {
            let entry: ProjectEntry = serde_json::from_value(value)
                .map_err(|e| malformed(format!("project '{name}': {e}")))?;
            let entry_file = entry
                .entry_file
                .unwrap_or_else(|| entry.kind.default_entry().to_string());
            services.push(ServiceDescriptor {
                name,
                kind: entry.kind,
                root: entry.root,
                source_root: entry.source_root,
                entry_file,
                ts_config_path: entry.compiler_options.unwrap_or_default().ts_config_path,
            });
        }

        tracing::debug!(count = services.len(), "Manifest loaded");
        Ok(Self { path, services })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn services(&self) -> &[ServiceDescriptor] {
        &self.services
    }

    pub fn applications(&self) -> Vec<ServiceDescriptor> {
        self.of_kind(ServiceKind::Application)
    }

    pub fn libraries(&self) -> Vec<ServiceDescriptor> {
        self.of_kind(ServiceKind::Library)
    }

    fn of_kind(&self, kind: ServiceKind) -> Vec<ServiceDescriptor> {
        self.services
            .iter()
            .filter(|s| s.kind == kind)
            .cloned()
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&ServiceDescriptor> {
        self.services.iter().find(|s| s.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Partition requested names by manifest membership. Never fails.
    pub fn validate<S: AsRef<str>>(&self, names: &[S]) -> Validation {
        let mut validation = Validation::default();
        for name in names {
            let name = name.as_ref();
            if self.contains(name) {
                validation.valid.push(name.to_string());
            } else {
                validation.invalid.push(name.to_string());
            }
        }
        validation
    }

    /// Comma separated application names, for "available services" hints.
    pub fn application_names(&self) -> String {
        self.services
            .iter()
            .filter(|s| s.is_application())
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// `compilerOptions.paths` of the root `tsconfig.json`, if it has any.
pub fn resolve_tsconfig_paths(root: &Path) -> Option<HashMap<String, Vec<String>>> {
    let config = crate::tsconfig::parse_tsconfig(&root.join("tsconfig.json"))?;
    let paths = config.get("compilerOptions")?.get("paths")?.clone();
    serde_json::from_value(paths).ok()
}
