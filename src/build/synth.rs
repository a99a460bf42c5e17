//! Per-service compiler config synthesis.
//!
//! A service's own tsconfig cannot know where sibling libraries live relative
//! to it, so every build gets a generated config that adds the library source
//! trees to `include` and maps `@libs/<name>` aliases onto them.

use crate::manifest::ServiceDescriptor;
use crate::paths::relative_path;
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::Path;

pub const ALIAS_PREFIX: &str = "@libs/";

/// Candidate parents, searched in order inside the service root.
const INHERIT_CANDIDATES: &[&str] = &["tsconfig.app.json", "tsconfig.json"];

const EXCLUDES: &[&str] = &["node_modules", "dist", "test", "**/*spec.ts", "**/*.test.ts"];

/// Options inlined when the service has no tsconfig to inherit from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StandaloneOptions {
    pub module: String,
    pub module_resolution: String,
    pub target: String,
    pub es_module_interop: bool,
    pub experimental_decorators: bool,
    pub emit_decorator_metadata: bool,
    pub skip_lib_check: bool,
    pub strict_null_checks: bool,
    pub force_consistent_casing_in_file_names: bool,
}

impl Default for StandaloneOptions {
    fn default() -> Self {
        Self {
            module: "NodeNext".into(),
            module_resolution: "NodeNext".into(),
            target: "ES2022".into(),
            es_module_interop: true,
            experimental_decorators: true,
            emit_decorator_metadata: true,
            skip_lib_check: true,
            strict_null_checks: true,
            force_consistent_casing_in_file_names: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    pub base_url: String,
    /// Monorepo root relative to the service root, so library sources are inside it
    pub root_dir: String,
    pub out_dir: String,
    pub paths: BTreeMap<String, Vec<String>>,
    pub declaration: bool,
    pub source_map: bool,
    pub composite: bool,
    pub incremental: bool,
    #[serde(flatten)]
    pub standalone: Option<StandaloneOptions>,
}

/// Generated compiler config for one (service, library set) pair.
///
/// Paths in `include_paths` are relative to the monorepo root; everything
/// else is relative to the service root, where the config file is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildConfig {
    pub include_paths: Vec<String>,
    pub exclude: Vec<String>,
    /// Parent config, relative to the service root (`./tsconfig.app.json`)
    pub inherited_base: Option<String>,
    pub compiler_options: CompilerOptions,
    /// Monorepo root relative to the service root
    pub monorepo_root: String,
}

impl BuildConfig {
    pub fn path_alias_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.compiler_options.paths
    }

    pub fn out_dir(&self) -> &str {
        &self.compiler_options.out_dir
    }

    /// Render the tsconfig document as the compiler will read it from the
    /// service root.
    pub fn to_document(&self) -> Value {
        let include: Vec<String> = self
            .include_paths
            .iter()
            .map(|p| join_rel(&self.monorepo_root, p))
            .collect();

        let mut doc = json!({
            "compilerOptions": self.compiler_options,
            "include": include,
            "exclude": self.exclude,
        });
        if let Some(base) = &self.inherited_base {
            doc["extends"] = Value::String(base.clone());
        }
        doc
    }
}

fn join_rel(base: &str, rest: &str) -> String {
    if base.is_empty() {
        rest.to_string()
    } else {
        format!("{base}/{rest}")
    }
}

fn trim_slashes(path: &str) -> &str {
    path.trim_start_matches("./").trim_end_matches('/')
}

/// Derive the build config for `target` compiled together with `libs`.
///
/// Inputs are assumed validated: a library whose source root is missing on
/// disk still gets its alias entries.
pub fn synthesize(
    root: &Path,
    target: &ServiceDescriptor,
    libs: &[ServiceDescriptor],
    out_dir: &Path,
) -> BuildConfig {
    let project_root = root.join(&target.root);
    let monorepo_root = relative_path(&project_root, root);
    let relative_out = relative_path(&project_root, out_dir);

    let mut paths = BTreeMap::new();
    let mut include_paths = vec![format!("{}/**/*", trim_slashes(&target.source_root))];

    for lib in libs {
        let lib_src = relative_path(&project_root, &root.join(&lib.source_root));
        paths.insert(format!("{ALIAS_PREFIX}{}", lib.name), vec![lib_src.clone()]);
        paths.insert(format!("{ALIAS_PREFIX}{}/*", lib.name), vec![format!("{lib_src}/*")]);
        include_paths.push(format!("{}/**/*", trim_slashes(&lib.source_root)));
    }

    let inherited_base = find_inherited_base(root, target);
    let standalone = match &inherited_base {
        Some(base) => {
            tracing::debug!(service = %target.name, extends = %base, "Inheriting tsconfig");
            None
        }
        None => {
            tracing::debug!(service = %target.name, "No tsconfig to inherit, inlining defaults");
            Some(StandaloneOptions::default())
        }
    };

    BuildConfig {
        include_paths,
        exclude: EXCLUDES.iter().map(|s| s.to_string()).collect(),
        inherited_base,
        compiler_options: CompilerOptions {
            base_url: ".".into(),
            root_dir: if monorepo_root.is_empty() { ".".into() } else { monorepo_root.clone() },
            out_dir: if relative_out.is_empty() { ".".into() } else { relative_out },
            paths,
            declaration: false,
            source_map: false,
            composite: false,
            incremental: false,
            standalone,
        },
        monorepo_root,
    }
}

/// The manifest's `tsConfigPath` wins when it exists, then the fixed
/// candidates in the service root.
fn find_inherited_base(root: &Path, target: &ServiceDescriptor) -> Option<String> {
    let project_root = root.join(&target.root);

    if let Some(declared) = &target.ts_config_path {
        let full = root.join(declared);
        if full.is_file() {
            return Some(format!("./{}", relative_path(&project_root, &full)));
        }
        tracing::warn!(service = %target.name, path = %declared, "Declared tsConfigPath does not exist");
    }

    INHERIT_CANDIDATES
        .iter()
        .find(|name| project_root.join(name).is_file())
        .map(|name| format!("./{name}"))
}
