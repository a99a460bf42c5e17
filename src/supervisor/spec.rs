use crate::env_loader::EnvMap;
use crate::project_config::{ExecMode, ResolvedApp};
use serde::Serialize;
use std::path::{Path, PathBuf};

const DEFAULT_WATCH_DELAY: u64 = 1000;
const DEFAULT_IGNORE_WATCH: &[&str] = &["node_modules", ".git", "*.log"];

/// Everything the supervisor needs to launch one process.
///
/// Serialized field names follow pm2's ecosystem file format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessSpec {
    pub name: String,
    pub script: PathBuf,
    pub cwd: PathBuf,
    pub interpreter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_args: Option<String>,
    pub instances: u32,
    pub exec_mode: ExecMode,
    pub watch: bool,
    pub watch_delay: u64,
    pub ignore_watch: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_memory_restart: Option<String>,
    pub env: EnvMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_file: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_date_format: Option<String>,
    pub merge_logs: bool,
    pub autorestart: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_restarts: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_delay: Option<u64>,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, script: impl Into<PathBuf>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
            cwd: cwd.into(),
            interpreter: "node".to_string(),
            node_args: None,
            instances: 1,
            exec_mode: ExecMode::Fork,
            watch: false,
            watch_delay: DEFAULT_WATCH_DELAY,
            ignore_watch: DEFAULT_IGNORE_WATCH.iter().map(|s| s.to_string()).collect(),
            max_memory_restart: None,
            env: EnvMap::new(),
            error_file: None,
            out_file: None,
            log_date_format: None,
            merge_logs: false,
            autorestart: true,
            max_restarts: None,
            restart_delay: None,
        }
    }

    /// Preload modules through `node -r <module>`
    pub fn preload<I, S>(mut self, modules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let args: Vec<String> = modules
            .into_iter()
            .map(|m| format!("-r {}", m.as_ref()))
            .collect();
        self.node_args = (!args.is_empty()).then(|| args.join(" "));
        self
    }

    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn ignore_watch<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ignore_watch = patterns.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the environment map
    pub fn env(mut self, env: EnvMap) -> Self {
        self.env = env;
        self
    }

    /// Add one environment variable
    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn restart_policy(mut self, max_restarts: u32, restart_delay_ms: u64) -> Self {
        self.max_restarts = Some(max_restarts);
        self.restart_delay = Some(restart_delay_ms);
        self
    }

    pub fn log_files(mut self, error_file: impl Into<PathBuf>, out_file: impl Into<PathBuf>) -> Self {
        self.error_file = Some(error_file.into());
        self.out_file = Some(out_file.into());
        self
    }

    /// Apply author settings; relative log paths are taken from `root`.
    pub fn with_app_settings(mut self, app: &ResolvedApp, root: &Path) -> Self {
        self.instances = app.instances;
        self.exec_mode = app.exec_mode;
        self.max_memory_restart = Some(app.max_memory_restart.clone());
        self.log_date_format = Some(app.log_date_format.clone());
        self.merge_logs = app.merge_logs;
        self.autorestart = app.autorestart;
        self.watch = app.watch;
        self.ignore_watch = app.ignore_watch.clone();
        self.error_file = Some(crate::paths::normalize(&root.join(&app.error_file)));
        self.out_file = Some(crate::paths::normalize(&root.join(&app.out_file)));
        self.restart_policy(app.max_restarts, app.restart_delay)
    }

    /// pm2 ecosystem document holding this single app.
    pub fn to_descriptor(&self) -> serde_json::Value {
        serde_json::json!({ "apps": [self] })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project_config::AuthorConfig;

    #[test]
    fn test_builder() {
        let spec = ProcessSpec::new("api", "/repo/apps/api/src/main.ts", "/repo/apps/api")
            .preload(["tsconfig-paths/register", "@swc-node/register"])
            .watch(true)
            .env_var("NODE_ENV", "development")
            .restart_policy(5, 250)
            .log_files("/repo/logs/api-error.log", "/repo/logs/api-out.log");

        assert_eq!(
            spec.node_args.as_deref(),
            Some("-r tsconfig-paths/register -r @swc-node/register")
        );
        assert!(spec.watch);
        assert_eq!(spec.env["NODE_ENV"], "development");
        assert_eq!(spec.max_restarts, Some(5));
        assert_eq!(spec.restart_delay, Some(250));
    }

    #[test]
    fn test_descriptor_shape() {
        let spec = ProcessSpec::new("api", "/repo/dist/api/apps/api/src/main.js", "/repo")
            .env_var("PORT", "3000")
            .restart_policy(10, 1000);
        let doc = spec.to_descriptor();

        let app = &doc["apps"][0];
        assert_eq!(app["name"], "api");
        assert_eq!(app["script"], "/repo/dist/api/apps/api/src/main.js");
        assert_eq!(app["interpreter"], "node");
        assert_eq!(app["exec_mode"], "fork");
        assert_eq!(app["watch_delay"], 1000);
        assert_eq!(app["env"]["PORT"], "3000");
        assert_eq!(app["max_restarts"], 10);
        assert!(app.get("node_args").is_none());
        assert!(app.get("error_file").is_none());
    }

    #[test]
    fn test_app_settings() {
        let app = AuthorConfig::default().app("api");
        let spec = ProcessSpec::new("api", "main.js", "/repo").with_app_settings(&app, Path::new("/repo"));

        assert_eq!(spec.error_file, Some(PathBuf::from("/repo/logs/api-error.log")));
        assert_eq!(spec.out_file, Some(PathBuf::from("/repo/logs/api-out.log")));
        assert_eq!(spec.max_memory_restart.as_deref(), Some("500M"));
        assert_eq!(spec.max_restarts, Some(10));
        assert!(spec.merge_logs);
    }
}
