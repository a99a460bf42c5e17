use crate::clienv::AUTHOR_CONFIG_FILE;
use crate::env_loader::{EnvMap, DEFAULT_ENV_FILE_PATTERN};
use crate::error::{Result, YapError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_MAX_MEMORY: &str = "500M";
const DEFAULT_LOG_DATE_FORMAT: &str = "YYYY-MM-DD HH:mm:ss";
const DEFAULT_IGNORE_WATCH: &[&str] = &["node_modules", "logs", "dist", ".git"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecMode {
    #[default]
    Fork,
    Cluster,
}

impl ExecMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecMode::Fork => "fork",
            ExecMode::Cluster => "cluster",
        }
    }
}

/// Env values may be written as strings, numbers or booleans; processes
/// always receive strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for EnvValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvValue::String(s) => f.write_str(s),
            EnvValue::Integer(i) => write!(f, "{i}"),
            EnvValue::Float(x) => write!(f, "{x}"),
            EnvValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

fn flatten_env(env: &BTreeMap<String, EnvValue>) -> EnvMap {
    env.iter().map(|(k, v)| (k.clone(), v.to_string())).collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GlobalConfig {
    pub env_file_pattern: Option<String>,
    pub log_dir: Option<String>,
    pub combine_logs: Option<bool>,
}

impl GlobalConfig {
    pub fn log_dir(&self) -> &str {
        self.log_dir.as_deref().unwrap_or(DEFAULT_LOG_DIR)
    }

    pub fn env_file_pattern(&self) -> &str {
        self.env_file_pattern.as_deref().unwrap_or(DEFAULT_ENV_FILE_PATTERN)
    }

    pub fn combine_logs(&self) -> bool {
        self.combine_logs.unwrap_or(false)
    }
}

/// One `[[apps]]` entry as written by the author; unset fields take defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    pub name: String,
    pub instances: Option<u32>,
    pub exec_mode: Option<ExecMode>,
    pub max_memory_restart: Option<String>,
    pub log_date_format: Option<String>,
    pub error_file: Option<String>,
    pub out_file: Option<String>,
    pub merge_logs: Option<bool>,
    pub autorestart: Option<bool>,
    pub max_restarts: Option<u32>,
    pub restart_delay: Option<u64>,
    pub watch: Option<bool>,
    pub ignore_watch: Option<Vec<String>>,
    pub env: Option<BTreeMap<String, EnvValue>>,
    pub env_production: Option<BTreeMap<String, EnvValue>>,
    pub env_staging: Option<BTreeMap<String, EnvValue>>,
}

/// App settings with every default applied.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedApp {
    pub name: String,
    pub instances: u32,
    pub exec_mode: ExecMode,
    pub max_memory_restart: String,
    pub log_date_format: String,
    pub error_file: String,
    pub out_file: String,
    pub merge_logs: bool,
    pub autorestart: bool,
    pub max_restarts: u32,
    pub restart_delay: u64,
    pub watch: bool,
    pub ignore_watch: Vec<String>,
    env: EnvMap,
    env_production: EnvMap,
    env_staging: EnvMap,
}

impl ResolvedApp {
    /// Base `env` block overlaid with the block for `environment`, if any.
    pub fn env_for(&self, environment: &str) -> EnvMap {
        let mut env = self.env.clone();
        let overlay = match environment {
            "production" => &self.env_production,
            "staging" => &self.env_staging,
            _ => return env,
        };
        env.extend(overlay.iter().map(|(k, v)| (k.clone(), v.clone())));
        env
    }
}

/// Contents of `yap.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthorConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub apps: Vec<AppConfig>,
}

impl AuthorConfig {
    pub fn config_path(root: &Path) -> std::path::PathBuf {
        root.join(AUTHOR_CONFIG_FILE)
    }

    /// Load `<root>/yap.toml`; a missing file yields defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::config_path(root);
        tracing::trace!(path = %path.display(), "Loading author config");

        if !path.is_file() {
            tracing::trace!("Author config does not exist, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content).map_err(|e| YapError::AuthorConfig {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        tracing::trace!(apps = config.apps.len(), "Author config loaded");
        Ok(config)
    }

    /// Settings for `name`, falling back to defaults when it is not declared.
    pub fn app(&self, name: &str) -> ResolvedApp {
        let declared = self.apps.iter().find(|a| a.name == name);
        let app = declared.cloned().unwrap_or_else(|| AppConfig {
            name: name.to_string(),
            ..AppConfig::default()
        });
        let log_dir = self.global.log_dir().trim_end_matches('/');
        let (default_error, default_out) = if self.global.combine_logs() {
            let combined = format!("{log_dir}/{name}.log");
            (combined.clone(), combined)
        } else {
            (format!("{log_dir}/{name}-error.log"), format!("{log_dir}/{name}-out.log"))
        };

        ResolvedApp {
            instances: app.instances.unwrap_or(1),
            exec_mode: app.exec_mode.unwrap_or_default(),
            max_memory_restart: app
                .max_memory_restart
                .unwrap_or_else(|| DEFAULT_MAX_MEMORY.to_string()),
            log_date_format: app
                .log_date_format
                .unwrap_or_else(|| DEFAULT_LOG_DATE_FORMAT.to_string()),
            error_file: app.error_file.unwrap_or(default_error),
            out_file: app.out_file.unwrap_or(default_out),
            merge_logs: app.merge_logs.unwrap_or(true),
            autorestart: app.autorestart.unwrap_or(true),
            max_restarts: app.max_restarts.unwrap_or(10),
            restart_delay: app.restart_delay.unwrap_or(1000),
            watch: app.watch.unwrap_or(false),
            ignore_watch: app
                .ignore_watch
                .unwrap_or_else(|| DEFAULT_IGNORE_WATCH.iter().map(|s| s.to_string()).collect()),
            env: app.env.as_ref().map(flatten_env).unwrap_or_default(),
            env_production: app.env_production.as_ref().map(flatten_env).unwrap_or_default(),
            env_staging: app.env_staging.as_ref().map(flatten_env).unwrap_or_default(),
            name: app.name,
        }
    }

    /// Starter `yap.toml` declaring every application.
    pub fn template<S: AsRef<str>>(app_names: &[S]) -> Result<String> {
        let env = |value: &str| {
            BTreeMap::from([("NODE_ENV".to_string(), EnvValue::String(value.to_string()))])
        };

        let config = AuthorConfig {
            global: GlobalConfig {
                env_file_pattern: Some(DEFAULT_ENV_FILE_PATTERN.to_string()),
                log_dir: Some(DEFAULT_LOG_DIR.to_string()),
                combine_logs: Some(false),
            },
            apps: app_names
                .iter()
                .map(|name| AppConfig {
                    name: name.as_ref().to_string(),
                    instances: Some(1),
                    exec_mode: Some(ExecMode::Fork),
                    max_memory_restart: Some(DEFAULT_MAX_MEMORY.to_string()),
                    autorestart: Some(true),
                    max_restarts: Some(10),
                    restart_delay: Some(1000),
                    env: Some(env("development")),
                    env_production: Some(env("production")),
                    ..AppConfig::default()
                })
                .collect(),
        };

        toml::to_string_pretty(&config).map_err(|e| YapError::AuthorConfig {
            path: AUTHOR_CONFIG_FILE.into(),
            reason: e.to_string(),
        })
    }
}
