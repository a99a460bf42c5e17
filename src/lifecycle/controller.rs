use super::targets::{self, Fallback, Targets};
use crate::build::{BuildReport, CompilationPipeline, Toolchain};
use crate::clienv::DIST_DIR;
use crate::env_loader::{load_env_files, EnvMap};
use crate::error::YapError;
use crate::build::synth::ALIAS_PREFIX;
use crate::manifest::{resolve_tsconfig_paths, Manifest, ServiceDescriptor};
use crate::paths::{app_entry, dist_entry, ensure_dir, normalize};
use crate::project_config::AuthorConfig;
use crate::supervisor::{Listing, LogQuery, ProcessSpec, Supervisor, Target};
use crate::tsconfig::resolve_tsconfig;
use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const DEV_PRELOAD: &[&str] = &["tsconfig-paths/register", "@swc-node/register"];

#[derive(Debug, Clone)]
pub struct DevOptions {
    pub names: Vec<String>,
    pub all: bool,
    pub environment: String,
    pub watch: bool,
    /// Directory the command was invoked from, for target auto-detection
    pub cwd: PathBuf,
}

#[derive(Debug, Clone)]
pub struct StartOptions {
    pub names: Vec<String>,
    pub all: bool,
    pub environment: String,
}

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub names: Vec<String>,
    pub out_dir: Option<PathBuf>,
    pub clean: bool,
    pub source_map: bool,
}

/// Entries launched by `dev` or `start`.
#[derive(Debug, Clone)]
pub struct Launch {
    pub started: Vec<String>,
    pub skipped: Vec<String>,
    pub defaulted: bool,
    pub environment: String,
}

#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub report: BuildReport,
    pub skipped: Vec<String>,
}

/// Result of a stop, restart or delete batch.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// The action went to every tracked entry at once
    pub all: bool,
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn success_count(&self) -> usize {
        self.succeeded.len()
    }
}

#[derive(Debug, Clone, Copy)]
enum BatchAction {
    Stop,
    Restart,
    Delete,
}

/// Coordinates one command against the manifest, author config and supervisor.
pub struct LifecycleController<'a> {
    root: PathBuf,
    manifest: Manifest,
    author: AuthorConfig,
    supervisor: &'a dyn Supervisor,
}

impl<'a> LifecycleController<'a> {
    pub fn new(root: impl Into<PathBuf>, manifest: Manifest, author: AuthorConfig, supervisor: &'a dyn Supervisor) -> Self {
        Self {
            root: root.into(),
            manifest,
            author,
            supervisor,
        }
    }

    /// Load the manifest and `yap.toml` under `root`.
    pub fn open(root: &Path, supervisor: &'a dyn Supervisor) -> Result<Self> {
        let manifest = Manifest::load(root)?;
        let author = AuthorConfig::load(root)?;
        Ok(Self::new(root, manifest, author, supervisor))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn supervisor(&self) -> &'a dyn Supervisor {
        self.supervisor
    }

    pub fn log_dir(&self) -> PathBuf {
        normalize(&self.root.join(self.author.global.log_dir()))
    }

    /// Start services from TypeScript sources with file watching.
    pub async fn dev(&self, opts: &DevOptions) -> Result<Launch> {
        let fallback = Fallback::CurrentDir {
            root: self.root.clone(),
            cwd: opts.cwd.clone(),
        };
        let targets = targets::resolve(&self.manifest, &opts.names, opts.all, fallback)?;
        self.check_dev_aliases();
        let env_files = load_env_files(&self.root, self.author.global.env_file_pattern(), &opts.environment)?;

        let mut specs = Vec::with_capacity(targets.services.len());
        for service in &targets.services {
            specs.push(self.dev_spec(service, &env_files, opts)?);
        }

        self.launch(targets, specs, &opts.environment).await
    }

    /// Start services from the build output.
    pub async fn start(&self, opts: &StartOptions) -> Result<Launch> {
        let targets = targets::resolve(&self.manifest, &opts.names, opts.all, Fallback::Required)?;
        let dist = self.root.join(DIST_DIR);

        for service in &targets.services {
            let entry = dist_entry(&dist, &service.name, &service.root, &service.entry_file);
            if !entry.is_file() {
                return Err(YapError::BuildOutputMissing {
                    service: service.name.clone(),
                    expected: entry,
                }
                .into());
            }
        }

        let env_files = load_env_files(&self.root, self.author.global.env_file_pattern(), &opts.environment)?;
        let specs = targets
            .services
            .iter()
            .map(|service| self.production_spec(service, &dist, &env_files, &opts.environment))
            .collect();

        self.launch(targets, specs, &opts.environment).await
    }

    async fn launch(&self, targets: Targets, specs: Vec<ProcessSpec>, environment: &str) -> Result<Launch> {
        ensure_dir(&self.log_dir())?;

        // replace rather than fail on "already exists"
        for spec in &specs {
            let outcome = self.supervisor.delete_silent(&spec.name).await;
            debug!(name = %spec.name, ?outcome, "Cleared previous entry");
        }

        let mut started = Vec::with_capacity(specs.len());
        for spec in &specs {
            info!(name = %spec.name, script = %spec.script.display(), "Starting");
            self.supervisor.start(spec).await?;
            started.push(spec.name.clone());
        }

        Ok(Launch {
            started,
            skipped: targets.skipped,
            defaulted: targets.defaulted,
            environment: environment.to_string(),
        })
    }

    /// Dev mode resolves `@libs/*` through the root tsconfig at runtime.
    fn check_dev_aliases(&self) {
        let libs = self.manifest.libraries();
        if libs.is_empty() {
            return;
        }
        let paths = resolve_tsconfig_paths(&self.root).unwrap_or_default();
        let missing: Vec<&str> = libs
            .iter()
            .map(|lib| lib.name.as_str())
            .filter(|name| !paths.contains_key(&format!("{ALIAS_PREFIX}{name}")))
            .collect();
        if !missing.is_empty() {
            warn!(
                "Root tsconfig.json has no path alias for {}; imports of these libraries will not resolve",
                missing.join(", ")
            );
        }
    }

    fn dev_spec(&self, service: &ServiceDescriptor, env_files: &EnvMap, opts: &DevOptions) -> Result<ProcessSpec> {
        let app = self.author.app(&service.name);
        let project_root = self.root.join(&service.root);

        let ts_project = match resolve_tsconfig(&project_root, self.root.parent())? {
            Some(resolved) => resolved.config_path,
            None => {
                warn!("No tsconfig.json found for {}, using the root one", service.name);
                self.root.join("tsconfig.json")
            }
        };

        let mut env = app.env_for(&opts.environment);
        env.extend(env_files.iter().map(|(k, v)| (k.clone(), v.clone())));

        let mut ignore = app.ignore_watch.clone();
        if !ignore.iter().any(|p| p == "*.log") {
            ignore.push("*.log".to_string());
        }

        Ok(ProcessSpec::new(
            &service.name,
            app_entry(&self.root, &service.root, &service.entry_file),
            project_root,
        )
        .with_app_settings(&app, &self.root)
        .preload(DEV_PRELOAD)
        .watch(opts.watch)
        .ignore_watch(ignore)
        .env(env)
        .env_var("NODE_ENV", &opts.environment)
        .env_var("TS_NODE_PROJECT", ts_project.to_string_lossy()))
    }

    fn production_spec(&self, service: &ServiceDescriptor, dist: &Path, env_files: &EnvMap, environment: &str) -> ProcessSpec {
        let app = self.author.app(&service.name);
        let mut env = app.env_for(environment);
        env.extend(env_files.iter().map(|(k, v)| (k.clone(), v.clone())));

        ProcessSpec::new(
            &service.name,
            dist_entry(dist, &service.name, &service.root, &service.entry_file),
            &self.root,
        )
        .with_app_settings(&app, &self.root)
        .env(env)
        .env_var("NODE_ENV", environment)
    }

    /// Compile applications into the output directory.
    pub async fn build(&self, toolchain: &dyn Toolchain, opts: &BuildOptions) -> Result<BuildOutcome> {
        let targets = targets::resolve(&self.manifest, &opts.names, false, Fallback::AllApplications)?;

        if !toolchain.check_installed(&self.root).await {
            bail!("TypeScript compiler not found. Install it with: npm install -D typescript");
        }

        let out_dir = opts
            .out_dir
            .as_ref()
            .map(|dir| normalize(&self.root.join(dir)))
            .unwrap_or_else(|| self.root.join(DIST_DIR));
        let libs = self.manifest.libraries();

        let report = CompilationPipeline::new(&self.root, out_dir, toolchain)
            .source_map(opts.source_map)
            .compile(&targets.services, &libs, opts.clean)
            .await?;

        Ok(BuildOutcome {
            report,
            skipped: targets.skipped,
        })
    }

    pub async fn stop(&self, names: &[String], all: bool) -> Result<BatchReport> {
        self.batch(BatchAction::Stop, names, all).await
    }

    pub async fn restart(&self, names: &[String], all: bool) -> Result<BatchReport> {
        self.batch(BatchAction::Restart, names, all).await
    }

    /// Remove entries from the supervisor entirely.
    pub async fn delete(&self, names: &[String], all: bool) -> Result<BatchReport> {
        self.batch(BatchAction::Delete, names, all).await
    }

    async fn batch(&self, action: BatchAction, names: &[String], all: bool) -> Result<BatchReport> {
        if all {
            if let Ok(list) = self.supervisor.processes().await {
                if list.is_empty() {
                    debug!("Nothing tracked, {:?} all is a no-op", action);
                    return Ok(BatchReport {
                        all: true,
                        ..BatchReport::default()
                    });
                }
            }
            self.apply(action, &Target::All).await?;
            return Ok(BatchReport {
                all: true,
                ..BatchReport::default()
            });
        }

        if names.is_empty() {
            return Err(YapError::NoTargets(self.manifest.application_names()).into());
        }

        let validation = self.manifest.validate(names);
        let mut report = BatchReport {
            skipped: validation.invalid,
            ..BatchReport::default()
        };

        for name in validation.valid {
            match self.apply(action, &Target::name(name.clone())).await {
                Ok(()) => report.succeeded.push(name),
                Err(e) => {
                    warn!(name = %name, error = %e, "{:?} failed", action);
                    report.failed.push((name, e.to_string()));
                }
            }
        }
        Ok(report)
    }

    async fn apply(&self, action: BatchAction, target: &Target) -> crate::error::Result<()> {
        match action {
            BatchAction::Stop => self.supervisor.stop(target).await,
            BatchAction::Restart => self.supervisor.restart(target).await,
            BatchAction::Delete => self.supervisor.delete(target).await,
        }
    }

    /// Print supervisor logs for one service or all of them.
    pub async fn logs(&self, service: Option<&str>, lines: u32, follow: bool) -> Result<()> {
        if let Some(name) = service {
            if !self.manifest.contains(name) {
                return Err(YapError::UnknownService(vec![name.to_string()]).into());
            }
        }
        let query = LogQuery::new(Target::from(service)).lines(lines).follow(follow);
        self.supervisor.logs(&query).await?;
        Ok(())
    }

    /// Delete `*.log` files in the log directory, or only the files that
    /// belong to one service. Returns how many were removed.
    pub async fn flush_logs(&self, service: Option<&str>) -> Result<usize> {
        if let Err(e) = self.supervisor.flush(&Target::from(service)).await {
            debug!("Supervisor flush failed: {}", e);
        }

        let log_dir = self.log_dir();
        if !log_dir.is_dir() {
            return Ok(0);
        }

        let owned = service.map(|name| self.service_log_files(name));
        let mut deleted = 0;
        for entry in fs::read_dir(&log_dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("log") {
                continue;
            }
            if owned.as_ref().is_some_and(|files| !files.contains(&path)) {
                continue;
            }
            match fs::remove_file(&path) {
                Ok(()) => deleted += 1,
                Err(e) => debug!("Could not delete {}: {}", path.display(), e),
            }
        }
        Ok(deleted)
    }

    /// Log files `name` writes: its configured error and out files plus the
    /// combined `<name>.log`.
    fn service_log_files(&self, name: &str) -> Vec<PathBuf> {
        let app = self.author.app(name);
        vec![
            normalize(&self.root.join(&app.error_file)),
            normalize(&self.root.join(&app.out_file)),
            self.log_dir().join(format!("{name}.log")),
        ]
    }

    pub async fn list(&self) -> Result<Listing> {
        Ok(self.supervisor.status().await?)
    }
}
