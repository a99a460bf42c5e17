use super::rewrite;
use super::synth::{synthesize, BuildConfig};
use super::toolchain::Toolchain;
use crate::error::{Result, YapError};
use crate::manifest::ServiceDescriptor;
use crate::paths::{clean_dir, dist_entry, ensure_dir, relative_path};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generated config file that is removed when dropped, on every exit path.
struct TempConfigFile {
    path: PathBuf,
}

impl TempConfigFile {
    fn write(project_root: &Path, config: &BuildConfig) -> Result<Self> {
        let unique = format!(
            "{}-{}-{}",
            std::process::id(),
            chrono::Utc::now().timestamp_millis(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        );
        let path = project_root.join(format!("tsconfig.build.{unique}.tmp.json"));
        let content = serde_json::to_string_pretty(&config.to_document())?;

        // guard first, so a partial write is removed too
        let file = Self { path };
        fs::write(&file.path, content)?;
        debug!(path = %file.path.display(), "Wrote temporary tsconfig");
        Ok(file)
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempConfigFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Removed temporary tsconfig"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Failed to remove {}: {}", self.path.display(), e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltService {
    pub name: String,
    /// Compiled entry point
    pub entry: PathBuf,
    /// Files touched by the alias rewrite
    pub rewritten_files: usize,
}

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub out_dir: PathBuf,
    pub services: Vec<BuiltService>,
    pub duration: Duration,
}

/// Builds services one after another into `<out_dir>/<service>`.
pub struct CompilationPipeline<'a> {
    root: PathBuf,
    out_dir: PathBuf,
    toolchain: &'a dyn Toolchain,
    source_map: bool,
}

impl<'a> CompilationPipeline<'a> {
    pub fn new(root: impl Into<PathBuf>, out_dir: impl Into<PathBuf>, toolchain: &'a dyn Toolchain) -> Self {
        Self {
            root: root.into(),
            out_dir: out_dir.into(),
            toolchain,
            source_map: false,
        }
    }

    pub fn source_map(mut self, enabled: bool) -> Self {
        self.source_map = enabled;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Compile a batch. Services are built strictly in order; the first
    /// failure aborts the batch and leaves earlier outputs in place.
    pub async fn compile(
        &self,
        services: &[ServiceDescriptor],
        libs: &[ServiceDescriptor],
        clean_all: bool,
    ) -> Result<BuildReport> {
        let started = Instant::now();

        if clean_all {
            clean_dir(&self.out_dir)?;
        }
        ensure_dir(&self.out_dir)?;

        let mut built = Vec::with_capacity(services.len());
        for service in services {
            info!("Building {}...", service.name);
            // the whole output root was already cleaned, cleaning again would
            // wipe siblings built earlier in this batch
            built.push(self.compile_service(service, libs, false).await?);
        }

        Ok(BuildReport {
            out_dir: self.out_dir.clone(),
            services: built,
            duration: started.elapsed(),
        })
    }

    pub async fn compile_service(
        &self,
        service: &ServiceDescriptor,
        libs: &[ServiceDescriptor],
        clean: bool,
    ) -> Result<BuiltService> {
        let service_out_dir = self.out_dir.join(&service.name);
        let project_root = self.root.join(&service.root);

        if clean {
            clean_dir(&service_out_dir)?;
        }
        ensure_dir(&service_out_dir)?;

        let mut config = synthesize(&self.root, service, libs, &service_out_dir);
        config.compiler_options.source_map = self.source_map;

        let temp_config = TempConfigFile::write(&project_root, &config)?;

        let status = self.toolchain.compile(temp_config.path(), &self.root).await?;
        if !status.success() {
            return Err(YapError::CompileError {
                service: service.name.clone(),
                code: status.code(),
            });
        }

        let rewritten_files = if libs.is_empty() {
            0
        } else {
            rewrite::rewrite(&service_out_dir, libs, &service_out_dir)?
        };

        let entry = dist_entry(&self.out_dir, &service.name, &service.root, &service.entry_file);
        emit_package_manifest(&project_root, &service_out_dir, &relative_path(&service_out_dir, &entry))?;

        info!(service = %service.name, rewritten = rewritten_files, "Compiled successfully");
        Ok(BuiltService {
            name: service.name.clone(),
            entry,
            rewritten_files,
        })
    }
}

/// Copy the service's `package.json` into its output without
/// `devDependencies` and with `main` pointing at the compiled entry.
fn emit_package_manifest(project_root: &Path, service_out_dir: &Path, main: &str) -> Result<bool> {
    let source = project_root.join("package.json");
    if !source.is_file() {
        return Ok(false);
    }

    let content = fs::read_to_string(&source)?;
    let mut package: serde_json::Value = serde_json::from_str(&content)?;
    if let Some(obj) = package.as_object_mut() {
        obj.remove("devDependencies");
        obj.insert(
            "main".to_string(),
            serde_json::Value::String(main.to_string()),
        );
    }

    fs::write(
        service_out_dir.join("package.json"),
        serde_json::to_string_pretty(&package)?,
    )?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::ServiceKind;
    use tempfile::TempDir;

    #[test]
    fn test_temp_config_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let service = ServiceDescriptor {
            name: "api".into(),
            kind: ServiceKind::Application,
            root: ".".into(),
            source_root: "src".into(),
            entry_file: "main".into(),
            ts_config_path: None,
        };
        let config = synthesize(temp.path(), &service, &[], &temp.path().join("dist/api"));

        let path = {
            let file = TempConfigFile::write(temp.path(), &config).unwrap();
            assert!(file.path().is_file());
            file.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_config_failed_write_leaves_nothing() {
        let temp = TempDir::new().unwrap();
        let service = ServiceDescriptor {
            name: "api".into(),
            kind: ServiceKind::Application,
            root: ".".into(),
            source_root: "src".into(),
            entry_file: "main".into(),
            ts_config_path: None,
        };
        let config = synthesize(temp.path(), &service, &[], &temp.path().join("dist/api"));
        let missing = temp.path().join("apps/missing");

        assert!(TempConfigFile::write(&missing, &config).is_err());
        assert!(!missing.exists());
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_temp_config_names_are_unique() {
        let temp = TempDir::new().unwrap();
        let service = ServiceDescriptor {
            name: "api".into(),
            kind: ServiceKind::Application,
            root: ".".into(),
            source_root: "src".into(),
            entry_file: "main".into(),
            ts_config_path: None,
        };
        let config = synthesize(temp.path(), &service, &[], &temp.path().join("dist/api"));
        let a = TempConfigFile::write(temp.path(), &config).unwrap();
        let b = TempConfigFile::write(temp.path(), &config).unwrap();
        assert_ne!(a.path(), b.path());
    }

    #[test]
    fn test_emit_package_manifest() {
        let temp = TempDir::new().unwrap();
        let project = temp.path().join("apps/api");
        let out = temp.path().join("dist/api");
        fs::create_dir_all(&project).unwrap();
        fs::create_dir_all(&out).unwrap();

        assert!(!emit_package_manifest(&project, &out, "apps/api/src/main.js").unwrap());

        fs::write(
            project.join("package.json"),
            r#"{"name":"api","main":"src/main.ts","dependencies":{"a":"1"},"devDependencies":{"b":"2"}}"#,
        )
        .unwrap();
        assert!(emit_package_manifest(&project, &out, "apps/api/src/main.js").unwrap());

        let emitted: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("package.json")).unwrap()).unwrap();
        assert_eq!(emitted["main"], "apps/api/src/main.js");
        assert!(emitted.get("devDependencies").is_none());
        assert_eq!(emitted["dependencies"]["a"], "1");
    }
}
