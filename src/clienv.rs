use std::path::PathBuf;

/// Environment variables read by the CLI.
#[derive(Debug, Clone, Copy)]
pub enum EnvVar {
    YapSupervisor,
    YapCompiler,
    YapLog,
    RustLog,
    YapDescriptorDir,
}

impl EnvVar {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvVar::YapSupervisor => "YAP_SUPERVISOR",
            EnvVar::YapCompiler => "YAP_COMPILER",
            EnvVar::YapLog => "YAP_LOG",
            EnvVar::RustLog => "RUST_LOG",
            EnvVar::YapDescriptorDir => "YAP_DESCRIPTOR_DIR",
        }
    }
}

const DEFAULT_SUPERVISOR: &str = "npx pm2";
const DEFAULT_COMPILER: &str = "npx tsc";
const DEFAULT_LOG_FILTER: &str = "yap=warn";

pub const MANIFEST_FILE: &str = "nest-cli.json";
pub const AUTHOR_CONFIG_FILE: &str = "yap.toml";
pub const LOG_DIR: &str = "logs";
pub const DIST_DIR: &str = "dist";

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Split a command line into program and leading arguments.
fn split_command(line: &str) -> (String, Vec<String>) {
    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts.next().unwrap_or_default();
    (program, parts.collect())
}

/// Supervisor command line ($YAP_SUPERVISOR or "npx pm2")
pub fn supervisor_command() -> (String, Vec<String>) {
    let line = env_opt(EnvVar::YapSupervisor.as_str()).unwrap_or_else(|| DEFAULT_SUPERVISOR.into());
    tracing::trace!(command = %line, "Supervisor command");
    split_command(&line)
}

/// Compiler command line ($YAP_COMPILER or "npx tsc")
pub fn compiler_command() -> (String, Vec<String>) {
    let line = env_opt(EnvVar::YapCompiler.as_str()).unwrap_or_else(|| DEFAULT_COMPILER.into());
    tracing::trace!(command = %line, "Compiler command");
    split_command(&line)
}

/// Log filter directive ($YAP_LOG, then $RUST_LOG, then "yap=warn")
pub fn log_filter() -> String {
    let filter = env_opt(EnvVar::YapLog.as_str())
        .or_else(|| env_opt(EnvVar::RustLog.as_str()))
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());
    tracing::trace!(filter = %filter, "Log filter");
    filter
}

/// Directory for ephemeral supervisor descriptors ($YAP_DESCRIPTOR_DIR or system temp dir)
pub fn descriptor_dir() -> PathBuf {
    let dir = env_opt(EnvVar::YapDescriptorDir.as_str())
        .map(PathBuf::from)
        .unwrap_or_else(std::env::temp_dir);
    tracing::trace!(dir = %dir.display(), "Descriptor directory");
    dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command() {
        let (program, args) = split_command("npx  pm2");
        assert_eq!(program, "npx");
        assert_eq!(args, vec!["pm2"]);

        let (program, args) = split_command("/usr/local/bin/tsc");
        assert_eq!(program, "/usr/local/bin/tsc");
        assert!(args.is_empty());
    }

    #[test]
    fn test_env_var_names() {
        assert_eq!(EnvVar::YapSupervisor.as_str(), "YAP_SUPERVISOR");
        assert_eq!(EnvVar::YapDescriptorDir.as_str(), "YAP_DESCRIPTOR_DIR");
    }
}
