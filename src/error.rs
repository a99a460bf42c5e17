use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum YapError {
    #[error("nest-cli.json not found at {}", path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("failed to parse {}: {reason}", path.display())]
    ManifestMalformed { path: PathBuf, reason: String },

    #[error("could not find nest-cli.json above {}; make sure you are in a NestJS monorepo", start.display())]
    ProjectRootNotFound { start: PathBuf },

    #[error("unknown services: {}", .0.join(", "))]
    UnknownService(Vec<String>),

    #[error("no valid application services specified (available: {0})")]
    NoTargets(String),

    #[error("compilation of {service} failed with exit code {}", display_code(*code))]
    CompileError { service: String, code: Option<i32> },

    #[error("build output not found for {service}, expected {}", expected.display())]
    BuildOutputMissing { service: String, expected: PathBuf },

    #[error("supervisor command `{command}` failed with exit code {}", display_code(*code))]
    SupervisorCommandFailed { command: String, code: Option<i32> },

    #[error("tsconfig inheritance cycle: {}", display_chain(chain))]
    ConfigInheritanceCycle { chain: Vec<PathBuf> },

    #[error("invalid config {}: {reason}", path.display())]
    AuthorConfig { path: PathBuf, reason: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn display_code(code: Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "none (terminated by signal)".to_string())
}

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub type Result<T> = std::result::Result<T, YapError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_service_lists_names() {
        let err = YapError::UnknownService(vec!["foo".into(), "bar".into()]);
        assert_eq!(err.to_string(), "unknown services: foo, bar");
    }

    #[test]
    fn test_signal_exit_has_no_code() {
        let err = YapError::SupervisorCommandFailed {
            command: "pm2 stop api".into(),
            code: None,
        };
        assert!(err.to_string().contains("terminated by signal"));
    }

    #[test]
    fn test_cycle_chain_is_rendered_in_order() {
        let err = YapError::ConfigInheritanceCycle {
            chain: vec![PathBuf::from("/a.json"), PathBuf::from("/b.json"), PathBuf::from("/a.json")],
        };
        assert_eq!(
            err.to_string(),
            "tsconfig inheritance cycle: /a.json -> /b.json -> /a.json"
        );
    }
}
