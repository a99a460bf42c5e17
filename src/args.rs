use clap::{Parser, Subcommand};
use std::path::PathBuf;
use clap_complete::Shell;

#[derive(Parser)]
#[command(name = "yap")]
#[command(version)]
#[command(about = "Build and run NestJS monorepo services", long_about = None)]
pub(crate) struct Cli {
    /// Show debug logs (same as YAP_LOG=yap=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run services from TypeScript sources with file watching
    Dev {
        /// Services to run (defaults to the app in the current directory)
        services: Vec<String>,

        /// Run every application
        #[arg(short, long)]
        all: bool,

        /// Environment name, selects .env.<env>
        #[arg(short, long, default_value = "development")]
        env: String,

        /// Disable restart on file changes
        #[arg(long)]
        no_watch: bool,

        /// Return after starting instead of streaming logs
        #[arg(short, long)]
        detach: bool,
    },

    /// Compile services into the build output directory
    Build {
        /// Services to build (defaults to every application)
        services: Vec<String>,

        /// Output directory (default: <root>/dist)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Keep the existing output directory
        #[arg(long)]
        no_clean: bool,

        /// Emit source maps
        #[arg(long)]
        source_map: bool,
    },

    /// Run compiled services
    Start {
        /// Services to start
        services: Vec<String>,

        /// Start every application
        #[arg(short, long)]
        all: bool,

        /// Environment name, selects .env.<env>
        #[arg(short, long, default_value = "production")]
        env: String,
    },

    /// Stop running services
    Stop {
        services: Vec<String>,

        /// Stop everything the supervisor tracks
        #[arg(short, long)]
        all: bool,
    },

    /// Restart running services
    Restart {
        services: Vec<String>,

        /// Restart everything the supervisor tracks
        #[arg(short, long)]
        all: bool,
    },

    /// Remove services from the supervisor
    #[command(alias = "rm")]
    Delete {
        services: Vec<String>,

        /// Remove everything the supervisor tracks
        #[arg(short, long)]
        all: bool,
    },

    /// Show service logs
    Logs {
        /// Service to show (all when omitted)
        service: Option<String>,

        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "100")]
        lines: u32,

        /// Keep streaming new lines (default)
        #[arg(short, long)]
        follow: bool,

        /// Print recent lines and exit
        #[arg(long, conflicts_with = "follow")]
        no_follow: bool,

        /// Delete log files instead of showing them
        #[arg(long)]
        flush: bool,
    },

    /// List supervised services
    #[command(alias = "ls")]
    List,

    /// Write yap.toml and .env starter files
    Init,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Option<Shell>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_ls_alias() {
        let cli = Cli::try_parse_from(["yap", "ls"]).unwrap();
        assert!(matches!(cli.command, Commands::List));
    }

    #[test]
    fn test_rm_alias() {
        let cli = Cli::try_parse_from(["yap", "rm", "--all"]).unwrap();
        assert!(matches!(cli.command, Commands::Delete { all: true, .. }));
    }

    #[test]
    fn test_dev_flags() {
        let cli = Cli::try_parse_from(["yap", "dev", "api", "--no-watch", "--env", "staging"]).unwrap();
        match cli.command {
            Commands::Dev {
                services,
                env,
                no_watch,
                detach,
                all,
            } => {
                assert_eq!(services, vec!["api"]);
                assert_eq!(env, "staging");
                assert!(no_watch);
                assert!(!detach);
                assert!(!all);
            }
            _ => panic!("expected dev"),
        }
    }

    #[test]
    fn test_logs_no_follow() {
        let cli = Cli::try_parse_from(["yap", "logs", "api", "--no-follow", "-n", "20"]).unwrap();
        match cli.command {
            Commands::Logs {
                service,
                lines,
                no_follow,
                ..
            } => {
                assert_eq!(service.as_deref(), Some("api"));
                assert_eq!(lines, 20);
                assert!(no_follow);
            }
            _ => panic!("expected logs"),
        }
    }
}
