mod args;
mod commands;

use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use yap::{clienv, out_error};

fn init_logging(verbose: bool) {
    let directive = if verbose {
        "yap=debug".to_string()
    } else {
        clienv::log_filter()
    };
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("yap=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Dev {
            services,
            all,
            env,
            no_watch,
            detach,
        } => commands::dev::cmd_dev(services, all, env, no_watch, detach).await,
        Commands::Build {
            services,
            out,
            no_clean,
            source_map,
        } => commands::build::cmd_build(services, out, no_clean, source_map).await,
        Commands::Start { services, all, env } => commands::start::cmd_start(services, all, env).await,
        Commands::Stop { services, all } => commands::stop::cmd_stop(services, all).await,
        Commands::Restart { services, all } => commands::stop::cmd_restart(services, all).await,
        Commands::Delete { services, all } => commands::stop::cmd_delete(services, all).await,
        Commands::Logs {
            service,
            lines,
            follow: _,
            no_follow,
            flush,
        } => commands::logs::cmd_logs(service, lines, !no_follow, flush).await,
        Commands::List => commands::list::cmd_list().await,
        Commands::Init => commands::init::cmd_init(),
        Commands::Completions { shell } => commands::completions::cmd_completions(shell),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    tracing::debug!(version = yap::VERSION, "yap starting");

    if let Err(e) = run(cli).await {
        out_error!("{:#}", e);
        std::process::exit(1);
    }
}
