use yap::lifecycle::{foreground, DevOptions, ForegroundOutcome, LifecycleController, Teardown};
use yap::output::{self, theme};
use yap::{out_info, out_success, out_warn};

use super::{warn_skipped, workspace};

pub(crate) async fn cmd_dev(
    services: Vec<String>,
    all: bool,
    environment: String,
    no_watch: bool,
    detach: bool,
) -> anyhow::Result<()> {
    tracing::trace!(?services, all, env = %environment, no_watch, detach, "cmd_dev invoked");

    let (root, pm2) = workspace()?;
    let controller = LifecycleController::open(&root, &pm2)?;

    out_info!("Starting services in {} mode...", theme::brand(&environment));
    let launch = controller
        .dev(&DevOptions {
            names: services,
            all,
            environment,
            watch: !no_watch,
            cwd: std::env::current_dir()?,
        })
        .await?;

    if launch.defaulted {
        out_warn!(
            "No service specified, using first application: {}",
            theme::brand_bold(&launch.started[0])
        );
    }
    warn_skipped(&launch.skipped);
    for name in &launch.started {
        output::service_status(name, "started");
    }
    out_success!(
        "Started {} service(s) in {} mode",
        launch.started.len(),
        launch.environment
    );

    if detach {
        println!();
        out_info!("Services are running in the background");
        println!("  {}  follow logs", theme::muted("yap logs"));
        println!("  {}  stop everything", theme::muted("yap stop --all"));
        println!("  {}  show status", theme::muted("yap list"));
        return Ok(());
    }

    println!();
    out_info!("Streaming logs, press {} to stop", theme::bold("Ctrl+C"));

    let signals = foreground::listen_for_signals()?;
    let teardown = Teardown::new();
    match foreground::run(&pm2, &launch.started, signals, &teardown).await? {
        ForegroundOutcome::Interrupted { removed } => {
            for name in &removed {
                output::service_status(name, "deleted");
            }
            out_success!("Stopped {} service(s)", removed.len());
        }
        ForegroundOutcome::StreamEnded(code) => {
            tracing::debug!(?code, "Log stream ended");
            out_info!("Log stream ended; services are still running (yap stop --all to stop them)");
        }
    }

    Ok(())
}
