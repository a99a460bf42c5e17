use yap::lifecycle::{BatchReport, LifecycleController};
use yap::output::{self, Spinner};
use yap::out_warn;

use super::{warn_skipped, workspace};

pub(crate) async fn cmd_stop(services: Vec<String>, all: bool) -> anyhow::Result<()> {
    tracing::trace!(?services, all, "cmd_stop invoked");

    let (root, pm2) = workspace()?;
    let controller = LifecycleController::open(&root, &pm2)?;
    let spinner = Spinner::start("Stopping services...");
    let report = match controller.stop(&services, all).await {
        Ok(report) => report,
        Err(e) => {
            spinner.fail("Failed to stop services");
            return Err(e);
        }
    };

    render(spinner, &report, "stop", "stopped");
    Ok(())
}

pub(crate) async fn cmd_restart(services: Vec<String>, all: bool) -> anyhow::Result<()> {
    tracing::trace!(?services, all, "cmd_restart invoked");

    let (root, pm2) = workspace()?;
    let controller = LifecycleController::open(&root, &pm2)?;
    let spinner = Spinner::start("Restarting services...");
    let report = match controller.restart(&services, all).await {
        Ok(report) => report,
        Err(e) => {
            spinner.fail("Failed to restart services");
            return Err(e);
        }
    };

    render(spinner, &report, "restart", "restarted");
    Ok(())
}

pub(crate) async fn cmd_delete(services: Vec<String>, all: bool) -> anyhow::Result<()> {
    tracing::trace!(?services, all, "cmd_delete invoked");

    let (root, pm2) = workspace()?;
    let controller = LifecycleController::open(&root, &pm2)?;
    let spinner = Spinner::start("Deleting services...");
    let report = match controller.delete(&services, all).await {
        Ok(report) => report,
        Err(e) => {
            spinner.fail("Failed to delete services");
            return Err(e);
        }
    };

    render(spinner, &report, "delete", "deleted");
    Ok(())
}

fn render(spinner: Spinner, report: &BatchReport, action: &str, done: &str) {
    if report.all {
        spinner.succeed(format!("All services {done}"));
        return;
    }

    spinner.suspend(|| {
        warn_skipped(&report.skipped);
        for name in &report.succeeded {
            output::service_status(name, done);
        }
        for (name, reason) in &report.failed {
            out_warn!("Failed to {} {} (may not be running): {}", action, name, reason);
        }
    });

    if report.success_count() == 0 && !report.failed.is_empty() {
        spinner.warn(format!("No services {done}"));
    } else {
        spinner.succeed(format!("{} service(s) {}", report.success_count(), done));
    }
}
