use yap::lifecycle::{LifecycleController, StartOptions};
use yap::output::{self, theme};
use yap::{out_info, out_success};

use super::{warn_skipped, workspace};

pub(crate) async fn cmd_start(services: Vec<String>, all: bool, environment: String) -> anyhow::Result<()> {
    tracing::trace!(?services, all, env = %environment, "cmd_start invoked");

    let (root, pm2) = workspace()?;
    let controller = LifecycleController::open(&root, &pm2)?;

    out_info!("Starting services in {} mode...", theme::brand(&environment));
    let launch = controller
        .start(&StartOptions {
            names: services,
            all,
            environment,
        })
        .await?;

    warn_skipped(&launch.skipped);
    for name in &launch.started {
        output::service_status(name, "started");
    }
    out_success!(
        "Started {} service(s) in {} mode",
        launch.started.len(),
        launch.environment
    );
    Ok(())
}
