use yap::build::Tsc;
use yap::lifecycle::{BuildOptions, LifecycleController};
use yap::output::{self, theme};
use yap::{out_info, out_success};

use std::path::PathBuf;

use super::{warn_skipped, workspace};

pub(crate) async fn cmd_build(
    services: Vec<String>,
    out: Option<PathBuf>,
    no_clean: bool,
    source_map: bool,
) -> anyhow::Result<()> {
    tracing::trace!(?services, ?out, no_clean, source_map, "cmd_build invoked");

    let (root, pm2) = workspace()?;
    let controller = LifecycleController::open(&root, &pm2)?;
    let toolchain = Tsc::new();

    out_info!("Building services...");
    let outcome = controller
        .build(
            &toolchain,
            &BuildOptions {
                names: services,
                out_dir: out,
                clean: !no_clean,
                source_map,
            },
        )
        .await?;

    warn_skipped(&outcome.skipped);
    for built in &outcome.report.services {
        output::service_status(&built.name, "built");
        println!("    {}", theme::muted(built.entry.display()));
    }
    out_success!(
        "Built {} service(s) in {:.1}s into {}",
        outcome.report.services.len(),
        outcome.report.duration.as_secs_f64(),
        outcome.report.out_dir.display()
    );
    Ok(())
}
