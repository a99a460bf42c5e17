use yap::manifest::Manifest;
use yap::output::{theme, Spinner};
use yap::scaffold;
use yap::{out_info, out_warn};

use super::workspace;

pub(crate) fn cmd_init() -> anyhow::Result<()> {
    tracing::trace!("cmd_init invoked");

    let (root, _) = workspace()?;
    let spinner = Spinner::start("Initializing yap configuration...");
    let report = Manifest::load(&root)
        .map_err(anyhow::Error::from)
        .and_then(|manifest| Ok(scaffold::init(&root, &manifest)?));

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            spinner.fail("Initialization failed");
            return Err(e);
        }
    };

    for name in &report.skipped {
        spinner.suspend(|| out_warn!("{} already exists, skipping", name));
    }
    if report.created.is_empty() {
        spinner.succeed("Nothing to do");
    } else {
        spinner.succeed("Initialized yap configuration");
        for name in &report.created {
            println!("  {} {}", theme::success("+"), name);
        }
    }
    if report.gitignore_updated {
        out_info!("Updated .gitignore");
    }
    Ok(())
}
