use yap::lifecycle::LifecycleController;
use yap::output::{theme, Spinner};
use yap::out_info;

use super::workspace;

pub(crate) async fn cmd_logs(service: Option<String>, lines: u32, follow: bool, flush: bool) -> anyhow::Result<()> {
    tracing::trace!(?service, lines, follow, flush, "cmd_logs invoked");

    let (root, pm2) = workspace()?;
    let controller = LifecycleController::open(&root, &pm2)?;

    if flush {
        let spinner = Spinner::start("Deleting log files...");
        let deleted = controller.flush_logs(service.as_deref()).await?;
        if deleted == 0 {
            spinner.stop();
            out_info!("No log files to delete");
        } else {
            let scope = service
                .as_deref()
                .map(|s| format!(" for {}", theme::brand(s)))
                .unwrap_or_default();
            spinner.succeed(format!("Deleted {deleted} log file(s){scope}"));
        }
        return Ok(());
    }

    controller.logs(service.as_deref(), lines, follow).await
}
