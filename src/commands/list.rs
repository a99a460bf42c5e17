use chrono::Utc;
use yap::lifecycle::LifecycleController;
use yap::output::{format_memory, format_uptime, theme, Spinner, Table};
use yap::supervisor::{Listing, ProcessInfo, ProcessState};
use yap::out_info;

use super::workspace;

pub(crate) async fn cmd_list() -> anyhow::Result<()> {
    tracing::trace!("cmd_list invoked");

    let (root, pm2) = workspace()?;
    let controller = LifecycleController::open(&root, &pm2)?;

    let spinner = Spinner::start("Querying supervisor...");
    let listing = controller.list().await;
    spinner.stop();

    match listing? {
        Listing::Fallback => {}
        Listing::Structured(list) if list.is_empty() => out_info!("No services running"),
        Listing::Structured(list) => println!("{}", render(&list, Utc::now().timestamp_millis())),
    }
    Ok(())
}

fn render(list: &[ProcessInfo], now_ms: i64) -> String {
    let mut table = Table::new([
        "id", "name", "mode", "status", "cpu", "memory", "uptime", "restarts", "watch",
    ]);

    for process in list {
        let status = match process.state {
            ProcessState::Running => theme::success(&process.status).to_string(),
            ProcessState::Errored => theme::error(&process.status).to_string(),
            ProcessState::Starting | ProcessState::Stopping => theme::warning(&process.status).to_string(),
            ProcessState::Unknown => theme::muted(&process.status).to_string(),
        };
        let uptime = match process.uptime_since {
            Some(since) if process.state.is_running() => format_uptime(now_ms - since),
            _ => "-".to_string(),
        };

        table.row(vec![
            process.pm_id.to_string(),
            theme::brand(&process.name).to_string(),
            process.exec_mode.clone(),
            status,
            format!("{}%", process.cpu),
            format_memory(process.memory),
            uptime,
            process.restarts.to_string(),
            if process.watch { "✔" } else { "✖" }.to_string(),
        ]);
    }

    table.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use yap::supervisor::parse_jlist;

    #[test]
    fn test_render_rows() {
        dialoguer::console::set_colors_enabled(false);
        let list = parse_jlist(
            r#"[{"pm_id": 3, "name": "api",
                 "pm2_env": {"status": "online", "exec_mode": "fork_mode", "pm_uptime": 1000, "restart_time": 1, "watch": true},
                 "monit": {"cpu": 0.5, "memory": 2048}}]"#,
        )
        .unwrap();

        let rendered = render(&list, 1000 + 90_000);
        let row = rendered.lines().nth(2).unwrap();
        for cell in ["3", "api", "fork", "online", "0.5%", "2.0kb", "1m", "✔"] {
            assert!(row.contains(cell), "missing {cell} in {row}");
        }
    }
}
