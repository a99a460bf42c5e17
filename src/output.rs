//! Console output: status lines, spinners and tables.
//!
//! Diagnostics go through `tracing`; this module is for what the user asked
//! to see.

use dialoguer::console::{measure_text_width, pad_str, style, Alignment, StyledObject};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub mod theme {
    use super::*;

    pub fn brand<D>(text: D) -> StyledObject<D> {
        style(text).cyan()
    }

    pub fn brand_bold<D>(text: D) -> StyledObject<D> {
        style(text).cyan().bold()
    }

    pub fn success<D>(text: D) -> StyledObject<D> {
        style(text).green()
    }

    pub fn warning<D>(text: D) -> StyledObject<D> {
        style(text).yellow()
    }

    pub fn error<D>(text: D) -> StyledObject<D> {
        style(text).red()
    }

    pub fn muted<D>(text: D) -> StyledObject<D> {
        style(text).dim()
    }

    pub fn bold<D>(text: D) -> StyledObject<D> {
        style(text).bold()
    }
}

#[macro_export]
macro_rules! out_info {
    ($($arg:tt)*) => {
        println!("{} {}", $crate::output::theme::brand("ℹ"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! out_success {
    ($($arg:tt)*) => {
        println!("{} {}", $crate::output::theme::success("✔"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! out_warn {
    ($($arg:tt)*) => {
        eprintln!("{} {}", $crate::output::theme::warning("⚠"), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! out_error {
    ($($arg:tt)*) => {
        eprintln!("{} {}", $crate::output::theme::error("✖"), format!($($arg)*))
    };
}

/// `[name] status`, colored by status.
pub fn service_status(name: &str, status: &str) {
    let colored = match status {
        "started" | "running" | "online" | "restarted" => theme::success(status).to_string(),
        "stopped" | "deleted" => theme::warning(status).to_string(),
        "errored" | "failed" => theme::error(status).to_string(),
        _ => status.to_string(),
    };
    println!("  {} {}", theme::brand_bold(format!("[{name}]")), colored);
}

/// Spinner shown while a blocking step runs.
pub struct Spinner {
    bar: ProgressBar,
}

impl Spinner {
    pub fn start(message: &str) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar }
    }

    /// Clear the spinner so child output is not interleaved with it.
    pub fn suspend<F: FnOnce() -> R, R>(&self, f: F) -> R {
        self.bar.suspend(f)
    }

    pub fn succeed(self, message: impl AsRef<str>) {
        self.bar.finish_and_clear();
        out_success!("{}", message.as_ref());
    }

    pub fn warn(self, message: impl AsRef<str>) {
        self.bar.finish_and_clear();
        out_warn!("{}", message.as_ref());
    }

    pub fn fail(self, message: impl AsRef<str>) {
        self.bar.finish_and_clear();
        out_error!("{}", message.as_ref());
    }

    pub fn stop(self) {
        self.bar.finish_and_clear();
    }
}

/// Plain column table; cells may carry ANSI styling.
#[derive(Debug, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| measure_text_width(h)).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate().take(widths.len()) {
                widths[i] = widths[i].max(measure_text_width(cell));
            }
        }

        let line = |cells: &[String]| {
            cells
                .iter()
                .zip(&widths)
                .map(|(cell, width)| pad_str(cell, *width, Alignment::Left, None).into_owned())
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let header = line(&self.headers);
        let rule = widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("  ");
        let mut out = vec![theme::bold(header).to_string(), theme::muted(rule).to_string()];
        out.extend(self.rows.iter().map(|row| line(row)));
        out.join("\n")
    }
}

/// Compact duration: `45s`, `12m`, `3h`, `2d`.
pub fn format_uptime(ms: i64) -> String {
    let seconds = ms.max(0) / 1000;
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{days}d")
    } else if hours > 0 {
        format!("{hours}h")
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}

pub fn format_memory(bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let b = bytes as f64;
    if b < KB {
        format!("{bytes}b")
    } else if b < KB * KB {
        format!("{:.1}kb", b / KB)
    } else if b < KB * KB * KB {
        format!("{:.1}mb", b / (KB * KB))
    } else {
        format!("{:.1}gb", b / (KB * KB * KB))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uptime() {
        assert_eq!(format_uptime(0), "0s");
        assert_eq!(format_uptime(45_000), "45s");
        assert_eq!(format_uptime(12 * 60_000), "12m");
        assert_eq!(format_uptime(3 * 3_600_000 + 59_000), "3h");
        assert_eq!(format_uptime(2 * 86_400_000), "2d");
        assert_eq!(format_uptime(-5), "0s");
    }

    #[test]
    fn test_format_memory() {
        assert_eq!(format_memory(512), "512b");
        assert_eq!(format_memory(2048), "2.0kb");
        assert_eq!(format_memory(52_428_800), "50.0mb");
        assert_eq!(format_memory(3 * 1024 * 1024 * 1024), "3.0gb");
    }

    #[test]
    fn test_table_aligns_columns() {
        dialoguer::console::set_colors_enabled(false);
        let mut table = Table::new(["id", "name"]);
        table.row(vec!["0".into(), "api".into()]);
        table.row(vec!["12".into(), "worker".into()]);

        let rendered = table.render();
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "id  name");
        assert_eq!(lines[2], "0   api");
        assert_eq!(lines[3], "12  worker");
    }
}
