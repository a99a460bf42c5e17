//! Interactive foreground session: stream logs until interrupted, then tear
//! down every entry the session started.

use crate::error::Result;
use crate::supervisor::{LogHandle, LogQuery, SilentOutcome, Supervisor, Target};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Single-shot latch: only the first caller of [`Teardown::begin`] wins.
#[derive(Debug, Default)]
pub struct Teardown {
    started: AtomicBool,
}

impl Teardown {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> bool {
        !self.started.swap(true, Ordering::SeqCst)
    }

    pub fn has_begun(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForegroundOutcome {
    /// The log stream exited by itself; entries keep running.
    StreamEnded(Option<i32>),
    /// Interrupted; these entries were removed.
    Interrupted { removed: Vec<String> },
}

/// Forward SIGINT/SIGTERM into a channel. Every signal is forwarded; the
/// session decides what repeated signals mean.
pub fn listen_for_signals() -> std::io::Result<mpsc::Receiver<()>> {
    let (tx, rx) = mpsc::channel(8);

    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
    }

    #[cfg(not(unix))]
    {
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C");
                if tx.send(()).await.is_err() {
                    break;
                }
            }
        });
    }

    Ok(rx)
}

/// How long to wait for a signal after the log stream exits. A terminal
/// interrupt reaches the stream process and this one at about the same time.
const SIGNAL_GRACE: Duration = Duration::from_millis(300);

enum Event {
    StreamEnded(Result<Option<i32>>),
    Signal,
    SignalsClosed,
}

/// Attach to the logs of `names` and block until the stream ends or a
/// signal arrives on `signals`.
pub async fn run(
    supervisor: &dyn Supervisor,
    names: &[String],
    mut signals: mpsc::Receiver<()>,
    teardown: &Teardown,
) -> Result<ForegroundOutcome> {
    let target = match names {
        [single] => Target::name(single.clone()),
        _ => Target::All,
    };
    let mut stream = supervisor
        .open_logs(&LogQuery::new(target).lines(0).follow(true))
        .await?;

    let mut signals_open = true;
    loop {
        let event = if signals_open {
            tokio::select! {
                status = stream.wait() => Event::StreamEnded(status),
                received = signals.recv() => match received {
                    Some(()) => Event::Signal,
                    None => Event::SignalsClosed,
                },
            }
        } else {
            Event::StreamEnded(stream.wait().await)
        };

        match event {
            Event::SignalsClosed => signals_open = false,
            Event::StreamEnded(status) => {
                let interrupted = signals_open
                    && matches!(tokio::time::timeout(SIGNAL_GRACE, signals.recv()).await, Ok(Some(())));
                if !interrupted {
                    return Ok(ForegroundOutcome::StreamEnded(status?));
                }
                if let Some(outcome) = tear_down(supervisor, names, stream.as_mut(), teardown).await {
                    return Ok(outcome);
                }
                signals_open = false;
            }
            Event::Signal => {
                if let Some(outcome) = tear_down(supervisor, names, stream.as_mut(), teardown).await {
                    return Ok(outcome);
                }
            }
        }
    }
}

/// Stop the stream and delete every started entry, once.
async fn tear_down(
    supervisor: &dyn Supervisor,
    names: &[String],
    stream: &mut dyn LogHandle,
    teardown: &Teardown,
) -> Option<ForegroundOutcome> {
    if !teardown.begin() {
        debug!("Teardown already running, ignoring signal");
        return None;
    }

    info!("Stopping services...");
    stream.terminate().await;

    let mut removed = Vec::with_capacity(names.len());
    for name in names {
        if supervisor.delete_silent(name).await == SilentOutcome::Deleted {
            removed.push(name.clone());
        }
    }
    Some(ForegroundOutcome::Interrupted { removed })
}
