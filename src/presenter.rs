//! Throttled metrics presenter
//!
//! Snapshots are published at the capture rate (hundreds per second); the
//! presenter samples the latest one on a fixed interval and prints it.

use crate::audio::MetricsSnapshot;
use crate::config::OutputMode;
use crate::events::MetricsPublisher;
use std::future::Future;
use std::io::{self, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Loudness shown as an empty bar
const BAR_FLOOR_DB: f64 = -60.0;

/// Width of the level bar in characters
const BAR_WIDTH: usize = 40;

/// Number of filled bar cells for a loudness value
pub fn bar_cells(loudness_db: f64) -> usize {
    if !loudness_db.is_finite() {
        return 0;
    }
    let fraction = ((loudness_db - BAR_FLOOR_DB) / -BAR_FLOOR_DB).clamp(0.0, 1.0);
    (fraction * BAR_WIDTH as f64).round() as usize
}

/// Render a snapshot as a one-line text meter
pub fn format_meter_line(snapshot: &MetricsSnapshot) -> String {
    let filled = bar_cells(snapshot.loudness);
    format!(
        "[{}{}] {:>7.1} dB | ST {:>7.1} | I {:>7.1} | LRA {:>7.1} | TP {:>7.1}",
        "#".repeat(filled),
        " ".repeat(BAR_WIDTH - filled),
        snapshot.loudness,
        snapshot.short_term_lufs,
        snapshot.integrated_lufs,
        snapshot.loudness_range,
        snapshot.true_peak_max,
    )
}

/// Render a snapshot for the given output mode
pub fn render(snapshot: &MetricsSnapshot, mode: OutputMode) -> String {
    match mode {
        OutputMode::Text => format_meter_line(snapshot),
        OutputMode::Json => serde_json::to_string(snapshot).unwrap_or_default(),
    }
}

fn write_line(line: &str, mode: OutputMode) -> io::Result<()> {
    let mut stdout = io::stdout().lock();
    match mode {
        OutputMode::Text => write!(stdout, "\r{}", line)?,
        OutputMode::Json => writeln!(stdout, "{}", line)?,
    }
    stdout.flush()
}

/// Print the latest snapshot every `interval` until shutdown is signalled
pub async fn run_presenter(
    publisher: MetricsPublisher,
    interval: Duration,
    mode: OutputMode,
    mut shutdown_rx: mpsc::Receiver<()>,
) {
    let mut ticker = tokio::time::interval(interval);
    let mut last_seen = 0u64;

    log::info!("Presenter started ({:?} every {:?})", mode, interval);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                log::info!("Presenter received shutdown signal");
                break;
            }
            _ = ticker.tick() => {
                // Skip ticks with nothing new (paused capture)
                let published = publisher.published_count();
                if published == last_seen {
                    continue;
                }
                last_seen = published;

                let Some(snapshot) = publisher.latest() else {
                    continue;
                };

                if let Err(e) = write_line(&render(&snapshot, mode), mode) {
                    log::error!("Failed to write meter output: {}", e);
                    break;
                }
            }
        }
    }

    if mode == OutputMode::Text {
        println!();
    }
    log::info!("Presenter stopped");
}

/// Wait for `signal`, then stop the presenter task.
///
/// The presenter is shut down and joined whether or not the signal future
/// fails; its error is returned afterwards.
pub async fn stop_presenter_on<S>(
    signal: S,
    shutdown_tx: mpsc::Sender<()>,
    presenter: JoinHandle<()>,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: Future<Output = io::Result<()>>,
{
    let signalled = signal.await;
    match &signalled {
        Ok(()) => log::info!("Interrupted, shutting down"),
        Err(e) => log::error!("Failed to wait for shutdown signal: {}", e),
    }

    let _ = shutdown_tx.send(()).await;
    presenter.await?;

    signalled?;
    Ok(())
}
