//! Live Loudness Meter Library
//!
//! Captures microphone audio, converts each PCM16 chunk into a short-term
//! loudness estimate and publishes the derived metrics to subscribers.

pub mod audio;
pub mod config;
pub mod events;
pub mod presenter;
pub mod state;

use audio::{
    channel_configurations, find_microphone_device, list_recording_devices, AudioCaptureHandle,
    AudioHost, CaptureError,
};
use config::MeterConfig;
use events::MetricsPublisher;
use std::time::Duration;
use tokio::sync::mpsc;

/// Run a capture session until Ctrl-C
pub async fn run(config: MeterConfig) -> Result<(), Box<dyn std::error::Error>> {
    let host = AudioHost::new();

    for device in list_recording_devices(&host)? {
        log::info!("Recording device {}", device);
    }
    for layout in channel_configurations() {
        log::debug!("Channel layout: {} / {}", layout.group, layout.label);
    }

    // Resolve the device up front so a missing microphone is reported once
    let device = match config.device {
        Some(index) => index,
        None => find_microphone_device(&host)
            .map(|d| d.index)
            .ok_or(CaptureError::NoInputDevice)?,
    };

    let publisher = MetricsPublisher::new();
    let mut capture = AudioCaptureHandle::new(&host, Some(device), &config, publisher.clone())?;
    capture.start()?;
    log::info!("Metering device {}", capture.device_id());

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);
    let presenter = tokio::spawn(presenter::run_presenter(
        publisher,
        Duration::from_millis(config.refresh_interval_ms),
        config.output,
        shutdown_rx,
    ));

    let stopped =
        presenter::stop_presenter_on(tokio::signal::ctrl_c(), shutdown_tx, presenter).await;

    if let Err(e) = capture.stop() {
        log::warn!("Failed to stop capture cleanly: {}", e);
    }
    let status = capture.status();
    log::info!(
        "Session ended after {} chunks on {}",
        status.chunks_processed,
        status.device_name.as_deref().unwrap_or("unknown device")
    );
    capture.shutdown();

    stopped
}
