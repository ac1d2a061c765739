//! Audio capture implementation using a dedicated thread

use super::host::AudioHost;
use super::loudness::LoudnessMeter;
use crate::config::MeterConfig;
use crate::events::MetricsPublisher;
use crate::state::SessionStatus;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, HostId, SampleFormat, StreamConfig, SupportedStreamConfig};
use parking_lot::Mutex;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Audio capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("No audio host available: {0}")]
    NoHost(String),

    #[error("No input device found")]
    NoInputDevice,

    #[error("Input device {0} not found")]
    DeviceNotFound(usize),

    #[error("Failed to get device config: {0}")]
    ConfigError(String),

    #[error("Failed to build audio stream: {0}")]
    StreamError(String),

    #[error("Failed to start stream: {0}")]
    PlayError(String),

    #[error("Failed to pause stream: {0}")]
    PauseError(String),

    #[error("Thread error: {0}")]
    ThreadError(String),
}

type Reply = mpsc::Sender<Result<(), CaptureError>>;

/// Commands sent to the audio thread
enum AudioCommand {
    Start(Reply),
    Stop(Reply),
    Shutdown,
}

/// What the audio thread opened, reported once the stream exists
#[derive(Debug, Clone)]
struct StreamInfo {
    device_index: usize,
    device_name: String,
    sample_rate: u32,
    channels: u16,
}

/// Audio capture handle (Send + Sync safe)
///
/// The cpal stream lives on a dedicated thread; this handle only holds the
/// command channel and the state shared with the stream callback.
pub struct AudioCaptureHandle {
    /// Command sender to control the audio thread
    command_tx: mpsc::Sender<AudioCommand>,

    /// Handle to the audio thread
    thread_handle: Option<JoinHandle<()>>,

    /// Meter shared with the stream callback
    meter: Arc<Mutex<LoudnessMeter>>,

    publisher: MetricsPublisher,

    status: Arc<Mutex<SessionStatus>>,

    device_id: usize,
}

impl AudioCaptureHandle {
    /// Open a capture session on `device` (default microphone when `None`).
    ///
    /// The stream is created paused; call [`start`](Self::start) to begin
    /// metering. Device failures surface here, once.
    pub fn new(
        host: &AudioHost,
        device: Option<usize>,
        config: &MeterConfig,
        publisher: MetricsPublisher,
    ) -> Result<Self, CaptureError> {
        let (command_tx, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();

        let meter = Arc::new(Mutex::new(LoudnessMeter::new(config)));
        let status = Arc::new(Mutex::new(SessionStatus::default()));

        let host_id = host.id();
        let config_clone = config.clone();
        let meter_clone = meter.clone();
        let publisher_clone = publisher.clone();

        let thread_handle = thread::Builder::new()
            .name("audio-capture".to_string())
            .spawn(move || {
                run_audio_thread(
                    host_id,
                    device,
                    config_clone,
                    meter_clone,
                    publisher_clone,
                    command_rx,
                    ready_tx,
                );
            })
            .map_err(|e| CaptureError::ThreadError(e.to_string()))?;

        let info = match ready_rx.recv() {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                let _ = thread_handle.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread_handle.join();
                return Err(CaptureError::ThreadError(
                    "audio thread exited before opening a stream".to_string(),
                ));
            }
        };

        log::info!(
            "Capture session ready: device {} ({}), {} Hz, {} channels",
            info.device_index,
            info.device_name,
            info.sample_rate,
            info.channels
        );

        {
            let mut s = status.lock();
            s.device_index = Some(info.device_index);
            s.device_name = Some(info.device_name.clone());
            s.sample_rate = info.sample_rate;
            s.channels = info.channels;
        }

        Ok(Self {
            command_tx,
            thread_handle: Some(thread_handle),
            meter,
            publisher,
            status,
            device_id: info.device_index,
        })
    }

    /// Begin (or restart) metering. Windows are cleared first.
    pub fn start(&self) -> Result<(), CaptureError> {
        self.request(AudioCommand::Start)?;
        let mut s = self.status.lock();
        s.capturing = true;
        s.error = None;
        Ok(())
    }

    /// Pause the device feed. Metrics stay at their last values.
    pub fn stop(&self) -> Result<(), CaptureError> {
        self.request(AudioCommand::Stop)?;
        self.status.lock().capturing = false;
        Ok(())
    }

    /// Selected device index in the host's input device list
    pub fn device_id(&self) -> usize {
        self.device_id
    }

    pub fn publisher(&self) -> &MetricsPublisher {
        &self.publisher
    }

    /// Current session status
    pub fn status(&self) -> SessionStatus {
        let mut status = self.status.lock().clone();
        status.chunks_processed = self.meter.lock().chunks_processed();
        status
    }

    /// Stop the audio thread and release the device
    pub fn shutdown(&mut self) {
        let _ = self.command_tx.send(AudioCommand::Shutdown);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            self.status.lock().capturing = false;
            log::info!("Audio capture shut down");
        }
    }

    fn request(&self, make: fn(Reply) -> AudioCommand) -> Result<(), CaptureError> {
        let (reply_tx, reply_rx) = mpsc::channel();
        self.command_tx
            .send(make(reply_tx))
            .map_err(|_| CaptureError::ThreadError("audio thread is not running".to_string()))?;

        let result = reply_rx
            .recv()
            .map_err(|_| CaptureError::ThreadError("audio thread did not reply".to_string()))?;

        if let Err(ref e) = result {
            self.status.lock().error = Some(e.to_string());
        }
        result
    }
}

impl Drop for AudioCaptureHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Run the audio capture in a dedicated thread
fn run_audio_thread(
    host_id: HostId,
    device_index: Option<usize>,
    config: MeterConfig,
    meter: Arc<Mutex<LoudnessMeter>>,
    publisher: MetricsPublisher,
    command_rx: mpsc::Receiver<AudioCommand>,
    ready_tx: mpsc::Sender<Result<StreamInfo, CaptureError>>,
) {
    let opened = open_stream(
        host_id,
        device_index,
        &config,
        meter.clone(),
        publisher.clone(),
    );
    let (stream, info) = match opened {
        Ok(opened) => opened,
        Err(e) => {
            log::error!("Audio capture failed to open: {}", e);
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if ready_tx.send(Ok(info)).is_err() {
        return;
    }

    // Block on commands; the stream callback does the metering
    loop {
        match command_rx.recv() {
            Ok(AudioCommand::Start(reply)) => {
                meter.lock().reset();
                publisher.clear_latest();
                let result = stream
                    .play()
                    .map_err(|e| CaptureError::PlayError(e.to_string()));
                if result.is_ok() {
                    log::info!("Audio capture started");
                }
                let _ = reply.send(result);
            }
            Ok(AudioCommand::Stop(reply)) => {
                let result = stream
                    .pause()
                    .map_err(|e| CaptureError::PauseError(e.to_string()));
                if result.is_ok() {
                    log::info!("Audio capture stopped");
                }
                let _ = reply.send(result);
            }
            Ok(AudioCommand::Shutdown) => {
                log::info!("Audio capture stopping");
                break;
            }
            Err(_) => {
                log::info!("Audio capture channel disconnected");
                break;
            }
        }
    }
}

/// Resolve the device, negotiate a config and build a paused input stream
fn open_stream(
    host_id: HostId,
    device_index: Option<usize>,
    config: &MeterConfig,
    meter: Arc<Mutex<LoudnessMeter>>,
    publisher: MetricsPublisher,
) -> Result<(cpal::Stream, StreamInfo), CaptureError> {
    let host = AudioHost::with_id(host_id)?;
    let (index, device) = resolve_device(&host, device_index)?;
    let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());

    let supported = negotiate_config(&device, config)?;
    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let sample_format = supported.sample_format();
    let stream_config: StreamConfig = supported.into();

    log::debug!(
        "Stream config for {}: {:?}, {} Hz, {} channels",
        device_name,
        sample_format,
        sample_rate,
        channels
    );

    let stream = match sample_format {
        SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, meter, publisher),
        SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, meter, publisher),
        SampleFormat::I32 => build_stream::<i32>(&device, &stream_config, meter, publisher),
        SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, meter, publisher),
        SampleFormat::F64 => build_stream::<f64>(&device, &stream_config, meter, publisher),
        other => {
            return Err(CaptureError::ConfigError(format!(
                "Unsupported sample format: {:?}",
                other
            )))
        }
    }
    .map_err(|e| CaptureError::StreamError(e.to_string()))?;

    // Streams may start running on build; keep it paused until start()
    if let Err(e) = stream.pause() {
        log::warn!("Could not pause new stream: {}", e);
    }

    Ok((
        stream,
        StreamInfo {
            device_index: index,
            device_name,
            sample_rate,
            channels,
        },
    ))
}

fn resolve_device(host: &AudioHost, index: Option<usize>) -> Result<(usize, Device), CaptureError> {
    match index {
        Some(i) => Ok((i, host.input_device(i)?)),
        None => {
            let device = host
                .host()
                .default_input_device()
                .ok_or(CaptureError::NoInputDevice)?;
            let name = device.name().unwrap_or_default();
            let i = default_device_index(&name, host.input_device_index(&name))?;
            Ok((i, device))
        }
    }
}

/// Index reported for the default input device.
///
/// A default device missing from enumeration has no trustworthy index.
fn default_device_index(name: &str, position: Option<usize>) -> Result<usize, CaptureError> {
    position.ok_or_else(|| {
        log::warn!("Default input device {:?} is not in the input device list", name);
        CaptureError::NoInputDevice
    })
}

/// Prefer an I16 config at the requested rate and channel count, then any
/// format at that rate, then the device default.
fn negotiate_config(device: &Device, config: &MeterConfig) -> Result<SupportedStreamConfig, CaptureError> {
    let ranges: Vec<_> = device
        .supported_input_configs()
        .map(|configs| configs.collect())
        .unwrap_or_default();

    let matches_request = |r: &&cpal::SupportedStreamConfigRange| {
        r.channels() == config.channels
            && r.min_sample_rate().0 <= config.sample_rate
            && r.max_sample_rate().0 >= config.sample_rate
    };

    let preferred = ranges
        .iter()
        .filter(matches_request)
        .find(|r| r.sample_format() == SampleFormat::I16)
        .or_else(|| ranges.iter().find(matches_request));

    if let Some(range) = preferred {
        return Ok(range.clone().with_sample_rate(cpal::SampleRate(config.sample_rate)));
    }

    log::warn!(
        "Device does not support {} Hz / {} channels, using its default config",
        config.sample_rate,
        config.channels
    );
    device
        .default_input_config()
        .map_err(|e| CaptureError::ConfigError(e.to_string()))
}

/// Convert device samples into PCM16 little-endian bytes.
///
/// `bytes` is reused between callbacks; its allocation only ever grows.
pub(crate) fn write_pcm16_le<T>(data: &[T], bytes: &mut Vec<u8>)
where
    T: cpal::Sample,
    i16: cpal::FromSample<T>,
{
    bytes.clear();
    bytes.reserve(data.len() * 2);
    for &sample in data {
        let value: i16 = cpal::Sample::from_sample(sample);
        bytes.extend_from_slice(&value.to_le_bytes());
    }
}

/// Build audio stream for given sample type
fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    meter: Arc<Mutex<LoudnessMeter>>,
    publisher: MetricsPublisher,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::Sample + cpal::SizedSample,
    i16: cpal::FromSample<T>,
{
    let sample_rate = config.sample_rate.0;
    let mut bytes: Vec<u8> = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            write_pcm16_le(data, &mut bytes);

            // Release the meter before notifying subscribers
            let snapshot = meter.lock().process_chunk(&bytes, sample_rate);
            publisher.publish(snapshot);
        },
        |err| {
            log::error!("Audio stream error: {}", err);
        },
        None,
    )
}

#[cfg(test)]
mod tests {
    use super::{default_device_index, write_pcm16_le, CaptureError};

    #[test]
    fn default_device_index_uses_enumeration_position() {
        assert_eq!(default_device_index("Built-in Microphone", Some(2)).unwrap(), 2);
    }

    #[test]
    fn unlisted_default_device_is_not_reported_as_device_zero() {
        let err = default_device_index("Ghost Mic", None).unwrap_err();
        assert!(matches!(err, CaptureError::NoInputDevice));
    }

    #[test]
    fn f32_samples_convert_to_pcm16_bytes() {
        let mut bytes = Vec::new();
        write_pcm16_le(&[0.0f32, 0.5, -1.0], &mut bytes);

        assert_eq!(bytes.len(), 6);
        assert_eq!(i16::from_le_bytes([bytes[0], bytes[1]]), 0);
        assert_eq!(i16::from_le_bytes([bytes[2], bytes[3]]), 16384);
        assert_eq!(i16::from_le_bytes([bytes[4], bytes[5]]), i16::MIN);
    }

    #[test]
    fn i16_samples_pass_through() {
        let mut bytes = Vec::new();
        write_pcm16_le(&[1234i16, -42], &mut bytes);

        assert_eq!(bytes, [1234i16.to_le_bytes(), (-42i16).to_le_bytes()].concat());
    }

    #[test]
    fn byte_buffer_is_reused_between_chunks() {
        let mut bytes = Vec::new();
        write_pcm16_le(&[0i16; 256], &mut bytes);
        let capacity = bytes.capacity();

        write_pcm16_le(&[1i16; 4], &mut bytes);

        assert_eq!(bytes.len(), 8);
        assert!(bytes.capacity() >= capacity);
    }
}
