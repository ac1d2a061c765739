//! Audio capture and loudness analysis module

mod capture;
mod channels;
mod host;
mod loudness;
mod metrics;
mod sources;
mod window;

pub use capture::{AudioCaptureHandle, CaptureError};
pub use channels::{channel_configurations, ChannelConfiguration};
pub use host::AudioHost;
pub use loudness::{decode_pcm16_le, pcm16_rms, rms, to_loudness_db, LoudnessMeter};
pub use metrics::MetricsSnapshot;
pub use sources::{find_microphone_device, list_recording_devices, RecordingDevice, SourceError};
pub use window::SlidingWindow;
