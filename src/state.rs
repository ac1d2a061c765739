//! Capture session status

use serde::{Deserialize, Serialize};

/// Read-only view of a capture session
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SessionStatus {
    pub capturing: bool,

    /// Selected device index, `None` before a device is opened
    pub device_index: Option<usize>,
    pub device_name: Option<String>,

    /// Negotiated stream format
    pub sample_rate: u32,
    pub channels: u16,

    /// Chunks metered since the last start
    pub chunks_processed: u64,

    /// Last control error reported by the audio thread
    pub error: Option<String>,
}
