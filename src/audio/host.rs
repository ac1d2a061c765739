//! Audio backend handle
//!
//! Wraps the cpal host so it is created once at startup and passed by
//! reference, instead of being looked up ad hoc everywhere.

use cpal::traits::{DeviceTrait, HostTrait};
use cpal::{Device, Host, HostId};

use super::capture::CaptureError;

pub struct AudioHost {
    host: Host,
}

impl Default for AudioHost {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioHost {
    /// Open the platform's default audio host
    pub fn new() -> Self {
        let host = cpal::default_host();
        log::info!("Audio host: {}", host.id().name());
        Self { host }
    }

    /// Open a specific backend (e.g. ALSA vs JACK)
    pub fn with_id(id: HostId) -> Result<Self, CaptureError> {
        let host = cpal::host_from_id(id).map_err(|e| CaptureError::NoHost(e.to_string()))?;
        Ok(Self { host })
    }

    pub fn id(&self) -> HostId {
        self.host.id()
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Input device at `index` in enumeration order
    pub fn input_device(&self, index: usize) -> Result<Device, CaptureError> {
        self.host
            .input_devices()
            .map_err(|e| CaptureError::ConfigError(e.to_string()))?
            .nth(index)
            .ok_or(CaptureError::DeviceNotFound(index))
    }

    /// Enumeration index of the first input device called `name`
    pub fn input_device_index(&self, name: &str) -> Option<usize> {
        self.host
            .input_devices()
            .ok()?
            .position(|d| d.name().map(|n| n == name).unwrap_or(false))
    }

    pub fn default_input_device(&self) -> Option<Device> {
        self.host.default_input_device()
    }
}
