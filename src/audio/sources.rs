//! Recording device enumeration

use super::host::AudioHost;
use cpal::traits::{DeviceTrait, HostTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Recording device information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingDevice {
    /// Position in the host's input device list
    pub index: usize,

    /// Display name
    pub name: String,

    /// Whether this is the system default input
    pub is_default: bool,
}

impl std::fmt::Display for RecordingDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.index, self.name)?;
        if self.is_default {
            write!(f, " (default)")?;
        }
        Ok(())
    }
}

/// Audio source errors
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to enumerate devices: {0}")]
    EnumerationError(String),
}

/// List available recording devices
pub fn list_recording_devices(host: &AudioHost) -> Result<Vec<RecordingDevice>, SourceError> {
    let default_name = host
        .default_input_device()
        .and_then(|d| d.name().ok());

    let devices = host
        .host()
        .input_devices()
        .map_err(|e| SourceError::EnumerationError(e.to_string()))?;

    let mut sources = Vec::new();
    for (index, device) in devices.enumerate() {
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        sources.push(RecordingDevice {
            is_default: default_name.as_deref() == Some(name.as_str()),
            index,
            name,
        });
    }

    Ok(sources)
}

/// Pick the microphone to capture from.
///
/// `None` means no usable input device exists.
pub fn find_microphone_device(host: &AudioHost) -> Option<RecordingDevice> {
    let devices = match list_recording_devices(host) {
        Ok(devices) => devices,
        Err(e) => {
            log::warn!("Failed to enumerate recording devices: {}", e);
            return None;
        }
    };

    let chosen = select_microphone(devices);
    match &chosen {
        Some(device) => log::info!("Selected recording device {}", device),
        None => log::warn!("No recording device found"),
    }
    chosen
}

/// Default device first, otherwise the first enumerated one
fn select_microphone(devices: Vec<RecordingDevice>) -> Option<RecordingDevice> {
    if let Some(default) = devices.iter().find(|d| d.is_default) {
        return Some(default.clone());
    }
    devices.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(index: usize, name: &str, is_default: bool) -> RecordingDevice {
        RecordingDevice {
            index,
            name: name.to_string(),
            is_default,
        }
    }

    #[test]
    fn select_prefers_default_device() {
        let devices = vec![
            device(0, "Line In", false),
            device(1, "Built-in Microphone", true),
        ];

        let chosen = select_microphone(devices).unwrap();
        assert_eq!(chosen.index, 1);
    }

    #[test]
    fn select_falls_back_to_first_device() {
        let devices = vec![device(0, "USB Mic", false), device(1, "Line In", false)];

        assert_eq!(select_microphone(devices).unwrap().name, "USB Mic");
    }

    #[test]
    fn select_without_devices_is_none() {
        assert!(select_microphone(Vec::new()).is_none());
    }

    #[test]
    fn display_marks_default() {
        assert_eq!(device(2, "Mic", true).to_string(), "2: Mic (default)");
        assert_eq!(device(0, "Line", false).to_string(), "0: Line");
    }
}
