//! Audio device enumeration.

use serde::{Deserialize, Serialize};

/// Which side of the audio graph a device sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Input,
    Output,
}

/// Metadata about an audio device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    /// Human-readable device name reported by the OS.
    pub name: String,
    pub kind: DeviceKind,
    /// Whether this is the system default device for its kind.
    pub is_default: bool,
}

/// Default device first, then alphabetical.
pub fn order_devices(mut devices: Vec<DeviceInfo>) -> Vec<DeviceInfo> {
    devices.sort_by_key(|d| (!d.is_default, d.name.to_ascii_lowercase()));
    devices
}

/// List all audio input devices on the system.
///
/// Returns an empty `Vec` if cpal is unavailable or no devices exist.
#[cfg(feature = "audio-cpal")]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());
    match host.input_devices() {
        Ok(devices) => order_devices(collect(devices, DeviceKind::Input, default_name)),
        Err(e) => {
            tracing::warn!("failed to enumerate input devices: {e}");
            Vec::new()
        }
    }
}

/// List all audio output devices on the system.
#[cfg(feature = "audio-cpal")]
pub fn list_output_devices() -> Vec<DeviceInfo> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_name = host.default_output_device().and_then(|d| d.name().ok());
    match host.output_devices() {
        Ok(devices) => order_devices(collect(devices, DeviceKind::Output, default_name)),
        Err(e) => {
            tracing::warn!("failed to enumerate output devices: {e}");
            Vec::new()
        }
    }
}

#[cfg(feature = "audio-cpal")]
fn collect(
    devices: impl Iterator<Item = cpal::Device>,
    kind: DeviceKind,
    default_name: Option<String>,
) -> Vec<DeviceInfo> {
    use cpal::traits::DeviceTrait;

    devices
        .enumerate()
        .map(|(idx, device)| {
            let name = device
                .name()
                .unwrap_or_else(|_| format!("Audio Device {}", idx + 1));
            let is_default = default_name.as_deref() == Some(name.as_str());
            DeviceInfo {
                name,
                kind,
                is_default,
            }
        })
        .collect()
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    Vec::new()
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_output_devices() -> Vec<DeviceInfo> {
    Vec::new()
}
