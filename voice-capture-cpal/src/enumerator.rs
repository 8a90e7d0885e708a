//! Input device enumeration over the default cpal host.

use cpal::traits::{DeviceTrait, HostTrait};

use voice_capture_core::{CaptureError, InputDevice};

/// List available audio input devices.
///
/// An empty list is a valid result (no microphone attached); only a
/// failure to talk to the audio host is an error. Devices that refuse
/// to report a name or configuration are still listed with fallbacks
/// rather than skipped.
pub fn enumerate_input_devices() -> Result<Vec<InputDevice>, CaptureError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| CaptureError::DeviceOpenError(e.to_string()))?;

    let mut out = Vec::new();
    for (index, device) in devices.enumerate() {
        let name = device.name().unwrap_or_else(|_| format!("input {}", index));
        let default_config = device.default_input_config().ok();

        let max_channels = device
            .supported_input_configs()
            .ok()
            .and_then(|configs| configs.map(|c| c.channels()).max())
            .or_else(|| default_config.as_ref().map(|c| c.channels()))
            .unwrap_or(1);
        let default_sample_rate = default_config
            .map(|c| c.sample_rate().0)
            .unwrap_or(44100);

        out.push(InputDevice {
            index,
            name,
            max_channels,
            default_sample_rate,
        });
    }

    Ok(out)
}
