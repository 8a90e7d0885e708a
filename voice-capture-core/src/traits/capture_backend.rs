use crate::models::error::CaptureError;
use crate::models::settings::CaptureSettings;

/// Descriptor for an available audio input device.
#[derive(Debug, Clone, PartialEq)]
pub struct InputDevice {
    pub index: usize,
    pub name: String,
    pub max_channels: u16,
    pub default_sample_rate: u32,
}

/// Interface for audio capture backends.
///
/// The session state machine is written once against this seam; device
/// libraries (cpal) and test doubles implement it.
pub trait CaptureBackend: Send {
    /// List available input devices. An empty list is a valid result
    /// (no error); the session turns it into `NoDeviceFound` on start.
    fn list_input_devices(&self) -> Result<Vec<InputDevice>, CaptureError>;

    /// Open an input stream with the given settings.
    ///
    /// Device selection, format negotiation, and any handshake with the
    /// driver happen here; failures surface as `NoDeviceFound` or
    /// `DeviceOpenError` before a stream handle is returned.
    fn open(&mut self, settings: &CaptureSettings) -> Result<Box<dyn CaptureStream>, CaptureError>;
}

/// An open capture stream, read one block at a time.
///
/// `read_block` must be bounded in time: when no data is ready within
/// the backend's wait quantum it returns an empty block so the capture
/// loop can re-check its stop flag.
pub trait CaptureStream: Send {
    /// Read one block of raw little-endian samples in the configured
    /// sample format. An empty block means "nothing ready yet", not end
    /// of stream.
    fn read_block(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// Stop the stream and release device resources. Idempotent.
    fn close(&mut self);
}
