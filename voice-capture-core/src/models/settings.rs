use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::error::CaptureError;

/// Sample rates accepted by [`CaptureSettings::validate`].
pub const ALLOWED_SAMPLE_RATES: [u32; 6] = [8000, 16000, 22050, 44100, 48000, 96000];

/// Chunk sizes (frames per block) accepted by [`CaptureSettings::validate`].
pub const ALLOWED_CHUNK_SIZES: [u32; 5] = [256, 512, 1024, 2048, 4096];

/// In-memory representation of captured samples.
///
/// The container width follows the format: `Int16` is written as 16-bit
/// PCM, everything else as 32-bit PCM. Floating-point captures are
/// clamped to [-1, 1] and scaled by `i32::MAX` at encode time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Int16,
    Int32,
    Float32,
    Float64,
}

impl SampleFormat {
    /// Bytes per sample as delivered by the capture backend.
    pub fn capture_width(&self) -> usize {
        match self {
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 => 4,
            Self::Float64 => 8,
        }
    }

    /// Bytes per sample in the output WAV container.
    pub fn container_width(&self) -> u16 {
        match self {
            Self::Int16 => 2,
            Self::Int32 | Self::Float32 | Self::Float64 => 4,
        }
    }

    /// Bit depth written to the WAV `fmt ` chunk.
    pub fn bit_depth(&self) -> u16 {
        self.container_width() * 8
    }
}

/// Validated recording configuration.
///
/// Construction is the only validation point: [`CaptureSettings::new`]
/// and [`CaptureSettings::update`] reject out-of-range values with
/// [`CaptureError::InvalidConfiguration`] before any device is touched.
/// Immutable while a capture session is running.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// Sample rate in Hz. Must be one of [`ALLOWED_SAMPLE_RATES`].
    pub sample_rate: u32,

    /// Channel count: 1 (mono) or 2 (stereo).
    pub channels: u16,

    /// Sample representation delivered by the backend.
    pub sample_format: SampleFormat,

    /// Frames per block read in one I/O operation. One of [`ALLOWED_CHUNK_SIZES`].
    pub chunk_size: u32,

    /// Input device name, or `None` for the system default.
    pub device: Option<String>,

    /// Directory where recordings are written (created on save if absent).
    pub output_directory: PathBuf,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            sample_format: SampleFormat::Int16,
            chunk_size: 1024,
            device: None,
            output_directory: PathBuf::from("recordings"),
        }
    }
}

impl CaptureSettings {
    /// Build validated settings. Fails fast on any out-of-range value.
    pub fn new(
        sample_rate: u32,
        channels: u16,
        sample_format: SampleFormat,
        chunk_size: u32,
    ) -> Result<Self, CaptureError> {
        let settings = Self {
            sample_rate,
            channels,
            sample_format,
            chunk_size,
            ..Self::default()
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub fn with_output_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_directory = dir.into();
        self
    }

    pub fn validate(&self) -> Result<(), CaptureError> {
        if !ALLOWED_SAMPLE_RATES.contains(&self.sample_rate) {
            return Err(CaptureError::InvalidConfiguration(format!(
                "unsupported sample rate: {}",
                self.sample_rate
            )));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(CaptureError::InvalidConfiguration(format!(
                "unsupported channel count: {}",
                self.channels
            )));
        }
        if !ALLOWED_CHUNK_SIZES.contains(&self.chunk_size) {
            return Err(CaptureError::InvalidConfiguration(format!(
                "unsupported chunk size: {}",
                self.chunk_size
            )));
        }
        Ok(())
    }

    /// Build a replacement configuration with the given fields changed.
    ///
    /// Never mutates in place; the result is validated as a whole so a
    /// partial update cannot produce an invalid combination.
    pub fn update(&self, update: SettingsUpdate) -> Result<Self, CaptureError> {
        let next = Self {
            sample_rate: update.sample_rate.unwrap_or(self.sample_rate),
            channels: update.channels.unwrap_or(self.channels),
            sample_format: update.sample_format.unwrap_or(self.sample_format),
            chunk_size: update.chunk_size.unwrap_or(self.chunk_size),
            device: update.device.unwrap_or_else(|| self.device.clone()),
            output_directory: self.output_directory.clone(),
        };
        next.validate()?;
        Ok(next)
    }

    /// Bytes in one full block: `chunk_size × channels × capture width`.
    pub fn block_bytes(&self) -> usize {
        self.chunk_size as usize * self.channels as usize * self.sample_format.capture_width()
    }
}

/// Partial settings change applied through [`CaptureSettings::update`].
///
/// `device: Some(None)` clears the device selection back to the system
/// default; `device: None` leaves it untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub sample_format: Option<SampleFormat>,
    pub chunk_size: Option<u32>,
    pub device: Option<Option<String>>,
}
