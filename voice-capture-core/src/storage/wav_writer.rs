use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::settings::CaptureSettings;
use crate::processing::wav;

/// WAV file writer.
///
/// Writes a placeholder 44-byte header on `open`, appends raw PCM data,
/// and patches the RIFF and data size fields on `finalize`.
///
/// ```text
/// [44-byte WAV header]
/// [raw PCM data...]
/// ```
pub struct WavWriter {
    file_path: PathBuf,
    file: Option<File>,
    total_bytes_written: u64,
}

impl WavWriter {
    pub fn new(file_path: PathBuf) -> Self {
        Self {
            file_path,
            file: None,
            total_bytes_written: 0,
        }
    }

    /// Create the file (and its parent directory) and write the initial
    /// header. The size fields stay zero until `finalize`.
    pub fn open(&mut self, settings: &CaptureSettings) -> Result<(), CaptureError> {
        if self.file.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                CaptureError::EncodeError(format!("failed to create directory: {}", e))
            })?;
        }

        let file = File::create(&self.file_path)
            .map_err(|e| CaptureError::EncodeError(format!("failed to create file: {}", e)))?;
        self.file = Some(file);

        let header = wav::header_for(settings, 0);
        self.write_raw(&header)?;
        Ok(())
    }

    /// Append PCM data after the header.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        if self.file.is_none() {
            return Err(CaptureError::EncodeError(
                "file is not open for writing".into(),
            ));
        }
        self.write_raw(data)
    }

    /// Patch the header size fields, flush, and close the file.
    pub fn finalize(&mut self) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::EncodeError("file is not open".into()))?;

        // RIFF chunk size at offset 4
        let file_size = (self.total_bytes_written - 8) as u32;
        file.seek(SeekFrom::Start(4))
            .map_err(|e| CaptureError::EncodeError(e.to_string()))?;
        file.write_all(&file_size.to_le_bytes())
            .map_err(|e| CaptureError::EncodeError(e.to_string()))?;

        // data chunk size at offset 40
        let data_size = (self.total_bytes_written - wav::WAV_HEADER_SIZE as u64) as u32;
        file.seek(SeekFrom::Start(40))
            .map_err(|e| CaptureError::EncodeError(e.to_string()))?;
        file.write_all(&data_size.to_le_bytes())
            .map_err(|e| CaptureError::EncodeError(e.to_string()))?;

        file.flush()
            .map_err(|e| CaptureError::EncodeError(e.to_string()))?;
        self.file = None;
        Ok(())
    }

    /// Total bytes written so far (including the header).
    pub fn bytes_written(&self) -> u64 {
        self.total_bytes_written
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    fn write_raw(&mut self, data: &[u8]) -> Result<(), CaptureError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| CaptureError::EncodeError("file is not open".into()))?;
        file.write_all(data)
            .map_err(|e| CaptureError::EncodeError(format!("write failed: {}", e)))?;
        self.total_bytes_written += data.len() as u64;
        Ok(())
    }
}
