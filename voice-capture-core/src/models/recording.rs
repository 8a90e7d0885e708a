use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Metadata for a previously saved recording.
///
/// Derived by scanning the output directory; never cached, so a listing
/// always reflects the filesystem at call time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordingFile {
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: DateTime<Utc>,
}

impl RecordingFile {
    pub fn size_kb(&self) -> f64 {
        self.size_bytes as f64 / 1024.0
    }

    pub fn size_mb(&self) -> f64 {
        self.size_bytes as f64 / (1024.0 * 1024.0)
    }
}
