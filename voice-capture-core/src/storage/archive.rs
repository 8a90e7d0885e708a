//! Recording archive listing.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::models::recording::RecordingFile;

const RECORDING_EXTENSION: &str = "wav";

/// Scan `dir` for saved recordings, most recently modified first.
///
/// Rescans on every call; nothing is cached. A missing directory yields
/// an empty list. Files that disappear between the directory listing and
/// the stat call are transient and silently skipped.
pub fn list_recordings(dir: &Path) -> Vec<RecordingFile> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut files = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        let is_recording = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case(RECORDING_EXTENSION))
            .unwrap_or(false);
        if !is_recording {
            continue;
        }

        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(_) => continue,
        };
        let modified = match metadata.modified() {
            Ok(m) => m,
            Err(_) => continue,
        };

        let name = match path.file_name() {
            Some(n) => n.to_string_lossy().into_owned(),
            None => continue,
        };

        files.push(RecordingFile {
            name,
            path: path.clone(),
            size_bytes: metadata.len(),
            modified_at: DateTime::<Utc>::from(modified),
        });
    }

    files.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
    files
}
