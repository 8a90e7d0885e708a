use std::time::Instant;

/// Snapshot of a capture session's observable state.
///
/// Mutated only while holding the session lock; `get_status()` hands a
/// defensive copy to callers so external mutation cannot corrupt the
/// session. `elapsed_seconds` is derived from `started_at` rather than
/// sampled by a timer.
#[derive(Debug, Clone)]
pub struct CaptureStatus {
    pub is_active: bool,
    pub elapsed_seconds: f64,
    pub frame_count: usize,
    /// Human-readable description of the last event, surfaced verbatim
    /// in the UI. Every failure path leaves a message here.
    pub message: String,
    pub started_at: Option<Instant>,
}

impl Default for CaptureStatus {
    fn default() -> Self {
        Self {
            is_active: false,
            elapsed_seconds: 0.0,
            frame_count: 0,
            message: "ready to record".into(),
            started_at: None,
        }
    }
}

impl CaptureStatus {
    /// Recompute elapsed time from the start timestamp while active.
    pub fn refresh_elapsed(&mut self) {
        if self.is_active {
            if let Some(started) = self.started_at {
                self.elapsed_seconds = started.elapsed().as_secs_f64();
            }
        }
    }
}
