use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::error::CaptureError;
use crate::models::recording::RecordingFile;
use crate::models::settings::{CaptureSettings, SettingsUpdate};
use crate::models::status::CaptureStatus;
use crate::processing::pcm;
use crate::storage::archive;
use crate::storage::wav_writer::WavWriter;
use crate::traits::capture_backend::{CaptureBackend, CaptureStream, InputDevice};

/// Bounded wait for the capture thread on stop. A thread that fails to
/// finish in time is detached and treated as a best-effort leak.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

const JOIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Internal mutable session state, protected by `parking_lot::Mutex`.
///
/// The frame buffer, status, and open stream handle share one lock so
/// they can never desynchronize; none of them leave this struct.
struct SessionState {
    status: CaptureStatus,
    frames: Vec<Vec<u8>>,
    stream: Option<Box<dyn CaptureStream>>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            status: CaptureStatus::default(),
            frames: Vec::new(),
            stream: None,
        }
    }
}

/// Recorder state machine, generic over the capture backend.
///
/// Two threads per session: the controlling thread issuing
/// start/stop/status/save, and one background capture thread spawned by
/// `start()` and joined by `stop()`. Sessions are re-enterable but never
/// nested.
///
/// `start()` and `stop()` report success as `bool` and leave the reason
/// for any failure in `CaptureStatus.message`; nothing raised inside the
/// capture loop crosses the thread boundary.
pub struct CaptureSession<B: CaptureBackend> {
    backend: B,
    settings: CaptureSettings,
    state: Arc<Mutex<SessionState>>,
    capture_handle: Option<thread::JoinHandle<()>>,
}

impl<B: CaptureBackend> CaptureSession<B> {
    pub fn new(backend: B) -> Self {
        Self::with_settings(backend, CaptureSettings::default())
            .expect("default settings are valid")
    }

    /// Create a session with explicit settings. Validates up front.
    pub fn with_settings(backend: B, settings: CaptureSettings) -> Result<Self, CaptureError> {
        settings.validate()?;
        Ok(Self {
            backend,
            settings,
            state: Arc::new(Mutex::new(SessionState::new())),
            capture_handle: None,
        })
    }

    pub fn settings(&self) -> &CaptureSettings {
        &self.settings
    }

    /// List input devices through the backend.
    pub fn input_devices(&self) -> Result<Vec<InputDevice>, CaptureError> {
        self.backend.list_input_devices()
    }

    /// Start recording. Valid only from idle.
    ///
    /// Enumerates devices, opens the input stream, clears the frame
    /// buffer, records the start timestamp, and spawns the capture loop.
    /// Returns false on any failure, with the reason in status.message.
    pub fn start(&mut self) -> bool {
        {
            let mut s = self.state.lock();
            if s.status.is_active {
                s.status.message = "recording already in progress".into();
                return false;
            }

            // A previous cycle may have ended without stop() running
            // (capture-loop error); release its stream before opening
            // a new one.
            if let Some(mut stale) = s.stream.take() {
                stale.close();
            }

            let devices = match self.backend.list_input_devices() {
                Ok(devices) => devices,
                Err(e) => {
                    s.status.message = format!("device enumeration failed: {}", e);
                    return false;
                }
            };
            if devices.is_empty() {
                s.status.message = CaptureError::NoDeviceFound.to_string();
                return false;
            }

            let stream = match self.backend.open(&self.settings) {
                Ok(stream) => stream,
                Err(e) => {
                    s.status.message = format!("failed to start recording: {}", e);
                    return false;
                }
            };

            s.frames.clear();
            s.stream = Some(stream);
            s.status.is_active = true;
            s.status.started_at = Some(Instant::now());
            s.status.elapsed_seconds = 0.0;
            s.status.frame_count = 0;
            s.status.message = "recording started".into();
        }

        let state = Arc::clone(&self.state);
        match thread::Builder::new()
            .name("capture-loop".into())
            .spawn(move || capture_loop(state))
        {
            Ok(handle) => {
                self.capture_handle = Some(handle);
                true
            }
            Err(e) => {
                let mut s = self.state.lock();
                s.status.is_active = false;
                s.status.message = format!("failed to spawn capture thread: {}", e);
                if let Some(mut stream) = s.stream.take() {
                    stream.close();
                }
                false
            }
        }
    }

    /// Stop recording. Valid only while recording.
    ///
    /// Two-phase: flip the active flag under the lock, join the capture
    /// thread outside it (the loop needs the lock to observe the flag;
    /// joining under lock would deadlock), then re-acquire the lock to
    /// release the stream handle. Once this returns, no further frame
    /// can be appended.
    pub fn stop(&mut self) -> bool {
        {
            let mut s = self.state.lock();
            if !s.status.is_active {
                s.status.message = "no recording in progress".into();
                return false;
            }
            s.status.refresh_elapsed();
            s.status.is_active = false;
            s.status.message = "stopping recording...".into();
        }

        if let Some(handle) = self.capture_handle.take() {
            let deadline = Instant::now() + JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(JOIN_POLL_INTERVAL);
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                log::warn!(
                    "capture thread did not finish within {:?}; detaching",
                    JOIN_TIMEOUT
                );
            }
        }

        {
            let mut s = self.state.lock();
            if let Some(mut stream) = s.stream.take() {
                stream.close();
            }
            s.status.message = "recording stopped".into();
        }
        true
    }

    /// Write the captured frames to a WAV file.
    ///
    /// `name` defaults to a timestamp; the `.wav` extension is appended
    /// when missing and any path components are stripped. The frame
    /// buffer is kept afterwards, so the same capture can be saved again
    /// under a different name.
    pub fn save(&self, name: Option<&str>) -> Result<PathBuf, CaptureError> {
        let mut s = self.state.lock();
        if s.status.is_active {
            s.status.message = "stop the recording before saving".into();
            return Err(CaptureError::SessionActive);
        }
        if s.frames.is_empty() {
            s.status.message = CaptureError::NoData.to_string();
            return Err(CaptureError::NoData);
        }

        let path = self.settings.output_directory.join(normalize_name(name));
        let raw = s.frames.concat();
        let data = pcm::to_container_bytes(&raw, self.settings.sample_format);

        let mut writer = WavWriter::new(path.clone());
        let written = writer
            .open(&self.settings)
            .and_then(|_| writer.write(&data))
            .and_then(|_| writer.finalize());
        match written {
            Ok(()) => {
                s.status.message = format!("recording saved: {}", path.display());
                Ok(path)
            }
            Err(e) => {
                log::error!("failed to save recording: {}", e);
                s.status.message = format!("failed to save recording: {}", e);
                Err(e)
            }
        }
    }

    /// Defensive copy of the current status, with elapsed time and frame
    /// count refreshed.
    pub fn get_status(&self) -> CaptureStatus {
        let mut s = self.state.lock();
        s.status.frame_count = s.frames.len();
        if s.status.is_active {
            s.status.refresh_elapsed();
            s.status.message =
                format!("recording in progress - {:.1}s", s.status.elapsed_seconds);
        }
        s.status.clone()
    }

    /// Replace the settings. Rejected while a session is active.
    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<(), CaptureError> {
        let mut s = self.state.lock();
        if s.status.is_active {
            s.status.message = "settings cannot change while recording".into();
            return Err(CaptureError::SessionActive);
        }
        match self.settings.update(update) {
            Ok(next) => {
                self.settings = next;
                s.status.message = "settings updated".into();
                Ok(())
            }
            Err(e) => {
                s.status.message = format!("invalid settings: {}", e);
                Err(e)
            }
        }
    }

    /// List saved recordings in the configured output directory.
    pub fn list_recordings(&self) -> Vec<RecordingFile> {
        archive::list_recordings(&self.settings.output_directory)
    }

    /// Explicit teardown: stops an active session and releases the
    /// stream handle. Callers own the session lifetime; there is no
    /// finalizer-driven cleanup.
    pub fn close(&mut self) {
        let active = self.state.lock().status.is_active;
        if active {
            self.stop();
        }
        let mut s = self.state.lock();
        if let Some(mut stream) = s.stream.take() {
            stream.close();
        }
    }
}

/// Background capture loop.
///
/// Re-acquires the session lock on every block read to check the stop
/// flag and append data — a deliberate tight-loop lock/unlock pattern;
/// one lock covering flag, buffer, and stream cannot desynchronize.
/// Read failures end the loop and are reported through status, never as
/// a panic across the thread boundary.
fn capture_loop(state: Arc<Mutex<SessionState>>) {
    loop {
        {
            let mut s = state.lock();
            if !s.status.is_active {
                break;
            }
            let block = match s.stream.as_mut() {
                Some(stream) => stream.read_block(),
                None => break,
            };
            match block {
                Ok(block) => {
                    if !block.is_empty() {
                        s.frames.push(block);
                        s.status.frame_count = s.frames.len();
                    }
                }
                Err(e) => {
                    log::error!("capture read failed: {}", e);
                    s.status.message = format!("capture error: {}", e);
                    s.status.is_active = false;
                    // Release the device here; no stop() is coming to do it.
                    if let Some(mut stream) = s.stream.take() {
                        stream.close();
                    }
                    break;
                }
            }
        }
        // Lock released between blocks so the control thread can interleave.
        thread::sleep(Duration::from_millis(1));
    }
}

/// Default to a timestamped name; keep only the final path component of
/// caller-supplied names and normalize the extension.
fn normalize_name(name: Option<&str>) -> String {
    match name {
        None => format!(
            "recording_{}.wav",
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        ),
        Some(raw) => {
            let base = raw.trim().trim_end_matches(['/', '\\']);
            let base = base.rsplit(['/', '\\']).next().unwrap_or(base);
            let base = if base.is_empty() { "recording" } else { base };
            if base.to_ascii_lowercase().ends_with(".wav") {
                base.to_string()
            } else {
                format!("{}.wav", base)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::settings::SampleFormat;
    use std::collections::VecDeque;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct MockStream {
        blocks: VecDeque<Vec<u8>>,
        fail_after: Option<usize>,
        reads: usize,
        closed: Arc<AtomicBool>,
    }

    impl CaptureStream for MockStream {
        fn read_block(&mut self) -> Result<Vec<u8>, CaptureError> {
            self.reads += 1;
            if let Some(limit) = self.fail_after {
                if self.reads > limit {
                    return Err(CaptureError::DeviceOpenError("simulated read failure".into()));
                }
            }
            Ok(self.blocks.pop_front().unwrap_or_default())
        }

        fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    struct MockBackend {
        devices: Vec<InputDevice>,
        blocks: Vec<Vec<u8>>,
        fail_after: Option<usize>,
        open_error: Option<CaptureError>,
        closed: Arc<AtomicBool>,
    }

    impl MockBackend {
        fn with_blocks(blocks: Vec<Vec<u8>>) -> Self {
            Self {
                devices: vec![InputDevice {
                    index: 0,
                    name: "mock input".into(),
                    max_channels: 2,
                    default_sample_rate: 44100,
                }],
                blocks,
                fail_after: None,
                open_error: None,
                closed: Arc::new(AtomicBool::new(false)),
            }
        }

        fn without_devices() -> Self {
            Self {
                devices: Vec::new(),
                ..Self::with_blocks(Vec::new())
            }
        }
    }

    impl CaptureBackend for MockBackend {
        fn list_input_devices(&self) -> Result<Vec<InputDevice>, CaptureError> {
            Ok(self.devices.clone())
        }

        fn open(
            &mut self,
            _settings: &CaptureSettings,
        ) -> Result<Box<dyn CaptureStream>, CaptureError> {
            if let Some(err) = self.open_error.clone() {
                return Err(err);
            }
            Ok(Box::new(MockStream {
                blocks: self.blocks.clone().into(),
                fail_after: self.fail_after,
                reads: 0,
                closed: Arc::clone(&self.closed),
            }))
        }
    }

    fn session_in(dir: &Path, backend: MockBackend) -> CaptureSession<MockBackend> {
        let settings = CaptureSettings::default().with_output_directory(dir);
        CaptureSession::with_settings(backend, settings).unwrap()
    }

    fn silent_blocks(count: usize, samples_per_block: usize) -> Vec<Vec<u8>> {
        vec![vec![0u8; samples_per_block * 2]; count]
    }

    fn wait_for<F: Fn() -> bool>(cond: F) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !cond() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(cond(), "condition not reached within deadline");
    }

    #[test]
    fn start_stop_with_no_data_yields_no_data_on_save() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(Vec::new()));

        assert!(session.start());
        assert!(session.stop());
        assert_eq!(session.save(Some("empty")).unwrap_err(), CaptureError::NoData);
        assert!(!dir.path().join("empty.wav").exists());
    }

    #[test]
    fn stop_when_idle_returns_false_and_keeps_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(silent_blocks(3, 1024)));

        assert!(!session.stop());
        assert_eq!(session.get_status().message, "no recording in progress");

        assert!(session.start());
        wait_for(|| session.get_status().frame_count == 3);
        assert!(session.stop());

        let before = session.get_status().frame_count;
        assert!(!session.stop());
        assert_eq!(session.get_status().frame_count, before);
    }

    #[test]
    fn start_while_recording_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(Vec::new()));

        assert!(session.start());
        assert!(!session.start());
        assert_eq!(
            session.state.lock().status.message,
            "recording already in progress"
        );
        session.stop();
    }

    #[test]
    fn frame_count_is_fixed_after_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(silent_blocks(5, 256)));

        assert!(session.start());
        wait_for(|| session.get_status().frame_count == 5);
        assert!(session.stop());

        let frozen = session.get_status().frame_count;
        thread::sleep(Duration::from_millis(50));
        assert_eq!(session.get_status().frame_count, frozen);
        assert!(!session.get_status().is_active);
    }

    #[test]
    fn ten_silent_blocks_produce_expected_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::with_blocks(silent_blocks(10, 1024));
        let settings = CaptureSettings::new(44100, 1, SampleFormat::Int16, 1024)
            .unwrap()
            .with_output_directory(dir.path());
        let mut session = CaptureSession::with_settings(backend, settings).unwrap();

        assert!(session.start());
        wait_for(|| session.get_status().frame_count == 10);
        assert!(session.stop());
        assert_eq!(session.get_status().frame_count, 10);

        let path = session.save(Some("t")).unwrap();
        assert_eq!(path, dir.path().join("t.wav"));
        let data = std::fs::read(&path).unwrap();
        assert_eq!(data.len(), 44 + 10 * 1024 * 2);
    }

    #[test]
    fn saving_twice_produces_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(silent_blocks(4, 512)));

        assert!(session.start());
        wait_for(|| session.get_status().frame_count == 4);
        assert!(session.stop());

        let first = session.save(Some("first")).unwrap();
        let second = session.save(Some("second")).unwrap();

        let a = std::fs::read(first).unwrap();
        let b = std::fs::read(second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn saved_wav_round_trips_header_and_samples() {
        let dir = tempfile::tempdir().unwrap();
        // One block of recognizable i16 samples.
        let samples: Vec<i16> = (0..1024).map(|i| (i % 128) as i16 - 64).collect();
        let block: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
        let backend = MockBackend::with_blocks(vec![block.clone()]);
        let settings = CaptureSettings::new(22050, 1, SampleFormat::Int16, 1024)
            .unwrap()
            .with_output_directory(dir.path());
        let mut session = CaptureSession::with_settings(backend, settings).unwrap();

        assert!(session.start());
        wait_for(|| session.get_status().frame_count == 1);
        assert!(session.stop());

        let path = session.save(None).unwrap();
        let data = std::fs::read(path).unwrap();

        assert_eq!(u16::from_le_bytes([data[22], data[23]]), 1);
        assert_eq!(
            u32::from_le_bytes([data[24], data[25], data[26], data[27]]),
            22050
        );
        assert_eq!(u16::from_le_bytes([data[34], data[35]]), 16);
        assert_eq!(&data[44..], &block[..]);
    }

    #[test]
    fn save_while_recording_fails_with_session_active() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(silent_blocks(2, 256)));

        assert!(session.start());
        assert_eq!(
            session.save(Some("live")).unwrap_err(),
            CaptureError::SessionActive
        );
        session.stop();
    }

    #[test]
    fn no_device_found_is_reported_through_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::without_devices());

        assert!(!session.start());
        let status = session.get_status();
        assert!(!status.is_active);
        assert_eq!(status.message, CaptureError::NoDeviceFound.to_string());
    }

    #[test]
    fn open_failure_is_reported_through_status() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MockBackend::with_blocks(Vec::new());
        backend.open_error = Some(CaptureError::DeviceOpenError("device is busy".into()));
        let mut session = session_in(dir.path(), backend);

        assert!(!session.start());
        let status = session.get_status();
        assert!(!status.is_active);
        assert!(status.message.contains("device is busy"));
    }

    #[test]
    fn read_error_terminates_loop_without_touching_control_thread() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MockBackend::with_blocks(silent_blocks(2, 256));
        backend.fail_after = Some(2);
        let mut session = session_in(dir.path(), backend);

        assert!(session.start());
        wait_for(|| !session.get_status().is_active);

        let status = session.get_status();
        assert!(status.message.contains("capture error"));
        assert_eq!(status.frame_count, 2);
        // The failed session's data is still saveable.
        assert!(!session.stop());
        assert!(session.save(Some("salvaged")).is_ok());
    }

    #[test]
    fn read_error_releases_the_stream_for_restart() {
        let dir = tempfile::tempdir().unwrap();
        let mut backend = MockBackend::with_blocks(silent_blocks(1, 256));
        backend.fail_after = Some(1);
        let closed = Arc::clone(&backend.closed);
        let mut session = session_in(dir.path(), backend);

        assert!(session.start());
        wait_for(|| !session.get_status().is_active);
        // The loop closed the stream on its way out; no stop() needed.
        assert!(closed.load(Ordering::SeqCst));

        // The device is free again, so a new cycle can run to completion.
        assert!(session.start());
        wait_for(|| !session.get_status().is_active);
        assert!(session.save(Some("second")).is_ok());
    }

    #[test]
    fn update_settings_is_rejected_while_recording() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(Vec::new()));

        assert!(session.start());
        let err = session
            .update_settings(SettingsUpdate {
                sample_rate: Some(16000),
                ..Default::default()
            })
            .unwrap_err();
        assert_eq!(err, CaptureError::SessionActive);
        assert_eq!(session.settings().sample_rate, 44100);

        assert!(session.stop());
        session
            .update_settings(SettingsUpdate {
                sample_rate: Some(16000),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(session.settings().sample_rate, 16000);
    }

    #[test]
    fn elapsed_time_derives_from_start_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(Vec::new()));

        assert!(session.start());
        thread::sleep(Duration::from_millis(60));
        let status = session.get_status();
        assert!(status.is_active);
        assert!(status.elapsed_seconds >= 0.06);
        session.stop();
    }

    #[test]
    fn close_releases_the_stream() {
        let dir = tempfile::tempdir().unwrap();
        let backend = MockBackend::with_blocks(Vec::new());
        let closed = Arc::clone(&backend.closed);
        let mut session = session_in(dir.path(), backend);

        assert!(session.start());
        session.close();
        assert!(closed.load(Ordering::SeqCst));
        assert!(!session.get_status().is_active);
    }

    #[test]
    fn session_is_reenterable_after_stop() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(silent_blocks(2, 256)));

        assert!(session.start());
        wait_for(|| session.get_status().frame_count == 2);
        assert!(session.stop());

        // Second cycle starts from a cleared buffer.
        assert!(session.start());
        let early = session.get_status();
        assert!(early.frame_count <= 2);
        wait_for(|| session.get_status().frame_count == 2);
        assert!(session.stop());
    }

    #[test]
    fn listing_recordings_reflects_saves() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session_in(dir.path(), MockBackend::with_blocks(silent_blocks(1, 256)));

        assert!(session.list_recordings().is_empty());

        assert!(session.start());
        wait_for(|| session.get_status().frame_count == 1);
        assert!(session.stop());
        session.save(Some("take1")).unwrap();

        let listed = session.list_recordings();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "take1.wav");
    }

    #[test]
    fn normalize_name_handles_extensions_and_paths() {
        assert_eq!(normalize_name(Some("take")), "take.wav");
        assert_eq!(normalize_name(Some("take.wav")), "take.wav");
        assert_eq!(normalize_name(Some("Take.WAV")), "Take.WAV");
        assert_eq!(normalize_name(Some("../escape")), "escape.wav");
        assert_eq!(normalize_name(Some("  padded ")), "padded.wav");
        assert_eq!(normalize_name(Some("")), "recording.wav");
        assert!(normalize_name(None).starts_with("recording_"));
        assert!(normalize_name(None).ends_with(".wav"));
    }
}
