//! # voice-capture-core
//!
//! Platform-agnostic voice recording core library.
//!
//! Provides settings validation, the capture-session state machine,
//! WAV encoding, and recording-archive listing. Device backends
//! (cpal, test doubles) implement the `CaptureBackend` trait and plug
//! into the generic `CaptureSession`.
//!
//! ## Architecture
//!
//! ```text
//! voice-capture-core (this crate)
//! ├── traits/       ← CaptureBackend, CaptureStream, InputDevice
//! ├── models/       ← CaptureError, CaptureSettings, CaptureStatus, RecordingFile
//! ├── processing/   ← WAV header generation, PCM sample conversion
//! ├── session/      ← CaptureSession (generic recorder state machine)
//! └── storage/      ← WavWriter, archive listing
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::error::CaptureError;
pub use models::recording::RecordingFile;
pub use models::settings::{CaptureSettings, SampleFormat, SettingsUpdate};
pub use models::status::CaptureStatus;
pub use session::recorder::CaptureSession;
pub use storage::archive::list_recordings;
pub use storage::wav_writer::WavWriter;
pub use traits::capture_backend::{CaptureBackend, CaptureStream, InputDevice};
