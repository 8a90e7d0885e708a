//! # voice-services
//!
//! HTTP clients for the two remote collaborators of the voice-to-image
//! pipeline: speech-to-text transcription and image generation.
//!
//! Both clients take an explicit [`ServiceConfig`]; there is no shared
//! process-wide client state. Authentication rejections surface as the
//! distinct [`ServiceError::AuthenticationFailure`] so the UI can tell
//! a bad credential from a transient network problem.

pub mod config;
pub mod error;
pub mod image;
pub mod transcribe;

pub use config::ServiceConfig;
pub use error::ServiceError;
pub use image::ImageClient;
pub use transcribe::TranscriptionClient;
