//! # voice-capture-cpal
//!
//! cpal-based implementation of the `voice-capture-core` backend traits.
//!
//! The `cpal::Stream` type is not `Send`, so `CpalBackend::open` spawns
//! a driver thread that owns the stream for the whole session and
//! forwards serialized sample buffers over a bounded channel. The
//! returned `CpalStream` handle re-chunks that flow into exact
//! settings-sized blocks for the session's capture loop.

pub mod backend;
pub mod enumerator;

pub use backend::{CpalBackend, CpalStream};
pub use enumerator::enumerate_input_devices;
