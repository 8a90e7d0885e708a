pub mod error;
pub mod recording;
pub mod settings;
pub mod status;
