pub mod archive;
pub mod wav_writer;
