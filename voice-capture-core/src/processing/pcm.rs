//! Sample conversion from capture format to container PCM.
//!
//! Integer captures pass through unchanged. Floating-point captures are
//! clamped to [-1, 1] and scaled by `i32::MAX`, so the conversion is
//! deterministic and symmetric with any standard PCM reader. Trailing
//! bytes that do not form a whole sample are dropped.

use crate::models::settings::SampleFormat;

/// Convert raw capture bytes into the byte stream written to the WAV
/// `data` chunk.
pub fn to_container_bytes(raw: &[u8], format: SampleFormat) -> Vec<u8> {
    match format {
        SampleFormat::Int16 | SampleFormat::Int32 => {
            let width = format.capture_width();
            let whole = raw.len() - raw.len() % width;
            raw[..whole].to_vec()
        }
        SampleFormat::Float32 => {
            let mut out = Vec::with_capacity(raw.len());
            for chunk in raw.chunks_exact(4) {
                let sample = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                out.extend_from_slice(&scale_f64(sample as f64).to_le_bytes());
            }
            out
        }
        SampleFormat::Float64 => {
            let mut out = Vec::with_capacity(raw.len() / 2);
            for chunk in raw.chunks_exact(8) {
                let sample = f64::from_le_bytes([
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
                ]);
                out.extend_from_slice(&scale_f64(sample).to_le_bytes());
            }
            out
        }
    }
}

fn scale_f64(sample: f64) -> i32 {
    let clamped = sample.clamp(-1.0, 1.0);
    (clamped * i32::MAX as f64) as i32
}
