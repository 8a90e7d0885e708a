//! WAV container layout.
//!
//! Recordings are plain RIFF/WAVE files: one 44-byte header followed by
//! raw PCM. The header goes out first with zeroed size fields; once the
//! data length is known the two size fields are patched in place.

use crate::models::settings::CaptureSettings;

/// RIFF header length, in bytes, preceding the PCM data.
pub const WAV_HEADER_SIZE: usize = 44;

/// Build the header for an uncompressed PCM WAV file.
///
/// Every multi-byte field is little-endian. The recording pipeline
/// writes this with `data_size = 0` up front and patches the two size
/// fields once the capture is finalized.
///
/// ```text
/// offset  size  field
///      0     4  "RIFF"
///      4     4  riff chunk size (36 + data_size)
///      8     4  "WAVE"
///     12     4  "fmt "
///     16     4  fmt chunk size, always 16
///     20     2  audio format, 1 = integer PCM
///     22     2  channels
///     24     4  sample_rate
///     28     4  byte rate (sample_rate * channels * bit_depth / 8)
///     32     2  block align (channels * bit_depth / 8)
///     34     2  bit_depth
///     36     4  "data"
///     40     4  data_size
/// ```
pub fn generate_header(
    sample_rate: u32,
    bit_depth: u16,
    channels: u16,
    data_size: u32,
) -> [u8; WAV_HEADER_SIZE] {
    let byte_rate = sample_rate * channels as u32 * bit_depth as u32 / 8;
    let block_align = channels * bit_depth / 8;
    let chunk_size = 36 + data_size;

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// Header matching a settings value, with the data size filled in.
pub fn header_for(settings: &CaptureSettings, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    generate_header(
        settings.sample_rate,
        settings.sample_format.bit_depth(),
        settings.channels,
        data_size,
    )
}

/// Rewrite the RIFF chunk size at offset 4 from the final file size.
pub fn patch_file_size(header: &mut [u8], total_file_size: u64) {
    let chunk_size = (total_file_size - 8) as u32;
    header[4..8].copy_from_slice(&chunk_size.to_le_bytes());
}

/// Rewrite the data chunk size at offset 40.
pub fn patch_data_size(header: &mut [u8], data_size: u64) {
    let data_size_u32 = data_size as u32;
    header[40..44].copy_from_slice(&data_size_u32.to_le_bytes());
}
