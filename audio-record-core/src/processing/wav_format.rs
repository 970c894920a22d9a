//! RIFF/WAVE header layout for PCM recordings.
//!
//! The writer emits the header up front with zeroed sizes and patches the
//! two size fields once the recording is finalized.

use crate::models::audio_models::StreamFormat;

/// Size of the canonical PCM WAV header in bytes.
pub const WAV_HEADER_SIZE: usize = 44;

/// Offset of the RIFF chunk size (file size - 8).
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Offset of the `data` chunk size.
pub const DATA_SIZE_OFFSET: u64 = 40;

/// Build a 44-byte WAV header for `data_size` bytes of PCM in `format`.
///
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    36 + data_size
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16
/// [20-21]  1 (PCM)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate
/// [32-33]  block_align
/// [34-35]  bits_per_sample
/// [36-39]  "data"
/// [40-43]  data_size
/// ```
pub fn generate_wav_header(format: &StreamFormat, data_size: u32) -> [u8; WAV_HEADER_SIZE] {
    let block_align = format.bytes_per_frame() as u16;
    let riff_size = 36u32.saturating_add(data_size);

    let mut header = [0u8; WAV_HEADER_SIZE];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&riff_size.to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&format.bits_per_sample.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_size.to_le_bytes());

    header
}

/// RIFF and data size fields for a file holding `data_size` bytes of PCM.
///
/// Both saturate at `u32::MAX`; WAV cannot describe anything larger.
pub fn size_fields(data_size: u64) -> (u32, u32) {
    let data = u32::try_from(data_size).unwrap_or(u32::MAX);
    let riff = u32::try_from(data_size + 36).unwrap_or(u32::MAX);
    (riff, data)
}
