use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::audio_models::StreamFormat;

/// Result returned when a recording is stopped and its file finalized.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    pub duration_secs: f64,
    pub data_bytes: u64,
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata stored alongside a recording.
///
/// Serializable for the JSON sidecar and for handing back to the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingMetadata {
    pub id: String,
    pub file_path: String,
    pub duration_secs: f64,
    pub data_bytes: u64,
    pub checksum: String,
    pub created_at: String,
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    pub device: Option<String>,
}

impl RecordingMetadata {
    pub fn new(
        file_path: &str,
        format: StreamFormat,
        data_bytes: u64,
        checksum: &str,
        device: Option<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string(),
            duration_secs: format.duration_of(data_bytes),
            data_bytes,
            checksum: checksum.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            sample_rate: format.sample_rate,
            channels: format.channels,
            bits_per_sample: format.bits_per_sample,
            device,
        }
    }

    pub fn format(&self) -> StreamFormat {
        StreamFormat::new(self.sample_rate, self.channels, self.bits_per_sample)
    }
}
