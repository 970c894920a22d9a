use serde::{Deserialize, Serialize};

/// PCM layout of the recording: what the mixer node produces and the
/// WAV header declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
}

impl StreamFormat {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.bits_per_sample as usize / 8
    }

    /// Bytes per frame (one sample for every channel), a.k.a. block align.
    pub fn bytes_per_frame(&self) -> usize {
        self.channels as usize * self.bytes_per_sample()
    }

    /// Bytes per second, or `None` when it does not fit the WAV header's
    /// 32-bit field.
    pub fn checked_byte_rate(&self) -> Option<u32> {
        let frame = u32::try_from(self.bytes_per_frame()).ok()?;
        self.sample_rate.checked_mul(frame)
    }

    /// Bytes per second, saturating at `u32::MAX`.
    pub fn byte_rate(&self) -> u32 {
        self.checked_byte_rate().unwrap_or(u32::MAX)
    }

    /// Duration in seconds of `data_bytes` of PCM in this format.
    pub fn duration_of(&self, data_bytes: u64) -> f64 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0.0;
        }
        data_bytes as f64 / rate as f64
    }
}

/// An input device available for recording.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSource {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// Real-time input metering (RMS and peak, 0.0–1.0).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AudioLevels {
    pub level: f32,
    pub peak_level: f32,
}

/// One chunk of recorded PCM, as handed to the host.
///
/// `data` is the packet's bytes encoded as standard base64, exactly as they
/// were appended to the WAV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioDataEvent {
    pub sequence: u64,
    pub start_packet: i64,
    pub frames: usize,
    pub data: String,
}

/// Counters for debugging a session.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionDiagnostics {
    pub callback_count: u64,
    pub input_samples_total: u64,
    pub dropped_samples: u64,
    pub packets_skipped: u64,
    pub packets_written: u64,
    pub bytes_written: u64,
    pub write_errors: u64,
    pub input_format: String,
}
