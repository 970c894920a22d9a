use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::audio_models::StreamFormat;
use super::error::RecordError;

/// Default length of one buffer-queue buffer.
pub const DEFAULT_BUFFER_MILLIS: u32 = 40;

/// Highest accepted output sample rate.
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// Largest accepted buffer-queue buffer, one second at the highest rate.
pub const MAX_BUFFER_FRAMES: u32 = MAX_SAMPLE_RATE;

/// Options for a recording session.
///
/// Deserializes from the host's camelCase JSON, e.g.
/// `{"sampleRate": 16000, "channels": 1, "bitsPerSample": 16, "wavFile": "take.wav"}`.
/// Missing keys take their defaults, unknown keys are ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordOptions {
    /// Output sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Output channel count (default: 1). Valid values: 1, 2.
    pub channels: u16,

    /// PCM bit depth (default: 16). Valid values: 8, 16.
    pub bits_per_sample: u16,

    /// Input device name, or None for the system default.
    pub device: Option<String>,

    /// File name of the recording inside `output_directory`.
    pub wav_file: String,

    /// Directory where the recording is written.
    pub output_directory: PathBuf,

    /// Frames per buffer-queue buffer. None = 40 ms at `sample_rate`.
    pub buffer_frames: Option<u32>,

    /// Number of leading buffers discarded after the engine starts.
    pub skip_leading_buffers: u32,

    /// Write a `.metadata.json` sidecar next to the finished recording.
    pub write_metadata: bool,
}

impl RecordOptions {
    /// Parse options from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        serde_json::from_str(json)
            .map_err(|e| RecordError::ConfigurationFailed(format!("invalid options: {}", e)))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.sample_rate > MAX_SAMPLE_RATE {
            return Err(format!(
                "sample rate {} exceeds the maximum of {}",
                self.sample_rate, MAX_SAMPLE_RATE
            ));
        }
        if ![8, 16].contains(&self.bits_per_sample) {
            return Err(format!("unsupported bits per sample: {}", self.bits_per_sample));
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.wav_file.trim().is_empty() {
            return Err("wav file name must not be empty".into());
        }
        if Path::new(&self.wav_file).file_name().is_none() {
            return Err(format!("invalid wav file name: {}", self.wav_file));
        }
        match self.buffer_frames {
            Some(0) => return Err("buffer frames must be positive".into()),
            Some(frames) if frames > MAX_BUFFER_FRAMES => {
                return Err(format!(
                    "buffer of {} frames exceeds the maximum of {}",
                    frames, MAX_BUFFER_FRAMES
                ));
            }
            _ => {}
        }
        Ok(())
    }

    pub fn format(&self) -> StreamFormat {
        StreamFormat::new(self.sample_rate, self.channels, self.bits_per_sample)
    }

    pub fn file_path(&self) -> PathBuf {
        self.output_directory.join(&self.wav_file)
    }

    pub fn frames_per_buffer(&self) -> usize {
        match self.buffer_frames {
            Some(frames) => frames as usize,
            None => ((self.sample_rate as u64 * DEFAULT_BUFFER_MILLIS as u64 / 1000) as usize).max(1),
        }
    }

    pub fn buffer_byte_size(&self) -> usize {
        self.frames_per_buffer() * self.format().bytes_per_frame()
    }
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            bits_per_sample: 16,
            device: None,
            wav_file: "audio.wav".into(),
            output_directory: PathBuf::from("."),
            buffer_frames: None,
            skip_leading_buffers: 2,
            write_metadata: false,
        }
    }
}
