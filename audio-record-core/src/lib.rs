//! # audio-record-core
//!
//! Platform-agnostic microphone recording.
//!
//! An [`AudioCaptureSession`] owns an audio engine (any [`CaptureProvider`]),
//! a [`MixerNode`] tapping its input, a fixed three-buffer [`BufferQueue`]
//! and a streaming [`WavFileWriter`]. Every packet written to the file is
//! also handed to the host as a base64 [`AudioDataEvent`].
//!
//! ## Architecture
//!
//! ```text
//! audio-record-core (this crate)
//! ├── traits/       ← CaptureProvider, RecordSession, RecordDelegate
//! ├── models/       ← RecordError, RecordState, RecordOptions, StreamFormat, etc.
//! ├── processing/   ← MixerNode, RingBuffer, BufferQueue, WAV header layout
//! ├── providers/    ← ToneInput (synthetic engine)
//! ├── session/      ← AudioCaptureSession, process-wide EngineLease
//! └── storage/      ← WavFileWriter, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod providers;
pub mod session;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod test_support;

pub use models::audio_models::{AudioDataEvent, AudioLevels, AudioSource, SessionDiagnostics, StreamFormat};
pub use models::config::RecordOptions;
pub use models::error::RecordError;
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::RecordState;
pub use processing::buffer_queue::{BufferQueue, Packet, NUM_BUFFERS};
pub use processing::mixer_node::{MixerNode, Resampler};
pub use processing::ring_buffer::RingBuffer;
pub use providers::tone::ToneInput;
pub use session::lease::EngineLease;
pub use session::recorder::AudioCaptureSession;
pub use storage::wav_writer::WavFileWriter;
pub use traits::capture_provider::{AudioBufferCallback, CaptureProvider};
pub use traits::capture_session::RecordSession;
pub use traits::record_delegate::RecordDelegate;
