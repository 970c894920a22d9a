//! # audio-record-cpal
//!
//! Cross-platform microphone backend for audio-record, built on `cpal`
//! (WASAPI on Windows, CoreAudio on macOS, ALSA/PipeWire on Linux).
//!
//! Provides:
//! - `CpalMicInput`: microphone [`CaptureProvider`](audio_record_core::CaptureProvider)
//! - `DeviceEnumerator`: input device listing and lookup by name
//! - `permissions`: probe whether the default microphone can be opened
//!
//! ## Usage
//! ```ignore
//! use audio_record_core::{AudioCaptureSession, RecordOptions};
//! use audio_record_cpal::CpalMicInput;
//!
//! let mut session = AudioCaptureSession::new(CpalMicInput::default_device());
//! session.init(RecordOptions::default())?;
//! session.start()?;
//! ```

pub mod devices;
pub mod mic_input;
pub mod permissions;

pub use devices::DeviceEnumerator;
pub use mic_input::CpalMicInput;
