//! Helpers shared by the unit tests.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::models::audio_models::{AudioDataEvent, AudioLevels, AudioSource};
use crate::models::error::RecordError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecordState;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};
use crate::traits::record_delegate::RecordDelegate;

static SERIAL: Mutex<()> = parking_lot::const_mutex(());

/// Serializes tests that take the process-wide engine lease.
pub fn serial() -> MutexGuard<'static, ()> {
    SERIAL.lock()
}

pub fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("audio_record_{}_{}", label, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[derive(Default)]
struct ManualState {
    callback: Option<AudioBufferCallback>,
    fail_start: bool,
    unavailable: bool,
    starts: u32,
}

/// Engine whose input is pushed by the test itself.
#[derive(Clone)]
pub struct ManualInput {
    inner: Arc<Mutex<ManualState>>,
    sample_rate: f64,
    channels: u16,
}

impl ManualInput {
    pub fn new(sample_rate: f64, channels: u16) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ManualState::default())),
            sample_rate,
            channels,
        }
    }

    /// An engine whose `start` always fails.
    pub fn failing(self) -> Self {
        self.inner.lock().fail_start = true;
        self
    }

    pub fn unavailable(self) -> Self {
        self.inner.lock().unavailable = true;
        self
    }

    /// Deliver one block through the tap, as the audio thread would.
    pub fn feed(&self, samples: &[f32]) {
        let callback = self.inner.lock().callback.clone();
        if let Some(callback) = callback {
            callback(samples, self.sample_rate, self.channels);
        }
    }

    pub fn is_started(&self) -> bool {
        self.inner.lock().callback.is_some()
    }

    pub fn starts(&self) -> u32 {
        self.inner.lock().starts
    }
}

impl CaptureProvider for ManualInput {
    fn is_available(&self) -> bool {
        !self.inner.lock().unavailable
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), RecordError> {
        let mut inner = self.inner.lock();
        if inner.fail_start {
            return Err(RecordError::DeviceNotAvailable);
        }
        inner.callback = Some(callback);
        inner.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        self.inner.lock().callback = None;
        Ok(())
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "manual".into(),
            name: "Manual Input".into(),
            is_default: true,
        }
    }
}

/// Delegate that records every event it receives.
#[derive(Default)]
pub struct CollectingDelegate {
    pub states: Mutex<Vec<&'static str>>,
    pub data: Mutex<Vec<AudioDataEvent>>,
    pub levels: Mutex<Vec<AudioLevels>>,
    pub errors: Mutex<Vec<RecordError>>,
    pub finished: Mutex<Vec<RecordingResult>>,
}

impl RecordDelegate for CollectingDelegate {
    fn on_state_changed(&self, state: &RecordState) {
        self.states.lock().push(state.name());
    }

    fn on_data(&self, event: &AudioDataEvent) {
        self.data.lock().push(event.clone());
    }

    fn on_levels_updated(&self, levels: &AudioLevels) {
        self.levels.lock().push(*levels);
    }

    fn on_error(&self, error: &RecordError) {
        self.errors.lock().push(error.clone());
    }

    fn on_recording_finished(&self, result: &RecordingResult) {
        self.finished.lock().push(result.clone());
    }
}
