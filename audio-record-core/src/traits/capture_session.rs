use std::path::Path;

use crate::models::audio_models::AudioLevels;
use crate::models::config::RecordOptions;
use crate::models::error::RecordError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecordState;

/// Host-facing recorder interface: configure once, then start and stop any
/// number of times.
pub trait RecordSession: Send {
    /// Current session state.
    fn state(&self) -> RecordState;

    /// True while the engine is tapping input and the file is being written.
    fn is_recording(&self) -> bool;

    /// Target file of the session, once initialized.
    fn file_path(&self) -> Option<&Path>;

    /// Latest input levels.
    fn current_levels(&self) -> AudioLevels;

    /// Apply options, discarding any previous session. Transitions: any → ready.
    fn init(&mut self, options: RecordOptions) -> Result<(), RecordError>;

    /// Start recording. Transitions: ready → recording.
    fn start(&mut self) -> Result<(), RecordError>;

    /// Stop and finalize the file. `None` if nothing was recording.
    /// Transitions: recording → stopping → completed → ready.
    fn stop(&mut self) -> Result<Option<RecordingResult>, RecordError>;

    /// Tear everything down. Transitions: any → uninitialized.
    fn cleanup(&mut self);
}
