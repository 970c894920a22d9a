use crate::models::audio_models::{AudioDataEvent, AudioLevels};
use crate::models::error::RecordError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecordState;

/// Event sink for a recording session.
///
/// `on_data`, `on_levels_updated` and `on_error` are called from the
/// session's background threads. Hosts that need a particular thread must
/// marshal themselves.
pub trait RecordDelegate: Send + Sync {
    fn on_state_changed(&self, state: &RecordState);

    /// A packet of PCM was appended to the recording.
    fn on_data(&self, event: &AudioDataEvent);

    fn on_levels_updated(&self, _levels: &AudioLevels) {}

    fn on_error(&self, error: &RecordError);

    /// The file was finalized.
    fn on_recording_finished(&self, result: &RecordingResult);
}
