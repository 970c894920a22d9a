use super::error::RecordError;
use super::recording_result::RecordingResult;

/// Recording session state machine.
///
/// State transitions:
/// ```text
/// uninitialized → ready → recording → stopping → completed → ready
///                   ↑         ↓
///                   └──── failed (start-up error)
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RecordState {
    Uninitialized,
    Ready,
    Recording { duration_secs: f64 },
    Stopping,
    Completed(Box<RecordingResult>),
    Failed(RecordError),
}

impl RecordState {
    pub fn is_initialized(&self) -> bool {
        !matches!(self, Self::Uninitialized)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording { .. })
    }

    /// Short lowercase name, suitable for event payloads.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Recording { .. } => "recording",
            Self::Stopping => "stopping",
            Self::Completed(_) => "completed",
            Self::Failed(_) => "failed",
        }
    }

    /// Returns the current duration if in a state that tracks it.
    pub fn duration(&self) -> Option<f64> {
        match self {
            Self::Recording { duration_secs } => Some(*duration_secs),
            Self::Completed(result) => Some(result.duration_secs),
            _ => None,
        }
    }
}
