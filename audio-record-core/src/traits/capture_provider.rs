use std::sync::Arc;

use crate::models::audio_models::AudioSource;
use crate::models::error::RecordError;

/// Callback invoked for every block of live input.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples in `[-1.0, 1.0]`.
/// - `sample_rate`: The device's actual sample rate.
/// - `channels`: Number of interleaved channels.
pub type AudioBufferCallback = Arc<dyn Fn(&[f32], f64, u16) + Send + Sync + 'static>;

/// The audio engine a session records from.
///
/// Implemented by `CpalMicInput` (audio-record-cpal) and by the synthetic
/// [`ToneInput`](crate::providers::tone::ToneInput).
pub trait CaptureProvider: Send {
    /// Whether this input can currently be opened.
    fn is_available(&self) -> bool;

    /// Start routing live input to `callback`.
    ///
    /// The callback fires on the engine's own audio thread, so it must stay
    /// cheap.
    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), RecordError>;

    /// Stop routing input. No callback fires after this returns.
    fn stop(&mut self) -> Result<(), RecordError>;

    /// Information about the device backing this provider.
    fn device_info(&self) -> AudioSource;

    /// Point the provider at the input device called `name` before it
    /// starts. `None` keeps the current device.
    ///
    /// Providers bound to a single device accept only their own name or id.
    fn select_device(&mut self, name: Option<&str>) -> Result<(), RecordError> {
        match name {
            None => Ok(()),
            Some(name) => {
                let info = self.device_info();
                if info.name == name || info.id == name {
                    Ok(())
                } else {
                    Err(RecordError::ConfigurationFailed(format!(
                        "device '{}' is not available on input '{}'",
                        name, info.name
                    )))
                }
            }
        }
    }
}

impl<P: CaptureProvider + ?Sized> CaptureProvider for Box<P> {
    fn is_available(&self) -> bool {
        (**self).is_available()
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), RecordError> {
        (**self).start(callback)
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        (**self).stop()
    }

    fn device_info(&self) -> AudioSource {
        (**self).device_info()
    }

    fn select_device(&mut self, name: Option<&str>) -> Result<(), RecordError> {
        (**self).select_device(name)
    }
}
