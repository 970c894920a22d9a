//! Input device enumeration via the default cpal host.

use cpal::traits::{DeviceTrait, HostTrait};

use audio_record_core::models::audio_models::AudioSource;
use audio_record_core::models::error::RecordError;

/// Lists and resolves capture devices on the platform's default host.
pub struct DeviceEnumerator {
    host: cpal::Host,
}

impl DeviceEnumerator {
    pub fn new() -> Self {
        Self {
            host: cpal::default_host(),
        }
    }

    /// Name of the audio backend in use (e.g. "ALSA", "CoreAudio", "WASAPI").
    pub fn host_name(&self) -> &'static str {
        self.host.id().name()
    }

    /// List input devices, flagging the system default.
    pub fn list_input_devices(&self) -> Result<Vec<AudioSource>, RecordError> {
        let default_name = self.host.default_input_device().and_then(|d| d.name().ok());

        let devices = self
            .host
            .input_devices()
            .map_err(|e| RecordError::Unknown(format!("failed to enumerate input devices: {}", e)))?;

        let mut sources = Vec::new();
        for (i, device) in devices.enumerate() {
            let name = device.name().unwrap_or_else(|_| format!("Input {}", i));
            let is_default = default_name.as_deref() == Some(name.as_str());
            sources.push(AudioSource {
                id: name.clone(),
                name,
                is_default,
            });
        }
        Ok(sources)
    }

    pub fn default_input_device(&self) -> Result<cpal::Device, RecordError> {
        self.host
            .default_input_device()
            .ok_or(RecordError::DeviceNotAvailable)
    }

    /// Find an input device by its exact name.
    pub fn find_input_device(&self, name: &str) -> Result<cpal::Device, RecordError> {
        let mut devices = self
            .host
            .input_devices()
            .map_err(|e| RecordError::Unknown(format!("failed to enumerate input devices: {}", e)))?;
        devices
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or(RecordError::DeviceNotAvailable)
    }

    /// The named device, or the default one when `name` is None.
    pub fn resolve(&self, name: Option<&str>) -> Result<cpal::Device, RecordError> {
        match name {
            Some(name) => self.find_input_device(name),
            None => self.default_input_device(),
        }
    }
}

impl Default for DeviceEnumerator {
    fn default() -> Self {
        Self::new()
    }
}
