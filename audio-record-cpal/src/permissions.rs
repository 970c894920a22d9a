//! Microphone access probe.
//!
//! There is no portable permission API. Opening the default input device
//! and querying its configuration is the closest check: it fails when no
//! microphone exists or when the OS privacy settings block access.

use cpal::traits::DeviceTrait;

use audio_record_core::models::error::RecordError;

use crate::devices::DeviceEnumerator;

/// Whether the default microphone can be opened.
///
/// `Ok(false)` means no device, or access is blocked. Errors are reserved
/// for the host failing to answer at all.
pub fn check_microphone_access() -> Result<bool, RecordError> {
    let enumerator = DeviceEnumerator::new();
    let device = match enumerator.default_input_device() {
        Ok(device) => device,
        Err(RecordError::DeviceNotAvailable) => return Ok(false),
        Err(e) => return Err(e),
    };

    match device.default_input_config() {
        Ok(_) => Ok(true),
        Err(cpal::DefaultStreamConfigError::DeviceNotAvailable) => Ok(false),
        Err(e) => {
            log::warn!("Unexpected error checking microphone access: {}", e);
            Ok(false)
        }
    }
}
