//! cpal microphone capture provider.
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream is built,
//! played and dropped on a dedicated thread. `start` waits for that thread
//! to report whether the stream came up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{FromSample, SampleFormat, SizedSample};
use parking_lot::Mutex;

use audio_record_core::models::audio_models::AudioSource;
use audio_record_core::models::error::RecordError;
use audio_record_core::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

use crate::devices::DeviceEnumerator;

/// Microphone input through the default cpal host.
///
/// Opens the device with its default input configuration; rate and channel
/// conversion happen downstream in the session's mixer node.
pub struct CpalMicInput {
    device_name: Option<String>,
    running: Arc<AtomicBool>,
    capture_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl CpalMicInput {
    /// Capture from the system default microphone.
    pub fn default_device() -> Self {
        Self::with_device(None)
    }

    /// Capture from the input device called `name`, or the default one.
    pub fn with_device(name: Option<String>) -> Self {
        Self {
            device_name: name,
            running: Arc::new(AtomicBool::new(false)),
            capture_handle: Mutex::new(None),
        }
    }

    pub fn device_name(&self) -> Option<&str> {
        self.device_name.as_deref()
    }
}

impl CaptureProvider for CpalMicInput {
    fn is_available(&self) -> bool {
        DeviceEnumerator::new()
            .resolve(self.device_name.as_deref())
            .is_ok()
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), RecordError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RecordError::ConfigurationFailed("mic capture already running".into()));
        }

        let running = Arc::clone(&self.running);
        let device_name = self.device_name.clone();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<(), RecordError>>();

        let spawned = thread::Builder::new()
            .name("cpal-mic-capture".into())
            .spawn(move || {
                let stream = match open_stream(device_name.as_deref(), callback) {
                    Ok(stream) => stream,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                if let Err(e) = stream.play() {
                    let _ = ready_tx.send(Err(RecordError::Unknown(format!("failed to start input stream: {}", e))));
                    return;
                }
                let _ = ready_tx.send(Ok(()));

                while running.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(20));
                }

                // Pause first so no callback runs while the stream is torn down.
                if let Err(e) = stream.pause() {
                    log::warn!("Failed to pause input stream: {}", e);
                }
                drop(stream);
                log::info!("Microphone stream closed");
            });

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(RecordError::Unknown(format!("failed to spawn mic thread: {}", e)));
            }
        };

        match ready_rx.recv() {
            Ok(Ok(())) => {
                *self.capture_handle.lock() = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                log::error!("Mic capture error: {}", e);
                Err(e)
            }
            Err(_) => {
                self.running.store(false, Ordering::SeqCst);
                let _ = handle.join();
                Err(RecordError::Unknown("mic thread exited before the stream started".into()))
            }
        }
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.capture_handle.lock().take() {
            handle
                .join()
                .map_err(|_| RecordError::Unknown("mic thread panicked".into()))?;
        }
        Ok(())
    }

    /// Any name is accepted here; whether it exists is checked when the
    /// stream opens.
    fn select_device(&mut self, name: Option<&str>) -> Result<(), RecordError> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RecordError::ConfigurationFailed(
                "cannot change device while capturing".into(),
            ));
        }
        if let Some(name) = name {
            self.device_name = Some(name.to_string());
        }
        Ok(())
    }

    fn device_info(&self) -> AudioSource {
        match self.device_name {
            Some(ref name) => AudioSource {
                id: name.clone(),
                name: name.clone(),
                is_default: false,
            },
            None => AudioSource {
                id: "default-mic".into(),
                name: "Default Microphone".into(),
                is_default: true,
            },
        }
    }
}

impl Drop for CpalMicInput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// Open an input stream on the resolved device in its native format.
fn open_stream(device_name: Option<&str>, callback: AudioBufferCallback) -> Result<cpal::Stream, RecordError> {
    let device = DeviceEnumerator::new().resolve(device_name)?;
    let supported = device
        .default_input_config()
        .map_err(|e| RecordError::ConfigurationFailed(format!("no usable input configuration: {}", e)))?;

    let sample_format = supported.sample_format();
    let config: cpal::StreamConfig = supported.into();
    log::info!(
        "Opening input '{}': {} Hz, {} ch, {:?}",
        device.name().unwrap_or_else(|_| "unknown".into()),
        config.sample_rate.0,
        config.channels,
        sample_format
    );

    match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, callback),
        SampleFormat::I16 => build_stream::<i16>(&device, &config, callback),
        SampleFormat::I32 => build_stream::<i32>(&device, &config, callback),
        SampleFormat::I8 => build_stream::<i8>(&device, &config, callback),
        SampleFormat::U16 => build_stream::<u16>(&device, &config, callback),
        SampleFormat::U8 => build_stream::<u8>(&device, &config, callback),
        other => Err(RecordError::ConfigurationFailed(format!(
            "unsupported sample format: {:?}",
            other
        ))),
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    callback: AudioBufferCallback,
) -> Result<cpal::Stream, RecordError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let sample_rate = config.sample_rate.0 as f64;
    let channels = config.channels;

    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| f32::from_sample_(s)).collect();
                callback(&samples, sample_rate, channels);
            },
            |err| log::error!("Input stream error: {}", err),
            None,
        )
        .map_err(map_build_error)
}

fn map_build_error(err: cpal::BuildStreamError) -> RecordError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => RecordError::DeviceNotAvailable,
        other => RecordError::ConfigurationFailed(format!("failed to build input stream: {}", other)),
    }
}
