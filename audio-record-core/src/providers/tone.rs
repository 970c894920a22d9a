//! Synthetic sine-wave input.
//!
//! Behaves like a microphone that hears a steady tone: blocks arrive on a
//! dedicated thread at real-time pace. Useful where no capture device exists.

use std::f64::consts::TAU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::models::audio_models::AudioSource;
use crate::models::error::RecordError;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};

pub struct ToneInput {
    frequency: f64,
    amplitude: f32,
    sample_rate: f64,
    channels: u16,
    block_frames: usize,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl ToneInput {
    /// A 10 ms-block tone at `frequency` Hz.
    pub fn new(frequency: f64, sample_rate: f64, channels: u16) -> Self {
        Self {
            frequency,
            amplitude: 0.5,
            sample_rate,
            channels: channels.max(1),
            block_frames: ((sample_rate / 100.0) as usize).max(1),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Generate `frames` interleaved frames starting at frame `offset`.
    pub fn render(&self, offset: u64, frames: usize) -> Vec<f32> {
        render_block(
            self.frequency,
            self.amplitude,
            self.sample_rate,
            self.channels,
            offset,
            frames,
        )
    }
}

fn render_block(
    frequency: f64,
    amplitude: f32,
    sample_rate: f64,
    channels: u16,
    offset: u64,
    frames: usize,
) -> Vec<f32> {
    let mut block = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames {
        let t = (offset + i as u64) as f64 / sample_rate;
        let value = (TAU * frequency * t).sin() as f32 * amplitude;
        block.extend(std::iter::repeat(value).take(channels as usize));
    }
    block
}

impl CaptureProvider for ToneInput {
    fn is_available(&self) -> bool {
        self.sample_rate > 0.0
    }

    fn start(&mut self, callback: AudioBufferCallback) -> Result<(), RecordError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(RecordError::ConfigurationFailed("tone input already running".into()));
        }

        let running = Arc::clone(&self.running);
        let (frequency, amplitude, rate, channels, block_frames) = (
            self.frequency,
            self.amplitude,
            self.sample_rate,
            self.channels,
            self.block_frames,
        );
        let block_duration = Duration::from_secs_f64(block_frames as f64 / rate);

        let handle = thread::Builder::new()
            .name("tone-input".into())
            .spawn(move || {
                let started = Instant::now();
                let mut offset = 0u64;
                let mut blocks = 0u32;
                while running.load(Ordering::SeqCst) {
                    let block = render_block(frequency, amplitude, rate, channels, offset, block_frames);
                    callback(&block, rate, channels);
                    offset += block_frames as u64;
                    blocks += 1;

                    let due = started + block_duration * blocks;
                    if let Some(wait) = due.checked_duration_since(Instant::now()) {
                        thread::sleep(wait);
                    }
                }
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                RecordError::Unknown(format!("failed to spawn tone thread: {}", e))
            })?;

        *self.handle.lock() = Some(handle);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RecordError> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.lock().take() {
            let _ = handle.join();
        }
        Ok(())
    }

    fn device_info(&self) -> AudioSource {
        AudioSource {
            id: "tone".into(),
            name: format!("Sine {} Hz", self.frequency),
            is_default: false,
        }
    }
}

impl Drop for ToneInput {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
