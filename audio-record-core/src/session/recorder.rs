use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use base64::Engine as _;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::models::audio_models::{AudioDataEvent, AudioLevels, SessionDiagnostics};
use crate::models::config::RecordOptions;
use crate::models::error::RecordError;
use crate::models::recording_result::{RecordingMetadata, RecordingResult};
use crate::models::state::RecordState;
use crate::processing::buffer_queue::{BufferQueue, Packet};
use crate::processing::mixer_node::MixerNode;
use crate::processing::ring_buffer::RingBuffer;
use crate::session::lease::EngineLease;
use crate::storage::metadata;
use crate::storage::wav_writer::WavFileWriter;
use crate::traits::capture_provider::{AudioBufferCallback, CaptureProvider};
use crate::traits::capture_session::RecordSession;
use crate::traits::record_delegate::RecordDelegate;

/// Seconds of converted input the ring buffer holds between the tap and the
/// processing thread.
const RING_SECONDS: usize = 5;

const PROCESSING_INTERVAL: Duration = Duration::from_millis(20);
const TIMER_INTERVAL: Duration = Duration::from_millis(250);

/// Internal mutable session state, protected by `parking_lot::Mutex`.
struct SessionState {
    state: RecordState,
    levels: AudioLevels,
    capture_start: Option<Instant>,
    diagnostics: SessionDiagnostics,
}

impl SessionState {
    fn new() -> Self {
        Self {
            state: RecordState::Uninitialized,
            levels: AudioLevels::default(),
            capture_start: None,
            diagnostics: SessionDiagnostics::default(),
        }
    }

    fn elapsed_secs(&self) -> f64 {
        self.capture_start
            .map(|start| start.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

/// Everything downstream of the tap, shared with the processing thread.
#[derive(Clone)]
struct Pipeline {
    input: Arc<Mutex<RingBuffer>>,
    queue: Arc<Mutex<BufferQueue>>,
    audio_file: Arc<Mutex<Option<WavFileWriter>>>,
    session_state: Arc<Mutex<SessionState>>,
    mixer: MixerNode,
    skip_leading: u64,
    delegate: Option<Arc<dyn RecordDelegate>>,
}

impl Pipeline {
    /// Drain converted input, quantize it and feed the buffer queue.
    fn process_pending(&self) {
        let channels = self.mixer.format().channels as usize;
        let samples = self.input.lock().drain_frames(channels);
        if samples.is_empty() {
            return;
        }
        let pcm = self.mixer.to_pcm(&samples);
        self.queue.lock().push(&pcm, |packet| self.deliver(packet));
    }

    /// Emit whatever is left in the buffer being filled.
    fn flush(&self) {
        self.queue.lock().flush(|packet| self.deliver(packet));
    }

    /// Handle one filled buffer: skip it, or write it and announce it.
    fn deliver(&self, packet: Packet<'_>) {
        if packet.sequence < self.skip_leading {
            log::debug!("skipping leading buffer {}", packet.sequence);
            self.session_state.lock().diagnostics.packets_skipped += 1;
            return;
        }

        let written = match self.audio_file.lock().as_mut() {
            Some(writer) => writer.write(packet.data),
            None => Err(RecordError::StorageError("file writer not available".into())),
        };

        match written {
            Ok(()) => {
                {
                    let mut s = self.session_state.lock();
                    s.diagnostics.packets_written += 1;
                    s.diagnostics.bytes_written += packet.data.len() as u64;
                }
                if let Some(ref delegate) = self.delegate {
                    delegate.on_data(&AudioDataEvent {
                        sequence: packet.sequence,
                        start_packet: packet.start_packet,
                        frames: packet.frames,
                        data: base64::engine::general_purpose::STANDARD.encode(packet.data),
                    });
                }
            }
            Err(e) => {
                log::error!("Failed to write audio data: {}", e);
                self.session_state.lock().diagnostics.write_errors += 1;
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(&e);
                }
            }
        }
    }
}

/// A microphone recording session.
///
/// Owns the audio engine (a [`CaptureProvider`]), the mixer node that taps
/// its input, and the WAV file the recording is written to.
///
/// ```text
/// [engine] → tap → [MixerNode] → [RingBuffer] → processing thread
///        → [BufferQueue] → packets → [WavFileWriter] + on_data events
/// ```
///
/// Only one session in the process can record at a time; see
/// [`EngineLease`].
pub struct AudioCaptureSession<P: CaptureProvider> {
    id: Uuid,
    engine: P,
    mixer: MixerNode,
    options: Option<RecordOptions>,
    file_path: Option<PathBuf>,
    is_recording: Arc<AtomicBool>,
    session_state: Arc<Mutex<SessionState>>,
    delegate: Option<Arc<dyn RecordDelegate>>,

    input_buffer: Arc<Mutex<RingBuffer>>,
    queue: Arc<Mutex<BufferQueue>>,
    audio_file: Arc<Mutex<Option<WavFileWriter>>>,
    lease: Option<EngineLease>,

    processing_running: Arc<AtomicBool>,
    processing_handle: Option<thread::JoinHandle<()>>,
    timer_running: Arc<AtomicBool>,
    timer_handle: Option<thread::JoinHandle<()>>,
}

impl<P: CaptureProvider> AudioCaptureSession<P> {
    pub fn new(engine: P) -> Self {
        let defaults = RecordOptions::default();
        let format = defaults.format();
        Self {
            id: Uuid::new_v4(),
            engine,
            mixer: MixerNode::new(format),
            options: None,
            file_path: None,
            is_recording: Arc::new(AtomicBool::new(false)),
            session_state: Arc::new(Mutex::new(SessionState::new())),
            delegate: None,
            input_buffer: Arc::new(Mutex::new(RingBuffer::new(1))), // resized on init
            queue: Arc::new(Mutex::new(BufferQueue::new(format, defaults.buffer_byte_size()))),
            audio_file: Arc::new(Mutex::new(None)),
            lease: None,
            processing_running: Arc::new(AtomicBool::new(false)),
            processing_handle: None,
            timer_running: Arc::new(AtomicBool::new(false)),
            timer_handle: None,
        }
    }

    pub fn set_delegate(&mut self, delegate: Arc<dyn RecordDelegate>) {
        self.delegate = Some(delegate);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> RecordState {
        self.session_state.lock().state.clone()
    }

    pub fn is_recording(&self) -> bool {
        self.is_recording.load(Ordering::SeqCst)
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn options(&self) -> Option<&RecordOptions> {
        self.options.as_ref()
    }

    pub fn current_levels(&self) -> AudioLevels {
        self.session_state.lock().levels
    }

    pub fn diagnostics(&self) -> SessionDiagnostics {
        self.session_state.lock().diagnostics.clone()
    }

    pub fn engine(&self) -> &P {
        &self.engine
    }

    /// Apply options. Any previous session is torn down first, and the
    /// engine is pointed at `options.device`.
    /// Transitions: any → ready.
    pub fn init(&mut self, options: RecordOptions) -> Result<(), RecordError> {
        self.cleanup();

        options.validate().map_err(RecordError::ConfigurationFailed)?;
        self.engine.select_device(options.device.as_deref())?;

        let format = options.format();
        self.mixer = MixerNode::new(format);
        let capacity = format.sample_rate as usize * format.channels as usize * RING_SECONDS;
        self.input_buffer = Arc::new(Mutex::new(RingBuffer::new(capacity)));
        self.queue = Arc::new(Mutex::new(BufferQueue::new(format, options.buffer_byte_size())));

        let file_path = options.file_path();
        log::info!(
            "Audio recorder initialized: {} Hz, {} ch, {}-bit → {}",
            format.sample_rate,
            format.channels,
            format.bits_per_sample,
            file_path.display()
        );
        self.file_path = Some(file_path);
        self.options = Some(options);
        self.set_state(RecordState::Ready);
        Ok(())
    }

    /// Start recording. Transitions: ready → recording.
    pub fn start(&mut self) -> Result<(), RecordError> {
        {
            let s = self.session_state.lock();
            if s.state.is_recording() {
                log::warn!("Already recording");
                return Err(RecordError::AlreadyRecording);
            }
            if !s.state.is_ready() {
                log::error!("Audio recorder not initialized");
                return Err(RecordError::NotInitialized);
            }
        }
        let options = self.options.clone().ok_or(RecordError::NotInitialized)?;
        let file_path = self.file_path.clone().ok_or(RecordError::NotInitialized)?;

        if !self.engine.is_available() {
            return Err(self.abort_start(RecordError::DeviceNotAvailable));
        }

        let lease = match EngineLease::acquire(self.id) {
            Ok(lease) => lease,
            Err(e) => return Err(self.abort_start(e)),
        };

        let mut writer = WavFileWriter::new(file_path.clone(), options.format());
        if let Err(e) = writer.open() {
            return Err(self.abort_start(e));
        }
        *self.audio_file.lock() = Some(writer);

        self.input_buffer.lock().reset();
        {
            let mut queue = self.queue.lock();
            queue.reset();
            queue.start();
        }
        {
            let mut s = self.session_state.lock();
            s.levels = AudioLevels::default();
            s.diagnostics = SessionDiagnostics::default();
        }

        if let Err(e) = self.engine.start(self.tap_callback()) {
            return Err(self.abort_start(e));
        }
        self.lease = Some(lease);

        self.session_state.lock().capture_start = Some(Instant::now());
        self.is_recording.store(true, Ordering::SeqCst);
        self.set_state(RecordState::Recording { duration_secs: 0.0 });

        if let Err(e) = self.start_processing_loop().and_then(|_| self.start_duration_timer()) {
            return Err(self.abort_start(e));
        }

        log::info!("Started recording to {}", file_path.display());
        Ok(())
    }

    /// Stop recording and finalize the file.
    ///
    /// Returns `Ok(None)` when nothing was recording.
    /// Transitions: recording → stopping → completed → ready.
    pub fn stop(&mut self) -> Result<Option<RecordingResult>, RecordError> {
        if !self.is_recording.load(Ordering::SeqCst) {
            return Ok(None);
        }

        self.set_state(RecordState::Stopping);
        self.is_recording.store(false, Ordering::SeqCst);

        if let Err(e) = self.engine.stop() {
            log::error!("Error stopping audio engine: {}", e);
        }
        self.stop_threads();

        let pipeline = self.pipeline();
        pipeline.process_pending();
        pipeline.flush();
        self.queue.lock().stop();

        let lease = self.lease.take();
        let writer = self.audio_file.lock().take();
        let finalized = match writer {
            Some(mut writer) => {
                let data_bytes = writer.data_bytes();
                writer.close().map(|checksum| (data_bytes, checksum))
            }
            None => Err(RecordError::StorageError("file writer not available".into())),
        };
        let (data_bytes, checksum) = match finalized {
            Ok(done) => done,
            Err(e) => {
                self.fail(e.clone());
                drop(lease);
                return Err(e);
            }
        };

        let options = self.options.clone().ok_or(RecordError::NotInitialized)?;
        let file_path = self.file_path.clone().ok_or(RecordError::NotInitialized)?;
        let device = Some(self.engine.device_info().name);

        let metadata = RecordingMetadata::new(
            &file_path.to_string_lossy(),
            options.format(),
            data_bytes,
            &checksum,
            device,
        );

        if options.write_metadata {
            if let Err(e) = metadata::write_metadata(&metadata, &file_path) {
                log::warn!("Recording saved without metadata: {}", e);
                if let Some(ref delegate) = self.delegate {
                    delegate.on_error(&e);
                }
            }
        }

        let result = RecordingResult {
            file_path,
            duration_secs: metadata.duration_secs,
            data_bytes,
            checksum,
            metadata,
        };

        self.set_state(RecordState::Completed(Box::new(result.clone())));
        if let Some(ref delegate) = self.delegate {
            delegate.on_recording_finished(&result);
        }

        drop(lease);
        self.session_state.lock().state = RecordState::Ready;
        log::info!("Stopped recording ({:.2}s)", result.duration_secs);

        Ok(Some(result))
    }

    /// Tear down without finalizing: stops capture, deletes an unfinished
    /// file and forgets the options. Safe to call in any state.
    /// Transitions: any → uninitialized.
    pub fn cleanup(&mut self) {
        if self.is_recording.swap(false, Ordering::SeqCst) {
            if let Err(e) = self.engine.stop() {
                log::error!("Error stopping audio engine during cleanup: {}", e);
            }
        }
        self.stop_threads();

        {
            let mut queue = self.queue.lock();
            queue.stop();
            queue.reset();
        }
        self.input_buffer.lock().reset();

        if let Some(mut writer) = self.audio_file.lock().take() {
            if let Err(e) = writer.discard() {
                log::error!("Error deleting unfinished recording: {}", e);
            }
        }

        self.lease = None;
        self.options = None;
        self.file_path = None;

        let was_initialized = self.session_state.lock().state.is_initialized();
        if was_initialized {
            self.set_state(RecordState::Uninitialized);
        }
    }

    // --- Internal helpers ---

    fn set_state(&self, new_state: RecordState) {
        self.session_state.lock().state = new_state.clone();
        if let Some(ref delegate) = self.delegate {
            delegate.on_state_changed(&new_state);
        }
    }

    fn fail(&self, error: RecordError) {
        log::error!("Recording failed: {}", error);
        self.set_state(RecordState::Failed(error.clone()));
        if let Some(ref delegate) = self.delegate {
            delegate.on_error(&error);
        }
        self.session_state.lock().state = RecordState::Ready;
    }

    /// Undo a partially completed `start` and report `error`.
    fn abort_start(&mut self, error: RecordError) -> RecordError {
        if self.is_recording.swap(false, Ordering::SeqCst) {
            let _ = self.engine.stop();
        }
        self.stop_threads();
        self.queue.lock().stop();
        if let Some(mut writer) = self.audio_file.lock().take() {
            let _ = writer.discard();
        }
        self.lease = None;
        self.fail(error.clone());
        error
    }

    fn pipeline(&self) -> Pipeline {
        let skip_leading = self
            .options
            .as_ref()
            .map(|o| o.skip_leading_buffers as u64)
            .unwrap_or(0);
        Pipeline {
            input: Arc::clone(&self.input_buffer),
            queue: Arc::clone(&self.queue),
            audio_file: Arc::clone(&self.audio_file),
            session_state: Arc::clone(&self.session_state),
            mixer: self.mixer.clone(),
            skip_leading,
            delegate: self.delegate.clone(),
        }
    }

    /// Callback handed to the engine: convert, meter, buffer.
    ///
    /// The callback owns its own mixer node so resampling state follows the
    /// engine's stream from the first block of this recording.
    fn tap_callback(&self) -> AudioBufferCallback {
        let input = Arc::clone(&self.input_buffer);
        let state = Arc::clone(&self.session_state);
        let mut mixer = self.mixer.clone();
        mixer.reset();
        let mixer = Mutex::new(mixer);

        Arc::new(move |samples: &[f32], sample_rate: f64, channels: u16| {
            let converted = mixer.lock().tap(samples, sample_rate, channels);
            let levels = MixerNode::levels(&converted);
            let dropped = input.lock().write(&converted);

            let mut s = state.lock();
            s.levels = levels;
            s.diagnostics.callback_count += 1;
            s.diagnostics.input_samples_total += samples.len() as u64;
            s.diagnostics.dropped_samples += dropped as u64;
            if s.diagnostics.input_format.is_empty() {
                s.diagnostics.input_format = format!("{} Hz, {} ch", sample_rate, channels);
            }
        })
    }

    fn start_processing_loop(&mut self) -> Result<(), RecordError> {
        self.processing_running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.processing_running);
        let recording = Arc::clone(&self.is_recording);
        let pipeline = self.pipeline();

        let handle = thread::Builder::new()
            .name("audio-processing".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    thread::sleep(PROCESSING_INTERVAL);
                    if recording.load(Ordering::SeqCst) {
                        pipeline.process_pending();
                    }
                }
            })
            .map_err(|e| RecordError::Unknown(format!("failed to spawn processing thread: {}", e)))?;

        self.processing_handle = Some(handle);
        Ok(())
    }

    fn start_duration_timer(&mut self) -> Result<(), RecordError> {
        self.timer_running.store(true, Ordering::SeqCst);

        let running = Arc::clone(&self.timer_running);
        let session_state = Arc::clone(&self.session_state);
        let delegate = self.delegate.clone();

        let handle = thread::Builder::new()
            .name("duration-timer".into())
            .spawn(move || {
                while running.load(Ordering::SeqCst) {
                    thread::sleep(TIMER_INTERVAL);

                    let mut s = session_state.lock();
                    if s.state.is_recording() {
                        let duration_secs = s.elapsed_secs();
                        s.state = RecordState::Recording { duration_secs };
                        let levels = s.levels;
                        drop(s);

                        if let Some(ref d) = delegate {
                            d.on_levels_updated(&levels);
                        }
                    }
                }
            })
            .map_err(|e| RecordError::Unknown(format!("failed to spawn timer thread: {}", e)))?;

        self.timer_handle = Some(handle);
        Ok(())
    }

    fn stop_threads(&mut self) {
        self.processing_running.store(false, Ordering::SeqCst);
        self.timer_running.store(false, Ordering::SeqCst);

        if let Some(handle) = self.processing_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.timer_handle.take() {
            let _ = handle.join();
        }
    }
}

impl<P: CaptureProvider> Drop for AudioCaptureSession<P> {
    fn drop(&mut self) {
        if self.is_recording() || self.processing_handle.is_some() {
            self.cleanup();
        }
    }
}

impl<P: CaptureProvider> RecordSession for AudioCaptureSession<P> {
    fn state(&self) -> RecordState {
        AudioCaptureSession::state(self)
    }

    fn is_recording(&self) -> bool {
        AudioCaptureSession::is_recording(self)
    }

    fn file_path(&self) -> Option<&Path> {
        AudioCaptureSession::file_path(self)
    }

    fn current_levels(&self) -> AudioLevels {
        AudioCaptureSession::current_levels(self)
    }

    fn init(&mut self, options: RecordOptions) -> Result<(), RecordError> {
        AudioCaptureSession::init(self, options)
    }

    fn start(&mut self) -> Result<(), RecordError> {
        AudioCaptureSession::start(self)
    }

    fn stop(&mut self) -> Result<Option<RecordingResult>, RecordError> {
        AudioCaptureSession::stop(self)
    }

    fn cleanup(&mut self) {
        AudioCaptureSession::cleanup(self)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;

    use super::*;
    use crate::session::lease;
    use crate::storage::metadata::read_metadata;
    use crate::test_support::{self, CollectingDelegate, ManualInput};

    fn options(dir: &Path) -> RecordOptions {
        RecordOptions {
            sample_rate: 8000,
            channels: 1,
            bits_per_sample: 16,
            wav_file: "take.wav".into(),
            output_directory: dir.to_path_buf(),
            buffer_frames: Some(4),
            skip_leading_buffers: 2,
            ..Default::default()
        }
    }

    fn session_with_delegate(input: &ManualInput) -> (AudioCaptureSession<ManualInput>, Arc<CollectingDelegate>) {
        let delegate = Arc::new(CollectingDelegate::default());
        let mut session = AudioCaptureSession::new(input.clone());
        session.set_delegate(delegate.clone());
        (session, delegate)
    }

    #[test]
    fn init_fixes_file_path() {
        let dir = test_support::temp_dir("init");
        let mut session = AudioCaptureSession::new(ManualInput::new(8000.0, 1));
        assert!(session.file_path().is_none());
        assert_eq!(session.state(), RecordState::Uninitialized);

        session.init(options(&dir)).unwrap();

        assert_eq!(session.file_path(), Some(dir.join("take.wav").as_path()));
        assert_eq!(session.state(), RecordState::Ready);
        assert!(!session.is_recording());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn init_rejects_invalid_options() {
        let mut session = AudioCaptureSession::new(ManualInput::new(8000.0, 1));
        let err = session
            .init(RecordOptions {
                bits_per_sample: 12,
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, RecordError::ConfigurationFailed(_)));
        assert_eq!(session.state(), RecordState::Uninitialized);
        assert!(session.file_path().is_none());
    }

    #[test]
    fn init_rejects_out_of_range_rate_before_allocating() {
        let mut session = AudioCaptureSession::new(ManualInput::new(8000.0, 1));
        let err = session
            .init(RecordOptions {
                sample_rate: 1_500_000_000,
                channels: 2,
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, RecordError::ConfigurationFailed(_)));
        assert_eq!(session.state(), RecordState::Uninitialized);
    }

    #[test]
    fn init_rejects_device_the_engine_does_not_have() {
        let mut session = AudioCaptureSession::new(ManualInput::new(8000.0, 1));
        let err = session
            .init(RecordOptions {
                device: Some("USB Mic".into()),
                ..Default::default()
            })
            .unwrap_err();

        assert!(matches!(err, RecordError::ConfigurationFailed(_)));
        assert_eq!(session.state(), RecordState::Uninitialized);
    }

    #[test]
    fn start_requires_init() {
        let mut session = AudioCaptureSession::new(ManualInput::new(8000.0, 1));
        assert_eq!(session.start().unwrap_err(), RecordError::NotInitialized);
        assert!(!session.is_recording());
    }

    #[test]
    fn stop_without_recording_is_none() {
        let mut session = AudioCaptureSession::new(ManualInput::new(8000.0, 1));
        assert_eq!(session.stop().unwrap(), None);
    }

    #[test]
    fn records_packets_after_skipping_leading_buffers() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("record");
        let input = ManualInput::new(8000.0, 1);
        let (mut session, delegate) = session_with_delegate(&input);
        session.init(options(&dir)).unwrap();

        session.start().unwrap();
        assert!(session.is_recording());
        assert!(input.is_started());
        assert_eq!(lease::active_owner(), Some(session.id()));

        // 42 frames: ten full 4-frame buffers plus a 2-frame remainder.
        input.feed(&[0.5; 20]);
        input.feed(&[0.5; 22]);

        let result = session.stop().unwrap().unwrap();
        assert!(!session.is_recording());
        assert!(!input.is_started());
        assert_eq!(session.state(), RecordState::Ready);
        assert_eq!(lease::active_owner(), None);

        // 8 full buffers + the flushed 2-frame tail, 2 bytes per frame
        assert_eq!(result.data_bytes, (8 * 4 + 2) * 2);
        assert_eq!(result.file_path, dir.join("take.wav"));
        assert!((result.duration_secs - 34.0 / 8000.0).abs() < 1e-9);

        let mut reader = hound::WavReader::open(&result.file_path).unwrap();
        assert_eq!(reader.spec().sample_rate, 8000);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples.len(), 34);
        assert!(samples.iter().all(|&s| s == (0.5 * i16::MAX as f32) as i16));

        let events = delegate.data.lock().clone();
        assert_eq!(events.len(), 9);
        assert_eq!(events[0].sequence, 2);
        assert_eq!(events[0].start_packet, 8);
        assert_eq!(events[8].frames, 2);

        let file = fs::read(&result.file_path).unwrap();
        let first = STANDARD.decode(&events[0].data).unwrap();
        assert_eq!(first.as_slice(), &file[44..52]);
        let streamed: usize = events.iter().map(|e| STANDARD.decode(&e.data).unwrap().len()).sum();
        assert_eq!(streamed as u64, result.data_bytes);

        let diagnostics = session.diagnostics();
        assert_eq!(diagnostics.packets_skipped, 2);
        assert_eq!(diagnostics.packets_written, 9);
        assert_eq!(diagnostics.input_format, "8000 Hz, 1 ch");

        assert_eq!(delegate.finished.lock().len(), 1);
        assert_eq!(
            *delegate.states.lock(),
            vec!["ready", "recording", "stopping", "completed"]
        );
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn converts_to_stereo_8bit_at_target_rate() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("stereo8");
        let input = ManualInput::new(16000.0, 1);
        let mut session = AudioCaptureSession::new(input.clone());
        session
            .init(RecordOptions {
                channels: 2,
                bits_per_sample: 8,
                buffer_frames: None,
                skip_leading_buffers: 0,
                ..options(&dir)
            })
            .unwrap();

        session.start().unwrap();
        input.feed(&[0.0; 1600]);
        let result = session.stop().unwrap().unwrap();

        // 1600 frames at 16 kHz → 800 frames at 8 kHz, 2 bytes per frame
        assert_eq!(result.data_bytes, 1600);
        let reader = hound::WavReader::open(&result.file_path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 2);
        assert_eq!(spec.bits_per_sample, 8);
        assert_eq!(spec.sample_rate, 8000);

        let file = fs::read(&result.file_path).unwrap();
        assert!(file[44..].iter().all(|&b| b == 128));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn start_twice_is_rejected() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("twice");
        let input = ManualInput::new(8000.0, 1);
        let mut session = AudioCaptureSession::new(input.clone());
        session.init(options(&dir)).unwrap();

        session.start().unwrap();
        assert_eq!(session.start().unwrap_err(), RecordError::AlreadyRecording);
        assert!(session.is_recording());
        assert_eq!(input.starts(), 1);

        session.stop().unwrap();
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn second_session_cannot_take_the_engine() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("exclusive");
        let mut first = AudioCaptureSession::new(ManualInput::new(8000.0, 1));
        let mut second = AudioCaptureSession::new(ManualInput::new(8000.0, 1));
        first.init(options(&dir)).unwrap();
        second
            .init(RecordOptions {
                wav_file: "other.wav".into(),
                ..options(&dir)
            })
            .unwrap();

        first.start().unwrap();
        assert_eq!(second.start().unwrap_err(), RecordError::EngineBusy);
        assert!(!second.is_recording());
        assert!(!dir.join("other.wav").exists());

        first.stop().unwrap();
        second.start().unwrap();
        assert!(second.is_recording());
        second.stop().unwrap();
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn engine_failure_rolls_back_start() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("failing");
        let input = ManualInput::new(8000.0, 1).failing();
        let (mut session, delegate) = session_with_delegate(&input);
        session.init(options(&dir)).unwrap();

        assert_eq!(session.start().unwrap_err(), RecordError::DeviceNotAvailable);

        assert!(!session.is_recording());
        assert_eq!(session.state(), RecordState::Ready);
        assert_eq!(lease::active_owner(), None);
        assert!(!dir.join("take.wav").exists());
        assert_eq!(*delegate.errors.lock(), vec![RecordError::DeviceNotAvailable]);
        assert!(delegate.states.lock().contains(&"failed"));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn unavailable_engine_is_reported() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("unavailable");
        let input = ManualInput::new(8000.0, 1).unavailable();
        let mut session = AudioCaptureSession::new(input.clone());
        session.init(options(&dir)).unwrap();

        assert_eq!(session.start().unwrap_err(), RecordError::DeviceNotAvailable);
        assert_eq!(input.starts(), 0);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn cleanup_discards_unfinished_recording() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("cleanup");
        let input = ManualInput::new(8000.0, 1);
        let mut session = AudioCaptureSession::new(input.clone());
        session.init(options(&dir)).unwrap();
        session.start().unwrap();
        input.feed(&[0.25; 64]);

        session.cleanup();

        assert!(!session.is_recording());
        assert!(!input.is_started());
        assert_eq!(session.state(), RecordState::Uninitialized);
        assert!(session.file_path().is_none());
        assert!(!dir.join("take.wav").exists());
        assert_eq!(lease::active_owner(), None);
        assert_eq!(session.start().unwrap_err(), RecordError::NotInitialized);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn reinit_while_recording_resets_session() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("reinit");
        let input = ManualInput::new(8000.0, 1);
        let mut session = AudioCaptureSession::new(input.clone());
        session.init(options(&dir)).unwrap();
        session.start().unwrap();

        session
            .init(RecordOptions {
                wav_file: "second.wav".into(),
                ..options(&dir)
            })
            .unwrap();

        assert!(!session.is_recording());
        assert_eq!(session.state(), RecordState::Ready);
        assert_eq!(session.file_path(), Some(dir.join("second.wav").as_path()));
        assert!(!dir.join("take.wav").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn can_record_again_after_stop() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("again");
        let input = ManualInput::new(8000.0, 1);
        let mut session = AudioCaptureSession::new(input.clone());
        session
            .init(RecordOptions {
                skip_leading_buffers: 0,
                ..options(&dir)
            })
            .unwrap();

        session.start().unwrap();
        input.feed(&[0.1; 8]);
        let first = session.stop().unwrap().unwrap();
        assert_eq!(first.data_bytes, 16);

        session.start().unwrap();
        input.feed(&[0.1; 4]);
        let second = session.stop().unwrap().unwrap();
        assert_eq!(second.data_bytes, 8);
        assert_ne!(first.metadata.id, second.metadata.id);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn writes_metadata_sidecar_on_request() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("sidecar");
        let input = ManualInput::new(8000.0, 1);
        let mut session = AudioCaptureSession::new(input.clone());
        session
            .init(RecordOptions {
                write_metadata: true,
                skip_leading_buffers: 0,
                ..options(&dir)
            })
            .unwrap();

        session.start().unwrap();
        input.feed(&[0.0; 16]);
        let result = session.stop().unwrap().unwrap();

        let metadata = read_metadata(&result.file_path).unwrap();
        assert_eq!(metadata, result.metadata);
        assert_eq!(metadata.device.as_deref(), Some("Manual Input"));
        assert_eq!(metadata.checksum, result.checksum);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn metadata_names_the_engine_device() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("device");
        let input = ManualInput::new(8000.0, 1);
        let mut session = AudioCaptureSession::new(input.clone());
        session
            .init(RecordOptions {
                device: Some("Manual Input".into()),
                ..options(&dir)
            })
            .unwrap();

        session.start().unwrap();
        input.feed(&[0.0; 16]);
        let result = session.stop().unwrap().unwrap();

        assert_eq!(result.metadata.device.as_deref(), Some(session.engine().device_info().name.as_str()));
        assert_eq!(result.metadata.device.as_deref(), Some("Manual Input"));
        fs::remove_dir_all(&dir).ok();
    }

    fn wait_until(mut done: impl FnMut() -> bool) -> bool {
        for _ in 0..200 {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        done()
    }

    #[test]
    fn write_failure_is_reported_and_recording_continues() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("write_error");
        let input = ManualInput::new(8000.0, 1);
        let (mut session, delegate) = session_with_delegate(&input);
        session
            .init(RecordOptions {
                skip_leading_buffers: 0,
                ..options(&dir)
            })
            .unwrap();
        session.start().unwrap();

        // Swap in a writer whose file was never opened.
        let path = dir.join("take.wav");
        let format = session.options().unwrap().format();
        let healthy = session.audio_file.lock().replace(WavFileWriter::new(path.clone(), format));
        drop(healthy);

        input.feed(&[0.5; 4]);
        assert!(wait_until(|| delegate.errors.lock().len() == 1));
        assert!(matches!(delegate.errors.lock()[0], RecordError::StorageError(_)));
        assert_eq!(session.diagnostics().write_errors, 1);
        assert!(delegate.data.lock().is_empty());
        assert!(session.is_recording());

        let mut writer = WavFileWriter::new(path.clone(), format);
        writer.open().unwrap();
        *session.audio_file.lock() = Some(writer);

        input.feed(&[0.5; 4]);
        let result = session.stop().unwrap().unwrap();

        assert_eq!(result.data_bytes, 8);
        assert_eq!(delegate.errors.lock().len(), 1);
        assert_eq!(delegate.data.lock()[0].sequence, 1);
        assert_eq!(session.diagnostics().packets_written, 1);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn ring_overflow_drops_oldest_input() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("overflow");
        let input = ManualInput::new(8000.0, 1);
        let mut session = AudioCaptureSession::new(input.clone());
        session
            .init(RecordOptions {
                buffer_frames: Some(400),
                ..options(&dir)
            })
            .unwrap();
        session.start().unwrap();

        // Five seconds of ring at 8 kHz mono, plus 1000 samples too many.
        input.feed(&vec![0.25; 8000 * 5 + 1000]);
        assert_eq!(session.diagnostics().dropped_samples, 1000);

        let result = session.stop().unwrap().unwrap();
        assert_eq!(result.data_bytes, (40_000 - 2 * 400) * 2);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn dropping_a_recording_session_releases_the_engine() {
        let _serial = test_support::serial();
        let dir = test_support::temp_dir("drop");
        let input = ManualInput::new(8000.0, 1);
        {
            let mut session = AudioCaptureSession::new(input.clone());
            session.init(options(&dir)).unwrap();
            session.start().unwrap();
        }
        assert!(!input.is_started());
        assert_eq!(lease::active_owner(), None);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn records_through_trait_object_with_tone_input() {
        use crate::providers::tone::ToneInput;

        let _serial = test_support::serial();
        let dir = test_support::temp_dir("tone");
        let mut session: Box<dyn RecordSession> =
            Box::new(AudioCaptureSession::new(ToneInput::new(440.0, 8000.0, 1)));
        session
            .init(RecordOptions {
                buffer_frames: Some(80),
                ..options(&dir)
            })
            .unwrap();

        session.start().unwrap();
        thread::sleep(Duration::from_millis(150));
        assert!(session.current_levels().peak_level > 0.0);
        let result = session.stop().unwrap().unwrap();

        assert!(result.data_bytes > 0);
        assert_eq!(result.data_bytes % 2, 0);
        assert!(!session.is_recording());
        fs::remove_dir_all(&dir).ok();
    }
}
