use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use audio_record_core::{AudioDataEvent, AudioLevels, RecordDelegate, RecordError, RecordState, RecordingResult};

/// Delegate that reports session events on the terminal.
///
/// Data events go to stdout as JSON lines when `print_events` is set;
/// everything else goes through the logger.
pub struct ConsoleDelegate {
    print_events: bool,
    packets: AtomicU64,
}

impl ConsoleDelegate {
    pub fn new(print_events: bool) -> Arc<Self> {
        Arc::new(Self {
            print_events,
            packets: AtomicU64::new(0),
        })
    }

    pub fn packets(&self) -> u64 {
        self.packets.load(Ordering::Relaxed)
    }
}

impl RecordDelegate for ConsoleDelegate {
    fn on_state_changed(&self, state: &RecordState) {
        log::info!("state: {}", state.name());
    }

    fn on_data(&self, event: &AudioDataEvent) {
        self.packets.fetch_add(1, Ordering::Relaxed);
        if self.print_events {
            match serde_json::to_string(event) {
                Ok(line) => {
                    let mut out = std::io::stdout().lock();
                    let _ = writeln!(out, "{}", line);
                }
                Err(e) => log::error!("failed to serialize data event: {}", e),
            }
        }
    }

    fn on_levels_updated(&self, levels: &AudioLevels) {
        log::debug!("level {:.3} peak {:.3}", levels.level, levels.peak_level);
    }

    fn on_error(&self, error: &RecordError) {
        log::error!("{}", error);
    }

    fn on_recording_finished(&self, result: &RecordingResult) {
        log::info!(
            "saved {} ({:.2}s, {} bytes)",
            result.file_path.display(),
            result.duration_secs,
            result.data_bytes
        );
    }
}
