//! Layering of recording options: defaults, then an optional JSON document,
//! then explicit command-line flags.

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Args;

use audio_record_core::RecordOptions;

#[derive(Args, Debug, Default, Clone)]
pub struct RecordArgs {
    /// Options as JSON (`{"sampleRate": 16000}`) or `@path/to/options.json`
    #[arg(long)]
    pub options: Option<String>,

    /// Output sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,

    /// Output channel count (1 or 2)
    #[arg(long)]
    pub channels: Option<u16>,

    /// Bits per sample (8 or 16)
    #[arg(long)]
    pub bits: Option<u16>,

    /// WAV file name
    #[arg(short, long)]
    pub file: Option<String>,

    /// Output directory (default: Documents/audio-record)
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Input device name (see `devices`)
    #[arg(long)]
    pub device: Option<String>,

    /// Stop after this many seconds instead of waiting for Enter
    #[arg(short, long)]
    pub seconds: Option<f64>,

    /// Record a synthetic sine tone of this frequency instead of a microphone
    #[arg(long)]
    pub tone: Option<f64>,

    /// Print every data event as a JSON line on stdout
    #[arg(long)]
    pub events: bool,

    /// Write a .metadata.json sidecar next to the recording
    #[arg(long)]
    pub metadata: bool,
}

/// Directory used when neither the options document nor `--dir` names one.
pub fn default_output_dir() -> PathBuf {
    dirs_next::document_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("audio-record")
}

pub fn resolve_options(args: &RecordArgs) -> Result<RecordOptions> {
    let mut options = match args.options.as_deref() {
        Some(source) => {
            let json = match source.strip_prefix('@') {
                Some(path) => fs::read_to_string(path).with_context(|| format!("reading options file {}", path))?,
                None => source.to_string(),
            };
            RecordOptions::from_json(&json)?
        }
        None => RecordOptions::default(),
    };

    if let Some(rate) = args.sample_rate {
        options.sample_rate = rate;
    }
    if let Some(channels) = args.channels {
        options.channels = channels;
    }
    if let Some(bits) = args.bits {
        options.bits_per_sample = bits;
    }
    if let Some(ref file) = args.file {
        options.wav_file = file.clone();
    }
    if let Some(ref device) = args.device {
        options.device = Some(device.clone());
    }
    if args.metadata {
        options.write_metadata = true;
    }
    match args.dir {
        Some(ref dir) => options.output_directory = dir.clone(),
        None if options.output_directory == PathBuf::from(".") => {
            options.output_directory = default_output_dir();
        }
        None => {}
    }

    options
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid options: {}", e))?;
    Ok(options)
}

/// Recording length from `--seconds`, which must be finite and not negative.
pub fn record_duration(seconds: f64) -> Result<Duration> {
    match Duration::try_from_secs_f64(seconds) {
        Ok(duration) => Ok(duration),
        Err(_) => bail!("--seconds must be a non-negative number of seconds, got {}", seconds),
    }
}
