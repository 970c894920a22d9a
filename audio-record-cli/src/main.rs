mod console;
mod options;

use std::io::BufRead;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use audio_record_core::{AudioCaptureSession, CaptureProvider, ToneInput};
use audio_record_cpal::{permissions, CpalMicInput, DeviceEnumerator};

use console::ConsoleDelegate;
use options::RecordArgs;

type Session = AudioCaptureSession<Box<dyn CaptureProvider>>;

#[derive(Parser, Debug)]
#[command(name = "audio-record", version, about = "Record microphone input to a WAV file")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List input devices
    Devices,
    /// Check whether the default microphone can be opened
    Probe,
    /// Record until Enter is pressed or --seconds elapse
    Record(RecordArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Command::Devices => list_devices(),
        Command::Probe => probe(),
        Command::Record(args) => record(args),
    }
}

fn list_devices() -> Result<()> {
    let enumerator = DeviceEnumerator::new();
    let devices = enumerator.list_input_devices()?;

    println!("Host: {}", enumerator.host_name());
    if devices.is_empty() {
        println!("No input devices found");
    }
    for device in devices {
        let marker = if device.is_default { "*" } else { " " };
        println!("{} {}", marker, device.name);
    }
    Ok(())
}

fn probe() -> Result<()> {
    if permissions::check_microphone_access()? {
        println!("Microphone access: granted");
        Ok(())
    } else {
        bail!("microphone is unavailable or access is blocked")
    }
}

fn record(args: RecordArgs) -> Result<()> {
    let options = options::resolve_options(&args)?;
    let duration = args.seconds.map(options::record_duration).transpose()?;

    let engine: Box<dyn CaptureProvider> = match args.tone {
        Some(frequency) => Box::new(ToneInput::new(frequency, options.sample_rate as f64, options.channels)),
        None => Box::new(CpalMicInput::default_device()),
    };

    let delegate = ConsoleDelegate::new(args.events);
    let mut session: Session = AudioCaptureSession::new(engine);
    session.set_delegate(delegate.clone());

    session.init(options).context("initializing session")?;
    session.start().context("starting recording")?;
    log::info!("Recording from {}", session.engine().device_info().name);

    match duration {
        Some(duration) => {
            log::info!("Recording for {:.1}s", duration.as_secs_f64());
            wait_for_enter(Some(duration));
        }
        None => {
            eprintln!("Recording... press Enter to stop");
            wait_for_enter(None);
        }
    }

    let result = session.stop().context("stopping recording")?;
    let Some(result) = result else {
        bail!("session was not recording");
    };

    let diagnostics = session.diagnostics();
    log::debug!("{}", serde_json::to_string(&diagnostics)?);
    log::info!("{} data packets delivered", delegate.packets());

    println!("{}", serde_json::to_string_pretty(&result.metadata)?);
    Ok(())
}

/// Block until a line arrives on stdin, or until `timeout` elapses.
fn wait_for_enter(timeout: Option<Duration>) {
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new().name("stdin-reader".into()).spawn(move || {
        let mut line = String::new();
        let _ = std::io::stdin().lock().read_line(&mut line);
        let _ = tx.send(());
    });
    if let Err(e) = spawned {
        log::warn!("Cannot read stdin: {}", e);
        if let Some(timeout) = timeout {
            thread::sleep(timeout);
        }
        return;
    }

    match timeout {
        Some(timeout) => {
            let _ = rx.recv_timeout(timeout);
        }
        None => {
            let _ = rx.recv();
        }
    }
}
