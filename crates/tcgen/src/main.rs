use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tcgen_core::{
    ConfigManager, DestinationConfig, Framerate, GeneratorCommand, GeneratorEvent,
    OscTransport, PlaybackState, Settings, TimecodeGenerator, MAX_TICK_RATE_HZ,
};
use tokio::sync::mpsc;

mod terminal;

/// Generate SMPTE timecode and stream it to an OSC receiver.
#[derive(Parser, Debug)]
#[command(name = "tcgen")]
#[command(about = "OSC timecode generator")]
struct Args {
    /// OSC receiver host name or IP address (default: 127.0.0.1)
    #[arg(long)]
    host: Option<String>,

    /// OSC receiver UDP port (default: 9001)
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..))]
    port: Option<u16>,

    /// OSC address the timecode is sent to (default: /timecode)
    #[arg(long)]
    address: Option<String>,

    /// Framerate: 30, 29.97 (drop-frame), 25, 24 or 23.976 (default: 30)
    #[arg(short, long, value_parser = parse_framerate)]
    framerate: Option<Framerate>,

    /// Playback speed in percent, 0-200 (default: 100)
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(0..=200))]
    speed: Option<u16>,

    /// Start offset as HH:MM:SS:FF, applied on reset (default: 00:00:00:00)
    #[arg(short, long)]
    offset: Option<String>,

    /// Messages per second, 0-240; 0 sends once per frame
    #[arg(long, value_parser = clap::value_parser!(u32).range(0..=MAX_TICK_RATE_HZ as i64))]
    tick_rate: Option<u32>,

    /// Load settings from this JSON file (created with defaults if missing)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective settings back to the config file
    #[arg(long, default_value = "false")]
    save_config: bool,

    /// Run without keyboard controls; starts playing immediately
    #[arg(long, default_value = "false")]
    headless: bool,

    /// Start playing as soon as the generator is up
    #[arg(long, default_value = "false")]
    autoplay: bool,
}

fn parse_framerate(s: &str) -> Result<Framerate, String> {
    s.parse().map_err(|e| format!("{}", e))
}

impl Args {
    fn apply_to(&self, settings: &mut Settings) {
        if let Some(host) = &self.host {
            settings.host = host.clone();
        }
        if let Some(port) = self.port {
            settings.port = port;
        }
        if let Some(address) = &self.address {
            settings.osc_address = address.clone();
        }
        if let Some(framerate) = self.framerate {
            settings.framerate = framerate;
        }
        if let Some(speed) = self.speed {
            settings.speed_percent = speed;
        }
        if let Some(offset) = &self.offset {
            settings.start_offset = offset.clone();
        }
        if let Some(tick_rate) = self.tick_rate {
            settings.tick_rate_hz = tick_rate;
        }
    }
}

fn load_settings(args: &Args) -> Result<Settings, anyhow::Error> {
    let mut manager = args
        .config
        .as_ref()
        .map(|path| ConfigManager::new(Some(path.clone())));

    let mut settings = match manager.as_mut() {
        Some(manager) => manager
            .load()
            .with_context(|| format!("loading {}", manager.config_path().display()))?,
        None => Settings::default(),
    };
    args.apply_to(&mut settings);

    ConfigManager::validate_settings(&settings)
        .map_err(|errors| anyhow::anyhow!("Invalid settings: {}", errors.join(", ")))?;

    if args.save_config {
        let manager = manager.get_or_insert_with(|| ConfigManager::new(None));
        manager.update_settings(settings.clone())?;
    }

    Ok(settings)
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let settings = load_settings(&args)?;

    log::info!(
        "Sending {} fps timecode to {}",
        settings.framerate,
        settings.destination()
    );

    let generator = TimecodeGenerator::new(&settings, OscTransport::new())?;

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let generator_handle = tokio::spawn(generator.run(command_rx, event_tx));

    if args.headless || args.autoplay {
        command_tx.send(GeneratorCommand::Play)?;
    }

    if args.headless {
        run_headless(command_tx, event_rx).await;
    } else {
        run_interactive(command_tx, event_rx).await?;
    }

    generator_handle.await??;
    Ok(())
}

async fn run_headless(
    command_tx: mpsc::UnboundedSender<GeneratorCommand>,
    mut event_rx: mpsc::UnboundedReceiver<GeneratorEvent>,
) {
    let shutdown_tx = command_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
        }
        let _ = shutdown_tx.send(GeneratorCommand::Shutdown);
    });

    while let Some(event) = event_rx.recv().await {
        match event {
            GeneratorEvent::Timecode { timecode, .. } => log::trace!("{}", timecode),
            GeneratorEvent::Error { message } => log::error!("{}", message),
            GeneratorEvent::StateChanged { .. } => {}
            GeneratorEvent::ShutdownComplete => break,
        }
    }
}

async fn run_interactive(
    command_tx: mpsc::UnboundedSender<GeneratorCommand>,
    mut event_rx: mpsc::UnboundedReceiver<GeneratorEvent>,
) -> Result<(), anyhow::Error> {
    println!("{}", terminal::HELP);

    let guard = terminal::RawModeGuard::enable().context("enabling raw terminal mode")?;
    let prompting = Arc::new(AtomicBool::new(false));
    let key_reader = terminal::spawn_key_reader(command_tx, prompting.clone());

    let mut view: Option<(PlaybackState, DestinationConfig, bool)> = None;

    while let Some(event) = event_rx.recv().await {
        match event {
            GeneratorEvent::Timecode {
                timecode,
                position_frames,
            } => {
                if let Some((state, destination, connected)) = view.as_mut() {
                    state.position_frames = position_frames;
                    if prompting.load(Ordering::SeqCst) {
                        continue;
                    }
                    terminal::redraw(&terminal::status_line(
                        &timecode,
                        state,
                        destination,
                        *connected,
                    ))?;
                }
            }
            GeneratorEvent::StateChanged {
                state,
                destination,
                connected,
                ..
            } => {
                if !prompting.load(Ordering::SeqCst) {
                    terminal::redraw(&terminal::status_line(
                        &state.timecode().to_string(),
                        &state,
                        &destination,
                        connected,
                    ))?;
                }
                view = Some((state, destination, connected));
            }
            GeneratorEvent::Error { message } => {
                terminal::redraw(&message)?;
                print!("\r\n");
            }
            GeneratorEvent::ShutdownComplete => break,
        }
    }

    drop(guard);
    println!();
    if key_reader.join().is_err() {
        log::error!("Key reader thread panicked");
    }
    Ok(())
}
