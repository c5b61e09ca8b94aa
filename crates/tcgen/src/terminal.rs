//! Terminal front end.
//!
//! Keys are read on a dedicated thread in raw mode and translated into
//! generator commands:
//!
//! ```text
//! Space      play / pause
//! p / s      play / pause (stop)
//! r          reset to start offset
//! + / -      speed +10% / -10%
//! 0          speed 100%
//! f          next framerate
//! F          enter a framerate
//! o          enter a start offset (applied on reset)
//! d          enter a destination as host:port/address
//! q / Esc    quit (Ctrl-C as well)
//! ```
//!
//! Prompt keys leave raw mode while a line is typed; the status line is not
//! redrawn until the prompt is answered. An empty line cancels.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use tcgen_core::{DestinationConfig, GeneratorCommand, PlaybackState};
use tokio::sync::mpsc;

/// Speed step for the +/- keys, in percent
const SPEED_STEP: i32 = 10;

/// How often the key thread checks whether the generator has gone away
const POLL_INTERVAL: Duration = Duration::from_millis(100);

pub const HELP: &str = "[space] play/pause  [r] reset  [+/-] speed  [0] 100%  [f/F] framerate  \
     [o] offset  [d] destination  [q] quit";

/// Values that are typed in rather than bound to a single key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    StartOffset,
    Destination,
    Framerate,
}

impl Prompt {
    pub fn label(&self) -> &'static str {
        match self {
            Prompt::StartOffset => "Start offset (HH:MM:SS:FF)",
            Prompt::Destination => "Destination (host:port/address)",
            Prompt::Framerate => "Framerate (30, 29.97, 25, 24, 23.976)",
        }
    }

    /// Turn an entered line into a command. `Ok(None)` means the prompt was
    /// cancelled. Values are checked by the generator, which reports
    /// rejected ones as error events.
    pub fn command(&self, input: &str) -> Result<Option<GeneratorCommand>, String> {
        let input = input.trim();
        if input.is_empty() {
            return Ok(None);
        }

        let command = match self {
            Prompt::StartOffset => GeneratorCommand::SetStartOffset {
                timecode: input.to_string(),
            },
            Prompt::Framerate => GeneratorCommand::SetFramerate {
                label: input.to_string(),
            },
            Prompt::Destination => parse_destination(input)?,
        };
        Ok(Some(command))
    }
}

/// Parse `host:port/address`. IPv6 hosts may be bracketed.
fn parse_destination(input: &str) -> Result<GeneratorCommand, String> {
    let (endpoint, address) = input
        .find('/')
        .map(|slash| input.split_at(slash))
        .ok_or_else(|| format!("Expected host:port/address, got '{}'", input))?;
    let (host, port) = endpoint
        .rsplit_once(':')
        .ok_or_else(|| format!("Expected host:port/address, got '{}'", input))?;
    let port: u16 = port
        .parse()
        .map_err(|_| format!("Invalid port '{}'", port))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    Ok(GeneratorCommand::SetDestination {
        host: host.to_string(),
        port,
        address: address.to_string(),
    })
}

/// Keys that open a prompt instead of sending a command directly.
pub fn prompt_for_key(key: &KeyEvent) -> Option<Prompt> {
    if key.kind == KeyEventKind::Release || key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }

    match key.code {
        KeyCode::Char('o') => Some(Prompt::StartOffset),
        KeyCode::Char('d') => Some(Prompt::Destination),
        KeyCode::Char('F') => Some(Prompt::Framerate),
        _ => None,
    }
}

/// Translate a key press into a generator command.
pub fn translate_key(key: &KeyEvent) -> Option<GeneratorCommand> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') | KeyCode::Char('d') => Some(GeneratorCommand::Shutdown),
            _ => None,
        };
    }

    match key.code {
        KeyCode::Char(' ') => Some(GeneratorCommand::TogglePlayback),
        KeyCode::Char('p') => Some(GeneratorCommand::Play),
        KeyCode::Char('s') => Some(GeneratorCommand::Pause),
        KeyCode::Char('r') => Some(GeneratorCommand::Reset),
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Up => {
            Some(GeneratorCommand::AdjustSpeed { delta: SPEED_STEP })
        }
        KeyCode::Char('-') | KeyCode::Down => Some(GeneratorCommand::AdjustSpeed {
            delta: -SPEED_STEP,
        }),
        KeyCode::Char('0') => Some(GeneratorCommand::SetSpeed { percent: 100 }),
        KeyCode::Char('f') => Some(GeneratorCommand::CycleFramerate),
        KeyCode::Char('q') | KeyCode::Esc => Some(GeneratorCommand::Shutdown),
        _ => None,
    }
}

/// Enables raw mode for as long as it lives.
pub struct RawModeGuard;

impl RawModeGuard {
    pub fn enable() -> io::Result<Self> {
        enable_raw_mode()?;
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            log::error!("Failed to restore terminal: {}", e);
        }
    }
}

/// Read one line in cooked mode, restoring raw mode afterwards.
fn read_prompt(prompt: Prompt) -> io::Result<String> {
    disable_raw_mode()?;
    let mut stdout = io::stdout();
    write!(stdout, "\r\x1b[2K{}: ", prompt.label())?;
    stdout.flush()?;

    let mut line = String::new();
    let read = io::stdin().read_line(&mut line);
    enable_raw_mode()?;
    read?;
    Ok(line)
}

/// Spawn the key reader. The thread exits after sending Shutdown or once the
/// command channel is closed. `prompting` is set while a prompt is open.
pub fn spawn_key_reader(
    commands: mpsc::UnboundedSender<GeneratorCommand>,
    prompting: Arc<AtomicBool>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        if commands.is_closed() {
            break;
        }

        match event::poll(POLL_INTERVAL) {
            Ok(true) => {}
            Ok(false) => continue,
            Err(e) => {
                log::error!("Failed to poll terminal events: {}", e);
                let _ = commands.send(GeneratorCommand::Shutdown);
                break;
            }
        }

        let key = match event::read() {
            Ok(Event::Key(key)) => key,
            Ok(_) => continue,
            Err(e) => {
                log::error!("Failed to read terminal event: {}", e);
                let _ = commands.send(GeneratorCommand::Shutdown);
                break;
            }
        };

        if let Some(prompt) = prompt_for_key(&key) {
            prompting.store(true, Ordering::SeqCst);
            let entered = read_prompt(prompt);
            prompting.store(false, Ordering::SeqCst);

            match entered.map(|line| prompt.command(&line)) {
                Ok(Ok(Some(command))) => {
                    if commands.send(command).is_err() {
                        break;
                    }
                }
                Ok(Ok(None)) => {}
                Ok(Err(message)) => {
                    let _ = redraw(&message);
                    print!("\r\n");
                }
                Err(e) => log::error!("Failed to read {}: {}", prompt.label(), e),
            }
            continue;
        }

        if let Some(command) = translate_key(&key) {
            let quit = command == GeneratorCommand::Shutdown;
            if commands.send(command).is_err() || quit {
                break;
            }
        }
    })
}

/// One-line summary of the generator, redrawn in place.
pub fn status_line(
    timecode: &str,
    state: &PlaybackState,
    destination: &DestinationConfig,
    connected: bool,
) -> String {
    let drop_frame = if state.framerate.is_drop_frame() {
        " DF"
    } else {
        ""
    };
    format!(
        "{} {}  {}{} fps  {:>3}%  -> {}{}",
        if state.running { "PLAY " } else { "PAUSE" },
        timecode,
        state.framerate,
        drop_frame,
        state.speed_percent,
        destination,
        if connected { "" } else { " (not connected)" },
    )
}

/// Overwrite the current terminal line.
pub fn redraw(line: &str) -> io::Result<()> {
    let mut stdout = io::stdout();
    write!(stdout, "\r\x1b[2K{}", line)?;
    stdout.flush()
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyEventState;
    use tcgen_core::Framerate;

    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_transport_keys() {
        assert_eq!(
            translate_key(&press(KeyCode::Char(' '))),
            Some(GeneratorCommand::TogglePlayback)
        );
        assert_eq!(
            translate_key(&press(KeyCode::Char('p'))),
            Some(GeneratorCommand::Play)
        );
        assert_eq!(
            translate_key(&press(KeyCode::Char('s'))),
            Some(GeneratorCommand::Pause)
        );
        assert_eq!(
            translate_key(&press(KeyCode::Char('r'))),
            Some(GeneratorCommand::Reset)
        );
    }

    #[test]
    fn test_speed_keys() {
        assert_eq!(
            translate_key(&press(KeyCode::Char('+'))),
            Some(GeneratorCommand::AdjustSpeed { delta: 10 })
        );
        assert_eq!(
            translate_key(&press(KeyCode::Down)),
            Some(GeneratorCommand::AdjustSpeed { delta: -10 })
        );
        assert_eq!(
            translate_key(&press(KeyCode::Char('0'))),
            Some(GeneratorCommand::SetSpeed { percent: 100 })
        );
    }

    #[test]
    fn test_quit_keys() {
        assert_eq!(
            translate_key(&press(KeyCode::Char('q'))),
            Some(GeneratorCommand::Shutdown)
        );
        assert_eq!(
            translate_key(&press(KeyCode::Esc)),
            Some(GeneratorCommand::Shutdown)
        );
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(translate_key(&ctrl_c), Some(GeneratorCommand::Shutdown));
    }

    #[test]
    fn test_ignored_keys() {
        assert_eq!(translate_key(&press(KeyCode::Char('x'))), None);
        let ctrl_r = KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL);
        assert_eq!(translate_key(&ctrl_r), None);

        let release = KeyEvent {
            code: KeyCode::Char('p'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(translate_key(&release), None);
    }

    #[test]
    fn test_prompt_keys() {
        assert_eq!(
            prompt_for_key(&press(KeyCode::Char('o'))),
            Some(Prompt::StartOffset)
        );
        assert_eq!(
            prompt_for_key(&press(KeyCode::Char('d'))),
            Some(Prompt::Destination)
        );
        let shift_f = KeyEvent::new(KeyCode::Char('F'), KeyModifiers::SHIFT);
        assert_eq!(prompt_for_key(&shift_f), Some(Prompt::Framerate));

        // lower-case f cycles, it never prompts
        assert_eq!(prompt_for_key(&press(KeyCode::Char('f'))), None);
        let ctrl_d = KeyEvent::new(KeyCode::Char('d'), KeyModifiers::CONTROL);
        assert_eq!(prompt_for_key(&ctrl_d), None);
        assert_eq!(translate_key(&ctrl_d), Some(GeneratorCommand::Shutdown));

        // prompt keys send nothing on their own
        for c in ['o', 'd', 'F'] {
            assert_eq!(translate_key(&press(KeyCode::Char(c))), None);
        }
    }

    #[test]
    fn test_offset_prompt() {
        assert_eq!(
            Prompt::StartOffset.command("01:00:00:00\n"),
            Ok(Some(GeneratorCommand::SetStartOffset {
                timecode: "01:00:00:00".to_string()
            }))
        );
        // malformed offsets are left for the generator to reject
        assert_eq!(
            Prompt::StartOffset.command("garbage"),
            Ok(Some(GeneratorCommand::SetStartOffset {
                timecode: "garbage".to_string()
            }))
        );
        assert_eq!(Prompt::StartOffset.command("  \n"), Ok(None));
    }

    #[test]
    fn test_framerate_prompt() {
        assert_eq!(
            Prompt::Framerate.command("29.97\n"),
            Ok(Some(GeneratorCommand::SetFramerate {
                label: "29.97".to_string()
            }))
        );
    }

    #[test]
    fn test_destination_prompt() {
        assert_eq!(
            Prompt::Destination.command("10.0.0.5:53000/show/timecode\n"),
            Ok(Some(GeneratorCommand::SetDestination {
                host: "10.0.0.5".to_string(),
                port: 53000,
                address: "/show/timecode".to_string(),
            }))
        );
        assert_eq!(
            Prompt::Destination.command("[::1]:9001/tc"),
            Ok(Some(GeneratorCommand::SetDestination {
                host: "::1".to_string(),
                port: 9001,
                address: "/tc".to_string(),
            }))
        );
        assert!(Prompt::Destination.command("localhost:9001").is_err());
        assert!(Prompt::Destination.command("localhost/tc").is_err());
        assert!(Prompt::Destination.command("localhost:99999/tc").is_err());
        assert_eq!(Prompt::Destination.command(""), Ok(None));
    }

    #[test]
    fn test_status_line() {
        let state = PlaybackState {
            position_frames: 17_982,
            speed_percent: 50,
            running: true,
            start_offset_frames: 0,
            framerate: Framerate::Fps29_97Drop,
        };
        let line = status_line("00:10:00:00", &state, &DestinationConfig::default(), true);
        assert_eq!(
            line,
            "PLAY  00:10:00:00  29.97 DF fps   50%  -> 127.0.0.1:9001/timecode"
        );

        let paused = PlaybackState {
            running: false,
            ..state
        };
        let line = status_line("00:10:00:00", &paused, &DestinationConfig::default(), false);
        assert!(line.starts_with("PAUSE"));
        assert!(line.ends_with("(not connected)"));
    }
}
