use tokio::sync::mpsc;
use tokio::time::{interval, Duration, Instant, Interval, MissedTickBehavior};

use crate::error::{GeneratorError, TimecodeError, TransportError};
use crate::messages::{GeneratorCommand, GeneratorEvent, Settings, MAX_TICK_RATE_HZ};
use crate::osc::{DestinationConfig, OscTarget, Transport};
use crate::timecode::{Framerate, PlaybackState, TimeCode, TimecodeClock, MAX_SPEED_PERCENT};

/// Result of one tick: the timecode that was rendered and what happened
/// when it was sent.
#[derive(Debug)]
pub struct Tick {
    pub timecode: TimeCode,
    pub position_frames: u64,
    pub send_result: Result<(), TransportError>,
}

/// Owns the clock and the output, and maps commands onto them.
///
/// All state lives here and is only touched by the task that owns the
/// generator, so no locking is needed.
pub struct TimecodeGenerator<T: Transport> {
    clock: TimecodeClock,
    start_offset: TimeCode,
    destination: DestinationConfig,
    target: Option<OscTarget>,
    transport: T,
    tick_rate_hz: u32,
    send_failures: u64,
}

impl<T: Transport> TimecodeGenerator<T> {
    /// Build a generator from validated settings. A destination that cannot
    /// be resolved is logged and left unset; Play is refused until one is set.
    pub fn new(settings: &Settings, transport: T) -> Result<Self, GeneratorError> {
        if settings.tick_rate_hz > MAX_TICK_RATE_HZ {
            return Err(TimecodeError::InvalidParameter(format!(
                "tick rate must be between 0 and {} Hz, got {}",
                MAX_TICK_RATE_HZ, settings.tick_rate_hz
            ))
            .into());
        }

        let mut clock = TimecodeClock::new(settings.framerate);
        clock.set_speed(settings.speed_percent)?;

        let start_offset: TimeCode = settings.start_offset.parse()?;
        let offset_frames = start_offset.to_frames(settings.framerate)?;
        clock.reset(offset_frames);

        let destination = settings.destination();
        let target = match destination.resolve() {
            Ok(target) => Some(target),
            Err(e) => {
                log::warn!("OSC destination {} unavailable: {}", destination, e);
                None
            }
        };

        Ok(Self {
            clock,
            start_offset,
            destination,
            target,
            transport,
            tick_rate_hz: settings.tick_rate_hz,
            send_failures: 0,
        })
    }

    pub fn state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn timecode(&self) -> TimeCode {
        self.clock.timecode()
    }

    pub fn start_offset(&self) -> TimeCode {
        self.start_offset
    }

    pub fn destination(&self) -> &DestinationConfig {
        &self.destination
    }

    pub fn target(&self) -> Option<&OscTarget> {
        self.target.as_ref()
    }

    pub fn send_failures(&self) -> u64 {
        self.send_failures
    }

    /// Interval between ticks: the explicit tick rate, or one frame.
    pub fn tick_period(&self) -> Duration {
        if self.tick_rate_hz > 0 {
            Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
        } else {
            Duration::from_secs_f64(1.0 / self.clock.framerate().fps())
        }
    }

    /// Apply a command. Errors leave the state as it was before the command.
    pub fn handle_command(&mut self, command: GeneratorCommand) -> Result<(), GeneratorError> {
        match command {
            GeneratorCommand::Play => self.play()?,
            GeneratorCommand::Pause => self.pause(),
            GeneratorCommand::TogglePlayback => {
                if self.clock.is_running() {
                    self.pause();
                } else {
                    self.play()?;
                }
            }
            GeneratorCommand::Reset => self.reset(),
            GeneratorCommand::SetSpeed { percent } => {
                self.clock.set_speed(percent)?;
                log::info!("Speed set to {}%", percent);
            }
            GeneratorCommand::AdjustSpeed { delta } => {
                let percent = (self.clock.speed() as i32)
                    .saturating_add(delta)
                    .clamp(0, MAX_SPEED_PERCENT as i32);
                self.clock.set_speed(percent as u16)?;
                log::info!("Speed set to {}%", percent);
            }
            GeneratorCommand::SetFramerate { label } => {
                let framerate: Framerate = label.parse()?;
                self.change_framerate(framerate);
            }
            GeneratorCommand::CycleFramerate => {
                let framerate = self.clock.framerate().next();
                self.change_framerate(framerate);
            }
            GeneratorCommand::SetStartOffset { timecode } => self.set_start_offset(&timecode)?,
            GeneratorCommand::SetDestination {
                host,
                port,
                address,
            } => self.set_destination(DestinationConfig::new(host, port, address))?,
            GeneratorCommand::QueryState | GeneratorCommand::Shutdown => {}
        }
        Ok(())
    }

    fn play(&mut self) -> Result<(), GeneratorError> {
        if self.target.is_none() {
            return Err(GeneratorError::NotReady(format!(
                "OSC destination {} is not configured",
                self.destination
            )));
        }
        if !self.clock.is_running() {
            self.clock.play();
            log::info!("Playing from {}", self.clock.timecode());
        }
        Ok(())
    }

    fn pause(&mut self) {
        if self.clock.is_running() {
            self.clock.pause();
            log::info!("Paused at {}", self.clock.timecode());
        }
    }

    /// Return to the start offset, pause and announce the position once.
    fn reset(&mut self) {
        let offset_frames = self
            .start_offset
            .to_frames(self.clock.framerate())
            .unwrap_or(0);
        self.clock.reset(offset_frames);

        let timecode = self.clock.timecode();
        log::info!("Reset to {}", timecode);
        if let Err(e) = self.send(&timecode) {
            log::warn!("Failed to send reset timecode: {}", e);
        }
    }

    fn set_start_offset(&mut self, text: &str) -> Result<(), TimecodeError> {
        let timecode: TimeCode = text.parse()?;
        timecode.to_frames(self.clock.framerate())?;
        self.start_offset = timecode;
        log::info!("Start offset set to {} (applied on reset)", timecode);
        Ok(())
    }

    /// Switching rate pauses and resets, with the offset re-read at the new
    /// rate. An offset the new rate cannot show falls back to zero.
    fn change_framerate(&mut self, framerate: Framerate) {
        self.clock.pause();
        self.clock.set_framerate(framerate);

        if let Err(e) = self.start_offset.to_frames(framerate) {
            log::warn!("Start offset unusable at {} fps, using 00:00:00:00: {}", framerate, e);
            self.start_offset = TimeCode::default();
        }

        log::info!("Framerate set to {}", framerate);
        self.reset();
    }

    fn set_destination(&mut self, destination: DestinationConfig) -> Result<(), TransportError> {
        let target = destination.resolve()?;
        log::info!("Sending to {} ({})", destination, target.addr);
        self.destination = destination;
        self.target = Some(target);
        Ok(())
    }

    fn send(&mut self, timecode: &TimeCode) -> Result<(), TransportError> {
        let Some(target) = &self.target else {
            return Ok(());
        };
        let result = self.transport.send(target, &timecode.to_string());
        if result.is_err() {
            self.send_failures += 1;
        }
        result
    }

    /// Advance by `elapsed` and send the result. Returns `None` while paused.
    /// Transport errors are reported in the returned [`Tick`] and never stop
    /// the clock.
    pub fn tick(&mut self, elapsed: Duration) -> Option<Tick> {
        if !self.clock.is_running() {
            return None;
        }

        self.clock.advance(elapsed);
        let timecode = self.clock.timecode();
        let send_result = self.send(&timecode);

        Some(Tick {
            timecode,
            position_frames: self.clock.position(),
            send_result,
        })
    }

    fn state_event(&self) -> GeneratorEvent {
        GeneratorEvent::StateChanged {
            state: self.clock.state(),
            start_offset: self.start_offset.to_string(),
            destination: self.destination.clone(),
            connected: self.target.is_some(),
        }
    }

    /// Drive the generator until a Shutdown command arrives or the command
    /// channel closes.
    pub async fn run(
        mut self,
        mut rx: mpsc::UnboundedReceiver<GeneratorCommand>,
        tx: mpsc::UnboundedSender<GeneratorEvent>,
    ) -> Result<(), GeneratorError> {
        log::info!(
            "Timecode generator started at {} fps, sending to {}",
            self.clock.framerate(),
            self.destination
        );

        let _ = tx.send(self.state_event());

        let mut period = self.tick_period();
        let mut tick_interval = Self::tick_interval(period);
        let mut last_tick = Instant::now();

        // Status reporting interval (every second)
        let mut status_interval = interval(Duration::from_secs(1));

        loop {
            tokio::select! {
                command = rx.recv() => {
                    let command = match command {
                        Some(GeneratorCommand::Shutdown) | None => {
                            log::info!("Timecode generator received shutdown signal");
                            break;
                        }
                        Some(command) => command,
                    };

                    let was_running = self.clock.is_running();
                    match self.handle_command(command) {
                        Ok(()) => {
                            let _ = tx.send(self.state_event());
                        }
                        Err(e) => {
                            log::warn!("{}", e);
                            let _ = tx.send(GeneratorEvent::Error { message: e.to_string() });
                        }
                    }

                    // Time spent paused must not count towards the next tick
                    if !was_running && self.clock.is_running() {
                        last_tick = Instant::now();
                    }

                    let new_period = self.tick_period();
                    if new_period != period {
                        period = new_period;
                        tick_interval = Self::tick_interval(period);
                    }
                }

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let elapsed = now.duration_since(last_tick);
                    last_tick = now;

                    if let Some(tick) = self.tick(elapsed) {
                        if let Err(e) = tick.send_result {
                            log::warn!("Failed to send timecode {}: {}", tick.timecode, e);
                            let _ = tx.send(GeneratorEvent::Error {
                                message: format!("Error sending OSC: {}", e),
                            });
                        }
                        let _ = tx.send(GeneratorEvent::Timecode {
                            timecode: tick.timecode.to_string(),
                            position_frames: tick.position_frames,
                        });
                    }
                }

                _ = status_interval.tick() => {
                    log::debug!(
                        "Generator: {} ({} fps, {}%, {}, {} send failures)",
                        self.clock.timecode(),
                        self.clock.framerate(),
                        self.clock.speed(),
                        if self.clock.is_running() { "running" } else { "paused" },
                        self.send_failures
                    );
                }
            }
        }

        self.clock.pause();
        let _ = tx.send(GeneratorEvent::ShutdownComplete);
        log::info!("Timecode generator shutdown complete");
        Ok(())
    }

    fn tick_interval(period: Duration) -> Interval {
        let mut tick_interval = interval(period);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tick_interval
    }
}
