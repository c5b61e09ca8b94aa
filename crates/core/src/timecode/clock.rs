use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::framerate::Framerate;
use super::timecode::TimeCode;
use crate::error::TimecodeError;

pub const MAX_SPEED_PERCENT: u16 = 200;
pub const DEFAULT_SPEED_PERCENT: u16 = 100;

/// Converts elapsed real time into whole frames, carrying the fractional
/// remainder from one call to the next.
///
/// Each call rounds half up and keeps `exact - rounded` as the remainder, so
/// the remainder stays within `[-0.5, 0.5)` and the running total never drifts
/// more than half a frame from the exact product, even at 29.97 or 23.976.
#[derive(Debug, Clone, Default)]
pub struct FrameAccumulator {
    remainder: f64,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&mut self, elapsed_secs: f64, speed_percent: u16, framerate: Framerate) -> u64 {
        if speed_percent == 0 || !elapsed_secs.is_finite() || elapsed_secs <= 0.0 {
            return 0;
        }

        let exact =
            elapsed_secs * (speed_percent as f64 / 100.0) * framerate.fps() + self.remainder;
        let whole = (exact + 0.5).floor();
        self.remainder = exact - whole;

        // remainder >= -0.5 and the product is positive, so whole >= 0
        whole.max(0.0) as u64
    }

    pub fn remainder(&self) -> f64 {
        self.remainder
    }

    pub fn clear(&mut self) {
        self.remainder = 0.0;
    }
}

/// Snapshot of the clock, as reported to front ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub position_frames: u64,
    pub speed_percent: u16,
    pub running: bool,
    pub start_offset_frames: u64,
    pub framerate: Framerate,
}

impl PlaybackState {
    pub fn timecode(&self) -> TimeCode {
        TimeCode::from_frames(self.position_frames, self.framerate)
    }
}

/// The authoritative playback position.
#[derive(Debug, Clone)]
pub struct TimecodeClock {
    position_frames: u64,
    start_offset_frames: u64,
    speed_percent: u16,
    framerate: Framerate,
    running: bool,
    accumulator: FrameAccumulator,
}

impl Default for TimecodeClock {
    fn default() -> Self {
        Self::new(Framerate::default())
    }
}

impl TimecodeClock {
    pub fn new(framerate: Framerate) -> Self {
        Self {
            position_frames: 0,
            start_offset_frames: 0,
            speed_percent: DEFAULT_SPEED_PERCENT,
            framerate,
            running: false,
            accumulator: FrameAccumulator::new(),
        }
    }

    /// Advance by `elapsed` real time. Returns the number of frames added,
    /// which is always zero while paused.
    pub fn advance(&mut self, elapsed: Duration) -> u64 {
        if !self.running {
            return 0;
        }

        let delta =
            self.accumulator
                .advance(elapsed.as_secs_f64(), self.speed_percent, self.framerate);
        self.position_frames = self.position_frames.saturating_add(delta);
        delta
    }

    pub fn timecode(&self) -> TimeCode {
        TimeCode::from_frames(self.position_frames, self.framerate)
    }

    /// Return to `start_offset_frames` and pause.
    pub fn reset(&mut self, start_offset_frames: u64) -> PlaybackState {
        self.start_offset_frames = start_offset_frames;
        self.position_frames = start_offset_frames;
        self.running = false;
        self.accumulator.clear();
        self.state()
    }

    pub fn play(&mut self) {
        self.running = true;
    }

    pub fn pause(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_speed(&mut self, percent: u16) -> Result<(), TimecodeError> {
        if percent > MAX_SPEED_PERCENT {
            return Err(TimecodeError::InvalidParameter(format!(
                "speed {}% is outside 0-{}%",
                percent, MAX_SPEED_PERCENT
            )));
        }
        self.speed_percent = percent;
        Ok(())
    }

    pub fn speed(&self) -> u16 {
        self.speed_percent
    }

    /// Switch framerate. The position is kept as a frame count; callers that
    /// need the displayed time preserved must reset explicitly.
    pub fn set_framerate(&mut self, framerate: Framerate) {
        if self.framerate != framerate {
            self.framerate = framerate;
            self.accumulator.clear();
        }
    }

    pub fn framerate(&self) -> Framerate {
        self.framerate
    }

    pub fn position(&self) -> u64 {
        self.position_frames
    }

    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            position_frames: self.position_frames,
            speed_percent: self.speed_percent,
            running: self.running,
            start_offset_frames: self.start_offset_frames,
            framerate: self.framerate,
        }
    }
}
