use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::framerate::Framerate;
use crate::error::TimecodeError;

/// Frame numbers skipped at the start of each non-tenth minute in drop-frame.
const DROPPED_PER_MINUTE: u64 = 2;
/// Drop-frame frames in one minute that drops numbers (60 * 30 - 2).
const DROP_FRAMES_PER_MINUTE: u64 = 1_798;
/// Drop-frame frames in ten minutes (9 dropping minutes + 1 full minute).
const DROP_FRAMES_PER_TEN_MINUTES: u64 = 17_982;

/// A rendered HH:MM:SS:FF position.
///
/// A `TimeCode` carries no framerate. The same fields mean different frame
/// counts at different rates, so conversions always take the [`Framerate`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeCode {
    pub hours: u32,
    pub minutes: u32,
    pub seconds: u32,
    pub frames: u32,
}

impl TimeCode {
    pub fn new(hours: u32, minutes: u32, seconds: u32, frames: u32) -> Self {
        Self {
            hours,
            minutes,
            seconds,
            frames,
        }
    }

    /// Render an absolute frame count, wrapping at 24 hours.
    pub fn from_frames(position_frames: u64, framerate: Framerate) -> Self {
        let nominal = framerate.nominal_fps() as u64;
        let mut frame_number = position_frames % framerate.frames_per_day();

        if framerate.is_drop_frame() {
            // Re-insert the skipped numbers so the count can be split like 30fps.
            let tens = frame_number / DROP_FRAMES_PER_TEN_MINUTES;
            let rest = frame_number % DROP_FRAMES_PER_TEN_MINUTES;
            frame_number += 18 * tens;
            if rest > DROPPED_PER_MINUTE {
                frame_number +=
                    DROPPED_PER_MINUTE * ((rest - DROPPED_PER_MINUTE) / DROP_FRAMES_PER_MINUTE);
            }
        }

        let frames = frame_number % nominal;
        let total_seconds = frame_number / nominal;
        let seconds = total_seconds % 60;
        let total_minutes = total_seconds / 60;
        let minutes = total_minutes % 60;
        let hours = (total_minutes / 60) % 24;

        Self {
            hours: hours as u32,
            minutes: minutes as u32,
            seconds: seconds as u32,
            frames: frames as u32,
        }
    }

    /// Convert back to an absolute frame count, validating the fields
    /// against the framerate.
    pub fn to_frames(&self, framerate: Framerate) -> Result<u64, TimecodeError> {
        let nominal = framerate.nominal_fps();
        if self.hours >= 24 || self.minutes >= 60 || self.seconds >= 60 {
            return Err(TimecodeError::malformed(
                &self.to_string(),
                "fields out of range",
            ));
        }
        if self.frames >= nominal {
            return Err(TimecodeError::malformed(
                &self.to_string(),
                format!("frame {} does not exist at {} fps", self.frames, framerate),
            ));
        }
        if framerate.is_drop_frame() && self.is_dropped_number() {
            return Err(TimecodeError::malformed(
                &self.to_string(),
                "frame number is skipped in drop-frame timecode",
            ));
        }

        let total_seconds =
            self.hours as u64 * 3600 + self.minutes as u64 * 60 + self.seconds as u64;
        let mut frames = total_seconds * nominal as u64 + self.frames as u64;

        if framerate.is_drop_frame() {
            let total_minutes = self.hours as u64 * 60 + self.minutes as u64;
            frames -= DROPPED_PER_MINUTE * (total_minutes - total_minutes / 10);
        }

        Ok(frames)
    }

    /// Drop-frame numbering skips frames 0 and 1 at the top of every minute
    /// that is not a multiple of ten.
    fn is_dropped_number(&self) -> bool {
        self.seconds == 0 && self.frames < 2 && self.minutes % 10 != 0
    }
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}:{:02}",
            self.hours, self.minutes, self.seconds, self.frames
        )
    }
}

impl FromStr for TimeCode {
    type Err = TimecodeError;

    /// Accepts `HH:MM:SS:FF` with one or two digits per field. The frame
    /// separator may also be `;` or `.`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let (head, frames) = input
            .rsplit_once(|c: char| matches!(c, ':' | ';' | '.'))
            .ok_or_else(|| TimecodeError::malformed(input, "expected HH:MM:SS:FF"))?;

        let fields: Vec<&str> = head.split(':').collect();
        if fields.len() != 3 {
            return Err(TimecodeError::malformed(input, "expected HH:MM:SS:FF"));
        }

        let hours = parse_field(input, fields[0])?;
        let minutes = parse_field(input, fields[1])?;
        let seconds = parse_field(input, fields[2])?;
        let frames = parse_field(input, frames)?;

        if hours >= 24 {
            return Err(TimecodeError::malformed(input, "hours must be below 24"));
        }
        if minutes >= 60 || seconds >= 60 {
            return Err(TimecodeError::malformed(
                input,
                "minutes and seconds must be below 60",
            ));
        }

        Ok(TimeCode::new(hours, minutes, seconds, frames))
    }
}

fn parse_field(input: &str, field: &str) -> Result<u32, TimecodeError> {
    if field.is_empty() || field.len() > 2 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TimecodeError::malformed(
            input,
            format!("'{}' is not a one or two digit number", field),
        ));
    }
    field
        .parse()
        .map_err(|_| TimecodeError::malformed(input, format!("invalid field '{}'", field)))
}

/// Parse a user-entered offset into an absolute frame count at `framerate`.
pub fn parse_offset(text: &str, framerate: Framerate) -> Result<u64, TimecodeError> {
    let timecode: TimeCode = text.parse()?;
    timecode.to_frames(framerate)
}

/// Render an absolute frame count at `framerate`.
pub fn render(position_frames: u64, framerate: Framerate) -> TimeCode {
    TimeCode::from_frames(position_frames, framerate)
}
