use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TimecodeError;

/// Frames in 24 hours of 29.97 drop-frame timecode.
const DROP_FRAME_DAY: u64 = 2_589_408;

/// Supported timecode framerates.
///
/// The fractional NTSC rates run at 30000/1001 and 24000/1001 frames per
/// second but are labelled with their nominal 30 and 24 frame counts. Only
/// 29.97 uses drop-frame numbering; 23.976 counts every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Framerate {
    #[default]
    #[serde(rename = "30")]
    Fps30,
    #[serde(rename = "29.97")]
    Fps29_97Drop,
    #[serde(rename = "25")]
    Fps25,
    #[serde(rename = "24")]
    Fps24,
    #[serde(rename = "23.976")]
    Fps23_976,
}

impl Framerate {
    pub const ALL: [Framerate; 5] = [
        Framerate::Fps30,
        Framerate::Fps29_97Drop,
        Framerate::Fps25,
        Framerate::Fps24,
        Framerate::Fps23_976,
    ];

    /// Real frames per second, used to convert elapsed time into frames.
    pub fn fps(&self) -> f64 {
        match self {
            Framerate::Fps30 => 30.0,
            Framerate::Fps29_97Drop => 30_000.0 / 1001.0,
            Framerate::Fps25 => 25.0,
            Framerate::Fps24 => 24.0,
            Framerate::Fps23_976 => 24_000.0 / 1001.0,
        }
    }

    /// Frame count per timecode second (the FF field wraps at this value).
    pub fn nominal_fps(&self) -> u32 {
        match self {
            Framerate::Fps30 | Framerate::Fps29_97Drop => 30,
            Framerate::Fps25 => 25,
            Framerate::Fps24 | Framerate::Fps23_976 => 24,
        }
    }

    pub fn is_drop_frame(&self) -> bool {
        matches!(self, Framerate::Fps29_97Drop)
    }

    /// Number of frames before the displayed timecode wraps back to 00:00:00:00.
    pub fn frames_per_day(&self) -> u64 {
        if self.is_drop_frame() {
            DROP_FRAME_DAY
        } else {
            self.nominal_fps() as u64 * 86_400
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Framerate::Fps30 => "30",
            Framerate::Fps29_97Drop => "29.97",
            Framerate::Fps25 => "25",
            Framerate::Fps24 => "24",
            Framerate::Fps23_976 => "23.976",
        }
    }

    /// The following entry in [`Framerate::ALL`], wrapping around.
    pub fn next(&self) -> Framerate {
        let index = Self::ALL.iter().position(|f| f == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }
}

impl fmt::Display for Framerate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Framerate {
    type Err = TimecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.label() == label)
            .ok_or_else(|| {
                TimecodeError::InvalidParameter(format!(
                    "unsupported framerate '{}', expected one of: 30, 29.97, 25, 24, 23.976",
                    label
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_labels() {
        for framerate in Framerate::ALL {
            assert_eq!(framerate.label().parse::<Framerate>(), Ok(framerate));
        }
        assert_eq!(" 29.97 ".parse::<Framerate>(), Ok(Framerate::Fps29_97Drop));
    }

    #[test]
    fn test_unsupported_label() {
        let err = "unsupported".parse::<Framerate>().unwrap_err();
        assert!(matches!(err, TimecodeError::InvalidParameter(_)));
        assert!("60".parse::<Framerate>().is_err());
    }

    #[test]
    fn test_nominal_and_exact_rates() {
        assert_eq!(Framerate::Fps29_97Drop.nominal_fps(), 30);
        assert_eq!(Framerate::Fps23_976.nominal_fps(), 24);
        assert!((Framerate::Fps29_97Drop.fps() - 29.97).abs() < 0.001);
        assert!((Framerate::Fps23_976.fps() - 23.976).abs() < 0.001);
        assert!(Framerate::Fps29_97Drop.is_drop_frame());
        assert!(!Framerate::Fps23_976.is_drop_frame());
    }

    #[test]
    fn test_frames_per_day() {
        assert_eq!(Framerate::Fps25.frames_per_day(), 25 * 86_400);
        assert_eq!(Framerate::Fps23_976.frames_per_day(), 24 * 86_400);
        // 144 ten-minute blocks of 17982 frames
        assert_eq!(Framerate::Fps29_97Drop.frames_per_day(), 144 * 17_982);
    }

    #[test]
    fn test_next_cycles_through_all() {
        let mut framerate = Framerate::Fps30;
        for expected in Framerate::ALL.iter().skip(1) {
            framerate = framerate.next();
            assert_eq!(framerate, *expected);
        }
        assert_eq!(framerate.next(), Framerate::Fps30);
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&Framerate::Fps23_976).unwrap();
        assert_eq!(json, "\"23.976\"");
        let parsed: Framerate = serde_json::from_str("\"29.97\"").unwrap();
        assert_eq!(parsed, Framerate::Fps29_97Drop);
    }
}
