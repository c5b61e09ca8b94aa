pub mod clock;
pub mod framerate;
pub mod timecode;

pub use clock::{FrameAccumulator, PlaybackState, TimecodeClock, MAX_SPEED_PERCENT};
pub use framerate::Framerate;
pub use timecode::{parse_offset, render, TimeCode};
