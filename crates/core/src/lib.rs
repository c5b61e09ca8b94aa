pub use config::{ConfigError, ConfigManager, ConfigSchema};
pub use error::{GeneratorError, TimecodeError, TransportError};
pub use generator::{Tick, TimecodeGenerator};
pub use messages::{GeneratorCommand, GeneratorEvent, Settings, MAX_TICK_RATE_HZ};
pub use osc::{DestinationConfig, OscTarget, OscTransport, RecordingTransport, Transport};
pub use timecode::{
    parse_offset, render, FrameAccumulator, Framerate, PlaybackState, TimeCode, TimecodeClock,
    MAX_SPEED_PERCENT,
};

mod config;
mod error;
mod generator;
pub mod messages;
pub mod osc;
pub mod timecode;
