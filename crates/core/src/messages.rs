use serde::{Deserialize, Serialize};

use crate::osc::destination::{DestinationConfig, DEFAULT_ADDRESS, DEFAULT_HOST, DEFAULT_PORT};
use crate::timecode::{Framerate, PlaybackState};

/// Commands sent from a front end to the generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratorCommand {
    // Transport
    Play,
    Pause,
    TogglePlayback,
    Reset,

    // Clock parameters
    SetSpeed {
        percent: u16,
    },
    AdjustSpeed {
        delta: i32,
    },
    SetFramerate {
        label: String,
    },
    CycleFramerate,
    SetStartOffset {
        timecode: String,
    },

    // Output
    SetDestination {
        host: String,
        port: u16,
        address: String,
    },

    // Queries
    QueryState,

    Shutdown,
}

/// Events sent from the generator to front ends
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorEvent {
    /// Emitted once per tick while running
    Timecode {
        timecode: String,
        position_frames: u64,
    },
    StateChanged {
        state: PlaybackState,
        start_offset: String,
        destination: DestinationConfig,
        connected: bool,
    },
    Error {
        message: String,
    },
    ShutdownComplete,
}

/// Highest accepted explicit tick rate
pub const MAX_TICK_RATE_HZ: u32 = 240;

/// Settings configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    // Output settings
    pub host: String,
    pub port: u16,
    pub osc_address: String,

    // Timecode settings
    pub framerate: Framerate,
    pub speed_percent: u16,
    pub start_offset: String,

    /// Ticks per second; 0 follows the framerate
    pub tick_rate_hz: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            osc_address: DEFAULT_ADDRESS.to_string(),

            framerate: Framerate::default(),
            speed_percent: 100,
            start_offset: "00:00:00:00".to_string(),

            tick_rate_hz: 0,
        }
    }
}

impl Settings {
    pub fn destination(&self) -> DestinationConfig {
        DestinationConfig::new(self.host.clone(), self.port, self.osc_address.clone())
    }
}
