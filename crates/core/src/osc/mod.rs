pub mod destination;
pub mod transport;

pub use destination::{validate_address, DestinationConfig, OscTarget};
pub use transport::{encode_timecode, OscTransport, RecordingTransport, SentMessage, Transport};
