use thiserror::Error;

/// Errors raised while validating or converting timecode values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimecodeError {
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Malformed timecode '{input}': {reason}")]
    MalformedOffset { input: String, reason: String },
}

impl TimecodeError {
    pub(crate) fn malformed(input: &str, reason: impl Into<String>) -> Self {
        TimecodeError::MalformedOffset {
            input: input.to_string(),
            reason: reason.into(),
        }
    }
}

/// Errors raised by the OSC transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Invalid OSC address '{0}': must start with '/' and contain no spaces or pattern characters")]
    InvalidAddress(String),

    #[error("Invalid port {0}: must be between 1 and 65535")]
    InvalidPort(u16),

    #[error("Invalid host: host must not be empty")]
    InvalidHost,

    #[error("Failed to resolve {host}: {source}")]
    Resolve {
        host: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} did not resolve to any address")]
    Unresolved(String),

    #[error("Failed to encode OSC packet: {0}")]
    Encode(String),

    #[error("Socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors surfaced by the generator while handling a command.
#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Timecode(#[from] TimecodeError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Not ready: {0}")]
    NotReady(String),
}
