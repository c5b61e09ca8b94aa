use std::fmt;
use std::net::{SocketAddr, ToSocketAddrs};

use serde::{Deserialize, Serialize};

use crate::error::TransportError;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9001;
pub const DEFAULT_ADDRESS: &str = "/timecode";

/// Characters OSC reserves for address patterns.
const RESERVED_CHARS: &[char] = &[' ', '#', '*', ',', '?', '[', ']', '{', '}'];

/// Where timecode is sent, as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationConfig {
    pub host: String,
    pub port: u16,
    pub address: String,
}

/// A destination whose host has been resolved to a socket address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OscTarget {
    pub addr: SocketAddr,
    pub address: String,
}

impl Default for DestinationConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            address: DEFAULT_ADDRESS.to_string(),
        }
    }
}

impl DestinationConfig {
    pub fn new(host: impl Into<String>, port: u16, address: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            address: address.into(),
        }
    }

    /// Check the fields without touching the network.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.host.trim().is_empty() {
            return Err(TransportError::InvalidHost);
        }
        if self.port == 0 {
            return Err(TransportError::InvalidPort(self.port));
        }
        validate_address(&self.address)
    }

    /// Validate and resolve the host. Name lookups can block, so this runs
    /// when a destination is applied and never on the tick path.
    pub fn resolve(&self) -> Result<OscTarget, TransportError> {
        self.validate()?;

        let host = self.host.trim();
        let addr = (host, self.port)
            .to_socket_addrs()
            .map_err(|source| TransportError::Resolve {
                host: host.to_string(),
                source,
            })?
            .next()
            .ok_or_else(|| TransportError::Unresolved(host.to_string()))?;

        Ok(OscTarget {
            addr,
            address: self.address.clone(),
        })
    }
}

impl fmt::Display for DestinationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}{}", self.host, self.port, self.address)
    }
}

impl fmt::Display for OscTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.addr, self.address)
    }
}

pub fn validate_address(address: &str) -> Result<(), TransportError> {
    let valid = address.len() > 1
        && address.starts_with('/')
        && !address.chars().any(|c| c.is_whitespace() || RESERVED_CHARS.contains(&c));
    if valid {
        Ok(())
    } else {
        Err(TransportError::InvalidAddress(address.to_string()))
    }
}
