use std::net::{SocketAddr, UdpSocket};
use std::sync::Arc;

use parking_lot::Mutex;
use rosc::{encoder, OscMessage, OscPacket, OscType};

use super::destination::OscTarget;
use crate::error::TransportError;

/// Sends rendered timecode to a resolved destination.
///
/// Implementations must not block: the generator calls `send` from its tick
/// and treats every failure as non-fatal.
pub trait Transport: Send {
    fn send(&mut self, target: &OscTarget, timecode: &str) -> Result<(), TransportError>;
}

/// Encode a single OSC message carrying the timecode string.
pub fn encode_timecode(address: &str, timecode: &str) -> Result<Vec<u8>, TransportError> {
    let packet = OscPacket::Message(OscMessage {
        addr: address.to_string(),
        args: vec![OscType::String(timecode.to_string())],
    });
    encoder::encode(&packet).map_err(|e| TransportError::Encode(format!("{:?}", e)))
}

/// UDP transport. Sockets are bound on first use, one per address family,
/// and put in non-blocking mode.
#[derive(Default)]
pub struct OscTransport {
    v4: Option<UdpSocket>,
    v6: Option<UdpSocket>,
    packets_sent: u64,
}

impl OscTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packets_sent(&self) -> u64 {
        self.packets_sent
    }

    fn socket_for(&mut self, addr: &SocketAddr) -> Result<&UdpSocket, TransportError> {
        let (slot, bind_addr) = if addr.is_ipv4() {
            (&mut self.v4, "0.0.0.0:0")
        } else {
            (&mut self.v6, "[::]:0")
        };

        if slot.is_none() {
            let socket = UdpSocket::bind(bind_addr)?;
            socket.set_nonblocking(true)?;
            log::debug!("Bound OSC socket on {}", socket.local_addr()?);
            *slot = Some(socket);
        }

        slot.as_ref()
            .ok_or_else(|| TransportError::Io(std::io::ErrorKind::NotConnected.into()))
    }
}

impl Transport for OscTransport {
    fn send(&mut self, target: &OscTarget, timecode: &str) -> Result<(), TransportError> {
        let buf = encode_timecode(&target.address, timecode)?;
        let socket = self.socket_for(&target.addr)?;
        socket.send_to(&buf, target.addr)?;
        self.packets_sent += 1;
        Ok(())
    }
}

/// A message captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub target: SocketAddr,
    pub address: String,
    pub timecode: String,
}

/// In-memory transport that records every message. Clones share the same
/// log, so a test can keep one handle while the generator owns another.
#[derive(Debug, Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<SentMessage>>>,
    failing: Arc<Mutex<bool>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail (nothing is recorded while failing).
    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn last(&self) -> Option<SentMessage> {
        self.sent.lock().last().cloned()
    }
}

impl Transport for RecordingTransport {
    fn send(&mut self, target: &OscTarget, timecode: &str) -> Result<(), TransportError> {
        if *self.failing.lock() {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "simulated send failure",
            )));
        }

        // Encode anyway so malformed messages fail here as they would on the wire
        encode_timecode(&target.address, timecode)?;

        self.sent.lock().push(SentMessage {
            target: target.addr,
            address: target.address.clone(),
            timecode: timecode.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rosc::decoder;

    use super::*;
    use crate::osc::DestinationConfig;

    #[test]
    fn test_encode_timecode() {
        let buf = encode_timecode("/timecode", "01:02:03:04").unwrap();
        let (_, packet) = decoder::decode_udp(&buf).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, "/timecode");
                assert_eq!(msg.args, vec![OscType::String("01:02:03:04".to_string())]);
            }
            OscPacket::Bundle(_) => panic!("expected a message"),
        }
    }

    #[test]
    fn test_udp_send_reaches_receiver() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let target = DestinationConfig::new("127.0.0.1", port, "/show/tc")
            .resolve()
            .unwrap();
        let mut transport = OscTransport::new();
        transport.send(&target, "00:00:02:00").unwrap();
        assert_eq!(transport.packets_sent(), 1);

        let mut buf = [0u8; 1024];
        let (len, _) = receiver.recv_from(&mut buf).unwrap();
        let (_, packet) = decoder::decode_udp(&buf[..len]).unwrap();
        match packet {
            OscPacket::Message(msg) => {
                assert_eq!(msg.addr, "/show/tc");
                assert_eq!(msg.args, vec![OscType::String("00:00:02:00".to_string())]);
            }
            OscPacket::Bundle(_) => panic!("expected a message"),
        }
    }

    #[test]
    fn test_recording_transport_shares_log_between_clones() {
        let recorder = RecordingTransport::new();
        let mut handle = recorder.clone();
        let target = DestinationConfig::default().resolve().unwrap();

        handle.send(&target, "00:00:00:01").unwrap();
        recorder.set_failing(true);
        assert!(handle.send(&target, "00:00:00:02").is_err());
        recorder.set_failing(false);
        handle.send(&target, "00:00:00:03").unwrap();

        let sent = recorder.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].timecode, "00:00:00:01");
        assert_eq!(recorder.last().unwrap().timecode, "00:00:00:03");
        assert_eq!(sent[1].address, "/timecode");
    }
}
