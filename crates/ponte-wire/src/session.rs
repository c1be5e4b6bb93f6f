//! Minimal Network-MIDI 2.0 session protocol.
//!
//! Datagram layout: a one-byte packet kind, a little-endian u32 sequence
//! number, then the payload (a UMP word stream for data packets). The
//! manager tracks peers through the SessionStart/Ack/End handshake, refreshes
//! them on traffic, expires them on silence and answers keepalives.
//! Retransmission policy is out of scope; retransmit requests are
//! acknowledged by ignoring them.

use std::net::SocketAddr;

use ponte_core::UmpPacket;

use crate::error::{Error, Result};
use crate::ump_stream;

/// Session datagram header length: kind byte + u32 sequence.
pub const HEADER_LEN: usize = 5;

/// First byte of every session datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketKind {
    /// UMP payload follows the header.
    Ump = 0x00,
    SessionStart = 0x01,
    SessionAck = 0x02,
    SessionEnd = 0x03,
    Keepalive = 0x04,
    RetransmitRequest = 0x05,
}

impl PacketKind {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x00 => Some(PacketKind::Ump),
            0x01 => Some(PacketKind::SessionStart),
            0x02 => Some(PacketKind::SessionAck),
            0x03 => Some(PacketKind::SessionEnd),
            0x04 => Some(PacketKind::Keepalive),
            0x05 => Some(PacketKind::RetransmitRequest),
            _ => None,
        }
    }
}

/// Parsed datagram header.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
    pub kind: PacketKind,
    pub sequence: u32,
}

impl Header {
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let seq = self.sequence.to_le_bytes();
        [self.kind as u8, seq[0], seq[1], seq[2], seq[3]]
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(Error::Truncated {
                needed: HEADER_LEN,
                available: data.len(),
            });
        }
        let kind = PacketKind::from_byte(data[0]).ok_or(Error::UnknownPacketKind(data[0]))?;
        let sequence = u32::from_le_bytes(data[1..5].try_into().expect("4-byte slice"));
        Ok(Self { kind, sequence })
    }
}

/// Outgoing frame capability; the transport owns the socket.
pub trait FrameSink {
    fn send(&mut self, to: SocketAddr, frame: &[u8]) -> Result<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    Connected,
}

/// One remote endpoint of the session protocol.
#[derive(Clone, Debug)]
pub struct Peer {
    pub addr: SocketAddr,
    pub session_id: u8,
    pub state: SessionState,
    pub last_rx_ms: u64,
    pub packets_rx: u64,
}

/// What a handled datagram meant for the caller.
#[derive(Debug, PartialEq, Eq)]
pub enum SessionEvent<'a> {
    /// Housekeeping only; nothing for the caller.
    Handled,
    PeerConnected(SocketAddr),
    PeerDisconnected(SocketAddr),
    /// UMP word-stream bytes from a connected peer.
    UmpPayload { from: SocketAddr, data: &'a [u8] },
}

#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    pub max_peers: usize,
    /// Peer expiry after this long without traffic.
    pub timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_peers: 8,
            timeout_ms: 5_000,
        }
    }
}

/// Session lifecycle manager for one UDP transport.
pub struct SessionManager {
    config: SessionConfig,
    peers: Vec<Peer>,
    tx_sequence: u32,
    next_session_id: u8,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            peers: Vec::with_capacity(config.max_peers),
            tx_sequence: 0,
            next_session_id: 1,
        }
    }

    pub fn peers(&self) -> &[Peer] {
        &self.peers
    }

    fn next_sequence(&mut self) -> u32 {
        self.tx_sequence = self.tx_sequence.wrapping_add(1);
        self.tx_sequence
    }

    fn find_peer(&mut self, addr: SocketAddr) -> Option<&mut Peer> {
        self.peers.iter_mut().find(|p| p.addr == addr)
    }

    /// Process one incoming datagram.
    pub fn handle_datagram<'a>(
        &mut self,
        data: &'a [u8],
        src: SocketAddr,
        now_ms: u64,
        sink: &mut dyn FrameSink,
    ) -> Result<SessionEvent<'a>> {
        let header = Header::decode(data)?;
        match header.kind {
            PacketKind::SessionStart => self.handle_session_start(src, now_ms, sink),
            PacketKind::SessionEnd => {
                tracing::info!(%src, "session end");
                let before = self.peers.len();
                self.peers.retain(|p| p.addr != src);
                if self.peers.len() < before {
                    Ok(SessionEvent::PeerDisconnected(src))
                } else {
                    Ok(SessionEvent::Handled)
                }
            }
            PacketKind::Keepalive => {
                if let Some(peer) = self.find_peer(src) {
                    peer.last_rx_ms = now_ms;
                    tracing::trace!(%src, "keepalive");
                }
                Ok(SessionEvent::Handled)
            }
            PacketKind::Ump => {
                let peer = self
                    .find_peer(src)
                    .filter(|p| p.state == SessionState::Connected)
                    .ok_or(Error::NotConnected)?;
                peer.last_rx_ms = now_ms;
                peer.packets_rx += 1;
                Ok(SessionEvent::UmpPayload {
                    from: src,
                    data: &data[HEADER_LEN..],
                })
            }
            PacketKind::RetransmitRequest => {
                tracing::debug!(%src, sequence = header.sequence, "retransmit request ignored");
                Ok(SessionEvent::Handled)
            }
            PacketKind::SessionAck => {
                // We initiated; the peer accepted.
                if let Some(peer) = self.find_peer(src) {
                    peer.state = SessionState::Connected;
                    peer.last_rx_ms = now_ms;
                    return Ok(SessionEvent::PeerConnected(src));
                }
                Ok(SessionEvent::Handled)
            }
        }
    }

    fn handle_session_start<'a>(
        &mut self,
        src: SocketAddr,
        now_ms: u64,
        sink: &mut dyn FrameSink,
    ) -> Result<SessionEvent<'a>> {
        tracing::info!(%src, "session start");
        let session_id = if let Some(peer) = self.find_peer(src) {
            peer.state = SessionState::Connected;
            peer.last_rx_ms = now_ms;
            peer.session_id
        } else {
            if self.peers.len() >= self.config.max_peers {
                tracing::warn!(%src, "max peers reached, rejecting session");
                return Err(Error::PeerTableFull);
            }
            let session_id = self.next_session_id;
            self.next_session_id = self.next_session_id.wrapping_add(1).max(1);
            self.peers.push(Peer {
                addr: src,
                session_id,
                state: SessionState::Connected,
                last_rx_ms: now_ms,
                packets_rx: 0,
            });
            session_id
        };

        // Ack carries the session id after the header.
        let header = Header {
            kind: PacketKind::SessionAck,
            sequence: self.next_sequence(),
        };
        let mut frame = [0u8; HEADER_LEN + 1];
        frame[..HEADER_LEN].copy_from_slice(&header.encode());
        frame[HEADER_LEN] = session_id;
        sink.send(src, &frame)?;

        Ok(SessionEvent::PeerConnected(src))
    }

    /// Expire silent peers and send keepalives to the rest.
    /// Returns the addresses of the peers that timed out.
    pub fn keepalive_sweep(
        &mut self,
        now_ms: u64,
        sink: &mut dyn FrameSink,
    ) -> Vec<SocketAddr> {
        let timeout = self.config.timeout_ms;
        let mut expired = Vec::new();
        self.peers.retain(|peer| {
            if now_ms.saturating_sub(peer.last_rx_ms) > timeout {
                tracing::warn!(addr = %peer.addr, "peer timed out");
                expired.push(peer.addr);
                false
            } else {
                true
            }
        });

        let header = Header {
            kind: PacketKind::Keepalive,
            sequence: self.next_sequence(),
        };
        let frame = header.encode();
        for peer in &self.peers {
            if peer.state == SessionState::Connected {
                if let Err(err) = sink.send(peer.addr, &frame) {
                    tracing::warn!(addr = %peer.addr, %err, "keepalive send failed");
                }
            }
        }
        expired
    }

    /// Build a UMP data datagram for the given packets.
    pub fn ump_datagram(&mut self, packets: &[UmpPacket]) -> Vec<u8> {
        let header = Header {
            kind: PacketKind::Ump,
            sequence: self.next_sequence(),
        };
        let mut frame = Vec::with_capacity(HEADER_LEN + packets.len() * 8);
        frame.extend_from_slice(&header.encode());
        for packet in packets {
            ump_stream::encode_packet(packet, &mut frame);
        }
        frame
    }

    /// Send SessionEnd to every peer and clear the table.
    pub fn shutdown(&mut self, sink: &mut dyn FrameSink) {
        let header = Header {
            kind: PacketKind::SessionEnd,
            sequence: self.next_sequence(),
        };
        let frame = header.encode();
        for peer in self.peers.drain(..) {
            tracing::info!(addr = %peer.addr, "sending session end");
            if let Err(err) = sink.send(peer.addr, &frame) {
                tracing::warn!(addr = %peer.addr, %err, "session end send failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingSink {
        frames: Vec<(SocketAddr, Vec<u8>)>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self { frames: Vec::new() }
        }
    }

    impl FrameSink for RecordingSink {
        fn send(&mut self, to: SocketAddr, frame: &[u8]) -> Result<()> {
            self.frames.push((to, frame.to_vec()));
            Ok(())
        }
    }

    fn addr(port: u16) -> SocketAddr {
        format!("10.0.0.1:{port}").parse().unwrap()
    }

    fn start_frame(sequence: u32) -> Vec<u8> {
        Header {
            kind: PacketKind::SessionStart,
            sequence,
        }
        .encode()
        .to_vec()
    }

    #[test]
    fn test_header_roundtrip() {
        let header = Header {
            kind: PacketKind::Ump,
            sequence: 0x0102_0304,
        };
        let bytes = header.encode();
        assert_eq!(bytes, [0x00, 0x04, 0x03, 0x02, 0x01]);
        assert_eq!(Header::decode(&bytes).unwrap(), header);
    }

    #[test]
    fn test_header_errors() {
        assert_eq!(
            Header::decode(&[0x01, 0x00]),
            Err(Error::Truncated {
                needed: HEADER_LEN,
                available: 2,
            })
        );
        assert_eq!(
            Header::decode(&[0x7F, 0, 0, 0, 0]),
            Err(Error::UnknownPacketKind(0x7F))
        );
    }

    #[test]
    fn test_session_start_acks_and_connects() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        let mut sink = RecordingSink::new();
        let peer = addr(5004);

        let frame = start_frame(1);
        let event = mgr
            .handle_datagram(&frame, peer, 100, &mut sink)
            .unwrap();
        assert_eq!(event, SessionEvent::PeerConnected(peer));
        assert_eq!(mgr.peers().len(), 1);
        assert_eq!(mgr.peers()[0].state, SessionState::Connected);

        // Ack frame went back to the peer with the session id appended.
        assert_eq!(sink.frames.len(), 1);
        let (to, frame) = &sink.frames[0];
        assert_eq!(*to, peer);
        assert_eq!(frame[0], PacketKind::SessionAck as u8);
        assert_eq!(frame.len(), HEADER_LEN + 1);
        assert_eq!(frame[HEADER_LEN], mgr.peers()[0].session_id);
    }

    #[test]
    fn test_ump_payload_requires_session() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        let mut sink = RecordingSink::new();
        let peer = addr(5004);

        let mut data = Header {
            kind: PacketKind::Ump,
            sequence: 7,
        }
        .encode()
        .to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0xF8, 0x10]);

        // No handshake yet: rejected.
        assert_eq!(
            mgr.handle_datagram(&data, peer, 10, &mut sink),
            Err(Error::NotConnected)
        );

        mgr.handle_datagram(&start_frame(1), peer, 20, &mut sink)
            .unwrap();
        match mgr.handle_datagram(&data, peer, 30, &mut sink).unwrap() {
            SessionEvent::UmpPayload { from, data } => {
                assert_eq!(from, peer);
                assert_eq!(data, [0x00, 0x00, 0xF8, 0x10]);
            }
            other => panic!("expected UmpPayload, got {other:?}"),
        }
        assert_eq!(mgr.peers()[0].packets_rx, 1);
    }

    #[test]
    fn test_session_end_removes_peer() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        let mut sink = RecordingSink::new();
        let peer = addr(5004);
        mgr.handle_datagram(&start_frame(1), peer, 0, &mut sink)
            .unwrap();

        let end = Header {
            kind: PacketKind::SessionEnd,
            sequence: 2,
        }
        .encode();
        let event = mgr.handle_datagram(&end, peer, 10, &mut sink).unwrap();
        assert_eq!(event, SessionEvent::PeerDisconnected(peer));
        assert!(mgr.peers().is_empty());
    }

    #[test]
    fn test_peer_cap() {
        let mut mgr = SessionManager::new(SessionConfig {
            max_peers: 1,
            ..Default::default()
        });
        let mut sink = RecordingSink::new();
        mgr.handle_datagram(&start_frame(1), addr(5004), 0, &mut sink)
            .unwrap();
        assert_eq!(
            mgr.handle_datagram(&start_frame(1), addr(5005), 0, &mut sink),
            Err(Error::PeerTableFull)
        );
    }

    #[test]
    fn test_keepalive_sweep_expires_silent_peers() {
        let mut mgr = SessionManager::new(SessionConfig {
            max_peers: 8,
            timeout_ms: 1_000,
        });
        let mut sink = RecordingSink::new();
        let quiet = addr(5004);
        let chatty = addr(5005);
        mgr.handle_datagram(&start_frame(1), quiet, 0, &mut sink)
            .unwrap();
        mgr.handle_datagram(&start_frame(1), chatty, 0, &mut sink)
            .unwrap();

        // Keepalive refreshes only the chatty peer.
        let ka = Header {
            kind: PacketKind::Keepalive,
            sequence: 9,
        }
        .encode();
        mgr.handle_datagram(&ka, chatty, 1_500, &mut sink).unwrap();

        sink.frames.clear();
        let expired = mgr.keepalive_sweep(2_000, &mut sink);
        assert_eq!(expired, vec![quiet]);
        assert_eq!(mgr.peers().len(), 1);
        // One keepalive went to the surviving peer.
        assert_eq!(sink.frames.len(), 1);
        assert_eq!(sink.frames[0].0, chatty);
        assert_eq!(sink.frames[0].1[0], PacketKind::Keepalive as u8);
    }

    #[test]
    fn test_ump_datagram_sequence_increments() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        let packet = ponte_core::ump::system_packet(0, 0xF8, 0, 0).unwrap();

        let first = mgr.ump_datagram(&[packet]);
        let second = mgr.ump_datagram(&[packet]);
        let h1 = Header::decode(&first).unwrap();
        let h2 = Header::decode(&second).unwrap();
        assert_eq!(h1.kind, PacketKind::Ump);
        assert_eq!(h2.sequence, h1.sequence + 1);
        assert_eq!(first.len(), HEADER_LEN + 4);
    }

    #[test]
    fn test_shutdown_notifies_all_peers() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        let mut sink = RecordingSink::new();
        mgr.handle_datagram(&start_frame(1), addr(5004), 0, &mut sink)
            .unwrap();
        mgr.handle_datagram(&start_frame(1), addr(5005), 0, &mut sink)
            .unwrap();

        sink.frames.clear();
        mgr.shutdown(&mut sink);
        assert!(mgr.peers().is_empty());
        assert_eq!(sink.frames.len(), 2);
        assert!(sink
            .frames
            .iter()
            .all(|(_, f)| f[0] == PacketKind::SessionEnd as u8));
    }

    #[test]
    fn test_retransmit_request_ignored() {
        let mut mgr = SessionManager::new(SessionConfig::default());
        let mut sink = RecordingSink::new();
        let frame = Header {
            kind: PacketKind::RetransmitRequest,
            sequence: 42,
        }
        .encode();
        let event = mgr
            .handle_datagram(&frame, addr(5004), 0, &mut sink)
            .unwrap();
        assert_eq!(event, SessionEvent::Handled);
        assert!(sink.frames.is_empty());
    }
}
