//! Session façade: per-direction record extraction, hello harvesting, SNI
//! collection, and the SNI → server address mapping.
//!
//! A [`Session`] is the hand-off point from the external TCP layer: payloads
//! arrive already reassembled, in order, tagged with their direction. The
//! façade only concatenates, splits, and dissects.

use std::collections::HashMap;
use std::net::Ipv4Addr;

use tracing::{debug, warn};

use crate::decrypt::HandshakeParams;
use crate::error::Result;
use crate::handshake::{self, ClientHello, HandshakeMessage, ServerHello};
use crate::record::{split_records, ContentType, Record};

/// Sender of a payload, as seen by the capture layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    FromClient,
    FromServer,
}

/// One reassembled TCP payload.
#[derive(Debug, Clone)]
pub struct Segment {
    pub direction: Direction,
    pub payload: Vec<u8>,
}

/// Conversation endpoints, filled in by the external TCP layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourTuple {
    pub client_ip: Ipv4Addr,
    pub client_port: u16,
    pub server_ip: Ipv4Addr,
    pub server_port: u16,
}

/// SNI → server address mapping harvested from hello pairs.
pub type SniToIp = HashMap<String, Ipv4Addr>;

/// A logical TCP conversation: endpoints plus reassembled payloads in
/// arrival order.
#[derive(Debug, Clone)]
pub struct Session {
    pub four: FourTuple,
    pub segments: Vec<Segment>,
}

impl Session {
    pub fn new(four: FourTuple) -> Self {
        Session {
            four,
            segments: Vec::new(),
        }
    }

    pub fn push(&mut self, direction: Direction, payload: Vec<u8>) {
        self.segments.push(Segment { direction, payload });
    }

    /// One direction's bytes, concatenated in arrival order.
    fn direction_bytes(&self, direction: Direction) -> Vec<u8> {
        let mut bytes = Vec::new();
        for segment in &self.segments {
            if segment.direction == direction {
                bytes.extend_from_slice(&segment.payload);
            }
        }
        bytes
    }

    /// Complete records for one direction plus the trailing remainder
    /// length (bytes of a record still in flight when capture stopped).
    pub fn records(&self, direction: Direction) -> Result<(Vec<Record>, usize)> {
        split_records(&self.direction_bytes(direction))
    }

    /// Handshake messages of one direction. Records that fail to dissect
    /// are logged and skipped; a bad record must not hide the rest of the
    /// conversation.
    pub fn handshakes(&self, direction: Direction) -> Vec<HandshakeMessage> {
        let (records, remainder) = match self.records(direction) {
            Ok(split) => split,
            Err(err) => {
                warn!(%err, "record stream unusable, no handshakes extracted");
                return Vec::new();
            }
        };
        if remainder > 0 {
            debug!(remainder, "trailing partial record left undissected");
        }

        let mut messages = Vec::new();
        for record in &records {
            if record.content_type != ContentType::Handshake {
                continue;
            }
            match handshake::parse_handshake_messages(&record.payload) {
                Ok(parsed) => messages.extend(parsed),
                Err(err) => warn!(%err, "skipping undissectable handshake record"),
            }
        }
        messages
    }

    /// The first ClientHello of the conversation, if one was captured.
    pub fn client_hello(&self) -> Option<ClientHello> {
        self.handshakes(Direction::FromClient)
            .into_iter()
            .find_map(|msg| match msg {
                HandshakeMessage::ClientHello(hello) => Some(hello),
                _ => None,
            })
    }

    /// The first ServerHello of the conversation, if one was captured.
    pub fn server_hello(&self) -> Option<ServerHello> {
        self.handshakes(Direction::FromServer)
            .into_iter()
            .find_map(|msg| match msg {
                HandshakeMessage::ServerHello(hello) => Some(hello),
                _ => None,
            })
    }

    /// The parameter bundle the decryption driver needs, available once
    /// both hellos have been seen.
    pub fn handshake_params(&self) -> Option<HandshakeParams> {
        let client = self.client_hello()?;
        let server = self.server_hello()?;
        Some(HandshakeParams {
            client_random: client.random,
            server_random: server.random,
            version: server.version,
            cipher_suite: server.cipher_suite,
        })
    }

    /// Every SNI advertised by this conversation's ClientHellos.
    pub fn snis(&self) -> Vec<String> {
        self.handshakes(Direction::FromClient)
            .into_iter()
            .filter_map(|msg| match msg {
                HandshakeMessage::ClientHello(hello) => match handshake::get_sni(&hello) {
                    Ok(sni) => Some(sni),
                    Err(err) => {
                        debug!(%err, "ClientHello without usable SNI");
                        None
                    }
                },
                _ => None,
            })
            .collect()
    }

    /// SNIs containing `host` as a substring.
    pub fn snis_matching(&self, host: &str) -> Vec<String> {
        self.snis()
            .into_iter()
            .filter(|sni| sni.contains(host))
            .collect()
    }

    /// Map each advertised SNI to the server address, provided the server
    /// answered with a ServerHello (an unanswered hello names nobody).
    pub fn sni_to_ip(&self) -> SniToIp {
        let mut map = SniToIp::new();
        if self.server_hello().is_none() {
            return map;
        }
        for sni in self.snis() {
            map.insert(sni, self.four.server_ip);
        }
        map
    }
}

/// Concatenate one direction's payloads and split into records: the
/// building block behind [`Session::records`] for callers holding loose
/// payload lists.
pub fn extract_tls_records(payloads: &[Vec<u8>]) -> Result<(Vec<Record>, usize)> {
    let total: usize = payloads.iter().map(Vec::len).sum();
    let mut stream = Vec::with_capacity(total);
    for payload in payloads {
        stream.extend_from_slice(payload);
    }
    split_records(&stream)
}

/// Merge SNI maps from many sessions; later sessions win on collision.
pub fn merge_sni_maps<I: IntoIterator<Item = SniToIp>>(maps: I) -> SniToIp {
    let mut merged = SniToIp::new();
    for map in maps {
        merged.extend(map);
    }
    merged
}
