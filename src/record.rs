use std::fmt;

use crate::error::{Error, Result};

/// Record header: content type (1) + legacy version (2) + length (2).
pub const RECORD_HEADER_LEN: usize = 5;

/// Upper bound on a record body. The TLS 1.3 ciphertext limit is
/// 2^14 + 256; anything up to 2^14 + 2048 is tolerated for middleboxes
/// that overshoot, beyond that the stream is treated as garbage.
pub const MAX_RECORD_LEN: usize = 16384 + 2048;

/// The four defined record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 0x14,
    Alert = 0x15,
    Handshake = 0x16,
    ApplicationData = 0x17,
}

impl ContentType {
    pub fn from_u8(byte: u8) -> Option<ContentType> {
        match byte {
            0x14 => Some(ContentType::ChangeCipherSpec),
            0x15 => Some(ContentType::Alert),
            0x16 => Some(ContentType::Handshake),
            0x17 => Some(ContentType::ApplicationData),
            _ => None,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ContentType::ChangeCipherSpec => "ChangeCipherSpec",
            ContentType::Alert => "Alert",
            ContentType::Handshake => "Handshake",
            ContentType::ApplicationData => "Application Data",
        };
        f.write_str(name)
    }
}

/// One TLS record frame, detached from the input stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub content_type: ContentType,
    /// legacy_record_version from the header, 0x0301..0x0304 on real traffic.
    pub version: u16,
    pub payload: Vec<u8>,
}

impl Record {
    /// Re-serialize to the wire form: 5-byte header + payload.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RECORD_HEADER_LEN + self.payload.len());
        out.push(self.content_type as u8);
        out.extend_from_slice(&self.version.to_be_bytes());
        out.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    pub fn is_client_hello(&self) -> bool {
        self.content_type == ContentType::Handshake && self.payload.first() == Some(&0x01)
    }

    pub fn is_server_hello(&self) -> bool {
        self.content_type == ContentType::Handshake && self.payload.first() == Some(&0x02)
    }

    pub fn is_alert(&self) -> bool {
        self.content_type == ContentType::Alert
    }

    pub fn is_application_data(&self) -> bool {
        self.content_type == ContentType::ApplicationData
    }
}

/// Split one direction's concatenated TCP payload into complete records.
///
/// Returns the records in stream order plus the number of trailing bytes
/// that did not form a complete record. The caller prepends that tail to
/// the next chunk before re-invoking; a partial header or body is never
/// consumed. An unknown content type or an oversized length is a hard
/// error — record boundaries cannot be recovered past either.
pub fn split_records(payload: &[u8]) -> Result<(Vec<Record>, usize)> {
    let mut records = Vec::new();
    let mut offset = 0;

    while payload.len() - offset >= RECORD_HEADER_LEN {
        let header = &payload[offset..offset + RECORD_HEADER_LEN];

        let content_type = ContentType::from_u8(header[0])
            .ok_or(Error::MalformedRecord("unknown content type"))?;
        let version = u16::from_be_bytes([header[1], header[2]]);
        let body_len = u16::from_be_bytes([header[3], header[4]]) as usize;

        if body_len > MAX_RECORD_LEN {
            return Err(Error::MalformedRecord("record length exceeds maximum"));
        }

        if payload.len() - offset < RECORD_HEADER_LEN + body_len {
            break; // incomplete record, leave header and body as remainder
        }

        let body_start = offset + RECORD_HEADER_LEN;
        records.push(Record {
            content_type,
            version,
            payload: payload[body_start..body_start + body_len].to_vec(),
        });
        offset += RECORD_HEADER_LEN + body_len;
    }

    Ok((records, payload.len() - offset))
}

/// True when the span starts with a plausible TLS record header: a defined
/// content type and an 0x03xx legacy version.
pub fn is_tls(bytes: &[u8]) -> bool {
    bytes.len() >= RECORD_HEADER_LEN && ContentType::from_u8(bytes[0]).is_some() && bytes[1] == 0x03
}

pub fn is_client_hello(bytes: &[u8]) -> bool {
    is_tls(bytes) && bytes[0] == ContentType::Handshake as u8 && bytes.get(5) == Some(&0x01)
}

pub fn is_server_hello(bytes: &[u8]) -> bool {
    is_tls(bytes) && bytes[0] == ContentType::Handshake as u8 && bytes.get(5) == Some(&0x02)
}

pub fn is_tls_alert(bytes: &[u8]) -> bool {
    is_tls(bytes) && bytes[0] == ContentType::Alert as u8
}
