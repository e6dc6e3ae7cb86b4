//! Handshake message parsing: ClientHello / ServerHello / Certificate,
//! plus SNI extraction (RFC 6066 §3).

use crate::error::{Error, Result};
use crate::reader::ByteReader;

const MSG_CLIENT_HELLO: u8 = 0x01;
const MSG_SERVER_HELLO: u8 = 0x02;
const MSG_CERTIFICATE: u8 = 0x0b;

/// server_name extension type (RFC 6066).
const EXT_SERVER_NAME: u16 = 0x0000;
/// host_name entry type inside server_name_list.
const NAME_TYPE_HOST: u8 = 0;

/// Parsed ClientHello body. Variable-length fields are owned copies, so the
/// struct outlives the capture buffer it was parsed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    pub version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    /// Raw cipher_suites vector, two bytes per suite.
    pub cipher_suites: Vec<u8>,
    pub compression_methods: Vec<u8>,
    /// Raw extensions block; walked on demand by [`get_sni`].
    pub extensions: Vec<u8>,
}

/// Parsed ServerHello body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerHello {
    pub version: u16,
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
    pub cipher_suite: u16,
    pub compression_method: u8,
    pub extensions: Vec<u8>,
}

/// Parsed Certificate message. Entries are walked in the TLS 1.3
/// CertificateEntry shape: cert_data (u24-prefixed) then per-entry
/// extensions (u16-prefixed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Certificate {
    pub request_context: Vec<u8>,
    /// DER bytes of each certificate_list entry, leaf first.
    pub chain: Vec<Vec<u8>>,
}

/// A dissected handshake message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMessage {
    ClientHello(ClientHello),
    ServerHello(ServerHello),
    Certificate(Certificate),
    /// Any other message type, body kept raw.
    Other { msg_type: u8, body: Vec<u8> },
}

/// Read the 4-byte handshake header and hand back (msg_type, body).
/// The u24 length must be covered by the input.
fn read_header<'a>(r: &mut ByteReader<'a>) -> Result<(u8, &'a [u8])> {
    let msg_type = r.read_u8()?;
    let body = r.read_vec24()?;
    Ok((msg_type, body))
}

fn parse_client_hello_body(body: &[u8]) -> Result<ClientHello> {
    let mut r = ByteReader::new(body);

    let version = r.read_u16()?;
    let mut random = [0u8; 32];
    random.copy_from_slice(r.read_fixed(32)?);

    let session_id = r.read_vec8()?;
    if session_id.len() > 32 {
        return Err(Error::MalformedHandshake("session_id longer than 32 bytes"));
    }

    let cipher_suites = r.read_vec16()?;
    if cipher_suites.len() % 2 != 0 {
        return Err(Error::MalformedHandshake("odd cipher_suites length"));
    }

    let compression_methods = r.read_vec8()?;

    // Extensions are absent entirely on pre-extension hellos; when the
    // block is present it must account for the rest of the body.
    let extensions = if r.is_empty() { &[][..] } else { r.read_vec16()? };
    if !r.is_empty() {
        return Err(Error::MalformedHandshake("trailing bytes after extensions"));
    }

    Ok(ClientHello {
        version,
        random,
        session_id: session_id.to_vec(),
        cipher_suites: cipher_suites.to_vec(),
        compression_methods: compression_methods.to_vec(),
        extensions: extensions.to_vec(),
    })
}

fn parse_server_hello_body(body: &[u8]) -> Result<ServerHello> {
    let mut r = ByteReader::new(body);

    let version = r.read_u16()?;
    let mut random = [0u8; 32];
    random.copy_from_slice(r.read_fixed(32)?);

    let session_id = r.read_vec8()?;
    if session_id.len() > 32 {
        return Err(Error::MalformedHandshake("session_id longer than 32 bytes"));
    }

    let cipher_suite = r.read_u16()?;
    let compression_method = r.read_u8()?;

    let extensions = if r.is_empty() { &[][..] } else { r.read_vec16()? };
    if !r.is_empty() {
        return Err(Error::MalformedHandshake("trailing bytes after extensions"));
    }

    Ok(ServerHello {
        version,
        random,
        session_id: session_id.to_vec(),
        cipher_suite,
        compression_method,
        extensions: extensions.to_vec(),
    })
}

fn parse_certificate_body(body: &[u8]) -> Result<Certificate> {
    let mut r = ByteReader::new(body);

    let request_context = r.read_vec8()?.to_vec();
    let list = r.read_vec24()?;

    let mut chain = Vec::new();
    let mut entries = ByteReader::new(list);
    while !entries.is_empty() {
        let cert_data = entries.read_vec24()?;
        entries.read_vec16()?; // per-entry extensions, not retained
        chain.push(cert_data.to_vec());
    }

    Ok(Certificate {
        request_context,
        chain,
    })
}

fn parse_message(msg_type: u8, body: &[u8]) -> Result<HandshakeMessage> {
    match msg_type {
        MSG_CLIENT_HELLO => Ok(HandshakeMessage::ClientHello(parse_client_hello_body(body)?)),
        MSG_SERVER_HELLO => Ok(HandshakeMessage::ServerHello(parse_server_hello_body(body)?)),
        MSG_CERTIFICATE => Ok(HandshakeMessage::Certificate(parse_certificate_body(body)?)),
        other => Ok(HandshakeMessage::Other {
            msg_type: other,
            body: body.to_vec(),
        }),
    }
}

/// Parse the first handshake message in a record payload.
pub fn parse_handshake(payload: &[u8]) -> Result<HandshakeMessage> {
    let mut r = ByteReader::new(payload);
    let (msg_type, body) = read_header(&mut r)?;
    parse_message(msg_type, body)
}

/// Parse every handshake message in a record payload. A single record may
/// carry several messages back to back (e.g. ServerHello flights).
pub fn parse_handshake_messages(payload: &[u8]) -> Result<Vec<HandshakeMessage>> {
    let mut r = ByteReader::new(payload);
    let mut messages = Vec::new();
    while !r.is_empty() {
        let (msg_type, body) = read_header(&mut r)?;
        messages.push(parse_message(msg_type, body)?);
    }
    Ok(messages)
}

/// Parse a ClientHello from a handshake record payload (message header
/// included).
pub fn parse_client_hello(payload: &[u8]) -> Result<ClientHello> {
    match parse_handshake(payload)? {
        HandshakeMessage::ClientHello(hello) => Ok(hello),
        _ => Err(Error::MalformedHandshake("not a ClientHello")),
    }
}

/// Parse a ServerHello from a handshake record payload.
pub fn parse_server_hello(payload: &[u8]) -> Result<ServerHello> {
    match parse_handshake(payload)? {
        HandshakeMessage::ServerHello(hello) => Ok(hello),
        _ => Err(Error::MalformedHandshake("not a ServerHello")),
    }
}

/// Extract the first certificate's DER bytes from a Certificate message.
pub fn extract_certificate(payload: &[u8]) -> Result<Vec<u8>> {
    match parse_handshake(payload)? {
        HandshakeMessage::Certificate(cert) => cert
            .chain
            .into_iter()
            .next()
            .ok_or(Error::MalformedHandshake("empty certificate_list")),
        _ => Err(Error::MalformedHandshake("not a Certificate message")),
    }
}

/// Walk the extensions block for the server_name extension and return the
/// first host_name entry (RFC 6066 §3: extension data is a u16-prefixed
/// server_name_list of (name_type, u16-prefixed name) entries).
pub fn get_sni(hello: &ClientHello) -> Result<String> {
    let mut exts = ByteReader::new(&hello.extensions);
    while !exts.is_empty() {
        let ext_type = exts.read_u16()?;
        let ext_data = exts.read_vec16()?;
        if ext_type != EXT_SERVER_NAME {
            continue;
        }

        let mut sni = ByteReader::new(ext_data);
        let list = sni.read_vec16()?;
        let mut entries = ByteReader::new(list);
        while !entries.is_empty() {
            let name_type = entries.read_u8()?;
            let name = entries.read_vec16()?;
            if name_type == NAME_TYPE_HOST {
                return String::from_utf8(name.to_vec())
                    .map_err(|_| Error::MalformedHandshake("host_name is not UTF-8"));
            }
        }
        // Extension present but no host_name entry.
        return Err(Error::SniAbsent);
    }
    Err(Error::SniAbsent)
}

/// Exact-match SNI predicate. Propagates parse failures.
pub fn has_sni(hello: &ClientHello, host: &str) -> Result<bool> {
    Ok(get_sni(hello)? == host)
}

/// Substring-match SNI predicate.
pub fn sni_contains(hello: &ClientHello, host: &str) -> Result<bool> {
    Ok(get_sni(hello)?.contains(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a server_name extension carrying the given entries.
    fn build_sni_extension(entries: &[(u8, &[u8])]) -> Vec<u8> {
        let mut list = Vec::new();
        for (name_type, name) in entries {
            list.push(*name_type);
            list.extend_from_slice(&(name.len() as u16).to_be_bytes());
            list.extend_from_slice(name);
        }
        let mut ext = Vec::new();
        ext.extend_from_slice(&EXT_SERVER_NAME.to_be_bytes());
        ext.extend_from_slice(&((list.len() + 2) as u16).to_be_bytes());
        ext.extend_from_slice(&(list.len() as u16).to_be_bytes());
        ext.extend_from_slice(&list);
        ext
    }

    /// Build a full ClientHello handshake message (header included).
    fn build_client_hello(random: &[u8; 32], extensions: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x03, 0x03]); // legacy_version
        body.extend_from_slice(random);
        body.push(0x00); // empty session_id
        body.extend_from_slice(&[0x00, 0x04]); // two cipher suites
        body.extend_from_slice(&[0x13, 0x01, 0x13, 0x02]);
        body.push(0x01); // one compression method
        body.push(0x00);
        body.extend_from_slice(&(extensions.len() as u16).to_be_bytes());
        body.extend_from_slice(extensions);

        let mut msg = vec![MSG_CLIENT_HELLO];
        msg.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        msg.extend_from_slice(&body);
        msg
    }

    /// Build a full ServerHello handshake message.
    fn build_server_hello(random: &[u8; 32], cipher_suite: u16) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x03, 0x03]);
        body.extend_from_slice(random);
        body.push(0x00); // empty session_id
        body.extend_from_slice(&cipher_suite.to_be_bytes());
        body.push(0x00); // null compression
        body.extend_from_slice(&[0x00, 0x00]); // empty extensions

        let mut msg = vec![MSG_SERVER_HELLO];
        msg.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        msg.extend_from_slice(&body);
        msg
    }

    /// Build a TLS 1.3-shaped Certificate message with one DER entry.
    fn build_certificate(der: &[u8]) -> Vec<u8> {
        let mut entry = Vec::new();
        entry.extend_from_slice(&(der.len() as u32).to_be_bytes()[1..]);
        entry.extend_from_slice(der);
        entry.extend_from_slice(&[0x00, 0x00]); // empty entry extensions

        let mut body = vec![0x00]; // empty request_context
        body.extend_from_slice(&(entry.len() as u32).to_be_bytes()[1..]);
        body.extend_from_slice(&entry);

        let mut msg = vec![MSG_CERTIFICATE];
        msg.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        msg.extend_from_slice(&body);
        msg
    }

    #[test]
    fn parses_client_hello_fields() {
        let random = [0x42u8; 32];
        let ext = build_sni_extension(&[(NAME_TYPE_HOST, b"example.com")]);
        let msg = build_client_hello(&random, &ext);

        let hello = parse_client_hello(&msg).unwrap();
        assert_eq!(hello.version, 0x0303);
        assert_eq!(hello.random, random);
        assert!(hello.session_id.is_empty());
        assert_eq!(hello.cipher_suites, vec![0x13, 0x01, 0x13, 0x02]);
        assert_eq!(hello.compression_methods, vec![0x00]);
        assert!(!hello.extensions.is_empty());
    }

    #[test]
    fn get_sni_finds_host_name() {
        let ext = build_sni_extension(&[(NAME_TYPE_HOST, b"example.com")]);
        let msg = build_client_hello(&[0u8; 32], &ext);
        let hello = parse_client_hello(&msg).unwrap();
        assert_eq!(get_sni(&hello).unwrap(), "example.com");
    }

    #[test]
    fn get_sni_skips_non_host_entries() {
        let ext = build_sni_extension(&[(0x01, b"ignored"), (NAME_TYPE_HOST, b"real.example")]);
        let msg = build_client_hello(&[0u8; 32], &ext);
        let hello = parse_client_hello(&msg).unwrap();
        assert_eq!(get_sni(&hello).unwrap(), "real.example");
    }

    #[test]
    fn get_sni_scans_past_other_extensions() {
        // supported_versions first, then server_name
        let mut exts = vec![0x00, 0x2B, 0x00, 0x03, 0x02, 0x03, 0x04];
        exts.extend(build_sni_extension(&[(NAME_TYPE_HOST, b"example.com")]));
        let msg = build_client_hello(&[0u8; 32], &exts);
        let hello = parse_client_hello(&msg).unwrap();
        assert_eq!(get_sni(&hello).unwrap(), "example.com");
    }

    #[test]
    fn sni_absent_without_extension() {
        let msg = build_client_hello(&[0u8; 32], &[]);
        let hello = parse_client_hello(&msg).unwrap();
        assert!(matches!(get_sni(&hello), Err(Error::SniAbsent)));
    }

    #[test]
    fn sni_absent_with_empty_list() {
        let ext = build_sni_extension(&[]);
        let msg = build_client_hello(&[0u8; 32], &ext);
        let hello = parse_client_hello(&msg).unwrap();
        assert!(matches!(get_sni(&hello), Err(Error::SniAbsent)));
    }

    #[test]
    fn sni_round_trips_through_serialization() {
        let ext = build_sni_extension(&[(NAME_TYPE_HOST, b"mail.example.org")]);
        let msg = build_client_hello(&[7u8; 32], &ext);
        let hello = parse_client_hello(&msg).unwrap();
        let reparsed = parse_client_hello(&msg).unwrap();
        assert_eq!(hello, reparsed);
        assert_eq!(get_sni(&reparsed).unwrap(), "mail.example.org");
    }

    #[test]
    fn has_sni_and_sni_contains() {
        let ext = build_sni_extension(&[(NAME_TYPE_HOST, b"www.example.com")]);
        let msg = build_client_hello(&[0u8; 32], &ext);
        let hello = parse_client_hello(&msg).unwrap();

        assert!(has_sni(&hello, "www.example.com").unwrap());
        assert!(!has_sni(&hello, "example.com").unwrap());
        assert!(sni_contains(&hello, "example.com").unwrap());
        assert!(!sni_contains(&hello, "example.net").unwrap());
    }

    #[test]
    fn parses_server_hello_fields() {
        let random = [0xAB; 32];
        let msg = build_server_hello(&random, 0x1301);
        let hello = parse_server_hello(&msg).unwrap();
        assert_eq!(hello.version, 0x0303);
        assert_eq!(hello.random, random);
        assert_eq!(hello.cipher_suite, 0x1301);
        assert_eq!(hello.compression_method, 0x00);
        assert!(hello.extensions.is_empty());
    }

    #[test]
    fn parse_handshake_dispatches_by_type() {
        let ch = build_client_hello(&[1u8; 32], &[]);
        let sh = build_server_hello(&[2u8; 32], 0x1302);
        assert!(matches!(
            parse_handshake(&ch).unwrap(),
            HandshakeMessage::ClientHello(_)
        ));
        assert!(matches!(
            parse_handshake(&sh).unwrap(),
            HandshakeMessage::ServerHello(_)
        ));

        // Finished (type 20) lands in Other with the body preserved
        let fin = [0x14, 0x00, 0x00, 0x02, 0xAA, 0xBB];
        match parse_handshake(&fin).unwrap() {
            HandshakeMessage::Other { msg_type, body } => {
                assert_eq!(msg_type, 0x14);
                assert_eq!(body, vec![0xAA, 0xBB]);
            }
            other => panic!("expected Other, got {other:?}"),
        }
    }

    #[test]
    fn parses_multiple_messages_in_one_record() {
        let mut payload = build_server_hello(&[3u8; 32], 0x1301);
        payload.extend(build_certificate(b"\x30\x82\x01\x00fake-der"));

        let messages = parse_handshake_messages(&payload).unwrap();
        assert_eq!(messages.len(), 2);
        assert!(matches!(messages[0], HandshakeMessage::ServerHello(_)));
        assert!(matches!(messages[1], HandshakeMessage::Certificate(_)));
    }

    #[test]
    fn extract_certificate_returns_first_der() {
        let der = b"\x30\x82\x01\x00fake-der";
        let msg = build_certificate(der);
        assert_eq!(extract_certificate(&msg).unwrap(), der.to_vec());
    }

    #[test]
    fn extract_certificate_rejects_other_messages() {
        let ch = build_client_hello(&[0u8; 32], &[]);
        assert!(matches!(
            extract_certificate(&ch),
            Err(Error::MalformedHandshake(_))
        ));
    }

    #[test]
    fn wrong_message_type_rejected() {
        let sh = build_server_hello(&[0u8; 32], 0x1301);
        assert!(matches!(
            parse_client_hello(&sh),
            Err(Error::MalformedHandshake(_))
        ));
    }

    #[test]
    fn truncated_body_rejected() {
        let msg = build_client_hello(&[0u8; 32], &[]);
        // Chop off the tail: the u24 length is no longer covered.
        assert!(matches!(
            parse_client_hello(&msg[..msg.len() - 3]),
            Err(Error::Truncated { .. })
        ));
    }

    #[test]
    fn odd_cipher_suites_length_rejected() {
        let mut body = Vec::new();
        body.extend_from_slice(&[0x03, 0x03]);
        body.extend_from_slice(&[0u8; 32]);
        body.push(0x00);
        body.extend_from_slice(&[0x00, 0x03]); // 3 bytes of cipher suites
        body.extend_from_slice(&[0x13, 0x01, 0x13]);
        body.push(0x01);
        body.push(0x00);
        body.extend_from_slice(&[0x00, 0x00]);

        let mut msg = vec![MSG_CLIENT_HELLO];
        msg.extend_from_slice(&(body.len() as u32).to_be_bytes()[1..]);
        msg.extend_from_slice(&body);

        assert!(matches!(
            parse_client_hello(&msg),
            Err(Error::MalformedHandshake(_))
        ));
    }

    #[test]
    fn trailing_bytes_after_extensions_rejected() {
        let mut msg = build_client_hello(&[0u8; 32], &[]);
        // Grow the u24 message length to cover one stray byte.
        let len = ((msg[1] as usize) << 16 | (msg[2] as usize) << 8 | msg[3] as usize) + 1;
        msg[1] = (len >> 16) as u8;
        msg[2] = (len >> 8) as u8;
        msg[3] = len as u8;
        msg.push(0xFF);

        assert!(matches!(
            parse_client_hello(&msg),
            Err(Error::MalformedHandshake(_))
        ));
    }
}
