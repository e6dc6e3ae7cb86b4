//! TLS 1.3 record decryption: per-record nonce and AAD construction,
//! AES-GCM open, inner-plaintext unwrap, and the per-direction sequence
//! driver.

use ring::aead::{self, LessSafeKey, UnboundKey};

use crate::error::{Error, Result};
use crate::keylog::SecretStore;
use crate::keys::{self, KeyMaterial};
use crate::record::{ContentType, Record};

/// AEAD auth tag length for both supported GCM suites.
pub const TAG_LEN: usize = 16;

/// Handshake parameters a decryption pass needs, as extracted from the
/// ClientHello/ServerHello pair of the conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeParams {
    pub client_random: [u8; 32],
    pub server_random: [u8; 32],
    /// Negotiated version (0x0304 for TLS 1.3).
    pub version: u16,
    pub cipher_suite: u16,
}

/// Decryption state for one direction within one epoch: write key, base IV,
/// and the record sequence number. The sequence starts at 0 and advances
/// only on successful decryption.
pub struct DirectionKeys {
    key: LessSafeKey,
    iv: [u8; 12],
    seq: u64,
}

impl DirectionKeys {
    pub fn new(material: &KeyMaterial, algorithm: &'static aead::Algorithm) -> Result<Self> {
        if material.iv.len() != 12 {
            return Err(Error::Derive("iv must be 12 bytes"));
        }
        let unbound = UnboundKey::new(algorithm, &material.key)
            .map_err(|_| Error::Derive("key length does not match algorithm"))?;
        let mut iv = [0u8; 12];
        iv.copy_from_slice(&material.iv);
        Ok(DirectionKeys {
            key: LessSafeKey::new(unbound),
            iv,
            seq: 0,
        })
    }

    /// Derive the direction state straight from a key-log traffic secret.
    pub fn from_traffic_secret(secret: &[u8], suite_id: u16) -> Result<Self> {
        let params = keys::suite_params(suite_id)?;
        let material = keys::derive_key_iv(secret, params.hkdf, params.key_len, params.iv_len)?;
        DirectionKeys::new(&material, params.aead)
    }

    /// Current sequence number.
    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Decrypt one protected record and unwrap the inner plaintext. The
    /// returned record carries the real content type from the plaintext
    /// tail and the original legacy version.
    pub fn decrypt_record(&mut self, record: &Record) -> Result<Record> {
        if record.payload.len() < TAG_LEN {
            return Err(Error::MalformedRecord("ciphertext shorter than auth tag"));
        }
        let ciphertext_len = u16::try_from(record.payload.len())
            .map_err(|_| Error::MalformedRecord("ciphertext length exceeds u16"))?;

        let aad = build_aad(record.content_type, record.version, ciphertext_len);
        let nonce = aead::Nonce::assume_unique_for_key(build_nonce(&self.iv, self.seq));

        let mut buf = record.payload.clone();
        let plaintext_len = self
            .key
            .open_in_place(nonce, aead::Aad::from(aad), &mut buf)
            .map_err(|_| Error::AeadFailure)?
            .len();
        buf.truncate(plaintext_len);

        self.seq += 1;

        let (payload, content_type) = unwrap_inner(buf)?;
        Ok(Record {
            content_type,
            version: record.version,
            payload,
        })
    }
}

/// RFC 8446 §5.3: pad the sequence number to 12 bytes big-endian and XOR
/// with the base IV.
pub fn build_nonce(iv: &[u8; 12], seq: u64) -> [u8; 12] {
    let mut nonce = *iv;
    for (n, s) in nonce[4..].iter_mut().zip(seq.to_be_bytes()) {
        *n ^= s;
    }
    nonce
}

/// The additional data is the record header exactly as transmitted:
/// content type, legacy version, and ciphertext length (tag included).
pub fn build_aad(content_type: ContentType, version: u16, ciphertext_len: u16) -> [u8; 5] {
    let v = version.to_be_bytes();
    let l = ciphertext_len.to_be_bytes();
    [content_type as u8, v[0], v[1], l[0], l[1]]
}

/// Strip the TLS 1.3 inner plaintext: trailing zeros are padding, the final
/// non-zero byte is the real content type.
fn unwrap_inner(mut plaintext: Vec<u8>) -> Result<(Vec<u8>, ContentType)> {
    while plaintext.last() == Some(&0) {
        plaintext.pop();
    }
    let type_byte = plaintext
        .pop()
        .ok_or(Error::MalformedRecord("inner plaintext is all padding"))?;
    let content_type = ContentType::from_u8(type_byte)
        .ok_or(Error::MalformedRecord("unknown inner content type"))?;
    Ok((plaintext, content_type))
}

/// Decrypt one direction's records for one epoch.
///
/// The traffic secret registered under `label` for the conversation's
/// client_random drives the pass. ApplicationData records are decrypted
/// with sequence numbers 0, 1, 2, … in input order; every other record
/// (ChangeCipherSpec, plaintext alerts) passes through unchanged without
/// advancing the counter. Switching epochs means calling again with the
/// other label.
pub fn decrypt_tls_data(
    params: &HandshakeParams,
    records: &[Record],
    store: &SecretStore,
    label: &str,
) -> Result<Vec<Record>> {
    let secret = store.traffic_secret(&params.client_random, label)?;
    let mut keys = DirectionKeys::from_traffic_secret(secret, params.cipher_suite)?;

    let mut out = Vec::with_capacity(records.len());
    for record in records {
        if record.content_type == ContentType::ApplicationData {
            out.push(keys.decrypt_record(record)?);
        } else {
            out.push(record.clone());
        }
    }
    Ok(out)
}
