use thiserror::Error;

/// Errors surfaced by the dissector and decryptor.
#[derive(Debug, Error)]
pub enum Error {
    /// Input ended in the middle of a field.
    #[error("truncated input: needed {needed} bytes, {remaining} available")]
    Truncated { needed: usize, remaining: usize },

    /// Record header carries an unknown content type or an excessive length.
    #[error("malformed record: {0}")]
    MalformedRecord(&'static str),

    /// Handshake length prefixes are inconsistent, or the message type is
    /// not the one the caller asked for.
    #[error("malformed handshake: {0}")]
    MalformedHandshake(&'static str),

    /// ClientHello is well-formed but carries no server_name host entry.
    #[error("no SNI host_name present")]
    SniAbsent,

    /// The key log has no secret for the requested client_random and label.
    #[error("no {label} secret for client_random {client_random}")]
    SecretMissing {
        label: String,
        client_random: String,
    },

    /// Cipher suite outside the supported TLS 1.3 AES-GCM suites.
    #[error("unsupported cipher suite 0x{0:04x}")]
    UnsupportedCipher(u16),

    /// AEAD open failed: tag mismatch, or a key/nonce the backend rejected.
    #[error("AEAD decryption failed")]
    AeadFailure,

    /// HKDF label/length outside what the backend accepts.
    #[error("key derivation failed: {0}")]
    Derive(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
