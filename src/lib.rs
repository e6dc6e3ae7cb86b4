//! Passive TLS 1.2/1.3 dissector and TLS 1.3 decryptor for captured TCP
//! byte streams.
//!
//! Feed one direction's reassembled bytes to [`split_records`], walk the
//! handshake with [`parse_client_hello`] / [`parse_server_hello`] /
//! [`get_sni`], load an SSLKEYLOGFILE with [`SecretStore::from_file`], and
//! decrypt an epoch's ApplicationData records with [`decrypt_tls_data`].
//! The [`session::Session`] façade ties those steps together for a whole
//! conversation.
//!
//! Packet capture and TCP reassembly live upstream; this crate starts at
//! the record layer.

pub mod decrypt;
pub mod dump;
pub mod error;
pub mod handshake;
pub mod keylog;
pub mod keys;
pub mod reader;
pub mod record;
pub mod session;

pub use decrypt::{build_aad, build_nonce, decrypt_tls_data, DirectionKeys, HandshakeParams};
pub use error::{Error, Result};
pub use handshake::{
    extract_certificate, get_sni, has_sni, parse_client_hello, parse_handshake,
    parse_server_hello, sni_contains, ClientHello, HandshakeMessage, ServerHello,
};
pub use keylog::{is_complete, SecretStore, SECRET_LABELS};
pub use keys::{derive_key_iv, hkdf_expand_label, suite_params, KeyMaterial};
pub use record::{split_records, ContentType, Record};
pub use session::{Direction, FourTuple, Session, SniToIp};
