//! NSS key-log file parsing (the SSLKEYLOGFILE format emitted by browsers,
//! curl, and OpenSSL), narrowed to the five TLS 1.3 labels.

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;
use zeroize::Zeroize;

use crate::error::{Error, Result};

/// The recognized TLS 1.3 key-log labels. An entry is complete when it
/// carries all five.
pub const SECRET_LABELS: [&str; 5] = [
    "CLIENT_HANDSHAKE_TRAFFIC_SECRET",
    "SERVER_HANDSHAKE_TRAFFIC_SECRET",
    "CLIENT_TRAFFIC_SECRET_0",
    "SERVER_TRAFFIC_SECRET_0",
    "EXPORTER_SECRET",
];

/// Secrets recorded for one client_random, keyed by label.
pub type SecretEntry = HashMap<String, Vec<u8>>;

/// Parsed key-log file: client_random (lowercase hex) → label → secret.
#[derive(Debug, Default)]
pub struct SecretStore {
    entries: HashMap<String, SecretEntry>,
}

impl SecretStore {
    /// Read and parse a key-log file. Parsing is best-effort per line;
    /// only failure to read the file itself is an error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents, None))
    }

    /// Like [`SecretStore::from_file`], keeping only entries for the given
    /// client_random.
    pub fn from_file_for<P: AsRef<Path>>(path: P, client_random: &[u8; 32]) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let wanted = hex_string(client_random);
        Ok(Self::parse(&contents, Some(wanted.as_str())))
    }

    /// Parse key-log text. Lines that are blank, comments, carry an
    /// unrecognized label, or fail hex decoding are skipped.
    pub fn parse(contents: &str, only_random: Option<&str>) -> Self {
        let mut store = SecretStore::default();

        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() != 3 {
                debug!("skipping key-log line with {} fields", fields.len());
                continue;
            }

            let label = fields[0];
            if !SECRET_LABELS.contains(&label) {
                continue;
            }

            let random_hex = fields[1].to_ascii_lowercase();
            if random_hex.len() != 64 || decode_hex(&random_hex).is_none() {
                debug!("skipping key-log line with bad client_random");
                continue;
            }

            // Odd-length or non-hex secrets make the whole line malformed.
            let secret = match decode_hex(fields[2]) {
                Some(s) => s,
                None => {
                    debug!("skipping key-log line with bad secret hex");
                    continue;
                }
            };

            if let Some(wanted) = only_random {
                if random_hex != wanted {
                    continue;
                }
            }

            store
                .entries
                .entry(random_hex)
                .or_default()
                .insert(label.to_string(), secret);
        }

        store
    }

    /// Entry for a client_random, if any line referenced it.
    pub fn get(&self, client_random: &[u8; 32]) -> Option<&SecretEntry> {
        self.entries.get(&hex_string(client_random))
    }

    /// The secret registered under (client_random, label).
    pub fn traffic_secret(&self, client_random: &[u8; 32], label: &str) -> Result<&[u8]> {
        self.get(client_random)
            .and_then(|entry| entry.get(label))
            .map(Vec::as_slice)
            .ok_or_else(|| Error::SecretMissing {
                label: label.to_string(),
                client_random: hex_string(client_random),
            })
    }

    /// Number of distinct client_randoms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SecretEntry)> {
        self.entries.iter()
    }
}

impl Drop for SecretStore {
    fn drop(&mut self) {
        for entry in self.entries.values_mut() {
            for secret in entry.values_mut() {
                secret.zeroize();
            }
        }
    }
}

/// True when the entry carries every recognized label.
pub fn is_complete(entry: &SecretEntry) -> bool {
    SECRET_LABELS.iter().all(|label| entry.contains_key(*label))
}

pub(crate) fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 {
        return None;
    }
    s.as_bytes()
        .chunks(2)
        .map(|pair| {
            let hi = char::from(pair[0]).to_digit(16)?;
            let lo = char::from(pair[1]).to_digit(16)?;
            Some((hi << 4 | lo) as u8)
        })
        .collect()
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
