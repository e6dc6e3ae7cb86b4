//! TLS 1.3 key schedule: HKDF-Expand-Label (RFC 8446 §7.1) and traffic
//! key/IV derivation for the supported AES-GCM suites.

use ring::aead;
use ring::hkdf;
use zeroize::Zeroize;

use crate::error::{Error, Result};

pub const TLS_AES_128_GCM_SHA256: u16 = 0x1301;
pub const TLS_AES_256_GCM_SHA384: u16 = 0x1302;

/// Per-suite derivation parameters.
#[derive(Clone, Copy)]
pub struct SuiteParams {
    pub aead: &'static aead::Algorithm,
    pub hkdf: hkdf::Algorithm,
    pub key_len: usize,
    pub iv_len: usize,
}

/// Map a cipher suite id to its parameters. Only the two TLS 1.3 AES-GCM
/// suites are supported.
pub fn suite_params(suite_id: u16) -> Result<SuiteParams> {
    match suite_id {
        TLS_AES_128_GCM_SHA256 => Ok(SuiteParams {
            aead: &aead::AES_128_GCM,
            hkdf: hkdf::HKDF_SHA256,
            key_len: 16,
            iv_len: 12,
        }),
        TLS_AES_256_GCM_SHA384 => Ok(SuiteParams {
            aead: &aead::AES_256_GCM,
            hkdf: hkdf::HKDF_SHA384,
            key_len: 32,
            iv_len: 12,
        }),
        other => Err(Error::UnsupportedCipher(other)),
    }
}

/// Key and IV derived from a single traffic secret. Wiped on drop.
pub struct KeyMaterial {
    pub key: Vec<u8>,
    pub iv: Vec<u8>,
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.key.zeroize();
        self.iv.zeroize();
    }
}

/// HKDF-Expand-Label. The info string is the HkdfLabel structure:
/// length u16, then "tls13 " ++ label (u8-prefixed), then context
/// (u8-prefixed).
pub fn hkdf_expand_label(
    secret: &[u8],
    hash: hkdf::Algorithm,
    label: &[u8],
    context: &[u8],
    len: usize,
) -> Result<Vec<u8>> {
    let full_label_len = 6 + label.len(); // "tls13 " prefix
    if full_label_len > 255 {
        return Err(Error::Derive("label too long"));
    }
    if context.len() > 255 {
        return Err(Error::Derive("context too long"));
    }

    let mut info = Vec::with_capacity(2 + 1 + full_label_len + 1 + context.len());
    info.extend_from_slice(&(len as u16).to_be_bytes());
    info.push(full_label_len as u8);
    info.extend_from_slice(b"tls13 ");
    info.extend_from_slice(label);
    info.push(context.len() as u8);
    info.extend_from_slice(context);

    // The traffic secret from the key log is already a PRK (the output of
    // HKDF-Extract), so it feeds Expand directly.
    let prk = hkdf::Prk::new_less_safe(hash, secret);
    let info_slices = [info.as_slice()];
    let okm = prk
        .expand(&info_slices, OkmLen(len))
        .map_err(|_| Error::Derive("HKDF expand failed"))?;

    let mut out = vec![0u8; len];
    okm.fill(&mut out)
        .map_err(|_| Error::Derive("HKDF fill failed"))?;
    Ok(out)
}

/// Derive the per-direction write key and IV from a traffic secret:
/// key = HKDF-Expand-Label(secret, "key", "", key_len),
/// iv  = HKDF-Expand-Label(secret, "iv",  "", iv_len).
pub fn derive_key_iv(
    secret: &[u8],
    hash: hkdf::Algorithm,
    key_len: usize,
    iv_len: usize,
) -> Result<KeyMaterial> {
    let key = hkdf_expand_label(secret, hash, b"key", b"", key_len)?;
    let iv = hkdf_expand_label(secret, hash, b"iv", b"", iv_len)?;
    Ok(KeyMaterial { key, iv })
}

/// Length newtype for ring's HKDF output.
struct OkmLen(usize);

impl hkdf::KeyType for OkmLen {
    fn len(&self) -> usize {
        self.0
    }
}
