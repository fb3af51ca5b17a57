//! AES-256-GCM sealing of external account credentials.
//!
//! Ciphertext layout is `version (1) | nonce (12) | ciphertext+tag`. The AAD binds each
//! value to its account as `provider|provider_id`, so a ciphertext copied onto another
//! account row fails to open.

#![allow(deprecated)]

use aes_gcm::{
    Aes256Gcm, Key, Nonce,
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
};
use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

const VERSION_ENCRYPTED: u8 = 0x01;
const VERSION_FIELD_LEN: usize = 1;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;
const MIN_ENCRYPTED_LEN: usize = VERSION_FIELD_LEN + NONCE_LEN + TAG_LEN;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("encryption failed: {0}")]
    EncryptionFailed(String),
    #[error("decryption failed: {0}")]
    DecryptionFailed(String),
    #[error("invalid ciphertext format")]
    InvalidFormat,
}

/// 32-byte key wiped from memory on drop.
#[derive(Debug, Clone, Zeroize, ZeroizeOnDrop)]
pub struct CryptoKey(Vec<u8>);

impl CryptoKey {
    pub fn new(bytes: Vec<u8>) -> Result<Self, CryptoError> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength(bytes.len()));
        }
        Ok(CryptoKey(bytes))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

pub fn encrypt_bytes(key: &CryptoKey, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut sealed = key
        .cipher()
        .encrypt(&nonce, Payload { msg: plaintext, aad })
        .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?;

    let mut out = Vec::with_capacity(VERSION_FIELD_LEN + NONCE_LEN + sealed.len());
    out.push(VERSION_ENCRYPTED);
    out.extend_from_slice(&nonce);
    out.append(&mut sealed);
    Ok(out)
}

pub fn decrypt_bytes(key: &CryptoKey, aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < MIN_ENCRYPTED_LEN || ciphertext[0] != VERSION_ENCRYPTED {
        return Err(CryptoError::InvalidFormat);
    }

    let nonce = Nonce::from_slice(&ciphertext[VERSION_FIELD_LEN..VERSION_FIELD_LEN + NONCE_LEN]);
    let sealed = &ciphertext[VERSION_FIELD_LEN + NONCE_LEN..];

    key.cipher()
        .decrypt(nonce, Payload { msg: sealed, aad })
        .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))
}

/// AAD for credentials belonging to one external account.
pub fn account_aad(provider: &str, provider_id: &str) -> String {
    format!("{provider}|{provider_id}")
}

/// Seal an optional credential string for storage on an external account row.
pub fn seal_credential(
    key: &CryptoKey,
    provider: &str,
    provider_id: &str,
    value: Option<&str>,
) -> Result<Option<Vec<u8>>, CryptoError> {
    let aad = account_aad(provider, provider_id);
    value
        .map(|v| encrypt_bytes(key, aad.as_bytes(), v.as_bytes()))
        .transpose()
}

/// Open a credential sealed by [`seal_credential`].
pub fn open_credential(
    key: &CryptoKey,
    provider: &str,
    provider_id: &str,
    sealed: Option<&[u8]>,
) -> Result<Option<String>, CryptoError> {
    let aad = account_aad(provider, provider_id);
    sealed
        .map(|bytes| {
            decrypt_bytes(key, aad.as_bytes(), bytes).and_then(|plain| {
                String::from_utf8(plain)
                    .map_err(|e| CryptoError::DecryptionFailed(format!("Invalid UTF-8: {e}")))
            })
        })
        .transpose()
}
