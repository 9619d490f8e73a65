//! Security credential generation.
//!
//! Daraja wants initiator passwords encrypted with its public certificate
//! (RSA, PKCS#1 v1.5 padding) and base64-encoded. The certificate is the
//! file Safaricom publishes per environment; PEM and DER certificates are
//! accepted, as are bare PEM public keys.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::SystemTime;

use base64::Engine;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Encrypt, RsaPublicKey};
use x509_cert::der::{Decode, DecodePem, Encode};
use x509_cert::Certificate;

use crate::error::DarajaError;

const PEM_CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----";
const PEM_PUBLIC_KEY: &str = "-----BEGIN PUBLIC KEY-----";
const PEM_RSA_PUBLIC_KEY: &str = "-----BEGIN RSA PUBLIC KEY-----";

/// Read an RSA public key from a certificate or public key file.
pub fn load_public_key(path: &Path) -> Result<RsaPublicKey, DarajaError> {
    let bytes = std::fs::read(path).map_err(|e| DarajaError::certificate(path, e))?;
    parse_public_key(&bytes).map_err(|reason| DarajaError::certificate(path, reason))
}

fn parse_public_key(bytes: &[u8]) -> Result<RsaPublicKey, String> {
    if let Ok(text) = std::str::from_utf8(bytes) {
        // Skip any human-readable preamble before the armor
        if let Some(start) = text.find(PEM_CERTIFICATE) {
            let cert = Certificate::from_pem(text[start..].as_bytes())
                .map_err(|e| format!("invalid PEM certificate: {}", e))?;
            return key_from_certificate(&cert);
        }
        if let Some(start) = text.find(PEM_PUBLIC_KEY) {
            return RsaPublicKey::from_public_key_pem(&text[start..])
                .map_err(|e| format!("invalid PEM public key: {}", e));
        }
        if let Some(start) = text.find(PEM_RSA_PUBLIC_KEY) {
            return RsaPublicKey::from_pkcs1_pem(&text[start..])
                .map_err(|e| format!("invalid PEM RSA public key: {}", e));
        }
    }

    let cert = Certificate::from_der(bytes)
        .map_err(|e| format!("not a PEM or DER certificate: {}", e))?;
    key_from_certificate(&cert)
}

fn key_from_certificate(cert: &Certificate) -> Result<RsaPublicKey, String> {
    let spki = cert
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| format!("cannot encode subject public key: {}", e))?;
    RsaPublicKey::from_public_key_der(&spki)
        .map_err(|e| format!("certificate does not hold an RSA key: {}", e))
}

/// Encrypt with PKCS#1 v1.5 padding and base64-encode.
///
/// Padding is randomized, so output differs between calls but its length
/// is fixed by the key size (344 characters for RSA-2048). Plaintext may be
/// at most `key bytes - 11` long (245 for RSA-2048).
pub fn encrypt(key: &RsaPublicKey, plaintext: &str) -> Result<String, DarajaError> {
    let mut rng = rand::thread_rng();
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, plaintext.as_bytes())
        .map_err(|e| DarajaError::Crypto(e.to_string()))?;
    Ok(base64::engine::general_purpose::STANDARD.encode(ciphertext))
}

/// Load the key at `path` and encrypt `plaintext` with it.
pub fn generate_security_credential(path: &Path, plaintext: &str) -> Result<String, DarajaError> {
    let key = load_public_key(path)?;
    encrypt(&key, plaintext)
}

// ── Key cache ───────────────────────────────────────────────────────

struct CachedKey {
    path: PathBuf,
    modified: SystemTime,
    key: RsaPublicKey,
}

/// Remembers the last decoded key, keyed by path and modification time.
/// The file is still stat'ed on every call, so a replaced certificate is
/// picked up.
#[derive(Default)]
pub(crate) struct KeyCache {
    entry: Mutex<Option<CachedKey>>,
}

impl KeyCache {
    pub(crate) fn get(&self, path: &Path) -> Result<RsaPublicKey, DarajaError> {
        let meta = std::fs::metadata(path).map_err(|e| DarajaError::certificate(path, e))?;
        let Ok(modified) = meta.modified() else {
            // Platform without mtimes: no caching
            return load_public_key(path);
        };

        let mut entry = self.entry.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = entry.as_ref() {
            if cached.path == path && cached.modified == modified {
                return Ok(cached.key.clone());
            }
        }

        let key = load_public_key(path)?;
        log::debug!("loaded M-Pesa public key from {}", path.display());
        *entry = Some(CachedKey {
            path: path.to_path_buf(),
            modified,
            key: key.clone(),
        });
        Ok(key)
    }
}
