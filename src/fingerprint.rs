//! TLSA Fingerprint Derivation
//!
//! Turns a PEM private key into the certificate association value of a
//! `3 1 1` TLSA record: SHA-256 over the DER SubjectPublicKeyInfo, lowercase hex.
//!
//! Accepted encodings:
//! - `RSA PRIVATE KEY` (PKCS#1)
//! - `EC PRIVATE KEY` (SEC1, P-256, P-384 or P-521)
//! - `PRIVATE KEY` (PKCS#8 wrapping any of the above)

use crate::error::{Result, SyncError};
use pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

const RSA_LABEL: &str = "RSA PRIVATE KEY";
const EC_LABEL: &str = "EC PRIVATE KEY";
const PKCS8_LABEL: &str = "PRIVATE KEY";
const ENCRYPTED_PKCS8_LABEL: &str = "ENCRYPTED PRIVATE KEY";

/// Key algorithm detected from the key file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    EcP256,
    EcP384,
    EcP521,
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAlgorithm::Rsa => write!(f, "rsa"),
            KeyAlgorithm::EcP256 => write!(f, "ec-p256"),
            KeyAlgorithm::EcP384 => write!(f, "ec-p384"),
            KeyAlgorithm::EcP521 => write!(f, "ec-p521"),
        }
    }
}

/// SHA-256 digest of a DER public key, as lowercase hex
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint of an already DER-encoded SubjectPublicKeyInfo
    pub fn from_public_key_der(der: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(der)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Fingerprint {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

/// Parses a 64 character hex digest. Uppercase input is normalized.
impl FromStr for Fingerprint {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut digest = [0u8; 32];
        hex::decode_to_slice(s, &mut digest)?;
        Ok(Self(hex::encode(digest)))
    }
}

/// Derive the TLSA fingerprint of the private key stored at `path`
pub fn derive(path: impl AsRef<Path>) -> Result<Fingerprint> {
    let path = path.as_ref();

    let bytes = std::fs::read(path).map_err(|source| SyncError::KeyRead {
        path: path.to_path_buf(),
        source,
    })?;
    let pem = String::from_utf8(bytes)
        .map_err(|_| SyncError::key_parse(path, "key file is not PEM text"))?;

    let (algorithm, der) =
        public_key_der(&pem).map_err(|reason| SyncError::key_parse(path, reason))?;
    let fingerprint = Fingerprint::from_public_key_der(&der);

    debug!(
        path = %path.display(),
        algorithm = %algorithm,
        fingerprint = %fingerprint,
        "Derived key fingerprint"
    );

    Ok(fingerprint)
}

/// Detect the key type from its PEM label and extract the public key as SPKI DER
fn public_key_der(pem: &str) -> std::result::Result<(KeyAlgorithm, Vec<u8>), String> {
    if let Some(block) = pem_block(pem, RSA_LABEL) {
        let key = RsaPrivateKey::from_pkcs1_pem(block)
            .map_err(|e| format!("invalid RSA private key: {e}"))?;
        return Ok((KeyAlgorithm::Rsa, spki_der(&RsaPublicKey::from(&key))?));
    }

    // openssl ecparam -genkey writes an EC PARAMETERS block first; only the key block is decoded
    if let Some(block) = pem_block(pem, EC_LABEL) {
        if let Ok(key) = p256::SecretKey::from_sec1_pem(block) {
            return Ok((KeyAlgorithm::EcP256, spki_der(&key.public_key())?));
        }
        if let Ok(key) = p384::SecretKey::from_sec1_pem(block) {
            return Ok((KeyAlgorithm::EcP384, spki_der(&key.public_key())?));
        }
        if let Ok(key) = p521::SecretKey::from_sec1_pem(block) {
            return Ok((KeyAlgorithm::EcP521, spki_der(&key.public_key())?));
        }
        return Err("EC private key is not a valid P-256, P-384 or P-521 key".to_string());
    }

    if let Some(block) = pem_block(pem, PKCS8_LABEL) {
        if let Ok(key) = RsaPrivateKey::from_pkcs8_pem(block) {
            return Ok((KeyAlgorithm::Rsa, spki_der(&RsaPublicKey::from(&key))?));
        }
        if let Ok(key) = p256::SecretKey::from_pkcs8_pem(block) {
            return Ok((KeyAlgorithm::EcP256, spki_der(&key.public_key())?));
        }
        if let Ok(key) = p384::SecretKey::from_pkcs8_pem(block) {
            return Ok((KeyAlgorithm::EcP384, spki_der(&key.public_key())?));
        }
        if let Ok(key) = p521::SecretKey::from_pkcs8_pem(block) {
            return Ok((KeyAlgorithm::EcP521, spki_der(&key.public_key())?));
        }
        return Err("PKCS#8 key is not an RSA, P-256, P-384 or P-521 key".to_string());
    }

    if pem_block(pem, ENCRYPTED_PKCS8_LABEL).is_some() {
        return Err("encrypted private keys are not supported".to_string());
    }

    Err("no RSA or EC private key PEM block found".to_string())
}

fn spki_der(key: &impl EncodePublicKey) -> std::result::Result<Vec<u8>, String> {
    key.to_public_key_der()
        .map(|doc| doc.as_bytes().to_vec())
        .map_err(|e| format!("failed to encode public key: {e}"))
}

/// Slice out the first `-----BEGIN {label}-----` .. `-----END {label}-----` block
fn pem_block<'a>(contents: &'a str, label: &str) -> Option<&'a str> {
    let begin = format!("-----BEGIN {label}-----");
    let end = format!("-----END {label}-----");

    let start = contents.find(&begin)?;
    let stop = start + contents[start..].find(&end)? + end.len();
    Some(&contents[start..stop])
}
