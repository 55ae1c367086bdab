//! P-256 key generation, import and export.
//!
//! Public keys travel as base64 SubjectPublicKeyInfo DER, private keys as
//! base64 PKCS#8 DER. Import validates the algorithm and curve, so a P-384
//! or Ed25519 key is rejected instead of being coerced.

use std::fmt;

use p256::ecdsa::{SigningKey, VerifyingKey};
use p256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use sha2::{Digest, Sha256};

use crate::codec::{decode_base64, encode_base64};
use crate::error::{RelicError, RelicResult};
use crate::types::Keypair;

/// Validated P-256 public key.
#[derive(Clone)]
pub struct PublicKeyHandle {
    key: VerifyingKey,
    spki_der: Vec<u8>,
}

/// Validated P-256 private key. Zeroized on drop by the underlying key type.
#[derive(Clone)]
pub struct PrivateKeyHandle {
    key: SigningKey,
}

/// Generate a fresh keypair. Nothing is persisted.
pub fn generate_keypair() -> RelicResult<Keypair> {
    let signing_key = SigningKey::random(&mut rand::thread_rng());
    let private = PrivateKeyHandle { key: signing_key };
    let public = private.public_key()?;

    Ok(Keypair {
        public_key: public.to_base64(),
        private_key: private.to_base64()?,
    })
}

/// Import a base64 SPKI public key.
pub fn import_public_key(b64: &str) -> RelicResult<PublicKeyHandle> {
    let der = decode_base64("publicKey", b64)?;
    let key = VerifyingKey::from_public_key_der(&der)
        .map_err(|e| RelicError::decode("publicKey", format!("invalid SPKI public key: {}", e)))?;
    PublicKeyHandle::from_verifying_key(key)
}

/// Import a base64 PKCS#8 private key.
pub fn import_private_key(b64: &str) -> RelicResult<PrivateKeyHandle> {
    let der = decode_base64("privateKey", b64)?;
    let key = SigningKey::from_pkcs8_der(&der).map_err(|e| {
        RelicError::decode("privateKey", format!("invalid PKCS#8 private key: {}", e))
    })?;
    Ok(PrivateKeyHandle { key })
}

/// Compute key ID from public key bytes (SPKI DER).
///
/// Returns `sha256:<lowercase-hex>`.
pub fn compute_key_id(spki_bytes: &[u8]) -> String {
    format!("sha256:{}", hex::encode(Sha256::digest(spki_bytes)))
}

/// Whether two base64 public keys name the same P-256 point.
///
/// Both must import; a malformed key matches nothing, not even itself.
pub fn same_public_key(a: &str, b: &str) -> bool {
    match (import_public_key(a), import_public_key(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

impl PublicKeyHandle {
    fn from_verifying_key(key: VerifyingKey) -> RelicResult<Self> {
        let doc = key
            .to_public_key_der()
            .map_err(|e| RelicError::InvalidKey {
                reason: format!("failed to encode public key: {}", e),
            })?;
        Ok(Self {
            key,
            spki_der: doc.as_bytes().to_vec(),
        })
    }

    /// Canonical SPKI DER bytes.
    pub fn spki_der(&self) -> &[u8] {
        &self.spki_der
    }

    /// Canonical base64 SPKI form.
    pub fn to_base64(&self) -> String {
        encode_base64(&self.spki_der)
    }

    /// Fingerprint of the SPKI encoding.
    pub fn key_id(&self) -> String {
        compute_key_id(&self.spki_der)
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.key
    }
}

impl PartialEq for PublicKeyHandle {
    fn eq(&self, other: &Self) -> bool {
        self.spki_der == other.spki_der
    }
}

impl Eq for PublicKeyHandle {}

impl fmt::Debug for PublicKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKeyHandle")
            .field("key_id", &self.key_id())
            .finish()
    }
}

impl PrivateKeyHandle {
    /// The matching public key.
    pub fn public_key(&self) -> RelicResult<PublicKeyHandle> {
        PublicKeyHandle::from_verifying_key(VerifyingKey::from(&self.key))
    }

    /// Export as base64 PKCS#8 DER.
    pub fn to_base64(&self) -> RelicResult<String> {
        let doc = self.key.to_pkcs8_der().map_err(|e| RelicError::InvalidKey {
            reason: format!("failed to encode private key as PKCS#8: {}", e),
        })?;
        Ok(encode_base64(doc.as_bytes()))
    }

    pub(crate) fn signing_key(&self) -> &SigningKey {
        &self.key
    }
}

impl fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKeyHandle(<redacted>)")
    }
}
