//! Signing for addon issuance and ownership transfer.
//!
//! # Minting
//!
//! ```text
//! 1. payload = JCS({category, expiresAt?, id, issuedAt, name, nonce, owner, rarity})
//! 2. signature        = ECDSA-P256-SHA256(owner_private_key,  payload)
//! 3. issuerSignature  = ECDSA-P256-SHA256(issuer_private_key, payload)
//! ```
//!
//! Signatures are the fixed 64-byte `r || s` encoding, base64 on the wire.

use p256::ecdsa::signature::Signer;
use p256::ecdsa::Signature;

use crate::codec::{
    encode_base64, random_nonce, signing_payload, transfer_payload, AddonFields,
};
use crate::config::DEFAULT_NONCE_BYTES;
use crate::error::{RelicError, RelicResult};
use crate::keys::PrivateKeyHandle;
use crate::types::{now_millis, Addon, AddonDraft, AddonOwnershipProof, AddonTransfer};

/// Sign raw payload bytes (ECDSA over SHA-256).
pub fn sign(payload: &[u8], private_key: &PrivateKeyHandle) -> RelicResult<Vec<u8>> {
    let signature: Signature =
        private_key
            .signing_key()
            .try_sign(payload)
            .map_err(|e| RelicError::Signing {
                reason: e.to_string(),
            })?;
    Ok(signature.to_bytes().to_vec())
}

/// Sign the ownership payload of `fields` for `owner_public_key`.
///
/// Used twice per mint: once with the owner's key, once with the issuer's.
pub fn sign_addon(
    fields: &AddonFields<'_>,
    owner_public_key: &str,
    private_key: &PrivateKeyHandle,
    nonce: &str,
    issued_at: i64,
) -> RelicResult<String> {
    let payload = signing_payload(fields, owner_public_key, nonce, issued_at)?;
    Ok(encode_base64(sign(&payload, private_key)?))
}

/// Sign a transfer payload. The transfer's own `signature` field is ignored.
pub fn sign_transfer(
    transfer: &AddonTransfer,
    private_key: &PrivateKeyHandle,
) -> RelicResult<String> {
    let payload = transfer_payload(transfer)?;
    Ok(encode_base64(sign(&payload, private_key)?))
}

/// Issuance parameters for [`mint_addon`].
#[derive(Debug, Clone)]
pub struct MintOptions {
    /// Issuance time (ms). Defaults to now.
    pub issued_at: Option<i64>,

    /// Absolute expiry (ms).
    pub expires_at: Option<i64>,

    /// Explicit nonce. Defaults to a fresh random one.
    pub nonce: Option<String>,

    /// Random bytes in a generated nonce.
    pub nonce_bytes: usize,
}

impl Default for MintOptions {
    fn default() -> Self {
        Self {
            issued_at: None,
            expires_at: None,
            nonce: None,
            nonce_bytes: DEFAULT_NONCE_BYTES,
        }
    }
}

impl MintOptions {
    pub fn issued_at(mut self, issued_at: i64) -> Self {
        self.issued_at = Some(issued_at);
        self
    }

    pub fn expires_at(mut self, expires_at: i64) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    /// Length of a generated nonce. Zero falls back to one byte.
    pub fn nonce_bytes(mut self, len: usize) -> Self {
        self.nonce_bytes = len.max(1);
        self
    }
}

/// Mint a signed addon from a draft.
///
/// Requires both the owner's and the issuer's private keys; the public
/// halves recorded in the proof are derived from them.
pub fn mint_addon(
    draft: AddonDraft,
    owner_key: &PrivateKeyHandle,
    issuer_key: &PrivateKeyHandle,
    options: &MintOptions,
) -> RelicResult<Addon> {
    let owner_public_key = owner_key.public_key()?.to_base64();
    let issuer_public_key = issuer_key.public_key()?.to_base64();
    let issued_at = options.issued_at.unwrap_or_else(now_millis);
    let nonce = options
        .nonce
        .clone()
        .unwrap_or_else(|| random_nonce(options.nonce_bytes.max(1)));

    let fields = AddonFields::of_draft(&draft, options.expires_at);
    let signature = sign_addon(&fields, &owner_public_key, owner_key, &nonce, issued_at)?;
    let issuer_signature = sign_addon(&fields, &owner_public_key, issuer_key, &nonce, issued_at)?;

    tracing::debug!(
        addon_id = %draft.id,
        issued_at,
        "minted addon"
    );

    Ok(draft.into_addon(AddonOwnershipProof {
        owner_public_key,
        signature,
        issued_at,
        expires_at: options.expires_at,
        issuer_public_key,
        issuer_signature,
        nonce,
    }))
}

/// Re-mint `addon` for a new owner with a fresh issuer co-signature.
///
/// Keeps every catalog field and the expiry, replaces owner key, nonce,
/// issuance time and both signatures. This is the issuer-assisted way to
/// settle ownership after a transfer; see [`crate::provenance`] for the
/// issuer-free alternative.
pub fn reissue_addon(
    addon: &Addon,
    new_owner_key: &PrivateKeyHandle,
    issuer_key: &PrivateKeyHandle,
    options: &MintOptions,
) -> RelicResult<Addon> {
    let mut options = options.clone();
    if options.expires_at.is_none() {
        options.expires_at = addon.ownership.expires_at;
    }
    mint_addon(addon.to_draft(), new_owner_key, issuer_key, &options)
}
