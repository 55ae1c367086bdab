//! Content hash for equality and dedup.
//!
//! Covers only `{category, id, name, nonce, owner}`. Not a security check:
//! two addons with equal hashes can still differ in signatures, expiry or
//! modifiers. Verify before trusting either.

use sha2::{Digest, Sha256};

use crate::codec::{encode_base64, identity_payload};
use crate::error::RelicResult;
use crate::types::Addon;

/// Base64 SHA-256 of the addon's canonical identity fields.
pub fn hash_addon(addon: &Addon) -> RelicResult<String> {
    let payload = identity_payload(addon)?;
    Ok(encode_base64(Sha256::digest(&payload)))
}
