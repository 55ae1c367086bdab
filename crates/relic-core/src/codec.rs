//! Canonical payloads and base64 boundary encoding.
//!
//! Signed payloads are JCS (RFC 8785) canonical JSON: keys sorted
//! lexicographically, no whitespace, UTF-8. Every implementation of the
//! protocol must produce these bytes exactly, otherwise signatures made
//! elsewhere simply fail to verify here.
//!
//! ```text
//! ownership: {"category","expiresAt"?,"id","issuedAt","name","nonce","owner","rarity"}
//! transfer:  {"addonId","from","nonce","timestamp","to"}
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use rand::RngCore;
use serde::Serialize;

use crate::error::{RelicError, RelicResult};
use crate::types::{Addon, AddonCategory, AddonDraft, AddonRarity, AddonTransfer};

/// The addon fields covered by the ownership and issuer signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddonFields<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub category: AddonCategory,
    pub rarity: AddonRarity,
    pub expires_at: Option<i64>,
}

impl<'a> AddonFields<'a> {
    /// Signed fields as declared by a signed addon.
    pub fn of_addon(addon: &'a Addon) -> Self {
        Self {
            id: &addon.id,
            name: &addon.name,
            category: addon.category,
            rarity: addon.rarity,
            expires_at: addon.ownership.expires_at,
        }
    }

    /// Signed fields of a draft that is about to be minted.
    pub fn of_draft(draft: &'a AddonDraft, expires_at: Option<i64>) -> Self {
        Self {
            id: &draft.id,
            name: &draft.name,
            category: draft.category,
            rarity: draft.rarity,
            expires_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OwnershipPayload<'a> {
    category: AddonCategory,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires_at: Option<i64>,
    id: &'a str,
    issued_at: i64,
    name: &'a str,
    nonce: &'a str,
    owner: &'a str,
    rarity: AddonRarity,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TransferPayload<'a> {
    addon_id: &'a str,
    from: &'a str,
    nonce: &'a str,
    timestamp: i64,
    to: &'a str,
}

#[derive(Serialize)]
struct IdentityPayload<'a> {
    category: AddonCategory,
    id: &'a str,
    name: &'a str,
    nonce: &'a str,
    owner: &'a str,
}

/// Serialize to JCS canonical bytes.
pub(crate) fn to_canonical_bytes<T: Serialize>(value: &T) -> RelicResult<Vec<u8>> {
    serde_jcs::to_vec(value).map_err(|e| RelicError::Canonicalize {
        message: e.to_string(),
    })
}

/// Bytes signed by both the owner and the issuer.
///
/// `expiresAt` is omitted entirely when the addon never expires.
pub fn signing_payload(
    fields: &AddonFields<'_>,
    owner_public_key: &str,
    nonce: &str,
    issued_at: i64,
) -> RelicResult<Vec<u8>> {
    to_canonical_bytes(&OwnershipPayload {
        category: fields.category,
        expires_at: fields.expires_at,
        id: fields.id,
        issued_at,
        name: fields.name,
        nonce,
        owner: owner_public_key,
        rarity: fields.rarity,
    })
}

/// Ownership payload rebuilt from a signed addon's own declared fields.
pub fn addon_signing_payload(addon: &Addon) -> RelicResult<Vec<u8>> {
    signing_payload(
        &AddonFields::of_addon(addon),
        &addon.ownership.owner_public_key,
        &addon.ownership.nonce,
        addon.ownership.issued_at,
    )
}

/// Bytes signed by the sender of a transfer. The signature field itself is
/// not part of the payload.
pub fn transfer_payload(transfer: &AddonTransfer) -> RelicResult<Vec<u8>> {
    transfer_payload_parts(
        &transfer.addon_id,
        &transfer.from_public_key,
        &transfer.to_public_key,
        transfer.timestamp,
        &transfer.nonce,
    )
}

pub(crate) fn transfer_payload_parts(
    addon_id: &str,
    from: &str,
    to: &str,
    timestamp: i64,
    nonce: &str,
) -> RelicResult<Vec<u8>> {
    to_canonical_bytes(&TransferPayload {
        addon_id,
        from,
        nonce,
        timestamp,
        to,
    })
}

/// Canonical subset used by [`crate::hash::hash_addon`].
pub(crate) fn identity_payload(addon: &Addon) -> RelicResult<Vec<u8>> {
    to_canonical_bytes(&IdentityPayload {
        category: addon.category,
        id: &addon.id,
        name: &addon.name,
        nonce: &addon.ownership.nonce,
        owner: &addon.ownership.owner_public_key,
    })
}

/// Standard (padded) base64.
pub fn encode_base64(bytes: impl AsRef<[u8]>) -> String {
    BASE64.encode(bytes)
}

/// Decode standard base64, naming the offending field on failure.
pub fn decode_base64(field: &str, b64: &str) -> RelicResult<Vec<u8>> {
    BASE64
        .decode(b64.trim())
        .map_err(|e| RelicError::decode(field, format!("invalid base64: {}", e)))
}

/// Fresh random nonce of `len` bytes, base64 encoded.
pub fn random_nonce(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill_bytes(&mut bytes);
    encode_base64(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crown_fields(expires_at: Option<i64>) -> AddonFields<'static> {
        AddonFields {
            id: "crown-1",
            name: "Crown",
            category: AddonCategory::Headwear,
            rarity: AddonRarity::Legendary,
            expires_at,
        }
    }

    #[test]
    fn test_signing_payload_golden_vector() {
        let bytes = signing_payload(&crown_fields(None), "OWNER", "n1", 1000).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"category":"headwear","id":"crown-1","issuedAt":1000,"name":"Crown","nonce":"n1","owner":"OWNER","rarity":"legendary"}"#
        );
    }

    #[test]
    fn test_signing_payload_with_expiry_sorts_expires_at() {
        let bytes = signing_payload(&crown_fields(Some(5000)), "OWNER", "n1", 1000).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"category":"headwear","expiresAt":5000,"id":"crown-1","issuedAt":1000,"name":"Crown","nonce":"n1","owner":"OWNER","rarity":"legendary"}"#
        );
    }

    #[test]
    fn test_transfer_payload_golden_vector() {
        let transfer = AddonTransfer {
            addon_id: "crown-1".into(),
            from_public_key: "FROM".into(),
            to_public_key: "TO".into(),
            signature: "ignored".into(),
            timestamp: 2000,
            nonce: "t1".into(),
        };
        let bytes = transfer_payload(&transfer).unwrap();
        assert_eq!(
            String::from_utf8(bytes).unwrap(),
            r#"{"addonId":"crown-1","from":"FROM","nonce":"t1","timestamp":2000,"to":"TO"}"#
        );
    }

    #[test]
    fn test_signature_field_not_in_transfer_payload() {
        let mut transfer = AddonTransfer {
            addon_id: "crown-1".into(),
            from_public_key: "FROM".into(),
            to_public_key: "TO".into(),
            signature: "one".into(),
            timestamp: 2000,
            nonce: "t1".into(),
        };
        let before = transfer_payload(&transfer).unwrap();
        transfer.signature = "two".into();
        assert_eq!(before, transfer_payload(&transfer).unwrap());
    }

    #[test]
    fn test_payload_escapes_unicode_names() {
        let fields = AddonFields {
            name: "Crown \"Ω\"",
            ..crown_fields(None)
        };
        let text = String::from_utf8(signing_payload(&fields, "O", "n", 1).unwrap()).unwrap();
        assert!(text.contains(r#""name":"Crown \"Ω\"""#));
    }

    #[test]
    fn test_decode_base64_reports_field() {
        let err = decode_base64("signature", "not base64!!").unwrap_err();
        match err {
            RelicError::Decode { field, .. } => assert_eq!(field, "signature"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_random_nonce_length_and_uniqueness() {
        let a = random_nonce(16);
        let b = random_nonce(16);
        assert_ne!(a, b);
        assert_eq!(decode_base64("nonce", &a).unwrap().len(), 16);
    }
}
