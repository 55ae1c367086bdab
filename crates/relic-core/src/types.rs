//! Wire types for addons, ownership proofs and transfers.
//!
//! Field names serialize in camelCase so the JSON matches what other
//! implementations of the protocol exchange. Timestamps are integer
//! milliseconds since the Unix epoch.

use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// Addon category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonCategory {
    Headwear,
    Weapon,
    Accessory,
    Aura,
    Companion,
    Effect,
}

impl AddonCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Headwear => "headwear",
            Self::Weapon => "weapon",
            Self::Accessory => "accessory",
            Self::Aura => "aura",
            Self::Companion => "companion",
            Self::Effect => "effect",
        }
    }
}

impl fmt::Display for AddonCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Addon rarity, ordered from most to least common.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddonRarity {
    Common,
    Uncommon,
    Rare,
    Epic,
    Legendary,
    Mythic,
}

impl AddonRarity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Common => "common",
            Self::Uncommon => "uncommon",
            Self::Rare => "rare",
            Self::Epic => "epic",
            Self::Legendary => "legendary",
            Self::Mythic => "mythic",
        }
    }
}

impl fmt::Display for AddonRarity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dual-signature ownership proof embedded in every addon.
///
/// `signature` is made with the owner's private key and `issuer_signature`
/// with the issuer's, both over the same canonical payload
/// (see [`crate::codec::signing_payload`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonOwnershipProof {
    /// Owner public key (base64 SPKI DER).
    pub owner_public_key: String,

    /// Owner signature (base64 `r || s`).
    pub signature: String,

    /// Issuance time (ms).
    pub issued_at: i64,

    /// Optional expiry (ms).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,

    /// Issuer public key (base64 SPKI DER).
    pub issuer_public_key: String,

    /// Issuer signature (base64 `r || s`).
    pub issuer_signature: String,

    /// Per-issuance random value.
    pub nonce: String,
}

/// Catalog metadata. Not covered by the signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonMetadata {
    pub creator: String,

    /// Creation time (ms).
    pub created_at: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<u32>,

    /// Soft scarcity limit. Exceeding it only produces a warning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_editions: Option<u32>,
}

/// A signed addon.
///
/// Treat as immutable once `ownership` is filled in: changing any signed
/// field invalidates both signatures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Addon {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: AddonCategory,
    pub rarity: AddonRarity,

    /// Presentation data, opaque to the protocol.
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub attachment: JsonValue,

    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub visual: JsonValue,

    /// Gameplay effects. Only read these off a verified addon.
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub modifiers: JsonValue,

    pub ownership: AddonOwnershipProof,
    pub metadata: AddonMetadata,
}

/// Everything an issuer decides before an addon is signed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonDraft {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub category: AddonCategory,
    pub rarity: AddonRarity,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub attachment: JsonValue,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub visual: JsonValue,
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub modifiers: JsonValue,
    pub metadata: AddonMetadata,
}

impl AddonDraft {
    /// Attach a finished proof, producing the signed addon.
    pub fn into_addon(self, ownership: AddonOwnershipProof) -> Addon {
        Addon {
            id: self.id,
            name: self.name,
            description: self.description,
            category: self.category,
            rarity: self.rarity,
            attachment: self.attachment,
            visual: self.visual,
            modifiers: self.modifiers,
            ownership,
            metadata: self.metadata,
        }
    }
}

impl Addon {
    /// Strip the proof, e.g. to re-mint for a new owner.
    pub fn to_draft(&self) -> AddonDraft {
        AddonDraft {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category,
            rarity: self.rarity,
            attachment: self.attachment.clone(),
            visual: self.visual.clone(),
            modifiers: self.modifiers.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Current owner key as declared by the embedded proof.
    pub fn owner_public_key(&self) -> &str {
        &self.ownership.owner_public_key
    }
}

/// One-shot ownership handoff, signed by the sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddonTransfer {
    pub addon_id: String,

    /// Sender public key (base64 SPKI DER).
    pub from_public_key: String,

    /// Receiver public key (base64 SPKI DER).
    pub to_public_key: String,

    /// Sender signature over the transfer payload (base64 `r || s`).
    pub signature: String,

    /// Creation time (ms).
    pub timestamp: i64,

    pub nonce: String,
}

/// Base64-encoded P-256 keypair (SPKI public half, PKCS8 private half).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keypair {
    pub public_key: String,
    pub private_key: String,
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Keypair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

/// Current wall-clock time in milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}
