//! Ownership proofs and signed transfers for cosmetic addons.
//!
//! Every addon carries two ECDSA P-256 signatures over one canonical
//! payload: the owner's, binding it to a key, and the issuer's, proving it
//! was legitimately minted. Ownership moves through transfers signed by the
//! current owner. This crate provides:
//!
//! - Canonical (JCS) signing payloads that match other implementations byte
//!   for byte
//! - Key generation and import (base64 SPKI / PKCS#8 DER)
//! - Minting, reissuing and transfer signing
//! - Verification that reports every failure instead of the first
//! - Provenance chains, a pluggable nonce ledger and a local inventory
//!
//! # Quick Start
//!
//! ```no_run
//! use relic_core::{
//!     generate_keypair, import_private_key, mint_addon, verify_addon, AddonCategory,
//!     AddonDraft, AddonMetadata, AddonRarity, MintOptions,
//! };
//!
//! # fn example() -> relic_core::RelicResult<()> {
//! let owner = import_private_key(&generate_keypair()?.private_key)?;
//! let issuer = import_private_key(&generate_keypair()?.private_key)?;
//!
//! let draft = AddonDraft {
//!     id: "crown-1".into(),
//!     name: "Crown".into(),
//!     description: String::new(),
//!     category: AddonCategory::Headwear,
//!     rarity: AddonRarity::Legendary,
//!     attachment: serde_json::Value::Null,
//!     visual: serde_json::Value::Null,
//!     modifiers: serde_json::json!({ "charm": 5 }),
//!     metadata: AddonMetadata {
//!         creator: "studio".into(),
//!         created_at: 0,
//!         edition: None,
//!         max_editions: None,
//!     },
//! };
//!
//! let addon = mint_addon(draft, &owner, &issuer, &MintOptions::default())?;
//! assert!(verify_addon(&addon).valid);
//! # Ok(())
//! # }
//! ```
//!
//! # Ownership After Transfer
//!
//! A transfer does not rewrite the addon's proof. The receiver keeps the
//! original addon plus the transfer as a [`ProvenanceChain`] and verifies
//! the whole chain. An issuer that is online can instead collapse the chain
//! with [`reissue_addon`].
//!
//! # Configuration
//!
//! See [`RelicConfig`] for the environment variables.

pub mod codec;
pub mod config;
pub mod error;
pub mod hash;
pub mod inventory;
pub mod keys;
pub mod ledger;
pub mod provenance;
pub mod signer;
pub mod transfer;
pub mod types;
pub mod verifier;

// Re-export main types
pub use codec::{addon_signing_payload, signing_payload, transfer_payload, AddonFields};
pub use config::{RelicConfig, DEFAULT_NONCE_BYTES};
pub use error::{RelicError, RelicResult};
pub use hash::hash_addon;
pub use inventory::{AddonInventory, ConsumedNonce, INVENTORY_VERSION};
pub use keys::{
    compute_key_id, generate_keypair, import_private_key, import_public_key, same_public_key,
    PrivateKeyHandle, PublicKeyHandle,
};
pub use ledger::{InMemoryNonceLedger, NonceLedger, NonceScope};
pub use provenance::{ChainFault, ChainVerification, ProvenanceChain};
pub use signer::{mint_addon, reissue_addon, sign, sign_addon, sign_transfer, MintOptions};
pub use transfer::{
    accept_transfer, create_transfer, ConsumedTransfer, TransferOffer, UnsignedTransfer,
};
pub use types::{
    now_millis, Addon, AddonCategory, AddonDraft, AddonMetadata, AddonOwnershipProof,
    AddonRarity, AddonTransfer, Keypair,
};
pub use verifier::{
    check_transfer, verify_addon, verify_addon_at, verify_transfer, SignatureFault,
    TransferRejection, VerificationDetails, VerificationError, VerificationResult,
    VerificationWarning, VerifiedAddon, Verifier,
};
