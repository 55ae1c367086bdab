//! Local addon inventory.
//!
//! One owner key, the provenance chain of every addon it holds, and the
//! nonces it has consumed. Persisted as versioned JSON:
//!
//! ```json
//! {
//!   "version": 1,
//!   "owner": "MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAE...",
//!   "updatedAt": "2026-01-01T00:00:00Z",
//!   "entries": [{ "addon": { ... }, "transfers": [ ... ] }],
//!   "consumed": [{ "scope": "transfer", "nonce": "..." }]
//! }
//! ```
//!
//! Writes take `&mut self`, so one inventory value accepts one transfer at a
//! time. Sharing a ledger between inventories extends replay protection
//! across them.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::info;

use crate::config::{RelicConfig, DEFAULT_NONCE_BYTES};
use crate::error::{RelicError, RelicResult};
use crate::keys::{same_public_key, PrivateKeyHandle};
use crate::ledger::{InMemoryNonceLedger, NonceLedger, NonceScope};
use crate::provenance::ProvenanceChain;
use crate::transfer::{accept_transfer, TransferOffer, UnsignedTransfer};
use crate::types::Addon;
use crate::verifier::{VerifiedAddon, Verifier};

/// Current inventory file format version.
pub const INVENTORY_VERSION: u8 = 1;

/// A nonce recorded as consumed by this inventory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ConsumedNonce {
    pub scope: NonceScope,
    pub nonce: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InventoryFile {
    version: u8,
    owner: String,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    entries: Vec<ProvenanceChain>,
    #[serde(default)]
    consumed: Vec<ConsumedNonce>,
}

/// Addons held by one owner key.
pub struct AddonInventory {
    owner: String,
    entries: BTreeMap<String, ProvenanceChain>,
    consumed: BTreeSet<ConsumedNonce>,
    updated_at: DateTime<Utc>,
    verifier: Verifier,
    ledger: Arc<dyn NonceLedger>,
    nonce_bytes: usize,
}

impl fmt::Debug for AddonInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AddonInventory")
            .field("owner", &self.owner)
            .field("entries", &self.entries.len())
            .field("consumed", &self.consumed.len())
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl AddonInventory {
    /// Empty inventory for `owner_public_key` (base64 SPKI).
    pub fn new(owner_public_key: impl Into<String>) -> Self {
        Self {
            owner: owner_public_key.into(),
            entries: BTreeMap::new(),
            consumed: BTreeSet::new(),
            updated_at: Utc::now(),
            verifier: Verifier::new(),
            ledger: Arc::new(InMemoryNonceLedger::new()),
            nonce_bytes: DEFAULT_NONCE_BYTES,
        }
    }

    pub fn with_verifier(mut self, verifier: Verifier) -> Self {
        self.verifier = verifier;
        self
    }

    /// Random bytes in nonces of outgoing transfers (at least 1).
    pub fn with_nonce_bytes(mut self, len: usize) -> Self {
        self.nonce_bytes = len.max(1);
        self
    }

    /// Use a shared ledger. Nonces already recorded by this inventory are
    /// not copied over; call before admitting anything.
    pub fn with_ledger(mut self, ledger: Arc<dyn NonceLedger>) -> Self {
        self.ledger = ledger;
        self
    }

    /// Load with a default verifier and a private in-memory ledger.
    pub async fn load(path: impl AsRef<Path>) -> RelicResult<Self> {
        Self::load_with(path, Verifier::new(), Arc::new(InMemoryNonceLedger::new())).await
    }

    /// Load, then register every persisted nonce with `ledger`.
    pub async fn load_with(
        path: impl AsRef<Path>,
        verifier: Verifier,
        ledger: Arc<dyn NonceLedger>,
    ) -> RelicResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(RelicError::Inventory {
                message: format!("inventory not found: {}", path.display()),
            });
        }

        let content = fs::read_to_string(path)
            .await
            .map_err(|e| RelicError::Inventory {
                message: format!("failed to read inventory: {}", e),
            })?;

        let file = Self::parse(&content)?;
        for consumed in &file.consumed {
            ledger.check_and_mark(consumed.scope, &consumed.nonce).await?;
        }

        let inventory = Self {
            owner: file.owner,
            entries: file
                .entries
                .into_iter()
                .map(|chain| (chain.addon.id.clone(), chain))
                .collect(),
            consumed: file.consumed.into_iter().collect(),
            updated_at: file.updated_at,
            verifier,
            ledger,
            nonce_bytes: DEFAULT_NONCE_BYTES,
        };

        info!(
            path = %path.display(),
            entries = inventory.entries.len(),
            "loaded inventory"
        );
        Ok(inventory)
    }

    /// Open the inventory at `config.inventory_path` for `owner_public_key`,
    /// or start an empty one if the file does not exist yet.
    pub async fn open(
        config: &RelicConfig,
        owner_public_key: impl Into<String>,
    ) -> RelicResult<Self> {
        let owner = owner_public_key.into();
        let verifier = Verifier::from_config(config)?;

        if !config.inventory_path.exists() {
            return Ok(Self::new(owner)
                .with_verifier(verifier)
                .with_nonce_bytes(config.nonce_bytes));
        }

        let inventory = Self::load_with(
            &config.inventory_path,
            verifier,
            Arc::new(InMemoryNonceLedger::new()),
        )
        .await?;
        if !same_public_key(&inventory.owner, &owner) {
            return Err(RelicError::Inventory {
                message: format!(
                    "inventory at {} belongs to a different key",
                    config.inventory_path.display()
                ),
            });
        }
        Ok(inventory.with_nonce_bytes(config.nonce_bytes))
    }

    fn parse(content: &str) -> RelicResult<InventoryFile> {
        let file: InventoryFile =
            serde_json::from_str(content).map_err(|e| RelicError::Inventory {
                message: format!("failed to parse inventory: {}", e),
            })?;

        if file.version > INVENTORY_VERSION {
            return Err(RelicError::Inventory {
                message: format!(
                    "inventory version {} is newer than supported version {}",
                    file.version, INVENTORY_VERSION
                ),
            });
        }

        Ok(file)
    }

    /// Save to `path`, creating parent directories.
    pub async fn save(&self, path: impl AsRef<Path>) -> RelicResult<()> {
        let path = path.as_ref();
        let content = self.to_json()?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| RelicError::Inventory {
                    message: format!("failed to create inventory directory: {}", e),
                })?;
        }

        fs::write(path, content)
            .await
            .map_err(|e| RelicError::Inventory {
                message: format!("failed to write inventory: {}", e),
            })?;

        info!(path = %path.display(), entries = self.entries.len(), "saved inventory");
        Ok(())
    }

    /// Pretty JSON in the persisted format.
    pub fn to_json(&self) -> RelicResult<String> {
        let file = InventoryFile {
            version: INVENTORY_VERSION,
            owner: self.owner.clone(),
            updated_at: self.updated_at,
            entries: self.entries.values().cloned().collect(),
            consumed: self.consumed.iter().cloned().collect(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| RelicError::Inventory {
            message: format!("failed to serialize inventory: {}", e),
        })
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, addon_id: &str) -> bool {
        self.entries.contains_key(addon_id)
    }

    pub fn get(&self, addon_id: &str) -> Option<&ProvenanceChain> {
        self.entries.get(addon_id)
    }

    /// Held addon ids, sorted.
    pub fn addon_ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn consumed_nonces(&self) -> impl Iterator<Item = &ConsumedNonce> {
        self.consumed.iter()
    }

    /// Admit a freshly minted or reissued addon owned by this inventory.
    ///
    /// A reissued addon replaces an existing provenance chain for the same
    /// id, since its new proof names the current owner directly.
    pub async fn admit(&mut self, addon: Addon) -> RelicResult<()> {
        let result = self.verifier.verify_addon(&addon);
        if !result.valid {
            tracing::warn!(addon_id = %addon.id, "refusing to admit invalid addon");
            return Err(RelicError::AddonRejected {
                addon_id: addon.id.clone(),
                reason: result.error_summary(),
            });
        }
        if !same_public_key(&addon.ownership.owner_public_key, &self.owner) {
            return Err(RelicError::AddonRejected {
                addon_id: addon.id.clone(),
                reason: "addon is owned by a different key".to_string(),
            });
        }

        let nonce = addon.ownership.nonce.clone();
        if !self
            .ledger
            .check_and_mark(NonceScope::Issuance, &nonce)
            .await?
        {
            return Err(RelicError::Replay { nonce });
        }

        let addon_id = addon.id.clone();
        if self
            .entries
            .insert(addon_id.clone(), ProvenanceChain::new(addon))
            .is_some()
        {
            info!(addon_id = %addon_id, "replaced provenance chain with reissued proof");
        }
        self.record(NonceScope::Issuance, nonce);
        Ok(())
    }

    /// Accept an incoming transfer offer.
    pub async fn accept(&mut self, offer: &TransferOffer) -> RelicResult<()> {
        if self.contains(offer.chain.addon_id()) {
            return Err(RelicError::TransferRejected {
                addon_id: offer.chain.addon_id().to_string(),
                reason: "addon already held by this inventory".to_string(),
            });
        }

        let consumed = accept_transfer(
            &offer.chain,
            &offer.transfer,
            &self.owner,
            &self.verifier,
            self.ledger.as_ref(),
        )
        .await?;

        self.entries
            .insert(consumed.chain.addon_id().to_string(), consumed.chain);
        self.record(NonceScope::Transfer, consumed.transfer.nonce);
        Ok(())
    }

    /// Sign an addon away to `to_public_key` and remove it from this
    /// inventory. `private_key` must be the inventory owner's key.
    pub fn transfer_out(
        &mut self,
        addon_id: &str,
        private_key: &PrivateKeyHandle,
        to_public_key: impl Into<String>,
    ) -> RelicResult<TransferOffer> {
        let chain = self.get(addon_id).ok_or_else(|| RelicError::NotFound {
            addon_id: addon_id.to_string(),
        })?;

        let transfer = UnsignedTransfer::for_chain(chain, to_public_key)
            .with_nonce_bytes(self.nonce_bytes)
            .sign(private_key)?;
        let chain = self.remove(addon_id).ok_or_else(|| RelicError::NotFound {
            addon_id: addon_id.to_string(),
        })?;

        info!(addon_id = %addon_id, "transferred addon out");
        Ok(TransferOffer { chain, transfer })
    }

    pub fn remove(&mut self, addon_id: &str) -> Option<ProvenanceChain> {
        let removed = self.entries.remove(addon_id);
        if removed.is_some() {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Verified view of a held addon, for reading modifiers.
    pub fn verified(&self, addon_id: &str) -> RelicResult<VerifiedAddon<'_>> {
        self.get(addon_id)
            .ok_or_else(|| RelicError::NotFound {
                addon_id: addon_id.to_string(),
            })?
            .verified(&self.verifier)
    }

    fn record(&mut self, scope: NonceScope, nonce: String) {
        self.consumed.insert(ConsumedNonce { scope, nonce });
        self.updated_at = Utc::now();
    }
}
