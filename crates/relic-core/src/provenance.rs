//! Provenance chains: the minted addon plus every transfer since.
//!
//! A transferred addon keeps its original ownership proof, which still names
//! the first owner. The current owner is established by walking the chain:
//!
//! ```text
//! owner_0 = addon.ownership.ownerPublicKey       (owner + issuer signed)
//! owner_n = transfers[n-1].toPublicKey           (signed by owner_{n-1})
//! ```
//!
//! Each link must be signed by the previous owner, name this addon, carry a
//! nonce not used earlier in the chain, and not go back in time by more than
//! the verifier's clock skew. Issuer and sender clocks differ.

use serde::{Deserialize, Serialize};

use crate::error::{RelicError, RelicResult};
use crate::keys::same_public_key;
use crate::types::{now_millis, Addon, AddonTransfer};
use crate::verifier::{
    check_transfer, TransferRejection, VerificationResult, VerifiedAddon, Verifier,
};

/// A broken link in a provenance chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainFault {
    #[error("transfer {index}: {rejection}")]
    TransferSignature {
        index: usize,
        rejection: TransferRejection,
    },

    #[error("transfer {index} is for addon {addon_id}")]
    AddonMismatch { index: usize, addon_id: String },

    #[error("transfer {index} is not signed away by the owner at that point")]
    NotFromOwner { index: usize },

    #[error("transfer {index} predates the previous link beyond the allowed clock skew")]
    OutOfOrder { index: usize },

    #[error("transfer {index} reuses nonce {nonce}")]
    DuplicateNonce { index: usize, nonce: String },
}

/// Outcome of [`ProvenanceChain::verify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    pub valid: bool,
    pub addon: VerificationResult,
    pub faults: Vec<ChainFault>,
    pub current_owner: String,
}

impl ChainVerification {
    pub fn error_summary(&self) -> String {
        let mut parts: Vec<String> = self.addon.errors.iter().map(ToString::to_string).collect();
        parts.extend(self.faults.iter().map(ToString::to_string));
        parts.join("; ")
    }
}

/// An addon and the ordered transfers that moved it to its current owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvenanceChain {
    pub addon: Addon,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<AddonTransfer>,
}

impl ProvenanceChain {
    /// Chain for a freshly minted or reissued addon.
    pub fn new(addon: Addon) -> Self {
        Self {
            addon,
            transfers: Vec::new(),
        }
    }

    pub fn addon_id(&self) -> &str {
        &self.addon.id
    }

    /// Declared current owner. Only meaningful once [`verify`](Self::verify)
    /// has passed.
    pub fn current_owner(&self) -> &str {
        self.transfers
            .last()
            .map(|t| t.to_public_key.as_str())
            .unwrap_or(&self.addon.ownership.owner_public_key)
    }

    /// Verify the addon proof and every link as of now.
    pub fn verify(&self, verifier: &Verifier) -> ChainVerification {
        self.verify_at(verifier, now_millis())
    }

    /// Verify the addon proof and every link as of `now` (ms).
    pub fn verify_at(&self, verifier: &Verifier, now: i64) -> ChainVerification {
        let addon = verifier.verify_addon_at(&self.addon, now);
        let skew = verifier.clock_skew_ms();

        let mut faults = Vec::new();
        let mut owner = self.addon.ownership.owner_public_key.as_str();
        let mut last_timestamp = self.addon.ownership.issued_at;
        for (index, transfer) in self.transfers.iter().enumerate() {
            let earlier = &self.transfers[..index];
            faults.extend(link_faults(
                &self.addon.id,
                owner,
                last_timestamp,
                skew,
                earlier,
                index,
                transfer,
            ));
            owner = transfer.to_public_key.as_str();
            last_timestamp = last_timestamp.max(transfer.timestamp);
        }

        let valid = addon.valid && faults.is_empty();
        tracing::debug!(
            addon_id = %self.addon.id,
            links = self.transfers.len(),
            valid,
            "verified provenance chain"
        );

        ChainVerification {
            valid,
            addon,
            faults,
            current_owner: self.current_owner().to_string(),
        }
    }

    /// Append `transfer` if it is a valid next link, allowing no clock skew.
    /// The addon proof itself is not re-checked here.
    pub fn extend(&mut self, transfer: AddonTransfer) -> RelicResult<()> {
        self.extend_with(transfer, &Verifier::new())
    }

    /// Like [`extend`](Self::extend), tolerating `verifier`'s clock skew
    /// between a link and the one before it.
    pub fn extend_with(&mut self, transfer: AddonTransfer, verifier: &Verifier) -> RelicResult<()> {
        let last_timestamp = self
            .transfers
            .iter()
            .map(|t| t.timestamp)
            .fold(self.addon.ownership.issued_at, i64::max);
        let faults = link_faults(
            &self.addon.id,
            self.current_owner(),
            last_timestamp,
            verifier.clock_skew_ms(),
            &self.transfers,
            self.transfers.len(),
            &transfer,
        );
        if let Some(fault) = faults.into_iter().next() {
            return Err(RelicError::TransferRejected {
                addon_id: self.addon.id.clone(),
                reason: fault.to_string(),
            });
        }
        self.transfers.push(transfer);
        Ok(())
    }

    /// Verify and hand out the addon for gameplay use.
    pub fn verified<'a>(&'a self, verifier: &Verifier) -> RelicResult<VerifiedAddon<'a>> {
        let result = self.verify(verifier);
        if !result.valid {
            return Err(RelicError::AddonRejected {
                addon_id: self.addon.id.clone(),
                reason: result.error_summary(),
            });
        }
        Ok(VerifiedAddon::new(&self.addon, result.addon.warnings))
    }
}

fn link_faults(
    addon_id: &str,
    owner: &str,
    last_timestamp: i64,
    clock_skew_ms: i64,
    earlier: &[AddonTransfer],
    index: usize,
    transfer: &AddonTransfer,
) -> Vec<ChainFault> {
    let mut faults = Vec::new();

    if let Err(rejection) = check_transfer(transfer) {
        faults.push(ChainFault::TransferSignature { index, rejection });
    }
    if transfer.addon_id != addon_id {
        faults.push(ChainFault::AddonMismatch {
            index,
            addon_id: transfer.addon_id.clone(),
        });
    }
    if !same_public_key(&transfer.from_public_key, owner) {
        faults.push(ChainFault::NotFromOwner { index });
    }
    if transfer.timestamp.saturating_add(clock_skew_ms) < last_timestamp {
        faults.push(ChainFault::OutOfOrder { index });
    }
    if earlier.iter().any(|t| t.nonce == transfer.nonce) {
        faults.push(ChainFault::DuplicateNonce {
            index,
            nonce: transfer.nonce.clone(),
        });
    }

    faults
}
