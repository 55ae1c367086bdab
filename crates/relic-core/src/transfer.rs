//! Transfer lifecycle: `Unsigned -> Signed -> Consumed`.
//!
//! Each state is its own type. [`UnsignedTransfer::sign`] consumes the draft,
//! so a transfer can only be signed once; signing again means building a new
//! draft with a new nonce and timestamp. [`accept_transfer`] is the only way
//! to obtain a [`ConsumedTransfer`].

use serde::{Deserialize, Serialize};

use crate::codec::{encode_base64, random_nonce, transfer_payload_parts};
use crate::config::DEFAULT_NONCE_BYTES;
use crate::error::{RelicError, RelicResult};
use crate::keys::{same_public_key, PrivateKeyHandle};
use crate::ledger::{NonceLedger, NonceScope};
use crate::provenance::ProvenanceChain;
use crate::signer::sign;
use crate::types::{now_millis, AddonTransfer};
use crate::verifier::{check_transfer, Verifier};

/// Transfer fields assembled by the sender, not yet signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedTransfer {
    addon_id: String,
    from_public_key: String,
    to_public_key: String,
    timestamp: i64,
    nonce: String,
}

impl UnsignedTransfer {
    /// New transfer stamped with the current time and a fresh nonce.
    pub fn new(
        addon_id: impl Into<String>,
        from_public_key: impl Into<String>,
        to_public_key: impl Into<String>,
    ) -> Self {
        Self {
            addon_id: addon_id.into(),
            from_public_key: from_public_key.into(),
            to_public_key: to_public_key.into(),
            timestamp: now_millis(),
            nonce: random_nonce(DEFAULT_NONCE_BYTES),
        }
    }

    /// Next hop of `chain`, sent by its current owner.
    pub fn for_chain(chain: &ProvenanceChain, to_public_key: impl Into<String>) -> Self {
        Self::new(chain.addon_id(), chain.current_owner(), to_public_key)
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Replace the nonce with a fresh one of `len` random bytes (at least 1).
    pub fn with_nonce_bytes(mut self, len: usize) -> Self {
        self.nonce = random_nonce(len.max(1));
        self
    }

    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = nonce.into();
        self
    }

    pub fn addon_id(&self) -> &str {
        &self.addon_id
    }

    pub fn nonce(&self) -> &str {
        &self.nonce
    }

    /// Sign with the sender's private key.
    ///
    /// Fails with [`RelicError::KeyMismatch`] if `private_key` does not
    /// belong to `from_public_key`; such a transfer could never verify.
    pub fn sign(self, private_key: &PrivateKeyHandle) -> RelicResult<AddonTransfer> {
        let signer = private_key.public_key()?;
        let signer_b64 = signer.to_base64();
        if !same_public_key(&self.from_public_key, &signer_b64) {
            return Err(RelicError::KeyMismatch {
                expected: self.from_public_key,
                actual: signer.key_id(),
            });
        }

        let payload = transfer_payload_parts(
            &self.addon_id,
            &self.from_public_key,
            &self.to_public_key,
            self.timestamp,
            &self.nonce,
        )?;
        let signature = encode_base64(sign(&payload, private_key)?);

        tracing::debug!(
            addon_id = %self.addon_id,
            key_id = %signer.key_id(),
            "signed transfer"
        );

        Ok(AddonTransfer {
            addon_id: self.addon_id,
            from_public_key: self.from_public_key,
            to_public_key: self.to_public_key,
            signature,
            timestamp: self.timestamp,
            nonce: self.nonce,
        })
    }
}

/// Build and sign a transfer in one step, deriving `from` from the key.
pub fn create_transfer(
    addon_id: impl Into<String>,
    from_private_key: &PrivateKeyHandle,
    to_public_key: impl Into<String>,
) -> RelicResult<AddonTransfer> {
    let from = from_private_key.public_key()?.to_base64();
    UnsignedTransfer::new(addon_id, from, to_public_key).sign(from_private_key)
}

/// What a sender hands to the receiver: the chain as it stood before this
/// transfer, plus the signed transfer itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferOffer {
    pub chain: ProvenanceChain,
    pub transfer: AddonTransfer,
}

/// A transfer that passed acceptance and whose nonce is now spent.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsumedTransfer {
    /// Provenance chain extended by the accepted transfer.
    pub chain: ProvenanceChain,
    pub transfer: AddonTransfer,
    /// Acceptance time (ms).
    pub consumed_at: i64,
}

/// Accept `transfer` of the addon described by `chain` on behalf of
/// `local_owner`.
///
/// Checks, in order: transfer signature, chain validity, addon id,
/// recipient, sender is the current owner, link ordering, and finally nonce
/// freshness. The nonce is only spent once everything else has passed.
pub async fn accept_transfer(
    chain: &ProvenanceChain,
    transfer: &AddonTransfer,
    local_owner: &str,
    verifier: &Verifier,
    ledger: &dyn NonceLedger,
) -> RelicResult<ConsumedTransfer> {
    let reject = |reason: String| {
        tracing::warn!(addon_id = %transfer.addon_id, %reason, "transfer rejected");
        RelicError::TransferRejected {
            addon_id: transfer.addon_id.clone(),
            reason,
        }
    };

    check_transfer(transfer).map_err(|e| reject(e.to_string()))?;

    let verification = chain.verify(verifier);
    if !verification.valid {
        tracing::warn!(addon_id = %chain.addon_id(), "accompanying addon failed verification");
        return Err(RelicError::AddonRejected {
            addon_id: chain.addon_id().to_string(),
            reason: verification.error_summary(),
        });
    }

    if transfer.addon_id != chain.addon_id() {
        return Err(reject(format!(
            "transfer is for addon {} but accompanies {}",
            transfer.addon_id,
            chain.addon_id()
        )));
    }
    if !same_public_key(&transfer.to_public_key, local_owner) {
        return Err(reject("transfer is not addressed to this owner".to_string()));
    }
    if !same_public_key(&transfer.from_public_key, chain.current_owner()) {
        return Err(reject("sender is not the current owner".to_string()));
    }

    let mut extended = chain.clone();
    extended.extend_with(transfer.clone(), verifier)?;

    if !ledger
        .check_and_mark(NonceScope::Transfer, &transfer.nonce)
        .await?
    {
        tracing::warn!(addon_id = %transfer.addon_id, nonce = %transfer.nonce, "transfer replay");
        return Err(RelicError::Replay {
            nonce: transfer.nonce.clone(),
        });
    }

    tracing::info!(
        addon_id = %transfer.addon_id,
        hops = extended.transfers.len(),
        "accepted transfer"
    );

    Ok(ConsumedTransfer {
        chain: extended,
        transfer: transfer.clone(),
        consumed_at: now_millis(),
    })
}
