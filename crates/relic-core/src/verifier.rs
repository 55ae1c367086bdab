//! Addon and transfer verification.
//!
//! # Addon Verification Steps
//!
//! 1. Expiration (`expiresAt < now` is expired; equality is still valid)
//! 2. Owner signature over the rebuilt payload, against `ownerPublicKey`
//! 3. Issuer signature over the same payload, against `issuerPublicKey`
//! 4. Issuer trust (only when a trusted issuer set is configured)
//! 5. Edition advisory (warning only)
//!
//! Every step runs regardless of earlier failures so callers see all
//! problems at once. Untrusted input never turns into an `Err` or a panic.

use p256::ecdsa::signature::Verifier as _;
use p256::ecdsa::Signature;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::codec::{addon_signing_payload, decode_base64, transfer_payload};
use crate::config::RelicConfig;
use crate::error::{RelicError, RelicResult};
use crate::keys::{import_public_key, PublicKeyHandle};
use crate::types::{now_millis, Addon, AddonTransfer};

/// Why a single signature did not verify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SignatureFault {
    /// Key or signature was not valid base64/DER/`r || s`.
    #[error("malformed {field}: {reason}")]
    Decode { field: String, reason: String },

    /// Canonical payload could not be rebuilt.
    #[error("payload error: {reason}")]
    Payload { reason: String },

    /// Well-formed, but the signature does not match key and payload.
    #[error("signature does not match")]
    Mismatch,
}

/// Fatal verification findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationError {
    #[error("addon expired at {expires_at} (now {now})")]
    Expired { expires_at: i64, now: i64 },

    #[error("owner signature invalid: {fault}")]
    OwnerSignatureInvalid { fault: SignatureFault },

    #[error("issuer signature invalid: {fault}")]
    IssuerSignatureInvalid { fault: SignatureFault },

    #[error("issuer key not trusted: {issuer}")]
    UntrustedIssuer { issuer: String },
}

/// Non-fatal findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerificationWarning {
    /// Catalog scarcity limit exceeded. Advisory, not cryptographic.
    #[error("edition {edition} exceeds max editions {max_editions}")]
    EditionLimitExceeded { edition: u32, max_editions: u32 },
}

/// Per-check outcome flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationDetails {
    pub ownership_valid: bool,
    pub issuer_valid: bool,
    pub not_expired: bool,
    pub signature_valid: bool,
}

/// Outcome of [`verify_addon`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResult {
    pub valid: bool,
    pub errors: Vec<VerificationError>,
    pub warnings: Vec<VerificationWarning>,
    pub details: VerificationDetails,
}

impl VerificationResult {
    /// One-line summary of all errors, for logs and rejection messages.
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Why a transfer signature was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransferRejection {
    #[error("transfer signature invalid: {fault}")]
    SignatureInvalid { fault: SignatureFault },
}

/// An addon that passed verification. The only way gameplay code should
/// get at modifiers.
#[derive(Debug, Clone)]
pub struct VerifiedAddon<'a> {
    addon: &'a Addon,
    warnings: Vec<VerificationWarning>,
}

impl<'a> VerifiedAddon<'a> {
    pub(crate) fn new(addon: &'a Addon, warnings: Vec<VerificationWarning>) -> Self {
        Self { addon, warnings }
    }

    pub fn addon(&self) -> &'a Addon {
        self.addon
    }

    pub fn modifiers(&self) -> &'a JsonValue {
        &self.addon.modifiers
    }

    pub fn warnings(&self) -> &[VerificationWarning] {
        &self.warnings
    }
}

/// Configurable verifier.
#[derive(Debug, Clone, Default)]
pub struct Verifier {
    clock_skew_ms: i64,
    trusted_issuers: Vec<PublicKeyHandle>,
}

impl Verifier {
    /// Verifier that accepts any issuer and allows no clock skew.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from config. Malformed trusted issuer keys are a config error.
    pub fn from_config(config: &RelicConfig) -> RelicResult<Self> {
        let mut verifier = Self::new().with_clock_skew_ms(config.clock_skew_ms);
        for issuer in &config.trusted_issuers {
            let key = import_public_key(issuer).map_err(|e| RelicError::Config {
                message: format!("invalid trusted issuer key: {}", e),
            })?;
            verifier = verifier.trust_issuer(key);
        }
        Ok(verifier)
    }

    /// Tolerated clock difference (ms) for expiry and link ordering.
    pub fn clock_skew_ms(&self) -> i64 {
        self.clock_skew_ms
    }

    pub fn with_clock_skew_ms(mut self, skew: i64) -> Self {
        self.clock_skew_ms = skew.max(0);
        self
    }

    /// Restrict accepted issuers. Once any issuer is trusted, all others are
    /// rejected.
    pub fn trust_issuer(mut self, key: PublicKeyHandle) -> Self {
        if !self.trusted_issuers.contains(&key) {
            self.trusted_issuers.push(key);
        }
        self
    }

    /// Verify against the current time.
    pub fn verify_addon(&self, addon: &Addon) -> VerificationResult {
        self.verify_addon_at(addon, now_millis())
    }

    /// Verify as of `now` (ms).
    pub fn verify_addon_at(&self, addon: &Addon, now: i64) -> VerificationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        // 1. Expiration
        let mut not_expired = true;
        if let Some(expires_at) = addon.ownership.expires_at {
            if expires_at.saturating_add(self.clock_skew_ms) < now {
                not_expired = false;
                errors.push(VerificationError::Expired { expires_at, now });
            }
        }

        let payload = addon_signing_payload(addon).map_err(|e| SignatureFault::Payload {
            reason: e.to_string(),
        });

        // 2. Owner signature
        let owner_check = payload.as_deref().map_err(Clone::clone).and_then(|payload| {
            verify_signature(
                payload,
                "ownerPublicKey",
                &addon.ownership.owner_public_key,
                "signature",
                &addon.ownership.signature,
            )
            .map(|_| ())
        });
        let ownership_valid = match owner_check {
            Ok(()) => true,
            Err(fault) => {
                errors.push(VerificationError::OwnerSignatureInvalid { fault });
                false
            }
        };

        // 3. Issuer signature
        let issuer_check = payload.as_deref().map_err(Clone::clone).and_then(|payload| {
            verify_signature(
                payload,
                "issuerPublicKey",
                &addon.ownership.issuer_public_key,
                "issuerSignature",
                &addon.ownership.issuer_signature,
            )
        });
        let issuer_valid = match issuer_check {
            Ok(issuer_key) => {
                // 4. Issuer trust
                if self.trusted_issuers.is_empty() || self.trusted_issuers.contains(&issuer_key) {
                    true
                } else {
                    errors.push(VerificationError::UntrustedIssuer {
                        issuer: issuer_key.key_id(),
                    });
                    false
                }
            }
            Err(fault) => {
                errors.push(VerificationError::IssuerSignatureInvalid { fault });
                false
            }
        };
        // 5. Edition advisory
        if let (Some(edition), Some(max_editions)) =
            (addon.metadata.edition, addon.metadata.max_editions)
        {
            if edition > max_editions {
                warnings.push(VerificationWarning::EditionLimitExceeded {
                    edition,
                    max_editions,
                });
            }
        }

        let signature_valid = ownership_valid && issuer_valid;
        let valid = signature_valid && not_expired;

        tracing::debug!(
            addon_id = %addon.id,
            valid,
            ownership_valid,
            issuer_valid,
            not_expired,
            warnings = warnings.len(),
            "verified addon"
        );

        VerificationResult {
            valid,
            errors,
            warnings,
            details: VerificationDetails {
                ownership_valid,
                issuer_valid,
                not_expired,
                signature_valid,
            },
        }
    }

    /// Verify and hand out a [`VerifiedAddon`], or reject with every error.
    pub fn require_valid<'a>(&self, addon: &'a Addon) -> RelicResult<VerifiedAddon<'a>> {
        let result = self.verify_addon(addon);
        if !result.valid {
            return Err(RelicError::AddonRejected {
                addon_id: addon.id.clone(),
                reason: result.error_summary(),
            });
        }
        Ok(VerifiedAddon::new(addon, result.warnings))
    }
}

/// Verify an addon with the default verifier.
pub fn verify_addon(addon: &Addon) -> VerificationResult {
    Verifier::new().verify_addon(addon)
}

/// Verify an addon as of `now` (ms) with the default verifier.
pub fn verify_addon_at(addon: &Addon, now: i64) -> VerificationResult {
    Verifier::new().verify_addon_at(addon, now)
}

/// Check a transfer signature against its declared sender key.
///
/// Says nothing about whether the addon exists or whether the sender owns
/// it; that is up to whoever honors the transfer.
pub fn check_transfer(transfer: &AddonTransfer) -> Result<(), TransferRejection> {
    let payload = transfer_payload(transfer).map_err(|e| TransferRejection::SignatureInvalid {
        fault: SignatureFault::Payload {
            reason: e.to_string(),
        },
    })?;

    verify_signature(
        &payload,
        "fromPublicKey",
        &transfer.from_public_key,
        "signature",
        &transfer.signature,
    )
    .map(|_| ())
    .map_err(|fault| TransferRejection::SignatureInvalid { fault })
}

/// Boolean form of [`check_transfer`].
pub fn verify_transfer(transfer: &AddonTransfer) -> bool {
    match check_transfer(transfer) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(addon_id = %transfer.addon_id, error = %e, "transfer rejected");
            false
        }
    }
}

/// Verify one base64 signature over `payload`. Returns the imported key so
/// callers can apply trust decisions to it.
fn verify_signature(
    payload: &[u8],
    key_field: &str,
    public_key_b64: &str,
    signature_field: &str,
    signature_b64: &str,
) -> Result<PublicKeyHandle, SignatureFault> {
    let key = import_public_key(public_key_b64).map_err(|e| SignatureFault::Decode {
        field: key_field.to_string(),
        reason: e.to_string(),
    })?;

    let signature_bytes =
        decode_base64(signature_field, signature_b64).map_err(|e| SignatureFault::Decode {
            field: signature_field.to_string(),
            reason: e.to_string(),
        })?;

    let signature = Signature::from_slice(&signature_bytes).map_err(|e| SignatureFault::Decode {
        field: signature_field.to_string(),
        reason: format!("invalid signature bytes: {}", e),
    })?;

    key.verifying_key()
        .verify(payload, &signature)
        .map_err(|_| SignatureFault::Mismatch)?;

    Ok(key)
}
