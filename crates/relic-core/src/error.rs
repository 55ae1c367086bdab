//! Error types for the ownership protocol.
//!
//! Verification of untrusted input never produces these errors; it is folded
//! into [`VerificationResult`](crate::verifier::VerificationResult) or a
//! [`TransferRejection`](crate::verifier::TransferRejection). `RelicError` is
//! reserved for caller mistakes (bad key material handed to a signer) and for
//! the inventory layer.

/// Protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum RelicError {
    /// Malformed base64 or DER input.
    #[error("decode error in {field}: {reason}")]
    Decode { field: String, reason: String },

    /// Key material parsed but is not a usable P-256 key.
    #[error("invalid key: {reason}")]
    InvalidKey { reason: String },

    /// Private key does not belong to the public key it is signing for.
    #[error("key mismatch: signing key {actual} does not match declared {expected}")]
    KeyMismatch { expected: String, actual: String },

    /// The signing primitive failed.
    #[error("signing failed: {reason}")]
    Signing { reason: String },

    /// Canonical payload could not be built.
    #[error("canonicalization failed: {message}")]
    Canonicalize { message: String },

    /// Addon failed verification where a valid one was required.
    #[error("addon {addon_id} rejected: {reason}")]
    AddonRejected { addon_id: String, reason: String },

    /// Transfer failed acceptance checks.
    #[error("transfer of {addon_id} rejected: {reason}")]
    TransferRejected { addon_id: String, reason: String },

    /// Nonce already consumed.
    #[error("replayed nonce: {nonce}")]
    Replay { nonce: String },

    /// Addon not present in the inventory.
    #[error("addon not found: {addon_id}")]
    NotFound { addon_id: String },

    /// Inventory persistence error.
    #[error("inventory error: {message}")]
    Inventory { message: String },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config { message: String },
}

impl RelicError {
    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self {
            // Input / config issues
            Self::Decode { .. } => 1,
            Self::InvalidKey { .. } => 1,
            Self::Config { .. } => 1,
            Self::NotFound { .. } => 1,
            Self::KeyMismatch { .. } => 2,
            Self::Signing { .. } => 2,
            Self::Canonicalize { .. } => 2,

            // Security outcomes
            Self::AddonRejected { .. } => 4,
            Self::TransferRejected { .. } => 4,
            Self::Replay { .. } => 4,

            // Storage
            Self::Inventory { .. } => 6,
        }
    }

    /// Whether the error came from rejecting untrusted input rather than
    /// from the caller or the environment.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::AddonRejected { .. } | Self::TransferRejected { .. } | Self::Replay { .. }
        )
    }

    pub(crate) fn decode(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for protocol operations.
pub type RelicResult<T> = Result<T, RelicError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_security_errors_share_exit_code() {
        let rejected = RelicError::AddonRejected {
            addon_id: "crown-1".into(),
            reason: "expired".into(),
        };
        let replay = RelicError::Replay { nonce: "n1".into() };
        assert_eq!(rejected.exit_code(), 4);
        assert_eq!(replay.exit_code(), 4);
        assert!(rejected.is_rejection());
        assert!(!RelicError::decode("publicKey", "bad").is_rejection());
    }

    #[test]
    fn test_storage_and_input_exit_codes() {
        let storage = RelicError::Inventory {
            message: "disk full".into(),
        };
        assert_eq!(storage.exit_code(), 6);
        assert!(!storage.is_rejection());
        let config = RelicError::Config {
            message: "bad issuer".into(),
        };
        assert_eq!(config.exit_code(), 1);
    }

    #[test]
    fn test_display_includes_field() {
        let err = RelicError::decode("ownerPublicKey", "Invalid padding");
        assert_eq!(
            err.to_string(),
            "decode error in ownerPublicKey: Invalid padding"
        );
    }
}
