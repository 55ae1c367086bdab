//! Runtime configuration.
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `RELIC_INVENTORY_PATH` | Inventory file (default: `~/.relic/inventory.json`) |
//! | `RELIC_CLOCK_SKEW_MS` | Grace period added to `expiresAt` (default: 0) |
//! | `RELIC_NONCE_BYTES` | Random bytes per generated nonce (default: 16) |
//! | `RELIC_TRUSTED_ISSUERS` | Comma separated base64 issuer keys (default: any issuer) |

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Random bytes in a generated nonce.
pub const DEFAULT_NONCE_BYTES: usize = 16;

/// Inventory file name under the default data directory.
pub const INVENTORY_FILE_NAME: &str = "inventory.json";

/// Protocol configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelicConfig {
    /// Where the local inventory is persisted.
    #[serde(default = "default_inventory_path")]
    pub inventory_path: PathBuf,

    /// Grace period in milliseconds before an addon counts as expired.
    #[serde(default)]
    pub clock_skew_ms: i64,

    /// Random bytes per generated nonce.
    #[serde(default = "default_nonce_bytes")]
    pub nonce_bytes: usize,

    /// Issuer keys accepted by the verifier. Empty accepts any issuer.
    #[serde(default)]
    pub trusted_issuers: Vec<String>,
}

fn default_inventory_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relic")
        .join(INVENTORY_FILE_NAME)
}

fn default_nonce_bytes() -> usize {
    DEFAULT_NONCE_BYTES
}

impl Default for RelicConfig {
    fn default() -> Self {
        Self {
            inventory_path: default_inventory_path(),
            clock_skew_ms: 0,
            nonce_bytes: default_nonce_bytes(),
            trusted_issuers: Vec::new(),
        }
    }
}

impl RelicConfig {
    /// Create config from environment variables.
    ///
    /// Unparseable numeric values fall back to their defaults.
    pub fn from_env() -> Self {
        Self {
            inventory_path: std::env::var("RELIC_INVENTORY_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_inventory_path()),
            clock_skew_ms: std::env::var("RELIC_CLOCK_SKEW_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v >= 0)
                .unwrap_or(0),
            nonce_bytes: std::env::var("RELIC_NONCE_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or_else(default_nonce_bytes),
            trusted_issuers: std::env::var("RELIC_TRUSTED_ISSUERS")
                .map(|v| {
                    v.split(',')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }

    /// Set the inventory path.
    pub fn with_inventory_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventory_path = path.into();
        self
    }

    /// Set the expiry grace period.
    pub fn with_clock_skew_ms(mut self, skew: i64) -> Self {
        self.clock_skew_ms = skew.max(0);
        self
    }

    /// Set the generated nonce length. Zero falls back to one byte.
    pub fn with_nonce_bytes(mut self, len: usize) -> Self {
        self.nonce_bytes = len.max(1);
        self
    }

    /// Trust an additional issuer key.
    pub fn with_trusted_issuer(mut self, public_key: impl Into<String>) -> Self {
        self.trusted_issuers.push(public_key.into());
        self
    }
}
