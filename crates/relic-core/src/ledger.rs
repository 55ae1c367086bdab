//! Nonce ledger for replay prevention.
//!
//! Signatures alone do not stop a captured transfer from being presented
//! twice. Acceptance consults a [`NonceLedger`]: each nonce may be consumed
//! once per scope, and a second attempt is a replay.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::RelicResult;

/// Which protocol message a nonce belongs to.
///
/// Issuance and transfer nonces live in separate namespaces, so an addon
/// nonce that happens to equal a transfer nonce is not a replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NonceScope {
    Issuance,
    Transfer,
}

/// Consumed-nonce storage.
#[async_trait]
pub trait NonceLedger: Send + Sync {
    /// Atomically consume `nonce`. Returns `Ok(true)` if it was fresh,
    /// `Ok(false)` if it had been consumed before.
    async fn check_and_mark(&self, scope: NonceScope, nonce: &str) -> RelicResult<bool>;

    /// Whether `nonce` has been consumed. Does not mark.
    async fn contains(&self, scope: NonceScope, nonce: &str) -> RelicResult<bool>;
}

/// Process-local ledger.
#[derive(Debug, Default)]
pub struct InMemoryNonceLedger {
    consumed: RwLock<HashMap<NonceScope, BTreeSet<String>>>,
}

impl InMemoryNonceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from previously consumed nonces, e.g. loaded from disk.
    pub fn with_consumed<I, S>(scope: NonceScope, nonces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut consumed = HashMap::new();
        consumed.insert(scope, nonces.into_iter().map(Into::into).collect());
        Self {
            consumed: RwLock::new(consumed),
        }
    }

    /// Consumed nonces in `scope`, sorted.
    pub async fn snapshot(&self, scope: NonceScope) -> Vec<String> {
        self.consumed
            .read()
            .await
            .get(&scope)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of consumed nonces across all scopes.
    pub async fn len(&self) -> usize {
        self.consumed.read().await.values().map(BTreeSet::len).sum()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl NonceLedger for InMemoryNonceLedger {
    async fn check_and_mark(&self, scope: NonceScope, nonce: &str) -> RelicResult<bool> {
        let mut consumed = self.consumed.write().await;
        let fresh = consumed.entry(scope).or_default().insert(nonce.to_string());
        if !fresh {
            tracing::warn!(?scope, nonce, "nonce replay detected");
        }
        Ok(fresh)
    }

    async fn contains(&self, scope: NonceScope, nonce: &str) -> RelicResult<bool> {
        Ok(self
            .consumed
            .read()
            .await
            .get(&scope)
            .is_some_and(|set| set.contains(nonce)))
    }
}
