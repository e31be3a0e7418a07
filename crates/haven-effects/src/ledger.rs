//! In-memory ledger client for tests and simulation.

use async_trait::async_trait;
use haven_core::{Error, Identity, LedgerClient, OwnershipTransfer, Result};
use std::sync::Mutex;

/// Ledger client that records transfers instead of broadcasting them.
///
/// Produces a deterministic receipt hash from the transfer inputs and can be
/// scripted to fail, which is how tests exercise the engine's
/// leave-request-retryable behavior.
#[derive(Debug, Default)]
pub struct MockLedgerClient {
    failure: Mutex<Option<Error>>,
    transfers: Mutex<Vec<(Identity, Identity)>>,
}

impl MockLedgerClient {
    /// Create a ledger client that accepts every transfer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent transfer fail with `error` until cleared.
    pub fn set_failure(&self, error: Option<Error>) {
        *self.failure.lock().unwrap_or_else(|e| e.into_inner()) = error;
    }

    /// Number of transfers accepted so far.
    pub fn transfer_count(&self) -> usize {
        self.transfers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn transfer_ownership(
        &self,
        wallet: &Identity,
        new_owner: &Identity,
        authorization: &[u8],
    ) -> Result<OwnershipTransfer> {
        if let Some(err) = self
            .failure
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
        {
            return Err(err);
        }

        let mut hasher = blake3::Hasher::new();
        hasher.update(wallet.as_bytes());
        hasher.update(new_owner.as_bytes());
        hasher.update(authorization);
        let digest: [u8; 32] = hasher.finalize().into();

        self.transfers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((*wallet, *new_owner));

        Ok(OwnershipTransfer {
            transaction_hash: hex::encode(digest),
        })
    }
}
