//! Contracts of the external collaborators the engine consumes.
//!
//! Everything stateful or platform-specific reaches the engine through one of
//! these traits, constructor-injected as an `Arc<dyn …>`. Production and test
//! handlers live in `haven-effects`; the engine itself never touches the
//! system clock, key material, or a network socket directly.

use crate::error::Result;
use crate::identity::Identity;
use crate::time::PhysicalTime;
use async_trait::async_trait;

/// Wall-clock source.
#[async_trait]
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    async fn physical_time(&self) -> PhysicalTime;

    /// Suspend the calling task for `ms` milliseconds (virtual time in tests).
    async fn sleep_ms(&self, ms: u64);
}

/// Encrypts and decrypts guardian/emergency-contact reach information.
///
/// Sealing is mandatory wherever contact data is stored: a vault failure
/// fails the whole mutating operation, it is never best-effort.
#[async_trait]
pub trait ContactVault: Send + Sync {
    /// Seal plaintext into an opaque blob.
    async fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Open a previously sealed blob.
    async fn open(&self, blob: &[u8]) -> Result<Vec<u8>>;
}

/// Receipt returned by a successful on-chain ownership transfer.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OwnershipTransfer {
    /// Hash of the submitted transaction
    pub transaction_hash: String,
}

/// Builds, signs, and broadcasts the ownership-transfer transaction.
///
/// Errors are propagated to the engine's caller verbatim; the engine leaves
/// the request retryable when a transfer fails.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Transfer ownership of `wallet` to `new_owner`.
    async fn transfer_ownership(
        &self,
        wallet: &Identity,
        new_owner: &Identity,
        authorization: &[u8],
    ) -> Result<OwnershipTransfer>;
}

/// Email delivery, injected by the host application.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Send an email notification.
    async fn send_email(&self, to: &str, subject: &str, body: &str) -> Result<()>;
}

/// SMS delivery, injected by the host application.
#[async_trait]
pub trait SmsSender: Send + Sync {
    /// Send an SMS notification.
    async fn send_sms(&self, to: &str, body: &str) -> Result<()>;
}

/// Push delivery, injected by the host application.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Send a push notification.
    async fn send_push(&self, to: &str, title: &str, body: &str) -> Result<()>;
}

/// Syntactic identity validation, applied before any key is parsed.
pub trait IdentityValidator: Send + Sync {
    /// Whether `raw` is a well-formed public-key identity.
    fn is_valid(&self, raw: &str) -> bool;
}
