//! Shared types for the recovery lifecycle.

use crate::fraud::RiskAssessment;
use haven_core::{ContactId, EntryId, Error, Identity, RequestId, Result, DAY_MS, HOUR_MS};
use serde::{Deserialize, Serialize};

/// Lifecycle status of a guardian within the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GuardianStatus {
    /// Enrolled but not yet verified
    Pending,
    /// Verified and counted toward the threshold
    Active,
    /// Temporarily excluded from counting and approval rights
    Suspended,
    /// Removed; retained for audit history, excluded from all counting
    Removed,
}

impl GuardianStatus {
    /// Stable string form for logs and error detail.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Suspended => "suspended",
            Self::Removed => "removed",
        }
    }
}

/// A trusted party that can approve recovery requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Guardian {
    /// Guardian's public-key identity
    pub identity: Identity,
    /// Human readable label for operator UX
    pub display_name: Option<String>,
    /// Reach information, sealed by the contact vault
    pub sealed_contact: Option<Vec<u8>>,
    /// When the guardian was enrolled
    pub added_at_ms: u64,
    /// Whether the guardian completed verification
    pub verified: bool,
    /// Current lifecycle status
    pub status: GuardianStatus,
    /// Last observed guardian activity (verification or approval)
    pub last_active_at_ms: Option<u64>,
}

/// Configuration governing a wallet-recovery guardian set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryConfig {
    /// Distinct guardian approvals required before the time lock may start
    pub threshold: usize,
    /// Mandatory delay between threshold satisfaction and executability
    pub time_lock_ms: u64,
    /// Floor on the active guardian count
    pub min_guardians: usize,
    /// Cap on the guardian set size (removed guardians excluded)
    pub max_guardians: usize,
    /// Whether test-mode recoveries are allowed
    pub testing_enabled: bool,
    /// How long a pending request may outlive its execution window before
    /// the maintenance sweep expires it
    pub expiry_grace_ms: u64,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            threshold: 2,
            time_lock_ms: 48 * HOUR_MS,
            min_guardians: 3,
            max_guardians: 10,
            testing_enabled: false,
            expiry_grace_ms: 30 * DAY_MS,
        }
    }
}

impl RecoveryConfig {
    /// Check construction invariants.
    pub fn validate(&self) -> Result<()> {
        if self.threshold == 0 {
            return Err(Error::invalid_config("threshold must be at least 1"));
        }
        if self.time_lock_ms < HOUR_MS {
            return Err(Error::invalid_config(
                "time lock duration must be at least one hour",
            ));
        }
        if self.min_guardians == 0 {
            return Err(Error::invalid_config("minimum guardian count must be at least 1"));
        }
        if self.max_guardians < self.min_guardians {
            return Err(Error::invalid_config(
                "maximum guardian count must not be below the minimum",
            ));
        }
        Ok(())
    }
}

/// Lifecycle status of a recovery request.
///
/// Transitions form a strict forward DAG: `Pending → Approved → Executed`,
/// `Pending | Approved → Cancelled`, `Pending → Expired` (maintenance sweep
/// only). `Executed`, `Cancelled`, and `Expired` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStatus {
    /// Collecting guardian approvals
    Pending,
    /// Threshold reached, time lock running
    Approved,
    /// Ownership transfer executed
    Executed,
    /// Cancelled by the owner or a guardian
    Cancelled,
    /// Expired by the maintenance sweep without reaching execution
    Expired,
}

impl RecoveryStatus {
    /// Stable string form for logs and error detail.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Executed => "executed",
            Self::Cancelled => "cancelled",
            Self::Expired => "expired",
        }
    }

    /// Whether the request still occupies the wallet's single active slot.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Approved)
    }

    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

/// One guardian's recorded approval of a recovery request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuardianApproval {
    /// Request being approved
    pub request_id: RequestId,
    /// Approving guardian
    pub guardian: Identity,
    /// When the approval was recorded
    pub approved_at_ms: u64,
    /// Guardian's Ed25519 signature over the canonical approval message
    pub signature: Vec<u8>,
    /// Whether the signature verified against the guardian's public key
    pub verified: bool,
}

/// A single attempt to transfer wallet ownership to a new identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryRequest {
    /// Request identifier
    pub id: RequestId,
    /// Wallet under recovery
    pub wallet: Identity,
    /// When the request was admitted
    pub initiated_at_ms: u64,
    /// Instant the request becomes executable (`initiated_at + time_lock`)
    pub executes_at_ms: u64,
    /// Proposed new owner
    pub proposed_new_owner: Identity,
    /// Approvals recorded so far, in arrival order
    pub approvals: Vec<GuardianApproval>,
    /// Current lifecycle status
    pub status: RecoveryStatus,
    /// When the request was cancelled, if it was
    pub cancelled_at_ms: Option<u64>,
    /// Who cancelled the request, if anyone
    pub cancelled_by: Option<Identity>,
    /// When the request executed, if it did
    pub completed_at_ms: Option<u64>,
    /// Test-mode requests skip the time lock and never touch the ledger
    pub test_mode: bool,
    /// Fraud-heuristic output captured at initiation
    pub risk: RiskAssessment,
}

impl RecoveryRequest {
    /// Number of recorded approvals.
    pub fn approval_count(&self) -> usize {
        self.approvals.len()
    }

    /// Whether `guardian` already approved this request.
    pub fn has_approval_from(&self, guardian: &Identity) -> bool {
        self.approvals.iter().any(|a| &a.guardian == guardian)
    }
}

/// Action recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryAction {
    /// Request admitted
    Initiated,
    /// Guardian approval recorded
    GuardianApproved,
    /// Approval threshold reached
    ThresholdReached,
    /// Time lock started running
    TimeLockStarted,
    /// Request cancelled
    Cancelled,
    /// Ownership transfer executed
    Executed,
    /// Test-mode request completed
    TestCompleted,
    /// Request expired by the maintenance sweep
    Expired,
}

impl RecoveryAction {
    /// Stable string form for events and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "initiated",
            Self::GuardianApproved => "guardian-approved",
            Self::ThresholdReached => "threshold-reached",
            Self::TimeLockStarted => "time-lock-started",
            Self::Cancelled => "cancelled",
            Self::Executed => "executed",
            Self::TestCompleted => "test-completed",
            Self::Expired => "expired",
        }
    }
}

/// One append-only audit record. Never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Entry identifier
    pub id: EntryId,
    /// Request the entry belongs to
    pub request_id: RequestId,
    /// When the action happened
    pub timestamp_ms: u64,
    /// What happened
    pub action: RecoveryAction,
    /// Who performed the action
    pub actor: Identity,
    /// Optional structured detail
    pub details: Option<serde_json::Map<String, serde_json::Value>>,
}

/// An informational escalation contact, independent of the guardian set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyContact {
    /// Contact identifier
    pub id: ContactId,
    /// Display name
    pub name: String,
    /// Reach information, sealed by the contact vault
    pub sealed_contact: Vec<u8>,
    /// Relationship to the wallet owner
    pub relationship: Option<String>,
    /// When the contact was added
    pub added_at_ms: u64,
    /// Whether the contact has been verified
    pub verified: bool,
}

/// Result of a test-mode recovery dry run.
///
/// Reports what actually happened: approvals are not simulated, so
/// `approvals_received` is the genuine (zero) count for a fresh request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecoveryTestReport {
    /// The test request, when initiation succeeded
    pub request_id: Option<RequestId>,
    /// Active guardians that were sent approval requests
    pub guardians_notified: usize,
    /// Approvals recorded on the test request
    pub approvals_received: usize,
    /// Whether the threshold was reached
    pub threshold_reached: bool,
    /// Whether the time lock was simulated rather than waited out
    pub time_lock_simulated: bool,
    /// Errors encountered while driving the dry run
    pub errors: Vec<String>,
    /// Warnings about the limits of the dry run
    pub warnings: Vec<String>,
}

/// Outcome of a successful `complete_recovery`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionReceipt {
    /// Ledger receipt; absent for test-mode completions
    pub transaction_hash: Option<String>,
}
