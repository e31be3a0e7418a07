//! # Haven Recovery
//!
//! Guardian-threshold, time-locked wallet recovery. A wallet owner regains
//! control of an account by collecting approvals from a pre-registered set of
//! guardians; once the approval threshold is met a mandatory time lock runs
//! before the ownership change may execute, giving the rightful owner a
//! window to cancel.
//!
//! ## Components
//!
//! - [`GuardianRegistry`] — guardian set with capacity, floor, and threshold
//!   enforcement
//! - [`fraud`] — pure risk scoring applied before a request is admitted
//! - [`RecoveryEngine`] — the request lifecycle state machine
//!   (`initiate → approve* → complete`, or `cancel`)
//! - [`TimeLockScheduler`] — cancellable one-shot warning timers
//! - [`AuditLog`] / [`RecoveryStatistics`] — append-only action log and
//!   derived metrics
//!
//! ## Concurrency
//!
//! The engine behaves as a single logical actor per wallet: every mutating
//! operation runs under a per-wallet lock, so two guardians approving
//! concurrently cannot race past the threshold flip, and `cancel` and
//! `complete` are mutually exclusive. Operations on different wallets
//! proceed in parallel. Notification dispatch happens after the lock is
//! released; delivery is advisory and never part of the consistency boundary.

#![forbid(unsafe_code)]

pub mod audit;
pub mod engine;
pub mod fraud;
pub mod proof;
pub mod registry;
pub mod timelock;
pub mod types;

pub use audit::{compute_statistics, AuditLog, RecoveryStatistics};
pub use engine::{Collaborators, RecoveryEngine};
pub use fraud::RiskAssessment;
pub use registry::GuardianRegistry;
pub use timelock::{TimeLockScheduler, WARNING_LEAD_MS};
pub use types::{
    AuditLogEntry, CompletionReceipt, EmergencyContact, Guardian, GuardianApproval,
    GuardianStatus, RecoveryAction, RecoveryConfig, RecoveryRequest, RecoveryStatus,
    RecoveryTestReport,
};

// Re-export the shared vocabulary so most callers only need this crate.
pub use haven_core::{Error, ErrorClass, EventBus, Identity, RecoveryEvent, RequestId, Result};
pub use haven_notify::NotificationDispatcher;
