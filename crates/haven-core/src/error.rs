//! Unified error system for the recovery engine.
//!
//! Every rejected operation maps to a stable, named variant so callers can
//! branch on the condition instead of parsing message text. Expected outcomes
//! of normal use (time lock still running, threshold not yet met) carry their
//! structured detail for the same reason.

use serde::{Deserialize, Serialize};

/// Unified error type for all recovery operations.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum Error {
    /// Input was not a well-formed public-key identity
    #[error("Invalid identity: {value}")]
    InvalidIdentity {
        /// The rejected input, verbatim
        value: String,
    },

    /// Configuration violates a construction invariant
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the violated invariant
        message: String,
    },

    /// Guardian identity already present in the set (including removed history)
    #[error("Guardian already registered: {guardian}")]
    DuplicateGuardian {
        /// Identity of the existing guardian
        guardian: String,
    },

    /// Guardian identity is not in the set
    #[error("Guardian not found: {guardian}")]
    GuardianNotFound {
        /// Identity that was looked up
        guardian: String,
    },

    /// Guardian set is at its configured maximum
    #[error("Guardian capacity exceeded: maximum is {max}")]
    CapacityExceeded {
        /// Configured maximum guardian count
        max: usize,
    },

    /// Operation would drop the active guardian count to or below the floor
    #[error("Active guardian count would fall below minimum of {min}")]
    BelowMinimum {
        /// Configured minimum guardian count
        min: usize,
    },

    /// Test-mode recovery requested but disabled by configuration
    #[error("Testing is disabled for this configuration")]
    TestingDisabled,

    /// Fraud heuristic rejected the recovery attempt
    #[error("Recovery verification failed (risk score {risk_score}): {indicators:?}")]
    VerificationFailed {
        /// Aggregate risk score, 0..=100
        risk_score: u8,
        /// Fraud indicators that fired
        indicators: Vec<String>,
    },

    /// A pending or approved request already exists for the wallet
    #[error("An active recovery request already exists for wallet {wallet}")]
    ActiveRequestExists {
        /// Wallet identity with the active request
        wallet: String,
    },

    /// Recovery request id is unknown
    #[error("Recovery request not found: {request}")]
    RequestNotFound {
        /// Request id that was looked up
        request: String,
    },

    /// Request is not in the status the operation requires
    #[error("Invalid request state: expected {expected}, found {actual}")]
    InvalidState {
        /// Status the operation requires
        expected: String,
        /// Status the request is actually in
        actual: String,
    },

    /// Approver is not an active guardian of this configuration
    #[error("Unknown or inactive guardian: {guardian}")]
    UnknownOrInactiveGuardian {
        /// Identity that attempted to approve
        guardian: String,
    },

    /// Guardian has already approved this request
    #[error("Guardian {guardian} has already approved this request")]
    DuplicateApproval {
        /// Identity of the duplicate approver
        guardian: String,
    },

    /// Approval signature did not verify against the guardian's public key
    #[error("Approval proof from {guardian} failed verification")]
    InvalidApprovalProof {
        /// Identity whose proof was rejected
        guardian: String,
    },

    /// Request has already executed
    #[error("Recovery request has already been executed")]
    AlreadyExecuted,

    /// Request has already been cancelled
    #[error("Recovery request has already been cancelled")]
    AlreadyCancelled,

    /// The mandatory time lock has not elapsed yet
    #[error("Time lock has not expired: {remaining_ms}ms remaining")]
    TimeLockNotExpired {
        /// Milliseconds until the request becomes executable
        remaining_ms: u64,
    },

    /// Recorded approvals fall below the configured threshold
    #[error("Insufficient approvals: have {have}, need {need}")]
    InsufficientApprovals {
        /// Approvals currently recorded
        have: usize,
        /// Configured threshold
        need: usize,
    },

    /// Contact vault seal/open failure
    #[error("Contact vault error: {message}")]
    Vault {
        /// Underlying vault failure
        message: String,
    },

    /// Ledger client failure, propagated verbatim from the collaborator
    #[error("Ledger error: {message}")]
    Ledger {
        /// Underlying ledger failure
        message: String,
    },

    /// Internal engine error
    #[error("Internal error: {message}")]
    Internal {
        /// Description of the internal failure
        message: String,
    },
}

/// Coarse error taxonomy used by callers to decide retry/presentation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorClass {
    /// Malformed input; never retried automatically
    Validation,
    /// The operation conflicts with current lifecycle state
    StateConflict,
    /// A policy rule rejected an otherwise well-formed operation
    Policy,
    /// An external collaborator failed
    External,
    /// Engine-internal fault
    Internal,
}

impl Error {
    /// Create an invalid identity error.
    pub fn invalid_identity(value: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            value: value.into(),
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an invalid state error from the expected and actual status names.
    pub fn invalid_state(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::InvalidState {
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a contact vault error.
    pub fn vault(message: impl Into<String>) -> Self {
        Self::Vault {
            message: message.into(),
        }
    }

    /// Create a ledger error.
    pub fn ledger(message: impl Into<String>) -> Self {
        Self::Ledger {
            message: message.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify this error per the engine's error taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidIdentity { .. }
            | Self::InvalidConfig { .. }
            | Self::InvalidApprovalProof { .. } => ErrorClass::Validation,
            Self::DuplicateGuardian { .. }
            | Self::GuardianNotFound { .. }
            | Self::ActiveRequestExists { .. }
            | Self::RequestNotFound { .. }
            | Self::InvalidState { .. }
            | Self::UnknownOrInactiveGuardian { .. }
            | Self::DuplicateApproval { .. }
            | Self::AlreadyExecuted
            | Self::AlreadyCancelled => ErrorClass::StateConflict,
            Self::TestingDisabled
            | Self::CapacityExceeded { .. }
            | Self::BelowMinimum { .. }
            | Self::VerificationFailed { .. }
            | Self::TimeLockNotExpired { .. }
            | Self::InsufficientApprovals { .. } => ErrorClass::Policy,
            Self::Vault { .. } | Self::Ledger { .. } => ErrorClass::External,
            Self::Internal { .. } => ErrorClass::Internal,
        }
    }
}

/// Standard Result type for recovery operations.
pub type Result<T> = std::result::Result<T, Error>;
