//! Notification payloads.
//!
//! Notifications are ephemeral: they exist for the duration of a dispatch
//! attempt and are never persisted by the engine. Delivery logs, if any,
//! belong to the external notifier.

use crate::identity::{Identity, RequestId};
use serde::{Deserialize, Serialize};

/// Kind of notification event being delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A guardian is asked to review and approve a recovery request
    GuardianApprovalRequest,
    /// The wallet owner is told a recovery was initiated
    RecoveryInitiated,
    /// The wallet owner is told the approval threshold was reached
    ThresholdReached,
    /// The wallet owner is warned 24h before the time lock expires
    TimeLockWarning,
    /// The wallet owner is told the ownership transfer executed
    RecoveryExecuted,
    /// The wallet owner is told the request was cancelled
    RecoveryCancelled,
    /// A test-mode recovery completed
    TestCompleted,
}

impl NotificationKind {
    /// Stable string form, used for subjects and structured logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GuardianApprovalRequest => "guardian-approval-request",
            Self::RecoveryInitiated => "recovery-initiated",
            Self::ThresholdReached => "threshold-reached",
            Self::TimeLockWarning => "time-lock-warning",
            Self::RecoveryExecuted => "recovery-executed",
            Self::RecoveryCancelled => "recovery-cancelled",
            Self::TestCompleted => "test-completed",
        }
    }
}

/// A single notification bound for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    /// What happened
    pub kind: NotificationKind,
    /// Request this notification concerns
    pub request_id: RequestId,
    /// Identity of the intended recipient
    pub recipient: Identity,
    /// Human-readable body
    pub message: String,
    /// When the notification was produced
    pub timestamp_ms: u64,
    /// Optional structured detail (e.g. transaction hash)
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_stable() {
        assert_eq!(
            NotificationKind::GuardianApprovalRequest.as_str(),
            "guardian-approval-request"
        );
        assert_eq!(NotificationKind::TimeLockWarning.as_str(), "time-lock-warning");
    }
}
