//! Domain events and the engine's publish/subscribe bus.
//!
//! Event emission is an explicit observer interface, not inherited emitter
//! behavior: the engine owns an [`EventBus`] and callers subscribe through
//! it. Publishing is lossy and best-effort; an event with no subscribers is
//! not an error.

use crate::identity::{Identity, RequestId};
use crate::notification::{Notification, NotificationKind};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default buffer depth for event subscriptions.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Everything observable about the engine's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RecoveryEvent {
    /// A guardian joined the set (pending verification)
    GuardianAdded {
        /// Identity of the new guardian
        guardian: Identity,
    },
    /// A guardian was marked removed
    GuardianRemoved {
        /// Identity of the removed guardian
        guardian: Identity,
    },
    /// A pending guardian became active
    GuardianVerified {
        /// Identity of the verified guardian
        guardian: Identity,
    },
    /// An active guardian was suspended
    GuardianSuspended {
        /// Identity of the suspended guardian
        guardian: Identity,
    },
    /// A suspended guardian was reinstated
    GuardianReinstated {
        /// Identity of the reinstated guardian
        guardian: Identity,
    },
    /// A recovery request was admitted
    RecoveryInitiated {
        /// New request id
        request_id: RequestId,
        /// Wallet under recovery
        wallet: Identity,
    },
    /// A guardian approval was recorded
    GuardianApproved {
        /// Request being approved
        request_id: RequestId,
        /// Approving guardian
        guardian: Identity,
        /// Approvals recorded so far
        approvals: usize,
    },
    /// The approval threshold was reached and the time lock started
    RecoveryApproved {
        /// Approved request
        request_id: RequestId,
        /// Instant the request becomes executable
        executes_at_ms: u64,
    },
    /// The ownership transfer executed
    RecoveryExecuted {
        /// Executed request
        request_id: RequestId,
        /// Ledger receipt, absent for test-mode runs
        transaction_hash: Option<String>,
    },
    /// A test-mode recovery completed without touching the ledger
    RecoveryTestCompleted {
        /// Completed test request
        request_id: RequestId,
    },
    /// A request was cancelled
    RecoveryCancelled {
        /// Cancelled request
        request_id: RequestId,
        /// Who cancelled it
        cancelled_by: Identity,
    },
    /// A stale pending request was expired by the maintenance sweep
    RecoveryExpired {
        /// Expired request
        request_id: RequestId,
    },
    /// A notification was handed to a delivery channel
    Notification(Notification),
    /// A notification had no resolvable contact and was skipped
    NotificationSkipped {
        /// Kind of the skipped notification
        kind: NotificationKind,
        /// Intended recipient
        recipient: Identity,
    },
    /// A notification fell through to the logging sink
    NotificationLogged {
        /// Kind of the logged notification
        kind: NotificationKind,
        /// Intended recipient
        recipient: Identity,
    },
    /// An audit entry was appended
    ActionLogged {
        /// Request the entry belongs to
        request_id: RequestId,
        /// Stable action name
        action: String,
    },
}

impl RecoveryEvent {
    /// Stable event kind, matching the engine's public event vocabulary.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::GuardianAdded { .. } => "guardian-added",
            Self::GuardianRemoved { .. } => "guardian-removed",
            Self::GuardianVerified { .. } => "guardian-verified",
            Self::GuardianSuspended { .. } => "guardian-suspended",
            Self::GuardianReinstated { .. } => "guardian-reinstated",
            Self::RecoveryInitiated { .. } => "recovery-initiated",
            Self::GuardianApproved { .. } => "guardian-approved",
            Self::RecoveryApproved { .. } => "recovery-approved",
            Self::RecoveryExecuted { .. } => "recovery-executed",
            Self::RecoveryTestCompleted { .. } => "recovery-test-completed",
            Self::RecoveryCancelled { .. } => "recovery-cancelled",
            Self::RecoveryExpired { .. } => "recovery-expired",
            Self::Notification(_) => "notification",
            Self::NotificationSkipped { .. } => "notification-skipped",
            Self::NotificationLogged { .. } => "notification-logged",
            Self::ActionLogged { .. } => "action-logged",
        }
    }
}

/// Broadcast bus carrying [`RecoveryEvent`]s to any number of subscribers.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<RecoveryEvent>,
}

impl EventBus {
    /// Create a bus with the default buffer depth.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Subscribe to all subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<RecoveryEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Lossy: without subscribers the event is dropped.
    pub fn publish(&self, event: RecoveryEvent) {
        tracing::trace!(kind = event.kind(), "publishing recovery event");
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
