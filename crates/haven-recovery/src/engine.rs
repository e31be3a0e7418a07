//! Recovery request lifecycle state machine.
//!
//! The engine owns the request store, the guardian registry, and the audit
//! log, and coordinates every external collaborator. Each wallet behaves as
//! a single logical actor: mutating operations serialize on a per-wallet
//! lock, so concurrent guardian approvals cannot race past the threshold
//! flip and `cancel`/`complete` are mutually exclusive. Notifications are
//! built under the lock but dispatched after it is released — delivery is
//! advisory and never part of the consistency boundary.

use crate::audit::{compute_statistics, AuditLog, RecoveryStatistics};
use crate::fraud;
use crate::proof;
use crate::registry::GuardianRegistry;
use crate::timelock::{TimeLockScheduler, WARNING_LEAD_MS};
use crate::types::{
    AuditLogEntry, CompletionReceipt, EmergencyContact, Guardian, GuardianApproval,
    RecoveryAction, RecoveryConfig, RecoveryRequest, RecoveryStatus, RecoveryTestReport,
};
use haven_core::{
    Clock, ContactId, ContactVault, EntryId, Error, EventBus, Identity, IdentityValidator,
    LedgerClient, Notification, NotificationKind, RecoveryEvent, RequestId, Result,
};
use haven_notify::NotificationDispatcher;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{broadcast, Mutex as AsyncMutex, OwnedMutexGuard, RwLock};

// =============================================================================
// ENGINE STATE
// =============================================================================

/// External collaborators, constructor-injected. No module-level singletons.
#[derive(Clone)]
pub struct Collaborators {
    /// Wall-clock source
    pub clock: Arc<dyn Clock>,
    /// Seals and opens contact reach information
    pub vault: Arc<dyn ContactVault>,
    /// Builds, signs, and broadcasts the ownership-transfer transaction
    pub ledger: Arc<dyn LedgerClient>,
    /// Syntactic identity validation
    pub validator: Arc<dyn IdentityValidator>,
}

/// Everything the engine mutates, behind one lock.
struct EngineState {
    registry: GuardianRegistry,
    requests: IndexMap<RequestId, RecoveryRequest>,
    audit: AuditLog,
    emergency_contacts: Vec<EmergencyContact>,
    owner_contacts: HashMap<Identity, Vec<u8>>,
}

struct EngineInner {
    clock: Arc<dyn Clock>,
    vault: Arc<dyn ContactVault>,
    ledger: Arc<dyn LedgerClient>,
    validator: Arc<dyn IdentityValidator>,
    dispatcher: NotificationDispatcher,
    events: EventBus,
    scheduler: TimeLockScheduler,
    state: RwLock<EngineState>,
    wallet_locks: StdMutex<HashMap<Identity, Arc<AsyncMutex<()>>>>,
}

/// The recovery state machine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct RecoveryEngine {
    inner: Arc<EngineInner>,
}

/// A notification plus the sealed contact blob it should be delivered to,
/// collected under the wallet lock and dispatched after release.
type Outbox = Vec<(Notification, Option<Vec<u8>>)>;

impl RecoveryEngine {
    /// Create an engine for a validated configuration.
    pub fn new(
        config: RecoveryConfig,
        collaborators: Collaborators,
        dispatcher: NotificationDispatcher,
        events: EventBus,
    ) -> Result<Self> {
        let registry = GuardianRegistry::new(config)?;
        let scheduler = TimeLockScheduler::new(Arc::clone(&collaborators.clock));
        Ok(Self {
            inner: Arc::new(EngineInner {
                clock: collaborators.clock,
                vault: collaborators.vault,
                ledger: collaborators.ledger,
                validator: collaborators.validator,
                dispatcher,
                events,
                scheduler,
                state: RwLock::new(EngineState {
                    registry,
                    requests: IndexMap::new(),
                    audit: AuditLog::new(),
                    emergency_contacts: Vec::new(),
                    owner_contacts: HashMap::new(),
                }),
                wallet_locks: StdMutex::new(HashMap::new()),
            }),
        })
    }

    /// Subscribe to all subsequent engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<RecoveryEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // GUARDIAN REGISTRY OPERATIONS
    // =========================================================================

    /// Enroll a new guardian. The contact, when provided, is sealed by the
    /// vault before it is stored; a vault failure fails the whole operation.
    pub async fn add_guardian(
        &self,
        identity: &str,
        display_name: Option<&str>,
        contact: Option<&str>,
    ) -> Result<Guardian> {
        let identity = self.parse_identity(identity)?;

        // Reject duplicates before paying for a seal.
        {
            let state = self.inner.state.read().await;
            if state.registry.get(&identity).is_some() {
                return Err(Error::DuplicateGuardian {
                    guardian: identity.to_string(),
                });
            }
        }

        let sealed_contact = match contact {
            Some(plaintext) => Some(self.inner.vault.seal(plaintext.as_bytes()).await?),
            None => None,
        };

        let now = self.now_ms().await;
        let guardian = {
            let mut state = self.inner.state.write().await;
            state.registry.add_guardian(
                identity,
                display_name.map(str::to_string),
                sealed_contact,
                now,
            )?
        };

        self.inner
            .events
            .publish(RecoveryEvent::GuardianAdded { guardian: identity });
        Ok(guardian)
    }

    /// Mark a guardian removed, recomputing the threshold if necessary.
    pub async fn remove_guardian(&self, identity: &str) -> Result<()> {
        let identity = self.parse_identity(identity)?;
        {
            let mut state = self.inner.state.write().await;
            state.registry.remove_guardian(&identity)?;
        }
        self.inner
            .events
            .publish(RecoveryEvent::GuardianRemoved { guardian: identity });
        Ok(())
    }

    /// Verify a pending guardian, activating it.
    pub async fn verify_guardian(&self, identity: &str) -> Result<()> {
        let identity = self.parse_identity(identity)?;
        let now = self.now_ms().await;
        {
            let mut state = self.inner.state.write().await;
            state.registry.verify_guardian(&identity, now)?;
        }
        self.inner
            .events
            .publish(RecoveryEvent::GuardianVerified { guardian: identity });
        Ok(())
    }

    /// Suspend an active guardian.
    pub async fn suspend_guardian(&self, identity: &str) -> Result<()> {
        let identity = self.parse_identity(identity)?;
        {
            let mut state = self.inner.state.write().await;
            state.registry.suspend_guardian(&identity)?;
        }
        self.inner
            .events
            .publish(RecoveryEvent::GuardianSuspended { guardian: identity });
        Ok(())
    }

    /// Reinstate a suspended guardian.
    pub async fn reinstate_guardian(&self, identity: &str) -> Result<()> {
        let identity = self.parse_identity(identity)?;
        let now = self.now_ms().await;
        {
            let mut state = self.inner.state.write().await;
            state.registry.reinstate_guardian(&identity, now)?;
        }
        self.inner
            .events
            .publish(RecoveryEvent::GuardianReinstated { guardian: identity });
        Ok(())
    }

    /// All guardians, including removed history.
    pub async fn list_guardians(&self) -> Vec<Guardian> {
        self.inner.state.read().await.registry.list()
    }

    /// Number of active guardians.
    pub async fn active_guardian_count(&self) -> usize {
        self.inner.state.read().await.registry.active_count()
    }

    // =========================================================================
    // RECOVERY LIFECYCLE
    // =========================================================================

    /// Admit a new recovery request for `wallet`.
    ///
    /// Runs the fraud heuristic and refuses when a pending or approved
    /// request already occupies the wallet's single active slot. On success,
    /// every active guardian receives an approval request and the owner is
    /// notified that a recovery has started.
    pub async fn initiate_recovery(
        &self,
        wallet: &str,
        proposed_new_owner: &str,
        test_mode: bool,
    ) -> Result<RecoveryRequest> {
        let wallet = self.parse_identity(wallet)?;
        let proposed = self.parse_identity(proposed_new_owner)?;

        let guard = self.wallet_lock(wallet).await;
        let now = self.now_ms().await;

        let mut outbox: Outbox = Vec::new();
        let request = {
            let mut state = self.inner.state.write().await;

            if test_mode && !state.registry.config().testing_enabled {
                return Err(Error::TestingDisabled);
            }

            let prior: Vec<u64> = state
                .requests
                .values()
                .filter(|r| r.wallet == wallet)
                .map(|r| r.initiated_at_ms)
                .collect();
            let risk = fraud::assess(
                &wallet,
                &proposed,
                &prior,
                state.registry.active_verified_count(),
                state.registry.threshold(),
                now,
            );
            if !risk.admissible() {
                tracing::warn!(
                    wallet = %wallet,
                    risk_score = risk.risk_score,
                    indicators = ?risk.indicators,
                    "recovery attempt rejected by fraud heuristic"
                );
                return Err(Error::VerificationFailed {
                    risk_score: risk.risk_score,
                    indicators: risk.indicators,
                });
            }

            if state
                .requests
                .values()
                .any(|r| r.wallet == wallet && r.status.is_active())
            {
                return Err(Error::ActiveRequestExists {
                    wallet: wallet.to_string(),
                });
            }

            let time_lock_ms = state.registry.config().time_lock_ms;
            let request = RecoveryRequest {
                id: RequestId::new(),
                wallet,
                initiated_at_ms: now,
                executes_at_ms: now + time_lock_ms,
                proposed_new_owner: proposed,
                approvals: Vec::new(),
                status: RecoveryStatus::Pending,
                cancelled_at_ms: None,
                cancelled_by: None,
                completed_at_ms: None,
                test_mode,
                risk,
            };
            state.requests.insert(request.id, request.clone());

            let mut details = serde_json::Map::new();
            details.insert(
                "proposed_new_owner".to_string(),
                serde_json::Value::String(proposed.to_string()),
            );
            details.insert("test_mode".to_string(), serde_json::Value::Bool(test_mode));
            append_audit(
                &mut state,
                &self.inner.events,
                now,
                request.id,
                RecoveryAction::Initiated,
                wallet,
                Some(details),
            );

            for guardian in state.registry.active_guardians() {
                outbox.push((
                    Notification {
                        kind: NotificationKind::GuardianApprovalRequest,
                        request_id: request.id,
                        recipient: guardian.identity,
                        message: format!(
                            "Recovery of wallet {wallet} to new owner {proposed} awaits your approval"
                        ),
                        timestamp_ms: now,
                        metadata: None,
                    },
                    guardian.sealed_contact.clone(),
                ));
            }
            outbox.push((
                Notification {
                    kind: NotificationKind::RecoveryInitiated,
                    request_id: request.id,
                    recipient: wallet,
                    message: format!(
                        "A recovery of your wallet to {proposed} was initiated; cancel it if this was not you"
                    ),
                    timestamp_ms: now,
                    metadata: None,
                },
                state.owner_contacts.get(&wallet).cloned(),
            ));

            request
        };

        tracing::info!(
            request = %request.id,
            wallet = %request.wallet,
            executes_at_ms = request.executes_at_ms,
            test_mode,
            "recovery initiated"
        );
        self.inner.events.publish(RecoveryEvent::RecoveryInitiated {
            request_id: request.id,
            wallet: request.wallet,
        });

        drop(guard);
        self.deliver(outbox).await;
        Ok(request)
    }

    /// Record one guardian's approval.
    ///
    /// The signature must be the guardian's Ed25519 signature over
    /// [`proof::approval_message`]. When the approval first reaches the
    /// threshold the request atomically flips to `Approved`, the time lock
    /// starts, the owner is notified, and the warning timer is armed.
    pub async fn guardian_approve(
        &self,
        request_id: RequestId,
        guardian: &str,
        signature: &[u8],
    ) -> Result<GuardianApproval> {
        let guardian = self.parse_identity(guardian)?;
        let wallet = self.request_wallet(request_id).await?;
        let guard = self.wallet_lock(wallet).await;
        let now = self.now_ms().await;

        let mut outbox: Outbox = Vec::new();
        let (approval, approvals_now, crossed_at) = {
            let mut state = self.inner.state.write().await;

            // Limit the request borrow so the registry stays reachable.
            let (proposed, executes_at_ms) = {
                let request = get_request(&state.requests, request_id)?;
                if request.status != RecoveryStatus::Pending {
                    return Err(Error::invalid_state("pending", request.status.as_str()));
                }
                (request.proposed_new_owner, request.executes_at_ms)
            };

            if !state.registry.is_active(&guardian) {
                return Err(Error::UnknownOrInactiveGuardian {
                    guardian: guardian.to_string(),
                });
            }
            if get_request(&state.requests, request_id)?.has_approval_from(&guardian) {
                return Err(Error::DuplicateApproval {
                    guardian: guardian.to_string(),
                });
            }

            proof::verify_approval_signature(request_id, &guardian, &proposed, signature)?;

            let approval = GuardianApproval {
                request_id,
                guardian,
                approved_at_ms: now,
                signature: signature.to_vec(),
                verified: true,
            };

            let threshold = state.registry.threshold();
            let (approvals_now, crossed) = {
                let request = state
                    .requests
                    .get_mut(&request_id)
                    .ok_or_else(|| not_found(request_id))?;
                request.approvals.push(approval.clone());
                let crossed = request.approvals.len() >= threshold;
                if crossed {
                    request.status = RecoveryStatus::Approved;
                }
                (request.approvals.len(), crossed)
            };

            state.registry.touch(&guardian, now);

            let mut details = serde_json::Map::new();
            details.insert(
                "approvals".to_string(),
                serde_json::Value::from(approvals_now as u64),
            );
            details.insert(
                "threshold".to_string(),
                serde_json::Value::from(threshold as u64),
            );
            append_audit(
                &mut state,
                &self.inner.events,
                now,
                request_id,
                RecoveryAction::GuardianApproved,
                guardian,
                Some(details),
            );

            if crossed {
                append_audit(
                    &mut state,
                    &self.inner.events,
                    now,
                    request_id,
                    RecoveryAction::ThresholdReached,
                    guardian,
                    None,
                );
                let mut details = serde_json::Map::new();
                details.insert(
                    "executes_at_ms".to_string(),
                    serde_json::Value::from(executes_at_ms),
                );
                append_audit(
                    &mut state,
                    &self.inner.events,
                    now,
                    request_id,
                    RecoveryAction::TimeLockStarted,
                    guardian,
                    Some(details.clone()),
                );

                outbox.push((
                    Notification {
                        kind: NotificationKind::ThresholdReached,
                        request_id,
                        recipient: wallet,
                        message: "Recovery of your wallet reached its approval threshold and executes after the time lock"
                            .to_string(),
                        timestamp_ms: now,
                        metadata: Some(details),
                    },
                    state.owner_contacts.get(&wallet).cloned(),
                ));
            }

            (approval, approvals_now, crossed.then_some(executes_at_ms))
        };

        self.inner.events.publish(RecoveryEvent::GuardianApproved {
            request_id,
            guardian,
            approvals: approvals_now,
        });

        if let Some(executes_at_ms) = crossed_at {
            tracing::info!(
                request = %request_id,
                approvals = approvals_now,
                executes_at_ms,
                "approval threshold reached, time lock started"
            );
            self.inner.events.publish(RecoveryEvent::RecoveryApproved {
                request_id,
                executes_at_ms,
            });

            let engine = self.clone();
            self.inner
                .scheduler
                .arm(
                    request_id,
                    executes_at_ms.saturating_sub(WARNING_LEAD_MS),
                    Box::pin(async move { engine.fire_time_lock_warning(request_id).await }),
                )
                .await;
        }

        drop(guard);
        self.deliver(outbox).await;
        Ok(approval)
    }

    /// Cancel a pending or approved request.
    pub async fn cancel_recovery(&self, request_id: RequestId, cancelled_by: &str) -> Result<()> {
        let cancelled_by = self.parse_identity(cancelled_by)?;
        let wallet = self.request_wallet(request_id).await?;
        let guard = self.wallet_lock(wallet).await;
        let now = self.now_ms().await;

        let mut outbox: Outbox = Vec::new();
        {
            let mut state = self.inner.state.write().await;
            {
                let request = state
                    .requests
                    .get_mut(&request_id)
                    .ok_or_else(|| not_found(request_id))?;
                match request.status {
                    RecoveryStatus::Executed => return Err(Error::AlreadyExecuted),
                    RecoveryStatus::Cancelled => return Err(Error::AlreadyCancelled),
                    RecoveryStatus::Expired => {
                        return Err(Error::invalid_state("pending or approved", "expired"));
                    }
                    RecoveryStatus::Pending | RecoveryStatus::Approved => {}
                }
                request.status = RecoveryStatus::Cancelled;
                request.cancelled_at_ms = Some(now);
                request.cancelled_by = Some(cancelled_by);
            }

            append_audit(
                &mut state,
                &self.inner.events,
                now,
                request_id,
                RecoveryAction::Cancelled,
                cancelled_by,
                None,
            );

            outbox.push((
                Notification {
                    kind: NotificationKind::RecoveryCancelled,
                    request_id,
                    recipient: wallet,
                    message: format!("Recovery of your wallet was cancelled by {cancelled_by}"),
                    timestamp_ms: now,
                    metadata: None,
                },
                state.owner_contacts.get(&wallet).cloned(),
            ));
        }

        self.inner.scheduler.disarm(request_id);
        tracing::info!(request = %request_id, cancelled_by = %cancelled_by, "recovery cancelled");
        self.inner.events.publish(RecoveryEvent::RecoveryCancelled {
            request_id,
            cancelled_by,
        });

        drop(guard);
        self.deliver(outbox).await;
        Ok(())
    }

    /// Execute an approved request once its time lock has elapsed.
    ///
    /// Test-mode requests complete without touching the ledger. Otherwise
    /// the ledger client performs the ownership change; on ledger failure
    /// the request stays `Approved` and the error surfaces unchanged, so
    /// completion may be retried indefinitely.
    pub async fn complete_recovery(
        &self,
        request_id: RequestId,
        owner_authorization: &[u8],
    ) -> Result<CompletionReceipt> {
        let wallet = self.request_wallet(request_id).await?;
        let guard = self.wallet_lock(wallet).await;
        let now = self.now_ms().await;

        let (proposed, test_mode) = {
            let state = self.inner.state.read().await;
            let request = get_request(&state.requests, request_id)?;
            if request.status != RecoveryStatus::Approved {
                return Err(Error::invalid_state("approved", request.status.as_str()));
            }
            if !request.test_mode && now < request.executes_at_ms {
                return Err(Error::TimeLockNotExpired {
                    remaining_ms: request.executes_at_ms - now,
                });
            }
            let need = state.registry.threshold();
            if request.approval_count() < need {
                return Err(Error::InsufficientApprovals {
                    have: request.approval_count(),
                    need,
                });
            }
            (request.proposed_new_owner, request.test_mode)
        };

        if test_mode {
            {
                let mut state = self.inner.state.write().await;
                if let Some(request) = state.requests.get_mut(&request_id) {
                    request.status = RecoveryStatus::Executed;
                    request.completed_at_ms = Some(now);
                }
                append_audit(
                    &mut state,
                    &self.inner.events,
                    now,
                    request_id,
                    RecoveryAction::TestCompleted,
                    wallet,
                    None,
                );
            }
            self.inner.scheduler.disarm(request_id);
            tracing::info!(request = %request_id, "test recovery completed without ledger submission");
            self.inner
                .events
                .publish(RecoveryEvent::RecoveryTestCompleted { request_id });
            return Ok(CompletionReceipt {
                transaction_hash: None,
            });
        }

        // The ledger outcome decides the transition; holding the wallet lock
        // across the call keeps complete and cancel mutually exclusive.
        let transfer = self
            .inner
            .ledger
            .transfer_ownership(&wallet, &proposed, owner_authorization)
            .await?;

        let completed_at = self.now_ms().await;
        let mut outbox: Outbox = Vec::new();
        {
            let mut state = self.inner.state.write().await;
            if let Some(request) = state.requests.get_mut(&request_id) {
                request.status = RecoveryStatus::Executed;
                request.completed_at_ms = Some(completed_at);
            }

            let mut details = serde_json::Map::new();
            details.insert(
                "transaction_hash".to_string(),
                serde_json::Value::String(transfer.transaction_hash.clone()),
            );
            append_audit(
                &mut state,
                &self.inner.events,
                completed_at,
                request_id,
                RecoveryAction::Executed,
                wallet,
                Some(details.clone()),
            );

            outbox.push((
                Notification {
                    kind: NotificationKind::RecoveryExecuted,
                    request_id,
                    recipient: wallet,
                    message: format!(
                        "Ownership of your wallet was transferred to {proposed}"
                    ),
                    timestamp_ms: completed_at,
                    metadata: Some(details),
                },
                state.owner_contacts.get(&wallet).cloned(),
            ));
        }

        self.inner.scheduler.disarm(request_id);
        tracing::info!(
            request = %request_id,
            transaction_hash = %transfer.transaction_hash,
            "recovery executed"
        );
        self.inner.events.publish(RecoveryEvent::RecoveryExecuted {
            request_id,
            transaction_hash: Some(transfer.transaction_hash.clone()),
        });

        drop(guard);
        self.deliver(outbox).await;
        Ok(CompletionReceipt {
            transaction_hash: Some(transfer.transaction_hash),
        })
    }

    /// Dry-run a recovery: initiate in test mode and report what happened.
    ///
    /// Approvals are not simulated; the report carries the genuine (zero)
    /// approval count for the fresh request. Initiation failures are folded
    /// into the report rather than raised, so a dry run always produces a
    /// report unless testing is disabled outright.
    pub async fn test_recovery(
        &self,
        wallet: &str,
        proposed_new_owner: &str,
    ) -> Result<RecoveryTestReport> {
        {
            let state = self.inner.state.read().await;
            if !state.registry.config().testing_enabled {
                return Err(Error::TestingDisabled);
            }
        }

        match self.initiate_recovery(wallet, proposed_new_owner, true).await {
            Ok(request) => {
                let guardians_notified = self.inner.state.read().await.registry.active_count();
                tracing::warn!(
                    request = %request.id,
                    "test recovery initiated; guardian approvals are simulated and not recorded"
                );
                Ok(RecoveryTestReport {
                    request_id: Some(request.id),
                    guardians_notified,
                    approvals_received: request.approval_count(),
                    threshold_reached: false,
                    time_lock_simulated: true,
                    errors: Vec::new(),
                    warnings: vec![
                        "guardian approvals are simulated; none were recorded".to_string(),
                    ],
                })
            }
            Err(err) => Ok(RecoveryTestReport {
                request_id: None,
                guardians_notified: 0,
                approvals_received: 0,
                threshold_reached: false,
                time_lock_simulated: false,
                errors: vec![err.to_string()],
                warnings: Vec::new(),
            }),
        }
    }

    /// Expire pending requests that outlived their execution window.
    ///
    /// A pending request whose `executes_at + expiry_grace` has passed is
    /// marked `Expired` (terminal) and its warning timer disarmed. Approved
    /// requests never auto-expire; completion stays retryable.
    pub async fn expire_overdue_requests(&self) -> Vec<RequestId> {
        let now = self.now_ms().await;
        let candidates: Vec<(RequestId, Identity)> = {
            let state = self.inner.state.read().await;
            let grace = state.registry.config().expiry_grace_ms;
            state
                .requests
                .values()
                .filter(|r| {
                    r.status == RecoveryStatus::Pending
                        && now >= r.executes_at_ms.saturating_add(grace)
                })
                .map(|r| (r.id, r.wallet))
                .collect()
        };

        let mut expired = Vec::new();
        for (request_id, wallet) in candidates {
            let _guard = self.wallet_lock(wallet).await;
            let mut state = self.inner.state.write().await;
            let grace = state.registry.config().expiry_grace_ms;
            let still_overdue = state.requests.get(&request_id).is_some_and(|r| {
                r.status == RecoveryStatus::Pending
                    && now >= r.executes_at_ms.saturating_add(grace)
            });
            if !still_overdue {
                continue;
            }
            if let Some(request) = state.requests.get_mut(&request_id) {
                request.status = RecoveryStatus::Expired;
            }
            append_audit(
                &mut state,
                &self.inner.events,
                now,
                request_id,
                RecoveryAction::Expired,
                wallet,
                None,
            );
            drop(state);

            self.inner.scheduler.disarm(request_id);
            self.inner
                .events
                .publish(RecoveryEvent::RecoveryExpired { request_id });
            expired.push(request_id);
        }

        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "expired overdue recovery requests");
        }
        expired
    }

    // =========================================================================
    // CONTACTS
    // =========================================================================

    /// Add an informational escalation contact. Sealing is mandatory.
    pub async fn add_emergency_contact(
        &self,
        name: &str,
        contact: &str,
        relationship: Option<&str>,
    ) -> Result<EmergencyContact> {
        let sealed_contact = self.inner.vault.seal(contact.as_bytes()).await?;
        let now = self.now_ms().await;
        let contact = EmergencyContact {
            id: ContactId::new(),
            name: name.to_string(),
            sealed_contact,
            relationship: relationship.map(str::to_string),
            added_at_ms: now,
            verified: false,
        };

        let mut state = self.inner.state.write().await;
        state.emergency_contacts.push(contact.clone());
        tracing::info!(contact = %contact.id, "emergency contact added");
        Ok(contact)
    }

    /// All emergency contacts.
    pub async fn get_emergency_contacts(&self) -> Vec<EmergencyContact> {
        self.inner.state.read().await.emergency_contacts.clone()
    }

    /// Register a reach address for a wallet owner so owner-directed
    /// notifications resolve. Sealed like every other contact.
    pub async fn register_owner_contact(&self, identity: &str, contact: &str) -> Result<()> {
        let identity = self.parse_identity(identity)?;
        let sealed = self.inner.vault.seal(contact.as_bytes()).await?;
        let mut state = self.inner.state.write().await;
        state.owner_contacts.insert(identity, sealed);
        Ok(())
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Look up one request.
    pub async fn get_recovery_request(&self, request_id: RequestId) -> Option<RecoveryRequest> {
        self.inner
            .state
            .read()
            .await
            .requests
            .get(&request_id)
            .cloned()
    }

    /// All requests for a wallet, in initiation order.
    pub async fn get_recovery_requests(&self, wallet: &str) -> Result<Vec<RecoveryRequest>> {
        let wallet = self.parse_identity(wallet)?;
        Ok(self
            .inner
            .state
            .read()
            .await
            .requests
            .values()
            .filter(|r| r.wallet == wallet)
            .cloned()
            .collect())
    }

    /// Aggregate statistics over the full request history.
    pub async fn get_statistics(&self) -> RecoveryStatistics {
        let state = self.inner.state.read().await;
        compute_statistics(state.requests.values())
    }

    /// Audit entries for one request, in append order.
    pub async fn audit_entries(&self, request_id: RequestId) -> Vec<AuditLogEntry> {
        self.inner.state.read().await.audit.entries_for(request_id)
    }

    // =========================================================================
    // INTERNAL HELPERS
    // =========================================================================

    /// Validate then parse a raw identity string.
    fn parse_identity(&self, raw: &str) -> Result<Identity> {
        if !self.inner.validator.is_valid(raw) {
            return Err(Error::invalid_identity(raw));
        }
        Identity::parse(raw)
    }

    async fn now_ms(&self) -> u64 {
        self.inner.clock.physical_time().await.ts_ms
    }

    /// Per-wallet mutual exclusion. Operations on different wallets proceed
    /// in parallel; everything for one wallet serializes here.
    async fn wallet_lock(&self, wallet: Identity) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .inner
                .wallet_locks
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            Arc::clone(locks.entry(wallet).or_default())
        };
        lock.lock_owned().await
    }

    async fn request_wallet(&self, request_id: RequestId) -> Result<Identity> {
        let state = self.inner.state.read().await;
        state
            .requests
            .get(&request_id)
            .map(|r| r.wallet)
            .ok_or_else(|| not_found(request_id))
    }

    /// Warning callback, run by the scheduler 24h before `executes_at`.
    /// Re-checks request state under the wallet lock before notifying.
    async fn fire_time_lock_warning(&self, request_id: RequestId) {
        let Ok(wallet) = self.request_wallet(request_id).await else {
            return;
        };
        let guard = self.wallet_lock(wallet).await;
        let now = self.now_ms().await;

        let payload = {
            let state = self.inner.state.read().await;
            let Some(request) = state.requests.get(&request_id) else {
                return;
            };
            if request.status != RecoveryStatus::Approved {
                tracing::debug!(
                    request = %request_id,
                    status = request.status.as_str(),
                    "skipping stale time-lock warning"
                );
                return;
            }

            let mut metadata = serde_json::Map::new();
            metadata.insert(
                "executes_at_ms".to_string(),
                serde_json::Value::from(request.executes_at_ms),
            );
            (
                Notification {
                    kind: NotificationKind::TimeLockWarning,
                    request_id,
                    recipient: wallet,
                    message: "Recovery of your wallet executes in 24 hours; cancel now if this was not you".to_string(),
                    timestamp_ms: now,
                    metadata: Some(metadata),
                },
                state.owner_contacts.get(&wallet).cloned(),
            )
        };

        drop(guard);
        self.deliver(vec![payload]).await;
    }

    /// Open sealed contacts and hand notifications to the dispatcher.
    /// Runs outside the wallet lock; every failure here is advisory.
    async fn deliver(&self, outbox: Outbox) {
        for (notification, sealed) in outbox {
            let contact = match sealed {
                Some(blob) => match self.inner.vault.open(&blob).await {
                    Ok(bytes) => match String::from_utf8(bytes) {
                        Ok(contact) => Some(contact),
                        Err(_) => {
                            tracing::warn!(
                                recipient = %notification.recipient,
                                "sealed contact is not valid UTF-8, skipping"
                            );
                            None
                        }
                    },
                    Err(err) => {
                        tracing::warn!(
                            recipient = %notification.recipient,
                            error = %err,
                            "failed to open sealed contact for notification"
                        );
                        None
                    }
                },
                None => None,
            };
            self.inner
                .dispatcher
                .dispatch(&notification, contact.as_deref())
                .await;
        }
    }
}

fn not_found(request_id: RequestId) -> Error {
    Error::RequestNotFound {
        request: request_id.to_string(),
    }
}

fn get_request(
    requests: &IndexMap<RequestId, RecoveryRequest>,
    request_id: RequestId,
) -> Result<&RecoveryRequest> {
    requests.get(&request_id).ok_or_else(|| not_found(request_id))
}

/// Append an audit entry and announce it on the bus.
fn append_audit(
    state: &mut EngineState,
    events: &EventBus,
    now_ms: u64,
    request_id: RequestId,
    action: RecoveryAction,
    actor: Identity,
    details: Option<serde_json::Map<String, serde_json::Value>>,
) {
    state.audit.append(AuditLogEntry {
        id: EntryId::new(),
        request_id,
        timestamp_ms: now_ms,
        action,
        actor,
        details,
    });
    events.publish(RecoveryEvent::ActionLogged {
        request_id,
        action: action.as_str().to_string(),
    });
}
