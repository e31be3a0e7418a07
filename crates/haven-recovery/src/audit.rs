//! Append-only audit log and derived statistics.
//!
//! The log records what happened; it is never read back for lifecycle
//! decisions. Statistics are recomputed from the authoritative request store
//! on demand.

use crate::types::{AuditLogEntry, RecoveryRequest, RecoveryStatus};
use haven_core::{Identity, RequestId, HOUR_MS};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Append-only action log, ordered by append time.
#[derive(Debug, Default)]
pub struct AuditLog {
    entries: Vec<AuditLogEntry>,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. Entries are never mutated or deleted.
    pub fn append(&mut self, entry: AuditLogEntry) {
        tracing::debug!(
            request = %entry.request_id,
            action = entry.action.as_str(),
            actor = %entry.actor,
            "audit entry appended"
        );
        self.entries.push(entry);
    }

    /// Entries for one request, in append order.
    pub fn entries_for(&self, request_id: RequestId) -> Vec<AuditLogEntry> {
        self.entries
            .iter()
            .filter(|e| e.request_id == request_id)
            .cloned()
            .collect()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Aggregate metrics derived from the full request history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryStatistics {
    /// Requests ever initiated
    pub total_recovery_attempts: usize,
    /// Requests that reached `Executed`
    pub successful_recoveries: usize,
    /// Requests that were cancelled
    pub cancelled_recoveries: usize,
    /// Mean span between first and last approval, over requests with ≥1 approval
    pub average_approval_time_hours: f64,
    /// Mean initiation-to-approval latency over all recorded approvals
    pub average_guardian_response_time_hours: f64,
    /// Guardian with the most recorded approvals (first encountered wins ties)
    pub most_active_guardian: Option<Identity>,
}

/// Compute statistics by scanning all requests and their approval sets.
pub fn compute_statistics<'a, I>(requests: I) -> RecoveryStatistics
where
    I: IntoIterator<Item = &'a RecoveryRequest>,
{
    let mut total = 0usize;
    let mut successful = 0usize;
    let mut cancelled = 0usize;
    let mut approval_spans_ms: Vec<u64> = Vec::new();
    let mut response_times_ms: Vec<u64> = Vec::new();
    let mut approval_counts: IndexMap<Identity, usize> = IndexMap::new();

    for request in requests {
        total += 1;
        match request.status {
            RecoveryStatus::Executed => successful += 1,
            RecoveryStatus::Cancelled => cancelled += 1,
            _ => {}
        }

        if let (Some(first), Some(last)) = (
            request.approvals.iter().map(|a| a.approved_at_ms).min(),
            request.approvals.iter().map(|a| a.approved_at_ms).max(),
        ) {
            approval_spans_ms.push(last - first);
        }

        for approval in &request.approvals {
            response_times_ms.push(approval.approved_at_ms.saturating_sub(request.initiated_at_ms));
            *approval_counts.entry(approval.guardian).or_insert(0) += 1;
        }
    }

    let most_active_guardian = approval_counts
        .iter()
        .fold(None::<(Identity, usize)>, |best, (&guardian, &count)| {
            match best {
                // Strict comparison keeps the first-encountered guardian on ties.
                Some((_, best_count)) if count <= best_count => best,
                _ => Some((guardian, count)),
            }
        })
        .map(|(guardian, _)| guardian);

    RecoveryStatistics {
        total_recovery_attempts: total,
        successful_recoveries: successful,
        cancelled_recoveries: cancelled,
        average_approval_time_hours: mean_hours(&approval_spans_ms),
        average_guardian_response_time_hours: mean_hours(&response_times_ms),
        most_active_guardian,
    }
}

fn mean_hours(samples_ms: &[u64]) -> f64 {
    if samples_ms.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples_ms.iter().sum();
    (sum as f64 / samples_ms.len() as f64) / HOUR_MS as f64
}
