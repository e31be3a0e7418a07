//! Guardian set ownership and invariant enforcement.
//!
//! The registry is pure state: duplicate/capacity/floor rules and threshold
//! recomputation live here, while sealing, locking, event publication, and
//! notification fan-out belong to the engine. Removed guardians are retained
//! forever — identity is globally unique across the set's history — but are
//! excluded from every count.

use crate::types::{Guardian, GuardianStatus, RecoveryConfig};
use haven_core::{Error, Identity, Result};
use indexmap::IndexMap;

/// Owns the guardians of one wallet-recovery configuration.
#[derive(Debug, Clone)]
pub struct GuardianRegistry {
    config: RecoveryConfig,
    guardians: IndexMap<Identity, Guardian>,
}

impl GuardianRegistry {
    /// Create an empty registry for a validated configuration.
    pub fn new(config: RecoveryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            guardians: IndexMap::new(),
        })
    }

    /// Current configuration.
    pub fn config(&self) -> &RecoveryConfig {
        &self.config
    }

    /// Current approval threshold.
    pub fn threshold(&self) -> usize {
        self.config.threshold
    }

    /// Enroll a new guardian in `Pending` status.
    ///
    /// The contact, if any, must already be sealed by the caller — the
    /// registry never sees plaintext reach information.
    pub fn add_guardian(
        &mut self,
        identity: Identity,
        display_name: Option<String>,
        sealed_contact: Option<Vec<u8>>,
        now_ms: u64,
    ) -> Result<Guardian> {
        if self.guardians.contains_key(&identity) {
            return Err(Error::DuplicateGuardian {
                guardian: identity.to_string(),
            });
        }
        if self.live_count() >= self.config.max_guardians {
            return Err(Error::CapacityExceeded {
                max: self.config.max_guardians,
            });
        }

        let guardian = Guardian {
            identity,
            display_name,
            sealed_contact,
            added_at_ms: now_ms,
            verified: false,
            status: GuardianStatus::Pending,
            last_active_at_ms: None,
        };
        self.guardians.insert(identity, guardian.clone());
        tracing::info!(guardian = %identity, "guardian enrolled, pending verification");
        Ok(guardian)
    }

    /// Mark a guardian removed and recompute the threshold if needed.
    ///
    /// The guardian record is retained for audit history. When the removal
    /// leaves the threshold above the remaining active count, the threshold
    /// is recomputed as `max(1, ceil(0.6 × remaining_active))`.
    pub fn remove_guardian(&mut self, identity: &Identity) -> Result<()> {
        let guardian = self.live_guardian(identity)?;

        if guardian.status == GuardianStatus::Active && self.active_count() <= self.config.min_guardians
        {
            return Err(Error::BelowMinimum {
                min: self.config.min_guardians,
            });
        }

        if let Some(guardian) = self.guardians.get_mut(identity) {
            guardian.status = GuardianStatus::Removed;
        }

        let remaining = self.active_count();
        if self.config.threshold > remaining {
            let recomputed = ((3 * remaining + 4) / 5).max(1);
            tracing::info!(
                old = self.config.threshold,
                new = recomputed,
                remaining_active = remaining,
                "threshold recomputed after guardian removal"
            );
            self.config.threshold = recomputed;
        }
        Ok(())
    }

    /// Verify a pending guardian, activating it.
    ///
    /// Verifying an already-active guardian is an idempotent activity stamp.
    pub fn verify_guardian(&mut self, identity: &Identity, now_ms: u64) -> Result<()> {
        let guardian = self.live_guardian(identity)?;
        match guardian.status {
            GuardianStatus::Pending | GuardianStatus::Active => {}
            status => {
                return Err(Error::invalid_state("pending", status.as_str()));
            }
        }

        if let Some(guardian) = self.guardians.get_mut(identity) {
            guardian.status = GuardianStatus::Active;
            guardian.verified = true;
            guardian.last_active_at_ms = Some(now_ms);
        }
        Ok(())
    }

    /// Suspend an active guardian, subject to the minimum-count floor.
    pub fn suspend_guardian(&mut self, identity: &Identity) -> Result<()> {
        let guardian = self.live_guardian(identity)?;
        if guardian.status != GuardianStatus::Active {
            return Err(Error::invalid_state("active", guardian.status.as_str()));
        }
        if self.active_count() <= self.config.min_guardians {
            return Err(Error::BelowMinimum {
                min: self.config.min_guardians,
            });
        }

        if let Some(guardian) = self.guardians.get_mut(identity) {
            guardian.status = GuardianStatus::Suspended;
        }
        Ok(())
    }

    /// Reinstate a suspended guardian.
    pub fn reinstate_guardian(&mut self, identity: &Identity, now_ms: u64) -> Result<()> {
        let guardian = self.live_guardian(identity)?;
        if guardian.status != GuardianStatus::Suspended {
            return Err(Error::invalid_state("suspended", guardian.status.as_str()));
        }

        if let Some(guardian) = self.guardians.get_mut(identity) {
            guardian.status = GuardianStatus::Active;
            guardian.last_active_at_ms = Some(now_ms);
        }
        Ok(())
    }

    /// Stamp guardian activity (e.g. a recorded approval).
    pub fn touch(&mut self, identity: &Identity, now_ms: u64) {
        if let Some(guardian) = self.guardians.get_mut(identity) {
            guardian.last_active_at_ms = Some(now_ms);
        }
    }

    /// All guardians, including removed history, in enrollment order.
    pub fn list(&self) -> Vec<Guardian> {
        self.guardians.values().cloned().collect()
    }

    /// Look up a guardian (including removed history).
    pub fn get(&self, identity: &Identity) -> Option<&Guardian> {
        self.guardians.get(identity)
    }

    /// Whether `identity` is an active guardian.
    pub fn is_active(&self, identity: &Identity) -> bool {
        self.guardians
            .get(identity)
            .is_some_and(|g| g.status == GuardianStatus::Active)
    }

    /// Active guardians in enrollment order.
    pub fn active_guardians(&self) -> impl Iterator<Item = &Guardian> {
        self.guardians
            .values()
            .filter(|g| g.status == GuardianStatus::Active)
    }

    /// Number of active guardians.
    pub fn active_count(&self) -> usize {
        self.active_guardians().count()
    }

    /// Number of active, verified guardians (the fraud heuristic's input).
    pub fn active_verified_count(&self) -> usize {
        self.active_guardians().filter(|g| g.verified).count()
    }

    /// Guardians occupying capacity: everyone not removed.
    fn live_count(&self) -> usize {
        self.guardians
            .values()
            .filter(|g| g.status != GuardianStatus::Removed)
            .count()
    }

    /// Look up a guardian, treating removed history as absent.
    fn live_guardian(&self, identity: &Identity) -> Result<&Guardian> {
        self.guardians
            .get(identity)
            .filter(|g| g.status != GuardianStatus::Removed)
            .ok_or_else(|| Error::GuardianNotFound {
                guardian: identity.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn identity() -> Identity {
        Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key())
    }

    fn small_config() -> RecoveryConfig {
        RecoveryConfig {
            threshold: 2,
            min_guardians: 2,
            max_guardians: 4,
            ..RecoveryConfig::default()
        }
    }

    fn registry_with_active(count: usize) -> (GuardianRegistry, Vec<Identity>) {
        let mut registry = GuardianRegistry::new(small_config()).unwrap();
        let ids: Vec<Identity> = (0..count).map(|_| identity()).collect();
        for id in &ids {
            registry.add_guardian(*id, None, None, 0).unwrap();
            registry.verify_guardian(id, 0).unwrap();
        }
        (registry, ids)
    }

    #[test]
    fn add_starts_pending_and_unverified() {
        let mut registry = GuardianRegistry::new(small_config()).unwrap();
        let guardian = registry
            .add_guardian(identity(), Some("Alice".to_string()), None, 42)
            .unwrap();
        assert_eq!(guardian.status, GuardianStatus::Pending);
        assert!(!guardian.verified);
        assert_eq!(guardian.added_at_ms, 42);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn duplicate_identity_rejected_even_after_removal() {
        let (mut registry, ids) = registry_with_active(3);
        registry.remove_guardian(&ids[0]).unwrap();
        assert_matches!(
            registry.add_guardian(ids[0], None, None, 0),
            Err(Error::DuplicateGuardian { .. })
        );
    }

    #[test]
    fn capacity_enforced() {
        let (mut registry, _) = registry_with_active(4);
        assert_matches!(
            registry.add_guardian(identity(), None, None, 0),
            Err(Error::CapacityExceeded { max: 4 })
        );
    }

    #[test]
    fn removal_slot_is_not_reusable() {
        let (mut registry, ids) = registry_with_active(4);
        registry.remove_guardian(&ids[0]).unwrap();
        // Removed guardians stop counting toward capacity.
        registry.add_guardian(identity(), None, None, 0).unwrap();
    }

    #[test]
    fn removal_floor_blocks_at_minimum() {
        let (mut registry, ids) = registry_with_active(2);
        let err = registry.remove_guardian(&ids[0]).unwrap_err();
        assert_matches!(err, Error::BelowMinimum { min: 2 });
        // Status unchanged after the failed removal.
        assert_eq!(
            registry.get(&ids[0]).unwrap().status,
            GuardianStatus::Active
        );
    }

    #[test]
    fn removing_pending_guardian_skips_floor_check() {
        let (mut registry, _) = registry_with_active(2);
        let pending = identity();
        registry.add_guardian(pending, None, None, 0).unwrap();
        registry.remove_guardian(&pending).unwrap();
        assert_eq!(
            registry.get(&pending).unwrap().status,
            GuardianStatus::Removed
        );
    }

    #[test]
    fn threshold_recomputed_when_above_remaining_active() {
        let mut registry = GuardianRegistry::new(RecoveryConfig {
            threshold: 3,
            min_guardians: 2,
            max_guardians: 10,
            ..RecoveryConfig::default()
        })
        .unwrap();
        let ids: Vec<Identity> = (0..3).map(|_| identity()).collect();
        for id in &ids {
            registry.add_guardian(*id, None, None, 0).unwrap();
            registry.verify_guardian(id, 0).unwrap();
        }

        registry.remove_guardian(&ids[0]).unwrap();
        // ceil(0.6 × 2) = 2
        assert_eq!(registry.threshold(), 2);
    }

    #[test]
    fn verify_activates_and_stamps() {
        let mut registry = GuardianRegistry::new(small_config()).unwrap();
        let id = identity();
        registry.add_guardian(id, None, None, 0).unwrap();
        registry.verify_guardian(&id, 99).unwrap();

        let guardian = registry.get(&id).unwrap();
        assert_eq!(guardian.status, GuardianStatus::Active);
        assert!(guardian.verified);
        assert_eq!(guardian.last_active_at_ms, Some(99));
    }

    #[test]
    fn verify_unknown_guardian_fails() {
        let mut registry = GuardianRegistry::new(small_config()).unwrap();
        assert_matches!(
            registry.verify_guardian(&identity(), 0),
            Err(Error::GuardianNotFound { .. })
        );
    }

    #[test]
    fn suspend_and_reinstate() {
        let (mut registry, ids) = registry_with_active(3);
        registry.suspend_guardian(&ids[0]).unwrap();
        assert_eq!(registry.active_count(), 2);
        assert!(!registry.is_active(&ids[0]));

        // At the floor now, a second suspension is refused.
        assert_matches!(
            registry.suspend_guardian(&ids[1]),
            Err(Error::BelowMinimum { .. })
        );

        registry.reinstate_guardian(&ids[0], 7).unwrap();
        assert!(registry.is_active(&ids[0]));
        assert_eq!(registry.active_count(), 3);
    }

    #[test]
    fn removed_guardians_read_as_not_found() {
        let (mut registry, ids) = registry_with_active(3);
        registry.remove_guardian(&ids[0]).unwrap();
        assert_matches!(
            registry.remove_guardian(&ids[0]),
            Err(Error::GuardianNotFound { .. })
        );
    }
}
