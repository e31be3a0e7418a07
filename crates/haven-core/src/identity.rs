//! Core identifier types used across the Haven engine.
//!
//! Wallet owners, proposed owners, and guardians are all identified by their
//! Ed25519 public key; requests, contacts, and audit entries get opaque UUID
//! identifiers.

use crate::error::{Error, Result};
use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A public-key identity: a 32-byte Ed25519 verifying key.
///
/// The hex form is the wire/display representation. Parsing validates both
/// the length and that the bytes decode to a usable curve point, so an
/// `Identity` held by the engine is always verifiable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl Identity {
    /// Parse a hex-encoded Ed25519 public key.
    pub fn parse(raw: &str) -> Result<Self> {
        let bytes = hex::decode(raw).map_err(|_| Error::invalid_identity(raw))?;
        let key: [u8; 32] = bytes
            .try_into()
            .map_err(|_| Error::invalid_identity(raw))?;
        VerifyingKey::from_bytes(&key).map_err(|_| Error::invalid_identity(raw))?;
        Ok(Self(key))
    }

    /// Build from an already-validated verifying key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(key.to_bytes())
    }

    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decode back into a verifying key for signature checks.
    pub fn verifying_key(&self) -> Result<VerifyingKey> {
        VerifyingKey::from_bytes(&self.0).map_err(|_| Error::invalid_identity(self.to_string()))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

/// Recovery request identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Create a new random request ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "request-{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Emergency contact identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContactId(pub Uuid);

impl ContactId {
    /// Create a new random contact ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ContactId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "contact-{}", self.0)
    }
}

/// Audit log entry identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Create a new random entry ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    fn sample_identity() -> Identity {
        let signing = SigningKey::generate(&mut OsRng);
        Identity::from_verifying_key(&signing.verifying_key())
    }

    #[test]
    fn parse_roundtrip() {
        let identity = sample_identity();
        let parsed = Identity::parse(&identity.to_string()).unwrap();
        assert_eq!(identity, parsed);
    }

    #[test]
    fn parse_rejects_short_input() {
        assert_matches!(
            Identity::parse("deadbeef"),
            Err(Error::InvalidIdentity { .. })
        );
    }

    #[test]
    fn parse_rejects_non_hex() {
        let raw = "zz".repeat(32);
        assert_matches!(Identity::parse(&raw), Err(Error::InvalidIdentity { .. }));
    }

    #[test]
    fn verifying_key_roundtrip() {
        let identity = sample_identity();
        let key = identity.verifying_key().unwrap();
        assert_eq!(Identity::from_verifying_key(&key), identity);
    }

    #[test]
    fn request_ids_are_unique() {
        assert_ne!(RequestId::new(), RequestId::new());
    }
}
