//! Identity validation handler.

use haven_core::{Identity, IdentityValidator};

/// Validates identities as hex-encoded Ed25519 public keys.
///
/// Accepts exactly what [`Identity::parse`] accepts; the engine applies this
/// before parsing so malformed input is rejected with a single named error.
#[derive(Debug, Clone, Default)]
pub struct Ed25519Validator;

impl Ed25519Validator {
    /// Create a new validator.
    pub fn new() -> Self {
        Self
    }
}

impl IdentityValidator for Ed25519Validator {
    fn is_valid(&self, raw: &str) -> bool {
        Identity::parse(raw).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::SigningKey;
    use rand::rngs::OsRng;

    #[test]
    fn accepts_valid_public_keys() {
        let key = SigningKey::generate(&mut OsRng);
        let identity = Identity::from_verifying_key(&key.verifying_key());
        assert!(Ed25519Validator::new().is_valid(&identity.to_string()));
    }

    #[test]
    fn rejects_malformed_input() {
        let validator = Ed25519Validator::new();
        assert!(!validator.is_valid(""));
        assert!(!validator.is_valid("not-a-key"));
        assert!(!validator.is_valid(&"ab".repeat(31)));
    }
}
