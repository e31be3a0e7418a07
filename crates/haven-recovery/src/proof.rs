//! Guardian approval proofs.
//!
//! An approval binds `(request, guardian, proposed owner)` with an Ed25519
//! signature produced by the guardian and verified here against the
//! guardian's public key. The coordinating process never holds guardian
//! secrets.

use ed25519_dalek::{Signature, Verifier};
use haven_core::{Error, Identity, RequestId, Result};

/// Create the canonical message a guardian signs to approve a request.
///
/// Layout: `request_id (16) ‖ guardian key (32) ‖ proposed owner key (32)`.
pub fn approval_message(
    request_id: RequestId,
    guardian: &Identity,
    proposed_new_owner: &Identity,
) -> Vec<u8> {
    let mut message = Vec::with_capacity(16 + 32 + 32);
    message.extend_from_slice(request_id.uuid().as_bytes());
    message.extend_from_slice(guardian.as_bytes());
    message.extend_from_slice(proposed_new_owner.as_bytes());
    message
}

/// Verify that `signature` is the guardian's approval of this request.
pub fn verify_approval_signature(
    request_id: RequestId,
    guardian: &Identity,
    proposed_new_owner: &Identity,
    signature: &[u8],
) -> Result<()> {
    let rejected = || Error::InvalidApprovalProof {
        guardian: guardian.to_string(),
    };

    let key = guardian.verifying_key()?;
    let signature = Signature::from_slice(signature).map_err(|_| rejected())?;
    let message = approval_message(request_id, guardian, proposed_new_owner);
    key.verify(&message, &signature).map_err(|_| rejected())?;

    tracing::debug!(
        guardian = %guardian,
        request = %request_id,
        "guardian approval signature verified"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;

    #[test]
    fn valid_signature_verifies() {
        let key = SigningKey::generate(&mut OsRng);
        let guardian = Identity::from_verifying_key(&key.verifying_key());
        let owner = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());
        let request_id = RequestId::new();

        let message = approval_message(request_id, &guardian, &owner);
        let signature = key.sign(&message);

        verify_approval_signature(request_id, &guardian, &owner, &signature.to_bytes()).unwrap();
    }

    #[test]
    fn signature_from_wrong_key_is_rejected() {
        let guardian_key = SigningKey::generate(&mut OsRng);
        let other_key = SigningKey::generate(&mut OsRng);
        let guardian = Identity::from_verifying_key(&guardian_key.verifying_key());
        let owner = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());
        let request_id = RequestId::new();

        let message = approval_message(request_id, &guardian, &owner);
        let signature = other_key.sign(&message);

        assert_matches!(
            verify_approval_signature(request_id, &guardian, &owner, &signature.to_bytes()),
            Err(Error::InvalidApprovalProof { .. })
        );
    }

    #[test]
    fn signature_over_different_request_is_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let guardian = Identity::from_verifying_key(&key.verifying_key());
        let owner = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());

        let message = approval_message(RequestId::new(), &guardian, &owner);
        let signature = key.sign(&message);

        // Same guardian, different request: the binding must not transfer.
        assert_matches!(
            verify_approval_signature(RequestId::new(), &guardian, &owner, &signature.to_bytes()),
            Err(Error::InvalidApprovalProof { .. })
        );
    }

    #[test]
    fn malformed_signature_bytes_are_rejected() {
        let key = SigningKey::generate(&mut OsRng);
        let guardian = Identity::from_verifying_key(&key.verifying_key());
        let owner = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());

        assert_matches!(
            verify_approval_signature(RequestId::new(), &guardian, &owner, b"short"),
            Err(Error::InvalidApprovalProof { .. })
        );
    }

    #[test]
    fn approval_message_format() {
        let guardian = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());
        let owner = Identity::from_verifying_key(&SigningKey::generate(&mut OsRng).verifying_key());
        let request_id = RequestId::new();

        let message = approval_message(request_id, &guardian, &owner);

        assert_eq!(message.len(), 80);
        assert_eq!(&message[0..16], request_id.uuid().as_bytes());
        assert_eq!(&message[16..48], guardian.as_bytes());
        assert_eq!(&message[48..80], owner.as_bytes());
    }
}
