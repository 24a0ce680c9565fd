// src/bridge/attestation.rs
//! Attestation proofs
//!
//! A proof binds (transaction id, validator, judgment, validator nonce)
//! so it cannot be forged for another validator, reused for another
//! transaction, flipped to the opposite judgment or replayed once the
//! nonce has been consumed. Verification sits behind `AttestationVerifier`
//! so the signature scheme can change without touching consensus.

use borsh::BorshSerialize;
use sha2::{Digest, Sha256};
use solana_program::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};

use super::types::TransactionId;
use crate::error_handling::{BridgeError, BridgeResult};

/// Domain separator for attestation digests
pub const ATTESTATION_DOMAIN: &[u8] = b"layer2-bridge/attestation/v1";

#[derive(BorshSerialize)]
struct AttestationMessage {
    transaction_id: TransactionId,
    validator: Pubkey,
    is_valid: bool,
    nonce: u64,
}

/// Digest a validator signs to attest a transaction
pub fn attestation_digest(
    transaction_id: &TransactionId,
    validator: &Pubkey,
    is_valid: bool,
    nonce: u64,
) -> BridgeResult<[u8; 32]> {
    let message = AttestationMessage {
        transaction_id: *transaction_id,
        validator: *validator,
        is_valid,
        nonce,
    };
    let encoded = message
        .try_to_vec()
        .map_err(|e| BridgeError::Serialization(e.to_string()))?;

    let mut hasher = Sha256::new();
    hasher.update(ATTESTATION_DOMAIN);
    hasher.update(&encoded);
    Ok(hasher.finalize().into())
}

/// Checks that a proof authenticates an attestation digest
pub trait AttestationVerifier: Send + Sync {
    /// Verify `proof` for `digest` as produced by `validator`
    fn verify(&self, validator: &Pubkey, digest: &[u8; 32], proof: &[u8]) -> BridgeResult<()>;
}

/// Ed25519 signatures by the validator's own key
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519AttestationVerifier;

impl AttestationVerifier for Ed25519AttestationVerifier {
    fn verify(&self, validator: &Pubkey, digest: &[u8; 32], proof: &[u8]) -> BridgeResult<()> {
        let bytes = <[u8; 64]>::try_from(proof).map_err(|_| {
            BridgeError::InvalidProof(format!("expected 64-byte signature, got {} bytes", proof.len()))
        })?;
        let signature = Signature::from(bytes);

        if !signature.verify(validator.as_ref(), digest) {
            return Err(BridgeError::InvalidProof(format!(
                "signature does not match validator {}",
                validator
            )));
        }

        Ok(())
    }
}

/// Sign an attestation with a validator keypair
pub fn sign_attestation(
    keypair: &Keypair,
    transaction_id: &TransactionId,
    is_valid: bool,
    nonce: u64,
) -> BridgeResult<Vec<u8>> {
    let digest = attestation_digest(transaction_id, &keypair.pubkey(), is_valid, nonce)?;
    Ok(keypair.sign_message(&digest).as_ref().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_attestation_verifies() {
        let keypair = Keypair::new();
        let id = TransactionId([7; 32]);
        let proof = sign_attestation(&keypair, &id, true, 0).unwrap();
        let digest = attestation_digest(&id, &keypair.pubkey(), true, 0).unwrap();

        assert!(Ed25519AttestationVerifier.verify(&keypair.pubkey(), &digest, &proof).is_ok());
    }

    #[test]
    fn test_proof_bound_to_judgment_nonce_and_validator() {
        let keypair = Keypair::new();
        let other = Keypair::new();
        let id = TransactionId([7; 32]);
        let proof = sign_attestation(&keypair, &id, true, 3).unwrap();
        let verifier = Ed25519AttestationVerifier;

        let flipped = attestation_digest(&id, &keypair.pubkey(), false, 3).unwrap();
        assert!(verifier.verify(&keypair.pubkey(), &flipped, &proof).is_err());

        let replayed = attestation_digest(&id, &keypair.pubkey(), true, 4).unwrap();
        assert!(verifier.verify(&keypair.pubkey(), &replayed, &proof).is_err());

        let forged = attestation_digest(&id, &other.pubkey(), true, 3).unwrap();
        assert!(verifier.verify(&other.pubkey(), &forged, &proof).is_err());
    }

    #[test]
    fn test_malformed_proof_rejected() {
        let digest = [0u8; 32];
        let result = Ed25519AttestationVerifier.verify(&Pubkey::new_unique(), &digest, &[1, 2, 3]);
        assert!(matches!(result, Err(BridgeError::InvalidProof(_))));
    }
}
