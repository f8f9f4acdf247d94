//! Ed25519 implementation of the message signing capability.
//!
//! The Blake2b-256 digest of the payload is what gets signed, so signatures
//! stay cheap for deeply nested aggregate messages.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use fedelect_types::{
    Identity, MessageSigner, MessageVerifier, PrivateKey, Signature, SignerError,
};

use crate::hash::blake2b_256;
use crate::keys::identity_from_private;
use crate::CryptoError;

/// Signs payloads as one participant.
pub struct Ed25519Signer {
    signing_key: SigningKey,
    identity: Identity,
}

impl Ed25519Signer {
    pub fn from_private(private: &PrivateKey) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&private.0),
            identity: identity_from_private(private),
        }
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_private(&PrivateKey(*seed))
    }
}

impl MessageSigner for Ed25519Signer {
    fn identity(&self) -> Identity {
        self.identity
    }

    fn sign(&self, payload: &[u8]) -> Result<Signature, SignerError> {
        let digest = blake2b_256(payload);
        Ok(Signature(self.signing_key.sign(&digest).to_bytes()))
    }
}

/// Verifies signatures by treating the signer identity as an Ed25519 public key.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ed25519Verifier;

impl Ed25519Verifier {
    /// Check that an identity decodes as a public key.
    pub fn verifying_key(identity: &Identity) -> Result<VerifyingKey, CryptoError> {
        VerifyingKey::from_bytes(identity.as_bytes()).map_err(|_| CryptoError::InvalidPublicKey)
    }
}

impl MessageVerifier for Ed25519Verifier {
    fn verify(&self, signer: &Identity, payload: &[u8], signature: &Signature) -> bool {
        let Ok(verifying_key) = Self::verifying_key(signer) else {
            return false;
        };
        let digest = blake2b_256(payload);
        let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
        verifying_key.verify(&digest, &dalek_sig).is_ok()
    }
}
