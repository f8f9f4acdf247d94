//! Deterministic Ed25519 key derivation.

use ed25519_dalek::SigningKey;
use fedelect_types::{Identity, PrivateKey};

/// Derive a private key and its identity from a 32-byte seed.
pub fn keypair_from_seed(seed: &[u8; 32]) -> (PrivateKey, Identity) {
    let signing_key = SigningKey::from_bytes(seed);
    let identity = Identity::new(signing_key.verifying_key().to_bytes());
    (PrivateKey(signing_key.to_bytes()), identity)
}

/// The identity (public key) belonging to a private key.
pub fn identity_from_private(private: &PrivateKey) -> Identity {
    let signing_key = SigningKey::from_bytes(&private.0);
    Identity::new(signing_key.verifying_key().to_bytes())
}
