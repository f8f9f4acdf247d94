//! Nullable signer: deterministic signatures without cryptography.

use fedelect_types::{Identity, MessageSigner, MessageVerifier, Signature, SignerError};

/// Signs by writing the signer identity and a fold of the payload.
///
/// Anyone can forge these; use only where signatures must be present but not
/// secure.
#[derive(Clone, Copy, Debug)]
pub struct NullSigner {
    identity: Identity,
    broken: bool,
}

impl NullSigner {
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            broken: false,
        }
    }

    /// A signer whose key is unavailable: every `sign` fails.
    pub fn broken(identity: Identity) -> Self {
        Self {
            identity,
            broken: true,
        }
    }
}

fn null_signature(identity: &Identity, payload: &[u8]) -> Signature {
    let mut bytes = [0u8; 64];
    bytes[..32].copy_from_slice(identity.as_bytes());
    for (i, b) in payload.iter().enumerate() {
        bytes[32 + i % 32] ^= b.rotate_left((i / 32 % 8) as u32);
    }
    Signature(bytes)
}

impl MessageSigner for NullSigner {
    fn identity(&self) -> Identity {
        self.identity
    }

    fn sign(&self, payload: &[u8]) -> Result<Signature, SignerError> {
        if self.broken {
            return Err(SignerError::Unavailable {
                identity: self.identity,
                reason: "key unavailable".to_string(),
            });
        }
        Ok(null_signature(&self.identity, payload))
    }
}

/// Accepts exactly the signatures a [`NullSigner`] would produce.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullVerifier;

impl MessageVerifier for NullVerifier {
    fn verify(&self, identity: &Identity, payload: &[u8], signature: &Signature) -> bool {
        null_signature(identity, payload) == *signature
    }
}
