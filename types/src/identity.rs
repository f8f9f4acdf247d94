//! Participant identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A 32-byte participant identifier.
///
/// Opaque apart from equality and ordering. When messages are signed with
/// Ed25519 the identity is the signer's public key.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity([u8; 32]);

impl Identity {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build an identity whose leading four bytes are `index` in big-endian.
    ///
    /// Identities built this way order the same as their indices.
    pub fn from_index(index: u32) -> Self {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&index.to_be_bytes());
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID-{}", hex::encode(&self.0[..4]))
    }
}
