//! Cryptographic primitives for election messages.
//!
//! - **Ed25519** for signing and verification; a participant's [`Identity`]
//!   is its Ed25519 public key.
//! - **Blake2b** for the digest that is actually signed.
//!
//! [`Identity`]: fedelect_types::Identity

pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use error::CryptoError;
pub use hash::blake2b_256;
pub use keys::{identity_from_private, keypair_from_seed};
pub use sign::{Ed25519Signer, Ed25519Verifier};
