//! Nullable infrastructure for deterministic testing.
//!
//! Everything here is reproducible from a handful of integers:
//! - [`authority`] builds authority sets with fixed identities
//!   (federated servers from index 1, audit servers from index 101).
//! - [`factory`] builds majority-sized vote, decision, insist, ack and publish
//!   messages, cycling through the federated servers round-robin.
//! - [`signer`] stands in for real signatures without any cryptography.
//!
//! Usage: seed unit tests and explorer runs without hand-writing messages.

pub mod authority;
pub mod factory;
pub mod signer;

pub use authority::{audit_id, federated_id, null_auth_set, NullAuthority};
pub use factory::MessageFactory;
pub use signer::{NullSigner, NullVerifier};
