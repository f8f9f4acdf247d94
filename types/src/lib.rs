//! Fundamental types for federated leader elections.
//!
//! This crate defines the values shared across every other crate in the workspace:
//! participant identities, process-list locations, the authority roster and the
//! signing capability that messages are checked against.

pub mod authset;
pub mod error;
pub mod identity;
pub mod keys;
pub mod location;

pub use authset::{AuthSet, Role};
pub use error::{AuthSetError, SignerError};
pub use identity::Identity;
pub use keys::{MessageSigner, MessageVerifier, PrivateKey, Signature};
pub use location::ProcessListLocation;
