//! Errors raised while building an authority roster or signing.

use thiserror::Error;

use crate::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthSetError {
    #[error("identity {0} is already in the authority set")]
    DuplicateIdentity(Identity),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    #[error("signer {identity} cannot sign: {reason}")]
    Unavailable { identity: Identity, reason: String },
}
