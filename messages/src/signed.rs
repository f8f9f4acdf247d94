//! The signature envelope every message kind embeds.

use fedelect_types::{Identity, Signature};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub signer: Identity,
    /// Opaque to the election core; `None` until signed.
    pub signature: Option<Signature>,
}

impl SignedMessage {
    pub fn new(signer: Identity) -> Self {
        Self {
            signer,
            signature: None,
        }
    }
}
