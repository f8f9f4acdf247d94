//! End-of-minute timeouts and the volunteers they trigger.

use fedelect_types::{Identity, ProcessListLocation};
use serde::{Deserialize, Serialize};

use crate::SignedMessage;

/// Emitted when a process-list slot times out.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EomMessage {
    pub location: ProcessListLocation,
    pub signed: SignedMessage,
}

impl EomMessage {
    pub fn new(location: ProcessListLocation, signer: Identity) -> Self {
        Self {
            location,
            signed: SignedMessage::new(signer),
        }
    }

    pub fn signer(&self) -> Identity {
        self.signed.signer
    }
}

// Compared by content; signatures are not part of the identity of an EOM.
impl PartialEq for EomMessage {
    fn eq(&self, other: &Self) -> bool {
        self.location == other.location && self.signed.signer == other.signed.signer
    }
}

impl Eq for EomMessage {}

/// An audit server's offer to replace the stalled leader at `eom.location`.
///
/// A value type: two volunteers are the same when their EOM and signer match.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VolunteerMessage {
    pub eom: EomMessage,
    pub signed: SignedMessage,
}

impl VolunteerMessage {
    pub fn new(eom: EomMessage, signer: Identity) -> Self {
        Self {
            eom,
            signed: SignedMessage::new(signer),
        }
    }

    pub fn signer(&self) -> Identity {
        self.signed.signer
    }

    pub fn location(&self) -> ProcessListLocation {
        self.eom.location
    }
}

impl PartialEq for VolunteerMessage {
    fn eq(&self, other: &Self) -> bool {
        self.eom == other.eom && self.signed.signer == other.signed.signer
    }
}

impl Eq for VolunteerMessage {}

#[cfg(test)]
mod tests {
    use super::*;
    use fedelect_types::Signature;

    fn loc() -> ProcessListLocation {
        ProcessListLocation::new(0, 0, 10)
    }

    #[test]
    fn volunteers_compare_by_eom_and_signer() {
        let eom = EomMessage::new(loc(), Identity::from_index(1));
        let a = VolunteerMessage::new(eom.clone(), Identity::from_index(100));
        let mut b = a.clone();
        b.signed.signature = Some(Signature([9u8; 64]));
        assert_eq!(a, b);

        let other_signer = VolunteerMessage::new(eom, Identity::from_index(101));
        assert_ne!(a, other_signer);
    }

    #[test]
    fn volunteers_at_different_slots_differ() {
        let a = VolunteerMessage::new(
            EomMessage::new(loc(), Identity::from_index(1)),
            Identity::from_index(100),
        );
        let b = VolunteerMessage::new(
            EomMessage::new(ProcessListLocation::new(1, 0, 10), Identity::from_index(1)),
            Identity::from_index(100),
        );
        assert_ne!(a, b);
    }
}
