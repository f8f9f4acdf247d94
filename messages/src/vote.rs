//! Votes and ranked leader-level votes.

use fedelect_types::Identity;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::{SignedMessage, VolunteerMessage};

/// A federated server's endorsement of one volunteer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMessage {
    pub volunteer: VolunteerMessage,
    pub signed: SignedMessage,
}

impl VoteMessage {
    pub fn new(volunteer: VolunteerMessage, signer: Identity) -> Self {
        Self {
            volunteer,
            signed: SignedMessage::new(signer),
        }
    }

    pub fn signer(&self) -> Identity {
        self.signed.signer
    }
}

/// The unit of ranked voting inside a volunteer's vote counter.
///
/// `level` buckets votes into escalating voting rounds; a signer never issues
/// two messages at the same level. `rank` is the highest round the signer can
/// justify with the votes it currently holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderLevelMessage {
    pub rank: u32,
    pub level: u32,
    pub volunteer: VolunteerMessage,
    pub signed: SignedMessage,
    /// Votes used to reach `rank`. Only needed transiently; stripped once stored.
    pub justification: Vec<LeaderLevelMessage>,
}

impl LeaderLevelMessage {
    pub fn new(signer: Identity, rank: u32, level: u32, volunteer: VolunteerMessage) -> Self {
        Self {
            rank,
            level,
            volunteer,
            signed: SignedMessage::new(signer),
            justification: Vec::new(),
        }
    }

    pub fn signer(&self) -> Identity {
        self.signed.signer
    }

    /// Total order used for eviction: level, then rank, then signer.
    pub fn eviction_order(&self, other: &Self) -> Ordering {
        (self.level, self.rank, self.signer()).cmp(&(other.level, other.rank, other.signer()))
    }

    /// Copy of this message without its justification.
    pub fn stripped(&self) -> Self {
        Self {
            justification: Vec::new(),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EomMessage;
    use fedelect_types::ProcessListLocation;

    fn volunteer() -> VolunteerMessage {
        VolunteerMessage::new(
            EomMessage::new(ProcessListLocation::new(0, 0, 10), Identity::from_index(1)),
            Identity::from_index(100),
        )
    }

    fn ll(signer: u32, rank: u32, level: u32) -> LeaderLevelMessage {
        LeaderLevelMessage::new(Identity::from_index(signer), rank, level, volunteer())
    }

    #[test]
    fn eviction_order_prefers_level_then_rank_then_signer() {
        assert_eq!(ll(9, 9, 1).eviction_order(&ll(0, 0, 2)), Ordering::Less);
        assert_eq!(ll(9, 0, 2).eviction_order(&ll(0, 1, 2)), Ordering::Less);
        assert_eq!(ll(1, 1, 2).eviction_order(&ll(2, 1, 2)), Ordering::Less);
        assert_eq!(ll(1, 1, 2).eviction_order(&ll(1, 1, 2)), Ordering::Equal);
    }

    #[test]
    fn stripped_drops_justification_only() {
        let mut msg = ll(1, 2, 3);
        msg.justification = vec![ll(2, 0, 1), ll(3, 0, 1)];
        let stripped = msg.stripped();
        assert!(stripped.justification.is_empty());
        assert_eq!(stripped.rank, 2);
        assert_eq!(stripped.level, 3);
        assert_eq!(stripped.signer(), Identity::from_index(1));
    }
}
