//! Aggregate messages: majority decisions, insistence, acknowledgements and
//! the final publish.
//!
//! Maps are ordered so that every participant builds and encodes an aggregate
//! the same way.

use fedelect_types::Identity;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{SignedMessage, VolunteerMessage, VoteMessage};

/// Proof that a majority of federated servers voted for one volunteer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MajorityDecisionMessage {
    pub majority_votes: BTreeMap<Identity, VoteMessage>,
    pub signed: SignedMessage,
}

impl MajorityDecisionMessage {
    pub fn new(majority_votes: BTreeMap<Identity, VoteMessage>, signer: Identity) -> Self {
        Self {
            majority_votes,
            signed: SignedMessage::new(signer),
        }
    }

    pub fn signer(&self) -> Identity {
        self.signed.signer
    }

    /// The volunteer every vote agrees on, or `None` if the votes disagree or
    /// there are none.
    pub fn volunteer(&self) -> Option<&VolunteerMessage> {
        let mut votes = self.majority_votes.values();
        let first = &votes.next()?.volunteer;
        votes.all(|v| v.volunteer == *first).then_some(first)
    }
}

/// A federated server insisting on a decision backed by a majority of
/// majority decisions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsistMessage {
    pub majority_decisions: BTreeMap<Identity, MajorityDecisionMessage>,
    pub signed: SignedMessage,
}

impl InsistMessage {
    pub fn new(
        majority_decisions: BTreeMap<Identity, MajorityDecisionMessage>,
        signer: Identity,
    ) -> Self {
        Self {
            majority_decisions,
            signed: SignedMessage::new(signer),
        }
    }

    pub fn signer(&self) -> Identity {
        self.signed.signer
    }

    /// The volunteer every decision agrees on.
    pub fn volunteer(&self) -> Option<&VolunteerMessage> {
        let mut decisions = self.majority_decisions.values();
        let first = decisions.next()?.volunteer()?;
        decisions
            .all(|d| d.volunteer() == Some(first))
            .then_some(first)
    }
}

/// Acknowledgement of an insist. `signers` grows as more federated servers
/// add themselves before forwarding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IAckMessage {
    pub insist: InsistMessage,
    pub signed: SignedMessage,
    pub signers: BTreeSet<Identity>,
}

impl IAckMessage {
    pub fn new(insist: InsistMessage, signer: Identity) -> Self {
        Self {
            insist,
            signed: SignedMessage::new(signer),
            signers: BTreeSet::from([signer]),
        }
    }

    pub fn signer(&self) -> Identity {
        self.signed.signer
    }
}

/// Terminal artifact: the replacement is authorized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishMessage {
    pub insist: InsistMessage,
    pub signed: SignedMessage,
    pub signers: BTreeSet<Identity>,
}

impl PublishMessage {
    pub fn new(insist: InsistMessage, signer: Identity, signers: BTreeSet<Identity>) -> Self {
        Self {
            insist,
            signed: SignedMessage::new(signer),
            signers,
        }
    }

    pub fn signer(&self) -> Identity {
        self.signed.signer
    }

    pub fn volunteer(&self) -> Option<&VolunteerMessage> {
        self.insist.volunteer()
    }
}
