//! Nullable messages: deterministic election message construction.

use std::collections::{BTreeMap, BTreeSet};

use fedelect_messages::{
    EomMessage, IAckMessage, InsistMessage, LeaderLevelMessage, MajorityDecisionMessage,
    PublishMessage, VolunteerMessage, VoteMessage,
};
use fedelect_types::{AuthSet, Identity, ProcessListLocation};

use crate::NullAuthority;

/// Builds well-formed election messages for one slot.
///
/// Signers are drawn from the federated servers in insertion order, cycling
/// round-robin across calls. Aggregates always use `majority` distinct signers.
/// The EOM is always attributed to the first federated server, so every
/// volunteer built for the same audit server compares equal.
///
/// # Panics
///
/// Any constructor that needs a signer panics if the authority set has no
/// federated servers.
#[derive(Clone, Debug)]
pub struct MessageFactory {
    auth_set: AuthSet,
    location: ProcessListLocation,
    federated: Vec<Identity>,
    cursor: usize,
}

impl MessageFactory {
    pub fn new(auth_set: AuthSet, location: ProcessListLocation) -> Self {
        let federated = auth_set.federated_identities();
        Self {
            auth_set,
            location,
            federated,
            cursor: 0,
        }
    }

    pub fn from_authority(authority: &NullAuthority) -> Self {
        Self::new(authority.auth_set.clone(), authority.location)
    }

    pub fn location(&self) -> ProcessListLocation {
        self.location
    }

    /// Rewind the round-robin so the next signer is the first federated server.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    fn next_signer(&mut self) -> Identity {
        let signer = self.federated[self.cursor % self.federated.len()];
        self.cursor += 1;
        signer
    }

    fn next_signers(&mut self) -> Vec<Identity> {
        (0..self.auth_set.majority())
            .map(|_| self.next_signer())
            .collect()
    }

    pub fn eom(&self) -> EomMessage {
        EomMessage::new(self.location, self.federated[0])
    }

    pub fn volunteer(&self, audit: Identity) -> VolunteerMessage {
        VolunteerMessage::new(self.eom(), audit)
    }

    pub fn vote(&mut self, volunteer: &VolunteerMessage) -> VoteMessage {
        VoteMessage::new(volunteer.clone(), self.next_signer())
    }

    /// A majority of votes for `volunteer`, keyed by voter.
    pub fn votes(&mut self, volunteer: &VolunteerMessage) -> BTreeMap<Identity, VoteMessage> {
        self.next_signers()
            .into_iter()
            .map(|voter| (voter, VoteMessage::new(volunteer.clone(), voter)))
            .collect()
    }

    pub fn leader_level(
        &mut self,
        volunteer: &VolunteerMessage,
        rank: u32,
        level: u32,
    ) -> LeaderLevelMessage {
        LeaderLevelMessage::new(self.next_signer(), rank, level, volunteer.clone())
    }

    /// A majority of leader-level votes at the same rank and level.
    pub fn leader_levels(
        &mut self,
        volunteer: &VolunteerMessage,
        rank: u32,
        level: u32,
    ) -> Vec<LeaderLevelMessage> {
        self.next_signers()
            .into_iter()
            .map(|signer| LeaderLevelMessage::new(signer, rank, level, volunteer.clone()))
            .collect()
    }

    pub fn majority_decision(&mut self, volunteer: &VolunteerMessage) -> MajorityDecisionMessage {
        let signer = self.next_signer();
        MajorityDecisionMessage::new(self.votes(volunteer), signer)
    }

    /// A majority of decisions, each signed by a distinct federated server.
    pub fn majority_decisions(
        &mut self,
        volunteer: &VolunteerMessage,
    ) -> BTreeMap<Identity, MajorityDecisionMessage> {
        self.next_signers()
            .into_iter()
            .map(|signer| {
                let decision = MajorityDecisionMessage::new(self.votes(volunteer), signer);
                (signer, decision)
            })
            .collect()
    }

    pub fn insist(&mut self, volunteer: &VolunteerMessage) -> InsistMessage {
        let signer = self.next_signer();
        InsistMessage::new(self.majority_decisions(volunteer), signer)
    }

    pub fn iack(&mut self, volunteer: &VolunteerMessage) -> IAckMessage {
        let insist = self.insist(volunteer);
        IAckMessage::new(insist, self.next_signer())
    }

    pub fn publish(&mut self, volunteer: &VolunteerMessage) -> PublishMessage {
        let insist = self.insist(volunteer);
        let signers: BTreeSet<Identity> = self.next_signers().into_iter().collect();
        PublishMessage::new(insist, self.next_signer(), signers)
    }
}
