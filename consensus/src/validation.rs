//! Structural checks on election messages.
//!
//! Signatures are assumed to have been verified before a message reaches the
//! election core. These checks establish who may say what: volunteers come from
//! audit servers for the stalled slot, votes come from federated servers, and
//! every aggregate carries at least a majority of consistent parts.

use fedelect_messages::{
    IAckMessage, InsistMessage, MajorityDecisionMessage, PublishMessage, VolunteerMessage,
    VoteMessage,
};
use fedelect_types::{AuthSet, ProcessListLocation};

pub fn valid_volunteer(
    auth_set: &AuthSet,
    location: &ProcessListLocation,
    volunteer: &VolunteerMessage,
) -> bool {
    auth_set.is_audit(&volunteer.signer()) && volunteer.location() == *location
}

pub fn valid_vote(auth_set: &AuthSet, location: &ProcessListLocation, vote: &VoteMessage) -> bool {
    auth_set.is_leader(&vote.signer()) && valid_volunteer(auth_set, location, &vote.volunteer)
}

/// The volunteer a well-formed majority decision elects.
pub fn decision_volunteer<'a>(
    auth_set: &AuthSet,
    location: &ProcessListLocation,
    decision: &'a MajorityDecisionMessage,
) -> Option<&'a VolunteerMessage> {
    if !auth_set.is_leader(&decision.signer())
        || decision.majority_votes.len() < auth_set.majority()
    {
        return None;
    }
    let well_formed = decision
        .majority_votes
        .iter()
        .all(|(voter, vote)| *voter == vote.signer() && valid_vote(auth_set, location, vote));
    if !well_formed {
        return None;
    }
    decision.volunteer()
}

/// The volunteer a well-formed insist elects.
pub fn insist_volunteer<'a>(
    auth_set: &AuthSet,
    location: &ProcessListLocation,
    insist: &'a InsistMessage,
) -> Option<&'a VolunteerMessage> {
    if !auth_set.is_leader(&insist.signer())
        || insist.majority_decisions.len() < auth_set.majority()
    {
        return None;
    }
    let well_formed = insist.majority_decisions.iter().all(|(signer, decision)| {
        *signer == decision.signer() && decision_volunteer(auth_set, location, decision).is_some()
    });
    if !well_formed {
        return None;
    }
    insist.volunteer()
}

/// The volunteer an acknowledgement refers to, if the insist is well formed
/// and every acknowledger is a federated server.
pub fn iack_volunteer<'a>(
    auth_set: &AuthSet,
    location: &ProcessListLocation,
    iack: &'a IAckMessage,
) -> Option<&'a VolunteerMessage> {
    if iack.signers.is_empty() || !iack.signers.iter().all(|s| auth_set.is_leader(s)) {
        return None;
    }
    insist_volunteer(auth_set, location, &iack.insist)
}

/// The volunteer a publish authorizes, if backed by a majority of
/// acknowledgements of a well-formed insist.
pub fn publish_volunteer<'a>(
    auth_set: &AuthSet,
    location: &ProcessListLocation,
    publish: &'a PublishMessage,
) -> Option<&'a VolunteerMessage> {
    if !auth_set.is_leader(&publish.signer())
        || publish.signers.len() < auth_set.majority()
        || !publish.signers.iter().all(|s| auth_set.is_leader(s))
    {
        return None;
    }
    insist_volunteer(auth_set, location, &publish.insist)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedelect_messages::EomMessage;
    use fedelect_types::{Identity, Role};
    use std::collections::{BTreeMap, BTreeSet};

    fn id(i: u32) -> Identity {
        Identity::from_index(i)
    }

    fn loc() -> ProcessListLocation {
        ProcessListLocation::new(0, 0, 10)
    }

    fn auth_set() -> AuthSet {
        let mut set = AuthSet::new();
        for i in 1..=3 {
            set.add(id(i), Role::Federated).unwrap();
        }
        set.add(id(101), Role::Audit).unwrap();
        set
    }

    fn volunteer(audit: u32) -> VolunteerMessage {
        VolunteerMessage::new(EomMessage::new(loc(), id(1)), id(audit))
    }

    fn decision(signer: u32, voters: &[u32]) -> MajorityDecisionMessage {
        let votes = voters
            .iter()
            .map(|&v| (id(v), VoteMessage::new(volunteer(101), id(v))))
            .collect();
        MajorityDecisionMessage::new(votes, id(signer))
    }

    fn insist(signer: u32, deciders: &[u32]) -> InsistMessage {
        let decisions = deciders
            .iter()
            .map(|&d| (id(d), decision(d, &[1, 2])))
            .collect();
        InsistMessage::new(decisions, id(signer))
    }

    #[test]
    fn volunteer_must_be_audit_at_location() {
        let set = auth_set();
        assert!(valid_volunteer(&set, &loc(), &volunteer(101)));
        assert!(!valid_volunteer(&set, &loc(), &volunteer(2)));
        let elsewhere = VolunteerMessage::new(
            EomMessage::new(ProcessListLocation::new(1, 0, 10), id(1)),
            id(101),
        );
        assert!(!valid_volunteer(&set, &loc(), &elsewhere));
    }

    #[test]
    fn vote_must_come_from_federated() {
        let set = auth_set();
        assert!(valid_vote(&set, &loc(), &VoteMessage::new(volunteer(101), id(1))));
        assert!(!valid_vote(&set, &loc(), &VoteMessage::new(volunteer(101), id(101))));
    }

    #[test]
    fn decision_needs_majority_of_votes() {
        let set = auth_set();
        assert_eq!(
            decision_volunteer(&set, &loc(), &decision(1, &[1, 2])),
            Some(&volunteer(101))
        );
        assert!(decision_volunteer(&set, &loc(), &decision(1, &[1])).is_none());
    }

    #[test]
    fn decision_rejects_mislabelled_votes() {
        let set = auth_set();
        let mut forged = decision(1, &[1]);
        forged
            .majority_votes
            .insert(id(2), VoteMessage::new(volunteer(101), id(3)));
        assert!(decision_volunteer(&set, &loc(), &forged).is_none());
    }

    #[test]
    fn insist_needs_majority_of_decisions() {
        let set = auth_set();
        assert_eq!(
            insist_volunteer(&set, &loc(), &insist(1, &[1, 2])),
            Some(&volunteer(101))
        );
        assert!(insist_volunteer(&set, &loc(), &insist(1, &[1])).is_none());
    }

    #[test]
    fn publish_needs_majority_of_federated_signers() {
        let set = auth_set();
        let good = PublishMessage::new(insist(1, &[1, 2]), id(1), BTreeSet::from([id(1), id(3)]));
        assert_eq!(publish_volunteer(&set, &loc(), &good), Some(&volunteer(101)));

        let short = PublishMessage::new(insist(1, &[1, 2]), id(1), BTreeSet::from([id(1)]));
        assert!(publish_volunteer(&set, &loc(), &short).is_none());

        let audit_signed =
            PublishMessage::new(insist(1, &[1, 2]), id(1), BTreeSet::from([id(1), id(101)]));
        assert!(publish_volunteer(&set, &loc(), &audit_signed).is_none());
    }

    #[test]
    fn iack_signers_must_be_federated() {
        let set = auth_set();
        let mut iack = IAckMessage::new(insist(1, &[1, 2]), id(2));
        assert!(iack_volunteer(&set, &loc(), &iack).is_some());
        iack.signers.insert(id(101));
        assert!(iack_volunteer(&set, &loc(), &iack).is_none());

        let empty = IAckMessage {
            signers: BTreeSet::new(),
            ..IAckMessage::new(InsistMessage::new(BTreeMap::new(), id(1)), id(2))
        };
        assert!(iack_volunteer(&set, &loc(), &empty).is_none());
    }
}
