use proptest::prelude::*;

use fedelect_consensus::{Round, RoundState, VolunteerControl};
use fedelect_messages::{LeaderLevelMessage, Message};
use fedelect_nullables::{audit_id, federated_id, MessageFactory, NullAuthority};

/// (signer index among all members, rank, level)
fn vote_strategy(members: u32) -> impl Strategy<Value = (u32, u32, u32)> {
    (0..members, 0u32..4, 1u32..6)
}

fn control(authority: &NullAuthority) -> VolunteerControl {
    VolunteerControl::new(authority.auth_set.clone(), federated_id(0)).unwrap()
}

fn leader_level(authority: &NullAuthority, signer: u32, rank: u32, level: u32) -> LeaderLevelMessage {
    let factory = MessageFactory::from_authority(authority);
    let participants = authority.participants();
    LeaderLevelMessage::new(
        participants[signer as usize],
        rank,
        level,
        factory.volunteer(audit_id(0)),
    )
}

proptest! {
    /// The pool never holds more than a majority of votes.
    #[test]
    fn aggregation_is_bounded(
        feds in 1u32..8,
        votes in prop::collection::vec(vote_strategy(10), 0..60),
    ) {
        let authority = NullAuthority::new(feds, 2);
        let members = authority.participants().len() as u32;
        let mut vc = control(&authority);
        for (signer, rank, level) in votes {
            vc.add_vote(leader_level(&authority, signer % members, rank, level)).unwrap();
            prop_assert!(vc.len() <= vc.majority());
            if vc.len() == vc.majority() && signer % 3 == 0 {
                vc.check_vote_count();
                prop_assert!(vc.len() < vc.majority());
            }
        }
    }

    /// Ranks claimed by successive majorities never decrease.
    #[test]
    fn claimed_rank_is_monotonic(
        votes in prop::collection::vec(vote_strategy(5), 0..80),
    ) {
        let authority = NullAuthority::default();
        let mut vc = control(&authority);
        let mut last = None;
        for (signer, rank, level) in votes {
            vc.add_vote(leader_level(&authority, signer, rank, level)).unwrap();
            if let Some(claim) = vc.check_vote_count() {
                if let Some(previous) = last {
                    prop_assert!(claim.rank >= previous);
                }
                prop_assert!(claim.level >= claim.rank);
                last = Some(claim.rank);
            }
        }
    }

    /// Adding the same vote twice changes the pool at most once.
    #[test]
    fn duplicate_votes_are_idempotent(
        votes in prop::collection::vec(vote_strategy(5), 1..20),
    ) {
        let authority = NullAuthority::default();
        let mut vc = control(&authority);
        for (signer, rank, level) in votes {
            let msg = leader_level(&authority, signer, rank, level);
            vc.add_vote(msg.clone()).unwrap();
            let before = vc.votes().clone();
            prop_assert!(!vc.add_vote(msg).unwrap());
            prop_assert_eq!(&before, vc.votes());
        }
    }

    /// A round emits nothing for messages that change nothing, and never
    /// leaves Publishing once there.
    #[test]
    fn unchanged_rounds_emit_nothing(
        picks in prop::collection::vec((0usize..7, 0u32..2), 0..40),
    ) {
        let authority = NullAuthority::default();
        let mut factory = MessageFactory::from_authority(&authority);
        let mut round = Round::new(authority.auth_set.clone(), federated_id(2), authority.location).unwrap();

        for (kind, audit) in picks {
            let volunteer = factory.volunteer(audit_id(audit));
            let msg: Message = match kind {
                0 => factory.eom().into(),
                1 => volunteer.into(),
                2 => factory.vote(&volunteer).into(),
                3 => factory.majority_decision(&volunteer).into(),
                4 => factory.insist(&volunteer).into(),
                5 => factory.iack(&volunteer).into(),
                _ => factory.publish(&volunteer).into(),
            };
            let was_publishing = round.state() == RoundState::Publishing;
            let step = round.step(&msg).unwrap();
            if !step.changed {
                prop_assert!(step.emitted.is_empty());
            }
            if was_publishing {
                prop_assert_eq!(round.state(), RoundState::Publishing);
                prop_assert!(!step.changed);
            }
        }
    }
}
