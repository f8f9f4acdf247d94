//! Per-participant election round.
//!
//! A [`Round`] sequences one participant's handling of election messages for a
//! single stalled process-list slot.
//!
//! Federated servers move `FedStart → MajorityDecision → Insistence →
//! Publishing`:
//! - vote once, for the first valid volunteer seen, and count votes per
//!   volunteer through a [`VolunteerControl`];
//! - once a majority of votes for one volunteer is held, issue a majority
//!   decision;
//! - once a majority of agreeing decisions is held, insist on them;
//! - once a majority of federated servers acknowledged the insist, publish.
//!
//! A valid decision or insist received early is adopted instead of waiting for
//! our own votes. Audit servers start in `AudStart`, volunteer when they see the
//! EOM for their slot and then only observe: `WaitForPublish` if an aggregate
//! elects them, `WaitForTimeout` if it elects someone else.
//!
//! Every participant enters `Publishing` once it builds or receives a valid
//! publish; after that all input is ignored. Byzantine, duplicate or stale
//! input is never an error: it emits nothing and leaves the round unchanged.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use fedelect_messages::{
    EomMessage, Envelope, IAckMessage, InsistMessage, LeaderLevelMessage,
    MajorityDecisionMessage, Message, PublishMessage, VolunteerMessage, VoteMessage,
};
use fedelect_types::{AuthSet, Identity, MessageSigner, ProcessListLocation, Role};
use serde::{Deserialize, Serialize};

use crate::validation;
use crate::{ConsensusError, VolunteerControl};

/// Level a plain vote occupies in its volunteer's control.
const VOTE_LEVEL: u32 = 1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoundState {
    // Federated
    FedStart,
    MajorityDecision,
    Insistence,

    // Audit
    AudStart,
    WaitForPublish,
    WaitForTimeout,

    Publishing,
}

/// Result of delivering one message to a round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Step {
    pub emitted: Vec<Message>,
    pub changed: bool,
}

/// Everything that distinguishes one round from another with the same
/// participant, authority set and slot. Two rounds with equal views react
/// identically to every message.
#[derive(Debug, Serialize)]
pub struct RoundView<'a> {
    pub self_id: Identity,
    pub state: RoundState,
    /// Held votes and claimed rank per volunteer control.
    pub controls: Vec<(Identity, &'a BTreeMap<Identity, LeaderLevelMessage>, Option<u32>)>,
    pub votes: &'a BTreeMap<Identity, BTreeMap<Identity, VoteMessage>>,
    pub majority_decisions: &'a BTreeMap<Identity, MajorityDecisionMessage>,
    pub acknowledged: &'a BTreeSet<Identity>,
    pub decided: Option<&'a VolunteerMessage>,
    pub volunteer: Option<&'a VolunteerMessage>,
    pub vote: Option<&'a VoteMessage>,
    pub majority_decision: Option<&'a MajorityDecisionMessage>,
    pub insistence: Option<&'a InsistMessage>,
    pub iacks: &'a BTreeSet<Identity>,
    pub publish: Option<&'a PublishMessage>,
}

/// Snapshot of everything that can grow in a round, used to detect change.
#[derive(Clone, Copy, PartialEq, Eq)]
struct Progress {
    state: RoundState,
    votes: usize,
    decisions: usize,
    acknowledged: usize,
    iacks: usize,
    volunteered: bool,
    voted: bool,
    published: bool,
}

#[derive(Clone)]
pub struct Round {
    auth_set: AuthSet,
    self_id: Identity,
    location: ProcessListLocation,
    state: RoundState,
    signer: Option<Arc<dyn MessageSigner>>,

    /// Empty control cloned for each new volunteer.
    control_template: VolunteerControl,
    /// Vote aggregation per volunteer, keyed by the volunteering audit server.
    controls: BTreeMap<Identity, VolunteerControl>,
    /// Votes seen per volunteer, keyed by voter.
    votes: BTreeMap<Identity, BTreeMap<Identity, VoteMessage>>,
    /// Decisions agreeing with `decided`, keyed by signer.
    majority_decisions: BTreeMap<Identity, MajorityDecisionMessage>,
    /// Signers of insists we have acknowledged.
    acknowledged: BTreeSet<Identity>,
    /// The volunteer this round is bound to once any aggregate was accepted.
    decided: Option<VolunteerMessage>,

    // Our own messages
    volunteer: Option<VolunteerMessage>,
    vote: Option<VoteMessage>,
    majority_decision: Option<MajorityDecisionMessage>,
    insistence: Option<InsistMessage>,
    iacks: BTreeSet<Identity>,
    publish: Option<PublishMessage>,
}

impl Round {
    pub fn new(
        auth_set: AuthSet,
        self_id: Identity,
        location: ProcessListLocation,
    ) -> Result<Self, ConsensusError> {
        let role = auth_set
            .role(&self_id)
            .ok_or(ConsensusError::UnknownParticipant(self_id))?;
        let state = match role {
            Role::Federated => RoundState::FedStart,
            Role::Audit | Role::Neither => RoundState::AudStart,
        };
        let control_template = VolunteerControl::new(auth_set.clone(), self_id)?;

        Ok(Self {
            auth_set,
            self_id,
            location,
            state,
            signer: None,
            control_template,
            controls: BTreeMap::new(),
            votes: BTreeMap::new(),
            majority_decisions: BTreeMap::new(),
            acknowledged: BTreeSet::new(),
            decided: None,
            volunteer: None,
            vote: None,
            majority_decision: None,
            insistence: None,
            iacks: BTreeSet::new(),
            publish: None,
        })
    }

    /// Sign every message this round authors with `signer`.
    pub fn with_signer(mut self, signer: Arc<dyn MessageSigner>) -> Result<Self, ConsensusError> {
        if signer.identity() != self.self_id {
            return Err(ConsensusError::SignerMismatch {
                participant: self.self_id,
                signer: signer.identity(),
            });
        }
        self.signer = Some(signer);
        Ok(self)
    }

    /// Deliver a message, returning what this participant broadcasts in reply.
    pub fn execute(&mut self, msg: &Message) -> Result<Vec<Message>, ConsensusError> {
        Ok(self.step(msg)?.emitted)
    }

    /// Deliver a message, also reporting whether the round changed.
    ///
    /// Fails only when the attached signer cannot sign a reply; the round is
    /// left as it was before the message.
    pub fn step(&mut self, msg: &Message) -> Result<Step, ConsensusError> {
        let before = self.progress();
        // Only a signer can fail, so unsigned rounds skip the snapshot.
        let snapshot = self.signer.is_some().then(|| self.clone());
        let handled = match self.state {
            RoundState::FedStart => self.fed_start(msg),
            RoundState::MajorityDecision => self.deciding(msg),
            RoundState::Insistence => self.insisting(msg),
            RoundState::AudStart | RoundState::WaitForPublish | RoundState::WaitForTimeout => {
                self.observe(msg)
            }
            RoundState::Publishing => Ok(Vec::new()),
        };
        let emitted = match handled {
            Ok(emitted) => emitted,
            Err(err) => {
                if let Some(snapshot) = snapshot {
                    *self = snapshot;
                }
                tracing::warn!(participant = %self.self_id, %msg, %err, "reply not sent");
                return Err(err);
            }
        };
        let changed = self.progress() != before;
        if !changed {
            tracing::trace!(participant = %self.self_id, state = ?self.state, %msg, "ignored");
        }
        Ok(Step { emitted, changed })
    }

    // ── Federated states ───────────────────────────────────────────────

    fn fed_start(&mut self, msg: &Message) -> Result<Vec<Message>, ConsensusError> {
        match msg {
            Message::Volunteer(volunteer) => self.cast_vote(volunteer),
            Message::Vote(vote) => match self.record_vote(vote) {
                Some(votes) => self.decide(votes),
                None => Ok(Vec::new()),
            },
            Message::MajorityDecision(decision) => self.adopt_decision(decision),
            Message::Insist(insist) => self.acknowledge(insist, &BTreeSet::new()),
            Message::IAck(iack) => self.on_iack(iack),
            Message::Publish(publish) => Ok(self.on_publish(publish)),
            Message::Eom(_) => Ok(Vec::new()),
        }
    }

    fn deciding(&mut self, msg: &Message) -> Result<Vec<Message>, ConsensusError> {
        match msg {
            Message::MajorityDecision(decision) => self.add_decision(decision),
            Message::Insist(insist) => self.acknowledge(insist, &BTreeSet::new()),
            Message::IAck(iack) => self.on_iack(iack),
            Message::Publish(publish) => Ok(self.on_publish(publish)),
            Message::Eom(_) | Message::Volunteer(_) | Message::Vote(_) => Ok(Vec::new()),
        }
    }

    fn insisting(&mut self, msg: &Message) -> Result<Vec<Message>, ConsensusError> {
        match msg {
            Message::Insist(insist) => self.acknowledge(insist, &BTreeSet::new()),
            Message::IAck(iack) => self.on_iack(iack),
            Message::Publish(publish) => Ok(self.on_publish(publish)),
            Message::Eom(_)
            | Message::Volunteer(_)
            | Message::Vote(_)
            | Message::MajorityDecision(_) => Ok(Vec::new()),
        }
    }

    fn cast_vote(&mut self, volunteer: &VolunteerMessage) -> Result<Vec<Message>, ConsensusError> {
        if self.vote.is_some()
            || !validation::valid_volunteer(&self.auth_set, &self.location, volunteer)
        {
            return Ok(Vec::new());
        }
        let vote = self.seal(VoteMessage::new(volunteer.clone(), self.self_id))?;
        tracing::debug!(participant = %self.self_id, volunteer = %volunteer.signer(), "voting");
        self.vote = Some(vote.clone());

        let mut out = vec![Message::from(vote.clone())];
        if let Some(votes) = self.record_vote(&vote) {
            out.extend(self.decide(votes)?);
        }
        Ok(out)
    }

    /// Count a vote. Returns a majority of votes for its volunteer the first
    /// time one is held.
    fn record_vote(&mut self, vote: &VoteMessage) -> Option<BTreeMap<Identity, VoteMessage>> {
        if !validation::valid_vote(&self.auth_set, &self.location, vote) {
            return None;
        }
        let audit = vote.volunteer.signer();
        let voter = vote.signer();
        if self
            .votes
            .get(&audit)
            .is_some_and(|known| known.contains_key(&voter))
        {
            return None;
        }

        let control = self
            .controls
            .entry(audit)
            .or_insert_with(|| self.control_template.clone());
        let level_vote = LeaderLevelMessage::new(voter, 0, VOTE_LEVEL, vote.volunteer.clone());
        match control.add_vote(level_vote) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(err) => {
                tracing::trace!(participant = %self.self_id, %err, "vote rejected");
                return None;
            }
        }
        let known = self.votes.entry(audit).or_default();
        known.insert(voter, vote.clone());

        let claim = control.check_vote_count()?;
        Some(
            claim
                .justification
                .iter()
                .filter_map(|ll| known.get(&ll.signer()).map(|v| (ll.signer(), v.clone())))
                .collect(),
        )
    }

    fn decide(
        &mut self,
        votes: BTreeMap<Identity, VoteMessage>,
    ) -> Result<Vec<Message>, ConsensusError> {
        let decision = self.seal(MajorityDecisionMessage::new(votes, self.self_id))?;
        let Some(volunteer) = decision.volunteer().cloned() else {
            return Ok(Vec::new());
        };
        tracing::debug!(
            participant = %self.self_id,
            volunteer = %volunteer.signer(),
            "majority of votes held"
        );
        self.decided = Some(volunteer);
        self.majority_decision = Some(decision.clone());
        self.majority_decisions.insert(self.self_id, decision.clone());
        self.transition(RoundState::MajorityDecision);

        let mut out = vec![Message::from(decision)];
        out.extend(self.try_insist()?);
        Ok(out)
    }

    fn adopt_decision(
        &mut self,
        decision: &MajorityDecisionMessage,
    ) -> Result<Vec<Message>, ConsensusError> {
        let Some(volunteer) =
            validation::decision_volunteer(&self.auth_set, &self.location, decision)
        else {
            return Ok(Vec::new());
        };
        let known = self.votes.entry(volunteer.signer()).or_default();
        for (voter, vote) in &decision.majority_votes {
            known.entry(*voter).or_insert_with(|| vote.clone());
        }
        self.majority_decisions
            .insert(decision.signer(), decision.clone());
        self.decide(decision.majority_votes.clone())
    }

    fn add_decision(
        &mut self,
        decision: &MajorityDecisionMessage,
    ) -> Result<Vec<Message>, ConsensusError> {
        let Some(volunteer) =
            validation::decision_volunteer(&self.auth_set, &self.location, decision)
        else {
            return Ok(Vec::new());
        };
        if self.decided.as_ref() != Some(volunteer) {
            tracing::warn!(
                participant = %self.self_id,
                signer = %decision.signer(),
                volunteer = %volunteer.signer(),
                "majority decision conflicts with ours"
            );
            return Ok(Vec::new());
        }
        if self.majority_decisions.contains_key(&decision.signer()) {
            return Ok(Vec::new());
        }
        self.majority_decisions
            .insert(decision.signer(), decision.clone());
        self.try_insist()
    }

    fn try_insist(&mut self) -> Result<Vec<Message>, ConsensusError> {
        if self.insistence.is_some() || self.majority_decisions.len() < self.auth_set.majority() {
            return Ok(Vec::new());
        }
        let insist = self.seal(InsistMessage::new(
            self.majority_decisions.clone(),
            self.self_id,
        ))?;
        self.insistence = Some(insist.clone());
        self.iacks = BTreeSet::from([self.self_id]);
        self.transition(RoundState::Insistence);

        let mut out = vec![Message::from(insist)];
        out.extend(self.try_publish()?);
        Ok(out)
    }

    /// Acknowledge someone else's insist, carrying forward `prior` signers.
    fn acknowledge(
        &mut self,
        insist: &InsistMessage,
        prior: &BTreeSet<Identity>,
    ) -> Result<Vec<Message>, ConsensusError> {
        let Some(volunteer) = validation::insist_volunteer(&self.auth_set, &self.location, insist)
        else {
            return Ok(Vec::new());
        };
        let insister = insist.signer();
        if insister == self.self_id || self.acknowledged.contains(&insister) {
            return Ok(Vec::new());
        }
        if let Some(decided) = &self.decided {
            if decided != volunteer {
                tracing::warn!(
                    participant = %self.self_id,
                    insister = %insister,
                    "insist conflicts with our decision"
                );
                return Ok(Vec::new());
            }
        }

        self.decided = Some(volunteer.clone());
        for (signer, decision) in &insist.majority_decisions {
            self.majority_decisions
                .entry(*signer)
                .or_insert_with(|| decision.clone());
        }
        self.acknowledged.insert(insister);
        if matches!(
            self.state,
            RoundState::FedStart | RoundState::MajorityDecision
        ) {
            self.transition(RoundState::Insistence);
        }

        let mut iack = IAckMessage::new(insist.clone(), self.self_id);
        iack.signers.extend(prior.iter().copied());
        Ok(vec![Message::from(self.seal(iack)?)])
    }

    fn on_iack(&mut self, iack: &IAckMessage) -> Result<Vec<Message>, ConsensusError> {
        if validation::iack_volunteer(&self.auth_set, &self.location, iack).is_none() {
            return Ok(Vec::new());
        }
        if iack.insist.signer() != self.self_id {
            return self.acknowledge(&iack.insist, &iack.signers);
        }
        if self.insistence.as_ref() != Some(&iack.insist) {
            return Ok(Vec::new());
        }
        let before = self.iacks.len();
        self.iacks.extend(iack.signers.iter().copied());
        if self.iacks.len() == before {
            return Ok(Vec::new());
        }
        self.try_publish()
    }

    fn try_publish(&mut self) -> Result<Vec<Message>, ConsensusError> {
        if self.publish.is_some() || self.iacks.len() < self.auth_set.majority() {
            return Ok(Vec::new());
        }
        let Some(insist) = self.insistence.clone() else {
            return Ok(Vec::new());
        };
        let publish = self.seal(PublishMessage::new(insist, self.self_id, self.iacks.clone()))?;
        tracing::info!(
            participant = %self.self_id,
            location = %self.location,
            acks = self.iacks.len(),
            "publishing replacement"
        );
        self.publish = Some(publish.clone());
        self.finish();
        Ok(vec![Message::from(publish)])
    }

    fn on_publish(&mut self, publish: &PublishMessage) -> Vec<Message> {
        if self.publish.is_some() {
            return Vec::new();
        }
        let Some(volunteer) = validation::publish_volunteer(&self.auth_set, &self.location, publish)
        else {
            return Vec::new();
        };
        if self.decided.as_ref().is_some_and(|decided| decided != volunteer) {
            tracing::error!(
                participant = %self.self_id,
                publisher = %publish.signer(),
                "publish contradicts our decision"
            );
        }
        self.decided = Some(volunteer.clone());
        self.publish = Some(publish.clone());
        self.finish();
        Vec::new()
    }

    /// Enter `Publishing`. Vote counting is over, so the per-volunteer
    /// controls and collected votes are dropped.
    fn finish(&mut self) {
        self.controls.clear();
        self.votes.clear();
        self.transition(RoundState::Publishing);
    }

    // ── Audit states ───────────────────────────────────────────────────

    fn observe(&mut self, msg: &Message) -> Result<Vec<Message>, ConsensusError> {
        match msg {
            Message::Eom(eom) => self.volunteer_for(eom),
            Message::Volunteer(volunteer) => Ok(self.announce(volunteer)),
            Message::MajorityDecision(decision) => {
                let elected =
                    validation::decision_volunteer(&self.auth_set, &self.location, decision).cloned();
                Ok(self.observe_election(elected))
            }
            Message::Insist(insist) => {
                let elected =
                    validation::insist_volunteer(&self.auth_set, &self.location, insist).cloned();
                Ok(self.observe_election(elected))
            }
            Message::IAck(iack) => {
                let elected =
                    validation::iack_volunteer(&self.auth_set, &self.location, iack).cloned();
                Ok(self.observe_election(elected))
            }
            Message::Publish(publish) => Ok(self.on_publish(publish)),
            Message::Vote(_) => Ok(Vec::new()),
        }
    }

    fn volunteer_for(&mut self, eom: &EomMessage) -> Result<Vec<Message>, ConsensusError> {
        if self.state != RoundState::AudStart
            || self.volunteer.is_some()
            || eom.location != self.location
            || !self.auth_set.is_audit(&self.self_id)
        {
            return Ok(Vec::new());
        }
        let volunteer = self.seal(VolunteerMessage::new(eom.clone(), self.self_id))?;
        tracing::debug!(participant = %self.self_id, location = %self.location, "volunteering");
        self.volunteer = Some(volunteer.clone());
        Ok(vec![Message::from(volunteer)])
    }

    /// Broadcast our own volunteer when the owner hands it to us.
    fn announce(&mut self, volunteer: &VolunteerMessage) -> Vec<Message> {
        if self.state != RoundState::AudStart
            || self.volunteer.is_some()
            || volunteer.signer() != self.self_id
            || !validation::valid_volunteer(&self.auth_set, &self.location, volunteer)
        {
            return Vec::new();
        }
        self.volunteer = Some(volunteer.clone());
        vec![Message::from(volunteer.clone())]
    }

    fn observe_election(&mut self, elected: Option<VolunteerMessage>) -> Vec<Message> {
        let Some(elected) = elected else {
            return Vec::new();
        };
        if self.state != RoundState::AudStart {
            return Vec::new();
        }
        let next = if elected.signer() == self.self_id {
            RoundState::WaitForPublish
        } else {
            RoundState::WaitForTimeout
        };
        self.decided = Some(elected);
        self.transition(next);
        Vec::new()
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn seal<T: Envelope>(&self, mut msg: T) -> Result<T, ConsensusError> {
        if let Some(signer) = &self.signer {
            msg.sign(signer.as_ref())
                .map_err(|err| ConsensusError::Signing {
                    participant: self.self_id,
                    reason: err.to_string(),
                })?;
        }
        Ok(msg)
    }

    fn transition(&mut self, next: RoundState) {
        tracing::debug!(participant = %self.self_id, from = ?self.state, to = ?next, "round transition");
        self.state = next;
    }

    fn progress(&self) -> Progress {
        Progress {
            state: self.state,
            votes: self.votes.values().map(BTreeMap::len).sum(),
            decisions: self.majority_decisions.len(),
            acknowledged: self.acknowledged.len(),
            iacks: self.iacks.len(),
            volunteered: self.volunteer.is_some(),
            voted: self.vote.is_some(),
            published: self.publish.is_some(),
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn self_id(&self) -> Identity {
        self.self_id
    }

    pub fn location(&self) -> ProcessListLocation {
        self.location
    }

    pub fn auth_set(&self) -> &AuthSet {
        &self.auth_set
    }

    /// True once a valid publish was built or observed.
    pub fn committed(&self) -> bool {
        self.publish.is_some()
    }

    /// The volunteer authorized by the publish this round holds.
    pub fn published_volunteer(&self) -> Option<&VolunteerMessage> {
        self.publish.as_ref().and(self.decided.as_ref())
    }

    /// The volunteer this round is bound to, if any aggregate was accepted.
    pub fn decided(&self) -> Option<&VolunteerMessage> {
        self.decided.as_ref()
    }

    pub fn vote(&self) -> Option<&VoteMessage> {
        self.vote.as_ref()
    }

    pub fn majority_decision(&self) -> Option<&MajorityDecisionMessage> {
        self.majority_decision.as_ref()
    }

    pub fn insistence(&self) -> Option<&InsistMessage> {
        self.insistence.as_ref()
    }

    pub fn iacks(&self) -> &BTreeSet<Identity> {
        &self.iacks
    }

    pub fn publish(&self) -> Option<&PublishMessage> {
        self.publish.as_ref()
    }

    pub fn volunteer_control(&self, audit: &Identity) -> Option<&VolunteerControl> {
        self.controls.get(audit)
    }

    /// Borrowed view of the mutable state, for hashing equivalent rounds.
    pub fn view(&self) -> RoundView<'_> {
        RoundView {
            self_id: self.self_id,
            state: self.state,
            controls: self
                .controls
                .iter()
                .map(|(audit, control)| (*audit, control.votes(), control.claimed_rank()))
                .collect(),
            votes: &self.votes,
            majority_decisions: &self.majority_decisions,
            acknowledged: &self.acknowledged,
            decided: self.decided.as_ref(),
            volunteer: self.volunteer.as_ref(),
            vote: self.vote.as_ref(),
            majority_decision: self.majority_decision.as_ref(),
            insistence: self.insistence.as_ref(),
            iacks: &self.iacks,
            publish: self.publish.as_ref(),
        }
    }

    /// Number of distinct votes seen for the given volunteer.
    pub fn vote_count(&self, audit: &Identity) -> usize {
        self.votes.get(audit).map_or(0, BTreeMap::len)
    }
}

impl fmt::Debug for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Round")
            .field("self_id", &self.self_id)
            .field("location", &self.location)
            .field("state", &self.state)
            .field("decided", &self.decided.as_ref().map(VolunteerMessage::signer))
            .field("decisions", &self.majority_decisions.len())
            .field("iacks", &self.iacks.len())
            .field("committed", &self.committed())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedelect_crypto::{Ed25519Signer, Ed25519Verifier};
    use fedelect_nullables::{NullSigner, NullVerifier};
    use std::collections::VecDeque;

    fn id(i: u32) -> Identity {
        Identity::from_index(i)
    }

    fn loc() -> ProcessListLocation {
        ProcessListLocation::new(0, 0, 10)
    }

    // F1..F3 = 1..3, A1 = 101, A2 = 102
    fn auth_set() -> AuthSet {
        let mut set = AuthSet::new();
        for i in 1..=3 {
            set.add(id(i), Role::Federated).unwrap();
        }
        set.add(id(101), Role::Audit).unwrap();
        set.add(id(102), Role::Audit).unwrap();
        set
    }

    fn round(i: u32) -> Round {
        Round::new(auth_set(), id(i), loc()).unwrap()
    }

    fn eom() -> EomMessage {
        EomMessage::new(loc(), id(1))
    }

    fn volunteer(audit: u32) -> VolunteerMessage {
        VolunteerMessage::new(eom(), id(audit))
    }

    fn vote(voter: u32, audit: u32) -> VoteMessage {
        VoteMessage::new(volunteer(audit), id(voter))
    }

    fn decision(signer: u32, voters: &[u32]) -> MajorityDecisionMessage {
        let votes = voters.iter().map(|&v| (id(v), vote(v, 101))).collect();
        MajorityDecisionMessage::new(votes, id(signer))
    }

    fn insist(signer: u32, deciders: &[u32]) -> InsistMessage {
        let decisions = deciders
            .iter()
            .map(|&d| (id(d), decision(d, &[1, 2])))
            .collect();
        InsistMessage::new(decisions, id(signer))
    }

    fn kinds(msgs: &[Message]) -> Vec<fedelect_messages::MessageKind> {
        msgs.iter().map(Message::kind).collect()
    }

    /// Deliver in FIFO order, broadcasting every emission to all other
    /// participants, until nothing is pending.
    fn run_fifo(rounds: &mut BTreeMap<Identity, Round>, start: Vec<(Identity, Message)>) {
        let mut queue: VecDeque<(Identity, Message)> = start.into();
        let mut delivered = 0;
        while let Some((target, msg)) = queue.pop_front() {
            delivered += 1;
            assert!(delivered < 10_000, "delivery did not quiesce");
            let emitted = rounds.get_mut(&target).unwrap().execute(&msg).unwrap();
            for out in emitted {
                for other in rounds.keys().filter(|k| **k != target) {
                    queue.push_back((*other, out.clone()));
                }
            }
        }
    }

    #[test]
    fn unknown_participant_rejected() {
        let err = Round::new(auth_set(), id(42), loc()).unwrap_err();
        assert_eq!(err, ConsensusError::UnknownParticipant(id(42)));
    }

    #[test]
    fn initial_state_follows_role() {
        assert_eq!(round(1).state(), RoundState::FedStart);
        assert_eq!(round(101).state(), RoundState::AudStart);
        assert!(!round(1).committed());
    }

    #[test]
    fn signer_must_match_participant() {
        let signer = Arc::new(Ed25519Signer::from_seed(&[7u8; 32]));
        let err = round(1).with_signer(signer.clone()).unwrap_err();
        assert_eq!(
            err,
            ConsensusError::SignerMismatch {
                participant: id(1),
                signer: signer.identity(),
            }
        );
    }

    #[test]
    fn first_volunteer_gets_our_vote() {
        let mut f1 = round(1);
        let out = f1.execute(&volunteer(101).into()).unwrap();
        assert_eq!(out, vec![Message::from(vote(1, 101))]);
        assert_eq!(f1.vote_count(&id(101)), 1);

        // One vote per round.
        let step = f1.step(&volunteer(102).into()).unwrap();
        assert!(step.emitted.is_empty());
        assert!(!step.changed);
    }

    #[test]
    fn majority_of_votes_yields_decision() {
        let mut f1 = round(1);
        f1.execute(&volunteer(101).into()).unwrap();
        let out = f1.execute(&vote(2, 101).into()).unwrap();

        assert_eq!(kinds(&out), vec![fedelect_messages::MessageKind::MajorityDecision]);
        assert_eq!(f1.state(), RoundState::MajorityDecision);
        assert_eq!(f1.decided(), Some(&volunteer(101)));
        let own = f1.majority_decision().unwrap();
        assert_eq!(own.majority_votes.len(), 2);
        assert_eq!(f1.volunteer_control(&id(101)).unwrap().claimed_rank(), Some(1));
    }

    #[test]
    fn votes_for_unknown_volunteer_are_counted_before_ours() {
        let mut f1 = round(1);
        assert!(f1.execute(&vote(2, 102).into()).unwrap().is_empty());
        assert_eq!(f1.vote_count(&id(102)), 1);

        // Our vote for the same volunteer completes the majority.
        let out = f1.execute(&volunteer(102).into()).unwrap();
        assert_eq!(
            kinds(&out),
            vec![
                fedelect_messages::MessageKind::Vote,
                fedelect_messages::MessageKind::MajorityDecision
            ]
        );
    }

    #[test]
    fn early_decision_is_adopted() {
        let mut f3 = round(3);
        let out = f3.execute(&decision(1, &[1, 2]).into()).unwrap();

        // Our own decision plus an insist backed by both.
        assert_eq!(
            kinds(&out),
            vec![
                fedelect_messages::MessageKind::MajorityDecision,
                fedelect_messages::MessageKind::Insist
            ]
        );
        assert_eq!(f3.state(), RoundState::Insistence);
        assert_eq!(f3.insistence().unwrap().majority_decisions.len(), 2);
        assert_eq!(f3.vote_count(&id(101)), 2);
    }

    #[test]
    fn insist_acknowledged_once() {
        let mut f3 = round(3);
        let out = f3.execute(&insist(1, &[1, 2]).into()).unwrap();
        assert_eq!(out.len(), 1);
        let Message::IAck(iack) = &out[0] else {
            panic!("expected iack, got {}", out[0]);
        };
        assert_eq!(iack.signer(), id(3));
        assert_eq!(iack.signers, BTreeSet::from([id(3)]));
        assert_eq!(f3.state(), RoundState::Insistence);

        let again = f3.step(&insist(1, &[1, 2]).into()).unwrap();
        assert!(again.emitted.is_empty());
        assert!(!again.changed);
    }

    #[test]
    fn foreign_iack_is_extended_with_our_ack() {
        let mut f3 = round(3);
        let relayed = IAckMessage::new(insist(1, &[1, 2]), id(2));
        let out = f3.execute(&relayed.into()).unwrap();
        let Message::IAck(iack) = &out[0] else {
            panic!("expected iack");
        };
        assert_eq!(iack.signers, BTreeSet::from([id(2), id(3)]));
    }

    #[test]
    fn acknowledgements_complete_publish() {
        let mut f1 = round(1);
        let out = f1.execute(&decision(2, &[1, 2]).into()).unwrap();
        let Some(Message::Insist(own)) = out.last().cloned() else {
            panic!("expected insist");
        };
        assert_eq!(f1.iacks(), &BTreeSet::from([id(1)]));

        let out = f1.execute(&IAckMessage::new(own, id(3)).into()).unwrap();
        assert_eq!(kinds(&out), vec![fedelect_messages::MessageKind::Publish]);
        assert_eq!(f1.state(), RoundState::Publishing);
        assert!(f1.committed());
        assert_eq!(f1.published_volunteer(), Some(&volunteer(101)));
        assert_eq!(f1.publish().unwrap().signers.len(), 2);
    }

    #[test]
    fn iack_for_unknown_insist_of_ours_ignored() {
        let mut f1 = round(1);
        let step = f1.step(&IAckMessage::new(insist(1, &[1, 2]), id(2)).into()).unwrap();
        assert!(step.emitted.is_empty());
        assert!(!step.changed);
    }

    #[test]
    fn malformed_input_is_noise() {
        let mut f1 = round(1);
        let noise: Vec<Message> = vec![
            vote(101, 101).into(),
            decision(2, &[2]).into(),
            insist(2, &[2]).into(),
            VolunteerMessage::new(eom(), id(3)).into(),
            eom().into(),
        ];
        for msg in &noise {
            let step = f1.step(msg).unwrap();
            assert!(step.emitted.is_empty(), "{msg} emitted");
            assert!(!step.changed, "{msg} changed the round");
        }
        assert_eq!(f1.state(), RoundState::FedStart);
    }

    #[test]
    fn conflicting_decision_ignored_after_deciding() {
        let mut f1 = round(1);
        f1.execute(&volunteer(101).into()).unwrap();
        f1.execute(&vote(2, 101).into()).unwrap();

        let other: BTreeMap<_, _> = [(id(2), vote(2, 102)), (id(3), vote(3, 102))].into();
        let step = f1.step(&MajorityDecisionMessage::new(other, id(3)).into()).unwrap();
        assert!(step.emitted.is_empty());
        assert!(!step.changed);
        assert_eq!(f1.decided(), Some(&volunteer(101)));
    }

    #[test]
    fn audit_volunteers_once_for_its_slot() {
        let mut a1 = round(101);
        let elsewhere = EomMessage::new(ProcessListLocation::new(1, 0, 10), id(1));
        assert!(a1.execute(&elsewhere.into()).unwrap().is_empty());

        let out = a1.execute(&eom().into()).unwrap();
        assert_eq!(out, vec![Message::from(volunteer(101))]);
        assert!(a1.execute(&eom().into()).unwrap().is_empty());
    }

    #[test]
    fn audit_rebroadcasts_only_its_own_volunteer() {
        let mut a1 = round(101);
        assert!(a1.execute(&volunteer(102).into()).unwrap().is_empty());
        assert_eq!(a1.execute(&volunteer(101).into()).unwrap().len(), 1);
    }

    #[test]
    fn audit_waits_according_to_election() {
        let mut elected = round(101);
        elected.execute(&decision(1, &[1, 2]).into()).unwrap();
        assert_eq!(elected.state(), RoundState::WaitForPublish);

        let mut passed_over = round(102);
        passed_over.execute(&insist(2, &[1, 2]).into()).unwrap();
        assert_eq!(passed_over.state(), RoundState::WaitForTimeout);
    }

    #[test]
    fn fifo_delivery_reaches_publish_everywhere() {
        let mut rounds: BTreeMap<Identity, Round> =
            [1, 2, 3, 101, 102].into_iter().map(|i| (id(i), round(i))).collect();
        run_fifo(&mut rounds, vec![(id(101), eom().into())]);

        for round in rounds.values() {
            assert_eq!(round.state(), RoundState::Publishing, "{round:?}");
            assert_eq!(round.published_volunteer().map(VolunteerMessage::signer), Some(id(101)));
        }
    }

    #[test]
    fn publishing_is_terminal() {
        let mut rounds: BTreeMap<Identity, Round> =
            [1, 2, 3].into_iter().map(|i| (id(i), round(i))).collect();
        let start = [1, 2, 3]
            .into_iter()
            .map(|i| (id(i), Message::from(volunteer(101))))
            .collect();
        run_fifo(&mut rounds, start);

        let f2 = rounds.get_mut(&id(2)).unwrap();
        assert!(f2.committed());
        let step = f2.step(&volunteer(102).into()).unwrap();
        assert!(step.emitted.is_empty());
        assert!(!step.changed);
    }

    #[test]
    fn signed_rounds_produce_verifiable_messages() {
        let signers: Vec<Arc<Ed25519Signer>> = (1u8..=3)
            .map(|i| Arc::new(Ed25519Signer::from_seed(&[i; 32])))
            .collect();
        let audit = Arc::new(Ed25519Signer::from_seed(&[100; 32]));
        let mut set = AuthSet::new();
        for s in &signers {
            set.add(s.identity(), Role::Federated).unwrap();
        }
        set.add(audit.identity(), Role::Audit).unwrap();

        let mut a1 = Round::new(set.clone(), audit.identity(), loc())
            .unwrap()
            .with_signer(audit.clone())
            .unwrap();
        let mut f1 = Round::new(set, signers[0].identity(), loc())
            .unwrap()
            .with_signer(signers[0].clone())
            .unwrap();

        let out = a1.execute(&EomMessage::new(loc(), signers[0].identity()).into()).unwrap();
        assert!(out[0].verify(&Ed25519Verifier));

        let votes = f1.execute(&out[0]).unwrap();
        assert_eq!(votes.len(), 1);
        assert!(votes[0].verify(&Ed25519Verifier));
        assert_eq!(votes[0].signer(), signers[0].identity());
    }

    #[test]
    fn publishing_releases_vote_counting() {
        let mut rounds: BTreeMap<Identity, Round> =
            [1, 2, 3, 101, 102].into_iter().map(|i| (id(i), round(i))).collect();
        run_fifo(&mut rounds, vec![(id(101), eom().into())]);

        for round in rounds.values() {
            assert!(round.committed());
            assert!(round.volunteer_control(&id(101)).is_none(), "{round:?}");
            assert_eq!(round.vote_count(&id(101)), 0);
        }
    }

    #[test]
    fn null_signed_rounds_publish_verifiable_messages() {
        let mut rounds: BTreeMap<Identity, Round> = [1, 2, 3, 101, 102]
            .into_iter()
            .map(|i| {
                let signed = round(i).with_signer(Arc::new(NullSigner::new(id(i)))).unwrap();
                (id(i), signed)
            })
            .collect();
        run_fifo(&mut rounds, vec![(id(101), eom().into())]);

        for round in rounds.values() {
            let publish = Message::from(round.publish().unwrap().clone());
            assert!(publish.verify(&NullVerifier), "{round:?}");
            assert!(!publish.verify(&Ed25519Verifier));
        }
    }

    #[test]
    fn failed_signature_is_reported_and_round_kept() {
        let mut f1 = round(1)
            .with_signer(Arc::new(NullSigner::broken(id(1))))
            .unwrap();

        let err = f1.step(&volunteer(101).into()).unwrap_err();
        assert!(matches!(err, ConsensusError::Signing { participant, .. } if participant == id(1)));
        assert!(f1.vote().is_none());
        assert_eq!(f1.vote_count(&id(101)), 0);

        // Adopting a decision records votes before signing ours; all of it is undone.
        let err = f1.step(&decision(2, &[2, 3]).into()).unwrap_err();
        assert!(matches!(err, ConsensusError::Signing { .. }));
        assert_eq!(f1.state(), RoundState::FedStart);
        assert_eq!(f1.vote_count(&id(101)), 0);
        assert!(f1.majority_decision().is_none());
        assert!(f1.decided().is_none());
    }

    #[test]
    fn failed_signature_keeps_audit_silent() {
        let mut a1 = round(101)
            .with_signer(Arc::new(NullSigner::broken(id(101))))
            .unwrap();
        assert!(a1.execute(&eom().into()).is_err());
        assert_eq!(a1.state(), RoundState::AudStart);
    }

    #[test]
    fn view_ignores_arrival_order() {
        let mut a = round(1);
        a.execute(&vote(2, 101).into()).unwrap();
        a.execute(&vote(3, 102).into()).unwrap();

        let mut b = round(1);
        b.execute(&vote(3, 102).into()).unwrap();
        b.execute(&vote(2, 101).into()).unwrap();

        assert_eq!(format!("{:?}", a.view()), format!("{:?}", b.view()));
        assert_ne!(format!("{:?}", a.view()), format!("{:?}", round(1).view()));
    }
}
