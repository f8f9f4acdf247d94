//! Bounded-memory aggregation of ranked votes for a single volunteer.
//!
//! A [`VolunteerControl`] holds at most `majority` leader-level votes, one per
//! signer. Once a majority is held, [`VolunteerControl::check_vote_count`]
//! turns them into a new leader-level vote for the owning participant whose
//! rank is the lowest level in the pool, and prunes every vote at or below that
//! rank. Pruned votes are spent: they can never again raise the rank this
//! control claims, so later votes at or below the claimed rank are ignored and
//! the claimed rank never decreases.

use std::collections::BTreeMap;

use fedelect_messages::{LeaderLevelMessage, VolunteerMessage};
use fedelect_types::{AuthSet, Identity};

use crate::ConsensusError;

#[derive(Clone, Debug)]
pub struct VolunteerControl {
    auth_set: AuthSet,
    self_id: Identity,
    volunteer: Option<VolunteerMessage>,
    /// Latest vote per signer.
    votes: BTreeMap<Identity, LeaderLevelMessage>,
    /// Rank returned by the last successful `check_vote_count`.
    claimed_rank: Option<u32>,
}

impl VolunteerControl {
    /// Create an empty control owned by `self_id`.
    pub fn new(auth_set: AuthSet, self_id: Identity) -> Result<Self, ConsensusError> {
        if !auth_set.contains(&self_id) {
            return Err(ConsensusError::UnknownParticipant(self_id));
        }
        Ok(Self {
            auth_set,
            self_id,
            volunteer: None,
            votes: BTreeMap::new(),
            claimed_rank: None,
        })
    }

    /// Record a vote. Returns whether the held votes changed.
    ///
    /// - The first vote fixes the volunteer; votes for any other volunteer fail
    ///   with [`ConsensusError::WrongVolunteer`].
    /// - A signer's second vote at the same level is a duplicate.
    /// - A signer's vote at a different level replaces the held one only when
    ///   its rank is higher; the stored copy drops its justification.
    /// - Holding more than `majority` votes evicts the lowest by
    ///   (level, rank, signer).
    pub fn add_vote(&mut self, msg: LeaderLevelMessage) -> Result<bool, ConsensusError> {
        match &self.volunteer {
            None => self.volunteer = Some(msg.volunteer.clone()),
            Some(volunteer) if *volunteer != msg.volunteer => {
                return Err(ConsensusError::WrongVolunteer {
                    expected: volunteer.signer(),
                    got: msg.volunteer.signer(),
                });
            }
            Some(_) => {}
        }

        if self.claimed_rank.is_some_and(|rank| msg.level <= rank) {
            tracing::trace!(signer = %msg.signer(), level = msg.level, "spent vote ignored");
            return Ok(false);
        }

        let signer = msg.signer();
        if let Some(current) = self.votes.get(&signer) {
            if current.level == msg.level {
                return Ok(false);
            }
            if msg.rank > current.rank {
                self.votes.insert(signer, msg.stripped());
                return Ok(true);
            }
            return Ok(false);
        }

        self.votes.insert(signer, msg);
        if self.votes.len() > self.majority() {
            if let Some(evicted) = self.evict_lowest() {
                if evicted == signer {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Turn a majority of held votes into a leader-level vote for ourselves.
    ///
    /// Returns `None` while fewer than `majority` votes are held. Otherwise the
    /// result has rank = lowest held level, level = highest held level and the
    /// held votes (without their own justifications) as justification. Every
    /// vote at or below the new rank is pruned.
    pub fn check_vote_count(&mut self) -> Option<LeaderLevelMessage> {
        if self.votes.len() < self.majority() {
            return None;
        }
        let volunteer = self.volunteer.clone()?;
        let rank = self.votes.values().map(|v| v.level).min()?;
        let highest_level = self.votes.values().map(|v| v.level).max()?;
        let justification: Vec<LeaderLevelMessage> =
            self.votes.values().map(LeaderLevelMessage::stripped).collect();

        self.votes.retain(|_, v| v.level > rank);
        self.claimed_rank = Some(rank);

        let mut vote = LeaderLevelMessage::new(self.self_id, rank, highest_level, volunteer);
        vote.justification = justification;
        Some(vote)
    }

    fn evict_lowest(&mut self) -> Option<Identity> {
        let lowest = self
            .votes
            .values()
            .min_by(|a, b| a.eviction_order(b))?
            .signer();
        self.votes.remove(&lowest);
        Some(lowest)
    }

    pub fn majority(&self) -> usize {
        self.auth_set.majority()
    }

    pub fn volunteer(&self) -> Option<&VolunteerMessage> {
        self.volunteer.as_ref()
    }

    pub fn votes(&self) -> &BTreeMap<Identity, LeaderLevelMessage> {
        &self.votes
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }

    pub fn claimed_rank(&self) -> Option<u32> {
        self.claimed_rank
    }

    pub fn owner(&self) -> Identity {
        self.self_id
    }
}
