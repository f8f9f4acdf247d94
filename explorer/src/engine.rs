//! The engine interface the explorer drives.

use std::fmt;

use serde::Serialize;

use fedelect_consensus::Round;
use fedelect_messages::Message;
use fedelect_types::Identity;

use crate::ExplorerError;

/// What a participant did with one delivered message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Delivery<M> {
    /// Messages to broadcast to every other participant.
    pub emitted: Vec<M>,
    pub changed: bool,
}

/// One participant's election state.
///
/// `Clone` must produce a fully independent copy: the explorer snapshots a
/// participant before every delivery and restores it afterwards.
pub trait ElectionEngine: Clone {
    type Message: Clone + fmt::Display + Serialize;
    type Outcome: Clone + Ord + fmt::Debug;

    fn execute(&mut self, msg: &Self::Message) -> Result<Delivery<Self::Message>, ExplorerError>;

    /// Canonical encoding of this participant's state. Participants with
    /// equal fingerprints must react identically to every message. `None`
    /// opts the whole group out of mirror detection.
    fn fingerprint(&self) -> Result<Option<Vec<u8>>, ExplorerError> {
        Ok(None)
    }

    /// What this participant committed to, if anything.
    fn outcome(&self) -> Option<Self::Outcome>;

    fn committed(&self) -> bool {
        self.outcome().is_some()
    }
}

impl ElectionEngine for Round {
    type Message = Message;
    /// The elected audit server.
    type Outcome = Identity;

    fn execute(&mut self, msg: &Message) -> Result<Delivery<Message>, ExplorerError> {
        let step = self.step(msg)?;
        Ok(Delivery {
            emitted: step.emitted,
            changed: step.changed,
        })
    }

    fn fingerprint(&self) -> Result<Option<Vec<u8>>, ExplorerError> {
        Ok(Some(bincode::serialize(&self.view())?))
    }

    fn outcome(&self) -> Option<Identity> {
        self.published_volunteer().map(|v| v.signer())
    }

    fn committed(&self) -> bool {
        Round::committed(self)
    }
}

/// A pending message and the participant it is addressed to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DirectedMessage<M> {
    pub target: usize,
    pub msg: M,
}

impl<M> DirectedMessage<M> {
    pub fn new(target: usize, msg: M) -> Self {
        Self { target, msg }
    }
}

impl<M: fmt::Display> fmt::Display for DirectedMessage<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> #{}", self.msg, self.target)
    }
}
