//! Signed message vocabulary exchanged during a leader election.
//!
//! Every kind embeds a [`SignedMessage`]. [`Message`] is the closed set of
//! seven kinds a participant can receive; handlers match on it exhaustively.
//! [`LeaderLevelMessage`] is the ranked vote a volunteer's vote counter works
//! with and never travels on its own.

pub mod aggregate;
pub mod error;
pub mod signed;
pub mod volunteer;
pub mod vote;

pub use aggregate::{IAckMessage, InsistMessage, MajorityDecisionMessage, PublishMessage};
pub use error::MessageError;
pub use signed::SignedMessage;
pub use volunteer::{EomMessage, VolunteerMessage};
pub use vote::{LeaderLevelMessage, VoteMessage};

use fedelect_types::{Identity, MessageSigner, MessageVerifier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of a [`Message`], for logging and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MessageKind {
    Eom,
    Volunteer,
    Vote,
    MajorityDecision,
    Insist,
    IAck,
    Publish,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    Eom(EomMessage),
    Volunteer(VolunteerMessage),
    Vote(VoteMessage),
    MajorityDecision(MajorityDecisionMessage),
    Insist(InsistMessage),
    IAck(IAckMessage),
    Publish(PublishMessage),
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::Eom(_) => MessageKind::Eom,
            Message::Volunteer(_) => MessageKind::Volunteer,
            Message::Vote(_) => MessageKind::Vote,
            Message::MajorityDecision(_) => MessageKind::MajorityDecision,
            Message::Insist(_) => MessageKind::Insist,
            Message::IAck(_) => MessageKind::IAck,
            Message::Publish(_) => MessageKind::Publish,
        }
    }

    pub fn signed(&self) -> &SignedMessage {
        match self {
            Message::Eom(m) => &m.signed,
            Message::Volunteer(m) => &m.signed,
            Message::Vote(m) => &m.signed,
            Message::MajorityDecision(m) => &m.signed,
            Message::Insist(m) => &m.signed,
            Message::IAck(m) => &m.signed,
            Message::Publish(m) => &m.signed,
        }
    }

    fn signed_mut(&mut self) -> &mut SignedMessage {
        match self {
            Message::Eom(m) => &mut m.signed,
            Message::Volunteer(m) => &mut m.signed,
            Message::Vote(m) => &mut m.signed,
            Message::MajorityDecision(m) => &mut m.signed,
            Message::Insist(m) => &mut m.signed,
            Message::IAck(m) => &mut m.signed,
            Message::Publish(m) => &mut m.signed,
        }
    }

    pub fn signer(&self) -> Identity {
        self.signed().signer
    }

    /// Canonical bytes covered by this message's own signature: the bincode
    /// encoding of the message with the outer signature cleared. Signatures of
    /// embedded messages stay in the payload.
    pub fn signing_payload(&self) -> Result<Vec<u8>, MessageError> {
        let mut unsigned = self.clone();
        unsigned.signed_mut().signature = None;
        Ok(bincode::serialize(&unsigned)?)
    }

    /// Sign as `signer`, replacing the signer identity and any prior signature.
    pub fn sign(&mut self, signer: &dyn MessageSigner) -> Result<(), MessageError> {
        self.signed_mut().signer = signer.identity();
        let payload = self.signing_payload()?;
        self.signed_mut().signature = Some(signer.sign(&payload)?);
        Ok(())
    }

    /// False when unsigned, unencodable, or the signature does not match.
    pub fn verify(&self, verifier: &dyn MessageVerifier) -> bool {
        let Some(signature) = &self.signed().signature else {
            return false;
        };
        match self.signing_payload() {
            Ok(payload) => verifier.verify(&self.signer(), &payload, signature),
            Err(_) => false,
        }
    }
}

/// A concrete message kind that can be signed on its own.
///
/// Produces the same payload and signature as signing the kind wrapped in a
/// [`Message`].
pub trait Envelope: Clone + Into<Message> {
    fn signed(&self) -> &SignedMessage;

    fn signed_mut(&mut self) -> &mut SignedMessage;

    fn sign(&mut self, signer: &dyn MessageSigner) -> Result<(), MessageError> {
        self.signed_mut().signer = signer.identity();
        self.signed_mut().signature = None;
        let unsigned: Message = self.clone().into();
        let payload = bincode::serialize(&unsigned)?;
        self.signed_mut().signature = Some(signer.sign(&payload)?);
        Ok(())
    }
}

macro_rules! impl_envelope {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Message {
                fn from(m: $ty) -> Self {
                    Message::$variant(m)
                }
            }

            impl Envelope for $ty {
                fn signed(&self) -> &SignedMessage {
                    &self.signed
                }

                fn signed_mut(&mut self) -> &mut SignedMessage {
                    &mut self.signed
                }
            }
        )*
    };
}

impl_envelope! {
    Eom => EomMessage,
    Volunteer => VolunteerMessage,
    Vote => VoteMessage,
    MajorityDecision => MajorityDecisionMessage,
    Insist => InsistMessage,
    IAck => IAckMessage,
    Publish => PublishMessage,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Eom(m) => write!(f, "eom({} @ {})", m.signer(), m.location),
            Message::Volunteer(m) => write!(f, "volunteer({} @ {})", m.signer(), m.location()),
            Message::Vote(m) => write!(f, "vote({} -> {})", m.signer(), m.volunteer.signer()),
            Message::MajorityDecision(m) => {
                write!(f, "majority-decision({}, {} votes)", m.signer(), m.majority_votes.len())
            }
            Message::Insist(m) => write!(
                f,
                "insist({}, {} decisions)",
                m.signer(),
                m.majority_decisions.len()
            ),
            Message::IAck(m) => write!(
                f,
                "iack({} for {}, {} signers)",
                m.signer(),
                m.insist.signer(),
                m.signers.len()
            ),
            Message::Publish(m) => write!(f, "publish({}, {} signers)", m.signer(), m.signers.len()),
        }
    }
}
