use fedelect_types::Identity;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("participant {0} is not in the authority set")]
    UnknownParticipant(Identity),

    #[error("vote for volunteer {got} sent to the control for volunteer {expected}")]
    WrongVolunteer { expected: Identity, got: Identity },

    #[error("signer identity {signer} does not match participant {participant}")]
    SignerMismatch {
        participant: Identity,
        signer: Identity,
    },

    #[error("participant {participant} failed to sign a reply: {reason}")]
    Signing {
        participant: Identity,
        reason: String,
    },
}
