use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error("config error: {0}")]
    Config(String),

    #[error("no participants to explore")]
    NoParticipants,

    #[error("message addressed to participant {target} but only {participants} exist")]
    UnknownTarget { target: usize, participants: usize },

    #[error("delivery did not quiesce within {0} steps")]
    StepLimit(usize),

    #[error("state encoding error: {0}")]
    Encoding(#[from] bincode::Error),

    #[error("consensus error: {0}")]
    Consensus(#[from] fedelect_consensus::ConsensusError),
}
