use fedelect_types::SignerError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("failed to encode signing payload: {0}")]
    Encoding(#[from] bincode::Error),

    #[error(transparent)]
    Signer(#[from] SignerError),
}
