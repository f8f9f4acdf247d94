use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("identity is not a valid Ed25519 public key")]
    InvalidPublicKey,
}
