use sdm_core::security::CryptoError;
use thiserror::Error;

/// Failures surfaced by the SDM protocol operations.
///
/// Messages are fixed strings chosen for log triage; they never carry
/// decrypted material.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An argument violates its length or range contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// A protocol message part has an impossible length.
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),
    /// An underlying block operation failed.
    #[error("cryptographic operation failed")]
    Crypto(#[from] CryptoError),
    /// The message decrypted into something structurally impossible.
    #[error("decryption failure: {0}")]
    DecryptionFailure(&'static str),
    /// The authentication tag did not match, or a plain SUN input was
    /// malformed.
    #[error("validation failure: {0}")]
    ValidationFailure(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
