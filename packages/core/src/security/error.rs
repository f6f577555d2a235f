use thiserror::Error;

/// Failures of the low-level cryptographic primitives.
///
/// The messages are deliberately vague: a caller relaying them must not learn
/// which internal constraint was violated.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid input to cryptographic primitive")]
    InvalidInput,
    #[error("malformed message padding")]
    InvalidPadding,
}

pub type CryptoResult<T> = Result<T, CryptoError>;
