use thiserror::Error;

/// Errors raised while parsing or validating core types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The string is not a known verification status.
    #[error("invalid verification status: {0}")]
    InvalidStatus(String),

    /// The string is not a supported digest algorithm.
    #[error("unsupported digest algorithm: {0}")]
    InvalidDigest(String),
}
