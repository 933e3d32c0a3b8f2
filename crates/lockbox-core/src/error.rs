use thiserror::Error;

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Error taxonomy for the whole library.
///
/// Wrong-key and tampered-ciphertext failures are deliberately collapsed
/// into a single variant so callers (and attackers observing callers)
/// cannot tell them apart.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("environment is broken: {0}")]
    EnvironmentBroken(String),

    #[error("bad format: {0}")]
    BadFormat(String),

    #[error("wrong key or modified ciphertext: {0}")]
    WrongKeyOrModifiedCiphertext(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CryptoError {
    /// True for failures that indicate either a wrong secret or tampering.
    pub fn is_integrity_failure(&self) -> bool {
        matches!(self, CryptoError::WrongKeyOrModifiedCiphertext(_))
    }
}
