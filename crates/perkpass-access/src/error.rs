//! Verification and discount error types.

use perkpass_core::error::PerkpassError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AccessError {
    /// Structural decode failure — the payload is not a credential.
    /// Client-side retryable (re-scan).
    #[error("malformed credential")]
    MalformedCredential,

    /// Expired or bad signature. The two causes are collapsed into one
    /// externally-visible code; the specific cause is only logged.
    #[error("invalid or expired credential")]
    InvalidCredential,

    #[error("member not found")]
    SubjectNotFound,

    #[error("member is inactive")]
    SubjectInactive,

    #[error("no active partnership agreement")]
    NoActiveAgreement,

    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// The atomic transaction + usage-history write did not complete.
    /// The caller must not assume partial success.
    #[error("failed to record discount: {0}")]
    Recording(String),

    #[error("cryptography error: {0}")]
    Crypto(String),

    /// Unexpected persistence failure outside the taxonomy above.
    #[error(transparent)]
    Repository(#[from] PerkpassError),
}

impl From<AccessError> for PerkpassError {
    fn from(err: AccessError) -> Self {
        match err {
            AccessError::MalformedCredential
            | AccessError::InvalidCredential
            | AccessError::SubjectNotFound
            | AccessError::SubjectInactive
            | AccessError::NoActiveAgreement => PerkpassError::VerificationFailed {
                reason: err.to_string(),
            },
            AccessError::InvalidAmount(msg) => PerkpassError::Validation { message: msg },
            AccessError::Recording(msg) => PerkpassError::Internal(msg),
            AccessError::Crypto(msg) => PerkpassError::Crypto(msg),
            AccessError::Repository(inner) => inner,
        }
    }
}
