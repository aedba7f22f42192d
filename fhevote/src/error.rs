use crate::*;

use thiserror::Error;

/// Error types
///
/// Every failure aborts the attempted operation before any state is committed.
#[derive(Debug, Error)]
pub enum Error {
    #[error("fhevote: only owner can call this function")]
    Unauthorized,

    #[error("fhevote: voting is not open")]
    VotingClosed,

    #[error("fhevote: {operation} is not allowed while voting is {phase}")]
    InvalidPhase {
        operation: &'static str,
        phase: VotingPhase,
    },

    #[error("fhevote: input proof failed to verify")]
    InvalidProof,

    #[error("fhevote: you have not voted yet")]
    NotVoted,

    #[error("fhevote: results are not decrypted yet")]
    ResultsNotReady,

    #[error("fhevote: invalid candidate {0}")]
    InvalidCandidate(u32),

    #[error("fhevote: stale decryption callback for request {0}")]
    StaleCallback(RequestId),

    #[error("fhevote: decryption callback carries {found} plaintexts, expected {expected}")]
    InvalidCallback { expected: usize, found: usize },

    #[error("fhevote: wrong number of encrypted values: expected {expected}, found {found}")]
    WrongInputLength { expected: usize, found: usize },

    #[error("fhevote: encrypted value is not of type {0}")]
    WrongInputKind(CipherKind),

    #[error("fhevote: unknown encrypted value {0}")]
    UnknownHandle(EncryptedValue),

    #[error("fhevote: {0} has no decryption rights on this value")]
    DecryptionNotAllowed(Identity),

    #[error("fhevote: mismatched public keys")]
    MismatchedPublicKeys,

    #[error("fhevote: invalid hexidecimal")]
    BadHex,

    #[error("fhevote: invalid length {0}, expected 32 bytes")]
    BadLength(usize),

    #[error("fhevote: {0}")]
    Config(#[from] ConfigError),

    #[error("fhevote: CBOR error: {0}")]
    CBORDeserialization(#[from] serde_cbor::Error),

    #[error("fhevote: JSON error: {0}")]
    JSONDeserialization(#[from] serde_json::Error),
}

impl Error {
    /// Stable reason code, suitable for tooling that branches on the failure
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthorized => "UNAUTHORIZED",
            Error::VotingClosed => "VOTING_CLOSED",
            Error::InvalidPhase { .. } => "INVALID_PHASE",
            Error::InvalidProof => "INVALID_PROOF",
            Error::NotVoted => "NOT_VOTED",
            Error::ResultsNotReady => "RESULTS_NOT_READY",
            Error::InvalidCandidate(_) => "INVALID_CANDIDATE",
            Error::StaleCallback(_) => "STALE_CALLBACK",
            Error::InvalidCallback { .. } => "INVALID_CALLBACK",
            Error::WrongInputLength { .. } | Error::WrongInputKind(_) => "INVALID_BALLOT",
            Error::UnknownHandle(_) => "UNKNOWN_HANDLE",
            Error::DecryptionNotAllowed(_) => "DECRYPTION_NOT_ALLOWED",
            Error::MismatchedPublicKeys => "MISMATCHED_PUBLIC_KEYS",
            Error::BadHex | Error::BadLength(_) => "MALFORMED",
            Error::Config(_) => "INVALID_CONFIG",
            Error::CBORDeserialization(_) | Error::JSONDeserialization(_) => "SERIALIZATION",
        }
    }
}

/// Election parameter errors, raised once at construction
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("fhevote config: candidate count must be at least 1")]
    NoCandidates,

    #[error("fhevote config: max vote choices must be at least 1")]
    NoVoteChoices,

    #[error(
        "fhevote config: max vote choices {max_vote_choices} exceeds candidate count {candidate_count}"
    )]
    TooManyVoteChoices {
        max_vote_choices: u32,
        candidate_count: u32,
    },

    #[error("fhevote config: expected {expected} vote point weights, found {found}")]
    VotePointsMismatch { expected: usize, found: usize },

    #[error("fhevote config: vote points for rank {0} must be positive")]
    ZeroVotePoints(usize),

    #[error("fhevote config: unknown tally variant {0:?}")]
    UnknownVariant(String),

    #[error("fhevote config: {0} environment variable must be set")]
    MissingEnv(&'static str),

    #[error("fhevote config: invalid value {value:?} for {key}")]
    BadEnvValue { key: &'static str, value: String },
}
