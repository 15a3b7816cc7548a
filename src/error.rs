use std::fmt::{self, Display, Formatter};

/// Errors created by this library
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// A general error with a static message
    General(&'static str),
    /// Input failed boundary validation
    InvalidInput(String),
    /// Bad credential schema
    InvalidCredentialSchema(String),
    /// The credential definition key correctness proof did not verify
    InvalidKeyCorrectnessProof,
    /// The blinded master secret proof did not verify
    InvalidCredentialRequest(&'static str),
    /// Invalid signing operation
    InvalidSigningOperation,
    /// Invalid signature proof data
    InvalidSignatureProofData,
    /// Invalid credential values
    InvalidClaimData(String),
    /// An operation on the revocation registry was not allowed
    InvalidRevocationRegistryRevokeOperation,
    /// The revocation index is out of range or already assigned
    InvalidRevocationIndex(u32),
    /// The credential has been revoked
    CredentialRevoked,
    /// The tails file is missing, malformed or does not match its hash
    InvalidTails(String),
    /// A predicate cannot be proven for the credential value
    PredicateNotSatisfied(String),
    /// The proof does not match the proof request
    InvalidPresentationData(String),
    /// A range proof could not be created
    InvalidBulletproofRange,
    /// Serialization failure
    SerdeError(String),
    /// File system failure
    IoError(String),
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::General(s) => write!(f, "{}", s),
            Self::InvalidInput(s) => write!(f, "invalid input: {}", s),
            Self::InvalidCredentialSchema(s) => write!(f, "invalid credential schema: {}", s),
            Self::InvalidKeyCorrectnessProof => {
                write!(f, "credential key correctness proof is invalid")
            }
            Self::InvalidCredentialRequest(s) => write!(f, "invalid credential request: {}", s),
            Self::InvalidSigningOperation => write!(f, "invalid signing operation"),
            Self::InvalidSignatureProofData => write!(f, "invalid signature proof data"),
            Self::InvalidClaimData(s) => write!(f, "invalid credential values: {}", s),
            Self::InvalidRevocationRegistryRevokeOperation => {
                write!(f, "invalid revocation registry operation")
            }
            Self::InvalidRevocationIndex(i) => write!(f, "invalid revocation index {}", i),
            Self::CredentialRevoked => write!(f, "credential is revoked"),
            Self::InvalidTails(s) => write!(f, "invalid tails file: {}", s),
            Self::PredicateNotSatisfied(s) => write!(f, "predicate is not satisfied: {}", s),
            Self::InvalidPresentationData(s) => write!(f, "invalid presentation: {}", s),
            Self::InvalidBulletproofRange => write!(f, "invalid range proof"),
            Self::SerdeError(s) => write!(f, "serialization error: {}", s),
            Self::IoError(s) => write!(f, "io error: {}", s),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::SerdeError(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}
