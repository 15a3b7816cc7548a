//! Anonymous credential issuance, presentation and revocation.
//!
//! Credentials are Pointcheval Sanders signatures over a holder master
//! secret and the schema attributes. Revocation uses a VB20 accumulator
//! whose tails file lets holders compute their own witnesses.
#![warn(missing_docs)]
#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    unused_qualifications
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

/// Bounded-concurrency bulk issuance
pub mod bulk;
/// Process configuration
pub mod config;
/// Credentials and their values
pub mod credential;
/// Credential definitions
pub mod credential_definition;
/// Credential offers
pub mod credential_offer;
/// Credential requests
pub mod credential_request;
/// Errors
pub mod error;
/// Ledger identifiers
pub mod identifiers;
/// Issuer operations
pub mod issuer;
/// Cryptographic primitives
pub mod knox;
/// The holder's master secret
pub mod master_secret;
/// Proof nonces
pub mod nonce;
/// Proofs
pub mod proof;
/// Proof requests
pub mod proof_request;
/// Prover operations
pub mod prover;
/// Restriction queries
pub mod query;
/// The holder's answers to a proof request
pub mod requested_credentials;
/// Revocation registries
pub mod revocation_registry;
/// Holder revocation state
pub mod revocation_state;
/// Schemas
pub mod schema;
/// Tails files
pub mod tails;
/// Utility functions
pub mod utils;
/// Verifier operations
pub mod verifier;
/// The end-to-end scenario
pub mod workflow;

/// Result type for this crate
pub type CredxResult<T> = Result<T, error::Error>;

/// Common imports
pub mod prelude {
    pub use super::{
        bulk::{issue_many, BulkReport, PoolConfig},
        config::{init_logging, LogConfig},
        credential::{Credential, CredentialValues, ProcessedCredential},
        credential_definition::{
            CredentialDefinition, CredentialDefinitionConfig, CredentialDefinitionPrivate,
            CredentialKeyCorrectnessProof, SignatureType,
        },
        credential_offer::CredentialOffer,
        credential_request::{CredentialRequest, CredentialRequestMetadata},
        error::Error,
        identifiers::{CredentialDefinitionId, DidValue, RevocationRegistryId, SchemaId},
        issuer::{CredentialRevocationConfig, Issuer},
        master_secret::MasterSecret,
        nonce::Nonce,
        proof::Proof,
        proof_request::{
            AttributeInfo, NonRevokedInterval, PredicateInfo, PredicateType, ProofRequest,
        },
        prover::Prover,
        query::Query,
        requested_credentials::RequestedCredentials,
        revocation_registry::{
            IssuanceType, RegistryType, RevocationKeyPrivate, RevocationRegistry,
            RevocationRegistryDefinition, RevocationRegistryDelta,
        },
        revocation_state::{RevocationState, RevocationStates},
        schema::{AttributeNames, Schema},
        tails::TailsReader,
        utils::Validatable,
        verifier::{RevocationRegistries, Verifier},
        workflow::{IssuanceFixture, RevocationOptions, WorkflowConfig, WorkflowOutcome},
        CredxResult,
    };
}
