use crate::identifiers::{CredentialDefinitionId, DidValue};
use crate::knox::ps::BlindSignatureContext;
use crate::nonce::Nonce;
use crate::utils::Validatable;
use crate::CredxResult;
use blsful::inner_types::Scalar;
use serde::{Deserialize, Serialize};

/// A holder's request for a credential, carrying the blinded master secret
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialRequest {
    /// The holder DID, when the holder chooses to disclose one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prover_did: Option<DidValue>,
    /// The credential definition being requested
    pub cred_def_id: CredentialDefinitionId,
    /// Commitment to the master secret with its proof of knowledge
    pub blinded_ms: BlindSignatureContext,
    /// Fresh nonce chosen by the holder
    pub nonce: Nonce,
}

impl Validatable for CredentialRequest {
    fn validate(&self) -> CredxResult<()> {
        if let Some(did) = &self.prover_did {
            did.validate()?;
        }
        self.nonce.validate()
    }
}

/// Holder side state kept between requesting and processing a credential
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialRequestMetadata {
    /// Removes the blinding from the issued signature
    pub master_secret_blinding_data: Scalar,
    /// The nonce sent in the request
    pub nonce: Nonce,
    /// The holder's name for the master secret used
    pub master_secret_name: String,
}
