use crate::credential_definition::CredentialKeyCorrectnessProof;
use crate::identifiers::{CredentialDefinitionId, SchemaId};
use crate::nonce::Nonce;
use crate::utils::Validatable;
use crate::CredxResult;
use serde::{Deserialize, Serialize};

/// An issuer's offer to issue a credential under a credential definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialOffer {
    /// The schema of the offered credential
    pub schema_id: SchemaId,
    /// The credential definition that will sign it
    pub cred_def_id: CredentialDefinitionId,
    /// Proof that the credential definition key is well formed
    pub key_correctness_proof: CredentialKeyCorrectnessProof,
    /// Binds the holder's request to this offer
    pub nonce: Nonce,
}

impl Validatable for CredentialOffer {
    fn validate(&self) -> CredxResult<()> {
        self.nonce.validate()
    }
}
