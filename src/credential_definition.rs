use crate::error::Error;
use crate::identifiers::{CredentialDefinitionId, SchemaId};
use crate::knox::ps::{KeyCorrectnessProof, PublicKey, SecretKey};
use crate::utils::{attr_common_view, Validatable};
use crate::CredxResult;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// The tag used when none is supplied
pub const DEFAULT_TAG: &str = "default";

/// The credential signature scheme
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum SignatureType {
    /// Pointcheval Sanders signatures over BLS12-381
    #[default]
    PS,
}

impl SignatureType {
    /// The identifier fragment for this scheme
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PS => "PS",
        }
    }
}

impl Display for SignatureType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SignatureType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PS" => Ok(Self::PS),
            _ => Err(Error::InvalidInput(format!("unsupported signature type `{}`", s))),
        }
    }
}

/// Options for creating a credential definition
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CredentialDefinitionConfig {
    /// Reserve a message slot for the revocation element
    #[serde(default)]
    pub support_revocation: bool,
}

/// The public signing parameters of a credential definition
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinitionData {
    /// The signature verification key
    pub public_key: PublicKey,
    /// Attribute names in signing order
    pub attributes: Vec<String>,
    /// Whether the last message is a revocation element
    pub support_revocation: bool,
}

/// An issuer's public signing parameters for a schema
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDefinition {
    /// The identifier
    pub id: CredentialDefinitionId,
    /// The schema this definition signs
    pub schema_id: SchemaId,
    /// The signature scheme
    #[serde(rename = "type")]
    pub signature_type: SignatureType,
    /// The tag distinguishing definitions for one schema
    pub tag: String,
    /// The key material
    pub value: CredentialDefinitionData,
}

impl CredentialDefinition {
    /// The index of the master secret in the message vector
    pub const MASTER_SECRET_INDEX: usize = 0;

    /// The total number of signed messages
    pub fn message_count(&self) -> usize {
        1 + self.value.attributes.len() + usize::from(self.value.support_revocation)
    }

    /// The message index of an attribute
    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        let view = attr_common_view(name);
        self.value
            .attributes
            .iter()
            .position(|a| *a == view)
            .map(|i| i + 1)
    }

    /// The message index of the revocation element
    pub fn revocation_index(&self) -> Option<usize> {
        if self.value.support_revocation {
            Some(1 + self.value.attributes.len())
        } else {
            None
        }
    }
}

impl Validatable for CredentialDefinition {
    fn validate(&self) -> CredxResult<()> {
        if self.value.public_key.message_count() != self.message_count() {
            return Err(Error::InvalidInput(
                "credential definition key does not match its attributes".to_string(),
            ));
        }
        if self.id.issuer_did().is_none() {
            return Err(Error::InvalidInput(format!(
                "malformed credential definition id `{}`",
                self.id
            )));
        }
        Ok(())
    }
}

/// The issuer's signing key for a credential definition
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialDefinitionPrivate {
    /// The signing key
    pub value: SecretKey,
}

/// Proof that the credential definition key was generated correctly
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CredentialKeyCorrectnessProof {
    /// The Schnorr proof over the key
    pub value: KeyCorrectnessProof,
}
