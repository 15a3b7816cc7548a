use crate::error::Error;
use crate::utils::Validatable;
use crate::CredxResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The holder's choice of credentials for each referent of a proof request
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestedCredentials {
    /// Values the holder asserts without a credential
    #[serde(default)]
    pub self_attested_attributes: HashMap<String, String>,
    /// Credentials answering requested attributes
    #[serde(default)]
    pub requested_attributes: HashMap<String, RequestedAttribute>,
    /// Credentials answering requested predicates
    #[serde(default)]
    pub requested_predicates: HashMap<String, ProvingCredentialKey>,
}

impl RequestedCredentials {
    /// Answer an attribute referent with a credential
    pub fn add_requested_attribute<R: Into<String>, C: Into<String>>(
        &mut self,
        referent: R,
        cred_id: C,
        timestamp: Option<u64>,
        revealed: bool,
    ) {
        self.requested_attributes.insert(
            referent.into(),
            RequestedAttribute {
                cred_id: cred_id.into(),
                timestamp,
                revealed,
            },
        );
    }

    /// Answer a predicate referent with a credential
    pub fn add_requested_predicate<R: Into<String>, C: Into<String>>(
        &mut self,
        referent: R,
        cred_id: C,
        timestamp: Option<u64>,
    ) {
        self.requested_predicates.insert(
            referent.into(),
            ProvingCredentialKey {
                cred_id: cred_id.into(),
                timestamp,
            },
        );
    }

    /// Answer an attribute referent with a self attested value
    pub fn add_self_attested<R: Into<String>, V: Into<String>>(&mut self, referent: R, value: V) {
        self.self_attested_attributes
            .insert(referent.into(), value.into());
    }
}

impl Validatable for RequestedCredentials {
    fn validate(&self) -> CredxResult<()> {
        if self.self_attested_attributes.is_empty()
            && self.requested_attributes.is_empty()
            && self.requested_predicates.is_empty()
        {
            return Err(Error::InvalidInput(
                "requested credentials are empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A credential answering an attribute referent
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RequestedAttribute {
    /// The holder's identifier for the credential
    pub cred_id: String,
    /// The registry timestamp proven against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    /// Whether the value is disclosed
    pub revealed: bool,
}

/// A credential and registry timestamp used in a proof
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ProvingCredentialKey {
    /// The holder's identifier for the credential
    pub cred_id: String,
    /// The registry timestamp proven against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}

impl From<&RequestedAttribute> for ProvingCredentialKey {
    fn from(a: &RequestedAttribute) -> Self {
        Self {
            cred_id: a.cred_id.clone(),
            timestamp: a.timestamp,
        }
    }
}
