use crate::credential_definition::CredentialDefinition;
use crate::error::Error;
use crate::identifiers::{CredentialDefinitionId, RevocationRegistryId, SchemaId};
use crate::knox::accumulator::vb20::{Accumulator, MembershipWitness};
use crate::knox::ps::{BlindSignature, Signature};
use crate::utils::{attr_common_view, encode_credential_attribute, encoded_to_scalar, Validatable};
use crate::CredxResult;
use blsful::inner_types::Scalar;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// The raw and encoded form of one attribute value
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AttributeValues {
    /// The value as supplied
    pub raw: String,
    /// The decimal encoding that is signed
    pub encoded: String,
}

/// Attribute values keyed by attribute name, in insertion order
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CredentialValues(pub IndexMap<String, AttributeValues>);

impl CredentialValues {
    /// Add a value, encoding it with [`encode_credential_attribute`]
    pub fn add_raw<N: Into<String>, R: Into<String>>(&mut self, name: N, raw: R) {
        let raw = raw.into();
        let encoded = encode_credential_attribute(&raw);
        self.0.insert(name.into(), AttributeValues { raw, encoded });
    }

    /// Add a value that was encoded elsewhere
    pub fn add_encoded<N: Into<String>, R: Into<String>, E: Into<String>>(
        &mut self,
        name: N,
        raw: R,
        encoded: E,
    ) {
        self.0.insert(
            name.into(),
            AttributeValues {
                raw: raw.into(),
                encoded: encoded.into(),
            },
        );
    }

    /// Look up a value by attribute name, ignoring case and spaces
    pub fn get(&self, name: &str) -> Option<&AttributeValues> {
        let view = attr_common_view(name);
        self.0
            .iter()
            .find(|(k, _)| attr_common_view(k) == view)
            .map(|(_, v)| v)
    }

    /// The attribute messages at their positions in the signed vector
    pub(crate) fn to_messages(
        &self,
        cred_def: &CredentialDefinition,
    ) -> CredxResult<Vec<(usize, Scalar)>> {
        let supplied = self
            .0
            .keys()
            .map(|k| attr_common_view(k))
            .collect::<BTreeSet<String>>();
        let expected = cred_def
            .value
            .attributes
            .iter()
            .cloned()
            .collect::<BTreeSet<String>>();
        if supplied.len() != self.0.len() || supplied != expected {
            return Err(Error::InvalidClaimData(format!(
                "values {:?} do not match credential definition attributes {:?}",
                supplied, expected
            )));
        }
        self.0
            .iter()
            .map(|(name, value)| {
                let index = cred_def
                    .attribute_index(name)
                    .ok_or_else(|| Error::InvalidClaimData(format!("unknown attribute `{}`", name)))?;
                Ok((index, encoded_to_scalar(&value.encoded)?))
            })
            .collect()
    }
}

impl Validatable for CredentialValues {
    fn validate(&self) -> CredxResult<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidClaimData(
                "credential values are empty".to_string(),
            ));
        }
        for (name, value) in &self.0 {
            encoded_to_scalar(&value.encoded).map_err(|_| {
                Error::InvalidClaimData(format!(
                    "encoded value for `{}` is not a decimal number",
                    name
                ))
            })?;
        }
        Ok(())
    }
}

/// The holder's position in a revocation registry
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CredentialWitness {
    /// The registry slot assigned at issuance
    pub rev_idx: u32,
    /// Membership witness for the slot's element
    pub value: MembershipWitness,
}

/// A credential as returned by the issuer, still blinded by the holder's secret
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credential {
    /// The schema
    pub schema_id: SchemaId,
    /// The credential definition that signed it
    pub cred_def_id: CredentialDefinitionId,
    /// The revocation registry, for revocable credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryId>,
    /// The signed values
    pub values: CredentialValues,
    /// The blind signature
    pub signature: BlindSignature,
    /// The accumulator at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg: Option<Accumulator>,
    /// The membership witness at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<CredentialWitness>,
}

/// A credential whose signature was unblinded and checked by the holder
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProcessedCredential {
    /// The schema
    pub schema_id: SchemaId,
    /// The credential definition that signed it
    pub cred_def_id: CredentialDefinitionId,
    /// The revocation registry, for revocable credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryId>,
    /// The signed values
    pub values: CredentialValues,
    /// The signature over the full message vector
    pub signature: Signature,
    /// The accumulator at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg: Option<Accumulator>,
    /// The membership witness at issuance
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub witness: Option<CredentialWitness>,
}

/// Assemble the full message vector: master secret, attributes, then the revocation element
pub(crate) fn message_vector(
    cred_def: &CredentialDefinition,
    values: &CredentialValues,
    master_secret: Scalar,
    revocation_element: Option<Scalar>,
) -> CredxResult<Vec<Scalar>> {
    let mut messages = vec![Scalar::ZERO; cred_def.message_count()];
    messages[CredentialDefinition::MASTER_SECRET_INDEX] = master_secret;
    for (index, m) in values.to_messages(cred_def)? {
        messages[index] = m;
    }
    match (cred_def.revocation_index(), revocation_element) {
        (Some(index), Some(element)) => messages[index] = element,
        (None, None) => {}
        (Some(_), None) => {
            return Err(Error::InvalidInput(
                "revocable credential is missing its revocation element".to_string(),
            ))
        }
        (None, Some(_)) => {
            return Err(Error::InvalidInput(
                "credential definition does not support revocation".to_string(),
            ))
        }
    }
    Ok(messages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_spaces() {
        let mut values = CredentialValues::default();
        values.add_raw("First Name", "Alice");
        values.add_raw("age", "28");
        assert_eq!(values.get("firstname").unwrap().raw, "Alice");
        assert_eq!(values.get("age").unwrap().encoded, "28");
        assert!(values.get("last").is_none());
        assert!(values.validate().is_ok());

        values.add_encoded("bad", "x", "not a number");
        assert!(values.validate().is_err());
    }
}
