use crate::error::Error;
use crate::identifiers::{DidValue, SchemaId};
use crate::utils::{attr_common_view, Validatable};
use crate::CredxResult;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// The most attributes a schema may declare
pub const MAX_ATTRIBUTES_COUNT: usize = 125;

/// The declared attribute names of a schema
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeNames(pub BTreeSet<String>);

impl AttributeNames {
    /// The attributes in signing order
    pub fn canonical(&self) -> Vec<String> {
        let mut names = self
            .0
            .iter()
            .map(|a| attr_common_view(a))
            .collect::<Vec<String>>();
        names.sort();
        names
    }
}

impl From<&[&str]> for AttributeNames {
    fn from(attrs: &[&str]) -> Self {
        Self(attrs.iter().map(|a| a.to_string()).collect())
    }
}

impl From<Vec<String>> for AttributeNames {
    fn from(attrs: Vec<String>) -> Self {
        Self(attrs.into_iter().collect())
    }
}

impl Validatable for AttributeNames {
    fn validate(&self) -> CredxResult<()> {
        if self.0.is_empty() {
            return Err(Error::InvalidCredentialSchema(
                "empty list of schema attributes".to_string(),
            ));
        }
        if self.0.len() > MAX_ATTRIBUTES_COUNT {
            return Err(Error::InvalidCredentialSchema(format!(
                "schemas may declare at most {} attributes",
                MAX_ATTRIBUTES_COUNT
            )));
        }
        let mut seen = HashSet::new();
        for attr in &self.0 {
            let view = attr_common_view(attr);
            if view.is_empty() {
                return Err(Error::InvalidCredentialSchema(
                    "empty schema attribute name".to_string(),
                ));
            }
            if !seen.insert(view) {
                return Err(Error::InvalidCredentialSchema(format!(
                    "duplicate schema attribute `{}`",
                    attr
                )));
            }
        }
        Ok(())
    }
}

/// A versioned set of attribute names declared by an issuer.
///
/// A schema starts unregistered. [`Schema::register`] consumes it and
/// returns the registered form carrying the ledger sequence number.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// The schema identifier
    pub id: SchemaId,
    /// The schema name
    pub name: String,
    /// The schema version
    pub version: String,
    /// The attribute names
    pub attr_names: AttributeNames,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    seq_no: Option<u32>,
}

impl Schema {
    pub(crate) fn new(
        issuer_did: &DidValue,
        name: &str,
        version: &str,
        attr_names: AttributeNames,
    ) -> CredxResult<Self> {
        issuer_did.validate()?;
        if name.is_empty() || version.is_empty() {
            return Err(Error::InvalidCredentialSchema(
                "name and version are required".to_string(),
            ));
        }
        let schema = Self {
            id: SchemaId::new(issuer_did, name, version),
            name: name.to_string(),
            version: version.to_string(),
            attr_names,
            seq_no: None,
        };
        schema.validate()?;
        Ok(schema)
    }

    /// Record the sequence number assigned by the ledger
    pub fn register(self, seq_no: u32) -> Self {
        Self {
            seq_no: Some(seq_no),
            ..self
        }
    }

    /// The ledger sequence number once registered
    pub fn seq_no(&self) -> Option<u32> {
        self.seq_no
    }

    /// The issuer that declared this schema
    pub fn issuer_did(&self) -> Option<DidValue> {
        self.id.parts().map(|(did, _, _)| did)
    }
}

impl Validatable for Schema {
    fn validate(&self) -> CredxResult<()> {
        self.attr_names.validate()?;
        match self.id.parts() {
            Some((_, name, version)) if name == self.name && version == self.version => Ok(()),
            _ => Err(Error::InvalidCredentialSchema(format!(
                "schema id `{}` does not match name and version",
                self.id
            ))),
        }
    }
}
