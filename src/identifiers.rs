use crate::error::Error;
use crate::utils::Validatable;
use crate::CredxResult;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

const DELIMITER: char = ':';
const SCHEMA_MARKER: &str = "2";
const CRED_DEF_MARKER: &str = "3";
const REV_REG_MARKER: &str = "4";
const BASE58_ALPHABET: &str = "123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

/// An unqualified issuer or holder DID
#[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DidValue(pub String);

impl DidValue {
    /// Wrap a DID string
    pub fn new(did: &str) -> Self {
        Self(did.to_string())
    }
}

impl Validatable for DidValue {
    fn validate(&self) -> CredxResult<()> {
        let len = self.0.chars().count();
        if !(21..=22).contains(&len) || !self.0.chars().all(|c| BASE58_ALPHABET.contains(c)) {
            return Err(Error::InvalidInput(format!(
                "`{}` is not a valid DID",
                self.0
            )));
        }
        Ok(())
    }
}

impl Display for DidValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

macro_rules! string_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

string_id!(SchemaId, "Ledger identifier of a schema");
string_id!(
    CredentialDefinitionId,
    "Ledger identifier of a credential definition"
);
string_id!(
    RevocationRegistryId,
    "Ledger identifier of a revocation registry"
);

impl SchemaId {
    /// `{did}:2:{name}:{version}`
    pub fn new(did: &DidValue, name: &str, version: &str) -> Self {
        Self(format!(
            "{}{d}{}{d}{}{d}{}",
            did.0,
            SCHEMA_MARKER,
            name,
            version,
            d = DELIMITER
        ))
    }

    /// Split into the issuer DID, name and version
    pub fn parts(&self) -> Option<(DidValue, String, String)> {
        let parts = self.0.split(DELIMITER).collect::<Vec<_>>();
        match parts.as_slice() {
            [did, SCHEMA_MARKER, name, version] => {
                Some((DidValue::new(did), name.to_string(), version.to_string()))
            }
            _ => None,
        }
    }
}

impl CredentialDefinitionId {
    /// `{did}:3:{signature_type}:{schema_ref}:{tag}`
    pub fn new(did: &DidValue, schema_ref: &str, signature_type: &str, tag: &str) -> Self {
        Self(format!(
            "{}{d}{}{d}{}{d}{}{d}{}",
            did.0,
            CRED_DEF_MARKER,
            signature_type,
            schema_ref,
            tag,
            d = DELIMITER
        ))
    }

    /// The issuer DID prefix
    pub fn issuer_did(&self) -> Option<DidValue> {
        let mut parts = self.0.split(DELIMITER);
        let did = parts.next()?;
        match parts.next() {
            Some(CRED_DEF_MARKER) => Some(DidValue::new(did)),
            _ => None,
        }
    }
}

impl RevocationRegistryId {
    /// `{did}:4:{cred_def_id}:{registry_type}:{tag}`
    pub fn new(
        did: &DidValue,
        cred_def_id: &CredentialDefinitionId,
        registry_type: &str,
        tag: &str,
    ) -> Self {
        Self(format!(
            "{}{d}{}{d}{}{d}{}{d}{}",
            did.0,
            REV_REG_MARKER,
            cred_def_id.0,
            registry_type,
            tag,
            d = DELIMITER
        ))
    }
}
