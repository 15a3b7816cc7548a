use crate::error::Error;
use crate::identifiers::{CredentialDefinitionId, RevocationRegistryId};
use crate::knox::accumulator::vb20::{Accumulator, Element, PublicKey, SecretKey};
use crate::tails::TailsReader;
use crate::utils::Validatable;
use crate::CredxResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// How credentials enter the accumulator
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum IssuanceType {
    /// Every index is accumulated when the registry is created
    #[default]
    #[serde(rename = "ISSUANCE_BY_DEFAULT")]
    IssuanceByDefault,
    /// An index is accumulated when a credential is issued for it
    #[serde(rename = "ISSUANCE_ON_DEMAND")]
    IssuanceOnDemand,
}

impl IssuanceType {
    /// The wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IssuanceByDefault => "ISSUANCE_BY_DEFAULT",
            Self::IssuanceOnDemand => "ISSUANCE_ON_DEMAND",
        }
    }
}

impl Display for IssuanceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for IssuanceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ISSUANCE_BY_DEFAULT" => Ok(Self::IssuanceByDefault),
            "ISSUANCE_ON_DEMAND" => Ok(Self::IssuanceOnDemand),
            _ => Err(Error::InvalidInput(format!("unknown issuance type `{}`", s))),
        }
    }
}

/// The accumulator scheme backing a registry
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum RegistryType {
    /// VB20 pairing based accumulator
    #[default]
    #[serde(rename = "VB_ACCUM")]
    VbAccum,
}

impl RegistryType {
    /// The identifier fragment for this registry type
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VbAccum => "VB_ACCUM",
        }
    }
}

/// Public keys of a registry
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryPublicKeys {
    /// The accumulator verification key
    pub accum_key: PublicKey,
}

/// The published parameters of a registry
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryDefinitionValue {
    /// Issuance policy
    pub issuance_type: IssuanceType,
    /// Number of credential slots
    pub max_cred_num: u32,
    /// Public keys
    pub public_keys: RevocationRegistryPublicKeys,
    /// Hex SHA-256 of the tails file
    pub tails_hash: String,
    /// Where the tails file can be read
    pub tails_location: String,
}

/// A revocation registry definition
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryDefinition {
    /// The identifier
    pub id: RevocationRegistryId,
    /// The accumulator scheme
    pub revoc_def_type: RegistryType,
    /// The tag
    pub tag: String,
    /// The credential definition whose credentials this registry tracks
    pub cred_def_id: CredentialDefinitionId,
    /// The parameters
    pub value: RevocationRegistryDefinitionValue,
}

impl RevocationRegistryDefinition {
    /// The accumulator element for a credential slot
    pub fn element(&self, index: u32) -> Element {
        Element::for_index(&self.id.0, index)
    }

    /// Check a credential slot lies in `1..=max_cred_num`
    pub fn check_index(&self, index: u32) -> CredxResult<()> {
        if index == 0 || index > self.value.max_cred_num {
            return Err(Error::InvalidRevocationIndex(index));
        }
        Ok(())
    }

    /// Open and check the tails file named by this definition
    pub fn tails_reader(&self) -> CredxResult<TailsReader> {
        TailsReader::open(&self.value.tails_location, &self.value.tails_hash)
    }

    /// The slots accumulated from a set of issued and revoked slots
    pub fn accumulated(
        &self,
        issued: &BTreeSet<u32>,
        revoked: &BTreeSet<u32>,
    ) -> BTreeSet<u32> {
        match self.value.issuance_type {
            IssuanceType::IssuanceByDefault => (1..=self.value.max_cred_num)
                .filter(|i| !revoked.contains(i))
                .collect(),
            IssuanceType::IssuanceOnDemand => issued.difference(revoked).copied().collect(),
        }
    }
}

impl Validatable for RevocationRegistryDefinition {
    fn validate(&self) -> CredxResult<()> {
        if self.value.max_cred_num == 0 {
            return Err(Error::InvalidInput(
                "`max_cred_num` must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// The issuer's accumulator secret
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RevocationKeyPrivate {
    /// The accumulator key
    pub value: SecretKey,
}

/// The current state of a registry
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RevocationRegistry {
    /// The accumulator value
    pub value: Accumulator,
    /// Slots assigned to credentials
    pub issued: BTreeSet<u32>,
    /// Slots revoked
    pub revoked: BTreeSet<u32>,
}

impl RevocationRegistry {
    /// The delta from an empty registry to this state
    pub fn full_delta(&self, def: &RevocationRegistryDefinition) -> RevocationRegistryDelta {
        let issued = match def.value.issuance_type {
            IssuanceType::IssuanceByDefault => (1..=def.value.max_cred_num).collect(),
            IssuanceType::IssuanceOnDemand => self.issued.clone(),
        };
        RevocationRegistryDelta {
            prev_accum: None,
            accum: self.value,
            issued: issued.difference(&self.revoked).copied().collect(),
            revoked: self.revoked.clone(),
        }
    }
}

/// Changes between two registry states.
///
/// A delta without `prev_accum` starts at registry creation.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationRegistryDelta {
    /// The accumulator before the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_accum: Option<Accumulator>,
    /// The accumulator after the change
    pub accum: Accumulator,
    /// Slots added to the accumulator
    pub issued: BTreeSet<u32>,
    /// Slots removed from the accumulator
    pub revoked: BTreeSet<u32>,
}

impl RevocationRegistryDelta {
    /// Combine with a delta that continues from this one
    pub fn merge(&self, next: &RevocationRegistryDelta) -> CredxResult<Self> {
        if next.prev_accum != Some(self.accum) {
            return Err(Error::InvalidInput(
                "revocation registry deltas are not consecutive".to_string(),
            ));
        }
        let issued = self
            .issued
            .difference(&next.revoked)
            .chain(next.issued.iter())
            .copied()
            .collect::<BTreeSet<u32>>();
        let revoked = self
            .revoked
            .difference(&next.issued)
            .chain(next.revoked.iter())
            .copied()
            .collect::<BTreeSet<u32>>();
        Ok(Self {
            prev_accum: self.prev_accum,
            accum: next.accum,
            issued,
            revoked,
        })
    }

    /// Slots accumulated once this delta is applied to `prior`
    pub fn apply(&self, prior: &BTreeSet<u32>) -> BTreeSet<u32> {
        prior
            .union(&self.issued)
            .filter(|i| !self.revoked.contains(i))
            .copied()
            .collect()
    }
}
