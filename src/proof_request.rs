use crate::error::Error;
use crate::nonce::Nonce;
use crate::query::Query;
use crate::utils::Validatable;
use crate::CredxResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

/// A verifier's request for a proof
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProofRequest {
    /// Human readable request name
    pub name: String,
    /// Request version
    pub version: String,
    /// Binds the proof to this request
    pub nonce: Nonce,
    /// Requested attributes by referent
    #[serde(default)]
    pub requested_attributes: HashMap<String, AttributeInfo>,
    /// Requested predicates by referent
    #[serde(default)]
    pub requested_predicates: HashMap<String, PredicateInfo>,
    /// Interval applied to every referent without its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
    /// Request format version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,
}

impl ProofRequest {
    /// Start an empty request with a fresh nonce
    pub fn new<N: Into<String>, V: Into<String>>(name: N, version: V, nonce: Nonce) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            nonce,
            requested_attributes: HashMap::new(),
            requested_predicates: HashMap::new(),
            non_revoked: None,
            ver: None,
        }
    }

    /// The interval that applies to a referent, the local one taking precedence
    pub fn interval_for(&self, local: &Option<NonRevokedInterval>) -> Option<NonRevokedInterval> {
        local.or(self.non_revoked)
    }
}

impl Validatable for ProofRequest {
    fn validate(&self) -> CredxResult<()> {
        self.nonce.validate()?;
        if let Some(ver) = &self.ver {
            if ver != "1.0" && ver != "2.0" {
                return Err(Error::InvalidInput(format!(
                    "unknown proof request version `{}`",
                    ver
                )));
            }
        }
        if self.requested_attributes.is_empty() && self.requested_predicates.is_empty() {
            return Err(Error::InvalidInput(
                "proof request must request an attribute or a predicate".to_string(),
            ));
        }
        for (referent, info) in &self.requested_attributes {
            match (&info.name, &info.names) {
                (Some(_), None) => {}
                (None, Some(names)) if !names.is_empty() => {}
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "requested attribute `{}` needs exactly one of `name` or a non-empty `names`",
                        referent
                    )))
                }
            }
        }
        Ok(())
    }
}

/// A requested attribute or attribute group
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AttributeInfo {
    /// A single attribute name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Several attributes that must come from one credential
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub names: Option<Vec<String>>,
    /// Which credentials may supply the attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Query>,
    /// Non-revocation interval for this referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl AttributeInfo {
    /// Request one attribute
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }

    /// The requested attribute names
    pub fn attribute_names(&self) -> Vec<String> {
        match (&self.name, &self.names) {
            (Some(name), _) => vec![name.clone()],
            (None, Some(names)) => names.clone(),
            (None, None) => Vec::new(),
        }
    }
}

/// A requested predicate over a numeric attribute
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredicateInfo {
    /// The attribute name
    pub name: String,
    /// The comparison
    pub p_type: PredicateType,
    /// The bound compared against
    pub p_value: i32,
    /// Which credentials may supply the attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Query>,
    /// Non-revocation interval for this referent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
}

impl PredicateInfo {
    /// Create an unrestricted predicate
    pub fn new<S: Into<String>>(name: S, p_type: PredicateType, p_value: i32) -> Self {
        Self {
            name: name.into(),
            p_type,
            p_value,
            restrictions: None,
            non_revoked: None,
        }
    }

    /// The inclusive bound proven by the range proof
    pub fn bound(&self) -> CredxResult<PredicateBound> {
        let value = i64::from(self.p_value);
        let bound = match self.p_type {
            PredicateType::GE => PredicateBound::Lower(value),
            PredicateType::GT => PredicateBound::Lower(
                value
                    .checked_add(1)
                    .ok_or(Error::General("predicate bound overflow"))?,
            ),
            PredicateType::LE => PredicateBound::Upper(value),
            PredicateType::LT => PredicateBound::Upper(
                value
                    .checked_sub(1)
                    .ok_or(Error::General("predicate bound overflow"))?,
            ),
        };
        Ok(bound)
    }

    /// Whether `value` satisfies the predicate
    pub fn is_satisfied(&self, value: i64) -> bool {
        let bound = i64::from(self.p_value);
        match self.p_type {
            PredicateType::GE => value >= bound,
            PredicateType::GT => value > bound,
            PredicateType::LE => value <= bound,
            PredicateType::LT => value < bound,
        }
    }
}

/// Predicate comparisons
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PredicateType {
    /// Greater than or equal
    #[serde(rename = ">=")]
    GE,
    /// Greater than
    #[serde(rename = ">")]
    GT,
    /// Less than or equal
    #[serde(rename = "<=")]
    LE,
    /// Less than
    #[serde(rename = "<")]
    LT,
}

impl Display for PredicateType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::GE => ">=",
            Self::GT => ">",
            Self::LE => "<=",
            Self::LT => "<",
        };
        write!(f, "{}", s)
    }
}

/// An inclusive one sided bound
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum PredicateBound {
    /// value >= bound
    Lower(i64),
    /// value <= bound
    Upper(i64),
}

/// A time window in which a credential must not have been revoked
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NonRevokedInterval {
    /// Start, in seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    /// End, in seconds since the epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

impl NonRevokedInterval {
    /// Whether a registry timestamp falls inside the interval
    pub fn contains(&self, timestamp: u64) -> bool {
        self.from.map_or(true, |from| from <= timestamp)
            && self.to.map_or(true, |to| timestamp <= to)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_bounds() {
        let p = PredicateInfo::new("age", PredicateType::GT, 18);
        assert_eq!(p.bound().unwrap(), PredicateBound::Lower(19));
        assert!(p.is_satisfied(19));
        assert!(!p.is_satisfied(18));

        let p = PredicateInfo::new("age", PredicateType::LT, 18);
        assert_eq!(p.bound().unwrap(), PredicateBound::Upper(17));
        assert!(p.is_satisfied(17));

        let p = PredicateInfo::new("age", PredicateType::GE, i32::MAX);
        assert_eq!(p.bound().unwrap(), PredicateBound::Lower(i64::from(i32::MAX)));
    }

    #[test]
    fn predicate_type_names() {
        let p: PredicateType = serde_json::from_str("\">=\"").unwrap();
        assert_eq!(p, PredicateType::GE);
        assert_eq!(serde_json::to_string(&PredicateType::LT).unwrap(), "\"<\"");
    }

    #[test]
    fn local_interval_overrides_global() {
        let mut req = ProofRequest::new("proof", "1.0", Nonce::new());
        let global = NonRevokedInterval {
            from: None,
            to: Some(10),
        };
        let local = NonRevokedInterval {
            from: Some(5),
            to: Some(20),
        };
        req.non_revoked = Some(global);
        assert_eq!(req.interval_for(&None), Some(global));
        assert_eq!(req.interval_for(&Some(local)), Some(local));
        assert!(local.contains(15));
        assert!(!global.contains(15));
    }

    #[test]
    fn attribute_info_needs_name_or_names() {
        let mut req = ProofRequest::new("proof", "1.0", Nonce::new());
        req.requested_attributes
            .insert("reft".to_string(), AttributeInfo::default());
        assert!(req.validate().is_err());
        req.requested_attributes
            .insert("reft".to_string(), AttributeInfo::named("one"));
        assert!(req.validate().is_ok());
    }
}
