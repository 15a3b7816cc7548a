use super::{key::SecretKey, SALT};
use crate::error::Error;
use crate::knox::Knox;
use crate::CredxResult;
use blsful::inner_types::{G1Projective, Scalar};
use elliptic_curve::Field;
use serde::{Deserialize, Serialize};

/// The scalar a registry slot contributes to the accumulator
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Element(pub Scalar);

impl Element {
    /// The element bound to slot `index` of `registry_id`.
    /// Slots of different registries never share an element.
    pub fn for_index(registry_id: &str, index: u32) -> Self {
        let label = format!("{}:{}", registry_id, index);
        Self(Knox::hash_to_scalar(SALT, label.as_bytes()))
    }
}

/// The published accumulator value `V = g * ∏ (y + alpha)`
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Accumulator(pub G1Projective);

impl Default for Accumulator {
    fn default() -> Self {
        Self(G1Projective::GENERATOR)
    }
}

impl Accumulator {
    /// An accumulator holding exactly `elements`
    pub fn with_elements(key: &SecretKey, elements: &[Element]) -> Self {
        Self(G1Projective::GENERATOR * key.exponent_for(elements))
    }

    /// `V' = V * (y + alpha)`
    pub fn add(&self, key: &SecretKey, element: Element) -> Self {
        Self(self.0 * key.exponent_for(&[element]))
    }

    /// `V' = V / (y + alpha)`, fails only when `y = -alpha`
    pub fn remove(&self, key: &SecretKey, element: Element) -> CredxResult<Self> {
        let inverse = Option::<Scalar>::from(key.exponent_for(&[element]).invert())
            .ok_or(Error::InvalidRevocationRegistryRevokeOperation)?;
        Ok(Self(self.0 * inverse))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn add_then_remove_restores_value() {
        let key = SecretKey::new(OsRng);
        let elems = (1..=10)
            .map(|i| Element::for_index("registry", i))
            .collect::<Vec<Element>>();
        let acc = Accumulator::with_elements(&key, elems.as_slice());
        assert_ne!(acc, Accumulator::default());

        let extra = Element::for_index("registry", 11);
        let added = acc.add(&key, extra);
        assert_eq!(added.remove(&key, extra).unwrap(), acc);
        assert_eq!(
            Accumulator::with_elements(&key, &[elems[0], extra]),
            Accumulator::with_elements(&key, &elems[..1]).add(&key, extra)
        );
    }

    #[test]
    fn elements_are_bound_to_registry() {
        assert_ne!(Element::for_index("a", 1), Element::for_index("b", 1));
        assert_ne!(Element::for_index("a", 1), Element::for_index("a", 2));
    }
}
