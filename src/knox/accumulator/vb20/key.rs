use super::accumulator::Element;
use blsful::inner_types::{G1Projective, G2Projective, Scalar};
use elliptic_curve::Field;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// The registry trapdoor `alpha`, see page 6 of
/// <https://eprint.iacr.org/2020/777.pdf>
#[derive(Clone, Debug, Zeroize, Serialize, Deserialize)]
#[zeroize(drop)]
pub struct SecretKey(pub Scalar);

impl SecretKey {
    /// Sample a fresh trapdoor
    pub fn new(rng: impl RngCore + CryptoRng) -> Self {
        Self(Scalar::random(rng))
    }

    /// The exponent `∏ (y + alpha)` that moves the generator onto the
    /// accumulator holding every element of `elements`
    pub fn exponent_for(&self, elements: &[Element]) -> Scalar {
        elements
            .iter()
            .fold(Scalar::ONE, |acc, e| acc * (e.0 + self.0))
    }

    /// The tails content for a registry of `degree` slots,
    /// `g * alpha^k` for k in 0..=degree
    pub fn powers(&self, degree: usize) -> Vec<G1Projective> {
        std::iter::successors(Some(G1Projective::GENERATOR), |p| Some(*p * self.0))
            .take(degree + 1)
            .collect()
    }
}

/// The registry verification key `g2 * alpha`
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PublicKey(pub G2Projective);

impl From<&SecretKey> for PublicKey {
    fn from(sk: &SecretKey) -> Self {
        Self(G2Projective::GENERATOR * sk.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn powers_start_at_generator() {
        let key = SecretKey::new(OsRng);
        let powers = key.powers(3);
        assert_eq!(powers.len(), 4);
        assert_eq!(powers[0], G1Projective::GENERATOR);
        assert_eq!(powers[2], G1Projective::GENERATOR * (key.0 * key.0));
    }
}
