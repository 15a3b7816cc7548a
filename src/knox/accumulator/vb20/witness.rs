use super::{
    accumulator::{Accumulator, Element},
    coefficients_from_roots,
    key::{PublicKey, SecretKey},
};
use crate::error::Error;
use crate::CredxResult;
use blsful::inner_types::*;
use elliptic_curve::group::Curve;
use serde::{Deserialize, Serialize};

/// A membership witness that can be used for membership proof generation
/// as described in section 4 in
/// <https://eprint.iacr.org/2020/777>
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MembershipWitness(pub G1Projective);

impl MembershipWitness {
    /// The issuer's witness for `element`, which is the accumulator
    /// with `element` taken out
    pub fn new(
        element: Element,
        accumulator: Accumulator,
        secret_key: &SecretKey,
    ) -> CredxResult<Self> {
        Ok(Self(accumulator.remove(secret_key, element)?.0))
    }

    /// Compute the witness without the secret key.
    ///
    /// `powers` are `g * alpha^k` as published in the tails file and
    /// `others` are every accumulated element except `element`.
    pub fn from_powers(others: &[Element], powers: &[G1Projective]) -> CredxResult<Self> {
        let roots = others.iter().map(|e| e.0).collect::<Vec<Scalar>>();
        let coefficients = coefficients_from_roots(&roots);
        if coefficients.len() > powers.len() {
            return Err(Error::InvalidTails(format!(
                "{} accumulated elements exceed {} tails entries",
                coefficients.len(),
                powers.len()
            )));
        }
        Ok(Self(G1Projective::sum_of_products(
            &powers[..coefficients.len()],
            &coefficients,
        )))
    }

    /// Check `e(C, g2 * y + Q) == e(V, g2)`
    pub fn verify(&self, y: Element, pubkey: PublicKey, accumulator: Accumulator) -> bool {
        let shifted = G2Projective::GENERATOR * y.0 + pubkey.0;
        multi_miller_loop(&[
            (&self.0.to_affine(), &G2Prepared::from(shifted.to_affine())),
            (&accumulator.0.to_affine(), &G2Prepared::from(-G2Affine::generator())),
        ])
        .final_exponentiation()
        .is_identity()
        .unwrap_u8()
            == 1
    }
}
