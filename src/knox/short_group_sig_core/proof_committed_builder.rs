use crate::error::Error;
use crate::CredxResult;
use blsful::inner_types::Scalar;
use elliptic_curve::{
    group::{Curve, GroupEncoding},
    Field,
};
use merlin::Transcript;
use rand_core::RngCore;

/// Collects `(base, blinding)` pairs for a Schnorr proof over a
/// multi-base commitment, then answers the challenge with
/// `blinding + challenge * secret` per base.
pub struct ProofCommittedBuilder<B, C>
where
    B: Copy + Curve<AffineRepr = C>,
    C: GroupEncoding,
{
    terms: Vec<(B, Scalar)>,
    sum_of_products: fn(&[B], &[Scalar]) -> B,
}

impl<B, C> ProofCommittedBuilder<B, C>
where
    B: Copy + Curve<AffineRepr = C>,
    C: GroupEncoding,
{
    /// Start with no bases; `sum_of_products` is the group's multi-exponentiation
    pub fn new(sum_of_products: fn(&[B], &[Scalar]) -> B) -> Self {
        Self {
            terms: Vec::new(),
            sum_of_products,
        }
    }

    /// Add `point` with a fresh blinding
    pub fn commit_random(&mut self, point: B, rng: impl RngCore) {
        self.terms.push((point, Scalar::random(rng)));
    }

    /// Add `point` with a blinding shared with another proof
    pub fn commit(&mut self, point: B, blinding: Scalar) {
        self.terms.push((point, blinding));
    }

    /// `Σ base_i * blinding_i`
    pub fn commitment(&self) -> B {
        let (points, blindings): (Vec<B>, Vec<Scalar>) = self.terms.iter().copied().unzip();
        (self.sum_of_products)(&points, &blindings)
    }

    /// Append the random commitment under `label`
    pub fn add_challenge_contribution(&self, label: &'static [u8], transcript: &mut Transcript) {
        transcript.append_message(label, self.commitment().to_affine().to_bytes().as_ref());
    }

    /// One response per base, `secrets` in the order the bases were added
    pub fn generate_proof(&self, challenge: Scalar, secrets: &[Scalar]) -> CredxResult<Vec<Scalar>> {
        if secrets.len() != self.terms.len() {
            return Err(Error::General("secret count does not match commitments"));
        }
        Ok(self
            .terms
            .iter()
            .zip(secrets)
            .map(|((_, blinding), secret)| *blinding + *secret * challenge)
            .collect())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use blsful::inner_types::*;

    #[test]
    fn responses_open_the_commitment() {
        let mut pb =
            ProofCommittedBuilder::<G1Projective, G1Affine>::new(G1Projective::sum_of_products);
        let challenge = Scalar::from(3u64);
        let secret = Scalar::from(1337u64);
        pb.commit(G1Projective::GENERATOR, Scalar::from(2u64));

        let proof = pb.generate_proof(challenge, &[secret]).unwrap();
        assert_eq!(proof[0], Scalar::from(2u64 + 3 * 1337));
        // g * response - (g * secret) * challenge gives back the commitment
        assert_eq!(
            G1Projective::GENERATOR * proof[0] - G1Projective::GENERATOR * secret * challenge,
            pb.commitment()
        );
        assert!(pb.generate_proof(challenge, &[]).is_err());
    }
}
