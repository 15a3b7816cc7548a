use super::PublicKey;
use crate::error::Error;
use crate::CredxResult;
use blsful::inner_types::{
    multi_miller_loop, G1Projective, G2Affine, G2Prepared, MillerLoopResult, PrimeCurveAffine, G2Projective, Scalar,
};
use elliptic_curve::group::{Curve, Group, GroupEncoding};
use merlin::Transcript;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A rerandomized signature plus the Schnorr responses showing the
/// holder knows every slot it did not reveal.
///
/// `proof` holds the responses for `t`, `m'` and then each hidden slot
/// in index order.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PokSignatureProof {
    pub(crate) sigma_1: G1Projective,
    pub(crate) sigma_2: G1Projective,
    pub(crate) commitment: G2Projective,
    pub(crate) proof: Vec<Scalar>,
}

impl PokSignatureProof {
    /// Rebuild the holder's random commitment from the responses and
    /// append it with the signature values, in the holder's order
    pub fn add_challenge_contribution(
        &self,
        public_key: &PublicKey,
        rvl_msgs: &[(usize, Scalar)],
        challenge: Scalar,
        transcript: &mut Transcript,
    ) -> CredxResult<()> {
        for (label, point) in [(b"sigma_1", self.sigma_1), (b"sigma_2", self.sigma_2)] {
            transcript.append_message(label, point.to_affine().to_compressed().as_ref());
        }
        transcript.append_message(
            b"random commitment",
            self.commitment.to_affine().to_compressed().as_ref(),
        );

        let mut points = vec![G2Projective::GENERATOR, public_key.w];
        points.extend(
            Self::hidden_slots(public_key, rvl_msgs).map(|i| public_key.y[i]),
        );
        if points.len() != self.proof.len() {
            return Err(Error::InvalidSignatureProofData);
        }
        points.push(self.commitment);
        let scalars = self
            .proof
            .iter()
            .copied()
            .chain(std::iter::once(-challenge))
            .collect::<Vec<Scalar>>();
        let random_commitment = G2Projective::sum_of_products(&points, &scalars);
        transcript.append_message(
            b"blind commitment",
            random_commitment.to_affine().to_bytes().as_ref(),
        );
        Ok(())
    }

    /// The pairing check `e(sigma_1', X + J + Σ Y_i * m_i) == e(sigma_2', g2)`
    /// over the revealed slots. The hidden slots are covered by the challenge.
    pub fn verify(&self, rvl_msgs: &[(usize, Scalar)], public_key: &PublicKey) -> bool {
        if bool::from(self.sigma_1.is_identity() | self.sigma_2.is_identity())
            || !public_key.is_valid()
            || rvl_msgs.iter().any(|(i, _)| *i >= public_key.y.len())
        {
            return false;
        }

        let j = rvl_msgs
            .iter()
            .fold(public_key.x + self.commitment, |acc, (i, m)| {
                acc + public_key.y[*i] * m
            });
        multi_miller_loop(&[
            (&self.sigma_1.to_affine(), &G2Prepared::from(j.to_affine())),
            (&self.sigma_2.to_affine(), &G2Prepared::from(-G2Affine::generator())),
        ])
        .final_exponentiation()
        .is_identity()
        .into()
    }

    /// The response for every hidden slot keyed by slot index
    pub fn get_hidden_message_proofs(
        &self,
        public_key: &PublicKey,
        rvl_msgs: &[(usize, Scalar)],
    ) -> CredxResult<BTreeMap<usize, Scalar>> {
        let responses = self.proof.get(2..).unwrap_or_default();
        let hidden = Self::hidden_slots(public_key, rvl_msgs).collect::<Vec<usize>>();
        if hidden.len() > responses.len() {
            return Err(Error::InvalidSignatureProofData);
        }
        Ok(hidden.into_iter().zip(responses.iter().copied()).collect())
    }

    fn hidden_slots(
        public_key: &PublicKey,
        rvl_msgs: &[(usize, Scalar)],
    ) -> impl Iterator<Item = usize> {
        let revealed = rvl_msgs.iter().map(|(i, _)| *i).collect::<BTreeSet<usize>>();
        (0..public_key.y.len()).filter(move |i| !revealed.contains(i))
    }
}
