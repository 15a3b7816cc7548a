use super::{accumulator::Accumulator, key::PublicKey, witness::MembershipWitness};
use crate::error::Error;
use crate::CredxResult;
use blsful::inner_types::{
    multi_miller_loop, G1Projective, G2Affine, G2Prepared, MillerLoopResult, PrimeCurveAffine, Scalar,
};
use elliptic_curve::{
    group::{Curve, Group},
    Field,
};
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// The prover's committed values for a membership proof.
///
/// The witness `C` is randomized to `C' = C * r` and
/// `C_bar = V * r - C' * y`, which equals `C' * alpha`.
/// The Schnorr proof shows knowledge of `r` and `y` where the blinding
/// for `y` is shared with the signature proof that hides the element.
#[derive(Debug, Clone)]
pub struct MembershipProofCommitting {
    c_prime: G1Projective,
    c_bar: G1Projective,
    t: G1Projective,
    r: Scalar,
    r_blinding: Scalar,
}

impl MembershipProofCommitting {
    /// Create the commitments for a membership proof
    pub fn new(
        witness: MembershipWitness,
        accumulator: Accumulator,
        element: Scalar,
        element_blinding: Scalar,
        mut rng: impl RngCore + CryptoRng,
    ) -> Self {
        let r = Scalar::random(&mut rng);
        let r_blinding = Scalar::random(&mut rng);
        let c_prime = witness.0 * r;
        let c_bar = accumulator.0 * r - c_prime * element;
        let t = accumulator.0 * r_blinding - c_prime * element_blinding;
        Self {
            c_prime,
            c_bar,
            t,
            r,
            r_blinding,
        }
    }

    /// Add the commitments to the fiat-shamir transcript
    pub fn add_proof_contribution(&self, transcript: &mut Transcript) {
        transcript.append_message(b"membership c'", self.c_prime.to_affine().to_compressed().as_ref());
        transcript.append_message(b"membership c_bar", self.c_bar.to_affine().to_compressed().as_ref());
        transcript.append_message(b"membership t", self.t.to_affine().to_compressed().as_ref());
    }

    /// Finish the proof with the challenge
    pub fn gen_proof(self, challenge: Scalar) -> MembershipProof {
        MembershipProof {
            c_prime: self.c_prime,
            c_bar: self.c_bar,
            s_r: self.r_blinding + challenge * self.r,
        }
    }
}

/// A proof that a hidden element is in the accumulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MembershipProof {
    c_prime: G1Projective,
    c_bar: G1Projective,
    s_r: Scalar,
}

impl MembershipProof {
    /// Recompute the commitments and add them to the fiat-shamir transcript.
    ///
    /// `s_y` is the response for the hidden element taken from the signature proof.
    pub fn add_challenge_contribution(
        &self,
        accumulator: Accumulator,
        s_y: Scalar,
        challenge: Scalar,
        transcript: &mut Transcript,
    ) {
        let t = accumulator.0 * self.s_r - self.c_prime * s_y - self.c_bar * challenge;
        transcript.append_message(b"membership c'", self.c_prime.to_affine().to_compressed().as_ref());
        transcript.append_message(b"membership c_bar", self.c_bar.to_affine().to_compressed().as_ref());
        transcript.append_message(b"membership t", t.to_affine().to_compressed().as_ref());
    }

    /// Check `e(C_bar, P~) == e(C', Q~)`
    pub fn verify(&self, pubkey: PublicKey) -> CredxResult<()> {
        if self.c_prime.is_identity().unwrap_u8() == 1 {
            return Err(Error::InvalidPresentationData(
                "membership proof commitment is the identity".to_string(),
            ));
        }
        let ok = multi_miller_loop(&[
            (
                &self.c_bar.to_affine(),
                &G2Prepared::from(G2Affine::generator()),
            ),
            (
                &self.c_prime.to_affine(),
                &G2Prepared::from(-pubkey.0.to_affine()),
            ),
        ])
        .final_exponentiation()
        .is_identity()
        .unwrap_u8()
            == 1;
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidSignatureProofData)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::{Element, SecretKey};
    use super::*;
    use crate::knox::Knox;
    use rand_core::OsRng;

    #[test]
    fn membership_proof() {
        let key = SecretKey::new(OsRng);
        let pk = PublicKey::from(&key);
        let elements = (1..=5)
            .map(|i| Element::for_index("reg", i))
            .collect::<Vec<_>>();
        let acc = Accumulator::with_elements(&key, &elements);
        let witness = MembershipWitness::new(elements[2], acc, &key).unwrap();

        let y = elements[2].0;
        let y_blinding = Scalar::random(OsRng);
        let committing = MembershipProofCommitting::new(witness, acc, y, y_blinding, OsRng);
        let mut transcript = Transcript::new(b"membership");
        committing.add_proof_contribution(&mut transcript);
        let challenge = Knox::transcript_challenge(b"challenge", &mut transcript);
        let proof = committing.gen_proof(challenge);

        assert!(proof.verify(pk).is_ok());
        let mut transcript = Transcript::new(b"membership");
        proof.add_challenge_contribution(acc, y_blinding + challenge * y, challenge, &mut transcript);
        assert_eq!(
            Knox::transcript_challenge(b"challenge", &mut transcript),
            challenge
        );

        let removed = acc.remove(&key, elements[2]).unwrap();
        let mut transcript = Transcript::new(b"membership");
        proof.add_challenge_contribution(removed, y_blinding + challenge * y, challenge, &mut transcript);
        assert_ne!(
            Knox::transcript_challenge(b"challenge", &mut transcript),
            challenge
        );
    }
}
