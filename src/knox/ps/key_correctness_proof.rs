use super::{PublicKey, SecretKey};
use crate::error::Error;
use crate::knox::Knox;
use crate::CredxResult;
use blsful::inner_types::{G1Projective, G2Projective, Scalar};
use elliptic_curve::{group::Curve, Field};
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

/// Proof that a PS public key was generated from a known secret key and
/// that the G1 blinding generators share exponents with the G2 key.
///
/// A holder checks this before blinding anything under the key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyCorrectnessProof {
    /// Fiat-Shamir challenge
    pub challenge: Scalar,
    /// Response for `w`
    pub w: Scalar,
    /// Response for `x`
    pub x: Scalar,
    /// Responses for each `y_i`
    pub y: Vec<Scalar>,
}

impl KeyCorrectnessProof {
    const LABEL: &'static [u8] = b"ps key correctness proof";

    /// Prove knowledge of `sk` for `pk`
    pub fn new(
        sk: &SecretKey,
        pk: &PublicKey,
        mut rng: impl RngCore + CryptoRng,
    ) -> CredxResult<Self> {
        if sk.y.len() != pk.y.len() {
            return Err(Error::General("public key does not match secret key"));
        }
        let r_w = Scalar::random(&mut rng);
        let r_x = Scalar::random(&mut rng);
        let r_y = (0..sk.y.len())
            .map(|_| Scalar::random(&mut rng))
            .collect::<Vec<_>>();

        let t_w = G2Projective::GENERATOR * r_w;
        let t_x = G2Projective::GENERATOR * r_x;
        let t_y = r_y
            .iter()
            .map(|r| (G2Projective::GENERATOR * r, G1Projective::GENERATOR * r))
            .collect::<Vec<_>>();

        let challenge = Self::compute_challenge(pk, t_w, t_x, &t_y);

        Ok(Self {
            challenge,
            w: r_w + challenge * sk.w,
            x: r_x + challenge * sk.x,
            y: r_y
                .iter()
                .zip(sk.y.iter())
                .map(|(r, s)| *r + challenge * s)
                .collect(),
        })
    }

    /// Check the proof against `pk`
    pub fn verify(&self, pk: &PublicKey) -> bool {
        if !pk.is_valid()
            || self.y.len() != pk.y.len()
            || pk.y.len() != pk.y_blinds.len()
        {
            return false;
        }
        let c = self.challenge;
        let t_w = G2Projective::GENERATOR * self.w - pk.w * c;
        let t_x = G2Projective::GENERATOR * self.x - pk.x * c;
        let t_y = self
            .y
            .iter()
            .zip(pk.y.iter().zip(pk.y_blinds.iter()))
            .map(|(z, (y2, y1))| {
                (
                    G2Projective::GENERATOR * z - *y2 * c,
                    G1Projective::GENERATOR * z - *y1 * c,
                )
            })
            .collect::<Vec<_>>();

        let challenge = Self::compute_challenge(pk, t_w, t_x, &t_y);
        challenge.ct_eq(&self.challenge).unwrap_u8() == 1
    }

    fn compute_challenge(
        pk: &PublicKey,
        t_w: G2Projective,
        t_x: G2Projective,
        t_y: &[(G2Projective, G1Projective)],
    ) -> Scalar {
        let mut transcript = Transcript::new(Self::LABEL);
        transcript.append_message(b"w", pk.w.to_affine().to_compressed().as_ref());
        transcript.append_message(b"x", pk.x.to_affine().to_compressed().as_ref());
        for (y2, y1) in pk.y.iter().zip(pk.y_blinds.iter()) {
            transcript.append_message(b"y", y2.to_affine().to_compressed().as_ref());
            transcript.append_message(b"y blind", y1.to_affine().to_compressed().as_ref());
        }
        transcript.append_message(b"t_w", t_w.to_affine().to_compressed().as_ref());
        transcript.append_message(b"t_x", t_x.to_affine().to_compressed().as_ref());
        for (t2, t1) in t_y {
            transcript.append_message(b"t_y", t2.to_affine().to_compressed().as_ref());
            transcript.append_message(b"t_y blind", t1.to_affine().to_compressed().as_ref());
        }
        Knox::transcript_challenge(b"key correctness challenge", &mut transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand_core::OsRng;

    #[test]
    fn key_correctness() {
        let sk = SecretKey::random(4, OsRng).unwrap();
        let pk = sk.public_key();
        let proof = KeyCorrectnessProof::new(&sk, &pk, OsRng).unwrap();
        assert!(proof.verify(&pk));

        let mut tampered = pk.clone();
        tampered.y_blinds[2] = G1Projective::GENERATOR * Scalar::from(5u64);
        assert!(!proof.verify(&tampered));

        let other = SecretKey::random(4, OsRng).unwrap().public_key();
        assert!(!proof.verify(&other));
    }
}
