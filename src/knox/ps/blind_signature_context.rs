use super::{BlindSignature, PublicKey, SecretKey};
use crate::error::Error;
use crate::knox::short_group_sig_core::ProofCommittedBuilder;
use crate::knox::Knox;
use crate::CredxResult;
use blsful::inner_types::{G1Affine, G1Projective, Scalar};
use elliptic_curve::{group::Curve, Field};
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use subtle::ConstantTimeEq;

/// The holder's commitment to the slots the issuer must not see,
/// with a Schnorr proof that the holder knows what is inside.
///
/// The proof is bound to the issuer's offer nonce so a context cannot
/// be replayed against another offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlindSignatureContext {
    /// `Σ y_blind_i * m_i + g1 * blinding`
    pub commitment: G1Projective,
    /// Fiat-Shamir challenge
    pub challenge: Scalar,
    /// Responses for the hidden slots in index order, then the blinding
    pub proofs: Vec<Scalar>,
}

impl BlindSignatureContext {
    /// Commit to `hidden` slot values under `public_key`.
    /// Returns the context and the blinding needed to unblind the signature.
    pub fn new(
        hidden: &[(usize, Scalar)],
        public_key: &PublicKey,
        nonce: Scalar,
        mut rng: impl RngCore + CryptoRng,
    ) -> CredxResult<(Self, Scalar)> {
        let mut hidden = hidden.to_vec();
        hidden.sort_by_key(|(i, _)| *i);
        if hidden.iter().any(|(i, _)| *i >= public_key.y_blinds.len()) {
            return Err(Error::InvalidCredentialRequest(
                "hidden slot outside the key",
            ));
        }

        let blinding = Scalar::random(&mut rng);
        let mut points = hidden
            .iter()
            .map(|(i, _)| public_key.y_blinds[*i])
            .collect::<Vec<G1Projective>>();
        points.push(G1Projective::GENERATOR);
        let mut secrets = hidden.iter().map(|(_, m)| *m).collect::<Vec<Scalar>>();
        secrets.push(blinding);

        let mut committing =
            ProofCommittedBuilder::<G1Projective, G1Affine>::new(G1Projective::sum_of_products);
        for point in &points {
            committing.commit_random(*point, &mut rng);
        }
        let commitment = G1Projective::sum_of_products(&points, &secrets);
        let challenge = Self::challenge(committing.commitment(), commitment, nonce);
        let proofs = committing.generate_proof(challenge, &secrets)?;
        Ok((
            Self {
                commitment,
                challenge,
                proofs,
            },
            blinding,
        ))
    }

    /// Check the holder's proof, then sign the `known` slots on top of
    /// the commitment
    pub fn sign(
        &self,
        public_key: &PublicKey,
        secret_key: &SecretKey,
        known: &[(usize, Scalar)],
        nonce: Scalar,
        rng: impl RngCore + CryptoRng,
    ) -> CredxResult<BlindSignature> {
        let indices = known.iter().map(|(i, _)| *i).collect::<BTreeSet<usize>>();
        if !self.verify(&indices, public_key, nonce)? {
            return Err(Error::InvalidCredentialRequest(
                "blinded secrets proof is invalid",
            ));
        }
        BlindSignature::sign_commitment(self.commitment, secret_key, known, rng)
    }

    /// Recompute the random commitment from the responses. Every slot not
    /// in `known` is taken to be hidden.
    fn verify(
        &self,
        known: &BTreeSet<usize>,
        public_key: &PublicKey,
        nonce: Scalar,
    ) -> CredxResult<bool> {
        if known.iter().any(|i| *i >= public_key.y_blinds.len()) {
            return Err(Error::InvalidSignatureProofData);
        }
        let mut points = public_key
            .y_blinds
            .iter()
            .enumerate()
            .filter(|(i, _)| !known.contains(i))
            .map(|(_, p)| *p)
            .collect::<Vec<G1Projective>>();
        points.push(G1Projective::GENERATOR);
        if points.len() != self.proofs.len() {
            return Ok(false);
        }
        points.push(self.commitment);
        let mut scalars = self.proofs.clone();
        scalars.push(-self.challenge);

        let random_commitment = G1Projective::sum_of_products(&points, &scalars);
        let challenge = Self::challenge(random_commitment, self.commitment, nonce);
        Ok(bool::from(self.challenge.ct_eq(&challenge)))
    }

    fn challenge(random_commitment: G1Projective, commitment: G1Projective, nonce: Scalar) -> Scalar {
        let mut transcript = Transcript::new(b"credx blind signature context");
        transcript.append_message(
            b"random commitment",
            random_commitment.to_affine().to_compressed().as_ref(),
        );
        transcript.append_message(
            b"blind commitment",
            commitment.to_affine().to_compressed().as_ref(),
        );
        transcript.append_message(b"nonce", nonce.to_be_bytes().as_ref());
        Knox::transcript_challenge(b"blind signature context challenge", &mut transcript)
    }
}
