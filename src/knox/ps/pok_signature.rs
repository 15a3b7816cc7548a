use super::{PokSignatureProof, PublicKey, Signature};
use crate::error::Error;
use crate::knox::short_group_sig_core::*;
use crate::CredxResult;
use blsful::inner_types::{G1Projective, G2Affine, G2Projective, Scalar};
use elliptic_curve::{group::Curve, Field};
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};

/// The holder's side of a signature proof of knowledge between
/// commitment and challenge.
///
/// The signature is rerandomized as `sigma_1' = sigma_1 * r` and
/// `sigma_2' = (sigma_2 + sigma_1 * t) * r`, then knowledge of `t`, `m'` and
/// every hidden slot is shown in `J = g2 * t + W * m' + Σ Y_i * m_i`.
pub struct PokSignature {
    secrets: Vec<Scalar>,
    committing: ProofCommittedBuilder<G2Projective, G2Affine>,
    commitment: G2Projective,
    sigma_1: G1Projective,
    sigma_2: G1Projective,
}

impl PokSignature {
    /// Rerandomize `signature` and commit to its hidden slots.
    /// `messages` lists every slot of `public_key` in order.
    pub fn commit(
        signature: &Signature,
        public_key: &PublicKey,
        messages: &[ProofMessage],
        mut rng: impl RngCore + CryptoRng,
    ) -> CredxResult<Self> {
        if public_key.y.len() != messages.len() {
            return Err(Error::InvalidSignatureProofData);
        }

        let r = Scalar::random(&mut rng);
        let t = Scalar::random(&mut rng);
        let sigma_1 = signature.sigma_1 * r;
        let sigma_2 = (signature.sigma_2 + signature.sigma_1 * t) * r;

        let mut committing = ProofCommittedBuilder::new(G2Projective::sum_of_products);
        let mut points = vec![G2Projective::GENERATOR, public_key.w];
        let mut secrets = vec![t, signature.m_tick];
        committing.commit_random(G2Projective::GENERATOR, &mut rng);
        committing.commit_random(public_key.w, &mut rng);

        for (y, message) in public_key.y.iter().zip(messages) {
            let secret = match message {
                ProofMessage::Revealed(_) => continue,
                ProofMessage::Hidden(HiddenMessage::ProofSpecificBlinding(m)) => {
                    committing.commit_random(*y, &mut rng);
                    m
                }
                ProofMessage::Hidden(HiddenMessage::ExternalBlinding(m, blinding)) => {
                    committing.commit(*y, *blinding);
                    m
                }
            };
            points.push(*y);
            secrets.push(*secret);
        }

        Ok(Self {
            commitment: G2Projective::sum_of_products(&points, &secrets),
            secrets,
            committing,
            sigma_1,
            sigma_2,
        })
    }

    /// Append `sigma_1'`, `sigma_2'`, `J` and the random commitment
    pub fn add_proof_contribution(&self, transcript: &mut Transcript) {
        for (label, point) in [(b"sigma_1", self.sigma_1), (b"sigma_2", self.sigma_2)] {
            transcript.append_message(label, point.to_affine().to_compressed().as_ref());
        }
        transcript.append_message(
            b"random commitment",
            self.commitment.to_affine().to_compressed().as_ref(),
        );
        self.committing
            .add_challenge_contribution(b"blind commitment", transcript);
    }

    /// Answer the challenge
    pub fn gen_proof(self, challenge: Scalar) -> CredxResult<PokSignatureProof> {
        Ok(PokSignatureProof {
            proof: self.committing.generate_proof(challenge, &self.secrets)?,
            sigma_1: self.sigma_1,
            sigma_2: self.sigma_2,
            commitment: self.commitment,
        })
    }
}
