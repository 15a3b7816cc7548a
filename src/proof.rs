use crate::credential::AttributeValues;
use crate::error::Error;
use crate::identifiers::{CredentialDefinitionId, RevocationRegistryId, SchemaId};
use crate::knox::accumulator::vb20::MembershipProof;
use crate::knox::ps::PokSignatureProof;
use crate::proof_request::PredicateBound;
use crate::utils::zero_center;
use crate::CredxResult;
use blsful::inner_types::{G1Projective, Scalar};
use bulletproofs::{BulletproofGens, PedersenGens, RangeProof};
use elliptic_curve::{group::Curve, hash2curve::ExpandMsgXmd, Field};
use lazy_static::lazy_static;
use merlin::Transcript;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub(crate) const PROOF_TRANSCRIPT_LABEL: &[u8] = b"credx proof";
pub(crate) const PROOF_CHALLENGE_LABEL: &[u8] = b"credx proof challenge";
const RANGE_PROOF_LABEL: &[u8] = b"credx range proof";
const RANGE_PROOF_BITS: usize = 64;
const GENERATOR_DST: &[u8] = b"BLS12381G1_XMD:SHA-256_SSWU_RO_";

lazy_static! {
    static ref MESSAGE_GENERATOR: G1Projective =
        G1Projective::hash::<ExpandMsgXmd<sha2::Sha256>>(b"message generator", GENERATOR_DST);
    static ref BLINDER_GENERATOR: G1Projective =
        G1Projective::hash::<ExpandMsgXmd<sha2::Sha256>>(b"blinder generator", GENERATOR_DST);
}

/// A presentation answering a proof request
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proof {
    /// The cryptographic proof
    pub proof: AggregatedProof,
    /// How each referent was answered
    pub requested_proof: RequestedProof,
    /// The ledger objects behind each sub-proof, by sub-proof index
    pub identifiers: Vec<Identifier>,
}

/// Sub-proofs sharing one Fiat-Shamir challenge
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AggregatedProof {
    /// The challenge over every sub-proof and the request nonce
    pub challenge: Scalar,
    /// One sub-proof per credential and timestamp
    pub sub_proofs: Vec<SubProof>,
}

/// The proof for one credential
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubProof {
    /// Disclosed encoded values keyed by canonical attribute name
    pub revealed_attrs: BTreeMap<String, String>,
    /// Proof of knowledge of the signature
    pub signature_proof: PokSignatureProof,
    /// Predicate proofs sorted by referent
    pub predicates: Vec<PredicateProof>,
    /// Accumulator membership of the revocation element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revocation: Option<MembershipProof>,
}

/// A range proof over a committed hidden attribute
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PredicateProof {
    /// The predicate referent in the proof request
    pub referent: String,
    /// Pedersen commitment to the attribute
    pub commitment: G1Projective,
    /// Schnorr response for the commitment blinder
    pub blinder_proof: Scalar,
    /// The bulletproof over the adjusted commitment
    pub range_proof: RangeProof,
}

impl PredicateProof {
    /// Recompute the commitment contribution.
    ///
    /// `message_proof` is the signature proof response for the attribute.
    pub fn add_challenge_contribution(
        &self,
        bound: PredicateBound,
        message_proof: Scalar,
        challenge: Scalar,
        transcript: &mut Transcript,
    ) {
        let blind_commitment = self.commitment * -challenge
            + *MESSAGE_GENERATOR * message_proof
            + *BLINDER_GENERATOR * self.blinder_proof;
        append_predicate(
            transcript,
            &self.referent,
            self.commitment,
            blind_commitment,
            adjusted_commitment(self.commitment, bound),
        );
    }

    /// Check the range proof
    pub fn verify(&self, bound: PredicateBound, challenge: Scalar) -> bool {
        let mut transcript = range_transcript(challenge);
        self.range_proof
            .verify_single(
                &BulletproofGens::new(RANGE_PROOF_BITS, 1),
                &pedersen_gens(),
                &mut transcript,
                &adjusted_commitment(self.commitment, bound),
                RANGE_PROOF_BITS,
            )
            .is_ok()
    }
}

pub(crate) struct PredicateProofBuilder {
    referent: String,
    commitment: G1Projective,
    adjusted: u64,
    // Schnorr nonce for the commitment blinder
    r: Scalar,
    // commitment blinder, also the bulletproof blinding
    r_c: Scalar,
}

impl PredicateProofBuilder {
    /// Commit to `value` under a fresh blinder. `b` is the nonce the
    /// signature proof uses for the same attribute.
    pub fn commit(
        referent: &str,
        bound: PredicateBound,
        value: i64,
        b: Scalar,
        mut rng: impl RngCore + CryptoRng,
        transcript: &mut Transcript,
    ) -> CredxResult<Self> {
        let adjusted = match bound {
            PredicateBound::Lower(lower) => zero_center(value).checked_sub(zero_center(lower)),
            PredicateBound::Upper(upper) => {
                zero_center(value).checked_add(u64::MAX - zero_center(upper))
            }
        }
        .ok_or_else(|| Error::PredicateNotSatisfied(referent.to_string()))?;

        let r = Scalar::random(&mut rng);
        let r_c = Scalar::random(&mut rng);
        let message = Scalar::from(zero_center(value));
        let commitment = *MESSAGE_GENERATOR * message + *BLINDER_GENERATOR * r_c;
        let blind_commitment = *MESSAGE_GENERATOR * b + *BLINDER_GENERATOR * r;
        append_predicate(
            transcript,
            referent,
            commitment,
            blind_commitment,
            adjusted_commitment(commitment, bound),
        );
        Ok(Self {
            referent: referent.to_string(),
            commitment,
            adjusted,
            r,
            r_c,
        })
    }

    pub fn gen_proof(self, challenge: Scalar) -> CredxResult<PredicateProof> {
        let mut transcript = range_transcript(challenge);
        let (range_proof, _) = RangeProof::prove_single(
            &BulletproofGens::new(RANGE_PROOF_BITS, 1),
            &pedersen_gens(),
            &mut transcript,
            self.adjusted,
            &self.r_c,
            RANGE_PROOF_BITS,
        )
        .map_err(|_| Error::InvalidBulletproofRange)?;
        Ok(PredicateProof {
            referent: self.referent,
            commitment: self.commitment,
            blinder_proof: self.r + challenge * self.r_c,
            range_proof,
        })
    }
}

fn pedersen_gens() -> PedersenGens {
    PedersenGens {
        B: *MESSAGE_GENERATOR,
        B_blinding: *BLINDER_GENERATOR,
    }
}

fn range_transcript(challenge: Scalar) -> Transcript {
    let mut transcript = Transcript::new(RANGE_PROOF_LABEL);
    transcript.append_message(b"challenge", challenge.to_be_bytes().as_ref());
    transcript
}

// shifts the commitment so the proven value is non-negative iff the bound holds
fn adjusted_commitment(commitment: G1Projective, bound: PredicateBound) -> G1Projective {
    match bound {
        PredicateBound::Lower(lower) => {
            commitment - *MESSAGE_GENERATOR * Scalar::from(zero_center(lower))
        }
        PredicateBound::Upper(upper) => {
            commitment + *MESSAGE_GENERATOR * Scalar::from(u64::MAX - zero_center(upper))
        }
    }
}

fn append_predicate(
    transcript: &mut Transcript,
    referent: &str,
    commitment: G1Projective,
    blind_commitment: G1Projective,
    adjusted: G1Projective,
) {
    transcript.append_message(b"predicate", referent.as_bytes());
    transcript.append_message(
        b"commitment",
        commitment.to_affine().to_compressed().as_ref(),
    );
    transcript.append_message(
        b"blind commitment",
        blind_commitment.to_affine().to_compressed().as_ref(),
    );
    transcript.append_u64(b"range proof bits", RANGE_PROOF_BITS as u64);
    transcript.append_message(
        b"adjusted commitment",
        adjusted.to_affine().to_compressed().as_ref(),
    );
}

/// Where each referent of the proof request was answered
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RequestedProof {
    /// Disclosed single attributes
    #[serde(default)]
    pub revealed_attrs: HashMap<String, RevealedAttributeInfo>,
    /// Disclosed attribute groups
    #[serde(default)]
    pub revealed_attr_groups: HashMap<String, RevealedAttributeGroupInfo>,
    /// Self attested values
    #[serde(default)]
    pub self_attested_attrs: HashMap<String, String>,
    /// Attributes proven without disclosure
    #[serde(default)]
    pub unrevealed_attrs: HashMap<String, SubProofReferent>,
    /// Predicates
    #[serde(default)]
    pub predicates: HashMap<String, SubProofReferent>,
}

/// A disclosed attribute value
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RevealedAttributeInfo {
    /// The sub-proof that discloses it
    pub sub_proof_index: u32,
    /// The raw value
    pub raw: String,
    /// The encoded value
    pub encoded: String,
}

/// A disclosed group of attribute values
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RevealedAttributeGroupInfo {
    /// The sub-proof that discloses them
    pub sub_proof_index: u32,
    /// Values by requested name
    pub values: HashMap<String, AttributeValues>,
}

/// Points a referent at a sub-proof
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SubProofReferent {
    /// The sub-proof index
    pub sub_proof_index: u32,
}

/// The ledger objects a sub-proof was made against
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Identifier {
    /// The schema
    pub schema_id: SchemaId,
    /// The credential definition
    pub cred_def_id: CredentialDefinitionId,
    /// The revocation registry, when non-revocation is proven
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev_reg_id: Option<RevocationRegistryId>,
    /// The registry timestamp, when non-revocation is proven
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
}
