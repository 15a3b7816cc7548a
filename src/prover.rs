use crate::credential::{message_vector, Credential, ProcessedCredential};
use crate::credential_definition::CredentialDefinition;
use crate::credential_offer::CredentialOffer;
use crate::credential_request::{CredentialRequest, CredentialRequestMetadata};
use crate::error::Error;
use crate::identifiers::{CredentialDefinitionId, DidValue, SchemaId};
use crate::knox::accumulator::vb20::{Element, MembershipProofCommitting};
use crate::knox::ps::{BlindSignatureContext, PokSignature};
use crate::knox::short_group_sig_core::{HiddenMessage, ProofMessage};
use crate::knox::Knox;
use crate::master_secret::MasterSecret;
use crate::nonce::Nonce;
use crate::proof::{
    AggregatedProof, Identifier, PredicateProofBuilder, Proof, RequestedProof,
    RevealedAttributeGroupInfo, RevealedAttributeInfo, SubProof, SubProofReferent,
    PROOF_CHALLENGE_LABEL, PROOF_TRANSCRIPT_LABEL,
};
use crate::proof_request::{PredicateInfo, ProofRequest};
use crate::requested_credentials::{ProvingCredentialKey, RequestedCredentials};
use crate::revocation_registry::{RevocationRegistryDefinition, RevocationRegistryDelta};
use crate::revocation_state::{RevocationState, RevocationStates};
use crate::schema::Schema;
use crate::tails::TailsReader;
use crate::utils::{attr_common_view, encoded_to_number, log_artifact, Validatable};
use crate::CredxResult;
use blsful::inner_types::Scalar;
use elliptic_curve::Field;
use log::trace;
use merlin::Transcript;
use rand_core::OsRng;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// The holder side of the credential protocol
pub struct Prover;

/// What one sub-proof must show about its credential
#[derive(Default)]
struct SubProofPlan {
    revealed: BTreeSet<String>,
    predicates: BTreeMap<String, PredicateInfo>,
}

impl Prover {
    /// Create a new link secret
    pub fn create_master_secret() -> CredxResult<MasterSecret> {
        Ok(MasterSecret::new())
    }

    /// Answer an offer with a blinded commitment to the master secret
    pub fn create_credential_request(
        prover_did: Option<&DidValue>,
        cred_def: &CredentialDefinition,
        master_secret: &MasterSecret,
        master_secret_id: &str,
        offer: &CredentialOffer,
    ) -> CredxResult<(CredentialRequest, CredentialRequestMetadata)> {
        trace!(
            "create_credential_request >>> cred_def: {}, master_secret_id: {}",
            cred_def.id,
            master_secret_id
        );
        if let Some(did) = prover_did {
            did.validate()?;
        }
        offer.validate()?;
        cred_def.validate()?;
        if offer.cred_def_id != cred_def.id {
            return Err(Error::InvalidInput(format!(
                "offer is for `{}`, not `{}`",
                offer.cred_def_id, cred_def.id
            )));
        }
        if !offer
            .key_correctness_proof
            .value
            .verify(&cred_def.value.public_key)
        {
            return Err(Error::InvalidKeyCorrectnessProof);
        }

        let (blinded_ms, blinding) = BlindSignatureContext::new(
            &[(CredentialDefinition::MASTER_SECRET_INDEX, master_secret.value())],
            &cred_def.value.public_key,
            offer.nonce.to_scalar(),
            OsRng,
        )?;
        let nonce = Nonce::new();
        let request = CredentialRequest {
            prover_did: prover_did.cloned(),
            cred_def_id: cred_def.id.clone(),
            blinded_ms,
            nonce: nonce.clone(),
        };
        let metadata = CredentialRequestMetadata {
            master_secret_blinding_data: blinding,
            nonce,
            master_secret_name: master_secret_id.to_string(),
        };
        log_artifact("credential request", &request);
        Ok((request, metadata))
    }

    /// Unblind an issued credential and check it against the credential definition
    pub fn process_credential(
        credential: &Credential,
        metadata: &CredentialRequestMetadata,
        master_secret: &MasterSecret,
        cred_def: &CredentialDefinition,
        rev_reg_def: Option<&RevocationRegistryDefinition>,
    ) -> CredxResult<ProcessedCredential> {
        trace!(
            "process_credential >>> cred_def: {}, rev_reg_def: {:?}",
            cred_def.id,
            rev_reg_def.map(|d| &d.id)
        );
        if credential.cred_def_id != cred_def.id {
            return Err(Error::InvalidInput(format!(
                "credential was issued by `{}`, not `{}`",
                credential.cred_def_id, cred_def.id
            )));
        }

        let revocation_element = match (
            cred_def.revocation_index(),
            rev_reg_def,
            credential.witness,
            credential.rev_reg,
        ) {
            (None, _, None, None) => None,
            (Some(_), Some(reg_def), Some(witness), Some(accumulator)) => {
                if credential.rev_reg_id.as_ref() != Some(&reg_def.id) {
                    return Err(Error::InvalidInput(format!(
                        "credential is not in revocation registry `{}`",
                        reg_def.id
                    )));
                }
                let element = reg_def.element(witness.rev_idx);
                if !witness.value.verify(
                    element,
                    reg_def.value.public_keys.accum_key,
                    accumulator,
                ) {
                    return Err(Error::InvalidRevocationIndex(witness.rev_idx));
                }
                Some(element.0)
            }
            _ => {
                return Err(Error::InvalidInput(
                    "credential revocation data does not match its definition".to_string(),
                ))
            }
        };

        let messages = message_vector(
            cred_def,
            &credential.values,
            master_secret.value(),
            revocation_element,
        )?;
        let signature = credential
            .signature
            .to_unblinded(metadata.master_secret_blinding_data);
        if !signature.verify(&cred_def.value.public_key, &messages) {
            return Err(Error::InvalidSignatureProofData);
        }
        Ok(ProcessedCredential {
            schema_id: credential.schema_id.clone(),
            cred_def_id: credential.cred_def_id.clone(),
            rev_reg_id: credential.rev_reg_id.clone(),
            values: credential.values.clone(),
            signature,
            rev_reg: credential.rev_reg,
            witness: credential.witness,
        })
    }

    /// Compute the witness for `rev_idx` at a registry state
    pub fn create_or_update_revocation_state(
        tails_reader: &TailsReader,
        rev_reg_def: &RevocationRegistryDefinition,
        delta: &RevocationRegistryDelta,
        rev_idx: u32,
        timestamp: u64,
        prior: Option<&RevocationState>,
    ) -> CredxResult<RevocationState> {
        let state =
            RevocationState::create(tails_reader, rev_reg_def, delta, rev_idx, timestamp, prior)?;
        log_artifact("revocation state", &state);
        Ok(state)
    }

    /// Prove the requested attributes and predicates from the holder's credentials
    pub fn create_proof(
        proof_req: &ProofRequest,
        credentials: &HashMap<String, ProcessedCredential>,
        requested_credentials: &RequestedCredentials,
        master_secret: &MasterSecret,
        schemas: &HashMap<SchemaId, &Schema>,
        cred_defs: &HashMap<CredentialDefinitionId, &CredentialDefinition>,
        rev_states: &RevocationStates,
    ) -> CredxResult<Proof> {
        trace!(
            "create_proof >>> proof_req: {}, requested_credentials: {:?}",
            proof_req.name,
            requested_credentials
        );
        proof_req.validate()?;
        requested_credentials.validate()?;

        let (plans, requested_proof) =
            Self::plan_sub_proofs(proof_req, credentials, requested_credentials)?;

        let mut transcript = Transcript::new(PROOF_TRANSCRIPT_LABEL);
        transcript.append_message(b"nonce", proof_req.nonce.as_str().as_bytes());
        let ms_blinding = Scalar::random(OsRng);

        let mut committed = Vec::with_capacity(plans.len());
        let mut identifiers = Vec::with_capacity(plans.len());
        for (key, plan) in &plans {
            let credential = credentials
                .get(&key.cred_id)
                .ok_or_else(|| Error::InvalidInput(format!("unknown credential `{}`", key.cred_id)))?;
            if !schemas.contains_key(&credential.schema_id) {
                return Err(Error::InvalidInput(format!(
                    "schema `{}` not supplied",
                    credential.schema_id
                )));
            }
            let cred_def = cred_defs.get(&credential.cred_def_id).ok_or_else(|| {
                Error::InvalidInput(format!(
                    "credential definition `{}` not supplied",
                    credential.cred_def_id
                ))
            })?;
            let (sub_proof, identifier) = SubProofCommitting::commit(
                key,
                plan,
                credential,
                cred_def,
                master_secret,
                ms_blinding,
                rev_states,
                &mut transcript,
            )?;
            committed.push(sub_proof);
            identifiers.push(identifier);
        }

        let challenge = Knox::transcript_challenge(PROOF_CHALLENGE_LABEL, &mut transcript);
        let sub_proofs = committed
            .into_iter()
            .map(|c| c.gen_proof(challenge))
            .collect::<CredxResult<Vec<SubProof>>>()?;

        let proof = Proof {
            proof: AggregatedProof {
                challenge,
                sub_proofs,
            },
            requested_proof,
            identifiers,
        };
        log_artifact("proof", &proof);
        Ok(proof)
    }

    fn plan_sub_proofs(
        proof_req: &ProofRequest,
        credentials: &HashMap<String, ProcessedCredential>,
        requested_credentials: &RequestedCredentials,
    ) -> CredxResult<(BTreeMap<ProvingCredentialKey, SubProofPlan>, RequestedProof)> {
        let mut plans = BTreeMap::<ProvingCredentialKey, SubProofPlan>::new();
        for requested in requested_credentials.requested_attributes.values() {
            plans.entry(requested.into()).or_default();
        }
        for key in requested_credentials.requested_predicates.values() {
            plans.entry(key.clone()).or_default();
        }
        let index_of = plans
            .keys()
            .enumerate()
            .map(|(i, k)| (k.clone(), i as u32))
            .collect::<HashMap<ProvingCredentialKey, u32>>();

        let mut requested_proof = RequestedProof::default();
        for (referent, info) in &proof_req.requested_attributes {
            if let Some(value) = requested_credentials.self_attested_attributes.get(referent) {
                requested_proof
                    .self_attested_attrs
                    .insert(referent.clone(), value.clone());
                continue;
            }
            let requested = requested_credentials
                .requested_attributes
                .get(referent)
                .ok_or_else(|| {
                    Error::InvalidInput(format!("requested attribute `{}` is not answered", referent))
                })?;
            let key = ProvingCredentialKey::from(requested);
            let sub_proof_index = index_of[&key];
            let credential = credentials.get(&key.cred_id).ok_or_else(|| {
                Error::InvalidInput(format!("unknown credential `{}`", key.cred_id))
            })?;
            let names = info.attribute_names();
            let mut values = HashMap::new();
            for name in &names {
                let value = credential.values.get(name).ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "credential `{}` has no attribute `{}`",
                        key.cred_id, name
                    ))
                })?;
                values.insert(name.clone(), value.clone());
            }

            if !requested.revealed {
                requested_proof
                    .unrevealed_attrs
                    .insert(referent.clone(), SubProofReferent { sub_proof_index });
                continue;
            }
            if let Some(plan) = plans.get_mut(&key) {
                plan.revealed
                    .extend(names.iter().map(|n| attr_common_view(n)));
            }
            match &info.name {
                Some(name) => {
                    let value = &values[name];
                    requested_proof.revealed_attrs.insert(
                        referent.clone(),
                        RevealedAttributeInfo {
                            sub_proof_index,
                            raw: value.raw.clone(),
                            encoded: value.encoded.clone(),
                        },
                    );
                }
                None => {
                    requested_proof.revealed_attr_groups.insert(
                        referent.clone(),
                        RevealedAttributeGroupInfo {
                            sub_proof_index,
                            values,
                        },
                    );
                }
            }
        }

        for (referent, info) in &proof_req.requested_predicates {
            let key = requested_credentials
                .requested_predicates
                .get(referent)
                .ok_or_else(|| {
                    Error::InvalidInput(format!("requested predicate `{}` is not answered", referent))
                })?;
            requested_proof.predicates.insert(
                referent.clone(),
                SubProofReferent {
                    sub_proof_index: index_of[key],
                },
            );
            if let Some(plan) = plans.get_mut(key) {
                plan.predicates.insert(referent.clone(), info.clone());
            }
        }
        Ok((plans, requested_proof))
    }
}

struct SubProofCommitting {
    revealed_attrs: BTreeMap<String, String>,
    signature: PokSignature,
    predicates: Vec<PredicateProofBuilder>,
    non_revocation: Option<MembershipProofCommitting>,
}

impl SubProofCommitting {
    #[allow(clippy::too_many_arguments)]
    fn commit(
        key: &ProvingCredentialKey,
        plan: &SubProofPlan,
        credential: &ProcessedCredential,
        cred_def: &CredentialDefinition,
        master_secret: &MasterSecret,
        ms_blinding: Scalar,
        rev_states: &RevocationStates,
        transcript: &mut Transcript,
    ) -> CredxResult<(Self, Identifier)> {
        let revocation_element = match (&credential.rev_reg_id, credential.witness) {
            (Some(rev_reg_id), Some(witness)) => {
                Some(Element::for_index(&rev_reg_id.0, witness.rev_idx).0)
            }
            _ => None,
        };
        let messages = message_vector(
            cred_def,
            &credential.values,
            master_secret.value(),
            revocation_element,
        )?;

        let mut revealed_attrs = BTreeMap::new();
        let mut revealed_indices = BTreeSet::new();
        for name in &plan.revealed {
            let index = cred_def.attribute_index(name).ok_or_else(|| {
                Error::InvalidInput(format!("`{}` is not in `{}`", name, cred_def.id))
            })?;
            let value = credential.values.get(name).ok_or_else(|| {
                Error::InvalidInput(format!("credential has no attribute `{}`", name))
            })?;
            revealed_attrs.insert(name.clone(), value.encoded.clone());
            revealed_indices.insert(index);
        }

        let mut predicate_blindings = BTreeMap::new();
        for info in plan.predicates.values() {
            let index = cred_def.attribute_index(&info.name).ok_or_else(|| {
                Error::InvalidInput(format!("`{}` is not in `{}`", info.name, cred_def.id))
            })?;
            if revealed_indices.contains(&index) {
                return Err(Error::InvalidInput(format!(
                    "`{}` cannot be both revealed and used in a predicate",
                    info.name
                )));
            }
            predicate_blindings
                .entry(index)
                .or_insert_with(|| Scalar::random(OsRng));
        }

        let mut non_revoked = None;
        let mut identifier = Identifier {
            schema_id: credential.schema_id.clone(),
            cred_def_id: credential.cred_def_id.clone(),
            rev_reg_id: None,
            timestamp: None,
        };
        if let Some(timestamp) = key.timestamp {
            let (rev_reg_id, witness, element, message_index) = match (
                &credential.rev_reg_id,
                credential.witness,
                revocation_element,
                cred_def.revocation_index(),
            ) {
                (Some(id), Some(w), Some(e), Some(i)) => (id, w, e, i),
                _ => {
                    return Err(Error::InvalidInput(format!(
                        "credential `{}` is not revocable but a timestamp was given",
                        key.cred_id
                    )))
                }
            };
            let state = rev_states
                .get(rev_reg_id)
                .and_then(|s| s.get(&timestamp))
                .ok_or_else(|| {
                    Error::InvalidInput(format!(
                        "no revocation state for `{}` at {}",
                        rev_reg_id, timestamp
                    ))
                })?;
            if state.rev_idx != witness.rev_idx {
                return Err(Error::InvalidInput(format!(
                    "revocation state is for index {}, credential has {}",
                    state.rev_idx, witness.rev_idx
                )));
            }
            non_revoked = Some((state, element, message_index, Scalar::random(OsRng)));
            identifier.rev_reg_id = Some(rev_reg_id.clone());
            identifier.timestamp = Some(timestamp);
        }

        let proof_messages = messages
            .iter()
            .enumerate()
            .map(|(i, m)| {
                if i == CredentialDefinition::MASTER_SECRET_INDEX {
                    ProofMessage::Hidden(HiddenMessage::ExternalBlinding(*m, ms_blinding))
                } else if revealed_indices.contains(&i) {
                    ProofMessage::Revealed(*m)
                } else if let Some(b) = predicate_blindings.get(&i) {
                    ProofMessage::Hidden(HiddenMessage::ExternalBlinding(*m, *b))
                } else {
                    match non_revoked {
                        Some((_, _, index, b)) if index == i => {
                            ProofMessage::Hidden(HiddenMessage::ExternalBlinding(*m, b))
                        }
                        _ => ProofMessage::Hidden(HiddenMessage::ProofSpecificBlinding(*m)),
                    }
                }
            })
            .collect::<Vec<ProofMessage>>();

        transcript.append_message(b"cred_def_id", credential.cred_def_id.0.as_bytes());
        let signature = PokSignature::commit(
            &credential.signature,
            &cred_def.value.public_key,
            &proof_messages,
            OsRng,
        )?;
        signature.add_proof_contribution(transcript);

        let mut predicates = Vec::with_capacity(plan.predicates.len());
        for (referent, info) in &plan.predicates {
            let encoded = credential
                .values
                .get(&info.name)
                .map(|v| v.encoded.as_str())
                .unwrap_or_default();
            let value = encoded_to_number(encoded).ok_or_else(|| {
                Error::PredicateNotSatisfied(format!("`{}` is not a number", info.name))
            })?;
            if !info.is_satisfied(value) {
                return Err(Error::PredicateNotSatisfied(format!(
                    "{} {} {}",
                    info.name, info.p_type, info.p_value
                )));
            }
            let blinding = cred_def
                .attribute_index(&info.name)
                .and_then(|i| predicate_blindings.get(&i))
                .copied()
                .ok_or(Error::General("missing predicate blinding"))?;
            predicates.push(PredicateProofBuilder::commit(
                referent,
                info.bound()?,
                value,
                blinding,
                OsRng,
                transcript,
            )?);
        }

        let non_revocation = non_revoked.map(|(state, element, _, b)| {
            let committing =
                MembershipProofCommitting::new(state.witness, state.rev_reg, element, b, OsRng);
            committing.add_proof_contribution(transcript);
            committing
        });

        Ok((
            Self {
                revealed_attrs,
                signature,
                predicates,
                non_revocation,
            },
            identifier,
        ))
    }

    fn gen_proof(self, challenge: Scalar) -> CredxResult<SubProof> {
        Ok(SubProof {
            revealed_attrs: self.revealed_attrs,
            signature_proof: self.signature.gen_proof(challenge)?,
            predicates: self
                .predicates
                .into_iter()
                .map(|p| p.gen_proof(challenge))
                .collect::<CredxResult<_>>()?,
            non_revocation: self.non_revocation.map(|m| m.gen_proof(challenge)),
        })
    }
}
