use crate::credential_definition::CredentialDefinition;
use crate::error::Error;
use crate::identifiers::{CredentialDefinitionId, RevocationRegistryId, SchemaId};
use crate::knox::Knox;
use crate::nonce::Nonce;
use crate::proof::{Identifier, Proof, SubProof, PROOF_CHALLENGE_LABEL, PROOF_TRANSCRIPT_LABEL};
use crate::proof_request::{AttributeInfo, NonRevokedInterval, ProofRequest};
use crate::query::Query;
use crate::revocation_registry::{RevocationRegistry, RevocationRegistryDefinition};
use crate::schema::Schema;
use crate::utils::{attr_common_view, encoded_to_scalar, strip_leading_zeros, Validatable};
use crate::CredxResult;
use blsful::inner_types::Scalar;
use lazy_static::lazy_static;
use log::{trace, warn};
use merlin::Transcript;
use regex::Regex;
use std::collections::{HashMap, HashSet};
use subtle::ConstantTimeEq;

lazy_static! {
    static ref INTERNAL_TAG_MATCHER: Regex =
        Regex::new("^attr::([^:]+)::(value|marker)$").expect("static regex");
}

/// Registries keyed by id then timestamp
pub type RevocationRegistries<'a> =
    HashMap<RevocationRegistryId, HashMap<u64, &'a RevocationRegistry>>;

/// The verifier side of the credential protocol
pub struct Verifier;

impl Verifier {
    /// A fresh nonce for a proof request
    pub fn generate_nonce() -> CredxResult<Nonce> {
        Ok(Nonce::new())
    }

    /// Check a proof against its request.
    ///
    /// Returns an error when the proof does not answer the request or
    /// refers to unknown objects, and `Ok(false)` when the cryptography
    /// does not verify.
    pub fn verify_proof(
        proof: &Proof,
        proof_req: &ProofRequest,
        schemas: &HashMap<SchemaId, &Schema>,
        cred_defs: &HashMap<CredentialDefinitionId, &CredentialDefinition>,
        rev_reg_defs: &HashMap<RevocationRegistryId, &RevocationRegistryDefinition>,
        rev_regs: &RevocationRegistries<'_>,
    ) -> CredxResult<bool> {
        trace!(
            "verify_proof >>> proof_req: {}, identifiers: {:?}",
            proof_req.name,
            proof.identifiers
        );
        proof_req.validate()?;
        if proof.identifiers.len() != proof.proof.sub_proofs.len() {
            return Err(Error::InvalidPresentationData(
                "identifiers do not match sub-proofs".to_string(),
            ));
        }

        let received = Received::gather(proof)?;
        received.compare_with_request(proof_req)?;
        verify_revealed_attribute_values(proof_req, proof)?;
        received.verify_restrictions(proof_req, proof)?;
        received.compare_timestamps(proof_req)?;

        let mut transcript = Transcript::new(PROOF_TRANSCRIPT_LABEL);
        transcript.append_message(b"nonce", proof_req.nonce.as_str().as_bytes());
        let challenge = proof.proof.challenge;
        let mut ms_response: Option<Scalar> = None;

        for (index, (identifier, sub_proof)) in proof
            .identifiers
            .iter()
            .zip(proof.proof.sub_proofs.iter())
            .enumerate()
        {
            if !schemas.contains_key(&identifier.schema_id) {
                return Err(Error::InvalidPresentationData(format!(
                    "schema `{}` not found",
                    identifier.schema_id
                )));
            }
            let cred_def = cred_defs.get(&identifier.cred_def_id).ok_or_else(|| {
                Error::InvalidPresentationData(format!(
                    "credential definition `{}` not found",
                    identifier.cred_def_id
                ))
            })?;
            if cred_def.schema_id != identifier.schema_id {
                return Err(Error::InvalidPresentationData(format!(
                    "`{}` is not built on schema `{}`",
                    cred_def.id, identifier.schema_id
                )));
            }
            let revocation = lookup_revocation(identifier, rev_reg_defs, rev_regs)?;

            let revealed = sub_proof
                .revealed_attrs
                .iter()
                .map(|(name, encoded)| {
                    let idx = cred_def.attribute_index(name).ok_or_else(|| {
                        Error::InvalidPresentationData(format!(
                            "`{}` is not in `{}`",
                            name, cred_def.id
                        ))
                    })?;
                    Ok((idx, encoded_to_scalar(encoded)?))
                })
                .collect::<CredxResult<Vec<(usize, Scalar)>>>()?;
            let public_key = &cred_def.value.public_key;
            if !sub_proof.signature_proof.verify(&revealed, public_key) {
                warn!("signature proof {} does not verify", index);
                return Ok(false);
            }
            let hidden = sub_proof
                .signature_proof
                .get_hidden_message_proofs(public_key, &revealed)?;
            let ms = hidden
                .get(&CredentialDefinition::MASTER_SECRET_INDEX)
                .copied()
                .ok_or(Error::InvalidSignatureProofData)?;
            match ms_response {
                Some(first) if first.ct_eq(&ms).unwrap_u8() != 1 => {
                    warn!("sub-proof {} uses a different master secret", index);
                    return Ok(false);
                }
                _ => ms_response = Some(ms),
            }

            transcript.append_message(b"cred_def_id", identifier.cred_def_id.0.as_bytes());
            sub_proof.signature_proof.add_challenge_contribution(
                public_key,
                &revealed,
                challenge,
                &mut transcript,
            )?;

            let expected = predicates_for_sub_proof(proof, proof_req, index)?;
            let proven = sub_proof
                .predicates
                .iter()
                .map(|p| p.referent.clone())
                .collect::<HashSet<String>>();
            if expected.keys().cloned().collect::<HashSet<String>>() != proven
                || proven.len() != sub_proof.predicates.len()
            {
                return Err(Error::InvalidPresentationData(format!(
                    "sub-proof {} does not prove the requested predicates",
                    index
                )));
            }
            for predicate in &sub_proof.predicates {
                let info = expected[&predicate.referent];
                let attr_index = cred_def.attribute_index(&info.name).ok_or_else(|| {
                    Error::InvalidPresentationData(format!(
                        "`{}` is not in `{}`",
                        info.name, cred_def.id
                    ))
                })?;
                let message_proof = hidden.get(&attr_index).copied().ok_or_else(|| {
                    Error::InvalidPresentationData(format!(
                        "predicate attribute `{}` is not hidden",
                        info.name
                    ))
                })?;
                let bound = info.bound()?;
                predicate.add_challenge_contribution(bound, message_proof, challenge, &mut transcript);
                if !predicate.verify(bound, challenge) {
                    warn!("range proof for `{}` does not verify", predicate.referent);
                    return Ok(false);
                }
            }

            if !verify_non_revocation(
                sub_proof,
                cred_def,
                &hidden,
                revocation,
                challenge,
                &mut transcript,
            )? {
                warn!("non-revocation proof {} does not verify", index);
                return Ok(false);
            }
        }

        let computed = Knox::transcript_challenge(PROOF_CHALLENGE_LABEL, &mut transcript);
        let valid = computed.ct_eq(&challenge).unwrap_u8() == 1;
        if !valid {
            warn!("proof challenge does not match");
        }
        trace!("verify_proof <<< valid: {}", valid);
        Ok(valid)
    }
}

fn lookup_revocation<'a>(
    identifier: &Identifier,
    rev_reg_defs: &HashMap<RevocationRegistryId, &'a RevocationRegistryDefinition>,
    rev_regs: &RevocationRegistries<'a>,
) -> CredxResult<Option<(&'a RevocationRegistryDefinition, &'a RevocationRegistry)>> {
    let timestamp = match identifier.timestamp {
        Some(t) => t,
        None => return Ok(None),
    };
    let rev_reg_id = identifier.rev_reg_id.as_ref().ok_or_else(|| {
        Error::InvalidPresentationData("timestamped sub-proof has no registry id".to_string())
    })?;
    let def = rev_reg_defs.get(rev_reg_id).copied().ok_or_else(|| {
        Error::InvalidPresentationData(format!(
            "revocation registry definition `{}` not found",
            rev_reg_id
        ))
    })?;
    if def.cred_def_id != identifier.cred_def_id {
        return Err(Error::InvalidPresentationData(format!(
            "revocation registry `{}` is not for `{}`",
            rev_reg_id, identifier.cred_def_id
        )));
    }
    let registry = rev_regs
        .get(rev_reg_id)
        .and_then(|by_time| by_time.get(&timestamp))
        .copied()
        .ok_or_else(|| {
            Error::InvalidPresentationData(format!(
                "revocation registry `{}` not found for timestamp {}",
                rev_reg_id, timestamp
            ))
        })?;
    Ok(Some((def, registry)))
}

fn verify_non_revocation(
    sub_proof: &SubProof,
    cred_def: &CredentialDefinition,
    hidden: &std::collections::BTreeMap<usize, Scalar>,
    revocation: Option<(&RevocationRegistryDefinition, &RevocationRegistry)>,
    challenge: Scalar,
    transcript: &mut Transcript,
) -> CredxResult<bool> {
    match (revocation, &sub_proof.non_revocation) {
        (None, None) => Ok(true),
        (Some((def, registry)), Some(membership)) => {
            let s_y = cred_def
                .revocation_index()
                .and_then(|i| hidden.get(&i))
                .copied()
                .ok_or_else(|| {
                    Error::InvalidPresentationData(
                        "revocation element is not hidden in the signature proof".to_string(),
                    )
                })?;
            membership.add_challenge_contribution(registry.value, s_y, challenge, transcript);
            Ok(membership.verify(def.value.public_keys.accum_key).is_ok())
        }
        _ => Err(Error::InvalidPresentationData(
            "non-revocation proof does not match the identifier".to_string(),
        )),
    }
}

fn predicates_for_sub_proof<'a>(
    proof: &Proof,
    proof_req: &'a ProofRequest,
    index: usize,
) -> CredxResult<HashMap<String, &'a crate::proof_request::PredicateInfo>> {
    proof
        .requested_proof
        .predicates
        .iter()
        .filter(|(_, r)| r.sub_proof_index as usize == index)
        .map(|(referent, _)| {
            proof_req
                .requested_predicates
                .get(referent)
                .map(|info| (referent.clone(), info))
                .ok_or_else(|| {
                    Error::InvalidPresentationData(format!("unknown predicate `{}`", referent))
                })
        })
        .collect()
}

fn verify_revealed_attribute_values(proof_req: &ProofRequest, proof: &Proof) -> CredxResult<()> {
    for (referent, info) in &proof.requested_proof.revealed_attrs {
        let name = proof_req
            .requested_attributes
            .get(referent)
            .and_then(|a| a.name.as_ref())
            .ok_or_else(|| {
                Error::InvalidPresentationData(format!(
                    "attribute `{}` not found in the proof request",
                    referent
                ))
            })?;
        verify_revealed_attribute_value(name, proof, info.sub_proof_index, &info.encoded)?;
    }
    for (referent, group) in &proof.requested_proof.revealed_attr_groups {
        let names = proof_req
            .requested_attributes
            .get(referent)
            .and_then(|a| a.names.as_ref())
            .ok_or_else(|| {
                Error::InvalidPresentationData(format!(
                    "attribute group `{}` not found in the proof request",
                    referent
                ))
            })?;
        if group.values.len() != names.len() {
            return Err(Error::InvalidPresentationData(format!(
                "attribute group `{}` does not match the proof request",
                referent
            )));
        }
        for name in names {
            let value = group.values.get(name).ok_or_else(|| {
                Error::InvalidPresentationData(format!(
                    "attribute group `{}` is missing `{}`",
                    referent, name
                ))
            })?;
            verify_revealed_attribute_value(name, proof, group.sub_proof_index, &value.encoded)?;
        }
    }
    Ok(())
}

fn verify_revealed_attribute_value(
    name: &str,
    proof: &Proof,
    sub_proof_index: u32,
    encoded: &str,
) -> CredxResult<()> {
    let sub_proof = proof
        .proof
        .sub_proofs
        .get(sub_proof_index as usize)
        .ok_or_else(|| {
            Error::InvalidPresentationData(format!("sub-proof {} not found", sub_proof_index))
        })?;
    let view = attr_common_view(name);
    let in_proof = sub_proof
        .revealed_attrs
        .iter()
        .find(|(k, _)| attr_common_view(k) == view)
        .map(|(_, v)| v)
        .ok_or_else(|| {
            Error::InvalidPresentationData(format!("`{}` is not revealed in the proof", name))
        })?;
    if strip_leading_zeros(encoded) != strip_leading_zeros(in_proof) {
        return Err(Error::InvalidPresentationData(format!(
            "encoded values for `{}` differ between requested proof and proof",
            name
        )));
    }
    Ok(())
}

/// Identifiers of the sub-proofs answering each referent
struct Received {
    revealed: HashMap<String, Identifier>,
    unrevealed: HashMap<String, Identifier>,
    predicates: HashMap<String, Identifier>,
    self_attested: HashSet<String>,
}

impl Received {
    fn gather(proof: &Proof) -> CredxResult<Self> {
        let identifier = |index: u32| {
            proof
                .identifiers
                .get(index as usize)
                .cloned()
                .ok_or_else(|| {
                    Error::InvalidPresentationData(format!(
                        "identifier not found for index {}",
                        index
                    ))
                })
        };
        let rp = &proof.requested_proof;
        let mut revealed = HashMap::new();
        for (referent, info) in &rp.revealed_attrs {
            revealed.insert(referent.clone(), identifier(info.sub_proof_index)?);
        }
        for (referent, info) in &rp.revealed_attr_groups {
            revealed.insert(referent.clone(), identifier(info.sub_proof_index)?);
        }
        let mut unrevealed = HashMap::new();
        for (referent, info) in &rp.unrevealed_attrs {
            unrevealed.insert(referent.clone(), identifier(info.sub_proof_index)?);
        }
        let mut predicates = HashMap::new();
        for (referent, info) in &rp.predicates {
            predicates.insert(referent.clone(), identifier(info.sub_proof_index)?);
        }
        Ok(Self {
            revealed,
            unrevealed,
            predicates,
            self_attested: rp.self_attested_attrs.keys().cloned().collect(),
        })
    }

    fn compare_with_request(&self, proof_req: &ProofRequest) -> CredxResult<()> {
        let requested = proof_req
            .requested_attributes
            .keys()
            .cloned()
            .collect::<HashSet<String>>();
        let received = self
            .revealed
            .keys()
            .chain(self.unrevealed.keys())
            .chain(self.self_attested.iter())
            .cloned()
            .collect::<HashSet<String>>();
        if requested != received {
            return Err(Error::InvalidPresentationData(format!(
                "requested attributes {:?} do not correspond to received {:?}",
                requested, received
            )));
        }
        let requested = proof_req
            .requested_predicates
            .keys()
            .collect::<HashSet<&String>>();
        let received = self.predicates.keys().collect::<HashSet<&String>>();
        if requested != received {
            return Err(Error::InvalidPresentationData(format!(
                "requested predicates {:?} do not correspond to received {:?}",
                requested, received
            )));
        }
        Ok(())
    }

    fn compare_timestamps(&self, proof_req: &ProofRequest) -> CredxResult<()> {
        for (referent, info) in &proof_req.requested_attributes {
            if self.self_attested.contains(referent) {
                continue;
            }
            let identifier = self
                .revealed
                .get(referent)
                .or_else(|| self.unrevealed.get(referent));
            validate_timestamp(identifier, referent, proof_req.interval_for(&info.non_revoked))?;
        }
        for (referent, info) in &proof_req.requested_predicates {
            validate_timestamp(
                self.predicates.get(referent),
                referent,
                proof_req.interval_for(&info.non_revoked),
            )?;
        }
        Ok(())
    }

    fn verify_restrictions(&self, proof_req: &ProofRequest, proof: &Proof) -> CredxResult<()> {
        let rp = &proof.requested_proof;
        for (referent, info) in &proof_req.requested_attributes {
            if is_self_attested(referent, info, &self.self_attested) {
                continue;
            }
            let query = match &info.restrictions {
                Some(q) => q,
                None => continue,
            };
            let identifier = self
                .revealed
                .get(referent)
                .or_else(|| self.unrevealed.get(referent))
                .ok_or_else(|| {
                    Error::InvalidPresentationData(format!(
                        "identifier not found for referent `{}`",
                        referent
                    ))
                })?;
            let filter = Filter::from_identifier(identifier)?;
            let mut attr_values = HashMap::new();
            if let Some(name) = &info.name {
                attr_values.insert(
                    name.clone(),
                    rp.revealed_attrs.get(referent).map(|a| a.raw.clone()),
                );
            } else if let Some(names) = &info.names {
                let group = rp.revealed_attr_groups.get(referent);
                for name in names {
                    attr_values.insert(
                        name.clone(),
                        group.and_then(|g| g.values.get(name)).map(|v| v.raw.clone()),
                    );
                }
            }
            filter.process_operator(&attr_values, query).map_err(|e| {
                Error::InvalidPresentationData(format!(
                    "restriction for `{}` failed: {}",
                    referent, e
                ))
            })?;
        }

        for (referent, info) in &proof_req.requested_predicates {
            let query = match &info.restrictions {
                Some(q) => q,
                None => continue,
            };
            let identifier = self.predicates.get(referent).ok_or_else(|| {
                Error::InvalidPresentationData(format!(
                    "identifier not found for referent `{}`",
                    referent
                ))
            })?;
            let filter = Filter::from_identifier(identifier)?;
            let mut attr_values = HashMap::new();
            attr_values.insert(info.name.clone(), None);
            filter.process_operator(&attr_values, query).map_err(|e| {
                Error::InvalidPresentationData(format!(
                    "restriction for `{}` failed: {}",
                    referent, e
                ))
            })?;
        }
        Ok(())
    }
}

fn validate_timestamp(
    identifier: Option<&Identifier>,
    referent: &str,
    interval: Option<NonRevokedInterval>,
) -> CredxResult<()> {
    let interval = match interval {
        Some(interval) => interval,
        None => return Ok(()),
    };
    match identifier.and_then(|i| i.timestamp) {
        Some(timestamp) => {
            if !interval.contains(timestamp) {
                warn!(
                    "timestamp {} for `{}` is outside the requested interval {:?}",
                    timestamp, referent, interval
                );
            }
            Ok(())
        }
        None => Err(Error::InvalidPresentationData(format!(
            "missing timestamp for `{}`",
            referent
        ))),
    }
}

fn is_self_attested(referent: &str, info: &AttributeInfo, self_attested: &HashSet<String>) -> bool {
    match &info.restrictions {
        Some(Query::And(qs)) | Some(Query::Or(qs)) if qs.is_empty() => {
            self_attested.contains(referent)
        }
        None => self_attested.contains(referent),
        Some(_) => false,
    }
}

/// Tag values a restriction is evaluated against
#[derive(Debug)]
struct Filter {
    schema_id: String,
    schema_issuer_did: String,
    schema_name: String,
    schema_version: String,
    issuer_did: String,
    cred_def_id: String,
}

impl Filter {
    fn from_identifier(identifier: &Identifier) -> CredxResult<Self> {
        let (schema_issuer_did, schema_name, schema_version) =
            identifier.schema_id.parts().ok_or_else(|| {
                Error::InvalidPresentationData(format!(
                    "invalid schema id `{}`",
                    identifier.schema_id
                ))
            })?;
        let issuer_did = identifier.cred_def_id.issuer_did().ok_or_else(|| {
            Error::InvalidPresentationData(format!(
                "invalid credential definition id `{}`",
                identifier.cred_def_id
            ))
        })?;
        Ok(Self {
            schema_id: identifier.schema_id.0.clone(),
            schema_issuer_did: schema_issuer_did.0,
            schema_name,
            schema_version,
            issuer_did: issuer_did.0,
            cred_def_id: identifier.cred_def_id.0.clone(),
        })
    }

    fn process_operator(
        &self,
        attr_values: &HashMap<String, Option<String>>,
        query: &Query,
    ) -> Result<(), String> {
        match query {
            Query::Eq(tag, value) => self.process_filter(attr_values, tag, value),
            Query::Neq(tag, value) => match self.process_filter(attr_values, tag, value) {
                Ok(()) => Err(format!("`{}` equals `{}`", tag, value)),
                Err(_) => Ok(()),
            },
            Query::In(tag, values) => {
                if values
                    .iter()
                    .any(|v| self.process_filter(attr_values, tag, v).is_ok())
                {
                    Ok(())
                } else {
                    Err(format!("`{}` is not one of {:?}", tag, values))
                }
            }
            Query::And(queries) => queries
                .iter()
                .try_for_each(|q| self.process_operator(attr_values, q)),
            Query::Or(queries) => {
                if queries
                    .iter()
                    .any(|q| self.process_operator(attr_values, q).is_ok())
                {
                    Ok(())
                } else {
                    Err("no `$or` condition holds".to_string())
                }
            }
            Query::Not(q) => match self.process_operator(attr_values, q) {
                Ok(()) => Err("`$not` condition holds".to_string()),
                Err(_) => Ok(()),
            },
        }
    }

    fn process_filter(
        &self,
        attr_values: &HashMap<String, Option<String>>,
        tag: &str,
        value: &str,
    ) -> Result<(), String> {
        trace!("process_filter: tag: {}, value: {}, filter: {:?}", tag, value, self);
        let actual = match tag {
            "schema_id" => &self.schema_id,
            "schema_issuer_did" => &self.schema_issuer_did,
            "schema_name" => &self.schema_name,
            "schema_version" => &self.schema_version,
            "cred_def_id" => &self.cred_def_id,
            "issuer_did" => &self.issuer_did,
            _ => return check_attribute_tag(attr_values, tag, value),
        };
        if actual == value {
            Ok(())
        } else {
            Err(format!(
                "`{}` expected `{}`, found `{}`",
                tag, value, actual
            ))
        }
    }
}

fn check_attribute_tag(
    attr_values: &HashMap<String, Option<String>>,
    tag: &str,
    value: &str,
) -> Result<(), String> {
    let caps = INTERNAL_TAG_MATCHER
        .captures(tag)
        .ok_or_else(|| format!("unknown restriction tag `{}`", tag))?;
    let name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
    let kind = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    let view = attr_common_view(name);
    let requested = attr_values
        .iter()
        .find(|(k, _)| attr_common_view(k) == view);
    match (kind, requested) {
        ("marker", _) => Ok(()),
        ("value", Some((_, Some(revealed)))) if revealed != value => Err(format!(
            "`{}` expected `{}`, found `{}`",
            tag, value, revealed
        )),
        ("value", Some(_)) => Ok(()),
        _ => Err(format!("`{}` does not refer to a requested attribute", tag)),
    }
}
