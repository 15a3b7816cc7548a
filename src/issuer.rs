use crate::credential::{Credential, CredentialValues, CredentialWitness};
use crate::credential_definition::{
    CredentialDefinition, CredentialDefinitionConfig, CredentialDefinitionData,
    CredentialDefinitionPrivate, CredentialKeyCorrectnessProof, SignatureType,
};
use crate::credential_offer::CredentialOffer;
use crate::credential_request::CredentialRequest;
use crate::error::Error;
use crate::identifiers::{CredentialDefinitionId, DidValue, RevocationRegistryId, SchemaId};
use crate::knox::accumulator::vb20::{self, Accumulator, MembershipWitness};
use crate::knox::ps::{self, KeyCorrectnessProof};
use crate::nonce::Nonce;
use crate::revocation_registry::{
    IssuanceType, RegistryType, RevocationKeyPrivate, RevocationRegistry,
    RevocationRegistryDefinition, RevocationRegistryDefinitionValue, RevocationRegistryDelta,
    RevocationRegistryPublicKeys,
};
use crate::schema::{AttributeNames, Schema};
use crate::tails::{TailsReader, TailsWriter};
use crate::utils::{log_artifact, Validatable};
use crate::CredxResult;
use log::{debug, trace};
use rand_core::OsRng;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Everything the issuer needs to place a credential in a revocation registry
#[derive(Clone, Copy, Debug)]
pub struct CredentialRevocationConfig<'a> {
    /// The registry definition
    pub reg_def: &'a RevocationRegistryDefinition,
    /// The accumulator secret
    pub reg_def_private: &'a RevocationKeyPrivate,
    /// The current registry state
    pub registry: &'a RevocationRegistry,
    /// The slot to assign
    pub registry_idx: u32,
    /// The registry's tails file
    pub tails_reader: &'a TailsReader,
}

/// The issuer side of the credential protocol
pub struct Issuer;

impl Issuer {
    /// Declare an unregistered schema
    pub fn create_schema(
        issuer_did: &DidValue,
        name: &str,
        version: &str,
        attr_names: AttributeNames,
    ) -> CredxResult<Schema> {
        trace!(
            "create_schema >>> issuer_did: {}, name: {}, version: {}, attr_names: {:?}",
            issuer_did,
            name,
            version,
            attr_names
        );
        let schema = Schema::new(issuer_did, name, version, attr_names)?;
        log_artifact("schema", &schema);
        Ok(schema)
    }

    /// Generate signing keys for a schema
    pub fn create_credential_definition(
        issuer_did: &DidValue,
        schema: &Schema,
        signature_type: SignatureType,
        tag: &str,
        config: CredentialDefinitionConfig,
    ) -> CredxResult<(
        CredentialDefinition,
        CredentialDefinitionPrivate,
        CredentialKeyCorrectnessProof,
    )> {
        trace!(
            "create_credential_definition >>> issuer_did: {}, schema: {}, tag: {}, config: {:?}",
            issuer_did,
            schema.id,
            tag,
            config
        );
        issuer_did.validate()?;
        schema.validate()?;

        let schema_ref = schema
            .seq_no()
            .map(|n| n.to_string())
            .unwrap_or_else(|| schema.id.0.clone());
        let attributes = schema.attr_names.canonical();
        let count = 1 + attributes.len() + usize::from(config.support_revocation);
        let (public_key, secret_key) = ps::SecretKey::keypair(count, OsRng)?;
        let proof = KeyCorrectnessProof::new(&secret_key, &public_key, OsRng)?;

        let cred_def = CredentialDefinition {
            id: CredentialDefinitionId::new(issuer_did, &schema_ref, signature_type.as_str(), tag),
            schema_id: schema.id.clone(),
            signature_type,
            tag: tag.to_string(),
            value: CredentialDefinitionData {
                public_key,
                attributes,
                support_revocation: config.support_revocation,
            },
        };
        cred_def.validate()?;
        log_artifact("credential definition", &cred_def);
        Ok((
            cred_def,
            CredentialDefinitionPrivate { value: secret_key },
            CredentialKeyCorrectnessProof { value: proof },
        ))
    }

    /// Create a revocation registry for a revocable credential definition.
    ///
    /// The tails file is written to `tails_dir`, or a fresh temporary
    /// directory when none is given.
    #[allow(clippy::too_many_arguments)]
    pub fn create_revocation_registry(
        issuer_did: &DidValue,
        cred_def: &CredentialDefinition,
        registry_type: RegistryType,
        tag: &str,
        max_cred_num: u32,
        issuance_type: IssuanceType,
        tails_dir: Option<&Path>,
    ) -> CredxResult<(
        RevocationRegistryDefinition,
        RevocationRegistry,
        RevocationRegistryDelta,
        RevocationKeyPrivate,
    )> {
        trace!(
            "create_revocation_registry >>> cred_def: {}, tag: {}, max_cred_num: {}, issuance_type: {}",
            cred_def.id,
            tag,
            max_cred_num,
            issuance_type
        );
        issuer_did.validate()?;
        if cred_def.revocation_index().is_none() {
            return Err(Error::InvalidInput(format!(
                "credential definition `{}` does not support revocation",
                cred_def.id
            )));
        }
        if max_cred_num == 0 {
            return Err(Error::InvalidInput(
                "`max_cred_num` must be greater than 0".to_string(),
            ));
        }

        let key = vb20::SecretKey::new(OsRng);
        let accum_key = vb20::PublicKey::from(&key);
        let dir = tails_dir
            .map(Path::to_path_buf)
            .unwrap_or_else(default_tails_dir);
        let (tails_location, tails_hash) =
            TailsWriter::new(dir).write(&key.powers(max_cred_num as usize))?;

        let reg_def = RevocationRegistryDefinition {
            id: RevocationRegistryId::new(issuer_did, &cred_def.id, registry_type.as_str(), tag),
            revoc_def_type: registry_type,
            tag: tag.to_string(),
            cred_def_id: cred_def.id.clone(),
            value: RevocationRegistryDefinitionValue {
                issuance_type,
                max_cred_num,
                public_keys: RevocationRegistryPublicKeys { accum_key },
                tails_hash,
                tails_location,
            },
        };
        reg_def.validate()?;

        let elements = reg_def
            .accumulated(&BTreeSet::new(), &BTreeSet::new())
            .into_iter()
            .map(|i| reg_def.element(i))
            .collect::<Vec<_>>();
        let registry = RevocationRegistry {
            value: Accumulator::with_elements(&key, &elements),
            issued: BTreeSet::new(),
            revoked: BTreeSet::new(),
        };
        let delta = registry.full_delta(&reg_def);
        log_artifact("revocation registry definition", &reg_def);
        log_artifact("revocation registry", &registry);
        Ok((
            reg_def,
            registry,
            delta,
            RevocationKeyPrivate { value: key },
        ))
    }

    /// Offer a credential to a holder
    pub fn create_credential_offer(
        schema_id: &SchemaId,
        cred_def: &CredentialDefinition,
        correctness_proof: &CredentialKeyCorrectnessProof,
    ) -> CredxResult<CredentialOffer> {
        trace!(
            "create_credential_offer >>> schema_id: {}, cred_def: {}",
            schema_id,
            cred_def.id
        );
        if cred_def.schema_id != *schema_id {
            return Err(Error::InvalidInput(format!(
                "credential definition `{}` is not for schema `{}`",
                cred_def.id, schema_id
            )));
        }
        let offer = CredentialOffer {
            schema_id: schema_id.clone(),
            cred_def_id: cred_def.id.clone(),
            key_correctness_proof: correctness_proof.clone(),
            nonce: Nonce::new(),
        };
        log_artifact("credential offer", &offer);
        Ok(offer)
    }

    /// Sign a credential for the holder who sent `request`.
    ///
    /// Returns the updated registry and its delta when issuing changed
    /// the accumulator.
    pub fn create_credential(
        cred_def: &CredentialDefinition,
        cred_def_private: &CredentialDefinitionPrivate,
        offer: &CredentialOffer,
        request: &CredentialRequest,
        values: &CredentialValues,
        revocation: Option<CredentialRevocationConfig<'_>>,
    ) -> CredxResult<(
        Credential,
        Option<RevocationRegistry>,
        Option<RevocationRegistryDelta>,
    )> {
        trace!(
            "create_credential >>> cred_def: {}, values: {:?}, revocation: {}",
            cred_def.id,
            values,
            revocation.is_some()
        );
        offer.validate()?;
        request.validate()?;
        values.validate()?;
        if request.cred_def_id != cred_def.id || offer.cred_def_id != cred_def.id {
            return Err(Error::InvalidCredentialRequest(
                "request is for a different credential definition",
            ));
        }

        let mut messages = values.to_messages(cred_def)?;
        let mut rev_reg_id = None;
        let mut rev_reg = None;
        let mut witness = None;
        let mut updated = None;
        let mut delta = None;
        match (cred_def.revocation_index(), revocation) {
            (Some(message_index), Some(config)) => {
                let issued = Self::assign_revocation_index(cred_def, &config)?;
                let element = config.reg_def.element(config.registry_idx);
                messages.push((message_index, element.0));
                witness = Some(CredentialWitness {
                    rev_idx: config.registry_idx,
                    value: MembershipWitness::new(
                        element,
                        issued.value,
                        &config.reg_def_private.value,
                    )?,
                });
                rev_reg_id = Some(config.reg_def.id.clone());
                rev_reg = Some(issued.value);
                if issued.value != config.registry.value {
                    delta = Some(RevocationRegistryDelta {
                        prev_accum: Some(config.registry.value),
                        accum: issued.value,
                        issued: [config.registry_idx].into_iter().collect(),
                        revoked: BTreeSet::new(),
                    });
                }
                updated = Some(issued);
            }
            (Some(_), None) => {
                return Err(Error::InvalidInput(
                    "a revocable credential needs a registry, index and tails file".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::InvalidInput(format!(
                    "credential definition `{}` does not support revocation",
                    cred_def.id
                )))
            }
            (None, None) => {}
        }

        let signature = request.blinded_ms.sign(
            &cred_def.value.public_key,
            &cred_def_private.value,
            &messages,
            offer.nonce.to_scalar(),
            OsRng,
        )?;
        let credential = Credential {
            schema_id: offer.schema_id.clone(),
            cred_def_id: cred_def.id.clone(),
            rev_reg_id,
            values: values.clone(),
            signature,
            rev_reg,
            witness,
        };
        log_artifact("credential", &credential);
        Ok((credential, updated, delta))
    }

    fn assign_revocation_index(
        cred_def: &CredentialDefinition,
        config: &CredentialRevocationConfig<'_>,
    ) -> CredxResult<RevocationRegistry> {
        let reg_def = config.reg_def;
        if reg_def.cred_def_id != cred_def.id {
            return Err(Error::InvalidInput(format!(
                "revocation registry `{}` is not for credential definition `{}`",
                reg_def.id, cred_def.id
            )));
        }
        reg_def.check_index(config.registry_idx)?;
        if config.tails_reader.hash() != reg_def.value.tails_hash {
            return Err(Error::InvalidTails(format!(
                "`{}` is not the tails file of `{}`",
                config.tails_reader.location(),
                reg_def.id
            )));
        }
        let idx = config.registry_idx;
        if config.registry.issued.contains(&idx) || config.registry.revoked.contains(&idx) {
            return Err(Error::InvalidRevocationIndex(idx));
        }

        let mut next = config.registry.clone();
        next.issued.insert(idx);
        if reg_def.value.issuance_type == IssuanceType::IssuanceOnDemand {
            next.value = next
                .value
                .add(&config.reg_def_private.value, reg_def.element(idx));
        }
        debug!("assigned revocation index {} in {}", idx, reg_def.id);
        Ok(next)
    }

    /// Remove a credential from the accumulator
    pub fn revoke_credential(
        reg_def: &RevocationRegistryDefinition,
        registry: &RevocationRegistry,
        reg_def_private: &RevocationKeyPrivate,
        index: u32,
    ) -> CredxResult<(RevocationRegistry, RevocationRegistryDelta)> {
        trace!("revoke_credential >>> rev_reg: {}, index: {}", reg_def.id, index);
        reg_def.check_index(index)?;
        if !registry.issued.contains(&index)
            || !reg_def
                .accumulated(&registry.issued, &registry.revoked)
                .contains(&index)
        {
            return Err(Error::InvalidRevocationRegistryRevokeOperation);
        }
        Self::update_revocation_registry(
            reg_def,
            registry,
            reg_def_private,
            &BTreeSet::new(),
            &[index].into_iter().collect(),
        )
    }

    /// Return a revoked credential to the accumulator
    pub fn recover_credential(
        reg_def: &RevocationRegistryDefinition,
        registry: &RevocationRegistry,
        reg_def_private: &RevocationKeyPrivate,
        index: u32,
    ) -> CredxResult<(RevocationRegistry, RevocationRegistryDelta)> {
        trace!("recover_credential >>> rev_reg: {}, index: {}", reg_def.id, index);
        reg_def.check_index(index)?;
        if !registry.revoked.contains(&index) {
            return Err(Error::InvalidRevocationRegistryRevokeOperation);
        }
        Self::update_revocation_registry(
            reg_def,
            registry,
            reg_def_private,
            &[index].into_iter().collect(),
            &BTreeSet::new(),
        )
    }

    /// Apply a batch of issued and revoked slots
    pub fn update_revocation_registry(
        reg_def: &RevocationRegistryDefinition,
        registry: &RevocationRegistry,
        reg_def_private: &RevocationKeyPrivate,
        issued: &BTreeSet<u32>,
        revoked: &BTreeSet<u32>,
    ) -> CredxResult<(RevocationRegistry, RevocationRegistryDelta)> {
        trace!(
            "update_revocation_registry >>> rev_reg: {}, issued: {:?}, revoked: {:?}",
            reg_def.id,
            issued,
            revoked
        );
        for idx in issued.iter().chain(revoked.iter()) {
            reg_def.check_index(*idx)?;
        }
        if issued.intersection(revoked).next().is_some() {
            return Err(Error::InvalidRevocationRegistryRevokeOperation);
        }

        let before = reg_def.accumulated(&registry.issued, &registry.revoked);
        let mut next = registry.clone();
        for idx in issued {
            next.issued.insert(*idx);
            next.revoked.remove(idx);
        }
        next.revoked.extend(revoked.iter().copied());
        let after = reg_def.accumulated(&next.issued, &next.revoked);

        let added = after.difference(&before).copied().collect::<BTreeSet<u32>>();
        let removed = before.difference(&after).copied().collect::<BTreeSet<u32>>();
        let key = &reg_def_private.value;
        for idx in &added {
            next.value = next.value.add(key, reg_def.element(*idx));
        }
        for idx in &removed {
            next.value = next.value.remove(key, reg_def.element(*idx))?;
        }
        let delta = RevocationRegistryDelta {
            prev_accum: Some(registry.value),
            accum: next.value,
            issued: added,
            revoked: removed,
        };
        log_artifact("revocation registry delta", &delta);
        Ok((next, delta))
    }
}

fn default_tails_dir() -> PathBuf {
    std::env::temp_dir().join(format!("credx-tails-{}", uuid::Uuid::new_v4()))
}
