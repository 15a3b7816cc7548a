#![allow(dead_code)]

use credx_harness::prelude::*;
use lazy_static::lazy_static;
use maplit::hashmap;
use std::collections::HashMap;

lazy_static! {
    pub static ref ISSUER_DID: DidValue = DidValue::new("NcYxiDXkpYi6ov5FcYDi1e");
}

pub const GVT_ATTRIBUTES: [&str; 4] = ["name", "sex", "age", "height"];

pub fn setup() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn gvt_values() -> CredentialValues {
    let mut values = CredentialValues::default();
    values.add_raw("name", "Alex");
    values.add_raw("sex", "male");
    values.add_raw("age", "28");
    values.add_raw("height", "175");
    values
}

/// An issued registry with its secret and the holder-facing delta so far
pub struct RegistrySetup {
    pub def: RevocationRegistryDefinition,
    pub registry: RevocationRegistry,
    pub delta: RevocationRegistryDelta,
    pub key: RevocationKeyPrivate,
    pub tails_reader: TailsReader,
}

pub struct IssuerSetup {
    pub schema: Schema,
    pub cred_def: CredentialDefinition,
    pub cred_def_private: CredentialDefinitionPrivate,
    pub correctness_proof: CredentialKeyCorrectnessProof,
    pub revocation: Option<RegistrySetup>,
}

impl IssuerSetup {
    pub fn new(revocation: Option<(u32, IssuanceType)>) -> CredxResult<Self> {
        Self::with_tag("tag", revocation)
    }

    pub fn with_tag(tag: &str, revocation: Option<(u32, IssuanceType)>) -> CredxResult<Self> {
        let schema = Issuer::create_schema(
            &ISSUER_DID,
            "gvt",
            "1.0",
            AttributeNames::from(&GVT_ATTRIBUTES[..]),
        )?
        .register(15);
        let (cred_def, cred_def_private, correctness_proof) =
            Issuer::create_credential_definition(
                &ISSUER_DID,
                &schema,
                SignatureType::PS,
                tag,
                CredentialDefinitionConfig {
                    support_revocation: revocation.is_some(),
                },
            )?;
        let revocation = match revocation {
            Some((max_cred_num, issuance_type)) => {
                let (def, registry, delta, key) = Issuer::create_revocation_registry(
                    &ISSUER_DID,
                    &cred_def,
                    RegistryType::VbAccum,
                    "default",
                    max_cred_num,
                    issuance_type,
                    None,
                )?;
                let tails_reader = def.tails_reader()?;
                Some(RegistrySetup {
                    def,
                    registry,
                    delta,
                    key,
                    tails_reader,
                })
            }
            None => None,
        };
        Ok(Self {
            schema,
            cred_def,
            cred_def_private,
            correctness_proof,
            revocation,
        })
    }

    /// Offer, request, issue and process one credential
    pub fn issue(
        &mut self,
        master_secret: &MasterSecret,
        values: &CredentialValues,
        rev_idx: Option<u32>,
    ) -> CredxResult<ProcessedCredential> {
        let offer =
            Issuer::create_credential_offer(&self.schema.id, &self.cred_def, &self.correctness_proof)?;
        let (request, metadata) = Prover::create_credential_request(
            None,
            &self.cred_def,
            master_secret,
            "default",
            &offer,
        )?;
        let credential = match (&mut self.revocation, rev_idx) {
            (Some(reg), Some(idx)) => {
                let (credential, registry, delta) = Issuer::create_credential(
                    &self.cred_def,
                    &self.cred_def_private,
                    &offer,
                    &request,
                    values,
                    Some(CredentialRevocationConfig {
                        reg_def: &reg.def,
                        reg_def_private: &reg.key,
                        registry: &reg.registry,
                        registry_idx: idx,
                        tails_reader: &reg.tails_reader,
                    }),
                )?;
                if let Some(registry) = registry {
                    reg.registry = registry;
                }
                if let Some(delta) = delta {
                    reg.delta = reg.delta.merge(&delta)?;
                }
                credential
            }
            _ => {
                let (credential, _, _) = Issuer::create_credential(
                    &self.cred_def,
                    &self.cred_def_private,
                    &offer,
                    &request,
                    values,
                    None,
                )?;
                credential
            }
        };
        Prover::process_credential(
            &credential,
            &metadata,
            master_secret,
            &self.cred_def,
            self.revocation.as_ref().map(|r| &r.def),
        )
    }

    /// Apply an issuer-side registry change and fold it into the holder delta
    pub fn apply(&mut self, change: (RevocationRegistry, RevocationRegistryDelta)) -> CredxResult<()> {
        let reg = self
            .revocation
            .as_mut()
            .ok_or(Error::General("no registry"))?;
        reg.registry = change.0;
        reg.delta = reg.delta.merge(&change.1)?;
        Ok(())
    }

    pub fn schemas(&self) -> HashMap<SchemaId, &Schema> {
        hashmap! { self.schema.id.clone() => &self.schema }
    }

    pub fn cred_defs(&self) -> HashMap<CredentialDefinitionId, &CredentialDefinition> {
        hashmap! { self.cred_def.id.clone() => &self.cred_def }
    }

    pub fn rev_reg_defs(&self) -> HashMap<RevocationRegistryId, &RevocationRegistryDefinition> {
        self.revocation
            .iter()
            .map(|r| (r.def.id.clone(), &r.def))
            .collect()
    }
}

/// A proof request revealing `name` under referent `attr1_referent`
pub fn name_request() -> ProofRequest {
    let mut req = ProofRequest::new("proof", "1.0", Verifier::generate_nonce().unwrap());
    req.requested_attributes
        .insert("attr1_referent".to_string(), AttributeInfo::named("name"));
    req
}

pub fn credentials(cred: &ProcessedCredential) -> HashMap<String, ProcessedCredential> {
    hashmap! { "cred1".to_string() => cred.clone() }
}

pub fn no_rev_regs<'a>() -> RevocationRegistries<'a> {
    HashMap::new()
}
