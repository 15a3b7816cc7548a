//! The end-to-end issuance and presentation scenario.
//!
//! Every step hands its output unchanged to the next one and the first
//! error ends the run.

use crate::credential::{Credential, CredentialValues, ProcessedCredential};
use crate::credential_definition::{
    CredentialDefinition, CredentialDefinitionConfig, CredentialDefinitionPrivate, SignatureType,
    DEFAULT_TAG,
};
use crate::credential_offer::CredentialOffer;
use crate::credential_request::CredentialRequest;
use crate::error::Error;
use crate::identifiers::{DidValue, RevocationRegistryId};
use crate::issuer::{CredentialRevocationConfig, Issuer};
use crate::master_secret::MasterSecret;
use crate::proof::Proof;
use crate::proof_request::{AttributeInfo, NonRevokedInterval, PredicateInfo, ProofRequest};
use crate::prover::Prover;
use crate::requested_credentials::RequestedCredentials;
use crate::revocation_registry::{
    IssuanceType, RegistryType, RevocationRegistry, RevocationRegistryDefinition,
};
use crate::revocation_state::RevocationStates;
use crate::schema::{AttributeNames, Schema};
use crate::utils::{log_artifact, Validatable};
use crate::verifier::Verifier;
use crate::CredxResult;
use log::info;
use maplit::hashmap;
use std::collections::HashMap;
use std::path::PathBuf;

/// The holder's name for the only credential in the scenario
pub const CREDENTIAL_ID: &str = "one";
/// The proof request referent for the revealed attribute
pub const REVEALED_REFERENT: &str = "reft";
const MASTER_SECRET_ID: &str = "default";

/// Registry settings for the revocable variant
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevocationOptions {
    /// Registry capacity
    pub max_cred_num: u32,
    /// How slots join the accumulator
    pub issuance_type: IssuanceType,
    /// Where to write the tails file, a temporary directory when unset
    pub tails_dir: Option<PathBuf>,
    /// The slot assigned to the credential
    pub rev_idx: u32,
}

impl Default for RevocationOptions {
    fn default() -> Self {
        Self {
            max_cred_num: 100,
            issuance_type: IssuanceType::IssuanceByDefault,
            tails_dir: None,
            rev_idx: 1,
        }
    }
}

/// Inputs of one scenario run
#[derive(Clone, Debug)]
pub struct WorkflowConfig {
    /// The issuer
    pub issuer_did: DidValue,
    /// Schema name
    pub schema_name: String,
    /// Schema version
    pub schema_version: String,
    /// Schema attributes
    pub attributes: Vec<String>,
    /// Sequence number the ledger assigns to the schema
    pub schema_seq_no: u32,
    /// The credential values
    pub values: CredentialValues,
    /// The attribute disclosed in the proof
    pub reveal: String,
    /// Predicates to prove, keyed by referent
    pub predicates: Vec<(String, PredicateInfo)>,
    /// Enables the revocable variant
    pub revocation: Option<RevocationOptions>,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        let mut values = CredentialValues::default();
        values.add_encoded("one", "oneval", "1");
        values.add_encoded("two", "twoval", "2");
        Self {
            issuer_did: DidValue::new("55GkHamhTU1ZbTbV2ab9DE"),
            schema_name: "schema_name".to_string(),
            schema_version: "1.0".to_string(),
            attributes: vec!["one".to_string(), "two".to_string()],
            schema_seq_no: 15,
            values,
            reveal: "one".to_string(),
            predicates: Vec::new(),
            revocation: None,
        }
    }
}

impl WorkflowConfig {
    /// The scenario with a default revocation registry
    pub fn with_revocation() -> Self {
        Self {
            revocation: Some(RevocationOptions::default()),
            ..Self::default()
        }
    }
}

impl Validatable for WorkflowConfig {
    fn validate(&self) -> CredxResult<()> {
        self.issuer_did.validate()?;
        if self.attributes.is_empty() {
            return Err(Error::InvalidInput(
                "workflow needs at least one attribute".to_string(),
            ));
        }
        if self.values.get(&self.reveal).is_none() {
            return Err(Error::InvalidInput(format!(
                "revealed attribute `{}` has no value",
                self.reveal
            )));
        }
        if let Some(rev) = &self.revocation {
            if rev.rev_idx == 0 || rev.rev_idx > rev.max_cred_num {
                return Err(Error::InvalidRevocationIndex(rev.rev_idx));
            }
        }
        Ok(())
    }
}

/// The artifacts of a scenario run
#[derive(Clone, Debug)]
pub struct WorkflowOutcome {
    /// The registered schema
    pub schema: Schema,
    /// The credential definition
    pub cred_def: CredentialDefinition,
    /// The registry definition, in the revocable variant
    pub rev_reg_def: Option<RevocationRegistryDefinition>,
    /// The holder's credential
    pub credential: ProcessedCredential,
    /// The verifier's request
    pub proof_request: ProofRequest,
    /// The holder's proof
    pub proof: Proof,
    /// The verification result
    pub verified: bool,
}

struct Registry {
    def: RevocationRegistryDefinition,
    registry: RevocationRegistry,
}

/// Run the scenario
pub fn run(config: &WorkflowConfig) -> CredxResult<WorkflowOutcome> {
    config.validate()?;
    info!(
        "workflow start: issuer {}, revocation {}",
        config.issuer_did,
        config.revocation.is_some()
    );

    let schema = Issuer::create_schema(
        &config.issuer_did,
        &config.schema_name,
        &config.schema_version,
        AttributeNames::from(config.attributes.clone()),
    )?
    .register(config.schema_seq_no);
    info!("schema {} registered as {}", schema.id, config.schema_seq_no);

    let (cred_def, cred_def_private, correctness_proof) = Issuer::create_credential_definition(
        &config.issuer_did,
        &schema,
        SignatureType::PS,
        DEFAULT_TAG,
        CredentialDefinitionConfig {
            support_revocation: config.revocation.is_some(),
        },
    )?;
    info!("credential definition {}", cred_def.id);

    let revocation = match &config.revocation {
        Some(options) => {
            let (def, registry, delta, key) = Issuer::create_revocation_registry(
                &config.issuer_did,
                &cred_def,
                RegistryType::VbAccum,
                DEFAULT_TAG,
                options.max_cred_num,
                options.issuance_type,
                options.tails_dir.as_deref(),
            )?;
            info!("revocation registry {}", def.id);
            Some((def, registry, delta, key))
        }
        None => None,
    };

    let offer = Issuer::create_credential_offer(&schema.id, &cred_def, &correctness_proof)?;
    let master_secret = Prover::create_master_secret()?;
    let (request, metadata) = Prover::create_credential_request(
        None,
        &cred_def,
        &master_secret,
        MASTER_SECRET_ID,
        &offer,
    )?;
    log_artifact("credential request metadata", &metadata);

    let (credential, registry, delta, tails_reader) = match &revocation {
        Some((def, registry, delta, key)) => {
            let options = config
                .revocation
                .as_ref()
                .ok_or(Error::General("revocation options missing"))?;
            let tails_reader = def.tails_reader()?;
            let (credential, updated, issued) = Issuer::create_credential(
                &cred_def,
                &cred_def_private,
                &offer,
                &request,
                &config.values,
                Some(CredentialRevocationConfig {
                    reg_def: def,
                    reg_def_private: key,
                    registry,
                    registry_idx: options.rev_idx,
                    tails_reader: &tails_reader,
                }),
            )?;
            let delta = match issued {
                Some(issued) => delta.merge(&issued)?,
                None => delta.clone(),
            };
            let registry = Registry {
                def: def.clone(),
                registry: updated.unwrap_or_else(|| registry.clone()),
            };
            (credential, Some(registry), Some(delta), Some(tails_reader))
        }
        None => {
            let (credential, _, _) = Issuer::create_credential(
                &cred_def,
                &cred_def_private,
                &offer,
                &request,
                &config.values,
                None,
            )?;
            (credential, None, None, None)
        }
    };
    info!("credential issued for {}", cred_def.id);

    let processed = Prover::process_credential(
        &credential,
        &metadata,
        &master_secret,
        &cred_def,
        registry.as_ref().map(|r| &r.def),
    )?;
    log_artifact("processed credential", &processed);

    let timestamp = chrono::Utc::now().timestamp().max(1) as u64;
    let mut proof_request = ProofRequest::new("proof", "1.0", Verifier::generate_nonce()?);
    proof_request
        .requested_attributes
        .insert(REVEALED_REFERENT.to_string(), AttributeInfo::named(&config.reveal));
    for (referent, info) in &config.predicates {
        proof_request
            .requested_predicates
            .insert(referent.clone(), info.clone());
    }
    if registry.is_some() {
        proof_request.non_revoked = Some(NonRevokedInterval {
            from: None,
            to: Some(timestamp),
        });
    }
    log_artifact("proof request", &proof_request);

    let proof_timestamp = registry.as_ref().map(|_| timestamp);
    let mut requested_credentials = RequestedCredentials::default();
    requested_credentials.add_requested_attribute(
        REVEALED_REFERENT,
        CREDENTIAL_ID,
        proof_timestamp,
        true,
    );
    for (referent, _) in &config.predicates {
        requested_credentials.add_requested_predicate(
            referent.as_str(),
            CREDENTIAL_ID,
            proof_timestamp,
        );
    }

    let mut rev_states = RevocationStates::new();
    if let (Some(reg), Some(delta), Some(tails_reader), Some(options)) =
        (&registry, &delta, &tails_reader, &config.revocation)
    {
        let state = Prover::create_or_update_revocation_state(
            tails_reader,
            &reg.def,
            delta,
            options.rev_idx,
            timestamp,
            None,
        )?;
        rev_states.insert(reg.def.id.clone(), hashmap! { timestamp => state });
    }

    let proof = Prover::create_proof(
        &proof_request,
        &hashmap! { CREDENTIAL_ID.to_string() => processed.clone() },
        &requested_credentials,
        &master_secret,
        &hashmap! { schema.id.clone() => &schema },
        &hashmap! { cred_def.id.clone() => &cred_def },
        &rev_states,
    )?;
    log_artifact("proof", &proof);

    let mut rev_reg_defs = HashMap::new();
    let mut rev_regs: HashMap<RevocationRegistryId, HashMap<u64, &RevocationRegistry>> =
        HashMap::new();
    if let Some(reg) = &registry {
        rev_reg_defs.insert(reg.def.id.clone(), &reg.def);
        rev_regs.insert(reg.def.id.clone(), hashmap! { timestamp => &reg.registry });
    }
    let verified = Verifier::verify_proof(
        &proof,
        &proof_request,
        &hashmap! { schema.id.clone() => &schema },
        &hashmap! { cred_def.id.clone() => &cred_def },
        &rev_reg_defs,
        &rev_regs,
    )?;
    info!("workflow finished: verified {}", verified);

    Ok(WorkflowOutcome {
        schema,
        cred_def,
        rev_reg_def: registry.map(|r| r.def),
        credential: processed,
        proof_request,
        proof,
        verified,
    })
}

/// Shared inputs for issuing many non-revocable credentials
#[derive(Clone, Debug)]
pub struct IssuanceFixture {
    /// The credential definition
    pub cred_def: CredentialDefinition,
    cred_def_private: CredentialDefinitionPrivate,
    /// The offer every credential answers
    pub offer: CredentialOffer,
    /// The holder's request
    pub request: CredentialRequest,
    /// The values signed into each credential
    pub values: CredentialValues,
}

impl IssuanceFixture {
    /// Prepare a credential definition, offer and request from `config`.
    ///
    /// Revocation options are ignored.
    pub fn new(config: &WorkflowConfig) -> CredxResult<Self> {
        config.validate()?;
        let schema = Issuer::create_schema(
            &config.issuer_did,
            &config.schema_name,
            &config.schema_version,
            AttributeNames::from(config.attributes.clone()),
        )?
        .register(config.schema_seq_no);
        let (cred_def, cred_def_private, correctness_proof) =
            Issuer::create_credential_definition(
                &config.issuer_did,
                &schema,
                SignatureType::PS,
                DEFAULT_TAG,
                CredentialDefinitionConfig::default(),
            )?;
        let offer = Issuer::create_credential_offer(&schema.id, &cred_def, &correctness_proof)?;
        let master_secret = MasterSecret::new();
        let (request, _) = Prover::create_credential_request(
            None,
            &cred_def,
            &master_secret,
            MASTER_SECRET_ID,
            &offer,
        )?;
        Ok(Self {
            cred_def,
            cred_def_private,
            offer,
            request,
            values: config.values.clone(),
        })
    }

    /// Sign one credential
    pub fn issue(&self) -> CredxResult<Credential> {
        let (credential, _, _) = Issuer::create_credential(
            &self.cred_def,
            &self.cred_def_private,
            &self.offer,
            &self.request,
            &self.values,
            None,
        )?;
        Ok(credential)
    }
}
