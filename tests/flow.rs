mod util;

use credx_harness::prelude::*;
use credx_harness::workflow;
use maplit::hashmap;
use std::collections::HashMap;
use util::*;

#[test]
fn literal_scenario() {
    setup();
    let res = test_literal_scenario();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_literal_scenario() -> CredxResult<()> {
    let outcome = workflow::run(&WorkflowConfig::default())?;
    assert!(outcome.verified);
    assert_eq!(
        outcome.schema.id,
        SchemaId::from("55GkHamhTU1ZbTbV2ab9DE:2:schema_name:1.0")
    );
    assert_eq!(outcome.schema.seq_no(), Some(15));
    assert_eq!(
        outcome.cred_def.id,
        CredentialDefinitionId::from("55GkHamhTU1ZbTbV2ab9DE:3:PS:15:default")
    );
    let revealed = &outcome.proof.requested_proof.revealed_attrs[workflow::REVEALED_REFERENT];
    assert_eq!(revealed.raw, "oneval");
    assert_eq!(revealed.encoded, "1");
    assert!(outcome.rev_reg_def.is_none());
    Ok(())
}

#[test]
fn literal_scenario_with_revocation() {
    setup();
    let res = workflow::run(&WorkflowConfig::with_revocation());
    assert!(res.is_ok(), "{:?}", res);
    let outcome = res.unwrap();
    assert!(outcome.verified);
    assert!(outcome.rev_reg_def.is_some());
    assert!(outcome.proof.identifiers[0].timestamp.is_some());
}

#[test]
fn literal_scenario_on_demand() {
    setup();
    let mut config = WorkflowConfig::with_revocation();
    if let Some(rev) = config.revocation.as_mut() {
        rev.issuance_type = IssuanceType::IssuanceOnDemand;
        rev.max_cred_num = 5;
        rev.rev_idx = 3;
    }
    let res = workflow::run(&config);
    assert!(res.is_ok(), "{:?}", res);
    assert!(res.unwrap().verified);
}

#[test]
fn workflow_fails_fast_on_bad_config() {
    setup();
    let config = WorkflowConfig {
        reveal: "three".to_string(),
        ..WorkflowConfig::default()
    };
    assert!(workflow::run(&config).is_err());

    let mut config = WorkflowConfig::with_revocation();
    if let Some(rev) = config.revocation.as_mut() {
        rev.rev_idx = 101;
    }
    assert_eq!(
        workflow::run(&config).unwrap_err(),
        Error::InvalidRevocationIndex(101)
    );
}

#[test]
fn schema_id_is_deterministic() {
    setup();
    let did = DidValue::new("55GkHamhTU1ZbTbV2ab9DE");
    let attrs = AttributeNames::from(&["one", "two"][..]);
    let a = Issuer::create_schema(&did, "schema_name", "1.0", attrs.clone()).unwrap();
    let b = Issuer::create_schema(&did, "schema_name", "1.0", attrs.clone()).unwrap();
    let c = Issuer::create_schema(&did, "schema_name", "1.1", attrs).unwrap();
    assert_eq!(a.id, b.id);
    assert_ne!(a.id, c.id);
    assert_eq!(a.seq_no(), None);
    assert_eq!(a.register(7).seq_no(), Some(7));
}

#[test]
fn issuance_round_trip() {
    setup();
    let res = test_issuance_round_trip();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_issuance_round_trip() -> CredxResult<()> {
    let mut issuer = IssuerSetup::new(None)?;
    let master_secret = Prover::create_master_secret()?;
    let credential = issuer.issue(&master_secret, &gvt_values(), None)?;
    assert_eq!(credential.cred_def_id, issuer.cred_def.id);
    assert_eq!(credential.values.get("Age").map(|v| v.raw.as_str()), Some("28"));

    // a different master secret cannot unblind the credential
    let offer = Issuer::create_credential_offer(
        &issuer.schema.id,
        &issuer.cred_def,
        &issuer.correctness_proof,
    )?;
    let (request, metadata) =
        Prover::create_credential_request(None, &issuer.cred_def, &master_secret, "ms", &offer)?;
    let (credential, _, _) = Issuer::create_credential(
        &issuer.cred_def,
        &issuer.cred_def_private,
        &offer,
        &request,
        &gvt_values(),
        None,
    )?;
    let other = MasterSecret::new();
    assert!(
        Prover::process_credential(&credential, &metadata, &other, &issuer.cred_def, None).is_err()
    );
    Ok(())
}

#[test]
fn values_must_match_schema() {
    setup();
    let mut issuer = IssuerSetup::new(None).unwrap();
    let master_secret = MasterSecret::new();
    let mut values = gvt_values();
    values.0.shift_remove("height");
    assert!(issuer.issue(&master_secret, &values, None).is_err());
    values.add_raw("weight", "80");
    assert!(issuer.issue(&master_secret, &values, None).is_err());
}

#[test]
fn key_correctness_proof_is_checked() {
    setup();
    let issuer = IssuerSetup::new(None).unwrap();
    let other = IssuerSetup::new(None).unwrap();
    let mut offer = Issuer::create_credential_offer(
        &issuer.schema.id,
        &issuer.cred_def,
        &issuer.correctness_proof,
    )
    .unwrap();
    offer.key_correctness_proof = other.correctness_proof.clone();
    let res = Prover::create_credential_request(
        None,
        &issuer.cred_def,
        &MasterSecret::new(),
        "ms",
        &offer,
    );
    assert_eq!(res.unwrap_err(), Error::InvalidKeyCorrectnessProof);
}

#[test]
fn revealed_proof_verifies() {
    setup();
    let res = test_revealed_proof_verifies();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_revealed_proof_verifies() -> CredxResult<()> {
    let mut issuer = IssuerSetup::new(None)?;
    let master_secret = Prover::create_master_secret()?;
    let credential = issuer.issue(&master_secret, &gvt_values(), None)?;

    let mut proof_req = name_request();
    proof_req
        .requested_attributes
        .insert("attr2_referent".to_string(), AttributeInfo::named("sex"));
    let mut requested = RequestedCredentials::default();
    requested.add_requested_attribute("attr1_referent", "cred1", None, true);
    requested.add_requested_attribute("attr2_referent", "cred1", None, false);

    let proof = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &requested,
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    )?;
    assert_eq!(proof.proof.sub_proofs.len(), 1);
    assert_eq!(proof.requested_proof.revealed_attrs["attr1_referent"].raw, "Alex");
    assert!(proof.requested_proof.unrevealed_attrs.contains_key("attr2_referent"));

    let verified = Verifier::verify_proof(
        &proof,
        &proof_req,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )?;
    assert!(verified);

    // the proof survives serialization
    let json = serde_json::to_string(&proof)?;
    let decoded: Proof = serde_json::from_str(&json)?;
    assert!(Verifier::verify_proof(
        &decoded,
        &proof_req,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )?);
    Ok(())
}

#[test]
fn replaced_cred_def_fails_verification() {
    setup();
    let res = test_replaced_cred_def_fails_verification();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_replaced_cred_def_fails_verification() -> CredxResult<()> {
    let mut issuer = IssuerSetup::new(None)?;
    let other = IssuerSetup::new(None)?;
    let master_secret = Prover::create_master_secret()?;
    let credential = issuer.issue(&master_secret, &gvt_values(), None)?;
    let proof_req = name_request();
    let mut requested = RequestedCredentials::default();
    requested.add_requested_attribute("attr1_referent", "cred1", None, true);
    let proof = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &requested,
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    )?;

    let tampered = hashmap! { issuer.cred_def.id.clone() => &other.cred_def };
    let verified = Verifier::verify_proof(
        &proof,
        &proof_req,
        &issuer.schemas(),
        &tampered,
        &HashMap::new(),
        &no_rev_regs(),
    )?;
    assert!(!verified);

    // a different nonce in the request breaks the challenge
    let mut replayed = proof_req.clone();
    replayed.nonce = Verifier::generate_nonce()?;
    let verified = Verifier::verify_proof(
        &proof,
        &replayed,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )?;
    assert!(!verified);

    // a revealed value edited after proving is caught
    let mut edited = proof.clone();
    if let Some(info) = edited
        .requested_proof
        .revealed_attrs
        .get_mut("attr1_referent")
    {
        info.encoded = "12345".to_string();
    }
    assert!(Verifier::verify_proof(
        &edited,
        &proof_req,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )
    .is_err());
    Ok(())
}

#[test]
fn two_credentials_share_one_master_secret() {
    setup();
    let res = test_two_credentials();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_two_credentials() -> CredxResult<()> {
    let mut gvt = IssuerSetup::new(None)?;
    let mut other = IssuerSetup::with_tag("other", None)?;
    let master_secret = Prover::create_master_secret()?;
    let first = gvt.issue(&master_secret, &gvt_values(), None)?;
    let mut values = gvt_values();
    values.add_raw("name", "Sam");
    let second = other.issue(&master_secret, &values, None)?;

    let mut proof_req = name_request();
    proof_req
        .requested_attributes
        .insert("attr2_referent".to_string(), AttributeInfo::named("name"));
    let mut requested = RequestedCredentials::default();
    requested.add_requested_attribute("attr1_referent", "cred1", None, true);
    requested.add_requested_attribute("attr2_referent", "cred2", None, true);
    let creds = hashmap! {
        "cred1".to_string() => first,
        "cred2".to_string() => second,
    };
    let schemas = hashmap! { gvt.schema.id.clone() => &gvt.schema };
    let cred_defs = hashmap! {
        gvt.cred_def.id.clone() => &gvt.cred_def,
        other.cred_def.id.clone() => &other.cred_def,
    };
    let proof = Prover::create_proof(
        &proof_req,
        &creds,
        &requested,
        &master_secret,
        &schemas,
        &cred_defs,
        &RevocationStates::new(),
    )?;
    assert_eq!(proof.proof.sub_proofs.len(), 2);
    assert!(Verifier::verify_proof(
        &proof,
        &proof_req,
        &schemas,
        &cred_defs,
        &HashMap::new(),
        &no_rev_regs(),
    )?);
    Ok(())
}

#[test]
fn revealed_value_cannot_be_swapped_for_an_alias() {
    setup();
    let res = test_revealed_value_cannot_be_swapped_for_an_alias();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_revealed_value_cannot_be_swapped_for_an_alias() -> CredxResult<()> {
    let outcome = workflow::run(&WorkflowConfig::default())?;
    assert!(outcome.verified);

    // "1" shifted by 2^63 must not stand in for the signed "1"
    let alias = "9223372036854775809".to_string();
    let mut forged = outcome.proof.clone();
    if let Some(info) = forged
        .requested_proof
        .revealed_attrs
        .get_mut(workflow::REVEALED_REFERENT)
    {
        info.encoded = alias.clone();
    }
    for value in forged.proof.sub_proofs[0].revealed_attrs.values_mut() {
        if value.as_str() == "1" {
            *value = alias.clone();
        }
    }
    let schemas = hashmap! { outcome.schema.id.clone() => &outcome.schema };
    let cred_defs = hashmap! { outcome.cred_def.id.clone() => &outcome.cred_def };
    let res = Verifier::verify_proof(
        &forged,
        &outcome.proof_request,
        &schemas,
        &cred_defs,
        &HashMap::new(),
        &no_rev_regs(),
    );
    assert!(!matches!(res, Ok(true)));
    Ok(())
}
