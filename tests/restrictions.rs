mod util;

use credx_harness::prelude::*;
use serde_json::json;
use std::collections::HashMap;
use util::*;

fn restricted(name: &str, restrictions: serde_json::Value) -> AttributeInfo {
    AttributeInfo {
        restrictions: Some(serde_json::from_value(restrictions).unwrap()),
        ..AttributeInfo::named(name)
    }
}

fn prove_and_verify(
    issuer: &mut IssuerSetup,
    proof_req: &ProofRequest,
    requested: &RequestedCredentials,
) -> CredxResult<bool> {
    let master_secret = Prover::create_master_secret()?;
    let credential = issuer.issue(&master_secret, &gvt_values(), None)?;
    let proof = Prover::create_proof(
        proof_req,
        &credentials(&credential),
        requested,
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    )?;
    Verifier::verify_proof(
        &proof,
        proof_req,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )
}

fn revealed_name() -> RequestedCredentials {
    let mut requested = RequestedCredentials::default();
    requested.add_requested_attribute("attr1_referent", "cred1", None, true);
    requested
}

#[test]
fn restrictions_are_enforced() {
    setup();
    let res = test_restrictions_are_enforced();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_restrictions_are_enforced() -> CredxResult<()> {
    let mut issuer = IssuerSetup::new(None)?;
    let cred_def_id = issuer.cred_def.id.0.clone();
    let passing = [
        json!({"schema_name": "gvt"}),
        json!({"schema_name": "gvt", "schema_version": "1.0"}),
        json!({"issuer_did": ISSUER_DID.0}),
        json!({"cred_def_id": cred_def_id}),
        json!({"$or": [{"schema_name": "xyz"}, {"schema_issuer_did": ISSUER_DID.0}]}),
        json!({"schema_version": {"$in": ["0.9", "1.0"]}}),
        json!({"$not": {"schema_name": "xyz"}}),
        json!({"attr::name::value": "Alex"}),
        json!({"attr::name::marker": "1"}),
    ];
    for restriction in passing {
        let mut proof_req = ProofRequest::new("proof", "1.0", Verifier::generate_nonce()?);
        proof_req.requested_attributes.insert(
            "attr1_referent".to_string(),
            restricted("name", restriction.clone()),
        );
        let verified = prove_and_verify(&mut issuer, &proof_req, &revealed_name())?;
        assert!(verified, "{}", restriction);
    }

    let failing = [
        json!({"schema_name": "xyz"}),
        json!({"issuer_did": "4fUDR9R7fjwELRvH9JT6HH"}),
        json!({"schema_version": {"$neq": "1.0"}}),
        json!({"$and": [{"schema_name": "gvt"}, {"schema_version": "2.0"}]}),
        json!({"attr::name::value": "Bob"}),
        json!({"attr::height::value": "175"}),
        json!({"unknown_tag": "gvt"}),
    ];
    for restriction in failing {
        let mut proof_req = ProofRequest::new("proof", "1.0", Verifier::generate_nonce()?);
        proof_req.requested_attributes.insert(
            "attr1_referent".to_string(),
            restricted("name", restriction.clone()),
        );
        let res = prove_and_verify(&mut issuer, &proof_req, &revealed_name());
        assert!(
            matches!(res, Err(Error::InvalidPresentationData(_))),
            "{} gave {:?}",
            restriction,
            res
        );
    }
    Ok(())
}

#[test]
fn predicate_restrictions_are_enforced() {
    setup();
    let mut issuer = IssuerSetup::new(None).unwrap();
    let mut requested = RequestedCredentials::default();
    requested.add_requested_predicate("adult", "cred1", None);

    let mut proof_req = ProofRequest::new("proof", "1.0", Verifier::generate_nonce().unwrap());
    let mut predicate = PredicateInfo::new("age", PredicateType::GE, 18);
    predicate.restrictions = Some(serde_json::from_value(json!({"schema_name": "gvt"})).unwrap());
    proof_req
        .requested_predicates
        .insert("adult".to_string(), predicate.clone());
    let res = prove_and_verify(&mut issuer, &proof_req, &requested);
    assert_eq!(res, Ok(true));

    predicate.restrictions =
        Some(serde_json::from_value(json!({"schema_name": "other"})).unwrap());
    proof_req
        .requested_predicates
        .insert("adult".to_string(), predicate);
    let res = prove_and_verify(&mut issuer, &proof_req, &requested);
    assert!(res.is_err());
}

#[test]
fn self_attested_and_groups() {
    setup();
    let res = test_self_attested_and_groups();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_self_attested_and_groups() -> CredxResult<()> {
    let mut issuer = IssuerSetup::new(None)?;
    let mut proof_req = ProofRequest::new("proof", "1.0", Verifier::generate_nonce()?);
    proof_req.requested_attributes.insert(
        "phone".to_string(),
        AttributeInfo::named("phone"),
    );
    proof_req.requested_attributes.insert(
        "group".to_string(),
        AttributeInfo {
            names: Some(vec!["name".to_string(), "sex".to_string()]),
            restrictions: Some(serde_json::from_value(json!({"attr::sex::value": "male"}))?),
            ..AttributeInfo::default()
        },
    );
    let mut requested = RequestedCredentials::default();
    requested.add_self_attested("phone", "555-1234");
    requested.add_requested_attribute("group", "cred1", None, true);

    let master_secret = Prover::create_master_secret()?;
    let credential = issuer.issue(&master_secret, &gvt_values(), None)?;
    let proof = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &requested,
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    )?;
    assert_eq!(
        proof.requested_proof.self_attested_attrs.get("phone"),
        Some(&"555-1234".to_string())
    );
    let group = &proof.requested_proof.revealed_attr_groups["group"];
    assert_eq!(group.values["sex"].raw, "male");
    assert!(Verifier::verify_proof(
        &proof,
        &proof_req,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )?);

    // a self attested answer to a restricted referent is not accepted
    let mut restricted_req = proof_req.clone();
    restricted_req
        .requested_attributes
        .insert("phone".to_string(), restricted("phone", json!({"schema_name": "gvt"})));
    let res = Verifier::verify_proof(
        &proof,
        &restricted_req,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    );
    assert!(res.is_err());
    Ok(())
}

#[test]
fn missing_referents_rejected() {
    setup();
    let mut issuer = IssuerSetup::new(None).unwrap();
    let master_secret = MasterSecret::new();
    let credential = issuer.issue(&master_secret, &gvt_values(), None).unwrap();
    let proof_req = name_request();
    let proof = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &revealed_name(),
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    )
    .unwrap();

    let mut wider = proof_req.clone();
    wider
        .requested_attributes
        .insert("attr2_referent".to_string(), AttributeInfo::named("sex"));
    assert!(Verifier::verify_proof(
        &proof,
        &wider,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )
    .is_err());

    // unknown schema
    let res = Verifier::verify_proof(
        &proof,
        &proof_req,
        &HashMap::new(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    );
    assert!(res.is_err());
}

#[test]
fn missing_timestamp_rejected_under_interval() {
    setup();
    let mut issuer = IssuerSetup::new(None).unwrap();
    let master_secret = MasterSecret::new();
    let credential = issuer.issue(&master_secret, &gvt_values(), None).unwrap();
    let mut proof_req = name_request();
    let proof = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &revealed_name(),
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    )
    .unwrap();
    proof_req.non_revoked = Some(NonRevokedInterval {
        from: None,
        to: Some(100),
    });
    let res = Verifier::verify_proof(
        &proof,
        &proof_req,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    );
    assert!(matches!(res, Err(Error::InvalidPresentationData(_))));
}

#[test]
fn identifier_schema_must_match_cred_def() {
    setup();
    let res = test_identifier_schema_must_match_cred_def();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_identifier_schema_must_match_cred_def() -> CredxResult<()> {
    let mut issuer = IssuerSetup::new(None)?;
    let trusted = Issuer::create_schema(
        &ISSUER_DID,
        "trusted",
        "1.0",
        AttributeNames::from(&["name"][..]),
    )?
    .register(16);
    let master_secret = Prover::create_master_secret()?;
    let credential = issuer.issue(&master_secret, &gvt_values(), None)?;

    let mut proof_req = ProofRequest::new("proof", "1.0", Verifier::generate_nonce()?);
    proof_req.requested_attributes.insert(
        "attr1_referent".to_string(),
        restricted("name", json!({"schema_name": "trusted"})),
    );
    let mut proof = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &revealed_name(),
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    )?;
    proof.identifiers[0].schema_id = trusted.id.clone();

    let mut schemas = issuer.schemas();
    schemas.insert(trusted.id.clone(), &trusted);
    let res = Verifier::verify_proof(
        &proof,
        &proof_req,
        &schemas,
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    );
    assert!(matches!(res, Err(Error::InvalidPresentationData(_))), "{:?}", res);
    Ok(())
}
