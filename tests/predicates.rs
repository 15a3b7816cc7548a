mod util;

use credx_harness::prelude::*;
use std::collections::HashMap;
use util::*;

macro_rules! predicate_test_with {
    ($name:ident, $p_type:expr, $p_value:expr, $expected_to_fail:expr) => {
        #[test]
        fn $name() {
            setup();
            let res = test_age_predicate($p_type, $p_value, $expected_to_fail);
            assert!(res.is_ok(), "{:?}", res);
        }
    };
}

// age is 28
predicate_test_with!(ge_18, PredicateType::GE, 18, false);
predicate_test_with!(ge_28, PredicateType::GE, 28, false);
predicate_test_with!(gt_27, PredicateType::GT, 27, false);
predicate_test_with!(le_28, PredicateType::LE, 28, false);
predicate_test_with!(lt_65, PredicateType::LT, 65, false);
predicate_test_with!(ge_negative, PredicateType::GE, -5, false);

predicate_test_with!(ge_30, PredicateType::GE, 30, true);
predicate_test_with!(gt_28, PredicateType::GT, 28, true);
predicate_test_with!(le_27, PredicateType::LE, 27, true);
predicate_test_with!(lt_28, PredicateType::LT, 28, true);

fn test_age_predicate(p_type: PredicateType, p_value: i32, expected_to_fail: bool) -> CredxResult<()> {
    let mut issuer = IssuerSetup::new(None)?;
    let master_secret = Prover::create_master_secret()?;
    let credential = issuer.issue(&master_secret, &gvt_values(), None)?;

    let mut proof_req = name_request();
    proof_req.requested_predicates.insert(
        "predicate1_referent".to_string(),
        PredicateInfo::new("age", p_type, p_value),
    );
    let mut requested = RequestedCredentials::default();
    requested.add_requested_attribute("attr1_referent", "cred1", None, true);
    requested.add_requested_predicate("predicate1_referent", "cred1", None);

    let res = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &requested,
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    );
    if expected_to_fail {
        assert!(
            matches!(res, Err(Error::PredicateNotSatisfied(_))),
            "{:?}",
            res.map(|_| ())
        );
        return Ok(());
    }
    let proof = res?;
    assert!(proof
        .requested_proof
        .predicates
        .contains_key("predicate1_referent"));
    assert_eq!(proof.proof.sub_proofs[0].predicates.len(), 1);
    assert!(Verifier::verify_proof(
        &proof,
        &proof_req,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )?);
    Ok(())
}

#[test]
fn verifier_bound_is_bound_into_the_proof() {
    setup();
    let res = test_verifier_bound();
    assert!(res.is_ok(), "{:?}", res);
}

fn test_verifier_bound() -> CredxResult<()> {
    let mut issuer = IssuerSetup::new(None)?;
    let master_secret = Prover::create_master_secret()?;
    let credential = issuer.issue(&master_secret, &gvt_values(), None)?;

    let mut proof_req = ProofRequest::new("proof", "1.0", Verifier::generate_nonce()?);
    proof_req.requested_predicates.insert(
        "adult".to_string(),
        PredicateInfo::new("age", PredicateType::GE, 18),
    );
    proof_req.requested_predicates.insert(
        "tall".to_string(),
        PredicateInfo::new("height", PredicateType::GT, 150),
    );
    let mut requested = RequestedCredentials::default();
    requested.add_requested_predicate("adult", "cred1", None);
    requested.add_requested_predicate("tall", "cred1", None);
    let proof = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &requested,
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    )?;
    assert!(Verifier::verify_proof(
        &proof,
        &proof_req,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )?);

    // the verifier asks for a stricter bound than the prover proved
    let mut stricter = proof_req.clone();
    if let Some(info) = stricter.requested_predicates.get_mut("adult") {
        info.p_value = 21;
    }
    assert!(!Verifier::verify_proof(
        &proof,
        &stricter,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )?);

    // a predicate the proof does not answer
    let mut extra = proof_req.clone();
    extra.requested_predicates.insert(
        "old".to_string(),
        PredicateInfo::new("age", PredicateType::GE, 65),
    );
    assert!(Verifier::verify_proof(
        &proof,
        &extra,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &HashMap::new(),
        &no_rev_regs(),
    )
    .is_err());
    Ok(())
}

#[test]
fn revealed_attribute_cannot_be_a_predicate() {
    setup();
    let mut issuer = IssuerSetup::new(None).unwrap();
    let master_secret = MasterSecret::new();
    let credential = issuer.issue(&master_secret, &gvt_values(), None).unwrap();

    let mut proof_req = ProofRequest::new("proof", "1.0", Verifier::generate_nonce().unwrap());
    proof_req
        .requested_attributes
        .insert("age_referent".to_string(), AttributeInfo::named("age"));
    proof_req.requested_predicates.insert(
        "adult".to_string(),
        PredicateInfo::new("age", PredicateType::GE, 18),
    );
    let mut requested = RequestedCredentials::default();
    requested.add_requested_attribute("age_referent", "cred1", None, true);
    requested.add_requested_predicate("adult", "cred1", None);
    let res = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &requested,
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    );
    assert!(res.is_err());
}

#[test]
fn non_numeric_attribute_predicate_rejected() {
    setup();
    let mut issuer = IssuerSetup::new(None).unwrap();
    let master_secret = MasterSecret::new();
    let credential = issuer.issue(&master_secret, &gvt_values(), None).unwrap();

    let mut proof_req = ProofRequest::new("proof", "1.0", Verifier::generate_nonce().unwrap());
    proof_req.requested_predicates.insert(
        "named".to_string(),
        PredicateInfo::new("name", PredicateType::GE, 1),
    );
    let mut requested = RequestedCredentials::default();
    requested.add_requested_predicate("named", "cred1", None);
    let res = Prover::create_proof(
        &proof_req,
        &credentials(&credential),
        &requested,
        &master_secret,
        &issuer.schemas(),
        &issuer.cred_defs(),
        &RevocationStates::new(),
    );
    assert!(res.is_err());
}
