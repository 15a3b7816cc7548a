use crate::error::Error;
use crate::identifiers::RevocationRegistryId;
use crate::knox::accumulator::vb20::{Accumulator, Element, MembershipWitness};
use crate::revocation_registry::{RevocationRegistryDefinition, RevocationRegistryDelta};
use crate::tails::TailsReader;
use crate::utils::Validatable;
use crate::CredxResult;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// A holder's membership witness for one registry state
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RevocationState {
    /// The witness for the holder's element
    pub witness: MembershipWitness,
    /// The accumulator the witness was computed against
    pub rev_reg: Accumulator,
    /// Slots accumulated in that state
    pub accumulated: BTreeSet<u32>,
    /// The holder's slot
    pub rev_idx: u32,
    /// When the registry was in this state
    pub timestamp: u64,
}

/// Revocation states keyed by registry id then timestamp
pub type RevocationStates = HashMap<RevocationRegistryId, HashMap<u64, RevocationState>>;

impl RevocationState {
    /// Compute the witness for `rev_idx` after `delta`.
    ///
    /// Without `prior` the delta must start at registry creation.
    pub fn create(
        tails_reader: &TailsReader,
        rev_reg_def: &RevocationRegistryDefinition,
        delta: &RevocationRegistryDelta,
        rev_idx: u32,
        timestamp: u64,
        prior: Option<&RevocationState>,
    ) -> CredxResult<Self> {
        trace!(
            "create revocation state >>> rev_reg_def: {}, rev_idx: {}, timestamp: {}",
            rev_reg_def.id,
            rev_idx,
            timestamp
        );
        rev_reg_def.check_index(rev_idx)?;
        let accumulated = match (prior, delta.prev_accum) {
            (_, None) => delta.apply(&BTreeSet::new()),
            (Some(prior), Some(prev)) if prev == prior.rev_reg => {
                if prior.rev_idx != rev_idx {
                    return Err(Error::InvalidInput(format!(
                        "prior revocation state is for index {}, not {}",
                        prior.rev_idx, rev_idx
                    )));
                }
                delta.apply(&prior.accumulated)
            }
            (Some(_), Some(_)) => {
                return Err(Error::InvalidInput(
                    "revocation delta does not continue from the prior state".to_string(),
                ))
            }
            (None, Some(_)) => {
                return Err(Error::InvalidInput(
                    "a revocation state without a prior state needs a complete delta".to_string(),
                ))
            }
        };
        if !accumulated.contains(&rev_idx) {
            return Err(Error::CredentialRevoked);
        }

        let others = accumulated
            .iter()
            .filter(|i| **i != rev_idx)
            .map(|i| rev_reg_def.element(*i))
            .collect::<Vec<Element>>();
        let witness = MembershipWitness::from_powers(&others, tails_reader.powers())?;
        if !witness.verify(
            rev_reg_def.element(rev_idx),
            rev_reg_def.value.public_keys.accum_key,
            delta.accum,
        ) {
            return Err(Error::InvalidInput(
                "revocation delta does not match the tails file".to_string(),
            ));
        }
        debug!(
            "revocation state for index {} at {} covers {} slots",
            rev_idx,
            timestamp,
            accumulated.len()
        );

        let state = Self {
            witness,
            rev_reg: delta.accum,
            accumulated,
            rev_idx,
            timestamp,
        };
        state.validate()?;
        Ok(state)
    }
}

impl Validatable for RevocationState {
    fn validate(&self) -> CredxResult<()> {
        if self.timestamp == 0 {
            return Err(Error::InvalidInput(
                "revocation state `timestamp` must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
