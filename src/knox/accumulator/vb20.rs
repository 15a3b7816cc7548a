/// Accumulator elements
mod accumulator;
/// Signing and Verification keys
mod key;
/// Proofs of inclusion
mod proof;
/// Witnesses
mod witness;

pub use accumulator::*;
pub use key::*;
pub use proof::*;
pub use witness::*;

use blsful::inner_types::Scalar;

/// Salt used for hashing values into the accumulator
/// Giuseppe Vitto, Alex Biryukov = VB
/// Accumulator = ACC
const SALT: &[u8] = b"VB-ACC-HASH-SALT-";

/// Coefficients of the polynomial ∏ (x + root), lowest degree first
pub(crate) fn coefficients_from_roots(roots: &[Scalar]) -> Vec<Scalar> {
    let mut coefficients = Vec::with_capacity(roots.len() + 1);
    coefficients.push(Scalar::ONE);
    for root in roots {
        coefficients.push(Scalar::ZERO);
        for k in (1..coefficients.len()).rev() {
            let lower = coefficients[k - 1];
            coefficients[k] = coefficients[k] * root + lower;
        }
        coefficients[0] *= root;
    }
    coefficients
}
