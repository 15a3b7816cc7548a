use super::PublicKey;
use blsful::inner_types::{multi_miller_loop, G1Projective, G2Affine, G2Prepared, MillerLoopResult, PrimeCurveAffine, G2Projective, Scalar};
use elliptic_curve::group::{Curve, Group};
use serde::{Deserialize, Serialize};
use sha3::digest::{ExtendableOutput, Update, XofReader};
use std::iter::once;

/// An unblinded Pointcheval Sanders signature held by the credential owner
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    pub(crate) sigma_1: G1Projective,
    pub(crate) sigma_2: G1Projective,
    pub(crate) m_tick: Scalar,
}

impl Signature {
    /// Check `e(sigma_1, X + W * m' + Σ Y_i * m_i) == e(sigma_2, g2)`
    /// where `msgs` covers every slot of `pk`
    pub fn verify(&self, pk: &PublicKey, msgs: &[Scalar]) -> bool {
        if pk.y.len() != msgs.len() || !pk.is_valid() {
            return false;
        }
        if bool::from(self.sigma_1.is_identity() | self.sigma_2.is_identity()) {
            return false;
        }

        let points = once(pk.x)
            .chain(once(pk.w))
            .chain(pk.y.iter().copied())
            .collect::<Vec<G2Projective>>();
        let scalars = once(Scalar::ONE)
            .chain(once(self.m_tick))
            .chain(msgs.iter().copied())
            .collect::<Vec<Scalar>>();
        let y_m = G2Projective::sum_of_products(&points, &scalars);

        multi_miller_loop(&[
            (&self.sigma_1.to_affine(), &G2Prepared::from(y_m.to_affine())),
            (&self.sigma_2.to_affine(), &G2Prepared::from(-G2Affine::generator())),
        ])
        .final_exponentiation()
        .is_identity()
        .into()
    }

    /// `m'`, a hash of the messages the signer saw in the clear
    pub(crate) fn compute_m_tick(msgs: &[Scalar]) -> Scalar {
        let mut hasher = sha3::Shake256::default();
        msgs.iter().for_each(|m| hasher.update(&m.to_be_bytes()));
        let mut out = [0u8; 64];
        hasher.finalize_xof().read(&mut out);
        Scalar::from_bytes_wide(&out)
    }
}
