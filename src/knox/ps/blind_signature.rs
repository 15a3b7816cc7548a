use super::{SecretKey, Signature};
use crate::error::Error;
use crate::CredxResult;
use blsful::inner_types::{G1Projective, Scalar};
use elliptic_curve::Field;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

/// A signature over a holder commitment that still carries the holder's
/// blinding factor. Only [`BlindSignature::to_unblinded`] turns it into
/// a usable [`Signature`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct BlindSignature(pub(crate) Signature);

impl BlindSignature {
    /// Sign `known` messages on top of `commitment`, which already holds
    /// the hidden slots plus `g1 * blinding`.
    ///
    /// `sigma_2 = (g1 * (x + w * m' + Σ y_i * m_i) + commitment) * u`
    pub(crate) fn sign_commitment(
        commitment: G1Projective,
        sk: &SecretKey,
        known: &[(usize, Scalar)],
        mut rng: impl RngCore + CryptoRng,
    ) -> CredxResult<Self> {
        if !sk.is_valid() || known.iter().any(|(i, _)| *i >= sk.y.len()) {
            return Err(Error::InvalidSigningOperation);
        }
        let values = known.iter().map(|(_, m)| *m).collect::<Vec<Scalar>>();
        let m_tick = Signature::compute_m_tick(&values);
        let exponent = known
            .iter()
            .fold(sk.x + sk.w * m_tick, |acc, (i, m)| acc + sk.y[*i] * m);

        let u = Scalar::random(&mut rng);
        Ok(Self(Signature {
            sigma_1: G1Projective::GENERATOR * u,
            sigma_2: (G1Projective::GENERATOR * exponent + commitment) * u,
            m_tick,
        }))
    }

    /// Strip the holder's blinding: `sigma_2 - sigma_1 * blinding`
    pub fn to_unblinded(self, blinding: Scalar) -> Signature {
        let Signature {
            sigma_1,
            sigma_2,
            m_tick,
        } = self.0;
        Signature {
            sigma_1,
            sigma_2: sigma_2 - sigma_1 * blinding,
            m_tick,
        }
    }
}
