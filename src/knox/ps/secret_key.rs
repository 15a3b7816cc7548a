use super::PublicKey;
use crate::error::Error;
use crate::CredxResult;
use blsful::inner_types::Scalar;
use elliptic_curve::Field;
use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// The signing half of a credential definition key: `x`, `w` for the
/// signature's `m'`, and one `y_i` per message slot.
/// See section 4.2 of <https://eprint.iacr.org/2017/1197.pdf>.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize, Zeroize)]
#[zeroize(drop)]
pub struct SecretKey {
    pub(crate) w: Scalar,
    pub(crate) x: Scalar,
    pub(crate) y: Vec<Scalar>,
}

impl SecretKey {
    /// Upper bound on message slots per key
    pub const MAX_MESSAGES: usize = 128;

    /// Sample a key for `count` message slots
    pub fn random(count: usize, mut rng: impl RngCore + CryptoRng) -> CredxResult<Self> {
        if count == 0 || count > Self::MAX_MESSAGES {
            return Err(Error::InvalidInput(format!(
                "a key signs between 1 and {} messages, not {}",
                Self::MAX_MESSAGES,
                count
            )));
        }
        Ok(Self {
            w: Scalar::random(&mut rng),
            x: Scalar::random(&mut rng),
            y: (0..count).map(|_| Scalar::random(&mut rng)).collect(),
        })
    }

    /// Sample a key and derive its public half
    pub fn keypair(
        count: usize,
        rng: impl RngCore + CryptoRng,
    ) -> CredxResult<(PublicKey, Self)> {
        let sk = Self::random(count, rng)?;
        Ok((sk.public_key(), sk))
    }

    /// Derive the matching public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from(self)
    }

    /// No exponent is zero
    pub fn is_valid(&self) -> bool {
        let zero = self
            .y
            .iter()
            .fold(self.w.is_zero() | self.x.is_zero(), |acc, y| acc | y.is_zero());
        !bool::from(zero)
    }
}
