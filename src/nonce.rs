use crate::error::Error;
use crate::knox::Knox;
use crate::utils::Validatable;
use crate::CredxResult;
use blsful::inner_types::Scalar;
use rand_core::{CryptoRng, OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

const NONCE_BYTES: usize = 10;
const SALT: &[u8] = b"credx nonce";

/// An 80-bit random number rendered in decimal
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Nonce(String);

impl Nonce {
    /// Draw a fresh nonce from the operating system rng
    pub fn new() -> Self {
        Self::random(OsRng)
    }

    /// Draw a fresh nonce from `rng`
    pub fn random(mut rng: impl RngCore + CryptoRng) -> Self {
        let mut bytes = [0u8; 16];
        rng.fill_bytes(&mut bytes[16 - NONCE_BYTES..]);
        Self(u128::from_be_bytes(bytes).to_string())
    }

    /// Parse a decimal nonce
    pub fn from_dec<S: Into<String>>(value: S) -> CredxResult<Self> {
        let nonce = Self(value.into());
        nonce.validate()?;
        Ok(nonce)
    }

    /// The decimal string
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The value bound into proof transcripts
    pub fn to_scalar(&self) -> Scalar {
        Knox::hash_to_scalar(SALT, self.0.as_bytes())
    }
}

impl Default for Nonce {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for Nonce {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Validatable for Nonce {
    fn validate(&self) -> CredxResult<()> {
        if self.0.is_empty() || !self.0.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!(
                "nonce `{}` is not a decimal number",
                self.0
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nonces_are_decimal_and_distinct() {
        let a = Nonce::new();
        let b = Nonce::new();
        assert!(a.validate().is_ok());
        assert_ne!(a, b);
        assert!(a.as_str().parse::<u128>().unwrap() < 1u128 << 80);
        assert_ne!(a.to_scalar(), b.to_scalar());
    }

    #[test]
    fn parse() {
        assert!(Nonce::from_dec("123456").is_ok());
        assert!(Nonce::from_dec("12a").is_err());
        assert!(Nonce::from_dec("").is_err());
    }
}
