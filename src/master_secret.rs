use blsful::inner_types::Scalar;
use elliptic_curve::Field;
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

/// The holder's link secret, hidden in every credential it holds
#[derive(Clone, Debug, Serialize, Deserialize, Zeroize)]
#[zeroize(drop)]
pub struct MasterSecret {
    value: Scalar,
}

impl MasterSecret {
    /// Create a new random master secret
    pub fn new() -> Self {
        Self {
            value: Scalar::random(OsRng),
        }
    }

    pub(crate) fn value(&self) -> Scalar {
        self.value
    }
}

impl Default for MasterSecret {
    fn default() -> Self {
        Self::new()
    }
}
