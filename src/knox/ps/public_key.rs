use super::SecretKey;
use blsful::inner_types::{G1Projective, G2Projective};
use elliptic_curve::group::Group;
use serde::{Deserialize, Serialize};

/// The verification half of a credential definition key.
///
/// Message slot `i` is checked against `y[i]` in G2 and blinded by the
/// holder with `y_blinds[i]` in G1. `w` covers the signature's `m'`.
/// See section 4.2 of <https://eprint.iacr.org/2017/1197.pdf>.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
pub struct PublicKey {
    /// `g2 * w`
    pub w: G2Projective,
    /// `g2 * x`
    pub x: G2Projective,
    /// `g2 * y_i` per message slot
    pub y: Vec<G2Projective>,
    /// `g1 * y_i` per message slot
    pub y_blinds: Vec<G1Projective>,
}

impl From<&SecretKey> for PublicKey {
    fn from(sk: &SecretKey) -> Self {
        Self {
            w: G2Projective::GENERATOR * sk.w,
            x: G2Projective::GENERATOR * sk.x,
            y: sk.y.iter().map(|y| G2Projective::GENERATOR * y).collect(),
            y_blinds: sk.y.iter().map(|y| G1Projective::GENERATOR * y).collect(),
        }
    }
}

impl PublicKey {
    /// The number of message slots
    pub fn message_count(&self) -> usize {
        self.y.len()
    }

    /// Every slot has both generators and none of them is the identity
    pub fn is_valid(&self) -> bool {
        self.y.len() == self.y_blinds.len()
            && !bool::from(self.w.is_identity() | self.x.is_identity())
            && !self.y.iter().any(|y| bool::from(y.is_identity()))
            && !self.y_blinds.iter().any(|y| bool::from(y.is_identity()))
    }
}
