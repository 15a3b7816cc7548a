/// Accumulator methods
pub mod accumulator;
/// Pointcheval Sanders signatures
pub mod ps;
/// Operations for short group signatures
pub mod short_group_sig_core;

use blsful::inner_types::Scalar;
use sha3::digest::{ExtendableOutput, Update, XofReader};

/// General purpose crypto operations
pub struct Knox {}

impl Knox {
    /// Hash arbitrary bytes to a scalar under a domain separation salt
    pub fn hash_to_scalar(salt: &[u8], data: &[u8]) -> Scalar {
        let mut okm = [0u8; 64];
        let mut r = sha3::Shake256::default()
            .chain(salt)
            .chain(data)
            .finalize_xof();
        r.read(&mut okm);
        Scalar::from_bytes_wide(&okm)
    }

    /// Read a 64 byte challenge out of a transcript and reduce it to a scalar
    pub fn transcript_challenge(label: &'static [u8], transcript: &mut merlin::Transcript) -> Scalar {
        let mut okm = [0u8; 64];
        transcript.challenge_bytes(label, &mut okm);
        Scalar::from_bytes_wide(&okm)
    }
}
