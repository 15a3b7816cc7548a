mod blind_signature;
mod blind_signature_context;
mod key_correctness_proof;
mod pok_signature;
mod pok_signature_proof;
mod public_key;
mod secret_key;
mod signature;

pub use blind_signature::*;
pub use blind_signature_context::*;
pub use key_correctness_proof::*;
pub use pok_signature::*;
pub use pok_signature_proof::*;
pub use public_key::*;
pub use secret_key::*;
pub use signature::*;
