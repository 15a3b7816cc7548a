/// Commitment builder
pub mod proof_committed_builder;
/// Proof message types
pub mod proof_message;

pub use proof_committed_builder::*;
pub use proof_message::*;
