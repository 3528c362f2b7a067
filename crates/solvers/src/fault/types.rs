//! The types module contains the types relevant to solving a fault dispute game.

use ethers::types::Bytes;
use serde::Serialize;

pub use op_dispute_primitives::{Claim, ClaimData, Clock, Position};

/// A [Response] is an action taken by a participant in the dispute game in response to
/// a claim made by another participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Response {
    /// Do nothing.
    DoNothing,
    /// Create a counter claim against the parent claim. The flag is `true` for an attack.
    Move(bool, Claim),
    /// Perform a VM step against the parent claim, with the attack flag, the pre-state
    /// preimage and the proof.
    Step(bool, Bytes, Bytes),
}
