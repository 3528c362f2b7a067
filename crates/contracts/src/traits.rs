//! Capability traits for the external collaborators of the fault dispute game.

use crate::{alphabet::VmError, preimage::PreimageOracleError};
use ethers::types::{Address, H256};
use std::{fmt::Debug, sync::Arc};

/// The [BigStepper] trait defines the interface of a deterministic one-step VM used to settle
/// disputes at the leaves of the game tree.
pub trait BigStepper: Debug + Send + Sync {
    /// Executes a single instruction on top of `state_data` and returns the commitment to the
    /// resulting state.
    ///
    /// ### Takes
    /// - `state_data`: The preimage of the pre-state claim.
    /// - `proof`: The witness data needed to execute the instruction.
    /// - `local_context`: The context that namespaces local preimage data for this step.
    ///
    /// ### Returns
    /// - `Ok(H256)`: The post-state claim.
    /// - `Err(VmError)`: The state or proof could not be interpreted.
    fn step(&self, state_data: &[u8], proof: &[u8], local_context: H256) -> Result<H256, VmError>;

    /// Returns the preimage oracle that the VM reads from.
    fn oracle(&self) -> Arc<dyn PreimageOracle>;
}

/// The [PreimageOracle] trait defines the interface of a key-value store of preimage parts.
pub trait PreimageOracle: Debug + Send + Sync {
    /// Stores a part of a local preimage, namespaced by `caller` and `local_context`.
    ///
    /// ### Returns
    /// - `Ok(H256)`: The localized key the part was stored under.
    /// - `Err(PreimageOracleError)`: The part offset or size was out of bounds.
    fn load_local_data(
        &self,
        caller: Address,
        ident: u64,
        local_context: H256,
        word: H256,
        size: u64,
        part_offset: u64,
    ) -> Result<H256, PreimageOracleError>;

    /// Reads the 32-byte part stored at `offset` under `key`, along with the number of
    /// meaningful bytes in it.
    fn read_preimage(&self, key: H256, offset: u64) -> Result<(H256, u64), PreimageOracleError>;
}
