use super::{FaultDisputeGame, FaultGameError, ImmutableArgs};
use crate::BigStepper;
use ethers::types::Address;
use op_dispute_primitives::Claim;
use std::sync::Arc;

/// The largest supported maximum game depth. Step positions live one level below it and must
/// still fit a `u128` generalized index.
pub const MAX_GAME_DEPTH_LIMIT: u64 = 125;

/// The constructor parameters shared by every proxy of a fault game implementation.
#[derive(Debug, Clone)]
pub struct FaultGameConfig {
    /// The claim committing to the VM state before the first instruction.
    pub absolute_prestate: Claim,
    /// The depth of the leaves of the game tree.
    pub max_game_depth: u64,
    /// The total chess clock of the game, in seconds. Each side gets half.
    pub game_duration: u64,
    /// The chain id of the disputed L2.
    pub l2_chain_id: u64,
    /// The VM that settles disputes at the leaves.
    pub vm: Arc<dyn BigStepper>,
}

/// A deployed fault game implementation that the factory clones into proxies.
#[derive(Debug, Clone)]
pub struct FaultGameImplementation {
    /// The address of the implementation.
    pub address: Address,
    /// The configuration shared by all of its proxies.
    pub config: Arc<FaultGameConfig>,
}

impl FaultGameImplementation {
    /// Deploys a new implementation at `address`.
    pub fn new(address: Address, config: FaultGameConfig) -> Result<Self, FaultGameError> {
        if config.max_game_depth > MAX_GAME_DEPTH_LIMIT {
            return Err(FaultGameError::MaxDepthTooLarge(config.max_game_depth));
        }
        Ok(Self {
            address,
            config: Arc::new(config),
        })
    }

    /// Clones the implementation into an uninitialized proxy at `proxy`, decoding its
    /// ABI-encoded [ImmutableArgs].
    pub fn clone_with(
        &self,
        proxy: Address,
        immutable_args: &[u8],
    ) -> Result<FaultDisputeGame, FaultGameError> {
        let args = ImmutableArgs::abi_decode(immutable_args)?;
        Ok(FaultDisputeGame::new(proxy, Arc::clone(&self.config), args))
    }
}
