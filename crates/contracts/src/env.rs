//! The `env` module contains the [Env] passed to every state-mutating contract call.

use ethers::types::{Address, H256, U256};
use std::fmt;

/// The number of most recent ancestors whose hashes are retrievable from the current block.
pub const BLOCK_HASH_WINDOW: u64 = 256;

/// The [BlockHashes] trait provides access to the hashes of historical L1 blocks.
pub trait BlockHashes {
    /// Returns the hash of the block with the given number, if it is known.
    fn block_hash(&self, number: u64) -> Option<H256>;
}

impl<F> BlockHashes for F
where
    F: Fn(u64) -> Option<H256>,
{
    fn block_hash(&self, number: u64) -> Option<H256> {
        self(number)
    }
}

/// The [Env] struct carries the context of a single call: who made it, the value attached to it
/// and the block it executes in. The clock is read once by the caller and forwarded here; the
/// contracts never read wall-clock time themselves.
#[derive(Clone, Copy)]
pub struct Env<'a> {
    /// The account making the call.
    pub caller: Address,
    /// The value attached to the call.
    pub value: U256,
    /// The number of the block the call executes in.
    pub block_number: u64,
    /// The timestamp of the block the call executes in.
    pub timestamp: u64,
    /// The source of historical block hashes.
    pub history: &'a dyn BlockHashes,
}

impl<'a> Env<'a> {
    /// Creates a new [Env] with no value attached.
    pub fn new(
        caller: Address,
        block_number: u64,
        timestamp: u64,
        history: &'a dyn BlockHashes,
    ) -> Self {
        Self {
            caller,
            value: U256::zero(),
            block_number,
            timestamp,
            history,
        }
    }

    /// Returns a copy of the [Env] with a different caller.
    pub fn with_caller(self, caller: Address) -> Self {
        Self { caller, ..self }
    }

    /// Returns a copy of the [Env] with a different attached value.
    pub fn with_value(self, value: U256) -> Self {
        Self { value, ..self }
    }

    /// Returns the hash of block `number` if it is one of the [BLOCK_HASH_WINDOW] most recent
    /// ancestors of the current block and its hash is known.
    pub fn block_hash(&self, number: u64) -> Option<H256> {
        if number >= self.block_number || self.block_number - number > BLOCK_HASH_WINDOW {
            return None;
        }
        self.history.block_hash(number).filter(|hash| !hash.is_zero())
    }
}

impl fmt::Debug for Env<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env")
            .field("caller", &self.caller)
            .field("value", &self.value)
            .field("block_number", &self.block_number)
            .field("timestamp", &self.timestamp)
            .finish_non_exhaustive()
    }
}
