//! The `block_oracle` module contains the [BlockOracle] and the [BlockHashOracle], which record
//! historical L1 block hashes before they fall out of the retrievable window.

use crate::{events::Event, Env, ErrorKind};
use ethers::types::H256;
use op_dispute_primitives::BlockInfo;
use std::collections::HashMap;
use thiserror::Error;

/// An error returned by the [BlockOracle] or the [BlockHashOracle].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockOracleError {
    /// The hash of the block is neither stored nor retrievable. External.
    #[error("Block hash not present for block #{0}")]
    BlockHashNotPresent(u64),
}

impl BlockOracleError {
    /// Returns the taxonomy kind of the error.
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::External
    }
}

/// The [BlockOracle] records `(hash, timestamp)` tuples per block number.
#[derive(Debug, Default)]
pub struct BlockOracle {
    /// The recorded blocks.
    blocks: HashMap<u64, BlockInfo>,
    /// Events emitted since the last drain.
    logs: Vec<Event>,
}

impl BlockOracle {
    /// Creates an empty [BlockOracle].
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the [BlockInfo] recorded for `block_number`.
    pub fn load(&self, block_number: u64) -> Result<BlockInfo, BlockOracleError> {
        self.blocks
            .get(&block_number)
            .copied()
            .ok_or(BlockOracleError::BlockHashNotPresent(block_number))
    }

    /// Records the hash of `block_number` along with the current timestamp. Entries are never
    /// rewritten: storing a block twice returns the first record.
    pub fn store(&mut self, env: &Env<'_>, block_number: u64) -> Result<BlockInfo, BlockOracleError> {
        if let Some(info) = self.blocks.get(&block_number) {
            return Ok(*info);
        }

        let hash = env
            .block_hash(block_number)
            .ok_or(BlockOracleError::BlockHashNotPresent(block_number))?;
        let info = BlockInfo {
            hash,
            timestamp: env.timestamp,
        };
        self.blocks.insert(block_number, info);

        tracing::debug!(target: "block-oracle", "Stored block #{} with hash {:?}", block_number, hash);
        Ok(info)
    }

    /// Stores the parent of the current block and returns its number.
    pub fn checkpoint(&mut self, env: &Env<'_>) -> Result<u64, BlockOracleError> {
        let block_number = env
            .block_number
            .checked_sub(1)
            .ok_or(BlockOracleError::BlockHashNotPresent(0))?;
        let info = self.store(env, block_number)?;

        self.logs.push(Event::Checkpoint {
            block_number,
            block_hash: info.hash,
            timestamp: info.timestamp,
        });
        Ok(block_number)
    }

    /// Drains the events emitted since the last call.
    pub fn take_logs(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.logs)
    }
}

/// The [BlockHashOracle] records bare block hashes by number.
#[derive(Debug, Default)]
pub struct BlockHashOracle {
    hashes: HashMap<u64, H256>,
}

impl BlockHashOracle {
    /// Creates an empty [BlockHashOracle].
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the hash of `block_number`, which must still be retrievable.
    pub fn store(&mut self, env: &Env<'_>, block_number: u64) -> Result<H256, BlockOracleError> {
        if let Some(hash) = self.hashes.get(&block_number) {
            return Ok(*hash);
        }

        let hash = env
            .block_hash(block_number)
            .ok_or(BlockOracleError::BlockHashNotPresent(block_number))?;
        self.hashes.insert(block_number, hash);
        Ok(hash)
    }

    /// Loads the hash recorded for `block_number`.
    pub fn load(&self, block_number: u64) -> Result<H256, BlockOracleError> {
        self.hashes
            .get(&block_number)
            .copied()
            .ok_or(BlockOracleError::BlockHashNotPresent(block_number))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use ethers::types::Address;

    fn history(n: u64) -> Option<H256> {
        Some(H256::from_low_u64_be(0x1000 + n))
    }

    #[test]
    fn store_is_immutable() {
        let mut oracle = BlockOracle::new();
        let env = Env::new(Address::zero(), 10, 100, &history);
        let first = oracle.store(&env, 5).unwrap();
        assert_eq!(oracle.load(5).unwrap(), first);

        // A later store of the same block returns the original record untouched.
        let later = Env::new(Address::zero(), 11, 200, &history);
        assert_eq!(oracle.store(&later, 5).unwrap(), first);
        assert_eq!(oracle.load(5).unwrap().timestamp, 100);
    }

    #[test]
    fn store_rejects_unavailable_hashes() {
        let mut oracle = BlockOracle::new();
        let env = Env::new(Address::zero(), 1_000, 100, &history);
        assert_eq!(
            oracle.store(&env, 1),
            Err(BlockOracleError::BlockHashNotPresent(1))
        );
        assert_eq!(
            oracle.load(1),
            Err(BlockOracleError::BlockHashNotPresent(1))
        );
    }

    #[test]
    fn checkpoint_stores_the_parent_block() {
        let mut oracle = BlockOracle::new();
        let env = Env::new(Address::zero(), 10, 100, &history);
        assert_eq!(oracle.checkpoint(&env).unwrap(), 9);
        assert_eq!(oracle.load(9).unwrap().hash, H256::from_low_u64_be(0x1009));

        let logs = oracle.take_logs();
        assert_eq!(logs.len(), 1);
        assert!(matches!(logs[0], Event::Checkpoint { block_number: 9, .. }));
        assert!(oracle.take_logs().is_empty());
    }

    #[test]
    fn checkpoint_fails_at_genesis() {
        let mut oracle = BlockOracle::new();
        let env = Env::new(Address::zero(), 0, 0, &history);
        assert!(oracle.checkpoint(&env).is_err());
    }

    #[test]
    fn block_hash_oracle_round_trip() {
        let mut oracle = BlockHashOracle::new();
        let env = Env::new(Address::zero(), 10, 100, &history);
        let hash = oracle.store(&env, 3).unwrap();
        assert_eq!(oracle.load(3), Ok(hash));
        assert_eq!(oracle.load(4), Err(BlockOracleError::BlockHashNotPresent(4)));
    }
}
