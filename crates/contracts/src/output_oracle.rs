//! The `output_oracle` module contains the [OutputOracle], which accepts L2 output proposals on a
//! fixed cadence of L2 blocks.

use crate::{events::Event, Env, ErrorKind};
use ethers::types::{Address, H256};
use op_dispute_primitives::OutputProposal;
use thiserror::Error;

/// An error returned by the [OutputOracle].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OutputOracleError {
    /// The submission interval or L2 block time is zero. Validation.
    #[error("Invalid output oracle configuration: {0}")]
    InvalidConfig(&'static str),
    /// The caller is not the proposer. Validation.
    #[error("Caller {0:?} is not the proposer")]
    NotProposer(Address),
    /// The caller is not the owner. Validation.
    #[error("Caller {0:?} is not the owner")]
    NotOwner(Address),
    /// The proposal is not for the next expected L2 block. Validation.
    #[error("Unexpected L2 block number. Expected {expected}, got {got}")]
    UnexpectedBlockNumber {
        /// The next expected L2 block number.
        expected: u64,
        /// The proposed L2 block number.
        got: u64,
    },
    /// The L2 timestamp does not match the block number. Validation.
    #[error("Unexpected L2 timestamp. Expected {expected}, got {got}")]
    UnexpectedTimestamp {
        /// The computed L2 timestamp.
        expected: u64,
        /// The proposed L2 timestamp.
        got: u64,
    },
    /// The L2 block is not yet in the past. Timing.
    #[error("Cannot propose L2 output in the future: {l2_timestamp} >= {now}")]
    FutureTimestamp {
        /// The L2 timestamp.
        l2_timestamp: u64,
        /// The current L1 timestamp.
        now: u64,
    },
    /// The output root is zero. Validation.
    #[error("L2 output proposal cannot be the zero hash")]
    EmptyOutputRoot,
    /// The L1 block hash does not match the chain. External.
    #[error("Block hash does not match the hash of L1 block #{0}")]
    L1BlockHashMismatch(u64),
    /// The proposal does not match the latest output. Validation.
    #[error("Can only delete the latest output proposal")]
    ProposalMismatch,
    /// The genesis output cannot be deleted. Validation.
    #[error("Cannot delete the genesis output")]
    CannotDeleteGenesis,
    /// No output commits to the L2 block. Validation.
    #[error("No output found for L2 block #{0}")]
    OutputNotFound(u64),
}

impl OutputOracleError {
    /// Returns the taxonomy kind of the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::FutureTimestamp { .. } => ErrorKind::Timing,
            Self::L1BlockHashMismatch(_) => ErrorKind::External,
            _ => ErrorKind::Validation,
        }
    }
}

/// The construction parameters of an [OutputOracle].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputOracleConfig {
    /// The number of L2 blocks between two output proposals.
    pub submission_interval: u64,
    /// The time between two L2 blocks, in seconds.
    pub l2_block_time: u64,
    /// The L2 block number of the genesis output.
    pub starting_block_number: u64,
    /// The L2 timestamp of the genesis output.
    pub starting_timestamp: u64,
    /// The output root of the genesis output.
    pub genesis_output_root: H256,
    /// The account allowed to propose outputs.
    pub proposer: Address,
    /// The account allowed to delete outputs.
    pub owner: Address,
}

/// The [OutputOracle] stores L2 output proposals as an append-only sequence. The proposal at
/// index `i` commits to L2 block `starting_block_number + i * submission_interval`.
#[derive(Debug)]
pub struct OutputOracle {
    submission_interval: u64,
    l2_block_time: u64,
    starting_block_number: u64,
    starting_timestamp: u64,
    proposer: Address,
    owner: Address,
    /// The proposals, genesis first.
    outputs: Vec<OutputProposal>,
    logs: Vec<Event>,
}

impl OutputOracle {
    /// Deploys a new [OutputOracle] with the genesis output timestamped at `deployed_at`.
    pub fn new(config: OutputOracleConfig, deployed_at: u64) -> Result<Self, OutputOracleError> {
        if config.submission_interval == 0 {
            return Err(OutputOracleError::InvalidConfig(
                "submission interval must be positive",
            ));
        }
        if config.l2_block_time == 0 {
            return Err(OutputOracleError::InvalidConfig(
                "L2 block time must be positive",
            ));
        }

        let genesis = OutputProposal {
            output_root: config.genesis_output_root,
            timestamp: deployed_at,
            l2_block_number: config.starting_block_number,
        };

        Ok(Self {
            submission_interval: config.submission_interval,
            l2_block_time: config.l2_block_time,
            starting_block_number: config.starting_block_number,
            starting_timestamp: config.starting_timestamp,
            proposer: config.proposer,
            owner: config.owner,
            outputs: vec![genesis],
            logs: Vec::new(),
        })
    }

    /// Proposes the output root for the next L2 block in the cadence.
    ///
    /// ### Takes
    /// - `output_root`: The output root.
    /// - `l2_block_number`: The L2 block the output commits to.
    /// - `l2_block_timestamp`: The timestamp of that L2 block.
    /// - `l1_block_hash`: An optional (non-zero) L1 block hash the proposal is conditioned on.
    /// - `l1_block_number`: The number of the L1 block with `l1_block_hash`.
    pub fn propose_l2_output(
        &mut self,
        env: &Env<'_>,
        output_root: H256,
        l2_block_number: u64,
        l2_block_timestamp: u64,
        l1_block_hash: H256,
        l1_block_number: u64,
    ) -> Result<(), OutputOracleError> {
        if env.caller != self.proposer {
            return Err(OutputOracleError::NotProposer(env.caller));
        }

        let expected = self.next_block_number();
        if l2_block_number != expected {
            return Err(OutputOracleError::UnexpectedBlockNumber {
                expected,
                got: l2_block_number,
            });
        }

        let expected_timestamp = self.compute_l2_timestamp(l2_block_number);
        if l2_block_timestamp != expected_timestamp {
            return Err(OutputOracleError::UnexpectedTimestamp {
                expected: expected_timestamp,
                got: l2_block_timestamp,
            });
        }

        if l2_block_timestamp >= env.timestamp {
            return Err(OutputOracleError::FutureTimestamp {
                l2_timestamp: l2_block_timestamp,
                now: env.timestamp,
            });
        }

        if output_root.is_zero() {
            return Err(OutputOracleError::EmptyOutputRoot);
        }

        if !l1_block_hash.is_zero() && env.block_hash(l1_block_number) != Some(l1_block_hash) {
            return Err(OutputOracleError::L1BlockHashMismatch(l1_block_number));
        }

        self.outputs.push(OutputProposal {
            output_root,
            timestamp: env.timestamp,
            l2_block_number,
        });
        self.logs.push(Event::OutputProposed {
            output_root,
            l1_timestamp: env.timestamp,
            l2_block_number,
        });

        tracing::info!(target: "output-oracle", "Output {:?} proposed for L2 block #{}", output_root, l2_block_number);
        Ok(())
    }

    /// Deletes the latest output proposal, which must equal `proposal`.
    pub fn delete_l2_output(
        &mut self,
        env: &Env<'_>,
        proposal: &OutputProposal,
    ) -> Result<(), OutputOracleError> {
        if env.caller != self.owner {
            return Err(OutputOracleError::NotOwner(env.caller));
        }
        if self.outputs.len() == 1 {
            return Err(OutputOracleError::CannotDeleteGenesis);
        }

        let latest = self.latest_output();
        if latest.output_root != proposal.output_root || latest.timestamp != proposal.timestamp {
            return Err(OutputOracleError::ProposalMismatch);
        }

        self.outputs.pop();
        self.logs.push(Event::OutputDeleted {
            output_root: latest.output_root,
            l1_timestamp: latest.timestamp,
            l2_block_number: latest.l2_block_number,
        });

        tracing::warn!(target: "output-oracle", "Output {:?} for L2 block #{} deleted", latest.output_root, latest.l2_block_number);
        Ok(())
    }

    /// Returns the index of the first output that commits to a block at or after
    /// `l2_block_number`.
    pub fn get_l2_output_index_after(&self, l2_block_number: u64) -> Result<usize, OutputOracleError> {
        if l2_block_number < self.starting_block_number {
            return Err(OutputOracleError::OutputNotFound(l2_block_number));
        }

        let index = (l2_block_number - self.starting_block_number)
            .div_ceil(self.submission_interval) as usize;
        if index >= self.outputs.len() {
            return Err(OutputOracleError::OutputNotFound(l2_block_number));
        }
        Ok(index)
    }

    /// Returns the output that commits to the first checkpoint at or after `l2_block_number`.
    pub fn get_l2_output(&self, l2_block_number: u64) -> Result<OutputProposal, OutputOracleError> {
        let index = self.get_l2_output_index_after(l2_block_number)?;
        Ok(self.outputs[index])
    }

    /// Returns the output at `index`, if it exists.
    pub fn get_l2_output_at(&self, index: usize) -> Option<OutputProposal> {
        self.outputs.get(index).copied()
    }

    /// Returns the latest output proposal.
    pub fn latest_output(&self) -> OutputProposal {
        // The genesis output can never be deleted.
        self.outputs[self.outputs.len() - 1]
    }

    /// Returns the index of the latest output proposal.
    pub fn latest_output_index(&self) -> usize {
        self.outputs.len() - 1
    }

    /// Returns the L2 block number of the latest output proposal.
    pub fn latest_block_number(&self) -> u64 {
        self.starting_block_number + self.latest_output_index() as u64 * self.submission_interval
    }

    /// Returns the L2 block number the next output proposal must commit to.
    pub fn next_block_number(&self) -> u64 {
        self.latest_block_number().saturating_add(self.submission_interval)
    }

    /// Returns the L2 timestamp of `l2_block_number`, saturating at `u64::MAX`.
    pub fn compute_l2_timestamp(&self, l2_block_number: u64) -> u64 {
        let elapsed = l2_block_number
            .saturating_sub(self.starting_block_number)
            .saturating_mul(self.l2_block_time);
        self.starting_timestamp.saturating_add(elapsed)
    }

    /// Transfers ownership of the oracle.
    pub fn transfer_ownership(
        &mut self,
        env: &Env<'_>,
        new_owner: Address,
    ) -> Result<(), OutputOracleError> {
        if env.caller != self.owner {
            return Err(OutputOracleError::NotOwner(env.caller));
        }
        self.logs.push(Event::OwnershipTransferred {
            previous_owner: self.owner,
            new_owner,
        });
        self.owner = new_owner;
        Ok(())
    }

    /// Returns the L2 block number of the genesis output.
    pub fn starting_block_number(&self) -> u64 {
        self.starting_block_number
    }

    /// Returns the L2 timestamp of the genesis output.
    pub fn starting_timestamp(&self) -> u64 {
        self.starting_timestamp
    }

    /// Returns the number of L2 blocks between two proposals.
    pub fn submission_interval(&self) -> u64 {
        self.submission_interval
    }

    /// Returns the time between two L2 blocks.
    pub fn l2_block_time(&self) -> u64 {
        self.l2_block_time
    }

    /// Returns the proposer.
    pub fn proposer(&self) -> Address {
        self.proposer
    }

    /// Returns the owner.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Drains the events emitted since the last call.
    pub fn take_logs(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.logs)
    }
}
