//! The `devnet` module contains the [Devnet], an in-memory L1 hosting the dispute contracts.
//!
//! Every entry point builds the [Env] of the pending block, forwards it to the contract and, when
//! the call succeeds, drains the events the contract emitted into the devnet's log. Failed calls
//! leave neither state nor logs behind.

use crate::types::{PreparedCall, Transaction};
use ethers::{
    abi::{self, Token},
    types::{Address, Bytes, Log, H256, U256, U64},
    utils::keccak256,
};
use op_dispute_contracts::{
    AlphabetVm, BlockHashes, BlockOracle, DisputeGameFactory, Env, Event, FactoryError,
    FaultDisputeGame, FaultGameConfig, FaultGameError, FaultGameImplementation, InitContext,
    MemoryPreimageOracle, OutputOracle, OutputOracleConfig, OutputOracleError,
};
use op_dispute_primitives::{Claim, ClaimData, GameStatus, GameType, OutputProposal};
use std::sync::Arc;
use thiserror::Error;

/// The address of the output oracle.
pub const OUTPUT_ORACLE: Address = Address::repeat_byte(0x0C);
/// The address of the block oracle.
pub const BLOCK_ORACLE: Address = Address::repeat_byte(0x0B);
/// The address of the dispute game factory.
pub const DISPUTE_GAME_FACTORY: Address = Address::repeat_byte(0xFA);
/// The address of the alphabet game implementation.
pub const ALPHABET_GAME_IMPL: Address = Address::repeat_byte(0xA1);

/// An error returned by a [Devnet] entry point.
#[derive(Debug, Error)]
pub enum DevnetError {
    /// The output oracle rejected the call.
    #[error(transparent)]
    OutputOracle(#[from] OutputOracleError),
    /// The factory rejected the call.
    #[error(transparent)]
    Factory(#[from] FactoryError),
    /// The game rejected the call.
    #[error(transparent)]
    Game(#[from] FaultGameError),
    /// No game exists at the address.
    #[error("No dispute game at {0:?}")]
    UnknownGame(Address),
}

/// The parameters the [Devnet] is deployed with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevnetConfig {
    /// The timestamp of the L1 genesis block.
    pub genesis_timestamp: u64,
    /// The time between two L1 blocks.
    pub block_time: u64,
    /// The number of L2 blocks between two output proposals.
    pub submission_interval: u64,
    /// The time between two L2 blocks.
    pub l2_block_time: u64,
    /// The L2 timestamp of the genesis output.
    pub l2_starting_timestamp: u64,
    /// The genesis output root.
    pub genesis_output_root: H256,
    /// The output proposer.
    pub proposer: Address,
    /// The owner of the output oracle and the factory.
    pub owner: Address,
    /// The maximum depth of alphabet games.
    pub max_game_depth: u64,
    /// The chess clock of alphabet games.
    pub game_duration: u64,
    /// The L2 chain id.
    pub l2_chain_id: u64,
    /// The letter preceding the alphabet trace.
    pub prestate: u8,
    /// The creation bond of alphabet games.
    pub init_bond: U256,
}

impl Default for DevnetConfig {
    fn default() -> Self {
        Self {
            genesis_timestamp: 1_700_000_000,
            block_time: 12,
            submission_interval: 10,
            l2_block_time: 2,
            l2_starting_timestamp: 1_700_000_000 - 3_600,
            genesis_output_root: H256::from(keccak256(b"genesis output")),
            proposer: Address::repeat_byte(0x50),
            owner: Address::repeat_byte(0x0E),
            max_game_depth: 4,
            game_duration: 600,
            l2_chain_id: 901,
            prestate: b'a' - 1,
            init_bond: U256::zero(),
        }
    }
}

/// The [L1Chain] holds the hashes and timestamps of the mined blocks.
#[derive(Debug, Clone)]
pub struct L1Chain {
    hashes: Vec<H256>,
    timestamps: Vec<u64>,
    block_time: u64,
}

impl L1Chain {
    /// Creates a chain holding only its genesis block.
    pub fn new(genesis_timestamp: u64, block_time: u64) -> Self {
        Self {
            hashes: vec![block_hash(0, H256::zero())],
            timestamps: vec![genesis_timestamp],
            block_time,
        }
    }

    /// Returns the number of the latest mined block.
    pub fn head(&self) -> u64 {
        self.hashes.len() as u64 - 1
    }

    /// Returns the number of the block calls currently execute in.
    pub fn pending_block(&self) -> u64 {
        self.hashes.len() as u64
    }

    /// Returns the timestamp of the pending block.
    pub fn pending_timestamp(&self) -> u64 {
        self.timestamps.last().copied().unwrap_or_default() + self.block_time
    }

    /// Seals the pending block and returns its number.
    pub fn mine(&mut self) -> u64 {
        let number = self.pending_block();
        let parent = self.hashes.last().copied().unwrap_or_default();
        self.timestamps.push(self.pending_timestamp());
        self.hashes.push(block_hash(number, parent));
        number
    }

    /// Returns the [Env] of a call from `caller` in the pending block.
    pub fn env(&self, caller: Address) -> Env<'_> {
        Env::new(caller, self.pending_block(), self.pending_timestamp(), self)
    }
}

impl BlockHashes for L1Chain {
    fn block_hash(&self, number: u64) -> Option<H256> {
        self.hashes.get(number as usize).copied()
    }
}

fn block_hash(number: u64, parent: H256) -> H256 {
    H256::from(keccak256(abi::encode(&[
        Token::Uint(U256::from(number)),
        Token::FixedBytes(parent.as_bytes().to_vec()),
    ])))
}

/// The [Devnet] is a single-owner L1 with the output oracle, block oracle and dispute game
/// factory deployed, and the alphabet game registered as [GameType::ALPHABET].
#[derive(Debug)]
pub struct Devnet {
    config: DevnetConfig,
    chain: L1Chain,
    output_oracle: OutputOracle,
    block_oracle: BlockOracle,
    factory: DisputeGameFactory,
    preimage_oracle: Arc<MemoryPreimageOracle>,
    logs: Vec<Log>,
}

impl Devnet {
    /// Deploys the contracts on a fresh chain.
    pub fn new(config: DevnetConfig) -> Result<Self, DevnetError> {
        let chain = L1Chain::new(config.genesis_timestamp, config.block_time);
        let output_oracle = OutputOracle::new(
            OutputOracleConfig {
                submission_interval: config.submission_interval,
                l2_block_time: config.l2_block_time,
                starting_block_number: 0,
                starting_timestamp: config.l2_starting_timestamp,
                genesis_output_root: config.genesis_output_root,
                proposer: config.proposer,
                owner: config.owner,
            },
            config.genesis_timestamp,
        )?;

        let preimage_oracle = Arc::new(MemoryPreimageOracle::new());
        let absolute_prestate = AlphabetVm::prestate_claim(config.prestate);
        let implementation = FaultGameImplementation::new(
            ALPHABET_GAME_IMPL,
            FaultGameConfig {
                absolute_prestate,
                max_game_depth: config.max_game_depth,
                game_duration: config.game_duration,
                l2_chain_id: config.l2_chain_id,
                vm: Arc::new(AlphabetVm::new(absolute_prestate, preimage_oracle.clone())),
            },
        )?;

        let mut factory = DisputeGameFactory::new(DISPUTE_GAME_FACTORY, config.owner);
        let env = chain.env(config.owner);
        factory.set_implementation(&env, GameType::ALPHABET, implementation)?;
        factory.set_init_bond(&env, GameType::ALPHABET, config.init_bond)?;

        let mut devnet = Self {
            config,
            chain,
            output_oracle,
            block_oracle: BlockOracle::new(),
            factory,
            preimage_oracle,
            logs: Vec::new(),
        };
        let events = devnet.factory.take_logs();
        devnet.record(DISPUTE_GAME_FACTORY, events);
        devnet.chain.mine();

        tracing::info!(target: "devnet", "Devnet deployed at genesis timestamp {}", devnet.config.genesis_timestamp);
        Ok(devnet)
    }

    /// Proposes `output_root` for `l2_block_number`.
    pub fn propose_l2_output(
        &mut self,
        caller: Address,
        output_root: H256,
        l2_block_number: u64,
    ) -> Result<(), DevnetError> {
        let env = self.chain.env(caller);
        let l2_timestamp = self.output_oracle.compute_l2_timestamp(l2_block_number);
        self.output_oracle.propose_l2_output(
            &env,
            output_root,
            l2_block_number,
            l2_timestamp,
            H256::zero(),
            0,
        )?;

        let events = self.output_oracle.take_logs();
        self.record(OUTPUT_ORACLE, events);
        Ok(())
    }

    /// Deletes the latest output proposal.
    pub fn delete_l2_output(
        &mut self,
        caller: Address,
        proposal: &OutputProposal,
    ) -> Result<(), DevnetError> {
        let env = self.chain.env(caller);
        self.output_oracle.delete_l2_output(&env, proposal)?;

        let events = self.output_oracle.take_logs();
        self.record(OUTPUT_ORACLE, events);
        Ok(())
    }

    /// Creates a dispute game and returns the address of its proxy.
    pub fn create_game(
        &mut self,
        caller: Address,
        value: U256,
        game_type: GameType,
        root_claim: Claim,
        extra_data: Bytes,
    ) -> Result<Address, DevnetError> {
        let env = self.chain.env(caller).with_value(value);
        let proxy = self.factory.create(
            &env,
            InitContext {
                output_oracle: &self.output_oracle,
                block_oracle: &mut self.block_oracle,
            },
            game_type,
            root_claim,
            extra_data,
        )?;

        let checkpoints = self.block_oracle.take_logs();
        self.record(BLOCK_ORACLE, checkpoints);
        let created = self.factory.take_logs();
        self.record(DISPUTE_GAME_FACTORY, created);
        Ok(proxy)
    }

    /// Moves against a claim in `game` and returns the index of the new claim.
    pub fn move_(
        &mut self,
        caller: Address,
        value: U256,
        game: Address,
        parent_index: usize,
        claim: Claim,
        is_attack: bool,
    ) -> Result<usize, DevnetError> {
        let env = self.chain.env(caller).with_value(value);
        let instance = self
            .factory
            .game_mut(game)
            .ok_or(DevnetError::UnknownGame(game))?;
        let index = instance.move_(&env, parent_index, claim, is_attack)?;

        let events = instance.take_logs();
        self.record(game, events);
        Ok(index)
    }

    /// Steps against a leaf claim in `game`.
    pub fn step(
        &mut self,
        caller: Address,
        game: Address,
        claim_index: usize,
        is_attack: bool,
        state_data: &[u8],
        proof: &[u8],
    ) -> Result<(), DevnetError> {
        let env = self.chain.env(caller);
        self.factory
            .game_mut(game)
            .ok_or(DevnetError::UnknownGame(game))?
            .step(&env, claim_index, is_attack, state_data, proof)?;
        Ok(())
    }

    /// Resolves the subgame rooted at `claim_index` and returns the status of the game.
    pub fn resolve_claim(
        &mut self,
        caller: Address,
        game: Address,
        claim_index: usize,
    ) -> Result<GameStatus, DevnetError> {
        let env = self.chain.env(caller);
        let instance = self
            .factory
            .game_mut(game)
            .ok_or(DevnetError::UnknownGame(game))?;
        let status = instance.resolve_claim(&env, claim_index)?;

        let events = instance.take_logs();
        self.record(game, events);
        Ok(status)
    }

    /// Loads local data for `game` into the preimage oracle.
    pub fn add_local_data(
        &self,
        game: Address,
        ident: u64,
        local_context: H256,
        part_offset: u64,
    ) -> Result<H256, DevnetError> {
        Ok(self
            .game(game)?
            .add_local_data(ident, local_context, part_offset)?)
    }

    /// Applies a [PreparedCall].
    pub fn apply(&mut self, call: &PreparedCall) -> Result<(), DevnetError> {
        let from = call.from;
        match &call.tx {
            Transaction::ProposeOutput {
                output_root,
                l2_block_number,
            } => self.propose_l2_output(from, *output_root, *l2_block_number),
            Transaction::CreateGame {
                game_type,
                root_claim,
                extra_data,
            } => self
                .create_game(from, call.value, *game_type, *root_claim, extra_data.clone())
                .map(|_| ()),
            Transaction::Move {
                game,
                parent_index,
                claim,
                is_attack,
            } => self
                .move_(from, call.value, *game, *parent_index, *claim, *is_attack)
                .map(|_| ()),
            Transaction::Step {
                game,
                claim_index,
                is_attack,
                state_data,
                proof,
            } => self.step(from, *game, *claim_index, *is_attack, state_data, proof),
            Transaction::ResolveClaim { game, claim_index } => {
                self.resolve_claim(from, *game, *claim_index).map(|_| ())
            }
        }
    }

    /// Seals the pending block.
    pub fn mine(&mut self) -> u64 {
        self.chain.mine()
    }

    /// Mines blocks until at least `seconds` have passed.
    pub fn advance_time(&mut self, seconds: u64) {
        let target = self.chain.pending_timestamp() + seconds;
        while self.chain.pending_timestamp() < target {
            self.chain.mine();
        }
    }

    /// Returns the game at `proxy`.
    pub fn game(&self, proxy: Address) -> Result<&FaultDisputeGame, DevnetError> {
        self.factory
            .game(proxy)
            .ok_or(DevnetError::UnknownGame(proxy))
    }

    /// Returns a snapshot of the claims of the game at `proxy`.
    pub fn claims(&self, proxy: Address) -> Result<Vec<ClaimData>, DevnetError> {
        Ok(self.game(proxy)?.claims().to_vec())
    }

    /// Returns the logs emitted from index `cursor` on.
    pub fn logs_from(&self, cursor: usize) -> Vec<Log> {
        self.logs.get(cursor..).map(<[Log]>::to_vec).unwrap_or_default()
    }

    /// Returns the timestamp calls currently execute at.
    pub fn timestamp(&self) -> u64 {
        self.chain.pending_timestamp()
    }

    /// Returns the L1 chain.
    pub fn chain(&self) -> &L1Chain {
        &self.chain
    }

    /// Returns the configuration the devnet was deployed with.
    pub fn config(&self) -> &DevnetConfig {
        &self.config
    }

    /// Returns the output oracle.
    pub fn output_oracle(&self) -> &OutputOracle {
        &self.output_oracle
    }

    /// Returns the dispute game factory.
    pub fn factory(&self) -> &DisputeGameFactory {
        &self.factory
    }

    /// Returns the preimage oracle shared by the alphabet VM.
    pub fn preimage_oracle(&self) -> &Arc<MemoryPreimageOracle> {
        &self.preimage_oracle
    }

    fn record(&mut self, address: Address, events: Vec<Event>) {
        let block_number = U64::from(self.chain.pending_block());
        for event in events {
            let mut log = event.to_log(address);
            log.block_number = Some(block_number);
            log.log_index = Some(U256::from(self.logs.len()));
            tracing::trace!(target: "devnet", "{} emitted {}", address, event.signature());
            self.logs.push(log);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use op_dispute_contracts::events::{event_topic, DISPUTE_GAME_CREATED, OUTPUT_PROPOSED};

    fn devnet() -> Devnet {
        Devnet::new(DevnetConfig::default()).unwrap()
    }

    #[test]
    fn chain_exposes_recent_hashes() {
        let mut chain = L1Chain::new(1_000, 12);
        for _ in 0..300 {
            chain.mine();
        }
        assert_eq!(chain.head(), 300);
        assert_eq!(chain.pending_timestamp(), 1_000 + 301 * 12);

        let env = chain.env(Address::zero());
        assert_eq!(env.block_hash(300), chain.block_hash(300));
        assert!(env.block_hash(301).is_none());
        assert!(env.block_hash(10).is_none());
        assert_ne!(chain.block_hash(299), chain.block_hash(300));
    }

    #[test]
    fn proposals_and_games_are_logged() {
        let mut devnet = devnet();
        let config = devnet.config().clone();
        let cursor = devnet.logs_from(0).len();

        devnet
            .propose_l2_output(config.proposer, H256::repeat_byte(0x10), 10)
            .unwrap();
        devnet.mine();
        let proxy = devnet
            .create_game(
                Address::repeat_byte(0x99),
                U256::zero(),
                GameType::ALPHABET,
                AlphabetVm::claim(15, b'p'),
                Bytes::from(vec![10]),
            )
            .unwrap();

        let logs = devnet.logs_from(cursor);
        assert_eq!(logs.len(), 3);
        assert_eq!(logs[0].address, OUTPUT_ORACLE);
        assert_eq!(logs[0].topics[0], event_topic(OUTPUT_PROPOSED));
        assert_eq!(logs[1].address, BLOCK_ORACLE);
        assert_eq!(logs[2].address, DISPUTE_GAME_FACTORY);
        assert_eq!(logs[2].topics[0], event_topic(DISPUTE_GAME_CREATED));
        assert_eq!(Address::from_slice(&logs[2].topics[1][12..]), proxy);
        assert_eq!(logs[2].block_number, Some(U64::from(devnet.chain().pending_block())));

        let game = devnet.game(proxy).unwrap();
        assert_eq!(game.l1_head(), devnet.chain().block_hash(devnet.chain().head()).unwrap());
    }

    #[test]
    fn failed_calls_leave_no_logs() {
        let mut devnet = devnet();
        let cursor = devnet.logs_from(0).len();

        let err = devnet
            .propose_l2_output(Address::repeat_byte(0x99), H256::repeat_byte(0x10), 10)
            .unwrap_err();
        assert!(matches!(
            err,
            DevnetError::OutputOracle(OutputOracleError::NotProposer(_))
        ));
        let err = devnet
            .create_game(
                Address::repeat_byte(0x99),
                U256::zero(),
                GameType::ALPHABET,
                H256::repeat_byte(0xAA),
                Bytes::from(vec![10]),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            DevnetError::Factory(FactoryError::Game(FaultGameError::L2BlockNumberOutOfRange(10)))
        ));
        assert!(devnet.logs_from(cursor).is_empty());
        assert_eq!(devnet.factory().game_count(), 0);
    }

    #[test]
    fn applies_prepared_calls() {
        let mut devnet = devnet();
        let proposer = devnet.config().proposer;
        devnet
            .apply(&PreparedCall::new(
                proposer,
                Transaction::ProposeOutput {
                    output_root: H256::repeat_byte(0x10),
                    l2_block_number: 10,
                },
            ))
            .unwrap();
        assert_eq!(devnet.output_oracle().latest_block_number(), 10);

        let unknown = Address::repeat_byte(0x42);
        assert!(matches!(
            devnet.apply(&PreparedCall::new(
                proposer,
                Transaction::ResolveClaim {
                    game: unknown,
                    claim_index: 0
                }
            )),
            Err(DevnetError::UnknownGame(addr)) if addr == unknown
        ));
    }

    #[test]
    fn advance_time_mines_blocks() {
        let mut devnet = devnet();
        let before = devnet.timestamp();
        let head = devnet.chain().head();
        devnet.advance_time(60);
        assert_eq!(devnet.timestamp(), before + 60);
        assert_eq!(devnet.chain().head(), head + 5);
    }
}
