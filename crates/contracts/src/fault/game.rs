use super::{FaultGameConfig, FaultGameError, ImmutableArgs};
use crate::{BlockOracle, Env, Event, OutputOracle};
use ethers::{
    abi::{self, Token},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
use op_dispute_primitives::{
    Claim, ClaimData, Clock, GameStatus, GameType, OutputProposal, Position, ROOT_PARENT_INDEX,
};
use std::{collections::HashSet, sync::Arc};

/// The lifecycle phase of a [FaultDisputeGame].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum GamePhase {
    /// The proxy exists but `initialize` has not run.
    #[default]
    Uninitialized,
    /// Claims may be moved, stepped and resolved.
    InProgress,
    /// The root subgame was resolved with the given terminal status.
    Resolved(GameStatus),
}

/// The outcome of a resolved subgame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// No child stands against the claim and it was not refuted by a step.
    Stands,
    /// The claim was refuted.
    Countered,
}

/// Local preimage identifiers that [FaultDisputeGame::add_local_data] knows how to load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum LocalIdent {
    /// The L1 head hash recorded at initialization.
    L1Head = 1,
    /// The output root of the starting proposal.
    StartingOutputRoot = 2,
    /// The output root of the disputed proposal.
    DisputedOutputRoot = 3,
    /// The disputed L2 block number.
    L2BlockNumber = 4,
    /// The L2 chain id.
    ChainId = 5,
}

impl TryFrom<u64> for LocalIdent {
    type Error = FaultGameError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::L1Head),
            2 => Ok(Self::StartingOutputRoot),
            3 => Ok(Self::DisputedOutputRoot),
            4 => Ok(Self::L2BlockNumber),
            5 => Ok(Self::ChainId),
            other => Err(FaultGameError::InvalidLocalIdent(other)),
        }
    }
}

/// The collaborators a game reads from, and checkpoints into, during `initialize`.
#[derive(Debug)]
pub struct InitContext<'a> {
    /// The oracle holding the proposed outputs.
    pub output_oracle: &'a OutputOracle,
    /// The oracle the L1 head is checkpointed into.
    pub block_oracle: &'a mut BlockOracle,
}

#[derive(Debug, Default, Clone)]
struct Subgame {
    /// Indices of the claims made against this one.
    children: Vec<u32>,
    /// Whether the claim was refuted by a step.
    stepped: bool,
    resolution: Option<Resolution>,
}

/// A fault dispute game over a single L2 output root.
///
/// Claims live in a flat arena; a claim references its parent by index and the parent keeps the
/// indices of its children in its [Subgame]. Claim data is append-only apart from the
/// `countered` flag, which only ever flips to `true`.
#[derive(Debug)]
pub struct FaultDisputeGame {
    address: Address,
    config: Arc<FaultGameConfig>,
    args: ImmutableArgs,
    phase: GamePhase,
    created_at: u64,
    l1_head: H256,
    l2_block_number: u64,
    starting_output: OutputProposal,
    disputed_output: OutputProposal,
    claim_data: Vec<ClaimData>,
    subgames: Vec<Subgame>,
    /// Hashes of `(parentIndex, position, claim)` for every claim in the tree.
    claims: HashSet<H256>,
    subgame_at_root_resolved: bool,
    balance: U256,
    logs: Vec<Event>,
}

impl FaultDisputeGame {
    pub(crate) fn new(address: Address, config: Arc<FaultGameConfig>, args: ImmutableArgs) -> Self {
        Self {
            address,
            config,
            args,
            phase: GamePhase::Uninitialized,
            created_at: 0,
            l1_head: H256::zero(),
            l2_block_number: 0,
            starting_output: OutputProposal::default(),
            disputed_output: OutputProposal::default(),
            claim_data: Vec::new(),
            subgames: Vec::new(),
            claims: HashSet::new(),
            subgame_at_root_resolved: false,
            balance: U256::zero(),
            logs: Vec::new(),
        }
    }

    /// Initializes the game: snapshots the starting and disputed outputs, checkpoints the L1 head
    /// and pushes the root claim.
    ///
    /// ### Takes
    /// - `env`: The call environment. Its value is credited to the game as the creation bond.
    /// - `ctx`: The output oracle to snapshot and the block oracle to checkpoint into.
    pub fn initialize(&mut self, env: &Env<'_>, ctx: InitContext<'_>) -> Result<(), FaultGameError> {
        if self.phase != GamePhase::Uninitialized {
            return Err(FaultGameError::AlreadyInitialized);
        }
        if self.args.parent_block_hash.is_zero() {
            return Err(FaultGameError::L1HeadTooOld);
        }

        let l2_block_number = decode_l2_block_number(&self.args.extra_data)?;
        let oracle = ctx.output_oracle;
        if l2_block_number <= oracle.starting_block_number()
            || l2_block_number > oracle.latest_block_number()
        {
            return Err(FaultGameError::L2BlockNumberOutOfRange(l2_block_number));
        }

        let out_of_range = || FaultGameError::L2BlockNumberOutOfRange(l2_block_number);
        let disputed_index = oracle
            .get_l2_output_index_after(l2_block_number)
            .map_err(|_| out_of_range())?;
        let disputed = oracle
            .get_l2_output_at(disputed_index)
            .ok_or_else(out_of_range)?;
        let starting = disputed_index
            .checked_sub(1)
            .and_then(|index| oracle.get_l2_output_at(index))
            .ok_or_else(out_of_range)?;

        if self.args.root_claim == disputed.output_root {
            return Err(FaultGameError::UnexpectedRootClaim(self.args.root_claim));
        }

        let l1_block = ctx
            .block_oracle
            .checkpoint(env)
            .map_err(|_| FaultGameError::L1HeadTooOld)?;
        let l1_head = ctx
            .block_oracle
            .load(l1_block)
            .map_err(|_| FaultGameError::L1HeadTooOld)?
            .hash;

        self.l2_block_number = l2_block_number;
        self.starting_output = starting;
        self.disputed_output = disputed;
        self.l1_head = l1_head;
        self.created_at = env.timestamp;
        self.push_claim(ClaimData {
            parent_index: ROOT_PARENT_INDEX,
            countered: false,
            claim: self.args.root_claim,
            position: 1,
            clock: Clock::new(0, env.timestamp),
        });
        self.balance = self.balance.saturating_add(env.value);
        self.phase = GamePhase::InProgress;

        tracing::info!(target: "fault-game", "Initialized game {:?} over L2 block #{} with root claim {:?}", self.address, l2_block_number, self.args.root_claim);
        Ok(())
    }

    /// Makes a claim against the claim at `challenge_index`.
    ///
    /// ### Takes
    /// - `challenge_index`: The index of the claim being challenged.
    /// - `claim`: The new claim.
    /// - `is_attack`: Whether the move disagrees with the challenged claim.
    ///
    /// ### Returns
    /// - `Ok(usize)`: The index of the new claim.
    pub fn move_(
        &mut self,
        env: &Env<'_>,
        challenge_index: usize,
        claim: Claim,
        is_attack: bool,
    ) -> Result<usize, FaultGameError> {
        self.ensure_in_progress()?;
        let parent = *self
            .claim_data
            .get(challenge_index)
            .ok_or(FaultGameError::InvalidParent)?;
        let parent_index =
            u32::try_from(challenge_index).map_err(|_| FaultGameError::InvalidParent)?;

        if !is_attack && challenge_index == 0 {
            return Err(FaultGameError::CannotDefendRootClaim);
        }

        let next_position = parent.position.make_move(is_attack);
        if next_position.depth() > self.config.max_game_depth {
            return Err(FaultGameError::GameDepthExceeded);
        }

        let duration = parent.clock.elapsed_at(env.timestamp);
        if duration > self.config.game_duration / 2 {
            return Err(FaultGameError::ClockTimeExceeded);
        }
        if self.subgames[challenge_index].resolution.is_some() {
            return Err(FaultGameError::ClaimAlreadyResolved);
        }

        if self.claims.contains(&claim_hash(parent_index, next_position, claim)) {
            return Err(FaultGameError::ClaimAlreadyExists);
        }

        let index = self.push_claim(ClaimData {
            parent_index,
            countered: false,
            claim,
            position: next_position,
            clock: Clock::new(duration, env.timestamp),
        });
        self.claim_data[challenge_index].countered = true;
        self.balance = self.balance.saturating_add(env.value);
        self.logs.push(Event::Move {
            parent_index: challenge_index as u64,
            claim,
            claimant: env.caller,
        });

        tracing::debug!(target: "fault-game", "{} claim {} at position {} with {:?}", if is_attack { "Attacked" } else { "Defended" }, challenge_index, next_position, claim);
        Ok(index)
    }

    /// Attacks the claim at `parent_index`.
    pub fn attack(
        &mut self,
        env: &Env<'_>,
        parent_index: usize,
        claim: Claim,
    ) -> Result<usize, FaultGameError> {
        self.move_(env, parent_index, claim, true)
    }

    /// Defends the claim at `parent_index`.
    pub fn defend(
        &mut self,
        env: &Env<'_>,
        parent_index: usize,
        claim: Claim,
    ) -> Result<usize, FaultGameError> {
        self.move_(env, parent_index, claim, false)
    }

    /// Refutes the leaf claim at `claim_index` by executing a single instruction on the VM.
    ///
    /// An attack step executes from the trace index preceding the claim and must disagree with
    /// it. A defense step executes from the claim itself and is checked against the ancestor that
    /// commits to the following trace index.
    ///
    /// ### Takes
    /// - `claim_index`: The index of the claim being stepped against.
    /// - `is_attack`: Whether the step attacks or defends the claim.
    /// - `state_data`: The preimage of the pre-state claim.
    /// - `proof`: The witness data the VM needs.
    pub fn step(
        &mut self,
        env: &Env<'_>,
        claim_index: usize,
        is_attack: bool,
        state_data: &[u8],
        proof: &[u8],
    ) -> Result<(), FaultGameError> {
        self.ensure_in_progress()?;
        let parent = *self
            .claim_data
            .get(claim_index)
            .ok_or(FaultGameError::InvalidParent)?;

        let max_depth = self.config.max_game_depth;
        let step_position = parent.position.make_move(is_attack);
        if step_position.depth() != max_depth + 1 {
            return Err(FaultGameError::InvalidParent);
        }

        let (pre_state, post_state) = if is_attack {
            let pre_state = if step_position.index_at_depth() == 0 {
                self.config.absolute_prestate
            } else {
                self.find_trace_ancestor(parent.position - 1, parent.parent_index)?
                    .claim
            };
            (pre_state, parent)
        } else {
            let post_state = self.find_trace_ancestor(parent.position + 1, parent.parent_index)?;
            (parent.claim, post_state)
        };

        // The high-order byte of a claim is reserved for the VM status.
        if keccak256(state_data)[1..] != pre_state.as_bytes()[1..] {
            return Err(FaultGameError::InvalidPrestate);
        }

        let local_context = self.local_context(claim_index)?;
        let valid_step = self.config.vm.step(state_data, proof, local_context)? == post_state.claim;
        let parent_post_agree = (parent.position.depth() - post_state.position.depth()) % 2 == 0;
        if parent_post_agree == valid_step {
            return Err(FaultGameError::ValidStep);
        }

        self.claim_data[claim_index].countered = true;
        self.subgames[claim_index].stepped = true;

        tracing::info!(target: "fault-game", "{:?} stepped against claim {} in game {:?}", env.caller, claim_index, self.address);
        Ok(())
    }

    /// Loads the local preimage `ident` into the VM's preimage oracle, namespaced by the game
    /// address and `local_context`.
    ///
    /// ### Returns
    /// - `Ok(H256)`: The localized key the data was stored under.
    pub fn add_local_data(
        &self,
        ident: u64,
        local_context: H256,
        part_offset: u64,
    ) -> Result<H256, FaultGameError> {
        if self.phase == GamePhase::Uninitialized {
            return Err(FaultGameError::NotInitialized);
        }

        // Integers are loaded as 8-byte big-endian fragments.
        let (word, size) = match LocalIdent::try_from(ident)? {
            LocalIdent::L1Head => (self.l1_head, 32),
            LocalIdent::StartingOutputRoot => (self.starting_output.output_root, 32),
            LocalIdent::DisputedOutputRoot => (self.disputed_output.output_root, 32),
            LocalIdent::L2BlockNumber => (u64_fragment(self.l2_block_number), 8),
            LocalIdent::ChainId => (u64_fragment(self.config.l2_chain_id), 8),
        };

        let key = self.config.vm.oracle().load_local_data(
            self.address,
            ident,
            local_context,
            word,
            size,
            part_offset,
        )?;
        Ok(key)
    }

    /// Returns the local context of the claim at `claim_index`:
    /// `keccak256(abi.encode(claim, position))`.
    pub fn local_context(&self, claim_index: usize) -> Result<H256, FaultGameError> {
        let claim = self
            .claim_data
            .get(claim_index)
            .ok_or(FaultGameError::InvalidParent)?;
        let encoded = abi::encode(&[
            Token::FixedBytes(claim.claim.as_bytes().to_vec()),
            Token::Uint(U256::from(claim.position)),
        ]);
        Ok(H256::from(keccak256(encoded)))
    }

    /// Resolves the subgame rooted at `claim_index`.
    ///
    /// Children without children of their own are resolved implicitly; deeper subgames must
    /// have been resolved first. Resolving the root resolves every remaining subgame bottom-up
    /// and settles the game.
    ///
    /// ### Returns
    /// - `Ok(GameStatus)`: The status of the game after the call.
    pub fn resolve_claim(
        &mut self,
        env: &Env<'_>,
        claim_index: usize,
    ) -> Result<GameStatus, FaultGameError> {
        self.ensure_in_progress()?;
        if claim_index >= self.claim_data.len() {
            return Err(FaultGameError::InvalidParent);
        }
        self.ensure_clock_expired(claim_index, env.timestamp)?;
        if self.subgames[claim_index].resolution.is_some() {
            return Err(FaultGameError::ClaimAlreadyResolved);
        }

        let mut resolutions: Vec<Option<Resolution>> =
            self.subgames.iter().map(|subgame| subgame.resolution).collect();

        if claim_index == 0 {
            // Children always have a higher index than their parent.
            for index in (1..self.claim_data.len()).rev() {
                if resolutions[index].is_none() {
                    self.ensure_clock_expired(index, env.timestamp)?;
                    resolutions[index] = Some(self.resolution_of(index, &resolutions));
                }
            }
        } else {
            for &child in &self.subgames[claim_index].children {
                let child = child as usize;
                if resolutions[child].is_some() {
                    continue;
                }
                if !self.subgames[child].children.is_empty() {
                    return Err(FaultGameError::OutOfOrderResolution);
                }
                self.ensure_clock_expired(child, env.timestamp)?;
                resolutions[child] = Some(self.resolution_of(child, &resolutions));
            }
        }

        let resolution = self.resolution_of(claim_index, &resolutions);
        resolutions[claim_index] = Some(resolution);
        for (subgame, resolution) in self.subgames.iter_mut().zip(resolutions) {
            subgame.resolution = resolution;
        }

        if claim_index != 0 {
            tracing::debug!(target: "fault-game", "Resolved claim {} as {:?}", claim_index, resolution);
            return Ok(GameStatus::InProgress);
        }

        let status = match resolution {
            Resolution::Countered => GameStatus::ChallengerWins,
            Resolution::Stands => GameStatus::DefenderWins,
        };
        self.phase = GamePhase::Resolved(status);
        self.subgame_at_root_resolved = true;
        self.logs.push(Event::Resolved { status });

        tracing::info!(target: "fault-game", "Game {:?} resolved: {}", self.address, status);
        Ok(status)
    }

    /// Returns the terminal status of the game once the root subgame has been resolved.
    pub fn resolve(&self) -> Result<GameStatus, FaultGameError> {
        match self.phase {
            GamePhase::Uninitialized => Err(FaultGameError::NotInitialized),
            GamePhase::InProgress => Err(FaultGameError::OutOfOrderResolution),
            GamePhase::Resolved(status) => Ok(status),
        }
    }

    /// Returns the address of the game proxy.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the type of the game.
    pub fn game_type(&self) -> GameType {
        self.args.game_type
    }

    /// Returns the root claim.
    pub fn root_claim(&self) -> Claim {
        self.args.root_claim
    }

    /// Returns the extra data the game was created with.
    pub fn extra_data(&self) -> &Bytes {
        &self.args.extra_data
    }

    /// Returns the account that created the game.
    pub fn creator(&self) -> Address {
        self.args.creator
    }

    /// Returns the current lifecycle phase.
    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    /// Returns the status of the game.
    pub fn status(&self) -> GameStatus {
        match self.phase {
            GamePhase::Resolved(status) => status,
            _ => GameStatus::InProgress,
        }
    }

    /// Returns the timestamp at which the game was initialized.
    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Returns the L1 head recorded at initialization.
    pub fn l1_head(&self) -> H256 {
        self.l1_head
    }

    /// Returns the disputed L2 block number.
    pub fn l2_block_number(&self) -> u64 {
        self.l2_block_number
    }

    /// Returns the output proposal preceding the disputed one.
    pub fn starting_output(&self) -> OutputProposal {
        self.starting_output
    }

    /// Returns the disputed output proposal.
    pub fn disputed_output(&self) -> OutputProposal {
        self.disputed_output
    }

    /// Returns the claim at `index`.
    pub fn claim_data(&self, index: usize) -> Option<ClaimData> {
        self.claim_data.get(index).copied()
    }

    /// Returns every claim in the game.
    pub fn claims(&self) -> &[ClaimData] {
        &self.claim_data
    }

    /// Returns the number of claims in the game.
    pub fn claim_data_len(&self) -> usize {
        self.claim_data.len()
    }

    /// Returns the resolution of the subgame rooted at `index`, if it was resolved.
    pub fn resolution(&self, index: usize) -> Option<Resolution> {
        self.subgames.get(index).and_then(|subgame| subgame.resolution)
    }

    /// Returns whether the root subgame has been resolved.
    pub fn subgame_at_root_resolved(&self) -> bool {
        self.subgame_at_root_resolved
    }

    /// Returns the value held by the game.
    pub fn balance(&self) -> U256 {
        self.balance
    }

    /// Returns the configuration of the game.
    pub fn config(&self) -> &FaultGameConfig {
        &self.config
    }

    /// Drains the events emitted since the last call.
    pub fn take_logs(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.logs)
    }

    fn ensure_in_progress(&self) -> Result<(), FaultGameError> {
        match self.phase {
            GamePhase::Uninitialized => Err(FaultGameError::NotInitialized),
            GamePhase::InProgress => Ok(()),
            GamePhase::Resolved(_) => Err(FaultGameError::GameNotInProgress),
        }
    }

    fn ensure_clock_expired(&self, index: usize, now: u64) -> Result<(), FaultGameError> {
        if self.claim_data[index].clock.elapsed_at(now) < self.config.game_duration / 2 {
            return Err(FaultGameError::ClockNotExpired);
        }
        Ok(())
    }

    fn resolution_of(&self, index: usize, resolutions: &[Option<Resolution>]) -> Resolution {
        let subgame = &self.subgames[index];
        let countered = subgame.stepped
            || subgame
                .children
                .iter()
                .any(|&child| resolutions[child as usize] == Some(Resolution::Stands));
        if countered {
            Resolution::Countered
        } else {
            Resolution::Stands
        }
    }

    /// Walks up from `start` to the first claim committing to the same trace index as `position`.
    fn find_trace_ancestor(&self, position: u128, start: u32) -> Result<ClaimData, FaultGameError> {
        let max_depth = self.config.max_game_depth;
        let trace_index = position.trace_index(max_depth);

        let mut index = start;
        while index != ROOT_PARENT_INDEX {
            let ancestor = self
                .claim_data
                .get(index as usize)
                .ok_or(FaultGameError::InvalidParent)?;
            if ancestor.position.trace_index(max_depth) == trace_index {
                return Ok(*ancestor);
            }
            index = ancestor.parent_index;
        }
        Err(FaultGameError::InvalidParent)
    }

    fn push_claim(&mut self, claim: ClaimData) -> usize {
        let index = self.claim_data.len();
        self.claims
            .insert(claim_hash(claim.parent_index, claim.position, claim.claim));
        if !claim.is_root() {
            self.subgames[claim.parent_index as usize]
                .children
                .push(index as u32);
        }
        self.claim_data.push(claim);
        self.subgames.push(Subgame::default());
        index
    }
}

/// `keccak256(abi.encode(uint256 parentIndex, uint128 position, bytes32 claim))`
fn claim_hash(parent_index: u32, position: u128, claim: Claim) -> H256 {
    let encoded = abi::encode(&[
        Token::Uint(U256::from(parent_index)),
        Token::Uint(U256::from(position)),
        Token::FixedBytes(claim.as_bytes().to_vec()),
    ]);
    H256::from(keccak256(encoded))
}

fn decode_l2_block_number(extra_data: &[u8]) -> Result<u64, FaultGameError> {
    if extra_data.len() > 32 {
        return Err(FaultGameError::InvalidExtraData);
    }
    let number = U256::from_big_endian(extra_data);
    if number > U256::from(u64::MAX) {
        return Err(FaultGameError::InvalidExtraData);
    }
    Ok(number.as_u64())
}

/// Left-aligns `value` in a word, i.e. `bytes32(value << 192)`.
fn u64_fragment(value: u64) -> H256 {
    let mut word = H256::zero();
    word.as_bytes_mut()[..8].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        preimage::localize_ident, AlphabetVm, BigStepper, FaultGameImplementation,
        MemoryPreimageOracle, OutputOracleConfig, PreimageOracle, VmError,
    };

    const T0: u64 = 1_700_000_000;
    const PROXY: Address = Address::repeat_byte(0x77);
    const ACTOR: Address = Address::repeat_byte(0x42);
    const PROPOSER: Address = Address::repeat_byte(0x01);
    const PRESTATE_DATA: &[u8] = b"absolute prestate";

    /// A VM that always returns the same post-state.
    #[derive(Debug)]
    struct FixedStepper {
        post: H256,
        oracle: Arc<MemoryPreimageOracle>,
    }

    impl BigStepper for FixedStepper {
        fn step(&self, _: &[u8], _: &[u8], _: H256) -> Result<H256, VmError> {
            Ok(self.post)
        }

        fn oracle(&self) -> Arc<dyn PreimageOracle> {
            self.oracle.clone()
        }
    }

    fn history(n: u64) -> Option<H256> {
        Some(H256::from_low_u64_be(0xF000 + n))
    }

    fn env(t: u64) -> Env<'static> {
        Env::new(ACTOR, 100 + t, T0 + t, &history)
    }

    /// An output oracle with outputs for L2 blocks 0, 50 and 100.
    fn output_oracle() -> OutputOracle {
        let mut oracle = OutputOracle::new(
            OutputOracleConfig {
                submission_interval: 50,
                l2_block_time: 2,
                starting_block_number: 0,
                starting_timestamp: T0 - 10_000,
                genesis_output_root: H256::repeat_byte(0x01),
                proposer: PROPOSER,
                owner: PROPOSER,
            },
            T0 - 20_000,
        )
        .unwrap();
        let proposer = Env::new(PROPOSER, 50, T0 - 100, &history);
        oracle
            .propose_l2_output(&proposer, H256::repeat_byte(0x02), 50, T0 - 9_900, H256::zero(), 0)
            .unwrap();
        oracle
            .propose_l2_output(&proposer, H256::repeat_byte(0x03), 100, T0 - 9_800, H256::zero(), 0)
            .unwrap();
        oracle
    }

    struct Harness {
        game: FaultDisputeGame,
        output_oracle: OutputOracle,
        block_oracle: BlockOracle,
        preimages: Arc<MemoryPreimageOracle>,
    }

    impl Harness {
        fn new(
            vm: impl FnOnce(Arc<MemoryPreimageOracle>) -> (Claim, Arc<dyn BigStepper>),
            args: ImmutableArgs,
        ) -> Self {
            let preimages = Arc::new(MemoryPreimageOracle::new());
            let (absolute_prestate, vm) = vm(preimages.clone());
            let implementation = FaultGameImplementation::new(
                Address::repeat_byte(0x1F),
                FaultGameConfig {
                    absolute_prestate,
                    max_game_depth: 4,
                    game_duration: 600,
                    l2_chain_id: 10,
                    vm,
                },
            )
            .unwrap();

            Self {
                game: implementation.clone_with(PROXY, &args.abi_encode()).unwrap(),
                output_oracle: output_oracle(),
                block_oracle: BlockOracle::new(),
                preimages,
            }
        }

        fn initialize(&mut self) -> Result<(), FaultGameError> {
            self.game.initialize(
                &env(0),
                InitContext {
                    output_oracle: &self.output_oracle,
                    block_oracle: &mut self.block_oracle,
                },
            )
        }
    }

    fn args(root_claim: Claim, extra_data: Vec<u8>) -> ImmutableArgs {
        ImmutableArgs {
            game_type: GameType::FAULT,
            root_claim,
            creator: ACTOR,
            extra_data: Bytes::from(extra_data),
            parent_block_hash: H256::repeat_byte(0x99),
        }
    }

    /// A game over L2 block 100 rooted at `0xAA..A` whose VM always returns `post`.
    fn fixed_game(post: H256) -> Harness {
        let mut harness = Harness::new(
            |oracle| {
                let vm: Arc<dyn BigStepper> = Arc::new(FixedStepper { post, oracle });
                (H256::from(keccak256(PRESTATE_DATA)), vm)
            },
            args(H256::repeat_byte(0xAA), vec![0x00, 0x64]),
        );
        harness.initialize().unwrap();
        harness
    }

    /// Attacks down the leftmost path to depth 4 at t = 10, 20, 30, 40.
    fn attack_to_max_depth(game: &mut FaultDisputeGame) {
        for (i, byte) in [0xBB, 0xCC, 0xDD, 0xEE].into_iter().enumerate() {
            let t = 10 * (i as u64 + 1);
            game.attack(&env(t), i, H256::repeat_byte(byte)).unwrap();
        }
    }

    #[test]
    fn initialize_snapshots_outputs_and_pushes_root() {
        let harness = fixed_game(H256::zero());
        let game = &harness.game;

        assert_eq!(game.status(), GameStatus::InProgress);
        assert_eq!(game.l2_block_number(), 100);
        assert_eq!(game.starting_output().output_root, H256::repeat_byte(0x02));
        assert_eq!(game.disputed_output().output_root, H256::repeat_byte(0x03));
        assert_eq!(game.l1_head(), H256::from_low_u64_be(0xF000 + 99));
        assert_eq!(game.created_at(), T0);

        let root = game.claim_data(0).unwrap();
        assert_eq!(root.parent_index, ROOT_PARENT_INDEX);
        assert_eq!(root.position, 1);
        assert_eq!(root.clock, Clock::new(0, T0));
        assert_eq!(root.claim, H256::repeat_byte(0xAA));
        assert_eq!(harness.block_oracle.load(99).unwrap().hash, game.l1_head());
    }

    #[test]
    fn initialize_rejections() {
        let fixed = |oracle| {
            let vm: Arc<dyn BigStepper> = Arc::new(FixedStepper {
                post: H256::zero(),
                oracle,
            });
            (H256::zero(), vm)
        };

        let mut harness = Harness::new(fixed, args(H256::repeat_byte(0xAA), vec![0x00, 0x64]));
        harness.initialize().unwrap();
        assert_eq!(harness.initialize(), Err(FaultGameError::AlreadyInitialized));

        let mut harness = Harness::new(fixed, args(H256::repeat_byte(0x03), vec![0x64]));
        assert_eq!(
            harness.initialize(),
            Err(FaultGameError::UnexpectedRootClaim(H256::repeat_byte(0x03)))
        );

        for block in [0u8, 101] {
            let mut harness = Harness::new(fixed, args(H256::repeat_byte(0xAA), vec![block]));
            assert_eq!(
                harness.initialize(),
                Err(FaultGameError::L2BlockNumberOutOfRange(block as u64))
            );
        }

        let mut harness = Harness::new(fixed, args(H256::repeat_byte(0xAA), vec![1; 33]));
        assert_eq!(harness.initialize(), Err(FaultGameError::InvalidExtraData));

        let mut no_parent = args(H256::repeat_byte(0xAA), vec![0x64]);
        no_parent.parent_block_hash = H256::zero();
        let mut harness = Harness::new(fixed, no_parent);
        assert_eq!(harness.initialize(), Err(FaultGameError::L1HeadTooOld));

        // Failed initializations leave the game untouched.
        assert_eq!(harness.game.phase(), GamePhase::Uninitialized);
        assert_eq!(harness.game.claim_data_len(), 0);
        assert_eq!(
            harness.game.attack(&env(1), 0, H256::zero()),
            Err(FaultGameError::NotInitialized)
        );
    }

    #[test]
    fn step_counters_the_leaf_and_challenger_wins() {
        let mut harness = fixed_game(H256::repeat_byte(0x42));
        let game = &mut harness.game;
        attack_to_max_depth(game);
        assert_eq!(game.claim_data(4).unwrap().position, 16);

        game.step(&env(50), 4, true, PRESTATE_DATA, &[]).unwrap();
        assert!(game.claim_data(4).unwrap().countered);

        for index in (1..=4).rev() {
            assert_eq!(game.resolve_claim(&env(610), index), Ok(GameStatus::InProgress));
        }
        assert_eq!(game.resolution(4), Some(Resolution::Countered));
        assert_eq!(game.resolution(3), Some(Resolution::Stands));
        assert_eq!(game.resolution(2), Some(Resolution::Countered));
        assert_eq!(game.resolution(1), Some(Resolution::Stands));

        assert_eq!(game.resolve(), Err(FaultGameError::OutOfOrderResolution));
        assert_eq!(game.resolve_claim(&env(610), 0), Ok(GameStatus::ChallengerWins));
        assert_eq!(game.resolve(), Ok(GameStatus::ChallengerWins));
        assert!(game.subgame_at_root_resolved());
        assert_eq!(
            game.take_logs().last(),
            Some(&Event::Resolved {
                status: GameStatus::ChallengerWins
            })
        );
    }

    #[test]
    fn agreeing_step_is_rejected_and_defender_wins() {
        let mut harness = fixed_game(H256::repeat_byte(0xEE));
        let game = &mut harness.game;
        attack_to_max_depth(game);

        assert_eq!(
            game.step(&env(50), 4, true, PRESTATE_DATA, &[]),
            Err(FaultGameError::ValidStep)
        );
        assert_eq!(game.resolve_claim(&env(610), 0), Ok(GameStatus::DefenderWins));
        assert_eq!(game.resolution(4), Some(Resolution::Stands));
        assert_eq!(game.resolution(1), Some(Resolution::Countered));
        assert_eq!(
            game.attack(&env(620), 4, H256::zero()),
            Err(FaultGameError::GameNotInProgress)
        );
    }

    #[test]
    fn cannot_defend_the_root() {
        let mut harness = fixed_game(H256::zero());
        assert_eq!(
            harness.game.move_(&env(10), 0, H256::repeat_byte(0xBB), false),
            Err(FaultGameError::CannotDefendRootClaim)
        );
    }

    #[test]
    fn duplicate_claims_are_rejected() {
        let mut harness = fixed_game(H256::zero());
        let game = &mut harness.game;
        game.attack(&env(10), 0, H256::repeat_byte(0xBB)).unwrap();
        assert_eq!(
            game.attack(&env(11), 0, H256::repeat_byte(0xBB)),
            Err(FaultGameError::ClaimAlreadyExists)
        );
        // A different claim at the same position is a fresh claim.
        assert_eq!(game.attack(&env(12), 0, H256::repeat_byte(0xBC)), Ok(2));
    }

    #[test]
    fn resolution_waits_for_the_clock() {
        let mut harness = fixed_game(H256::zero());
        assert_eq!(
            harness.game.resolve_claim(&env(100), 0),
            Err(FaultGameError::ClockNotExpired)
        );
        assert_eq!(harness.game.status(), GameStatus::InProgress);
    }

    #[test]
    fn moves_respect_depth_and_clock() {
        let mut harness = fixed_game(H256::zero());
        let game = &mut harness.game;
        attack_to_max_depth(game);

        assert_eq!(
            game.attack(&env(50), 4, H256::repeat_byte(0xFF)),
            Err(FaultGameError::GameDepthExceeded)
        );
        assert_eq!(
            game.attack(&env(400), 3, H256::repeat_byte(0xFF)),
            Err(FaultGameError::ClockTimeExceeded)
        );
        assert_eq!(
            game.attack(&env(50), 9, H256::repeat_byte(0xFF)),
            Err(FaultGameError::InvalidParent)
        );

        for claim in game.claims().iter().skip(1) {
            let parent = game.claim_data(claim.parent_index as usize).unwrap();
            assert!(claim.position.depth() <= game.config().max_game_depth);
            assert_eq!(claim.position.depth(), parent.position.depth() + 1);
            assert!(claim.clock.duration >= parent.clock.duration);
            assert!(parent.countered);
        }
    }

    #[test]
    fn out_of_order_resolution() {
        let mut harness = fixed_game(H256::zero());
        let game = &mut harness.game;
        attack_to_max_depth(game);

        assert_eq!(
            game.resolve_claim(&env(610), 2),
            Err(FaultGameError::OutOfOrderResolution)
        );
        game.resolve_claim(&env(610), 3).unwrap();
        assert_eq!(
            game.resolve_claim(&env(610), 3),
            Err(FaultGameError::ClaimAlreadyResolved)
        );
        // Claim 4 was resolved implicitly by its parent.
        assert_eq!(game.resolution(4), Some(Resolution::Stands));
        game.resolve_claim(&env(610), 2).unwrap();
    }

    /// A game over the alphabet trace rooted at a dishonest claim for trace index 15.
    fn alphabet_game() -> Harness {
        let mut harness = Harness::new(
            |oracle| {
                let prestate = AlphabetVm::prestate_claim(b'a' - 1);
                let vm: Arc<dyn BigStepper> = Arc::new(AlphabetVm::new(prestate, oracle));
                (prestate, vm)
            },
            args(AlphabetVm::claim(15, b'z'), vec![0x64]),
        );
        harness.initialize().unwrap();

        let game = &mut harness.game;
        game.attack(&env(1), 0, AlphabetVm::claim(7, b'h')).unwrap();
        game.defend(&env(2), 1, AlphabetVm::claim(11, b'l')).unwrap();
        game.defend(&env(3), 2, AlphabetVm::claim(13, b'n')).unwrap();
        game.defend(&env(4), 3, AlphabetVm::claim(14, b'o')).unwrap();
        harness
    }

    #[test]
    fn defense_step_against_the_root() {
        let mut harness = alphabet_game();
        let game = &mut harness.game;
        assert_eq!(game.claim_data(4).unwrap().position, 30);

        // Stepping from the honest claim at trace index 14 disagrees with the root at 15.
        game.step(&env(5), 4, false, &AlphabetVm::state_data(14, b'o'), &[])
            .unwrap();
        assert!(game.claim_data(4).unwrap().countered);
        assert_eq!(game.resolve_claim(&env(600), 0), Ok(GameStatus::ChallengerWins));
    }

    #[test]
    fn step_rejections() {
        let mut harness = alphabet_game();
        let game = &mut harness.game;

        // The VM agrees with claim 4 when executing from the claim at trace index 13.
        assert_eq!(
            game.step(&env(5), 4, true, &AlphabetVm::state_data(13, b'n'), &[]),
            Err(FaultGameError::ValidStep)
        );
        assert_eq!(
            game.step(&env(5), 4, false, &AlphabetVm::state_data(13, b'n'), &[]),
            Err(FaultGameError::InvalidPrestate)
        );
        assert_eq!(
            game.step(&env(5), 3, true, &AlphabetVm::state_data(12, b'm'), &[]),
            Err(FaultGameError::InvalidParent)
        );
        assert!(!game.claim_data(4).unwrap().countered);
    }

    #[test]
    fn local_data_is_namespaced_by_game_and_context() {
        let harness = fixed_game(H256::zero());
        let game = &harness.game;
        let context = game.local_context(0).unwrap();

        let key = game
            .add_local_data(LocalIdent::L2BlockNumber as u64, context, 8)
            .unwrap();
        assert_eq!(key, localize_ident(4, PROXY, context));
        assert_eq!(
            harness.preimages.read_preimage(key, 8),
            Ok((u64_fragment(100), 8))
        );
        assert_eq!(harness.preimages.preimage_length(key), Some(8));

        let key = game
            .add_local_data(LocalIdent::ChainId as u64, context, 0)
            .unwrap();
        let mut prefixed = [0u8; 32];
        prefixed[7] = 8;
        prefixed[15] = 10;
        assert_eq!(
            harness.preimages.read_preimage(key, 0),
            Ok((H256::from(prefixed), 16))
        );

        let key = game
            .add_local_data(LocalIdent::DisputedOutputRoot as u64, context, 8)
            .unwrap();
        assert_eq!(
            harness.preimages.read_preimage(key, 8),
            Ok((H256::repeat_byte(0x03), 32))
        );

        assert_eq!(
            game.add_local_data(6, context, 0),
            Err(FaultGameError::InvalidLocalIdent(6))
        );
    }

    #[test]
    fn local_data_is_isolated_across_contexts_and_proxies() {
        let mut harness = fixed_game(H256::zero());
        harness.game.attack(&env(10), 0, H256::repeat_byte(0xBB)).unwrap();
        let ident = LocalIdent::DisputedOutputRoot as u64;

        let root_context = harness.game.local_context(0).unwrap();
        let child_context = harness.game.local_context(1).unwrap();
        assert_ne!(root_context, child_context);

        let root_key = harness.game.add_local_data(ident, root_context, 8).unwrap();
        let child_key = harness.game.add_local_data(ident, child_context, 8).unwrap();
        assert_ne!(root_key, child_key);
        for key in [root_key, child_key] {
            assert_eq!(
                harness.preimages.read_preimage(key, 8),
                Ok((H256::repeat_byte(0x03), 32))
            );
        }

        // Two proxies of one implementation share its VM and preimage oracle.
        let implementation = FaultGameImplementation::new(
            Address::repeat_byte(0x1F),
            FaultGameConfig {
                absolute_prestate: H256::from(keccak256(PRESTATE_DATA)),
                max_game_depth: 4,
                game_duration: 600,
                l2_chain_id: 10,
                vm: Arc::new(FixedStepper {
                    post: H256::zero(),
                    oracle: harness.preimages.clone(),
                }),
            },
        )
        .unwrap();
        let other_proxy = Address::repeat_byte(0x78);
        let mut other = implementation
            .clone_with(other_proxy, &args(H256::repeat_byte(0xAA), vec![0x32]).abi_encode())
            .unwrap();
        other
            .initialize(
                &env(0),
                InitContext {
                    output_oracle: &harness.output_oracle,
                    block_oracle: &mut harness.block_oracle,
                },
            )
            .unwrap();
        assert_eq!(other.l2_block_number(), 50);

        let ident = LocalIdent::L2BlockNumber as u64;
        let key = harness.game.add_local_data(ident, root_context, 8).unwrap();
        let other_key = other.add_local_data(ident, root_context, 8).unwrap();
        assert_eq!(other_key, localize_ident(ident, other_proxy, root_context));
        assert_ne!(key, other_key);
        assert_eq!(
            harness.preimages.read_preimage(key, 8),
            Ok((u64_fragment(100), 8))
        );
        assert_eq!(
            harness.preimages.read_preimage(other_key, 8),
            Ok((u64_fragment(50), 8))
        );
    }
}
