//! The state module holds the [GlobalState] struct, which is shared between all drivers of an
//! agent.

use ethers::types::{Address, H256};
use op_dispute_contracts::FaultDisputeGame;
use op_dispute_primitives::{GameStatus, GameType};
use op_dispute_solvers::fault::AlphabetGame;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// The [GlobalState] struct holds all of the shared state between drivers.
#[derive(Debug, Default)]
pub struct GlobalState {
    /// The games the agent is playing, by proxy address.
    pub games: HashMap<Address, TrackedGame>,
    /// The L2 block numbers of outputs the agent already sent a challenge for.
    pub pending_challenges: HashSet<u64>,
}

impl GlobalState {
    /// Returns the addresses of the games that have not been resolved yet.
    pub fn active_games(&self) -> Vec<Address> {
        self.games
            .iter()
            .filter(|(_, game)| !game.status.is_resolved())
            .map(|(address, _)| *address)
            .collect()
    }
}

/// A game tracked by an agent.
#[derive(Debug)]
pub struct TrackedGame {
    /// The agent's view of the game.
    pub solver: AlphabetGame,
    /// The indices of the claims the agent has already responded to.
    pub responded: HashSet<usize>,
    /// Whether the agent already asked for the game to be resolved.
    pub resolution_requested: bool,
    /// The last observed status of the game.
    pub status: GameStatus,
}

impl TrackedGame {
    /// Starts tracking a game from the agent's solver.
    pub fn new(solver: AlphabetGame) -> Self {
        Self {
            solver,
            responded: HashSet::new(),
            resolution_requested: false,
            status: GameStatus::InProgress,
        }
    }
}

/// A serializable snapshot of a dispute game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    /// The game proxy.
    pub address: Address,
    /// The type of the game.
    pub game_type: GameType,
    /// The root claim.
    pub root_claim: H256,
    /// The disputed L2 block number.
    pub l2_block_number: u64,
    /// The number of claims in the tree.
    pub claims: usize,
    /// The number of countered claims.
    pub countered: usize,
    /// The status of the game.
    pub status: GameStatus,
}

impl From<&FaultDisputeGame> for GameSummary {
    fn from(game: &FaultDisputeGame) -> Self {
        Self {
            address: game.address(),
            game_type: game.game_type(),
            root_claim: game.root_claim(),
            l2_block_number: game.l2_block_number(),
            claims: game.claim_data_len(),
            countered: game.claims().iter().filter(|c| c.countered).count(),
            status: game.status(),
        }
    }
}
