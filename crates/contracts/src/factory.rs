//! The `factory` module contains the [DisputeGameFactory], which creates dispute game proxies at
//! deterministic addresses and indexes them by their UUID.

use crate::{
    fault::{FaultDisputeGame, FaultGameError, FaultGameImplementation, ImmutableArgs, InitContext},
    Env, ErrorKind, Event,
};
use ethers::{
    abi::{self, Token},
    types::{Address, Bytes, H256, U256},
    utils::{get_contract_address, keccak256},
};
use op_dispute_primitives::{Claim, GameId, GameSearchResult, GameType, PackedGameId};
use std::collections::HashMap;
use thiserror::Error;

/// An error returned by the [DisputeGameFactory].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// The caller is not the owner. Validation.
    #[error("Caller {0:?} is not the owner")]
    NotOwner(Address),
    /// No implementation is registered for the game type. External.
    #[error("No implementation for game type {0}")]
    NoImplementation(GameType),
    /// The attached value does not equal the creation bond. Validation.
    #[error("Incorrect bond amount. Expected {expected}, got {got}")]
    IncorrectBondAmount {
        /// The creation bond of the game type.
        expected: U256,
        /// The attached value.
        got: U256,
    },
    /// A game with the same UUID already exists. Validation.
    #[error("Game already exists: {0:?}")]
    GameAlreadyExists(H256),
    /// The game failed to initialize.
    #[error(transparent)]
    Game(#[from] FaultGameError),
}

impl FactoryError {
    /// Returns the taxonomy kind of the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NoImplementation(_) => ErrorKind::External,
            Self::Game(err) => err.kind(),
            _ => ErrorKind::Validation,
        }
    }
}

/// The [DisputeGameFactory] clones registered game implementations into proxies.
///
/// Each game is identified by the UUID of `(gameType, rootClaim, extraData)`, so at most one game
/// may exist per tuple.
#[derive(Debug)]
pub struct DisputeGameFactory {
    address: Address,
    owner: Address,
    /// The CREATE nonce of the factory, bumped per created proxy.
    nonce: u64,
    game_impls: HashMap<GameType, FaultGameImplementation>,
    init_bonds: HashMap<GameType, U256>,
    dispute_games: HashMap<H256, PackedGameId>,
    game_list: Vec<PackedGameId>,
    instances: HashMap<Address, FaultDisputeGame>,
    logs: Vec<Event>,
}

impl DisputeGameFactory {
    /// Deploys a new factory at `address`.
    pub fn new(address: Address, owner: Address) -> Self {
        Self {
            address,
            owner,
            nonce: 1,
            game_impls: HashMap::new(),
            init_bonds: HashMap::new(),
            dispute_games: HashMap::new(),
            game_list: Vec::new(),
            instances: HashMap::new(),
            logs: Vec::new(),
        }
    }

    /// Creates and initializes a new dispute game.
    ///
    /// ### Takes
    /// - `env`: The call environment. Its value must equal the creation bond of `game_type`.
    /// - `ctx`: The collaborators the game initializes against.
    /// - `game_type`: The type of the game.
    /// - `root_claim`: The claim the game disputes.
    /// - `extra_data`: Type-specific data; the big-endian L2 block number for fault games.
    ///
    /// ### Returns
    /// - `Ok(Address)`: The address of the new game proxy.
    pub fn create(
        &mut self,
        env: &Env<'_>,
        ctx: InitContext<'_>,
        game_type: GameType,
        root_claim: Claim,
        extra_data: Bytes,
    ) -> Result<Address, FactoryError> {
        let implementation = self
            .game_impls
            .get(&game_type)
            .ok_or(FactoryError::NoImplementation(game_type))?;

        let bond = self.init_bonds(game_type);
        if env.value != bond {
            return Err(FactoryError::IncorrectBondAmount {
                expected: bond,
                got: env.value,
            });
        }

        let uuid = Self::get_game_uuid(game_type, root_claim, &extra_data);
        if self.dispute_games.contains_key(&uuid) {
            return Err(FactoryError::GameAlreadyExists(uuid));
        }

        let parent_block_hash = env
            .block_number
            .checked_sub(1)
            .and_then(|parent| env.block_hash(parent))
            .unwrap_or_default();
        let args = ImmutableArgs {
            game_type,
            root_claim,
            creator: env.caller,
            extra_data,
            parent_block_hash,
        };

        let proxy = get_contract_address(self.address, self.nonce);
        let mut game = implementation.clone_with(proxy, &args.abi_encode())?;
        game.initialize(&env.with_caller(self.address), ctx)?;

        let id = GameId::new(game_type, env.timestamp, proxy).pack();
        self.nonce += 1;
        self.dispute_games.insert(uuid, id);
        self.game_list.push(id);
        self.instances.insert(proxy, game);
        self.logs.push(Event::DisputeGameCreated {
            dispute_proxy: proxy,
            game_type,
            root_claim,
        });

        tracing::info!(target: "dispute-game-factory", "Created {} game {:?} with root claim {:?}", game_type, proxy, root_claim);
        Ok(proxy)
    }

    /// Registers the implementation cloned for `game_type`.
    pub fn set_implementation(
        &mut self,
        env: &Env<'_>,
        game_type: GameType,
        implementation: FaultGameImplementation,
    ) -> Result<(), FactoryError> {
        self.only_owner(env)?;
        self.logs.push(Event::ImplementationSet {
            implementation: implementation.address,
            game_type,
        });
        self.game_impls.insert(game_type, implementation);
        Ok(())
    }

    /// Sets the creation bond of `game_type`.
    pub fn set_init_bond(
        &mut self,
        env: &Env<'_>,
        game_type: GameType,
        bond: U256,
    ) -> Result<(), FactoryError> {
        self.only_owner(env)?;
        self.init_bonds.insert(game_type, bond);
        self.logs.push(Event::InitBondUpdated { game_type, bond });
        Ok(())
    }

    /// Transfers ownership of the factory.
    pub fn transfer_ownership(&mut self, env: &Env<'_>, new_owner: Address) -> Result<(), FactoryError> {
        self.only_owner(env)?;
        self.logs.push(Event::OwnershipTransferred {
            previous_owner: self.owner,
            new_owner,
        });
        self.owner = new_owner;
        Ok(())
    }

    /// Computes the UUID of a game: `keccak256(abi.encode(uint8 gameType, bytes32 rootClaim,
    /// bytes extraData))`.
    pub fn get_game_uuid(game_type: GameType, root_claim: Claim, extra_data: &[u8]) -> H256 {
        let encoded = abi::encode(&[
            Token::Uint(U256::from(game_type.0)),
            Token::FixedBytes(root_claim.as_bytes().to_vec()),
            Token::Bytes(extra_data.to_vec()),
        ]);
        H256::from(keccak256(encoded))
    }

    /// Returns the proxy address and creation timestamp of the game with the given UUID tuple.
    pub fn games(
        &self,
        game_type: GameType,
        root_claim: Claim,
        extra_data: &[u8],
    ) -> Option<(Address, u64)> {
        let uuid = Self::get_game_uuid(game_type, root_claim, extra_data);
        self.dispute_games.get(&uuid).map(|id| {
            let id = id.unpack();
            (id.proxy, id.timestamp)
        })
    }

    /// Returns the game created at `index`.
    pub fn game_at_index(&self, index: usize) -> Option<GameId> {
        self.game_list.get(index).map(PackedGameId::unpack)
    }

    /// Returns the number of games created.
    pub fn game_count(&self) -> usize {
        self.game_list.len()
    }

    /// Returns the implementation address registered for `game_type`.
    pub fn game_impls(&self, game_type: GameType) -> Option<Address> {
        self.game_impls.get(&game_type).map(|implementation| implementation.address)
    }

    /// Returns the creation bond of `game_type`.
    pub fn init_bonds(&self, game_type: GameType) -> U256 {
        self.init_bonds.get(&game_type).copied().unwrap_or_default()
    }

    /// Walks the game list backwards from `start`, collecting at most `n` games of `game_type`.
    pub fn find_latest_games(
        &self,
        game_type: GameType,
        start: usize,
        n: usize,
    ) -> Vec<GameSearchResult> {
        if start >= self.game_list.len() || n == 0 {
            return Vec::new();
        }

        (0..=start)
            .rev()
            .filter_map(|index| {
                let metadata = self.game_list[index];
                let id = metadata.unpack();
                if id.game_type != game_type {
                    return None;
                }
                let game = self.instances.get(&id.proxy)?;
                Some(GameSearchResult {
                    index,
                    metadata,
                    timestamp: id.timestamp,
                    root_claim: game.root_claim(),
                    extra_data: game.extra_data().clone(),
                })
            })
            .take(n)
            .collect()
    }

    /// Returns the game at `proxy`.
    pub fn game(&self, proxy: Address) -> Option<&FaultDisputeGame> {
        self.instances.get(&proxy)
    }

    /// Returns the game at `proxy` mutably.
    pub fn game_mut(&mut self, proxy: Address) -> Option<&mut FaultDisputeGame> {
        self.instances.get_mut(&proxy)
    }

    /// Returns the address of the factory.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Returns the owner of the factory.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Drains the events emitted since the last call.
    pub fn take_logs(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.logs)
    }

    fn only_owner(&self, env: &Env<'_>) -> Result<(), FactoryError> {
        if env.caller != self.owner {
            return Err(FactoryError::NotOwner(env.caller));
        }
        Ok(())
    }
}
