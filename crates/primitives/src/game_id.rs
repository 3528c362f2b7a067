//! The game_id module holds the [GameType], [GameId] and [PackedGameId] types used by the
//! dispute game factory to index created games.

use ethers::types::{Address, U256};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The [GameType] identifies a family of dispute games with a cloneable implementation in the
/// factory.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GameType(pub u8);

impl GameType {
    /// Fault dispute games backed by the production VM.
    pub const FAULT: Self = Self(0);
    /// Validity games.
    pub const VALIDITY: Self = Self(1);
    /// Output attestation games.
    pub const ATTESTATION: Self = Self(2);
    /// Fault dispute games backed by the alphabet VM.
    pub const ALPHABET: Self = Self(255);
}

impl From<u8> for GameType {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl fmt::Display for GameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::FAULT => write!(f, "fault"),
            Self::VALIDITY => write!(f, "validity"),
            Self::ATTESTATION => write!(f, "attestation"),
            Self::ALPHABET => write!(f, "alphabet"),
            Self(other) => write!(f, "{other}"),
        }
    }
}

/// The decoded form of a dispute game identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId {
    /// The type of the game.
    pub game_type: GameType,
    /// The timestamp at which the game was created.
    pub timestamp: u64,
    /// The address of the game proxy.
    pub proxy: Address,
}

/// The packed form of a [GameId], a single 256-bit word.
///
/// **Layout**:
/// |   Bits     | Description |
/// |------------|-------------|
/// | [248, 256) | Game type   |
/// | [184, 248) | Timestamp   |
/// | [160, 184) | Zero        |
/// | [0, 160)   | Proxy       |
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackedGameId(pub U256);

impl GameId {
    /// Creates a new [GameId].
    pub const fn new(game_type: GameType, timestamp: u64, proxy: Address) -> Self {
        Self {
            game_type,
            timestamp,
            proxy,
        }
    }

    /// Packs the [GameId] into a [PackedGameId].
    pub fn pack(&self) -> PackedGameId {
        let game_type = U256::from(self.game_type.0) << 248;
        let timestamp = U256::from(self.timestamp) << 184;
        let proxy = U256::from_big_endian(self.proxy.as_bytes());
        PackedGameId(game_type | timestamp | proxy)
    }
}

impl PackedGameId {
    /// Unpacks the word into its [GameId] components.
    pub fn unpack(&self) -> GameId {
        let mut word = [0u8; 32];
        self.0.to_big_endian(&mut word);

        let mut timestamp = [0u8; 8];
        timestamp.copy_from_slice(&word[1..9]);

        GameId {
            game_type: GameType(word[0]),
            timestamp: u64::from_be_bytes(timestamp),
            proxy: Address::from_slice(&word[12..]),
        }
    }
}

impl From<GameId> for PackedGameId {
    fn from(id: GameId) -> Self {
        id.pack()
    }
}

impl From<PackedGameId> for GameId {
    fn from(packed: PackedGameId) -> Self {
        packed.unpack()
    }
}
