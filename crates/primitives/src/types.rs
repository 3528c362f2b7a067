//! The types module contains all of the types relevant to the fault dispute game and the oracles
//! that feed it.

use crate::{Clock, PackedGameId};
use ethers::{
    abi::{self, ParamType, Token},
    types::{Bytes, H256, U256},
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The [Claim] type represents a claim on the execution trace at a given trace index that is
/// made by a participant in a dispute game.
pub type Claim = H256;

/// The parent index of the root claim, which has no parent.
pub const ROOT_PARENT_INDEX: u32 = u32::MAX;

/// The [ClaimData] struct represents a [Claim] as well as the data associated with it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimData {
    /// The index of the parent claim in the DAG array.
    pub parent_index: u32,
    /// Whether or not the current claim has ever been countered.
    pub countered: bool,
    /// The claim that is being made at the trace index relative to the position.
    pub claim: Claim,
    /// The position of the claim within the game tree.
    pub position: u128,
    /// The clock that is used to track the duration elapsed and timestamp of the claim.
    pub clock: Clock,
}

/// An error that occurred while decoding an ABI-encoded value.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The bytes were not a valid encoding of the expected tuple.
    #[error("abi decoding failed: {0}")]
    Abi(#[from] abi::Error),
    /// A decoded token did not have the expected kind.
    #[error("unexpected token for field `{0}`")]
    UnexpectedToken(&'static str),
    /// A decoded integer does not fit its field.
    #[error("value out of range for field `{0}`")]
    Overflow(&'static str),
}

impl ClaimData {
    /// The parameter types of the `(uint32, bool, bytes32, uint128, uint128)` tuple.
    const PARAMS: [ParamType; 5] = [
        ParamType::Uint(32),
        ParamType::Bool,
        ParamType::FixedBytes(32),
        ParamType::Uint(128),
        ParamType::Uint(128),
    ];

    /// Returns true if the claim is the root of the game tree.
    pub const fn is_root(&self) -> bool {
        self.parent_index == ROOT_PARENT_INDEX
    }

    /// Encodes the claim as the `(uint32 parentIndex, bool countered, bytes32 claim,
    /// uint128 position, uint128 clock)` tuple streamed to clients.
    pub fn abi_encode(&self) -> Vec<u8> {
        abi::encode(&[
            Token::Uint(U256::from(self.parent_index)),
            Token::Bool(self.countered),
            Token::FixedBytes(self.claim.as_bytes().to_vec()),
            Token::Uint(U256::from(self.position)),
            Token::Uint(U256::from(self.clock.pack())),
        ])
    }

    /// Decodes a claim from the tuple produced by [ClaimData::abi_encode].
    pub fn abi_decode(data: &[u8]) -> Result<Self, CodecError> {
        let mut tokens = abi::decode(&Self::PARAMS, data)?.into_iter();
        let mut next = |field| tokens.next().ok_or(CodecError::UnexpectedToken(field));

        let parent_index = uint_token(next("parentIndex")?, 32, "parentIndex")?.low_u32();
        let countered = next("countered")?
            .into_bool()
            .ok_or(CodecError::UnexpectedToken("countered"))?;
        let claim = next("claim")?
            .into_fixed_bytes()
            .filter(|b| b.len() == 32)
            .map(|b| H256::from_slice(&b))
            .ok_or(CodecError::UnexpectedToken("claim"))?;
        let position = uint_token(next("position")?, 128, "position")?.low_u128();
        let clock = uint_token(next("clock")?, 128, "clock")?.low_u128();

        Ok(Self {
            parent_index,
            countered,
            claim,
            position,
            clock: Clock::unpack(clock),
        })
    }
}

/// Unwraps a uint token, checking that it fits in `bits` bits.
fn uint_token(token: Token, bits: usize, field: &'static str) -> Result<U256, CodecError> {
    let value = token
        .into_uint()
        .ok_or(CodecError::UnexpectedToken(field))?;
    if value.bits() > bits {
        return Err(CodecError::Overflow(field));
    }
    Ok(value)
}

/// The [GameStatus] enum represents the lifecycle outcome of a dispute game.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum GameStatus {
    /// The game is still being played.
    #[default]
    InProgress = 0,
    /// The root claim was countered.
    ChallengerWins = 1,
    /// The root claim stood.
    DefenderWins = 2,
}

impl GameStatus {
    /// Returns true once the game has reached a terminal status.
    pub const fn is_resolved(&self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

impl TryFrom<u8> for GameStatus {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::InProgress),
            1 => Ok(Self::ChallengerWins),
            2 => Ok(Self::DefenderWins),
            other => Err(other),
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InProgress => write!(f, "IN_PROGRESS"),
            Self::ChallengerWins => write!(f, "CHALLENGER_WINS"),
            Self::DefenderWins => write!(f, "DEFENDER_WINS"),
        }
    }
}

/// An L2 output root proposed to the output oracle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputProposal {
    /// The output root committing to the L2 state.
    pub output_root: H256,
    /// The L1 timestamp at which the output was proposed.
    pub timestamp: u64,
    /// The L2 block number the output commits to.
    pub l2_block_number: u64,
}

/// A block hash recorded by the block oracle, along with the time it was recorded.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockInfo {
    /// The hash of the block.
    pub hash: H256,
    /// The timestamp at which the hash was recorded.
    pub timestamp: u64,
}

/// An entry returned by the factory's latest-games search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSearchResult {
    /// The index of the game in the factory's game list.
    pub index: usize,
    /// The packed game id.
    pub metadata: PackedGameId,
    /// The timestamp at which the game was created.
    pub timestamp: u64,
    /// The root claim of the game.
    pub root_claim: Claim,
    /// The extra data the game was created with.
    pub extra_data: Bytes,
}
