//! The alphabet module contains the [AlphabetVm], a [BigStepper] whose execution trace is a
//! sequence of letters.

use crate::{
    traits::{BigStepper, PreimageOracle},
    ErrorKind,
};
use ethers::{
    abi::{self, ParamType, Token},
    types::{H256, U256},
    utils::keccak256,
};
use std::sync::Arc;
use thiserror::Error;

/// An error returned by a [BigStepper].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    /// The state data could not be decoded. Protocol.
    #[error("Invalid state data: {0}")]
    InvalidStateData(String),
}

impl VmError {
    /// Returns the taxonomy kind of the error.
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Protocol
    }
}

/// The [AlphabetVm] steps from `(i, letter)` to `(i + 1, letter + 1)`. Each state commits to
/// `keccak256(abi.encode(i, letter))`; the absolute prestate is the single-word encoding of the
/// letter preceding the first state.
#[derive(Debug, Clone)]
pub struct AlphabetVm {
    /// The claim committing to the absolute prestate.
    absolute_prestate: H256,
    /// The oracle the VM reads preimages from.
    oracle: Arc<dyn PreimageOracle>,
}

impl AlphabetVm {
    /// Creates a new [AlphabetVm] with the given absolute prestate.
    pub fn new(absolute_prestate: H256, oracle: Arc<dyn PreimageOracle>) -> Self {
        Self {
            absolute_prestate,
            oracle,
        }
    }

    /// Returns the state data of the absolute prestate preceding `letter`.
    pub fn prestate_data(letter: u8) -> Vec<u8> {
        abi::encode(&[Token::Uint(U256::from(letter))])
    }

    /// Returns the claim committing to the absolute prestate preceding `letter`.
    pub fn prestate_claim(letter: u8) -> H256 {
        H256::from(keccak256(Self::prestate_data(letter)))
    }

    /// Returns the state data of the trace at `trace_index`.
    pub fn state_data(trace_index: u128, letter: u8) -> Vec<u8> {
        abi::encode(&[
            Token::Uint(U256::from(trace_index)),
            Token::Uint(U256::from(letter)),
        ])
    }

    /// Returns the claim committing to the trace at `trace_index`.
    pub fn claim(trace_index: u128, letter: u8) -> H256 {
        H256::from(keccak256(Self::state_data(trace_index, letter)))
    }
}

impl BigStepper for AlphabetVm {
    fn step(&self, state_data: &[u8], _proof: &[u8], _local_context: H256) -> Result<H256, VmError> {
        let (trace_index, letter) = if keccak256(state_data) == self.absolute_prestate.0 {
            let tokens = abi::decode(&[ParamType::Uint(256)], state_data)
                .map_err(|e| VmError::InvalidStateData(e.to_string()))?;
            (U256::zero(), uint_at(&tokens, 0)?)
        } else {
            let tokens = abi::decode(&[ParamType::Uint(256), ParamType::Uint(256)], state_data)
                .map_err(|e| VmError::InvalidStateData(e.to_string()))?;
            (uint_at(&tokens, 0)? + 1, uint_at(&tokens, 1)?)
        };

        let post = abi::encode(&[Token::Uint(trace_index), Token::Uint(letter + 1)]);
        Ok(H256::from(keccak256(post)))
    }

    fn oracle(&self) -> Arc<dyn PreimageOracle> {
        Arc::clone(&self.oracle)
    }
}

fn uint_at(tokens: &[Token], index: usize) -> Result<U256, VmError> {
    tokens
        .get(index)
        .cloned()
        .and_then(Token::into_uint)
        .filter(|value| *value < U256::MAX)
        .ok_or_else(|| VmError::InvalidStateData(format!("missing uint at {index}")))
}
