//! In-process models of the dispute protocol contracts.
//!
//! Every state-mutating call takes an [Env] describing the caller, attached value and the block
//! it executes in. Calls validate fully before mutating, so a failed call leaves the contract
//! untouched. Emitted [Event]s are buffered on the contract and drained by the caller.

mod env;
pub use env::{BlockHashes, Env, BLOCK_HASH_WINDOW};

pub mod events;
pub use events::Event;

mod traits;
pub use traits::{BigStepper, PreimageOracle};

pub mod preimage;
pub use preimage::{MemoryPreimageOracle, PreimageOracleError};

mod alphabet;
pub use alphabet::{AlphabetVm, VmError};

mod block_oracle;
pub use block_oracle::{BlockHashOracle, BlockOracle, BlockOracleError};

mod output_oracle;
pub use output_oracle::{OutputOracle, OutputOracleConfig, OutputOracleError};

pub mod fault;
pub use fault::{
    FaultDisputeGame, FaultGameConfig, FaultGameError, FaultGameImplementation, GamePhase,
    ImmutableArgs, InitContext, LocalIdent, Resolution,
};

mod factory;
pub use factory::{DisputeGameFactory, FactoryError};

/// The taxonomy every contract error falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed inputs, wrong caller role, duplicate claims or games.
    Validation,
    /// The call is not allowed until time advances or prerequisites are met.
    Timing,
    /// The move or step cannot semantically apply.
    Protocol,
    /// The game is in a terminal or non-applicable phase.
    State,
    /// Caused by the state of a collaborator.
    External,
}
