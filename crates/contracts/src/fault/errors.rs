use crate::{ErrorKind, PreimageOracleError, VmError};
use op_dispute_primitives::Claim;
use thiserror::Error;

/// An error returned by a [FaultDisputeGame](super::FaultDisputeGame).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FaultGameError {
    /// The configured maximum game depth does not fit a position. Validation.
    #[error("Max game depth {0} is too large")]
    MaxDepthTooLarge(u64),
    /// The immutable args of a proxy could not be decoded. Validation.
    #[error("Invalid immutable args: {0}")]
    InvalidImmutableArgs(String),
    /// `initialize` was called twice. State.
    #[error("Game already initialized")]
    AlreadyInitialized,
    /// The game has not been initialized. State.
    #[error("Game not initialized")]
    NotInitialized,
    /// The game has been resolved. State.
    #[error("Game not in progress")]
    GameNotInProgress,
    /// The L1 head could not be retrieved. External.
    #[error("L1 head too old")]
    L1HeadTooOld,
    /// The extra data is not a big-endian L2 block number. Validation.
    #[error("Invalid extra data")]
    InvalidExtraData,
    /// The L2 block number is not after the starting output or is past the latest output.
    /// Validation.
    #[error("L2 block number {0} out of range")]
    L2BlockNumberOutOfRange(u64),
    /// The root claim equals the accepted output root. Protocol.
    #[error("Unexpected root claim {0:?}")]
    UnexpectedRootClaim(Claim),
    /// The referenced claim does not exist or cannot be moved or stepped against. Protocol.
    #[error("Invalid parent")]
    InvalidParent,
    /// The root claim can only be attacked. Validation.
    #[error("Cannot defend the root claim")]
    CannotDefendRootClaim,
    /// The move would go past the maximum game depth. Protocol.
    #[error("Game depth exceeded")]
    GameDepthExceeded,
    /// The clock of the moving side has run out. Timing.
    #[error("Clock time exceeded")]
    ClockTimeExceeded,
    /// An identical claim already exists at the position. Validation.
    #[error("Claim already exists")]
    ClaimAlreadyExists,
    /// The state data does not commit to the pre-state claim. Protocol.
    #[error("Invalid prestate")]
    InvalidPrestate,
    /// The step agrees with the claim it was meant to refute. Protocol.
    #[error("Valid step")]
    ValidStep,
    /// The chess clock of the claim has not run out. Timing.
    #[error("Clock not expired")]
    ClockNotExpired,
    /// The claim was already resolved. State.
    #[error("Claim already resolved")]
    ClaimAlreadyResolved,
    /// A deeper subgame must be resolved first. Timing.
    #[error("Out of order resolution")]
    OutOfOrderResolution,
    /// The local data identifier is unknown. Validation.
    #[error("Invalid local ident {0}")]
    InvalidLocalIdent(u64),
    /// The VM failed to execute the step.
    #[error(transparent)]
    Vm(#[from] VmError),
    /// The preimage oracle rejected the local data.
    #[error(transparent)]
    PreimageOracle(#[from] PreimageOracleError),
}

impl FaultGameError {
    /// Returns the taxonomy kind of the error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MaxDepthTooLarge(_)
            | Self::InvalidImmutableArgs(_)
            | Self::InvalidExtraData
            | Self::L2BlockNumberOutOfRange(_)
            | Self::CannotDefendRootClaim
            | Self::ClaimAlreadyExists
            | Self::InvalidLocalIdent(_) => ErrorKind::Validation,
            Self::ClockTimeExceeded | Self::ClockNotExpired | Self::OutOfOrderResolution => {
                ErrorKind::Timing
            }
            Self::UnexpectedRootClaim(_)
            | Self::InvalidParent
            | Self::GameDepthExceeded
            | Self::InvalidPrestate
            | Self::ValidStep => ErrorKind::Protocol,
            Self::AlreadyInitialized
            | Self::NotInitialized
            | Self::GameNotInProgress
            | Self::ClaimAlreadyResolved => ErrorKind::State,
            Self::L1HeadTooOld => ErrorKind::External,
            Self::Vm(err) => err.kind(),
            Self::PreimageOracle(err) => err.kind(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn taxonomy() {
        assert_eq!(FaultGameError::ValidStep.kind(), ErrorKind::Protocol);
        assert_eq!(FaultGameError::ClockNotExpired.kind(), ErrorKind::Timing);
        assert_eq!(FaultGameError::GameNotInProgress.kind(), ErrorKind::State);
        assert_eq!(FaultGameError::L1HeadTooOld.kind(), ErrorKind::External);
        assert_eq!(
            FaultGameError::from(VmError::InvalidStateData(String::new())).kind(),
            ErrorKind::Protocol
        );
    }
}
