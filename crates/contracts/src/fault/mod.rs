//! The `fault` module contains the [FaultDisputeGame], the interactive bisection game played over
//! a disputed L2 output root.

mod args;
pub use args::ImmutableArgs;

mod config;
pub use config::{FaultGameConfig, FaultGameImplementation, MAX_GAME_DEPTH_LIMIT};

mod errors;
pub use errors::FaultGameError;

mod game;
pub use game::{FaultDisputeGame, GamePhase, InitContext, LocalIdent, Resolution};
