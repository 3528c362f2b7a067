//! Data structures, types, and the game solver implementation for the various
//! fault dispute game variants.

mod types;
pub use types::*;

mod game;
pub use game::FaultGame;

mod alphabet;
pub use alphabet::AlphabetGame;
