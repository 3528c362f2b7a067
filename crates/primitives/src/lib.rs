//! Primitive types shared by the dispute game contracts, the solvers and the drivers.
//!
//! Packed identifiers ([Clock], [PackedGameId], positions) are exposed both in their wire form and
//! a decoded form; conversions between the two are explicit bit manipulation.

mod position;
pub use position::{compute_gindex, Position};

mod clock;
pub use clock::Clock;

mod game_id;
pub use game_id::{GameId, GameType, PackedGameId};

mod types;
pub use types::*;
