//! Solvers compute the honest response to claims in a dispute game from a locally known trace.
//! They are pure: the drivers feed them the claim tree of a game and turn the returned
//! [Response](fault::Response)s into transactions.

pub mod fault;
