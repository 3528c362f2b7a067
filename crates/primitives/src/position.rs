//! The position module holds the [Position] trait and its implementation for generalized indices.

/// The [Position] trait defines the interface of a generalized index within a binary tree.
/// A "Generalized Index" is calculated as `2^{depth} + index_at_depth`.
pub trait Position {
    /// Returns the depth of the [Position] within the tree.
    fn depth(&self) -> u64;
    /// Returns the index at depth of the [Position] within the tree.
    fn index_at_depth(&self) -> u128;
    /// Returns the left child [Position] relative to the current [Position].
    fn left(&self) -> Self;
    /// Returns the right child [Position] relative to the current [Position].
    fn right(&self) -> Self;
    /// Returns the parent [Position] relative to the current [Position].
    fn parent(&self) -> Self;
    /// Returns the rightmost [Position] that commits to the same trace index as the current [Position].
    fn right_index(&self, max_depth: u64) -> Self;
    /// Returns the trace index that the current [Position] commits to: the index at depth of
    /// its rightmost leaf at `max_depth`.
    fn trace_index(&self, max_depth: u64) -> u128;
    /// Returns the relative [Position] for an attack or defense move against the current [Position].
    ///
    /// An attack moves to the left child, bisecting the interval that ends at the current trace
    /// index. A defense moves to the left child of the right sibling, bisecting the interval that
    /// starts after it. Both follow `((!is_attack) | position) << 1`.
    fn make_move(&self, is_attack: bool) -> Self;
}

/// Computes a generalized index from a depth and index at depth.
///
/// ### Takes
/// - `depth`: The depth of the generalized index.
/// - `index_at_depth`: The index at depth of the generalized index.
///
/// ### Returns
/// - `u128`: The generalized index: `2^{depth} + index_at_depth`.
pub fn compute_gindex(depth: u8, index_at_depth: u128) -> u128 {
    (1u128 << depth) | index_at_depth
}

/// Implementation of the [Position] trait for the [std::u128] primitive type.
impl Position for u128 {
    fn depth(&self) -> u64 {
        127u64.saturating_sub(self.leading_zeros() as u64)
    }

    fn index_at_depth(&self) -> u128 {
        self - (1 << self.depth())
    }

    fn left(&self) -> Self {
        self << 1
    }

    fn right(&self) -> Self {
        self.left() | 1
    }

    fn parent(&self) -> Self {
        self >> 1
    }

    fn right_index(&self, max_depth: u64) -> Self {
        let remaining = max_depth.saturating_sub(self.depth());
        (self << remaining) | ((1 << remaining) - 1)
    }

    fn trace_index(&self, max_depth: u64) -> u128 {
        self.right_index(max_depth).index_at_depth()
    }

    fn make_move(&self, is_attack: bool) -> Self {
        ((!is_attack as u128) | self) << 1
    }
}
