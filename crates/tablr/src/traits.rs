//! Contracts between the driver and its collaborators.

use smallvec::SmallVec;

use crate::error::Fault;
use crate::symbol::Symbol;

/// The matched right-hand side handed to a reducer, leftmost symbol first.
///
/// Inline up to four symbols; longer productions spill to the heap.
pub type Rhs<V> = SmallVec<[Symbol<V>; 4]>;

/// Token source.
///
/// Every call must return a fresh symbol; the driver takes ownership upon
/// receipt. After the EOF symbol has been produced once the driver stops
/// calling and replays EOF itself, but a well-behaved scanner keeps
/// returning EOF if asked anyway.
pub trait Scanner {
    /// Semantic value carried by produced symbols.
    type Value;

    /// Produce the next token.
    ///
    /// # Errors
    /// A [`Fault`] aborts the parse as a fatal scanner error.
    fn next_token(&mut self) -> Result<Symbol<Self::Value>, Fault>;
}

/// User-supplied semantic code, invoked at each reduction.
pub trait Actions {
    /// Semantic value carried by symbols; must match the scanner's.
    type Value;

    /// Execute the action for `production` over its matched right-hand
    /// side and build the left-hand-side symbol.
    ///
    /// Ownership of the `rhs` symbols transfers to the action; their values
    /// are typically incorporated into the returned symbol. The driver
    /// assigns the returned symbol's parse state from the goto table before
    /// pushing it.
    ///
    /// # Errors
    /// A [`Fault`] aborts the parse as a fatal action error.
    fn do_action(
        &mut self,
        production: usize,
        rhs: Rhs<Self::Value>,
    ) -> Result<Symbol<Self::Value>, Fault>;

    /// Release a symbol the driver is discarding: stack entries popped
    /// during recovery unwind, discarded lookahead tokens, and everything
    /// still owned when the parse ends.
    ///
    /// The default drops the symbol, which releases its value. Override to
    /// observe disposal or run value-specific teardown.
    fn dispose(&mut self, sym: Symbol<Self::Value>) {
        drop(sym);
    }
}
