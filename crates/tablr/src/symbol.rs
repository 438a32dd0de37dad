//! Symbol records carried on the parse stack.

/// Identifier of a terminal or non-terminal in the generated tables.
pub type SymbolId = i16;

/// Identifier of an LR automaton state.
pub type StateId = i16;

/// A terminal produced by the scanner or a non-terminal produced by a
/// reduction, together with its owned semantic value.
///
/// `parse_state` is only meaningful while the symbol sits on the parse
/// stack; freshly created symbols carry `-1` until the driver places them.
#[derive(Debug)]
pub struct Symbol<V> {
    /// Symbol id as assigned by the table generator.
    pub id: SymbolId,
    /// State the automaton was in when this symbol was shifted or pushed.
    pub parse_state: StateId,
    /// Semantic value owned by this symbol.
    pub value: V,
}

impl<V> Symbol<V> {
    /// Create an unplaced symbol.
    #[must_use]
    pub fn new(id: SymbolId, value: V) -> Self {
        Self {
            id,
            parse_state: -1,
            value,
        }
    }

    /// Create a symbol already carrying a parse state.
    #[must_use]
    pub fn with_state(id: SymbolId, value: V, parse_state: StateId) -> Self {
        Self {
            id,
            parse_state,
            value,
        }
    }

    /// Consume the symbol, keeping only its semantic value.
    #[must_use]
    pub fn into_value(self) -> V {
        self.value
    }
}
