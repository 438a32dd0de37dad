//! Compact parse tables supplied by the table generator.
//!
//! ## Row representation
//!
//! Parse tables are extremely sparse, so each state's row is stored as a
//! list of `(key, value)` pairs sorted ascending by key and terminated by a
//! `(-1, default)` sentinel, rather than as a dense array. This saves an
//! order of magnitude of memory with no measurable lookup cost for typical
//! row widths: short rows are scanned linearly, longer rows use binary
//! search over the sorted keys.
//!
//! ## Action encoding
//!
//! Action values are encoded integers: a positive `v` means "shift and go
//! to state `v - 1`", a negative `-p` means "reduce by production `p - 1`",
//! and zero means "error". Accepting is reducing the start production.
//! Reduce-goto rows carry plain target states, `-1` for "none".

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

use crate::symbol::{StateId, SymbolId};

/// Rows with at most this many explicit pairs are scanned linearly.
const LINEAR_SCAN_MAX: usize = 8;

/// A decoded action table entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Consume the lookahead and go to this state.
    Shift(StateId),
    /// Reduce by this production; reducing the start production accepts.
    Reduce(usize),
    /// No action: a syntax error.
    Error,
}

impl Action {
    /// Decode a raw table value.
    #[must_use]
    pub fn decode(raw: i16) -> Self {
        match raw.cmp(&0) {
            std::cmp::Ordering::Greater => Self::Shift(raw - 1),
            std::cmp::Ordering::Less => Self::Reduce((-i32::from(raw) - 1) as usize),
            std::cmp::Ordering::Equal => Self::Error,
        }
    }
}

/// One production: its left-hand side and right-hand-side length.
///
/// Indexed by `p` when the action table yields `Reduce(p)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ProdEntry {
    pub lhs: SymbolId,
    pub rhs_len: i16,
}

impl ProdEntry {
    #[must_use]
    pub const fn new(lhs: SymbolId, rhs_len: i16) -> Self {
        Self { lhs, rhs_len }
    }
}

/// One compacted table row: sorted `(key, value)` pairs plus the sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Row {
    pairs: Box<[(i16, i16)]>,
}

impl Row {
    /// Build a row from `(key, value)` pairs ending in the `(-1, default)`
    /// sentinel. Malformed rows are a generator bug and are asserted.
    #[must_use]
    pub fn new(pairs: Vec<(i16, i16)>) -> Self {
        let sentinel = pairs.last().map(|&(key, _)| key);
        assert_eq!(
            sentinel,
            Some(-1),
            "row must be terminated by the (-1, default) sentinel"
        );
        let entries = &pairs[..pairs.len() - 1];
        assert!(
            entries.iter().all(|&(key, _)| key >= 0),
            "row keys must be non-negative symbol ids"
        );
        assert!(
            entries.windows(2).all(|w| w[0].0 < w[1].0),
            "row keys must be strictly ascending"
        );
        Self {
            pairs: pairs.into_boxed_slice(),
        }
    }

    /// Build a row from the generator's flat `[key, value, ...]` encoding.
    #[must_use]
    pub fn from_flat(flat: &[i16]) -> Self {
        assert!(flat.len() % 2 == 0, "flat row must hold key/value pairs");
        Self::new(flat.chunks_exact(2).map(|c| (c[0], c[1])).collect())
    }

    /// Look up `key`, falling back to the default value.
    ///
    /// Returns the default exactly when `key` is not among the row's
    /// explicit keys.
    #[must_use]
    pub fn get(&self, key: SymbolId) -> i16 {
        let entries = self.entries();
        let found = if entries.len() <= LINEAR_SCAN_MAX {
            entries.iter().find(|&&(k, _)| k == key).map(|&(_, v)| v)
        } else {
            entries
                .binary_search_by_key(&key, |&(k, _)| k)
                .ok()
                .map(|i| entries[i].1)
        };
        found.unwrap_or_else(|| self.default_value())
    }

    /// Like [`Row::get`] but always a linear scan; reduce-goto rows tend to
    /// be too short for binary search to pay off.
    #[must_use]
    pub fn get_linear(&self, key: SymbolId) -> i16 {
        self.entries()
            .iter()
            .find(|&&(k, _)| k == key)
            .map_or_else(|| self.default_value(), |&(_, v)| v)
    }

    fn entries(&self) -> &[(i16, i16)] {
        &self.pairs[..self.pairs.len() - 1]
    }

    fn default_value(&self) -> i16 {
        self.pairs[self.pairs.len() - 1].1
    }
}

/// The generator-supplied table set for one grammar.
///
/// Tables are read-only and may be shared by reference across any number of
/// parser instances.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Tables {
    /// Action rows, indexed by state; keys are terminal ids.
    pub actions: Vec<Row>,
    /// Reduce-goto rows, indexed by state; keys are non-terminal ids.
    pub gotos: Vec<Row>,
    /// Productions, indexed by the reduce encoding.
    pub productions: Vec<ProdEntry>,
    pub start_state: StateId,
    pub start_production: usize,
    pub eof_sym: SymbolId,
    pub error_sym: SymbolId,
}

impl Tables {
    /// Decoded action for `sym` in `state`.
    #[must_use]
    pub fn action(&self, state: StateId, sym: SymbolId) -> Action {
        Action::decode(self.actions[state as usize].get(sym))
    }

    /// State to go to after reducing to `nonterminal` with `state` exposed,
    /// or `None` if the row has no entry.
    #[must_use]
    pub fn goto_state(&self, state: StateId, nonterminal: SymbolId) -> Option<StateId> {
        let target = self.gotos[state as usize].get_linear(nonterminal);
        (target >= 0).then_some(target)
    }

    /// Production entry for a reduce action.
    #[must_use]
    pub fn production(&self, production: usize) -> ProdEntry {
        self.productions[production]
    }

    #[must_use]
    pub fn num_states(&self) -> usize {
        self.actions.len()
    }
}
