//! Error types and reporting hooks.
//!
//! Recoverable syntax errors never surface to the caller as values; they
//! are announced through the [`Reporter`] hooks and handled by the recovery
//! engine. A [`ParseError`] is the single fault signal a caller can
//! observe, returned only after the driver has released every symbol it
//! still owned.
//!
//! When the `diagnostics` feature is enabled, [`ParseError`] derives
//! [`miette::Diagnostic`] for rich reporting.

use std::io::{self, Write};

use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

use crate::symbol::{Symbol, SymbolId};

/// Fatal faults observable to the caller of `parse`.
#[derive(Debug, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    /// A syntax error was detected and the recovery engine could not find a
    /// viable configuration to continue from.
    #[error("syntax error could not be repaired (at symbol #{symbol})")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tablr::unrecovered)))]
    Unrecovered { symbol: SymbolId },

    /// A semantic action signalled failure.
    #[error("semantic action for production {production} failed: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tablr::action)))]
    Action { production: usize, message: String },

    /// The scanner signalled failure.
    #[error("scanner failure: {message}")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(tablr::scan)))]
    Scan { message: String },
}

impl ParseError {
    pub(crate) fn scan(fault: Fault) -> Self {
        Self::Scan {
            message: fault.into_message(),
        }
    }

    pub(crate) fn action(production: usize, fault: Fault) -> Self {
        Self::Action {
            production,
            message: fault.into_message(),
        }
    }
}

/// Failure raised inside a user callback (scanner or action dispatcher).
///
/// The driver converts a fault into the matching [`ParseError`] variant
/// after cleaning up.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct Fault {
    message: String,
}

impl Fault {
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn into_message(self) -> String {
        self.message
    }
}

/// Hooks through which the driver announces errors.
///
/// The default method bodies chain exactly as the runtime contract
/// requires: `syntax_error` reports "syntax error" through `report_error`,
/// `unrecovered_syntax_error` escalates through `report_fatal_error`, and
/// `report_fatal_error` falls back to `report_error`. Implementors
/// typically override `report_error` alone.
pub trait Reporter<V> {
    /// Report a non-fatal error or warning.
    fn report_error(&mut self, message: &str, info: Option<&Symbol<V>>);

    /// Report an error the parse cannot continue past.
    fn report_fatal_error(&mut self, message: &str, info: Option<&Symbol<V>>) {
        self.report_error(message, info);
    }

    /// Called once per detected syntax error, before recovery is attempted.
    fn syntax_error(&mut self, token: &Symbol<V>) {
        self.report_error("syntax error", Some(token));
    }

    /// Called when recovery has failed.
    fn unrecovered_syntax_error(&mut self, token: &Symbol<V>) {
        self.report_fatal_error("could not repair the parse and continue", Some(token));
    }
}

/// [`Reporter`] writing one line per report to any [`Write`] sink.
///
/// Write failures are swallowed; diagnostics must never fail the parse.
#[derive(Debug)]
pub struct WriteReporter<W> {
    sink: W,
}

impl<W: Write> WriteReporter<W> {
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    /// The sink, e.g. to recover a buffer after parsing.
    #[must_use]
    pub fn sink(&self) -> &W {
        &self.sink
    }
}

impl WriteReporter<io::Stderr> {
    /// The conventional default: report to standard error.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<V, W: Write> Reporter<V> for WriteReporter<W> {
    fn report_error(&mut self, message: &str, info: Option<&Symbol<V>>) {
        let _ = match info {
            Some(sym) => writeln!(self.sink, "{message} at symbol #{}", sym.id),
            None => writeln!(self.sink, "{message}"),
        };
    }
}
