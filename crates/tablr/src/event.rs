//! Parse events for debugging and tracing.
//!
//! The driver emits an event at every observable step; the control flow is
//! identical whether anything listens or not. [`NullEvents`] drops them,
//! [`WriteEvents`] renders one line per event to a debug sink.

use std::io::Write;

use crate::symbol::{StateId, SymbolId};

/// One step of the parse, as seen by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseEvent {
    /// A token was consumed and pushed.
    Shift { symbol: SymbolId, state: StateId },
    /// A production was reduced and its non-terminal pushed.
    Reduce {
        production: usize,
        lhs: SymbolId,
        rhs_len: usize,
        goto: StateId,
    },
    /// The start production was reduced; parsing is done.
    Accept,
    /// The action table had no entry for the lookahead.
    SyntaxError { symbol: SymbolId, state: StateId },
    /// Error recovery began.
    RecoveryStarted,
    /// A symbol was popped and disposed while searching for a state that
    /// shifts the error terminal.
    StackUnwound { symbol: SymbolId },
    /// A synthesised error symbol was shifted.
    ErrorShifted { state: StateId },
    /// One speculative parse over the lookahead buffer finished.
    ParseAhead { ok: bool },
    /// The head of the lookahead buffer was discarded.
    Discarded { symbol: SymbolId },
    /// The buffered tokens replayed cleanly; normal parsing resumes.
    RecoveryCommitted,
    /// No viable recovery configuration exists.
    RecoveryFailed,
}

/// Receiver for [`ParseEvent`]s.
pub trait EventSink {
    fn event(&mut self, event: ParseEvent);
}

/// Sink that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvents;

impl EventSink for NullEvents {
    fn event(&mut self, _event: ParseEvent) {}
}

/// Sink rendering events as text, one line each.
///
/// Write failures are swallowed, as in [`crate::WriteReporter`].
#[derive(Debug)]
pub struct WriteEvents<W> {
    sink: W,
}

impl<W: Write> WriteEvents<W> {
    #[must_use]
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    #[must_use]
    pub fn sink(&self) -> &W {
        &self.sink
    }
}

impl<W: Write> EventSink for WriteEvents<W> {
    fn event(&mut self, event: ParseEvent) {
        let _ = match event {
            ParseEvent::Shift { symbol, state } => {
                writeln!(self.sink, "# shift symbol #{symbol} -> state {state}")
            }
            ParseEvent::Reduce {
                production,
                lhs,
                rhs_len,
                goto,
            } => writeln!(
                self.sink,
                "# reduce production {production} (lhs #{lhs}, rhs {rhs_len}) -> state {goto}"
            ),
            ParseEvent::Accept => writeln!(self.sink, "# accept"),
            ParseEvent::SyntaxError { symbol, state } => {
                writeln!(self.sink, "# syntax error on #{symbol} in state {state}")
            }
            ParseEvent::RecoveryStarted => writeln!(self.sink, "# attempting error recovery"),
            ParseEvent::StackUnwound { symbol } => {
                writeln!(self.sink, "# unwound symbol #{symbol}")
            }
            ParseEvent::ErrorShifted { state } => {
                writeln!(self.sink, "# shifted error symbol -> state {state}")
            }
            ParseEvent::ParseAhead { ok } => writeln!(self.sink, "# parse ahead: ok={ok}"),
            ParseEvent::Discarded { symbol } => {
                writeln!(self.sink, "# discarded lookahead symbol #{symbol}")
            }
            ParseEvent::RecoveryCommitted => writeln!(self.sink, "# recovery committed"),
            ParseEvent::RecoveryFailed => writeln!(self.sink, "# recovery failed"),
        };
    }
}
