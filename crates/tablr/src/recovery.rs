//! Parse-ahead error recovery.
//!
//! When the action table yields no entry for the current lookahead, the
//! driver hands the offending token to this engine. Recovery proceeds in
//! four phases:
//!
//! 1. **Find a recovery configuration.** Pop the real stack (disposing each
//!    symbol) until the exposed state can shift the distinguished error
//!    terminal, then shift a synthesised error symbol. An empty stack means
//!    recovery fails.
//! 2. **Read lookahead.** Buffer up to `error_sync_size` symbols, the
//!    offending token first; EOF fills and terminates the buffer.
//! 3. **Parse ahead and discard.** Simulate a parse over the buffer on a
//!    [`VirtualStack`], touching neither the real stack nor any semantic
//!    value. If the simulation errors, discard the buffer head (disposing
//!    it), slide the buffer down, refill the tail, and retry. Discarding
//!    cannot move past EOF; an EOF head means recovery fails.
//! 4. **Replay.** Re-run the buffered tokens against the real stack with
//!    real shifts, reductions, and semantic actions. Reducing the start
//!    production accepts; exhausting the buffer resynchronises the driver,
//!    which resumes on live input.

use crate::error::{ParseError, Reporter};
use crate::event::{EventSink, ParseEvent};
use crate::parser::{Parser, Recovered};
use crate::stack::VirtualStack;
use crate::symbol::Symbol;
use crate::table::Action;
use crate::traits::{Actions, Scanner};

impl<'t, S, A, R, E> Parser<'t, S, A, R, E>
where
    S: Scanner,
    S::Value: Default,
    A: Actions<Value = S::Value>,
    R: Reporter<S::Value>,
    E: EventSink,
{
    /// Run the recovery state machine. `offending` is the token the action
    /// table rejected; it becomes the head of the lookahead buffer.
    pub(crate) fn error_recovery(
        &mut self,
        offending: Symbol<S::Value>,
    ) -> Result<Recovered<S::Value>, ParseError> {
        self.emit(ParseEvent::RecoveryStarted);

        if !self.find_recovery_config() {
            self.emit(ParseEvent::RecoveryFailed);
            return Ok(Recovered::Fail(offending));
        }

        self.read_lookahead(offending)?;

        loop {
            if self.try_parse_ahead() {
                self.emit(ParseEvent::ParseAhead { ok: true });
                break;
            }
            self.emit(ParseEvent::ParseAhead { ok: false });

            // Cannot discard past end of input.
            if self.lookahead[0].id == self.tables.eof_sym {
                self.emit(ParseEvent::RecoveryFailed);
                let head = self.lookahead.remove(0);
                return Ok(Recovered::Fail(head));
            }
            self.restart_lookahead()?;
        }

        self.parse_lookahead()
    }

    /// Phase 1: pop until the top state shifts the error terminal, then
    /// shift a synthesised error symbol. False if the stack runs out.
    fn find_recovery_config(&mut self) -> bool {
        loop {
            if self.stack.is_empty() {
                return false;
            }
            let state = self.stack.top_state();
            if let Action::Shift(target) = self.tables.action(state, self.tables.error_sym) {
                let err_sym =
                    Symbol::with_state(self.tables.error_sym, S::Value::default(), target);
                self.emit(ParseEvent::ErrorShifted { state: target });
                self.stack.push(err_sym);
                self.note_depth();
                return true;
            }
            let popped = self.stack.pop();
            self.emit(ParseEvent::StackUnwound { symbol: popped.id });
            self.dispose(popped);
        }
    }

    /// Phase 2: fill the lookahead buffer, offending token first.
    fn read_lookahead(&mut self, offending: Symbol<S::Value>) -> Result<(), ParseError> {
        debug_assert!(self.lookahead.is_empty());
        self.lookahead.push(offending);
        while self.lookahead.len() < self.sync_size
            && self
                .lookahead
                .last()
                .is_some_and(|tok| tok.id != self.tables.eof_sym)
        {
            let tok = self.fetch_token().map_err(ParseError::scan)?;
            self.lookahead.push(tok);
        }
        Ok(())
    }

    /// Phase 3 simulator: parse the buffered tokens on a virtual stack.
    ///
    /// True when the whole buffer is consumed, the start production is
    /// reduced, or a reduction pops through everything the real stack
    /// holds (the parse has moved past the damaged region either way).
    /// Performs no user actions and allocates no symbols.
    fn try_parse_ahead(&self) -> bool {
        let mut vstack = VirtualStack::new(&self.stack);
        let mut pos = 0;
        loop {
            match self.tables.action(vstack.top(), self.lookahead[pos].id) {
                Action::Error => return false,
                Action::Shift(target) => {
                    vstack.push(target);
                    pos += 1;
                    if pos == self.lookahead.len() {
                        return true;
                    }
                }
                Action::Reduce(production) => {
                    if production == self.tables.start_production {
                        return true;
                    }
                    let entry = self.tables.production(production);
                    for _ in 0..entry.rhs_len {
                        vstack.pop();
                    }
                    if vstack.is_empty() {
                        return true;
                    }
                    let goto = self
                        .tables
                        .goto_state(vstack.top(), entry.lhs)
                        .expect("reduce-goto entry missing during parse-ahead");
                    vstack.push(goto);
                }
            }
        }
    }

    /// Phase 3 discard step: dispose the buffer head, slide the buffer
    /// down, and pull one token (EOF replays once latched) into the tail.
    fn restart_lookahead(&mut self) -> Result<(), ParseError> {
        let head = self.lookahead.remove(0);
        self.emit(ParseEvent::Discarded { symbol: head.id });
        self.dispose(head);
        self.note_discarded();

        let tok = self.fetch_token().map_err(ParseError::scan)?;
        self.lookahead.push(tok);
        Ok(())
    }

    /// Phase 4: replay the buffered tokens against the real stack with
    /// real shifts, reductions, and actions.
    fn parse_lookahead(&mut self) -> Result<Recovered<S::Value>, ParseError> {
        loop {
            if self.lookahead.is_empty() {
                self.emit(ParseEvent::RecoveryCommitted);
                self.note_recovered();
                return Ok(Recovered::Resume);
            }

            let state = self.stack.top_state();
            let sym_id = self.lookahead[0].id;
            match self.tables.action(state, sym_id) {
                Action::Shift(target) => {
                    let mut tok = self.lookahead.remove(0);
                    tok.parse_state = target;
                    self.emit(ParseEvent::Shift {
                        symbol: tok.id,
                        state: target,
                    });
                    self.stack.push(tok);
                    self.note_depth();
                    self.note_shift();
                }
                Action::Reduce(production) => {
                    if let Some(result) = self.apply_reduction(production)? {
                        return Ok(Recovered::Accept(result));
                    }
                }
                Action::Error => {
                    // The parse-ahead simulator can approve a buffer it did
                    // not fully validate when a reduction pops through the
                    // whole real stack; a divergence here is fatal.
                    self.report_fatal("syntax error during recovery replay", None);
                    return Err(ParseError::Unrecovered { symbol: sym_id });
                }
            }
        }
    }
}
