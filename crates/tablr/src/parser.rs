//! The main LR driver.
//!
//! `Parser` runs the shift/reduce loop over generator-supplied tables, a
//! scanner, and an action dispatcher. The current state always sits in the
//! `parse_state` of the symbol on top of the stack; the bottom entry is a
//! sentinel carrying the start state. Each step looks up the action for
//! (top state, lookahead): positive entries shift, negative entries reduce,
//! zero hands control to the recovery engine in [`crate::recovery`].
//!
//! Accepting is reducing the start production: the dispatcher is not
//! invoked for it, the result is the symbol on top of the stack, and at
//! that point the stack holds exactly the sentinel below it.
//!
//! Every exit path, including fatal ones, drains the stack, the recovery
//! lookahead buffer, and the held token through [`Actions::dispose`], so
//! each symbol the parser ever owned is consumed exactly once.

use std::io;
use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::config::{DriverConfig, MAX_ERROR_SYNC_SIZE};
use crate::error::{ParseError, Reporter, WriteReporter};
use crate::event::{EventSink, NullEvents, ParseEvent};
use crate::stack::ParseStack;
use crate::symbol::Symbol;
use crate::table::{Action, Tables};
use crate::traits::{Actions, Scanner};

/// Counters collected over one `parse` call.
#[derive(Debug, Default, Clone)]
pub struct ParseMetrics {
    /// Scanner invocations (replayed EOF symbols are not counted).
    pub tokens_consumed: usize,
    pub shifts: usize,
    pub reductions: usize,
    /// Syntax errors detected (each reported once).
    pub syntax_errors: usize,
    /// Recoveries that replayed cleanly and resumed normal parsing.
    pub errors_recovered: usize,
    /// Tokens discarded while searching for a viable resync point.
    pub tokens_discarded: usize,
    pub max_stack_depth: usize,
    pub parse_time: Duration,
}

/// Table-driven LR(1) shift-reduce driver.
///
/// One `Parser` runs one input at a time; `parse(&mut self)` makes nested
/// invocation unrepresentable. The tables are borrowed and may be shared
/// across parser instances.
pub struct Parser<'t, S, A, R = WriteReporter<io::Stderr>, E = NullEvents>
where
    S: Scanner,
    A: Actions<Value = S::Value>,
{
    pub(crate) tables: &'t Tables,
    scanner: S,
    actions: A,
    reporter: R,
    events: E,
    config: DriverConfig,
    /// `config.error_sync_size` clamped to `[1, MAX_ERROR_SYNC_SIZE]`.
    pub(crate) sync_size: usize,
    pub(crate) stack: ParseStack<S::Value>,
    /// Buffered symbols during recovery; empty otherwise.
    pub(crate) lookahead: SmallVec<[Symbol<S::Value>; MAX_ERROR_SYNC_SIZE]>,
    /// The lookahead token between driver steps.
    pending: Option<Symbol<S::Value>>,
    /// Latched once the scanner produces EOF; afterwards EOF is replayed
    /// without calling the scanner.
    pub(crate) got_eof: bool,
    metrics: ParseMetrics,
}

impl<'t, S, A> Parser<'t, S, A>
where
    S: Scanner,
    A: Actions<Value = S::Value>,
{
    /// Driver with default configuration, reporting to stderr, no tracing.
    #[must_use]
    pub fn new(tables: &'t Tables, scanner: S, actions: A) -> Self {
        Self::with_hooks(
            tables,
            scanner,
            actions,
            WriteReporter::stderr(),
            NullEvents,
            DriverConfig::default(),
        )
    }
}

impl<'t, S, A, R, E> Parser<'t, S, A, R, E>
where
    S: Scanner,
    A: Actions<Value = S::Value>,
    R: Reporter<S::Value>,
    E: EventSink,
{
    /// Driver with explicit reporting, tracing, and configuration.
    #[must_use]
    pub fn with_hooks(
        tables: &'t Tables,
        scanner: S,
        actions: A,
        reporter: R,
        events: E,
        config: DriverConfig,
    ) -> Self {
        let sync_size = config.clamped_sync_size();
        Self {
            tables,
            scanner,
            actions,
            reporter,
            events,
            config,
            sync_size,
            stack: ParseStack::new(),
            lookahead: SmallVec::new(),
            pending: None,
            got_eof: false,
            metrics: ParseMetrics::default(),
        }
    }

    #[must_use]
    pub fn scanner(&self) -> &S {
        &self.scanner
    }

    #[must_use]
    pub fn actions(&self) -> &A {
        &self.actions
    }

    #[must_use]
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    #[must_use]
    pub fn events(&self) -> &E {
        &self.events
    }

    #[must_use]
    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Counters from the most recent `parse` call.
    #[must_use]
    pub fn metrics(&self) -> &ParseMetrics {
        &self.metrics
    }
}

impl<'t, S, A, R, E> Parser<'t, S, A, R, E>
where
    S: Scanner,
    S::Value: Default,
    A: Actions<Value = S::Value>,
    R: Reporter<S::Value>,
    E: EventSink,
{
    /// Run the parse to acceptance or a fatal error.
    ///
    /// On acceptance the start symbol's semantic value is returned. On any
    /// fatal exit no partial result is returned; in both cases every symbol
    /// still owned by the parser has been released through
    /// [`Actions::dispose`] before this returns.
    ///
    /// # Errors
    /// [`ParseError::Unrecovered`] when recovery fails,
    /// [`ParseError::Action`] / [`ParseError::Scan`] when a callback
    /// faults.
    pub fn parse(&mut self) -> Result<S::Value, ParseError> {
        let started = Instant::now();
        self.metrics = ParseMetrics::default();
        self.got_eof = false;
        let outcome = self.run();
        self.teardown();
        self.metrics.parse_time = started.elapsed();
        outcome
    }

    fn run(&mut self) -> Result<S::Value, ParseError> {
        self.stack.push(Symbol::with_state(
            0,
            S::Value::default(),
            self.tables.start_state,
        ));
        self.pending = Some(self.fetch_token().map_err(ParseError::scan)?);

        loop {
            let state = self.stack.top_state();
            let sym_id = self
                .pending
                .as_ref()
                .expect("driver stepped without a lookahead token")
                .id;

            match self.tables.action(state, sym_id) {
                Action::Shift(target) => {
                    let mut tok = self.take_pending();
                    tok.parse_state = target;
                    self.events.event(ParseEvent::Shift {
                        symbol: tok.id,
                        state: target,
                    });
                    self.stack.push(tok);
                    self.note_depth();
                    self.metrics.shifts += 1;
                    self.pending = Some(self.fetch_token().map_err(ParseError::scan)?);
                }
                Action::Reduce(production) => {
                    if let Some(result) = self.apply_reduction(production)? {
                        return Ok(result.into_value());
                    }
                }
                Action::Error => {
                    self.metrics.syntax_errors += 1;
                    let tok = self.take_pending();
                    self.events.event(ParseEvent::SyntaxError {
                        symbol: tok.id,
                        state,
                    });
                    self.reporter.syntax_error(&tok);
                    match self.error_recovery(tok)? {
                        Recovered::Resume => {
                            self.pending = Some(self.fetch_token().map_err(ParseError::scan)?);
                        }
                        Recovered::Accept(result) => return Ok(result.into_value()),
                        Recovered::Fail(tok) => {
                            self.reporter.unrecovered_syntax_error(&tok);
                            let symbol = tok.id;
                            self.actions.dispose(tok);
                            return Err(ParseError::Unrecovered { symbol });
                        }
                    }
                }
            }
        }
    }

    /// Perform one reduction against the real stack.
    ///
    /// Reducing the start production accepts: the dispatcher is not
    /// invoked and the result symbol is handed back instead of pushed.
    pub(crate) fn apply_reduction(
        &mut self,
        production: usize,
    ) -> Result<Option<Symbol<S::Value>>, ParseError> {
        if production == self.tables.start_production {
            self.events.event(ParseEvent::Accept);
            return Ok(Some(self.stack.pop()));
        }

        let entry = self.tables.production(production);
        let rhs = self.stack.split_off_top(entry.rhs_len as usize);
        let mut lhs = self
            .actions
            .do_action(production, rhs)
            .map_err(|fault| ParseError::action(production, fault))?;

        let goto = self
            .tables
            .goto_state(self.stack.top_state(), entry.lhs)
            .expect("reduce-goto entry missing for a committed reduction");
        lhs.parse_state = goto;
        self.events.event(ParseEvent::Reduce {
            production,
            lhs: entry.lhs,
            rhs_len: entry.rhs_len as usize,
            goto,
        });
        self.stack.push(lhs);
        self.note_depth();
        self.metrics.reductions += 1;
        Ok(None)
    }

    /// Next token, honouring the EOF latch: once the scanner has produced
    /// EOF it is never called again and the driver replays EOF symbols.
    pub(crate) fn fetch_token(&mut self) -> Result<Symbol<S::Value>, crate::error::Fault> {
        if self.got_eof {
            return Ok(Symbol::new(self.tables.eof_sym, S::Value::default()));
        }
        let tok = self.scanner.next_token()?;
        if tok.id == self.tables.eof_sym {
            self.got_eof = true;
        }
        self.metrics.tokens_consumed += 1;
        Ok(tok)
    }

    fn take_pending(&mut self) -> Symbol<S::Value> {
        self.pending
            .take()
            .expect("driver stepped without a lookahead token")
    }

    pub(crate) fn note_depth(&mut self) {
        self.metrics.max_stack_depth = self.metrics.max_stack_depth.max(self.stack.len());
    }

    pub(crate) fn note_shift(&mut self) {
        self.metrics.shifts += 1;
    }

    pub(crate) fn note_recovered(&mut self) {
        self.metrics.errors_recovered += 1;
    }

    pub(crate) fn note_discarded(&mut self) {
        self.metrics.tokens_discarded += 1;
    }

    /// Release everything the parser still owns.
    fn teardown(&mut self) {
        if let Some(tok) = self.pending.take() {
            self.actions.dispose(tok);
        }
        for sym in self.stack.take_all() {
            self.actions.dispose(sym);
        }
        for sym in std::mem::take(&mut self.lookahead) {
            self.actions.dispose(sym);
        }
    }

    pub(crate) fn emit(&mut self, event: ParseEvent) {
        self.events.event(event);
    }

    pub(crate) fn report_fatal(&mut self, message: &str, info: Option<&Symbol<S::Value>>) {
        self.reporter.report_fatal_error(message, info);
    }

    pub(crate) fn dispose(&mut self, sym: Symbol<S::Value>) {
        self.actions.dispose(sym);
    }
}

/// How error recovery handed control back to the driver.
pub(crate) enum Recovered<V> {
    /// The buffered tokens replayed cleanly; fetch the next live token.
    Resume,
    /// The replay reduced the start production.
    Accept(Symbol<V>),
    /// No viable configuration; the carried token is reported and fatal.
    Fail(Symbol<V>),
}
