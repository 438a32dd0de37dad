//! End-to-end driver tests over two hand-built table sets: an error-rule
//! grammar exercising recovery and a left-recursive grammar exercising
//! long inputs. Semantic values track their own liveness so every test can
//! assert that the parser releases exactly what it allocated.

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use tablr::{
    Actions, DriverConfig, EventSink, Fault, NullEvents, ParseError, ParseEvent, Parser, ProdEntry,
    Reporter, Rhs, Row, Scanner, Symbol, Tables,
};

const S: i16 = 0;
const ERROR: i16 = 1;
const EOF: i16 = 2;
const A: i16 = 3;
const B: i16 = 4;
const C: i16 = 5;

/// Semantic value that counts itself in a shared live-counter until
/// dropped. Values fabricated by the driver (sentinel, error symbol,
/// replayed EOF) use `Default` and are untracked.
#[derive(Debug, Default)]
struct Val {
    tag: &'static str,
    live: Option<Rc<Cell<i64>>>,
}

impl Val {
    fn tracked(tag: &'static str, live: &Rc<Cell<i64>>) -> Self {
        live.set(live.get() + 1);
        Self {
            tag,
            live: Some(Rc::clone(live)),
        }
    }
}

impl Drop for Val {
    fn drop(&mut self) {
        if let Some(live) = &self.live {
            live.set(live.get() - 1);
        }
    }
}

struct ScriptScanner {
    tokens: VecDeque<Symbol<Val>>,
    calls: usize,
    done: bool,
}

impl ScriptScanner {
    fn new(ids: &[i16], live: &Rc<Cell<i64>>) -> Self {
        let tokens = ids
            .iter()
            .map(|&id| Symbol::new(id, Val::tracked("tok", live)))
            .collect();
        Self {
            tokens,
            calls: 0,
            done: false,
        }
    }
}

impl Scanner for ScriptScanner {
    type Value = Val;

    fn next_token(&mut self) -> Result<Symbol<Val>, Fault> {
        assert!(!self.done, "scanner called after it produced EOF");
        self.calls += 1;
        let tok = self.tokens.pop_front().expect("script exhausted");
        if tok.id == EOF {
            self.done = true;
        }
        Ok(tok)
    }
}

struct SActions {
    live: Rc<Cell<i64>>,
    fired: Vec<usize>,
    disposed: usize,
    fail_on: Option<usize>,
}

impl SActions {
    fn new(live: &Rc<Cell<i64>>) -> Self {
        Self {
            live: Rc::clone(live),
            fired: Vec::new(),
            disposed: 0,
            fail_on: None,
        }
    }
}

impl Actions for SActions {
    type Value = Val;

    fn do_action(&mut self, production: usize, rhs: Rhs<Val>) -> Result<Symbol<Val>, Fault> {
        if self.fail_on == Some(production) {
            return Err(Fault::new("action refused"));
        }
        self.fired.push(production);
        drop(rhs);
        Ok(Symbol::new(S, Val::tracked("S", &self.live)))
    }

    fn dispose(&mut self, sym: Symbol<Val>) {
        self.disposed += 1;
        drop(sym);
    }
}

#[derive(Default)]
struct RecordingReporter {
    errors: Vec<String>,
    fatals: Vec<String>,
}

impl Reporter<Val> for RecordingReporter {
    fn report_error(&mut self, message: &str, _info: Option<&Symbol<Val>>) {
        self.errors.push(message.to_owned());
    }

    fn report_fatal_error(&mut self, message: &str, _info: Option<&Symbol<Val>>) {
        self.fatals.push(message.to_owned());
    }
}

#[derive(Default)]
struct RecordingEvents(Vec<ParseEvent>);

impl EventSink for RecordingEvents {
    fn event(&mut self, event: ParseEvent) {
        self.0.push(event);
    }
}

/// Grammar with an error rule:
///
/// ```text
/// 0: S' -> S          (start production; reducing it accepts)
/// 1: S  -> a b
/// 2: S  -> a error b
/// ```
fn error_rule_tables() -> Tables {
    Tables {
        actions: vec![
            Row::from_flat(&[A, 2, -1, 0]),            // 0: shift a -> 1
            Row::from_flat(&[ERROR, 5, B, 4, -1, 0]),  // 1: error -> 4, b -> 3
            Row::from_flat(&[EOF, -1, -1, 0]),         // 2: accept
            Row::from_flat(&[EOF, -2, -1, 0]),         // 3: reduce S -> a b
            Row::from_flat(&[B, 6, -1, 0]),            // 4: shift b -> 5
            Row::from_flat(&[EOF, -3, -1, 0]),         // 5: reduce S -> a error b
        ],
        gotos: vec![
            Row::from_flat(&[S, 2, -1, -1]),
            Row::from_flat(&[-1, -1]),
            Row::from_flat(&[-1, -1]),
            Row::from_flat(&[-1, -1]),
            Row::from_flat(&[-1, -1]),
            Row::from_flat(&[-1, -1]),
        ],
        productions: vec![
            ProdEntry::new(S, 1),
            ProdEntry::new(S, 2),
            ProdEntry::new(S, 3),
        ],
        start_state: 0,
        start_production: 0,
        eof_sym: EOF,
        error_sym: ERROR,
    }
}

/// Left-recursive grammar for long inputs:
///
/// ```text
/// 0: S' -> S
/// 1: S  -> S a b
/// 2: S  -> a b
/// ```
fn left_recursive_tables() -> Tables {
    Tables {
        actions: vec![
            Row::from_flat(&[A, 2, -1, 0]),            // 0: shift a -> 1
            Row::from_flat(&[B, 4, -1, 0]),            // 1: shift b -> 3
            Row::from_flat(&[EOF, -1, A, 5, -1, 0]),   // 2: accept / shift a -> 4
            Row::from_flat(&[EOF, -3, A, -3, -1, 0]),  // 3: reduce S -> a b
            Row::from_flat(&[B, 6, -1, 0]),            // 4: shift b -> 5
            Row::from_flat(&[EOF, -2, A, -2, -1, 0]),  // 5: reduce S -> S a b
        ],
        gotos: vec![
            Row::from_flat(&[S, 2, -1, -1]),
            Row::from_flat(&[-1, -1]),
            Row::from_flat(&[-1, -1]),
            Row::from_flat(&[-1, -1]),
            Row::from_flat(&[-1, -1]),
            Row::from_flat(&[-1, -1]),
        ],
        productions: vec![
            ProdEntry::new(S, 1),
            ProdEntry::new(S, 3),
            ProdEntry::new(S, 2),
        ],
        start_state: 0,
        start_production: 0,
        eof_sym: EOF,
        error_sym: ERROR,
    }
}

#[test]
fn accepts_well_formed_input() {
    let live = Rc::new(Cell::new(0));
    let tables = error_rule_tables();
    let scanner = ScriptScanner::new(&[A, B, EOF], &live);
    let mut parser = Parser::with_hooks(
        &tables,
        scanner,
        SActions::new(&live),
        RecordingReporter::default(),
        NullEvents,
        DriverConfig::default(),
    );

    let result = parser.parse().expect("input is well-formed");
    assert_eq!(result.tag, "S");

    // Only S -> a b fired; the start production accepts without an action.
    assert_eq!(parser.actions().fired, [1]);
    assert!(parser.reporter().errors.is_empty());

    let metrics = parser.metrics();
    assert_eq!(metrics.tokens_consumed, 3);
    assert_eq!(metrics.shifts, 2);
    assert_eq!(metrics.reductions, 1);
    assert_eq!(metrics.syntax_errors, 0);
    assert_eq!(metrics.max_stack_depth, 3);
    // At exit only the sentinel and the held EOF remained to release.
    assert_eq!(parser.actions().disposed, 2);

    drop(result);
    drop(parser);
    assert_eq!(live.get(), 0, "every symbol released exactly once");
}

#[test]
fn recovers_by_discarding_the_unexpected_token() {
    let live = Rc::new(Cell::new(0));
    let tables = error_rule_tables();
    let scanner = ScriptScanner::new(&[A, C, B, EOF], &live);
    let mut parser = Parser::with_hooks(
        &tables,
        scanner,
        SActions::new(&live),
        RecordingReporter::default(),
        RecordingEvents::default(),
        DriverConfig::default(),
    );

    let result = parser.parse().expect("recovery should repair this input");
    assert_eq!(result.tag, "S");

    // One report, then the error-rule production carried the parse home.
    assert_eq!(parser.reporter().errors, ["syntax error"]);
    assert!(parser.reporter().fatals.is_empty());
    assert_eq!(parser.actions().fired, [2]);

    let metrics = parser.metrics();
    assert_eq!(metrics.syntax_errors, 1);
    assert_eq!(metrics.tokens_discarded, 1);
    // The EOF latch held: a, c, b, EOF and nothing more.
    assert_eq!(parser.scanner().calls, 4);

    let events = &parser.events().0;
    assert!(events.contains(&ParseEvent::RecoveryStarted));
    assert!(events.contains(&ParseEvent::ErrorShifted { state: 4 }));
    assert!(events.contains(&ParseEvent::ParseAhead { ok: false }));
    assert!(events.contains(&ParseEvent::Discarded { symbol: C }));
    assert!(events.contains(&ParseEvent::ParseAhead { ok: true }));
    assert!(events.contains(&ParseEvent::Accept));

    drop(result);
    drop(parser);
    assert_eq!(live.get(), 0);
}

#[test]
fn recovers_with_a_single_token_window() {
    let live = Rc::new(Cell::new(0));
    let tables = error_rule_tables();
    let scanner = ScriptScanner::new(&[A, C, B, EOF], &live);
    let mut parser = Parser::with_hooks(
        &tables,
        scanner,
        SActions::new(&live),
        RecordingReporter::default(),
        NullEvents,
        DriverConfig { error_sync_size: 1 },
    );

    let result = parser.parse().expect("one clean token is enough");
    assert_eq!(parser.actions().fired, [2]);
    assert_eq!(parser.metrics().tokens_discarded, 1);
    assert_eq!(parser.metrics().errors_recovered, 1);

    drop(result);
    drop(parser);
    assert_eq!(live.get(), 0);
}

#[test]
fn fails_when_no_state_shifts_the_error_terminal() {
    let live = Rc::new(Cell::new(0));
    let tables = left_recursive_tables();
    let scanner = ScriptScanner::new(&[C, C, C, EOF], &live);
    let mut parser = Parser::with_hooks(
        &tables,
        scanner,
        SActions::new(&live),
        RecordingReporter::default(),
        RecordingEvents::default(),
        DriverConfig::default(),
    );

    let err = parser.parse().expect_err("grammar has no error rule");
    assert!(matches!(err, ParseError::Unrecovered { symbol: C }));
    assert_eq!(parser.reporter().errors, ["syntax error"]);
    assert_eq!(
        parser.reporter().fatals,
        ["could not repair the parse and continue"]
    );
    assert!(parser.events().0.contains(&ParseEvent::RecoveryFailed));

    drop(parser);
    assert_eq!(live.get(), 0);
}

#[test]
fn fails_when_the_error_is_at_eof() {
    let live = Rc::new(Cell::new(0));
    let tables = error_rule_tables();
    let scanner = ScriptScanner::new(&[A, EOF], &live);
    let mut parser = Parser::with_hooks(
        &tables,
        scanner,
        SActions::new(&live),
        RecordingReporter::default(),
        NullEvents,
        DriverConfig::default(),
    );

    let err = parser.parse().expect_err("cannot discard past EOF");
    assert!(matches!(err, ParseError::Unrecovered { symbol: EOF }));
    assert_eq!(parser.reporter().fatals.len(), 1);
    assert_eq!(parser.metrics().syntax_errors, 1);
    // The offending `a` and the EOF token were both released.
    drop(parser);
    assert_eq!(live.get(), 0);
}

#[test]
fn action_fault_is_fatal_and_releases_everything() {
    let live = Rc::new(Cell::new(0));
    let tables = error_rule_tables();
    let scanner = ScriptScanner::new(&[A, B, EOF], &live);
    let mut actions = SActions::new(&live);
    actions.fail_on = Some(1);
    let mut parser = Parser::with_hooks(
        &tables,
        scanner,
        actions,
        RecordingReporter::default(),
        NullEvents,
        DriverConfig::default(),
    );

    let err = parser.parse().expect_err("the action refuses production 1");
    match err {
        ParseError::Action {
            production,
            message,
        } => {
            assert_eq!(production, 1);
            assert_eq!(message, "action refused");
        }
        other => panic!("expected an action fault, got {other:?}"),
    }

    drop(parser);
    assert_eq!(live.get(), 0);
}

#[test]
fn long_input_keeps_the_stack_bounded() {
    let live = Rc::new(Cell::new(0));
    let tables = left_recursive_tables();

    let mut ids = Vec::with_capacity(10_001);
    for _ in 0..5_000 {
        ids.push(A);
        ids.push(B);
    }
    ids.push(EOF);
    let scanner = ScriptScanner::new(&ids, &live);

    let mut parser = Parser::with_hooks(
        &tables,
        scanner,
        SActions::new(&live),
        RecordingReporter::default(),
        NullEvents,
        DriverConfig::default(),
    );

    let result = parser.parse().expect("alternating input is well-formed");
    assert_eq!(parser.scanner().calls, 10_001);

    let metrics = parser.metrics();
    assert_eq!(metrics.tokens_consumed, 10_001);
    assert_eq!(metrics.shifts, 10_000);
    assert_eq!(metrics.reductions, 5_000);
    // Sentinel, S, a, b: the reductions keep the stack flat.
    assert!(metrics.max_stack_depth <= 4);

    drop(result);
    drop(parser);
    assert_eq!(live.get(), 0);
}

#[test]
fn dispose_hook_sees_unwound_and_discarded_symbols() {
    let live = Rc::new(Cell::new(0));
    let tables = error_rule_tables();
    let scanner = ScriptScanner::new(&[A, C, B, EOF], &live);
    let mut parser = Parser::with_hooks(
        &tables,
        scanner,
        SActions::new(&live),
        RecordingReporter::default(),
        NullEvents,
        DriverConfig::default(),
    );

    let result = parser.parse().expect("recovery succeeds");
    // The discarded `c`, then teardown of the sentinel and the two EOFs
    // left in the lookahead buffer after the accepting replay.
    assert_eq!(parser.actions().disposed, 4);

    drop(result);
    drop(parser);
    assert_eq!(live.get(), 0);
}
