//! Tests for error-token recovery

use std::sync::{Arc, Mutex};
use tabla::backend::lr::LrConfig;
use tabla::error::SyntaxError;
use tabla::grammar::GrammarBuilder;
use tabla::CompiledParser;

/// `program -> stmts ; stmts -> stmts stmt | stmt ; stmt -> id ';' | error ';'`
///
/// Each statement evaluates to its identifier; recovered statements to `?`.
fn statements(log: Arc<Mutex<Vec<SyntaxError>>>) -> CompiledParser<Vec<String>> {
    let mut g = GrammarBuilder::<Vec<String>>::new();
    let id = g.terminal("id", "[a-z]+", |text| vec![text.to_string()]);
    let semi = g.literal(";");
    let error = g.error();
    let stmts = g.non_terminal("stmts");
    let stmt = g.non_terminal("stmt");
    g.production(stmts, [stmts.into(), stmt.into()], |mut v| {
        let tail = v.pop().unwrap_or_default();
        let mut head = v.pop().unwrap_or_default();
        head.extend(tail);
        head
    });
    g.production(stmts, [stmt.into()], |mut v| v.pop().unwrap_or_default());
    g.production(stmt, [id.into(), semi.into()], |mut v| v.swap_remove(0));
    g.error_production(stmt, [error.into(), semi.into()], move |err, _| {
        if let Ok(mut log) = log.lock() {
            log.push(err.clone());
        }
        vec!["?".to_string()]
    });
    g.ignore("[ \n]+");
    g.start(stmts);
    g.build().unwrap().compile(LrConfig::default()).unwrap()
}

#[test]
fn test_single_error_is_reported_once() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let parser = statements(Arc::clone(&log));
    assert_eq!(parser.parse("a;b c;d;").unwrap(), vec!["a", "?", "d"]);

    let log = log.lock().unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].found, "id");
    assert_eq!(log[0].text, "c");
    assert_eq!(log[0].expected, vec![";"]);
}

#[test]
fn test_several_errors() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let parser = statements(Arc::clone(&log));
    let value = parser.parse("a b;\nc;\nd e f;\ng;").unwrap();
    assert_eq!(value, vec!["?", "c", "?", "g"]);
    let texts: Vec<String> = log.lock().unwrap().iter().map(|e| e.text.to_string()).collect();
    assert_eq!(texts, vec!["b", "e"]);
}

#[test]
fn test_error_between_statements() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let parser = statements(Arc::clone(&log));
    assert_eq!(parser.parse("a; ; b;").unwrap(), vec!["a", "?", "b"]);
    assert_eq!(log.lock().unwrap()[0].found, ";");
}

#[test]
fn test_unrecoverable_at_end_of_input() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let parser = statements(Arc::clone(&log));
    let err = parser.parse("a; b").unwrap_err();
    assert_eq!(err.as_syntax().unwrap().found, "$end");
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_grammar_without_error_productions_fails_fast() {
    let mut g = GrammarBuilder::<()>::new();
    let s = g.non_terminal("s");
    g.production(s, ["x".into(), "y".into()], |_| ());
    g.start(s);
    let parser = g.build().unwrap().compile(LrConfig::default()).unwrap();
    let err = parser.parse("xx").unwrap_err();
    let syntax = err.as_syntax().unwrap();
    assert_eq!(syntax.found, "x");
    assert_eq!(syntax.expected, vec!["y"]);
}
