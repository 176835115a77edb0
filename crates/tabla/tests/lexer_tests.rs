//! Tests for lexer construction and scanning

use tabla::lexer::dfa::{DfaBuilder, LexAction};
use tabla::lexer::engine::{DfaEngine, NfaEngine};
use tabla::lexer::minimize::minimize;
use tabla::lexer::{LexerBuilder, LexerConfig, Nfa, Token};

fn kinds<T>(tokens: &[Token<T>]) -> Vec<usize> {
    tokens.iter().map(|t| t.terminal).collect()
}

#[test]
fn test_earlier_pattern_wins_equal_length() {
    let lexer = LexerBuilder::new()
        .token(0, "aa", str::to_string)
        .token(1, "a+", str::to_string)
        .end_of_input(2)
        .build()
        .unwrap();
    assert_eq!(kinds(&lexer.tokenize("aa").unwrap()), vec![0, 2]);
    assert_eq!(kinds(&lexer.tokenize("aaa").unwrap()), vec![1, 2]);
}

#[test]
fn test_leading_ignored_text() {
    let lexer = LexerBuilder::new()
        .token(0, "(a|b)*abb", str::to_string)
        .ignore(" *")
        .end_of_input(1)
        .build()
        .unwrap();
    let tokens = lexer.tokenize("   abb").unwrap();
    assert_eq!(kinds(&tokens), vec![0, 1]);
    assert_eq!(tokens[0].text, "abb");
    assert_eq!(tokens[0].range, tabla::TextRange::of(3, 3));
}

#[test]
fn test_ignore_loses_to_token_patterns() {
    // The ignore pattern is registered first but still ranks last.
    let lexer = LexerBuilder::new()
        .ignore("[a-z]+")
        .token(0, "if", str::to_string)
        .end_of_input(1)
        .build()
        .unwrap();
    assert_eq!(kinds(&lexer.tokenize("if").unwrap()), vec![0, 1]);
    assert_eq!(kinds(&lexer.tokenize("iffy").unwrap()), vec![1]);
}

#[test]
fn test_thompson_sizes() {
    let sizes = |pattern: &str| {
        let nfa = Nfa::build(pattern).unwrap();
        (nfa.state_count(), nfa.transition_count())
    };
    assert_eq!(sizes("a"), (2, 1));
    assert_eq!(sizes("a*"), (4, 4));
    assert_eq!(sizes("a|b"), (6, 6));
}

#[test]
fn test_minimized_classic_automaton() {
    let nfa = Nfa::build("(a|b)*abb").unwrap();
    let mut builder = DfaBuilder::new();
    builder.add(&nfa, LexAction::Token { pattern: 0 });
    let dfa = builder.build();
    let minimal = minimize(&dfa);
    assert_eq!(minimal.state_count(), 4);
    for input in ["abb", "aabb", "babb", "abababb"] {
        assert_eq!(minimal.longest_match(input).map(|(_, n)| n), Some(input.len()));
    }
    assert_eq!(minimal.longest_match("abab"), None);
}

#[test]
fn test_line_and_column_of_errors() {
    let lexer = LexerBuilder::new()
        .token(0, "[a-z]+", str::to_string)
        .ignore("[ \n]+")
        .end_of_input(1)
        .build()
        .unwrap();
    let err = lexer.tokenize("ab\ncd ?").unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(err.column, 4);
    assert_eq!(err.line_text, "cd ?");
    assert!(err.to_string().contains("line 2, column 4"));
}

#[test]
fn test_unicode_ranges_and_columns() {
    let lexer = LexerBuilder::new()
        .token(0, "[α-ω]+", str::to_string)
        .ignore(" +")
        .end_of_input(1)
        .build()
        .unwrap();
    let tokens = lexer.tokenize("αβγ δ").unwrap();
    assert_eq!(kinds(&tokens), vec![0, 0, 1]);
    assert_eq!(tokens[0].value, "αβγ");
    let err = lexer.tokenize("αβ x").unwrap_err();
    assert_eq!(err.column, 4);
}

#[test]
fn test_configurations_agree() {
    let input = "if x1 = 42 then y := x1 + 0x1f";
    let build = |config: LexerConfig| {
        LexerBuilder::new()
            .token(0, "if|then", str::to_string)
            .token(1, "[a-z][a-z0-9]*", str::to_string)
            .token(2, "0x[0-9a-f]+|[0-9]+", str::to_string)
            .token(3, ":=|=|\\+", str::to_string)
            .ignore("\\s+")
            .end_of_input(4)
            .config(config)
            .build()
            .unwrap()
    };
    let expected = build(LexerConfig::default()).tokenize(input).unwrap();
    assert_eq!(kinds(&expected), vec![0, 1, 3, 2, 0, 1, 3, 1, 3, 2, 4]);
    for (minimize, compress) in [(false, false), (true, false), (false, true)] {
        let lexer = build(LexerConfig { minimize, compress });
        assert_eq!(lexer.tokenize(input).unwrap(), expected);
    }
}

#[test]
fn test_engines_agree() {
    let builder = || {
        LexerBuilder::new()
            .token(0, "[0-9]+(\\.[0-9]+)?", str::to_string)
            .token(1, "[a-zA-Z_]\\w*", str::to_string)
            .literal(2, "(", str::to_string)
            .literal(3, ")", str::to_string)
            .ignore("[ \t]+")
            .end_of_input(4)
    };
    let input = "f(3.25) (x_1 7)";
    let tabular = builder().build().unwrap().tokenize(input).unwrap();
    let dfa = builder().build_engine::<DfaEngine>().unwrap().tokenize(input).unwrap();
    let nfa = builder().build_engine::<NfaEngine>().unwrap().tokenize(input).unwrap();
    assert_eq!(kinds(&tabular), vec![1, 2, 0, 3, 2, 1, 0, 3, 4]);
    assert_eq!(dfa, tabular);
    assert_eq!(nfa, tabular);
}

#[test]
fn test_compression_shrinks_table() {
    let lexer = LexerBuilder::new()
        .token(0, "while|for|if|else|return", str::to_string)
        .token(1, "[a-z]+", str::to_string)
        .ignore(" +")
        .end_of_input(2)
        .build()
        .unwrap();
    let table = lexer.engine().table();
    assert!(table.is_compressed());
    assert!(table.stored_cells() < table.state_count() * table.column_count());
}
