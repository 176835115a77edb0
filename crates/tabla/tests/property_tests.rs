//! Property-based tests for the table builders and runtimes
//!
//! These tests use proptest to generate random inputs and check that the
//! compressed and uncompressed forms of each table agree.

use proptest::prelude::*;
use tabla::backend::lr::GotoTable;
use tabla::lexer::charset::CharSet;
use tabla::lexer::dfa::{DfaBuilder, LexAction};
use tabla::lexer::engine::{DfaEngine, NfaEngine};
use tabla::lexer::minimize::minimize;
use tabla::lexer::{CompressedTable, LexerBuilder, LexerConfig, Nfa};
use tabla::{GrammarBuilder, LrConfig};

fn arithmetic() -> tabla::CompiledParser<i64> {
    let mut g = GrammarBuilder::<i64>::new();
    let num = g.terminal("num", "[0-9]+", |text| text.parse().unwrap_or(0));
    let plus = g.literal("+");
    let times = g.literal("*");
    g.left([plus]);
    g.left([times]);
    g.ignore(" +");
    let e = g.non_terminal("e");
    g.production(e, [e.into(), plus.into(), e.into()], |v| v[0] + v[2]);
    g.production(e, [e.into(), times.into(), e.into()], |v| v[0] * v[2]);
    g.production(e, [num.into()], |v| v[0]);
    g.start(e);
    g.build().unwrap().compile(LrConfig::default()).unwrap()
}

fn lexer_builder(config: LexerConfig) -> LexerBuilder<String> {
    LexerBuilder::new()
        .token(0, "ab*", str::to_string)
        .token(1, "(a|b)+c", str::to_string)
        .token(2, "[0-9]+", str::to_string)
        .ignore(" +")
        .end_of_input(3)
        .config(config)
}

proptest! {
    #[test]
    fn sums_of_products(terms in prop::collection::vec(prop::collection::vec(0i64..100, 1..4), 1..6)) {
        let text = terms
            .iter()
            .map(|factors| factors.iter().map(ToString::to_string).collect::<Vec<_>>().join(" * "))
            .collect::<Vec<_>>()
            .join(" + ");
        let expected: i64 = terms.iter().map(|factors| factors.iter().product::<i64>()).sum();
        prop_assert_eq!(arithmetic().parse(&text).unwrap(), expected);
    }

    #[test]
    fn engines_and_configurations_agree(input in "[abc0-9 ]{0,24}") {
        let reference = lexer_builder(LexerConfig::default()).build().unwrap().tokenize(&input);
        let plain = lexer_builder(LexerConfig { minimize: false, compress: false })
            .build()
            .unwrap()
            .tokenize(&input);
        let dfa = lexer_builder(LexerConfig::default())
            .build_engine::<DfaEngine>()
            .unwrap()
            .tokenize(&input);
        let nfa = lexer_builder(LexerConfig::default())
            .build_engine::<NfaEngine>()
            .unwrap()
            .tokenize(&input);
        prop_assert_eq!(&plain, &reference);
        prop_assert_eq!(&dfa, &reference);
        prop_assert_eq!(&nfa, &reference);
    }

    #[test]
    fn minimization_preserves_matches(input in "[ab]{0,16}") {
        let nfa = Nfa::build("(a|b)*abb|ba*").unwrap();
        let mut builder = DfaBuilder::new();
        builder.add(&nfa, LexAction::Token { pattern: 0 });
        let dfa = builder.build();
        let minimal = minimize(&dfa);
        prop_assert!(minimal.state_count() <= dfa.state_count());
        prop_assert_eq!(minimal.longest_match(&input), dfa.longest_match(&input));
    }

    #[test]
    fn negation_is_complement(c in any::<char>().prop_filter("not NUL", |c| *c != '\0')) {
        let set = CharSet::word();
        prop_assert_ne!(set.contains(c), set.negate().contains(c));
    }

    #[test]
    fn compressed_rows_read_back(rows in prop::collection::vec(prop::collection::vec(prop::option::of(0u8..4), 6), 1..12)) {
        let table = CompressedTable::pack(rows.iter().map(Vec::as_slice), 6);
        for (r, row) in rows.iter().enumerate() {
            for (c, &cell) in row.iter().enumerate() {
                prop_assert_eq!(table.get(r, c), Some(cell));
            }
        }
        prop_assert!(table.len() <= rows.len() * 6);
    }

    #[test]
    fn goto_defined_entries_survive(rows in prop::collection::vec(prop::collection::vec(prop::option::of(0u32..5), 4), 1..12)) {
        let table = GotoTable::compress(&rows, 4);
        for (state, row) in rows.iter().enumerate() {
            for (column, &target) in row.iter().enumerate() {
                if target.is_some() {
                    prop_assert_eq!(table.get(state, column), target);
                }
            }
        }
    }
}
