//! # Lexer Module
//!
//! Compiles regular-expression token patterns into deterministic tables and
//! scans input with them.
//!
//! ## Overview
//!
//! The compilation pipeline runs once per pattern set:
//!
//! 1. [`regex`] turns each pattern into a postfix operation stream
//! 2. [`nfa`] evaluates the stream into a Thompson NFA
//! 3. [`dfa`] merges the pattern NFAs and runs subset construction
//! 4. [`minimize`] merges equivalent states (optional)
//! 5. [`table`] flattens the DFA and packs its rows (optional)
//!
//! The result is a [`CompiledLexer`], shared by any number of
//! [`LexerRuntime`] scanners.
//!
//! ## Priority
//!
//! The scanner always extends a lexeme as far as it can. When several
//! patterns match the same longest lexeme, the one registered first wins,
//! except that ignored patterns always lose to token patterns.
//!
//! ## Usage
//!
//! ```rust
//! use tabla::lexer::LexerBuilder;
//!
//! const NUM: usize = 0;
//! const PLUS: usize = 1;
//! const EOF: usize = 2;
//!
//! let lexer = LexerBuilder::new()
//!     .token(NUM, "[0-9]+", |text| text.parse::<i64>().unwrap_or(0))
//!     .literal(PLUS, "+", |_| 0)
//!     .ignore("[ \t]+")
//!     .end_of_input(EOF)
//!     .build()?;
//!
//! let tokens = lexer.tokenize("40 + 2")?;
//! let terminals: Vec<usize> = tokens.iter().map(|t| t.terminal).collect();
//! assert_eq!(terminals, vec![NUM, PLUS, NUM, EOF]);
//! assert_eq!(tokens[2].value, 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Error Handling
//!
//! Malformed patterns fail [`LexerBuilder::build`] with a
//! [`LexerBuildError`](crate::error::LexerBuildError). Input that cannot be
//! scanned yields a [`LexerError`](crate::error::LexerError) carrying the line,
//! column and line text.

pub mod builder;
pub mod charset;
pub mod dfa;
pub mod engine;
pub mod minimize;
pub mod nfa;
pub mod regex;
pub mod runtime;
pub mod table;
pub mod token;

pub use builder::{LexerBuilder, LexerConfig, TokenAction};
pub use charset::{CharRange, CharSet};
pub use dfa::{Dfa, DfaBuilder, LexAction, StateId};
pub use engine::{DfaEngine, Engine, NfaEngine, PatternSet, TabularEngine};
pub use nfa::Nfa;
pub use runtime::{CompiledLexer, LexerRuntime};
pub use table::{CompressedTable, TransitionTable};
pub use token::{Token, TokenSource};
