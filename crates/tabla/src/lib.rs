//! # Tabla
//!
//! A table-driven lexer generator and LR(1) parser generator.
//!
//! ## Overview
//!
//! Tabla compiles two kinds of specification into tables at run time:
//!
//! - **Token patterns** (regular expressions) become a minimized,
//!   row-compressed DFA transition table scanned by a longest-match lexer
//! - **Grammars** (productions with semantic actions and precedence
//!   declarations) become LALR(1) or canonical LR(1) ACTION/GOTO tables driven
//!   by a shift/reduce parser with yacc-style `error`-token recovery
//!
//! Compiled lexers and parsers are immutable and can be shared between
//! threads; each scan or parse keeps its own state.
//!
//! ## Quick Start
//!
//! ```rust
//! use tabla::{GrammarBuilder, LrConfig};
//!
//! let mut g = GrammarBuilder::<f64>::new();
//! let num = g.terminal("num", "[0-9]+(\\.[0-9]+)?", |text| text.parse().unwrap_or(0.0));
//! let plus = g.literal("+");
//! let minus = g.literal("-");
//! let times = g.literal("*");
//! let divide = g.literal("/");
//! g.left([plus, minus]);
//! g.left([times, divide]);
//! g.ignore("[ \t\n]+");
//!
//! let expr = g.non_terminal("expr");
//! g.production(expr, [expr.into(), plus.into(), expr.into()], |v| v[0] + v[2]);
//! g.production(expr, [expr.into(), minus.into(), expr.into()], |v| v[0] - v[2]);
//! g.production(expr, [expr.into(), times.into(), expr.into()], |v| v[0] * v[2]);
//! g.production(expr, [expr.into(), divide.into(), expr.into()], |v| v[0] / v[2]);
//! g.production(expr, ["(".into(), expr.into(), ")".into()], |v| v[1]);
//! g.production(expr, [num.into()], |v| v[0]);
//! g.start(expr);
//!
//! let parser = g.build()?.compile(LrConfig::default())?;
//! assert_eq!(parser.parse("1 + 2 * (3 - 1.5)")?, 4.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Modules
//!
//! - [`lexer`]: character sets, regex parsing, NFA/DFA construction,
//!   minimization, transition tables and the scanning runtime
//! - [`grammar`]: the grammar model and its builder
//! - [`backend::lr`]: LR(1) table construction and the parser runtime
//! - [`error`]: error types for every stage
//! - [`syntax`]: source offsets and ranges
//!
//! ## Feature Flags
//!
//! - `serialize`: serde support for configuration and table types
//! - `diagnostics`: `miette` diagnostics for every error type

pub mod backend;
pub mod error;
pub mod grammar;
pub mod lexer;
pub mod syntax;

pub use backend::lr::{CompiledParser, LrConfig};
pub use error::{GrammarError, LexerBuildError, LexerError, ParseError, RegexError, SyntaxError};
pub use grammar::{Grammar, GrammarBuilder, NonTerminalId, ProductionId, Symbol, TerminalId};
pub use lexer::{CompiledLexer, LexerBuilder, LexerConfig, Token, TokenSource};
pub use syntax::{TextRange, TextSize};
