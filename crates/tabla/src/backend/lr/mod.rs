//! # LR(1) Backend
//!
//! Table construction and the table-driven shift/reduce parser.
//!
//! ## Pipeline
//!
//! 1. [`table`] computes nullable flags and FIRST sets, builds the LR(1)
//!    item-set collection (merging equal cores for LALR(1)) and fills the
//!    ACTION and GOTO tables
//! 2. [`action`] packs ACTION rows by displacement
//! 3. [`goto`] reduces GOTO to per-column defaults plus exceptions
//! 4. [`parser`] drives the parse; [`recovery`] repairs syntax errors with
//!    the `error` terminal
//!
//! ## Usage
//!
//! ```rust
//! use tabla::backend::lr::LrConfig;
//! use tabla::grammar::GrammarBuilder;
//!
//! let mut g = GrammarBuilder::<i64>::new();
//! let num = g.terminal("num", "[0-9]+", |text| text.parse().unwrap_or(0));
//! let plus = g.literal("+");
//! let times = g.literal("*");
//! g.left([plus]);
//! g.left([times]);
//! g.ignore(" +");
//! let e = g.non_terminal("e");
//! g.production(e, [e.into(), plus.into(), e.into()], |v| v[0] + v[2]);
//! g.production(e, [e.into(), times.into(), e.into()], |v| v[0] * v[2]);
//! g.production(e, [num.into()], |v| v[0]);
//! g.start(e);
//!
//! let parser = g.build()?.compile(LrConfig::default())?;
//! assert_eq!(parser.parse("7 + 8 * 2")?, 23);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod action;
mod config;
pub mod goto;
pub mod item;
pub mod parser;
mod recovery;
pub mod table;

pub use action::{Action, ActionTable};
pub use config::LrConfig;
pub use goto::GotoTable;
pub use parser::{CompiledParser, LrParser};
pub use table::{LrParsingTable, ReductionRule};
