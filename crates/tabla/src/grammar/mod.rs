//! # Grammar Module
//!
//! Context-free grammars with semantic actions, the input of the LR table
//! builder.
//!
//! ## Overview
//!
//! A [`Grammar`] holds:
//!
//! - **Terminals**: each with a debug name and, except for the two reserved
//!   terminals, a pattern and a token action for the lexer
//! - **Non-terminals**: named, each with at least one production
//! - **Productions**: an ordered symbol sequence and a reduce action
//! - **Precedence**: per-terminal levels and associativity, used only to
//!   settle would-be shift/reduce conflicts
//!
//! Token numbers are assigned once: terminals first, then non-terminals,
//! contiguous from zero. Terminal 0 is the end of input and terminal 1 the
//! error terminal.
//!
//! ## Usage
//!
//! ```rust
//! use tabla::grammar::GrammarBuilder;
//!
//! let mut g = GrammarBuilder::<i64>::new();
//! let num = g.terminal("num", "[0-9]+", |text| text.parse().unwrap_or(0));
//! let plus = g.literal("+");
//! let sum = g.non_terminal("sum");
//! g.production(sum, [sum.into(), plus.into(), num.into()], |v| v[0] + v[2]);
//! g.production(sum, [num.into()], |v| v[0]);
//! g.ignore(" +");
//! g.start(sum);
//! let grammar = g.build()?;
//! assert_eq!(grammar.productions().len(), 2);
//! # Ok::<(), tabla::error::GrammarError>(())
//! ```

pub mod builder;

pub use builder::{GrammarBuilder, SymbolRef};

use crate::error::SyntaxError;
use crate::lexer::{CompiledLexer, LexerBuilder, LexerConfig, TokenAction};
use compact_str::CompactString;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Terminal handle; the wrapped value is the token number
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TerminalId(pub usize);

/// Non-terminal handle; the wrapped value indexes the non-terminal list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonTerminalId(pub usize);

/// Index of a production in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProductionId(pub usize);

impl TerminalId {
    /// End of input (`$end`)
    pub const END_OF_INPUT: Self = Self(0);
    /// The error terminal (`error`)
    pub const ERROR: Self = Self(1);
}

/// Grammar symbol on the right-hand side of a production
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Symbol {
    Terminal(TerminalId),
    NonTerminal(NonTerminalId),
}

impl Symbol {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Terminal(_))
    }
}

/// How operators of one precedence level group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Associativity {
    Left,
    Right,
    NonAssoc,
}

/// Precedence level (higher binds tighter) with its associativity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct Precedence {
    pub level: u32,
    pub associativity: Associativity,
}

/// Where a terminal's lexer pattern comes from
pub enum TerminalKind<T> {
    /// `$end` and `error`, never produced by the lexer directly
    Reserved,
    /// Exact text
    Literal(CompactString),
    /// Regular expression with its token action
    Pattern {
        regex: CompactString,
        action: TokenAction<T>,
    },
}

impl<T> Clone for TerminalKind<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Reserved => Self::Reserved,
            Self::Literal(text) => Self::Literal(text.clone()),
            Self::Pattern { regex, action } => Self::Pattern {
                regex: regex.clone(),
                action: Arc::clone(action),
            },
        }
    }
}

/// Declared terminal
pub struct TerminalDef<T> {
    pub name: CompactString,
    pub kind: TerminalKind<T>,
    pub precedence: Option<Precedence>,
}

impl<T> Clone for TerminalDef<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            kind: self.kind.clone(),
            precedence: self.precedence,
        }
    }
}

/// Declared non-terminal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonTerminalDef {
    pub name: CompactString,
}

/// Ordinary reduce function: values in production order
pub type ReduceFn<T> = Arc<dyn Fn(Vec<T>) -> T + Send + Sync>;

/// Error-recovery reduce function, also given the pending syntax error
pub type ErrorReduceFn<T> = Arc<dyn Fn(&SyntaxError, Vec<T>) -> T + Send + Sync>;

/// Semantic action of a production
pub enum ReduceAction<T> {
    Normal(ReduceFn<T>),
    Error(ErrorReduceFn<T>),
}

impl<T> Clone for ReduceAction<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Normal(reduce) => Self::Normal(Arc::clone(reduce)),
            Self::Error(reduce) => Self::Error(Arc::clone(reduce)),
        }
    }
}

impl<T> fmt::Debug for ReduceAction<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal(_) => f.write_str("Normal(..)"),
            Self::Error(_) => f.write_str("Error(..)"),
        }
    }
}

/// `result -> symbols`
#[derive(Debug)]
pub struct Production<T> {
    pub result: NonTerminalId,
    pub symbols: SmallVec<[Symbol; 4]>,
    pub reduce: ReduceAction<T>,
    /// Explicit override, else the precedence of the last terminal that has one
    pub precedence: Option<Precedence>,
}

impl<T> Clone for Production<T> {
    fn clone(&self) -> Self {
        Self {
            result: self.result,
            symbols: self.symbols.clone(),
            reduce: self.reduce.clone(),
            precedence: self.precedence,
        }
    }
}

/// A complete grammar, ready for table construction
pub struct Grammar<T> {
    pub(crate) terminals: Vec<TerminalDef<T>>,
    pub(crate) non_terminals: Vec<NonTerminalDef>,
    pub(crate) productions: Vec<Production<T>>,
    pub(crate) start: NonTerminalId,
    pub(crate) ignore: Vec<CompactString>,
    pub(crate) lexer_config: LexerConfig,
}

impl<T> Clone for Grammar<T> {
    fn clone(&self) -> Self {
        Self {
            terminals: self.terminals.clone(),
            non_terminals: self.non_terminals.clone(),
            productions: self.productions.clone(),
            start: self.start,
            ignore: self.ignore.clone(),
            lexer_config: self.lexer_config,
        }
    }
}

impl<T> Grammar<T> {
    #[must_use]
    pub fn terminals(&self) -> &[TerminalDef<T>] {
        &self.terminals
    }

    #[must_use]
    pub fn non_terminals(&self) -> &[NonTerminalDef] {
        &self.non_terminals
    }

    #[must_use]
    pub fn productions(&self) -> &[Production<T>] {
        &self.productions
    }

    #[must_use]
    pub const fn start(&self) -> NonTerminalId {
        self.start
    }

    #[must_use]
    pub fn terminal_count(&self) -> usize {
        self.terminals.len()
    }

    /// Token number of a symbol: terminals first, then non-terminals.
    #[must_use]
    pub fn token_number(&self, symbol: Symbol) -> usize {
        match symbol {
            Symbol::Terminal(t) => t.0,
            Symbol::NonTerminal(n) => self.terminals.len() + n.0,
        }
    }

    #[must_use]
    pub fn terminal_name(&self, terminal: TerminalId) -> &str {
        self.terminals.get(terminal.0).map_or("?", |t| t.name.as_str())
    }

    #[must_use]
    pub fn non_terminal_name(&self, non_terminal: NonTerminalId) -> &str {
        self.non_terminals
            .get(non_terminal.0)
            .map_or("?", |n| n.name.as_str())
    }

    #[must_use]
    pub fn symbol_name(&self, symbol: Symbol) -> &str {
        match symbol {
            Symbol::Terminal(t) => self.terminal_name(t),
            Symbol::NonTerminal(n) => self.non_terminal_name(n),
        }
    }

    /// `result -> a b c`, or `result -> ε` for an empty production.
    #[must_use]
    pub fn display_production(&self, production: ProductionId) -> CompactString {
        let Some(p) = self.productions.get(production.0) else {
            return CompactString::default();
        };
        let mut text = CompactString::from(self.non_terminal_name(p.result));
        text.push_str(" ->");
        if p.symbols.is_empty() {
            text.push_str(" ε");
        }
        for &symbol in &p.symbols {
            text.push(' ');
            text.push_str(self.symbol_name(symbol));
        }
        text
    }

    /// Productions of `non_terminal`, in declaration order.
    pub fn productions_of(
        &self,
        non_terminal: NonTerminalId,
    ) -> impl Iterator<Item = (ProductionId, &Production<T>)> {
        self.productions
            .iter()
            .enumerate()
            .filter(move |(_, p)| p.result == non_terminal)
            .map(|(i, p)| (ProductionId(i), p))
    }
}

impl<T: Default + 'static> Grammar<T> {
    /// Lexer for the grammar's terminals.
    ///
    /// Literal terminals are registered ahead of pattern terminals, so a
    /// keyword wins over an identifier pattern matching the same text. Ignore
    /// patterns come last. Literal tokens are valued `T::default()`.
    ///
    /// # Errors
    ///
    /// Returns a [`LexerBuildError`](crate::error::LexerBuildError) if a
    /// terminal pattern is malformed. A grammar without lexable terminals
    /// gets a lexer that only accepts the empty input.
    pub fn lexer(&self) -> Result<CompiledLexer<T>, crate::error::LexerBuildError> {
        let mut builder = LexerBuilder::new().config(self.lexer_config);
        for (number, terminal) in self.terminals.iter().enumerate() {
            if let TerminalKind::Literal(text) = &terminal.kind {
                builder = builder.literal(number, text, |_| T::default());
            }
        }
        for (number, terminal) in self.terminals.iter().enumerate() {
            if let TerminalKind::Pattern { regex, action } = &terminal.kind {
                let action = Arc::clone(action);
                builder = builder.token(number, regex.clone(), move |text| action(text));
            }
        }
        for pattern in &self.ignore {
            builder = builder.ignore(pattern.clone());
        }
        builder.end_of_input(TerminalId::END_OF_INPUT.0).compile()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grammar() -> Grammar<()> {
        let mut g = GrammarBuilder::<()>::new();
        let id = g.terminal("id", "[a-z]+", |_| ());
        let list = g.non_terminal("list");
        g.production(list, [list.into(), ",".into(), id.into()], |_| ());
        g.production(list, [id.into()], |_| ());
        g.production(list, [], |_| ());
        g.start(list);
        g.build().unwrap()
    }

    #[test]
    fn test_token_numbers() {
        let g = grammar();
        assert_eq!(g.terminal_name(TerminalId::END_OF_INPUT), "$end");
        assert_eq!(g.terminal_name(TerminalId::ERROR), "error");
        assert_eq!(g.terminal_count(), 4);
        assert_eq!(g.token_number(Symbol::NonTerminal(NonTerminalId(0))), 4);
        assert_eq!(g.token_number(Symbol::Terminal(TerminalId(3))), 3);
    }

    #[test]
    fn test_display_production() {
        let g = grammar();
        assert_eq!(g.display_production(ProductionId(0)), "list -> list , id");
        assert_eq!(g.display_production(ProductionId(2)), "list -> ε");
    }

    #[test]
    fn test_productions_of() {
        let g = grammar();
        let ids: Vec<usize> = g.productions_of(NonTerminalId(0)).map(|(id, _)| id.0).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_lexer_prefers_literals() {
        let mut g = GrammarBuilder::<u8>::new();
        let id = g.terminal("id", "[a-z]+", |_| 7);
        let kw = g.literal("if");
        let s = g.non_terminal("s");
        g.production(s, [kw.into(), id.into()], |_| 0);
        g.ignore(" +");
        g.start(s);
        let lexer = g.build().unwrap().lexer().unwrap();
        let tokens = lexer.tokenize("if iffy").unwrap();
        let terminals: Vec<usize> = tokens.iter().map(|t| t.terminal).collect();
        assert_eq!(terminals, vec![kw.0, id.0, 0]);
        assert_eq!(tokens[0].value, 0);
        assert_eq!(tokens[1].value, 7);
    }
}
