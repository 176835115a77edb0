//! # Error Types
//!
//! Errors raised while compiling patterns and grammars, and while scanning
//! or parsing input with the compiled tables.
//!
//! ## Overview
//!
//! | Error | Raised | Recoverable |
//! |---|---|---|
//! | [`RegexError`] / [`LexerBuildError`] | building a lexer from malformed patterns | no |
//! | [`GrammarError`] | building parse tables for an ambiguous grammar | no |
//! | [`LexerError`] | scanning input no pattern matches | no |
//! | [`SyntaxError`] (inside [`ParseError`]) | parsing a token with no table action | through the error terminal |
//!
//! Construction errors always abort table building; no partially built table
//! is ever returned.
//!
//! ## Diagnostics Support
//!
//! When the `diagnostics` feature is enabled, errors integrate with [`miette`]
//! for rich error reporting with source spans.

use crate::syntax::TextRange;
use compact_str::CompactString;
use thiserror::Error;

#[cfg(feature = "diagnostics")]
use miette::Diagnostic;

/// Malformed regular expression, reported with the offending character offset
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(regex::syntax)))]
#[error("invalid pattern `{pattern}` at offset {position}: {kind}")]
pub struct RegexError {
    pub pattern: CompactString,
    /// Char offset into `pattern`
    pub position: usize,
    #[source]
    pub kind: RegexErrorKind,
}

/// Kinds of regular expression syntax errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegexErrorKind {
    #[error("unterminated character class")]
    UnterminatedClass,

    #[error("character class matches nothing")]
    EmptyClass,

    #[error("character range `{from}-{to}` is out of order")]
    InvertedRange { from: char, to: char },

    #[error("unknown escape `\\{0}`")]
    BadEscape(char),

    #[error("pattern ends with a lone `\\`")]
    DanglingEscape,

    #[error("unbalanced parenthesis")]
    UnbalancedParenthesis,

    #[error("malformed counted repetition: {0}")]
    BadRepeat(CompactString),

    #[error("operator is missing an operand")]
    MissingOperand,

    #[error("pattern is empty")]
    EmptyPattern,
}

impl RegexErrorKind {
    /// Attach the pattern text and position to this kind.
    #[must_use]
    pub fn at(self, pattern: &str, position: usize) -> RegexError {
        RegexError {
            pattern: pattern.into(),
            position,
            kind: self,
        }
    }
}

/// Failure to compile a set of registered patterns into a lexer
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum LexerBuildError {
    #[error("pattern #{index} is invalid")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::invalid_pattern)))]
    InvalidPattern {
        index: usize,
        #[source]
        source: RegexError,
    },

    #[error("no token patterns were registered")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::no_patterns)))]
    NoPatterns,

    #[error("no end-of-input token was configured")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::missing_end_of_input)))]
    MissingEndOfInput,
}

/// Failure to build parse tables from a grammar
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum GrammarError {
    #[error(
        "shift/reduce conflict in state {state}: shift `{shift_symbol}` or reduce `{production}` to `{reduce_symbol}`"
    )]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::shift_reduce),
            help("declare a precedence group for `{shift_symbol}` or rewrite the grammar")
        )
    )]
    ShiftReduceConflict {
        state: usize,
        /// Terminal that would be shifted (the lookahead)
        shift_symbol: CompactString,
        /// Non-terminal the competing production reduces to
        reduce_symbol: CompactString,
        production: CompactString,
    },

    #[error(
        "reduce/reduce conflict in state {state} on `{lookahead}`: `{first}` and `{second}` both apply"
    )]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::reduce_reduce)))]
    ReduceReduceConflict {
        state: usize,
        lookahead: CompactString,
        first: CompactString,
        second: CompactString,
    },

    #[error("non-terminal `{non_terminal}` has no productions")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::no_productions)))]
    NoProductions { non_terminal: CompactString },

    #[error("grammar declares no start symbol")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(grammar::missing_start)))]
    MissingStart,

    #[error("{kind} #{index} used in {context} was not declared by this builder")]
    #[cfg_attr(
        feature = "diagnostics",
        diagnostic(
            code(grammar::unknown_symbol),
            help("symbol handles are only valid in the builder that created them")
        )
    )]
    UnknownSymbol {
        /// `"terminal"` or `"non-terminal"`
        kind: &'static str,
        index: usize,
        /// Where the handle appeared, e.g. `start symbol` or `production 3`
        context: CompactString,
    },

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Lexer(#[from] LexerBuildError),
}

/// Input that no registered pattern can scan
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(lexer::unexpected_input)))]
#[error("unexpected input at line {line}, column {column} after `{lexeme}`: {line_text}")]
pub struct LexerError {
    /// One-based line number
    pub line: usize,
    /// One-based column, in chars
    pub column: usize,
    /// Full text of the line the scanner stopped on
    pub line_text: CompactString,
    /// Characters accumulated for the token that could not be completed
    pub lexeme: CompactString,
    #[cfg_attr(feature = "diagnostics", label("no token matches here"))]
    pub span: TextRange,
}

/// No parse action is defined for the lookahead in the current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
#[cfg_attr(feature = "diagnostics", diagnostic(code(parser::unexpected_token)))]
#[error("unexpected `{found}` in state {state}, expected one of: {}", join_names(.expected))]
pub struct SyntaxError {
    pub state: usize,
    /// Debug name of the offending terminal
    pub found: CompactString,
    /// Source text of the offending token
    pub text: CompactString,
    /// Debug names of every terminal the state has an action for
    pub expected: Vec<CompactString>,
    #[cfg_attr(feature = "diagnostics", label("unexpected token"))]
    pub span: TextRange,
}

/// Errors surfaced by [`CompiledParser::parse`](crate::backend::lr::CompiledParser::parse)
#[derive(Debug, Clone, Error)]
#[cfg_attr(feature = "diagnostics", derive(Diagnostic))]
pub enum ParseError {
    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Syntax(#[from] SyntaxError),

    #[error(transparent)]
    #[cfg_attr(feature = "diagnostics", diagnostic(transparent))]
    Lexer(#[from] LexerError),

    #[error("token number {0} is not a terminal of this grammar")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::unknown_token)))]
    UnknownToken(usize),

    #[error("parse table has no goto from state {state} on `{symbol}`")]
    #[cfg_attr(feature = "diagnostics", diagnostic(code(parser::missing_goto)))]
    MissingGoto { state: usize, symbol: CompactString },
}

impl ParseError {
    /// The syntax error, if this is one
    #[must_use]
    pub const fn as_syntax(&self) -> Option<&SyntaxError> {
        match self {
            Self::Syntax(err) => Some(err),
            _ => None,
        }
    }
}

fn join_names(names: &[CompactString]) -> String {
    if names.is_empty() {
        return "<nothing>".to_string();
    }
    names
        .iter()
        .map(CompactString::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
