//! Pattern registration and lexer compilation.

use super::dfa::LexAction;
use super::engine::{Engine, PatternSet, TabularEngine};
use super::nfa::Nfa;
use super::regex;
use super::runtime::{CompiledLexer, TokenRule};
use crate::error::LexerBuildError;
use compact_str::CompactString;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Action run on the lexeme of a matched token
pub type TokenAction<T> = Arc<dyn Fn(&str) -> T + Send + Sync>;

/// Produces the value of the end-of-input token
pub type EndOfInputAction<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Configuration for lexer table construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct LexerConfig {
    /// Merge equivalent DFA states before building tables
    pub minimize: bool,

    /// Pack transition table rows by displacement
    pub compress: bool,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            minimize: true,
            compress: true,
        }
    }
}

enum RuleKind<T> {
    Token {
        terminal: usize,
        action: TokenAction<T>,
    },
    Ignore,
}

struct LexRule<T> {
    pattern: CompactString,
    kind: RuleKind<T>,
}

/// Registers token patterns in priority order and compiles them.
///
/// Earlier registrations win when two patterns match the same longest
/// lexeme. Ignored patterns always rank after every token pattern.
pub struct LexerBuilder<T> {
    rules: SmallVec<[LexRule<T>; 16]>,
    end_of_input: Option<(usize, EndOfInputAction<T>)>,
    config: LexerConfig,
}

impl<T> Default for LexerBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> LexerBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rules: SmallVec::new(),
            end_of_input: None,
            config: LexerConfig::default(),
        }
    }

    /// Register a token pattern whose lexemes become values through `action`.
    #[must_use]
    pub fn token(
        mut self,
        terminal: usize,
        pattern: impl Into<CompactString>,
        action: impl Fn(&str) -> T + Send + Sync + 'static,
    ) -> Self {
        self.rules.push(LexRule {
            pattern: pattern.into(),
            kind: RuleKind::Token {
                terminal,
                action: Arc::new(action),
            },
        });
        self
    }

    /// Register a token matching `text` exactly.
    #[must_use]
    pub fn literal(
        self,
        terminal: usize,
        text: &str,
        action: impl Fn(&str) -> T + Send + Sync + 'static,
    ) -> Self {
        self.token(terminal, regex::escape(text), action)
    }

    /// Register a pattern whose matches are skipped.
    #[must_use]
    pub fn ignore(mut self, pattern: impl Into<CompactString>) -> Self {
        self.rules.push(LexRule {
            pattern: pattern.into(),
            kind: RuleKind::Ignore,
        });
        self
    }

    /// Terminal returned once the input is exhausted, with a value from `value`.
    #[must_use]
    pub fn end_of_input_with(
        mut self,
        terminal: usize,
        value: impl Fn() -> T + Send + Sync + 'static,
    ) -> Self {
        self.end_of_input = Some((terminal, Arc::new(value)));
        self
    }

    #[must_use]
    pub const fn config(mut self, config: LexerConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile to the table-driven engine.
    ///
    /// # Errors
    ///
    /// See [`LexerBuilder::build_engine`].
    pub fn build(self) -> Result<CompiledLexer<T, TabularEngine>, LexerBuildError> {
        self.build_engine()
    }

    /// Compile the registered patterns for engine `E`.
    ///
    /// # Errors
    ///
    /// Returns [`LexerBuildError::InvalidPattern`] for the first malformed
    /// pattern, [`LexerBuildError::NoPatterns`] if nothing was registered, and
    /// [`LexerBuildError::MissingEndOfInput`] if no end-of-input terminal was set.
    pub fn build_engine<E: Engine>(self) -> Result<CompiledLexer<T, E>, LexerBuildError> {
        if self.rules.is_empty() {
            return Err(LexerBuildError::NoPatterns);
        }
        self.compile()
    }

    /// Like [`build_engine`](Self::build_engine), but an empty rule set gives
    /// a lexer that accepts only the empty input.
    pub(crate) fn compile<E: Engine>(self) -> Result<CompiledLexer<T, E>, LexerBuildError> {
        let Some((eof_terminal, eof_value)) = self.end_of_input else {
            return Err(LexerBuildError::MissingEndOfInput);
        };

        let mut patterns = PatternSet::new();
        let mut rules: Vec<Option<TokenRule<T>>> = Vec::with_capacity(self.rules.len());
        for (index, rule) in self.rules.into_iter().enumerate() {
            let nfa = Nfa::build(&rule.pattern)
                .map_err(|source| LexerBuildError::InvalidPattern { index, source })?;
            match rule.kind {
                RuleKind::Token { terminal, action } => {
                    patterns.push(nfa, LexAction::Token { pattern: index as u32 });
                    rules.push(Some(TokenRule { terminal, action }));
                }
                RuleKind::Ignore => {
                    patterns.push(nfa, LexAction::Ignore);
                    rules.push(None);
                }
            }
        }

        let engine = E::from_patterns(&patterns, &self.config);
        debug!(
            patterns = patterns.len(),
            minimize = self.config.minimize,
            compress = self.config.compress,
            "compiled lexer"
        );
        Ok(CompiledLexer::new(engine, rules, eof_terminal, eof_value))
    }
}

impl<T: Default + 'static> LexerBuilder<T> {
    /// Terminal returned once the input is exhausted, valued `T::default()`.
    #[must_use]
    pub fn end_of_input(self, terminal: usize) -> Self {
        self.end_of_input_with(terminal, T::default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegexErrorKind;

    #[test]
    fn test_invalid_pattern_reports_index() {
        let result = LexerBuilder::<()>::new()
            .token(0, "a", |_| ())
            .token(1, "[b", |_| ())
            .end_of_input(2)
            .build();
        match result {
            Err(LexerBuildError::InvalidPattern { index, source }) => {
                assert_eq!(index, 1);
                assert_eq!(source.kind, RegexErrorKind::UnterminatedClass);
            }
            other => panic!("expected invalid pattern, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_requires_patterns_and_end_of_input() {
        let empty = LexerBuilder::<()>::new().end_of_input(0).build();
        assert!(matches!(empty.err(), Some(LexerBuildError::NoPatterns)));
        let no_eof = LexerBuilder::<()>::new().token(0, "a", |_| ()).build();
        assert!(matches!(no_eof.err(), Some(LexerBuildError::MissingEndOfInput)));
    }

    #[test]
    fn test_empty_rule_set_only_ends() {
        let lexer = LexerBuilder::<()>::new()
            .end_of_input(0)
            .compile::<TabularEngine>()
            .unwrap();
        let tokens = lexer.tokenize("").unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].terminal, 0);
        let err = lexer.tokenize("x").unwrap_err();
        assert_eq!((err.line, err.column), (1, 1));
    }

    #[test]
    fn test_literal_is_escaped() {
        let lexer = LexerBuilder::new()
            .literal(0, "a+b", |s| s.to_string())
            .end_of_input(1)
            .build()
            .unwrap();
        let tokens = lexer.tokenize("a+b").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].value, "a+b");
    }

    #[test]
    fn test_config_default() {
        let config = LexerConfig::default();
        assert!(config.minimize);
        assert!(config.compress);
    }
}
