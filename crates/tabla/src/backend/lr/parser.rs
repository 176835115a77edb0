//! The compiled parser and its shift/reduce driver.

use super::action::Action;
use super::config::LrConfig;
use super::table::{LrParsingTable, ReductionRule};
use crate::error::{GrammarError, ParseError, SyntaxError};
use crate::grammar::{Grammar, ReduceAction, TerminalId};
use crate::lexer::{CompiledLexer, Token, TokenSource};
use crate::syntax::TextRange;
use compact_str::CompactString;
use std::sync::Arc;
use tracing::{debug, trace};

/// A reduction rule with the semantic action it runs
pub(crate) struct Reduction<T> {
    pub(crate) rule: ReductionRule,
    pub(crate) reduce: ReduceAction<T>,
}

pub(crate) struct ParseTables<T> {
    pub(crate) table: LrParsingTable,
    pub(crate) reductions: Vec<Reduction<T>>,
    pub(crate) terminal_names: Vec<CompactString>,
    pub(crate) non_terminal_names: Vec<CompactString>,
    pub(crate) config: LrConfig,
}

impl<T> ParseTables<T> {
    pub(crate) fn terminal_name(&self, terminal: usize) -> &str {
        self.terminal_names.get(terminal).map_or("?", CompactString::as_str)
    }

    pub(crate) fn action(&self, state: usize, terminal: usize) -> Action {
        self.table.action.get(state, terminal)
    }

    pub(crate) fn syntax_error(&self, state: usize, token: &Token<T>) -> SyntaxError {
        SyntaxError {
            state,
            found: self.terminal_name(token.terminal).into(),
            text: token.text.clone(),
            expected: self
                .table
                .action
                .expected(state)
                .into_iter()
                .map(|terminal| CompactString::from(self.terminal_name(terminal)))
                .collect(),
            span: token.range,
        }
    }
}

/// Parse tables, reduce actions and lexer of one grammar.
///
/// Immutable once built; clones share the tables, and each parse runs on its
/// own [`LrParser`] stacks.
pub struct CompiledParser<T> {
    lexer: CompiledLexer<T>,
    tables: Arc<ParseTables<T>>,
}

impl<T> Clone for CompiledParser<T> {
    fn clone(&self) -> Self {
        Self {
            lexer: self.lexer.clone(),
            tables: Arc::clone(&self.tables),
        }
    }
}

impl<T: Default + 'static> Grammar<T> {
    /// Build the lexer and LR tables for this grammar.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for conflicts the precedence declarations
    /// do not settle, or [`GrammarError::Lexer`] if a terminal pattern is
    /// malformed.
    pub fn compile(&self, config: LrConfig) -> Result<CompiledParser<T>, GrammarError> {
        let lexer = self.lexer()?;
        let table = LrParsingTable::build(self, &config)?;
        let reductions = table
            .rules
            .iter()
            .map(|&rule| Reduction {
                rule,
                reduce: self.productions[rule.production.0].reduce.clone(),
            })
            .collect();
        debug!(
            states = table.state_count,
            terminals = self.terminals.len(),
            "compiled parser"
        );
        Ok(CompiledParser {
            lexer,
            tables: Arc::new(ParseTables {
                table,
                reductions,
                terminal_names: self.terminals.iter().map(|t| t.name.clone()).collect(),
                non_terminal_names: self.non_terminals.iter().map(|n| n.name.clone()).collect(),
                config,
            }),
        })
    }
}

impl<T: Default> CompiledParser<T> {
    /// Scan and parse `input`, returning the value of the start symbol.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::Lexer`] for input no token matches and
    /// [`ParseError::Syntax`] for an error recovery could not repair.
    pub fn parse(&self, input: &str) -> Result<T, ParseError> {
        self.parser().parse(self.lexer.runtime(input))
    }

    /// Parse tokens from any [`TokenSource`].
    ///
    /// # Errors
    ///
    /// As for [`parse`](Self::parse), plus [`ParseError::UnknownToken`] for a
    /// token number outside the grammar.
    pub fn parse_tokens<S: TokenSource<T>>(&self, tokens: S) -> Result<T, ParseError> {
        self.parser().parse(tokens)
    }

    /// A parser with fresh stacks.
    #[must_use]
    pub fn parser(&self) -> LrParser<'_, T> {
        LrParser::new(&self.tables)
    }
}

impl<T> CompiledParser<T> {
    #[must_use]
    pub fn lexer(&self) -> &CompiledLexer<T> {
        &self.lexer
    }

    #[must_use]
    pub fn config(&self) -> &LrConfig {
        &self.tables.config
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.tables.table.state_count
    }

    #[must_use]
    pub fn action(&self, state: usize, terminal: TerminalId) -> Action {
        self.tables.action(state, terminal.0)
    }

    /// Terminals with a defined action in `state`.
    #[must_use]
    pub fn expected_terminals(&self, state: usize) -> Vec<TerminalId> {
        self.tables
            .table
            .action
            .expected(state)
            .into_iter()
            .map(TerminalId)
            .collect()
    }

    #[must_use]
    pub fn terminal_name(&self, terminal: TerminalId) -> &str {
        self.tables.terminal_name(terminal.0)
    }
}

/// One parse: the state stack and the value stack, kept in step.
///
/// The value stack holds one entry per state above the initial state.
pub struct LrParser<'p, T> {
    pub(crate) tables: &'p ParseTables<T>,
    pub(crate) states: Vec<u32>,
    pub(crate) values: Vec<T>,
    /// Error that started the latest recovery
    pub(crate) pending: Option<SyntaxError>,
    /// Set after the error terminal is shifted, cleared by the next real shift
    pub(crate) recovering: bool,
    pub(crate) errors: usize,
}

impl<'p, T: Default> LrParser<'p, T> {
    pub(crate) fn new(tables: &'p ParseTables<T>) -> Self {
        Self {
            tables,
            states: vec![0],
            values: Vec::new(),
            pending: None,
            recovering: false,
            errors: 0,
        }
    }

    pub(crate) fn top(&self) -> usize {
        self.states.last().map_or(0, |&state| state as usize)
    }

    /// Run the parse to acceptance.
    ///
    /// # Errors
    ///
    /// Returns the first error that could not be recovered from.
    pub fn parse<S: TokenSource<T>>(mut self, mut source: S) -> Result<T, ParseError> {
        let terminal_count = self.tables.table.action.terminal_count();
        let mut lookahead = source.next_token()?;
        // The real lookahead while the error terminal stands in for it
        let mut deferred: Option<Token<T>> = None;

        loop {
            if lookahead.terminal >= terminal_count {
                return Err(ParseError::UnknownToken(lookahead.terminal));
            }
            let state = self.top();
            match self.tables.action(state, lookahead.terminal) {
                Action::Shift(next) => {
                    trace!(
                        state,
                        next,
                        terminal = self.tables.terminal_name(lookahead.terminal),
                        "shift"
                    );
                    self.states.push(next);
                    if let Some(real) = deferred.take() {
                        let error = std::mem::replace(&mut lookahead, real);
                        self.values.push(error.value);
                        self.recovering = true;
                    } else {
                        let following = source.next_token()?;
                        let shifted = std::mem::replace(&mut lookahead, following);
                        self.values.push(shifted.value);
                        self.recovering = false;
                    }
                }
                Action::Reduce(rule) => self.reduce(rule as usize)?,
                Action::Accept => {
                    trace!(state, "accept");
                    return Ok(self.values.pop().unwrap_or_default());
                }
                Action::Error => {
                    if deferred.is_some() {
                        // The error terminal itself was rejected after reductions.
                        return Err(self.failure(state, &lookahead));
                    }
                    if self.recovering {
                        lookahead = self.discard(&mut source, lookahead)?;
                        continue;
                    }
                    let error = self.tables.syntax_error(state, &lookahead);
                    self.recover(error)?;
                    let error_token = Token::new(
                        TerminalId::ERROR.0,
                        "",
                        TextRange::empty_at(lookahead.range.start().to_usize()),
                        T::default(),
                    );
                    deferred = Some(std::mem::replace(&mut lookahead, error_token));
                }
            }
        }
    }

    fn reduce(&mut self, rule: usize) -> Result<(), ParseError> {
        let tables = self.tables;
        let Some(reduction) = tables.reductions.get(rule) else {
            return Err(ParseError::MissingGoto {
                state: self.top(),
                symbol: CompactString::default(),
            });
        };
        let ReductionRule {
            result, pop_count, ..
        } = reduction.rule;

        let split = self.values.len().saturating_sub(pop_count);
        let arguments = self.values.split_off(split);
        self.states.truncate(self.states.len().saturating_sub(pop_count).max(1));
        let value = match &reduction.reduce {
            ReduceAction::Normal(reduce) => reduce(arguments),
            ReduceAction::Error(reduce) => match &self.pending {
                Some(error) => reduce(error, arguments),
                None => {
                    let error = SyntaxError {
                        state: self.top(),
                        found: tables.terminal_name(TerminalId::ERROR.0).into(),
                        text: CompactString::default(),
                        expected: Vec::new(),
                        span: TextRange::default(),
                    };
                    reduce(&error, arguments)
                }
            },
        };

        let state = self.top();
        let Some(next) = tables.table.goto.get(state, result.0) else {
            return Err(ParseError::MissingGoto {
                state,
                symbol: tables
                    .non_terminal_names
                    .get(result.0)
                    .cloned()
                    .unwrap_or_default(),
            });
        };
        trace!(state, next, rule, pop_count, "reduce");
        self.states.push(next);
        self.values.push(value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::GrammarBuilder;

    fn calculator() -> CompiledParser<i64> {
        let mut g = GrammarBuilder::<i64>::new();
        let num = g.terminal("num", "[0-9]+", |text| text.parse().unwrap_or(0));
        let plus = g.literal("+");
        let minus = g.literal("-");
        let times = g.literal("*");
        let open = g.literal("(");
        let close = g.literal(")");
        g.left([plus, minus]);
        g.left([times]);
        g.ignore("[ \t\n]+");
        let e = g.non_terminal("e");
        g.production(e, [e.into(), plus.into(), e.into()], |v| v[0] + v[2]);
        g.production(e, [e.into(), minus.into(), e.into()], |v| v[0] - v[2]);
        g.production(e, [e.into(), times.into(), e.into()], |v| v[0] * v[2]);
        g.production(e, [open.into(), e.into(), close.into()], |v| v[1]);
        g.production(e, [num.into()], |v| v[0]);
        g.start(e);
        g.build().unwrap().compile(LrConfig::default()).unwrap()
    }

    #[test]
    fn test_precedence_and_associativity() {
        let parser = calculator();
        assert_eq!(parser.parse("7 + 8 * 2").unwrap(), 23);
        assert_eq!(parser.parse("10 - 4 - 3").unwrap(), 3);
        assert_eq!(parser.parse("(1 + 2) * 3").unwrap(), 9);
    }

    #[test]
    fn test_syntax_error_lists_expected() {
        let parser = calculator();
        let err = parser.parse("1 + * 2").unwrap_err();
        let syntax = err.as_syntax().unwrap();
        assert_eq!(syntax.found, "*");
        assert_eq!(syntax.text, "*");
        assert_eq!(syntax.span, TextRange::of(4, 1));
        let mut expected = syntax.expected.clone();
        expected.sort();
        assert_eq!(expected, vec!["(", "num"]);
    }

    #[test]
    fn test_unexpected_end_of_input() {
        let parser = calculator();
        let err = parser.parse("(1 + 2").unwrap_err();
        assert_eq!(err.as_syntax().unwrap().found, "$end");
    }

    #[test]
    fn test_lexer_errors_propagate() {
        let parser = calculator();
        assert!(matches!(parser.parse("1 $ 2"), Err(ParseError::Lexer(_))));
    }

    #[test]
    fn test_unknown_token_number() {
        let parser = calculator();
        let tokens = vec![Token::new(99, "?", TextRange::of(0, 1), 0)];
        let mut iter = tokens.into_iter();
        struct Tokens<I>(I);
        impl<I: Iterator<Item = Token<i64>>> TokenSource<i64> for Tokens<I> {
            fn next_token(&mut self) -> Result<Token<i64>, crate::error::LexerError> {
                Ok(self.0.next().unwrap_or_else(|| {
                    Token::new(0, "", TextRange::default(), 0)
                }))
            }
        }
        let result = parser.parse_tokens(Tokens(&mut iter));
        assert!(matches!(result, Err(ParseError::UnknownToken(99))));
    }

    #[test]
    fn test_expected_terminals_in_initial_state() {
        let parser = calculator();
        let names: Vec<&str> = parser
            .expected_terminals(0)
            .into_iter()
            .map(|t| parser.terminal_name(t))
            .collect();
        assert_eq!(names, vec!["num", "("]);
    }

    #[test]
    fn test_canonical_tables_parse_alike() {
        let mut g = GrammarBuilder::<i64>::new();
        let num = g.terminal("num", "[0-9]+", |text| text.parse().unwrap_or(0));
        let sum = g.non_terminal("sum");
        g.production(sum, [sum.into(), "+".into(), num.into()], |v| v[0] + v[2]);
        g.production(sum, [num.into()], |v| v[0]);
        g.start(sum);
        let grammar = g.build().unwrap();
        let lalr = grammar.compile(LrConfig::default()).unwrap();
        let canonical = grammar.compile(LrConfig::canonical()).unwrap();
        assert_eq!(lalr.parse("1+2+3").unwrap(), 6);
        assert_eq!(canonical.parse("1+2+3").unwrap(), 6);
    }
}
