//! The scanning loop shared by every [`Engine`].
//!
//! The runtime always tries to extend the current lexeme; when the engine has
//! no transition for the next character (end of input reads as NUL, which no
//! edge carries) the action of the current state decides what happens:
//! ignored lexemes restart the scan, token lexemes are returned, and states
//! without an action raise a [`LexerError`]. There is no backtracking to an
//! earlier accepting state.

use super::builder::{EndOfInputAction, TokenAction};
use super::dfa::LexAction;
use super::engine::{Engine, TabularEngine};
use super::token::{Token, TokenSource};
use crate::error::LexerError;
use crate::syntax::TextRange;
use std::sync::Arc;
use tracing::trace;

/// Character fed to the engine once the input is exhausted
pub const END_OF_INPUT: char = '\0';

/// Terminal and action of one registered token pattern
pub(crate) struct TokenRule<T> {
    pub(crate) terminal: usize,
    pub(crate) action: TokenAction<T>,
}

struct LexerTables<T, E> {
    engine: E,
    /// Indexed by pattern registration order; `None` for ignored patterns
    rules: Vec<Option<TokenRule<T>>>,
    eof_terminal: usize,
    eof_value: EndOfInputAction<T>,
}

/// Immutable compiled lexer, cheap to clone and safe to share across threads
pub struct CompiledLexer<T, E = TabularEngine> {
    tables: Arc<LexerTables<T, E>>,
}

impl<T, E> Clone for CompiledLexer<T, E> {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
        }
    }
}

impl<T, E: Engine> CompiledLexer<T, E> {
    pub(crate) fn new(
        engine: E,
        rules: Vec<Option<TokenRule<T>>>,
        eof_terminal: usize,
        eof_value: EndOfInputAction<T>,
    ) -> Self {
        Self {
            tables: Arc::new(LexerTables {
                engine,
                rules,
                eof_terminal,
                eof_value,
            }),
        }
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.tables.engine
    }

    #[must_use]
    pub fn end_of_input(&self) -> usize {
        self.tables.eof_terminal
    }

    /// A fresh scanner over `input`.
    #[must_use]
    pub fn runtime<'a>(&'a self, input: &'a str) -> LexerRuntime<'a, T, E> {
        LexerRuntime::new(self, input)
    }

    /// Scan all of `input`; the last token is always the end-of-input token.
    ///
    /// # Errors
    ///
    /// Returns the first [`LexerError`] met.
    pub fn tokenize(&self, input: &str) -> Result<Vec<Token<T>>, LexerError> {
        self.runtime(input).collect()
    }
}

/// One scan over one input
pub struct LexerRuntime<'a, T, E = TabularEngine> {
    lexer: &'a CompiledLexer<T, E>,
    input: &'a str,
    /// Byte offset of the next unread character
    pos: usize,
    /// One-based number of the current line
    line: usize,
    /// Byte offset where the current line starts
    line_start: usize,
    finished: bool,
}

impl<'a, T, E: Engine> LexerRuntime<'a, T, E> {
    #[must_use]
    pub const fn new(lexer: &'a CompiledLexer<T, E>, input: &'a str) -> Self {
        Self {
            lexer,
            input,
            pos: 0,
            line: 1,
            line_start: 0,
            finished: false,
        }
    }

    #[must_use]
    pub const fn offset(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn line(&self) -> usize {
        self.line
    }

    /// One-based column of the next unread character, in chars.
    #[must_use]
    pub fn column(&self) -> usize {
        self.input[self.line_start..self.pos].chars().count() + 1
    }

    /// Text of the current line without its terminator.
    #[must_use]
    pub fn line_text(&self) -> &'a str {
        let rest = &self.input[self.line_start..];
        let end = memchr::memchr(b'\n', rest.as_bytes()).unwrap_or(rest.len());
        rest[..end].strip_suffix('\r').unwrap_or(&rest[..end])
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self, c: char) {
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.line_start = self.pos;
        }
    }

    fn error(&self, start: usize, pending: Option<char>) -> LexerError {
        LexerError {
            line: self.line,
            column: self.column(),
            line_text: self.line_text().into(),
            lexeme: self.input[start..self.pos].into(),
            span: TextRange::of(self.pos, pending.map_or(0, char::len_utf8)),
        }
    }

    /// Scan the next token.
    ///
    /// # Errors
    ///
    /// Returns a [`LexerError`] at the first character that can neither extend
    /// the current lexeme nor follow a completed one.
    pub fn next_token(&mut self) -> Result<Token<T>, LexerError> {
        let lexer: &'a CompiledLexer<T, E> = self.lexer;
        let tables = &*lexer.tables;
        let engine = &tables.engine;
        let mut state = engine.initial();
        let mut start = self.pos;

        loop {
            let pending = self.peek();
            let next = engine
                .next(&state, pending.unwrap_or(END_OF_INPUT))
                .filter(|_| pending.is_some());
            if let (Some(next), Some(c)) = (next, pending) {
                state = next;
                self.advance(c);
                continue;
            }

            if self.pos == start {
                if pending.is_none() {
                    self.finished = true;
                    return Ok(Token::new(
                        tables.eof_terminal,
                        "",
                        TextRange::empty_at(self.pos),
                        (tables.eof_value)(),
                    ));
                }
                // An empty match cannot make progress.
                return Err(self.error(start, pending));
            }

            match engine.action(&state) {
                LexAction::Ignore => {
                    trace!(lexeme = &self.input[start..self.pos], "skipped");
                    state = engine.initial();
                    start = self.pos;
                }
                LexAction::Token { pattern } => {
                    let Some(Some(rule)) = tables.rules.get(pattern as usize) else {
                        return Err(self.error(start, pending));
                    };
                    let text = &self.input[start..self.pos];
                    trace!(terminal = rule.terminal, lexeme = text, "token");
                    return Ok(Token::new(
                        rule.terminal,
                        text,
                        TextRange::of(start, self.pos - start),
                        (rule.action)(text),
                    ));
                }
                LexAction::None => return Err(self.error(start, pending)),
            }
        }
    }
}

impl<T, E: Engine> TokenSource<T> for LexerRuntime<'_, T, E> {
    fn next_token(&mut self) -> Result<Token<T>, LexerError> {
        Self::next_token(self)
    }
}

/// Yields tokens up to and including the end-of-input token, or the first error.
impl<T, E: Engine> Iterator for LexerRuntime<'_, T, E> {
    type Item = Result<Token<T>, LexerError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let item = self.next_token();
        if item.is_err() {
            self.finished = true;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::builder::LexerBuilder;
    use crate::lexer::engine::{DfaEngine, NfaEngine};

    const NUM: usize = 0;
    const IDENT: usize = 1;
    const PLUS: usize = 2;
    const EOF: usize = 3;

    fn builder() -> LexerBuilder<String> {
        LexerBuilder::new()
            .token(NUM, "[0-9]+", str::to_string)
            .token(IDENT, "[a-z_][a-z0-9_]*", str::to_string)
            .literal(PLUS, "+", str::to_string)
            .ignore("[ \t\r\n]+")
            .end_of_input(EOF)
    }

    fn kinds(tokens: &[Token<String>]) -> Vec<usize> {
        tokens.iter().map(|t| t.terminal).collect()
    }

    #[test]
    fn test_tokenize() {
        let lexer = builder().build().unwrap();
        let tokens = lexer.tokenize("x1 + 42").unwrap();
        assert_eq!(kinds(&tokens), vec![IDENT, PLUS, NUM, EOF]);
        assert_eq!(tokens[0].value, "x1");
        assert_eq!(tokens[2].range, TextRange::of(5, 2));
        assert_eq!(tokens[3].range, TextRange::empty_at(7));
    }

    #[test]
    fn test_empty_input_yields_end_of_input() {
        let lexer = builder().build().unwrap();
        let tokens = lexer.tokenize("").unwrap();
        assert_eq!(kinds(&tokens), vec![EOF]);
        assert_eq!(tokens[0].value, "");
        let trailing = lexer.tokenize("  \n ").unwrap();
        assert_eq!(kinds(&trailing), vec![EOF]);
    }

    #[test]
    fn test_longest_match() {
        let lexer = LexerBuilder::new()
            .token(0, "=", str::to_string)
            .token(1, "==", str::to_string)
            .end_of_input(2)
            .build()
            .unwrap();
        let tokens = lexer.tokenize("===").unwrap();
        assert_eq!(kinds(&tokens), vec![1, 0, 2]);
    }

    #[test]
    fn test_end_of_input_repeats() {
        let lexer = builder().build().unwrap();
        let mut runtime = lexer.runtime("7");
        assert_eq!(runtime.next_token().unwrap().terminal, NUM);
        assert_eq!(runtime.next_token().unwrap().terminal, EOF);
        assert_eq!(runtime.next_token().unwrap().terminal, EOF);
    }

    #[test]
    fn test_error_reports_line_and_column() {
        let lexer = builder().build().unwrap();
        let err = lexer.tokenize("a + b\r\nc ? d\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert_eq!(err.column, 3);
        assert_eq!(err.line_text, "c ? d");
        assert_eq!(err.lexeme, "");
        assert_eq!(err.span, TextRange::of(9, 1));
    }

    #[test]
    fn test_error_without_backtracking() {
        let lexer = LexerBuilder::new()
            .token(0, "ab", str::to_string)
            .token(1, "abcd", str::to_string)
            .end_of_input(2)
            .build()
            .unwrap();
        let err = lexer.tokenize("abc").unwrap_err();
        assert_eq!(err.lexeme, "abc");
        assert_eq!(err.column, 4);
    }

    #[test]
    fn test_zero_length_ignore_is_an_error() {
        let lexer = LexerBuilder::new()
            .token(0, "a", str::to_string)
            .ignore(" *")
            .end_of_input(1)
            .build()
            .unwrap();
        assert!(lexer.tokenize("a?").is_err());
        assert_eq!(kinds(&lexer.tokenize("  a a").unwrap()), vec![0, 0, 1]);
    }

    #[test]
    fn test_engines_tokenize_alike() {
        let input = "alpha + 12 + beta_2\n+ 7";
        let expected = builder().build().unwrap().tokenize(input).unwrap();
        let dfa = builder().build_engine::<DfaEngine>().unwrap();
        let nfa = builder().build_engine::<NfaEngine>().unwrap();
        assert_eq!(dfa.tokenize(input).unwrap(), expected);
        assert_eq!(nfa.tokenize(input).unwrap(), expected);
    }

    #[test]
    fn test_iterator_stops_after_error() {
        let lexer = builder().build().unwrap();
        let items: Vec<_> = lexer.runtime("1 $ 2").collect();
        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        assert!(items[1].is_err());
    }

    #[test]
    fn test_compiled_lexer_is_shareable() {
        fn assert_send_sync<S: Send + Sync>(_: &S) {}
        let lexer = builder().build().unwrap();
        assert_send_sync(&lexer);
        let shared = lexer.clone();
        let handle = std::thread::spawn(move || shared.tokenize("1 + 2").map(|t| t.len()));
        assert_eq!(handle.join().unwrap().unwrap(), 4);
    }
}
