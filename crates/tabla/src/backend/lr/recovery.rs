//! Error-token recovery.
//!
//! On a syntax error the parser pops states until one has an action for the
//! `error` terminal, then presents `error` as the lookahead so the usual
//! loop reduces and shifts it. After that shift, input tokens the new state
//! cannot act on are discarded. Until a real token is shifted again, any
//! further error discards the lookahead instead of unwinding once more.
//! Reaching end of input while discarding fails the parse with the error that
//! started the recovery.

use super::parser::LrParser;
use crate::error::{ParseError, SyntaxError};
use crate::grammar::TerminalId;
use crate::lexer::{Token, TokenSource};
use tracing::{debug, trace};

impl<T: Default> LrParser<'_, T> {
    /// Unwind to a state that accepts the error terminal.
    pub(crate) fn recover(&mut self, error: SyntaxError) -> Result<(), ParseError> {
        let config = &self.tables.config;
        if !config.error_recovery || self.errors >= config.max_errors {
            return Err(error.into());
        }

        let mut popped = 0usize;
        while let Some(&state) = self.states.last() {
            if !self
                .tables
                .action(state as usize, TerminalId::ERROR.0)
                .is_error()
            {
                self.errors += 1;
                debug!(
                    state,
                    popped,
                    found = %error.found,
                    errors = self.errors,
                    "recovering from syntax error"
                );
                self.pending = Some(error);
                return Ok(());
            }
            self.states.pop();
            self.values.pop();
            popped += 1;
        }
        Err(error.into())
    }

    /// Drop `token` and read the next one; end of input fails the parse.
    pub(crate) fn discard<S: TokenSource<T>>(
        &mut self,
        source: &mut S,
        token: Token<T>,
    ) -> Result<Token<T>, ParseError> {
        if token.terminal == TerminalId::END_OF_INPUT.0 {
            return Err(self.failure(self.top(), &token));
        }
        trace!(terminal = token.terminal, text = %token.text, "discarded");
        Ok(source.next_token()?)
    }

    /// The error that started the current recovery, or a fresh one at `token`.
    pub(crate) fn failure(&self, state: usize, token: &Token<T>) -> ParseError {
        self.pending
            .clone()
            .unwrap_or_else(|| self.tables.syntax_error(state, token))
            .into()
    }
}
