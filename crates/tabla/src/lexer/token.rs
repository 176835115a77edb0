use crate::error::LexerError;
use crate::syntax::TextRange;
use compact_str::CompactString;

/// A token produced by the lexer.
///
/// Each token carries the terminal number it was registered under, the
/// source text it covers, its byte range, and the value computed by the
/// pattern's action.
#[derive(Debug, Clone, PartialEq)]
pub struct Token<T> {
    /// Terminal number of the matched pattern
    pub terminal: usize,
    /// The source text that this token represents
    pub text: CompactString,
    /// The byte range in the source text where this token appears
    pub range: TextRange,
    /// Value returned by the pattern's action
    pub value: T,
}

impl<T> Token<T> {
    #[must_use]
    pub fn new(terminal: usize, text: impl Into<CompactString>, range: TextRange, value: T) -> Self {
        Self {
            terminal,
            text: text.into(),
            range,
            value,
        }
    }

    /// Replace the value, keeping position information.
    #[must_use]
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Token<U> {
        Token {
            terminal: self.terminal,
            text: self.text,
            range: self.range,
            value: f(self.value),
        }
    }
}

/// Anything the LR parser can pull tokens from.
///
/// After the end-of-input token has been returned, implementations keep
/// returning it.
pub trait TokenSource<T> {
    /// Scan the next token.
    ///
    /// # Errors
    ///
    /// Returns a [`LexerError`] when the input cannot be tokenized.
    fn next_token(&mut self) -> Result<Token<T>, LexerError>;
}

impl<T, S: TokenSource<T> + ?Sized> TokenSource<T> for &mut S {
    fn next_token(&mut self) -> Result<Token<T>, LexerError> {
        (**self).next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_keeps_position() {
        let token = Token::new(3, "42", TextRange::of(5, 2), "42");
        let mapped = token.map(|text| text.parse::<i64>().unwrap_or_default());
        assert_eq!(mapped.value, 42);
        assert_eq!(mapped.terminal, 3);
        assert_eq!(mapped.range, TextRange::of(5, 2));
        assert_eq!(mapped.text, "42");
    }
}
