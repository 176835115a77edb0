//! Regular expression front end.
//!
//! A pattern is scanned into tokens, an explicit concatenation token is
//! inserted between adjacent operands, and the token stream is reordered into
//! postfix form with the shunting-yard algorithm. The resulting [`RegexOp`]
//! stream is evaluated left to right by the NFA builder.
//!
//! Supported syntax: literal characters, `.`, `|`, `*`, `+`, `?`, `(...)`,
//! character classes `[a-z]` and `[^...]`, counted repetition `{m}`, `{m,}`,
//! `{m:n}` (also written `{m,n}`), and the escapes `\d \D \s \S \w \W \n \r \t`.
//! Any other non-alphanumeric character may be escaped to stand for itself.

use super::charset::CharSet;
use crate::error::{RegexError, RegexErrorKind};

/// Largest count accepted in `{m}` / `{m:n}`
pub const MAX_REPEAT: u32 = 1000;

/// One step of a compiled pattern, in evaluation (postfix) order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegexOp {
    /// Push a fragment matching one character of the set
    Accept(CharSet),
    /// Pop `b`, pop `a`, push `ab`
    Concat,
    /// Pop `b`, pop `a`, push `a|b`
    Alternate,
    Star,
    Plus,
    Optional,
    /// `max == None` means unbounded (`{m,}`)
    Repeat { min: u32, max: Option<u32> },
}

impl RegexOp {
    /// Operands popped and fragments pushed.
    const fn arity(&self) -> (usize, usize) {
        match self {
            Self::Accept(_) => (0, 1),
            Self::Concat | Self::Alternate => (2, 1),
            Self::Star | Self::Plus | Self::Optional | Self::Repeat { .. } => (1, 1),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum TokenKind {
    Accept(CharSet),
    Alternate,
    Concat,
    Star,
    Plus,
    Question,
    Repeat { min: u32, max: Option<u32> },
    Open,
    Close,
}

impl TokenKind {
    /// The token ends an operand, so an operand after it is concatenated.
    const fn preceding_requires_concat(&self) -> bool {
        matches!(
            self,
            Self::Star
                | Self::Plus
                | Self::Question
                | Self::Repeat { .. }
                | Self::Accept(_)
                | Self::Close
        )
    }

    /// The token starts an operand.
    const fn following_requires_concat(&self) -> bool {
        matches!(self, Self::Accept(_) | Self::Open)
    }

    /// Shunting-yard precedence; `Open` is the lowest as a stack sentinel.
    const fn precedence(&self) -> u8 {
        match self {
            Self::Star | Self::Plus | Self::Question | Self::Repeat { .. } => 3,
            Self::Concat => 2,
            Self::Alternate => 1,
            Self::Open | Self::Close | Self::Accept(_) => 0,
        }
    }

    fn into_op(self) -> Option<RegexOp> {
        Some(match self {
            Self::Accept(set) => RegexOp::Accept(set),
            Self::Alternate => RegexOp::Alternate,
            Self::Concat => RegexOp::Concat,
            Self::Star => RegexOp::Star,
            Self::Plus => RegexOp::Plus,
            Self::Question => RegexOp::Optional,
            Self::Repeat { min, max } => RegexOp::Repeat { min, max },
            Self::Open | Self::Close => return None,
        })
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    /// Char offset of the token in the pattern
    position: usize,
}

/// Compile `pattern` into a postfix operation stream.
///
/// # Errors
///
/// Returns a [`RegexError`] pointing at the offending character when the
/// pattern is empty, has unbalanced parentheses or classes, uses an unknown
/// escape, or an operator lacks an operand.
pub fn parse(pattern: &str) -> Result<Vec<RegexOp>, RegexError> {
    let tokens = Scanner::new(pattern).tokens()?;
    let tokens = insert_concat(tokens);
    let postfix = to_postfix(pattern, tokens)?;
    check_operands(pattern, &postfix)?;
    Ok(postfix.into_iter().map(|(op, _)| op).collect())
}

/// Escape `text` so it matches itself literally.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_ascii_punctuation() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

struct Scanner<'a> {
    pattern: &'a str,
    chars: Vec<char>,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern,
            chars: pattern.chars().collect(),
            pos: 0,
        }
    }

    fn error(&self, kind: RegexErrorKind, position: usize) -> RegexError {
        kind.at(self.pattern, position)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn tokens(mut self) -> Result<Vec<Token>, RegexError> {
        if self.chars.is_empty() {
            return Err(self.error(RegexErrorKind::EmptyPattern, 0));
        }
        let mut tokens = Vec::with_capacity(self.chars.len());
        while let Some(c) = self.bump() {
            let position = self.pos - 1;
            let kind = match c {
                '|' => TokenKind::Alternate,
                '*' => TokenKind::Star,
                '+' => TokenKind::Plus,
                '?' => TokenKind::Question,
                '(' => TokenKind::Open,
                ')' => TokenKind::Close,
                '.' => TokenKind::Accept(CharSet::any()),
                '[' => TokenKind::Accept(self.class(position)?),
                '{' => self.repeat(position)?,
                '\\' => TokenKind::Accept(self.escape(position)?),
                c => TokenKind::Accept(CharSet::single(c)),
            };
            tokens.push(Token { kind, position });
        }
        Ok(tokens)
    }

    /// Escape sequence after a consumed `\`.
    fn escape(&mut self, start: usize) -> Result<CharSet, RegexError> {
        let Some(c) = self.bump() else {
            return Err(self.error(RegexErrorKind::DanglingEscape, start));
        };
        Ok(match c {
            'd' => CharSet::digit(),
            'D' => CharSet::digit().negate(),
            's' => CharSet::space(),
            'S' => CharSet::space().negate(),
            'w' => CharSet::word(),
            'W' => CharSet::word().negate(),
            'n' => CharSet::single('\n'),
            'r' => CharSet::single('\r'),
            't' => CharSet::single('\t'),
            c if c.is_ascii_alphanumeric() => {
                return Err(self.error(RegexErrorKind::BadEscape(c), start));
            }
            c => CharSet::single(c),
        })
    }

    /// Character class after a consumed `[`.
    fn class(&mut self, start: usize) -> Result<CharSet, RegexError> {
        let negated = self.peek() == Some('^');
        if negated {
            self.pos += 1;
        }
        let mut set = CharSet::new();
        let mut first = true;
        loop {
            let item_pos = self.pos;
            let Some(c) = self.bump() else {
                return Err(self.error(RegexErrorKind::UnterminatedClass, start));
            };
            if c == ']' && !first {
                break;
            }
            first = false;

            let low = match c {
                '\\' => {
                    let escaped = self.escape(item_pos)?;
                    match escaped.ranges() {
                        [range] if range.from() == range.to() => range.from(),
                        _ => {
                            set.union(&escaped);
                            continue;
                        }
                    }
                }
                c => c,
            };

            // `-` is a range operator only between two endpoints.
            let is_range =
                self.peek() == Some('-') && self.chars.get(self.pos + 1).is_some_and(|&n| n != ']');
            if !is_range {
                set.add(low);
                continue;
            }
            self.pos += 1;
            let high_pos = self.pos;
            let high = match self.bump() {
                Some('\\') => {
                    let escaped = self.escape(high_pos)?;
                    match escaped.ranges() {
                        [range] if range.from() == range.to() => range.from(),
                        _ => {
                            // `[a-\d]`: the dash is literal.
                            set.add(low);
                            set.add('-');
                            set.union(&escaped);
                            continue;
                        }
                    }
                }
                Some(c) => c,
                None => return Err(self.error(RegexErrorKind::UnterminatedClass, start)),
            };
            if high < low {
                return Err(self.error(
                    RegexErrorKind::InvertedRange { from: low, to: high },
                    item_pos,
                ));
            }
            set.add_range(low, high, true);
        }

        let set = if negated { set.negate() } else { set };
        if set.is_empty() {
            return Err(self.error(RegexErrorKind::EmptyClass, start));
        }
        Ok(set)
    }

    /// Counted repetition after a consumed `{`.
    fn repeat(&mut self, start: usize) -> Result<TokenKind, RegexError> {
        let bad = |scanner: &Self, reason: &str| {
            scanner.error(RegexErrorKind::BadRepeat(reason.into()), start)
        };
        let Some(min) = self.number()? else {
            return Err(bad(self, "expected a count after `{`"));
        };
        let max = match self.bump() {
            Some('}') => Some(min),
            Some(',' | ':') => {
                let max = self.number()?;
                if self.bump() != Some('}') {
                    return Err(bad(self, "expected `}`"));
                }
                // n < m is clamped to m
                max.map(|max| max.max(min))
            }
            _ => return Err(bad(self, "expected `}`, `,` or `:`")),
        };
        if max == Some(0) {
            return Err(bad(self, "count must be positive"));
        }
        Ok(TokenKind::Repeat { min, max })
    }

    fn number(&mut self) -> Result<Option<u32>, RegexError> {
        let start = self.pos;
        let mut value: u32 = 0;
        while let Some(digit) = self.peek().and_then(|c| c.to_digit(10)) {
            self.pos += 1;
            value = value.saturating_mul(10).saturating_add(digit);
        }
        if self.pos == start {
            return Ok(None);
        }
        if value > MAX_REPEAT {
            return Err(self.error(
                RegexErrorKind::BadRepeat(format!("count exceeds {MAX_REPEAT}").into()),
                start,
            ));
        }
        Ok(Some(value))
    }
}

/// Insert `Concat` between every pair of tokens where the first ends an
/// operand and the second starts one.
fn insert_concat(tokens: Vec<Token>) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len() * 2);
    for token in tokens {
        if let Some(prev) = out.last()
            && prev.kind.preceding_requires_concat()
            && token.kind.following_requires_concat()
        {
            out.push(Token {
                kind: TokenKind::Concat,
                position: token.position,
            });
        }
        out.push(token);
    }
    out
}

fn to_postfix(pattern: &str, tokens: Vec<Token>) -> Result<Vec<(RegexOp, usize)>, RegexError> {
    let mut output: Vec<(RegexOp, usize)> = Vec::with_capacity(tokens.len());
    let mut stack: Vec<Token> = Vec::new();

    let emit = |token: Token, output: &mut Vec<(RegexOp, usize)>| {
        let position = token.position;
        if let Some(op) = token.kind.into_op() {
            output.push((op, position));
        }
    };

    for token in tokens {
        match token.kind {
            TokenKind::Accept(_) => emit(token, &mut output),
            TokenKind::Open => stack.push(token),
            TokenKind::Close => loop {
                match stack.pop() {
                    Some(Token { kind: TokenKind::Open, .. }) => break,
                    Some(op) => emit(op, &mut output),
                    None => {
                        return Err(
                            RegexErrorKind::UnbalancedParenthesis.at(pattern, token.position)
                        );
                    }
                }
            },
            _ => {
                let precedence = token.kind.precedence();
                while stack
                    .last()
                    .is_some_and(|top| top.kind.precedence() >= precedence && top.kind != TokenKind::Open)
                {
                    if let Some(op) = stack.pop() {
                        emit(op, &mut output);
                    }
                }
                stack.push(token);
            }
        }
    }

    while let Some(token) = stack.pop() {
        if token.kind == TokenKind::Open {
            return Err(RegexErrorKind::UnbalancedParenthesis.at(pattern, token.position));
        }
        emit(token, &mut output);
    }
    Ok(output)
}

/// Simulate the evaluation stack so operand errors are reported at the
/// operator instead of surfacing later in NFA construction.
fn check_operands(pattern: &str, ops: &[(RegexOp, usize)]) -> Result<(), RegexError> {
    let mut depth = 0usize;
    for (op, position) in ops {
        let (pops, pushes) = op.arity();
        if depth < pops {
            return Err(RegexErrorKind::MissingOperand.at(pattern, *position));
        }
        depth = depth - pops + pushes;
    }
    match depth {
        1 => Ok(()),
        0 => Err(RegexErrorKind::EmptyPattern.at(pattern, 0)),
        _ => Err(RegexErrorKind::MissingOperand.at(pattern, pattern.chars().count())),
    }
}
