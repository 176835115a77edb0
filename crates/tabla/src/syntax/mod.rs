//! Source positions shared by the lexer runtime, tokens and diagnostics.

pub mod text;

pub use text::*;
