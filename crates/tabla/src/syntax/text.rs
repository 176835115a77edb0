#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Byte offset into the scanned input (UTF-8)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextSize(u32);

/// Half-open byte range `start..end` covered by a token or an error
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct TextRange {
    start: TextSize,
    end: TextSize,
}

impl TextSize {
    #[must_use]
    pub const fn from(offset: u32) -> Self {
        Self(offset)
    }

    /// Offsets past `u32::MAX` saturate; inputs that large are not scanned.
    #[must_use]
    pub fn from_usize(offset: usize) -> Self {
        Self(u32::try_from(offset).unwrap_or(u32::MAX))
    }

    #[must_use]
    pub const fn into(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn to_usize(self) -> usize {
        self.0 as usize
    }

    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }
}

impl TextRange {
    #[must_use]
    pub const fn new(start: TextSize, end: TextSize) -> Self {
        Self { start, end }
    }

    /// Range of `len` bytes starting at byte offset `start`.
    #[must_use]
    pub fn of(start: usize, len: usize) -> Self {
        Self::new(
            TextSize::from_usize(start),
            TextSize::from_usize(start.saturating_add(len)),
        )
    }

    /// Zero-width range, used for the end-of-input token.
    #[must_use]
    pub fn empty_at(offset: usize) -> Self {
        Self::of(offset, 0)
    }

    #[must_use]
    pub const fn start(self) -> TextSize {
        self.start
    }

    #[must_use]
    pub const fn end(self) -> TextSize {
        self.end
    }

    #[must_use]
    pub const fn len(self) -> usize {
        (self.end.0 - self.start.0) as usize
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.end.0 == self.start.0
    }

    #[must_use]
    pub const fn contains(self, offset: TextSize) -> bool {
        offset.0 >= self.start.0 && offset.0 < self.end.0
    }

    /// Slice of `text` covered by this range, if it lies on char boundaries.
    #[must_use]
    pub fn slice(self, text: &str) -> Option<&str> {
        text.get(self.start.to_usize()..self.end.to_usize())
    }
}

impl fmt::Display for TextRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start.0, self.end.0)
    }
}

#[cfg(feature = "diagnostics")]
impl From<TextRange> for miette::SourceSpan {
    fn from(range: TextRange) -> Self {
        Self::new(
            miette::SourceOffset::from(range.start().to_usize()),
            range.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_of() {
        let range = TextRange::of(3, 4);
        assert_eq!(range.start(), TextSize::from(3));
        assert_eq!(range.end(), TextSize::from(7));
        assert_eq!(range.len(), 4);
        assert!(!range.is_empty());
    }

    #[test]
    fn test_empty_at() {
        let range = TextRange::empty_at(9);
        assert!(range.is_empty());
        assert!(!range.contains(TextSize::from(9)));
    }

    #[test]
    fn test_contains_is_half_open() {
        let range = TextRange::of(10, 10);
        assert!(!range.contains(TextSize::from(9)));
        assert!(range.contains(TextSize::from(10)));
        assert!(range.contains(TextSize::from(19)));
        assert!(!range.contains(TextSize::from(20)));
    }

    #[test]
    fn test_slice() {
        let text = "let x = 42;";
        assert_eq!(TextRange::of(8, 2).slice(text), Some("42"));
        assert_eq!(TextRange::of(8, 20).slice(text), None);
    }

    #[test]
    fn test_from_usize_saturates() {
        assert_eq!(TextSize::from_usize(usize::MAX).into(), u32::MAX);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", TextRange::of(10, 10)), "10..20");
    }
}
