//! Character ranges and sets used to label automaton edges.
//!
//! A [`CharSet`] is kept as a sorted list of non-overlapping inclusive
//! [`CharRange`]s. Ranges added with `combine` also absorb their adjacent
//! neighbours, so the canonical form of a set is unique.

use smallvec::SmallVec;
use std::fmt;

/// Inclusive range `from..=to` of scalar values, `from <= to`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CharRange {
    from: char,
    to: char,
}

impl CharRange {
    /// Returns `None` when `from > to`.
    #[must_use]
    pub const fn new(from: char, to: char) -> Option<Self> {
        if from as u32 <= to as u32 {
            Some(Self { from, to })
        } else {
            None
        }
    }

    #[must_use]
    pub const fn single(c: char) -> Self {
        Self { from: c, to: c }
    }

    #[must_use]
    pub const fn from(self) -> char {
        self.from
    }

    #[must_use]
    pub const fn to(self) -> char {
        self.to
    }

    #[must_use]
    pub const fn contains(self, c: char) -> bool {
        self.from as u32 <= c as u32 && c as u32 <= self.to as u32
    }

    #[must_use]
    pub const fn overlaps(self, other: Self) -> bool {
        self.from as u32 <= other.to as u32 && other.from as u32 <= self.to as u32
    }

    /// True if the two ranges overlap or touch end to end.
    fn touches(self, other: Self) -> bool {
        self.overlaps(other)
            || char_after(self.to) == Some(other.from)
            || char_after(other.to) == Some(self.from)
    }

    /// Number of scalar values covered.
    #[must_use]
    pub const fn width(self) -> u32 {
        let raw = self.to as u32 - self.from as u32 + 1;
        if (self.from as u32) < 0xD800 && (self.to as u32) > 0xDFFF {
            raw - 0x800
        } else {
            raw
        }
    }
}

impl fmt::Display for CharRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.from == self.to {
            write!(f, "{:?}", self.from)
        } else {
            write!(f, "{:?}-{:?}", self.from, self.to)
        }
    }
}

/// Scalar value preceding `c`, skipping the surrogate gap.
#[must_use]
pub const fn char_before(c: char) -> Option<char> {
    match c as u32 {
        0 => None,
        0xE000 => Some('\u{D7FF}'),
        n => char::from_u32(n - 1),
    }
}

/// Scalar value following `c`, skipping the surrogate gap.
#[must_use]
pub const fn char_after(c: char) -> Option<char> {
    match c as u32 {
        0xD7FF => Some('\u{E000}'),
        n if n == char::MAX as u32 => None,
        n => char::from_u32(n + 1),
    }
}

/// Sorted set of disjoint character ranges
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CharSet {
    ranges: SmallVec<[CharRange; 2]>,
}

impl CharSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn single(c: char) -> Self {
        let mut set = Self::new();
        set.add(c);
        set
    }

    #[must_use]
    pub fn from_range(from: char, to: char) -> Self {
        let mut set = Self::new();
        set.add_range(from, to, true);
        set
    }

    /// Every character except NUL, which marks end of input.
    #[must_use]
    pub fn any() -> Self {
        Self::from_range('\u{1}', char::MAX)
    }

    /// `\d`
    #[must_use]
    pub fn digit() -> Self {
        Self::from_range('0', '9')
    }

    /// `\s`
    #[must_use]
    pub fn space() -> Self {
        let mut set = Self::from_range('\t', '\r');
        set.add(' ');
        set
    }

    /// `\w`
    #[must_use]
    pub fn word() -> Self {
        let mut set = Self::from_range('a', 'z');
        set.add_range('A', 'Z', true);
        set.add_range('0', '9', true);
        set.add('_');
        set
    }

    /// Complement relative to [`CharSet::any`].
    #[must_use]
    pub fn negate(&self) -> Self {
        Self::any().except(self)
    }

    #[must_use]
    pub fn ranges(&self) -> &[CharRange] {
        &self.ranges
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn add(&mut self, c: char) {
        self.add_range(c, c, true);
    }

    /// Insert `from..=to` (swapped if reversed). With `combine`, the new range
    /// absorbs every range it overlaps or touches; without it, only overlapping
    /// ranges are absorbed and adjacent ones stay separate.
    pub fn add_range(&mut self, from: char, to: char, combine: bool) {
        let (from, to) = if from <= to { (from, to) } else { (to, from) };
        let mut merged = CharRange { from, to };
        let absorbs = |r: CharRange, m: CharRange| {
            if combine { r.touches(m) } else { r.overlaps(m) }
        };

        let first = self
            .ranges
            .partition_point(|r| r.to < merged.from && !absorbs(*r, merged));
        let mut last = first;
        while last < self.ranges.len() && absorbs(self.ranges[last], merged) {
            let r = self.ranges[last];
            merged.from = merged.from.min(r.from);
            merged.to = merged.to.max(r.to);
            last += 1;
        }
        self.ranges.drain(first..last);
        self.ranges.insert(first, merged);
    }

    pub fn union(&mut self, other: &Self) {
        for range in &other.ranges {
            self.add_range(range.from, range.to, true);
        }
    }

    /// Characters of `self` not in `other`.
    #[must_use]
    pub fn except(&self, other: &Self) -> Self {
        let mut result = Self::new();
        for &range in &self.ranges {
            Self::clip(range, &other.ranges, &mut result);
        }
        result
    }

    /// Push the parts of `range` not covered by `holes`. A hole strictly inside
    /// the range splits it and both halves are clipped further.
    fn clip(range: CharRange, holes: &[CharRange], out: &mut Self) {
        let Some((i, hole)) = holes
            .iter()
            .copied()
            .enumerate()
            .find(|(_, h)| h.overlaps(range))
        else {
            out.ranges.push(range);
            return;
        };
        let rest = &holes[i + 1..];
        if hole.from > range.from
            && let Some(end) = char_before(hole.from)
        {
            out.ranges.push(CharRange { from: range.from, to: end });
        }
        if hole.to < range.to
            && let Some(start) = char_after(hole.to)
        {
            Self::clip(CharRange { from: start, to: range.to }, rest, out);
        }
    }

    #[must_use]
    pub fn contains(&self, c: char) -> bool {
        self.index_of(c).is_some()
    }

    /// Position of the range containing `c`.
    #[must_use]
    pub fn index_of(&self, c: char) -> Option<usize> {
        let idx = self.ranges.partition_point(|r| r.to < c);
        (idx < self.ranges.len() && self.ranges[idx].contains(c)).then_some(idx)
    }

    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        while i < self.ranges.len() && j < other.ranges.len() {
            let (a, b) = (self.ranges[i], other.ranges[j]);
            if a.overlaps(b) {
                return true;
            }
            if a.to < b.to {
                i += 1;
            } else {
                j += 1;
            }
        }
        false
    }

    /// True if every character of `other` is in `self`.
    #[must_use]
    pub fn covers(&self, other: &Self) -> bool {
        other.except(self).is_empty()
    }

    /// Split both sets at each other's range boundaries. Afterwards every range
    /// of `self` is either identical to or disjoint from every range of `other`.
    pub fn distinguish(&mut self, other: &mut Self) {
        let mut cuts: Vec<char> = Vec::with_capacity(2 * (self.ranges.len() + other.ranges.len()));
        for range in self.ranges.iter().chain(other.ranges.iter()) {
            cuts.push(range.from);
            if let Some(after) = char_after(range.to) {
                cuts.push(after);
            }
        }
        cuts.sort_unstable();
        cuts.dedup();
        self.split_at(&cuts);
        other.split_at(&cuts);
    }

    /// Elementary ranges of a family of sets: disjoint ranges, each of which
    /// is wholly inside or wholly outside every input set, covering their union.
    /// Built by distinguishing each set against the ranges collected so far.
    #[must_use]
    pub fn partition<'a>(sets: impl IntoIterator<Item = &'a Self>) -> Self {
        let mut columns = Self::new();
        for set in sets {
            let mut piece = set.clone();
            columns.distinguish(&mut piece);
            for range in &piece.ranges {
                if columns.index_of(range.from).is_none() {
                    columns.add_range(range.from, range.to, false);
                }
            }
        }
        columns
    }

    /// Split ranges at each cut `b` into `[from, b-1]` and `[b, to]`.
    fn split_at(&mut self, cuts: &[char]) {
        let mut split: SmallVec<[CharRange; 2]> = SmallVec::with_capacity(self.ranges.len());
        for &range in &self.ranges {
            let mut from = range.from;
            let first = cuts.partition_point(|&b| b <= range.from);
            for &cut in cuts[first..].iter().take_while(|&&b| b <= range.to) {
                if let Some(end) = char_before(cut) {
                    split.push(CharRange { from, to: end });
                }
                from = cut;
            }
            split.push(CharRange { from, to: range.to });
        }
        self.ranges = split;
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{range}")?;
        }
        f.write_str("]")
    }
}

impl FromIterator<char> for CharSet {
    fn from_iter<I: IntoIterator<Item = char>>(iter: I) -> Self {
        let mut set = Self::new();
        for c in iter {
            set.add(c);
        }
        set
    }
}
