//! LR(1) items and item sets.
//!
//! An item is a production with a dot position and a set of lookahead
//! terminals. An [`ItemSet`] keeps one entry per core (production, dot) and
//! unions lookaheads when the same core is inserted again.

use hashbrown::HashMap;
use smallvec::SmallVec;

/// Set of terminal numbers as a bit vector
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TerminalSet {
    words: SmallVec<[u64; 2]>,
}

impl TerminalSet {
    /// Empty set sized for `terminals` terminals.
    #[must_use]
    pub fn new(terminals: usize) -> Self {
        Self {
            words: SmallVec::from_elem(0, terminals.div_ceil(64)),
        }
    }

    /// Add `terminal`; returns `true` if it was not already present.
    pub fn insert(&mut self, terminal: usize) -> bool {
        let (word, bit) = (terminal / 64, 1u64 << (terminal % 64));
        if word >= self.words.len() {
            self.words.resize(word + 1, 0);
        }
        let added = self.words[word] & bit == 0;
        self.words[word] |= bit;
        added
    }

    #[must_use]
    pub fn contains(&self, terminal: usize) -> bool {
        self.words
            .get(terminal / 64)
            .is_some_and(|word| word & (1u64 << (terminal % 64)) != 0)
    }

    /// Add every member of `other`; returns `true` if the set grew.
    pub fn union_with(&mut self, other: &Self) -> bool {
        if other.words.len() > self.words.len() {
            self.words.resize(other.words.len(), 0);
        }
        let mut changed = false;
        for (word, &theirs) in self.words.iter_mut().zip(&other.words) {
            let merged = *word | theirs;
            changed |= merged != *word;
            *word = merged;
        }
        changed
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|&word| word == 0)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Members in increasing order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(index, &word)| {
            (0..64)
                .filter(move |bit| word & (1u64 << bit) != 0)
                .map(move |bit| index * 64 + bit)
        })
    }
}

/// Production and dot position, without lookahead
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemCore {
    /// Index into the augmented production list
    pub production: usize,
    pub dot: usize,
}

impl ItemCore {
    #[must_use]
    pub const fn new(production: usize, dot: usize) -> Self {
        Self { production, dot }
    }

    #[must_use]
    pub const fn advance(self) -> Self {
        Self {
            production: self.production,
            dot: self.dot + 1,
        }
    }
}

/// An LR(1) item with all of its lookaheads
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LrItem {
    pub core: ItemCore,
    pub lookahead: TerminalSet,
}

/// Items deduplicated by core, in insertion order
#[derive(Debug, Clone, Default)]
pub struct ItemSet {
    items: Vec<LrItem>,
    index: HashMap<ItemCore, usize, ahash::RandomState>,
}

impl ItemSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `core` with `lookahead`, merging with an existing item of the
    /// same core. Returns `true` if the set changed.
    pub fn insert(&mut self, core: ItemCore, lookahead: &TerminalSet) -> bool {
        if let Some(&slot) = self.index.get(&core) {
            return self.items[slot].lookahead.union_with(lookahead);
        }
        self.index.insert(core, self.items.len());
        self.items.push(LrItem {
            core,
            lookahead: lookahead.clone(),
        });
        true
    }

    #[must_use]
    pub fn get(&self, core: ItemCore) -> Option<&LrItem> {
        self.index.get(&core).map(|&slot| &self.items[slot])
    }

    /// Insertion index of `core`.
    #[must_use]
    pub fn position(&self, core: ItemCore) -> Option<usize> {
        self.index.get(&core).copied()
    }

    #[must_use]
    pub fn items(&self) -> &[LrItem] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Cores in sorted order; identifies an LALR state.
    #[must_use]
    pub fn core_key(&self) -> Vec<ItemCore> {
        let mut cores: Vec<ItemCore> = self.items.iter().map(|item| item.core).collect();
        cores.sort_unstable();
        cores
    }

    /// Cores with lookaheads in sorted order; identifies a canonical LR(1) state.
    #[must_use]
    pub fn full_key(&self) -> Vec<LrItem> {
        let mut items = self.items.clone();
        items.sort_unstable_by_key(|item| item.core);
        items
    }
}
