//! Flattened DFA tables and row-displacement compression.
//!
//! A [`TransitionTable`] has one row per DFA state and one column per
//! elementary character range. With compression enabled the rows are packed
//! into a [`CompressedTable`]: each row is placed at the lowest displacement
//! where it agrees with every cell already stored there, and only the part
//! hanging past the current end is appended.

use super::charset::CharSet;
use super::dfa::{Dfa, LexAction, StateId};
use tracing::debug;

/// Rows packed into one vector with a displacement per row
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct CompressedTable<T> {
    cells: Vec<T>,
    displacement: Vec<u32>,
    width: usize,
}

impl<T: Copy + Eq> CompressedTable<T> {
    /// Pack `rows`, each exactly `width` cells long.
    ///
    /// A row fits at displacement `d` when every one of its cells that lands
    /// inside the current table equals the stored cell; cells past the end are
    /// free. Empty cells take part in the comparison, so a lookup never reads a
    /// neighbour's value.
    #[must_use]
    pub fn pack<'a>(rows: impl IntoIterator<Item = &'a [T]>, width: usize) -> Self
    where
        T: 'a,
    {
        let mut cells: Vec<T> = Vec::new();
        let mut displacement: Vec<u32> = Vec::new();
        for row in rows {
            debug_assert_eq!(row.len(), width);
            let offset = (0..=cells.len())
                .find(|&offset| Self::fits(&cells, row, offset))
                .unwrap_or(cells.len());
            let overlap = cells.len() - offset;
            if overlap < row.len() {
                cells.extend_from_slice(&row[overlap..]);
            }
            displacement.push(offset as u32);
        }
        Self {
            cells,
            displacement,
            width,
        }
    }

    fn fits(cells: &[T], row: &[T], offset: usize) -> bool {
        cells[offset..]
            .iter()
            .zip(row)
            .all(|(stored, cell)| stored == cell)
    }

    /// Cell at `(row, column)`, `None` outside the table.
    #[must_use]
    pub fn get(&self, row: usize, column: usize) -> Option<T> {
        if column >= self.width {
            return None;
        }
        let base = *self.displacement.get(row)? as usize;
        self.cells.get(base + column).copied()
    }

    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn row_count(&self) -> usize {
        self.displacement.len()
    }

    /// Number of stored cells.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Cell storage behind a [`TransitionTable`]
#[derive(Debug, Clone, PartialEq, Eq)]
enum Cells {
    Rows(Vec<Vec<Option<StateId>>>),
    Packed(CompressedTable<Option<StateId>>),
}

/// Transition function of a DFA as `table[state][column]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionTable {
    /// Elementary character ranges, one per column
    columns: CharSet,
    cells: Cells,
    actions: Vec<LexAction>,
}

impl TransitionTable {
    /// Flatten `dfa`, packing the rows when `compress` is set.
    #[must_use]
    pub fn build(dfa: &Dfa, compress: bool) -> Self {
        let columns = CharSet::partition(dfa.labels());
        let rows: Vec<Vec<Option<StateId>>> = dfa
            .states()
            .iter()
            .map(|state| {
                columns
                    .ranges()
                    .iter()
                    .map(|range| state.find_transition(range.from()))
                    .collect()
            })
            .collect();
        let actions = dfa.states().iter().map(|state| state.action).collect();
        let width = columns.ranges().len();
        let raw_cells = rows.len() * width;

        let cells = if compress {
            Cells::Packed(CompressedTable::pack(rows.iter().map(Vec::as_slice), width))
        } else {
            Cells::Rows(rows)
        };
        let table = Self {
            columns,
            cells,
            actions,
        };
        debug!(
            states = table.state_count(),
            columns = width,
            raw_cells,
            stored_cells = table.stored_cells(),
            "built transition table"
        );
        table
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.actions.len()
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.ranges().len()
    }

    #[must_use]
    pub const fn is_compressed(&self) -> bool {
        matches!(self.cells, Cells::Packed(_))
    }

    /// Cells held in memory.
    #[must_use]
    pub fn stored_cells(&self) -> usize {
        match &self.cells {
            Cells::Rows(rows) => rows.iter().map(Vec::len).sum(),
            Cells::Packed(packed) => packed.len(),
        }
    }

    /// Column whose range contains `c`; characters on no edge have none.
    #[must_use]
    pub fn column_of(&self, c: char) -> Option<usize> {
        self.columns.index_of(c)
    }

    #[must_use]
    pub fn cell(&self, state: StateId, column: usize) -> Option<StateId> {
        match &self.cells {
            Cells::Rows(rows) => rows.get(state.index())?.get(column).copied().flatten(),
            Cells::Packed(packed) => packed.get(state.index(), column).flatten(),
        }
    }

    #[must_use]
    pub fn next(&self, state: StateId, c: char) -> Option<StateId> {
        self.cell(state, self.column_of(c)?)
    }

    #[must_use]
    pub fn action(&self, state: StateId) -> LexAction {
        self.actions.get(state.index()).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::dfa::DfaBuilder;
    use crate::lexer::minimize::minimize;
    use crate::lexer::nfa::Nfa;

    fn dfa(patterns: &[&str]) -> Dfa {
        let nfas: Vec<Nfa> = patterns.iter().map(|p| Nfa::build(p).unwrap()).collect();
        let mut builder = DfaBuilder::new();
        for (i, nfa) in nfas.iter().enumerate() {
            builder.add(nfa, LexAction::Token { pattern: i as u32 });
        }
        minimize(&builder.build())
    }

    #[test]
    fn test_pack_overlaps_rows() {
        let rows: [&[u8]; 3] = [&[1, 2, 3], &[2, 3, 4], &[9, 9, 9]];
        let packed = CompressedTable::pack(rows, 3);
        assert_eq!(packed.len(), 7);
        for (r, row) in rows.iter().enumerate() {
            for (c, &cell) in row.iter().enumerate() {
                assert_eq!(packed.get(r, c), Some(cell));
            }
        }
        assert_eq!(packed.get(0, 3), None);
        assert_eq!(packed.get(3, 0), None);
    }

    #[test]
    fn test_empty_cells_are_never_shared() {
        // Row 1 would fit at offset 0 if only its defined cell had to agree,
        // and its empty first column would then read row 0's transition.
        let rows: [&[Option<u8>]; 2] = [&[Some(1), Some(1)], &[None, Some(1)]];
        let packed = CompressedTable::pack(rows, 2);
        assert_eq!(packed.get(1, 0), Some(None));
        assert_eq!(packed.get(1, 1), Some(Some(1)));
        assert_eq!(packed.len(), 4);
    }

    #[test]
    fn test_pack_reuses_identical_rows() {
        let rows: [&[u8]; 3] = [&[0, 1, 0], &[0, 1, 0], &[0, 1, 0]];
        let packed = CompressedTable::pack(rows, 3);
        assert_eq!(packed.len(), 3);
        assert_eq!(packed.row_count(), 3);
    }

    #[test]
    fn test_columns_are_elementary() {
        let table = TransitionTable::build(&dfa(&["if", "[a-z]+"]), false);
        assert_eq!(table.column_count(), 5);
        // a-e, f, g-h, i, j-z
        assert_eq!(table.column_of('f'), Some(1));
        assert_eq!(table.column_of('i'), Some(3));
        assert_eq!(table.column_of('A'), None);
    }

    #[test]
    fn test_compressed_matches_rows() {
        let dfa = dfa(&["if", "else", "[a-z]+", "[0-9]+", r"\+|\*"]);
        let plain = TransitionTable::build(&dfa, false);
        let packed = TransitionTable::build(&dfa, true);
        assert!(packed.is_compressed());
        assert!(packed.stored_cells() <= plain.stored_cells());
        for state in 0..plain.state_count() {
            let state = StateId(state as u32);
            assert_eq!(plain.action(state), packed.action(state));
            for column in 0..plain.column_count() {
                assert_eq!(plain.cell(state, column), packed.cell(state, column));
            }
        }
    }

    #[test]
    fn test_next_follows_dfa() {
        let dfa = dfa(&["ab"]);
        let table = TransitionTable::build(&dfa, true);
        let mid = table.next(StateId(0), 'a').unwrap();
        let end = table.next(mid, 'b').unwrap();
        assert_eq!(table.action(end), LexAction::Token { pattern: 0 });
        assert_eq!(table.next(StateId(0), 'b'), None);
        assert_eq!(table.next(StateId(0), '\0'), None);
    }
}
