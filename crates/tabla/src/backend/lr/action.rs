//! ACTION table cells and their compressed storage.

use crate::lexer::CompressedTable;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// Parser action for a (state, terminal) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum Action {
    /// Push the lookahead and go to the state
    Shift(u32),
    /// Reduce by the reduction rule
    Reduce(u32),
    /// Accept (successful parse)
    Accept,
    /// No action: a syntax error
    #[default]
    Error,
}

impl Action {
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// ACTION table, rows packed by displacement
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct ActionTable {
    table: CompressedTable<Action>,
}

impl ActionTable {
    /// Pack `rows`, one per state, each `terminals` cells wide.
    #[must_use]
    pub fn from_rows(rows: &[Vec<Action>], terminals: usize) -> Self {
        Self {
            table: CompressedTable::pack(rows.iter().map(Vec::as_slice), terminals),
        }
    }

    /// Action for `terminal` in `state`; [`Action::Error`] outside the table.
    #[must_use]
    pub fn get(&self, state: usize, terminal: usize) -> Action {
        self.table.get(state, terminal).unwrap_or_default()
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.table.row_count()
    }

    #[must_use]
    pub const fn terminal_count(&self) -> usize {
        self.table.width()
    }

    /// Terminals with a defined action in `state`, in token-number order.
    #[must_use]
    pub fn expected(&self, state: usize) -> Vec<usize> {
        (0..self.terminal_count())
            .filter(|&terminal| !self.get(state, terminal).is_error())
            .collect()
    }

    /// Cells stored after packing.
    #[must_use]
    pub fn stored_cells(&self) -> usize {
        self.table.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_matches_rows() {
        let rows = vec![
            vec![Action::Shift(1), Action::Error, Action::Error],
            vec![Action::Error, Action::Reduce(0), Action::Accept],
            vec![Action::Shift(1), Action::Error, Action::Error],
        ];
        let table = ActionTable::from_rows(&rows, 3);
        for (state, row) in rows.iter().enumerate() {
            for (terminal, &action) in row.iter().enumerate() {
                assert_eq!(table.get(state, terminal), action);
            }
        }
        assert!(table.stored_cells() < 9);
        assert_eq!(table.get(7, 0), Action::Error);
        assert_eq!(table.expected(1), vec![1, 2]);
    }
}
