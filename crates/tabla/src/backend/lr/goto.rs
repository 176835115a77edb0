//! GOTO table compression.
//!
//! Each non-terminal column gets a default: its most frequent target. A state
//! stores only the contiguous range of columns where it deviates from the
//! defaults; lookups outside that range fall back to the default.

use hashbrown::HashMap;

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
struct Exceptions {
    first: u32,
    len: u32,
    offset: u32,
}

/// GOTO table as per-column defaults plus per-state exceptions
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub struct GotoTable {
    defaults: Vec<Option<u32>>,
    rows: Vec<Exceptions>,
    values: Vec<Option<u32>>,
}

impl GotoTable {
    /// Compress `rows[state][non_terminal]`.
    #[must_use]
    pub fn compress(rows: &[Vec<Option<u32>>], non_terminals: usize) -> Self {
        let defaults: Vec<Option<u32>> = (0..non_terminals)
            .map(|column| {
                let mut counts: HashMap<u32, usize, ahash::RandomState> = HashMap::default();
                for target in rows.iter().filter_map(|row| row.get(column).copied().flatten()) {
                    *counts.entry(target).or_default() += 1;
                }
                counts
                    .into_iter()
                    .max_by_key(|&(target, count)| (count, std::cmp::Reverse(target)))
                    .map(|(target, _)| target)
            })
            .collect();

        let mut values = Vec::new();
        let table_rows = rows
            .iter()
            .map(|row| {
                let deviates = |column: usize| {
                    row.get(column)
                        .copied()
                        .flatten()
                        .is_some_and(|target| Some(target) != defaults[column])
                };
                let Some(first) = (0..non_terminals).find(|&c| deviates(c)) else {
                    return Exceptions::default();
                };
                let last = (0..non_terminals).rev().find(|&c| deviates(c)).unwrap_or(first);
                let offset = values.len() as u32;
                values.extend((first..=last).map(|column| {
                    row.get(column).copied().flatten().or(defaults[column])
                }));
                Exceptions {
                    first: first as u32,
                    len: (last - first + 1) as u32,
                    offset,
                }
            })
            .collect();

        Self {
            defaults,
            rows: table_rows,
            values,
        }
    }

    /// Target of `non_terminal` from `state`.
    #[must_use]
    pub fn get(&self, state: usize, non_terminal: usize) -> Option<u32> {
        if let Some(row) = self.rows.get(state) {
            let first = row.first as usize;
            if non_terminal >= first && non_terminal < first + row.len as usize {
                return self
                    .values
                    .get(row.offset as usize + non_terminal - first)
                    .copied()
                    .flatten();
            }
        }
        self.defaults.get(non_terminal).copied().flatten()
    }

    /// Number of stored exception cells.
    #[must_use]
    pub fn exception_count(&self) -> usize {
        self.values.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defined_entries_survive() {
        let rows = vec![
            vec![Some(1), Some(2), Some(3)],
            vec![None, None, None],
            vec![Some(4), Some(2), None],
            vec![Some(1), None, Some(3)],
            vec![None, Some(5), Some(3)],
        ];
        let table = GotoTable::compress(&rows, 3);
        for (state, row) in rows.iter().enumerate() {
            for (column, &target) in row.iter().enumerate() {
                if target.is_some() {
                    assert_eq!(table.get(state, column), target, "state {state} column {column}");
                }
            }
        }
        assert!(table.exception_count() < 15);
    }

    #[test]
    fn test_uniform_columns_need_no_exceptions() {
        let rows = vec![vec![Some(7), None], vec![Some(7), Some(2)], vec![None, Some(2)]];
        let table = GotoTable::compress(&rows, 2);
        assert_eq!(table.exception_count(), 0);
        assert_eq!(table.get(0, 0), Some(7));
        assert_eq!(table.get(2, 1), Some(2));
    }
}
