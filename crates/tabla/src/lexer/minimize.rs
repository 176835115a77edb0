//! Moore-style DFA minimization.
//!
//! States start out partitioned by their [`LexAction`], so accepting and
//! non-accepting states, and accepting states with different actions, are
//! never merged. Each round splits blocks by the blocks their transitions
//! reach on every elementary character range, until the block count stops
//! growing. Blocks are numbered in order of their lowest member, which keeps
//! the start state at index 0.

use super::charset::CharSet;
use super::dfa::{Dfa, DfaState, LexAction, StateId};
use super::nfa::StateSet;
use hashbrown::HashMap;
use smallvec::SmallVec;
use tracing::debug;

/// Return a DFA with equivalent states merged.
#[must_use]
pub fn minimize(dfa: &Dfa) -> Dfa {
    let n = dfa.state_count();
    if n <= 1 {
        return dfa.clone();
    }

    let columns = CharSet::partition(dfa.labels());
    let moves: Vec<Vec<Option<StateId>>> = dfa
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

    let mut block = initial_blocks(dfa);
    let mut count = block_count(&block);
    loop {
        let refined = refine(&block, &moves);
        let refined_count = block_count(&refined);
        block = refined;
        if refined_count == count {
            break;
        }
        count = refined_count;
    }

    let minimized = rebuild(dfa, &block, count);
    debug!(before = n, after = minimized.state_count(), "minimized DFA");
    minimized
}

fn block_count(block: &[usize]) -> usize {
    block.iter().max().map_or(0, |max| max + 1)
}

fn initial_blocks(dfa: &Dfa) -> Vec<usize> {
    let mut ids: HashMap<LexAction, usize, ahash::RandomState> = HashMap::default();
    dfa.states()
        .iter()
        .map(|state| {
            let next = ids.len();
            *ids.entry(state.action).or_insert(next)
        })
        .collect()
}

/// Split blocks by the signature `(own block, target block per column)`.
fn refine(block: &[usize], moves: &[Vec<Option<StateId>>]) -> Vec<usize> {
    let mut ids: HashMap<(usize, SmallVec<[Option<usize>; 16]>), usize, ahash::RandomState> =
        HashMap::default();
    moves
        .iter()
        .enumerate()
        .map(|(state, row)| {
            let signature: SmallVec<[Option<usize>; 16]> = row
                .iter()
                .map(|target| target.map(|t| block[t.index()]))
                .collect();
            let next = ids.len();
            *ids.entry((block[state], signature)).or_insert(next)
        })
        .collect()
}

fn rebuild(dfa: &Dfa, block: &[usize], count: usize) -> Dfa {
    let mut states: Vec<Option<DfaState>> = vec![None; count];
    for (id, state) in dfa.states().iter().enumerate() {
        let target = block[id];
        if let Some(merged) = &mut states[target] {
            let mut nfa_states: StateSet = merged
                .nfa_states
                .iter()
                .chain(state.nfa_states.iter())
                .copied()
                .collect();
            nfa_states.sort_unstable();
            nfa_states.dedup();
            merged.nfa_states = nfa_states;
            continue;
        }
        // The lowest member of a block supplies its edges.
        let mut merged = DfaState::new(state.nfa_states.clone(), state.action);
        for (label, to) in &state.transitions {
            let to = StateId(block[to.index()] as u32);
            for &range in label.ranges() {
                merged.add_transition(range, to);
            }
        }
        states[target] = Some(merged);
    }
    Dfa::from_states(states.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::dfa::DfaBuilder;
    use crate::lexer::nfa::Nfa;

    fn build(patterns: &[&str]) -> Dfa {
        let nfas: Vec<Nfa> = patterns.iter().map(|p| Nfa::build(p).unwrap()).collect();
        let mut builder = DfaBuilder::new();
        for (i, nfa) in nfas.iter().enumerate() {
            builder.add(nfa, LexAction::Token { pattern: i as u32 });
        }
        builder.build()
    }

    #[test]
    fn test_collapses_redundant_states() {
        let dfa = build(&["(a|b)*abb"]);
        let min = minimize(&dfa);
        assert_eq!(min.state_count(), 4);
        assert!(min.state_count() <= dfa.state_count());
    }

    #[test]
    fn test_alternation_of_equivalent_branches() {
        let dfa = build(&["ab|cb"]);
        let min = minimize(&dfa);
        assert_eq!(min.state_count(), 3);
    }

    #[test]
    fn test_preserves_actions() {
        let dfa = build(&["if", "[a-z]+", "[0-9]+"]);
        let min = minimize(&dfa);
        for input in ["if", "i", "iff", "x", "42", "7", "if9", ""] {
            assert_eq!(dfa.longest_match(input), min.longest_match(input), "{input:?}");
        }
    }

    #[test]
    fn test_never_merges_different_actions() {
        let dfa = build(&["a", "b"]);
        let min = minimize(&dfa);
        assert_eq!(min.state_count(), 3);
        assert_eq!(min.longest_match("a").map(|m| m.0), Some(LexAction::Token { pattern: 0 }));
        assert_eq!(min.longest_match("b").map(|m| m.0), Some(LexAction::Token { pattern: 1 }));
    }

    #[test]
    fn test_start_state_stays_first() {
        let dfa = build(&["x*y"]);
        let min = minimize(&dfa);
        assert_eq!(min.start(), StateId(0));
        assert_eq!(min.action(min.start()), LexAction::None);
        assert_eq!(min.longest_match("xxxy").map(|m| m.1), Some(4));
    }
}
