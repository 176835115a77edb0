//! Subset construction of a deterministic automaton from per-pattern NFAs.

use super::charset::{CharRange, CharSet};
use super::nfa::{Nfa, StateSet};
use hashbrown::HashMap;
use std::collections::VecDeque;
use tracing::debug;

/// State ID in the DFA
///
/// Uses u32 which is sufficient for all practical DFA sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StateId(pub u32);

impl StateId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// What the scanner does when it stops in a state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LexAction {
    /// Not an accepting state
    #[default]
    None,
    /// Discard the lexeme and restart
    Ignore,
    /// Emit the token of the pattern registered at this index
    Token { pattern: u32 },
}

impl LexAction {
    #[must_use]
    pub const fn is_accepting(self) -> bool {
        !matches!(self, Self::None)
    }
}

/// DFA state with its labelled edges and action
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DfaState {
    /// NFA states this state stands for
    pub nfa_states: StateSet,
    /// Outgoing edges; labels are pairwise disjoint
    pub transitions: Vec<(CharSet, StateId)>,
    pub action: LexAction,
    /// `transitions` flattened and sorted by range start
    lookup: Vec<(CharRange, StateId)>,
}

impl DfaState {
    #[must_use]
    pub fn new(nfa_states: StateSet, action: LexAction) -> Self {
        Self {
            nfa_states,
            transitions: Vec::new(),
            action,
            lookup: Vec::new(),
        }
    }

    /// Add `range` to the edge towards `target`, creating the edge if needed.
    pub fn add_transition(&mut self, range: CharRange, target: StateId) {
        match self.transitions.iter_mut().find(|(_, to)| *to == target) {
            Some((label, _)) => label.add_range(range.from(), range.to(), true),
            None => {
                let mut label = CharSet::new();
                label.add_range(range.from(), range.to(), true);
                self.transitions.push((label, target));
            }
        }
    }

    /// Sort transitions for binary search lookup.
    pub fn finalize(&mut self) {
        self.lookup = self
            .transitions
            .iter()
            .flat_map(|(label, to)| label.ranges().iter().map(move |&r| (r, *to)))
            .collect();
        self.lookup.sort_by_key(|(range, _)| range.from());
    }

    /// Find transition using binary search on sorted ranges
    #[must_use]
    pub fn find_transition(&self, c: char) -> Option<StateId> {
        let idx = self.lookup.partition_point(|(range, _)| range.to() < c);
        self.lookup
            .get(idx)
            .filter(|(range, _)| range.contains(c))
            .map(|&(_, to)| to)
    }
}

/// Deterministic automaton; state 0 is the start state
#[derive(Debug, Clone, Default)]
pub struct Dfa {
    states: Vec<DfaState>,
}

impl Dfa {
    /// Assemble a DFA from finished states. `states[0]` is the start.
    #[must_use]
    pub fn from_states(mut states: Vec<DfaState>) -> Self {
        for state in &mut states {
            state.finalize();
        }
        Self { states }
    }

    #[must_use]
    pub const fn start(&self) -> StateId {
        StateId(0)
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    #[must_use]
    pub fn states(&self) -> &[DfaState] {
        &self.states
    }

    #[must_use]
    pub fn state(&self, id: StateId) -> Option<&DfaState> {
        self.states.get(id.index())
    }

    #[must_use]
    pub fn step(&self, from: StateId, c: char) -> Option<StateId> {
        self.state(from)?.find_transition(c)
    }

    #[must_use]
    pub fn action(&self, state: StateId) -> LexAction {
        self.state(state).map_or(LexAction::None, |s| s.action)
    }

    /// Every edge label in the automaton.
    pub fn labels(&self) -> impl Iterator<Item = &CharSet> {
        self.states
            .iter()
            .flat_map(|s| s.transitions.iter().map(|(label, _)| label))
    }

    /// Run the automaton over `input` and return the action of the longest
    /// accepted prefix with its length in chars.
    #[must_use]
    pub fn longest_match(&self, input: &str) -> Option<(LexAction, usize)> {
        let mut state = self.start();
        let mut best = self.action(state).is_accepting().then(|| (self.action(state), 0));
        for (i, c) in input.chars().enumerate() {
            match self.step(state, c) {
                Some(next) => state = next,
                None => break,
            }
            if self.action(state).is_accepting() {
                best = Some((self.action(state), i + 1));
            }
        }
        best
    }
}

/// Collects pattern automata in registration order and runs subset construction
#[derive(Debug, Default)]
pub struct DfaBuilder<'a> {
    patterns: Vec<(&'a Nfa, LexAction)>,
}

impl<'a> DfaBuilder<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the next pattern. Earlier registrations win ties; ignored
    /// patterns rank after every token pattern regardless of order.
    pub fn add(&mut self, nfa: &'a Nfa, action: LexAction) -> &mut Self {
        self.patterns.push((nfa, action));
        self
    }

    /// Run subset construction over the merged automaton.
    #[must_use]
    pub fn build(&self) -> Dfa {
        let (merged, slot_actions) = merge_by_priority(self.patterns.iter().copied());
        let dfa = subset_construction(&merged, &slot_actions);
        debug!(
            patterns = self.patterns.len(),
            nfa_states = merged.state_count(),
            dfa_states = dfa.state_count(),
            "built DFA"
        );
        dfa
    }
}

/// Merge pattern automata so that accept slot order is match priority:
/// token patterns in registration order, then ignored patterns in
/// registration order. Returns the merged NFA and the action of each slot.
pub fn merge_by_priority<'a>(
    patterns: impl IntoIterator<Item = (&'a Nfa, LexAction)>,
) -> (Nfa, Vec<LexAction>) {
    let (ignored, tokens): (Vec<_>, Vec<_>) = patterns
        .into_iter()
        .partition(|(_, action)| *action == LexAction::Ignore);
    let ranked: Vec<(&Nfa, LexAction)> = tokens.into_iter().chain(ignored).collect();
    let merged = Nfa::merge(ranked.iter().map(|(nfa, _)| *nfa));
    (merged, ranked.into_iter().map(|(_, action)| action).collect())
}

/// The accepting slot with the lowest index owns the state's action.
pub(crate) fn resolve_action(nfa: &Nfa, set: &[u32], slot_actions: &[LexAction]) -> LexAction {
    set.iter()
        .filter_map(|&s| nfa.accept_slot(s))
        .min()
        .and_then(|slot| slot_actions.get(slot as usize).copied())
        .unwrap_or_default()
}

/// Build a DFA from `nfa`, deduplicating states by their NFA-state sets.
/// `slot_actions[i]` is the action of the `i`-th accepting slot of `nfa`.
#[must_use]
pub fn subset_construction(nfa: &Nfa, slot_actions: &[LexAction]) -> Dfa {
    let mut states: Vec<DfaState> = Vec::new();
    let mut index: HashMap<StateSet, StateId, ahash::RandomState> = HashMap::default();
    let mut worklist: VecDeque<StateId> = VecDeque::new();

    let start_set = nfa.epsilon_closure(&[nfa.start()]);
    let start_action = resolve_action(nfa, &start_set, slot_actions);
    index.insert(start_set.clone(), StateId(0));
    states.push(DfaState::new(start_set, start_action));
    worklist.push_back(StateId(0));

    while let Some(current) = worklist.pop_front() {
        let set = states[current.index()].nfa_states.clone();
        let labels: Vec<&CharSet> = set
            .iter()
            .flat_map(|&s| nfa.outgoing(s))
            .filter_map(|t| t.label.as_ref())
            .collect();

        // Every elementary range moves to a single target set.
        for &range in CharSet::partition(labels).ranges() {
            let target_set = nfa.step(&set, range.from());
            if target_set.is_empty() {
                continue;
            }
            let target = match index.get(&target_set) {
                Some(&id) => id,
                None => {
                    let id = StateId(states.len() as u32);
                    let action = resolve_action(nfa, &target_set, slot_actions);
                    index.insert(target_set.clone(), id);
                    states.push(DfaState::new(target_set, action));
                    worklist.push_back(id);
                    id
                }
            };
            states[current.index()].add_transition(range, target);
        }
    }

    Dfa::from_states(states)
}
