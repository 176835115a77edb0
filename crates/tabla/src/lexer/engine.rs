//! Transition functions the scanning loop can run on.
//!
//! All engines recognise the same language with the same actions; they differ
//! in how the next state is computed. [`TabularEngine`] indexes a (possibly
//! compressed) table, [`DfaEngine`] binary-searches the edges of DFA state
//! objects, and [`NfaEngine`] simulates the merged NFA directly.

use super::builder::LexerConfig;
use super::dfa::{Dfa, DfaBuilder, LexAction, StateId, merge_by_priority, resolve_action};
use super::minimize::minimize;
use super::nfa::{Nfa, StateSet};
use super::table::TransitionTable;
use std::fmt;

/// Compiled pattern automata in registration order
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    nfas: Vec<Nfa>,
    actions: Vec<LexAction>,
}

impl PatternSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, nfa: Nfa, action: LexAction) {
        self.nfas.push(nfa);
        self.actions.push(action);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nfas.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nfas.is_empty()
    }

    /// Subset construction over every pattern, minimized when configured.
    #[must_use]
    pub fn dfa(&self, config: &LexerConfig) -> Dfa {
        let mut builder = DfaBuilder::new();
        for (nfa, action) in self.nfas.iter().zip(&self.actions) {
            builder.add(nfa, *action);
        }
        let dfa = builder.build();
        if config.minimize { minimize(&dfa) } else { dfa }
    }

    /// Patterns merged in priority order with the action of each accept slot.
    #[must_use]
    pub fn merged(&self) -> (Nfa, Vec<LexAction>) {
        merge_by_priority(self.nfas.iter().zip(self.actions.iter().copied()))
    }
}

/// Transition function driven by [`LexerRuntime`](super::LexerRuntime)
pub trait Engine: Sized + Send + Sync {
    type State: Clone + fmt::Debug;

    fn from_patterns(patterns: &PatternSet, config: &LexerConfig) -> Self;

    fn initial(&self) -> Self::State;

    /// Next state on `c`, or `None` when the scanner must stop.
    fn next(&self, state: &Self::State, c: char) -> Option<Self::State>;

    fn action(&self, state: &Self::State) -> LexAction;
}

/// Table lookup over elementary character ranges
#[derive(Debug, Clone)]
pub struct TabularEngine {
    table: TransitionTable,
}

impl TabularEngine {
    #[must_use]
    pub const fn table(&self) -> &TransitionTable {
        &self.table
    }
}

impl Engine for TabularEngine {
    type State = StateId;

    fn from_patterns(patterns: &PatternSet, config: &LexerConfig) -> Self {
        let dfa = patterns.dfa(config);
        Self {
            table: TransitionTable::build(&dfa, config.compress),
        }
    }

    fn initial(&self) -> StateId {
        StateId(0)
    }

    #[inline]
    fn next(&self, state: &StateId, c: char) -> Option<StateId> {
        self.table.next(*state, c)
    }

    fn action(&self, state: &StateId) -> LexAction {
        self.table.action(*state)
    }
}

/// Walks DFA state objects
#[derive(Debug, Clone)]
pub struct DfaEngine {
    dfa: Dfa,
}

impl DfaEngine {
    #[must_use]
    pub const fn dfa(&self) -> &Dfa {
        &self.dfa
    }
}

impl Engine for DfaEngine {
    type State = StateId;

    fn from_patterns(patterns: &PatternSet, config: &LexerConfig) -> Self {
        Self {
            dfa: patterns.dfa(config),
        }
    }

    fn initial(&self) -> StateId {
        self.dfa.start()
    }

    #[inline]
    fn next(&self, state: &StateId, c: char) -> Option<StateId> {
        self.dfa.step(*state, c)
    }

    fn action(&self, state: &StateId) -> LexAction {
        self.dfa.action(*state)
    }
}

/// Simulates the merged NFA on live state sets
#[derive(Debug, Clone)]
pub struct NfaEngine {
    nfa: Nfa,
    slot_actions: Vec<LexAction>,
    start: StateSet,
}

impl NfaEngine {
    #[must_use]
    pub const fn nfa(&self) -> &Nfa {
        &self.nfa
    }
}

impl Engine for NfaEngine {
    type State = StateSet;

    fn from_patterns(patterns: &PatternSet, _config: &LexerConfig) -> Self {
        let (nfa, slot_actions) = patterns.merged();
        let start = nfa.epsilon_closure(&[nfa.start()]);
        Self {
            nfa,
            slot_actions,
            start,
        }
    }

    fn initial(&self) -> StateSet {
        self.start.clone()
    }

    fn next(&self, state: &StateSet, c: char) -> Option<StateSet> {
        let next = self.nfa.step(state, c);
        (!next.is_empty()).then_some(next)
    }

    fn action(&self, state: &StateSet) -> LexAction {
        resolve_action(&self.nfa, state, &self.slot_actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> PatternSet {
        let mut set = PatternSet::new();
        set.push(Nfa::build(" +").unwrap(), LexAction::Ignore);
        set.push(Nfa::build("if").unwrap(), LexAction::Token { pattern: 1 });
        set.push(Nfa::build("[a-z]+").unwrap(), LexAction::Token { pattern: 2 });
        set
    }

    fn run<E: Engine>(engine: &E, input: &str) -> LexAction {
        let mut state = engine.initial();
        for c in input.chars() {
            match engine.next(&state, c) {
                Some(next) => state = next,
                None => return LexAction::None,
            }
        }
        engine.action(&state)
    }

    #[test]
    fn test_engines_agree() {
        let config = LexerConfig::default();
        let set = patterns();
        let tabular = TabularEngine::from_patterns(&set, &config);
        let dfa = DfaEngine::from_patterns(&set, &config);
        let nfa = NfaEngine::from_patterns(&set, &config);
        for input in ["if", "i", "iffy", "   ", "x1", ""] {
            let expected = run(&nfa, input);
            assert_eq!(run(&tabular, input), expected, "{input:?}");
            assert_eq!(run(&dfa, input), expected, "{input:?}");
        }
        assert_eq!(run(&nfa, "if"), LexAction::Token { pattern: 1 });
        assert_eq!(run(&nfa, "  "), LexAction::Ignore);
    }

    #[test]
    fn test_engines_share_priority_order() {
        // An ignored pattern ranks last even when registered first.
        let mut set = PatternSet::new();
        set.push(Nfa::build("if").unwrap(), LexAction::Ignore);
        set.push(Nfa::build("[a-z]+").unwrap(), LexAction::Token { pattern: 1 });
        set.push(Nfa::build("if").unwrap(), LexAction::Token { pattern: 2 });
        let config = LexerConfig::default();
        let tabular = TabularEngine::from_patterns(&set, &config);
        let dfa = DfaEngine::from_patterns(&set, &config);
        let nfa = NfaEngine::from_patterns(&set, &config);
        let identifier = LexAction::Token { pattern: 1 };
        for input in ["if", "i", "iffy"] {
            assert_eq!(run(&tabular, input), identifier, "{input:?}");
            assert_eq!(run(&dfa, input), identifier, "{input:?}");
            assert_eq!(run(&nfa, input), identifier, "{input:?}");
        }
    }

    #[test]
    fn test_nul_never_steps() {
        let config = LexerConfig::default();
        let set = patterns();
        let tabular = TabularEngine::from_patterns(&set, &config);
        assert!(tabular.next(&tabular.initial(), '\0').is_none());
        let nfa = NfaEngine::from_patterns(&set, &config);
        assert!(nfa.next(&nfa.initial(), '\0').is_none());
    }

    #[test]
    fn test_config_controls_table() {
        let set = patterns();
        let plain = TabularEngine::from_patterns(
            &set,
            &LexerConfig {
                minimize: false,
                compress: false,
            },
        );
        let packed = TabularEngine::from_patterns(&set, &LexerConfig::default());
        assert!(!plain.table().is_compressed());
        assert!(packed.table().is_compressed());
        assert!(packed.table().state_count() <= plain.table().state_count());
    }
}
