//! Thompson NFA construction.
//!
//! States and transitions live in flat arenas addressed by `u32` ids. The
//! builder evaluates a postfix [`RegexOp`] stream against a stack of
//! fragments; each fragment has one start and one accept state, and a
//! fragment's accept state never has outgoing edges.

use super::charset::CharSet;
use super::regex::{self, RegexOp};
use crate::error::{RegexError, RegexErrorKind};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Sorted, deduplicated set of NFA state ids
pub type StateSet = SmallVec<[u32; 8]>;

/// Edge of the NFA; a `None` label is an epsilon edge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: u32,
    pub to: u32,
    pub label: Option<CharSet>,
}

impl Transition {
    #[must_use]
    pub const fn is_epsilon(&self) -> bool {
        self.label.is_none()
    }
}

/// Nondeterministic automaton for one pattern, or several merged ones
#[derive(Debug, Clone, Default)]
pub struct Nfa {
    transitions: Vec<Transition>,
    /// Outgoing transition indices per state
    edges: Vec<SmallVec<[u32; 2]>>,
    /// For accepting states, the index into `accepts`
    accept_slot: Vec<Option<u32>>,
    /// Accepting states, one per pattern in merge order
    accepts: Vec<u32>,
    start: u32,
}

impl Nfa {
    /// Parse `pattern` and build its automaton.
    ///
    /// # Errors
    ///
    /// Returns the [`RegexError`] produced by the front end, or
    /// [`RegexErrorKind::MissingOperand`] for a malformed operation stream.
    pub fn build(pattern: &str) -> Result<Self, RegexError> {
        let ops = regex::parse(pattern)?;
        NfaBuilder::default()
            .evaluate(&ops)
            .map_err(|kind| kind.at(pattern, pattern.chars().count()))
    }

    /// Combine per-pattern automata under a fresh start state with an epsilon
    /// edge to each pattern's start, in iteration order. The accepting state of
    /// the `i`-th input becomes accept slot `i`.
    #[must_use]
    pub fn merge<'a>(parts: impl IntoIterator<Item = &'a Self>) -> Self {
        let mut merged = Self::default();
        merged.push_state();
        for part in parts {
            let offset = merged.state_count() as u32;
            for _ in 0..part.state_count() {
                merged.push_state();
            }
            for t in &part.transitions {
                merged.push_transition(t.from + offset, t.to + offset, t.label.clone());
            }
            merged.push_transition(0, part.start + offset, None);
            for &accept in &part.accepts {
                merged.mark_accepting(accept + offset);
            }
        }
        merged
    }

    fn push_state(&mut self) -> u32 {
        let id = self.edges.len() as u32;
        self.edges.push(SmallVec::new());
        self.accept_slot.push(None);
        id
    }

    fn push_transition(&mut self, from: u32, to: u32, label: Option<CharSet>) {
        let index = self.transitions.len() as u32;
        self.transitions.push(Transition { from, to, label });
        self.edges[from as usize].push(index);
    }

    fn mark_accepting(&mut self, state: u32) {
        self.accept_slot[state as usize] = Some(self.accepts.len() as u32);
        self.accepts.push(state);
    }

    #[must_use]
    pub const fn start(&self) -> u32 {
        self.start
    }

    #[must_use]
    pub fn state_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transitions.len()
    }

    #[must_use]
    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Accepting states, indexed by accept slot.
    #[must_use]
    pub fn accept_states(&self) -> &[u32] {
        &self.accepts
    }

    #[must_use]
    pub fn is_accepting(&self, state: u32) -> bool {
        self.accept_slot(state).is_some()
    }

    /// Accept slot (pattern position in merge order) of `state`.
    #[must_use]
    pub fn accept_slot(&self, state: u32) -> Option<u32> {
        self.accept_slot.get(state as usize).copied().flatten()
    }

    /// Outgoing transitions of `state`.
    pub fn outgoing(&self, state: u32) -> impl Iterator<Item = &Transition> {
        self.edges
            .get(state as usize)
            .into_iter()
            .flatten()
            .map(|&t| &self.transitions[t as usize])
    }

    /// States reachable from `seeds` through epsilon edges only, seeds included.
    #[must_use]
    pub fn epsilon_closure(&self, seeds: &[u32]) -> StateSet {
        let mut visited = vec![false; self.state_count()];
        let mut worklist: Vec<u32> = Vec::with_capacity(seeds.len());
        let mut closure = StateSet::new();
        for &seed in seeds {
            if !visited[seed as usize] {
                visited[seed as usize] = true;
                worklist.push(seed);
            }
        }
        while let Some(state) = worklist.pop() {
            closure.push(state);
            for t in self.outgoing(state).filter(|t| t.is_epsilon()) {
                if !visited[t.to as usize] {
                    visited[t.to as usize] = true;
                    worklist.push(t.to);
                }
            }
        }
        closure.sort_unstable();
        closure
    }

    /// States reached from `set` by consuming `c`, before closure.
    #[must_use]
    pub fn move_on(&self, set: &[u32], c: char) -> StateSet {
        let mut targets: StateSet = set
            .iter()
            .flat_map(|&s| self.outgoing(s))
            .filter(|t| t.label.as_ref().is_some_and(|label| label.contains(c)))
            .map(|t| t.to)
            .collect();
        targets.sort_unstable();
        targets.dedup();
        targets
    }

    /// `closure(move(set, c))`
    #[must_use]
    pub fn step(&self, set: &[u32], c: char) -> StateSet {
        let moved = self.move_on(set, c);
        if moved.is_empty() {
            return moved;
        }
        self.epsilon_closure(&moved)
    }
}

/// Sub-automaton on the evaluation stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Fragment {
    start: u32,
    accept: u32,
}

/// Stack machine building an [`Nfa`] from a postfix operation stream
#[derive(Debug, Default)]
pub struct NfaBuilder {
    arena: Nfa,
    stack: Vec<Fragment>,
}

impl NfaBuilder {
    /// Evaluate `ops` and return the automaton for the single remaining fragment.
    ///
    /// # Errors
    ///
    /// Returns [`RegexErrorKind::MissingOperand`] if an operator finds too few
    /// fragments, or the stack does not end with exactly one fragment.
    pub fn evaluate(mut self, ops: &[RegexOp]) -> Result<Nfa, RegexErrorKind> {
        for op in ops {
            let fragment = match op {
                RegexOp::Accept(set) => self.accept(set.clone()),
                RegexOp::Concat => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.concat(a, b)
                }
                RegexOp::Alternate => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.alternate(a, b)
                }
                RegexOp::Star => {
                    let x = self.pop()?;
                    self.star(x)
                }
                RegexOp::Plus => {
                    let x = self.pop()?;
                    self.plus(x)
                }
                RegexOp::Optional => {
                    let x = self.pop()?;
                    self.optional(x)
                }
                RegexOp::Repeat { min, max } => {
                    let x = self.pop()?;
                    self.repeat(x, *min, *max)
                }
            };
            self.stack.push(fragment);
        }

        let fragment = self.pop()?;
        if !self.stack.is_empty() {
            return Err(RegexErrorKind::MissingOperand);
        }
        Ok(self.finish(fragment))
    }

    fn pop(&mut self) -> Result<Fragment, RegexErrorKind> {
        self.stack.pop().ok_or(RegexErrorKind::MissingOperand)
    }

    fn state(&mut self) -> u32 {
        self.arena.push_state()
    }

    fn edge(&mut self, from: u32, to: u32, label: Option<CharSet>) {
        self.arena.push_transition(from, to, label);
    }

    fn accept(&mut self, set: CharSet) -> Fragment {
        let start = self.state();
        let accept = self.state();
        self.edge(start, accept, Some(set));
        Fragment { start, accept }
    }

    /// Edges into `a.accept` are redirected to `b.start`; `a.accept` is left
    /// unreachable and dropped when the automaton is finished.
    fn concat(&mut self, a: Fragment, b: Fragment) -> Fragment {
        for t in &mut self.arena.transitions {
            if t.to == a.accept {
                t.to = b.start;
            }
        }
        Fragment {
            start: a.start,
            accept: b.accept,
        }
    }

    fn alternate(&mut self, a: Fragment, b: Fragment) -> Fragment {
        let start = self.state();
        let accept = self.state();
        self.edge(start, a.start, None);
        self.edge(start, b.start, None);
        self.edge(a.accept, accept, None);
        self.edge(b.accept, accept, None);
        Fragment { start, accept }
    }

    fn star(&mut self, x: Fragment) -> Fragment {
        let start = self.state();
        let accept = self.state();
        self.edge(start, x.accept, None);
        self.edge(x.accept, x.start, None);
        self.edge(x.accept, accept, None);
        Fragment { start, accept }
    }

    /// No new start state, so the loop is only taken after one full pass.
    fn plus(&mut self, x: Fragment) -> Fragment {
        let accept = self.state();
        self.edge(x.accept, x.start, None);
        self.edge(x.accept, accept, None);
        Fragment {
            start: x.start,
            accept,
        }
    }

    fn optional(&mut self, x: Fragment) -> Fragment {
        self.edge(x.start, x.accept, None);
        x
    }

    /// `x{min:max}` as `max` chained copies where every copy from index `min`
    /// on may be skipped to the end. `max == None` chains `min` copies followed
    /// by a starred copy.
    fn repeat(&mut self, x: Fragment, min: u32, max: Option<u32>) -> Fragment {
        let Some(max) = max else {
            let tail = if min == 0 { x } else { self.copy(x) };
            let tail = self.star(tail);
            if min == 0 {
                return tail;
            }
            let head = self.repeat(x, min, Some(min));
            return self.concat(head, tail);
        };

        // Copies are taken before chaining rewires `x`.
        let count = max.max(min).max(1);
        let mut copies: Vec<Fragment> = Vec::with_capacity(count as usize);
        copies.push(x);
        for _ in 1..count {
            copies.push(self.copy(x));
        }
        let mut chain = x;
        for &next in &copies[1..] {
            chain = self.concat(chain, next);
        }
        for copy in copies.iter().skip(min as usize) {
            self.edge(copy.start, chain.accept, None);
        }
        chain
    }

    /// Deep copy of every state reachable from `x.start`.
    fn copy(&mut self, x: Fragment) -> Fragment {
        let mut mapping: hashbrown::HashMap<u32, u32, ahash::RandomState> =
            hashbrown::HashMap::default();
        let mut queue = VecDeque::from([x.start]);
        let first = self.state();
        mapping.insert(x.start, first);
        let mut edges: Vec<(u32, u32, Option<CharSet>)> = Vec::new();

        while let Some(old) = queue.pop_front() {
            let outgoing: Vec<Transition> = self.arena.outgoing(old).cloned().collect();
            for t in outgoing {
                let to = match mapping.get(&t.to) {
                    Some(&to) => to,
                    None => {
                        let to = self.state();
                        mapping.insert(t.to, to);
                        queue.push_back(t.to);
                        to
                    }
                };
                edges.push((mapping[&old], to, t.label));
            }
        }
        for (from, to, label) in edges {
            self.edge(from, to, label);
        }

        let accept = match mapping.get(&x.accept) {
            Some(&accept) => accept,
            None => self.state(),
        };
        Fragment {
            start: first,
            accept,
        }
    }

    /// Keep only states reachable from the fragment start, renumbered in
    /// breadth-first order, and mark the fragment accept as accepting.
    fn finish(self, fragment: Fragment) -> Nfa {
        let arena = self.arena;
        let mut renumber: Vec<Option<u32>> = vec![None; arena.state_count()];
        let mut order: Vec<u32> = Vec::with_capacity(arena.state_count());
        let mut queue = VecDeque::from([fragment.start]);
        renumber[fragment.start as usize] = Some(0);
        order.push(fragment.start);

        while let Some(old) = queue.pop_front() {
            for t in arena.outgoing(old) {
                if renumber[t.to as usize].is_none() {
                    renumber[t.to as usize] = Some(order.len() as u32);
                    order.push(t.to);
                    queue.push_back(t.to);
                }
            }
        }

        let mut nfa = Nfa::default();
        for _ in &order {
            nfa.push_state();
        }
        for &old in &order {
            for t in arena.outgoing(old) {
                if let (Some(from), Some(to)) = (renumber[old as usize], renumber[t.to as usize]) {
                    nfa.push_transition(from, to, t.label.clone());
                }
            }
        }
        if let Some(accept) = renumber[fragment.accept as usize] {
            nfa.mark_accepting(accept);
        }
        nfa.start = 0;
        nfa
    }
}
