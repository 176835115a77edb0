//! LR(1) parsing table construction.
//!
//! The grammar is augmented with `$accept -> start`, the item-set collection
//! is built from the start item `[$accept -> . start, $end]`, and the tables
//! are filled from it:
//!
//! - a transition on a terminal becomes a shift
//! - a complete item becomes a reduce on each of its lookaheads
//! - the complete start item becomes accept on `$end`
//! - a transition on a non-terminal becomes a goto
//!
//! With [`LrConfig::use_lalr`] states are identified by their item cores and
//! lookaheads are merged (LALR(1)); otherwise lookaheads are part of the state
//! identity (canonical LR(1)). Shift/reduce collisions are settled by
//! precedence where both sides have one; every other collision is an error.

use super::action::{Action, ActionTable};
use super::config::LrConfig;
use super::goto::GotoTable;
use super::item::{ItemCore, ItemSet, LrItem, TerminalSet};
use crate::error::GrammarError;
use crate::grammar::{
    Associativity, Grammar, NonTerminalId, ProductionId, Symbol, TerminalId,
};
use compact_str::CompactString;
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::collections::VecDeque;
use tracing::debug;

/// What a reduce action does to the stacks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReductionRule {
    pub production: ProductionId,
    pub result: NonTerminalId,
    /// Number of symbols popped
    pub pop_count: usize,
}

/// Finished ACTION and GOTO tables with their reduction rules
#[derive(Debug, Clone)]
pub struct LrParsingTable {
    pub action: ActionTable,
    pub goto: GotoTable,
    /// Indexed by the operand of [`Action::Reduce`]
    pub rules: Vec<ReductionRule>,
    pub state_count: usize,
}

impl LrParsingTable {
    /// Build the tables for `grammar`.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::ShiftReduceConflict`] for a shift/reduce
    /// collision precedence cannot settle and
    /// [`GrammarError::ReduceReduceConflict`] when two productions reduce on
    /// the same lookahead.
    pub fn build<T>(grammar: &Grammar<T>, config: &LrConfig) -> Result<Self, GrammarError> {
        let mut automaton = Automaton::new(grammar);
        automaton.compute_first_sets();
        automaton.build_collection(config.use_lalr);
        let table = automaton.fill()?;
        debug!(
            states = table.state_count,
            rules = table.rules.len(),
            action_cells = table.action.stored_cells(),
            goto_exceptions = table.goto.exception_count(),
            lalr = config.use_lalr,
            "built LR tables"
        );
        Ok(table)
    }
}

/// A production of the augmented grammar; `result` is `None` for `$accept`
struct LrProduction {
    result: Option<NonTerminalId>,
    symbols: SmallVec<[Symbol; 4]>,
}

struct LrState {
    kernel: ItemSet,
    items: ItemSet,
    transitions: Vec<(Symbol, usize)>,
}

#[derive(PartialEq, Eq, Hash)]
enum StateKey {
    Cores(Vec<ItemCore>),
    Items(Vec<LrItem>),
}

#[derive(Clone, Copy)]
enum Cell {
    Empty,
    Set(Action),
    /// Left empty on purpose by a non-associative operator; holds the
    /// reduction rule that was refused
    Blocked(u32),
}

enum Resolution {
    Shift,
    Reduce,
    Error,
}

struct Automaton<'g, T> {
    grammar: &'g Grammar<T>,
    productions: Vec<LrProduction>,
    /// Production indices per non-terminal
    by_result: Vec<Vec<usize>>,
    nullable: Vec<bool>,
    first: Vec<TerminalSet>,
    states: Vec<LrState>,
    terminals: usize,
}

impl<'g, T> Automaton<'g, T> {
    fn new(grammar: &'g Grammar<T>) -> Self {
        let terminals = grammar.terminal_count();
        let non_terminals = grammar.non_terminals().len();
        let mut productions: Vec<LrProduction> = grammar
            .productions()
            .iter()
            .map(|p| LrProduction {
                result: Some(p.result),
                symbols: p.symbols.clone(),
            })
            .collect();
        productions.push(LrProduction {
            result: None,
            symbols: smallvec::smallvec![Symbol::NonTerminal(grammar.start())],
        });

        let mut by_result = vec![Vec::new(); non_terminals];
        for (index, production) in productions.iter().enumerate() {
            if let Some(result) = production.result
                && let Some(list) = by_result.get_mut(result.0)
            {
                list.push(index);
            }
        }

        Self {
            grammar,
            productions,
            by_result,
            nullable: vec![false; non_terminals],
            first: vec![TerminalSet::new(terminals); non_terminals],
            states: Vec::new(),
            terminals,
        }
    }

    fn augmented(&self) -> usize {
        self.grammar.productions.len()
    }

    /// Nullable flags and FIRST sets of every non-terminal, to a fixpoint.
    fn compute_first_sets(&mut self) {
        let mut changed = true;
        while changed {
            changed = false;
            for index in 0..self.augmented() {
                let Some(result) = self.productions[index].result else {
                    continue;
                };
                let (first, nullable) = self.first_of(&self.productions[index].symbols);
                changed |= self.first[result.0].union_with(&first);
                if nullable && !self.nullable[result.0] {
                    self.nullable[result.0] = true;
                    changed = true;
                }
            }
        }
    }

    /// FIRST of a symbol sequence and whether the whole sequence is nullable.
    fn first_of(&self, symbols: &[Symbol]) -> (TerminalSet, bool) {
        let mut set = TerminalSet::new(self.terminals);
        for &symbol in symbols {
            match symbol {
                Symbol::Terminal(t) => {
                    set.insert(t.0);
                    return (set, false);
                }
                Symbol::NonTerminal(n) => {
                    set.union_with(&self.first[n.0]);
                    if !self.nullable[n.0] {
                        return (set, false);
                    }
                }
            }
        }
        (set, true)
    }

    /// Closure of `kernel`: for `[A -> α . B β, L]` add `[B -> . γ, FIRST(β L)]`
    /// until nothing changes.
    fn closure(&self, kernel: &ItemSet) -> ItemSet {
        let mut set = kernel.clone();
        let mut worklist: Vec<usize> = (0..set.len()).collect();
        while let Some(index) = worklist.pop() {
            let item = set.items()[index].clone();
            let production = &self.productions[item.core.production];
            let Some(&Symbol::NonTerminal(next)) = production.symbols.get(item.core.dot) else {
                continue;
            };
            let (mut lookahead, nullable) = self.first_of(&production.symbols[item.core.dot + 1..]);
            if nullable {
                lookahead.union_with(&item.lookahead);
            }
            for &candidate in &self.by_result[next.0] {
                let core = ItemCore::new(candidate, 0);
                if set.insert(core, &lookahead)
                    && let Some(position) = set.position(core)
                {
                    worklist.push(position);
                }
            }
        }
        set
    }

    /// Kernels reachable from `items`, one per symbol after a dot, in order of
    /// first appearance.
    fn compute_transitions(&self, items: &ItemSet) -> Vec<(Symbol, ItemSet)> {
        let mut transitions: Vec<(Symbol, ItemSet)> = Vec::new();
        for item in items.items() {
            let Some(&symbol) = self.productions[item.core.production]
                .symbols
                .get(item.core.dot)
            else {
                continue;
            };
            let slot = match transitions.iter().position(|(s, _)| *s == symbol) {
                Some(slot) => slot,
                None => {
                    transitions.push((symbol, ItemSet::new()));
                    transitions.len() - 1
                }
            };
            transitions[slot].1.insert(item.core.advance(), &item.lookahead);
        }
        transitions
    }

    fn key(kernel: &ItemSet, lalr: bool) -> StateKey {
        if lalr {
            StateKey::Cores(kernel.core_key())
        } else {
            StateKey::Items(kernel.full_key())
        }
    }

    /// The item-set collection. Under LALR a kernel whose cores match an
    /// existing state merges its lookaheads into it; a state whose
    /// lookaheads grew is processed again so the growth reaches its
    /// successors.
    fn build_collection(&mut self, lalr: bool) {
        let mut initial = ItemSet::new();
        let mut end = TerminalSet::new(self.terminals);
        end.insert(TerminalId::END_OF_INPUT.0);
        initial.insert(ItemCore::new(self.augmented(), 0), &end);

        let mut state_map: HashMap<StateKey, usize, ahash::RandomState> = HashMap::default();
        state_map.insert(Self::key(&initial, lalr), 0);
        let items = self.closure(&initial);
        self.states.push(LrState {
            kernel: initial,
            items,
            transitions: Vec::new(),
        });

        let mut worklist = VecDeque::from([0]);
        let mut queued = vec![true];
        while let Some(state) = worklist.pop_front() {
            queued[state] = false;
            for (symbol, kernel) in self.compute_transitions(&self.states[state].items) {
                let key = Self::key(&kernel, lalr);
                let target = if let Some(&existing) = state_map.get(&key) {
                    let mut grew = false;
                    for item in kernel.items() {
                        grew |= self.states[existing].kernel.insert(item.core, &item.lookahead);
                    }
                    if grew {
                        let items = self.closure(&self.states[existing].kernel);
                        self.states[existing].items = items;
                        if !queued[existing] {
                            queued[existing] = true;
                            worklist.push_back(existing);
                        }
                    }
                    existing
                } else {
                    let id = self.states.len();
                    state_map.insert(key, id);
                    let items = self.closure(&kernel);
                    self.states.push(LrState {
                        kernel,
                        items,
                        transitions: Vec::new(),
                    });
                    queued.push(true);
                    worklist.push_back(id);
                    id
                };

                let transitions = &mut self.states[state].transitions;
                match transitions.iter_mut().find(|(s, _)| *s == symbol) {
                    Some(entry) => entry.1 = target,
                    None => transitions.push((symbol, target)),
                }
            }
        }
    }

    fn fill(&self) -> Result<LrParsingTable, GrammarError> {
        let non_terminals = self.grammar.non_terminals().len();
        let mut rules: Vec<ReductionRule> = Vec::new();
        let mut rule_of: HashMap<usize, u32, ahash::RandomState> = HashMap::default();
        let mut action_rows = Vec::with_capacity(self.states.len());
        let mut goto_rows = Vec::with_capacity(self.states.len());

        for (index, state) in self.states.iter().enumerate() {
            let mut cells = vec![Cell::Empty; self.terminals];
            let mut gotos = vec![None; non_terminals];

            for &(symbol, target) in &state.transitions {
                match symbol {
                    Symbol::Terminal(t) => {
                        self.insert(&mut cells, &rules, index, t.0, Action::Shift(target as u32))?;
                    }
                    Symbol::NonTerminal(n) => gotos[n.0] = Some(target as u32),
                }
            }

            for item in state.items.items() {
                let production = &self.productions[item.core.production];
                if item.core.dot < production.symbols.len() {
                    continue;
                }
                let Some(result) = production.result else {
                    self.insert(
                        &mut cells,
                        &rules,
                        index,
                        TerminalId::END_OF_INPUT.0,
                        Action::Accept,
                    )?;
                    continue;
                };
                let rule = *rule_of.entry(item.core.production).or_insert_with(|| {
                    rules.push(ReductionRule {
                        production: ProductionId(item.core.production),
                        result,
                        pop_count: production.symbols.len(),
                    });
                    (rules.len() - 1) as u32
                });
                for terminal in item.lookahead.iter() {
                    self.insert(&mut cells, &rules, index, terminal, Action::Reduce(rule))?;
                }
            }

            action_rows.push(
                cells
                    .into_iter()
                    .map(|cell| match cell {
                        Cell::Set(action) => action,
                        Cell::Empty | Cell::Blocked(_) => Action::Error,
                    })
                    .collect::<Vec<_>>(),
            );
            goto_rows.push(gotos);
        }

        Ok(LrParsingTable {
            action: ActionTable::from_rows(&action_rows, self.terminals),
            goto: GotoTable::compress(&goto_rows, non_terminals),
            rules,
            state_count: self.states.len(),
        })
    }

    /// Write `action` into `cells[terminal]`, settling any collision.
    fn insert(
        &self,
        cells: &mut [Cell],
        rules: &[ReductionRule],
        state: usize,
        terminal: usize,
        action: Action,
    ) -> Result<(), GrammarError> {
        let resolved = match (cells[terminal], action) {
            (Cell::Empty, new) => Cell::Set(new),
            (Cell::Blocked(blocked), Action::Reduce(rule)) if rule == blocked => {
                Cell::Blocked(blocked)
            }
            (Cell::Blocked(blocked), new) => {
                debug!(state, terminal, "action collides with a non-associative error cell");
                return Err(self.reduce_reduce_conflict(
                    state,
                    terminal,
                    Action::Reduce(blocked),
                    new,
                    rules,
                ));
            }
            (Cell::Set(old), new) if old == new => Cell::Set(old),
            (Cell::Set(Action::Shift(target)), Action::Reduce(rule))
            | (Cell::Set(Action::Reduce(rule)), Action::Shift(target)) => {
                let production = rules[rule as usize].production;
                match self.resolve_shift_reduce_conflict(terminal, production) {
                    Some(Resolution::Shift) => Cell::Set(Action::Shift(target)),
                    Some(Resolution::Reduce) => Cell::Set(Action::Reduce(rule)),
                    Some(Resolution::Error) => Cell::Blocked(rule),
                    None => {
                        return Err(GrammarError::ShiftReduceConflict {
                            state,
                            shift_symbol: self.grammar.terminal_name(TerminalId(terminal)).into(),
                            reduce_symbol: self
                                .grammar
                                .non_terminal_name(rules[rule as usize].result)
                                .into(),
                            production: self.grammar.display_production(production),
                        });
                    }
                }
            }
            (Cell::Set(old), new) => {
                return Err(self.reduce_reduce_conflict(state, terminal, old, new, rules));
            }
        };
        cells[terminal] = resolved;
        Ok(())
    }

    fn reduce_reduce_conflict(
        &self,
        state: usize,
        terminal: usize,
        old: Action,
        new: Action,
        rules: &[ReductionRule],
    ) -> GrammarError {
        let mut names = [self.describe(old, rules), self.describe(new, rules)];
        names.sort();
        let [first, second] = names;
        GrammarError::ReduceReduceConflict {
            state,
            lookahead: self.grammar.terminal_name(TerminalId(terminal)).into(),
            first,
            second,
        }
    }

    /// Settle shift/reduce by precedence, if both sides have one.
    fn resolve_shift_reduce_conflict(
        &self,
        terminal: usize,
        production: ProductionId,
    ) -> Option<Resolution> {
        let shift = self.grammar.terminals().get(terminal)?.precedence?;
        let reduce = self.grammar.productions().get(production.0)?.precedence?;
        Some(match reduce.level.cmp(&shift.level) {
            Ordering::Greater => Resolution::Reduce,
            Ordering::Less => Resolution::Shift,
            Ordering::Equal => match shift.associativity {
                Associativity::Left => Resolution::Reduce,
                Associativity::Right => Resolution::Shift,
                Associativity::NonAssoc => Resolution::Error,
            },
        })
    }

    fn describe(&self, action: Action, rules: &[ReductionRule]) -> CompactString {
        match action {
            Action::Reduce(rule) => rules
                .get(rule as usize)
                .map(|rule| self.grammar.display_production(rule.production))
                .unwrap_or_default(),
            Action::Accept => {
                let mut text = CompactString::from("$accept -> ");
                text.push_str(self.grammar.non_terminal_name(self.grammar.start()));
                text
            }
            Action::Shift(target) => compact_str::format_compact!("shift {target}"),
            Action::Error => CompactString::default(),
        }
    }
}
