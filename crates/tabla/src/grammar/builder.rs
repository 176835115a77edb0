use super::{
    Associativity, ErrorReduceFn, Grammar, NonTerminalDef, NonTerminalId, Precedence, Production,
    ProductionId, ReduceAction, ReduceFn, Symbol, TerminalDef, TerminalId, TerminalKind,
};
use crate::error::{GrammarError, SyntaxError};
use crate::lexer::LexerConfig;
use compact_str::CompactString;
use hashbrown::HashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::debug;

/// Right-hand-side symbol as written by the grammar author
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SymbolRef {
    /// Exact text; declares a literal terminal on first use
    Literal(CompactString),
    Terminal(TerminalId),
    NonTerminal(NonTerminalId),
}

impl From<&str> for SymbolRef {
    fn from(text: &str) -> Self {
        Self::Literal(text.into())
    }
}

impl From<TerminalId> for SymbolRef {
    fn from(terminal: TerminalId) -> Self {
        Self::Terminal(terminal)
    }
}

impl From<NonTerminalId> for SymbolRef {
    fn from(non_terminal: NonTerminalId) -> Self {
        Self::NonTerminal(non_terminal)
    }
}

/// Builder for [`Grammar`].
///
/// Declaration methods return handles used to write productions. Each call
/// to [`left`](Self::left), [`right`](Self::right) or
/// [`non_assoc`](Self::non_assoc) opens a new precedence level binding
/// tighter than every earlier one.
pub struct GrammarBuilder<T> {
    terminals: Vec<TerminalDef<T>>,
    literals: HashMap<CompactString, TerminalId, ahash::RandomState>,
    non_terminals: Vec<NonTerminalDef>,
    productions: Vec<Production<T>>,
    /// `%prec` overrides: production index and the terminal lending its level
    overrides: Vec<(ProductionId, TerminalId)>,
    levels: u32,
    start: Option<NonTerminalId>,
    ignore: Vec<CompactString>,
    lexer_config: LexerConfig,
}

impl<T: Default> Default for GrammarBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> GrammarBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        let reserved = |name: &str| TerminalDef {
            name: name.into(),
            kind: TerminalKind::Reserved,
            precedence: None,
        };
        Self {
            terminals: vec![reserved("$end"), reserved("error")],
            literals: HashMap::default(),
            non_terminals: Vec::new(),
            productions: Vec::new(),
            overrides: Vec::new(),
            levels: 0,
            start: None,
            ignore: Vec::new(),
            lexer_config: LexerConfig::default(),
        }
    }

    /// The end-of-input terminal.
    #[must_use]
    pub const fn end_of_input(&self) -> TerminalId {
        TerminalId::END_OF_INPUT
    }

    /// The error terminal, matched by the parser during recovery.
    #[must_use]
    pub const fn error(&self) -> TerminalId {
        TerminalId::ERROR
    }

    /// Declare a terminal scanned by `regex`, valued by `action`.
    pub fn terminal(
        &mut self,
        name: &str,
        regex: &str,
        action: impl Fn(&str) -> T + Send + Sync + 'static,
    ) -> TerminalId {
        let id = TerminalId(self.terminals.len());
        self.terminals.push(TerminalDef {
            name: name.into(),
            kind: TerminalKind::Pattern {
                regex: regex.into(),
                action: Arc::new(action),
            },
            precedence: None,
        });
        id
    }

    /// Terminal matching `text` exactly; declared once per distinct text.
    pub fn literal(&mut self, text: &str) -> TerminalId {
        if let Some(&id) = self.literals.get(text) {
            return id;
        }
        let id = TerminalId(self.terminals.len());
        self.terminals.push(TerminalDef {
            name: text.into(),
            kind: TerminalKind::Literal(text.into()),
            precedence: None,
        });
        self.literals.insert(text.into(), id);
        id
    }

    /// Pattern skipped by the lexer.
    pub fn ignore(&mut self, regex: &str) -> &mut Self {
        self.ignore.push(regex.into());
        self
    }

    pub fn non_terminal(&mut self, name: &str) -> NonTerminalId {
        let id = NonTerminalId(self.non_terminals.len());
        self.non_terminals.push(NonTerminalDef { name: name.into() });
        id
    }

    fn resolve(&mut self, symbols: impl IntoIterator<Item = SymbolRef>) -> SmallVec<[Symbol; 4]> {
        symbols
            .into_iter()
            .map(|symbol| match symbol {
                SymbolRef::Literal(text) => Symbol::Terminal(self.literal(&text)),
                SymbolRef::Terminal(t) => Symbol::Terminal(t),
                SymbolRef::NonTerminal(n) => Symbol::NonTerminal(n),
            })
            .collect()
    }

    fn push_production(
        &mut self,
        result: NonTerminalId,
        symbols: impl IntoIterator<Item = SymbolRef>,
        reduce: ReduceAction<T>,
    ) -> ProductionId {
        let symbols = self.resolve(symbols);
        let id = ProductionId(self.productions.len());
        self.productions.push(Production {
            result,
            symbols,
            reduce,
            precedence: None,
        });
        id
    }

    /// Add `result -> symbols`, reduced by `reduce` over the symbol values.
    pub fn production(
        &mut self,
        result: NonTerminalId,
        symbols: impl IntoIterator<Item = SymbolRef>,
        reduce: impl Fn(Vec<T>) -> T + Send + Sync + 'static,
    ) -> ProductionId {
        let reduce: ReduceFn<T> = Arc::new(reduce);
        self.push_production(result, symbols, ReduceAction::Normal(reduce))
    }

    /// Add a recovery production; `reduce` also receives the syntax error
    /// that started recovery.
    pub fn error_production(
        &mut self,
        result: NonTerminalId,
        symbols: impl IntoIterator<Item = SymbolRef>,
        reduce: impl Fn(&SyntaxError, Vec<T>) -> T + Send + Sync + 'static,
    ) -> ProductionId {
        let reduce: ErrorReduceFn<T> = Arc::new(reduce);
        self.push_production(result, symbols, ReduceAction::Error(reduce))
    }

    fn group(
        &mut self,
        associativity: Associativity,
        terminals: impl IntoIterator<Item = TerminalId>,
    ) -> &mut Self {
        self.levels += 1;
        let precedence = Precedence {
            level: self.levels,
            associativity,
        };
        for terminal in terminals {
            if let Some(def) = self.terminals.get_mut(terminal.0) {
                def.precedence = Some(precedence);
            }
        }
        self
    }

    /// New precedence level of left-associative operators.
    pub fn left(&mut self, terminals: impl IntoIterator<Item = TerminalId>) -> &mut Self {
        self.group(Associativity::Left, terminals)
    }

    /// New precedence level of right-associative operators.
    pub fn right(&mut self, terminals: impl IntoIterator<Item = TerminalId>) -> &mut Self {
        self.group(Associativity::Right, terminals)
    }

    /// New precedence level of operators that may not be chained.
    pub fn non_assoc(&mut self, terminals: impl IntoIterator<Item = TerminalId>) -> &mut Self {
        self.group(Associativity::NonAssoc, terminals)
    }

    /// Give `production` the precedence of `terminal` (like yacc's `%prec`).
    pub fn precedence(&mut self, production: ProductionId, terminal: TerminalId) -> &mut Self {
        self.overrides.push((production, terminal));
        self
    }

    pub fn start(&mut self, non_terminal: NonTerminalId) -> &mut Self {
        self.start = Some(non_terminal);
        self
    }

    pub fn lexer_config(&mut self, config: LexerConfig) -> &mut Self {
        self.lexer_config = config;
        self
    }

    /// Finish the grammar.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::MissingStart`] if no start symbol was set,
    /// [`GrammarError::UnknownSymbol`] for a handle this builder did not
    /// hand out, and [`GrammarError::NoProductions`] for a non-terminal
    /// without productions.
    pub fn build(mut self) -> Result<Grammar<T>, GrammarError> {
        let start = self.start.ok_or(GrammarError::MissingStart)?;
        self.check_non_terminal(start, "start symbol")?;
        for (index, production) in self.productions.iter().enumerate() {
            let context = compact_str::format_compact!("production {index}");
            self.check_non_terminal(production.result, &context)?;
            for &symbol in &production.symbols {
                match symbol {
                    Symbol::Terminal(t) if t.0 >= self.terminals.len() => {
                        return Err(GrammarError::UnknownSymbol {
                            kind: "terminal",
                            index: t.0,
                            context,
                        });
                    }
                    Symbol::Terminal(_) => {}
                    Symbol::NonTerminal(n) => self.check_non_terminal(n, &context)?,
                }
            }
        }

        for (index, def) in self.non_terminals.iter().enumerate() {
            if !self.productions.iter().any(|p| p.result.0 == index) {
                return Err(GrammarError::NoProductions {
                    non_terminal: def.name.clone(),
                });
            }
        }

        // Rightmost terminal with a precedence, unless overridden.
        for production in &mut self.productions {
            production.precedence = production.symbols.iter().rev().find_map(|s| match s {
                Symbol::Terminal(t) => self.terminals.get(t.0).and_then(|def| def.precedence),
                Symbol::NonTerminal(_) => None,
            });
        }
        for (production, terminal) in &self.overrides {
            let precedence = self.terminals.get(terminal.0).and_then(|def| def.precedence);
            if let Some(p) = self.productions.get_mut(production.0) {
                p.precedence = precedence;
            }
        }

        debug!(
            terminals = self.terminals.len(),
            non_terminals = self.non_terminals.len(),
            productions = self.productions.len(),
            "built grammar"
        );
        Ok(Grammar {
            terminals: self.terminals,
            non_terminals: self.non_terminals,
            productions: self.productions,
            start,
            ignore: self.ignore,
            lexer_config: self.lexer_config,
        })
    }
}

impl<T> GrammarBuilder<T> {
    fn check_non_terminal(&self, id: NonTerminalId, context: &str) -> Result<(), GrammarError> {
        if id.0 < self.non_terminals.len() {
            Ok(())
        } else {
            Err(GrammarError::UnknownSymbol {
                kind: "non-terminal",
                index: id.0,
                context: context.into(),
            })
        }
    }
}
