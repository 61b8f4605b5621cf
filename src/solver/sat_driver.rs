/*!
The SAT engine driver.

The driver sits between formulas and the [CDCL engine](crate::sat): it CNF-izes, abstracts, and loads clauses, keeps the variable maps in both directions, and owns the [theory solver](crate::solver::theory) for the life of the solve so every non-learned literal grows its LP row at addition time.

# Main-active literals

A satisfiable engine result is pruned before it reaches the theory:

1. Start from the partial dereference of the model --- or the full dereference, permanently, once any `pop` has ever been issued.
2. Drop every literal which is not the *sole* satisfier of at least one main (non-learned) clause containing it.

Step 2 works off a flat copy of the main clauses and a literal-to-clause-offset lookup; learned clauses live in a separate record and never hold a literal in the model.
The surviving literals either enable an LP row (theory proxies), enter the Boolean model (user Booleans), or are skipped (CNF auxiliaries).

# Scopes

`push`/`pop` fail with [UnsupportedScope](crate::types::err::ScopeError::UnsupportedScope): the engine cannot retract clauses while the LP state is incremental.
The full-dereference downgrade is kept wired all the same, against a future engine which can.
*/

use std::collections::{BTreeSet, HashMap, HashSet};

use crate::{
    config::Config,
    misc::log::targets,
    sat::{CdclEngine, SatLiteral, SatResult, SatVariable},
    solver::{abstractor::PredicateAbstractor, cnfizer::Cnfizer, theory::TheorySolver},
    symbolic::{to_prefix_formula, Formula, FormulaKind, Literal, LiteralSet, Variable},
    types::err::{ErrorKind, ScopeError, TheoryError},
};

/// A candidate model: the user Booleans and the theory literals surviving the required-literal pass.
#[derive(Clone, Debug, Default)]
pub struct CandidateModel {
    pub boolean: Vec<Literal>,
    pub theory: Vec<Literal>,
}

/// The driver around the CDCL engine.
pub struct SatDriver {
    engine: CdclEngine,
    cnfizer: Cnfizer,
    abstractor: PredicateAbstractor,
    theory: Box<dyn TheorySolver>,

    to_sat: HashMap<usize, SatVariable>,
    to_sym: HashMap<SatVariable, Variable>,

    /// Ids of the Tseitin auxiliaries, distinguished from user Booleans at model extraction.
    cnf_variables: HashSet<usize>,

    /// A flat, zero-terminated copy of every main clause.
    main_clauses: Vec<SatLiteral>,

    /// Literal → start offsets of the main clauses containing it.
    main_clause_lookup: HashMap<SatLiteral, BTreeSet<usize>>,

    /// Literals appearing in learned clauses.
    learned_literals: HashSet<SatLiteral>,

    current_clause_start: usize,
    pop_used: bool,
}

impl SatDriver {
    pub fn new(config: &Config, theory: Box<dyn TheorySolver>) -> Self {
        let mut engine = CdclEngine::new();
        engine.set_seed(config.random_seed);
        engine.set_default_phase(config.sat_default_phase);
        if config.random_seed != 0 {
            log::debug!(target: targets::SAT, "Seeded engine with {}", config.random_seed);
        }

        SatDriver {
            engine,
            cnfizer: Cnfizer::new(),
            abstractor: PredicateAbstractor::new(),
            theory,
            to_sat: HashMap::new(),
            to_sym: HashMap::new(),
            cnf_variables: HashSet::new(),
            main_clauses: Vec::new(),
            main_clause_lookup: HashMap::new(),
            learned_literals: HashSet::new(),
            current_clause_start: 0,
            pop_used: false,
        }
    }

    /// The theory solver the driver owns.
    pub fn theory(&self) -> &dyn TheorySolver {
        self.theory.as_ref()
    }

    pub fn theory_mut(&mut self) -> &mut dyn TheorySolver {
        self.theory.as_mut()
    }

    /// The abstraction map built so far.
    pub fn abstractor(&self) -> &PredicateAbstractor {
        &self.abstractor
    }

    /// CNF-izes `f`, abstracts the clauses, and adds them.
    pub fn add_formula(&mut self, f: &Formula) -> Result<(), ErrorKind> {
        log::debug!(target: targets::SAT, "add_formula({})", to_prefix_formula(f));
        let clauses = self.cnfizer.convert(f);
        for auxiliary in self.cnfizer.variables() {
            self.cnf_variables.insert(auxiliary.id());
        }
        let abstracted: Vec<Formula> = clauses
            .iter()
            .map(|clause| self.abstractor.convert(clause))
            .collect();
        self.add_clauses(&abstracted)
    }

    pub fn add_clauses(&mut self, clauses: &[Formula]) -> Result<(), ErrorKind> {
        for clause in clauses {
            self.add_clause(clause)?;
        }
        Ok(())
    }

    /// Adds one clause, introducing SAT variables and LP rows for its literals.
    pub fn add_clause(&mut self, clause: &Formula) -> Result<(), ErrorKind> {
        if matches!(clause.kind(), FormulaKind::True) {
            return Ok(());
        }
        if matches!(clause.kind(), FormulaKind::False) {
            // The empty clause: the formula set is unsatisfiable outright.
            self.engine.add_clause(Vec::new());
            return Ok(());
        }
        for variable in clause.free_variables() {
            self.make_sat_var(&variable);
        }
        self.do_add_clause(clause)
    }

    /// Negates each literal and asserts their disjunction as a learned clause. No LP rows are created.
    pub fn add_learned_clause(&mut self, literals: &LiteralSet) {
        let mut buffer = Vec::with_capacity(literals.len());
        for (variable, polarity) in literals {
            self.make_sat_var(variable);
            let encoded = self.encode(variable, !polarity);
            self.learned_literals.insert(encoded);
            buffer.push(encoded);
        }
        log::debug!(target: targets::SAT, "Learned clause over {} literals", buffer.len());
        self.engine.add_clause(buffer);
    }

    /// One round of the engine, pruned to main-active literals, with LP rows enabled to match.
    ///
    /// `None` means unsatisfiable.
    pub fn check_sat(&mut self) -> Result<Option<CandidateModel>, ErrorKind> {
        log::debug!(
            target: targets::SAT,
            "check_sat(#vars = {}, #main-lits = {}, #learned-lits = {})",
            self.engine.variable_count(),
            self.main_clause_lookup.len(),
            self.learned_literals.len(),
        );

        match self.engine.solve() {
            SatResult::Unsatisfiable => Ok(None),

            SatResult::Satisfiable => {
                let literals = self.main_active_literals();

                self.theory.reset_linear_problem();
                let mut model = CandidateModel::default();
                for literal in literals {
                    let sat_variable = literal.unsigned_abs();
                    let Some(variable) = self.to_sym.get(&sat_variable).cloned() else {
                        continue;
                    };
                    let polarity = literal > 0;

                    if self.abstractor.var_to_formula_map().contains_key(&variable) {
                        log::trace!(target: targets::SAT, "Theory literal {}{variable}", if polarity { "" } else { "¬" });
                        self.theory.enable_linear_literal(&variable, polarity);
                        model.theory.push((variable, polarity));
                    } else if !self.cnf_variables.contains(&variable.id()) {
                        log::trace!(target: targets::SAT, "Boolean literal {}{variable}", if polarity { "" } else { "¬" });
                        model.boolean.push((variable, polarity));
                    }
                }
                Ok(Some(model))
            }
        }
    }

    /// Fails: the engine does not support scoped clause retraction alongside incremental LP state.
    pub fn push(&mut self) -> Result<(), ErrorKind> {
        Err(ScopeError::UnsupportedScope.into())
    }

    /// Fails; were scopes supported, any pop would permanently downgrade model extraction to full dereference.
    pub fn pop(&mut self) -> Result<(), ErrorKind> {
        self.pop_used = true;
        Err(ScopeError::UnsupportedScope.into())
    }

    /// Collects active literals, removing those required only by learned clauses.
    fn main_active_literals(&self) -> BTreeSet<SatLiteral> {
        let partial = if self.pop_used {
            None
        } else {
            Some(self.engine.partial_values())
        };

        let mut literals = BTreeSet::new();
        for variable in 1..=self.engine.variable_count() {
            let value = match &partial {
                Some(values) => values[variable as usize],
                None => self.engine.value(variable),
            };
            if let Some(value) = value {
                let literal = variable as SatLiteral;
                literals.insert(if value { literal } else { -literal });
            }
        }

        // Keep a literal only while some main clause has it as sole satisfier.
        let snapshot: Vec<SatLiteral> = literals.iter().copied().collect();
        for literal in snapshot {
            let required = match self.main_clause_lookup.get(&literal) {
                None => false,
                Some(offsets) => offsets.iter().any(|&start| {
                    let mut active = 0;
                    for &member in self.main_clauses[start..]
                        .iter()
                        .take_while(|&&member| member != 0)
                    {
                        if literals.contains(&member) {
                            active += 1;
                        }
                    }
                    debug_assert!(active > 0);
                    active == 1
                }),
            };
            if !required {
                literals.remove(&literal);
            }
        }
        literals
    }

    fn encode(&self, variable: &Variable, polarity: bool) -> SatLiteral {
        let sat_variable = self.to_sat[&variable.id()] as SatLiteral;
        if polarity {
            sat_variable
        } else {
            -sat_variable
        }
    }

    fn make_sat_var(&mut self, variable: &Variable) {
        if self.to_sat.contains_key(&variable.id()) {
            return;
        }
        let sat_variable = self.engine.fresh_variable();
        self.to_sat.insert(variable.id(), sat_variable);
        self.to_sym.insert(sat_variable, variable.clone());
        log::trace!(target: targets::SAT, "{variable} ↦ {sat_variable}");
    }

    fn do_add_clause(&mut self, clause: &Formula) -> Result<(), ErrorKind> {
        self.current_clause_start = self.main_clauses.len();
        let mut buffer = Vec::new();

        match clause.kind() {
            FormulaKind::Disjunction(operands) => {
                for operand in operands {
                    self.add_literal(operand, &mut buffer)?;
                }
            }
            _ => self.add_literal(clause, &mut buffer)?,
        }

        self.engine.add_clause(buffer);
        self.main_clauses.push(0);
        Ok(())
    }

    fn add_literal(&mut self, literal: &Formula, buffer: &mut Vec<SatLiteral>) -> Result<(), ErrorKind> {
        let (variable, polarity) = match literal.kind() {
            FormulaKind::Variable(variable) => (variable.clone(), true),
            FormulaKind::Negation(inner) => match inner.to_variable() {
                Some(variable) => (variable.clone(), false),
                None => {
                    return Err(
                        TheoryError::UnsupportedExpression(to_prefix_formula(literal)).into(),
                    )
                }
            },
            _ => {
                return Err(TheoryError::UnsupportedExpression(to_prefix_formula(literal)).into())
            }
        };

        let encoded = self.encode(&variable, polarity);
        buffer.push(encoded);
        self.main_clauses.push(encoded);
        self.main_clause_lookup
            .entry(encoded)
            .or_default()
            .insert(self.current_clause_start);

        self.theory
            .add_linear_literal(&self.abstractor, &variable, polarity)
    }
}
