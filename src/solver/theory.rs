/*!
The theory solver: linear atoms become rows of an exact rational LP.

Every theory atom enabled by the Boolean engine maps to one row, every numeric variable to one column; row construction dereferences the proxy through the [abstractor](crate::solver::abstractor), picks a sense from the atom's operator and polarity, and populates coefficients from the canonical form of `(lhs − rhs).expand()`.

Two atom shapes never build rows, by the δ-semantics: a positive `≠` and a negative `=` hold for any δ > 0, so they are skipped outright.
Strict operators use the sense of their non-strict counterparts; the model witnesses the relaxed problem.

Rows begin disabled --- sense `G`, RHS at the negative sentinel --- and [reset_linear_problem](TheorySolver::reset_linear_problem) returns every row to that state before each check, after which [enable_linear_literal](TheorySolver::enable_linear_literal) restores the stored sense and RHS of each surviving literal.
Column bounds are synchronized from the box at each check, and a feasible LP yields a point model clamped into the box.
*/

use std::collections::HashMap;

use num_traits::{One, Zero};

use crate::{
    interval::{Endpoint, Interval, IntervalBox},
    lp::{LpBackend, LpStatus, RowSense},
    misc::log::targets,
    rational::{infty, ninfty, Rational},
    solver::{
        abstractor::PredicateAbstractor,
        filter::{filter_assertion, FilterResult},
    },
    symbolic::{
        to_prefix_expression, to_prefix_formula, Expression, ExpressionKind, Formula, FormulaKind,
        Literal, LiteralSet, Variable,
    },
    types::err::{ErrorKind, TheoryError},
};

/// The verdict of a theory check.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TheoryResult {
    /// The enabled rows are exactly satisfiable.
    Sat,

    /// The enabled rows are satisfiable up to the configured precision.
    DeltaSat,

    /// The enabled rows are jointly infeasible; an explanation is available.
    Unsat,

    /// The backend could not decide.
    Unknown,
}

/// The outcome of an objective check over one candidate.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum OptCandidate {
    /// The candidate is feasible with the given objective optimum.
    Optimal(Rational),

    /// The objective decreases without bound over the candidate.
    Unbounded,

    /// The candidate is infeasible; an explanation is available.
    Infeasible,
}

/// The theory surface the SAT driver owns.
pub trait TheorySolver {
    /// Builds the row for `(variable, polarity)`, if the atom shape calls for one.
    fn add_linear_literal(
        &mut self,
        abstractor: &PredicateAbstractor,
        variable: &Variable,
        polarity: bool,
    ) -> Result<(), ErrorKind>;

    /// Disables every row.
    fn reset_linear_problem(&mut self);

    /// Restores the stored sense and RHS of the row for `(variable, polarity)`.
    fn enable_linear_literal(&mut self, variable: &Variable, polarity: bool);

    /// Checks joint feasibility of the enabled rows within `domain`.
    fn check_sat(
        &mut self,
        domain: &IntervalBox,
        assertions: &[Literal],
    ) -> Result<TheoryResult, ErrorKind>;

    /// Minimises `objective` over the enabled rows within `domain`.
    fn check_opt(
        &mut self,
        objective: &Expression,
        domain: &IntervalBox,
        assertions: &[Literal],
    ) -> Result<OptCandidate, ErrorKind>;

    /// The model box of the latest feasible check.
    fn model(&self) -> &IntervalBox;

    /// The explanation of the latest infeasible check.
    fn explanation(&self) -> &LiteralSet;
}

/// The linear-arithmetic theory solver over an [LpBackend].
pub struct LinearTheorySolver {
    lp: Box<dyn LpBackend>,

    /// Stored ("intended") sense and RHS per row, restored on enable.
    row_senses: Vec<RowSense>,
    row_rhs: Vec<Rational>,

    to_row: HashMap<(usize, bool), usize>,
    from_row: Vec<Literal>,

    /// Every dereferenced atom by (proxy id, polarity), row or no row; drives the per-candidate bound pass.
    atoms: HashMap<(usize, bool), Formula>,

    to_col: HashMap<usize, usize>,
    from_col: Vec<Variable>,

    exhaustive: bool,
    model: IntervalBox,
    explanation: LiteralSet,
}

impl LinearTheorySolver {
    pub fn new(lp: Box<dyn LpBackend>, exhaustive: bool) -> Self {
        LinearTheorySolver {
            lp,
            row_senses: Vec::new(),
            row_rhs: Vec::new(),
            to_row: HashMap::new(),
            from_row: Vec::new(),
            atoms: HashMap::new(),
            to_col: HashMap::new(),
            from_col: Vec::new(),
            exhaustive,
            model: IntervalBox::new(),
            explanation: LiteralSet::new(),
        }
    }

    /// The number of rows created so far. Row indices are stable for the life of the solver.
    pub fn row_count(&self) -> usize {
        self.lp.get_rowcount()
    }

    /// The number of columns created so far. Column indices are stable for the life of the solver.
    pub fn column_count(&self) -> usize {
        self.lp.get_colcount()
    }

    fn add_linear_variable(&mut self, variable: &Variable) {
        if self.to_col.contains_key(&variable.id()) {
            return;
        }
        let col = self.lp.new_col(variable.name(), &ninfty(), &infty());
        debug_assert_eq!(col, self.from_col.len());
        self.to_col.insert(variable.id(), col);
        self.from_col.push(variable.clone());
        log::debug!(target: targets::THEORY, "Column {col} for {variable}");
    }

    fn set_coefficient(
        &mut self,
        row: usize,
        variable: &Variable,
        value: &Rational,
    ) -> Result<(), ErrorKind> {
        let col = match self.to_col.get(&variable.id()) {
            Some(col) => *col,
            None => {
                return Err(TheoryError::UnknownVariable(variable.name().to_owned()).into());
            }
        };
        if value <= &ninfty() || value >= &infty() {
            return Err(TheoryError::NumericOverflow(value.to_string()).into());
        }
        self.lp.change_coef(row, col, value);
        Ok(())
    }

    /// The constant and the variable-coefficient pairs of a linear expression.
    fn linear_terms(
        expression: &Expression,
    ) -> Result<(Rational, Vec<(Variable, Rational)>), ErrorKind> {
        match expression.kind() {
            ExpressionKind::Constant(value) => Ok((value.clone(), Vec::new())),

            ExpressionKind::Variable(variable) => {
                Ok((Rational::zero(), vec![(variable.clone(), Rational::one())]))
            }

            ExpressionKind::Multiplication { constant, factors } => {
                let unsupported =
                    || TheoryError::UnsupportedExpression(to_prefix_expression(expression));
                if factors.len() != 1 {
                    return Err(unsupported().into());
                }
                let (base, exponent) = factors.iter().next().unwrap_or_else(|| unreachable!());
                let variable = base.to_variable().ok_or_else(unsupported)?;
                if !exponent.to_constant().is_some_and(|e| e.is_one()) {
                    return Err(unsupported().into());
                }
                Ok((
                    Rational::zero(),
                    vec![(variable.clone(), constant.clone())],
                ))
            }

            ExpressionKind::Addition { constant, terms } => {
                let mut coefficients = Vec::with_capacity(terms.len());
                for (term, coefficient) in terms {
                    match term.kind() {
                        ExpressionKind::Variable(variable) => {
                            coefficients.push((variable.clone(), coefficient.clone()));
                        }
                        ExpressionKind::Multiplication { constant, factors } if factors.len() == 1 => {
                            // A lone weighted power: acceptable only at exponent one.
                            let (base, exponent) =
                                factors.iter().next().unwrap_or_else(|| unreachable!());
                            match (base.to_variable(), exponent.to_constant()) {
                                (Some(variable), Some(e)) if e.is_one() => {
                                    coefficients.push((variable.clone(), coefficient * constant));
                                }
                                _ => {
                                    return Err(TheoryError::UnsupportedExpression(
                                        to_prefix_expression(expression),
                                    )
                                    .into())
                                }
                            }
                        }
                        _ => {
                            return Err(TheoryError::UnsupportedExpression(to_prefix_expression(
                                expression,
                            ))
                            .into())
                        }
                    }
                }
                Ok((constant.clone(), coefficients))
            }

            _ => Err(TheoryError::UnsupportedExpression(to_prefix_expression(expression)).into()),
        }
    }

    /// Maps a box endpoint onto the backend's sentinel convention.
    fn endpoint_bounds(interval: &Interval) -> (Rational, Rational) {
        let lb = match interval.lb() {
            Endpoint::NegInfty => ninfty(),
            Endpoint::Finite(value) => value.clone(),
            Endpoint::PosInfty => infty(),
        };
        let ub = match interval.ub() {
            Endpoint::NegInfty => ninfty(),
            Endpoint::Finite(value) => value.clone(),
            Endpoint::PosInfty => infty(),
        };
        (lb, ub)
    }

    /// Synchronizes column bounds with the box and clears the objective.
    fn prepare(&mut self, domain: &IntervalBox) {
        let zero = Rational::zero();
        for (col, variable) in self.from_col.iter().enumerate() {
            let (lb, ub) = match domain.interval(variable) {
                Some(interval) => Self::endpoint_bounds(interval),
                None => (ninfty(), infty()),
            };
            self.lp.change_col_bounds(col, &lb, &ub);
            self.lp.change_obj_coef(col, &zero);
        }
    }

    /// Builds the point model from the primal solution, clamped into `domain`.
    fn read_model(&mut self, domain: &IntervalBox) {
        let mut primal = Vec::new();
        self.lp.get_primal_rational(&mut primal);

        self.model = domain.clone();
        for variable in domain.variables().to_vec() {
            let value = match self.to_col.get(&variable.id()) {
                Some(col) => primal[*col].clone(),
                None => {
                    // No column means no constraint: any representative will do.
                    let interval = self
                        .model
                        .interval(&variable)
                        .cloned()
                        .unwrap_or_default();
                    if interval.contains(&Rational::zero()) {
                        Rational::zero()
                    } else {
                        match (interval.lb().finite(), interval.ub().finite()) {
                            (Some(lb), _) => lb.clone(),
                            (_, Some(ub)) => ub.clone(),
                            _ => Rational::zero(),
                        }
                    }
                }
            };
            self.model.set_interval(&variable, Interval::point(value));
        }
    }

    /// Replays the candidate's simple bound atoms on a copy of the box, the way the assertion filter would.
    ///
    /// An emptied box is an immediate refutation: the bound literals applied to the offending variable are the explanation, no LP run needed.
    fn tighten(
        &self,
        domain: &IntervalBox,
        assertions: &[Literal],
    ) -> Result<IntervalBox, LiteralSet> {
        let mut working = domain.clone();
        let mut applied: HashMap<usize, LiteralSet> = HashMap::new();

        for (variable, polarity) in assertions {
            let Some(atom) = self.atoms.get(&(variable.id(), *polarity)) else {
                continue;
            };
            let oriented = if *polarity {
                atom.clone()
            } else {
                Formula::not(atom.clone())
            };

            let free = atom.free_variables();
            if free.len() != 1 {
                continue;
            }
            let bounded = free.into_iter().next().unwrap_or_else(|| unreachable!());

            match filter_assertion(&oriented, &mut working) {
                FilterResult::NotFiltered => {}
                FilterResult::FilteredWithoutChange | FilterResult::FilteredWithChange => {
                    applied
                        .entry(bounded.id())
                        .or_default()
                        .insert((variable.clone(), *polarity));
                    if working.is_empty() {
                        log::debug!(
                            target: targets::THEORY,
                            "Bound pass emptied the box at {bounded}",
                        );
                        return Err(applied.remove(&bounded.id()).unwrap_or_default());
                    }
                }
            }
        }
        Ok(working)
    }

    /// Extracts an explanation from the Farkas multipliers, falling back to the full assertion set.
    fn read_explanation(&mut self, assertions: &[Literal]) {
        let mut duals = Vec::new();
        self.lp.get_dual_rational(&mut duals);

        let enabled: LiteralSet = assertions.iter().cloned().collect();
        self.explanation = duals
            .iter()
            .enumerate()
            .filter(|(_, dual)| !dual.is_zero())
            .map(|(row, _)| self.from_row[row].clone())
            .filter(|literal| enabled.contains(literal))
            .collect();

        if self.explanation.is_empty() {
            self.explanation = enabled;
        }
        log::debug!(target: targets::THEORY, "Explanation of {} literals", self.explanation.len());
    }
}

impl TheorySolver for LinearTheorySolver {
    fn add_linear_literal(
        &mut self,
        abstractor: &PredicateAbstractor,
        variable: &Variable,
        polarity: bool,
    ) -> Result<(), ErrorKind> {
        let Some(atom) = abstractor.var_to_formula_map().get(variable) else {
            // A plain Boolean: no row.
            return Ok(());
        };
        self.atoms
            .entry((variable.id(), polarity))
            .or_insert_with(|| atom.clone());
        if self.to_row.contains_key(&(variable.id(), polarity)) {
            return Ok(());
        }

        let sense = match (atom.kind(), polarity) {
            (FormulaKind::Equal(..), true) | (FormulaKind::NotEqual(..), false) => RowSense::Equal,

            // δ-trivial shapes: satisfiable for any δ > 0.
            (FormulaKind::Equal(..), false) | (FormulaKind::NotEqual(..), true) => return Ok(()),

            (FormulaKind::Greater(..) | FormulaKind::GreaterEqual(..), true)
            | (FormulaKind::Less(..) | FormulaKind::LessEqual(..), false) => RowSense::Greater,

            (FormulaKind::Less(..) | FormulaKind::LessEqual(..), true)
            | (FormulaKind::Greater(..) | FormulaKind::GreaterEqual(..), false) => RowSense::Less,

            _ => {
                return Err(TheoryError::UnsupportedExpression(to_prefix_formula(atom)).into());
            }
        };

        let (lhs, rhs) = atom
            .relational_operands()
            .unwrap_or_else(|| unreachable!("the sense table admits relational atoms only"));
        let expression = (lhs.clone() - rhs.clone()).expand();

        for free in expression.variables() {
            self.add_linear_variable(&free);
        }

        let (constant, coefficients) = Self::linear_terms(&expression)?;
        let rhs_value = -constant;
        if rhs_value <= ninfty() || rhs_value >= infty() {
            return Err(TheoryError::NumericOverflow(rhs_value.to_string()).into());
        }

        // Rows are born disabled; the stored sense and RHS return on enable.
        let row = self.lp.new_row(RowSense::Greater, &ninfty());
        debug_assert_eq!(row, self.from_row.len());
        for (variable, coefficient) in &coefficients {
            self.set_coefficient(row, variable, coefficient)?;
        }

        self.row_senses.push(sense);
        self.row_rhs.push(rhs_value);
        self.to_row.insert((variable.id(), polarity), row);
        self.from_row.push((variable.clone(), polarity));
        log::debug!(
            target: targets::THEORY,
            "Row {row} for {}{atom}",
            if polarity { "" } else { "¬" },
        );
        Ok(())
    }

    fn reset_linear_problem(&mut self) {
        log::trace!(target: targets::THEORY, "Reset of {} rows", self.lp.get_rowcount());
        let disabled = ninfty();
        for row in 0..self.lp.get_rowcount() {
            self.lp.change_sense(row, RowSense::Greater);
            self.lp.change_rhs(row, &disabled);
        }
    }

    fn enable_linear_literal(&mut self, variable: &Variable, polarity: bool) {
        match self.to_row.get(&(variable.id(), polarity)) {
            Some(row) => {
                self.lp.change_sense(*row, self.row_senses[*row]);
                self.lp.change_rhs(*row, &self.row_rhs[*row]);
                log::trace!(target: targets::THEORY, "Enabled row {row}");
            }
            None => {
                // A learned literal, or a δ-trivial shape: nothing to enable.
                log::trace!(target: targets::THEORY, "Ignoring ({variable}, {polarity})");
            }
        }
    }

    fn check_sat(
        &mut self,
        domain: &IntervalBox,
        assertions: &[Literal],
    ) -> Result<TheoryResult, ErrorKind> {
        self.explanation.clear();
        if domain.is_empty() {
            self.explanation = assertions.iter().cloned().collect();
            return Ok(TheoryResult::Unsat);
        }

        let working = match self.tighten(domain, assertions) {
            Ok(tightened) => tightened,
            Err(explanation) => {
                self.explanation = explanation;
                return Ok(TheoryResult::Unsat);
            }
        };
        self.prepare(&working);

        match self.lp.optimize() {
            LpStatus::Optimal => {
                self.read_model(&working);
                if self.exhaustive {
                    Ok(TheoryResult::Sat)
                } else {
                    Ok(TheoryResult::DeltaSat)
                }
            }

            LpStatus::Infeasible => {
                self.read_explanation(assertions);
                Ok(TheoryResult::Unsat)
            }

            LpStatus::Unbounded | LpStatus::Unknown => Ok(TheoryResult::Unknown),
        }
    }

    fn check_opt(
        &mut self,
        objective: &Expression,
        domain: &IntervalBox,
        assertions: &[Literal],
    ) -> Result<OptCandidate, ErrorKind> {
        self.explanation.clear();
        if domain.is_empty() {
            self.explanation = assertions.iter().cloned().collect();
            return Ok(OptCandidate::Infeasible);
        }

        let working = match self.tighten(domain, assertions) {
            Ok(tightened) => tightened,
            Err(explanation) => {
                self.explanation = explanation;
                return Ok(OptCandidate::Infeasible);
            }
        };

        let expanded = objective.expand();
        let (constant, coefficients) = Self::linear_terms(&expanded)?;
        for (variable, _) in &coefficients {
            self.add_linear_variable(variable);
        }

        self.prepare(&working);
        for (variable, coefficient) in &coefficients {
            let col = self.to_col[&variable.id()];
            self.lp.change_obj_coef(col, coefficient);
        }

        match self.lp.optimize() {
            LpStatus::Optimal => {
                self.read_model(&working);
                let mut primal = Vec::new();
                self.lp.get_primal_rational(&mut primal);
                let value = coefficients
                    .iter()
                    .fold(constant, |acc, (variable, coefficient)| {
                        acc + coefficient * &primal[self.to_col[&variable.id()]]
                    });
                Ok(OptCandidate::Optimal(value))
            }

            LpStatus::Infeasible => {
                self.read_explanation(assertions);
                Ok(OptCandidate::Infeasible)
            }

            LpStatus::Unbounded => Ok(OptCandidate::Unbounded),

            LpStatus::Unknown => Err(TheoryError::Unknown.into()),
        }
    }

    fn model(&self) -> &IntervalBox {
        &self.model
    }

    fn explanation(&self) -> &LiteralSet {
        &self.explanation
    }
}
