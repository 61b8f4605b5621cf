/*!
The context: assertions in, verdicts out.

A [Context] owns the configuration, the assertion stack, the declared box, and --- during a check --- the whole solve pipeline.
[check_sat](Context::check_sat) walks the loop of the solver:

1. Fold every assertion through the [filter](crate::solver::filter) into a working copy of the box. An emptied box is `unsat` with nothing else run.
2. Push the remaining assertions through abstraction and CNF into the [driver](crate::solver::sat_driver).
3. Ask the driver for a candidate, check it with the [theory solver](crate::solver::theory), and either return the verdict or learn the negated explanation and ask again.

The pipeline is rebuilt from the stack on every check, which is what makes `push`/`pop` plain stack operations here while the driver's own scope operations stay unsupported.

With an objective installed by [minimize](Context::minimize), step 3 becomes the δ-optimization search: each theory-feasible candidate is LP-minimised, blocked, and the least optimum over all candidates brackets the answer.
*/

use num_traits::Zero;

use crate::{
    config::Config,
    interval::IntervalBox,
    lp::SimplexLp,
    misc::log::targets,
    rational::Rational,
    solver::{
        filter::{filter_assertion, FilterResult},
        sat_driver::SatDriver,
        scoped_vector::ScopedVector,
        theory::{LinearTheorySolver, OptCandidate, TheoryResult, TheorySolver},
    },
    symbolic::{Expression, Formula, FormulaKind, Literal, LiteralSet, Variable, VariableKind},
    types::err::{ErrorKind, TheoryError},
};

/// The verdict of a δ-optimization.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OptResult {
    /// The constraints are δ-satisfiable and the optimum is bracketed.
    Sat,

    /// The constraints are δ-satisfiable and the objective is unbounded below.
    Unbounded,

    /// The constraints are unsatisfiable.
    Unsat,
}

/// A solving context over a stack of assertions.
pub struct Context {
    config: Config,
    domain: IntervalBox,
    boolean_variables: Vec<Variable>,
    stack: ScopedVector<Formula>,
    objective: Option<Expression>,
    boolean_model: Vec<Literal>,
    model: Option<IntervalBox>,
}

impl Context {
    pub fn new(config: Config) -> Self {
        Context {
            config,
            domain: IntervalBox::new(),
            boolean_variables: Vec::new(),
            stack: ScopedVector::default(),
            objective: None,
            boolean_model: Vec::new(),
            model: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The declared box.
    pub fn domain(&self) -> &IntervalBox {
        &self.domain
    }

    /// The assertions on the stack, oldest first.
    pub fn assertions(&self) -> impl Iterator<Item = &Formula> {
        self.stack.iter()
    }

    /// The number of assertions on the stack.
    pub fn assertion_count(&self) -> usize {
        self.stack.len()
    }

    /// The model box of the latest delta-sat check, if any.
    pub fn model(&self) -> Option<&IntervalBox> {
        self.model.as_ref()
    }

    /// The user-Boolean part of the latest delta-sat check.
    pub fn boolean_model(&self) -> &[Literal] {
        &self.boolean_model
    }

    /// Declares a variable: numeric kinds enter the box, Boolean ones are recorded for model output.
    pub fn declare_variable(&mut self, variable: &Variable) {
        match variable.kind() {
            VariableKind::Boolean => {
                if !self.boolean_variables.contains(variable) {
                    self.boolean_variables.push(variable.clone());
                }
            }
            _ => self.domain.declare(variable),
        }
    }

    /// Pushes an assertion, declaring its free variables as needed.
    pub fn assert(&mut self, f: Formula) {
        if matches!(f.kind(), FormulaKind::True) {
            return;
        }
        for variable in f.free_variables() {
            self.declare_variable(&variable);
        }
        self.stack.push(f);
    }

    /// Installs `objective` for δ-optimization on the next check.
    pub fn minimize(&mut self, objective: Expression) {
        for variable in objective.variables() {
            self.declare_variable(&variable);
        }
        self.objective = Some(objective);
    }

    /// Opens `levels` assertion scopes.
    pub fn push(&mut self, levels: usize) {
        for _ in 0..levels {
            self.stack.push_scope();
        }
    }

    /// Closes `levels` assertion scopes.
    pub fn pop(&mut self, levels: usize) -> Result<(), ErrorKind> {
        for _ in 0..levels {
            self.stack.pop_scope().map_err(ErrorKind::Scope)?;
        }
        Ok(())
    }

    /// Determines δ-satisfiability of the asserted formulas.
    ///
    /// On delta-sat, `actual_precision` receives the residual slack of the witness --- zero, as the backend is exact --- and the model box is returned.
    pub fn check_sat(
        &mut self,
        actual_precision: &mut Rational,
    ) -> Result<Option<IntervalBox>, ErrorKind> {
        if self.objective.is_some() {
            let mut lo = Rational::zero();
            let mut up = Rational::zero();
            return match self.check_opt(&mut lo, &mut up)? {
                OptResult::Unsat => Ok(None),
                OptResult::Sat | OptResult::Unbounded => {
                    *actual_precision = up - lo;
                    Ok(self.model.clone())
                }
            };
        }

        let (filtered, remaining) = self.filtered_domain();
        if filtered.is_empty() {
            log::info!(target: targets::CONTEXT, "Closed by the assertion filter");
            self.model = None;
            return Ok(None);
        }

        let mut driver = self.build_driver(&remaining)?;

        loop {
            let Some(candidate) = driver.check_sat()? else {
                self.model = None;
                return Ok(None);
            };

            match driver
                .theory_mut()
                .check_sat(&filtered, &candidate.theory)?
            {
                TheoryResult::Sat | TheoryResult::DeltaSat => {
                    *actual_precision = Rational::zero();
                    let model = driver.theory().model().clone();
                    self.boolean_model = candidate.boolean;
                    self.model = Some(model.clone());
                    return Ok(Some(model));
                }

                TheoryResult::Unsat => {
                    let explanation = driver.theory().explanation().clone();
                    log::debug!(
                        target: targets::CONTEXT,
                        "Refuted candidate; learning over {} literals",
                        explanation.len(),
                    );
                    driver.add_learned_clause(&explanation);
                }

                TheoryResult::Unknown => return Err(TheoryError::Unknown.into()),
            }
        }
    }

    /// Brackets the installed objective: on [OptResult::Sat], `obj_lo ≤ opt ≤ obj_up` with the gap within the precision.
    pub fn check_opt(
        &mut self,
        obj_lo: &mut Rational,
        obj_up: &mut Rational,
    ) -> Result<OptResult, ErrorKind> {
        // With no installed objective this minimises a constant, bracketing zero.
        let objective = self
            .objective
            .clone()
            .unwrap_or_else(Expression::zero);

        let (filtered, remaining) = self.filtered_domain();
        if filtered.is_empty() {
            self.model = None;
            return Ok(OptResult::Unsat);
        }

        let mut driver = self.build_driver(&remaining)?;
        let mut best: Option<(Rational, IntervalBox, Vec<Literal>)> = None;

        loop {
            let Some(candidate) = driver.check_sat()? else {
                break;
            };

            match driver
                .theory_mut()
                .check_opt(&objective, &filtered, &candidate.theory)?
            {
                OptCandidate::Optimal(value) => {
                    let improves = match &best {
                        Some((incumbent, _, _)) => &value < incumbent,
                        None => true,
                    };
                    if improves {
                        best = Some((
                            value,
                            driver.theory().model().clone(),
                            candidate.boolean.clone(),
                        ));
                    }
                }

                OptCandidate::Unbounded => {
                    // Feasible with no floor: re-check plainly for a witness, then stop.
                    if driver
                        .theory_mut()
                        .check_sat(&filtered, &candidate.theory)?
                        == TheoryResult::Unknown
                    {
                        return Err(TheoryError::Unknown.into());
                    }
                    self.model = Some(driver.theory().model().clone());
                    self.boolean_model = candidate.boolean;
                    return Ok(OptResult::Unbounded);
                }

                OptCandidate::Infeasible => {
                    let explanation = driver.theory().explanation().clone();
                    driver.add_learned_clause(&explanation);
                    continue;
                }
            }

            // Block the explored candidate to search the remaining Boolean space.
            let blocking: LiteralSet = candidate
                .theory
                .iter()
                .chain(candidate.boolean.iter())
                .cloned()
                .collect();
            if blocking.is_empty() {
                break;
            }
            driver.add_learned_clause(&blocking);
        }

        match best {
            Some((value, model, boolean)) => {
                *obj_lo = value.clone();
                *obj_up = value;
                self.model = Some(model);
                self.boolean_model = boolean;
                Ok(OptResult::Sat)
            }
            None => {
                self.model = None;
                Ok(OptResult::Unsat)
            }
        }
    }

    /// Folds the stack through the assertion filter, returning the tightened box and the unfiltered assertions.
    fn filtered_domain(&self) -> (IntervalBox, Vec<Formula>) {
        let mut filtered = self.domain.clone();
        let mut remaining = Vec::new();
        for assertion in &self.stack {
            match filter_assertion(assertion, &mut filtered) {
                FilterResult::NotFiltered => remaining.push(assertion.clone()),
                FilterResult::FilteredWithoutChange | FilterResult::FilteredWithChange => {
                    if filtered.is_empty() {
                        break;
                    }
                }
            }
        }
        (filtered, remaining)
    }

    fn build_driver(&self, remaining: &[Formula]) -> Result<SatDriver, ErrorKind> {
        // Both LP driver selections resolve to the built-in rational simplex.
        log::debug!(target: targets::CONTEXT, "LP driver {}", self.config.lp_solver);
        let theory: Box<dyn TheorySolver> = Box::new(LinearTheorySolver::new(
            Box::new(SimplexLp::new()),
            self.config.exhaustive(),
        ));
        let mut driver = SatDriver::new(&self.config, theory);
        for assertion in remaining {
            driver.add_formula(assertion)?;
        }
        Ok(driver)
    }
}
