/*!
An exact rational simplex over bounded variables.

The implementation follows the simplex variant common to SMT theory solvers: every variable --- structural columns and one slack per row --- carries optional lower and upper bounds, the tableau expresses each basic variable over the nonbasic ones, and feasibility is restored one violated basic variable at a time, choosing pivots by least variable index so the search cannot cycle.

A solve rebuilds the tableau from the stored rows, so mutation between solves is free-form: the driver may flip senses, move RHSs, and re-bound columns without the backend tracking increments.

Phase 2 minimises the objective over the feasible region by moving nonbasic variables along their reduced costs, bounded by the classic ratio test; a direction with no binding bound anywhere is unboundedness.

On infeasibility the violated basic variable's tableau row is the certificate: its own row and the rows of the slack variables in its support receive non-zero Farkas multipliers, which is what [get_dual_rational](super::LpBackend::get_dual_rational) then reports.
*/

use std::collections::BTreeMap;

use num_traits::{One, Signed, Zero};

use crate::{
    lp::{LpBackend, LpStatus, RowSense},
    misc::log::targets,
    rational::{infty, ninfty, Rational},
};

struct Column {
    #[allow(dead_code)]
    name: String,
    lb: Option<Rational>,
    ub: Option<Rational>,
    obj: Rational,
}

struct Row {
    sense: RowSense,
    rhs: Rational,
    coeffs: BTreeMap<usize, Rational>,
}

/// The built-in exact rational LP backend.
#[derive(Default)]
pub struct SimplexLp {
    columns: Vec<Column>,
    rows: Vec<Row>,
    primal: Vec<Rational>,
    duals: Vec<Rational>,
}

impl SimplexLp {
    pub fn new() -> Self {
        SimplexLp::default()
    }

    fn map_lb(lb: &Rational) -> Option<Rational> {
        if *lb <= ninfty() {
            None
        } else {
            Some(lb.clone())
        }
    }

    fn map_ub(ub: &Rational) -> Option<Rational> {
        if *ub >= infty() {
            None
        } else {
            Some(ub.clone())
        }
    }
}

/// The working state of one solve.
struct Tableau {
    /// Bounds and current values, indexed by variable: structural columns first, then one slack per row.
    lower: Vec<Option<Rational>>,
    upper: Vec<Option<Rational>>,
    value: Vec<Rational>,

    /// Expressions of basic variables over nonbasic ones.
    rows: BTreeMap<usize, BTreeMap<usize, Rational>>,
    basic: Vec<bool>,
}

impl Tableau {
    fn build(lp: &SimplexLp) -> Self {
        let structural = lp.columns.len();
        let total = structural + lp.rows.len();

        let mut lower = Vec::with_capacity(total);
        let mut upper = Vec::with_capacity(total);
        let mut value = Vec::with_capacity(total);

        for column in &lp.columns {
            let start = match (&column.lb, &column.ub) {
                (Some(lb), _) if lb > &Rational::zero() => lb.clone(),
                (_, Some(ub)) if ub < &Rational::zero() => ub.clone(),
                _ => Rational::zero(),
            };
            lower.push(column.lb.clone());
            upper.push(column.ub.clone());
            value.push(start);
        }

        let mut rows = BTreeMap::new();
        let mut basic = vec![false; total];

        for (index, row) in lp.rows.iter().enumerate() {
            let slack = structural + index;
            let (lb, ub) = match row.sense {
                RowSense::Greater => (SimplexLp::map_lb(&row.rhs), None),
                RowSense::Less => (None, SimplexLp::map_ub(&row.rhs)),
                RowSense::Equal => {
                    if row.rhs <= ninfty() || row.rhs >= infty() {
                        (None, None)
                    } else {
                        (Some(row.rhs.clone()), Some(row.rhs.clone()))
                    }
                }
            };

            let slack_value = row
                .coeffs
                .iter()
                .fold(Rational::zero(), |acc, (col, coef)| acc + coef * &value[*col]);

            lower.push(lb);
            upper.push(ub);
            value.push(slack_value);
            rows.insert(slack, row.coeffs.clone());
            basic[slack] = true;
        }

        Tableau {
            lower,
            upper,
            value,
            rows,
            basic,
        }
    }

    fn below_lower(&self, variable: usize) -> bool {
        self.lower[variable]
            .as_ref()
            .is_some_and(|lb| &self.value[variable] < lb)
    }

    fn above_upper(&self, variable: usize) -> bool {
        self.upper[variable]
            .as_ref()
            .is_some_and(|ub| &self.value[variable] > ub)
    }

    fn can_increase(&self, variable: usize) -> bool {
        match &self.upper[variable] {
            None => true,
            Some(ub) => &self.value[variable] < ub,
        }
    }

    fn can_decrease(&self, variable: usize) -> bool {
        match &self.lower[variable] {
            None => true,
            Some(lb) => &self.value[variable] > lb,
        }
    }

    /// Moves nonbasic `entering` so that basic `leaving` lands exactly on `target`, then swaps them in the basis.
    fn pivot_and_update(&mut self, leaving: usize, entering: usize, target: Rational) {
        let coefficient = self.rows[&leaving][&entering].clone();
        let step = (&target - &self.value[leaving]) / &coefficient;

        self.value[entering] = &self.value[entering] + &step;
        self.value[leaving] = target;
        let updates: Vec<(usize, Rational)> = self
            .rows
            .iter()
            .filter(|(basic_var, _)| **basic_var != leaving)
            .filter_map(|(basic_var, row)| {
                row.get(&entering)
                    .map(|g| (*basic_var, &self.value[*basic_var] + &(g * &step)))
            })
            .collect();
        for (variable, updated) in updates {
            self.value[variable] = updated;
        }

        self.pivot(leaving, entering);
    }

    /// Swaps basic `leaving` with nonbasic `entering`, rewriting every row.
    fn pivot(&mut self, leaving: usize, entering: usize) {
        let old_row = self
            .rows
            .remove(&leaving)
            .unwrap_or_else(|| unreachable!("pivots leave the basis"));
        let coefficient = old_row[&entering].clone();

        // entering = (leaving − Σ other terms) / coefficient
        let mut entering_row: BTreeMap<usize, Rational> = BTreeMap::new();
        entering_row.insert(leaving, Rational::one() / &coefficient);
        for (variable, coef) in &old_row {
            if *variable != entering {
                entering_row.insert(*variable, -(coef / &coefficient));
            }
        }

        for row in self.rows.values_mut() {
            if let Some(g) = row.remove(&entering) {
                for (variable, coef) in &entering_row {
                    let updated = match row.get(variable) {
                        Some(existing) => existing + &(&g * coef),
                        None => &g * coef,
                    };
                    if updated.is_zero() {
                        row.remove(variable);
                    } else {
                        row.insert(*variable, updated);
                    }
                }
            }
        }

        self.rows.insert(entering, entering_row);
        self.basic[leaving] = false;
        self.basic[entering] = true;
    }

    /// Restores feasibility. On success every variable sits within its bounds; on failure the violated basic variable is returned.
    fn make_feasible(&mut self) -> Result<(), usize> {
        loop {
            // The violated basic variable of least index, for termination.
            let violated = self
                .rows
                .keys()
                .copied()
                .find(|&b| self.below_lower(b) || self.above_upper(b));

            let Some(leaving) = violated else {
                return Ok(());
            };

            let below = self.below_lower(leaving);
            let row = &self.rows[&leaving];

            let entering = row
                .iter()
                .find(|(variable, coef)| {
                    let rising = coef.is_positive() == below;
                    if rising {
                        self.can_increase(**variable)
                    } else {
                        self.can_decrease(**variable)
                    }
                })
                .map(|(variable, _)| *variable);

            let Some(entering) = entering else {
                return Err(leaving);
            };

            let target = if below {
                self.lower[leaving].clone()
            } else {
                self.upper[leaving].clone()
            };
            let target = target.unwrap_or_else(|| unreachable!("a violated bound is finite"));

            self.pivot_and_update(leaving, entering, target);
        }
    }

    /// Minimises the reduced objective from a feasible assignment. Returns the reduced objective row on optimality.
    fn minimise(
        &mut self,
        objective: &[Rational],
    ) -> Result<BTreeMap<usize, Rational>, LpStatus> {
        // Express the objective over nonbasic variables.
        let mut reduced: BTreeMap<usize, Rational> = BTreeMap::new();
        for (variable, coef) in objective.iter().enumerate() {
            if coef.is_zero() {
                continue;
            }
            if self.basic[variable] {
                for (nonbasic, row_coef) in &self.rows[&variable] {
                    let updated = match reduced.get(nonbasic) {
                        Some(existing) => existing + &(coef * row_coef),
                        None => coef * row_coef,
                    };
                    if updated.is_zero() {
                        reduced.remove(nonbasic);
                    } else {
                        reduced.insert(*nonbasic, updated);
                    }
                }
            } else {
                let updated = match reduced.get(&variable) {
                    Some(existing) => existing + coef,
                    None => coef.clone(),
                };
                if updated.is_zero() {
                    reduced.remove(&variable);
                } else {
                    reduced.insert(variable, updated);
                }
            }
        }

        loop {
            // The improving nonbasic variable of least index.
            let candidate = reduced
                .iter()
                .filter(|(variable, _)| !self.basic[**variable])
                .find_map(|(variable, cost)| {
                    if cost < &Rational::zero() && self.can_increase(*variable) {
                        Some((*variable, true))
                    } else if cost > &Rational::zero() && self.can_decrease(*variable) {
                        Some((*variable, false))
                    } else {
                        None
                    }
                });

            let Some((entering, rising)) = candidate else {
                return Ok(reduced);
            };
            let direction = if rising {
                Rational::one()
            } else {
                -Rational::one()
            };

            // Ratio test: the entering variable's own bound against every basic bound it moves.
            let mut step: Option<Rational> = match (
                rising,
                &self.lower[entering],
                &self.upper[entering],
            ) {
                (true, _, Some(ub)) => Some(ub - &self.value[entering]),
                (false, Some(lb), _) => Some(&self.value[entering] - lb),
                _ => None,
            };
            let mut blocking: Option<(usize, Rational)> = None;

            for (basic_var, row) in &self.rows {
                let Some(coef) = row.get(&entering) else {
                    continue;
                };
                let movement = coef * &direction;
                let allowed = if movement > Rational::zero() {
                    self.upper[*basic_var]
                        .as_ref()
                        .map(|ub| (ub - &self.value[*basic_var]) / &movement)
                } else {
                    self.lower[*basic_var]
                        .as_ref()
                        .map(|lb| (&self.value[*basic_var] - lb) / -&movement)
                };
                let Some(allowed) = allowed else {
                    continue;
                };
                if step.as_ref().is_none_or(|s| &allowed < s) {
                    let bound = if movement > Rational::zero() {
                        self.upper[*basic_var].clone()
                    } else {
                        self.lower[*basic_var].clone()
                    };
                    step = Some(allowed);
                    blocking = Some((
                        *basic_var,
                        bound.unwrap_or_else(|| unreachable!("the binding bound is finite")),
                    ));
                }
            }

            let Some(step) = step else {
                return Err(LpStatus::Unbounded);
            };

            match blocking {
                Some((leaving, target)) => {
                    self.pivot_and_update(leaving, entering, target);

                    // Eliminate the now-basic entering variable from the objective.
                    if let Some(cost) = reduced.remove(&entering) {
                        for (variable, coef) in &self.rows[&entering] {
                            let updated = match reduced.get(variable) {
                                Some(existing) => existing + &(&cost * coef),
                                None => &cost * coef,
                            };
                            if updated.is_zero() {
                                reduced.remove(variable);
                            } else {
                                reduced.insert(*variable, updated);
                            }
                        }
                    }
                }

                None => {
                    // The entering variable's own bound binds; no basis change.
                    let delta = &direction * &step;
                    self.value[entering] = &self.value[entering] + &delta;
                    let updates: Vec<(usize, Rational)> = self
                        .rows
                        .iter()
                        .filter_map(|(basic_var, row)| {
                            row.get(&entering)
                                .map(|g| (*basic_var, &self.value[*basic_var] + &(g * &delta)))
                        })
                        .collect();
                    for (variable, updated) in updates {
                        self.value[variable] = updated;
                    }
                }
            }
        }
    }
}

impl LpBackend for SimplexLp {
    fn new_col(&mut self, name: &str, lb: &Rational, ub: &Rational) -> usize {
        let index = self.columns.len();
        self.columns.push(Column {
            name: name.to_owned(),
            lb: Self::map_lb(lb),
            ub: Self::map_ub(ub),
            obj: Rational::zero(),
        });
        index
    }

    fn new_row(&mut self, sense: RowSense, rhs: &Rational) -> usize {
        let index = self.rows.len();
        self.rows.push(Row {
            sense,
            rhs: rhs.clone(),
            coeffs: BTreeMap::new(),
        });
        index
    }

    fn change_coef(&mut self, row: usize, col: usize, value: &Rational) {
        if value.is_zero() {
            self.rows[row].coeffs.remove(&col);
        } else {
            self.rows[row].coeffs.insert(col, value.clone());
        }
    }

    fn change_sense(&mut self, row: usize, sense: RowSense) {
        self.rows[row].sense = sense;
    }

    fn change_rhs(&mut self, row: usize, rhs: &Rational) {
        self.rows[row].rhs = rhs.clone();
    }

    fn change_col_bounds(&mut self, col: usize, lb: &Rational, ub: &Rational) {
        self.columns[col].lb = Self::map_lb(lb);
        self.columns[col].ub = Self::map_ub(ub);
    }

    fn change_obj_coef(&mut self, col: usize, value: &Rational) {
        self.columns[col].obj = value.clone();
    }

    fn get_rowcount(&self) -> usize {
        self.rows.len()
    }

    fn get_colcount(&self) -> usize {
        self.columns.len()
    }

    fn optimize(&mut self) -> LpStatus {
        let structural = self.columns.len();
        let mut tableau = Tableau::build(self);

        self.primal.clear();
        self.duals = vec![Rational::zero(); self.rows.len()];

        if let Err(violated) = tableau.make_feasible() {
            log::debug!(target: targets::LP, "Infeasible at variable {violated}");

            // Farkas multipliers: the violated row and the slack rows in its support.
            if violated >= structural {
                self.duals[violated - structural] = Rational::one();
            }
            for (variable, coef) in &tableau.rows[&violated] {
                if *variable >= structural {
                    self.duals[*variable - structural] = coef.clone();
                }
            }
            return LpStatus::Infeasible;
        }

        let objective: Vec<Rational> = self.columns.iter().map(|c| c.obj.clone()).collect();
        if objective.iter().any(|c| !c.is_zero()) {
            match tableau.minimise(&objective) {
                Ok(reduced) => {
                    for (index, dual) in self.duals.iter_mut().enumerate() {
                        if let Some(cost) = reduced.get(&(structural + index)) {
                            *dual = -cost.clone();
                        }
                    }
                }
                Err(status) => return status,
            }
        }

        self.primal = tableau.value[..structural].to_vec();
        LpStatus::Optimal
    }

    fn get_primal_rational(&self, out: &mut Vec<Rational>) {
        out.clear();
        out.extend(self.primal.iter().cloned());
    }

    fn get_dual_rational(&self, out: &mut Vec<Rational>) {
        out.clear();
        out.extend(self.duals.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn q(n: i64) -> Rational {
        Rational::from_integer(n.into())
    }

    fn unbounded_col(lp: &mut SimplexLp, name: &str) -> usize {
        lp.new_col(name, &ninfty(), &infty())
    }

    #[test]
    fn bounded_feasibility() {
        let mut lp = SimplexLp::new();
        let x = lp.new_col("x", &q(0), &q(5));
        let row = lp.new_row(RowSense::Greater, &q(3));
        lp.change_coef(row, x, &q(1));

        assert_eq!(lp.optimize(), LpStatus::Optimal);

        let mut primal = Vec::new();
        lp.get_primal_rational(&mut primal);
        assert!(primal[x] >= q(3) && primal[x] <= q(5));
    }

    #[test]
    fn conflicting_equalities() {
        let mut lp = SimplexLp::new();
        let x = unbounded_col(&mut lp, "x");
        let two = lp.new_row(RowSense::Equal, &q(2));
        lp.change_coef(two, x, &q(1));
        let three = lp.new_row(RowSense::Equal, &q(3));
        lp.change_coef(three, x, &q(1));

        assert_eq!(lp.optimize(), LpStatus::Infeasible);

        let mut duals = Vec::new();
        lp.get_dual_rational(&mut duals);
        assert!(duals.iter().any(|d| !d.is_zero()));
    }

    #[test]
    fn vacuous_rows_do_not_constrain() {
        let mut lp = SimplexLp::new();
        let x = unbounded_col(&mut lp, "x");
        let row = lp.new_row(RowSense::Greater, &ninfty());
        lp.change_coef(row, x, &q(1));

        assert_eq!(lp.optimize(), LpStatus::Optimal);
    }

    #[test]
    fn equation_with_three_columns() {
        // 2x + y − z = 0 with every column in [0, 5].
        let mut lp = SimplexLp::new();
        let x = lp.new_col("x", &q(0), &q(5));
        let y = lp.new_col("y", &q(0), &q(5));
        let z = lp.new_col("z", &q(0), &q(5));
        let row = lp.new_row(RowSense::Equal, &q(0));
        lp.change_coef(row, x, &q(2));
        lp.change_coef(row, y, &q(1));
        lp.change_coef(row, z, &q(-1));

        assert_eq!(lp.optimize(), LpStatus::Optimal);

        let mut primal = Vec::new();
        lp.get_primal_rational(&mut primal);
        let residual = &primal[x] * q(2) + &primal[y] - &primal[z];
        assert!(residual.is_zero());
    }

    #[test]
    fn minimisation_reaches_the_bound() {
        let mut lp = SimplexLp::new();
        let x = unbounded_col(&mut lp, "x");
        let row = lp.new_row(RowSense::Greater, &q(1));
        lp.change_coef(row, x, &q(1));
        lp.change_obj_coef(x, &q(1));

        assert_eq!(lp.optimize(), LpStatus::Optimal);

        let mut primal = Vec::new();
        lp.get_primal_rational(&mut primal);
        assert_eq!(primal[x], q(1));
    }

    #[test]
    fn minimisation_without_a_floor_is_unbounded() {
        let mut lp = SimplexLp::new();
        let x = unbounded_col(&mut lp, "x");
        lp.change_obj_coef(x, &q(1));

        assert_eq!(lp.optimize(), LpStatus::Unbounded);
    }

    #[test]
    fn disable_and_re_enable_a_row() {
        let mut lp = SimplexLp::new();
        let x = lp.new_col("x", &q(0), &q(10));
        let row = lp.new_row(RowSense::Greater, &ninfty());
        lp.change_coef(row, x, &q(1));

        // Enable as x ≥ 7, then solve.
        lp.change_sense(row, RowSense::Greater);
        lp.change_rhs(row, &q(7));
        assert_eq!(lp.optimize(), LpStatus::Optimal);
        let mut primal = Vec::new();
        lp.get_primal_rational(&mut primal);
        assert!(primal[x] >= q(7));

        // Disable again: the bound disappears.
        lp.change_rhs(row, &ninfty());
        lp.change_obj_coef(x, &q(1));
        assert_eq!(lp.optimize(), LpStatus::Optimal);
        lp.get_primal_rational(&mut primal);
        assert_eq!(primal[x], q(0));
    }
}
