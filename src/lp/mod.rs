/*!
The linear-programming backend: a narrow trait and an exact rational simplex behind it.

The [theory solver](crate::solver::theory) talks to an LP through [LpBackend] --- columns, rows, coefficient and sense mutation, a solve, and rational primal/dual extraction.
The surface is the classic rational LP driver surface: every bound, coefficient, and RHS is a finite rational, with the [active infinity](crate::rational) sentinels standing in for ±∞.
A row whose RHS is the negative sentinel under sense `G` is vacuous; this is exactly how the driver disables rows between theory checks.

[SimplexLp] is the built-in implementation, and serves both `--lp-solver` selections; the qsoptex and soplex drivers this surface was shaped around are C libraries the crate does not link.

The global half of a backend's lifecycle --- publish sentinels, work, retract --- is the [infty_start](crate::rational::infty_start)/[infty_finish](crate::rational::infty_finish) discipline; [init](LpBackend::init) and [finish](LpBackend::finish) are thin wrappers over it.
*/

mod simplex;
pub use simplex::SimplexLp;

use crate::rational::Rational;

/// The sense of a row.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RowSense {
    /// The row's combination equals its RHS.
    Equal,

    /// The row's combination is at least its RHS.
    Greater,

    /// The row's combination is at most its RHS.
    Less,
}

/// The status of a solve.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LpStatus {
    /// A feasible, objective-optimal assignment was found.
    Optimal,

    /// The enabled rows and column bounds admit no assignment.
    Infeasible,

    /// The objective decreases without bound over the feasible region.
    Unbounded,

    /// The backend could not decide.
    Unknown,
}

/// A rational LP backend.
pub trait LpBackend {
    /// Publishes the process-wide sentinels the backend requires.
    fn init()
    where
        Self: Sized,
    {
        crate::rational::infty_start(crate::rational::infty(), crate::rational::ninfty());
    }

    /// Retracts the process-wide sentinels.
    fn finish()
    where
        Self: Sized,
    {
        crate::rational::infty_finish();
    }

    /// Appends a column with the given bounds, returning its stable index.
    ///
    /// Bounds at or beyond the active infinity are unbounded.
    fn new_col(&mut self, name: &str, lb: &Rational, ub: &Rational) -> usize;

    /// Appends a row with the given sense and RHS, returning its stable index.
    fn new_row(&mut self, sense: RowSense, rhs: &Rational) -> usize;

    /// Sets the coefficient of `col` in `row`.
    fn change_coef(&mut self, row: usize, col: usize, value: &Rational);

    /// Sets the sense of `row`.
    fn change_sense(&mut self, row: usize, sense: RowSense);

    /// Sets the RHS of `row`. An RHS at or beyond a sentinel leaves the row vacuous.
    fn change_rhs(&mut self, row: usize, rhs: &Rational);

    /// Sets the bounds of `col`.
    fn change_col_bounds(&mut self, col: usize, lb: &Rational, ub: &Rational);

    /// Sets the objective coefficient of `col`.
    fn change_obj_coef(&mut self, col: usize, value: &Rational);

    /// The number of rows.
    fn get_rowcount(&self) -> usize;

    /// The number of columns.
    fn get_colcount(&self) -> usize;

    /// Solves the current problem, minimising the objective.
    fn optimize(&mut self) -> LpStatus;

    /// Writes the primal column values of the latest solve into `out`.
    fn get_primal_rational(&self, out: &mut Vec<Rational>);

    /// Writes the row multipliers of the latest solve into `out`.
    ///
    /// After an infeasible solve these are Farkas multipliers: rows with a non-zero entry jointly witness the infeasibility.
    fn get_dual_rational(&self, out: &mut Vec<Rational>);
}
