/*!
A delta-complete SMT solver for quantifier-free linear real and integer arithmetic.

dlinear decides Boolean combinations of linear (in)equalities over numeric variables, up to a user-chosen precision δ > 0.
For a set of assertions it reports either **unsat** --- no assignment satisfies the formulas --- or **delta-sat** together with a witness [box](interval::IntervalBox), a product of rational intervals in which every assertion holds after relaxing each atom by at most δ.
All arithmetic on the theory side is exact: coefficients, bounds, and the witness are arbitrary-precision rationals.

# Orientation

A solve is a conversation between a Boolean engine and a linear-arithmetic oracle:

- Assertions are first run through the [assertion filter](solver::filter), which recognises simple variable bounds and tightens the box directly.
- What remains is [predicate-abstracted](solver::abstractor) --- each theory atom becomes a fresh Boolean proxy --- and [CNF-ized](solver::cnfizer) into clauses for the [CDCL engine](sat).
- Each Boolean candidate model activates a set of rows in an exact rational [LP](lp); the [theory solver](solver::theory) checks their joint feasibility.
- An infeasible candidate yields an explanation, whose negation returns to the engine as a learned clause, and the loop continues.

The [context](solver::context::Context) owns this loop along with the assertion stack and the box.
Strict inequalities are treated as their non-strict counterparts and disequalities are dropped from the LP: both are δ-trivial, which is exactly what makes the procedure delta-complete.

# Example

```rust
# use dlinear::config::Config;
# use dlinear::rational::InftyGuard;
# use dlinear::solver::context::Context;
# use dlinear::symbolic::{Expression, Formula, Variable, VariableKind};
let _infty = InftyGuard::default();

let mut ctx = Context::new(Config::default());

let x = Variable::new("x", VariableKind::Continuous);
ctx.declare_variable(&x);

let e = Expression::from(&x);
ctx.assert(Formula::geq(e.clone(), Expression::integer(3)));
ctx.assert(Formula::leq(e, Expression::integer(5)));

let mut actual_precision = ctx.config().precision.clone();
let model = ctx.check_sat(&mut actual_precision).unwrap();
assert!(model.is_some());
```

# Logs

Calls to [log!](log) are made throughout, with [targets](misc::log::targets) to narrow output to a part of the solver.
No log implementation is provided, and logging is compiled out of release builds.
*/

#![allow(clippy::collapsible_else_if)]
#![allow(clippy::single_match)]

pub mod config;

pub mod rational;
pub mod symbolic;

pub mod interval;

pub mod generic;
pub mod sat;

pub mod lp;

pub mod solver;

pub mod smt2;

pub mod misc;
pub mod types;
