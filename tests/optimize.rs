use dlinear::{
    config::Config,
    rational::Rational,
    solver::context::{Context, OptResult},
    symbolic::{Expression, Formula, Variable, VariableKind},
};

use num_traits::Zero;

fn real(name: &str) -> Variable {
    Variable::new(name, VariableKind::Continuous)
}

fn q(n: i64) -> Rational {
    Rational::from_integer(n.into())
}

#[test]
fn bracket_is_tight_and_within_delta() {
    let mut config = Config::default();
    config.precision = Rational::new(1.into(), 100.into());
    let mut ctx = Context::new(config);

    let x = real("x");
    ctx.declare_variable(&x);
    ctx.assert(Formula::geq(Expression::from(&x), Expression::integer(1)));
    ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(10)));
    ctx.minimize(Expression::from(&x));

    let mut lo = Rational::zero();
    let mut up = Rational::zero();
    assert_eq!(ctx.check_opt(&mut lo, &mut up).unwrap(), OptResult::Sat);

    assert_eq!(lo, q(1));
    assert!(lo <= up);
    assert!(&up - &lo <= ctx.config().precision);
}

#[test]
fn objective_over_branches_takes_the_least() {
    // x ∈ [0, 1] ∪ [5, 6] by disjunction; minimising x must explore both branches.
    let mut ctx = Context::new(Config::default());
    let x = real("x");
    ctx.declare_variable(&x);

    ctx.assert(Formula::or([
        Formula::and([
            Formula::geq(Expression::from(&x), Expression::integer(5)),
            Formula::leq(Expression::from(&x), Expression::integer(6)),
        ]),
        Formula::and([
            Formula::geq(Expression::from(&x), Expression::integer(0)),
            Formula::leq(Expression::from(&x), Expression::integer(1)),
        ]),
    ]));
    ctx.minimize(Expression::from(&x));

    let mut lo = Rational::zero();
    let mut up = Rational::zero();
    assert_eq!(ctx.check_opt(&mut lo, &mut up).unwrap(), OptResult::Sat);
    assert_eq!(lo, q(0));
}

#[test]
fn unconstrained_objective_is_unbounded() {
    let mut ctx = Context::new(Config::default());
    let x = real("x");
    ctx.declare_variable(&x);
    ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(0)));
    ctx.minimize(Expression::from(&x));

    let mut lo = Rational::zero();
    let mut up = Rational::zero();
    assert_eq!(
        ctx.check_opt(&mut lo, &mut up).unwrap(),
        OptResult::Unbounded
    );
    // A witness is still produced.
    assert!(ctx.model().is_some());
}

#[test]
fn infeasible_constraints_are_unsat() {
    let mut ctx = Context::new(Config::default());
    let x = real("x");
    ctx.declare_variable(&x);
    ctx.assert(Formula::geq(Expression::from(&x), Expression::integer(1)));
    ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(0)));
    ctx.minimize(Expression::from(&x));

    let mut lo = Rational::zero();
    let mut up = Rational::zero();
    assert_eq!(ctx.check_opt(&mut lo, &mut up).unwrap(), OptResult::Unsat);
}

#[test]
fn objective_with_coefficients_and_constant() {
    // minimise 2x + 3 over x ∈ [2, 9]: optimum 7.
    let mut ctx = Context::new(Config::default());
    let x = real("x");
    ctx.declare_variable(&x);
    ctx.assert(Formula::geq(Expression::from(&x), Expression::integer(2)));
    ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(9)));
    ctx.minimize(Expression::from(&x).scale(&q(2)) + Expression::integer(3));

    let mut lo = Rational::zero();
    let mut up = Rational::zero();
    assert_eq!(ctx.check_opt(&mut lo, &mut up).unwrap(), OptResult::Sat);
    assert_eq!(lo, q(7));
    assert_eq!(up, q(7));
}
