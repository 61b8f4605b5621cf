use dlinear::{
    config::Config,
    rational::Rational,
    solver::context::Context,
    symbolic::{Expression, Formula, Variable, VariableKind},
};

fn real(name: &str) -> Variable {
    Variable::new(name, VariableKind::Continuous)
}

fn int(name: &str) -> Variable {
    Variable::new(name, VariableKind::Integer)
}

fn q(n: i64) -> Rational {
    Rational::from_integer(n.into())
}

fn point_of(model: &dlinear::interval::IntervalBox, v: &Variable) -> Rational {
    model
        .interval(v)
        .and_then(|i| i.lb().finite().cloned())
        .expect("point model")
}

mod basic {
    use super::*;

    #[test]
    fn bounds_are_delta_sat() {
        let mut ctx = Context::new(Config::default());
        let x = real("x");
        ctx.declare_variable(&x);

        ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(5)));
        ctx.assert(Formula::geq(Expression::from(&x), Expression::integer(3)));

        let mut precision = ctx.config().precision.clone();
        let model = ctx.check_sat(&mut precision).unwrap().expect("delta-sat");

        let value = point_of(&model, &x);
        assert!(value >= q(3) && value <= q(5));
    }

    #[test]
    fn conflicting_equalities_are_unsat() {
        let mut ctx = Context::new(Config::default());
        let x = real("x");
        ctx.declare_variable(&x);

        ctx.assert(Formula::eq(Expression::from(&x), Expression::integer(2)));
        ctx.assert(Formula::eq(Expression::from(&x), Expression::integer(3)));

        let mut precision = ctx.config().precision.clone();
        assert!(ctx.check_sat(&mut precision).unwrap().is_none());
    }

    #[test]
    fn equation_point_satisfies_within_delta() {
        // 2x + y = z with 0 ≤ x, y, z ≤ 5.
        let mut ctx = Context::new(Config::default());
        let (x, y, z) = (real("x"), real("y"), real("z"));
        for v in [&x, &y, &z] {
            ctx.declare_variable(v);
            ctx.assert(Formula::geq(Expression::from(v), Expression::integer(0)));
            ctx.assert(Formula::leq(Expression::from(v), Expression::integer(5)));
        }
        let lhs = Expression::from(&x).scale(&q(2)) + Expression::from(&y);
        ctx.assert(Formula::eq(lhs, Expression::from(&z)));

        let mut precision = ctx.config().precision.clone();
        let model = ctx.check_sat(&mut precision).unwrap().expect("delta-sat");

        let residual =
            point_of(&model, &x) * q(2) + point_of(&model, &y) - point_of(&model, &z);
        let magnitude = if residual < q(0) { -residual } else { residual };
        assert!(magnitude <= ctx.config().precision);
    }

    #[test]
    fn integer_gap_is_unsat() {
        // n > 0 and n < 1 admits no integer.
        let mut ctx = Context::new(Config::default());
        let n = int("n");
        ctx.declare_variable(&n);

        ctx.assert(Formula::gt(Expression::from(&n), Expression::integer(0)));
        ctx.assert(Formula::lt(Expression::from(&n), Expression::integer(1)));

        let mut precision = ctx.config().precision.clone();
        assert!(ctx.check_sat(&mut precision).unwrap().is_none());
    }

    #[test]
    fn disjunction_against_bounds_is_unsat() {
        // (x < 0 ∨ x > 10) against x ∈ [0, 10] refutes each branch through a learned clause.
        let mut ctx = Context::new(Config::default());
        let x = real("x");
        ctx.declare_variable(&x);

        ctx.assert(Formula::or([
            Formula::lt(Expression::from(&x), Expression::integer(0)),
            Formula::gt(Expression::from(&x), Expression::integer(10)),
        ]));
        ctx.assert(Formula::geq(Expression::from(&x), Expression::integer(0)));
        ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(10)));

        let mut precision = ctx.config().precision.clone();
        assert!(ctx.check_sat(&mut precision).unwrap().is_none());
    }

    #[test]
    fn repeated_assertion_is_idempotent() {
        let mut ctx = Context::new(Config::default());
        let x = real("x");
        ctx.declare_variable(&x);

        let f = Formula::or([
            Formula::leq(Expression::from(&x), Expression::integer(1)),
            Formula::geq(Expression::from(&x), Expression::integer(4)),
        ]);
        ctx.assert(f.clone());
        ctx.assert(f);

        let mut precision = ctx.config().precision.clone();
        assert!(ctx.check_sat(&mut precision).unwrap().is_some());
    }

    #[test]
    fn checks_can_repeat() {
        let mut ctx = Context::new(Config::default());
        let x = real("x");
        ctx.declare_variable(&x);
        ctx.assert(Formula::geq(Expression::from(&x), Expression::integer(1)));

        let mut precision = ctx.config().precision.clone();
        assert!(ctx.check_sat(&mut precision).unwrap().is_some());
        assert!(ctx.check_sat(&mut precision).unwrap().is_some());

        ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(0)));
        assert!(ctx.check_sat(&mut precision).unwrap().is_none());
    }

    #[test]
    fn boolean_structure_mixes_with_theory() {
        // (p ∨ x ≥ 4) ∧ ¬p forces the theory branch.
        let mut ctx = Context::new(Config::default());
        let x = real("x");
        let p = Variable::new("p", VariableKind::Boolean);
        ctx.declare_variable(&x);
        ctx.declare_variable(&p);

        ctx.assert(Formula::or([
            Formula::boolean(p.clone()),
            Formula::geq(Expression::from(&x), Expression::integer(4)),
        ]));
        ctx.assert(Formula::not(Formula::boolean(p.clone())));
        ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(9)));

        let mut precision = ctx.config().precision.clone();
        let model = ctx.check_sat(&mut precision).unwrap().expect("delta-sat");
        let value = point_of(&model, &x);
        assert!(value >= q(4) && value <= q(9));
    }
}

mod scopes {
    use super::*;

    #[test]
    fn pop_restores_the_stack() {
        let mut ctx = Context::new(Config::default());
        let x = real("x");
        ctx.declare_variable(&x);
        ctx.assert(Formula::geq(Expression::from(&x), Expression::integer(0)));

        ctx.push(1);
        ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(-1)));

        let mut precision = ctx.config().precision.clone();
        assert!(ctx.check_sat(&mut precision).unwrap().is_none());

        assert!(ctx.pop(1).is_ok());
        assert!(ctx.check_sat(&mut precision).unwrap().is_some());
    }

    #[test]
    fn underflow_is_an_error() {
        let mut ctx = Context::new(Config::default());
        assert!(ctx.pop(1).is_err());
    }
}

mod invariants {
    use super::*;
    use dlinear::solver::filter::{filter_assertion, FilterResult};

    #[test]
    fn filtering_never_grows_the_box() {
        let mut ctx = Context::new(Config::default());
        let x = real("x");
        ctx.declare_variable(&x);

        let mut domain = ctx.domain().clone();
        let before = domain.clone();

        let assertions = [
            Formula::geq(Expression::from(&x), Expression::integer(1)),
            Formula::leq(Expression::from(&x), Expression::integer(8)),
            Formula::gt(Expression::from(&x), Expression::integer(2)),
        ];
        for f in &assertions {
            let snapshot = domain.clone();
            let result = filter_assertion(f, &mut domain);
            assert_ne!(result, FilterResult::NotFiltered);
            assert!(domain.subset_of(&snapshot));
        }
        assert!(domain.subset_of(&before));
    }

    #[test]
    fn model_lies_in_the_declared_box() {
        let mut ctx = Context::new(Config::default());
        let x = real("x");
        ctx.declare_variable(&x);
        ctx.assert(Formula::geq(Expression::from(&x), Expression::integer(2)));
        ctx.assert(Formula::leq(Expression::from(&x), Expression::integer(3)));

        let mut precision = ctx.config().precision.clone();
        let model = ctx.check_sat(&mut precision).unwrap().expect("delta-sat");
        assert!(model.subset_of(ctx.domain()));
    }
}
