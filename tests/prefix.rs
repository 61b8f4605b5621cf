use dlinear::{
    config::Config,
    rational::Rational,
    smt2::Smt2Driver,
    solver::context::Context,
    symbolic::{
        to_prefix_expression, to_prefix_formula, Expression, Formula, Variable, VariableKind,
    },
};

fn real(name: &str) -> Variable {
    Variable::new(name, VariableKind::Continuous)
}

mod printing {
    use super::*;

    #[test]
    fn constants_print_canonically() {
        assert_eq!(to_prefix_expression(&Expression::integer(5)), "5");
        assert_eq!(to_prefix_expression(&Expression::integer(-5)), "(- 5)");
        assert_eq!(
            to_prefix_expression(&Expression::constant(Rational::new(1.into(), 2.into()))),
            "(/ 1 2)"
        );
        assert_eq!(
            to_prefix_expression(&Expression::constant(Rational::new((-1).into(), 2.into()))),
            "(- (/ 1 2))"
        );
    }

    #[test]
    fn sums_print_constant_first() {
        let x = real("x");
        let y = real("y");
        let e = Expression::from(&x)
            + Expression::from(&y).scale(&Rational::from_integer(2.into()))
            + Expression::integer(1);
        assert_eq!(to_prefix_expression(&e), "(+ 1 x (* 2 y))");
    }

    #[test]
    fn disequalities_print_as_negated_equalities() {
        let x = real("x");
        let f = Formula::neq(Expression::from(&x), Expression::integer(3));
        assert_eq!(to_prefix_formula(&f), "(not (= x 3))");
    }

    #[test]
    fn connectives_print_in_operand_order() {
        let x = real("x");
        let a = Formula::leq(Expression::from(&x), Expression::integer(1));
        let b = Formula::geq(Expression::from(&x), Expression::integer(0));
        let printed = to_prefix_formula(&Formula::and([b.clone(), a.clone()]));
        assert!(printed.starts_with("(and "));
        assert!(printed.contains("(<= x 1)"));
        assert!(printed.contains("(>= x 0)"));
    }
}

mod round_trip {
    use super::*;
    use dlinear::symbolic::SymbolicGuard;

    /// Prints `written`, re-parses the print through the SMT-LIB2 reader, and prints the parse.
    fn reprint(declarations: &str, written: &Formula) -> String {
        let printed = to_prefix_formula(written);
        let mut driver = Smt2Driver::new(Context::new(Config::default()));
        driver
            .parse_text(&format!("{declarations}(assert {printed})"))
            .expect("the printed form parses");
        let parsed = driver
            .context()
            .assertions()
            .next()
            .expect("one assertion")
            .clone();
        to_prefix_formula(&parsed)
    }

    #[test]
    fn atoms_survive() {
        let _guard = SymbolicGuard::default();
        let x = real("x");
        let f = Formula::leq(
            Expression::from(&x).scale(&Rational::from_integer(3.into())) + Expression::integer(1),
            Expression::integer(7),
        );
        let printed = to_prefix_formula(&f);
        assert_eq!(reprint("(declare-const x Real)", &f), printed);
    }

    #[test]
    fn boolean_structure_survives() {
        let _guard = SymbolicGuard::default();
        let x = real("x");
        let y = real("y");
        let f = Formula::or([
            Formula::and([
                Formula::geq(Expression::from(&x), Expression::integer(0)),
                Formula::lt(Expression::from(&y), Expression::integer(2)),
            ]),
            Formula::neq(Expression::from(&x), Expression::from(&y)),
        ]);
        let printed = to_prefix_formula(&f);
        assert_eq!(
            reprint("(declare-const x Real)(declare-const y Real)", &f),
            printed
        );
    }

    #[test]
    fn rational_coefficients_survive() {
        let _guard = SymbolicGuard::default();
        let x = real("x");
        let f = Formula::eq(
            Expression::from(&x).scale(&Rational::new(1.into(), 3.into())),
            Expression::constant(Rational::new(5.into(), 2.into())),
        );
        let printed = to_prefix_formula(&f);
        assert_eq!(reprint("(declare-const x Real)", &f), printed);
    }
}
