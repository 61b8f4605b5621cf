use dlinear::{config::Config, smt2::Smt2Driver, solver::context::Context};

fn run(text: &str) -> Smt2Driver {
    run_with(Config::default(), text)
}

fn run_with(config: Config, text: &str) -> Smt2Driver {
    let mut driver = Smt2Driver::new(Context::new(config));
    driver.parse_text(text).expect("commands execute");
    driver
}

mod verdicts {
    use super::*;

    #[test]
    fn bounded_real_is_delta_sat() {
        let driver = run(
            "(set-logic QF_LRA)\n\
             (declare-const x Real)\n\
             (assert (<= x 5))\n\
             (assert (>= x 3))\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["delta-sat"]);
    }

    #[test]
    fn conflicting_equalities_are_unsat() {
        let driver = run(
            "(declare-const x Real)\n\
             (assert (= x 2))\n\
             (assert (= x 3))\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["unsat"]);
    }

    #[test]
    fn integer_gap_is_unsat() {
        let driver = run(
            "(set-logic QF_LIA)\n\
             (declare-const n Int)\n\
             (assert (> n 0))\n\
             (assert (< n 1))\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["unsat"]);
    }

    #[test]
    fn disjunction_against_bounds_is_unsat() {
        let driver = run(
            "(declare-const x Real)\n\
             (assert (or (< x 0) (> x 10)))\n\
             (assert (and (>= x 0) (<= x 10)))\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["unsat"]);
    }

    #[test]
    fn equation_is_delta_sat() {
        let driver = run(
            "(declare-const x Real)\n\
             (declare-const y Real)\n\
             (declare-const z Real)\n\
             (assert (and (<= 0 x) (<= x 5)))\n\
             (assert (and (<= 0 y) (<= y 5)))\n\
             (assert (and (<= 0 z) (<= z 5)))\n\
             (assert (= (+ (* 2 x) y) z))\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["delta-sat"]);
    }

    #[test]
    fn exit_stops_execution() {
        let driver = run(
            "(declare-const x Real)\n\
             (exit)\n\
             (check-sat)\n",
        );
        assert!(driver.outputs().is_empty());
    }
}

mod models {
    use super::*;

    #[test]
    fn model_line_is_smtlib_shaped() {
        let mut config = Config::default();
        config.produce_models = true;
        let driver = run_with(
            config,
            "(declare-const x Real)\n\
             (assert (>= x 3))\n\
             (assert (<= x 3))\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs()[0], "delta-sat");
        assert_eq!(driver.outputs()[1], "(model (define-fun x () Real 3))");
    }

    #[test]
    fn get_model_repeats_the_last_model() {
        let driver = run(
            "(declare-const x Real)\n\
             (assert (= x 2))\n\
             (check-sat)\n\
             (get-model)\n",
        );
        assert_eq!(driver.outputs()[0], "delta-sat");
        assert!(driver.outputs()[1].contains("(define-fun x () Real 2)"));
    }

    #[test]
    fn boolean_variables_appear_in_the_model() {
        let driver = run(
            "(declare-const p Bool)\n\
             (declare-const x Real)\n\
             (assert (or p (>= x 100)))\n\
             (assert (<= x 0))\n\
             (check-sat)\n\
             (get-model)\n",
        );
        assert_eq!(driver.outputs()[0], "delta-sat");
        assert!(driver.outputs()[1].contains("(define-fun p () Bool true)"));
    }
}

mod terms {
    use super::*;

    #[test]
    fn let_bindings_resolve() {
        let driver = run(
            "(declare-const x Real)\n\
             (assert (let ((y (+ x 1))) (and (<= y 3) (>= y 2))))\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["delta-sat"]);
    }

    #[test]
    fn rational_literals_parse() {
        let driver = run(
            "(declare-const x Real)\n\
             (assert (= x (/ 1 3)))\n\
             (assert (>= x 0.25))\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["delta-sat"]);
    }

    #[test]
    fn implication_and_chained_comparison() {
        let driver = run(
            "(declare-const p Bool)\n\
             (declare-const x Real)\n\
             (assert (=> p (< 0 x 1)))\n\
             (assert p)\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["delta-sat"]);
    }

    #[test]
    fn unknown_symbols_fail() {
        let mut driver = Smt2Driver::new(Context::new(Config::default()));
        let outcome = driver.parse_text("(assert (<= y 1))");
        assert!(outcome.is_err());
    }

    #[test]
    fn nonlinear_atoms_fail_at_the_theory() {
        let mut driver = Smt2Driver::new(Context::new(Config::default()));
        let outcome = driver.parse_text(
            "(declare-const x Real)\n\
             (assert (<= (* x x) 4))\n\
             (check-sat)\n",
        );
        assert!(outcome.is_err());
    }
}

mod scopes {
    use super::*;

    #[test]
    fn push_pop_bracket_assertions() {
        let driver = run(
            "(declare-const x Real)\n\
             (assert (>= x 0))\n\
             (push 1)\n\
             (assert (<= x -1))\n\
             (check-sat)\n\
             (pop 1)\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["unsat", "delta-sat"]);
    }

    #[test]
    fn pop_without_push_fails() {
        let mut driver = Smt2Driver::new(Context::new(Config::default()));
        assert!(driver.parse_text("(pop 1)").is_err());
    }
}

mod optimization {
    use super::*;
    use dlinear::rational::Rational;
    use num_traits::Zero;

    #[test]
    fn minimize_brackets_the_optimum() {
        let mut config = Config::default();
        config.precision = Rational::new(1.into(), 100.into());
        let driver = run_with(
            config,
            "(declare-const x Real)\n\
             (assert (<= 1 x))\n\
             (assert (<= x 10))\n\
             (minimize x)\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["delta-sat"]);
        // The backend is exact: the achieved gap is zero, within the requested δ.
        assert!(driver.actual_precision().is_zero());

        let model = driver.context().model().expect("model");
        let x = model.variables().iter().find(|v| v.name() == "x").unwrap();
        let value = model.interval(x).unwrap().lb().finite().unwrap().clone();
        assert_eq!(value, Rational::from_integer(1.into()));
    }

    #[test]
    fn minimize_over_empty_constraints_is_unsat() {
        let driver = run(
            "(declare-const x Real)\n\
             (assert (<= x 0))\n\
             (assert (>= x 1))\n\
             (minimize x)\n\
             (check-sat)\n",
        );
        assert_eq!(driver.outputs(), ["unsat"]);
    }
}
