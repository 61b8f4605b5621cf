/*!
The assertion filter: simple bound atoms tighten the box directly.

Atoms of the shapes `var ⋈ c` and `c ⋈ var` --- equality, strict, and non-strict bounds --- never need the LP: the corresponding interval of the box is tightened in place.
Everything else passes through untouched for abstraction and clausification.

Strict bounds are relaxed into non-strict ones.
For a continuous variable the bound moves to the next representable double past the constant --- toward +∞ for a strict lower bound, toward −∞ for a strict upper bound --- a perturbation the δ-semantics absorbs.
For integer and binary variables the tightening is exact: `x > c` becomes `x ≥ ⌊c⌋ + 1` and `x < c` becomes `x ≤ ⌈c⌉ − 1`.

The filter is a [FormulaVisitor] carrying the box and a polarity, flipped on each negation.
*/

use num_traits::One;

use crate::{
    interval::{Endpoint, Interval, IntervalBox},
    misc::log::targets,
    rational::{next_double_above, next_double_below, Rational},
    symbolic::{visit_formula, Expression, Formula, FormulaVisitor, Variable},
};

/// The outcome of filtering one assertion.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FilterResult {
    /// The assertion is not a simple bound; it must go to the solver proper.
    NotFiltered,

    /// The assertion is a simple bound already implied by the box.
    FilteredWithoutChange,

    /// The assertion is a simple bound and the box was tightened (possibly to empty).
    FilteredWithChange,
}

/// Runs `assertion` through the filter against `domain`.
pub fn filter_assertion(assertion: &Formula, domain: &mut IntervalBox) -> FilterResult {
    let mut filter = AssertionFilter {
        domain,
        polarity: true,
    };
    let result = visit_formula(&mut filter, assertion);
    log::trace!(target: targets::FILTER, "{assertion}: {result:?}");
    result
}

struct AssertionFilter<'a> {
    domain: &'a mut IntervalBox,
    polarity: bool,
}

/// The `var ⋈ c` operands of a relational atom, in variable-constant order, with a flag for the mirrored form.
fn bound_shape(f: &Formula) -> Option<(&Variable, &Rational, bool)> {
    let (lhs, rhs) = f.relational_operands()?;
    variable_constant(lhs, rhs)
        .map(|(v, c)| (v, c, false))
        .or_else(|| variable_constant(rhs, lhs).map(|(v, c)| (v, c, true)))
}

fn variable_constant<'e>(
    a: &'e Expression,
    b: &'e Expression,
) -> Option<(&'e Variable, &'e Rational)> {
    match (a.to_variable(), b.to_constant()) {
        (Some(v), Some(c)) => Some((v, c)),
        _ => None,
    }
}

impl AssertionFilter<'_> {
    fn update_equality(&mut self, variable: &Variable, value: &Rational) -> FilterResult {
        let Some(interval) = self.domain.interval(variable) else {
            return FilterResult::NotFiltered;
        };
        if variable.is_integral() && !value.is_integer() {
            self.domain.set_empty();
            return FilterResult::FilteredWithChange;
        }
        if interval.is_point() && interval.contains(value) {
            return FilterResult::FilteredWithoutChange;
        }
        if interval.contains(value) {
            self.domain
                .set_interval(variable, Interval::point(value.clone()));
        } else {
            self.domain.set_empty();
        }
        FilterResult::FilteredWithChange
    }

    fn update_lower_bound(&mut self, variable: &Variable, new_lb: Rational) -> FilterResult {
        let Some(interval) = self.domain.interval(variable) else {
            return FilterResult::NotFiltered;
        };
        let candidate = Endpoint::Finite(new_lb);
        if candidate <= *interval.lb() {
            return FilterResult::FilteredWithoutChange;
        }
        let updated = Interval::new(candidate, interval.ub().clone());
        self.domain.set_interval(variable, updated);
        FilterResult::FilteredWithChange
    }

    fn update_upper_bound(&mut self, variable: &Variable, new_ub: Rational) -> FilterResult {
        let Some(interval) = self.domain.interval(variable) else {
            return FilterResult::NotFiltered;
        };
        let candidate = Endpoint::Finite(new_ub);
        if candidate >= *interval.ub() {
            return FilterResult::FilteredWithoutChange;
        }
        let updated = Interval::new(interval.lb().clone(), candidate);
        self.domain.set_interval(variable, updated);
        FilterResult::FilteredWithChange
    }

    /// `variable > value`, relaxed to a non-strict bound.
    fn update_strict_lower_bound(&mut self, variable: &Variable, value: &Rational) -> FilterResult {
        if variable.is_integral() {
            return self.update_lower_bound(variable, value.floor() + Rational::one());
        }
        match next_double_above(value) {
            Some(above) => self.update_lower_bound(variable, above),
            None => self.update_lower_bound(variable, value.clone()),
        }
    }

    /// `variable < value`, relaxed to a non-strict bound.
    fn update_strict_upper_bound(&mut self, variable: &Variable, value: &Rational) -> FilterResult {
        if variable.is_integral() {
            return self.update_upper_bound(variable, value.ceil() - Rational::one());
        }
        match next_double_below(value) {
            Some(below) => self.update_upper_bound(variable, below),
            None => self.update_upper_bound(variable, value.clone()),
        }
    }

    /// Non-strict lower bounds round up to the next integer on integral variables.
    fn integral_lower(&self, variable: &Variable, value: &Rational) -> Rational {
        if variable.is_integral() {
            value.ceil()
        } else {
            value.clone()
        }
    }

    fn integral_upper(&self, variable: &Variable, value: &Rational) -> Rational {
        if variable.is_integral() {
            value.floor()
        } else {
            value.clone()
        }
    }
}

impl FormulaVisitor<FilterResult> for AssertionFilter<'_> {
    fn visit_false(&mut self, _: &Formula) -> FilterResult {
        FilterResult::NotFiltered
    }

    fn visit_true(&mut self, _: &Formula) -> FilterResult {
        FilterResult::NotFiltered
    }

    fn visit_variable(&mut self, _: &Formula) -> FilterResult {
        FilterResult::NotFiltered
    }

    fn visit_equal(&mut self, f: &Formula) -> FilterResult {
        if !self.polarity {
            // A disequality cannot tighten an interval.
            return FilterResult::NotFiltered;
        }
        match bound_shape(f) {
            Some((variable, value, _)) => {
                let variable = variable.clone();
                let value = value.clone();
                self.update_equality(&variable, &value)
            }
            None => FilterResult::NotFiltered,
        }
    }

    fn visit_not_equal(&mut self, f: &Formula) -> FilterResult {
        self.polarity = !self.polarity;
        let result = self.visit_equal(f);
        self.polarity = !self.polarity;
        result
    }

    fn visit_greater(&mut self, f: &Formula) -> FilterResult {
        let Some((variable, value, mirrored)) = bound_shape(f) else {
            return FilterResult::NotFiltered;
        };
        let variable = variable.clone();
        let value = value.clone();
        match (self.polarity, mirrored) {
            // var > v
            (true, false) => self.update_strict_lower_bound(&variable, &value),
            // ¬(var > v) ⇒ var ≤ v
            (false, false) => {
                let upper = self.integral_upper(&variable, &value);
                self.update_upper_bound(&variable, upper)
            }
            // v > var
            (true, true) => self.update_strict_upper_bound(&variable, &value),
            // ¬(v > var) ⇒ v ≤ var
            (false, true) => {
                let lower = self.integral_lower(&variable, &value);
                self.update_lower_bound(&variable, lower)
            }
        }
    }

    fn visit_greater_equal(&mut self, f: &Formula) -> FilterResult {
        let Some((variable, value, mirrored)) = bound_shape(f) else {
            return FilterResult::NotFiltered;
        };
        let variable = variable.clone();
        let value = value.clone();
        match (self.polarity, mirrored) {
            // var ≥ v
            (true, false) => {
                let lower = self.integral_lower(&variable, &value);
                self.update_lower_bound(&variable, lower)
            }
            // ¬(var ≥ v) ⇒ var < v
            (false, false) => self.update_strict_upper_bound(&variable, &value),
            // v ≥ var
            (true, true) => {
                let upper = self.integral_upper(&variable, &value);
                self.update_upper_bound(&variable, upper)
            }
            // ¬(v ≥ var) ⇒ v < var
            (false, true) => self.update_strict_lower_bound(&variable, &value),
        }
    }

    fn visit_less(&mut self, f: &Formula) -> FilterResult {
        // x < y is ¬(x ≥ y).
        self.polarity = !self.polarity;
        let result = self.visit_greater_equal(f);
        self.polarity = !self.polarity;
        result
    }

    fn visit_less_equal(&mut self, f: &Formula) -> FilterResult {
        // x ≤ y is ¬(x > y).
        self.polarity = !self.polarity;
        let result = self.visit_greater(f);
        self.polarity = !self.polarity;
        result
    }

    fn visit_conjunction(&mut self, _: &Formula) -> FilterResult {
        FilterResult::NotFiltered
    }

    fn visit_disjunction(&mut self, _: &Formula) -> FilterResult {
        FilterResult::NotFiltered
    }

    fn visit_negation(&mut self, f: &Formula) -> FilterResult {
        let inner = f.operand().cloned().unwrap_or_else(|| unreachable!());
        self.polarity = !self.polarity;
        let result = visit_formula(self, &inner);
        self.polarity = !self.polarity;
        result
    }

    fn visit_forall(&mut self, _: &Formula) -> FilterResult {
        FilterResult::NotFiltered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::VariableKind;

    fn q(n: i64) -> Rational {
        Rational::from_integer(n.into())
    }

    fn setup(kind: VariableKind) -> (Variable, IntervalBox) {
        let v = Variable::new("v", kind);
        let mut domain = IntervalBox::new();
        domain.declare(&v);
        (v, domain)
    }

    fn var_leq(v: &Variable, c: i64) -> Formula {
        Formula::leq(Expression::from(v), Expression::integer(c))
    }

    #[test]
    fn equality_collapses_the_interval() {
        let (v, mut domain) = setup(VariableKind::Continuous);
        let f = Formula::eq(Expression::from(&v), Expression::integer(4));
        assert_eq!(
            filter_assertion(&f, &mut domain),
            FilterResult::FilteredWithChange
        );
        assert!(domain.interval(&v).unwrap().is_point());
    }

    #[test]
    fn equality_outside_the_interval_empties() {
        let (v, mut domain) = setup(VariableKind::Continuous);
        filter_assertion(&var_leq(&v, 3), &mut domain);
        let f = Formula::eq(Expression::from(&v), Expression::integer(7));
        assert_eq!(
            filter_assertion(&f, &mut domain),
            FilterResult::FilteredWithChange
        );
        assert!(domain.is_empty());
    }

    #[test]
    fn upper_bounds_only_shrink() {
        let (v, mut domain) = setup(VariableKind::Continuous);
        assert_eq!(
            filter_assertion(&var_leq(&v, 3), &mut domain),
            FilterResult::FilteredWithChange
        );
        // A looser bound leaves the box alone.
        assert_eq!(
            filter_assertion(&var_leq(&v, 10), &mut domain),
            FilterResult::FilteredWithoutChange
        );
        assert_eq!(domain.interval(&v).unwrap().ub().finite(), Some(&q(3)));
    }

    #[test]
    fn strict_integer_bounds_are_exact() {
        let (n, mut domain) = setup(VariableKind::Integer);
        // n > 0 tightens to n ≥ 1.
        let f = Formula::gt(Expression::from(&n), Expression::integer(0));
        filter_assertion(&f, &mut domain);
        assert_eq!(domain.interval(&n).unwrap().lb().finite(), Some(&q(1)));

        // n < 1 then empties: 1 ≤ n ≤ 0.
        let g = Formula::lt(Expression::from(&n), Expression::integer(1));
        filter_assertion(&g, &mut domain);
        assert!(domain.is_empty());
    }

    #[test]
    fn strict_real_bounds_move_past_the_constant() {
        let (x, mut domain) = setup(VariableKind::Continuous);
        let f = Formula::gt(Expression::from(&x), Expression::integer(2));
        filter_assertion(&f, &mut domain);
        let lb = domain.interval(&x).unwrap().lb().finite().unwrap().clone();
        assert!(lb > q(2));
        assert!(lb < Rational::new(20001.into(), 10000.into()));
    }

    #[test]
    fn mirrored_constants_filter_too() {
        let (x, mut domain) = setup(VariableKind::Continuous);
        // 5 ≥ x.
        let f = Formula::geq(Expression::integer(5), Expression::from(&x));
        assert_eq!(
            filter_assertion(&f, &mut domain),
            FilterResult::FilteredWithChange
        );
        assert_eq!(domain.interval(&x).unwrap().ub().finite(), Some(&q(5)));
    }

    #[test]
    fn negations_flip_polarity() {
        let (x, mut domain) = setup(VariableKind::Continuous);
        // ¬(x > 3) ⇒ x ≤ 3.
        let f = Formula::not(Formula::gt(Expression::from(&x), Expression::integer(3)));
        filter_assertion(&f, &mut domain);
        assert_eq!(domain.interval(&x).unwrap().ub().finite(), Some(&q(3)));
    }

    #[test]
    fn compound_formulas_pass_through() {
        let (x, mut domain) = setup(VariableKind::Continuous);
        let f = Formula::or([
            var_leq(&x, 1),
            Formula::geq(Expression::from(&x), Expression::integer(9)),
        ]);
        assert_eq!(filter_assertion(&f, &mut domain), FilterResult::NotFiltered);
    }
}
