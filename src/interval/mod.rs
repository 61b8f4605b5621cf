/*!
Interval domains with exact rational endpoints.

An [Interval] is a closed interval with endpoints in ℚ ∪ {−∞, +∞}; an [IntervalBox] maps each declared numeric variable to one, together with the variable's kind, and carries an `empty` sentinel for the moment any interval collapses past its partner bound.

The box is the solver's working domain: the [assertion filter](crate::solver::filter) tightens it directly, the [theory solver](crate::solver::theory) bounds LP columns by it and writes point models into a copy of it, and [bisect](IntervalBox::bisect) splits it for the optimization search.
*/

use std::collections::HashMap;

use num_traits::One;

use crate::{
    rational::Rational,
    symbolic::{Variable, VariableKind},
};

/// An endpoint in ℚ ∪ {−∞, +∞}.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Endpoint {
    /// −∞.
    NegInfty,

    /// A finite rational endpoint.
    Finite(Rational),

    /// +∞.
    PosInfty,
}

impl Endpoint {
    /// The finite value of the endpoint, if any.
    pub fn finite(&self) -> Option<&Rational> {
        match self {
            Endpoint::Finite(value) => Some(value),
            _ => None,
        }
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Endpoint::NegInfty => write!(f, "-inf"),
            Endpoint::Finite(value) => write!(f, "{value}"),
            Endpoint::PosInfty => write!(f, "inf"),
        }
    }
}

/// A closed interval with endpoints in ℚ ∪ {−∞, +∞}.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Interval {
    lb: Endpoint,
    ub: Endpoint,
}

impl Default for Interval {
    /// The unbounded interval.
    fn default() -> Self {
        Interval {
            lb: Endpoint::NegInfty,
            ub: Endpoint::PosInfty,
        }
    }
}

impl Interval {
    /// The interval `[lb, ub]`.
    pub fn new(lb: Endpoint, ub: Endpoint) -> Self {
        Interval { lb, ub }
    }

    /// The degenerate interval `[value, value]`.
    pub fn point(value: Rational) -> Self {
        Interval {
            lb: Endpoint::Finite(value.clone()),
            ub: Endpoint::Finite(value),
        }
    }

    /// The lower endpoint.
    pub fn lb(&self) -> &Endpoint {
        &self.lb
    }

    /// The upper endpoint.
    pub fn ub(&self) -> &Endpoint {
        &self.ub
    }

    /// True if the bounds have crossed.
    pub fn is_inverted(&self) -> bool {
        match (&self.lb, &self.ub) {
            (Endpoint::Finite(lb), Endpoint::Finite(ub)) => lb > ub,
            (Endpoint::PosInfty, _) | (_, Endpoint::NegInfty) => true,
            _ => false,
        }
    }

    /// True if the interval is a single point.
    pub fn is_point(&self) -> bool {
        match (&self.lb, &self.ub) {
            (Endpoint::Finite(lb), Endpoint::Finite(ub)) => lb == ub,
            _ => false,
        }
    }

    /// True if `value` lies within the interval.
    pub fn contains(&self, value: &Rational) -> bool {
        let above_lb = match &self.lb {
            Endpoint::NegInfty => true,
            Endpoint::Finite(lb) => lb <= value,
            Endpoint::PosInfty => false,
        };
        let below_ub = match &self.ub {
            Endpoint::NegInfty => false,
            Endpoint::Finite(ub) => value <= ub,
            Endpoint::PosInfty => true,
        };
        above_lb && below_ub
    }

    /// True if the interval lies within `other`.
    pub fn subset_of(&self, other: &Interval) -> bool {
        self.lb >= other.lb && self.ub <= other.ub
    }

    /// The midpoint of a bounded interval.
    pub fn midpoint(&self) -> Option<Rational> {
        match (&self.lb, &self.ub) {
            (Endpoint::Finite(lb), Endpoint::Finite(ub)) => {
                Some((lb + ub) / Rational::from_integer(2.into()))
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.lb, self.ub)
    }
}

/// A product of intervals, one per declared numeric variable.
#[derive(Clone, Debug, Default)]
pub struct IntervalBox {
    variables: Vec<Variable>,
    intervals: Vec<Interval>,
    index: HashMap<Variable, usize>,
    empty: bool,
}

impl IntervalBox {
    /// An empty product --- no variables, not the empty-set sentinel.
    pub fn new() -> Self {
        IntervalBox::default()
    }

    /// Declares `variable` with an initial interval suiting its kind.
    ///
    /// Binary variables start at `[0, 1]`, everything else unbounded. Re-declaration is a no-op.
    pub fn declare(&mut self, variable: &Variable) {
        if self.index.contains_key(variable) {
            return;
        }
        let interval = match variable.kind() {
            VariableKind::Binary => Interval::new(
                Endpoint::Finite(Rational::from_integer(0.into())),
                Endpoint::Finite(Rational::one()),
            ),
            _ => Interval::default(),
        };
        self.index.insert(variable.clone(), self.variables.len());
        self.variables.push(variable.clone());
        self.intervals.push(interval);
    }

    /// True if `variable` has been declared.
    pub fn declares(&self, variable: &Variable) -> bool {
        self.index.contains_key(variable)
    }

    /// The declared variables, in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// The number of declared variables.
    pub fn size(&self) -> usize {
        self.variables.len()
    }

    /// The interval of `variable`, if declared.
    pub fn interval(&self, variable: &Variable) -> Option<&Interval> {
        self.index.get(variable).map(|i| &self.intervals[*i])
    }

    /// Replaces the interval of `variable`, emptying the box if the bounds crossed.
    pub fn set_interval(&mut self, variable: &Variable, interval: Interval) {
        if interval.is_inverted() {
            self.set_empty();
            return;
        }
        if let Some(i) = self.index.get(variable) {
            self.intervals[*i] = interval;
        }
    }

    /// Marks the box as the empty set.
    pub fn set_empty(&mut self) {
        self.empty = true;
    }

    /// True if the box is the empty set.
    pub fn is_empty(&self) -> bool {
        self.empty
    }

    /// True if the point assignment lies within the box.
    ///
    /// Variables absent from `point` are unconstrained.
    pub fn contains(&self, point: &HashMap<Variable, Rational>) -> bool {
        if self.empty {
            return false;
        }
        point.iter().all(|(variable, value)| {
            self.interval(variable)
                .is_none_or(|interval| interval.contains(value))
        })
    }

    /// True if every interval of the box lies within the matching interval of `other`.
    pub fn subset_of(&self, other: &IntervalBox) -> bool {
        if self.empty {
            return true;
        }
        if other.empty {
            return false;
        }
        self.variables.iter().all(|variable| {
            match (self.interval(variable), other.interval(variable)) {
                (Some(ours), Some(theirs)) => ours.subset_of(theirs),
                _ => true,
            }
        })
    }

    /// Splits the box at the midpoint of dimension `variable`.
    ///
    /// For integer-kind dimensions the split preserves integrality: left keeps `[lb, ⌊mid⌋]`, right `[⌊mid⌋ + 1, ub]`.
    /// `None` for an unbounded or degenerate dimension, or when an integral dimension has no room to split.
    pub fn bisect(&self, variable: &Variable) -> Option<(IntervalBox, IntervalBox)> {
        if self.empty {
            return None;
        }
        let interval = self.interval(variable)?;
        let mid = interval.midpoint()?;
        if interval.is_point() {
            return None;
        }

        let (left_ub, right_lb) = if variable.is_integral() {
            let floor = mid.floor();
            let next = &floor + Rational::one();
            if !interval.contains(&floor) || !interval.contains(&next) {
                return None;
            }
            (floor, next)
        } else {
            (mid.clone(), mid)
        };

        let mut left = self.clone();
        let mut right = self.clone();
        left.set_interval(
            variable,
            Interval::new(interval.lb().clone(), Endpoint::Finite(left_ub)),
        );
        right.set_interval(
            variable,
            Interval::new(Endpoint::Finite(right_lb), interval.ub().clone()),
        );
        Some((left, right))
    }
}

impl std::fmt::Display for IntervalBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.empty {
            return write!(f, "empty");
        }
        for (i, variable) in self.variables.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{} : {}", variable.name(), self.intervals[i])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn real(name: &str) -> Variable {
        Variable::new(name, VariableKind::Continuous)
    }

    fn q(n: i64) -> Rational {
        Rational::from_integer(n.into())
    }

    #[test]
    fn declare_and_tighten() {
        let mut b = IntervalBox::new();
        let x = real("x");
        b.declare(&x);
        assert!(b.interval(&x).unwrap().contains(&q(1000)));

        b.set_interval(&x, Interval::new(Endpoint::Finite(q(0)), Endpoint::Finite(q(5))));
        assert!(b.interval(&x).unwrap().contains(&q(5)));
        assert!(!b.interval(&x).unwrap().contains(&q(6)));
    }

    #[test]
    fn inverted_bounds_empty_the_box() {
        let mut b = IntervalBox::new();
        let x = real("x");
        b.declare(&x);
        b.set_interval(&x, Interval::new(Endpoint::Finite(q(3)), Endpoint::Finite(q(2))));
        assert!(b.is_empty());
    }

    #[test]
    fn bisect_real() {
        let mut b = IntervalBox::new();
        let x = real("x");
        b.declare(&x);
        b.set_interval(&x, Interval::new(Endpoint::Finite(q(0)), Endpoint::Finite(q(4))));

        let (left, right) = b.bisect(&x).unwrap();
        assert_eq!(left.interval(&x).unwrap().ub().finite(), Some(&q(2)));
        assert_eq!(right.interval(&x).unwrap().lb().finite(), Some(&q(2)));
    }

    #[test]
    fn bisect_integer_preserves_integrality() {
        let mut b = IntervalBox::new();
        let n = Variable::new("n", VariableKind::Integer);
        b.declare(&n);
        b.set_interval(&n, Interval::new(Endpoint::Finite(q(0)), Endpoint::Finite(q(5))));

        let (left, right) = b.bisect(&n).unwrap();
        assert_eq!(left.interval(&n).unwrap().ub().finite(), Some(&q(2)));
        assert_eq!(right.interval(&n).unwrap().lb().finite(), Some(&q(3)));
    }

    #[test]
    fn binary_starts_unit() {
        let mut b = IntervalBox::new();
        let flag = Variable::new("flag", VariableKind::Binary);
        b.declare(&flag);
        assert!(!b.interval(&flag).unwrap().contains(&q(2)));
        assert!(b.interval(&flag).unwrap().contains(&q(1)));
    }
}
