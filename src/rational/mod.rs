/*!
Exact numerics: arbitrary-precision rationals and the active infinity sentinels.

The theory side of the solver works in exact arithmetic throughout, with [Rational] an alias for an arbitrary-precision rational.
Doubles appear in two places only, both at the boundary:

- Externalising box endpoints, with directed rounding ([to_f64_toward_pos], [to_f64_toward_neg]).
- Tightening a strict real bound to the next representable double past the bound ([next_double_above], [next_double_below]).

# The active infinity

LP backends take every bound, coefficient, and RHS as a finite rational, with a pair of published sentinel values standing in for ±∞.
A row is disabled, for example, by giving it sense `G` and the negative sentinel as RHS.
The sentinels are process-wide state with an `init → use → finish` lifecycle: [infty_start] publishes a pair before any rows are created, [infty_finish] retracts it, and [InftyGuard] is the scoped form which guarantees retraction on every exit path.

The contract for backends is that no *finite* value may have magnitude at least the active infinity; the [theory solver](crate::solver::theory) rejects such values before they reach a backend.
*/

use std::sync::Mutex;

use num_traits::{One, Signed, ToPrimitive, Zero};

/// An arbitrary-precision rational.
pub type Rational = num_rational::BigRational;

/// The default sentinel magnitude, the `infinity` constant of rational LP codes.
const DEFAULT_INFTY: f64 = 1e100;

static ACTIVE_INFTY: Mutex<(usize, Option<(Rational, Rational)>)> = Mutex::new((0, None));

/// Publishes the active infinity sentinels.
///
/// The first publication in a nest of `start`/`finish` pairs fixes the pair; later publications are counted but otherwise ignored.
pub fn infty_start(pos: Rational, neg: Rational) {
    let mut active = ACTIVE_INFTY.lock().unwrap_or_else(|e| e.into_inner());
    active.0 += 1;
    if active.1.is_none() {
        active.1 = Some((pos, neg));
    }
}

/// Retracts one publication of the active infinity sentinels, clearing them when none remain.
pub fn infty_finish() {
    let mut active = ACTIVE_INFTY.lock().unwrap_or_else(|e| e.into_inner());
    active.0 = active.0.saturating_sub(1);
    if active.0 == 0 {
        active.1 = None;
    }
}

/// The active positive infinity sentinel, or the default when none is published.
pub fn infty() -> Rational {
    let active = ACTIVE_INFTY.lock().unwrap_or_else(|e| e.into_inner());
    match &active.1 {
        Some((pos, _)) => pos.clone(),
        None => Rational::from_float(DEFAULT_INFTY).unwrap_or_else(Rational::zero),
    }
}

/// The active negative infinity sentinel, or the default when none is published.
pub fn ninfty() -> Rational {
    let active = ACTIVE_INFTY.lock().unwrap_or_else(|e| e.into_inner());
    match &active.1 {
        Some((_, neg)) => neg.clone(),
        None => Rational::from_float(-DEFAULT_INFTY).unwrap_or_else(Rational::zero),
    }
}

/// Scoped publication of the active infinity sentinels.
///
/// Construction publishes, drop retracts --- including on panics and early error returns.
pub struct InftyGuard {
    _private: (),
}

impl InftyGuard {
    /// Publishes the given sentinel pair for the lifetime of the guard.
    pub fn new(pos: Rational, neg: Rational) -> Self {
        infty_start(pos, neg);
        InftyGuard { _private: () }
    }
}

impl Default for InftyGuard {
    /// Publishes the default sentinel pair for the lifetime of the guard.
    fn default() -> Self {
        let pos = Rational::from_float(DEFAULT_INFTY).unwrap_or_else(Rational::zero);
        InftyGuard::new(pos.clone(), -pos)
    }
}

impl Drop for InftyGuard {
    fn drop(&mut self) {
        infty_finish();
    }
}

/// Reads a rational from an SMT-LIB2 numeral or decimal, e.g. `7`, `2.5`, `-0.125`.
pub fn from_decimal(s: &str) -> Option<Rational> {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, s),
    };

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    let mut numer = num_bigint::BigInt::zero();
    for c in whole.chars().chain(frac.chars()) {
        numer = numer * 10 + (c as u8 - b'0');
    }

    let mut denom = num_bigint::BigInt::one();
    for _ in 0..frac.len() {
        denom = denom * 10;
    }
    Some(Rational::new(numer * sign, denom))
}

/// A nearest-double approximation of `q`, accurate to within a few ulp.
fn approximate(q: &Rational) -> f64 {
    let numer = q.numer().to_f64().unwrap_or(if q.is_negative() {
        f64::NEG_INFINITY
    } else {
        f64::INFINITY
    });
    let denom = q.denom().to_f64().unwrap_or(f64::INFINITY);
    numer / denom
}

/// The least double `f` with `f ≥ q`, rounding toward +∞.
pub fn to_f64_toward_pos(q: &Rational) -> f64 {
    let mut f = approximate(q);
    if !f.is_finite() {
        return f;
    }
    while Rational::from_float(f).is_some_and(|r| &r < q) {
        f = f.next_up();
    }
    loop {
        let down = f.next_down();
        match Rational::from_float(down) {
            Some(r) if &r >= q => f = down,
            _ => break,
        }
    }
    f
}

/// The greatest double `f` with `f ≤ q`, rounding toward −∞.
pub fn to_f64_toward_neg(q: &Rational) -> f64 {
    -to_f64_toward_pos(&-q.clone())
}

/// The least representable double strictly above `q`, as a rational.
///
/// `None` when no finite double lies strictly above `q`.
pub fn next_double_above(q: &Rational) -> Option<Rational> {
    let f = to_f64_toward_pos(q);
    if !f.is_finite() {
        return None;
    }
    let at_or_above = Rational::from_float(f)?;
    if &at_or_above > q {
        Some(at_or_above)
    } else {
        Rational::from_float(f.next_up())
    }
}

/// The greatest representable double strictly below `q`, as a rational.
pub fn next_double_below(q: &Rational) -> Option<Rational> {
    next_double_above(&-q.clone()).map(|r| -r)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals() {
        assert_eq!(from_decimal("7"), Some(Rational::from_integer(7.into())));
        assert_eq!(from_decimal("2.5"), Some(Rational::new(5.into(), 2.into())));
        assert_eq!(
            from_decimal("-0.125"),
            Some(Rational::new((-1).into(), 8.into()))
        );
        assert_eq!(from_decimal(""), None);
        assert_eq!(from_decimal("1.2.3"), None);
    }

    #[test]
    fn directed_rounding() {
        let third = Rational::new(1.into(), 3.into());
        let up = to_f64_toward_pos(&third);
        let down = to_f64_toward_neg(&third);
        assert!(Rational::from_float(up).unwrap() >= third);
        assert!(Rational::from_float(down).unwrap() <= third);
        assert_eq!(up, down.next_up());
    }

    #[test]
    fn exactly_representable() {
        let half = Rational::new(1.into(), 2.into());
        assert_eq!(to_f64_toward_pos(&half), 0.5);
        assert_eq!(to_f64_toward_neg(&half), 0.5);
    }

    #[test]
    fn next_doubles() {
        let two = Rational::from_integer(2.into());
        let above = next_double_above(&two).unwrap();
        let below = next_double_below(&two).unwrap();
        assert!(above > two);
        assert!(below < two);
        assert_eq!(above, Rational::from_float(2f64.next_up()).unwrap());
        assert_eq!(below, Rational::from_float(2f64.next_down()).unwrap());
    }

    #[test]
    fn sentinel_lifecycle() {
        let pos = Rational::from_integer(1000.into());
        {
            let _guard = InftyGuard::new(pos.clone(), -pos.clone());
            assert_eq!(infty(), pos);
            assert_eq!(ninfty(), -pos.clone());
        }
    }
}
