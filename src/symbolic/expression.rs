/*!
Hash-consed algebraic expressions over variables and exact rational constants.

An [Expression] is a cheap handle to an interned node, so structurally equal expressions share one node and compare in constant time.
Additions and multiplications are kept in canonical form at construction:

- An addition is a constant term plus a map from sub-expression to non-zero coefficient.
- A multiplication is a constant factor times a map from base to exponent, with no unit factors.

Constants fold, nested sums flatten, and a constant times a sum distributes, so `(x + 1) * 2 - 2` and `2 * x` are the same node.

Transcendental wrappers, division, if-then-else, and uninterpreted functions are carried for completeness of the term language; none of them is linear, and each is a hard error if it survives to LP row construction.
*/

use std::{
    collections::{BTreeMap, BTreeSet},
    hash::{Hash, Hasher},
    sync::{Arc, LazyLock, Mutex},
};

use num_traits::{One, ToPrimitive, Zero};

use crate::{
    rational::Rational,
    symbolic::{intern::Interner, Formula, Variable},
};

/// A unary function wrapper. Present in the term language, outside the linear fragment.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub enum UnaryFunction {
    Log,
    Abs,
    Exp,
    Sqrt,
    Sin,
    Cos,
    Tan,
}

impl UnaryFunction {
    /// The SMT-LIB2 name of the function.
    pub fn name(self) -> &'static str {
        match self {
            Self::Log => "log",
            Self::Abs => "abs",
            Self::Exp => "exp",
            Self::Sqrt => "sqrt",
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
        }
    }
}

/// The kinds of expression.
#[derive(Clone, Debug, PartialEq, Hash)]
pub enum ExpressionKind {
    /// An exact rational constant.
    Constant(Rational),

    /// A variable.
    Variable(Variable),

    /// A canonical sum: a constant term plus coefficient-weighted sub-expressions.
    Addition {
        constant: Rational,
        terms: BTreeMap<Expression, Rational>,
    },

    /// A canonical product: a constant factor times base-to-exponent pairs.
    Multiplication {
        constant: Rational,
        factors: BTreeMap<Expression, Expression>,
    },

    /// A quotient of two expressions.
    Division(Expression, Expression),

    /// A unary function application.
    Unary(UnaryFunction, Expression),

    /// A conditional expression.
    IfThenElse(Formula, Expression, Expression),

    /// An application of an uninterpreted function.
    UninterpretedFunction(String, Vec<Expression>),
}

pub(crate) struct ExpressionNode {
    pub id: u64,
    pub hash: u64,
    pub kind: ExpressionKind,
}

static EXPRESSIONS: LazyLock<Mutex<Interner<ExpressionNode>>> =
    LazyLock::new(|| Mutex::new(Interner::new()));

pub(crate) fn clear_expression_cache() {
    EXPRESSIONS
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .clear();
}

/// A hash-consed expression.
#[derive(Clone)]
pub struct Expression {
    node: Arc<ExpressionNode>,
}

impl PartialEq for Expression {
    fn eq(&self, other: &Self) -> bool {
        self.node.id == other.node.id
    }
}

impl Eq for Expression {}

impl PartialOrd for Expression {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Expression {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.node.id.cmp(&other.node.id)
    }
}

impl Hash for Expression {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.id.hash(state);
    }
}

impl std::fmt::Debug for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::fmt::Display for Expression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::symbolic::prefix::to_prefix_expression(self))
    }
}

fn intern(kind: ExpressionKind) -> Expression {
    let mut hasher = std::hash::DefaultHasher::new();
    kind.hash(&mut hasher);
    let hash = hasher.finish();

    let kind_for_cmp = kind.clone();
    let node = EXPRESSIONS
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .intern(hash, |n| n.kind == kind_for_cmp, |id| ExpressionNode { id, hash, kind });

    Expression { node }
}

impl Expression {
    /// The kind of the expression.
    pub fn kind(&self) -> &ExpressionKind {
        &self.node.kind
    }

    /// The structural hash of the expression.
    pub fn structural_hash(&self) -> u64 {
        self.node.hash
    }

    /// A constant expression.
    pub fn constant(value: Rational) -> Self {
        intern(ExpressionKind::Constant(value))
    }

    /// A constant expression from an integer.
    pub fn integer(value: i64) -> Self {
        Self::constant(Rational::from_integer(value.into()))
    }

    /// The zero constant.
    pub fn zero() -> Self {
        Self::integer(0)
    }

    /// A quotient. Constant operands with a non-zero divisor fold to a constant.
    pub fn division(numerator: Expression, denominator: Expression) -> Self {
        if let (ExpressionKind::Constant(n), ExpressionKind::Constant(d)) =
            (numerator.kind(), denominator.kind())
        {
            if !d.is_zero() {
                return Self::constant(n / d);
            }
        }
        intern(ExpressionKind::Division(numerator, denominator))
    }

    /// A unary function application.
    pub fn unary(function: UnaryFunction, argument: Expression) -> Self {
        intern(ExpressionKind::Unary(function, argument))
    }

    /// A conditional expression.
    pub fn if_then_else(condition: Formula, then: Expression, otherwise: Expression) -> Self {
        intern(ExpressionKind::IfThenElse(condition, then, otherwise))
    }

    /// An application of an uninterpreted function.
    pub fn uninterpreted(name: impl Into<String>, arguments: Vec<Expression>) -> Self {
        intern(ExpressionKind::UninterpretedFunction(name.into(), arguments))
    }

    /// True if the expression is a constant.
    pub fn is_constant(&self) -> bool {
        matches!(self.kind(), ExpressionKind::Constant(_))
    }

    /// True if the expression is a variable.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind(), ExpressionKind::Variable(_))
    }

    /// True if the expression is a canonical sum.
    pub fn is_addition(&self) -> bool {
        matches!(self.kind(), ExpressionKind::Addition { .. })
    }

    /// True if the expression is a canonical product.
    pub fn is_multiplication(&self) -> bool {
        matches!(self.kind(), ExpressionKind::Multiplication { .. })
    }

    /// The value of a constant expression.
    pub fn to_constant(&self) -> Option<&Rational> {
        match self.kind() {
            ExpressionKind::Constant(value) => Some(value),
            _ => None,
        }
    }

    /// The variable of a variable expression.
    pub fn to_variable(&self) -> Option<&Variable> {
        match self.kind() {
            ExpressionKind::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    /// The term-to-coefficient map of a canonical sum.
    pub fn coefficient_map(&self) -> Option<&BTreeMap<Expression, Rational>> {
        match self.kind() {
            ExpressionKind::Addition { terms, .. } => Some(terms),
            _ => None,
        }
    }

    /// The constant term of a canonical sum.
    pub fn addition_constant(&self) -> Option<&Rational> {
        match self.kind() {
            ExpressionKind::Addition { constant, .. } => Some(constant),
            _ => None,
        }
    }

    /// The free variables of the expression, including those of any embedded condition.
    pub fn variables(&self) -> BTreeSet<Variable> {
        let mut collected = BTreeSet::new();
        self.collect_variables(&mut collected);
        collected
    }

    pub(crate) fn collect_variables(&self, collected: &mut BTreeSet<Variable>) {
        match self.kind() {
            ExpressionKind::Constant(_) => {}
            ExpressionKind::Variable(variable) => {
                collected.insert(variable.clone());
            }
            ExpressionKind::Addition { terms, .. } => {
                for term in terms.keys() {
                    term.collect_variables(collected);
                }
            }
            ExpressionKind::Multiplication { factors, .. } => {
                for (base, exponent) in factors {
                    base.collect_variables(collected);
                    exponent.collect_variables(collected);
                }
            }
            ExpressionKind::Division(numerator, denominator) => {
                numerator.collect_variables(collected);
                denominator.collect_variables(collected);
            }
            ExpressionKind::Unary(_, argument) => argument.collect_variables(collected),
            ExpressionKind::IfThenElse(condition, then, otherwise) => {
                for variable in condition.free_variables() {
                    collected.insert(variable);
                }
                then.collect_variables(collected);
                otherwise.collect_variables(collected);
            }
            ExpressionKind::UninterpretedFunction(_, arguments) => {
                for argument in arguments {
                    argument.collect_variables(collected);
                }
            }
        }
    }

    /// The sum of the given expressions, in canonical form.
    pub fn sum(operands: impl IntoIterator<Item = Expression>) -> Self {
        let mut constant = Rational::zero();
        let mut terms: BTreeMap<Expression, Rational> = BTreeMap::new();
        for operand in operands {
            accumulate(&operand, &Rational::one(), &mut constant, &mut terms);
        }
        from_parts(constant, terms)
    }

    /// The expression scaled by a rational constant.
    pub fn scale(&self, factor: &Rational) -> Self {
        if factor.is_zero() {
            return Self::zero();
        }
        if factor.is_one() {
            return self.clone();
        }
        match self.kind() {
            ExpressionKind::Constant(value) => Self::constant(value * factor),
            ExpressionKind::Addition { constant, terms } => {
                let scaled = terms
                    .iter()
                    .map(|(term, coefficient)| (term.clone(), coefficient * factor))
                    .collect();
                from_parts(constant * factor, scaled)
            }
            ExpressionKind::Multiplication { constant, factors } => {
                mul_from_parts(constant * factor, factors.clone())
            }
            _ => mul_from_parts(
                factor.clone(),
                BTreeMap::from([(self.clone(), Expression::integer(1))]),
            ),
        }
    }

    /// Distributes products over sums and flattens the result into canonical form.
    ///
    /// Products of non-constant factors are left in place; they are outside the linear fragment either way.
    pub fn expand(&self) -> Self {
        match self.kind() {
            ExpressionKind::Addition { constant, terms } => {
                let mut acc_constant = constant.clone();
                let mut acc_terms = BTreeMap::new();
                for (term, coefficient) in terms {
                    accumulate(
                        &term.expand(),
                        coefficient,
                        &mut acc_constant,
                        &mut acc_terms,
                    );
                }
                from_parts(acc_constant, acc_terms)
            }
            ExpressionKind::Multiplication { constant, factors } => {
                let mut product = Self::constant(constant.clone());
                for (base, exponent) in factors {
                    let base = base.expand();
                    let integral_exponent = exponent
                        .to_constant()
                        .filter(|e| e.is_integer())
                        .and_then(|e| e.to_i64());
                    match integral_exponent {
                        Some(n) if (1..=8).contains(&n) => {
                            for _ in 0..n {
                                product = distribute(&product, &base);
                            }
                        }
                        _ => {
                            product = product
                                * intern(ExpressionKind::Multiplication {
                                    constant: Rational::one(),
                                    factors: BTreeMap::from([(base, exponent.clone())]),
                                })
                        }
                    }
                }
                product
            }
            _ => self.clone(),
        }
    }
}

/// Folds `coefficient * operand` into a sum under construction.
fn accumulate(
    operand: &Expression,
    coefficient: &Rational,
    constant: &mut Rational,
    terms: &mut BTreeMap<Expression, Rational>,
) {
    if coefficient.is_zero() {
        return;
    }
    match operand.kind() {
        ExpressionKind::Constant(value) => *constant += value * coefficient,
        ExpressionKind::Addition {
            constant: inner_constant,
            terms: inner_terms,
        } => {
            *constant += inner_constant * coefficient;
            for (term, inner_coefficient) in inner_terms {
                merge_term(terms, term, &(inner_coefficient * coefficient));
            }
        }
        ExpressionKind::Multiplication {
            constant: inner_constant,
            factors,
        } => {
            // Pull the constant out of a product so x and 2x share a key.
            let scaled = coefficient * inner_constant;
            let single_base = match factors.iter().next() {
                Some((base, exponent))
                    if factors.len() == 1
                        && exponent.to_constant().is_some_and(|e| e.is_one()) =>
                {
                    Some(base.clone())
                }
                _ => None,
            };
            let key = match single_base {
                Some(base) => base,
                None if inner_constant.is_one() => operand.clone(),
                None => intern(ExpressionKind::Multiplication {
                    constant: Rational::one(),
                    factors: factors.clone(),
                }),
            };
            merge_term(terms, &key, &scaled);
        }
        _ => merge_term(terms, operand, coefficient),
    }
}

fn merge_term(terms: &mut BTreeMap<Expression, Rational>, term: &Expression, delta: &Rational) {
    let entry = terms.entry(term.clone()).or_insert_with(Rational::zero);
    *entry += delta;
    if entry.is_zero() {
        terms.remove(term);
    }
}

fn from_parts(constant: Rational, terms: BTreeMap<Expression, Rational>) -> Expression {
    if terms.is_empty() {
        return Expression::constant(constant);
    }
    if constant.is_zero() && terms.len() == 1 {
        // A lone weighted term is a product, not a sum; this keeps 3x a single node
        // whether it was built by scaling or by adding x and 2x.
        let (term, coefficient) = terms.iter().next().unwrap_or_else(|| unreachable!());
        return term.scale(coefficient);
    }
    intern(ExpressionKind::Addition { constant, terms })
}

/// Multiplies two expressions, distributing over any sum operand.
fn distribute(lhs: &Expression, rhs: &Expression) -> Expression {
    match (lhs.kind(), rhs.kind()) {
        (ExpressionKind::Constant(value), _) => rhs.scale(value),
        (_, ExpressionKind::Constant(value)) => lhs.scale(value),
        (ExpressionKind::Addition { constant, terms }, _) => {
            let mut operands = vec![rhs.scale(constant)];
            for (term, coefficient) in terms {
                operands.push(distribute(term, rhs).scale(coefficient));
            }
            Expression::sum(operands)
        }
        (_, ExpressionKind::Addition { .. }) => distribute(rhs, lhs),
        _ => multiply(lhs, rhs),
    }
}

/// Multiplies two non-sum, non-constant expressions by merging factor maps.
fn multiply(lhs: &Expression, rhs: &Expression) -> Expression {
    let mut constant = Rational::one();
    let mut factors: BTreeMap<Expression, Expression> = BTreeMap::new();

    for operand in [lhs, rhs] {
        match operand.kind() {
            ExpressionKind::Multiplication {
                constant: inner,
                factors: inner_factors,
            } => {
                constant *= inner;
                for (base, exponent) in inner_factors {
                    merge_factor(&mut factors, base, exponent);
                }
            }
            _ => merge_factor(&mut factors, operand, &Expression::integer(1)),
        }
    }

    mul_from_parts(constant, factors)
}

fn mul_from_parts(constant: Rational, factors: BTreeMap<Expression, Expression>) -> Expression {
    if factors.is_empty() || constant.is_zero() {
        return Expression::constant(constant);
    }
    if constant.is_one() && factors.len() == 1 {
        let (base, exponent) = factors.iter().next().unwrap_or_else(|| unreachable!());
        if exponent.to_constant().is_some_and(|e| e.is_one()) {
            return base.clone();
        }
    }
    intern(ExpressionKind::Multiplication { constant, factors })
}

fn merge_factor(
    factors: &mut BTreeMap<Expression, Expression>,
    base: &Expression,
    exponent: &Expression,
) {
    let merged = match factors.get(base) {
        Some(existing) => Expression::sum([existing.clone(), exponent.clone()]),
        None => exponent.clone(),
    };
    if merged.to_constant().is_some_and(|e| e.is_zero()) {
        factors.remove(base);
    } else {
        factors.insert(base.clone(), merged);
    }
}

impl From<&Variable> for Expression {
    fn from(variable: &Variable) -> Self {
        intern(ExpressionKind::Variable(variable.clone()))
    }
}

impl From<Variable> for Expression {
    fn from(variable: Variable) -> Self {
        intern(ExpressionKind::Variable(variable))
    }
}

impl std::ops::Add for Expression {
    type Output = Expression;

    fn add(self, rhs: Expression) -> Expression {
        Expression::sum([self, rhs])
    }
}

impl std::ops::Sub for Expression {
    type Output = Expression;

    fn sub(self, rhs: Expression) -> Expression {
        Expression::sum([self, rhs.scale(&-Rational::one())])
    }
}

impl std::ops::Neg for Expression {
    type Output = Expression;

    fn neg(self) -> Expression {
        self.scale(&-Rational::one())
    }
}

impl std::ops::Mul for Expression {
    type Output = Expression;

    fn mul(self, rhs: Expression) -> Expression {
        match (self.kind(), rhs.kind()) {
            (ExpressionKind::Constant(value), _) => rhs.scale(value),
            (_, ExpressionKind::Constant(value)) => self.scale(value),
            _ => multiply(&self, &rhs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::VariableKind;

    fn var(name: &str) -> Expression {
        Expression::from(Variable::new(name, VariableKind::Continuous))
    }

    #[test]
    fn constants_fold() {
        let e = Expression::integer(2) + Expression::integer(3);
        assert_eq!(e.to_constant(), Some(&Rational::from_integer(5.into())));
    }

    #[test]
    fn hash_consing_shares_nodes() {
        let x = var("x");
        let a = x.clone() + Expression::integer(1);
        let b = Expression::integer(1) + x;
        assert_eq!(a, b);
        assert_eq!(a.structural_hash(), b.structural_hash());
    }

    #[test]
    fn cancelling_terms_vanish() {
        let x = var("x");
        let e = x.clone() + Expression::integer(4) - x - Expression::integer(4);
        assert!(e.to_constant().is_some_and(|c| c.is_zero()));
    }

    #[test]
    fn scalar_multiplication_distributes() {
        let x = var("x");
        let e = (x.clone() + Expression::integer(1)).scale(&Rational::from_integer(2.into()));
        match e.kind() {
            ExpressionKind::Addition { constant, terms } => {
                assert_eq!(constant, &Rational::from_integer(2.into()));
                assert_eq!(terms.get(&x), Some(&Rational::from_integer(2.into())));
            }
            other => panic!("expected a canonical sum, got {other:?}"),
        }
    }

    #[test]
    fn coefficients_merge_through_products() {
        // x + 2x collapses to a single term with coefficient 3.
        let x = var("x");
        let two_x = x.clone().scale(&Rational::from_integer(2.into()));
        let e = x.clone() + two_x;
        match e.kind() {
            ExpressionKind::Multiplication { constant, factors } => {
                assert_eq!(constant, &Rational::from_integer(3.into()));
                assert_eq!(factors.len(), 1);
            }
            other => panic!("unexpected kind {other:?}"),
        }

        // Both construction orders intern to the same node.
        assert_eq!(e, x.scale(&Rational::from_integer(3.into())));
    }

    #[test]
    fn expand_distributes_sums() {
        let x = var("x");
        let y = var("y");
        let product = multiply(
            &(x.clone() + Expression::integer(1)),
            &(y.clone() + Expression::integer(2)),
        );
        let expanded = product.expand();
        match expanded.kind() {
            ExpressionKind::Addition { constant, terms } => {
                assert_eq!(constant, &Rational::from_integer(2.into()));
                assert_eq!(terms.get(&x), Some(&Rational::from_integer(2.into())));
                assert_eq!(terms.get(&y), Some(&Rational::from_integer(1.into())));
            }
            other => panic!("expected a canonical sum, got {other:?}"),
        }
    }
}
