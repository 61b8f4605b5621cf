/*!
Hash-consed formulas over expressions and Boolean variables.

Conjunction and disjunction operands are de-duplicated, order-irrelevant sets, flattened at construction; negation is kept shallow and pushed toward atoms only where clause emission needs it.
Relational constructors fold when both sides are constant or structurally identical, so `(= x x)` is simply `true`.
*/

use std::{
    collections::BTreeSet,
    hash::{Hash, Hasher},
    sync::{Arc, LazyLock, Mutex},
};

use crate::symbolic::{intern::Interner, Expression, Variable};

/// The kinds of formula.
#[derive(Clone, Debug, PartialEq, Hash)]
pub enum FormulaKind {
    /// The unsatisfiable formula.
    False,

    /// The valid formula.
    True,

    /// A Boolean variable.
    Variable(Variable),

    /// `lhs = rhs`.
    Equal(Expression, Expression),

    /// `lhs ≠ rhs`.
    NotEqual(Expression, Expression),

    /// `lhs > rhs`.
    Greater(Expression, Expression),

    /// `lhs ≥ rhs`.
    GreaterEqual(Expression, Expression),

    /// `lhs < rhs`.
    Less(Expression, Expression),

    /// `lhs ≤ rhs`.
    LessEqual(Expression, Expression),

    /// A conjunction over a set of operands.
    Conjunction(BTreeSet<Formula>),

    /// A disjunction over a set of operands.
    Disjunction(BTreeSet<Formula>),

    /// A negation.
    Negation(Formula),

    /// A universally quantified formula. Outside the supported fragment, carried for completeness.
    Forall(Vec<Variable>, Formula),
}

pub(crate) struct FormulaNode {
    pub id: u64,
    pub hash: u64,
    pub kind: FormulaKind,
}

static FORMULAS: LazyLock<Mutex<Interner<FormulaNode>>> =
    LazyLock::new(|| Mutex::new(Interner::new()));

pub(crate) fn clear_formula_cache() {
    FORMULAS.lock().unwrap_or_else(|e| e.into_inner()).clear();
}

/// A hash-consed formula.
#[derive(Clone)]
pub struct Formula {
    node: Arc<FormulaNode>,
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.node.id == other.node.id
    }
}

impl Eq for Formula {}

impl PartialOrd for Formula {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Formula {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.node.id.cmp(&other.node.id)
    }
}

impl Hash for Formula {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.node.id.hash(state);
    }
}

impl std::fmt::Debug for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", crate::symbolic::prefix::to_prefix_formula(self))
    }
}

fn intern(kind: FormulaKind) -> Formula {
    let mut hasher = std::hash::DefaultHasher::new();
    kind.hash(&mut hasher);
    let hash = hasher.finish();

    let kind_for_cmp = kind.clone();
    let node = FORMULAS
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .intern(hash, |n| n.kind == kind_for_cmp, |id| FormulaNode { id, hash, kind });

    Formula { node }
}

/// Builds a relational formula, folding constant and identical operands.
fn relational(
    lhs: Expression,
    rhs: Expression,
    holds_on_equal: bool,
    compare: fn(&crate::rational::Rational, &crate::rational::Rational) -> bool,
    kind: fn(Expression, Expression) -> FormulaKind,
) -> Formula {
    if lhs == rhs {
        return if holds_on_equal {
            Formula::top()
        } else {
            Formula::bottom()
        };
    }
    if let (Some(l), Some(r)) = (lhs.to_constant(), rhs.to_constant()) {
        return if compare(l, r) {
            Formula::top()
        } else {
            Formula::bottom()
        };
    }
    intern(kind(lhs, rhs))
}

impl Formula {
    /// The kind of the formula.
    pub fn kind(&self) -> &FormulaKind {
        &self.node.kind
    }

    /// The structural hash of the formula.
    pub fn structural_hash(&self) -> u64 {
        self.node.hash
    }

    /// The valid formula.
    pub fn top() -> Self {
        intern(FormulaKind::True)
    }

    /// The unsatisfiable formula.
    pub fn bottom() -> Self {
        intern(FormulaKind::False)
    }

    /// A Boolean variable as a formula.
    pub fn boolean(variable: Variable) -> Self {
        intern(FormulaKind::Variable(variable))
    }

    /// `lhs = rhs`.
    pub fn eq(lhs: Expression, rhs: Expression) -> Self {
        relational(lhs, rhs, true, |l, r| l == r, FormulaKind::Equal)
    }

    /// `lhs ≠ rhs`.
    pub fn neq(lhs: Expression, rhs: Expression) -> Self {
        relational(lhs, rhs, false, |l, r| l != r, FormulaKind::NotEqual)
    }

    /// `lhs > rhs`.
    pub fn gt(lhs: Expression, rhs: Expression) -> Self {
        relational(lhs, rhs, false, |l, r| l > r, FormulaKind::Greater)
    }

    /// `lhs ≥ rhs`.
    pub fn geq(lhs: Expression, rhs: Expression) -> Self {
        relational(lhs, rhs, true, |l, r| l >= r, FormulaKind::GreaterEqual)
    }

    /// `lhs < rhs`.
    pub fn lt(lhs: Expression, rhs: Expression) -> Self {
        relational(lhs, rhs, false, |l, r| l < r, FormulaKind::Less)
    }

    /// `lhs ≤ rhs`.
    pub fn leq(lhs: Expression, rhs: Expression) -> Self {
        relational(lhs, rhs, true, |l, r| l <= r, FormulaKind::LessEqual)
    }

    /// The conjunction of the given formulas, flattened and de-duplicated.
    pub fn and(operands: impl IntoIterator<Item = Formula>) -> Self {
        let mut set = BTreeSet::new();
        for operand in operands {
            match operand.kind() {
                FormulaKind::True => {}
                FormulaKind::False => return Formula::bottom(),
                FormulaKind::Conjunction(inner) => set.extend(inner.iter().cloned()),
                _ => {
                    set.insert(operand);
                }
            }
        }
        match set.len() {
            0 => Formula::top(),
            1 => set.into_iter().next().unwrap_or_else(|| unreachable!()),
            _ => intern(FormulaKind::Conjunction(set)),
        }
    }

    /// The disjunction of the given formulas, flattened and de-duplicated.
    pub fn or(operands: impl IntoIterator<Item = Formula>) -> Self {
        let mut set = BTreeSet::new();
        for operand in operands {
            match operand.kind() {
                FormulaKind::False => {}
                FormulaKind::True => return Formula::top(),
                FormulaKind::Disjunction(inner) => set.extend(inner.iter().cloned()),
                _ => {
                    set.insert(operand);
                }
            }
        }
        match set.len() {
            0 => Formula::bottom(),
            1 => set.into_iter().next().unwrap_or_else(|| unreachable!()),
            _ => intern(FormulaKind::Disjunction(set)),
        }
    }

    /// The negation of the formula, with double negations removed.
    pub fn not(operand: Formula) -> Self {
        match operand.kind() {
            FormulaKind::True => Formula::bottom(),
            FormulaKind::False => Formula::top(),
            FormulaKind::Negation(inner) => inner.clone(),
            _ => intern(FormulaKind::Negation(operand)),
        }
    }

    /// `antecedent ⇒ consequent`.
    pub fn implies(antecedent: Formula, consequent: Formula) -> Self {
        Formula::or([Formula::not(antecedent), consequent])
    }

    /// A universally quantified formula.
    pub fn forall(variables: Vec<Variable>, body: Formula) -> Self {
        intern(FormulaKind::Forall(variables, body))
    }

    /// The negation pushed through the outermost connective.
    ///
    /// Relational atoms flip their operator, conjunction and disjunction step through De Morgan, and Boolean leaves gain a shallow negation.
    pub fn negated(&self) -> Formula {
        match self.kind() {
            FormulaKind::False => Formula::top(),
            FormulaKind::True => Formula::bottom(),
            FormulaKind::Variable(_) | FormulaKind::Forall(..) => Formula::not(self.clone()),
            FormulaKind::Equal(l, r) => Formula::neq(l.clone(), r.clone()),
            FormulaKind::NotEqual(l, r) => Formula::eq(l.clone(), r.clone()),
            FormulaKind::Greater(l, r) => Formula::leq(l.clone(), r.clone()),
            FormulaKind::GreaterEqual(l, r) => Formula::lt(l.clone(), r.clone()),
            FormulaKind::Less(l, r) => Formula::geq(l.clone(), r.clone()),
            FormulaKind::LessEqual(l, r) => Formula::gt(l.clone(), r.clone()),
            FormulaKind::Conjunction(operands) => {
                Formula::or(operands.iter().map(|f| f.negated()))
            }
            FormulaKind::Disjunction(operands) => {
                Formula::and(operands.iter().map(|f| f.negated()))
            }
            FormulaKind::Negation(inner) => inner.clone(),
        }
    }

    /// True if the formula is a relational atom.
    pub fn is_relational(&self) -> bool {
        matches!(
            self.kind(),
            FormulaKind::Equal(..)
                | FormulaKind::NotEqual(..)
                | FormulaKind::Greater(..)
                | FormulaKind::GreaterEqual(..)
                | FormulaKind::Less(..)
                | FormulaKind::LessEqual(..)
        )
    }

    /// True if the formula is a Boolean variable.
    pub fn is_variable(&self) -> bool {
        matches!(self.kind(), FormulaKind::Variable(_))
    }

    /// The Boolean variable of a variable formula.
    pub fn to_variable(&self) -> Option<&Variable> {
        match self.kind() {
            FormulaKind::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    /// The left operand of a relational atom.
    pub fn lhs(&self) -> Option<&Expression> {
        self.relational_operands().map(|(lhs, _)| lhs)
    }

    /// The right operand of a relational atom.
    pub fn rhs(&self) -> Option<&Expression> {
        self.relational_operands().map(|(_, rhs)| rhs)
    }

    /// Both operands of a relational atom.
    pub fn relational_operands(&self) -> Option<(&Expression, &Expression)> {
        match self.kind() {
            FormulaKind::Equal(l, r)
            | FormulaKind::NotEqual(l, r)
            | FormulaKind::Greater(l, r)
            | FormulaKind::GreaterEqual(l, r)
            | FormulaKind::Less(l, r)
            | FormulaKind::LessEqual(l, r) => Some((l, r)),
            _ => None,
        }
    }

    /// The operand set of a conjunction or disjunction.
    pub fn operands(&self) -> Option<&BTreeSet<Formula>> {
        match self.kind() {
            FormulaKind::Conjunction(operands) | FormulaKind::Disjunction(operands) => {
                Some(operands)
            }
            _ => None,
        }
    }

    /// The operand of a negation.
    pub fn operand(&self) -> Option<&Formula> {
        match self.kind() {
            FormulaKind::Negation(inner) => Some(inner),
            _ => None,
        }
    }

    /// The free variables of the formula, numeric and Boolean alike.
    pub fn free_variables(&self) -> BTreeSet<Variable> {
        let mut collected = BTreeSet::new();
        self.collect_free_variables(&mut collected);
        collected
    }

    fn collect_free_variables(&self, collected: &mut BTreeSet<Variable>) {
        match self.kind() {
            FormulaKind::False | FormulaKind::True => {}
            FormulaKind::Variable(variable) => {
                collected.insert(variable.clone());
            }
            FormulaKind::Equal(l, r)
            | FormulaKind::NotEqual(l, r)
            | FormulaKind::Greater(l, r)
            | FormulaKind::GreaterEqual(l, r)
            | FormulaKind::Less(l, r)
            | FormulaKind::LessEqual(l, r) => {
                l.collect_variables(collected);
                r.collect_variables(collected);
            }
            FormulaKind::Conjunction(operands) | FormulaKind::Disjunction(operands) => {
                for operand in operands {
                    operand.collect_free_variables(collected);
                }
            }
            FormulaKind::Negation(inner) => inner.collect_free_variables(collected),
            FormulaKind::Forall(bound, body) => {
                let mut inner = BTreeSet::new();
                body.collect_free_variables(&mut inner);
                for variable in bound {
                    inner.remove(variable);
                }
                collected.extend(inner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::VariableKind;

    fn x() -> Expression {
        Expression::from(Variable::new("x", VariableKind::Continuous))
    }

    #[test]
    fn constant_relations_fold() {
        assert_eq!(
            Formula::lt(Expression::integer(1), Expression::integer(2)),
            Formula::top()
        );
        assert_eq!(
            Formula::eq(Expression::integer(1), Expression::integer(2)),
            Formula::bottom()
        );
        let e = x();
        assert_eq!(Formula::eq(e.clone(), e), Formula::top());
    }

    #[test]
    fn connectives_normalise() {
        let atom = Formula::geq(x(), Expression::integer(0));
        assert_eq!(Formula::and([atom.clone(), Formula::top()]), atom);
        assert_eq!(
            Formula::and([atom.clone(), Formula::bottom()]),
            Formula::bottom()
        );
        assert_eq!(Formula::or([atom.clone(), atom.clone()]), atom);
        assert_eq!(Formula::not(Formula::not(atom.clone())), atom);
    }

    #[test]
    fn negation_flips_relations() {
        let lhs = x();
        let f = Formula::lt(lhs.clone(), Expression::integer(3));
        assert_eq!(f.negated(), Formula::geq(lhs, Expression::integer(3)));
        assert_eq!(f.negated().negated(), f);
    }
}
