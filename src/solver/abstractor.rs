/*!
Predicate abstraction: theory atoms become fresh Boolean proxies.

Each maximal theory atom of a formula is replaced by a Boolean proxy variable, memoized so the same atom maps to the same proxy for the life of the solve.
The inverse map is what the [theory solver](crate::solver::theory) later consults to recover the atom behind an enabled proxy.
*/

use std::collections::HashMap;

use crate::symbolic::{Formula, FormulaKind, Variable, VariableKind};

/// A memoized bijection between theory atoms and Boolean proxy variables.
#[derive(Default)]
pub struct PredicateAbstractor {
    var_to_formula: HashMap<Variable, Formula>,
    formula_to_var: HashMap<Formula, Variable>,
}

impl PredicateAbstractor {
    pub fn new() -> Self {
        PredicateAbstractor::default()
    }

    /// Returns `f` with every maximal theory atom replaced by its proxy.
    pub fn convert(&mut self, f: &Formula) -> Formula {
        match f.kind() {
            FormulaKind::False | FormulaKind::True | FormulaKind::Variable(_) => f.clone(),

            FormulaKind::Conjunction(operands) => {
                let converted: Vec<Formula> = operands.iter().map(|g| self.convert(g)).collect();
                Formula::and(converted)
            }

            FormulaKind::Disjunction(operands) => {
                let converted: Vec<Formula> = operands.iter().map(|g| self.convert(g)).collect();
                Formula::or(converted)
            }

            FormulaKind::Negation(inner) => Formula::not(self.convert(inner)),

            // A relational atom or quantified subformula is maximal here.
            _ => self.proxy(f),
        }
    }

    fn proxy(&mut self, atom: &Formula) -> Formula {
        if let Some(existing) = self.formula_to_var.get(atom) {
            return Formula::boolean(existing.clone());
        }
        let fresh = Variable::new(
            format!("b{}", self.formula_to_var.len()),
            VariableKind::Boolean,
        );
        self.var_to_formula.insert(fresh.clone(), atom.clone());
        self.formula_to_var.insert(atom.clone(), fresh.clone());
        Formula::boolean(fresh)
    }

    /// The proxy-to-atom map.
    pub fn var_to_formula_map(&self) -> &HashMap<Variable, Formula> {
        &self.var_to_formula
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::Expression;

    fn atom(name: &str, bound: i64) -> Formula {
        let v = Variable::new(name, VariableKind::Continuous);
        Formula::leq(Expression::from(v), Expression::integer(bound))
    }

    #[test]
    fn identical_atoms_share_a_proxy() {
        let mut abstractor = PredicateAbstractor::new();
        let f = atom("x", 5);

        let once = abstractor.convert(&f);
        let twice = abstractor.convert(&f);
        assert_eq!(once, twice);
        assert_eq!(abstractor.var_to_formula_map().len(), 1);
    }

    #[test]
    fn structure_survives_abstraction() {
        let mut abstractor = PredicateAbstractor::new();
        let f = Formula::or([atom("x", 1), Formula::not(atom("y", 2))]);

        let converted = abstractor.convert(&f);
        assert!(matches!(
            converted.kind(),
            FormulaKind::Disjunction(operands) if operands.len() == 2
        ));

        // Resubstituting the proxies recovers the original atoms.
        let map = abstractor.var_to_formula_map();
        for (_, original) in map {
            assert!(original.is_relational());
        }
    }
}
