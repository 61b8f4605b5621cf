/*!
Tseitin CNF transformation.

A formula is first pushed into negation normal form --- relational atoms absorb their negations by flipping the operator, Boolean leaves keep a shallow negation --- and then flattened into clauses.
Disjunctions distribute nothing: a conjunctive operand under a disjunction is replaced by a fresh auxiliary variable, with implication clauses tying the auxiliary to its operand.
As the input is in NNF the one-directional implications preserve satisfiability, and a connective of n operands yields O(n) clauses.

Auxiliaries are recorded so model extraction can tell them apart from user Booleans.
*/

use std::collections::HashSet;

use crate::symbolic::{Formula, FormulaKind, Variable, VariableKind};

/// Tseitin converter with a record of the auxiliary variables it introduced.
#[derive(Default)]
pub struct Cnfizer {
    variables: HashSet<Variable>,
}

impl Cnfizer {
    pub fn new() -> Self {
        Cnfizer::default()
    }

    /// The auxiliary variables introduced so far.
    pub fn variables(&self) -> &HashSet<Variable> {
        &self.variables
    }

    /// Converts `f` into an equisatisfiable list of clauses.
    ///
    /// Each returned formula is a disjunction of literals (or a single literal).
    pub fn convert(&mut self, f: &Formula) -> Vec<Formula> {
        let nnf = to_nnf(f);
        let mut clauses = Vec::new();
        self.clausify(&nnf, &mut clauses);
        clauses
    }

    /// Emits clauses for `f` in a conjunctive position.
    fn clausify(&mut self, f: &Formula, clauses: &mut Vec<Formula>) {
        match f.kind() {
            FormulaKind::True => {}
            FormulaKind::Conjunction(operands) => {
                for operand in operands {
                    self.clausify(operand, clauses);
                }
            }
            _ => {
                let literals = self.disjuncts(f, clauses);
                clauses.push(Formula::or(literals));
            }
        }
    }

    /// Flattens `f` in a disjunctive position into literals, introducing auxiliaries for conjunctive operands.
    fn disjuncts(&mut self, f: &Formula, clauses: &mut Vec<Formula>) -> Vec<Formula> {
        match f.kind() {
            FormulaKind::Disjunction(operands) => {
                let mut literals = Vec::new();
                for operand in operands {
                    literals.extend(self.disjuncts(operand, clauses));
                }
                literals
            }

            FormulaKind::Conjunction(operands) => {
                let auxiliary = Variable::new(
                    format!("cnf{}", self.variables.len()),
                    VariableKind::Boolean,
                );
                self.variables.insert(auxiliary.clone());
                let proxy = Formula::boolean(auxiliary);

                // auxiliary ⇒ operand, for each operand.
                for operand in operands {
                    let mut implied = self.disjuncts(operand, clauses);
                    implied.push(Formula::not(proxy.clone()));
                    clauses.push(Formula::or(implied));
                }

                vec![proxy]
            }

            _ => vec![f.clone()],
        }
    }
}

/// Pushes negations down to atoms.
fn to_nnf(f: &Formula) -> Formula {
    match f.kind() {
        FormulaKind::Negation(inner) => match inner.kind() {
            // A negated Boolean leaf is already a literal.
            FormulaKind::Variable(_) | FormulaKind::Forall(..) => f.clone(),
            _ => to_nnf(&inner.negated()),
        },
        FormulaKind::Conjunction(operands) => Formula::and(operands.iter().map(to_nnf)),
        FormulaKind::Disjunction(operands) => Formula::or(operands.iter().map(to_nnf)),
        _ => f.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbolic::Expression;

    fn bool_var(name: &str) -> Formula {
        Formula::boolean(Variable::new(name, VariableKind::Boolean))
    }

    fn atom(name: &str) -> Formula {
        let v = Variable::new(name, VariableKind::Continuous);
        Formula::lt(Expression::from(v), Expression::integer(0))
    }

    #[test]
    fn clauses_pass_through() {
        let mut cnfizer = Cnfizer::new();
        let clause = Formula::or([bool_var("p"), bool_var("q")]);
        let clauses = cnfizer.convert(&clause);
        assert_eq!(clauses, vec![clause]);
        assert!(cnfizer.variables().is_empty());
    }

    #[test]
    fn conjunctions_split() {
        let mut cnfizer = Cnfizer::new();
        let p = bool_var("p");
        let q = bool_var("q");
        let clauses = cnfizer.convert(&Formula::and([p.clone(), q.clone()]));
        assert_eq!(clauses.len(), 2);
        assert!(clauses.contains(&p));
        assert!(clauses.contains(&q));
    }

    #[test]
    fn negation_pushes_into_relations() {
        let mut cnfizer = Cnfizer::new();
        let f = Formula::not(atom("x"));
        let clauses = cnfizer.convert(&f);
        assert_eq!(clauses.len(), 1);
        // ¬(x < 0) became x ≥ 0: a positive relational literal.
        assert!(clauses[0].is_relational());
        assert!(matches!(clauses[0].kind(), FormulaKind::GreaterEqual(..)));
    }

    #[test]
    fn disjunction_over_conjunction_introduces_an_auxiliary() {
        let mut cnfizer = Cnfizer::new();
        let p = bool_var("p");
        let conj = Formula::and([bool_var("q"), bool_var("r")]);
        let clauses = cnfizer.convert(&Formula::or([p, conj]));

        // One clause for the disjunction, one implication per conjunct.
        assert_eq!(clauses.len(), 3);
        assert_eq!(cnfizer.variables().len(), 1);
    }

    #[test]
    fn auxiliary_count_is_linear() {
        // or(and, and, and): one auxiliary per conjunctive operand.
        let mut cnfizer = Cnfizer::new();
        let operands: Vec<Formula> = (0..3)
            .map(|i| {
                Formula::and([
                    bool_var(&format!("a{i}")),
                    bool_var(&format!("b{i}")),
                ])
            })
            .collect();
        let clauses = cnfizer.convert(&Formula::or(operands));

        assert_eq!(cnfizer.variables().len(), 3);
        assert_eq!(clauses.len(), 7);
    }
}
