/*!
The prefix printer: a canonical parenthesized form for expressions and formulas.

The printer is a visitor writing into a string buffer.
Its output doubles as a diagnostic representation and as a test oracle, so the form is kept canonical: rationals with a non-unit denominator print as `(/ p q)`, a sum prints its constant first and each weighted term as `(* c t)`, and a disequality prints as `(not (= …))`.
*/

use num_traits::{One, Signed, Zero};

use crate::{
    rational::Rational,
    symbolic::{
        visit_expression, visit_formula, Expression, ExpressionKind, ExpressionVisitor, Formula,
        FormulaKind, FormulaVisitor,
    },
};

/// A visitor which writes the prefix form of terms into a buffer.
pub struct PrefixPrinter {
    buffer: String,
}

impl Default for PrefixPrinter {
    fn default() -> Self {
        PrefixPrinter {
            buffer: String::new(),
        }
    }
}

impl PrefixPrinter {
    /// Appends the prefix form of `e` and returns the buffer so far.
    pub fn print_expression(&mut self, e: &Expression) -> &str {
        visit_expression(self, e);
        &self.buffer
    }

    /// Appends the prefix form of `f` and returns the buffer so far.
    pub fn print_formula(&mut self, f: &Formula) -> &str {
        visit_formula(self, f);
        &self.buffer
    }

    /// The accumulated buffer.
    pub fn into_string(self) -> String {
        self.buffer
    }

    fn push_constant(&mut self, value: &Rational) {
        if value.denom().is_one() {
            self.buffer.push_str(&value.numer().to_string());
        } else if value.is_negative() {
            // Print the sign outside so the denominator stays positive.
            self.buffer.push_str("(- ");
            self.push_constant(&-value.clone());
            self.buffer.push(')');
        } else {
            self.buffer
                .push_str(&format!("(/ {} {})", value.numer(), value.denom()));
        }
    }

    fn push_relation(&mut self, op: &str, f: &Formula) {
        let (lhs, rhs) = f
            .relational_operands()
            .unwrap_or_else(|| unreachable!("dispatched on a relational kind"));
        self.buffer.push('(');
        self.buffer.push_str(op);
        self.buffer.push(' ');
        visit_expression(self, lhs);
        self.buffer.push(' ');
        visit_expression(self, rhs);
        self.buffer.push(')');
    }
}

impl ExpressionVisitor<()> for PrefixPrinter {
    fn visit_constant(&mut self, e: &Expression) {
        match e.kind() {
            ExpressionKind::Constant(value) => self.push_constant(value),
            _ => unreachable!("dispatched on a constant"),
        }
    }

    fn visit_variable(&mut self, e: &Expression) {
        match e.kind() {
            ExpressionKind::Variable(variable) => self.buffer.push_str(variable.name()),
            _ => unreachable!("dispatched on a variable"),
        }
    }

    fn visit_addition(&mut self, e: &Expression) {
        let ExpressionKind::Addition { constant, terms } = e.kind() else {
            unreachable!("dispatched on an addition")
        };
        self.buffer.push_str("(+");
        if !constant.is_zero() {
            self.buffer.push(' ');
            self.push_constant(constant);
        }
        for (term, coefficient) in terms {
            self.buffer.push(' ');
            if coefficient.is_one() {
                visit_expression(self, term);
            } else {
                self.buffer.push_str("(* ");
                self.push_constant(coefficient);
                self.buffer.push(' ');
                visit_expression(self, term);
                self.buffer.push(')');
            }
        }
        self.buffer.push(')');
    }

    fn visit_multiplication(&mut self, e: &Expression) {
        let ExpressionKind::Multiplication { constant, factors } = e.kind() else {
            unreachable!("dispatched on a multiplication")
        };
        self.buffer.push_str("(*");
        if !constant.is_one() {
            self.buffer.push(' ');
            self.push_constant(constant);
        }
        for (base, exponent) in factors {
            self.buffer.push(' ');
            if exponent.to_constant().is_some_and(|e| e.is_one()) {
                visit_expression(self, base);
            } else {
                self.buffer.push_str("(^ ");
                visit_expression(self, base);
                self.buffer.push(' ');
                visit_expression(self, exponent);
                self.buffer.push(')');
            }
        }
        self.buffer.push(')');
    }

    fn visit_division(&mut self, e: &Expression) {
        let ExpressionKind::Division(numerator, denominator) = e.kind() else {
            unreachable!("dispatched on a division")
        };
        self.buffer.push_str("(/ ");
        visit_expression(self, numerator);
        self.buffer.push(' ');
        visit_expression(self, denominator);
        self.buffer.push(')');
    }

    fn visit_unary(&mut self, e: &Expression) {
        let ExpressionKind::Unary(function, argument) = e.kind() else {
            unreachable!("dispatched on a unary function")
        };
        self.buffer.push('(');
        self.buffer.push_str(function.name());
        self.buffer.push(' ');
        visit_expression(self, argument);
        self.buffer.push(')');
    }

    fn visit_if_then_else(&mut self, e: &Expression) {
        let ExpressionKind::IfThenElse(condition, then, otherwise) = e.kind() else {
            unreachable!("dispatched on a conditional")
        };
        self.buffer.push_str("(ite ");
        visit_formula(self, condition);
        self.buffer.push(' ');
        visit_expression(self, then);
        self.buffer.push(' ');
        visit_expression(self, otherwise);
        self.buffer.push(')');
    }

    fn visit_uninterpreted(&mut self, e: &Expression) {
        let ExpressionKind::UninterpretedFunction(name, arguments) = e.kind() else {
            unreachable!("dispatched on an uninterpreted function")
        };
        self.buffer.push('(');
        self.buffer.push_str(name);
        for argument in arguments {
            self.buffer.push(' ');
            visit_expression(self, argument);
        }
        self.buffer.push(')');
    }
}

impl FormulaVisitor<()> for PrefixPrinter {
    fn visit_false(&mut self, _: &Formula) {
        self.buffer.push_str("false");
    }

    fn visit_true(&mut self, _: &Formula) {
        self.buffer.push_str("true");
    }

    fn visit_variable(&mut self, f: &Formula) {
        match f.to_variable() {
            Some(variable) => self.buffer.push_str(variable.name()),
            None => unreachable!("dispatched on a variable"),
        }
    }

    fn visit_equal(&mut self, f: &Formula) {
        self.push_relation("=", f);
    }

    fn visit_not_equal(&mut self, f: &Formula) {
        let (lhs, rhs) = f
            .relational_operands()
            .unwrap_or_else(|| unreachable!("dispatched on a disequality"));
        self.buffer.push_str("(not (= ");
        visit_expression(self, lhs);
        self.buffer.push(' ');
        visit_expression(self, rhs);
        self.buffer.push_str("))");
    }

    fn visit_greater(&mut self, f: &Formula) {
        self.push_relation(">", f);
    }

    fn visit_greater_equal(&mut self, f: &Formula) {
        self.push_relation(">=", f);
    }

    fn visit_less(&mut self, f: &Formula) {
        self.push_relation("<", f);
    }

    fn visit_less_equal(&mut self, f: &Formula) {
        self.push_relation("<=", f);
    }

    fn visit_conjunction(&mut self, f: &Formula) {
        self.buffer.push_str("(and");
        for operand in f.operands().unwrap_or_else(|| unreachable!()) {
            self.buffer.push(' ');
            visit_formula(self, operand);
        }
        self.buffer.push(')');
    }

    fn visit_disjunction(&mut self, f: &Formula) {
        self.buffer.push_str("(or");
        for operand in f.operands().unwrap_or_else(|| unreachable!()) {
            self.buffer.push(' ');
            visit_formula(self, operand);
        }
        self.buffer.push(')');
    }

    fn visit_negation(&mut self, f: &Formula) {
        self.buffer.push_str("(not ");
        visit_formula(self, f.operand().unwrap_or_else(|| unreachable!()));
        self.buffer.push(')');
    }

    fn visit_forall(&mut self, f: &Formula) {
        let FormulaKind::Forall(variables, body) = f.kind() else {
            unreachable!("dispatched on a quantifier")
        };
        self.buffer.push_str("(forall (");
        for (i, variable) in variables.iter().enumerate() {
            if i > 0 {
                self.buffer.push(' ');
            }
            self.buffer.push_str(variable.name());
        }
        self.buffer.push_str(") ");
        visit_formula(self, body);
        self.buffer.push(')');
    }
}

/// The prefix form of an expression.
pub fn to_prefix_expression(e: &Expression) -> String {
    let mut printer = PrefixPrinter::default();
    printer.print_expression(e);
    printer.into_string()
}

/// The prefix form of a formula.
pub fn to_prefix_formula(f: &Formula) -> String {
    let mut printer = PrefixPrinter::default();
    printer.print_formula(f);
    printer.into_string()
}
