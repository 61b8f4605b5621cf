/*!
Double-dispatch over expression and formula kinds.

A visitor is any structure implementing [ExpressionVisitor] or [FormulaVisitor] for a chosen return type; [visit_expression] and [visit_formula] map a term's kind to the matching handler.
Dispatch is a plain match over the tagged kind --- there is no open polymorphism to extend, and a visitor may carry whatever state its handlers need.

The [prefix printer](crate::symbolic::prefix) and the [assertion filter](crate::solver::filter) are the resident examples.
*/

use crate::symbolic::{Expression, ExpressionKind, Formula, FormulaKind};

/// Handlers for each expression kind, returning `T`.
pub trait ExpressionVisitor<T> {
    fn visit_constant(&mut self, e: &Expression) -> T;
    fn visit_variable(&mut self, e: &Expression) -> T;
    fn visit_addition(&mut self, e: &Expression) -> T;
    fn visit_multiplication(&mut self, e: &Expression) -> T;
    fn visit_division(&mut self, e: &Expression) -> T;
    fn visit_unary(&mut self, e: &Expression) -> T;
    fn visit_if_then_else(&mut self, e: &Expression) -> T;
    fn visit_uninterpreted(&mut self, e: &Expression) -> T;
}

/// Dispatches `e` to the handler of `visitor` matching its kind.
pub fn visit_expression<T, V: ExpressionVisitor<T> + ?Sized>(visitor: &mut V, e: &Expression) -> T {
    match e.kind() {
        ExpressionKind::Constant(_) => visitor.visit_constant(e),
        ExpressionKind::Variable(_) => visitor.visit_variable(e),
        ExpressionKind::Addition { .. } => visitor.visit_addition(e),
        ExpressionKind::Multiplication { .. } => visitor.visit_multiplication(e),
        ExpressionKind::Division(..) => visitor.visit_division(e),
        ExpressionKind::Unary(..) => visitor.visit_unary(e),
        ExpressionKind::IfThenElse(..) => visitor.visit_if_then_else(e),
        ExpressionKind::UninterpretedFunction(..) => visitor.visit_uninterpreted(e),
    }
}

/// Handlers for each formula kind, returning `T`.
pub trait FormulaVisitor<T> {
    fn visit_false(&mut self, f: &Formula) -> T;
    fn visit_true(&mut self, f: &Formula) -> T;
    fn visit_variable(&mut self, f: &Formula) -> T;
    fn visit_equal(&mut self, f: &Formula) -> T;
    fn visit_not_equal(&mut self, f: &Formula) -> T;
    fn visit_greater(&mut self, f: &Formula) -> T;
    fn visit_greater_equal(&mut self, f: &Formula) -> T;
    fn visit_less(&mut self, f: &Formula) -> T;
    fn visit_less_equal(&mut self, f: &Formula) -> T;
    fn visit_conjunction(&mut self, f: &Formula) -> T;
    fn visit_disjunction(&mut self, f: &Formula) -> T;
    fn visit_negation(&mut self, f: &Formula) -> T;
    fn visit_forall(&mut self, f: &Formula) -> T;
}

/// Dispatches `f` to the handler of `visitor` matching its kind.
pub fn visit_formula<T, V: FormulaVisitor<T> + ?Sized>(visitor: &mut V, f: &Formula) -> T {
    match f.kind() {
        FormulaKind::False => visitor.visit_false(f),
        FormulaKind::True => visitor.visit_true(f),
        FormulaKind::Variable(_) => visitor.visit_variable(f),
        FormulaKind::Equal(..) => visitor.visit_equal(f),
        FormulaKind::NotEqual(..) => visitor.visit_not_equal(f),
        FormulaKind::Greater(..) => visitor.visit_greater(f),
        FormulaKind::GreaterEqual(..) => visitor.visit_greater_equal(f),
        FormulaKind::Less(..) => visitor.visit_less(f),
        FormulaKind::LessEqual(..) => visitor.visit_less_equal(f),
        FormulaKind::Conjunction(_) => visitor.visit_conjunction(f),
        FormulaKind::Disjunction(_) => visitor.visit_disjunction(f),
        FormulaKind::Negation(_) => visitor.visit_negation(f),
        FormulaKind::Forall(..) => visitor.visit_forall(f),
    }
}
