/*!
The SMT-LIB2 front end.

[Smt2Driver] executes the command subset over a [Context]: declarations, assertions, `check-sat`, `get-model`, `minimize`, `push`/`pop`, and `exit`.
Terms are read against the declared variables and any enclosing `let` bindings; theory atoms must be linear by the time they reach the LP, but the term language itself is read in full.

Verdicts and models accumulate in the driver's output lines --- exactly the tokens the CLI prints: `delta-sat` or `unsat`, optionally followed by a model in `define-fun` form.
*/

pub mod parser;

use std::collections::HashMap;

use num_traits::One;

use crate::{
    interval::IntervalBox,
    misc::log::targets,
    rational::{from_decimal, Rational},
    smt2::parser::{parse_all, Sexp},
    solver::context::Context,
    symbolic::{Expression, Formula, UnaryFunction, Variable, VariableKind},
    types::err::{ErrorKind, ParseError},
};

/// Renders a rational in SMT-LIB2 value form: `5`, `(- 5)`, `(/ 1 2)`, `(- (/ 1 2))`.
fn render_rational(value: &Rational) -> String {
    use num_traits::Signed;

    if value.is_negative() {
        return format!("(- {})", render_rational(&-value.clone()));
    }
    if value.is_integer() {
        value.numer().to_string()
    } else {
        format!("(/ {} {})", value.numer(), value.denom())
    }
}

/// A term in either layer of the language.
#[derive(Clone, Debug)]
enum Term {
    Expr(Expression),
    Form(Formula),
}

impl Term {
    fn into_expression(self) -> Result<Expression, ErrorKind> {
        match self {
            Term::Expr(e) => Ok(e),
            Term::Form(f) => Err(ParseError::UnsupportedTerm(format!("{f}")).into()),
        }
    }

    fn into_formula(self) -> Result<Formula, ErrorKind> {
        match self {
            Term::Form(f) => Ok(f),
            Term::Expr(e) => Err(ParseError::UnsupportedTerm(format!("{e}")).into()),
        }
    }
}

/// Executes SMT-LIB2 commands against a context.
pub struct Smt2Driver {
    context: Context,
    names: HashMap<String, Variable>,
    actual_precision: Rational,
    output: Vec<String>,
    print_immediately: bool,
    done: bool,
}

impl Smt2Driver {
    pub fn new(context: Context) -> Self {
        let actual_precision = context.config().precision.clone();
        Smt2Driver {
            context,
            names: HashMap::new(),
            actual_precision,
            output: Vec::new(),
            print_immediately: false,
            done: false,
        }
    }

    /// Print each output line as it is produced, the CLI behaviour.
    pub fn print_immediately(&mut self) {
        self.print_immediately = true;
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// The precision actually achieved by the latest check.
    pub fn actual_precision(&self) -> &Rational {
        &self.actual_precision
    }

    /// The verdict and model lines produced so far.
    pub fn outputs(&self) -> &[String] {
        &self.output
    }

    /// Reads and executes the commands of the file at `path`.
    pub fn parse_file(&mut self, path: &str) -> Result<(), ErrorKind> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ParseError::NoFile(path.to_owned()))?;
        self.parse_text(&text)
    }

    /// Reads and executes the commands of `text`.
    pub fn parse_text(&mut self, text: &str) -> Result<(), ErrorKind> {
        for command in parse_all(text)? {
            if self.done {
                break;
            }
            self.execute(&command)?;
        }
        Ok(())
    }

    fn emit(&mut self, line: String) {
        if self.print_immediately {
            println!("{line}");
        }
        self.output.push(line);
    }

    fn execute(&mut self, command: &Sexp) -> Result<(), ErrorKind> {
        let items = command
            .list()
            .ok_or_else(|| ParseError::UnsupportedCommand(format!("{command:?}")))?;
        let head = items
            .first()
            .and_then(Sexp::atom)
            .ok_or_else(|| ParseError::UnsupportedCommand(format!("{command:?}")))?;
        log::trace!(target: targets::PARSE, "({head} …)");

        match head {
            // Accepted and recorded nowhere: the solver is its own logic.
            "set-logic" | "set-info" | "set-option" => Ok(()),

            "declare-const" => self.declare(items, 2),

            "declare-fun" => {
                let arity = items
                    .get(2)
                    .and_then(Sexp::list)
                    .ok_or_else(|| ParseError::UnsupportedCommand("declare-fun".to_owned()))?;
                if !arity.is_empty() {
                    return Err(ParseError::UnsupportedCommand(
                        "declare-fun with arguments".to_owned(),
                    )
                    .into());
                }
                self.declare(items, 3)
            }

            "assert" => {
                let term = self.term(items.get(1), &HashMap::new())?;
                let formula = term.into_formula()?;
                self.context.assert(formula);
                Ok(())
            }

            "check-sat" => self.check_sat(),

            "get-model" => {
                let line = match self.context.model().cloned() {
                    Some(model) => self.render_model(&model),
                    None => "(model )".to_owned(),
                };
                self.emit(line);
                Ok(())
            }

            "minimize" => {
                let term = self.term(items.get(1), &HashMap::new())?;
                let objective = term.into_expression()?;
                self.context.minimize(objective);
                Ok(())
            }

            "push" => {
                let levels = self.levels(items.get(1))?;
                self.context.push(levels);
                Ok(())
            }

            "pop" => {
                let levels = self.levels(items.get(1))?;
                self.context.pop(levels)
            }

            "exit" => {
                self.done = true;
                Ok(())
            }

            other => Err(ParseError::UnsupportedCommand(other.to_owned()).into()),
        }
    }

    fn declare(&mut self, items: &[Sexp], sort_at: usize) -> Result<(), ErrorKind> {
        let name = items
            .get(1)
            .and_then(Sexp::atom)
            .ok_or_else(|| ParseError::UnsupportedCommand("declaration".to_owned()))?;
        let sort = items
            .get(sort_at)
            .and_then(Sexp::atom)
            .ok_or_else(|| ParseError::UnknownSort(String::new()))?;
        let kind = match sort {
            "Real" => VariableKind::Continuous,
            "Int" => VariableKind::Integer,
            "Bool" => VariableKind::Boolean,
            other => return Err(ParseError::UnknownSort(other.to_owned()).into()),
        };

        let variable = self
            .names
            .entry(name.to_owned())
            .or_insert_with(|| Variable::new(name, kind))
            .clone();
        self.context.declare_variable(&variable);
        Ok(())
    }

    fn levels(&self, sexp: Option<&Sexp>) -> Result<usize, ErrorKind> {
        match sexp {
            None => Ok(1),
            Some(sexp) => {
                let text = sexp
                    .atom()
                    .ok_or_else(|| ParseError::Numeral(format!("{sexp:?}")))?;
                text.parse()
                    .map_err(|_| ParseError::Numeral(text.to_owned()).into())
            }
        }
    }

    fn check_sat(&mut self) -> Result<(), ErrorKind> {
        let mut precision = self.context.config().precision.clone();
        let produce_models = self.context.config().produce_models;
        match self.context.check_sat(&mut precision)? {
            Some(model) => {
                self.actual_precision = precision;
                self.emit("delta-sat".to_owned());
                if produce_models {
                    let line = self.render_model(&model);
                    self.emit(line);
                }
            }
            None => self.emit("unsat".to_owned()),
        }
        Ok(())
    }

    fn render_model(&self, model: &IntervalBox) -> String {
        let mut rendered = String::from("(model");
        for variable in model.variables() {
            let value = match model.interval(variable) {
                Some(interval) => match interval.lb().finite() {
                    Some(value) => render_rational(value),
                    None => "0".to_owned(),
                },
                None => "0".to_owned(),
            };
            let sort = match variable.kind() {
                VariableKind::Continuous => "Real",
                _ => "Int",
            };
            rendered.push_str(&format!(
                " (define-fun {} () {sort} {value})",
                variable.name(),
            ));
        }
        for (variable, polarity) in self.context.boolean_model() {
            rendered.push_str(&format!(
                " (define-fun {} () Bool {polarity})",
                variable.name(),
            ));
        }
        rendered.push(')');
        rendered
    }

    fn term(
        &self,
        sexp: Option<&Sexp>,
        bindings: &HashMap<String, Term>,
    ) -> Result<Term, ErrorKind> {
        let sexp = sexp.ok_or_else(|| ParseError::UnsupportedTerm("missing term".to_owned()))?;
        match sexp {
            Sexp::Atom(text) => self.atom_term(text, bindings),
            Sexp::List(items) => self.list_term(items, bindings),
        }
    }

    fn atom_term(&self, text: &str, bindings: &HashMap<String, Term>) -> Result<Term, ErrorKind> {
        match text {
            "true" => return Ok(Term::Form(Formula::top())),
            "false" => return Ok(Term::Form(Formula::bottom())),
            _ => {}
        }
        if let Some(bound) = bindings.get(text) {
            return Ok(bound.clone());
        }
        if let Some(variable) = self.names.get(text) {
            return Ok(match variable.kind() {
                VariableKind::Boolean => Term::Form(Formula::boolean(variable.clone())),
                _ => Term::Expr(Expression::from(variable)),
            });
        }
        if let Some(value) = from_decimal(text) {
            return Ok(Term::Expr(Expression::constant(value)));
        }
        Err(ParseError::UnknownSymbol(text.to_owned()).into())
    }

    fn list_term(
        &self,
        items: &[Sexp],
        bindings: &HashMap<String, Term>,
    ) -> Result<Term, ErrorKind> {
        let head = items
            .first()
            .and_then(Sexp::atom)
            .ok_or_else(|| ParseError::UnsupportedTerm("empty application".to_owned()))?;
        let arguments = &items[1..];

        match head {
            "let" => {
                let pairs = arguments
                    .first()
                    .and_then(Sexp::list)
                    .ok_or_else(|| ParseError::UnsupportedTerm("let".to_owned()))?;
                let mut extended = bindings.clone();
                for pair in pairs {
                    let pair = pair
                        .list()
                        .ok_or_else(|| ParseError::UnsupportedTerm("let binding".to_owned()))?;
                    let name = pair
                        .first()
                        .and_then(Sexp::atom)
                        .ok_or_else(|| ParseError::UnsupportedTerm("let binding".to_owned()))?;
                    // Bindings of one let are simultaneous: read against the outer scope.
                    let bound = self.term(pair.get(1), bindings)?;
                    extended.insert(name.to_owned(), bound);
                }
                self.term(arguments.get(1), &extended)
            }

            "and" | "or" => {
                let mut operands = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    operands.push(self.term(Some(argument), bindings)?.into_formula()?);
                }
                Ok(Term::Form(match head {
                    "and" => Formula::and(operands),
                    _ => Formula::or(operands),
                }))
            }

            "not" => {
                let operand = self.term(arguments.first(), bindings)?.into_formula()?;
                Ok(Term::Form(Formula::not(operand)))
            }

            "=>" => {
                let antecedent = self.term(arguments.first(), bindings)?.into_formula()?;
                let consequent = self.term(arguments.get(1), bindings)?.into_formula()?;
                Ok(Term::Form(Formula::implies(antecedent, consequent)))
            }

            "=" | "<" | "<=" | ">" | ">=" => self.relation(head, arguments, bindings),

            "distinct" => {
                let mut operands = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    operands.push(self.term(Some(argument), bindings)?.into_expression()?);
                }
                let mut pairs = Vec::new();
                for i in 0..operands.len() {
                    for j in (i + 1)..operands.len() {
                        pairs.push(Formula::neq(operands[i].clone(), operands[j].clone()));
                    }
                }
                Ok(Term::Form(Formula::and(pairs)))
            }

            "ite" => {
                let condition = self.term(arguments.first(), bindings)?.into_formula()?;
                let then = self.term(arguments.get(1), bindings)?;
                let otherwise = self.term(arguments.get(2), bindings)?;
                match (then, otherwise) {
                    (Term::Expr(t), Term::Expr(e)) => {
                        Ok(Term::Expr(Expression::if_then_else(condition, t, e)))
                    }
                    (Term::Form(t), Term::Form(e)) => Ok(Term::Form(Formula::and([
                        Formula::implies(condition.clone(), t),
                        Formula::implies(Formula::not(condition), e),
                    ]))),
                    _ => Err(ParseError::UnsupportedTerm("mixed ite".to_owned()).into()),
                }
            }

            "+" => {
                let mut operands = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    operands.push(self.term(Some(argument), bindings)?.into_expression()?);
                }
                Ok(Term::Expr(Expression::sum(operands)))
            }

            "-" => {
                let first = self.term(arguments.first(), bindings)?.into_expression()?;
                if arguments.len() == 1 {
                    return Ok(Term::Expr(-first));
                }
                let mut difference = first;
                for argument in &arguments[1..] {
                    difference = difference - self.term(Some(argument), bindings)?.into_expression()?;
                }
                Ok(Term::Expr(difference))
            }

            "*" => {
                let mut product = Expression::constant(Rational::one());
                for argument in arguments {
                    product = product * self.term(Some(argument), bindings)?.into_expression()?;
                }
                Ok(Term::Expr(product))
            }

            "/" => {
                let numerator = self.term(arguments.first(), bindings)?.into_expression()?;
                let denominator = self.term(arguments.get(1), bindings)?.into_expression()?;
                Ok(Term::Expr(Expression::division(numerator, denominator)))
            }

            "abs" | "log" | "exp" | "sqrt" | "sin" | "cos" | "tan" => {
                let argument = self.term(arguments.first(), bindings)?.into_expression()?;
                let function = match head {
                    "abs" => UnaryFunction::Abs,
                    "log" => UnaryFunction::Log,
                    "exp" => UnaryFunction::Exp,
                    "sqrt" => UnaryFunction::Sqrt,
                    "sin" => UnaryFunction::Sin,
                    "cos" => UnaryFunction::Cos,
                    _ => UnaryFunction::Tan,
                };
                Ok(Term::Expr(Expression::unary(function, argument)))
            }

            other => Err(ParseError::UnsupportedTerm(other.to_owned()).into()),
        }
    }

    /// An n-ary chained relation: adjacent operand pairs, conjoined.
    fn relation(
        &self,
        op: &str,
        arguments: &[Sexp],
        bindings: &HashMap<String, Term>,
    ) -> Result<Term, ErrorKind> {
        let mut operands = Vec::with_capacity(arguments.len());
        for argument in arguments {
            operands.push(self.term(Some(argument), bindings)?);
        }
        if operands.len() < 2 {
            return Err(ParseError::UnsupportedTerm(op.to_owned()).into());
        }

        // Boolean equality is equivalence.
        if op == "=" {
            if let Term::Form(_) = operands[0] {
                let mut links = Vec::new();
                for pair in operands.windows(2) {
                    let a = pair[0].clone().into_formula()?;
                    let b = pair[1].clone().into_formula()?;
                    links.push(Formula::and([
                        Formula::implies(a.clone(), b.clone()),
                        Formula::implies(b, a),
                    ]));
                }
                return Ok(Term::Form(Formula::and(links)));
            }
        }

        let mut links = Vec::new();
        for pair in operands.windows(2) {
            let lhs = pair[0].clone().into_expression()?;
            let rhs = pair[1].clone().into_expression()?;
            links.push(match op {
                "=" => Formula::eq(lhs, rhs),
                "<" => Formula::lt(lhs, rhs),
                "<=" => Formula::leq(lhs, rhs),
                ">" => Formula::gt(lhs, rhs),
                _ => Formula::geq(lhs, rhs),
            });
        }
        Ok(Term::Form(Formula::and(links)))
    }
}
