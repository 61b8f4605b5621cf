/*!
Error types used in the library.

- Some of these are internally expected --- a theory `UNSAT` is a learning opportunity rather than a failure, and is not represented here.
- Others end a solve --- an out-of-fragment expression reaching LP row construction, say, or a coefficient at least as large as the active infinity.

Names of the error enums --- for the most part --- overlap with the module the error originates in.
*/

/// A union of varied error kinds.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// An error while reading SMT-LIB2 input.
    Parse(ParseError),

    /// An error while building or mutating the linear problem.
    Theory(TheoryError),

    /// An error from the SAT engine driver.
    Sat(SatError),

    /// An error relating to the assertion stack or scopes.
    Scope(ScopeError),

    /// A solve exceeded the wall-clock bound of an external supervisor.
    ///
    /// Never produced by the library itself; reserved for benchmark harnesses.
    Timeout,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "parse error: {e}"),
            Self::Theory(e) => write!(f, "theory error: {e}"),
            Self::Sat(e) => write!(f, "sat error: {e}"),
            Self::Scope(e) => write!(f, "scope error: {e}"),
            Self::Timeout => write!(f, "timeout"),
        }
    }
}

/// Errors while reading SMT-LIB2 input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ParseError {
    /// Some unspecific problem at a specific line.
    Line(usize, String),

    /// A numeral or decimal which could not be read.
    Numeral(String),

    /// A closing delimiter was required but not found.
    UnbalancedParen,

    /// A symbol which does not name any declared variable or binding.
    UnknownSymbol(String),

    /// A sort other than `Real`, `Int`, or `Bool`.
    UnknownSort(String),

    /// A command outside the supported SMT-LIB2 subset.
    UnsupportedCommand(String),

    /// A term outside the supported SMT-LIB2 subset.
    UnsupportedTerm(String),

    /// No file was found.
    NoFile(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Line(n, detail) => write!(f, "line {n}: {detail}"),
            Self::Numeral(s) => write!(f, "unreadable numeral '{s}'"),
            Self::UnbalancedParen => write!(f, "unbalanced parenthesis"),
            Self::UnknownSymbol(s) => write!(f, "unknown symbol '{s}'"),
            Self::UnknownSort(s) => write!(f, "unknown sort '{s}'"),
            Self::UnsupportedCommand(s) => write!(f, "unsupported command '{s}'"),
            Self::UnsupportedTerm(s) => write!(f, "unsupported term '{s}'"),
            Self::NoFile(s) => write!(f, "no file at '{s}'"),
        }
    }
}

impl From<ParseError> for ErrorKind {
    fn from(e: ParseError) -> Self {
        ErrorKind::Parse(e)
    }
}

/// Errors while building or mutating the linear problem.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TheoryError {
    /// A nonlinear or otherwise out-of-fragment term reached LP row construction.
    ///
    /// Carries the prefix form of the offending expression or formula.
    UnsupportedExpression(String),

    /// An LP coefficient was requested for a variable with no column.
    UnknownVariable(String),

    /// A coefficient or RHS whose magnitude meets or exceeds the active infinity.
    NumericOverflow(String),

    /// The LP backend returned `UNKNOWN`.
    Unknown,
}

impl std::fmt::Display for TheoryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedExpression(s) => write!(f, "unsupported expression {s}"),
            Self::UnknownVariable(s) => write!(f, "variable undefined: {s}"),
            Self::NumericOverflow(s) => write!(f, "LP value too large: {s}"),
            Self::Unknown => write!(f, "LP backend returned UNKNOWN"),
        }
    }
}

impl From<TheoryError> for ErrorKind {
    fn from(e: TheoryError) -> Self {
        ErrorKind::Theory(e)
    }
}

/// Errors from the SAT engine driver.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SatError {
    /// The underlying engine returned neither SAT nor UNSAT.
    UnknownSatResult,
}

impl std::fmt::Display for SatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownSatResult => write!(f, "SAT engine returned UNKNOWN"),
        }
    }
}

impl From<SatError> for ErrorKind {
    fn from(e: SatError) -> Self {
        ErrorKind::Sat(e)
    }
}

/// Errors relating to the assertion stack or scopes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ScopeError {
    /// `push`/`pop` was requested of a component which does not support it.
    UnsupportedScope,

    /// A `pop` with no matching `push`.
    StackUnderflow,
}

impl std::fmt::Display for ScopeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedScope => write!(f, "push/pop unsupported in this configuration"),
            Self::StackUnderflow => write!(f, "pop with no matching push"),
        }
    }
}

impl From<ScopeError> for ErrorKind {
    fn from(e: ScopeError) -> Self {
        ErrorKind::Scope(e)
    }
}
