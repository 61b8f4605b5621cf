/*!
Items related to [logging](log).

Calls to the log macro are made throughout the library, intended to help follow a solve and to narrow down issues.

Note, no log implementation is provided.
For details, see [log].
*/

/// Targets to be used within a [log]! macro.
pub mod targets {
    /// Logs related to the [assertion filter](crate::solver::filter).
    pub const FILTER: &str = "filter";

    /// Logs related to the [SAT driver](crate::solver::sat_driver).
    pub const SAT: &str = "sat";

    /// Logs related to the [CDCL engine](crate::sat).
    pub const ENGINE: &str = "engine";

    /// Logs related to the [theory solver](crate::solver::theory).
    pub const THEORY: &str = "theory";

    /// Logs related to the [LP backend](crate::lp).
    pub const LP: &str = "lp";

    /// Logs related to the [context](crate::solver::context).
    pub const CONTEXT: &str = "context";

    /// Logs related to [SMT-LIB2 parsing](crate::smt2).
    pub const PARSE: &str = "parse";
}
