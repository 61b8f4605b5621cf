/*!
Configuration of a solve.

All configuration is read at context construction and fixed for the life of the context.
The defaults favour determinism: a zero seed keeps the engine's decisions reproducible, and the default precision is the customary 1/1000.
*/

use num_traits::Zero;

use crate::{rational::Rational, sat::DefaultPhase};

/// The LP driver requested on the command line.
///
/// Both selections are served by the built-in rational simplex; the choice is recorded for output and benchmarking.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum LpSolver {
    #[default]
    Qsoptex,
    Soplex,
}

impl std::str::FromStr for LpSolver {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "qsoptex" => Ok(Self::Qsoptex),
            "soplex" => Ok(Self::Soplex),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for LpSolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Qsoptex => write!(f, "qsoptex"),
            Self::Soplex => write!(f, "soplex"),
        }
    }
}

/// The primary configuration structure.
#[derive(Clone)]
pub struct Config {
    /// The precision δ. Zero requires a full satisfiability proof.
    pub precision: Rational,

    /// The requested LP driver.
    pub lp_solver: LpSolver,

    /// The seed for the engine's randomised decisions. Zero keeps solves deterministic.
    pub random_seed: u64,

    /// The phase given to engine variables decided for the first time.
    pub sat_default_phase: DefaultPhase,

    /// Print a model box after a delta-sat verdict.
    pub produce_models: bool,
}

impl Config {
    /// True when the precision is exactly zero.
    pub fn exhaustive(&self) -> bool {
        self.precision.is_zero()
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            precision: Rational::new(1.into(), 1000.into()),
            lp_solver: LpSolver::default(),
            random_seed: 0,
            sat_default_phase: DefaultPhase::default(),
            produce_models: false,
        }
    }
}
