/*!
The conflict-driven clause-learning engine.

A compact CDCL solver behind a deliberately narrow surface: fresh variables, clause addition, solve, and full or partial dereference of the resulting model.
The [driver](crate::solver::sat_driver) owns everything above that surface --- clause bookkeeping, theory rows, model pruning --- so the engine stays a plain Boolean oracle.

Internals are the standard kit:

- Two watched literals per clause, with unit propagation over a trail.
- First-UIP conflict analysis producing an asserting clause and a backjump level.
- Activity-ordered decisions over an [ActivityHeap](crate::generic::activity_heap::ActivityHeap), with phase saving.
- Luby-scheduled restarts.

Literals are non-zero integers whose sign is the polarity, DIMACS style; variables count from 1.

# Partial models

After a satisfiable solve the engine can dereference *partially*: a subset of the assignment which on its own satisfies every clause added through [add_clause](CdclEngine::add_clause).
The subset is a greedy cover --- for each clause lacking an already-needed satisfying literal, one satisfying literal is marked as needed.
Clauses the engine learned for itself are implied, so the cover is a genuine model of the input.
*/

mod engine;
pub use engine::CdclEngine;

/// A SAT variable, counting from 1.
pub type SatVariable = u32;

/// A literal: a non-zero integer whose magnitude is the variable and sign the polarity.
pub type SatLiteral = i32;

/// The verdict of a solve.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SatResult {
    /// Some assignment satisfies every clause.
    Satisfiable,

    /// No assignment satisfies every clause.
    Unsatisfiable,
}

/// The phase given to a variable decided for the first time.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Default)]
pub enum DefaultPhase {
    /// Decide variables negatively.
    False,

    /// Decide variables positively.
    True,

    /// Follow the greater Jeroslow-Wang score.
    #[default]
    JeroslowWang,

    /// Oppose the greater Jeroslow-Wang score.
    ReverseJeroslowWang,
}

impl std::str::FromStr for DefaultPhase {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "false" => Ok(Self::False),
            "true" => Ok(Self::True),
            "jw" => Ok(Self::JeroslowWang),
            "rjw" => Ok(Self::ReverseJeroslowWang),
            _ => Err(()),
        }
    }
}
