/*!
Variables: a stable identity, a printable name, and a kind.

Two handles with the same id denote the same variable, and comparisons go through the id alone.
Ids come from a process-wide counter, so a variable is never re-minted by accident; the handles themselves are cheap to clone.
*/

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

/// The kind of a variable.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum VariableKind {
    /// A real-valued variable.
    Continuous,

    /// An integer-valued variable.
    Integer,

    /// An integer-valued variable restricted to {0, 1}.
    Binary,

    /// A Boolean variable.
    Boolean,
}

static NEXT_VARIABLE_ID: AtomicUsize = AtomicUsize::new(0);

/// A variable, identified by a stable id.
#[derive(Clone, Debug)]
pub struct Variable {
    id: usize,
    name: Arc<str>,
    kind: VariableKind,
}

impl Variable {
    /// A fresh variable with the given name and kind.
    pub fn new(name: impl Into<Arc<str>>, kind: VariableKind) -> Self {
        Variable {
            id: NEXT_VARIABLE_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            kind,
        }
    }

    /// The stable id of the variable.
    pub fn id(&self) -> usize {
        self.id
    }

    /// The printable name of the variable.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The kind of the variable.
    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    /// True if the variable is integer-valued (integer or binary).
    pub fn is_integral(&self) -> bool {
        matches!(self.kind, VariableKind::Integer | VariableKind::Binary)
    }
}

impl PartialEq for Variable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Variable {}

impl PartialOrd for Variable {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Variable {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl std::hash::Hash for Variable {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for Variable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
