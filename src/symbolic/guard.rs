//! A scoped hold on the symbolic interning caches, for tests.
//!
//! Expressions and formulas intern into process-wide tables.
//! Tests which count nodes or compare ids across solves take a [SymbolicGuard] so the tables are released --- and so such tests serialise rather than observe one another's terms.

use std::sync::{Mutex, MutexGuard};

use crate::symbolic::{expression::clear_expression_cache, formula::clear_formula_cache};

static GUARD: Mutex<()> = Mutex::new(());

/// Holds the symbolic interning caches for a scope, clearing them on release.
pub struct SymbolicGuard {
    _hold: MutexGuard<'static, ()>,
}

impl Default for SymbolicGuard {
    fn default() -> Self {
        SymbolicGuard {
            _hold: GUARD.lock().unwrap_or_else(|e| e.into_inner()),
        }
    }
}

impl Drop for SymbolicGuard {
    fn drop(&mut self) {
        clear_expression_cache();
        clear_formula_cache();
    }
}
