//! The hash-consing table behind expressions and formulas.
//!
//! Nodes are shared through [Arc]s and keyed by structural hash, so structurally equal terms collapse to one node with one stable id.
//! The table holds weak references only: a node lives exactly as long as some handle to it does.

use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

pub(crate) struct Interner<N> {
    table: HashMap<u64, Vec<Weak<N>>>,
    next_id: u64,
}

impl<N> Interner<N> {
    pub fn new() -> Self {
        Interner {
            table: HashMap::new(),
            next_id: 0,
        }
    }

    /// Returns the interned node for `hash`, reusing any live node for which `matches` holds and building a fresh node otherwise.
    ///
    /// `build` receives the stable id assigned to the fresh node.
    pub fn intern(
        &mut self,
        hash: u64,
        matches: impl Fn(&N) -> bool,
        build: impl FnOnce(u64) -> N,
    ) -> Arc<N> {
        let bucket = self.table.entry(hash).or_default();
        bucket.retain(|weak| weak.strong_count() > 0);

        for weak in bucket.iter() {
            if let Some(node) = weak.upgrade() {
                if matches(&node) {
                    return node;
                }
            }
        }

        let id = self.next_id;
        self.next_id += 1;
        let node = Arc::new(build(id));
        bucket.push(Arc::downgrade(&node));
        node
    }

    /// Drops every table entry. Live nodes are unaffected, but lose sharing with terms built later.
    pub fn clear(&mut self) {
        self.table.clear();
    }
}
