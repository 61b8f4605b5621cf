//! The engine proper: watches, trail, analysis, decisions.

use rand::{Rng, SeedableRng};

use crate::{
    generic::{activity_heap::ActivityHeap, luby::Luby, random::MinimalPCG32},
    misc::log::targets,
    sat::{DefaultPhase, SatLiteral, SatResult, SatVariable},
};

/// Activity added per bump, rescaled when magnitudes grow too large.
const ACTIVITY_RESCALE_THRESHOLD: f64 = 1e100;

/// Decay applied to future bumps after each conflict.
const ACTIVITY_DECAY: f64 = 0.95;

/// Restart interval multiplier for the luby sequence.
const LUBY_UNIT: u32 = 128;

/// One in this many decisions is randomised, when a seed is active.
const RANDOM_DECISION_MODULUS: u32 = 50;

struct EngineClause {
    literals: Vec<SatLiteral>,

    /// True for clauses learned by conflict analysis, false for clauses given through `add_clause`.
    from_engine: bool,
}

/// A conflict-driven clause-learning solver.
pub struct CdclEngine {
    clauses: Vec<EngineClause>,

    /// Watch lists, indexed by watched literal.
    watches: Vec<Vec<usize>>,

    /// Values, levels, and reasons, indexed by variable.
    values: Vec<Option<bool>>,
    levels: Vec<u32>,
    reasons: Vec<Option<usize>>,

    trail: Vec<SatLiteral>,
    trail_marks: Vec<usize>,
    propagated: usize,

    heap: ActivityHeap,
    activity_increment: f64,

    saved_phase: Vec<Option<bool>>,
    default_phase: DefaultPhase,
    jeroslow_wang: Vec<[f64; 2]>,

    rng: MinimalPCG32,
    randomise: bool,

    luby: Luby,
    conflicts_before_restart: u32,

    /// False once a conflict is established at the root level.
    consistent: bool,
}

impl Default for CdclEngine {
    fn default() -> Self {
        CdclEngine::new()
    }
}

fn variable_of(literal: SatLiteral) -> usize {
    literal.unsigned_abs() as usize
}

/// The watch-list index of a literal.
fn watch_index(literal: SatLiteral) -> usize {
    (variable_of(literal) << 1) | usize::from(literal < 0)
}

impl CdclEngine {
    pub fn new() -> Self {
        CdclEngine {
            clauses: Vec::new(),
            // Variable 0 is unused; watch and value slots are padded to match.
            watches: vec![Vec::new(), Vec::new()],
            values: vec![None],
            levels: vec![0],
            reasons: vec![None],
            trail: Vec::new(),
            trail_marks: Vec::new(),
            propagated: 0,
            heap: ActivityHeap::default(),
            activity_increment: 1.0,
            saved_phase: vec![None],
            default_phase: DefaultPhase::default(),
            jeroslow_wang: vec![[0.0, 0.0]],
            rng: MinimalPCG32::default(),
            randomise: false,
            luby: Luby::default(),
            conflicts_before_restart: 0,
            consistent: true,
        }
    }

    /// Seeds the randomised decision source. A zero seed keeps solves deterministic.
    pub fn set_seed(&mut self, seed: u64) {
        if seed != 0 {
            self.rng = MinimalPCG32::from_seed(seed.to_le_bytes());
            self.randomise = true;
        }
    }

    /// Sets the phase given to variables decided with no saved phase.
    pub fn set_default_phase(&mut self, phase: DefaultPhase) {
        self.default_phase = phase;
    }

    /// Introduces a fresh variable and returns it.
    pub fn fresh_variable(&mut self) -> SatVariable {
        let variable = self.values.len() as SatVariable;
        self.values.push(None);
        self.levels.push(0);
        self.reasons.push(None);
        self.saved_phase.push(None);
        self.jeroslow_wang.push([0.0, 0.0]);
        self.watches.push(Vec::new());
        self.watches.push(Vec::new());
        self.heap.push(variable as usize);
        variable
    }

    /// The number of variables introduced so far.
    pub fn variable_count(&self) -> SatVariable {
        (self.values.len() - 1) as SatVariable
    }

    /// The value of `variable` on the current assignment.
    pub fn value(&self, variable: SatVariable) -> Option<bool> {
        self.values.get(variable as usize).copied().flatten()
    }

    fn value_of_literal(&self, literal: SatLiteral) -> Option<bool> {
        self.values[variable_of(literal)].map(|v| v == (literal > 0))
    }

    fn decision_level(&self) -> u32 {
        self.trail_marks.len() as u32
    }

    /// Adds a clause. Tautologies are skipped; an empty or root-falsified clause makes the engine inconsistent.
    pub fn add_clause(&mut self, mut literals: Vec<SatLiteral>) {
        if !self.consistent {
            return;
        }
        // Additions happen between solves; clear any decisions first.
        self.backtrack(0);

        literals.sort_unstable();
        literals.dedup();
        if literals.windows(2).any(|w| w[0] == -w[1]) {
            log::trace!(target: targets::ENGINE, "Tautology skipped");
            return;
        }
        for &literal in &literals {
            let polarity = usize::from(literal > 0);
            self.jeroslow_wang[variable_of(literal)][polarity] +=
                (0.5f64).powi(literals.len() as i32);
        }

        self.store(literals, false);
    }

    /// Stores a clause, sets up watches, and queues any forced literal.
    fn store(&mut self, literals: Vec<SatLiteral>, from_engine: bool) {
        match literals.len() {
            0 => {
                self.consistent = false;
            }

            1 => {
                let unit = literals[0];
                let index = self.clauses.len();
                self.clauses.push(EngineClause {
                    literals,
                    from_engine,
                });
                match self.value_of_literal(unit) {
                    None => self.enqueue(unit, Some(index)),
                    Some(true) => {}
                    Some(false) => {
                        if self.levels[variable_of(unit)] == 0 {
                            self.consistent = false;
                        }
                    }
                }
            }

            _ => {
                let mut literals = literals;
                // Watch two literals which are not false, when available.
                let mut cursor = 0;
                for position in 0..literals.len() {
                    if self.value_of_literal(literals[position]) != Some(false) {
                        literals.swap(cursor, position);
                        cursor += 1;
                        if cursor == 2 {
                            break;
                        }
                    }
                }

                let index = self.clauses.len();
                let first = literals[0];
                let second = literals[1];
                self.watches[watch_index(first)].push(index);
                self.watches[watch_index(second)].push(index);
                self.clauses.push(EngineClause {
                    literals,
                    from_engine,
                });

                match cursor {
                    0 => self.consistent = false,
                    1 => match self.value_of_literal(first) {
                        None => self.enqueue(first, Some(index)),
                        Some(true) => {}
                        Some(false) => self.consistent = false,
                    },
                    _ => {}
                }
            }
        }
    }

    fn enqueue(&mut self, literal: SatLiteral, reason: Option<usize>) {
        let variable = variable_of(literal);
        self.values[variable] = Some(literal > 0);
        self.levels[variable] = self.decision_level();
        self.reasons[variable] = reason;
        self.trail.push(literal);
    }

    fn backtrack(&mut self, target: u32) {
        let target = target as usize;
        if self.trail_marks.len() <= target {
            return;
        }
        let keep = self.trail_marks[target];
        for &literal in &self.trail[keep..] {
            let variable = variable_of(literal);
            self.values[variable] = None;
            self.reasons[variable] = None;
            self.saved_phase[variable] = Some(literal > 0);
            self.heap.push(variable);
        }
        self.trail.truncate(keep);
        self.trail_marks.truncate(target);
        self.propagated = keep.min(self.propagated);
    }

    /// Unit propagation. Returns the index of a conflicting clause, if one arises.
    fn propagate(&mut self) -> Option<usize> {
        while self.propagated < self.trail.len() {
            let assigned = self.trail[self.propagated];
            self.propagated += 1;
            let falsified = -assigned;

            let watch = watch_index(falsified);
            let list = std::mem::take(&mut self.watches[watch]);
            let mut keep = Vec::with_capacity(list.len());

            let mut position = 0;
            while position < list.len() {
                let clause_index = list[position];
                position += 1;

                let first = {
                    let clause = &mut self.clauses[clause_index];
                    if clause.literals[0] == falsified {
                        clause.literals.swap(0, 1);
                    }
                    clause.literals[0]
                };

                if self.value_of_literal(first) == Some(true) {
                    keep.push(clause_index);
                    continue;
                }

                let mut replaced = false;
                for k in 2..self.clauses[clause_index].literals.len() {
                    let candidate = self.clauses[clause_index].literals[k];
                    if self.value_of_literal(candidate) != Some(false) {
                        self.clauses[clause_index].literals.swap(1, k);
                        self.watches[watch_index(candidate)].push(clause_index);
                        replaced = true;
                        break;
                    }
                }
                if replaced {
                    continue;
                }

                keep.push(clause_index);
                match self.value_of_literal(first) {
                    None => self.enqueue(first, Some(clause_index)),

                    Some(false) => {
                        // Conflict: retain the rest of the list and hand the clause up.
                        keep.extend_from_slice(&list[position..]);
                        self.watches[watch] = keep;
                        self.propagated = self.trail.len();
                        return Some(clause_index);
                    }

                    Some(true) => unreachable!("satisfied clauses continue above"),
                }
            }

            self.watches[watch] = keep;
        }
        None
    }

    fn bump_variable(&mut self, variable: usize) {
        self.heap.bump(variable, self.activity_increment);
        if self.heap.activity_of(variable) > ACTIVITY_RESCALE_THRESHOLD {
            self.heap.scale_all(1.0 / ACTIVITY_RESCALE_THRESHOLD);
            self.activity_increment /= ACTIVITY_RESCALE_THRESHOLD;
        }
    }

    /// First-UIP analysis of a conflict. Returns the asserting clause, asserting literal first, with its backjump level.
    fn analyse(&mut self, conflict: usize) -> (Vec<SatLiteral>, u32) {
        let mut seen = vec![false; self.values.len()];
        let mut learned: Vec<SatLiteral> = vec![0];
        let mut on_current_level = 0usize;
        let mut pivot: Option<SatLiteral> = None;
        let mut cursor = self.trail.len();
        let mut clause_index = conflict;

        loop {
            let literals = self.clauses[clause_index].literals.clone();
            for &q in &literals {
                if pivot == Some(q) {
                    continue;
                }
                let variable = variable_of(q);
                if seen[variable] || self.levels[variable] == 0 {
                    continue;
                }
                seen[variable] = true;
                self.bump_variable(variable);
                if self.levels[variable] == self.decision_level() {
                    on_current_level += 1;
                } else {
                    learned.push(q);
                }
            }

            // Walk the trail back to the next marked literal of the current level.
            loop {
                cursor -= 1;
                let candidate = self.trail[cursor];
                if seen[variable_of(candidate)] {
                    pivot = Some(candidate);
                    break;
                }
            }
            let pivot_literal = pivot.unwrap_or_else(|| unreachable!());
            seen[variable_of(pivot_literal)] = false;
            on_current_level -= 1;

            if on_current_level == 0 {
                learned[0] = -pivot_literal;
                break;
            }

            clause_index = match self.reasons[variable_of(pivot_literal)] {
                Some(reason) => reason,
                None => unreachable!("a non-final literal of the conflict level has a reason"),
            };
        }

        let backjump = learned[1..]
            .iter()
            .map(|&l| self.levels[variable_of(l)])
            .max()
            .unwrap_or(0);

        // Position a literal of the backjump level second, so the watches assert on arrival.
        if learned.len() > 2 {
            let position = learned[1..]
                .iter()
                .position(|&l| self.levels[variable_of(l)] == backjump)
                .map(|p| p + 1)
                .unwrap_or(1);
            learned.swap(1, position);
        }

        (learned, backjump)
    }

    fn choose_variable(&mut self) -> Option<usize> {
        if self.randomise
            && self.values.len() > 1
            && self.rng.random_range(0..RANDOM_DECISION_MODULUS) == 0
        {
            let candidate = self.rng.random_range(1..self.values.len() as u32) as usize;
            if self.values[candidate].is_none() {
                return Some(candidate);
            }
        }
        while let Some(variable) = self.heap.pop_max() {
            if self.values[variable].is_none() {
                return Some(variable);
            }
        }
        None
    }

    fn phase_for(&self, variable: usize) -> bool {
        if let Some(saved) = self.saved_phase[variable] {
            return saved;
        }
        let [negative, positive] = self.jeroslow_wang[variable];
        match self.default_phase {
            DefaultPhase::False => false,
            DefaultPhase::True => true,
            DefaultPhase::JeroslowWang => positive >= negative,
            DefaultPhase::ReverseJeroslowWang => positive < negative,
        }
    }

    /// Determines satisfiability of the added clauses.
    pub fn solve(&mut self) -> SatResult {
        if !self.consistent {
            return SatResult::Unsatisfiable;
        }
        self.backtrack(0);

        let mut conflicts_since_restart = 0u32;
        if self.conflicts_before_restart == 0 {
            self.conflicts_before_restart = self.luby.next().unwrap_or(1) * LUBY_UNIT;
        }

        loop {
            match self.propagate() {
                Some(conflict) => {
                    if self.decision_level() == 0 {
                        log::info!(target: targets::ENGINE, "Root conflict established");
                        self.consistent = false;
                        return SatResult::Unsatisfiable;
                    }

                    let (learned, backjump) = self.analyse(conflict);
                    log::trace!(target: targets::ENGINE, "Learned {learned:?}, backjumping to {backjump}");
                    self.backtrack(backjump);

                    let asserting = learned[0];
                    if learned.len() == 1 {
                        let index = self.clauses.len();
                        self.clauses.push(EngineClause {
                            literals: learned,
                            from_engine: true,
                        });
                        self.enqueue(asserting, Some(index));
                    } else {
                        let index = self.clauses.len();
                        self.watches[watch_index(learned[0])].push(index);
                        self.watches[watch_index(learned[1])].push(index);
                        self.clauses.push(EngineClause {
                            literals: learned,
                            from_engine: true,
                        });
                        self.enqueue(asserting, Some(index));
                    }

                    self.activity_increment /= ACTIVITY_DECAY;
                    conflicts_since_restart += 1;

                    if conflicts_since_restart >= self.conflicts_before_restart {
                        conflicts_since_restart = 0;
                        self.conflicts_before_restart = self.luby.next().unwrap_or(1) * LUBY_UNIT;
                        self.backtrack(0);
                    }
                }

                None => match self.choose_variable() {
                    Some(variable) => {
                        let polarity = self.phase_for(variable);
                        let literal = if polarity {
                            variable as SatLiteral
                        } else {
                            -(variable as SatLiteral)
                        };
                        self.trail_marks.push(self.trail.len());
                        self.enqueue(literal, None);
                    }

                    None => return SatResult::Satisfiable,
                },
            }
        }
    }

    /// A partial dereference of the current model: values for a subset of variables which alone satisfies every clause added through [add_clause](Self::add_clause).
    pub fn partial_values(&self) -> Vec<Option<bool>> {
        let mut needed = vec![false; self.values.len()];

        for clause in self.clauses.iter().filter(|c| !c.from_engine) {
            let mut chosen = None;
            let mut covered = false;
            for &literal in &clause.literals {
                if self.value_of_literal(literal) == Some(true) {
                    if needed[variable_of(literal)] {
                        covered = true;
                        break;
                    }
                    if chosen.is_none() {
                        chosen = Some(variable_of(literal));
                    }
                }
            }
            if !covered {
                if let Some(variable) = chosen {
                    needed[variable] = true;
                }
            }
        }

        self.values
            .iter()
            .enumerate()
            .map(|(variable, value)| if needed[variable] { *value } else { None })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_literal() {
        let mut engine = CdclEngine::new();
        let p = engine.fresh_variable() as SatLiteral;
        engine.add_clause(vec![p]);
        assert_eq!(engine.solve(), SatResult::Satisfiable);
        assert_eq!(engine.value(p as SatVariable), Some(true));
    }

    #[test]
    fn all_four_binary_clauses_conflict() {
        let mut engine = CdclEngine::new();
        let p = engine.fresh_variable() as SatLiteral;
        let q = engine.fresh_variable() as SatLiteral;
        engine.add_clause(vec![p, q]);
        engine.add_clause(vec![-p, q]);
        engine.add_clause(vec![p, -q]);
        engine.add_clause(vec![-p, -q]);
        assert_eq!(engine.solve(), SatResult::Unsatisfiable);
    }

    #[test]
    fn unit_propagation_forces() {
        let mut engine = CdclEngine::new();
        let p = engine.fresh_variable() as SatLiteral;
        let q = engine.fresh_variable() as SatLiteral;
        engine.add_clause(vec![p, q]);
        engine.add_clause(vec![-p]);
        assert_eq!(engine.solve(), SatResult::Satisfiable);
        assert_eq!(engine.value(p as SatVariable), Some(false));
        assert_eq!(engine.value(q as SatVariable), Some(true));
    }

    #[test]
    fn tautologies_are_skipped() {
        let mut engine = CdclEngine::new();
        let p = engine.fresh_variable() as SatLiteral;
        engine.add_clause(vec![p, -p]);
        assert_eq!(engine.solve(), SatResult::Satisfiable);
    }

    #[test]
    fn incremental_additions() {
        let mut engine = CdclEngine::new();
        let p = engine.fresh_variable() as SatLiteral;
        let q = engine.fresh_variable() as SatLiteral;
        engine.add_clause(vec![p, q]);
        assert_eq!(engine.solve(), SatResult::Satisfiable);

        // Block the found model and continue.
        let block: Vec<SatLiteral> = [p, q]
            .iter()
            .filter_map(|&l| {
                engine
                    .value(l as SatVariable)
                    .map(|v| if v { -l } else { l })
            })
            .collect();
        engine.add_clause(block);
        assert_eq!(engine.solve(), SatResult::Satisfiable);

        engine.add_clause(vec![-p]);
        engine.add_clause(vec![-q]);
        assert_eq!(engine.solve(), SatResult::Unsatisfiable);
    }

    #[test]
    fn partial_values_cover_input_clauses() {
        let mut engine = CdclEngine::new();
        let p = engine.fresh_variable() as SatLiteral;
        let q = engine.fresh_variable() as SatLiteral;
        let r = engine.fresh_variable() as SatLiteral;
        engine.add_clause(vec![p, q]);
        engine.add_clause(vec![r]);
        assert_eq!(engine.solve(), SatResult::Satisfiable);

        let partial = engine.partial_values();
        // r is forced and must appear; p or q covers the first clause.
        assert_eq!(partial[r as usize], Some(true));
        let covers = |lit: SatLiteral| partial[variable_of(lit)].map(|v| v == (lit > 0));
        assert!(covers(p) == Some(true) || covers(q) == Some(true));
    }

    #[test]
    fn larger_pigeonhole_is_unsatisfiable() {
        // Three pigeons, two holes.
        let mut engine = CdclEngine::new();
        let mut at = [[0; 2]; 3];
        for pigeon in 0..3 {
            for hole in 0..2 {
                at[pigeon][hole] = engine.fresh_variable() as SatLiteral;
            }
        }
        for pigeon in 0..3 {
            engine.add_clause(vec![at[pigeon][0], at[pigeon][1]]);
        }
        for hole in 0..2 {
            for a in 0..3 {
                for b in (a + 1)..3 {
                    engine.add_clause(vec![-at[a][hole], -at[b][hole]]);
                }
            }
        }
        assert_eq!(engine.solve(), SatResult::Unsatisfiable);
    }
}
