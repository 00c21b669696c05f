//! Checker emission: from a DFA to an executable value-sequence checker.
//!
//! Emission resolves every transition's predicate slot into a dense
//! per-state dispatch table, so checking never touches the registry. The
//! two execution modes share this skeleton; the backtracking flag decides
//! whether a matching edge is a commitment or a choice point.

use std::collections::HashSet;

use quill_diag::{BuildError, CheckError, CheckFailure, CheckKind};
use quill_nfa::Dfa;
use quill_value::{Predicate, Registry, Value};

/// Emission parameters beyond the DFA itself.
#[derive(Debug, Clone)]
pub struct EmitOptions {
    pub kind: CheckKind,
    /// Error-message prefix: the designator with `:` rendered as `.`.
    pub prefix: String,
    /// Subtracted from reported positions so an implicit method receiver
    /// does not shift user-visible indices.
    pub index_offset: usize,
    /// Carried opaquely onto every produced error; points the host's
    /// traceback at the caller instead of the checker.
    pub stack_offset: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Commit to the first matching transition.
    Linear,
    /// Try matching transitions in order, backtracking on later failure.
    Backtracking,
}

struct CompiledEdge {
    name: String,
    predicate: Predicate,
    /// 0-based index into `Checker::states`.
    to: usize,
}

struct CompiledState {
    edges: Vec<CompiledEdge>,
    accepting: bool,
    /// Expected type names in canonical order, duplicates removed.
    /// Precomputed so error paths don't re-derive them.
    expected: Vec<String>,
}

/// A compiled checker over a positional value sequence.
///
/// Pure: closes over its dispatch table and predicate clones, mutates
/// nothing, and is deterministic for fixed inputs.
pub struct Checker {
    states: Vec<CompiledState>,
    mode: Mode,
    kind: CheckKind,
    prefix: String,
    index_offset: usize,
    stack_offset: u32,
}

/// Compile `dfa` against `registry`.
///
/// Every predicate slot the DFA references must still be present; slots
/// are append-only, so this only fails if the DFA was built against a
/// different registry.
pub fn emit(dfa: &Dfa, registry: &Registry, options: EmitOptions) -> Result<Checker, BuildError> {
    let mut states = Vec::with_capacity(dfa.state_count);
    for state in 1..=dfa.state_count {
        let mut edges = Vec::new();
        for t in dfa.outgoing(state) {
            let predicate = registry
                .predicate(t.predicate)
                .ok_or_else(|| BuildError::UndefinedType(t.name.clone()))?
                .clone();
            edges.push(CompiledEdge {
                name: t.name.clone(),
                predicate,
                to: t.to - 1,
            });
        }
        states.push(CompiledState {
            edges,
            accepting: dfa.is_accepting(state),
            expected: dfa.expected_names(state),
        });
    }
    Ok(Checker {
        states,
        mode: if dfa.needs_backtracking {
            Mode::Backtracking
        } else {
            Mode::Linear
        },
        kind: options.kind,
        prefix: options.prefix,
        index_offset: options.index_offset,
        stack_offset: options.stack_offset,
    })
}

impl Checker {
    /// Validate a value sequence. `Ok(())` passes the values through
    /// untouched; `Err` carries the full failure report.
    pub fn check(&self, values: &[Value]) -> Result<(), CheckError> {
        match self.mode {
            Mode::Linear => self.check_linear(values),
            Mode::Backtracking => self.check_backtracking(values),
        }
    }

    pub fn kind(&self) -> CheckKind {
        self.kind
    }

    pub fn stack_offset(&self) -> u32 {
        self.stack_offset
    }

    /// Whether this checker runs in backtracking mode.
    pub fn backtracks(&self) -> bool {
        self.mode == Mode::Backtracking
    }

    fn check_linear(&self, values: &[Value]) -> Result<(), CheckError> {
        let mut state = 0;
        for (index, value) in values.iter().enumerate() {
            let info = &self.states[state];
            match info.edges.iter().find(|e| (e.predicate)(value)) {
                Some(edge) => state = edge.to,
                None => return Err(self.error(vec![self.dead_end(state, index, value)])),
            }
        }
        if self.states[state].accepting {
            Ok(())
        } else {
            Err(self.error(vec![self.exhausted(state, values.len())]))
        }
    }

    fn check_backtracking(&self, values: &[Value]) -> Result<(), CheckError> {
        let mut failed = HashSet::new();
        if self.accepts(values, 0, 0, &mut failed) {
            return Ok(());
        }
        // Second pass: walk the same exploration tree and report every
        // dead end once, in discovery order.
        let mut visited = HashSet::new();
        let mut failures = Vec::new();
        self.collect_failures(values, 0, 0, &mut visited, &mut failures);
        Err(self.error(failures))
    }

    /// Depth-first trial. `failed` memoizes (state, position) pairs known
    /// not to reach acceptance, bounding the search.
    fn accepts(
        &self,
        values: &[Value],
        state: usize,
        index: usize,
        failed: &mut HashSet<(usize, usize)>,
    ) -> bool {
        if failed.contains(&(state, index)) {
            return false;
        }
        let ok = if index == values.len() {
            self.states[state].accepting
        } else {
            self.states[state]
                .edges
                .iter()
                .filter(|e| (e.predicate)(&values[index]))
                .any(|e| self.accepts(values, e.to, index + 1, failed))
        };
        if !ok {
            failed.insert((state, index));
        }
        ok
    }

    fn collect_failures(
        &self,
        values: &[Value],
        state: usize,
        index: usize,
        visited: &mut HashSet<(usize, usize)>,
        out: &mut Vec<CheckFailure>,
    ) {
        if !visited.insert((state, index)) {
            return;
        }
        if index == values.len() {
            if !self.states[state].accepting {
                out.push(self.exhausted(state, index));
            }
            return;
        }
        let mut advanced = false;
        for edge in &self.states[state].edges {
            if (edge.predicate)(&values[index]) {
                advanced = true;
                self.collect_failures(values, edge.to, index + 1, visited, out);
            }
        }
        if !advanced {
            out.push(self.dead_end(state, index, &values[index]));
        }
    }

    /// The failure for a value matching no transition at `state`.
    fn dead_end(&self, state: usize, index: usize, value: &Value) -> CheckFailure {
        let info = &self.states[state];
        let position = self.reported(index + 1);
        if info.edges.is_empty() {
            // Only accept states have no outgoing edges, so the value is
            // purely surplus.
            CheckFailure::TooMany {
                limit: position.saturating_sub(1),
            }
        } else {
            CheckFailure::Mismatch {
                position,
                expected: info.expected.clone(),
                got: value.kind_name().to_string(),
                too_many: info
                    .accepting
                    .then(|| position.saturating_sub(1)),
            }
        }
    }

    /// The failure for input ending in a non-accepting state.
    fn exhausted(&self, state: usize, consumed: usize) -> CheckFailure {
        CheckFailure::Missing {
            position: self.reported(consumed + 1),
            expected: self.states[state].expected.clone(),
        }
    }

    fn reported(&self, position: usize) -> usize {
        position.saturating_sub(self.index_offset)
    }

    fn error(&self, failures: Vec<CheckFailure>) -> CheckError {
        CheckError {
            prefix: self.prefix.clone(),
            kind: self.kind,
            failures,
            stack_offset: self.stack_offset,
        }
    }
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checker")
            .field("states", &self.states.len())
            .field("mode", &self.mode)
            .field("kind", &self.kind)
            .field("prefix", &self.prefix)
            .finish()
    }
}
