//! Powerset construction from predicate NFAs to DFAs.
//!
//! Determinization is keyed by predicate identity, not by type-name text:
//! two distinct predicates sharing a name stay distinct transitions. The
//! construction keeps a list of state-sets and uses linear equality checks;
//! DFA state `1` is the ε-closure of the NFA start state.

use std::collections::BTreeSet;

use quill_value::PredicateId;

use crate::nfa::{Nfa, StateId};

/// A determinized edge. At most one per `(from, predicate)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DfaTransition {
    pub from: StateId,
    pub to: StateId,
    pub name: String,
    pub predicate: PredicateId,
}

/// The determinized automaton consumed by checker emission.
#[derive(Debug, Clone)]
pub struct Dfa {
    pub state_count: usize,
    /// Sorted by `(from, to, name, predicate)`: the canonical order for
    /// emission and for the expected-type lists in error messages.
    pub transitions: Vec<DfaTransition>,
    pub accept: BTreeSet<StateId>,
    /// Inherited from the NFA verbatim.
    pub needs_backtracking: bool,
}

impl Dfa {
    pub fn start(&self) -> StateId {
        1
    }

    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accept.contains(&state)
    }

    /// The outgoing transitions of `state`, in canonical order.
    pub fn outgoing(&self, state: StateId) -> impl Iterator<Item = &DfaTransition> {
        // Transitions are sorted by `from` first; a range scan would also
        // work, but states are tiny.
        self.transitions.iter().filter(move |t| t.from == state)
    }

    /// The expected type names out of `state`, canonical order, exact
    /// duplicates removed.
    pub fn expected_names(&self, state: StateId) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for t in self.outgoing(state) {
            if !names.iter().any(|n| n == &t.name) {
                names.push(t.name.clone());
            }
        }
        names
    }
}

/// Determinize `nfa` by the standard subset construction with ε-closure.
pub fn subset_construction(nfa: &Nfa) -> Dfa {
    let epsilon = epsilon_adjacency(nfa);
    let mut state_sets: Vec<BTreeSet<StateId>> = vec![closure_of(&epsilon, [nfa.start()])];
    let mut transitions: Vec<DfaTransition> = Vec::new();

    let mut index = 0;
    while index < state_sets.len() {
        let current = state_sets[index].clone();

        // Group this set's labeled transitions by predicate identity,
        // preserving first-seen order so discovery order is deterministic.
        let mut order: Vec<PredicateId> = Vec::new();
        let mut grouped: Vec<(String, BTreeSet<StateId>)> = Vec::new();
        for t in nfa.transitions() {
            let Some(label) = &t.label else { continue };
            if !current.contains(&t.from) {
                continue;
            }
            match order.iter().position(|p| *p == label.predicate) {
                Some(slot) => {
                    grouped[slot].1.insert(t.to);
                }
                None => {
                    order.push(label.predicate);
                    grouped.push((label.name.clone(), std::iter::once(t.to).collect()));
                }
            }
        }

        for (predicate, (name, targets)) in order.into_iter().zip(grouped) {
            let closed = closure_of(&epsilon, targets);
            let to = match state_sets.iter().position(|s| *s == closed) {
                Some(existing) => existing,
                None => {
                    state_sets.push(closed);
                    state_sets.len() - 1
                }
            };
            transitions.push(DfaTransition {
                from: index + 1,
                to: to + 1,
                name,
                predicate,
            });
        }

        index += 1;
    }

    let accept = state_sets
        .iter()
        .enumerate()
        .filter(|(_, set)| set.contains(&nfa.accept()))
        .map(|(i, _)| i + 1)
        .collect();

    transitions.sort_by(|a, b| {
        (a.from, a.to, &a.name, a.predicate).cmp(&(b.from, b.to, &b.name, b.predicate))
    });

    Dfa {
        state_count: state_sets.len(),
        transitions,
        accept,
        needs_backtracking: nfa.needs_backtracking,
    }
}

fn epsilon_adjacency(nfa: &Nfa) -> Vec<Vec<StateId>> {
    let mut adjacency = vec![Vec::new(); nfa.size() + 1];
    for t in nfa.transitions() {
        if t.label.is_none() {
            adjacency[t.from].push(t.to);
        }
    }
    adjacency
}

fn closure_of(
    epsilon: &[Vec<StateId>],
    seed: impl IntoIterator<Item = StateId>,
) -> BTreeSet<StateId> {
    let mut closed: BTreeSet<StateId> = seed.into_iter().collect();
    let mut worklist: Vec<StateId> = closed.iter().copied().collect();
    while let Some(state) = worklist.pop() {
        for &next in &epsilon[state] {
            if closed.insert(next) {
                worklist.push(next);
            }
        }
    }
    closed
}
