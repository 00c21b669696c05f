//! Nondeterministic finite automata over value predicates.
//!
//! States are 1-based integers: state `1` is the sole start state and state
//! `size` the sole accept state, which never has outgoing edges. The graph
//! is a flat transition list; construction renumbers and appends, never
//! builds pointer structures.

use quill_ast::TypeExpr;
use quill_diag::BuildError;
use quill_value::{PredicateId, Registry, Value};

pub type StateId = usize;

/// A labeled edge. `label == None` is an ε-transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub from: StateId,
    pub to: StateId,
    pub label: Option<TransitionLabel>,
}

/// The predicate a non-ε edge consumes one value with.
///
/// The name rides along for error messages; identity is the predicate slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionLabel {
    pub name: String,
    pub predicate: PredicateId,
}

/// An NFA under construction.
///
/// The three flags accumulate monotonically; no operation ever clears one.
#[derive(Debug, Clone)]
pub struct Nfa {
    size: usize,
    transitions: Vec<Transition>,
    /// Some transition refers to a user-defined predicate.
    pub has_user_type: bool,
    /// The graph branches or loops (is not a plain chain).
    pub is_nonlinear: bool,
    /// Subset construction may leave ambiguity over user predicates that
    /// only runtime backtracking can resolve. Conservative: may be true
    /// when linear evaluation would in fact suffice, never the reverse.
    pub needs_backtracking: bool,
}

impl Nfa {
    /// The automaton accepting exactly the empty sequence: one state that
    /// is both start and accept.
    pub fn empty() -> Self {
        Self {
            size: 1,
            transitions: Vec::new(),
            has_user_type: false,
            is_nonlinear: false,
            needs_backtracking: false,
        }
    }

    /// A two-state automaton consuming one value matching `predicate`.
    pub fn atom(name: impl Into<String>, predicate: PredicateId, user: bool) -> Self {
        Self {
            size: 2,
            transitions: vec![Transition {
                from: 1,
                to: 2,
                label: Some(TransitionLabel {
                    name: name.into(),
                    predicate,
                }),
            }],
            has_user_type: user,
            is_nonlinear: false,
            needs_backtracking: false,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn start(&self) -> StateId {
        1
    }

    pub fn accept(&self) -> StateId {
        self.size
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    /// Append `other`, renumbering its states after ours and bridging our
    /// old accept to its start with an ε-edge.
    pub fn concat(&mut self, other: Nfa) {
        // A user-typed element appended to an already branching graph can
        // make the determinized automaton ambiguous; flag it before the
        // append folds the graphs together.
        if self.is_nonlinear && other.has_user_type {
            self.needs_backtracking = true;
        }
        let offset = self.size;
        self.transitions.push(Transition {
            from: self.size,
            to: offset + 1,
            label: None,
        });
        self.transitions.extend(
            other
                .transitions
                .into_iter()
                .map(|t| t.renumbered(offset)),
        );
        self.size += other.size;
        self.has_user_type |= other.has_user_type;
        self.is_nonlinear |= other.is_nonlinear;
        self.needs_backtracking |= other.needs_backtracking;
    }

    /// Splice `children` between a fresh common start and a fresh common
    /// accept.
    pub fn alternation(children: Vec<Nfa>) -> Self {
        let mut nfa = Nfa::empty();
        let mut child_accepts = Vec::with_capacity(children.len());
        for child in children {
            let offset = nfa.size;
            nfa.transitions.push(Transition {
                from: 1,
                to: offset + 1,
                label: None,
            });
            nfa.transitions
                .extend(child.transitions.into_iter().map(|t| t.renumbered(offset)));
            nfa.size += child.size;
            child_accepts.push(offset + child.size);
            nfa.has_user_type |= child.has_user_type;
            nfa.needs_backtracking |= child.needs_backtracking;
        }
        let accept = nfa.size + 1;
        nfa.size = accept;
        for child_accept in child_accepts {
            nfa.transitions.push(Transition {
                from: child_accept,
                to: accept,
                label: None,
            });
        }
        nfa.is_nonlinear = true;
        if nfa.has_user_type {
            nfa.needs_backtracking = true;
        }
        nfa
    }

    /// Zero-or-one: an ε-edge from start to accept.
    pub fn optional(&mut self) {
        // Never introduce an ε-self-loop; the one-state automaton is
        // already optional.
        if self.size > 1 {
            self.transitions.push(Transition {
                from: 1,
                to: self.size,
                label: None,
            });
        }
        self.is_nonlinear = true;
        if self.has_user_type {
            self.needs_backtracking = true;
        }
    }

    /// Zero-or-more: one-or-more (accept loops back to start, fresh accept
    /// so the accept state keeps no outgoing edges), made optional.
    pub fn star(&mut self) {
        if self.size > 1 {
            self.transitions.push(Transition {
                from: self.size,
                to: 1,
                label: None,
            });
            let fresh = self.size + 1;
            self.transitions.push(Transition {
                from: self.size,
                to: fresh,
                label: None,
            });
            self.size = fresh;
        }
        self.optional();
    }

    /// Reference acceptance check by direct ε-closure stepping. The subset
    /// construction must agree with this on every input; property tests
    /// hold it to that.
    pub fn simulate(&self, registry: &Registry, values: &[Value]) -> bool {
        let mut current = self.closure(std::iter::once(1).collect());
        for value in values {
            let mut next: Vec<StateId> = Vec::new();
            for t in &self.transitions {
                let Some(label) = &t.label else { continue };
                if !current.contains(&t.from) || next.contains(&t.to) {
                    continue;
                }
                let matched = registry
                    .predicate(label.predicate)
                    .map(|pred| pred(value))
                    .unwrap_or(false);
                if matched {
                    next.push(t.to);
                }
            }
            current = self.closure(next);
            if current.is_empty() {
                return false;
            }
        }
        current.contains(&self.size)
    }

    fn closure(&self, mut states: Vec<StateId>) -> Vec<StateId> {
        let mut i = 0;
        while i < states.len() {
            let state = states[i];
            for t in &self.transitions {
                if t.label.is_none() && t.from == state && !states.contains(&t.to) {
                    states.push(t.to);
                }
            }
            i += 1;
        }
        states.sort_unstable();
        states
    }
}

impl Transition {
    fn renumbered(mut self, offset: usize) -> Self {
        self.from += offset;
        self.to += offset;
        self
    }
}

/// Translate a type expression into an NFA, resolving names in the
/// registry. An unregistered name fails the build here, never at check
/// time.
pub fn from_type_expr(expr: &TypeExpr, registry: &Registry) -> Result<Nfa, BuildError> {
    match expr {
        TypeExpr::Name(name) => {
            let id = registry
                .resolve(name)
                .ok_or_else(|| BuildError::UndefinedType(name.clone()))?;
            Ok(Nfa::atom(name.clone(), id, !registry.is_primitive(id)))
        }
        TypeExpr::Seq(children) => {
            let mut iter = children.iter();
            let first = iter
                .next()
                .ok_or_else(|| BuildError::MalformedSignature {
                    pos: 0,
                    reason: "empty sequence in type expression".to_string(),
                })?;
            let mut nfa = from_type_expr(first, registry)?;
            for child in iter {
                nfa.concat(from_type_expr(child, registry)?);
            }
            Ok(nfa)
        }
        TypeExpr::Alt(children) => {
            let built = children
                .iter()
                .map(|child| from_type_expr(child, registry))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Nfa::alternation(built))
        }
        TypeExpr::Star(child) => {
            let mut nfa = from_type_expr(child, registry)?;
            nfa.star();
            Ok(nfa)
        }
        TypeExpr::Opt(child) => {
            let mut nfa = from_type_expr(child, registry)?;
            nfa.optional();
            Ok(nfa)
        }
    }
}
