//! Predicate automata construction and determinization for quill.
//!
//! This crate is the algorithmic middle of the pipeline: it turns a parsed
//! [`Signature`] into NFAs over value predicates (`nfa`, `assemble`),
//! determinizes them by subset construction (`dfa`), and records whether
//! runtime backtracking will be needed. Checker emission lives downstream
//! in `quill-check`.

pub mod assemble;
pub mod dfa;
pub mod nfa;
pub mod trace;

use quill_ast::Signature;
use quill_diag::BuildError;
use quill_value::Registry;

pub use assemble::{assemble_arguments, assemble_returns};
pub use dfa::{Dfa, DfaTransition, subset_construction};
pub use nfa::{Nfa, StateId, Transition, TransitionLabel, from_type_expr};
pub use trace::{BuildStage, BuildStep, NfaFlags};

/// Builds argument and return DFAs for signatures against one registry,
/// optionally tracing each stage.
pub struct Builder<'r> {
    registry: &'r Registry,
    trace: Option<Vec<BuildStep>>,
}

impl<'r> Builder<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            trace: None,
        }
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// Start recording build steps. Disabled builders pay nothing.
    pub fn enable_tracing(&mut self) {
        if self.trace.is_none() {
            self.trace = Some(Vec::new());
        }
    }

    pub fn tracing_enabled(&self) -> bool {
        self.trace.is_some()
    }

    /// Drain the recorded steps.
    pub fn take_trace(&mut self) -> Vec<BuildStep> {
        self.trace.as_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Note a successfully parsed signature in the trace.
    pub fn record_signature(&mut self, signature: &Signature) {
        self.record(
            BuildStage::SignatureParsed,
            format!(
                "signature `{}` with {} parameter(s), {} return pattern(s)",
                signature.designator,
                signature.params.len(),
                signature.returns.len()
            ),
            None,
            None,
            None,
        );
    }

    /// Assemble and determinize the argument automaton.
    pub fn argument_dfa(&mut self, signature: &Signature) -> Result<Dfa, BuildError> {
        let nfa = assemble_arguments(signature, self.registry)?;
        self.record_nfa(BuildStage::ArgumentsAssembled, &nfa);
        Ok(self.determinize(nfa))
    }

    /// Assemble and determinize the return automaton.
    pub fn return_dfa(&mut self, signature: &Signature) -> Result<Dfa, BuildError> {
        let nfa = assemble_returns(signature, self.registry)?;
        self.record_nfa(BuildStage::ReturnsAssembled, &nfa);
        Ok(self.determinize(nfa))
    }

    fn determinize(&mut self, nfa: Nfa) -> Dfa {
        let dfa = subset_construction(&nfa);
        self.record(
            BuildStage::Determinized,
            format!("{} state(s)", dfa.state_count),
            Some(dfa.state_count),
            Some(dfa.transitions.len()),
            None,
        );
        let mode = if dfa.needs_backtracking {
            "backtracking"
        } else {
            "linear"
        };
        self.record(BuildStage::ModeSelected, mode.to_string(), None, None, None);
        dfa
    }

    fn record_nfa(&mut self, stage: BuildStage, nfa: &Nfa) {
        let flags = NfaFlags::of(nfa);
        self.record(
            stage,
            format!("{} state(s)", nfa.size()),
            Some(nfa.size()),
            Some(nfa.transitions().len()),
            Some(flags),
        );
    }

    fn record(
        &mut self,
        stage: BuildStage,
        detail: String,
        states: Option<usize>,
        transitions: Option<usize>,
        flags: Option<NfaFlags>,
    ) {
        let Some(trace) = &mut self.trace else { return };
        trace.push(BuildStep {
            step: trace.len(),
            stage,
            detail,
            states,
            transitions,
            flags,
        });
    }
}
