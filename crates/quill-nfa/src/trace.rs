//! Tracing types for pipeline observability.
//!
//! These records capture the stages a docstring goes through on its way to
//! a checker, for hosts that expose build introspection. All tracing is
//! opt-in via `Builder::enable_tracing()`; disabled builders pay nothing.

use serde::Serialize;

/// A single step in a build trace.
#[derive(Debug, Clone, Serialize)]
pub struct BuildStep {
    pub step: usize,
    pub stage: BuildStage,
    /// Human-readable summary of the stage outcome.
    pub detail: String,
    /// State count of the automaton produced by this stage, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub states: Option<usize>,
    /// Transition count of the automaton produced by this stage, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transitions: Option<usize>,
    /// Construction flags after this stage, if the stage builds an NFA.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<NfaFlags>,
}

/// Which pipeline stage produced a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildStage {
    /// A docstring paragraph committed and parsed as a signature.
    SignatureParsed,
    /// The argument-list NFA was assembled from the parameter tree.
    ArgumentsAssembled,
    /// The return-pattern NFA was assembled.
    ReturnsAssembled,
    /// Subset construction produced a DFA.
    Determinized,
    /// The execution mode the flags selected for emission.
    ModeSelected,
}

/// Snapshot of the three NFA construction flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NfaFlags {
    pub has_user_type: bool,
    pub is_nonlinear: bool,
    pub needs_backtracking: bool,
}

impl NfaFlags {
    pub fn of(nfa: &crate::nfa::Nfa) -> Self {
        Self {
            has_user_type: nfa.has_user_type,
            is_nonlinear: nfa.is_nonlinear,
            needs_backtracking: nfa.needs_backtracking,
        }
    }
}
