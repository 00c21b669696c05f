//! Docstring-driven runtime type checking for dynamic hosts.
//!
//! quill attaches human-written docstrings to host callables and derives
//! compiled argument/return checkers from the signature paragraph inside
//! them. The pipeline:
//!
//! ```text
//! docstring ──parse──▶ Signature ──build──▶ NFA ──determinize──▶ DFA
//!     ──emit──▶ Checker ──wrap──▶ decorated callable
//! ```
//!
//! The crates under the hood mirror those stages: `quill-syntax` parses,
//! `quill-nfa` builds and determinizes, `quill-check` emits and wraps,
//! with `quill-ast`, `quill-value`, and `quill-diag` supplying the shared
//! vocabulary. This crate re-exports the public surface and wires the
//! stages together.
//!
//! ```
//! use std::rc::Rc;
//! use quill::{CheckConfig, Registry, Value, decorate};
//!
//! let registry = Registry::new();
//! let double: quill::HostFn = Rc::new(|values: &[Value]| match values {
//!     [Value::Number(n)] => Ok(vec![Value::Number(n * 2.0)]),
//!     _ => Ok(vec![Value::Nil]),
//! });
//! let doc = "double( n ) ==> number n : number";
//! let wrapped = decorate(double, doc, &CheckConfig::default(), &registry).unwrap();
//! assert!(wrapped(&[Value::Number(21.0)]).is_ok());
//! assert!(wrapped(&[Value::string("x")]).is_err());
//! ```

pub mod pipeline;

pub use quill_ast::{Designator, ParamNode, Signature, Span, Spanned, TypeExpr};
pub use quill_check::{CheckConfig, Checker, EmitOptions, OnBuildError, emit, wrap};
pub use quill_diag::{
    BuildError, Category, CheckError, CheckFailure, CheckKind, Diagnostic, Severity,
    SourceLocation,
};
pub use quill_nfa::{BuildStage, BuildStep, Builder, Dfa, Nfa, NfaFlags};
pub use quill_syntax::parse_docstring;
pub use quill_value::{
    HostFn, Predicate, PredicateId, Registry, Userdata, Value, ValueKind, is_valid_type_name,
};

pub use pipeline::{
    build_argument_checker, build_return_checker, check_args, check_rets, decorate,
};
