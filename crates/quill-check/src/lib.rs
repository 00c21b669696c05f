//! Checker emission and call-site wrapping for quill.
//!
//! This crate is the pipeline's backend: it consumes the DFAs built by
//! `quill-nfa` and produces executable checkers with the frozen error
//! message contract, plus the decoration step that composes them around a
//! host callable.

pub mod checker;
pub mod decorate;

pub use checker::{Checker, EmitOptions, emit};
pub use decorate::{CheckConfig, OnBuildError, wrap};
