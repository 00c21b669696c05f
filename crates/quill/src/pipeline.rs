//! Stage wiring: docstring → signature → automata → checkers → wrapper.
//!
//! Everything here is synchronous and completes before the decorated
//! callable is returned; checkers capture their dispatch tables by value
//! and never touch the registry again.

use quill_ast::Signature;
use quill_check::{CheckConfig, Checker, EmitOptions, OnBuildError, emit, wrap};
use quill_diag::{BuildError, CheckKind};
use quill_nfa::Builder;
use quill_syntax::parse_docstring;
use quill_value::{HostFn, Registry};

/// Compile the argument checker for a parsed signature.
///
/// Methods get `index_offset = 1` so the implicit receiver does not shift
/// user-visible argument indices.
pub fn build_argument_checker(
    signature: &Signature,
    registry: &Registry,
    stack_offset: u32,
) -> Result<Checker, BuildError> {
    let dfa = Builder::new(registry).argument_dfa(signature)?;
    emit(
        &dfa,
        registry,
        EmitOptions {
            kind: CheckKind::Argument,
            prefix: signature.error_prefix(),
            index_offset: usize::from(signature.is_method()),
            stack_offset,
        },
    )
}

/// Compile the return checker for a parsed signature.
pub fn build_return_checker(
    signature: &Signature,
    registry: &Registry,
    stack_offset: u32,
) -> Result<Checker, BuildError> {
    let dfa = Builder::new(registry).return_dfa(signature)?;
    emit(
        &dfa,
        registry,
        EmitOptions {
            kind: CheckKind::Return,
            prefix: signature.error_prefix(),
            index_offset: 0,
            stack_offset,
        },
    )
}

/// Build a stand-alone argument checker straight from a docstring.
pub fn check_args(docstring: &str, registry: &Registry) -> Result<Checker, BuildError> {
    let signature = parse_docstring(docstring)?;
    build_argument_checker(&signature, registry, 0)
}

/// Build a stand-alone return checker straight from a docstring.
pub fn check_rets(docstring: &str, registry: &Registry) -> Result<Checker, BuildError> {
    let signature = parse_docstring(docstring)?;
    build_return_checker(&signature, registry, 0)
}

/// Decorate `f` according to its docstring.
///
/// Build errors route through `config.on_build_error`: the default is
/// fatal, a callback consumes the error and degrades: the checker that
/// failed to build is dropped, and with no signature at all `f` comes back
/// unwrapped. A signature without return patterns never constrains
/// returns here; `check_rets` is the strict variant for that case.
pub fn decorate(
    f: HostFn,
    docstring: &str,
    config: &CheckConfig,
    registry: &Registry,
) -> Result<HostFn, BuildError> {
    if !config.enabled || (!config.check_arguments && !config.check_returns) {
        return Ok(f);
    }

    let signature = match parse_docstring(docstring) {
        Ok(signature) => signature,
        Err(err) => return build_failure(err, &config.on_build_error).map(|()| f),
    };

    let arguments = if config.check_arguments {
        match build_argument_checker(&signature, registry, config.stack_offset) {
            Ok(checker) => Some(checker),
            Err(err) => {
                build_failure(err, &config.on_build_error)?;
                None
            }
        }
    } else {
        None
    };

    let returns = if config.check_returns && !signature.returns.is_empty() {
        match build_return_checker(&signature, registry, config.stack_offset) {
            Ok(checker) => Some(checker),
            Err(err) => {
                build_failure(err, &config.on_build_error)?;
                None
            }
        }
    } else {
        None
    };

    Ok(wrap(f, arguments, returns))
}

fn build_failure(err: BuildError, policy: &OnBuildError) -> Result<(), BuildError> {
    match policy {
        OnBuildError::Fatal => Err(err),
        OnBuildError::Callback(handler) => {
            handler(&err);
            Ok(())
        }
    }
}
