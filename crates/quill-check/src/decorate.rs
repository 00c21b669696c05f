//! Call-site wrapping and decoration configuration.
//!
//! The wrapping step is deliberately dumb: given the two compiled checkers
//! it composes `R(f(A(inputs)))`, dropping whichever side is absent. All
//! policy (enablement, build-error routing) lives in [`CheckConfig`] and is
//! captured by value at decoration time; reconfiguring afterwards never
//! changes an existing wrapper.

use std::fmt;
use std::rc::Rc;

use quill_diag::BuildError;
use quill_value::{HostFn, Value};

use crate::checker::Checker;

/// What to do with a build-time error during decoration.
#[derive(Clone, Default)]
pub enum OnBuildError {
    /// Elevate to fatal: decoration fails with the error.
    #[default]
    Fatal,
    /// Deliver the error to the handler and degrade: the checker that
    /// failed to build is skipped.
    Callback(Rc<dyn Fn(&BuildError)>),
}

impl fmt::Debug for OnBuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OnBuildError::Fatal => f.write_str("Fatal"),
            OnBuildError::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// Decoration-time configuration.
#[derive(Debug, Clone)]
pub struct CheckConfig {
    /// When false, decoration returns the function unchanged.
    pub enabled: bool,
    pub check_arguments: bool,
    pub check_returns: bool,
    pub on_build_error: OnBuildError,
    /// Forwarded to emitted checkers; see `EmitOptions::stack_offset`.
    pub stack_offset: u32,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_arguments: true,
            check_returns: true,
            on_build_error: OnBuildError::Fatal,
            stack_offset: 0,
        }
    }
}

/// Wrap `f` with the available checkers.
///
/// With neither checker this is `f` itself, not a new closure.
pub fn wrap(f: HostFn, arguments: Option<Checker>, returns: Option<Checker>) -> HostFn {
    match (arguments, returns) {
        (None, None) => f,
        (arguments, returns) => Rc::new(move |values: &[Value]| {
            if let Some(checker) = &arguments {
                checker.check(values)?;
            }
            let outputs = f(values)?;
            if let Some(checker) = &returns {
                checker.check(&outputs)?;
            }
            Ok(outputs)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checker::{EmitOptions, emit};
    use quill_diag::CheckKind;
    use quill_nfa::Builder;
    use quill_value::{Registry, Value};
    use std::cell::Cell;

    fn checker(doc: &str, kind: CheckKind, registry: &Registry) -> Checker {
        let signature = quill_syntax::parse_docstring(doc).expect("test signature parses");
        let mut builder = Builder::new(registry);
        let dfa = match kind {
            CheckKind::Argument => builder.argument_dfa(&signature),
            CheckKind::Return => builder.return_dfa(&signature),
        }
        .expect("DFA builds");
        emit(
            &dfa,
            registry,
            EmitOptions {
                kind,
                prefix: signature.error_prefix(),
                index_offset: 0,
                stack_offset: 0,
            },
        )
        .expect("emission succeeds")
    }

    #[test]
    fn wrap_with_neither_checker_is_the_function_itself() {
        let f: HostFn = Rc::new(|_| Ok(vec![]));
        let wrapped = wrap(f.clone(), None, None);
        assert!(Rc::ptr_eq(&f, &wrapped));
    }

    #[test]
    fn wrapped_callable_validates_both_sides() {
        let registry = Registry::new();
        let doc = "double( n ) ==> number n : number";
        let arguments = checker(doc, CheckKind::Argument, &registry);
        let returns = checker(doc, CheckKind::Return, &registry);
        let calls = Rc::new(Cell::new(0));
        let seen = calls.clone();
        let f: HostFn = Rc::new(move |values: &[Value]| {
            seen.set(seen.get() + 1);
            match values {
                [Value::Number(n)] => Ok(vec![Value::Number(n * 2.0)]),
                _ => Ok(vec![Value::Nil]),
            }
        });
        let wrapped = wrap(f, Some(arguments), Some(returns));

        let outputs = wrapped(&[Value::Number(21.0)]).expect("valid call");
        assert!(matches!(outputs[..], [Value::Number(n)] if n == 42.0));
        assert_eq!(calls.get(), 1);

        // Argument rejection happens before the function runs.
        let err = wrapped(&[Value::string("x")]).unwrap_err();
        assert!(err.to_string().contains("argument no. 1"));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn return_rejection_surfaces_after_the_call() {
        let registry = Registry::new();
        let doc = "lie( n ) ==> string n : number";
        let returns = checker(doc, CheckKind::Return, &registry);
        let f: HostFn = Rc::new(|_| Ok(vec![Value::Boolean(true)]));
        let wrapped = wrap(f, None, Some(returns));
        let err = wrapped(&[Value::Number(1.0)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "lie: string expected for return value no. 1 (got boolean)."
        );
    }

    #[test]
    fn argument_only_wrapping_passes_outputs_through() {
        let registry = Registry::new();
        let doc = "id( n ) n : number";
        let arguments = checker(doc, CheckKind::Argument, &registry);
        let f: HostFn = Rc::new(|values| Ok(values.to_vec()));
        let wrapped = wrap(f, Some(arguments), None);
        let outputs = wrapped(&[Value::Number(7.0)]).expect("valid call");
        assert!(matches!(outputs[..], [Value::Number(n)] if n == 7.0));
    }
}
