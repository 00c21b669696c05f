//! Error reporting and diagnostics for quill.
//!
//! This crate defines the two error families of the pipeline: build-time
//! errors (produced while turning a docstring into a checker) and check-time
//! errors (produced while validating values). Build-time errors are created
//! by `quill-syntax` and `quill-nfa` as structured [`Diagnostic`]s and
//! surface as [`BuildError`]; check-time errors render through the frozen
//! message templates on [`CheckError`].

use std::fmt;

// ---------------------------------------------------------------------------
// Diagnostic severity and categories
// ---------------------------------------------------------------------------

/// How severe a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

/// Broad category for diagnostics. Used for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// The docstring contains no signature paragraph.
    NoSignature,
    /// A committed signature paragraph failed to parse.
    MalformedSignature,
    /// A parameter has more than one mapping line.
    ParamRedefined,
    /// A parameter name appears more than once in the parameter list.
    DuplicateParamUse,
    /// A referenced type name has no registry entry.
    UndefinedType,
    /// A registered type name violates the identifier grammar.
    InvalidTypeName,
    /// A value failed the predicate set at its position.
    UnexpectedValue,
    /// The value sequence ended before an accepting state.
    MissingValues,
    /// The value sequence continued past an accepting state with no edges.
    TooMany,
    /// Invariant violation inside the pipeline. Programmer error.
    Internal,
}

impl Category {
    pub const ALL: [Category; 10] = [
        Category::NoSignature,
        Category::MalformedSignature,
        Category::ParamRedefined,
        Category::DuplicateParamUse,
        Category::UndefinedType,
        Category::InvalidTypeName,
        Category::UnexpectedValue,
        Category::MissingValues,
        Category::TooMany,
        Category::Internal,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::NoSignature => "no_signature",
            Category::MalformedSignature => "malformed_signature",
            Category::ParamRedefined => "param_redefined",
            Category::DuplicateParamUse => "duplicate_param_use",
            Category::UndefinedType => "undefined_type",
            Category::InvalidTypeName => "invalid_type_name",
            Category::UnexpectedValue => "unexpected_value",
            Category::MissingValues => "missing_values",
            Category::TooMany => "too_many",
            Category::Internal => "internal",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::NoSignature => "E0001",
            Category::MalformedSignature => "E0002",
            Category::ParamRedefined => "E0003",
            Category::DuplicateParamUse => "E0004",
            Category::UndefinedType => "E0005",
            Category::InvalidTypeName => "E0006",
            Category::UnexpectedValue => "E0101",
            Category::MissingValues => "E0102",
            Category::TooMany => "E0103",
            Category::Internal => "E0901",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::NoSignature => "No paragraph of the docstring matches the signature grammar.",
            Category::MalformedSignature => {
                "A paragraph opened like a signature but failed to parse completely."
            }
            Category::ParamRedefined => "A parameter name has more than one mapping line.",
            Category::DuplicateParamUse => {
                "A parameter name is used more than once in the parameter list."
            }
            Category::UndefinedType => "A type name is not registered as a predicate.",
            Category::InvalidTypeName => "A type name does not match the identifier grammar.",
            Category::UnexpectedValue => "A value does not match any expected type at its position.",
            Category::MissingValues => "Required values are missing at the end of the sequence.",
            Category::TooMany => "Surplus values follow a complete sequence.",
            Category::Internal => "Internal invariant violation in the checking pipeline.",
        }
    }
}

// ---------------------------------------------------------------------------
// Source locations
// ---------------------------------------------------------------------------

/// A byte-offset location within a docstring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub start: u32,
    pub end: u32,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured diagnostic message.
///
/// Created by the parser and builder crates, then either rendered directly
/// or folded into a [`BuildError`] for the decoration entry points.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Stable diagnostic code (e.g. E0002).
    pub code: Option<String>,
    pub severity: Severity,
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong, as a docstring byte range.
    pub location: Option<SourceLocation>,
    /// Suggested fix, if any.
    pub help: Option<String>,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity: Severity::Error,
            category,
            message: message.into(),
            location: None,
            help: None,
        }
    }

    pub fn warning(category: Category, message: impl Into<String>) -> Self {
        Self {
            code: Some(category.code().to_string()),
            severity: Severity::Warning,
            category,
            message: message.into(),
            location: None,
            help: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        if let Some(code) = &self.code {
            write!(f, "{prefix}[{code}]: {}", self.message)?;
        } else {
            write!(f, "{prefix}: {}", self.message)?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Build-time errors
// ---------------------------------------------------------------------------

/// An error produced while turning a docstring into a checker.
///
/// Routed to the decoration config's `on_build_error`; the default elevates
/// it to fatal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// No paragraph of the docstring matched the signature grammar.
    /// `detail` carries the best-effort reason from the paragraph whose
    /// parse progressed furthest.
    #[error("no signature found in docstring{}", .detail.as_deref().map(|d| format!(" ({d})")).unwrap_or_default())]
    NoSignature { detail: Option<String> },

    /// A committed signature paragraph failed to parse.
    #[error("malformed signature at offset {pos}: {reason}")]
    MalformedSignature { pos: u32, reason: String },

    /// A parameter has more than one mapping line.
    #[error("parameter `{0}` redefined")]
    ParamRedefined(String),

    /// A parameter name is consumed twice by the parameter list.
    #[error("parameter `{0}` used more than once in parameter list")]
    DuplicateParamUse(String),

    /// A referenced type name has no predicate registered.
    #[error("undefined type `{0}`")]
    UndefinedType(String),

    /// A name passed to `Registry::register` violates the identifier
    /// grammar.
    #[error("invalid type name `{0}`")]
    InvalidTypeName(String),
}

impl BuildError {
    pub fn category(&self) -> Category {
        match self {
            BuildError::NoSignature { .. } => Category::NoSignature,
            BuildError::MalformedSignature { .. } => Category::MalformedSignature,
            BuildError::ParamRedefined(_) => Category::ParamRedefined,
            BuildError::DuplicateParamUse(_) => Category::DuplicateParamUse,
            BuildError::UndefinedType(_) => Category::UndefinedType,
            BuildError::InvalidTypeName(_) => Category::InvalidTypeName,
        }
    }

    /// Render as a structured diagnostic.
    pub fn diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.category(), self.to_string());
        match self {
            BuildError::MalformedSignature { pos, .. } => diag.at(SourceLocation {
                start: *pos,
                end: *pos,
            }),
            BuildError::NoSignature {
                detail: Some(detail),
            } => diag.with_help(detail.clone()),
            _ => diag,
        }
    }
}

// ---------------------------------------------------------------------------
// Check-time errors
// ---------------------------------------------------------------------------

/// Whether a checker validates arguments or return values. Decides the
/// nouns in rendered messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    Argument,
    Return,
}

impl CheckKind {
    fn singular(self) -> &'static str {
        match self {
            CheckKind::Argument => "argument",
            CheckKind::Return => "return value",
        }
    }

    fn plural(self) -> &'static str {
        match self {
            CheckKind::Argument => "arguments",
            CheckKind::Return => "return values",
        }
    }
}

/// One dead end encountered while checking a value sequence.
///
/// Linear checkers produce exactly one failure; backtracking checkers
/// produce one per exploration point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckFailure {
    /// A value matched none of the expected predicates. `too_many` carries
    /// the accepted-length limit when the failing state was also accepting.
    Mismatch {
        position: usize,
        expected: Vec<String>,
        got: String,
        too_many: Option<usize>,
    },
    /// The sequence ended in a non-accepting state.
    Missing {
        position: usize,
        expected: Vec<String>,
    },
    /// The sequence continued past an accepting state with no outgoing
    /// edges.
    TooMany { limit: usize },
}

impl CheckFailure {
    fn render(&self, kind: CheckKind, out: &mut String) {
        match self {
            CheckFailure::Mismatch {
                position,
                expected,
                got,
                too_many,
            } => {
                out.push_str(&expected.join("/"));
                out.push_str(" expected for ");
                out.push_str(kind.singular());
                out.push_str(&format!(" no. {position} (got {got})"));
                if let Some(limit) = too_many {
                    out.push_str(" or too many ");
                    out.push_str(kind.plural());
                    out.push_str(&format!(" (expected {limit})"));
                }
            }
            CheckFailure::Missing { position, expected } => {
                out.push_str("missing ");
                out.push_str(kind.singular());
                out.push_str(&format!("(s) at index {position} (expected "));
                out.push_str(&expected.join("/"));
                out.push(')');
            }
            CheckFailure::TooMany { limit } => {
                out.push_str("too many ");
                out.push_str(kind.plural());
                out.push_str(&format!(" (expected {limit})"));
            }
        }
    }
}

/// A check-time rejection.
///
/// The rendered text is a frozen contract: `{prefix}: {failures}.` with
/// failures joined by `" , or "`. Do not refactor the punctuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckError {
    /// The designator with the method colon replaced by a dot.
    pub prefix: String,
    pub kind: CheckKind,
    /// Dead ends in exploration order. Never empty.
    pub failures: Vec<CheckFailure>,
    /// Opaque offset forwarded to the host's error facility so tracebacks
    /// point at the caller.
    pub stack_offset: u32,
}

impl CheckError {
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.prefix);
        out.push_str(": ");
        for (i, failure) in self.failures.iter().enumerate() {
            if i > 0 {
                out.push_str(" , or ");
            }
            failure.render(self.kind, &mut out);
        }
        out.push('.');
        out
    }

    pub fn category(&self) -> Category {
        match self.failures.first() {
            Some(CheckFailure::Mismatch { .. }) => Category::UnexpectedValue,
            Some(CheckFailure::Missing { .. }) => Category::MissingValues,
            Some(CheckFailure::TooMany { .. }) => Category::TooMany,
            None => Category::Internal,
        }
    }
}

impl fmt::Display for CheckError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl std::error::Error for CheckError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_display() {
        let diag = Diagnostic::error(Category::UndefinedType, "undefined type `mytable`");
        let s = format!("{diag}");
        assert!(s.starts_with("error[E0005]: undefined type"));
    }

    #[test]
    fn category_metadata_is_stable_and_unique() {
        let mut codes = std::collections::BTreeSet::new();
        for cat in Category::all() {
            assert!(!cat.as_str().is_empty());
            assert!(!cat.description().is_empty());
            assert!(
                codes.insert(cat.code()),
                "duplicate diagnostic code detected: {}",
                cat.code()
            );
        }
    }

    #[test]
    fn mismatch_renders_frozen_template() {
        let err = CheckError {
            prefix: "func".to_string(),
            kind: CheckKind::Argument,
            failures: vec![CheckFailure::Mismatch {
                position: 1,
                expected: vec!["number".to_string(), "boolean".to_string()],
                got: "string".to_string(),
                too_many: None,
            }],
            stack_offset: 0,
        };
        assert_eq!(
            err.to_string(),
            "func: number/boolean expected for argument no. 1 (got string)."
        );
    }

    #[test]
    fn accepting_mismatch_appends_too_many_clause() {
        let err = CheckError {
            prefix: "func".to_string(),
            kind: CheckKind::Argument,
            failures: vec![CheckFailure::Mismatch {
                position: 1,
                expected: vec!["string".to_string()],
                got: "userdata".to_string(),
                too_many: Some(0),
            }],
            stack_offset: 0,
        };
        assert_eq!(
            err.to_string(),
            "func: string expected for argument no. 1 (got userdata) or too many arguments (expected 0)."
        );
    }

    #[test]
    fn backtracking_failures_join_with_disjunction() {
        let err = CheckError {
            prefix: "func".to_string(),
            kind: CheckKind::Argument,
            failures: vec![
                CheckFailure::Mismatch {
                    position: 3,
                    expected: vec!["mytable".to_string()],
                    got: "table".to_string(),
                    too_many: None,
                },
                CheckFailure::TooMany { limit: 2 },
            ],
            stack_offset: 0,
        };
        assert_eq!(
            err.to_string(),
            "func: mytable expected for argument no. 3 (got table) , or too many arguments (expected 2)."
        );
    }

    #[test]
    fn missing_return_values_template() {
        let err = CheckError {
            prefix: "func".to_string(),
            kind: CheckKind::Return,
            failures: vec![CheckFailure::Missing {
                position: 1,
                expected: vec!["number".to_string(), "string".to_string()],
            }],
            stack_offset: 0,
        };
        assert_eq!(
            err.to_string(),
            "func: missing return value(s) at index 1 (expected number/string)."
        );
    }
}
