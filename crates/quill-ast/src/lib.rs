//! Signature AST node definitions and source spans for quill.
//!
//! This crate defines the structured signature produced by the docstring
//! parser. A [`Signature`] is derived once from a docstring and lives as an
//! immutable value; the automata pipeline consumes it read-only.

use std::collections::BTreeMap;
use std::fmt;

/// A byte offset range within a docstring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    /// Create a span that covers both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// A synthetic span for injected nodes (e.g. the implicit `self`).
    pub fn synthetic() -> Self {
        Self {
            start: u32::MAX,
            end: u32::MAX,
        }
    }
}

/// A value paired with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Spanned<U> {
        Spanned {
            node: f(self.node),
            span: self.span,
        }
    }
}

// ---------------------------------------------------------------------------
// Designator
// ---------------------------------------------------------------------------

/// The dotted path naming the documented function, e.g. `io.file:read`.
///
/// A trailing `:segment` marks a method; the receiver parameter is injected
/// during argument-list assembly, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Designator {
    /// Dot-separated segments, in source order. Never empty.
    pub path: Vec<String>,
    /// The segment after `:`, if the designator names a method.
    pub method: Option<String>,
}

impl Designator {
    pub fn is_method(&self) -> bool {
        self.method.is_some()
    }

    /// The user-facing name used as an error-message prefix.
    ///
    /// The method colon renders as a dot, so `m.o:f` appears as `m.o.f`.
    pub fn display_name(&self) -> String {
        let mut out = self.path.join(".");
        if let Some(method) = &self.method {
            out.push('.');
            out.push_str(method);
        }
        out
    }
}

impl fmt::Display for Designator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.join("."))?;
        if let Some(method) = &self.method {
            write!(f, ":{method}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Type expressions
// ---------------------------------------------------------------------------

/// The regex-like algebra over predicate names parsed from return patterns
/// and vararg mappings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// A type name, resolved in the predicate registry at build time.
    Name(String),
    /// Ordered concatenation. Always two or more children.
    Seq(Vec<TypeExpr>),
    /// Alternation. Always two or more children; a single-element
    /// alternation collapses to its child at construction.
    Alt(Vec<TypeExpr>),
    /// Zero-or-more repetition.
    Star(Box<TypeExpr>),
    /// Zero-or-one.
    Opt(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn name(name: impl Into<String>) -> Self {
        TypeExpr::Name(name.into())
    }

    /// Build a sequence, collapsing the single-element case.
    pub fn seq(mut children: Vec<TypeExpr>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            TypeExpr::Seq(children)
        }
    }

    /// Build an alternation, collapsing the single-element case.
    pub fn alt(mut children: Vec<TypeExpr>) -> Self {
        if children.len() == 1 {
            children.remove(0)
        } else {
            TypeExpr::Alt(children)
        }
    }

    /// True when the expression is an alternation of plain names (or a
    /// single name). The mapping-line grammar restricts named parameters to
    /// this shape.
    pub fn is_name_alternation(&self) -> bool {
        match self {
            TypeExpr::Name(_) => true,
            TypeExpr::Alt(children) => {
                children.iter().all(|c| matches!(c, TypeExpr::Name(_)))
            }
            _ => false,
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            TypeExpr::Seq(_) => 0,
            TypeExpr::Alt(_) => 1,
            TypeExpr::Star(_) | TypeExpr::Opt(_) | TypeExpr::Name(_) => 2,
        }
    }

    fn fmt_child(&self, child: &TypeExpr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if child.precedence() <= self.precedence() && !matches!(child, TypeExpr::Name(_)) {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Name(name) => write!(f, "{name}"),
            TypeExpr::Seq(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    self.fmt_child(child, f)?;
                }
                Ok(())
            }
            TypeExpr::Alt(children) => {
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, "/")?;
                    }
                    self.fmt_child(child, f)?;
                }
                Ok(())
            }
            TypeExpr::Star(child) => {
                self.fmt_child(child, f)?;
                write!(f, "*")
            }
            TypeExpr::Opt(child) => {
                self.fmt_child(child, f)?;
                write!(f, "?")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Parameter list
// ---------------------------------------------------------------------------

/// An element of the positional parameter list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamNode {
    /// A required parameter. Its type is the `param_types` entry for this
    /// name, or the name itself when no mapping line covers it.
    Named(String),
    /// A bracketed group: an optional subsequence. Groups nest.
    Group(Vec<ParamNode>),
    /// The trailing `...`. Carries the vararg's type expression from its
    /// mapping line (`any*` when unmapped).
    Vararg(TypeExpr),
}

impl fmt::Display for ParamNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamNode::Named(name) => write!(f, "{name}"),
            ParamNode::Group(children) => {
                write!(f, "[")?;
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{child}")?;
                }
                write!(f, "]")
            }
            ParamNode::Vararg(_) => write!(f, "..."),
        }
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// The structured signature extracted from a docstring.
///
/// Derived once per docstring and immutable afterwards. `raw_text` preserves
/// the exact signature paragraph for error-message prefixes and round-trip
/// tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub designator: Designator,
    /// The positional parameter list, order and nesting preserved.
    pub params: Vec<ParamNode>,
    /// Alternative return shapes. Semantically an alternation of the list;
    /// empty means the signature documents a procedure.
    pub returns: Vec<TypeExpr>,
    /// Mapping from parameter name to its type expression. Named parameters
    /// are restricted by the grammar to an alternation of plain names.
    pub param_types: BTreeMap<String, TypeExpr>,
    /// Exact text of the signature paragraph.
    pub raw_text: String,
}

impl Signature {
    pub fn is_method(&self) -> bool {
        self.designator.is_method()
    }

    /// The error-message prefix for this signature.
    pub fn error_prefix(&self) -> String {
        self.designator.display_name()
    }

    /// Render the signature in canonical form.
    ///
    /// Canonical output re-parses to an equal `Signature` (modulo
    /// `raw_text`).
    pub fn canonical_text(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.designator.to_string());
        out.push_str(" ( ");
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            out.push_str(&param.to_string());
        }
        out.push_str(" )");
        for ret in &self.returns {
            out.push_str(" => ");
            out.push_str(&ret.to_string());
        }
        for (name, expr) in &self.param_types {
            out.push_str(&format!(" {name} : {expr}"));
        }
        if let Some(ParamNode::Vararg(expr)) = self.params.last() {
            out.push_str(&format!(" ... : {expr}"));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn designator_display_name_replaces_method_colon() {
        let d = Designator {
            path: vec!["m".into(), "o".into()],
            method: Some("f".into()),
        };
        assert_eq!(d.to_string(), "m.o:f");
        assert_eq!(d.display_name(), "m.o.f");
        assert!(d.is_method());
    }

    #[test]
    fn type_expr_display_parenthesizes_by_precedence() {
        // (table, string/number)/boolean, starred
        let expr = TypeExpr::Star(Box::new(TypeExpr::alt(vec![
            TypeExpr::seq(vec![
                TypeExpr::name("table"),
                TypeExpr::alt(vec![TypeExpr::name("string"), TypeExpr::name("number")]),
            ]),
            TypeExpr::name("boolean"),
        ])));
        assert_eq!(expr.to_string(), "((table, string/number)/boolean)*");
    }

    #[test]
    fn single_element_alt_and_seq_collapse() {
        assert_eq!(
            TypeExpr::alt(vec![TypeExpr::name("number")]),
            TypeExpr::name("number")
        );
        assert_eq!(
            TypeExpr::seq(vec![TypeExpr::name("string")]),
            TypeExpr::name("string")
        );
    }

    #[test]
    fn name_alternation_shape() {
        let ok = TypeExpr::alt(vec![TypeExpr::name("number"), TypeExpr::name("boolean")]);
        assert!(ok.is_name_alternation());
        let nested = TypeExpr::alt(vec![
            TypeExpr::name("number"),
            TypeExpr::Star(Box::new(TypeExpr::name("boolean"))),
        ]);
        assert!(!nested.is_name_alternation());
    }
}
