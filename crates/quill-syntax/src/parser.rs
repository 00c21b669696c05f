//! Recursive descent parser for docstring signature paragraphs.
//!
//! A paragraph becomes *committed* once a designator followed by `(` has
//! been parsed at its start. Before commitment every failure means "this
//! paragraph is not a signature" and the caller moves on; after commitment
//! a failure is a malformed signature for the whole docstring.

use std::collections::BTreeMap;

use quill_ast::{Designator, ParamNode, Signature, Span, TypeExpr};
use quill_diag::{BuildError, Category, Diagnostic, SourceLocation};

use crate::token::{Token, TokenKind};

/// Why a paragraph failed to produce a signature.
#[derive(Debug)]
pub struct ParagraphError {
    /// True when the paragraph had committed as a signature; the failure
    /// then aborts the whole docstring instead of skipping the paragraph.
    pub committed: bool,
    pub error: BuildError,
    /// Docstring byte offset the parse reached. Used to pick the
    /// best-effort detail when no paragraph commits.
    pub progress: u32,
}

/// Parse one lexed paragraph into a [`Signature`].
pub fn parse_paragraph(tokens: Vec<Token>, raw_text: &str) -> Result<Signature, ParagraphError> {
    let mut parser = Parser::new(tokens);
    match parser.signature(raw_text) {
        Some(signature) if parser.errors.is_empty() => Ok(signature),
        _ => Err(parser.into_error()),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<Diagnostic>,
    committed: bool,
    /// Set when a mapping line repeats a name; overrides the generic
    /// malformed-signature error.
    redefined: Option<String>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            committed: false,
            redefined: None,
        }
    }

    // -- Signature shape --

    fn signature(&mut self, raw_text: &str) -> Option<Signature> {
        let designator = self.designator()?;
        self.expect(&TokenKind::LParen, "expected `(` after designator")?;
        self.committed = true;

        let (mut params, has_vararg) = self.param_list(true)?;
        self.expect(&TokenKind::RParen, "expected `)` to close parameter list")?;

        let mut returns = Vec::new();
        while self.match_token(&TokenKind::Arrow) {
            returns.push(self.type_expr()?);
        }

        let (param_types, vararg_type) = self.mapping_lines()?;

        if !self.at_eof() {
            let found = self.peek_kind().map(TokenKind::describe).unwrap_or_default();
            self.error_at_current(&format!("unexpected {found} after signature"));
            return None;
        }

        match (has_vararg, vararg_type) {
            (true, Some(expr)) => {
                if let Some(ParamNode::Vararg(slot)) = params.last_mut() {
                    *slot = expr;
                }
            }
            (false, Some(_)) => {
                self.error_at_current("`... :` mapping requires a `...` parameter");
                return None;
            }
            _ => {}
        }

        Some(Signature {
            designator,
            params,
            returns,
            param_types,
            raw_text: raw_text.to_string(),
        })
    }

    fn designator(&mut self) -> Option<Designator> {
        let first = self.try_ident()?;
        let mut path = vec![first];
        while self.match_token(&TokenKind::Dot) {
            path.push(self.expect_ident("expected identifier after `.` in designator")?);
        }
        let method = if self.match_token(&TokenKind::Colon) {
            Some(self.expect_ident("expected method name after `:` in designator")?)
        } else {
            None
        };
        Some(Designator { path, method })
    }

    // -- Parameter list --

    /// Parse items until the closing delimiter. Commas are optional
    /// separators. Returns the items and whether a trailing `...` was seen
    /// (top level only).
    fn param_list(&mut self, top_level: bool) -> Option<(Vec<ParamNode>, bool)> {
        let terminator = if top_level {
            TokenKind::RParen
        } else {
            TokenKind::RBracket
        };
        let mut items = Vec::new();
        let mut has_vararg = false;
        loop {
            while self.match_token(&TokenKind::Comma) {}
            if self.check(&terminator) {
                break;
            }
            if has_vararg {
                self.error_at_current("`...` must be the final parameter");
                return None;
            }
            match self.peek_kind() {
                Some(TokenKind::Ident(_)) => {
                    let name = self.try_ident()?;
                    items.push(ParamNode::Named(name));
                }
                Some(TokenKind::LBracket) => {
                    self.advance();
                    let (children, _) = self.param_list(false)?;
                    if children.is_empty() {
                        self.error_at_current("optional group may not be empty");
                        return None;
                    }
                    self.expect(&TokenKind::RBracket, "expected `]` to close optional group")?;
                    items.push(ParamNode::Group(children));
                }
                Some(TokenKind::Ellipsis) => {
                    if !top_level {
                        self.error_at_current("`...` is not allowed inside an optional group");
                        return None;
                    }
                    self.advance();
                    // Placeholder type; the `... :` mapping line (or the
                    // `any*` default) fills it in during finalization.
                    items.push(ParamNode::Vararg(TypeExpr::Star(Box::new(TypeExpr::name(
                        "any",
                    )))));
                    has_vararg = true;
                }
                _ => {
                    self.error_at_current("expected parameter name, `[`, or `...`");
                    return None;
                }
            }
        }
        Some((items, has_vararg))
    }

    // -- Mapping lines --

    /// Parse `name : alternation-of-names` and `... : type-expr` entries
    /// until something that is not a mapping. A repeated name rejects the
    /// signature with `ParamRedefined`.
    #[allow(clippy::type_complexity)]
    fn mapping_lines(&mut self) -> Option<(BTreeMap<String, TypeExpr>, Option<TypeExpr>)> {
        let mut param_types = BTreeMap::new();
        let mut vararg_type = None;
        loop {
            if matches!(self.peek_kind(), Some(TokenKind::Ident(_))) && self.next_is_colon() {
                let name = self.try_ident()?;
                self.advance(); // consume `:`
                let rhs = self.name_alternation()?;
                if param_types.insert(name.clone(), rhs).is_some() {
                    self.redefined = Some(name.clone());
                    self.error_at_current(&format!("parameter `{name}` redefined"));
                    return None;
                }
            } else if self.check(&TokenKind::Ellipsis) {
                self.advance();
                self.expect(&TokenKind::Colon, "expected `:` after `...` in vararg mapping")?;
                let rhs = self.type_expr()?;
                if vararg_type.replace(rhs).is_some() {
                    self.redefined = Some("...".to_string());
                    self.error_at_current("vararg mapping redefined");
                    return None;
                }
            } else {
                break;
            }
        }
        Some((param_types, vararg_type))
    }

    /// The restricted right-hand side of a named-parameter mapping:
    /// `name ( / name )*`.
    fn name_alternation(&mut self) -> Option<TypeExpr> {
        let mut names = vec![self.expect_ident(
            "expected type name (named parameters take an alternation of plain type names)",
        )?];
        while self.match_token(&TokenKind::Slash) {
            names.push(self.expect_ident(
                "expected type name after `/` (named parameters take an alternation of plain type names)",
            )?);
        }
        Some(TypeExpr::alt(names.into_iter().map(TypeExpr::Name).collect()))
    }

    // -- Type expressions --
    //
    // `,` sequences (lowest), `/` alternates, `*`/`?` bind tightest.

    fn type_expr(&mut self) -> Option<TypeExpr> {
        let mut children = vec![self.alt_expr()?];
        while self.match_token(&TokenKind::Comma) {
            children.push(self.alt_expr()?);
        }
        Some(TypeExpr::seq(children))
    }

    fn alt_expr(&mut self) -> Option<TypeExpr> {
        let mut children = vec![self.postfix_expr()?];
        while self.match_token(&TokenKind::Slash) {
            children.push(self.postfix_expr()?);
        }
        Some(TypeExpr::alt(children))
    }

    fn postfix_expr(&mut self) -> Option<TypeExpr> {
        let mut expr = self.primary_expr()?;
        loop {
            if self.match_token(&TokenKind::Star) {
                expr = TypeExpr::Star(Box::new(expr));
            } else if self.match_token(&TokenKind::Question) {
                expr = TypeExpr::Opt(Box::new(expr));
            } else {
                break;
            }
        }
        Some(expr)
    }

    fn primary_expr(&mut self) -> Option<TypeExpr> {
        match self.peek_kind() {
            // A name directly followed by `:` starts the next mapping line,
            // never a type expression.
            Some(TokenKind::Ident(_)) if !self.next_is_colon() => {
                let name = self.try_ident()?;
                Some(TypeExpr::Name(name))
            }
            Some(TokenKind::LParen) => {
                self.advance();
                let expr = self.type_expr()?;
                self.expect(&TokenKind::RParen, "expected `)` to close type expression")?;
                Some(expr)
            }
            _ => {
                self.error_at_current("expected type name or `(`");
                None
            }
        }
    }

    // -- Token plumbing --

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn next_is_colon(&self) -> bool {
        self.tokens
            .get(self.pos + 1)
            .is_some_and(|t| t.kind == TokenKind::Colon)
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or(Span::new(0, 0))
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| std::mem::discriminant(k) == std::mem::discriminant(kind))
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind, msg: &str) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error_at_current(msg);
            None
        }
    }

    fn expect_ident(&mut self, msg: &str) -> Option<String> {
        if let Some(TokenKind::Ident(name)) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            self.error_at_current(msg);
            None
        }
    }

    fn try_ident(&mut self) -> Option<String> {
        if let Some(TokenKind::Ident(name)) = self.peek_kind() {
            let name = name.clone();
            self.advance();
            Some(name)
        } else {
            None
        }
    }

    fn error_at_current(&mut self, msg: &str) {
        let span = self.current_span();
        self.errors.push(
            Diagnostic::error(Category::MalformedSignature, msg).at(SourceLocation {
                start: span.start,
                end: span.end,
            }),
        );
    }

    fn into_error(self) -> ParagraphError {
        let (pos, reason) = match self.errors.first() {
            Some(diag) => (
                diag.location.map(|loc| loc.start).unwrap_or(0),
                diag.message.clone(),
            ),
            None => (0, "not a signature".to_string()),
        };
        let error = match self.redefined {
            Some(name) => BuildError::ParamRedefined(name),
            None => BuildError::MalformedSignature { pos, reason },
        };
        ParagraphError {
            committed: self.committed,
            error,
            progress: pos,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse(text: &str) -> Result<Signature, ParagraphError> {
        parse_paragraph(lex(text, 0), text)
    }

    #[test]
    fn simple_signature() {
        let sig = parse("func( n ) ==> number n : number/boolean").expect("parses");
        assert_eq!(sig.designator.to_string(), "func");
        assert!(!sig.is_method());
        assert_eq!(sig.params, vec![ParamNode::Named("n".to_string())]);
        assert_eq!(sig.returns, vec![TypeExpr::name("number")]);
        assert_eq!(
            sig.param_types.get("n"),
            Some(&TypeExpr::alt(vec![
                TypeExpr::name("number"),
                TypeExpr::name("boolean")
            ]))
        );
    }

    #[test]
    fn method_designator() {
        let sig = parse("obj:method( number )").expect("parses");
        assert!(sig.is_method());
        assert_eq!(sig.error_prefix(), "obj.method");
        let sig = parse("m.o:f( x ) x : number").expect("parses");
        assert_eq!(sig.error_prefix(), "m.o.f");
    }

    #[test]
    fn return_sequence_with_alternation() {
        let sig = parse("func( string ) ==> number/string, string").expect("parses");
        assert_eq!(
            sig.returns,
            vec![TypeExpr::Seq(vec![
                TypeExpr::alt(vec![TypeExpr::name("number"), TypeExpr::name("string")]),
                TypeExpr::name("string"),
            ])]
        );
    }

    #[test]
    fn multiple_return_clauses_are_alternatives() {
        let sig = parse("f( n ) => number => string n : number").expect("parses");
        assert_eq!(
            sig.returns,
            vec![TypeExpr::name("number"), TypeExpr::name("string")]
        );
    }

    #[test]
    fn nested_optional_groups_and_vararg() {
        let sig = parse(
            "func( [string [, userdata] [, boolean],] [number,] ... ) \
             ... : ((table, string/number) / boolean)*",
        )
        .expect("parses");
        assert_eq!(sig.params.len(), 3);
        let ParamNode::Group(outer) = &sig.params[0] else {
            panic!("expected group, got {:?}", sig.params[0]);
        };
        assert_eq!(outer.len(), 3);
        assert_eq!(outer[0], ParamNode::Named("string".to_string()));
        assert!(matches!(&outer[1], ParamNode::Group(g) if g.len() == 1));
        let ParamNode::Vararg(expr) = &sig.params[2] else {
            panic!("expected vararg, got {:?}", sig.params[2]);
        };
        assert_eq!(
            expr.to_string(),
            "((table, string/number)/boolean)*"
        );
    }

    #[test]
    fn unmapped_vararg_defaults_to_any_star() {
        let sig = parse("f( ... )").expect("parses");
        assert_eq!(
            sig.params,
            vec![ParamNode::Vararg(TypeExpr::Star(Box::new(TypeExpr::name(
                "any"
            ))))]
        );
    }

    #[test]
    fn arrow_equals_run_lengths_are_equivalent() {
        for arrow in ["=>", "==>", "====>"] {
            let sig = parse(&format!("f( n ) {arrow} number n : number")).expect("parses");
            assert_eq!(sig.returns, vec![TypeExpr::name("number")]);
        }
    }

    #[test]
    fn comments_inside_signature_are_ignored() {
        let sig = parse("func( n -- the count\n) ==> number -- result\nn : number")
            .expect("parses");
        assert_eq!(sig.params, vec![ParamNode::Named("n".to_string())]);
        assert_eq!(sig.param_types.len(), 1);
    }

    #[test]
    fn duplicate_mapping_is_param_redefined() {
        let err = parse("func( a ) ==> number a : number a : integer").unwrap_err();
        assert!(err.committed);
        assert_eq!(err.error, BuildError::ParamRedefined("a".to_string()));
    }

    #[test]
    fn commitment_turns_failures_into_malformed() {
        let err = parse("func( n ] )").unwrap_err();
        assert!(err.committed);
        assert!(matches!(
            err.error,
            BuildError::MalformedSignature { .. }
        ));
    }

    #[test]
    fn prose_paragraph_is_not_committed() {
        let err = parse("just some prose, no signature here").unwrap_err();
        assert!(!err.committed);
    }

    #[test]
    fn vararg_must_be_final() {
        let err = parse("f( ..., n ) n : number").unwrap_err();
        assert!(err.committed);
        let err = parse("f( [...] )").unwrap_err();
        assert!(err.committed);
    }

    #[test]
    fn vararg_mapping_requires_vararg_param() {
        let err = parse("f( n ) n : number ... : table").unwrap_err();
        assert!(err.committed);
        assert!(matches!(
            err.error,
            BuildError::MalformedSignature { .. }
        ));
    }

    #[test]
    fn mapping_rhs_is_restricted_to_name_alternation() {
        let err = parse("f( n ) n : (number, string)").unwrap_err();
        assert!(err.committed);
        let ok = parse("f( n ) n : number/boolean/string").expect("alternation is fine");
        assert!(ok.param_types["n"].is_name_alternation());
    }

    #[test]
    fn canonical_text_round_trips() {
        let sig = parse(
            "func( a, [b,] ... ) => number/string, table a : number b : string/table \
             ... : (table, number)*",
        )
        .expect("parses");
        let canonical = sig.canonical_text();
        let reparsed = parse(&canonical).expect("canonical text parses");
        assert_eq!(reparsed.designator, sig.designator);
        assert_eq!(reparsed.params, sig.params);
        assert_eq!(reparsed.returns, sig.returns);
        assert_eq!(reparsed.param_types, sig.param_types);
    }
}
