//! Token types produced by the signature lexer.

use quill_ast::Span;

/// A token with its kind and docstring-relative span.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// The kind of a lexical token.
///
/// The signature grammar has no keywords; every alphabetic word is an
/// identifier. `--` comments and all whitespace (newlines included) are
/// skipped by the lexer and never appear here.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// `[A-Za-z_][A-Za-z0-9_]*`
    Ident(String),

    // -- Punctuation --
    Dot,      // .
    Colon,    // :
    Comma,    // ,
    Slash,    // /
    Star,     // *
    Question, // ?
    Ellipsis, // ...

    // -- Delimiters --
    LParen,   // (
    RParen,   // )
    LBracket, // [
    RBracket, // ]

    /// One or more `=` followed by `>`: `=>`, `==>`, `===>`, ...
    Arrow,

    /// A character the grammar has no use for. The lexer is total; the
    /// parser decides whether this kills a committed paragraph or merely
    /// disqualifies a candidate one.
    Unknown(char),

    Eof,
}

impl TokenKind {
    /// A short rendering for error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("`{name}`"),
            TokenKind::Dot => "`.`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Slash => "`/`".to_string(),
            TokenKind::Star => "`*`".to_string(),
            TokenKind::Question => "`?`".to_string(),
            TokenKind::Ellipsis => "`...`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::Arrow => "`=>`".to_string(),
            TokenKind::Unknown(c) => format!("`{c}`"),
            TokenKind::Eof => "end of paragraph".to_string(),
        }
    }
}
