//! Lexer and recursive descent parser for docstring signatures.
//!
//! This crate scans a docstring paragraph-by-paragraph and produces the
//! [`Signature`] defined in `quill-ast`. A paragraph is text delimited by a
//! blank line; the first paragraph that commits as a signature wins.

pub mod lexer;
pub mod parser;
pub mod token;

use quill_ast::Signature;
use quill_diag::BuildError;

pub use lexer::lex;
pub use parser::{ParagraphError, parse_paragraph};
pub use token::{Token, TokenKind};

/// Extract the signature from a docstring.
///
/// Paragraphs are tried in order. A paragraph that fails before committing
/// (no `designator (` at its start) is skipped; a committed paragraph that
/// fails to parse rejects the whole docstring. When nothing commits, the
/// error carries a best-effort detail from the paragraph whose parse
/// progressed furthest.
pub fn parse_docstring(doc: &str) -> Result<Signature, BuildError> {
    let mut best: Option<(u32, String)> = None;
    for (start, text) in paragraphs(doc) {
        let tokens = lex(text, start);
        if tokens.len() == 1 {
            // Just Eof: blank or comment-only paragraph.
            continue;
        }
        match parse_paragraph(tokens, text) {
            Ok(signature) => return Ok(signature),
            Err(err) if err.committed => return Err(err.error),
            Err(err) => {
                let detail = err.error.to_string();
                if best.as_ref().map_or(true, |(progress, _)| err.progress > *progress) {
                    best = Some((err.progress, detail));
                }
            }
        }
    }
    Err(BuildError::NoSignature {
        detail: best.map(|(_, detail)| detail),
    })
}

/// Split a docstring into paragraphs with their byte offsets.
///
/// The delimiter is exactly one blank line: `\n\n` with nothing between.
fn paragraphs(doc: &str) -> impl Iterator<Item = (u32, &str)> {
    let mut offset = 0u32;
    doc.split("\n\n").map(move |piece| {
        let start = offset;
        offset += piece.len() as u32 + 2;
        (start, piece)
    })
}
