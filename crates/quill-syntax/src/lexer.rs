//! Hand-written lexer for signature paragraphs.
//!
//! The lexer is total: it always produces a token stream ending in `Eof`.
//! Characters outside the grammar become [`TokenKind::Unknown`] tokens, so
//! candidacy decisions (is this paragraph a signature at all?) stay with the
//! parser, which knows whether the paragraph is committed.

use quill_ast::Span;

use crate::token::{Token, TokenKind};

/// Lex one paragraph into tokens.
///
/// `base` is the paragraph's byte offset within the docstring; token spans
/// are docstring-relative so error positions survive paragraph splitting.
/// `--` comments run to end-of-line and are whitespace-equivalent, as is
/// every newline inside the paragraph.
pub fn lex(paragraph: &str, base: u32) -> Vec<Token> {
    let mut lexer = Lexer::new(paragraph, base);
    lexer.scan_all();
    lexer.tokens
}

struct Lexer<'src> {
    source: &'src [u8],
    base: u32,
    pos: usize,
    tokens: Vec<Token>,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str, base: u32) -> Self {
        Self {
            source: source.as_bytes(),
            base,
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn scan_all(&mut self) {
        loop {
            self.skip_whitespace_and_comments();
            if self.is_at_end() {
                self.emit(TokenKind::Eof, self.pos, self.pos);
                break;
            }
            self.scan_token();
        }
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let ch = self.advance();

        match ch {
            b'(' => self.emit(TokenKind::LParen, start, self.pos),
            b')' => self.emit(TokenKind::RParen, start, self.pos),
            b'[' => self.emit(TokenKind::LBracket, start, self.pos),
            b']' => self.emit(TokenKind::RBracket, start, self.pos),
            b',' => self.emit(TokenKind::Comma, start, self.pos),
            b':' => self.emit(TokenKind::Colon, start, self.pos),
            b'/' => self.emit(TokenKind::Slash, start, self.pos),
            b'*' => self.emit(TokenKind::Star, start, self.pos),
            b'?' => self.emit(TokenKind::Question, start, self.pos),
            b'.' => {
                if self.peek() == Some(b'.') && self.peek_at(1) == Some(b'.') {
                    self.pos += 2;
                    self.emit(TokenKind::Ellipsis, start, self.pos);
                } else {
                    self.emit(TokenKind::Dot, start, self.pos);
                }
            }
            b'=' => {
                // Any run of `=` followed by `>` is a return arrow.
                while self.peek() == Some(b'=') {
                    self.pos += 1;
                }
                if self.peek() == Some(b'>') {
                    self.pos += 1;
                    self.emit(TokenKind::Arrow, start, self.pos);
                } else {
                    // Re-lex the extra `=` individually so spans stay honest.
                    self.pos = start + 1;
                    self.emit(TokenKind::Unknown('='), start, self.pos);
                }
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while self
                    .peek()
                    .is_some_and(|c| c.is_ascii_alphanumeric() || c == b'_')
                {
                    self.pos += 1;
                }
                let text = std::str::from_utf8(&self.source[start..self.pos])
                    .unwrap_or_default()
                    .to_string();
                self.emit(TokenKind::Ident(text), start, self.pos);
            }
            c => {
                // Multi-byte UTF-8: consume the full scalar so Unknown
                // carries the character, not a stray byte.
                let rest = std::str::from_utf8(&self.source[start..]).ok();
                let scalar = rest.and_then(|s| s.chars().next());
                match scalar {
                    Some(ch) => {
                        self.pos = start + ch.len_utf8();
                        self.emit(TokenKind::Unknown(ch), start, self.pos);
                    }
                    None => self.emit(TokenKind::Unknown(c as char), start, self.pos),
                }
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') | Some(b'\n') => {
                    self.pos += 1;
                }
                Some(b'-') if self.peek_at(1) == Some(b'-') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                }
                _ => break,
            }
        }
    }

    fn emit(&mut self, kind: TokenKind, start: usize, end: usize) {
        self.tokens.push(Token {
            kind,
            span: Span::new(self.base + start as u32, self.base + end as u32),
        });
    }

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        ch
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.source.get(self.pos + offset).copied()
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex(source, 0).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_signature_punctuation() {
        assert_eq!(
            kinds("func( n ) ==> number"),
            vec![
                TokenKind::Ident("func".to_string()),
                TokenKind::LParen,
                TokenKind::Ident("n".to_string()),
                TokenKind::RParen,
                TokenKind::Arrow,
                TokenKind::Ident("number".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn arrow_accepts_any_number_of_equals() {
        assert_eq!(kinds("=>"), vec![TokenKind::Arrow, TokenKind::Eof]);
        assert_eq!(kinds("==>"), vec![TokenKind::Arrow, TokenKind::Eof]);
        assert_eq!(kinds("=====>"), vec![TokenKind::Arrow, TokenKind::Eof]);
    }

    #[test]
    fn equals_without_angle_is_unknown() {
        assert_eq!(
            kinds("= ="),
            vec![
                TokenKind::Unknown('='),
                TokenKind::Unknown('='),
                TokenKind::Eof,
            ]
        );
        // A run of `=` with no `>` re-lexes one at a time.
        assert_eq!(
            kinds("=="),
            vec![
                TokenKind::Unknown('='),
                TokenKind::Unknown('='),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn ellipsis_and_dots() {
        assert_eq!(
            kinds("a.b ..."),
            vec![
                TokenKind::Ident("a".to_string()),
                TokenKind::Dot,
                TokenKind::Ident("b".to_string()),
                TokenKind::Ellipsis,
                TokenKind::Eof,
            ]
        );
        assert_eq!(
            kinds(".."),
            vec![TokenKind::Dot, TokenKind::Dot, TokenKind::Eof]
        );
    }

    #[test]
    fn comments_are_whitespace() {
        assert_eq!(
            kinds("func( -- the count\nn )"),
            vec![
                TokenKind::Ident("func".to_string()),
                TokenKind::LParen,
                TokenKind::Ident("n".to_string()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn newlines_inside_paragraph_are_whitespace() {
        assert_eq!(
            kinds("func(\nn\n)"),
            vec![
                TokenKind::Ident("func".to_string()),
                TokenKind::LParen,
                TokenKind::Ident("n".to_string()),
                TokenKind::RParen,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn spans_are_docstring_relative() {
        let tokens = lex("f()", 10);
        assert_eq!(tokens[0].span, Span::new(10, 11));
        assert_eq!(tokens[2].span, Span::new(12, 13));
    }

    #[test]
    fn unknown_characters_are_tokens_not_errors() {
        assert_eq!(
            kinds("f @"),
            vec![
                TokenKind::Ident("f".to_string()),
                TokenKind::Unknown('@'),
                TokenKind::Eof,
            ]
        );
        // Multi-byte scalar stays one token.
        assert_eq!(
            kinds("é"),
            vec![TokenKind::Unknown('é'), TokenKind::Eof]
        );
    }
}
