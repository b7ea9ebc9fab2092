//! The parser's error type, grounded on `mesh-parser::error::ParseError`'s
//! manual `Display`/`Error` shape.

use std::fmt;

use zero_common::span::{LineIndex, Span};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// A malformed token (an overlong literal, an unterminated string, ...).
    Lexical,
    /// A well-formed token stream that doesn't match any production.
    Syntax,
    /// Two candidate interpretations agree on shape but disagree on
    /// meaning (the "Ambiguous function return type." diagnostic).
    SemanticAmbiguity,
    /// A production the grammar describes but this front end doesn't
    /// implement (`ParseGenericRecord`, for instance).
    UnimplementedForm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
    pub message: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    pub fn syntax(span: Span, message: impl Into<String>) -> Self {
        Self::new(ParseErrorKind::Syntax, span, message)
    }

    /// Renders this error against `source` as a human-readable
    /// "line N, column M" message, for callers that want better
    /// placement than the byte-offset span in [`Display`](fmt::Display).
    pub fn render(&self, source: &str) -> String {
        let (line, column) = LineIndex::new(source).line_col(self.span.start);
        format!("{} at line {line}, column {column}", self.message)
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {:?}", self.message, self.span)
    }
}

impl std::error::Error for ParseError {}

impl From<zero_common::error::LexError> for ParseError {
    fn from(e: zero_common::error::LexError) -> Self {
        ParseError::new(ParseErrorKind::Lexical, e.span, e.to_string())
    }
}
