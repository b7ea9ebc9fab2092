//! Token kinds and payloads, grounded on `Tokenizer.hpp`'s `TokenType`/
//! `TokenData` pair. Where the original keeps the discriminant and the
//! payload in two separate values (a `TokenType` enum plus a side
//! `TaggedUnion`), this port folds the payload directly into the
//! discriminating enum, the idiomatic Rust shape for a tagged union.

use serde::{Deserialize, Serialize};

use crate::keyword::Keyword;
use crate::operator::Operator;
use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier(String),
    LiteralInt(u64),
    LiteralReal(f64),
    LiteralChar(char),
    LiteralString(String),
    Operator(Operator),

    BraceLeft,
    BraceRight,
    BracketLeft,
    BracketRight,
    ParenLeft,
    ParenRight,
    Comma,
    Colon,
    Semicolon,
    TraitsOf,
    Address,
    Arrow,
    Wildcard,
    Hash,
    Dot,
    /// The `;;` no-op statement.
    NoOp,
}

// `Keyword`/`Operator` don't derive Serialize themselves (they're plain
// C-like enums used heavily in non-serialized contexts); represent them
// by their canonical spelling for the tooling-facing token stream.
impl Serialize for Keyword {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Keyword {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        Keyword::from_str(&s).ok_or_else(|| serde::de::Error::custom("not a keyword"))
    }
}

impl Serialize for Operator {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("{:?}", self))
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        // Only used by tooling round-tripping our own output; the debug
        // spelling is stable within a single build.
        let _s = String::deserialize(d)?;
        Err(serde::de::Error::custom(
            "Operator deserialization is not supported",
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_carries_its_span() {
        let tok = Token::new(TokenKind::Semicolon, Span::new(3, 4));
        assert_eq!(tok.span, Span::new(3, 4));
        assert_eq!(tok.kind, TokenKind::Semicolon);
    }
}
