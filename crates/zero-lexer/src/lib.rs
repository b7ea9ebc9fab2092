//! The Zero tokenizer.
//!
//! Rewritten from scratch against `original_source/zcc_core/Tokenizer.cpp`'s
//! exact character dispatch (Zero's lexical grammar shares no keywords or
//! operators with the teacher's Snow language, so only the *architecture*
//! of `snow-lexer` — a `Cursor`-driven stateful `Iterator<Item = ...>` —
//! survives the transformation; see `cursor.rs`).

pub mod cursor;

use cursor::Cursor;
use zero_common::error::{LexError, LexErrorKind};
use zero_common::keyword::Keyword;
use zero_common::operator::Operator;
use zero_common::span::Span;
use zero_common::token::{Token, TokenKind};

/// Longest byte length the original source accepts for a numeric
/// literal's digit run before treating it as malformed.
const MAX_NUMERIC_LITERAL_LEN: usize = 256;

pub struct Lexer<'src> {
    cursor: Cursor<'src>,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    fn try_get(&mut self, c: char) -> bool {
        if self.cursor.peek() == Some(c) {
            self.cursor.advance();
            true
        } else {
            false
        }
    }

    /// Skips one backtick comment. `` `...` `` runs to the next backtick
    /// on the same line; `` ``...`` `` (doubled) runs to end of line.
    fn skip_comment(&mut self) {
        self.cursor.advance(); // opening backtick
        let terminator = if self.cursor.peek() == Some('`') {
            self.cursor.advance();
            '\n'
        } else {
            '`'
        };
        while let Some(c) = self.cursor.peek() {
            if c == terminator {
                break;
            }
            self.cursor.advance();
        }
        if !self.cursor.is_eof() {
            self.cursor.advance();
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.cursor.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.cursor.advance();
        }
    }

    fn skip_comments_and_whitespace(&mut self) {
        loop {
            self.skip_whitespace();
            match self.cursor.peek() {
                Some('`') => self.skip_comment(),
                _ => break,
            }
        }
    }

    fn skip_identifier(&mut self) {
        self.cursor
            .eat_while(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    }

    fn tokenize_keyword_or_identifier(&mut self) -> TokenKind {
        let start = self.cursor.pos();
        self.skip_identifier();
        let text = self.cursor.slice(start, self.cursor.pos());
        match Keyword::from_str(text) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier(text.to_string()),
        }
    }

    /// Reads `0b`/`0x`/`0rN:` non-decimal integer literals. `key` is the
    /// letter following the leading `0`.
    fn tokenize_non_decimal(&mut self, key: char) -> Result<TokenKind, LexError> {
        let start = self.cursor.pos();
        let radix: u32 = match key {
            'b' | 'B' => {
                self.cursor.eat_while(|c| c == '0' || c == '1');
                2
            }
            'x' | 'X' => {
                self.cursor.eat_while(|c| c.is_ascii_hexdigit());
                16
            }
            'r' | 'R' => {
                let radix_start = self.cursor.pos();
                self.cursor.eat_while(|c| c != ':');
                let radix_text = self.cursor.slice(radix_start, self.cursor.pos());
                self.cursor.advance(); // ':'
                let radix: u32 = radix_text.parse().unwrap_or(10);
                let digits_start = self.cursor.pos();
                self.cursor.eat_while(|c| c.is_ascii_alphanumeric());
                return self.finish_non_decimal(digits_start, radix);
            }
            _ => unreachable!("caller only dispatches here on b/B/x/X/r/R"),
        };
        self.finish_non_decimal(start, radix)
    }

    fn finish_non_decimal(&mut self, start: u32, radix: u32) -> Result<TokenKind, LexError> {
        let text = self.cursor.slice(start, self.cursor.pos());
        if text.len() >= MAX_NUMERIC_LITERAL_LEN {
            return Err(LexError::new(
                LexErrorKind::OverlongNumericLiteral,
                Span::new(start, self.cursor.pos()),
            ));
        }
        let value = u64::from_str_radix(text, radix).unwrap_or(0);
        Ok(TokenKind::LiteralInt(value))
    }

    fn tokenize_numeric(&mut self) -> Result<TokenKind, LexError> {
        if self.cursor.peek() == Some('0') && self.cursor.peek_next().is_some_and(|c| c.is_ascii_alphabetic()) {
            self.cursor.advance();
            let key = self.cursor.advance().unwrap();
            return self.tokenize_non_decimal(key);
        }
        let start = self.cursor.pos();
        let mut seen_dot = false;
        while let Some(c) = self.cursor.peek() {
            if c == '.' {
                if seen_dot {
                    break;
                }
                seen_dot = true;
                self.cursor.advance();
                continue;
            }
            if !c.is_ascii_digit() {
                break;
            }
            self.cursor.advance();
        }
        let text = self.cursor.slice(start, self.cursor.pos());
        if text.len() >= MAX_NUMERIC_LITERAL_LEN {
            return Err(LexError::new(
                LexErrorKind::OverlongNumericLiteral,
                Span::new(start, self.cursor.pos()),
            ));
        }
        if seen_dot {
            Ok(TokenKind::LiteralReal(text.parse().unwrap_or(0.0)))
        } else {
            Ok(TokenKind::LiteralInt(text.parse().unwrap_or(0)))
        }
    }

    fn tokenize_char_literal(&mut self, start: u32) -> Result<TokenKind, LexError> {
        let content_start = self.cursor.pos();
        loop {
            match self.cursor.peek() {
                None => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedCharLiteral,
                        Span::new(start, self.cursor.pos()),
                    ))
                }
                Some('\\') => {
                    self.cursor.advance();
                    if self.cursor.is_eof() {
                        return Err(LexError::new(
                            LexErrorKind::UnterminatedCharLiteral,
                            Span::new(start, self.cursor.pos()),
                        ));
                    }
                    self.cursor.advance();
                }
                Some('\'') => break,
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
        let content = self.cursor.slice(content_start, self.cursor.pos());
        self.cursor.advance(); // closing quote
        let mut chars = content.chars();
        let (Some(c), None) = (chars.next(), chars.next()) else {
            return Err(LexError::new(
                LexErrorKind::InvalidCharLiteral,
                Span::new(start, self.cursor.pos()),
            ));
        };
        Ok(TokenKind::LiteralChar(c))
    }

    fn tokenize_string_literal(&mut self, start: u32) -> Result<TokenKind, LexError> {
        let content_start = self.cursor.pos();
        loop {
            match self.cursor.peek() {
                None => {
                    return Err(LexError::new(
                        LexErrorKind::UnterminatedStringLiteral,
                        Span::new(start, self.cursor.pos()),
                    ))
                }
                Some('\\') => {
                    self.cursor.advance();
                    if self.cursor.is_eof() {
                        return Err(LexError::new(
                            LexErrorKind::UnterminatedStringLiteral,
                            Span::new(start, self.cursor.pos()),
                        ));
                    }
                    self.cursor.advance();
                }
                Some('"') => break,
                Some(_) => {
                    self.cursor.advance();
                }
            }
        }
        let content = self.cursor.slice(content_start, self.cursor.pos()).to_string();
        self.cursor.advance(); // closing quote
        Ok(TokenKind::LiteralString(content))
    }

    fn tokenize_sign(&mut self) -> Result<TokenKind, LexError> {
        let start = self.cursor.pos();
        let a = self.cursor.advance().unwrap();
        Ok(match a {
            '=' => {
                if self.try_get('=') {
                    TokenKind::Operator(Operator::CompareEq)
                } else if self.try_get('>') {
                    TokenKind::Arrow
                } else {
                    TokenKind::Operator(Operator::Assign)
                }
            }
            '+' => {
                if self.try_get('=') {
                    TokenKind::Operator(Operator::AddAssign)
                } else if self.try_get('+') {
                    TokenKind::Operator(Operator::Increment)
                } else {
                    TokenKind::Operator(Operator::Add)
                }
            }
            '-' => {
                if self.try_get('=') {
                    TokenKind::Operator(Operator::SubAssign)
                } else if self.try_get('-') {
                    TokenKind::Operator(Operator::Decrement)
                } else {
                    TokenKind::Operator(Operator::Sub)
                }
            }
            '*' => {
                if self.try_get('=') {
                    TokenKind::Operator(Operator::MulAssign)
                } else {
                    TokenKind::Operator(Operator::Mul)
                }
            }
            '/' => {
                if self.try_get('=') {
                    TokenKind::Operator(Operator::DivAssign)
                } else {
                    TokenKind::Operator(Operator::Div)
                }
            }
            '%' => {
                if self.try_get('=') {
                    TokenKind::Operator(Operator::ModAssign)
                } else {
                    TokenKind::Operator(Operator::Mod)
                }
            }
            '&' => {
                if self.try_get('=') {
                    TokenKind::Operator(Operator::AndAssign)
                } else if self.try_get('&') {
                    TokenKind::Operator(Operator::BoolAnd)
                } else {
                    TokenKind::Operator(Operator::And)
                }
            }
            '|' => {
                if self.try_get('=') {
                    TokenKind::Operator(Operator::OrAssign)
                } else if self.try_get('|') {
                    TokenKind::Operator(Operator::BoolOr)
                } else {
                    TokenKind::Operator(Operator::Or)
                }
            }
            '^' => {
                if self.try_get('=') {
                    TokenKind::Operator(Operator::XorAssign)
                } else {
                    TokenKind::Operator(Operator::Xor)
                }
            }
            '~' => TokenKind::Operator(Operator::Complement),
            '<' => {
                if self.try_get('<') {
                    if self.try_get('<') {
                        if self.try_get('=') {
                            TokenKind::Operator(Operator::RotateLeftAssign)
                        } else {
                            TokenKind::Operator(Operator::RotateLeft)
                        }
                    } else if self.try_get('=') {
                        TokenKind::Operator(Operator::ShiftLeftAssign)
                    } else {
                        TokenKind::Operator(Operator::ShiftLeft)
                    }
                } else if self.try_get('=') {
                    if self.try_get('>') {
                        TokenKind::Operator(Operator::CompareThreeWay)
                    } else {
                        TokenKind::Operator(Operator::CompareLe)
                    }
                } else {
                    TokenKind::Operator(Operator::CompareLt)
                }
            }
            '>' => {
                if self.try_get('>') {
                    if self.try_get('>') {
                        if self.try_get('=') {
                            TokenKind::Operator(Operator::RotateRightAssign)
                        } else {
                            TokenKind::Operator(Operator::RotateRight)
                        }
                    } else if self.try_get('=') {
                        TokenKind::Operator(Operator::ShiftRightAssign)
                    } else {
                        TokenKind::Operator(Operator::ShiftRight)
                    }
                } else if self.try_get('=') {
                    TokenKind::Operator(Operator::CompareGe)
                } else {
                    TokenKind::Operator(Operator::CompareGt)
                }
            }
            '?' => TokenKind::TraitsOf,
            '$' => TokenKind::Wildcard,
            '@' => TokenKind::Address,
            '#' => TokenKind::Hash,
            '\'' => return self.tokenize_char_literal(start),
            '"' => return self.tokenize_string_literal(start),
            '(' => TokenKind::ParenLeft,
            ')' => TokenKind::ParenRight,
            '[' => TokenKind::BracketLeft,
            ']' => TokenKind::BracketRight,
            '{' => TokenKind::BraceLeft,
            '}' => TokenKind::BraceRight,
            '.' => TokenKind::Dot,
            ':' => TokenKind::Colon,
            ',' => TokenKind::Comma,
            ';' => {
                if self.try_get(';') {
                    TokenKind::NoOp
                } else {
                    TokenKind::Semicolon
                }
            }
            other => {
                return Err(LexError::new(
                    LexErrorKind::UnrecognizedCharacter(other),
                    Span::new(start, self.cursor.pos()),
                ))
            }
        })
    }

    fn next_token(&mut self) -> Option<Result<Token, LexError>> {
        self.skip_comments_and_whitespace();
        let start = self.cursor.pos();
        let c = self.cursor.peek()?;

        let result = if c.is_ascii_alphabetic() || c == '_' {
            Ok(self.tokenize_keyword_or_identifier())
        } else if c.is_ascii_digit() {
            self.tokenize_numeric()
        } else {
            self.tokenize_sign()
        };

        Some(result.map(|kind| Token::new(kind, Span::new(start, self.cursor.pos()))))
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Result<Token, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .map(|r| r.expect("lex error").kind)
            .collect()
    }

    #[test]
    fn skips_single_backtick_comments() {
        assert_eq!(lex("`this is a comment` let"), vec![TokenKind::Keyword(Keyword::Let)]);
    }

    #[test]
    fn skips_doubled_backtick_line_comments() {
        assert_eq!(
            lex("``line comment\nlet"),
            vec![TokenKind::Keyword(Keyword::Let)]
        );
    }

    #[test]
    fn identifiers_allow_dots_and_underscores() {
        assert_eq!(
            lex("foo_bar.baz"),
            vec![TokenKind::Identifier("foo_bar.baz".to_string())]
        );
    }

    #[test]
    fn classifies_keywords() {
        assert_eq!(lex("if while return"), vec![
            TokenKind::Keyword(Keyword::If),
            TokenKind::Keyword(Keyword::While),
            TokenKind::Keyword(Keyword::Return),
        ]);
    }

    #[test]
    fn decimal_and_float_literals() {
        assert_eq!(lex("42"), vec![TokenKind::LiteralInt(42)]);
        assert_eq!(lex("3.5"), vec![TokenKind::LiteralReal(3.5)]);
    }

    #[test]
    fn binary_hex_and_radix_literals() {
        assert_eq!(lex("0b101"), vec![TokenKind::LiteralInt(5)]);
        assert_eq!(lex("0xFF"), vec![TokenKind::LiteralInt(255)]);
        assert_eq!(lex("0r16:FF"), vec![TokenKind::LiteralInt(255)]);
    }

    #[test]
    fn char_and_string_literals() {
        assert_eq!(lex("'a'"), vec![TokenKind::LiteralChar('a')]);
        assert_eq!(
            lex("\"hello\""),
            vec![TokenKind::LiteralString("hello".to_string())]
        );
    }

    #[test]
    fn multi_character_char_literal_is_an_error() {
        let mut lexer = Lexer::new("'ab'");
        assert!(matches!(
            lexer.next(),
            Some(Err(LexError {
                kind: LexErrorKind::InvalidCharLiteral,
                ..
            }))
        ));
    }

    #[test]
    fn triple_angle_operators() {
        assert_eq!(lex("<<<"), vec![TokenKind::Operator(Operator::RotateLeft)]);
        assert_eq!(lex(">>>="), vec![TokenKind::Operator(Operator::RotateRightAssign)]);
        assert_eq!(lex("=>"), vec![TokenKind::Arrow]);
        assert_eq!(lex(";;"), vec![TokenKind::NoOp]);
    }

    #[test]
    fn non_ascii_letters_do_not_extend_an_identifier() {
        let mut lexer = Lexer::new("café");
        assert_eq!(lexer.next().unwrap().unwrap().kind, TokenKind::Identifier("caf".to_string()));
        assert!(matches!(
            lexer.next(),
            Some(Err(LexError {
                kind: LexErrorKind::UnrecognizedCharacter(_),
                ..
            }))
        ));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let mut lexer = Lexer::new("\"abc");
        assert!(matches!(
            lexer.next(),
            Some(Err(LexError {
                kind: LexErrorKind::UnterminatedStringLiteral,
                ..
            }))
        ));
    }
}
