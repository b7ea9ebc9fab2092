//! The Zero parser: one-token-lookahead recursive descent over
//! `zero_lexer`'s token stream, producing a `zero_ast::Module`.

pub mod error;
pub mod parser;

pub use error::{ParseError, ParseErrorKind};
pub use parser::Parser;
