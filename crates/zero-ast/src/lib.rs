//! The Zero AST: `Type` and `Expression`, the two closed sum types the
//! parser builds, plus their equality, hashing, constness, and
//! return-type-inference semantics.

pub mod expr;
mod hash;
pub mod types;

pub use expr::{
    BinaryExpression, Branch, Cast, ConstructorCall, Declaration, DestructorCall, Defer, DoWhile,
    Expression, For, ForEach, Function, FunctionCall, Module, Namespace, QualifiedIdentifier,
    Scope, Select, UnaryExpression, UnqualifiedIdentifier, Use, While,
};
pub use types::{ArrayType, EnumType, FunctionTypeRepr, RecordType, Type, TupleType, DEFAULT_BIT_WIDTH};
