//! `Type`: the closed sum of type-level values, grounded on `AST.hpp`'s
//! `Detail::TypeBase<...>` variant list and `AST.cpp`'s per-variant
//! `operator==`/`GetHash` bodies.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use zero_common::intern::IdentifierId;
use zero_common::operator::Operator;
use zero_pool::{Handle, Pool, Pooled};

use crate::expr::{Declaration, Expression};
use crate::hash::combine_all;

/// Bit width used when a fundamental numeric type omits an explicit
/// width (`int` without `<N>`, for instance).
pub const DEFAULT_BIT_WIDTH: u32 = 32;

#[derive(Debug, Clone)]
pub struct EnumType {
    pub values: FxHashMap<IdentifierId, Expression>,
    pub underlying_type: Handle<Expression>,
}

impl PartialEq for EnumType {
    fn eq(&self, other: &Self) -> bool {
        *self.underlying_type == *other.underlying_type && self.values == other.values
    }
}

impl EnumType {
    pub fn get_hash(&self) -> u64 {
        let mut r = self.underlying_type.get_hash();
        for (id, value) in &self.values {
            r ^= zero_common::hash::wellons_mix64(id.index() as u64) ^ value.get_hash();
        }
        r
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayType {
    pub elem: Handle<Type>,
    pub size: u64,
}

impl ArrayType {
    pub fn get_hash(&self) -> u64 {
        zero_common::hash::wellons_mix64(self.size) ^ self.elem.get_hash()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TupleType {
    pub types: Vec<Type>,
}

impl TupleType {
    pub fn get_hash(&self) -> u64 {
        combine_all(self.types.iter().map(Type::get_hash))
    }
}

/// A record's ordered fields plus the per-category member indexes the
/// data model requires stay in sync with them. `RecordType::new` is the
/// only constructor so that invariant can't be violated by hand.
///
/// Declarations carry no "static" marker and this grammar has no
/// operator-overload declaration syntax, so `variables_static`,
/// `functions_static`, and `operators` are always empty; they exist so
/// downstream tooling has a stable place to populate them later.
#[derive(Debug, Clone)]
pub struct RecordType {
    pub fields: Vec<Declaration>,
    pub operators: FxHashMap<Operator, usize>,
    pub variables: FxHashMap<IdentifierId, usize>,
    pub variables_static: FxHashMap<IdentifierId, usize>,
    pub functions: FxHashMap<IdentifierId, usize>,
    pub functions_static: FxHashMap<IdentifierId, usize>,
}

impl RecordType {
    pub fn new(fields: Vec<Declaration>) -> Self {
        let mut variables = FxHashMap::default();
        let mut functions = FxHashMap::default();
        for (i, field) in fields.iter().enumerate() {
            if matches!(field.type_expr.type_of(), Some(Type::FunctionType(_))) {
                functions.insert(field.name.id, i);
            } else {
                variables.insert(field.name.id, i);
            }
        }
        Self {
            fields,
            operators: FxHashMap::default(),
            variables,
            variables_static: FxHashMap::default(),
            functions,
            functions_static: FxHashMap::default(),
        }
    }

    pub fn get_hash(&self) -> u64 {
        combine_all(self.fields.iter().map(Declaration::get_hash))
    }
}

impl PartialEq for RecordType {
    /// Only the ordered field list is compared, matching the original:
    /// the member-category tables are derived from `fields` and compared
    /// redundantly would only duplicate this check.
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionTypeRepr {
    pub return_type: Handle<Expression>,
    pub param_types: Vec<Expression>,
}

impl FunctionTypeRepr {
    pub fn get_hash(&self) -> u64 {
        let mut r = self.return_type.get_hash();
        for p in &self.param_types {
            r ^= p.get_hash();
        }
        r
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// A value that itself denotes a type (the type of `int`, `MyRecord`, ...).
    MetaType,
    Void,
    Nil,
    Bool,
    Int { bits: u32 },
    UInt { bits: u32 },
    Float { bits: u32 },
    Enum(Handle<EnumType>),
    Array(Handle<ArrayType>),
    Tuple(Handle<TupleType>),
    Record(Handle<RecordType>),
    FunctionType(Handle<FunctionTypeRepr>),
}

impl Type {
    pub fn int() -> Type {
        Type::Int {
            bits: DEFAULT_BIT_WIDTH,
        }
    }

    pub fn uint() -> Type {
        Type::UInt {
            bits: DEFAULT_BIT_WIDTH,
        }
    }

    pub fn float() -> Type {
        Type::Float {
            bits: DEFAULT_BIT_WIDTH,
        }
    }

    /// Stable per-variant seeds, matching `AST.cpp`'s `WellonsMix(WellonsMix(__LINE__) ^ WellonsMix(__COUNTER__))`
    /// pattern for unit types without hashing build-time-varying data
    /// (see `SPEC_FULL.md` §9 / `DESIGN.md`).
    fn unit_seed(self_index: u64) -> u64 {
        zero_common::hash::wellons_mix64(self_index.wrapping_mul(0x9e37_79b9_7f4a_7c15))
    }

    pub fn get_hash(&self) -> u64 {
        match self {
            Type::MetaType => Self::unit_seed(1),
            Type::Void => Self::unit_seed(2),
            Type::Nil => Self::unit_seed(3),
            Type::Bool => Self::unit_seed(4),
            Type::Int { bits } => {
                Self::unit_seed(5)
                    ^ if *bits == DEFAULT_BIT_WIDTH {
                        zero_common::hash::wellons_mix64(DEFAULT_BIT_WIDTH as u64)
                    } else {
                        zero_common::hash::wellons_mix64(*bits as u64)
                    }
            }
            Type::UInt { bits } => {
                Self::unit_seed(6)
                    ^ if *bits == DEFAULT_BIT_WIDTH {
                        zero_common::hash::wellons_mix64(DEFAULT_BIT_WIDTH as u64)
                    } else {
                        zero_common::hash::wellons_mix64(*bits as u64)
                    }
            }
            Type::Float { bits } => {
                Self::unit_seed(7)
                    ^ if *bits == DEFAULT_BIT_WIDTH {
                        zero_common::hash::wellons_mix64(DEFAULT_BIT_WIDTH as u64)
                    } else {
                        zero_common::hash::wellons_mix64(*bits as u64)
                    }
            }
            Type::Enum(e) => e.get_hash(),
            Type::Array(a) => a.get_hash(),
            Type::Tuple(t) => t.get_hash(),
            Type::Record(r) => r.get_hash(),
            Type::FunctionType(f) => f.get_hash(),
        }
    }
}

impl Pooled for Type {
    fn pool() -> &'static Pool<Self> {
        static POOL: OnceLock<Pool<Type>> = OnceLock::new();
        POOL.get_or_init(Pool::new)
    }
}

impl Pooled for EnumType {
    fn pool() -> &'static Pool<Self> {
        static POOL: OnceLock<Pool<EnumType>> = OnceLock::new();
        POOL.get_or_init(Pool::new)
    }
}

impl Pooled for ArrayType {
    fn pool() -> &'static Pool<Self> {
        static POOL: OnceLock<Pool<ArrayType>> = OnceLock::new();
        POOL.get_or_init(Pool::new)
    }
}

impl Pooled for TupleType {
    fn pool() -> &'static Pool<Self> {
        static POOL: OnceLock<Pool<TupleType>> = OnceLock::new();
        POOL.get_or_init(Pool::new)
    }
}

impl Pooled for RecordType {
    fn pool() -> &'static Pool<Self> {
        static POOL: OnceLock<Pool<RecordType>> = OnceLock::new();
        POOL.get_or_init(Pool::new)
    }
}

impl Pooled for FunctionTypeRepr {
    fn pool() -> &'static Pool<Self> {
        static POOL: OnceLock<Pool<FunctionTypeRepr>> = OnceLock::new();
        POOL.get_or_init(Pool::new)
    }
}
