//! `Expression`: the closed sum of 33 expression-level node kinds, plus
//! the value types embedded in more than one variant (`Declaration`,
//! `UnqualifiedIdentifier`, `QualifiedIdentifier`). Grounded on
//! `AST.hpp`'s field lists and `AST.cpp`'s per-variant `operator==`/
//! `GetHash`/`IsConst`/`GetType`/`InferReturnType` bodies.

use std::sync::OnceLock;

use rustc_hash::FxHashMap;
use zero_common::intern::IdentifierId;
use zero_common::operator::Operator;
use zero_pool::{Handle, Pool, Pooled};

use crate::hash::combine_all;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnqualifiedIdentifier {
    pub id: IdentifierId,
}

impl UnqualifiedIdentifier {
    pub fn get_hash(&self) -> u64 {
        zero_common::hash::wellons_mix64(self.id.index() as u64)
    }

    pub fn is_const(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedIdentifier {
    pub names: Vec<IdentifierId>,
}

impl QualifiedIdentifier {
    /// Hashed as one byte run over the id sequence (grounded on the
    /// original's `XXHash64(names.data(), names.size() * sizeof(IdentifierID))`),
    /// unlike every other aggregate here, which XORs per-element hashes.
    pub fn get_hash(&self) -> u64 {
        let mut bytes = Vec::with_capacity(self.names.len() * 4);
        for id in &self.names {
            bytes.extend_from_slice(&id.index().to_le_bytes());
        }
        zero_common::hash::hash_bytes(&bytes)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub type_expr: Handle<Expression>,
    pub name: UnqualifiedIdentifier,
    pub init: Handle<Expression>,
}

impl Declaration {
    pub fn get_hash(&self) -> u64 {
        self.type_expr.get_hash() ^ self.name.get_hash() ^ self.init.get_hash()
    }

    pub fn is_const(&self) -> bool {
        self.type_expr.is_const() && self.name.is_const() && self.init.is_const()
    }

    pub fn type_of(&self) -> Option<Type> {
        self.type_expr.type_of()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Use {
    pub modules: Vec<QualifiedIdentifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    pub name: UnqualifiedIdentifier,
    pub elements: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub value: Handle<Expression>,
    pub new_type: Handle<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub body: Handle<Expression>,
    pub return_type: Handle<Expression>,
    pub params: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub callable: Handle<Expression>,
    pub params: Vec<Expression>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub expressions: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    pub condition: Handle<Expression>,
    pub on_true: Handle<Expression>,
    pub on_false: Option<Handle<Expression>>,
}

#[derive(Debug, Clone)]
pub struct Select {
    pub key: Handle<Expression>,
    pub cases: FxHashMap<Expression, Expression>,
    pub default_case: Option<Handle<Expression>>,
}

impl PartialEq for Select {
    /// The one fix the original spec mandates: an absent `default_case`
    /// is equal only to another absent `default_case`, never to the
    /// original's unconditional (and unsound) dereference.
    fn eq(&self, other: &Self) -> bool {
        if self.cases.len() != other.cases.len() {
            return false;
        }
        for (k, v) in &self.cases {
            match other.cases.get(k) {
                Some(v2) if v == v2 => {}
                _ => return false,
            }
        }
        *self.key == *other.key && self.default_case == other.default_case
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct While {
    pub condition: Handle<Expression>,
    pub body: Handle<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DoWhile {
    pub condition: Handle<Expression>,
    pub body: Handle<Expression>,
}

#[derive(Debug, Clone)]
pub struct For {
    pub init: Handle<Expression>,
    pub condition: Handle<Expression>,
    pub update: Handle<Expression>,
    pub body: Handle<Expression>,
}

impl PartialEq for For {
    /// Preserved faithfully from the original: two `for` loops never
    /// compare equal. See `DESIGN.md` for why this quirk is kept rather
    /// than "corrected" to structural comparison.
    fn eq(&self, _other: &Self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForEach {
    pub iterator: Handle<Expression>,
    pub collection: Handle<Expression>,
    pub body: Handle<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryExpression {
    pub op: Operator,
    pub other: Handle<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpression {
    pub op: Operator,
    pub lhs: Handle<Expression>,
    pub rhs: Handle<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Defer {
    pub body: Handle<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorCall {
    pub object: Handle<Expression>,
    pub parameters: Vec<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DestructorCall {
    pub object: Handle<Expression>,
}

/// The 33-variant closed sum of expression-level AST nodes, grounded on
/// `AST.hpp`'s `Detail::ExpressionBase<...>` variant list.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Use(Use),
    Namespace(Namespace),
    NoOp,
    UnqualifiedIdentifier(UnqualifiedIdentifier),
    QualifiedIdentifier(QualifiedIdentifier),
    Type(Type),
    Cast(Cast),
    Function(Function),
    FunctionCall(FunctionCall),
    Scope(Scope),
    Branch(Branch),
    Select(Select),
    While(While),
    DoWhile(DoWhile),
    For(For),
    ForEach(ForEach),
    UnaryExpression(UnaryExpression),
    BinaryExpression(BinaryExpression),
    Declaration(Declaration),
    LiteralNil,
    LiteralBool(bool),
    LiteralInt(i64),
    LiteralUint(u64),
    LiteralReal(f64),
    Break,
    Continue,
    Defer(Defer),
    Return(Option<Handle<Expression>>),
    Yield(Option<Handle<Expression>>),
    Wildcard,
    TraitsOf(Handle<Expression>),
    ConstructorCall(ConstructorCall),
    DestructorCall(DestructorCall),
}

impl Expression {
    fn unit_seed(self_index: u64) -> u64 {
        zero_common::hash::wellons_mix64(self_index.wrapping_mul(0x9e37_79b9_7f4a_7c15) ^ 0xa5a5_a5a5_a5a5_a5a5)
    }

    /// Stable, per-build-identical hash. The original hashes `NoOp` with
    /// the build's `__DATE__`/`__TIME__`, which this port replaces with a
    /// fixed constant per `SPEC_FULL.md` §9's explicit instruction.
    pub fn get_hash(&self) -> u64 {
        match self {
            Expression::Use(u) => combine_all(u.modules.iter().map(QualifiedIdentifier::get_hash)),
            Expression::Namespace(n) => {
                n.name.get_hash() ^ combine_all(n.elements.iter().map(Expression::get_hash))
            }
            Expression::NoOp => Self::unit_seed(1),
            Expression::UnqualifiedIdentifier(i) => i.get_hash(),
            Expression::QualifiedIdentifier(q) => q.get_hash(),
            Expression::Type(t) => t.get_hash(),
            Expression::Cast(c) => c.value.get_hash() ^ c.new_type.get_hash(),
            Expression::Function(f) => {
                let mut r = f.body.get_hash() ^ f.return_type.get_hash();
                for p in &f.params {
                    r ^= p.get_hash();
                }
                r
            }
            Expression::FunctionCall(c) => {
                let mut r = c.callable.get_hash();
                for p in &c.params {
                    r ^= p.get_hash();
                }
                r
            }
            Expression::Scope(s) => combine_all(s.expressions.iter().map(Expression::get_hash)),
            Expression::Branch(b) => {
                b.condition.get_hash()
                    ^ b.on_true.get_hash()
                    ^ b.on_false.as_ref().map_or(0, |e| e.get_hash())
            }
            Expression::Select(s) => {
                let mut r = s.key.get_hash() ^ s.default_case.as_ref().map_or(0, |e| e.get_hash());
                for (k, v) in &s.cases {
                    r ^= k.get_hash() ^ v.get_hash();
                }
                r
            }
            Expression::While(w) => w.condition.get_hash() ^ w.body.get_hash(),
            Expression::DoWhile(w) => w.condition.get_hash() ^ w.body.get_hash(),
            Expression::For(f) => {
                f.init.get_hash() ^ f.condition.get_hash() ^ f.update.get_hash() ^ f.body.get_hash()
            }
            Expression::ForEach(f) => {
                f.iterator.get_hash() ^ f.collection.get_hash() ^ f.body.get_hash()
            }
            Expression::UnaryExpression(u) => {
                u.other.get_hash() ^ zero_common::hash::wellons_mix64(u.op as u64)
            }
            Expression::BinaryExpression(b) => {
                b.lhs.get_hash() ^ b.rhs.get_hash() ^ zero_common::hash::wellons_mix64(b.op as u64)
            }
            Expression::Declaration(d) => d.get_hash(),
            Expression::LiteralNil => Self::unit_seed(2),
            Expression::LiteralBool(v) => zero_common::hash::wellons_mix64(*v as u64),
            Expression::LiteralInt(v) => zero_common::hash::wellons_mix64(*v as u64),
            Expression::LiteralUint(v) => zero_common::hash::wellons_mix64(*v),
            Expression::LiteralReal(v) => zero_common::hash::wellons_mix64(v.to_bits()),
            Expression::Break => Self::unit_seed(3),
            Expression::Continue => 0,
            Expression::Defer(d) => zero_common::hash::wellons_mix64(d.body.get_hash()),
            Expression::Return(v) => {
                zero_common::hash::wellons_mix64(v.as_ref().map_or(0, |e| e.get_hash()))
            }
            Expression::Yield(v) => {
                zero_common::hash::wellons_mix64(v.as_ref().map_or(0, |e| e.get_hash()))
            }
            Expression::Wildcard => Self::unit_seed(4),
            Expression::TraitsOf(v) => zero_common::hash::wellons_mix64(v.get_hash()),
            Expression::ConstructorCall(c) => combine_all(c.parameters.iter().map(Expression::get_hash)),
            Expression::DestructorCall(d) => zero_common::hash::wellons_mix64(d.object.get_hash()),
        }
    }

    /// `Operator::as u64` above needs `Operator: Copy`; `zero_common`
    /// defines it as a plain fieldless enum so the cast is just its
    /// discriminant.
    pub fn is_const(&self) -> bool {
        match self {
            Expression::Use(_) => true,
            Expression::Namespace(n) => {
                n.name.is_const() && n.elements.iter().all(Expression::is_const)
            }
            Expression::NoOp => true,
            Expression::UnqualifiedIdentifier(i) => i.is_const(),
            Expression::QualifiedIdentifier(_) => true,
            Expression::Type(_) => true,
            Expression::Cast(_) => false,
            Expression::Function(f) => {
                f.return_type.is_const() && f.body.is_const() && f.params.iter().all(Expression::is_const)
            }
            Expression::FunctionCall(_) => false,
            Expression::Scope(s) => s.expressions.iter().all(Expression::is_const),
            Expression::Branch(b) => {
                b.on_false.as_ref().map_or(true, |e| e.is_const())
                    && b.condition.is_const()
                    && b.on_true.is_const()
            }
            Expression::Select(s) => {
                s.key.is_const()
                    && s.default_case.as_ref().map_or(true, |e| e.is_const())
                    && s.cases.iter().all(|(k, v)| k.is_const() && v.is_const())
            }
            Expression::While(w) => w.condition.is_const() && w.body.is_const(),
            Expression::DoWhile(w) => w.condition.is_const() && w.body.is_const(),
            Expression::For(f) => {
                f.init.is_const() && f.condition.is_const() && f.update.is_const() && f.body.is_const()
            }
            Expression::ForEach(f) => {
                f.iterator.is_const() && f.collection.is_const() && f.body.is_const()
            }
            Expression::UnaryExpression(u) => u.other.is_const(),
            Expression::BinaryExpression(b) => b.lhs.is_const() && b.rhs.is_const(),
            Expression::Declaration(d) => d.is_const(),
            Expression::LiteralNil
            | Expression::LiteralBool(_)
            | Expression::LiteralInt(_)
            | Expression::LiteralUint(_)
            | Expression::LiteralReal(_) => true,
            Expression::Break | Expression::Continue => true,
            Expression::Defer(_) => false,
            Expression::Return(_) | Expression::Yield(_) => false,
            Expression::Wildcard => true,
            Expression::TraitsOf(v) => v.is_const(),
            // Always constant: no evaluation happens in this front end.
            Expression::ConstructorCall(_) | Expression::DestructorCall(_) => true,
        }
    }

    /// `None` where the original aborts (`UnqualifiedIdentifier`,
    /// `QualifiedIdentifier`, `UnaryExpression`, `BinaryExpression` all
    /// call `abort()` in `GetType`, since resolving their type needs a
    /// symbol table this front end doesn't build).
    pub fn type_of(&self) -> Option<Type> {
        match self {
            Expression::Type(t) => Some(t.clone()),
            Expression::LiteralBool(_) => Some(Type::Bool),
            Expression::LiteralNil => Some(Type::Nil),
            Expression::LiteralInt(_) => Some(Type::int()),
            Expression::LiteralUint(_) => Some(Type::uint()),
            Expression::LiteralReal(_) => Some(Type::float()),
            Expression::Declaration(d) => d.type_of(),
            Expression::Function(f) => Some(Type::FunctionType(Handle::new(crate::types::FunctionTypeRepr {
                return_type: f.return_type.clone(),
                param_types: f.params.iter().map(|p| p.type_of_as_expr()).collect(),
            }))),
            Expression::FunctionCall(c) => c.callable.infer_return_type().1,
            Expression::ConstructorCall(c) => c.object.type_of(),
            _ => None,
        }
    }

    /// Used where the original stores a param's *type* as another
    /// `Expression` (`FunctionType::param_types: Vec<Expression>`):
    /// wraps the computed `Type` back into an `Expression::Type`, or
    /// falls back to the expression itself when no type is derivable.
    fn type_of_as_expr(&self) -> Expression {
        match self.type_of() {
            Some(t) => Expression::Type(t),
            None => self.clone(),
        }
    }

    /// Bounded, localized return-type inference over control-flow
    /// expressions. Returns `(found, type)`; `type` is only meaningful
    /// when `found` is `true` (mirrors the original's
    /// `std::pair<bool, Type>`, translated to `(bool, Option<Type>)`
    /// for variants where "found" can never be true, with `Type`
    /// surfaced as `Option` so callers never see a meaningless default).
    pub fn infer_return_type(&self) -> (bool, Option<Type>) {
        match self {
            Expression::Scope(s) => {
                let candidates: Vec<Type> = s
                    .expressions
                    .iter()
                    .filter(|e| {
                        matches!(
                            e,
                            Expression::Return(_) | Expression::Yield(_) | Expression::Scope(_)
                        )
                    })
                    .filter_map(|e| {
                        let (found, ty) = e.infer_return_type();
                        if found {
                            ty
                        } else {
                            None
                        }
                    })
                    .collect();
                Self::resolve_candidates(candidates)
            }
            Expression::Branch(b) => {
                let tr = b.on_true.infer_return_type();
                let fr = b
                    .on_false
                    .as_ref()
                    .map_or((false, None), |e| e.infer_return_type());
                if tr.0 {
                    tr
                } else {
                    fr
                }
            }
            Expression::Select(s) => {
                let mut candidates: Vec<Type> = s
                    .cases
                    .values()
                    .filter(|v| {
                        matches!(
                            v,
                            Expression::Return(_) | Expression::Yield(_) | Expression::Scope(_)
                        )
                    })
                    .filter_map(|v| {
                        let (found, ty) = v.infer_return_type();
                        if found {
                            ty
                        } else {
                            None
                        }
                    })
                    .collect();
                if let Some(default_case) = &s.default_case {
                    if matches!(
                        **default_case,
                        Expression::Return(_) | Expression::Yield(_) | Expression::Scope(_)
                    ) {
                        let (found, ty) = default_case.infer_return_type();
                        if found {
                            if let Some(t) = ty {
                                candidates.push(t);
                            }
                        }
                    }
                }
                Self::resolve_candidates(candidates)
            }
            Expression::While(w) => w.body.infer_return_type(),
            Expression::DoWhile(w) => w.body.infer_return_type(),
            Expression::For(f) => f.body.infer_return_type(),
            Expression::ForEach(f) => f.body.infer_return_type(),
            Expression::Return(v) | Expression::Yield(v) => match v {
                Some(e) => (true, e.type_of().or(Some(Type::Void))),
                None => (true, Some(Type::Void)),
            },
            _ => (false, None),
        }
    }

    /// Re-collects the same candidate set `infer_return_type` does and
    /// reports whether it disagreed. Kept separate from
    /// `infer_return_type` so callers that only need the value (the
    /// common case, matching the original's call sites) don't pay for the
    /// check; a parser that wants the "Ambiguous function return type."
    /// diagnostic calls this alongside it.
    pub fn has_ambiguous_return_type(&self) -> bool {
        fn candidates_of(e: &Expression) -> Vec<Type> {
            match e {
                Expression::Scope(s) => s
                    .expressions
                    .iter()
                    .filter(|c| {
                        matches!(
                            c,
                            Expression::Return(_) | Expression::Yield(_) | Expression::Scope(_)
                        )
                    })
                    .filter_map(|c| {
                        let (found, ty) = c.infer_return_type();
                        if found {
                            ty
                        } else {
                            None
                        }
                    })
                    .collect(),
                Expression::Select(s) => {
                    let mut v: Vec<Type> = s
                        .cases
                        .values()
                        .filter(|c| {
                            matches!(
                                c,
                                Expression::Return(_) | Expression::Yield(_) | Expression::Scope(_)
                            )
                        })
                        .filter_map(|c| {
                            let (found, ty) = c.infer_return_type();
                            if found {
                                ty
                            } else {
                                None
                            }
                        })
                        .collect();
                    if let Some(d) = &s.default_case {
                        if matches!(
                            **d,
                            Expression::Return(_) | Expression::Yield(_) | Expression::Scope(_)
                        ) {
                            let (found, ty) = d.infer_return_type();
                            if found {
                                if let Some(t) = ty {
                                    v.push(t);
                                }
                            }
                        }
                    }
                    v
                }
                _ => Vec::new(),
            }
        }
        let candidates = candidates_of(self);
        match candidates.split_first() {
            None => false,
            Some((first, rest)) => rest.iter().any(|t| t != first),
        }
    }

    /// Disagreement among candidates still yields `(true, first)`, matching
    /// the original's behavior of reporting "Ambiguous function return
    /// type." as a side diagnostic while still returning the first
    /// candidate rather than failing the parse outright.
    fn resolve_candidates(candidates: Vec<Type>) -> (bool, Option<Type>) {
        match candidates.split_first() {
            None => (false, Some(Type::Void)),
            Some((first, _rest)) => (true, Some(first.clone())),
        }
    }
}

impl std::hash::Hash for Expression {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        state.write_u64(self.get_hash());
    }
}

impl Eq for Expression {}

impl Pooled for Expression {
    fn pool() -> &'static Pool<Self> {
        static POOL: OnceLock<Pool<Expression>> = OnceLock::new();
        POOL.get_or_init(Pool::new)
    }
}

/// The top-level parse result: a module is a single top-level `Scope`.
#[derive(Debug, Clone, Default)]
pub struct Module {
    pub global_scope: Scope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_equality_and_hash() {
        let a = Expression::LiteralInt(7);
        let b = Expression::LiteralInt(7);
        let c = Expression::LiteralInt(8);
        assert_eq!(a, b);
        assert_eq!(a.get_hash(), b.get_hash());
        assert_ne!(a, c);
    }

    #[test]
    fn for_loops_never_compare_equal() {
        let make = || For {
            init: Handle::new(Expression::NoOp),
            condition: Handle::new(Expression::NoOp),
            update: Handle::new(Expression::NoOp),
            body: Handle::new(Expression::Scope(Scope { expressions: vec![] })),
        };
        let a = make();
        let b = make();
        assert_ne!(a, b);
    }

    #[test]
    fn select_treats_two_absent_defaults_as_equal() {
        let a = Select {
            key: Handle::new(Expression::LiteralBool(true)),
            cases: FxHashMap::default(),
            default_case: None,
        };
        let b = Select {
            key: Handle::new(Expression::LiteralBool(true)),
            cases: FxHashMap::default(),
            default_case: None,
        };
        assert_eq!(a, b);
    }

    #[test]
    fn select_default_present_vs_absent_is_unequal() {
        let a = Select {
            key: Handle::new(Expression::LiteralBool(true)),
            cases: FxHashMap::default(),
            default_case: None,
        };
        let b = Select {
            key: Handle::new(Expression::LiteralBool(true)),
            cases: FxHashMap::default(),
            default_case: Some(Handle::new(Expression::NoOp)),
        };
        assert_ne!(a, b);
    }

    #[test]
    fn return_with_no_value_infers_void() {
        let r = Expression::Return(None);
        assert_eq!(r.infer_return_type(), (true, Some(Type::Void)));
    }

    #[test]
    fn return_with_value_infers_its_type() {
        let r = Expression::Return(Some(Handle::new(Expression::LiteralBool(true))));
        assert_eq!(r.infer_return_type(), (true, Some(Type::Bool)));
    }

    #[test]
    fn scope_return_type_comes_from_its_single_return() {
        let scope = Expression::Scope(Scope {
            expressions: vec![
                Expression::LiteralNil,
                Expression::Return(Some(Handle::new(Expression::LiteralInt(1)))),
            ],
        });
        assert_eq!(scope.infer_return_type(), (true, Some(Type::int())));
    }

    #[test]
    fn cast_compares_both_value_and_new_type() {
        let a = Expression::Cast(Cast {
            value: Handle::new(Expression::LiteralInt(1)),
            new_type: Handle::new(Expression::Type(Type::int())),
        });
        let b = Expression::Cast(Cast {
            value: Handle::new(Expression::LiteralInt(1)),
            new_type: Handle::new(Expression::Type(Type::Bool)),
        });
        assert_ne!(a, b);
    }
}
