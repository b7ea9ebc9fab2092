//! End-to-end parser tests against the public `Parser` API, asserting
//! directly on the returned `Expression`/`Type` trees rather than
//! snapshotting a debug rendering.

use zero_ast::{Expression, Type};
use zero_parser::{ParseErrorKind, Parser};

fn parse_one(source: &str) -> Expression {
    Parser::new(source).unwrap().parse().unwrap()
}

// ── Declarations ─────────────────────────────────────────────────────

#[test]
fn fundamental_type_declaration_with_explicit_bit_width() {
    let e = parse_one("int(16) x = 7;");
    match e {
        Expression::Declaration(d) => {
            assert_eq!(*d.type_expr, Expression::Type(Type::Int { bits: 16 }));
            assert_eq!(*d.init, Expression::LiteralInt(7));
        }
        other => panic!("expected a Declaration, got {other:?}"),
    }
}

#[test]
fn let_declaration_infers_its_type_from_the_initializer() {
    let e = parse_one("let flag = true;");
    match e {
        Expression::Declaration(d) => assert_eq!(*d.type_expr, Expression::Type(Type::Bool)),
        other => panic!("expected a Declaration, got {other:?}"),
    }
}

#[test]
fn custom_type_declaration_with_no_initializer_uses_the_noop_sentinel() {
    let e = parse_one("Point p;");
    match e {
        Expression::Declaration(d) => assert_eq!(*d.init, Expression::NoOp),
        other => panic!("expected a Declaration, got {other:?}"),
    }
}

// ── Records and enums ────────────────────────────────────────────────

#[test]
fn anonymous_record_literal_is_a_bare_type_value() {
    let e = parse_one("type { int a; bool b; }");
    match e {
        Expression::Type(Type::Record(r)) => assert_eq!(r.fields.len(), 2),
        other => panic!("expected a record type, got {other:?}"),
    }
}

#[test]
fn enum_declaration_defaults_its_underlying_type_to_int() {
    let mut parser = Parser::new("enum Color { Red = 0, Green = 1 }").unwrap();
    let e = parser.parse().unwrap();
    match e {
        Expression::Declaration(d) => match &*d.init {
            Expression::Type(Type::Enum(en)) => {
                assert_eq!(en.values.len(), 2);
                assert_eq!(*en.underlying_type, Expression::Type(Type::int()));
            }
            other => panic!("expected an enum type, got {other:?}"),
        },
        other => panic!("expected a Declaration, got {other:?}"),
    }
}

#[test]
fn enum_declaration_honors_an_explicit_underlying_type() {
    let mut parser = Parser::new("enum Flag: bool { On = true, Off = false }").unwrap();
    let e = parser.parse().unwrap();
    match e {
        Expression::Declaration(d) => match &*d.init {
            Expression::Type(Type::Enum(en)) => {
                assert_eq!(*en.underlying_type, Expression::Type(Type::Bool));
            }
            other => panic!("expected an enum type, got {other:?}"),
        },
        other => panic!("expected a Declaration, got {other:?}"),
    }
}

// ── Control flow ─────────────────────────────────────────────────────

#[test]
fn branch_without_else_leaves_on_false_empty() {
    let e = parse_one("if true do break;");
    match e {
        Expression::Branch(b) => assert!(b.on_false.is_none()),
        other => panic!("expected a Branch, got {other:?}"),
    }
}

#[test]
fn elif_chains_nest_as_branch_expressions() {
    let e = parse_one("if true do break elif false do continue else break;");
    match e {
        Expression::Branch(b) => match b.on_false.as_deref() {
            Some(Expression::Branch(inner)) => assert!(inner.on_false.is_some()),
            other => panic!("expected a nested Branch for 'elif', got {other:?}"),
        },
        other => panic!("expected a Branch, got {other:?}"),
    }
}

#[test]
fn while_loop_parses_condition_and_body() {
    let e = parse_one("while true do break;");
    assert!(matches!(e, Expression::While(_)));
}

#[test]
fn do_while_loop_reads_condition_after_the_braced_body() {
    let e = parse_one("do { break; } while true;");
    match e {
        Expression::DoWhile(w) => assert_eq!(*w.condition, Expression::LiteralBool(true)),
        other => panic!("expected a DoWhile, got {other:?}"),
    }
}

#[test]
fn classic_for_loop_carries_all_three_clauses() {
    let e = parse_one("for int i = 0; i; i do break;");
    match e {
        Expression::For(f) => {
            assert!(matches!(*f.init, Expression::Declaration(_)));
        }
        other => panic!("expected a For, got {other:?}"),
    }
}

#[test]
fn foreach_loop_is_distinguished_by_its_trailing_colon() {
    let e = parse_one("for item: items do break;");
    match e {
        Expression::ForEach(f) => {
            assert!(matches!(*f.iterator, Expression::UnqualifiedIdentifier(_)));
            assert!(matches!(*f.collection, Expression::UnqualifiedIdentifier(_)));
            assert_eq!(*f.body, Expression::Break);
        }
        other => panic!("expected a ForEach, got {other:?}"),
    }
}

// ── Functions and calls ──────────────────────────────────────────────

#[test]
fn named_function_declaration_registers_itself_as_a_declaration() {
    let e = parse_one("square(x) => int: return x;");
    match e {
        Expression::Declaration(d) => match &*d.type_expr {
            Expression::Type(Type::FunctionType(_)) => {}
            other => panic!("expected a function type, got {other:?}"),
        },
        other => panic!("expected a Declaration, got {other:?}"),
    }
}

#[test]
fn anonymous_function_with_no_params() {
    let e = parse_one("() => int: return 1;");
    match e {
        Expression::Function(f) => assert!(f.params.is_empty()),
        other => panic!("expected a Function, got {other:?}"),
    }
}

#[test]
fn bare_parenthesized_expression_is_not_a_function() {
    let e = parse_one("(1);");
    assert_eq!(e, Expression::LiteralInt(1));
}

// ── Modules ──────────────────────────────────────────────────────────

#[test]
fn namespace_groups_its_elements_under_a_name() {
    let e = parse_one("namespace geo { int x = 1; int y = 2; }");
    match e {
        Expression::Namespace(n) => assert_eq!(n.elements.len(), 2),
        other => panic!("expected a Namespace, got {other:?}"),
    }
}

#[test]
fn parse_file_stops_cleanly_at_end_of_input() {
    let mut parser = Parser::new("int x = 1;\nint y = 2;\n").unwrap();
    let module = parser.parse_file().unwrap();
    assert_eq!(module.global_scope.expressions.len(), 2);
}

// ── Errors ───────────────────────────────────────────────────────────

#[test]
fn ambiguous_return_type_is_reported_before_a_value_is_inferred() {
    // The inferred return type is read off a `select`'s cases directly;
    // an int case next to a bool default disagrees, so this must fail
    // before ever picking one of the two candidates.
    let err = Parser::new("bad(x): select x { if 1: return 1; else: return true; }")
        .unwrap()
        .parse()
        .unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::SemanticAmbiguity);
}

#[test]
fn char_and_string_literals_are_reported_as_unimplemented() {
    let err = Parser::new("'a';").unwrap().parse().unwrap_err();
    assert_eq!(err.kind, ParseErrorKind::UnimplementedForm);
}
