//! Checker driver, scoping and body checking tests

use super::support::*;
use crate::ast::{Expr, LambdaParam, Span, Stmt, TypeDecl, TypeRef};
use crate::checker::TypeChecker;
use crate::config::CheckerConfig;
use crate::error::{to_source_span, TypecheckError};
use crate::templates::builtin::Builtin;
use crate::typed_ast::{TypedExprKind, TypedStmt};
use miette::Diagnostic;
use pretty_assertions::assert_eq;

/// `class Counter { count: i32  increment() -> i32 { this.count.add(1) } }`
fn counter() -> TypeDecl {
    class(
        "Counter",
        vec![field("count", ty(Builtin::I32))],
        vec![method(
            "increment",
            Vec::new(),
            Some(ty(Builtin::I32)),
            Expr::call(Expr::field(Expr::this(), "count"), "add", vec![Expr::int(1)]),
        )],
    )
}

fn new_counter() -> Expr {
    Expr::new_object(declared(0), vec![Expr::int(0)])
}

#[test]
fn test_method_bodies_are_checked() {
    let typed = check(&program(
        vec![counter()],
        Expr::call(new_counter(), "increment", Vec::new()),
    ))
    .unwrap();

    assert_eq!(entry_type(&typed), "i32");
    let bodies: Vec<_> = typed.bodies_named("Counter", "increment").collect();
    assert_eq!(bodies.len(), 1);
    let (_, body) = bodies[0];
    assert_eq!(typed.registry.name(body.return_type), "i32");
    assert!(matches!(body.body.kind, TypedExprKind::Call { .. }));
}

#[test]
fn test_unused_methods_are_still_checked() {
    let typed = check(&program(vec![counter()], Expr::unit())).unwrap();

    assert_eq!(typed.bodies_named("Counter", "increment").count(), 1);
}

#[test]
fn test_body_with_wrong_return_type() {
    let broken = class(
        "Broken",
        Vec::new(),
        vec![method("name", Vec::new(), Some(ty(Builtin::Str)), Expr::int(1))],
    );

    let result = check(&program(vec![broken], Expr::unit()));

    assert!(
        matches!(result, Err(TypecheckError::TypeMismatch { .. })),
        "Expected TypeMismatch, got {:?}",
        result
    );
}

#[test]
fn test_generic_class_methods_checked_per_instantiation() {
    // class Cell<T> { value: T  get() -> T { this.value } }
    let mut cell = class(
        "Cell",
        vec![field("value", TypeRef::type_param(0))],
        vec![method(
            "get",
            Vec::new(),
            Some(TypeRef::type_param(0)),
            Expr::field(Expr::this(), "value"),
        )],
    );
    cell.generic_params = vec!["T".to_string()];

    let entry = Expr::block(
        vec![Stmt::Expr(Expr::call(
            Expr::new_object(declared_with(0, vec![ty(Builtin::I32)]), vec![Expr::int(1)]),
            "get",
            Vec::new(),
        ))],
        Some(Expr::call(
            Expr::new_object(declared_with(0, vec![ty(Builtin::Str)]), vec![Expr::str("s")]),
            "get",
            Vec::new(),
        )),
    );

    let typed = check(&program(vec![cell], entry)).unwrap();

    assert_eq!(entry_type(&typed), "str");
    assert_eq!(typed.bodies_named("Cell<i32>", "get").count(), 1);
    assert_eq!(typed.bodies_named("Cell<str>", "get").count(), 1);
}

#[test]
fn test_this_outside_instance_method() {
    let odd = class(
        "Odd",
        Vec::new(),
        vec![static_method("me", Vec::new(), Some(ty(Builtin::Object)), Expr::this())],
    );

    match check(&program(vec![odd], Expr::unit())) {
        Err(TypecheckError::UndeclaredName { kind, name, .. }) => {
            assert_eq!(kind, "receiver");
            assert_eq!(name, "this");
        }
        other => panic!("Expected UndeclaredName error, got {:?}", other),
    }
}

#[test]
fn test_undeclared_variable() {
    let result = check(&program(Vec::new(), Expr::local("missing")));

    match result {
        Err(TypecheckError::UndeclaredName { kind, name, .. }) => {
            assert_eq!(kind, "variable");
            assert_eq!(name, "missing");
        }
        other => panic!("Expected UndeclaredName error, got {:?}", other),
    }
}

#[test]
fn test_block_scope_ends_with_block() {
    let entry = Expr::block(
        vec![Stmt::Expr(Expr::block(
            vec![Stmt::let_("inner", Some(ty(Builtin::I32)), Expr::int(1))],
            None,
        ))],
        Some(Expr::local("inner")),
    );

    let result = check(&program(Vec::new(), entry));

    assert!(
        matches!(result, Err(TypecheckError::UndeclaredName { .. })),
        "Expected UndeclaredName, got {:?}",
        result
    );
}

#[test]
fn test_assignment_checks_variable_type() {
    let ok = Expr::block(
        vec![
            Stmt::let_("x", Some(ty(Builtin::I32)), Expr::int(1)),
            Stmt::assign("x", Expr::int(2)),
        ],
        Some(Expr::local("x")),
    );
    assert_eq!(entry_type(&check(&program(Vec::new(), ok)).unwrap()), "i32");

    let wrong = Expr::block(
        vec![
            Stmt::let_("x", Some(ty(Builtin::I32)), Expr::int(1)),
            Stmt::assign("x", Expr::str("two")),
        ],
        None,
    );
    let result = check(&program(Vec::new(), wrong));
    assert!(
        matches!(result, Err(TypecheckError::TypeMismatch { .. })),
        "Expected TypeMismatch, got {:?}",
        result
    );
}

#[test]
fn test_field_assignment() {
    let entry = Expr::set_field(new_counter(), "count", Expr::int(5));

    let typed = check(&program(vec![counter()], entry)).unwrap();

    assert_eq!(entry_type(&typed), "unit");
    match &typed.entry.as_ref().unwrap().kind {
        TypedExprKind::FieldSet { value, .. } => assert_eq!(typed.registry.name(value.ty), "i32"),
        other => panic!("Expected a field set, got {:?}", other),
    }
}

#[test]
fn test_unknown_field() {
    let result = check(&program(vec![counter()], Expr::field(new_counter(), "total")));

    match result {
        Err(TypecheckError::UndeclaredName { kind, name, .. }) => {
            assert_eq!(kind, "field");
            assert_eq!(name, "Counter.total");
        }
        other => panic!("Expected UndeclaredName error, got {:?}", other),
    }
}

#[test]
fn test_lambda_captures_outer_locals() {
    let list = applied(Builtin::List, vec![ty(Builtin::I32)]);
    let entry = Expr::block(
        vec![
            Stmt::let_("base", Some(ty(Builtin::I32)), Expr::int(10)),
            Stmt::let_("xs", Some(list.clone()), Expr::new_object(list, Vec::new())),
        ],
        Some(Expr::call(
            Expr::local("xs"),
            "map",
            vec![Expr::lambda(
                vec![LambdaParam::inferred("x")],
                Expr::call(Expr::local("x"), "add", vec![Expr::local("base")]),
            )],
        )),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();
    let call = match &typed.entry.as_ref().unwrap().kind {
        TypedExprKind::Block { result, .. } => result.as_deref().unwrap(),
        other => panic!("Expected a block, got {:?}", other),
    };

    assert_eq!(entry_type(&typed), "List<i32>");
    match &call.kind {
        TypedExprKind::Call { args, .. } => match &args[0].kind {
            TypedExprKind::Lambda { captures, closure, .. } => {
                assert_eq!(captures.len(), 1);
                assert_eq!(captures[0].0, "base");
                assert_eq!(typed.registry.name(captures[0].1), "i32");

                let closure = typed.registry.get(closure.unwrap()).unwrap();
                assert_eq!(closure.fields.len(), 1);
                assert_eq!(closure.fields[0].name, "base");
            }
            other => panic!("Expected a lambda, got {:?}", other),
        },
        other => panic!("Expected a call, got {:?}", other),
    }
}

#[test]
fn test_closure_type_implements_function_interface() {
    let entry = Expr::block(
        vec![Stmt::let_(
            "f",
            None,
            Expr::lambda(
                vec![LambdaParam::annotated("x", ty(Builtin::I32))],
                Expr::call(Expr::local("x"), "add", vec![Expr::int(1)]),
            ),
        )],
        Some(Expr::local("f")),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();
    let closure = match &typed.entry.as_ref().unwrap().kind {
        TypedExprKind::Block { statements, .. } => match &statements[0] {
            TypedStmt::Let { value, .. } => match &value.kind {
                TypedExprKind::Lambda { closure, .. } => closure.unwrap(),
                other => panic!("Expected a lambda, got {:?}", other),
            },
            other => panic!("Expected a let, got {:?}", other),
        },
        other => panic!("Expected a block, got {:?}", other),
    };

    assert_eq!(entry_type(&typed), "Fn1<i32, i32>");
    let interface = typed.registry.get(closure).unwrap().supertype.unwrap();
    assert_eq!(typed.registry.name(interface), "Fn1<i32, i32>");
}

#[test]
fn test_lambda_without_parameter_types() {
    let entry = Expr::block(
        vec![Stmt::let_(
            "f",
            None,
            Expr::lambda(vec![LambdaParam::inferred("x")], Expr::local("x")),
        )],
        None,
    );

    let result = check(&program(Vec::new(), entry));

    assert!(
        matches!(result, Err(TypecheckError::InferenceFailure { .. })),
        "Expected InferenceFailure, got {:?}",
        result
    );
}

#[test]
fn test_lambda_with_too_many_parameters_points_at_lambda() {
    let params = ["a", "b", "c", "d", "e"]
        .iter()
        .map(|name| LambdaParam::annotated(*name, ty(Builtin::I32)))
        .collect();
    let entry = Expr::block(
        vec![Stmt::let_(
            "f",
            None,
            Expr::lambda(params, Expr::local("a")).with_span(Span::new(8, 40)),
        )],
        None,
    );

    match check(&program(Vec::new(), entry)) {
        Err(TypecheckError::UndeclaredName { kind, name, span }) => {
            assert_eq!(kind, "function interface");
            assert_eq!(name, "Fn5");
            assert_eq!(span, to_source_span(Some(Span::new(8, 40))));
        }
        other => panic!("Expected UndeclaredName error, got {:?}", other),
    }
}

#[test]
fn test_if_without_else_is_unit() {
    let entry = Expr::if_else(Expr::bool(true), Expr::str("yes"), None);

    let typed = check(&program(Vec::new(), entry)).unwrap();

    assert_eq!(entry_type(&typed), "unit");
}

#[test]
fn test_if_branches_join_at_common_supertype() {
    let animal = class("Animal", Vec::new(), Vec::new());
    let mut dog = class("Dog", Vec::new(), Vec::new());
    dog.supertype = Some(declared(0));
    let mut cat = class("Cat", Vec::new(), Vec::new());
    cat.supertype = Some(declared(0));

    let entry = Expr::if_else(
        Expr::bool(false),
        Expr::new_object(declared(1), Vec::new()),
        Some(Expr::new_object(declared(2), Vec::new())),
    );

    let typed = check(&program(vec![animal, dog, cat], entry)).unwrap();

    assert_eq!(entry_type(&typed), "Animal");
}

#[test]
fn test_if_condition_must_be_bool() {
    let entry = Expr::if_else(Expr::str("no"), Expr::unit(), None);

    let result = check(&program(Vec::new(), entry));

    assert!(
        matches!(result, Err(TypecheckError::TypeMismatch { .. })),
        "Expected TypeMismatch, got {:?}",
        result
    );
}

#[test]
fn test_runaway_body_checking_is_bounded() {
    let config = CheckerConfig {
        max_fixed_point_passes: 1,
        ..CheckerConfig::default()
    };

    let settled = TypeChecker::with_config(config).check_program(&program(Vec::new(), Expr::unit()));
    assert!(settled.is_ok(), "{:?}", settled.err());

    let result = TypeChecker::with_config(config).check_program(&program(vec![counter()], Expr::unit()));
    assert!(
        matches!(result, Err(TypecheckError::Internal { .. })),
        "Expected Internal error, got {:?}",
        result
    );
}

#[test]
fn test_errors_are_diagnostics_with_codes() {
    let error = check(&program(Vec::new(), Expr::local("missing"))).unwrap_err();

    assert_eq!(
        error.code().map(|code| code.to_string()),
        Some("sable::typecheck::undeclared_name".to_string())
    );
    assert!(error.labels().is_some());
    assert_eq!(error.to_string(), "Undeclared variable: missing");
}
