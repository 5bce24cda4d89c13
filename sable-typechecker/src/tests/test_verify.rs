//! Program verification tests

use super::support::*;
use crate::ast::{Expr, ExtensionDecl, Program, Span, TypeRef};
use crate::error::TypecheckError;
use crate::templates::builtin::Builtin;
use crate::types::TemplateId;
use pretty_assertions::assert_eq;

#[test]
fn test_missing_generic_arguments() {
    let holder = class("Holder", vec![field("items", ty(Builtin::List))], Vec::new());

    match check(&program(vec![holder], Expr::unit())) {
        Err(TypecheckError::GenericArity {
            type_name,
            expected,
            found,
            ..
        }) => {
            assert_eq!(type_name, "List");
            assert_eq!(expected, 1);
            assert_eq!(found, 0);
        }
        other => panic!("Expected GenericArity error, got {:?}", other),
    }
}

#[test]
fn test_type_parameter_out_of_scope() {
    let holder = class("Holder", vec![field("value", TypeRef::type_param(0))], Vec::new());

    match check(&program(vec![holder], Expr::unit())) {
        Err(TypecheckError::UndeclaredName { kind, .. }) => assert_eq!(kind, "type parameter"),
        other => panic!("Expected UndeclaredName error, got {:?}", other),
    }
}

#[test]
fn test_method_parameter_out_of_scope() {
    let holder = class(
        "Holder",
        Vec::new(),
        vec![method("get", Vec::new(), Some(TypeRef::method_param(0)), Expr::unit())],
    );

    match check(&program(vec![holder], Expr::unit())) {
        Err(TypecheckError::UndeclaredName { kind, .. }) => assert_eq!(kind, "method type parameter"),
        other => panic!("Expected UndeclaredName error, got {:?}", other),
    }
}

#[test]
fn test_unknown_template() {
    let holder = class(
        "Holder",
        vec![field("value", TypeRef::simple(TemplateId(999)))],
        Vec::new(),
    );

    match check(&program(vec![holder], Expr::unit())) {
        Err(TypecheckError::UndeclaredName { kind, name, .. }) => {
            assert_eq!(kind, "type");
            assert_eq!(name, "#999");
        }
        other => panic!("Expected UndeclaredName error, got {:?}", other),
    }
}

#[test]
fn test_literal_type_cannot_be_written() {
    let holder = class("Holder", vec![field("value", ty(Builtin::IntLiteral))], Vec::new());

    let result = check(&program(vec![holder], Expr::unit()));

    assert!(
        matches!(result, Err(TypecheckError::TypeMismatch { .. })),
        "Expected TypeMismatch, got {:?}",
        result
    );
}

#[test]
fn test_struct_cannot_declare_supertype() {
    let base = class("Base", Vec::new(), Vec::new());
    let mut value = struct_decl("Value", Vec::new());
    value.supertype = Some(declared(0));

    let result = check(&program(vec![base, value], Expr::unit()));

    assert!(
        matches!(result, Err(TypecheckError::TypeMismatch { .. })),
        "Expected TypeMismatch, got {:?}",
        result
    );
}

#[test]
fn test_class_cannot_extend_struct() {
    let value = struct_decl("Value", Vec::new());
    let mut derived = class("Derived", Vec::new(), Vec::new());
    derived.supertype = Some(declared(0));

    match check(&program(vec![value, derived], Expr::unit())) {
        Err(TypecheckError::TypeMismatch { expected, found, .. }) => {
            assert_eq!(expected, "a class type");
            assert_eq!(found, "Value");
        }
        other => panic!("Expected TypeMismatch, got {:?}", other),
    }
}

#[test]
fn test_cyclic_supertypes() {
    let mut a = class("A", Vec::new(), Vec::new());
    a.supertype = Some(declared(1));
    let mut b = class("B", Vec::new(), Vec::new());
    b.supertype = Some(declared(0));

    let result = check(&program(vec![a, b], Expr::unit()));

    assert!(
        matches!(result, Err(TypecheckError::CyclicSupertype { .. })),
        "Expected CyclicSupertype, got {:?}",
        result
    );
}

#[test]
fn test_extension_generic_count_must_match_target() {
    let program = Program {
        types: Vec::new(),
        extensions: vec![ExtensionDecl {
            target: Builtin::Option.id(),
            generic_params: Vec::new(),
            methods: Vec::new(),
            span: Span::default(),
        }],
        entry: None,
    };

    match check(&program) {
        Err(TypecheckError::GenericArity { type_name, .. }) => assert_eq!(type_name, "Option"),
        other => panic!("Expected GenericArity error, got {:?}", other),
    }
}

#[test]
fn test_entry_references_are_verified() {
    let entry = Expr::new_object(ty(Builtin::Option), Vec::new());

    let result = check(&program(Vec::new(), entry));

    assert!(
        matches!(result, Err(TypecheckError::GenericArity { .. })),
        "Expected GenericArity, got {:?}",
        result
    );
}
