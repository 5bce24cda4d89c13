//! Type registry and instantiation tests

use super::support::*;
use crate::ast::{DeclKind, Expr, ExtensionDecl, MethodDecl, Program, Span, TypeRef};
use crate::error::TypecheckError;
use crate::registry::TypeRegistry;
use crate::templates::builtin::Builtin;
use crate::templates::declared::DeclaredTemplate;
use crate::templates::TypeTemplate;
use crate::types::{IntKind, NumericKind, StorageCategory, TemplateId};
use pretty_assertions::assert_eq;
use std::rc::Rc;

fn register(registry: &mut TypeRegistry, decl: &crate::ast::TypeDecl) -> TemplateId {
    registry.register_template(TypeTemplate {
        name: decl.name.clone(),
        arity: decl.generic_params.len(),
        category: DeclaredTemplate::category(decl),
        builder: Rc::new(DeclaredTemplate::new(decl)),
        span: decl.span,
    })
}

#[test]
fn test_instantiation_is_memoized() {
    let mut registry = TypeRegistry::new();
    let i32_ty = registry.builtin(Builtin::I32).unwrap();
    let i64_ty = registry.builtin(Builtin::I64).unwrap();

    let first = registry.list_of(i32_ty).unwrap();
    let second = registry.list_of(i32_ty).unwrap();
    let other = registry.list_of(i64_ty).unwrap();

    assert_eq!(first, second);
    assert_ne!(first, other);
    assert_eq!(registry.name(first), "List<i32>");
    assert_eq!(registry.name(other), "List<i64>");
    assert_eq!(registry.instantiations_of(Builtin::List.id()), vec![first, other]);
}

#[test]
fn test_builtin_numeric_tags() {
    let mut registry = TypeRegistry::new();
    let u16_ty = registry.builtin(Builtin::U16).unwrap();
    let int_literal = registry.builtin(Builtin::IntLiteral).unwrap();

    assert_eq!(registry.numeric_kind(u16_ty), Some(NumericKind::Int(IntKind::U16)));
    assert!(!registry.is_deferred(u16_ty));
    assert!(registry.is_deferred(int_literal));
    assert_eq!(registry.get(int_literal).unwrap().category(), StorageCategory::Deferred);
}

#[test]
fn test_self_referential_generic_class() {
    // class Node<T> { value: T, next: Option<Node<T>> }
    let mut node = class(
        "Node",
        vec![
            field("value", TypeRef::type_param(0)),
            field(
                "next",
                applied(Builtin::Option, vec![declared_with(0, vec![TypeRef::type_param(0)])]),
            ),
        ],
        Vec::new(),
    );
    node.generic_params = vec!["T".to_string()];

    let mut registry = TypeRegistry::new();
    let template = register(&mut registry, &node);
    let i32_ty = registry.builtin(Builtin::I32).unwrap();

    let handle = registry.instantiate(template, vec![i32_ty]).unwrap();
    let concrete = registry.get(handle).unwrap().clone();
    let next = concrete.fields[concrete.field_index("next").unwrap()].ty;
    let option = registry.get(next).unwrap();

    assert_eq!(option.generics, vec![handle]);
    assert_eq!(registry.name(handle), "Node<i32>");
    assert_eq!(registry.name(next), "Option<Node<i32>>");
    assert_eq!(registry.instantiate(template, vec![i32_ty]).unwrap(), handle);
    assert!(!registry.is_pending(handle));
}

#[test]
fn test_generic_arity_mismatch_on_instantiate() {
    let mut registry = TypeRegistry::new();
    let i32_ty = registry.builtin(Builtin::I32).unwrap();

    let result = registry.instantiate(Builtin::List.id(), vec![i32_ty, i32_ty]);
    match result {
        Err(TypecheckError::GenericArity {
            type_name,
            expected,
            found,
            ..
        }) => {
            assert_eq!(type_name, "List");
            assert_eq!(expected, 1);
            assert_eq!(found, 2);
        }
        other => panic!("Expected GenericArity error, got {:?}", other),
    }
}

#[test]
fn test_supertype_chain_and_subtyping() {
    // class Animal {}  class Dog : Animal {}
    let animal = class("Animal", Vec::new(), Vec::new());
    let mut dog = class("Dog", Vec::new(), Vec::new());
    dog.supertype = Some(declared(0));

    let mut registry = TypeRegistry::new();
    let animal_template = register(&mut registry, &animal);
    let dog_template = register(&mut registry, &dog);
    let animal_ty = registry.instantiate(animal_template, Vec::new()).unwrap();
    let dog_ty = registry.instantiate(dog_template, Vec::new()).unwrap();
    let object = registry.builtin(Builtin::Object).unwrap();

    assert_eq!(registry.supertype_chain(dog_ty), vec![animal_ty, object]);
    assert!(registry.is_subtype(dog_ty, object));
    assert!(registry.is_subtype(dog_ty, animal_ty));
    assert!(!registry.is_subtype(animal_ty, dog_ty));
}

#[test]
fn test_literal_pseudo_supertypes() {
    let mut registry = TypeRegistry::new();
    let int_literal = registry.builtin(Builtin::IntLiteral).unwrap();
    let float_literal = registry.builtin(Builtin::FloatLiteral).unwrap();
    let u8_ty = registry.builtin(Builtin::U8).unwrap();
    let f32_ty = registry.builtin(Builtin::F32).unwrap();

    assert!(registry.is_subtype(int_literal, u8_ty));
    assert!(!registry.is_subtype(int_literal, f32_ty));
    assert!(registry.is_subtype(float_literal, f32_ty));
    assert!(!registry.is_subtype(float_literal, u8_ty));
    assert!(registry.is_assignable(int_literal, float_literal));
    assert!(!registry.is_assignable(float_literal, int_literal));
}

#[test]
fn test_function_interface_signature() {
    let mut registry = TypeRegistry::new();
    let i32_ty = registry.builtin(Builtin::I32).unwrap();
    let str_ty = registry.str().unwrap();

    let interface = registry.function_interface(&[i32_ty], str_ty, Span::default()).unwrap();

    assert_eq!(registry.name(interface), "Fn1<str, i32>");
    assert_eq!(registry.function_signature(interface), Some((vec![i32_ty], str_ty)));
    assert_eq!(registry.function_signature(i32_ty), None);
}

#[test]
fn test_extension_reaches_existing_and_future_instantiations() {
    // extend List<T> { first() -> T { this.get(0) } }
    let first: MethodDecl = method(
        "first",
        Vec::new(),
        Some(TypeRef::type_param(0)),
        Expr::call(Expr::this(), "get", vec![Expr::int(0)]),
    );
    let extension = ExtensionDecl {
        target: Builtin::List.id(),
        generic_params: vec!["T".to_string()],
        methods: vec![first],
        span: Span::default(),
    };

    let mut registry = TypeRegistry::new();
    let i32_ty = registry.builtin(Builtin::I32).unwrap();
    let str_ty = registry.str().unwrap();
    let before = registry.list_of(i32_ty).unwrap();
    registry.register_extension(0, &extension).unwrap();
    let after = registry.list_of(str_ty).unwrap();

    for handle in [before, after] {
        let methods = &registry.get(handle).unwrap().methods;
        assert!(
            methods.iter().any(|method| method.name == "first"),
            "{} should carry the extension method",
            registry.name(handle)
        );
    }
}

#[test]
fn test_extension_method_body_is_checked_per_instantiation() {
    // extend List<T> { first() -> T { this.get(0) } }
    let program = Program {
        types: Vec::new(),
        extensions: vec![ExtensionDecl {
            target: Builtin::List.id(),
            generic_params: vec!["T".to_string()],
            methods: vec![method(
                "first",
                Vec::new(),
                Some(TypeRef::type_param(0)),
                Expr::call(Expr::this(), "get", vec![Expr::int(0)]),
            )],
            span: Span::default(),
        }],
        entry: Some(Expr::call(
            Expr::new_object(applied(Builtin::List, vec![ty(Builtin::Str)]), Vec::new()),
            "first",
            Vec::new(),
        )),
    };

    let typed = check(&program).unwrap();

    assert_eq!(entry_type(&typed), "str");
    assert_eq!(typed.bodies_named("List<str>", "first").count(), 1);
}

#[test]
fn test_reading_unknown_handle_is_internal() {
    let registry = TypeRegistry::new();
    let result = registry.get(crate::types::Handle(9_999));

    assert!(matches!(result, Err(TypecheckError::Internal { .. })));
}

#[test]
fn test_enum_variants_are_static_fields() {
    let color = type_decl(
        "Color",
        DeclKind::Enum {
            variants: vec!["Red".to_string(), "Green".to_string()],
        },
        Vec::new(),
        Vec::new(),
    );
    let entry = Expr::static_field(declared(0), "Green");

    let typed = check(&program(vec![color], entry)).unwrap();

    assert_eq!(entry_type(&typed), "Color");
}
