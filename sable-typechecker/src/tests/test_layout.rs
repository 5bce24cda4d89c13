//! Storage layout tests

use super::support::*;
use crate::ast::{DeclKind, Expr};
use crate::error::TypecheckError;
use crate::registry::TypeRegistry;
use crate::templates::builtin::Builtin;
use crate::types::{StorageCategory, TemplateId, TypeLayout};
use pretty_assertions::assert_eq;

fn paths(layout: &TypeLayout) -> Vec<String> {
    layout.leaves.iter().map(|leaf| leaf.path.join(".")).collect()
}

/// `struct Point { x: i32, y: i32 }  struct Line { a: Point, b: Point }  class Shape { origin: Point }`
fn shapes() -> TypeRegistry {
    let point = struct_decl("Point", vec![field("x", ty(Builtin::I32)), field("y", ty(Builtin::I32))]);
    let line = struct_decl("Line", vec![field("a", declared(0)), field("b", declared(0))]);
    let shape = class("Shape", vec![field("origin", declared(0))], Vec::new());

    check(&program(vec![point, line, shape], Expr::unit()))
        .unwrap()
        .registry
}

fn declared_layout(registry: &mut TypeRegistry, n: usize) -> TypeLayout {
    let handle = registry.instantiate(TemplateId::declared(n), Vec::new()).unwrap();
    registry.layout(handle).unwrap()
}

#[test]
fn test_scalar_builtins_take_one_slot() {
    let mut registry = TypeRegistry::new();
    for builtin in [Builtin::Bool, Builtin::I8, Builtin::U64, Builtin::F32] {
        let handle = registry.builtin(builtin).unwrap();
        let layout = registry.layout(handle).unwrap();
        assert_eq!(layout.category, StorageCategory::Plural);
        assert_eq!(layout.stack_width, 1, "{} should be one slot", builtin.name());
        assert_eq!(layout.leaves[0].ty, handle);
    }
}

#[test]
fn test_unit_and_literals_take_no_slots() {
    let mut registry = TypeRegistry::new();
    let unit = registry.unit().unwrap();
    let int_literal = registry.builtin(Builtin::IntLiteral).unwrap();

    assert_eq!(registry.layout(unit).unwrap().stack_width, 0);
    let literal = registry.layout(int_literal).unwrap();
    assert_eq!(literal.category, StorageCategory::Deferred);
    assert_eq!(literal.stack_width, 0);
}

#[test]
fn test_references_take_one_slot() {
    let mut registry = TypeRegistry::new();
    let str_ty = registry.str().unwrap();
    let i32_ty = registry.builtin(Builtin::I32).unwrap();
    let list = registry.list_of(i32_ty).unwrap();

    for handle in [str_ty, list] {
        let layout = registry.layout(handle).unwrap();
        assert_eq!(layout.category, StorageCategory::Reference);
        assert_eq!(layout.stack_width, 1);
        assert!(layout.leaves[0].path.is_empty());
    }
}

#[test]
fn test_struct_fields_are_flattened() {
    let mut registry = shapes();

    let point = declared_layout(&mut registry, 0);
    assert_eq!(point.stack_width, 2);
    assert_eq!(paths(&point), vec!["x", "y"]);

    let line = declared_layout(&mut registry, 1);
    assert_eq!(line.stack_width, 4);
    assert_eq!(paths(&line), vec!["a.x", "a.y", "b.x", "b.y"]);
}

#[test]
fn test_class_with_value_fields_is_one_slot() {
    let mut registry = shapes();
    let shape = declared_layout(&mut registry, 2);

    assert_eq!(shape.category, StorageCategory::Reference);
    assert_eq!(shape.stack_width, 1);
}

#[test]
fn test_option_and_tuple_layouts() {
    let mut registry = shapes();
    let i32_ty = registry.builtin(Builtin::I32).unwrap();
    let bool_ty = registry.bool().unwrap();
    let point = registry.instantiate(TemplateId::declared(0), Vec::new()).unwrap();

    let option = registry.option_of(i32_ty).unwrap();
    let option_layout = registry.layout(option).unwrap();
    assert_eq!(option_layout.stack_width, 2);
    assert_eq!(paths(&option_layout), vec!["present", "value"]);

    let tuple = registry
        .instantiate(Builtin::Tuple3.id(), vec![i32_ty, bool_ty, point])
        .unwrap();
    let tuple_layout = registry.layout(tuple).unwrap();
    assert_eq!(registry.name(tuple), "Tuple3<i32, bool, Point>");
    assert_eq!(tuple_layout.stack_width, 4);
    assert_eq!(paths(&tuple_layout), vec!["_0", "_1", "_2.x", "_2.y"]);
}

#[test]
fn test_enum_is_one_ordinal() {
    let color = type_decl(
        "Color",
        DeclKind::Enum {
            variants: vec!["Red".to_string(), "Green".to_string(), "Blue".to_string()],
        },
        Vec::new(),
        Vec::new(),
    );
    let mut registry = check(&program(vec![color], Expr::unit())).unwrap().registry;
    let layout = declared_layout(&mut registry, 0);

    assert_eq!(layout.stack_width, 1);
    assert_eq!(paths(&layout), vec!["ordinal"]);
}

#[test]
fn test_recursive_value_type_has_infinite_size() {
    // struct Loop { next: Option<Loop> }
    let looping = struct_decl(
        "Loop",
        vec![field("next", applied(Builtin::Option, vec![declared(0)]))],
    );

    match check(&program(vec![looping], Expr::unit())) {
        Err(TypecheckError::InfiniteSize { .. }) => {}
        other => panic!("Expected InfiniteSize error, got {:?}", other),
    }
}

#[test]
fn test_recursion_through_a_class_is_fine() {
    // class Node { next: Option<Node> }
    let node = class(
        "Node",
        vec![field("next", applied(Builtin::Option, vec![declared(0)]))],
        Vec::new(),
    );

    let mut registry = check(&program(vec![node], Expr::unit())).unwrap().registry;
    let node_ty = registry.instantiate(TemplateId::declared(0), Vec::new()).unwrap();
    let option = registry.option_of(node_ty).unwrap();

    assert_eq!(registry.layout(option).unwrap().stack_width, 2);
}

#[test]
fn test_non_generic_declared_types_are_instantiated_eagerly() {
    let registry = shapes();

    for n in 0..3 {
        assert_eq!(registry.instantiations_of(TemplateId::declared(n)).len(), 1);
    }
}
