//! Literal folding and pull-up tests

use super::support::*;
use crate::ast::{Expr, Stmt};
use crate::error::TypecheckError;
use crate::templates::builtin::Builtin;
use crate::typed_ast::{TypedExpr, TypedExprKind, TypedStmt};
use crate::types::LiteralKind;
use pretty_assertions::assert_eq;

fn add(lhs: Expr, rhs: Expr) -> Expr {
    Expr::call(lhs, "add", vec![rhs])
}

/// Value of the `index`th `let` in an entry block
fn let_value(entry: &TypedExpr, index: usize) -> &TypedExpr {
    match &entry.kind {
        TypedExprKind::Block { statements, .. } => match &statements[index] {
            TypedStmt::Let { value, .. } => value,
            other => panic!("Expected a let statement, got {:?}", other),
        },
        other => panic!("Expected a block, got {:?}", other),
    }
}

#[test]
fn test_literal_addition_folds_and_stays_deferred() {
    let (result, registry) = check_expr(&add(Expr::int(2), Expr::int(3)));
    let typed = result.unwrap();

    assert_eq!(int_value(&typed), Some(5));
    assert_eq!(registry.literal_kind(typed.ty), Some(LiteralKind::Int));
}

#[test]
fn test_folded_literal_assigned_to_u8() {
    let entry = Expr::block(
        vec![Stmt::let_("x", Some(ty(Builtin::U8)), add(Expr::int(2), Expr::int(3)))],
        Some(Expr::local("x")),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();
    let value = let_value(typed.entry.as_ref().unwrap(), 0);

    assert_eq!(entry_type(&typed), "u8");
    assert_eq!(typed.registry.name(value.ty), "u8");
    assert_eq!(int_value(value), Some(5));
}

#[test]
fn test_folded_literal_out_of_range() {
    let entry = Expr::block(
        vec![Stmt::let_(
            "x",
            Some(ty(Builtin::U8)),
            add(Expr::int(200), Expr::int(200)),
        )],
        None,
    );

    match check(&program(Vec::new(), entry)) {
        Err(TypecheckError::LiteralRange { value, target, .. }) => {
            assert_eq!(value, "400");
            assert_eq!(target, "u8");
        }
        other => panic!("Expected LiteralRange error, got {:?}", other),
    }
}

#[test]
fn test_intermediate_values_use_arbitrary_precision() {
    // 1000 - 999 fits u8 even though 1000 does not
    let entry = Expr::block(
        vec![Stmt::let_(
            "x",
            Some(ty(Builtin::U8)),
            Expr::call(Expr::int(1000), "sub", vec![Expr::int(999)]),
        )],
        Some(Expr::local("x")),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();

    assert_eq!(int_value(let_value(typed.entry.as_ref().unwrap(), 0)), Some(1));
}

#[test]
fn test_unannotated_literal_binding_is_unresolved() {
    let entry = Expr::block(
        vec![Stmt::let_("x", None, add(Expr::int(2), Expr::int(3)))],
        None,
    );

    let result = check(&program(Vec::new(), entry));

    assert!(
        matches!(result, Err(TypecheckError::UnresolvedLiteral { .. })),
        "Expected UnresolvedLiteral, got {:?}",
        result
    );
}

#[test]
fn test_top_level_literal_is_unresolved() {
    let result = check(&program(Vec::new(), add(Expr::int(2), Expr::int(3))));

    match result {
        Err(TypecheckError::UnresolvedLiteral { literal_type, .. }) => {
            assert_eq!(literal_type, "{integer}");
        }
        other => panic!("Expected UnresolvedLiteral, got {:?}", other),
    }
}

#[test]
fn test_literal_argument_takes_receiver_type() {
    let entry = Expr::block(
        vec![Stmt::let_("x", Some(ty(Builtin::U8)), Expr::int(7))],
        Some(add(Expr::local("x"), Expr::int(2))),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();

    assert_eq!(entry_type(&typed), "u8");
}

#[test]
fn test_literal_receiver_pulled_up_to_argument_type() {
    let entry = Expr::block(
        vec![Stmt::let_("x", Some(ty(Builtin::I16)), Expr::int(7))],
        Some(add(Expr::int(2), Expr::local("x"))),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();
    let result = match &typed.entry.as_ref().unwrap().kind {
        TypedExprKind::Block { result, .. } => result.as_deref().unwrap(),
        other => panic!("Expected a block, got {:?}", other),
    };

    assert_eq!(entry_type(&typed), "i16");
    match &result.kind {
        TypedExprKind::Call { receiver, .. } => {
            let receiver = receiver.as_deref().unwrap();
            assert_eq!(typed.registry.name(receiver.ty), "i16");
            assert_eq!(int_value(receiver), Some(2));
        }
        other => panic!("Expected a call, got {:?}", other),
    }
}

#[test]
fn test_integer_literal_receiver_with_float_argument() {
    let entry = Expr::block(
        vec![Stmt::let_("y", Some(ty(Builtin::F64)), Expr::float(1.5))],
        Some(Expr::call(Expr::int(2), "mul", vec![Expr::local("y")])),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();

    assert_eq!(entry_type(&typed), "f64");
}

#[test]
fn test_float_literal_folding_with_integer_operand() {
    let entry = Expr::block(
        vec![Stmt::let_(
            "y",
            Some(ty(Builtin::F32)),
            Expr::call(Expr::float(1.5), "mul", vec![Expr::int(2)]),
        )],
        Some(Expr::local("y")),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();
    let value = let_value(typed.entry.as_ref().unwrap(), 0);

    assert_eq!(typed.registry.name(value.ty), "f32");
    assert_eq!(value.kind, TypedExprKind::FloatLiteral(3.0));
}

#[test]
fn test_negated_literal_fits_signed_minimum() {
    let entry = Expr::block(
        vec![Stmt::let_(
            "x",
            Some(ty(Builtin::I8)),
            Expr::call(Expr::int(128), "neg", Vec::new()),
        )],
        Some(Expr::local("x")),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();

    assert_eq!(int_value(let_value(typed.entry.as_ref().unwrap(), 0)), Some(-128));
}

#[test]
fn test_literal_comparison_folds_to_bool() {
    let (result, registry) = check_expr(&Expr::call(Expr::int(3), "gt", vec![Expr::int(2)]));
    let typed = result.unwrap();

    assert_eq!(typed.kind, TypedExprKind::Bool(true));
    assert_eq!(registry.name(typed.ty), "bool");
}

#[test]
fn test_constant_division_by_zero() {
    let (result, _) = check_expr(&Expr::call(Expr::int(1), "div", vec![Expr::int(0)]));

    assert!(
        matches!(result, Err(TypecheckError::DivisionByZero { .. })),
        "Expected DivisionByZero, got {:?}",
        result
    );
}

#[test]
fn test_oversized_constant_shift() {
    let (result, _) = check_expr(&Expr::call(Expr::int(1), "shl", vec![Expr::int(5000)]));

    assert!(
        matches!(result, Err(TypecheckError::LiteralRange { .. })),
        "Expected LiteralRange, got {:?}",
        result
    );
}

#[test]
fn test_large_shift_folds_exactly() {
    let (result, _) = check_expr(&Expr::call(Expr::int(1), "shl", vec![Expr::int(100)]));
    let typed = result.unwrap();

    match typed.kind {
        TypedExprKind::IntLiteral(value) => {
            assert_eq!(value, num_bigint::BigInt::from(1u8) << 100usize);
        }
        other => panic!("Expected an integer literal, got {:?}", other),
    }
}

#[test]
fn test_if_branches_of_literals_pulled_together() {
    let entry = Expr::block(
        vec![Stmt::let_(
            "x",
            Some(ty(Builtin::I64)),
            Expr::if_else(Expr::bool(true), Expr::int(1), Some(Expr::int(2))),
        )],
        Some(Expr::local("x")),
    );

    let typed = check(&program(Vec::new(), entry)).unwrap();
    let value = let_value(typed.entry.as_ref().unwrap(), 0);

    match &value.kind {
        TypedExprKind::If {
            then_branch,
            else_branch,
            ..
        } => {
            assert_eq!(typed.registry.name(then_branch.ty), "i64");
            assert_eq!(typed.registry.name(else_branch.as_ref().unwrap().ty), "i64");
        }
        other => panic!("Expected an if expression, got {:?}", other),
    }
}
