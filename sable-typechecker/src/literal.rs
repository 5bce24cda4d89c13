//! Literal coercion and constant folding
//!
//! Numeric literals start out with a deferred type (`{integer}` or `{float}`).
//! Operators on two deferred operands are folded here, integers in arbitrary
//! precision and floats in `f64`. A deferred constant takes a concrete type
//! when it is pulled up to one, which is where range checking happens.

use crate::ast::Span;
use crate::conversion::{self, NumericValue};
use crate::error::{to_source_span, TypeResult, TypecheckError};
use crate::registry::TypeRegistry;
use crate::typed_ast::{TypedExpr, TypedExprKind};
use crate::types::{
    BinaryOp, CompareOp, FloatKind, Handle, IntKind, Intrinsic, LiteralKind, NumericKind, UnaryOp,
};
use num_bigint::BigInt;
use num_traits::{FromPrimitive, ToPrimitive, Zero};
use tracing::trace;

/// Whether `value` is representable in `kind`
pub fn int_fits(value: &BigInt, kind: IntKind) -> bool {
    *value >= BigInt::from(kind.min_value()) && *value <= BigInt::from(kind.max_value())
}

/// Give a deferred constant (or a tree of them) the concrete type `target`
pub fn pull_up(registry: &TypeRegistry, typed: TypedExpr, target: Handle) -> TypeResult<TypedExpr> {
    if typed.ty == target {
        return Ok(typed);
    }
    let span = typed.span;
    let source = typed.ty;
    let mismatch = || TypecheckError::type_mismatch(registry.name(target), registry.name(source), span);

    match typed.kind {
        TypedExprKind::IntLiteral(value) => match (registry.numeric_kind(target), registry.literal_kind(target)) {
            (Some(NumericKind::Int(kind)), _) => {
                if int_fits(&value, kind) {
                    trace!(%value, target = kind.name(), "pulling up integer literal");
                    Ok(TypedExpr::new(TypedExprKind::IntLiteral(value), target, span))
                } else {
                    Err(TypecheckError::literal_range(value, kind.name(), span))
                }
            }
            (_, Some(LiteralKind::Float)) => {
                let exact = value
                    .to_f64()
                    .filter(|float| BigInt::from_f64(*float).as_ref() == Some(&value));
                match exact {
                    Some(float) => Ok(TypedExpr::new(TypedExprKind::FloatLiteral(float), target, span)),
                    None => Err(TypecheckError::literal_range(value, LiteralKind::Float.name(), span)),
                }
            }
            _ => Err(mismatch()),
        },
        TypedExprKind::FloatLiteral(value) => match registry.numeric_kind(target) {
            Some(NumericKind::Float(FloatKind::F64)) => {
                Ok(TypedExpr::new(TypedExprKind::FloatLiteral(value), target, span))
            }
            Some(NumericKind::Float(FloatKind::F32)) => {
                if value.is_finite() && value.abs() > f32::MAX as f64 {
                    return Err(TypecheckError::literal_range(value, FloatKind::F32.name(), span));
                }
                Ok(TypedExpr::new(
                    TypedExprKind::FloatLiteral(value as f32 as f64),
                    target,
                    span,
                ))
            }
            _ => Err(mismatch()),
        },
        TypedExprKind::If {
            condition,
            then_branch,
            else_branch,
        } if registry.is_deferred(source) => {
            let then_branch = pull_up(registry, *then_branch, target)?;
            let else_branch = else_branch
                .map(|branch| pull_up(registry, *branch, target).map(Box::new))
                .transpose()?;
            Ok(TypedExpr::new(
                TypedExprKind::If {
                    condition,
                    then_branch: Box::new(then_branch),
                    else_branch,
                },
                target,
                span,
            ))
        }
        TypedExprKind::Block {
            statements,
            result: Some(result),
        } if registry.is_deferred(source) => {
            let result = pull_up(registry, *result, target)?;
            Ok(TypedExpr::new(
                TypedExprKind::Block {
                    statements,
                    result: Some(Box::new(result)),
                },
                target,
                span,
            ))
        }
        _ if registry.is_deferred(source) => Err(TypecheckError::UnresolvedLiteral {
            literal_type: registry.name(source),
            span: to_source_span(Some(span)),
        }),
        _ => Err(mismatch()),
    }
}

/// Fold a const operator applied to deferred constants
///
/// Returns `None` when an operand is deferred but not itself a constant
/// node, in which case the call is kept as is.
pub fn fold(
    registry: &mut TypeRegistry,
    op: Intrinsic,
    receiver: &TypedExpr,
    args: &[TypedExpr],
    max_shift: usize,
    span: Span,
) -> TypeResult<Option<TypedExpr>> {
    let folded = match (&receiver.kind, args) {
        (TypedExprKind::IntLiteral(lhs), []) => fold_int_unary(op, lhs),
        (TypedExprKind::IntLiteral(lhs), [rhs]) => match &rhs.kind {
            TypedExprKind::IntLiteral(rhs_value) => fold_int_binary(op, lhs, rhs_value, rhs.span, max_shift, span)?,
            _ => None,
        },
        (TypedExprKind::FloatLiteral(lhs), []) => fold_float_unary(op, *lhs),
        (TypedExprKind::FloatLiteral(lhs), [rhs]) => match &rhs.kind {
            TypedExprKind::FloatLiteral(rhs_value) => fold_float_binary(op, *lhs, *rhs_value),
            _ => None,
        },
        _ => None,
    };

    let Some(constant) = folded else {
        return Ok(None);
    };

    let node = match constant {
        Constant::Int(value) => {
            let ty = registry.literal(LiteralKind::Int)?;
            TypedExpr::new(TypedExprKind::IntLiteral(value), ty, span)
        }
        Constant::Float(value) => {
            let ty = registry.literal(LiteralKind::Float)?;
            TypedExpr::new(TypedExprKind::FloatLiteral(value), ty, span)
        }
        Constant::Bool(value) => {
            let ty = registry.bool()?;
            TypedExpr::new(TypedExprKind::Bool(value), ty, span)
        }
    };
    trace!(?op, result = ?node.kind, "folded constant operator");
    Ok(Some(node))
}

enum Constant {
    Int(BigInt),
    Float(f64),
    Bool(bool),
}

fn fold_int_unary(op: Intrinsic, value: &BigInt) -> Option<Constant> {
    match op {
        Intrinsic::Unary(UnaryOp::Neg) => Some(Constant::Int(-value)),
        Intrinsic::Unary(UnaryOp::BitNot) => Some(Constant::Int(!value)),
        _ => None,
    }
}

fn fold_int_binary(
    op: Intrinsic,
    lhs: &BigInt,
    rhs: &BigInt,
    rhs_span: Span,
    max_shift: usize,
    span: Span,
) -> TypeResult<Option<Constant>> {
    let result = match op {
        Intrinsic::Binary(binary) => Constant::Int(match binary {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div | BinaryOp::Rem if rhs.is_zero() => {
                return Err(TypecheckError::DivisionByZero {
                    span: to_source_span(Some(span)),
                })
            }
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Rem => lhs % rhs,
            BinaryOp::BitAnd => lhs & rhs,
            BinaryOp::BitOr => lhs | rhs,
            BinaryOp::BitXor => lhs ^ rhs,
            BinaryOp::Shl | BinaryOp::Shr => {
                let amount = rhs
                    .to_usize()
                    .filter(|amount| *amount <= max_shift)
                    .ok_or_else(|| {
                        TypecheckError::literal_range(rhs, format!("shift amount (0..={max_shift})"), rhs_span)
                    })?;
                if binary == BinaryOp::Shl {
                    lhs << amount
                } else {
                    lhs >> amount
                }
            }
        }),
        Intrinsic::Compare(compare) => Constant::Bool(compare.holds(lhs.cmp(rhs))),
        _ => return Ok(None),
    };
    Ok(Some(result))
}

fn fold_float_unary(op: Intrinsic, value: f64) -> Option<Constant> {
    match op {
        Intrinsic::Unary(UnaryOp::Neg) => Some(Constant::Float(-value)),
        _ => None,
    }
}

fn fold_float_binary(op: Intrinsic, lhs: f64, rhs: f64) -> Option<Constant> {
    match op {
        Intrinsic::Binary(BinaryOp::Add) => Some(Constant::Float(lhs + rhs)),
        Intrinsic::Binary(BinaryOp::Sub) => Some(Constant::Float(lhs - rhs)),
        Intrinsic::Binary(BinaryOp::Mul) => Some(Constant::Float(lhs * rhs)),
        Intrinsic::Binary(BinaryOp::Div) => Some(Constant::Float(lhs / rhs)),
        Intrinsic::Binary(BinaryOp::Rem) => Some(Constant::Float(lhs % rhs)),
        Intrinsic::Compare(compare) => Some(Constant::Bool(match lhs.partial_cmp(&rhs) {
            Some(ordering) => compare.holds(ordering),
            // NaN compares unequal to everything
            None => compare == CompareOp::Ne,
        })),
        _ => None,
    }
}

/// Numeric kind an integer constant is converted from when it does not fit the cast target
fn natural_int_kind(value: &BigInt, span: Span) -> TypeResult<IntKind> {
    if int_fits(value, IntKind::I64) {
        Ok(IntKind::I64)
    } else if int_fits(value, IntKind::U64) {
        Ok(IntKind::U64)
    } else {
        Err(TypecheckError::literal_range(value, IntKind::I64.name(), span))
    }
}

/// The storage value of a constant node
fn constant_value(registry: &TypeRegistry, typed: &TypedExpr) -> TypeResult<Option<NumericValue>> {
    let value = match (&typed.kind, registry.numeric_kind(typed.ty)) {
        (TypedExprKind::IntLiteral(value), Some(NumericKind::Int(kind))) => {
            value.to_i128().and_then(|value| NumericValue::int(kind, value))
        }
        (TypedExprKind::IntLiteral(value), None) => {
            let kind = natural_int_kind(value, typed.span)?;
            value.to_i128().and_then(|value| NumericValue::int(kind, value))
        }
        (TypedExprKind::FloatLiteral(value), Some(NumericKind::Float(kind))) => {
            Some(NumericValue::float(kind, *value))
        }
        (TypedExprKind::FloatLiteral(value), None) => Some(NumericValue::float(FloatKind::F64, *value)),
        _ => None,
    };
    Ok(value)
}

/// Evaluate an explicit `as` on a constant at compile time
///
/// A deferred integer that fits the target simply takes its type; anything
/// else runs through the conversion matrix from the constant's storage kind.
/// Returns `None` when `typed` is not a constant.
pub fn cast_constant(
    registry: &TypeRegistry,
    typed: &TypedExpr,
    target: Handle,
    span: Span,
) -> TypeResult<Option<TypedExpr>> {
    let Some(target_kind) = registry.numeric_kind(target) else {
        return Ok(None);
    };

    if let (TypedExprKind::IntLiteral(value), NumericKind::Int(kind), true) =
        (&typed.kind, target_kind, registry.is_deferred(typed.ty))
    {
        if int_fits(value, kind) {
            return Ok(Some(TypedExpr::new(
                TypedExprKind::IntLiteral(value.clone()),
                target,
                span,
            )));
        }
    }

    let Some(value) = constant_value(registry, typed)? else {
        return Ok(None);
    };
    let converted = if value.kind() == target_kind && registry.is_deferred(typed.ty) {
        value
    } else {
        conversion::convert(value, target_kind, span)?
    };

    let kind = match converted {
        NumericValue::Int { .. } => converted
            .as_i128()
            .map(|value| TypedExprKind::IntLiteral(BigInt::from(value))),
        NumericValue::Float { value, .. } => Some(TypedExprKind::FloatLiteral(value)),
    };
    Ok(kind.map(|kind| TypedExpr::new(kind, target, span)))
}
