//! Numeric conversion matrix and reference cast planning
//!
//! Integer values are modelled as a 64-bit register whose low `width` bits are
//! significant and whose upper bits hold the canonical extension for the kind:
//! sign extension for signed kinds, zeros for unsigned ones. Every conversion
//! below is defined on that representation so that the checker's constant
//! folding and the code generator agree bit for bit.
//!
//! Reference casts are planned here too. A checked runtime cast is only ever
//! planned for a supertype-to-subtype conversion; every other legal reference
//! cast is a no-op.

use crate::ast::Span;
use crate::error::{to_source_span, TypeResult, TypecheckError};
use crate::registry::TypeRegistry;
use crate::types::{FloatKind, Handle, IntKind, NumericKind};
use thiserror::Error;

/// How an integer register changes between two integer kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntConversion {
    /// Same width, different signedness
    Reinterpret,
    /// Widen from a signed source
    SignExtend,
    /// Widen from an unsigned source
    ZeroExtend,
    /// Narrow to the low bits; signed destinations re-extend the result
    Truncate { sign_extend: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericConversion {
    Int {
        from: IntKind,
        to: IntKind,
        op: IntConversion,
    },
    IntToFloat {
        from: IntKind,
        to: FloatKind,
        /// Unsigned 32/64-bit sources convert their signed reinterpretation
        /// and add 2^width when it was negative
        biased: bool,
    },
    FloatToInt {
        from: FloatKind,
        to: IntKind,
    },
    FloatToFloat {
        from: FloatKind,
        to: FloatKind,
    },
}

impl NumericConversion {
    pub fn source(&self) -> NumericKind {
        match *self {
            NumericConversion::Int { from, .. } | NumericConversion::IntToFloat { from, .. } => {
                NumericKind::Int(from)
            }
            NumericConversion::FloatToInt { from, .. } | NumericConversion::FloatToFloat { from, .. } => {
                NumericKind::Float(from)
            }
        }
    }

    pub fn target(&self) -> NumericKind {
        match *self {
            NumericConversion::Int { to, .. } | NumericConversion::FloatToInt { to, .. } => {
                NumericKind::Int(to)
            }
            NumericConversion::IntToFloat { to, .. } | NumericConversion::FloatToFloat { to, .. } => {
                NumericKind::Float(to)
            }
        }
    }
}

/// A numeric constant in its storage representation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericValue {
    Int { kind: IntKind, register: u64 },
    Float { kind: FloatKind, value: f64 },
}

impl NumericValue {
    /// An integer constant, if `value` is representable in `kind`
    pub fn int(kind: IntKind, value: i128) -> Option<Self> {
        if value < kind.min_value() || value > kind.max_value() {
            return None;
        }
        Some(NumericValue::Int {
            kind,
            register: canonical(kind, value as u64),
        })
    }

    /// A float constant; f32 values are rounded on the way in
    pub fn float(kind: FloatKind, value: f64) -> Self {
        let value = match kind {
            FloatKind::F32 => value as f32 as f64,
            FloatKind::F64 => value,
        };
        NumericValue::Float { kind, value }
    }

    pub fn kind(&self) -> NumericKind {
        match *self {
            NumericValue::Int { kind, .. } => NumericKind::Int(kind),
            NumericValue::Float { kind, .. } => NumericKind::Float(kind),
        }
    }

    /// Mathematical value of an integer constant
    pub fn as_i128(&self) -> Option<i128> {
        match *self {
            NumericValue::Int { kind, register } => Some(if kind.is_signed() {
                register as i64 as i128
            } else {
                (register & kind.mask()) as i128
            }),
            NumericValue::Float { .. } => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            NumericValue::Float { value, .. } => Some(value),
            NumericValue::Int { .. } => None,
        }
    }
}

/// Canonical 64-bit register holding the low bits of `bits` for `kind`
pub fn canonical(kind: IntKind, bits: u64) -> u64 {
    let low = bits & kind.mask();
    if kind.is_signed() {
        sign_extend(low, kind.width())
    } else {
        low
    }
}

fn sign_extend(bits: u64, width: u32) -> u64 {
    if width >= 64 {
        return bits;
    }
    let shift = 64 - width;
    (((bits << shift) as i64) >> shift) as u64
}

/// Pick the conversion between two numeric kinds
pub fn plan_numeric(from: NumericKind, to: NumericKind, span: Span) -> TypeResult<NumericConversion> {
    if from == to {
        return Err(TypecheckError::invalid_cast(
            from.name(),
            to.name(),
            "the value already has this type",
            span,
        ));
    }

    match (from, to) {
        (NumericKind::Int(from), NumericKind::Int(to)) => {
            let op = if from.width() == to.width() {
                IntConversion::Reinterpret
            } else if to.width() > from.width() {
                if from.is_signed() {
                    IntConversion::SignExtend
                } else {
                    IntConversion::ZeroExtend
                }
            } else {
                IntConversion::Truncate {
                    sign_extend: to.is_signed(),
                }
            };
            Ok(NumericConversion::Int { from, to, op })
        }
        (NumericKind::Int(from), NumericKind::Float(to)) => Ok(NumericConversion::IntToFloat {
            from,
            to,
            biased: matches!(from, IntKind::U32 | IntKind::U64),
        }),
        (NumericKind::Float(from), NumericKind::Int(IntKind::U64)) => {
            Err(TypecheckError::UnsupportedConversion {
                from: from.name().to_string(),
                to: IntKind::U64.name().to_string(),
                span: to_source_span(Some(span)),
            })
        }
        (NumericKind::Float(from), NumericKind::Int(to)) => {
            Ok(NumericConversion::FloatToInt { from, to })
        }
        (NumericKind::Float(from), NumericKind::Float(to)) => {
            Ok(NumericConversion::FloatToFloat { from, to })
        }
    }
}

/// Apply an integer conversion to a canonical register
pub fn convert_int(from: IntKind, to: IntKind, op: IntConversion, register: u64) -> u64 {
    match op {
        IntConversion::Reinterpret => canonical(to, register & from.mask()),
        IntConversion::SignExtend => canonical(to, sign_extend(register & from.mask(), from.width())),
        IntConversion::ZeroExtend => canonical(to, register & from.mask()),
        IntConversion::Truncate { sign_extend: extend } => {
            let low = register & to.mask();
            if extend {
                sign_extend(low, to.width())
            } else {
                low
            }
        }
    }
}

/// Convert an integer register to a float with a single rounding step
///
/// The bias correction for `u32`/`u64` is applied to the exact integer before
/// rounding, so narrowing to `f32` never goes through an intermediate `f64`.
pub fn int_to_float(from: IntKind, to: FloatKind, biased: bool, register: u64) -> f64 {
    let exact: i128 = if biased {
        let width = from.width();
        let signed = sign_extend(register & from.mask(), width) as i64 as i128;
        if signed < 0 {
            signed + (1i128 << width)
        } else {
            signed
        }
    } else if from.is_signed() {
        sign_extend(register & from.mask(), from.width()) as i64 as i128
    } else {
        (register & from.mask()) as i128
    };

    match to {
        FloatKind::F32 => exact as f32 as f64,
        FloatKind::F64 => exact as f64,
    }
}

/// Truncate toward zero with saturation; NaN becomes zero
pub fn float_to_int(from: FloatKind, to: IntKind, value: f64, span: Span) -> TypeResult<u64> {
    let truncated = value.trunc();
    let register = match to {
        IntKind::U64 => {
            return Err(TypecheckError::UnsupportedConversion {
                from: from.name().to_string(),
                to: to.name().to_string(),
                span: to_source_span(Some(span)),
            })
        }
        IntKind::I64 => truncated as i64 as u64,
        IntKind::I8 | IntKind::I16 | IntKind::I32 => {
            let saturated = truncated as i32 as i64 as u64;
            canonical(to, saturated)
        }
        IntKind::U8 | IntKind::U16 | IntKind::U32 => {
            let saturated = truncated as i64 as u64;
            saturated & to.mask()
        }
    };
    Ok(register)
}

pub fn float_to_float(to: FloatKind, value: f64) -> f64 {
    match to {
        FloatKind::F32 => value as f32 as f64,
        FloatKind::F64 => value,
    }
}

/// Run a planned conversion on a constant
pub fn apply(conversion: NumericConversion, value: NumericValue, span: Span) -> TypeResult<NumericValue> {
    match (conversion, value) {
        (NumericConversion::Int { from, to, op }, NumericValue::Int { kind, register }) if kind == from => {
            Ok(NumericValue::Int {
                kind: to,
                register: convert_int(from, to, op, register),
            })
        }
        (NumericConversion::IntToFloat { from, to, biased }, NumericValue::Int { kind, register })
            if kind == from =>
        {
            Ok(NumericValue::Float {
                kind: to,
                value: int_to_float(from, to, biased, register),
            })
        }
        (NumericConversion::FloatToInt { from, to }, NumericValue::Float { kind, value }) if kind == from => {
            Ok(NumericValue::Int {
                kind: to,
                register: float_to_int(from, to, value, span)?,
            })
        }
        (NumericConversion::FloatToFloat { from, to }, NumericValue::Float { kind, value }) if kind == from => {
            Ok(NumericValue::Float {
                kind: to,
                value: float_to_float(to, value),
            })
        }
        (conversion, value) => Err(TypecheckError::internal(format!(
            "conversion from {} applied to a {} value",
            conversion.source(),
            value.kind()
        ))),
    }
}

/// Convert a constant to another numeric kind
pub fn convert(value: NumericValue, to: NumericKind, span: Span) -> TypeResult<NumericValue> {
    let conversion = plan_numeric(value.kind(), to, span)?;
    apply(conversion, value, span)
}

/// What an `as` / `as?` between reference types does at runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastPlan {
    /// Subtype to supertype; no runtime work
    Upcast { from: Handle, to: Handle },
    /// `as` from supertype to subtype; fails at runtime on a mismatch
    CheckedDowncast { from: Handle, to: Handle },
    /// `as?` from supertype to subtype; empty on a mismatch
    OptionalDowncast { from: Handle, to: Handle, option: Handle },
    /// `as?` from subtype to supertype; always present
    OptionalUpcast { from: Handle, to: Handle, option: Handle },
}

impl CastPlan {
    /// Whether the emitted code must inspect the dynamic type
    pub fn is_checked(&self) -> bool {
        matches!(
            self,
            CastPlan::CheckedDowncast { .. } | CastPlan::OptionalDowncast { .. }
        )
    }

    /// Static type of the cast expression
    pub fn result_type(&self) -> Handle {
        match *self {
            CastPlan::Upcast { to, .. } | CastPlan::CheckedDowncast { to, .. } => to,
            CastPlan::OptionalDowncast { option, .. } | CastPlan::OptionalUpcast { option, .. } => {
                option
            }
        }
    }
}

pub fn plan_reference_cast(
    registry: &mut TypeRegistry,
    from: Handle,
    to: Handle,
    optional: bool,
    span: Span,
) -> TypeResult<CastPlan> {
    let from_name = registry.name(from);
    let to_name = registry.name(to);

    if from == to {
        return Err(TypecheckError::invalid_cast(
            from_name,
            to_name,
            "the value already has this type",
            span,
        ));
    }
    if !registry.is_reference(from) || !registry.is_reference(to) {
        return Err(TypecheckError::invalid_cast(
            from_name,
            to_name,
            "only reference types can be cast",
            span,
        ));
    }

    if registry.is_subtype(from, to) {
        if optional {
            let option = registry.option_of(to)?;
            Ok(CastPlan::OptionalUpcast { from, to, option })
        } else {
            Ok(CastPlan::Upcast { from, to })
        }
    } else if registry.is_subtype(to, from) {
        if optional {
            let option = registry.option_of(to)?;
            Ok(CastPlan::OptionalDowncast { from, to, option })
        } else {
            Ok(CastPlan::CheckedDowncast { from, to })
        }
    } else {
        Err(TypecheckError::invalid_cast(
            from_name,
            to_name,
            "the types are unrelated",
            span,
        ))
    }
}

/// A heap object as seen by the cast evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeObject {
    pub dynamic_type: Handle,
    pub id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastOutcome {
    Value(RuntimeObject),
    Present(RuntimeObject),
    Empty,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeCastError {
    #[error("Value of type {actual} is not a {target}")]
    Mismatch { actual: String, target: String },
}

/// Evaluate a planned reference cast against a runtime object
pub fn evaluate_reference_cast(
    registry: &TypeRegistry,
    plan: CastPlan,
    object: RuntimeObject,
) -> Result<CastOutcome, RuntimeCastError> {
    match plan {
        CastPlan::Upcast { .. } => Ok(CastOutcome::Value(object)),
        CastPlan::OptionalUpcast { .. } => Ok(CastOutcome::Present(object)),
        CastPlan::CheckedDowncast { to, .. } => {
            if registry.is_subtype(object.dynamic_type, to) {
                Ok(CastOutcome::Value(object))
            } else {
                Err(RuntimeCastError::Mismatch {
                    actual: registry.name(object.dynamic_type),
                    target: registry.name(to),
                })
            }
        }
        CastPlan::OptionalDowncast { to, .. } => {
            if registry.is_subtype(object.dynamic_type, to) {
                Ok(CastOutcome::Present(object))
            } else {
                Ok(CastOutcome::Empty)
            }
        }
    }
}
