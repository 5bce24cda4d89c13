//! Error types for the Sable typechecker
//!
//! Every error is a compile-time diagnostic carrying a source location and
//! aborts compilation immediately. Follows the miette patterns used across the
//! compiler for consistent reporting.

use crate::ast::Span;
use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

pub type TypeResult<T> = Result<T, TypecheckError>;

#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum TypecheckError {
    #[error("Generic arity mismatch: {type_name} expects {expected} type arguments, found {found}")]
    #[diagnostic(
        code(sable::typecheck::generic_arity),
        help("Ensure all generic type arguments are provided correctly")
    )]
    GenericArity {
        type_name: String,
        expected: usize,
        found: usize,
        #[label("expected {expected} arguments, found {found}")]
        span: Option<SourceSpan>,
    },

    #[error("Undeclared {kind}: {name}")]
    #[diagnostic(
        code(sable::typecheck::undeclared_name),
        help("Declare the {kind} before using it")
    )]
    UndeclaredName {
        kind: String,
        name: String,
        #[label("undeclared {kind}")]
        span: Option<SourceSpan>,
    },

    #[error("Ambiguous call to {receiver}.{method}: candidates {}", .candidates.join(", "))]
    #[diagnostic(
        code(sable::typecheck::ambiguous_overload),
        help("Annotate the expected type or the argument types to pick one overload")
    )]
    AmbiguousOverload {
        receiver: String,
        method: String,
        candidates: Vec<String>,
        #[label("more than one overload applies")]
        span: Option<SourceSpan>,
    },

    #[error("No suitable method {receiver}.{method} for argument types ({})", .arguments.join(", "))]
    #[diagnostic(
        code(sable::typecheck::no_suitable_overload),
        help("Check the number and types of the arguments")
    )]
    NoSuitableOverload {
        receiver: String,
        method: String,
        arguments: Vec<String>,
        #[label("no overload accepts these arguments")]
        span: Option<SourceSpan>,
    },

    #[error("Return type mismatch calling {method}: expected {expected}, candidates return {}", .found.join(", "))]
    #[diagnostic(
        code(sable::typecheck::return_type_mismatch),
        help("None of the applicable overloads returns a subtype of {expected}")
    )]
    ReturnTypeMismatch {
        method: String,
        expected: String,
        found: Vec<String>,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
    },

    #[error("Type mismatch: expected {expected}, found {found}")]
    #[diagnostic(
        code(sable::typecheck::type_mismatch),
        help("The type {found} is not a subtype of {expected}")
    )]
    TypeMismatch {
        expected: String,
        found: String,
        #[label("expected {expected}")]
        span: Option<SourceSpan>,
    },

    #[error("Literal {value} does not fit in {target}")]
    #[diagnostic(
        code(sable::typecheck::literal_range),
        help("Use a wider type or an explicit conversion")
    )]
    LiteralRange {
        value: String,
        target: String,
        #[label("out of range for {target}")]
        span: Option<SourceSpan>,
    },

    #[error("Unsupported conversion from {from} to {to}")]
    #[diagnostic(code(sable::typecheck::unsupported_conversion))]
    UnsupportedConversion {
        from: String,
        to: String,
        #[label("no conversion from {from} to {to}")]
        span: Option<SourceSpan>,
    },

    #[error("Cannot infer generic arguments of {method}: {reason}")]
    #[diagnostic(
        code(sable::typecheck::inference_failure),
        help("Add explicit generic arguments or annotate the expected type")
    )]
    InferenceFailure {
        method: String,
        reason: String,
        #[label("generic arguments cannot be inferred")]
        span: Option<SourceSpan>,
    },

    #[error("Invalid cast from {from} to {to}: {reason}")]
    #[diagnostic(code(sable::typecheck::invalid_cast))]
    InvalidCast {
        from: String,
        to: String,
        reason: String,
        #[label("invalid cast")]
        span: Option<SourceSpan>,
    },

    #[error("Division by zero in constant expression")]
    #[diagnostic(code(sable::typecheck::division_by_zero))]
    DivisionByZero {
        #[label("divisor is zero")]
        span: Option<SourceSpan>,
    },

    #[error("Literal of type {literal_type} is never given a concrete numeric type")]
    #[diagnostic(
        code(sable::typecheck::unresolved_literal),
        help("Annotate the binding or convert the literal with `as`")
    )]
    UnresolvedLiteral {
        literal_type: String,
        #[label("type of this literal is never decided")]
        span: Option<SourceSpan>,
    },

    #[error("Cyclic supertype chain through {type_name}")]
    #[diagnostic(code(sable::typecheck::cyclic_supertype))]
    CyclicSupertype {
        type_name: String,
        #[label("{type_name} is its own supertype")]
        span: Option<SourceSpan>,
    },

    #[error("Value type {type_name} contains itself")]
    #[diagnostic(
        code(sable::typecheck::infinite_size),
        help("Store the recursive field behind a class type")
    )]
    InfiniteSize {
        type_name: String,
        #[label("recursive value type")]
        span: Option<SourceSpan>,
    },

    #[error("Internal typechecker error: {message}")]
    #[diagnostic(code(sable::typecheck::internal))]
    Internal {
        message: String,
        #[label("while checking this")]
        span: Option<SourceSpan>,
    },
}

impl TypecheckError {
    pub fn type_mismatch(expected: impl Into<String>, found: impl Into<String>, span: Span) -> Self {
        Self::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
            span: to_source_span(Some(span)),
        }
    }

    pub fn undeclared(kind: &str, name: impl Into<String>, span: Span) -> Self {
        Self::UndeclaredName {
            kind: kind.to_string(),
            name: name.into(),
            span: to_source_span(Some(span)),
        }
    }

    pub fn inference_failure(method: impl Into<String>, reason: impl Into<String>, span: Span) -> Self {
        Self::InferenceFailure {
            method: method.into(),
            reason: reason.into(),
            span: to_source_span(Some(span)),
        }
    }

    pub fn invalid_cast(
        from: impl Into<String>,
        to: impl Into<String>,
        reason: impl Into<String>,
        span: Span,
    ) -> Self {
        Self::InvalidCast {
            from: from.into(),
            to: to.into(),
            reason: reason.into(),
            span: to_source_span(Some(span)),
        }
    }

    pub fn literal_range(value: impl ToString, target: impl Into<String>, span: Span) -> Self {
        Self::LiteralRange {
            value: value.to_string(),
            target: target.into(),
            span: to_source_span(Some(span)),
        }
    }

    /// An invariant the frontend or the checker itself should have upheld
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            span: None,
        }
    }

    /// Whether a speculative check failing with this error only rules out the
    /// candidate being tried rather than the whole compilation
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousOverload { .. }
                | Self::NoSuitableOverload { .. }
                | Self::ReturnTypeMismatch { .. }
                | Self::TypeMismatch { .. }
                | Self::LiteralRange { .. }
                | Self::InferenceFailure { .. }
                | Self::InvalidCast { .. }
                | Self::UnsupportedConversion { .. }
                | Self::DivisionByZero { .. }
        )
    }
}

/// Helper for creating source spans from optional spans
pub fn to_source_span(span: Option<Span>) -> Option<SourceSpan> {
    span.map(|s| SourceSpan::new(s.start.into(), s.end.saturating_sub(s.start)))
}
