//! Sable Typechecker
//!
//! Generic instantiation, overload resolution, generic argument inference and
//! numeric literal folding for the Sable compiler.
//!
//! ## Architecture
//!
//! The checker turns a name-resolved [`ast::Program`] into a [`TypedProgram`]:
//!
//! - **Type Registry**: arena of concrete types behind stable handles, with
//!   memoized instantiation of templates and pending slots for self-reference
//! - **Dispatch**: speculative multi-candidate overload resolution, the single
//!   entry point for calls, operators and indexing
//! - **Inference**: fixed-point binding of method generics from arguments,
//!   lambdas and the expected return type
//! - **Literals**: deferred numeric constants folded in arbitrary precision and
//!   pulled up to concrete types through a bit-exact conversion matrix
//!
//! ## Integration
//!
//! The frontend hands over an already desugared and name-resolved tree; code
//! generation consumes the typed bodies together with the layout of every
//! instantiated type.

#![allow(clippy::result_large_err)]
#![allow(clippy::uninlined_format_args)]

pub mod ast;
pub mod checker;
pub mod config;
pub mod conversion;
pub mod dispatch;
pub mod error;
pub mod hierarchy;
pub mod inference;
pub mod literal;
pub mod registry;
pub mod templates;
pub mod typed_ast;
pub mod types;
pub mod verify;

#[cfg(test)]
mod tests;

// Re-export public API
pub use checker::{ExpressionChecker, FunctionChecker, TypeChecker};
pub use config::CheckerConfig;
pub use conversion::{CastOutcome, CastPlan, NumericConversion, NumericValue, RuntimeCastError};
pub use error::{TypeResult, TypecheckError};
pub use registry::TypeRegistry;
pub use templates::builtin::Builtin;
pub use typed_ast::{TypedBody, TypedExpr, TypedExprKind, TypedProgram, TypedStmt};
pub use types::{
    ConcreteType, Handle, LeafField, Method, MethodInstance, MethodRef, StorageCategory,
    TemplateId, TypeLayout,
};

/// Type check a program with the default configuration
pub fn typecheck_program(program: &ast::Program) -> TypeResult<TypedProgram> {
    TypeChecker::new().check_program(program)
}
