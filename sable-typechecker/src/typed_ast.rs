//! Typed output tree
//!
//! Every node carries the handle of its resolved type. Calls point at the exact
//! method that was selected together with the bindings of its method generics,
//! so code generation never repeats overload resolution.

use crate::ast::Span;
use crate::conversion::{CastPlan, NumericConversion};
use crate::registry::TypeRegistry;
use crate::types::{FieldRef, Handle, MethodInstance, MethodRef};
use indexmap::IndexMap;
use num_bigint::BigInt;

#[derive(Debug, Clone, PartialEq)]
pub struct TypedExpr {
    pub kind: TypedExprKind,
    pub ty: Handle,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedExprKind {
    /// Integer constant; its type is the integer literal type until pulled up
    IntLiteral(BigInt),
    FloatLiteral(f64),
    Bool(bool),
    Str(String),
    Unit,
    Local(String),
    This,
    Call {
        /// Absent for static calls and constructors
        receiver: Option<Box<TypedExpr>>,
        method: MethodRef,
        generics: Vec<Handle>,
        args: Vec<TypedExpr>,
    },
    FieldGet {
        object: Box<TypedExpr>,
        field: FieldRef,
    },
    FieldSet {
        object: Box<TypedExpr>,
        field: FieldRef,
        value: Box<TypedExpr>,
    },
    StaticField {
        field: FieldRef,
    },
    Lambda {
        /// Closure implementation type; absent for lambdas checked speculatively.
        /// The node itself is typed with the function interface.
        closure: Option<Handle>,
        params: Vec<(String, Handle)>,
        captures: Vec<(String, Handle)>,
        body: Box<TypedExpr>,
    },
    NumericCast {
        value: Box<TypedExpr>,
        conversion: NumericConversion,
    },
    ReferenceCast {
        value: Box<TypedExpr>,
        plan: CastPlan,
    },
    If {
        condition: Box<TypedExpr>,
        then_branch: Box<TypedExpr>,
        else_branch: Option<Box<TypedExpr>>,
    },
    Block {
        statements: Vec<TypedStmt>,
        result: Option<Box<TypedExpr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypedStmt {
    Let {
        name: String,
        ty: Handle,
        value: TypedExpr,
    },
    Assign {
        name: String,
        value: TypedExpr,
    },
    Expr(TypedExpr),
}

impl TypedExpr {
    pub fn new(kind: TypedExprKind, ty: Handle, span: Span) -> Self {
        Self { kind, ty, span }
    }

    /// Whether this node is a numeric constant
    pub fn is_literal(&self) -> bool {
        matches!(
            self.kind,
            TypedExprKind::IntLiteral(_) | TypedExprKind::FloatLiteral(_)
        )
    }

    /// Visit this node and every node below it, parents first
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a TypedExpr)) {
        visit(self);
        match &self.kind {
            TypedExprKind::IntLiteral(_)
            | TypedExprKind::FloatLiteral(_)
            | TypedExprKind::Bool(_)
            | TypedExprKind::Str(_)
            | TypedExprKind::Unit
            | TypedExprKind::Local(_)
            | TypedExprKind::This
            | TypedExprKind::StaticField { .. } => {}
            TypedExprKind::Call { receiver, args, .. } => {
                if let Some(receiver) = receiver {
                    receiver.walk(visit);
                }
                args.iter().for_each(|arg| arg.walk(visit));
            }
            TypedExprKind::FieldGet { object, .. } => object.walk(visit),
            TypedExprKind::FieldSet { object, value, .. } => {
                object.walk(visit);
                value.walk(visit);
            }
            TypedExprKind::Lambda { body, .. } => body.walk(visit),
            TypedExprKind::NumericCast { value, .. } | TypedExprKind::ReferenceCast { value, .. } => {
                value.walk(visit)
            }
            TypedExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.walk(visit);
                then_branch.walk(visit);
                if let Some(else_branch) = else_branch {
                    else_branch.walk(visit);
                }
            }
            TypedExprKind::Block { statements, result } => {
                for statement in statements {
                    match statement {
                        TypedStmt::Let { value, .. } | TypedStmt::Assign { value, .. } => {
                            value.walk(visit)
                        }
                        TypedStmt::Expr(expr) => expr.walk(visit),
                    }
                }
                if let Some(result) = result {
                    result.walk(visit);
                }
            }
        }
    }
}

/// A checked method body
#[derive(Debug, Clone, PartialEq)]
pub struct TypedBody {
    pub params: Vec<(String, Handle)>,
    pub return_type: Handle,
    pub body: TypedExpr,
}

/// Result of checking a whole program
#[derive(Debug, Clone)]
pub struct TypedProgram {
    /// Every concrete type instantiated while checking
    pub registry: TypeRegistry,
    /// Checked bodies, in the order they were checked
    pub bodies: IndexMap<MethodInstance, TypedBody>,
    pub entry: Option<TypedExpr>,
}

impl TypedProgram {
    pub fn body(&self, instance: &MethodInstance) -> Option<&TypedBody> {
        self.bodies.get(instance)
    }

    /// Bodies of the named method on any type with the given display name
    pub fn bodies_named<'a>(
        &'a self,
        type_name: &'a str,
        method: &'a str,
    ) -> impl Iterator<Item = (&'a MethodInstance, &'a TypedBody)> + 'a {
        self.bodies.iter().filter(move |(instance, _)| {
            self.registry.name(instance.method.owner) == type_name
                && self
                    .registry
                    .method(instance.method)
                    .map(|found| found.name == method)
                    .unwrap_or(false)
        })
    }
}
