//! Expression type checking
//!
//! Walks the expression tree bottom-up and produces typed nodes. This module
//! handles:
//! - Literals, locals and `this`
//! - Calls of every form, all routed through overload resolution
//! - Constant folding of operators on deferred literals
//! - Field access, lambdas, casts, conditionals and blocks
//!
//! `check(expr, Some(t))` treats `t` as a hint for overload selection and
//! lambda parameter inference; callers that need the value to actually be a
//! `t` use `check_against`, which coerces the result afterwards.

use crate::ast::{Expr, ExprKind, Lambda, Span, Stmt, TypeRef};
use crate::checker::context::{CheckContext, ClosureRecord};
use crate::conversion;
use crate::dispatch::{resolve, CallForm, CallSite};
use crate::error::{to_source_span, TypeResult, TypecheckError};
use crate::literal;
use crate::templates::closure::ClosureTemplate;
use crate::templates::TypeTemplate;
use crate::typed_ast::{TypedBody, TypedExpr, TypedExprKind, TypedStmt};
use crate::types::{FieldRef, Handle, LiteralKind, NumericKind, StorageCategory};
use std::rc::Rc;
use tracing::trace;

/// A lambda body checked against known parameter types
#[derive(Debug, Clone)]
pub struct LambdaBody {
    pub params: Vec<(String, Handle)>,
    pub captures: Vec<(String, Handle)>,
    pub body: TypedExpr,
}

/// Expression type checker
pub struct ExpressionChecker;

impl ExpressionChecker {
    /// Type check an expression
    pub fn check(ctx: &mut CheckContext<'_>, expr: &Expr, expected: Option<Handle>) -> TypeResult<TypedExpr> {
        let span = expr.span;
        match &expr.kind {
            ExprKind::Int(value) => {
                let ty = ctx.registry.literal(LiteralKind::Int)?;
                Ok(TypedExpr::new(TypedExprKind::IntLiteral(value.clone()), ty, span))
            }
            ExprKind::Float(value) => {
                let ty = ctx.registry.literal(LiteralKind::Float)?;
                Ok(TypedExpr::new(TypedExprKind::FloatLiteral(*value), ty, span))
            }
            ExprKind::Bool(value) => {
                let ty = ctx.registry.bool()?;
                Ok(TypedExpr::new(TypedExprKind::Bool(*value), ty, span))
            }
            ExprKind::Str(value) => {
                let ty = ctx.registry.str()?;
                Ok(TypedExpr::new(TypedExprKind::Str(value.clone()), ty, span))
            }
            ExprKind::Unit => {
                let ty = ctx.registry.unit()?;
                Ok(TypedExpr::new(TypedExprKind::Unit, ty, span))
            }
            ExprKind::Local(name) => {
                let ty = ctx.lookup(name, span)?;
                Ok(TypedExpr::new(TypedExprKind::Local(name.clone()), ty, span))
            }
            ExprKind::This => {
                let ty = ctx.this_type(span)?;
                Ok(TypedExpr::new(TypedExprKind::This, ty, span))
            }
            ExprKind::Call {
                receiver,
                method,
                generics,
                args,
            } => Self::check_call(ctx, receiver, method, generics, args, expected, span),
            ExprKind::StaticCall {
                owner,
                method,
                generics,
                args,
            } => {
                let owner = Self::resolve_type(ctx, owner)?;
                let explicit_generics = Self::resolve_types(ctx, generics)?;
                let resolution = resolve(
                    ctx,
                    &CallSite {
                        form: CallForm::Static,
                        receiver: owner,
                        method,
                        args,
                        explicit_generics,
                        expected,
                        span,
                    },
                )?;
                Ok(TypedExpr::new(
                    TypedExprKind::Call {
                        receiver: None,
                        method: resolution.method_ref,
                        generics: resolution.generics,
                        args: resolution.args,
                    },
                    resolution.return_type,
                    span,
                ))
            }
            ExprKind::New { ty, args } => {
                let ty = Self::resolve_type(ctx, ty)?;
                let resolution = resolve(
                    ctx,
                    &CallSite {
                        form: CallForm::Constructor,
                        receiver: ty,
                        method: "new",
                        args,
                        explicit_generics: Vec::new(),
                        expected: None,
                        span,
                    },
                )?;
                Ok(TypedExpr::new(
                    TypedExprKind::Call {
                        receiver: None,
                        method: resolution.method_ref,
                        generics: resolution.generics,
                        args: resolution.args,
                    },
                    ty,
                    span,
                ))
            }
            ExprKind::Field { object, field } => {
                let object = Self::check(ctx, object, None)?;
                let (field, ty) = Self::find_field(ctx, object.ty, field, span)?;
                Ok(TypedExpr::new(
                    TypedExprKind::FieldGet {
                        object: Box::new(object),
                        field,
                    },
                    ty,
                    span,
                ))
            }
            ExprKind::SetField { object, field, value } => {
                let object = Self::check(ctx, object, None)?;
                let (field, ty) = Self::find_field(ctx, object.ty, field, span)?;
                let value = Self::check_against(ctx, value, ty)?;
                let unit = ctx.registry.unit()?;
                Ok(TypedExpr::new(
                    TypedExprKind::FieldSet {
                        object: Box::new(object),
                        field,
                        value: Box::new(value),
                    },
                    unit,
                    span,
                ))
            }
            ExprKind::StaticField { owner, field } => {
                let owner = Self::resolve_type(ctx, owner)?;
                let concrete = ctx.registry.get(owner)?;
                let index = concrete
                    .static_field_index(field)
                    .ok_or_else(|| TypecheckError::undeclared("static field", field.clone(), span))?;
                let ty = concrete.fields[index].ty;
                Ok(TypedExpr::new(
                    TypedExprKind::StaticField {
                        field: FieldRef { owner, index },
                    },
                    ty,
                    span,
                ))
            }
            ExprKind::Lambda(lambda) => Self::check_lambda(ctx, lambda, expected, span),
            ExprKind::Cast {
                value,
                target,
                optional,
            } => Self::check_cast(ctx, value, target, *optional, span),
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => Self::check_if(ctx, condition, then_branch, else_branch.as_deref(), expected, span),
            ExprKind::Block { statements, result } => {
                let depth = ctx.scope_depth();
                ctx.push_scope();
                let checked = Self::check_block(ctx, statements, result.as_deref(), expected, span);
                ctx.truncate_scopes(depth);
                checked
            }
        }
    }

    /// Type check an expression whose value must be a `target`
    pub fn check_against(ctx: &mut CheckContext<'_>, expr: &Expr, target: Handle) -> TypeResult<TypedExpr> {
        let typed = Self::check(ctx, expr, Some(target))?;
        Self::coerce(ctx, typed, target)
    }

    /// Make a checked expression a `target`: pull deferred literals up, accept subtypes
    pub fn coerce(ctx: &mut CheckContext<'_>, typed: TypedExpr, target: Handle) -> TypeResult<TypedExpr> {
        if typed.ty == target {
            return Ok(typed);
        }
        if ctx.registry.is_deferred(typed.ty) {
            return literal::pull_up(&ctx.registry, typed, target);
        }
        if ctx.registry.is_subtype(typed.ty, target) {
            return Ok(typed);
        }
        Err(TypecheckError::type_mismatch(
            ctx.registry.name(target),
            ctx.registry.name(typed.ty),
            typed.span,
        ))
    }

    /// Instantiate a source type in the frame being checked
    pub fn resolve_type(ctx: &mut CheckContext<'_>, type_ref: &TypeRef) -> TypeResult<Handle> {
        ctx.registry
            .instantiate_ref(type_ref, &ctx.frame.type_generics, &ctx.frame.method_generics)
    }

    fn resolve_types(ctx: &mut CheckContext<'_>, type_refs: &[TypeRef]) -> TypeResult<Vec<Handle>> {
        type_refs
            .iter()
            .map(|type_ref| Self::resolve_type(ctx, type_ref))
            .collect()
    }

    fn check_call(
        ctx: &mut CheckContext<'_>,
        receiver: &Expr,
        method: &str,
        generics: &[TypeRef],
        args: &[Expr],
        expected: Option<Handle>,
        span: Span,
    ) -> TypeResult<TypedExpr> {
        let mut receiver = Self::check(ctx, receiver, None)?;
        if ctx.registry.is_deferred(receiver.ty) {
            receiver = Self::pull_up_receiver(ctx, receiver, args)?;
        }
        let explicit_generics = Self::resolve_types(ctx, generics)?;

        let resolution = resolve(
            ctx,
            &CallSite {
                form: CallForm::Instance,
                receiver: receiver.ty,
                method,
                args,
                explicit_generics,
                expected,
                span,
            },
        )?;

        if let Some(op) = resolution.method.fold_hook() {
            let all_deferred = ctx.registry.is_deferred(receiver.ty)
                && resolution
                    .args
                    .iter()
                    .all(|arg| ctx.registry.is_deferred(arg.ty));
            if all_deferred {
                let max_shift = ctx.config.max_literal_shift;
                if let Some(folded) =
                    literal::fold(&mut ctx.registry, op, &receiver, &resolution.args, max_shift, span)?
                {
                    return Ok(folded);
                }
            }
        }

        Ok(TypedExpr::new(
            TypedExprKind::Call {
                receiver: Some(Box::new(receiver)),
                method: resolution.method_ref,
                generics: resolution.generics,
                args: resolution.args,
            },
            resolution.return_type,
            span,
        ))
    }

    /// Give a literal receiver the concrete numeric type of its first argument
    ///
    /// `2.add(x)` with `x: u8` dispatches on `u8`, not on the literal type. An
    /// integer literal meeting a concrete float goes through the float literal
    /// type, which only succeeds when the value converts exactly.
    fn pull_up_receiver(
        ctx: &mut CheckContext<'_>,
        receiver: TypedExpr,
        args: &[Expr],
    ) -> TypeResult<TypedExpr> {
        let (Some(literal_kind), Some(first)) = (ctx.registry.literal_kind(receiver.ty), args.first()) else {
            return Ok(receiver);
        };
        let Some(arg) = ctx.trial(|ctx| Self::check(ctx, first, None))?.accepted() else {
            return Ok(receiver);
        };

        match ctx.registry.numeric_kind(arg.ty) {
            Some(kind) if kind.accepts_literal(literal_kind) => {
                trace!(target = %ctx.registry.name(arg.ty), "pulling literal receiver up to argument type");
                literal::pull_up(&ctx.registry, receiver, arg.ty)
            }
            Some(NumericKind::Float(_)) if literal_kind == LiteralKind::Int => {
                let float_literal = ctx.registry.literal(LiteralKind::Float)?;
                let widened = literal::pull_up(&ctx.registry, receiver, float_literal)?;
                literal::pull_up(&ctx.registry, widened, arg.ty)
            }
            _ => Ok(receiver),
        }
    }

    /// Locate an instance field on a type or its supertypes
    fn find_field(
        ctx: &CheckContext<'_>,
        owner: Handle,
        name: &str,
        span: Span,
    ) -> TypeResult<(FieldRef, Handle)> {
        std::iter::once(owner)
            .chain(ctx.registry.supertype_chain(owner))
            .find_map(|handle| {
                let concrete = ctx.registry.try_get(handle)?;
                let index = concrete.field_index(name)?;
                Some((FieldRef { owner: handle, index }, concrete.fields[index].ty))
            })
            .ok_or_else(|| {
                TypecheckError::undeclared(
                    "field",
                    format!("{}.{}", ctx.registry.name(owner), name),
                    span,
                )
            })
    }

    /// Check a lambda body with its parameter types already decided
    ///
    /// Used both for committed lambdas and for the self-inference probe of
    /// generic inference. Registers nothing.
    pub fn check_lambda_body(
        ctx: &mut CheckContext<'_>,
        lambda: &Lambda,
        param_types: &[Handle],
        expected_return: Option<Handle>,
        span: Span,
    ) -> TypeResult<LambdaBody> {
        if param_types.len() != lambda.params.len() {
            return Err(TypecheckError::type_mismatch(
                format!("a lambda taking {} parameters", param_types.len()),
                format!("a lambda taking {} parameters", lambda.params.len()),
                span,
            ));
        }

        let depth = ctx.scope_depth();
        ctx.enter_lambda();
        ctx.push_scope();
        let checked = Self::lambda_scope(ctx, lambda, param_types, expected_return, span);
        ctx.truncate_scopes(depth);
        let captures = ctx.exit_lambda();

        let (params, body) = checked?;
        Ok(LambdaBody {
            params,
            captures,
            body,
        })
    }

    fn lambda_scope(
        ctx: &mut CheckContext<'_>,
        lambda: &Lambda,
        param_types: &[Handle],
        expected_return: Option<Handle>,
        span: Span,
    ) -> TypeResult<(Vec<(String, Handle)>, TypedExpr)> {
        let mut params = Vec::with_capacity(param_types.len());
        for (param, ty) in lambda.params.iter().zip(param_types) {
            if let Some(annotation) = &param.ty {
                let annotated = Self::resolve_type(ctx, annotation)?;
                if annotated != *ty {
                    return Err(TypecheckError::type_mismatch(
                        ctx.registry.name(*ty),
                        ctx.registry.name(annotated),
                        annotation.span(),
                    ));
                }
            }
            ctx.declare(&param.name, *ty, span);
            params.push((param.name.clone(), *ty));
        }

        let body = match expected_return {
            Some(ret) => Self::check_against(ctx, &lambda.body, ret)?,
            None => Self::check(ctx, &lambda.body, None)?,
        };
        Ok((params, body))
    }

    fn check_lambda(
        ctx: &mut CheckContext<'_>,
        lambda: &Lambda,
        expected: Option<Handle>,
        span: Span,
    ) -> TypeResult<TypedExpr> {
        let signature = expected
            .and_then(|expected| ctx.registry.function_signature(expected))
            .filter(|(params, _)| params.len() == lambda.params.len());

        let mut param_types = Vec::with_capacity(lambda.params.len());
        for (index, param) in lambda.params.iter().enumerate() {
            let from_signature = signature
                .as_ref()
                .and_then(|(params, _)| params.get(index).copied());
            let ty = match (&param.ty, from_signature) {
                (Some(annotation), _) => Self::resolve_type(ctx, annotation)?,
                (None, Some(ty)) => ty,
                (None, None) => {
                    return Err(TypecheckError::inference_failure(
                        "lambda",
                        format!("parameter `{}` has no annotation and no contextual type", param.name),
                        span,
                    ))
                }
            };
            param_types.push(ty);
        }

        let expected_return = signature.map(|(_, ret)| ret);
        let checked = Self::check_lambda_body(ctx, lambda, &param_types, expected_return, span)?;
        let return_type = expected_return.unwrap_or(checked.body.ty);
        if ctx.registry.is_deferred(return_type) {
            return Err(TypecheckError::UnresolvedLiteral {
                literal_type: ctx.registry.name(return_type),
                span: to_source_span(Some(checked.body.span)),
            });
        }

        let interface = ctx.registry.function_interface(&param_types, return_type, span)?;
        let closure = if ctx.is_speculative() {
            None
        } else {
            Some(Self::register_closure(ctx, &checked, return_type, span)?)
        };

        Ok(TypedExpr::new(
            TypedExprKind::Lambda {
                closure,
                params: checked.params,
                captures: checked.captures,
                body: Box::new(checked.body),
            },
            interface,
            span,
        ))
    }

    /// Create the implementation type of a committed lambda
    fn register_closure(
        ctx: &mut CheckContext<'_>,
        checked: &LambdaBody,
        return_type: Handle,
        span: Span,
    ) -> TypeResult<Handle> {
        let closure = ctx.closures.len();
        let template = ctx.registry.register_template(TypeTemplate {
            name: ClosureTemplate::name(closure),
            arity: 0,
            category: StorageCategory::Reference,
            builder: Rc::new(ClosureTemplate {
                closure,
                captures: checked.captures.clone(),
                param_names: checked.params.iter().map(|(name, _)| name.clone()).collect(),
                params: checked.params.iter().map(|(_, ty)| *ty).collect(),
                return_type,
                span,
            }),
            span,
        });
        let handle = ctx.registry.instantiate(template, Vec::new())?;

        ctx.closures.push(ClosureRecord {
            handle,
            body: TypedBody {
                params: checked.params.clone(),
                return_type,
                body: checked.body.clone(),
            },
        });
        Ok(handle)
    }

    fn check_cast(
        ctx: &mut CheckContext<'_>,
        value: &Expr,
        target: &TypeRef,
        optional: bool,
        span: Span,
    ) -> TypeResult<TypedExpr> {
        let value = Self::check(ctx, value, None)?;
        let target = Self::resolve_type(ctx, target)?;

        let Some(target_kind) = ctx.registry.numeric_kind(target) else {
            let plan = conversion::plan_reference_cast(&mut ctx.registry, value.ty, target, optional, span)?;
            return Ok(TypedExpr::new(
                TypedExprKind::ReferenceCast {
                    value: Box::new(value),
                    plan,
                },
                plan.result_type(),
                span,
            ));
        };

        if optional {
            return Err(TypecheckError::invalid_cast(
                ctx.registry.name(value.ty),
                ctx.registry.name(target),
                "`as?` applies to reference types only",
                span,
            ));
        }

        if let Some(constant) = literal::cast_constant(&ctx.registry, &value, target, span)? {
            return Ok(constant);
        }
        if ctx.registry.is_deferred(value.ty) {
            return Err(TypecheckError::UnresolvedLiteral {
                literal_type: ctx.registry.name(value.ty),
                span: to_source_span(Some(value.span)),
            });
        }

        let source_kind = ctx.registry.numeric_kind(value.ty).ok_or_else(|| {
            TypecheckError::invalid_cast(
                ctx.registry.name(value.ty),
                ctx.registry.name(target),
                "the value is not numeric",
                span,
            )
        })?;
        let conversion = conversion::plan_numeric(source_kind, target_kind, span)?;
        Ok(TypedExpr::new(
            TypedExprKind::NumericCast {
                value: Box::new(value),
                conversion,
            },
            target,
            span,
        ))
    }

    fn check_if(
        ctx: &mut CheckContext<'_>,
        condition: &Expr,
        then_branch: &Expr,
        else_branch: Option<&Expr>,
        expected: Option<Handle>,
        span: Span,
    ) -> TypeResult<TypedExpr> {
        let bool_ty = ctx.registry.bool()?;
        let condition = Self::check_against(ctx, condition, bool_ty)?;

        let Some(else_branch) = else_branch else {
            let then_branch = Self::check(ctx, then_branch, None)?;
            let unit = ctx.registry.unit()?;
            return Ok(TypedExpr::new(
                TypedExprKind::If {
                    condition: Box::new(condition),
                    then_branch: Box::new(then_branch),
                    else_branch: None,
                },
                unit,
                span,
            ));
        };

        let then_branch = Self::check(ctx, then_branch, expected)?;
        let else_branch = Self::check(ctx, else_branch, expected)?;
        let (then_branch, else_branch, ty) = match expected {
            Some(target) => (
                Self::coerce(ctx, then_branch, target)?,
                Self::coerce(ctx, else_branch, target)?,
                target,
            ),
            None => Self::unify_branches(ctx, then_branch, else_branch, span)?,
        };

        Ok(TypedExpr::new(
            TypedExprKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Some(Box::new(else_branch)),
            },
            ty,
            span,
        ))
    }

    /// Common type of two branches without a contextual type
    fn unify_branches(
        ctx: &mut CheckContext<'_>,
        then_branch: TypedExpr,
        else_branch: TypedExpr,
        span: Span,
    ) -> TypeResult<(TypedExpr, TypedExpr, Handle)> {
        let (a, b) = (then_branch.ty, else_branch.ty);
        if a == b {
            return Ok((then_branch, else_branch, a));
        }
        if ctx.registry.is_assignable(a, b) {
            return Ok((Self::coerce(ctx, then_branch, b)?, else_branch, b));
        }
        if ctx.registry.is_assignable(b, a) {
            return Ok((then_branch, Self::coerce(ctx, else_branch, a)?, a));
        }

        let common = std::iter::once(a)
            .chain(ctx.registry.supertype_chain(a))
            .find(|candidate| ctx.registry.is_subtype(b, *candidate));
        match common {
            Some(common) => Ok((then_branch, else_branch, common)),
            None => Err(TypecheckError::type_mismatch(
                ctx.registry.name(a),
                ctx.registry.name(b),
                span,
            )),
        }
    }

    fn check_block(
        ctx: &mut CheckContext<'_>,
        statements: &[Stmt],
        result: Option<&Expr>,
        expected: Option<Handle>,
        span: Span,
    ) -> TypeResult<TypedExpr> {
        let mut typed_statements = Vec::with_capacity(statements.len());
        for statement in statements {
            typed_statements.push(Self::check_statement(ctx, statement)?);
        }

        let result = result
            .map(|result| Self::check(ctx, result, expected))
            .transpose()?;
        let ty = match &result {
            Some(result) => result.ty,
            None => ctx.registry.unit()?,
        };

        Ok(TypedExpr::new(
            TypedExprKind::Block {
                statements: typed_statements,
                result: result.map(Box::new),
            },
            ty,
            span,
        ))
    }

    fn check_statement(ctx: &mut CheckContext<'_>, statement: &Stmt) -> TypeResult<TypedStmt> {
        match statement {
            Stmt::Let {
                name,
                ty,
                value,
                span,
            } => {
                let (declared, value) = match ty {
                    Some(annotation) => {
                        let target = Self::resolve_type(ctx, annotation)?;
                        (target, Self::check_against(ctx, value, target)?)
                    }
                    None => {
                        let value = Self::check(ctx, value, None)?;
                        if ctx.registry.is_deferred(value.ty) {
                            return Err(TypecheckError::UnresolvedLiteral {
                                literal_type: ctx.registry.name(value.ty),
                                span: to_source_span(Some(value.span)),
                            });
                        }
                        (value.ty, value)
                    }
                };
                ctx.declare(name, declared, *span);
                Ok(TypedStmt::Let {
                    name: name.clone(),
                    ty: declared,
                    value,
                })
            }
            Stmt::Assign { name, value, span } => {
                let target = ctx.lookup(name, *span)?;
                let value = Self::check_against(ctx, value, target)?;
                Ok(TypedStmt::Assign {
                    name: name.clone(),
                    value,
                })
            }
            Stmt::Expr(expr) => Ok(TypedStmt::Expr(Self::check(ctx, expr, None)?)),
        }
    }
}
