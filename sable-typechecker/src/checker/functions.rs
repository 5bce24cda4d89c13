//! Method body checking
//!
//! Bodies are checked in a fixed-point loop. A pass collects every source
//! body not yet checked:
//! - non-generic methods of every resolved type, including extension methods
//! - generic method instances requested by committed calls
//! - lambdas recorded since the previous pass
//!
//! Checking a body can instantiate new types, whose bodies are picked up by
//! the next pass. The loop ends on the first pass that finds nothing new.

use crate::ast::{MethodDecl, Program};
use crate::checker::context::{CheckContext, Frame};
use crate::checker::expressions::ExpressionChecker;
use crate::error::{to_source_span, TypeResult, TypecheckError};
use crate::registry::TypeRegistry;
use crate::templates::builtin::builtin_count;
use crate::typed_ast::{TypedBody, TypedExpr};
use crate::types::{Handle, Method, MethodBody, MethodInstance, MethodKind, MethodRef};
use indexmap::IndexMap;
use tracing::{debug, info};

/// Method body type checker
pub struct FunctionChecker;

impl FunctionChecker {
    /// Check bodies until a pass adds nothing new
    pub fn check_all(
        ctx: &mut CheckContext<'_>,
        bodies: &mut IndexMap<MethodInstance, TypedBody>,
    ) -> TypeResult<()> {
        let mut recorded_closures = 0;

        for pass in 0..ctx.config.max_fixed_point_passes {
            let pending = Self::pending_instances(ctx, bodies);
            let new_closures = ctx.closures.len() - recorded_closures;
            if pending.is_empty() && new_closures == 0 {
                info!(passes = pass, bodies = bodies.len(), types = ctx.registry.len(), "body checking settled");
                return Ok(());
            }
            debug!(pass, pending = pending.len(), new_closures, "body checking pass");

            for record in &ctx.closures[recorded_closures..] {
                bodies.insert(
                    MethodInstance {
                        method: MethodRef {
                            owner: record.handle,
                            index: 0,
                        },
                        generics: Vec::new(),
                    },
                    record.body.clone(),
                );
            }
            recorded_closures = ctx.closures.len();

            for instance in pending {
                let body = Self::check_method_body(ctx, &instance)?;
                bodies.insert(instance, body);
            }
        }

        Err(TypecheckError::internal(format!(
            "body checking did not settle after {} passes",
            ctx.config.max_fixed_point_passes
        )))
    }

    /// Source bodies that have not been checked yet, in registry order
    fn pending_instances(
        ctx: &CheckContext<'_>,
        bodies: &IndexMap<MethodInstance, TypedBody>,
    ) -> Vec<MethodInstance> {
        let mut pending = Vec::new();

        for handle in ctx.registry.handles() {
            let Some(concrete) = ctx.registry.try_get(handle) else {
                continue;
            };
            for (index, method) in concrete.methods.iter().enumerate() {
                let from_source = matches!(
                    method.body,
                    MethodBody::Declared { .. } | MethodBody::Extension { .. }
                );
                if !from_source || method.is_generic() {
                    continue;
                }
                let instance = MethodInstance {
                    method: MethodRef {
                        owner: handle,
                        index,
                    },
                    generics: Vec::new(),
                };
                if !bodies.contains_key(&instance) {
                    pending.push(instance);
                }
            }
        }

        for request in &ctx.requests {
            if !bodies.contains_key(request) && !pending.contains(request) {
                pending.push(request.clone());
            }
        }
        pending
    }

    /// Check one method body with its method generics bound
    pub fn check_method_body(
        ctx: &mut CheckContext<'_>,
        instance: &MethodInstance,
    ) -> TypeResult<TypedBody> {
        let method = ctx.registry.method(instance.method)?.clone();
        let program = ctx.program;
        let decl = Self::declaration(program, &method)?;
        let body = decl.body.as_ref().ok_or_else(|| {
            TypecheckError::internal(format!("method {} has no body to check", method.name))
        })?;

        let params = method
            .params
            .iter()
            .map(|param| ctx.registry.close_term(param, &instance.generics))
            .collect::<TypeResult<Vec<Handle>>>()?;
        let params: Vec<(String, Handle)> = method.param_names.iter().cloned().zip(params).collect();
        let return_type = ctx.registry.close_term(&method.return_type, &instance.generics)?;
        let unit = ctx.registry.unit()?;

        let frame = Frame {
            this: matches!(method.kind, MethodKind::Instance | MethodKind::Constructor)
                .then_some(method.owner),
            type_generics: ctx.registry.get(method.owner)?.generics.clone(),
            method_generics: instance.generics.clone(),
        };
        let saved = ctx.enter_frame(frame);
        let depth = ctx.scope_depth();
        ctx.push_scope();
        for (name, ty) in &params {
            ctx.declare(name, *ty, decl.span);
        }

        let checked = if method.kind == MethodKind::Constructor || return_type == unit {
            ExpressionChecker::check(ctx, body, None)
        } else {
            ExpressionChecker::check_against(ctx, body, return_type)
        };

        ctx.truncate_scopes(depth);
        ctx.enter_frame(saved);
        let checked = checked?;
        ensure_resolved(&ctx.registry, &checked)?;

        debug!(
            owner = %ctx.registry.name(method.owner),
            method = %method.name,
            generics = instance.generics.len(),
            "checked method body"
        );
        Ok(TypedBody {
            params,
            return_type,
            body: checked,
        })
    }

    /// The declaration a source-bodied method was built from
    fn declaration<'p>(program: &'p Program, method: &Method) -> TypeResult<&'p MethodDecl> {
        let found = match method.body {
            MethodBody::Declared { template, method } => template
                .index()
                .checked_sub(builtin_count())
                .and_then(|index| program.types.get(index))
                .and_then(|decl| decl.methods.get(method)),
            MethodBody::Extension { extension, method } => program
                .extensions
                .get(extension)
                .and_then(|decl| decl.methods.get(method)),
            _ => None,
        };
        found.ok_or_else(|| {
            TypecheckError::internal(format!("no source declaration for method {}", method.name))
        })
    }
}

/// Fail on the first node still typed with a deferred literal type
pub fn ensure_resolved(registry: &TypeRegistry, typed: &TypedExpr) -> TypeResult<()> {
    let mut unresolved = None;
    typed.walk(&mut |node| {
        if unresolved.is_none() && registry.is_deferred(node.ty) {
            unresolved = Some(node);
        }
    });

    match unresolved {
        Some(node) => Err(TypecheckError::UnresolvedLiteral {
            literal_type: registry.name(node.ty),
            span: to_source_span(Some(node.span)),
        }),
        None => Ok(()),
    }
}
