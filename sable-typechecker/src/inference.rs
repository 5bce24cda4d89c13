//! Generic method argument inference
//!
//! Binds the method generics of one overload candidate from the shapes of its
//! arguments and of the expected return type. Each generic has a binding slot
//! that only ever moves from unknown to known, so the loop ends either when
//! every slot is bound or when a whole pass binds nothing new.
//!
//! Sources of bindings, in order within a pass:
//! - the expected return type, destructured against the declared return term
//! - lambda arguments whose function-interface parameter types are already
//!   known; the lambda is checked against them and its body type destructured
//!   against the interface's return term
//! - any other argument, checked bottom-up and destructured against its
//!   parameter term
//!
//! Deferred literal types never bind a generic.

use crate::ast::{Expr, ExprKind, Span};
use crate::checker::context::{CheckContext, Trial};
use crate::checker::expressions::ExpressionChecker;
use crate::error::{TypeResult, TypecheckError};
use crate::registry::TypeRegistry;
use crate::templates::builtin::Builtin;
use crate::types::{Handle, Method, TemplateId, TypeTerm};
use tracing::{debug, trace};

/// Two different types demanded for the same generic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Conflict {
    pub generic: usize,
    pub bound: Handle,
    pub supplied: Handle,
}

/// Unify a signature term with a concrete type, binding unknown generics
///
/// Returns whether any binding was added. A structural mismatch binds nothing
/// and is not an error; only a conflicting rebinding is.
pub fn destructure(
    registry: &TypeRegistry,
    term: &TypeTerm,
    supplied: Handle,
    bindings: &mut [Option<Handle>],
) -> Result<bool, Conflict> {
    match term {
        TypeTerm::Concrete(_) => Ok(false),
        TypeTerm::MethodGeneric(generic) => {
            if registry.is_deferred(supplied) {
                return Ok(false);
            }
            match bindings.get(*generic).copied() {
                Some(None) => {
                    bindings[*generic] = Some(supplied);
                    trace!(generic, supplied = %registry.name(supplied), "bound method generic");
                    Ok(true)
                }
                Some(Some(bound)) if bound == supplied => Ok(false),
                Some(Some(bound)) => Err(Conflict {
                    generic: *generic,
                    bound,
                    supplied,
                }),
                None => Ok(false),
            }
        }
        TypeTerm::Applied { template, args } => {
            let Some(generics) = matching_instance(registry, *template, supplied) else {
                return Ok(false);
            };
            let mut changed = false;
            for (arg, generic) in args.iter().zip(generics) {
                changed |= destructure(registry, arg, generic, bindings)?;
            }
            Ok(changed)
        }
    }
}

/// Generic arguments of the first type in `supplied`'s supertype chain
/// (itself included) instantiated from `template`
fn matching_instance(registry: &TypeRegistry, template: TemplateId, supplied: Handle) -> Option<Vec<Handle>> {
    std::iter::once(supplied)
        .chain(registry.supertype_chain(supplied))
        .filter_map(|handle| registry.try_get(handle))
        .find(|concrete| concrete.template == template)
        .map(|concrete| concrete.generics.clone())
}

/// Parameter terms and return term of a function-interface term
fn function_term_parts(term: &TypeTerm) -> Option<(&[TypeTerm], &TypeTerm)> {
    match term {
        TypeTerm::Applied { template, args } => {
            Builtin::from_id(*template)?.function_arity()?;
            let (ret, params) = args.split_first()?;
            Some((params, ret))
        }
        _ => None,
    }
}

/// Bind every method generic of `method` for one call
pub fn infer(
    ctx: &mut CheckContext<'_>,
    method: &Method,
    args: &[Expr],
    explicit: &[Handle],
    expected: Option<Handle>,
    span: Span,
) -> TypeResult<Vec<Handle>> {
    if !explicit.is_empty() {
        return Ok(explicit.to_vec());
    }

    let mut bindings: Vec<Option<Handle>> = vec![None; method.generic_arity];
    let conflict = |registry: &TypeRegistry, conflict: Conflict| {
        TypecheckError::inference_failure(
            method.name.clone(),
            format!(
                "generic #{} would be both {} and {}",
                conflict.generic,
                registry.name(conflict.bound),
                registry.name(conflict.supplied)
            ),
            span,
        )
    };

    for pass in 0..ctx.config.max_inference_passes {
        let mut progress = false;

        if let Some(expected) = expected {
            if method.return_type.contains_unknown(&bindings) {
                progress |= destructure(&ctx.registry, &method.return_type, expected, &mut bindings)
                    .map_err(|c| conflict(&ctx.registry, c))?;
            }
        }

        for (arg, param) in args.iter().zip(&method.params) {
            if !param.contains_unknown(&bindings) {
                continue;
            }

            if let ExprKind::Lambda(lambda) = &arg.kind {
                if let Some((param_terms, ret_term)) = function_term_parts(param) {
                    if param_terms.len() == lambda.params.len() {
                        let mut param_types = Vec::with_capacity(param_terms.len());
                        for term in param_terms {
                            match ctx.registry.try_close(term, &bindings)? {
                                Some(handle) => param_types.push(handle),
                                None => break,
                            }
                        }
                        if param_types.len() == param_terms.len() {
                            let expected_return = ctx.registry.try_close(ret_term, &bindings)?;
                            let outcome = ctx.trial(|ctx| {
                                ExpressionChecker::check_lambda_body(
                                    ctx,
                                    lambda,
                                    &param_types,
                                    expected_return,
                                    arg.span,
                                )
                            })?;
                            if let Trial::Accepted(body) = outcome {
                                progress |= destructure(&ctx.registry, ret_term, body.body.ty, &mut bindings)
                                    .map_err(|c| conflict(&ctx.registry, c))?;
                            }
                            continue;
                        }
                    }
                }
            }

            let outcome = ctx.trial(|ctx| ExpressionChecker::check(ctx, arg, None))?;
            match outcome {
                Trial::Accepted(typed) => {
                    progress |= destructure(&ctx.registry, param, typed.ty, &mut bindings)
                        .map_err(|c| conflict(&ctx.registry, c))?;
                }
                Trial::Rejected(error) => {
                    trace!(method = %method.name, %error, "argument skipped during inference");
                }
            }
        }

        if let Some(bound) = bindings.iter().copied().collect::<Option<Vec<Handle>>>() {
            debug!(
                method = %method.name,
                pass,
                generics = ?bound.iter().map(|handle| ctx.registry.name(*handle)).collect::<Vec<_>>(),
                "inferred method generics"
            );
            return Ok(bound);
        }
        if !progress {
            break;
        }
    }

    let missing: Vec<String> = bindings
        .iter()
        .enumerate()
        .filter(|(_, binding)| binding.is_none())
        .map(|(index, _)| format!("#{index}"))
        .collect();
    Err(TypecheckError::inference_failure(
        method.name.clone(),
        format!("no argument determines generic {}", missing.join(", ")),
        span,
    ))
}
