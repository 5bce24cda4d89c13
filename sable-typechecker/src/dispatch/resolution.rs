//! Overload resolution
//!
//! Every call in the language goes through here: operators, indexing and
//! augmented assignment arrive already desugared into named method calls.
//! Each candidate is tried speculatively; the survivors are filtered by the
//! expected return type and then ordered by parameter specificity.

use crate::ast::{Expr, Span};
use crate::checker::context::{CheckContext, Trial};
use crate::checker::expressions::ExpressionChecker;
use crate::dispatch::lookup::{collect_candidates, describe_method, CallForm, Candidate};
use crate::error::{to_source_span, TypeResult, TypecheckError};
use crate::inference;
use crate::registry::TypeRegistry;
use crate::typed_ast::TypedExpr;
use crate::types::{Handle, Method, MethodInstance, MethodRef};
use tracing::{debug, trace};

/// A call waiting to be resolved
#[derive(Debug, Clone)]
pub struct CallSite<'a> {
    pub form: CallForm,
    pub receiver: Handle,
    pub method: &'a str,
    pub args: &'a [Expr],
    pub explicit_generics: Vec<Handle>,
    pub expected: Option<Handle>,
    pub span: Span,
}

/// The selected overload with its committed arguments
#[derive(Debug, Clone)]
pub struct Resolution {
    pub method_ref: MethodRef,
    pub method: Method,
    pub generics: Vec<Handle>,
    pub params: Vec<Handle>,
    pub return_type: Handle,
    pub args: Vec<TypedExpr>,
}

/// One candidate that type checked
#[derive(Debug, Clone)]
struct Attempt {
    candidate: Candidate,
    generics: Vec<Handle>,
    params: Vec<Handle>,
    return_type: Handle,
    args: Vec<TypedExpr>,
}

pub fn resolve(ctx: &mut CheckContext<'_>, site: &CallSite<'_>) -> TypeResult<Resolution> {
    let candidates = collect_candidates(
        &mut ctx.registry,
        site.receiver,
        site.method,
        site.form,
        site.args.len(),
        site.explicit_generics.len(),
    )?;
    trace!(
        receiver = %ctx.registry.name(site.receiver),
        method = site.method,
        candidates = candidates.len(),
        "resolving call"
    );

    if candidates.is_empty() {
        return Err(no_suitable_overload(ctx, site)?);
    }

    let mark = ctx.registry.mark();
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for candidate in &candidates {
        match ctx.trial(|ctx| attempt(ctx, candidate, site))? {
            Trial::Accepted(attempt) => accepted.push(attempt),
            Trial::Rejected(error) => {
                trace!(
                    candidate = %describe_method(&ctx.registry, &candidate.method),
                    %error,
                    "candidate rejected"
                );
                rejected.push(error);
            }
        }
    }

    if accepted.is_empty() {
        // A lone candidate explains its own failure better than a generic message
        if candidates.len() == 1 {
            if let Some(error) = rejected.pop() {
                return Err(error);
            }
        }
        return Err(no_suitable_overload(ctx, site)?);
    }
    let contested = accepted.len() > 1;

    if let Some(expected) = site.expected {
        let (fitting, unfitting): (Vec<Attempt>, Vec<Attempt>) = accepted
            .into_iter()
            .partition(|attempt| ctx.registry.is_assignable(attempt.return_type, expected));
        if fitting.is_empty() {
            return Err(TypecheckError::ReturnTypeMismatch {
                method: format!("{}.{}", ctx.registry.name(site.receiver), site.method),
                expected: ctx.registry.name(expected),
                found: unfitting
                    .iter()
                    .map(|attempt| ctx.registry.name(attempt.return_type))
                    .collect(),
                span: to_source_span(Some(site.span)),
            });
        }
        accepted = fitting;
    }

    let winner = most_specific(&ctx.registry, accepted, site)?;
    let winner = if contested || !ctx.is_speculative() {
        // Losing candidates may have instantiated types of their own
        ctx.registry.rollback(mark);
        attempt(ctx, &winner.candidate, site)?
    } else {
        winner
    };
    commit(ctx, winner)
}

/// Type check one candidate against the call
fn attempt(ctx: &mut CheckContext<'_>, candidate: &Candidate, site: &CallSite<'_>) -> TypeResult<Attempt> {
    let method = &candidate.method;
    let generics = if method.is_generic() {
        inference::infer(
            ctx,
            method,
            site.args,
            &site.explicit_generics,
            site.expected,
            site.span,
        )?
    } else {
        Vec::new()
    };

    let params = method
        .params
        .iter()
        .map(|param| ctx.registry.close_term(param, &generics))
        .collect::<TypeResult<Vec<_>>>()?;
    let return_type = ctx.registry.close_term(&method.return_type, &generics)?;

    let mut args = Vec::with_capacity(site.args.len());
    for (arg, param) in site.args.iter().zip(&params) {
        args.push(ExpressionChecker::check_against(ctx, arg, *param)?);
    }

    Ok(Attempt {
        candidate: candidate.clone(),
        generics,
        params,
        return_type,
        args,
    })
}

/// Whether every parameter of `a` is a subtype of the matching parameter of `b`
fn at_least_as_specific(registry: &TypeRegistry, a: &Attempt, b: &Attempt) -> bool {
    a.params
        .iter()
        .zip(&b.params)
        .all(|(a, b)| registry.is_subtype(*a, *b))
}

fn most_specific(registry: &TypeRegistry, mut accepted: Vec<Attempt>, site: &CallSite<'_>) -> TypeResult<Attempt> {
    if accepted.len() == 1 {
        return Ok(accepted.remove(0));
    }

    let strictly_best: Vec<usize> = (0..accepted.len())
        .filter(|&i| {
            (0..accepted.len()).all(|j| {
                i == j
                    || (at_least_as_specific(registry, &accepted[i], &accepted[j])
                        && !at_least_as_specific(registry, &accepted[j], &accepted[i]))
            })
        })
        .collect();

    match strictly_best.as_slice() {
        [index] => Ok(accepted.swap_remove(*index)),
        _ => Err(TypecheckError::AmbiguousOverload {
            receiver: registry.name(site.receiver),
            method: site.method.to_string(),
            candidates: accepted
                .iter()
                .map(|attempt| describe_method(registry, &attempt.candidate.method))
                .collect(),
            span: to_source_span(Some(site.span)),
        }),
    }
}

/// Turn the winning attempt into a resolution
///
/// Outside a trial the winner has been attempted again in commit mode after
/// the registry was rolled back, so its arguments register their closure
/// types and queue generic callee bodies.
fn commit(ctx: &mut CheckContext<'_>, winner: Attempt) -> TypeResult<Resolution> {
    let Candidate { method_ref, method } = winner.candidate;
    if method.is_generic() && method.has_source_body() {
        ctx.request(MethodInstance {
            method: method_ref,
            generics: winner.generics.clone(),
        });
    }

    debug!(
        method = %describe_method(&ctx.registry, &method),
        generics = ?winner.generics.iter().map(|generic| ctx.registry.name(*generic)).collect::<Vec<_>>(),
        speculative = ctx.is_speculative(),
        "resolved call"
    );

    Ok(Resolution {
        method_ref,
        method,
        generics: winner.generics,
        params: winner.params,
        return_type: winner.return_type,
        args: winner.args,
    })
}

fn no_suitable_overload(ctx: &mut CheckContext<'_>, site: &CallSite<'_>) -> TypeResult<TypecheckError> {
    let mut arguments = Vec::with_capacity(site.args.len());
    for arg in site.args {
        let name = match ctx.trial(|ctx| ExpressionChecker::check(ctx, arg, None))? {
            Trial::Accepted(typed) => ctx.registry.name(typed.ty),
            Trial::Rejected(_) => "_".to_string(),
        };
        arguments.push(name);
    }
    Ok(TypecheckError::NoSuitableOverload {
        receiver: ctx.registry.name(site.receiver),
        method: site.method.to_string(),
        arguments,
        span: to_source_span(Some(site.span)),
    })
}
