//! Candidate collection for overload resolution
//!
//! Candidates come from the receiver type and then its supertype chain. A
//! method whose signature key (name, parameter terms, generic arity) was
//! already seen lower in the chain is shadowed by that override. Static
//! methods and constructors are never inherited.

use crate::error::TypeResult;
use crate::registry::TypeRegistry;
use crate::types::{Handle, Method, MethodKind, MethodRef, TypeTerm};
use std::collections::HashSet;

/// Syntactic shape of a call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallForm {
    /// `receiver.name(args)`
    Instance,
    /// `Type.name(args)`
    Static,
    /// `new Type(args)`; matches constructors of any name
    Constructor,
}

impl CallForm {
    fn admits(self, kind: MethodKind) -> bool {
        matches!(
            (self, kind),
            (CallForm::Instance, MethodKind::Instance)
                | (CallForm::Static, MethodKind::Static)
                | (CallForm::Constructor, MethodKind::Constructor)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SignatureKey {
    pub name: String,
    pub params: Vec<TypeTerm>,
    pub generic_arity: usize,
}

#[derive(Debug, Clone)]
pub struct Candidate {
    pub method_ref: MethodRef,
    pub method: Method,
}

pub fn signature_key(registry: &mut TypeRegistry, method: &Method) -> TypeResult<SignatureKey> {
    Ok(SignatureKey {
        name: method.name.clone(),
        params: method
            .params
            .iter()
            .map(|param| registry.normalize(param))
            .collect::<TypeResult<Vec<_>>>()?,
        generic_arity: method.generic_arity,
    })
}

/// Collect the methods a call could resolve to
pub fn collect_candidates(
    registry: &mut TypeRegistry,
    receiver: Handle,
    name: &str,
    form: CallForm,
    arg_count: usize,
    explicit_generics: usize,
) -> TypeResult<Vec<Candidate>> {
    let owners: Vec<Handle> = match form {
        CallForm::Instance => std::iter::once(receiver)
            .chain(registry.supertype_chain(receiver))
            .collect(),
        CallForm::Static | CallForm::Constructor => vec![receiver],
    };

    // Keys seen on types lower in the chain; overloads on one type never shadow each other
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for owner in owners {
        let mut local = HashSet::new();
        let methods = registry.get(owner)?.methods.clone();
        for (index, method) in methods.into_iter().enumerate() {
            if !form.admits(method.kind) {
                continue;
            }
            if form != CallForm::Constructor && method.name != name {
                continue;
            }
            if method.params.len() != arg_count {
                continue;
            }
            if explicit_generics != 0 && explicit_generics != method.generic_arity {
                continue;
            }
            let key = signature_key(registry, &method)?;
            if seen.contains(&key) {
                continue;
            }
            local.insert(key);
            candidates.push(Candidate {
                method_ref: MethodRef { owner, index },
                method,
            });
        }
        seen.extend(local);
    }

    Ok(candidates)
}

/// Human readable signature used in diagnostics
pub fn describe_method(registry: &TypeRegistry, method: &Method) -> String {
    let params: Vec<String> = method
        .params
        .iter()
        .map(|param| describe_term(registry, param))
        .collect();
    format!(
        "{}.{}({}) -> {}",
        registry.name(method.owner),
        method.name,
        params.join(", "),
        describe_term(registry, &method.return_type)
    )
}

pub fn describe_term(registry: &TypeRegistry, term: &TypeTerm) -> String {
    match term {
        TypeTerm::Concrete(handle) => registry.name(*handle),
        TypeTerm::MethodGeneric(index) => format!("G{index}"),
        TypeTerm::Applied { template, args } => {
            let name = registry
                .template(*template)
                .map(|definition| definition.name.clone())
                .unwrap_or_default();
            let args: Vec<String> = args.iter().map(|arg| describe_term(registry, arg)).collect();
            format!("{}<{}>", name, args.join(", "))
        }
    }
}
