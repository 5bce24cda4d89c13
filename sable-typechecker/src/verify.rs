//! One-time verification of every type reference in a program
//!
//! Runs before checking so that instantiation can assume well-formed
//! references:
//! - every template id exists and receives the right number of arguments
//! - type and method parameter indices are in scope
//! - deferred literal types never appear in source positions
//! - supertypes are only declared by classes, and name a class
//! - extensions declare exactly as many generics as their target

use crate::ast::{DeclKind, Expr, MethodDecl, Program, TypeRef};
use crate::error::{to_source_span, TypeResult, TypecheckError};
use crate::registry::TypeRegistry;
use crate::templates::builtin::Builtin;
use crate::types::{StorageCategory, TemplateId};

/// Generic parameters in scope at a reference
#[derive(Debug, Clone, Copy)]
struct Scope {
    type_params: usize,
    method_params: usize,
}

pub fn verify_program(registry: &TypeRegistry, program: &Program) -> TypeResult<()> {
    for decl in &program.types {
        let scope = Scope {
            type_params: decl.generic_params.len(),
            method_params: 0,
        };

        for field in &decl.fields {
            verify_ref(registry, &field.ty, scope)?;
        }
        if let Some(supertype) = &decl.supertype {
            verify_ref(registry, supertype, scope)?;
            verify_supertype(registry, program, &decl.kind, supertype)?;
        }
        for method in &decl.methods {
            verify_method(registry, method, scope)?;
        }
    }

    for extension in &program.extensions {
        let target = registry.template(extension.target).map_err(|_| {
            TypecheckError::undeclared("type", format!("#{}", extension.target.0), extension.span)
        })?;
        if target.arity != extension.generic_params.len() {
            return Err(TypecheckError::GenericArity {
                type_name: target.name.clone(),
                expected: target.arity,
                found: extension.generic_params.len(),
                span: to_source_span(Some(extension.span)),
            });
        }
        let scope = Scope {
            type_params: extension.generic_params.len(),
            method_params: 0,
        };
        for method in &extension.methods {
            verify_method(registry, method, scope)?;
        }
    }

    if let Some(entry) = &program.entry {
        verify_expr(
            registry,
            entry,
            Scope {
                type_params: 0,
                method_params: 0,
            },
        )?;
    }

    Ok(())
}

fn verify_method(registry: &TypeRegistry, method: &MethodDecl, scope: Scope) -> TypeResult<()> {
    let scope = Scope {
        method_params: method.generic_params.len(),
        ..scope
    };
    for param in &method.params {
        verify_ref(registry, &param.ty, scope)?;
    }
    if let Some(return_type) = &method.return_type {
        verify_ref(registry, return_type, scope)?;
    }
    if let Some(body) = &method.body {
        verify_expr(registry, body, scope)?;
    }
    Ok(())
}

fn verify_expr(registry: &TypeRegistry, expr: &Expr, scope: Scope) -> TypeResult<()> {
    let mut result = Ok(());
    expr.visit_type_refs(&mut |type_ref| {
        if result.is_ok() {
            result = verify_ref(registry, type_ref, scope);
        }
    });
    result
}

fn verify_ref(registry: &TypeRegistry, type_ref: &TypeRef, scope: Scope) -> TypeResult<()> {
    match type_ref {
        TypeRef::TypeParam { index, span } => {
            if *index >= scope.type_params {
                return Err(TypecheckError::undeclared("type parameter", format!("#{index}"), *span));
            }
        }
        TypeRef::MethodParam { index, span } => {
            if *index >= scope.method_params {
                return Err(TypecheckError::undeclared(
                    "method type parameter",
                    format!("#{index}"),
                    *span,
                ));
            }
        }
        TypeRef::Named {
            template,
            args,
            span,
        } => {
            let definition = registry
                .template(*template)
                .map_err(|_| TypecheckError::undeclared("type", format!("#{}", template.0), *span))?;
            if definition.category == StorageCategory::Deferred {
                return Err(TypecheckError::type_mismatch(
                    "a storable type",
                    definition.name.clone(),
                    *span,
                ));
            }
            if definition.arity != args.len() {
                return Err(TypecheckError::GenericArity {
                    type_name: definition.name.clone(),
                    expected: definition.arity,
                    found: args.len(),
                    span: to_source_span(Some(*span)),
                });
            }
            for arg in args {
                verify_ref(registry, arg, scope)?;
            }
        }
    }
    Ok(())
}

fn verify_supertype(
    registry: &TypeRegistry,
    program: &Program,
    kind: &DeclKind,
    supertype: &TypeRef,
) -> TypeResult<()> {
    let span = supertype.span();
    let found = match supertype {
        TypeRef::Named { template, .. } => registry.template(*template)?.name.clone(),
        TypeRef::TypeParam { .. } | TypeRef::MethodParam { .. } => "a type parameter".to_string(),
    };

    if *kind != DeclKind::Class {
        return Err(TypecheckError::type_mismatch("no supertype on a value type", found, span));
    }

    let names_class = match supertype {
        TypeRef::Named { template, .. } if *template == Builtin::Object.id() => true,
        TypeRef::Named { template, .. } => template
            .index()
            .checked_sub(TemplateId::declared(0).index())
            .and_then(|index| program.types.get(index))
            .map(|decl| decl.kind == DeclKind::Class)
            .unwrap_or(false),
        _ => false,
    };
    if !names_class {
        return Err(TypecheckError::type_mismatch("a class type", found, span));
    }
    Ok(())
}
