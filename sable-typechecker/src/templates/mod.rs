//! Type templates and their member builders
//!
//! A template is an uninstantiated type definition. Instantiating it runs its
//! `TemplateBuilder` with the concrete generic arguments and the handle the
//! registry reserved for the result, which may still be pending while the
//! builder runs (a type may mention itself).
//!
//! Three builders exist:
//! - [`builtin::BuiltinTemplate`]: numerics, `bool`, `str`, `List`, `Option`,
//!   tuples, function interfaces and the deferred literal types
//! - [`declared::DeclaredTemplate`]: classes, structs and enums from the program
//! - [`closure::ClosureTemplate`]: the implementation type of one lambda

pub mod builtin;
pub mod closure;
pub mod declared;

use crate::ast::{MethodDecl, MethodDeclKind, Span, TypeRef};
use crate::error::{TypeResult, TypecheckError};
use crate::registry::TypeRegistry;
use crate::types::{
    Handle, LiteralKind, Method, MethodBody, MethodKind, NumericKind, StorageCategory, TemplateId,
    TypeTerm,
};
use std::fmt;
use std::rc::Rc;

/// Produces the members of one instantiation of a template
pub trait TemplateBuilder: fmt::Debug {
    fn build(&self, cx: &mut BuildContext<'_>) -> TypeResult<TypeShape>;
}

/// A registered template
#[derive(Debug, Clone)]
pub struct TypeTemplate {
    pub name: String,
    pub arity: usize,
    pub category: StorageCategory,
    pub builder: Rc<dyn TemplateBuilder>,
    pub span: Span,
}

/// A field as produced by a builder; owner is filled in by the registry
#[derive(Debug, Clone, PartialEq)]
pub struct FieldShape {
    pub name: String,
    pub ty: Handle,
    pub is_static: bool,
}

/// Everything a builder decides about a concrete type
#[derive(Debug, Clone, Default)]
pub struct TypeShape {
    pub fields: Vec<FieldShape>,
    pub methods: Vec<Method>,
    pub supertype: Option<Handle>,
    pub numeric: Option<NumericKind>,
    pub literal: Option<LiteralKind>,
    /// Stored as a single primitive slot rather than through its fields
    pub scalar: bool,
}

/// State handed to a builder while one instantiation is in progress
pub struct BuildContext<'r> {
    pub registry: &'r mut TypeRegistry,
    pub template: TemplateId,
    /// The handle being built; still pending until the builder returns
    pub this: Handle,
    pub generics: Vec<Handle>,
}

impl<'r> BuildContext<'r> {
    /// Generic argument `index` of the type being built
    pub fn generic(&self, index: usize) -> TypeResult<Handle> {
        self.generics.get(index).copied().ok_or_else(|| {
            TypecheckError::internal(format!(
                "generic argument {index} requested from a {}-ary instantiation",
                self.generics.len()
            ))
        })
    }

    /// Instantiate a type reference that may only mention type-level generics
    pub fn instantiate_ref(&mut self, type_ref: &TypeRef) -> TypeResult<Handle> {
        let generics = self.generics.clone();
        self.registry.instantiate_ref(type_ref, &generics, &[])
    }

    pub fn instantiate(&mut self, template: TemplateId, generics: Vec<Handle>) -> TypeResult<Handle> {
        self.registry.instantiate(template, generics)
    }

    /// Convert a signature type into a lazily instantiated term
    pub fn term_of(&self, type_ref: &TypeRef) -> TypeResult<TypeTerm> {
        match type_ref {
            TypeRef::TypeParam { index, .. } => Ok(TypeTerm::Concrete(self.generic(*index)?)),
            TypeRef::MethodParam { index, .. } => Ok(TypeTerm::MethodGeneric(*index)),
            TypeRef::Named { template, args, .. } => Ok(TypeTerm::Applied {
                template: *template,
                args: args
                    .iter()
                    .map(|arg| self.term_of(arg))
                    .collect::<TypeResult<Vec<_>>>()?,
            }),
        }
    }

    /// Build a method from its declaration for the type in progress
    pub fn method_from_decl(&mut self, decl: &MethodDecl, body: MethodBody) -> TypeResult<Method> {
        let kind = match decl.kind {
            MethodDeclKind::Instance => MethodKind::Instance,
            MethodDeclKind::Static => MethodKind::Static,
            MethodDeclKind::Constructor => MethodKind::Constructor,
        };
        let params = decl
            .params
            .iter()
            .map(|param| self.term_of(&param.ty))
            .collect::<TypeResult<Vec<_>>>()?;
        let return_type = match (kind, &decl.return_type) {
            (MethodKind::Constructor, _) => TypeTerm::Concrete(self.this),
            (_, Some(ty)) => self.term_of(ty)?,
            (_, None) => TypeTerm::Concrete(self.registry.unit()?),
        };

        Ok(Method {
            name: decl.name.clone(),
            owner: self.this,
            kind,
            param_names: decl.params.iter().map(|param| param.name.clone()).collect(),
            params,
            return_type,
            generic_arity: decl.generic_params.len(),
            is_const: decl.is_const,
            body,
            span: decl.span,
        })
    }

    /// Helper for builtin members
    pub fn builtin_method(
        &self,
        name: &str,
        kind: MethodKind,
        params: Vec<TypeTerm>,
        return_type: TypeTerm,
        body: MethodBody,
    ) -> Method {
        let param_names = (0..params.len()).map(|i| format!("arg{i}")).collect();
        Method {
            name: name.to_string(),
            owner: self.this,
            kind,
            param_names,
            params,
            return_type,
            generic_arity: 0,
            is_const: false,
            body,
            span: Span::default(),
        }
    }
}
