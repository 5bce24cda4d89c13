//! Templates for the classes, structs and enums declared by the program

use super::{BuildContext, FieldShape, TemplateBuilder, TypeShape};
use crate::ast::{DeclKind, MethodDeclKind, TypeDecl};
use crate::error::TypeResult;
use crate::templates::builtin::Builtin;
use crate::types::{Method, MethodBody, MethodKind, StorageCategory, TypeTerm};
use std::rc::Rc;

#[derive(Debug, Clone)]
pub struct DeclaredTemplate {
    pub decl: Rc<TypeDecl>,
}

impl DeclaredTemplate {
    pub fn new(decl: &TypeDecl) -> Self {
        Self {
            decl: Rc::new(decl.clone()),
        }
    }

    pub fn category(decl: &TypeDecl) -> StorageCategory {
        match decl.kind {
            DeclKind::Class => StorageCategory::Reference,
            DeclKind::Struct | DeclKind::Enum { .. } => StorageCategory::Plural,
        }
    }
}

impl TemplateBuilder for DeclaredTemplate {
    fn build(&self, cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
        let decl = &self.decl;
        let mut fields = Vec::new();

        if let DeclKind::Enum { variants } = &decl.kind {
            fields.push(FieldShape {
                name: "ordinal".to_string(),
                ty: cx.registry.builtin(Builtin::I32)?,
                is_static: false,
            });
            for variant in variants {
                fields.push(FieldShape {
                    name: variant.clone(),
                    ty: cx.this,
                    is_static: true,
                });
            }
        }

        for field in &decl.fields {
            fields.push(FieldShape {
                name: field.name.clone(),
                ty: cx.instantiate_ref(&field.ty)?,
                is_static: field.is_static,
            });
        }

        let supertype = match (&decl.supertype, &decl.kind) {
            (Some(supertype), _) => Some(cx.instantiate_ref(supertype)?),
            (None, DeclKind::Class) => Some(cx.registry.builtin(Builtin::Object)?),
            (None, _) => None,
        };

        let mut methods = Vec::with_capacity(decl.methods.len() + 1);
        for (index, method) in decl.methods.iter().enumerate() {
            let body = if method.body.is_some() {
                MethodBody::Declared {
                    template: cx.template,
                    method: index,
                }
            } else {
                MethodBody::Abstract
            };
            methods.push(cx.method_from_decl(method, body)?);
        }

        let declares_constructor = decl
            .methods
            .iter()
            .any(|method| method.kind == MethodDeclKind::Constructor);
        if !declares_constructor && !matches!(decl.kind, DeclKind::Enum { .. }) {
            methods.push(field_init_constructor(cx, &fields));
        }

        Ok(TypeShape {
            fields,
            methods,
            supertype,
            ..TypeShape::default()
        })
    }
}

/// `new(field1, field2, ...)` assigning every instance field in order
fn field_init_constructor(cx: &BuildContext<'_>, fields: &[FieldShape]) -> Method {
    let instance_fields: Vec<&FieldShape> = fields.iter().filter(|field| !field.is_static).collect();
    let mut constructor = cx.builtin_method(
        "new",
        MethodKind::Constructor,
        instance_fields
            .iter()
            .map(|field| TypeTerm::Concrete(field.ty))
            .collect(),
        TypeTerm::Concrete(cx.this),
        MethodBody::FieldInit,
    );
    constructor.param_names = instance_fields
        .iter()
        .map(|field| field.name.clone())
        .collect();
    constructor
}
