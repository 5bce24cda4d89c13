//! Implementation types of lambdas
//!
//! Every lambda checked in commit mode gets its own template: the captured
//! locals become fields, the function interface it satisfies becomes its
//! supertype and its typed body hangs off a single `call` method.

use super::{BuildContext, FieldShape, TemplateBuilder, TypeShape};
use crate::ast::Span;
use crate::error::TypeResult;
use crate::types::{Handle, MethodBody, MethodKind, TypeTerm};

#[derive(Debug, Clone)]
pub struct ClosureTemplate {
    /// Index of the closure record kept by the checker
    pub closure: usize,
    pub captures: Vec<(String, Handle)>,
    pub param_names: Vec<String>,
    pub params: Vec<Handle>,
    pub return_type: Handle,
    pub span: Span,
}

impl ClosureTemplate {
    pub fn name(closure: usize) -> String {
        format!("{{closure#{closure}}}")
    }
}

impl TemplateBuilder for ClosureTemplate {
    fn build(&self, cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
        let interface = cx
            .registry
            .function_interface(&self.params, self.return_type, self.span)?;

        let fields = self
            .captures
            .iter()
            .map(|(name, ty)| FieldShape {
                name: name.clone(),
                ty: *ty,
                is_static: false,
            })
            .collect();

        let mut call = cx.builtin_method(
            "call",
            MethodKind::Instance,
            self.params.iter().copied().map(TypeTerm::Concrete).collect(),
            TypeTerm::Concrete(self.return_type),
            MethodBody::Closure {
                closure: self.closure,
            },
        );
        call.param_names = self.param_names.clone();
        call.span = self.span;

        Ok(TypeShape {
            fields,
            methods: vec![call],
            supertype: Some(interface),
            ..TypeShape::default()
        })
    }
}
