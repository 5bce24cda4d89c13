//! Type registry and instantiator
//!
//! Concrete types live in an arena indexed by [`Handle`]. Each arena slot is
//! either `Pending` (its template builder is still running) or `Resolved`.
//! Instantiation is memoized per `(template, generic handles)`, and the memo
//! entry is inserted before the builder runs so that a type mentioning itself
//! receives its own pending handle instead of recursing.
//!
//! Reading a pending slot is an internal error: the only code allowed to see a
//! pending handle is the instantiation that created it, and that code only
//! passes the handle around.

use crate::ast::{ExtensionDecl, Span, TypeRef};
use crate::error::{to_source_span, TypeResult, TypecheckError};
use crate::templates::builtin::{Builtin, BuiltinTemplate};
use crate::templates::{BuildContext, TypeTemplate};
use crate::types::{
    ConcreteType, Field, FieldRef, Handle, LeafField, LiteralKind, Method, MethodBody, MethodRef,
    NumericKind, StorageCategory, TemplateId, TypeLayout, TypeTerm,
};
use indexmap::IndexMap;
use std::collections::HashMap;
use std::rc::Rc;
use tracing::{debug, trace};

#[derive(Debug, Clone)]
enum Slot {
    Pending {
        template: TemplateId,
        generics: Vec<Handle>,
    },
    Resolved(ConcreteType),
}

/// An extension declaration applied to every instantiation of its target
#[derive(Debug, Clone)]
struct Extension {
    index: usize,
    decl: Rc<ExtensionDecl>,
}

/// Size of the registry at one point, for undoing speculative instantiations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryMark {
    slots: usize,
    templates: usize,
}

#[derive(Debug, Clone)]
pub struct TypeRegistry {
    templates: Vec<TypeTemplate>,
    slots: Vec<Slot>,
    memo: HashMap<TemplateId, IndexMap<Vec<Handle>, Handle>>,
    in_progress: Vec<Handle>,
    extensions: HashMap<TemplateId, Vec<Extension>>,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    /// Create a registry with every builtin template registered
    pub fn new() -> Self {
        let mut registry = Self {
            templates: Vec::new(),
            slots: Vec::new(),
            memo: HashMap::new(),
            in_progress: Vec::new(),
            extensions: HashMap::new(),
        };

        for builtin in Builtin::ALL {
            registry.register_template(TypeTemplate {
                name: builtin.name().to_string(),
                arity: builtin.arity(),
                category: builtin.category(),
                builder: Rc::new(BuiltinTemplate { builtin }),
                span: Span::default(),
            });
        }

        registry
    }

    pub fn register_template(&mut self, template: TypeTemplate) -> TemplateId {
        let id = TemplateId(self.templates.len() as u32);
        trace!(template = %template.name, id = id.0, "registering template");
        self.templates.push(template);
        id
    }

    pub fn template(&self, id: TemplateId) -> TypeResult<&TypeTemplate> {
        self.templates.get(id.index()).ok_or_else(|| {
            TypecheckError::internal(format!("unknown template id {}", id.0))
        })
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// Register an extension and append its methods to already existing instantiations
    pub fn register_extension(&mut self, index: usize, decl: &ExtensionDecl) -> TypeResult<()> {
        let extension = Extension {
            index,
            decl: Rc::new(decl.clone()),
        };
        let existing = self.instantiations_of(decl.target);
        for handle in existing {
            let generics = self.get(handle)?.generics.clone();
            for method in self.extension_methods(&extension, decl.target, handle, &generics)? {
                self.add_extension_method(handle, method)?;
            }
        }
        self.extensions.entry(decl.target).or_default().push(extension);
        Ok(())
    }

    /// Every instantiation of a template, in creation order
    pub fn instantiations_of(&self, template: TemplateId) -> Vec<Handle> {
        self.memo
            .get(&template)
            .map(|instances| instances.values().copied().collect())
            .unwrap_or_default()
    }

    /// Instantiate `template` with already concrete generic arguments
    pub fn instantiate(&mut self, template: TemplateId, generics: Vec<Handle>) -> TypeResult<Handle> {
        if let Some(handle) = self
            .memo
            .get(&template)
            .and_then(|instances| instances.get(&generics))
        {
            return Ok(*handle);
        }

        let definition = self.template(template)?.clone();
        if generics.len() != definition.arity {
            return Err(TypecheckError::GenericArity {
                type_name: definition.name,
                expected: definition.arity,
                found: generics.len(),
                span: None,
            });
        }

        let handle = Handle(self.slots.len() as u32);
        self.slots.push(Slot::Pending {
            template,
            generics: generics.clone(),
        });
        self.memo
            .entry(template)
            .or_default()
            .insert(generics.clone(), handle);

        debug!(
            template = %definition.name,
            handle = %handle,
            depth = self.in_progress.len(),
            "instantiating type"
        );

        self.in_progress.push(handle);
        let built = self.build(handle, template, &definition, generics);
        self.in_progress.pop();

        self.slots[handle.index()] = Slot::Resolved(built?);
        Ok(handle)
    }

    fn build(
        &mut self,
        handle: Handle,
        template: TemplateId,
        definition: &TypeTemplate,
        generics: Vec<Handle>,
    ) -> TypeResult<ConcreteType> {
        let builder = Rc::clone(&definition.builder);
        let shape = {
            let mut cx = BuildContext {
                registry: self,
                template,
                this: handle,
                generics: generics.clone(),
            };
            builder.build(&mut cx)?
        };

        let mut methods = shape.methods;
        let extensions = self.extensions.get(&template).cloned().unwrap_or_default();
        for extension in &extensions {
            methods.extend(self.extension_methods(extension, template, handle, &generics)?);
        }

        let fields: Vec<Field> = shape
            .fields
            .into_iter()
            .map(|field| Field {
                name: field.name,
                owner: handle,
                ty: field.ty,
                is_static: field.is_static,
            })
            .collect();
        let layout = self.compute_layout(handle, definition.category, shape.scalar, &fields)?;

        Ok(ConcreteType {
            template,
            name: self.display_name(&definition.name, &generics),
            generics,
            fields,
            methods,
            supertype: shape.supertype,
            numeric: shape.numeric,
            literal: shape.literal,
            layout,
        })
    }

    fn extension_methods(
        &mut self,
        extension: &Extension,
        template: TemplateId,
        handle: Handle,
        generics: &[Handle],
    ) -> TypeResult<Vec<Method>> {
        let mut cx = BuildContext {
            registry: self,
            template,
            this: handle,
            generics: generics.to_vec(),
        };
        extension
            .decl
            .methods
            .iter()
            .enumerate()
            .map(|(method, decl)| {
                cx.method_from_decl(
                    decl,
                    MethodBody::Extension {
                        extension: extension.index,
                        method,
                    },
                )
            })
            .collect()
    }

    fn compute_layout(
        &self,
        handle: Handle,
        category: StorageCategory,
        scalar: bool,
        fields: &[Field],
    ) -> TypeResult<TypeLayout> {
        let leaves = match category {
            StorageCategory::Deferred => Vec::new(),
            StorageCategory::Reference => vec![LeafField {
                path: Vec::new(),
                ty: handle,
            }],
            StorageCategory::Plural if scalar => vec![LeafField {
                path: Vec::new(),
                ty: handle,
            }],
            StorageCategory::Plural => {
                let mut leaves = Vec::new();
                for field in fields.iter().filter(|field| !field.is_static) {
                    for leaf in self.leaves_of(field.ty, handle)? {
                        let mut path = vec![field.name.clone()];
                        path.extend(leaf.path);
                        leaves.push(LeafField { path, ty: leaf.ty });
                    }
                }
                leaves
            }
        };

        Ok(TypeLayout {
            category,
            stack_width: leaves.len(),
            leaves,
        })
    }

    /// Leaves contributed by a field of type `ty` inside `owner`
    fn leaves_of(&self, ty: Handle, owner: Handle) -> TypeResult<Vec<LeafField>> {
        match self.slots.get(ty.index()) {
            Some(Slot::Resolved(concrete)) => Ok(concrete.layout.leaves.clone()),
            Some(Slot::Pending { template, .. }) => {
                // Reference width never depends on fields, so a pending
                // reference type is fine here; a pending value type is not.
                if self.template(*template)?.category == StorageCategory::Reference {
                    Ok(vec![LeafField {
                        path: Vec::new(),
                        ty,
                    }])
                } else {
                    Err(TypecheckError::InfiniteSize {
                        type_name: self.name(owner),
                        span: to_source_span(Some(self.template(*template)?.span)),
                    })
                }
            }
            None => Err(TypecheckError::internal(format!("unknown type handle {ty}"))),
        }
    }

    fn display_name(&self, template_name: &str, generics: &[Handle]) -> String {
        if generics.is_empty() {
            template_name.to_string()
        } else {
            let args: Vec<String> = generics.iter().map(|generic| self.name(*generic)).collect();
            format!("{}<{}>", template_name, args.join(", "))
        }
    }

    /// Display name of a type; also answers for pending types
    pub fn name(&self, handle: Handle) -> String {
        match self.slots.get(handle.index()) {
            Some(Slot::Resolved(concrete)) => concrete.name.clone(),
            Some(Slot::Pending { template, generics }) => {
                let template_name = self
                    .templates
                    .get(template.index())
                    .map(|definition| definition.name.as_str())
                    .unwrap_or("?");
                self.display_name(template_name, generics)
            }
            None => format!("<invalid {handle}>"),
        }
    }

    pub fn get(&self, handle: Handle) -> TypeResult<&ConcreteType> {
        match self.slots.get(handle.index()) {
            Some(Slot::Resolved(concrete)) => Ok(concrete),
            Some(Slot::Pending { .. }) => Err(TypecheckError::internal(format!(
                "type {} read while it is still being instantiated",
                self.name(handle)
            ))),
            None => Err(TypecheckError::internal(format!("unknown type handle {handle}"))),
        }
    }

    pub fn try_get(&self, handle: Handle) -> Option<&ConcreteType> {
        match self.slots.get(handle.index()) {
            Some(Slot::Resolved(concrete)) => Some(concrete),
            _ => None,
        }
    }

    pub fn is_pending(&self, handle: Handle) -> bool {
        matches!(self.slots.get(handle.index()), Some(Slot::Pending { .. }))
    }

    /// Template of a type, pending or not
    pub fn template_of(&self, handle: Handle) -> TypeResult<TemplateId> {
        match self.slots.get(handle.index()) {
            Some(Slot::Resolved(concrete)) => Ok(concrete.template),
            Some(Slot::Pending { template, .. }) => Ok(*template),
            None => Err(TypecheckError::internal(format!("unknown type handle {handle}"))),
        }
    }

    /// All handles in creation order
    pub fn handles(&self) -> impl Iterator<Item = Handle> {
        (0..self.slots.len() as u32).map(Handle)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn mark(&self) -> RegistryMark {
        RegistryMark {
            slots: self.slots.len(),
            templates: self.templates.len(),
        }
    }

    /// Forget every type and template created after `mark`
    ///
    /// Handles are positional, so nothing created before the mark can refer
    /// to what is dropped here.
    pub fn rollback(&mut self, mark: RegistryMark) {
        if self.slots.len() <= mark.slots && self.templates.len() <= mark.templates {
            return;
        }
        trace!(
            dropped = self.slots.len().saturating_sub(mark.slots),
            "rolling back speculative instantiations"
        );
        self.slots.truncate(mark.slots);
        self.templates.truncate(mark.templates);
        self.memo.retain(|template, _| template.index() < mark.templates);
        for instances in self.memo.values_mut() {
            instances.retain(|_, handle| handle.index() < mark.slots);
        }
    }

    pub fn method(&self, method: MethodRef) -> TypeResult<&Method> {
        self.get(method.owner)?
            .methods
            .get(method.index)
            .ok_or_else(|| TypecheckError::internal(format!("unknown method {method:?}")))
    }

    pub fn field(&self, field: FieldRef) -> TypeResult<&Field> {
        self.get(field.owner)?
            .fields
            .get(field.index)
            .ok_or_else(|| TypecheckError::internal(format!("unknown field {field:?}")))
    }

    /// Append a method to an existing type
    pub fn add_extension_method(&mut self, handle: Handle, method: Method) -> TypeResult<MethodRef> {
        match self.slots.get_mut(handle.index()) {
            Some(Slot::Resolved(concrete)) => {
                concrete.methods.push(method);
                Ok(MethodRef {
                    owner: handle,
                    index: concrete.methods.len() - 1,
                })
            }
            _ => Err(TypecheckError::internal(format!(
                "cannot extend {} before it is resolved",
                self.name(handle)
            ))),
        }
    }

    /// Proper supertypes of a type, nearest first
    pub fn supertype_chain(&self, handle: Handle) -> Vec<Handle> {
        let mut chain = Vec::new();
        let mut current = self.try_get(handle).and_then(|concrete| concrete.supertype);
        while let Some(next) = current {
            if next == handle || chain.contains(&next) {
                break;
            }
            chain.push(next);
            current = self.try_get(next).and_then(|concrete| concrete.supertype);
        }
        chain
    }

    /// Subtyping: identity, the declared supertype chain, and the literal
    /// pseudo-supertypes (every numeric kind a literal could become)
    pub fn is_subtype(&self, sub: Handle, sup: Handle) -> bool {
        if sub == sup {
            return true;
        }
        if let (Some(literal), Some(numeric)) = (self.literal_kind(sub), self.numeric_kind(sup)) {
            return numeric.accepts_literal(literal);
        }
        self.supertype_chain(sub).contains(&sup)
    }

    /// Whether a value of type `from` may flow into a slot of type `to`
    ///
    /// Subtyping plus the one literal widening: an integer literal may become
    /// a float literal.
    pub fn is_assignable(&self, from: Handle, to: Handle) -> bool {
        self.is_subtype(from, to)
            || (self.literal_kind(from) == Some(LiteralKind::Int)
                && self.literal_kind(to) == Some(LiteralKind::Float))
    }

    pub fn numeric_kind(&self, handle: Handle) -> Option<NumericKind> {
        self.try_get(handle).and_then(|concrete| concrete.numeric)
    }

    pub fn literal_kind(&self, handle: Handle) -> Option<LiteralKind> {
        self.try_get(handle).and_then(|concrete| concrete.literal)
    }

    pub fn is_deferred(&self, handle: Handle) -> bool {
        self.literal_kind(handle).is_some()
    }

    pub fn is_reference(&self, handle: Handle) -> bool {
        self.try_get(handle)
            .map(ConcreteType::is_reference)
            .unwrap_or(false)
    }

    pub fn layout(&self, handle: Handle) -> TypeResult<TypeLayout> {
        Ok(self.get(handle)?.layout.clone())
    }

    pub fn builtin(&mut self, builtin: Builtin) -> TypeResult<Handle> {
        self.instantiate(builtin.id(), Vec::new())
    }

    pub fn unit(&mut self) -> TypeResult<Handle> {
        self.builtin(Builtin::Unit)
    }

    pub fn bool(&mut self) -> TypeResult<Handle> {
        self.builtin(Builtin::Bool)
    }

    pub fn str(&mut self) -> TypeResult<Handle> {
        self.builtin(Builtin::Str)
    }

    pub fn numeric(&mut self, kind: NumericKind) -> TypeResult<Handle> {
        self.builtin(Builtin::numeric(kind))
    }

    pub fn literal(&mut self, kind: LiteralKind) -> TypeResult<Handle> {
        self.builtin(Builtin::literal(kind))
    }

    pub fn option_of(&mut self, value: Handle) -> TypeResult<Handle> {
        self.instantiate(Builtin::Option.id(), vec![value])
    }

    pub fn list_of(&mut self, element: Handle) -> TypeResult<Handle> {
        self.instantiate(Builtin::List.id(), vec![element])
    }

    /// `FnN<ret, params...>`
    pub fn function_interface(&mut self, params: &[Handle], ret: Handle, span: Span) -> TypeResult<Handle> {
        let interface = Builtin::function(params.len())
            .ok_or_else(|| TypecheckError::undeclared("function interface", format!("Fn{}", params.len()), span))?;
        let mut generics = vec![ret];
        generics.extend_from_slice(params);
        self.instantiate(interface.id(), generics)
    }

    /// Parameter and return types if `handle` is a function interface
    pub fn function_signature(&self, handle: Handle) -> Option<(Vec<Handle>, Handle)> {
        let concrete = self.try_get(handle)?;
        Builtin::from_id(concrete.template)?.function_arity()?;
        let (ret, params) = concrete.generics.split_first()?;
        Some((params.to_vec(), *ret))
    }

    /// Instantiate a source type reference
    pub fn instantiate_ref(
        &mut self,
        type_ref: &TypeRef,
        type_generics: &[Handle],
        method_generics: &[Handle],
    ) -> TypeResult<Handle> {
        match type_ref {
            TypeRef::TypeParam { index, span } => type_generics.get(*index).copied().ok_or_else(|| {
                TypecheckError::undeclared("type parameter", format!("#{index}"), *span)
            }),
            TypeRef::MethodParam { index, span } => {
                method_generics.get(*index).copied().ok_or_else(|| {
                    TypecheckError::undeclared("method type parameter", format!("#{index}"), *span)
                })
            }
            TypeRef::Named {
                template,
                args,
                span,
            } => {
                let definition = self.template(*template)?;
                if definition.arity != args.len() {
                    return Err(TypecheckError::GenericArity {
                        type_name: definition.name.clone(),
                        expected: definition.arity,
                        found: args.len(),
                        span: to_source_span(Some(*span)),
                    });
                }
                let generics = args
                    .iter()
                    .map(|arg| self.instantiate_ref(arg, type_generics, method_generics))
                    .collect::<TypeResult<Vec<_>>>()?;
                self.instantiate(*template, generics)
            }
        }
    }

    /// Instantiate a signature term with every method generic bound
    pub fn close_term(&mut self, term: &TypeTerm, method_generics: &[Handle]) -> TypeResult<Handle> {
        match term {
            TypeTerm::Concrete(handle) => Ok(*handle),
            TypeTerm::MethodGeneric(index) => method_generics.get(*index).copied().ok_or_else(|| {
                TypecheckError::internal(format!("method generic {index} is not bound"))
            }),
            TypeTerm::Applied { template, args } => {
                let generics = args
                    .iter()
                    .map(|arg| self.close_term(arg, method_generics))
                    .collect::<TypeResult<Vec<_>>>()?;
                self.instantiate(*template, generics)
            }
        }
    }

    /// Instantiate a term if every generic it mentions has a binding
    pub fn try_close(
        &mut self,
        term: &TypeTerm,
        bindings: &[Option<Handle>],
    ) -> TypeResult<Option<Handle>> {
        if term.contains_unknown(bindings) {
            return Ok(None);
        }
        let bound: Vec<Handle> = bindings
            .iter()
            .map(|binding| binding.unwrap_or(Handle(u32::MAX)))
            .collect();
        self.close_term(term, &bound).map(Some)
    }

    /// Replace closed `Applied` sub-terms by their instantiation
    pub fn normalize(&mut self, term: &TypeTerm) -> TypeResult<TypeTerm> {
        if !term.mentions_generic() {
            return Ok(TypeTerm::Concrete(self.close_term(term, &[])?));
        }
        match term {
            TypeTerm::Applied { template, args } => Ok(TypeTerm::Applied {
                template: *template,
                args: args
                    .iter()
                    .map(|arg| self.normalize(arg))
                    .collect::<TypeResult<Vec<_>>>()?,
            }),
            other => Ok(other.clone()),
        }
    }
}
