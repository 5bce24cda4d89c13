//! Type system core components
//!
//! This module contains the data model shared by the registry, the dispatcher
//! and the checker:
//! - Template and instantiation identifiers (`TemplateId`, `Handle`)
//! - Concrete types with their fields, methods and storage layout
//! - Method-signature terms that may still mention method generics
//! - Numeric kinds and builtin intrinsics

pub mod intrinsic;
pub mod numeric;

pub use intrinsic::{BinaryOp, CompareOp, Intrinsic, LogicOp, UnaryOp};
pub use numeric::{FloatKind, IntKind, LiteralKind, NumericKind, NUMERIC_KINDS};

use crate::ast::Span;
use std::fmt;

/// Index of a registered type template
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TemplateId(pub u32);

impl TemplateId {
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Id of the `n`th declared type of a program; declared templates follow the builtins
    pub fn declared(n: usize) -> Self {
        Self((crate::templates::builtin::builtin_count() + n) as u32)
    }
}

/// Stable identifier of one concrete instantiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(pub(crate) u32);

impl Handle {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How values of a type are stored
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageCategory {
    /// Identity-bearing, always one slot
    Reference,
    /// No identity; stored as the flattened concatenation of its fields
    Plural,
    /// Unresolved numeric literal; never stored
    Deferred,
}

/// One flattened storage slot of a type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafField {
    /// Field names from the outer type down to the leaf; empty for scalars and references
    pub path: Vec<String>,
    pub ty: Handle,
}

/// Storage description handed to code generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLayout {
    pub category: StorageCategory,
    pub stack_width: usize,
    pub leaves: Vec<LeafField>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub owner: Handle,
    pub ty: Handle,
    pub is_static: bool,
}

/// A type as written in a method signature
///
/// Type-level generics are already substituted; method generics stay abstract
/// until a call binds them. `Applied` terms are instantiated lazily.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeTerm {
    Concrete(Handle),
    MethodGeneric(usize),
    Applied {
        template: TemplateId,
        args: Vec<TypeTerm>,
    },
}

impl TypeTerm {
    /// Whether any method generic occurs in this term
    pub fn mentions_generic(&self) -> bool {
        match self {
            TypeTerm::Concrete(_) => false,
            TypeTerm::MethodGeneric(_) => true,
            TypeTerm::Applied { args, .. } => args.iter().any(TypeTerm::mentions_generic),
        }
    }

    /// Whether this term still contains a method generic with no binding
    pub fn contains_unknown(&self, bindings: &[Option<Handle>]) -> bool {
        match self {
            TypeTerm::Concrete(_) => false,
            TypeTerm::MethodGeneric(index) => !matches!(bindings.get(*index), Some(Some(_))),
            TypeTerm::Applied { args, .. } => args.iter().any(|arg| arg.contains_unknown(bindings)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodKind {
    Instance,
    Static,
    Constructor,
}

/// Where the body of a method lives; evaluated lazily by the body-checking loop
#[derive(Debug, Clone, PartialEq)]
pub enum MethodBody {
    /// No body (function-interface `call`)
    Abstract,
    Intrinsic(Intrinsic),
    /// Synthesized constructor assigning its parameters to the non-static fields
    FieldInit,
    /// `methods[method]` of the declared type behind `template`
    Declared { template: TemplateId, method: usize },
    /// `methods[method]` of `program.extensions[extension]`
    Extension { extension: usize, method: usize },
    /// Typed body of a lambda recorded by the checker
    Closure { closure: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub owner: Handle,
    pub kind: MethodKind,
    pub param_names: Vec<String>,
    pub params: Vec<TypeTerm>,
    pub return_type: TypeTerm,
    pub generic_arity: usize,
    pub is_const: bool,
    pub body: MethodBody,
    pub span: Span,
}

impl Method {
    /// The constant-folding hook of a const builtin operator
    pub fn fold_hook(&self) -> Option<Intrinsic> {
        match self.body {
            MethodBody::Intrinsic(op) if self.is_const && op.is_foldable() => Some(op),
            _ => None,
        }
    }

    pub fn is_generic(&self) -> bool {
        self.generic_arity > 0
    }

    /// Whether the body has to be type checked from source
    pub fn has_source_body(&self) -> bool {
        matches!(
            self.body,
            MethodBody::Declared { .. } | MethodBody::Extension { .. } | MethodBody::Closure { .. }
        )
    }
}

/// Reference to a method of a concrete type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    pub owner: Handle,
    pub index: usize,
}

/// Reference to a field of a concrete type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FieldRef {
    pub owner: Handle,
    pub index: usize,
}

/// A method of a concrete type with its method generics bound
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodInstance {
    pub method: MethodRef,
    pub generics: Vec<Handle>,
}

/// The resolved product of a template and its generic arguments
#[derive(Debug, Clone, PartialEq)]
pub struct ConcreteType {
    pub template: TemplateId,
    pub name: String,
    pub generics: Vec<Handle>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    pub supertype: Option<Handle>,
    pub numeric: Option<NumericKind>,
    pub literal: Option<LiteralKind>,
    pub layout: TypeLayout,
}

impl ConcreteType {
    pub fn category(&self) -> StorageCategory {
        self.layout.category
    }

    pub fn stack_width(&self) -> usize {
        self.layout.stack_width
    }

    pub fn is_reference(&self) -> bool {
        self.layout.category == StorageCategory::Reference
    }

    pub fn is_deferred(&self) -> bool {
        self.layout.category == StorageCategory::Deferred
    }

    /// Index of the instance field called `name`
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.name == name && !field.is_static)
    }

    /// Index of the static field called `name`
    pub fn static_field_index(&self, name: &str) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.name == name && field.is_static)
    }
}
