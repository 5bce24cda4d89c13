//! Name-resolved input tree
//!
//! The frontend hands this tree to the checker after parsing, desugaring and
//! name resolution. Types are referenced by template index, and operators,
//! indexing and augmented assignment already arrive as ordinary method calls
//! (`a + b` is `a.add(b)`, `xs[i] = v` is `xs.set(i, v)`).

use crate::types::TemplateId;
use num_bigint::BigInt;

/// Byte range in the source file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A resolved reference to a type
#[derive(Debug, Clone, PartialEq)]
pub enum TypeRef {
    Named {
        template: TemplateId,
        args: Vec<TypeRef>,
        span: Span,
    },
    /// Generic parameter of the enclosing type
    TypeParam { index: usize, span: Span },
    /// Generic parameter of the enclosing method
    MethodParam { index: usize, span: Span },
}

impl TypeRef {
    pub fn named(template: TemplateId, args: Vec<TypeRef>) -> Self {
        TypeRef::Named {
            template,
            args,
            span: Span::default(),
        }
    }

    pub fn simple(template: TemplateId) -> Self {
        Self::named(template, Vec::new())
    }

    pub fn type_param(index: usize) -> Self {
        TypeRef::TypeParam {
            index,
            span: Span::default(),
        }
    }

    pub fn method_param(index: usize) -> Self {
        TypeRef::MethodParam {
            index,
            span: Span::default(),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            TypeRef::Named { span, .. }
            | TypeRef::TypeParam { span, .. }
            | TypeRef::MethodParam { span, .. } => *span,
        }
    }

    pub fn with_span(mut self, new_span: Span) -> Self {
        match &mut self {
            TypeRef::Named { span, .. }
            | TypeRef::TypeParam { span, .. }
            | TypeRef::MethodParam { span, .. } => *span = new_span,
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclKind {
    /// Reference type with identity
    Class,
    /// Plural value type
    Struct,
    /// Plural value type holding one ordinal; variants become static fields
    Enum { variants: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDecl {
    pub name: String,
    pub kind: DeclKind,
    pub generic_params: Vec<String>,
    pub supertype: Option<TypeRef>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: TypeRef,
    pub is_static: bool,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: TypeRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodDeclKind {
    Instance,
    Static,
    Constructor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub kind: MethodDeclKind,
    pub generic_params: Vec<String>,
    pub params: Vec<ParamDecl>,
    /// `None` means `unit`; ignored for constructors
    pub return_type: Option<TypeRef>,
    pub is_const: bool,
    pub body: Option<Expr>,
    pub span: Span,
}

/// Methods appended to every instantiation of `target`
#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionDecl {
    pub target: TemplateId,
    pub generic_params: Vec<String>,
    pub methods: Vec<MethodDecl>,
    pub span: Span,
}

/// A complete name-resolved program
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub types: Vec<TypeDecl>,
    pub extensions: Vec<ExtensionDecl>,
    /// Top-level code checked before method bodies
    pub entry: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Int(BigInt),
    Float(f64),
    Bool(bool),
    Str(String),
    Unit,
    Local(String),
    This,
    Call {
        receiver: Box<Expr>,
        method: String,
        generics: Vec<TypeRef>,
        args: Vec<Expr>,
    },
    StaticCall {
        owner: TypeRef,
        method: String,
        generics: Vec<TypeRef>,
        args: Vec<Expr>,
    },
    New {
        ty: TypeRef,
        args: Vec<Expr>,
    },
    Field {
        object: Box<Expr>,
        field: String,
    },
    SetField {
        object: Box<Expr>,
        field: String,
        value: Box<Expr>,
    },
    StaticField {
        owner: TypeRef,
        field: String,
    },
    Lambda(Lambda),
    Cast {
        value: Box<Expr>,
        target: TypeRef,
        /// `as?` rather than `as`
        optional: bool,
    },
    If {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    Block {
        statements: Vec<Stmt>,
        result: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    pub params: Vec<LambdaParam>,
    pub body: Box<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LambdaParam {
    pub name: String,
    pub ty: Option<TypeRef>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let {
        name: String,
        ty: Option<TypeRef>,
        value: Expr,
        span: Span,
    },
    Assign {
        name: String,
        value: Expr,
        span: Span,
    },
    Expr(Expr),
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            span: Span::default(),
        }
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn int(value: impl Into<BigInt>) -> Self {
        Self::new(ExprKind::Int(value.into()))
    }

    pub fn float(value: f64) -> Self {
        Self::new(ExprKind::Float(value))
    }

    pub fn bool(value: bool) -> Self {
        Self::new(ExprKind::Bool(value))
    }

    pub fn str(value: impl Into<String>) -> Self {
        Self::new(ExprKind::Str(value.into()))
    }

    pub fn unit() -> Self {
        Self::new(ExprKind::Unit)
    }

    pub fn local(name: impl Into<String>) -> Self {
        Self::new(ExprKind::Local(name.into()))
    }

    pub fn this() -> Self {
        Self::new(ExprKind::This)
    }

    pub fn call(receiver: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::call_generic(receiver, method, Vec::new(), args)
    }

    pub fn call_generic(
        receiver: Expr,
        method: impl Into<String>,
        generics: Vec<TypeRef>,
        args: Vec<Expr>,
    ) -> Self {
        Self::new(ExprKind::Call {
            receiver: Box::new(receiver),
            method: method.into(),
            generics,
            args,
        })
    }

    pub fn static_call(owner: TypeRef, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::StaticCall {
            owner,
            method: method.into(),
            generics: Vec::new(),
            args,
        })
    }

    pub fn new_object(ty: TypeRef, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::New { ty, args })
    }

    pub fn field(object: Expr, field: impl Into<String>) -> Self {
        Self::new(ExprKind::Field {
            object: Box::new(object),
            field: field.into(),
        })
    }

    pub fn set_field(object: Expr, field: impl Into<String>, value: Expr) -> Self {
        Self::new(ExprKind::SetField {
            object: Box::new(object),
            field: field.into(),
            value: Box::new(value),
        })
    }

    pub fn static_field(owner: TypeRef, field: impl Into<String>) -> Self {
        Self::new(ExprKind::StaticField {
            owner,
            field: field.into(),
        })
    }

    pub fn lambda(params: Vec<LambdaParam>, body: Expr) -> Self {
        Self::new(ExprKind::Lambda(Lambda {
            params,
            body: Box::new(body),
        }))
    }

    pub fn cast(value: Expr, target: TypeRef) -> Self {
        Self::new(ExprKind::Cast {
            value: Box::new(value),
            target,
            optional: false,
        })
    }

    pub fn optional_cast(value: Expr, target: TypeRef) -> Self {
        Self::new(ExprKind::Cast {
            value: Box::new(value),
            target,
            optional: true,
        })
    }

    pub fn if_else(condition: Expr, then_branch: Expr, else_branch: Option<Expr>) -> Self {
        Self::new(ExprKind::If {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: else_branch.map(Box::new),
        })
    }

    pub fn block(statements: Vec<Stmt>, result: Option<Expr>) -> Self {
        Self::new(ExprKind::Block {
            statements,
            result: result.map(Box::new),
        })
    }

    /// Walk every type reference mentioned directly or transitively by this expression
    pub fn visit_type_refs<'a>(&'a self, visit: &mut dyn FnMut(&'a TypeRef)) {
        match &self.kind {
            ExprKind::Int(_)
            | ExprKind::Float(_)
            | ExprKind::Bool(_)
            | ExprKind::Str(_)
            | ExprKind::Unit
            | ExprKind::Local(_)
            | ExprKind::This => {}
            ExprKind::Call {
                receiver,
                generics,
                args,
                ..
            } => {
                receiver.visit_type_refs(visit);
                generics.iter().for_each(|generic| visit(generic));
                args.iter().for_each(|arg| arg.visit_type_refs(visit));
            }
            ExprKind::StaticCall {
                owner,
                generics,
                args,
                ..
            } => {
                visit(owner);
                generics.iter().for_each(|generic| visit(generic));
                args.iter().for_each(|arg| arg.visit_type_refs(visit));
            }
            ExprKind::New { ty, args } => {
                visit(ty);
                args.iter().for_each(|arg| arg.visit_type_refs(visit));
            }
            ExprKind::Field { object, .. } => object.visit_type_refs(visit),
            ExprKind::SetField { object, value, .. } => {
                object.visit_type_refs(visit);
                value.visit_type_refs(visit);
            }
            ExprKind::StaticField { owner, .. } => visit(owner),
            ExprKind::Lambda(lambda) => {
                for param in &lambda.params {
                    if let Some(ty) = &param.ty {
                        visit(ty);
                    }
                }
                lambda.body.visit_type_refs(visit);
            }
            ExprKind::Cast { value, target, .. } => {
                value.visit_type_refs(visit);
                visit(target);
            }
            ExprKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                condition.visit_type_refs(visit);
                then_branch.visit_type_refs(visit);
                if let Some(else_branch) = else_branch {
                    else_branch.visit_type_refs(visit);
                }
            }
            ExprKind::Block { statements, result } => {
                for statement in statements {
                    match statement {
                        Stmt::Let { ty, value, .. } => {
                            if let Some(ty) = ty {
                                visit(ty);
                            }
                            value.visit_type_refs(visit);
                        }
                        Stmt::Assign { value, .. } => value.visit_type_refs(visit),
                        Stmt::Expr(expr) => expr.visit_type_refs(visit),
                    }
                }
                if let Some(result) = result {
                    result.visit_type_refs(visit);
                }
            }
        }
    }
}

impl LambdaParam {
    pub fn inferred(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
        }
    }

    pub fn annotated(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty: Some(ty),
        }
    }
}

impl Stmt {
    pub fn let_(name: impl Into<String>, ty: Option<TypeRef>, value: Expr) -> Self {
        Stmt::Let {
            name: name.into(),
            ty,
            value,
            span: Span::default(),
        }
    }

    pub fn assign(name: impl Into<String>, value: Expr) -> Self {
        Stmt::Assign {
            name: name.into(),
            value,
            span: Span::default(),
        }
    }
}
