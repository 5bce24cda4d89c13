//! Program building helpers shared by the checker tests

use crate::ast::{
    DeclKind, Expr, FieldDecl, MethodDecl, MethodDeclKind, ParamDecl, Program, Span, TypeDecl,
    TypeRef,
};
use crate::checker::context::CheckContext;
use crate::config::CheckerConfig;
use crate::error::TypeResult;
use crate::registry::TypeRegistry;
use crate::templates::builtin::Builtin;
use crate::typed_ast::{TypedExpr, TypedProgram};
use crate::types::TemplateId;
use crate::typecheck_program;

pub fn ty(builtin: Builtin) -> TypeRef {
    TypeRef::simple(builtin.id())
}

pub fn applied(builtin: Builtin, args: Vec<TypeRef>) -> TypeRef {
    TypeRef::named(builtin.id(), args)
}

/// Reference to the `n`th declared type of the program under construction
pub fn declared(n: usize) -> TypeRef {
    TypeRef::simple(TemplateId::declared(n))
}

pub fn declared_with(n: usize, args: Vec<TypeRef>) -> TypeRef {
    TypeRef::named(TemplateId::declared(n), args)
}

pub fn field(name: &str, ty: TypeRef) -> FieldDecl {
    FieldDecl {
        name: name.to_string(),
        ty,
        is_static: false,
        span: Span::default(),
    }
}

pub fn param(name: &str, ty: TypeRef) -> ParamDecl {
    ParamDecl {
        name: name.to_string(),
        ty,
    }
}

pub fn method(name: &str, params: Vec<ParamDecl>, return_type: Option<TypeRef>, body: Expr) -> MethodDecl {
    MethodDecl {
        name: name.to_string(),
        kind: MethodDeclKind::Instance,
        generic_params: Vec::new(),
        params,
        return_type,
        is_const: false,
        body: Some(body),
        span: Span::default(),
    }
}

pub fn static_method(
    name: &str,
    params: Vec<ParamDecl>,
    return_type: Option<TypeRef>,
    body: Expr,
) -> MethodDecl {
    MethodDecl {
        kind: MethodDeclKind::Static,
        ..method(name, params, return_type, body)
    }
}

pub fn type_decl(name: &str, kind: DeclKind, fields: Vec<FieldDecl>, methods: Vec<MethodDecl>) -> TypeDecl {
    TypeDecl {
        name: name.to_string(),
        kind,
        generic_params: Vec::new(),
        supertype: None,
        fields,
        methods,
        span: Span::default(),
    }
}

pub fn class(name: &str, fields: Vec<FieldDecl>, methods: Vec<MethodDecl>) -> TypeDecl {
    type_decl(name, DeclKind::Class, fields, methods)
}

pub fn struct_decl(name: &str, fields: Vec<FieldDecl>) -> TypeDecl {
    type_decl(name, DeclKind::Struct, fields, Vec::new())
}

pub fn program(types: Vec<TypeDecl>, entry: Expr) -> Program {
    Program {
        types,
        extensions: Vec::new(),
        entry: Some(entry),
    }
}

pub fn check(program: &Program) -> TypeResult<TypedProgram> {
    typecheck_program(program)
}

/// Type of the entry expression of a successfully checked program
pub fn entry_type(typed: &TypedProgram) -> String {
    typed
        .entry
        .as_ref()
        .map(|entry| typed.registry.name(entry.ty))
        .unwrap_or_default()
}

/// Check a single expression outside any method body, without the final
/// unresolved-literal walk
pub fn check_expr(expr: &Expr) -> (TypeResult<TypedExpr>, TypeRegistry) {
    let program = Program::default();
    let mut ctx = CheckContext::new(TypeRegistry::new(), CheckerConfig::default(), &program);
    let result = crate::checker::ExpressionChecker::check(&mut ctx, expr, None);
    (result, ctx.registry)
}

/// Value of the integer constant a block or call evaluated to
pub fn int_value(typed: &TypedExpr) -> Option<i128> {
    use num_traits::ToPrimitive;
    match &typed.kind {
        crate::typed_ast::TypedExprKind::IntLiteral(value) => value.to_i128(),
        _ => None,
    }
}
