//! Diagnostic reporting demonstration
//!
//! Builds a few small name-resolved programs, checks them and renders every
//! failure through miette against a snippet of the source it came from.
//!
//! Run with: `cargo run --example diagnostics_demo`
//! Set `SABLE_LOG=1` to see the checker's tracing output.

use miette::{NamedSource, Report};
use sable_typechecker::ast::{
    DeclKind, Expr, MethodDecl, MethodDeclKind, ParamDecl, Program, Span, Stmt, TypeDecl, TypeRef,
};
use sable_typechecker::{typecheck_program, Builtin, TemplateId};

fn main() {
    if std::env::var_os("SABLE_LOG").is_some() {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }

    println!("Sable typechecker diagnostics\n");

    demo_literal_range();
    demo_ambiguous_overload();
    demo_inference_failure();
    demo_successful_program();
}

fn ty(builtin: Builtin) -> TypeRef {
    TypeRef::simple(builtin.id())
}

fn report(name: &str, source: &str, program: &Program) {
    match typecheck_program(program) {
        Ok(typed) => {
            let entry = typed
                .entry
                .as_ref()
                .map(|entry| typed.registry.name(entry.ty))
                .unwrap_or_else(|| "unit".to_string());
            println!("{name}: ok, entry has type {entry}, {} bodies checked\n", typed.bodies.len());
        }
        Err(error) => {
            let report = Report::new(error).with_source_code(NamedSource::new(name, source.to_string()));
            println!("{report:?}");
        }
    }
}

fn demo_literal_range() {
    println!("1. Folded constant out of range");
    println!("-------------------------------");

    let source = "let small: u8 = 200 + 200;";
    let sum = Expr::call(
        Expr::int(200).with_span(Span::new(16, 19)),
        "add",
        vec![Expr::int(200).with_span(Span::new(22, 25))],
    )
    .with_span(Span::new(16, 25));
    let program = Program {
        entry: Some(Expr::block(vec![Stmt::let_("small", Some(ty(Builtin::U8)), sum)], None)),
        ..Program::default()
    };

    report("range.sable", source, &program);
}

fn demo_ambiguous_overload() {
    println!("2. Ambiguous overload");
    println!("---------------------");

    let source = "class Calc {\n  static f(x: i32) -> i32 { x }\n  static f(x: i64) -> i64 { x }\n}\nCalc.f(7)";
    let overload = |param: Builtin| MethodDecl {
        name: "f".to_string(),
        kind: MethodDeclKind::Static,
        generic_params: Vec::new(),
        params: vec![ParamDecl {
            name: "x".to_string(),
            ty: ty(param),
        }],
        return_type: Some(ty(param)),
        is_const: false,
        body: Some(Expr::local("x")),
        span: Span::default(),
    };
    let calc = TypeDecl {
        name: "Calc".to_string(),
        kind: DeclKind::Class,
        generic_params: Vec::new(),
        supertype: None,
        fields: Vec::new(),
        methods: vec![overload(Builtin::I32), overload(Builtin::I64)],
        span: Span::new(0, 78),
    };
    let program = Program {
        types: vec![calc],
        entry: Some(
            Expr::static_call(TypeRef::simple(TemplateId::declared(0)), "f", vec![Expr::int(7)])
                .with_span(Span::new(79, 88)),
        ),
        ..Program::default()
    };

    report("overload.sable", source, &program);
}

fn demo_inference_failure() {
    println!("3. Generic argument that cannot be inferred");
    println!("-------------------------------------------");

    let source = "let xs: List<i32> = new List<i32>();\nxs.fold(0, (acc, x) -> acc + x)";
    let list = TypeRef::named(Builtin::List.id(), vec![ty(Builtin::I32)]);
    let sum = Expr::lambda(
        vec![
            sable_typechecker::ast::LambdaParam::inferred("acc"),
            sable_typechecker::ast::LambdaParam::inferred("x"),
        ],
        Expr::call(Expr::local("acc"), "add", vec![Expr::local("x")]),
    );
    let program = Program {
        entry: Some(Expr::block(
            vec![Stmt::let_("xs", Some(list.clone()), Expr::new_object(list, Vec::new()))],
            Some(
                Expr::call(Expr::local("xs"), "fold", vec![Expr::int(0), sum]).with_span(Span::new(37, 68)),
            ),
        )),
        ..Program::default()
    };

    report("fold.sable", source, &program);
}

fn demo_successful_program() {
    println!("4. A program that checks");
    println!("------------------------");

    let source = "let xs: List<i32> = new List<i32>();\nxs.map(x -> x.str())";
    let list = TypeRef::named(Builtin::List.id(), vec![ty(Builtin::I32)]);
    let program = Program {
        entry: Some(Expr::block(
            vec![Stmt::let_("xs", Some(list.clone()), Expr::new_object(list, Vec::new()))],
            Some(Expr::call(
                Expr::local("xs"),
                "map",
                vec![Expr::lambda(
                    vec![sable_typechecker::ast::LambdaParam::inferred("x")],
                    Expr::call(Expr::local("x"), "str", Vec::new()),
                )],
            )),
        )),
        ..Program::default()
    };

    report("map.sable", source, &program);
}
