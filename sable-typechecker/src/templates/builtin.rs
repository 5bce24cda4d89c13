//! Builtin type provider
//!
//! The builtin templates occupy a fixed prefix of the template index space, in
//! the order of [`Builtin::ALL`]. They go through the same instantiation engine
//! as declared types; only their member lists are produced here instead of
//! being read from declarations.

use super::{BuildContext, FieldShape, TemplateBuilder, TypeShape};
use crate::error::TypeResult;
use crate::types::{
    BinaryOp, CompareOp, FloatKind, IntKind, Intrinsic, LiteralKind, LogicOp, Method, MethodBody,
    MethodKind, NumericKind, StorageCategory, TemplateId, TypeTerm, UnaryOp,
};
use lazy_static::lazy_static;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Object,
    Unit,
    Bool,
    Str,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F32,
    F64,
    IntLiteral,
    FloatLiteral,
    List,
    Option,
    Tuple2,
    Tuple3,
    Tuple4,
    Fn0,
    Fn1,
    Fn2,
    Fn3,
    Fn4,
}

lazy_static! {
    // Source names of the builtins, used by frontends and test programs to
    // resolve builtin type names to template ids
    static ref BUILTINS_BY_NAME: HashMap<&'static str, Builtin> = Builtin::ALL
        .iter()
        .map(|builtin| (builtin.name(), *builtin))
        .collect();
}

/// Number of builtin templates preceding the declared ones
pub fn builtin_count() -> usize {
    Builtin::ALL.len()
}

impl Builtin {
    pub const ALL: [Builtin; 26] = [
        Builtin::Object,
        Builtin::Unit,
        Builtin::Bool,
        Builtin::Str,
        Builtin::I8,
        Builtin::I16,
        Builtin::I32,
        Builtin::I64,
        Builtin::U8,
        Builtin::U16,
        Builtin::U32,
        Builtin::U64,
        Builtin::F32,
        Builtin::F64,
        Builtin::IntLiteral,
        Builtin::FloatLiteral,
        Builtin::List,
        Builtin::Option,
        Builtin::Tuple2,
        Builtin::Tuple3,
        Builtin::Tuple4,
        Builtin::Fn0,
        Builtin::Fn1,
        Builtin::Fn2,
        Builtin::Fn3,
        Builtin::Fn4,
    ];

    /// Largest parameter count of a function interface
    pub const MAX_FUNCTION_ARITY: usize = 4;

    pub fn id(self) -> TemplateId {
        TemplateId(self as u32)
    }

    pub fn from_id(id: TemplateId) -> Option<Builtin> {
        Self::ALL.get(id.index()).copied()
    }

    pub fn from_name(name: &str) -> Option<Builtin> {
        BUILTINS_BY_NAME.get(name).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::Object => "Object",
            Builtin::Unit => "unit",
            Builtin::Bool => "bool",
            Builtin::Str => "str",
            Builtin::I8 => "i8",
            Builtin::I16 => "i16",
            Builtin::I32 => "i32",
            Builtin::I64 => "i64",
            Builtin::U8 => "u8",
            Builtin::U16 => "u16",
            Builtin::U32 => "u32",
            Builtin::U64 => "u64",
            Builtin::F32 => "f32",
            Builtin::F64 => "f64",
            Builtin::IntLiteral => "{integer}",
            Builtin::FloatLiteral => "{float}",
            Builtin::List => "List",
            Builtin::Option => "Option",
            Builtin::Tuple2 => "Tuple2",
            Builtin::Tuple3 => "Tuple3",
            Builtin::Tuple4 => "Tuple4",
            Builtin::Fn0 => "Fn0",
            Builtin::Fn1 => "Fn1",
            Builtin::Fn2 => "Fn2",
            Builtin::Fn3 => "Fn3",
            Builtin::Fn4 => "Fn4",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Builtin::List | Builtin::Option => 1,
            Builtin::Tuple2 => 2,
            Builtin::Tuple3 => 3,
            Builtin::Tuple4 => 4,
            Builtin::Fn0 => 1,
            Builtin::Fn1 => 2,
            Builtin::Fn2 => 3,
            Builtin::Fn3 => 4,
            Builtin::Fn4 => 5,
            _ => 0,
        }
    }

    pub fn category(self) -> StorageCategory {
        match self {
            Builtin::Object | Builtin::Str | Builtin::List => StorageCategory::Reference,
            Builtin::IntLiteral | Builtin::FloatLiteral => StorageCategory::Deferred,
            _ if self.function_arity().is_some() => StorageCategory::Reference,
            _ => StorageCategory::Plural,
        }
    }

    pub fn numeric(kind: NumericKind) -> Builtin {
        match kind {
            NumericKind::Int(IntKind::I8) => Builtin::I8,
            NumericKind::Int(IntKind::I16) => Builtin::I16,
            NumericKind::Int(IntKind::I32) => Builtin::I32,
            NumericKind::Int(IntKind::I64) => Builtin::I64,
            NumericKind::Int(IntKind::U8) => Builtin::U8,
            NumericKind::Int(IntKind::U16) => Builtin::U16,
            NumericKind::Int(IntKind::U32) => Builtin::U32,
            NumericKind::Int(IntKind::U64) => Builtin::U64,
            NumericKind::Float(FloatKind::F32) => Builtin::F32,
            NumericKind::Float(FloatKind::F64) => Builtin::F64,
        }
    }

    pub fn numeric_kind(self) -> Option<NumericKind> {
        match self {
            Builtin::I8 => Some(NumericKind::Int(IntKind::I8)),
            Builtin::I16 => Some(NumericKind::Int(IntKind::I16)),
            Builtin::I32 => Some(NumericKind::Int(IntKind::I32)),
            Builtin::I64 => Some(NumericKind::Int(IntKind::I64)),
            Builtin::U8 => Some(NumericKind::Int(IntKind::U8)),
            Builtin::U16 => Some(NumericKind::Int(IntKind::U16)),
            Builtin::U32 => Some(NumericKind::Int(IntKind::U32)),
            Builtin::U64 => Some(NumericKind::Int(IntKind::U64)),
            Builtin::F32 => Some(NumericKind::Float(FloatKind::F32)),
            Builtin::F64 => Some(NumericKind::Float(FloatKind::F64)),
            _ => None,
        }
    }

    pub fn literal(kind: LiteralKind) -> Builtin {
        match kind {
            LiteralKind::Int => Builtin::IntLiteral,
            LiteralKind::Float => Builtin::FloatLiteral,
        }
    }

    /// Function interface taking `params` arguments
    pub fn function(params: usize) -> Option<Builtin> {
        match params {
            0 => Some(Builtin::Fn0),
            1 => Some(Builtin::Fn1),
            2 => Some(Builtin::Fn2),
            3 => Some(Builtin::Fn3),
            4 => Some(Builtin::Fn4),
            _ => None,
        }
    }

    /// Parameter count if this is a function interface
    pub fn function_arity(self) -> Option<usize> {
        match self {
            Builtin::Fn0 => Some(0),
            Builtin::Fn1 => Some(1),
            Builtin::Fn2 => Some(2),
            Builtin::Fn3 => Some(3),
            Builtin::Fn4 => Some(4),
            _ => None,
        }
    }

    pub fn tuple(len: usize) -> Option<Builtin> {
        match len {
            2 => Some(Builtin::Tuple2),
            3 => Some(Builtin::Tuple3),
            4 => Some(Builtin::Tuple4),
            _ => None,
        }
    }
}

/// Template builder for one builtin
#[derive(Debug, Clone, Copy)]
pub struct BuiltinTemplate {
    pub builtin: Builtin,
}

impl TemplateBuilder for BuiltinTemplate {
    fn build(&self, cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
        match self.builtin {
            Builtin::Object => object_shape(cx),
            Builtin::Unit => Ok(TypeShape::default()),
            Builtin::Bool => bool_shape(cx),
            Builtin::Str => str_shape(cx),
            Builtin::IntLiteral => literal_shape(cx, LiteralKind::Int),
            Builtin::FloatLiteral => literal_shape(cx, LiteralKind::Float),
            Builtin::List => list_shape(cx),
            Builtin::Option => option_shape(cx),
            Builtin::Tuple2 | Builtin::Tuple3 | Builtin::Tuple4 => tuple_shape(cx),
            Builtin::Fn0 | Builtin::Fn1 | Builtin::Fn2 | Builtin::Fn3 | Builtin::Fn4 => {
                function_shape(cx)
            }
            other => match other.numeric_kind() {
                Some(kind) => numeric_shape(cx, kind),
                None => Err(crate::error::TypecheckError::internal(format!(
                    "no shape for builtin {}",
                    other.name()
                ))),
            },
        }
    }
}

fn this(cx: &BuildContext<'_>) -> TypeTerm {
    TypeTerm::Concrete(cx.this)
}

fn instance(cx: &BuildContext<'_>, name: &str, params: Vec<TypeTerm>, ret: TypeTerm, op: Intrinsic) -> Method {
    cx.builtin_method(name, MethodKind::Instance, params, ret, MethodBody::Intrinsic(op))
}

/// An operator method: pure, and folded at compile time on literal operands
fn operator(cx: &BuildContext<'_>, name: &str, params: Vec<TypeTerm>, ret: TypeTerm, op: Intrinsic) -> Method {
    let mut method = instance(cx, name, params, ret, op);
    method.is_const = true;
    method
}

fn object_shape(cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
    let bool_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::Bool)?);
    let methods = vec![instance(
        cx,
        CompareOp::Eq.method_name(),
        vec![this(cx)],
        bool_ty,
        Intrinsic::Compare(CompareOp::Eq),
    )];

    Ok(TypeShape {
        methods,
        ..TypeShape::default()
    })
}

fn bool_shape(cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
    let str_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::Str)?);
    let mut methods = Vec::new();

    for op in [LogicOp::And, LogicOp::Or, LogicOp::Xor] {
        methods.push(instance(cx, op.method_name(), vec![this(cx)], this(cx), Intrinsic::Logic(op)));
    }
    methods.push(instance(
        cx,
        UnaryOp::Not.method_name(),
        Vec::new(),
        this(cx),
        Intrinsic::Unary(UnaryOp::Not),
    ));
    for op in [CompareOp::Eq, CompareOp::Ne] {
        methods.push(instance(cx, op.method_name(), vec![this(cx)], this(cx), Intrinsic::Compare(op)));
    }
    methods.push(instance(cx, "str", Vec::new(), str_ty, Intrinsic::ToStr));

    Ok(TypeShape {
        methods,
        scalar: true,
        ..TypeShape::default()
    })
}

fn str_shape(cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
    let object = cx.registry.builtin(Builtin::Object)?;
    let bool_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::Bool)?);
    let i32_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::I32)?);

    let mut methods = vec![
        instance(cx, "len", Vec::new(), i32_ty, Intrinsic::StrLen),
        instance(cx, "add", vec![this(cx)], this(cx), Intrinsic::StrConcat),
    ];
    for op in [CompareOp::Eq, CompareOp::Ne] {
        methods.push(instance(cx, op.method_name(), vec![this(cx)], bool_ty.clone(), Intrinsic::Compare(op)));
    }
    methods.push(instance(cx, "str", Vec::new(), this(cx), Intrinsic::ToStr));

    Ok(TypeShape {
        methods,
        supertype: Some(object),
        ..TypeShape::default()
    })
}

fn numeric_shape(cx: &mut BuildContext<'_>, kind: NumericKind) -> TypeResult<TypeShape> {
    let bool_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::Bool)?);
    let str_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::Str)?);
    let mut methods = operator_methods(cx, kind.is_integer(), bool_ty);
    methods.push(instance(cx, "str", Vec::new(), str_ty, Intrinsic::ToStr));

    Ok(TypeShape {
        methods,
        numeric: Some(kind),
        scalar: true,
        ..TypeShape::default()
    })
}

fn literal_shape(cx: &mut BuildContext<'_>, kind: LiteralKind) -> TypeResult<TypeShape> {
    let bool_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::Bool)?);
    let methods = operator_methods(cx, kind == LiteralKind::Int, bool_ty);

    Ok(TypeShape {
        methods,
        literal: Some(kind),
        ..TypeShape::default()
    })
}

/// The operator set shared by concrete numerics and their literal counterparts
fn operator_methods(cx: &BuildContext<'_>, integer: bool, bool_ty: TypeTerm) -> Vec<Method> {
    let mut methods = Vec::new();
    let bitwise: &[BinaryOp] = if integer { &BinaryOp::BITWISE } else { &[] };

    for op in BinaryOp::ARITHMETIC.iter().chain(bitwise) {
        methods.push(operator(cx, op.method_name(), vec![this(cx)], this(cx), Intrinsic::Binary(*op)));
    }
    for op in CompareOp::ALL {
        methods.push(operator(
            cx,
            op.method_name(),
            vec![this(cx)],
            bool_ty.clone(),
            Intrinsic::Compare(op),
        ));
    }
    methods.push(operator(
        cx,
        UnaryOp::Neg.method_name(),
        Vec::new(),
        this(cx),
        Intrinsic::Unary(UnaryOp::Neg),
    ));
    if integer {
        methods.push(operator(
            cx,
            UnaryOp::BitNot.method_name(),
            Vec::new(),
            this(cx),
            Intrinsic::Unary(UnaryOp::BitNot),
        ));
    }
    methods
}

fn function_term(interface: Builtin, params: Vec<TypeTerm>, ret: TypeTerm) -> TypeTerm {
    let mut args = vec![ret];
    args.extend(params);
    TypeTerm::Applied {
        template: interface.id(),
        args,
    }
}

fn list_shape(cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
    let object = cx.registry.builtin(Builtin::Object)?;
    let element = TypeTerm::Concrete(cx.generic(0)?);
    let bool_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::Bool)?);
    let i32_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::I32)?);
    let unit_ty = TypeTerm::Concrete(cx.registry.builtin(Builtin::Unit)?);
    let list_of = |arg: TypeTerm| TypeTerm::Applied {
        template: Builtin::List.id(),
        args: vec![arg],
    };

    let mut methods = vec![
        cx.builtin_method(
            "new",
            MethodKind::Constructor,
            Vec::new(),
            this(cx),
            MethodBody::Intrinsic(Intrinsic::ListNew),
        ),
        instance(cx, "get", vec![i32_ty.clone()], element.clone(), Intrinsic::ListGet),
        instance(
            cx,
            "set",
            vec![i32_ty.clone(), element.clone()],
            unit_ty.clone(),
            Intrinsic::ListSet,
        ),
        instance(cx, "len", Vec::new(), i32_ty, Intrinsic::ListLen),
        instance(cx, "push", vec![element.clone()], unit_ty, Intrinsic::ListPush),
    ];

    // map<R>(f: Fn1<R, T>) -> List<R>
    let mut map = instance(
        cx,
        "map",
        vec![function_term(Builtin::Fn1, vec![element.clone()], TypeTerm::MethodGeneric(0))],
        list_of(TypeTerm::MethodGeneric(0)),
        Intrinsic::ListMap,
    );
    map.generic_arity = 1;
    methods.push(map);

    methods.push(instance(
        cx,
        "filter",
        vec![function_term(Builtin::Fn1, vec![element.clone()], bool_ty)],
        this(cx),
        Intrinsic::ListFilter,
    ));

    // fold<A>(initial: A, f: Fn2<A, A, T>) -> A
    let accumulator = TypeTerm::MethodGeneric(0);
    let mut fold = instance(
        cx,
        "fold",
        vec![
            accumulator.clone(),
            function_term(Builtin::Fn2, vec![accumulator.clone(), element], accumulator.clone()),
        ],
        accumulator,
        Intrinsic::ListFold,
    );
    fold.generic_arity = 1;
    methods.push(fold);

    Ok(TypeShape {
        methods,
        supertype: Some(object),
        ..TypeShape::default()
    })
}

fn option_shape(cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
    let value = cx.generic(0)?;
    let bool_handle = cx.registry.builtin(Builtin::Bool)?;
    let element = TypeTerm::Concrete(value);

    let fields = vec![
        FieldShape {
            name: "present".to_string(),
            ty: bool_handle,
            is_static: false,
        },
        FieldShape {
            name: "value".to_string(),
            ty: value,
            is_static: false,
        },
    ];

    let methods = vec![
        instance(
            cx,
            "is_present",
            Vec::new(),
            TypeTerm::Concrete(bool_handle),
            Intrinsic::OptionIsPresent,
        ),
        instance(cx, "get", Vec::new(), element.clone(), Intrinsic::OptionGet),
        instance(cx, "or_else", vec![element.clone()], element.clone(), Intrinsic::OptionOrElse),
        cx.builtin_method(
            "some",
            MethodKind::Static,
            vec![element],
            this(cx),
            MethodBody::Intrinsic(Intrinsic::OptionSome),
        ),
        cx.builtin_method(
            "none",
            MethodKind::Static,
            Vec::new(),
            this(cx),
            MethodBody::Intrinsic(Intrinsic::OptionNone),
        ),
    ];

    Ok(TypeShape {
        fields,
        methods,
        ..TypeShape::default()
    })
}

fn tuple_shape(cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
    let fields: Vec<FieldShape> = cx
        .generics
        .iter()
        .enumerate()
        .map(|(index, ty)| FieldShape {
            name: format!("_{index}"),
            ty: *ty,
            is_static: false,
        })
        .collect();
    let params = fields.iter().map(|field| TypeTerm::Concrete(field.ty)).collect();
    let constructor = cx.builtin_method(
        "new",
        MethodKind::Constructor,
        params,
        this(cx),
        MethodBody::Intrinsic(Intrinsic::TupleNew),
    );

    Ok(TypeShape {
        fields,
        methods: vec![constructor],
        ..TypeShape::default()
    })
}

/// `FnN<R, P1, ..., PN>`: generic 0 is the return type, the rest are parameters
fn function_shape(cx: &mut BuildContext<'_>) -> TypeResult<TypeShape> {
    let object = cx.registry.builtin(Builtin::Object)?;
    let ret = TypeTerm::Concrete(cx.generic(0)?);
    let params = cx
        .generics
        .iter()
        .skip(1)
        .map(|param| TypeTerm::Concrete(*param))
        .collect();
    let call = cx.builtin_method("call", MethodKind::Instance, params, ret, MethodBody::Abstract);

    Ok(TypeShape {
        methods: vec![call],
        supertype: Some(object),
        ..TypeShape::default()
    })
}
