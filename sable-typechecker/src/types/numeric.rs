//! Numeric kinds shared by the builtin numeric types, literal coercion and the
//! conversion matrix.

use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;

/// Integer kinds, ordered by signedness then width
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
}

/// Floating point kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FloatKind {
    F32,
    F64,
}

/// Any concrete numeric kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NumericKind {
    Int(IntKind),
    Float(FloatKind),
}

/// The two deferred literal families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Float,
}

lazy_static! {
    /// Every concrete numeric kind in registration order
    pub static ref NUMERIC_KINDS: Vec<NumericKind> = {
        let mut kinds: Vec<NumericKind> = IntKind::ALL.iter().copied().map(NumericKind::Int).collect();
        kinds.extend(FloatKind::ALL.iter().copied().map(NumericKind::Float));
        kinds
    };

    static ref NUMERIC_BY_NAME: HashMap<&'static str, NumericKind> = NUMERIC_KINDS
        .iter()
        .map(|kind| (kind.name(), *kind))
        .collect();
}

impl IntKind {
    pub const ALL: [IntKind; 8] = [
        IntKind::I8,
        IntKind::I16,
        IntKind::I32,
        IntKind::I64,
        IntKind::U8,
        IntKind::U16,
        IntKind::U32,
        IntKind::U64,
    ];

    /// Width in bits
    pub fn width(self) -> u32 {
        match self {
            IntKind::I8 | IntKind::U8 => 8,
            IntKind::I16 | IntKind::U16 => 16,
            IntKind::I32 | IntKind::U32 => 32,
            IntKind::I64 | IntKind::U64 => 64,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, IntKind::I8 | IntKind::I16 | IntKind::I32 | IntKind::I64)
    }

    /// Smallest representable value
    pub fn min_value(self) -> i128 {
        if self.is_signed() {
            -(1i128 << (self.width() - 1))
        } else {
            0
        }
    }

    /// Largest representable value
    pub fn max_value(self) -> i128 {
        if self.is_signed() {
            (1i128 << (self.width() - 1)) - 1
        } else {
            (1i128 << self.width()) - 1
        }
    }

    /// Mask selecting the significant low bits of a 64-bit register
    pub fn mask(self) -> u64 {
        if self.width() == 64 {
            u64::MAX
        } else {
            (1u64 << self.width()) - 1
        }
    }

    /// The kind with the same width and opposite signedness
    pub fn flip_sign(self) -> IntKind {
        match self {
            IntKind::I8 => IntKind::U8,
            IntKind::I16 => IntKind::U16,
            IntKind::I32 => IntKind::U32,
            IntKind::I64 => IntKind::U64,
            IntKind::U8 => IntKind::I8,
            IntKind::U16 => IntKind::I16,
            IntKind::U32 => IntKind::I32,
            IntKind::U64 => IntKind::I64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntKind::I8 => "i8",
            IntKind::I16 => "i16",
            IntKind::I32 => "i32",
            IntKind::I64 => "i64",
            IntKind::U8 => "u8",
            IntKind::U16 => "u16",
            IntKind::U32 => "u32",
            IntKind::U64 => "u64",
        }
    }
}

impl FloatKind {
    pub const ALL: [FloatKind; 2] = [FloatKind::F32, FloatKind::F64];

    pub fn width(self) -> u32 {
        match self {
            FloatKind::F32 => 32,
            FloatKind::F64 => 64,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FloatKind::F32 => "f32",
            FloatKind::F64 => "f64",
        }
    }
}

impl NumericKind {
    pub fn name(self) -> &'static str {
        match self {
            NumericKind::Int(kind) => kind.name(),
            NumericKind::Float(kind) => kind.name(),
        }
    }

    /// Look up a numeric kind by its source name (`i32`, `f64`, ...)
    pub fn from_name(name: &str) -> Option<NumericKind> {
        NUMERIC_BY_NAME.get(name).copied()
    }

    pub fn is_integer(self) -> bool {
        matches!(self, NumericKind::Int(_))
    }

    /// Whether a deferred literal of `literal` kind may become this kind
    pub fn accepts_literal(self, literal: LiteralKind) -> bool {
        matches!(
            (self, literal),
            (NumericKind::Int(_), LiteralKind::Int) | (NumericKind::Float(_), LiteralKind::Float)
        )
    }
}

impl LiteralKind {
    pub fn name(self) -> &'static str {
        match self {
            LiteralKind::Int => "{integer}",
            LiteralKind::Float => "{float}",
        }
    }
}

impl fmt::Display for NumericKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for IntKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for FloatKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
