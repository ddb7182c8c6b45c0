use core::fmt::Display;
use core::hash::Hash;

use float_ord::FloatOrd;
use num_traits::ToPrimitive;

use crate::Expr;

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum FloatKind {
    F16,
    BF16,
    F32,
    F64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum IntKind {
    I8,
    I16,
    I32,
    I64,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum UIntKind {
    U8,
    U16,
    U32,
    U64,
}

/// Element type of a tensor or scalar expression.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub enum Elem {
    Float(FloatKind),
    Int(IntKind),
    UInt(UIntKind),
    Bool,
}

impl Elem {
    /// Create a constant scalar from a float.
    ///
    /// The value is narrowed to the precision of the element type.
    pub fn constant_from_f64(&self, val: f64) -> ConstantScalarValue {
        match self {
            Elem::Float(kind) => ConstantScalarValue::Float(narrow_float(val, *kind), *kind),
            Elem::Int(kind) => ConstantScalarValue::Int(val as i64, *kind),
            Elem::UInt(kind) => ConstantScalarValue::UInt(val as u64, *kind),
            Elem::Bool => ConstantScalarValue::Bool(val > 0.0),
        }
    }

    /// Create a constant scalar from a signed integer.
    pub fn constant_from_i64(&self, val: i64) -> ConstantScalarValue {
        match self {
            Elem::Float(kind) => ConstantScalarValue::Float(narrow_float(val as f64, *kind), *kind),
            Elem::Int(kind) => ConstantScalarValue::Int(val, *kind),
            Elem::UInt(kind) => ConstantScalarValue::UInt(val as u64, *kind),
            Elem::Bool => ConstantScalarValue::Bool(val > 0),
        }
    }

    /// Create a constant scalar from an unsigned integer.
    pub fn constant_from_u64(&self, val: u64) -> ConstantScalarValue {
        match self {
            Elem::Float(kind) => ConstantScalarValue::Float(narrow_float(val as f64, *kind), *kind),
            Elem::Int(kind) => ConstantScalarValue::Int(val as i64, *kind),
            Elem::UInt(kind) => ConstantScalarValue::UInt(val, *kind),
            Elem::Bool => ConstantScalarValue::Bool(val > 0),
        }
    }

    /// Create a constant scalar from a boolean.
    pub fn constant_from_bool(&self, val: bool) -> ConstantScalarValue {
        match self {
            Elem::Float(kind) => ConstantScalarValue::Float(val as u32 as f64, *kind),
            Elem::Int(kind) => ConstantScalarValue::Int(val as i64, *kind),
            Elem::UInt(kind) => ConstantScalarValue::UInt(val as u64, *kind),
            Elem::Bool => ConstantScalarValue::Bool(val),
        }
    }

    /// Build a constant expression of this element type from any primitive
    /// numeric value.
    pub fn constant<E: ToPrimitive>(&self, value: E) -> Expr {
        let value = match self {
            Elem::Float(_) => self.constant_from_f64(value.to_f64().unwrap()),
            Elem::Int(_) => self.constant_from_i64(value.to_i64().unwrap()),
            Elem::UInt(_) => self.constant_from_u64(value.to_u64().unwrap()),
            Elem::Bool => self.constant_from_bool(value.to_u32().unwrap() == 1),
        };
        Expr::Constant(value)
    }

    /// Get the size in bytes.
    pub const fn size(&self) -> usize {
        match self {
            Elem::Float(kind) => match kind {
                FloatKind::F16 => core::mem::size_of::<half::f16>(),
                FloatKind::BF16 => core::mem::size_of::<half::bf16>(),
                FloatKind::F32 => core::mem::size_of::<f32>(),
                FloatKind::F64 => core::mem::size_of::<f64>(),
            },
            Elem::Int(kind) => match kind {
                IntKind::I8 => core::mem::size_of::<i8>(),
                IntKind::I16 => core::mem::size_of::<i16>(),
                IntKind::I32 => core::mem::size_of::<i32>(),
                IntKind::I64 => core::mem::size_of::<i64>(),
            },
            Elem::UInt(kind) => match kind {
                UIntKind::U8 => core::mem::size_of::<u8>(),
                UIntKind::U16 => core::mem::size_of::<u16>(),
                UIntKind::U32 => core::mem::size_of::<u32>(),
                UIntKind::U64 => core::mem::size_of::<u64>(),
            },
            Elem::Bool => core::mem::size_of::<bool>(),
        }
    }
}

fn narrow_float(val: f64, kind: FloatKind) -> f64 {
    match kind {
        FloatKind::F16 => half::f16::from_f64(val).to_f64(),
        FloatKind::BF16 => half::bf16::from_f64(val).to_f64(),
        FloatKind::F32 => val as f32 as f64,
        FloatKind::F64 => val,
    }
}

impl Display for Elem {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Elem::Float(kind) => match kind {
                FloatKind::F16 => write!(f, "f16"),
                FloatKind::BF16 => write!(f, "bf16"),
                FloatKind::F32 => write!(f, "f32"),
                FloatKind::F64 => write!(f, "f64"),
            },
            Elem::Int(kind) => match kind {
                IntKind::I8 => write!(f, "i8"),
                IntKind::I16 => write!(f, "i16"),
                IntKind::I32 => write!(f, "i32"),
                IntKind::I64 => write!(f, "i64"),
            },
            Elem::UInt(kind) => match kind {
                UIntKind::U8 => write!(f, "u8"),
                UIntKind::U16 => write!(f, "u16"),
                UIntKind::U32 => write!(f, "u32"),
                UIntKind::U64 => write!(f, "u64"),
            },
            Elem::Bool => write!(f, "bool"),
        }
    }
}

/// A compile-time constant scalar, stored with the highest precision
/// available for its kind. The element kind is carried alongside the value so
/// constants keep their type through expression construction.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[allow(missing_docs)]
pub enum ConstantScalarValue {
    Int(i64, IntKind),
    Float(f64, FloatKind),
    UInt(u64, UIntKind),
    Bool(bool),
}

impl Eq for ConstantScalarValue {}

impl Ord for ConstantScalarValue {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        // Override float-float comparison with `FloatOrd` since `f64` isn't
        // `Ord`. All other comparisons are safe to unwrap since they're
        // either `Ord` or only compare discriminants.
        match (self, other) {
            (ConstantScalarValue::Float(this, _), ConstantScalarValue::Float(other, _)) => {
                FloatOrd(*this).cmp(&FloatOrd(*other))
            }
            _ => self.partial_cmp(other).unwrap(),
        }
    }
}

impl Hash for ConstantScalarValue {
    fn hash<H: core::hash::Hasher>(&self, state: &mut H) {
        core::mem::discriminant(self).hash(state);
        match self {
            ConstantScalarValue::Int(val, kind) => {
                val.hash(state);
                kind.hash(state);
            }
            ConstantScalarValue::Float(val, kind) => {
                FloatOrd(*val).hash(state);
                kind.hash(state);
            }
            ConstantScalarValue::UInt(val, kind) => {
                val.hash(state);
                kind.hash(state);
            }
            ConstantScalarValue::Bool(val) => {
                val.hash(state);
            }
        }
    }
}

impl ConstantScalarValue {
    /// The element type of the constant.
    pub fn elem(&self) -> Elem {
        match self {
            ConstantScalarValue::Int(_, kind) => Elem::Int(*kind),
            ConstantScalarValue::Float(_, kind) => Elem::Float(*kind),
            ConstantScalarValue::UInt(_, kind) => Elem::UInt(*kind),
            ConstantScalarValue::Bool(_) => Elem::Bool,
        }
    }

    /// Returns the value of the constant as an i64.
    ///
    /// It will return [None] if the constant is a float or a bool.
    pub fn try_as_i64(&self) -> Option<i64> {
        match self {
            ConstantScalarValue::Int(val, _) => Some(*val),
            ConstantScalarValue::UInt(val, _) => Some(*val as i64),
            ConstantScalarValue::Float(..) => None,
            ConstantScalarValue::Bool(_) => None,
        }
    }

    /// Returns the value of the constant as an f64.
    pub fn as_f64(&self) -> f64 {
        match self {
            ConstantScalarValue::Int(val, _) => *val as f64,
            ConstantScalarValue::Float(val, _) => *val,
            ConstantScalarValue::UInt(val, _) => *val as f64,
            ConstantScalarValue::Bool(val) => *val as u8 as f64,
        }
    }

    pub fn is_zero(&self) -> bool {
        match self {
            ConstantScalarValue::Int(val, _) => *val == 0,
            ConstantScalarValue::Float(val, _) => *val == 0.0,
            ConstantScalarValue::UInt(val, _) => *val == 0,
            ConstantScalarValue::Bool(val) => !*val,
        }
    }

    pub fn is_one(&self) -> bool {
        match self {
            ConstantScalarValue::Int(val, _) => *val == 1,
            ConstantScalarValue::Float(val, _) => *val == 1.0,
            ConstantScalarValue::UInt(val, _) => *val == 1,
            ConstantScalarValue::Bool(val) => *val,
        }
    }
}

impl Display for ConstantScalarValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConstantScalarValue::Int(val, kind) => write!(f, "{val}{kind:?}"),
            ConstantScalarValue::Float(val, kind) => write!(f, "{val:?}{kind:?}"),
            ConstantScalarValue::UInt(val, kind) => write!(f, "{val}{kind:?}"),
            ConstantScalarValue::Bool(val) => write!(f, "{val}"),
        }
    }
}
