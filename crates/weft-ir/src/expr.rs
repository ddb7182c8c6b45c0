use core::fmt::Display;

use crate::{ConstantScalarValue, Elem, FloatKind, IntKind, Tensor, UIntKind, Var};

/// Scalar binary operators available in expressions.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Max,
    Min,
}

/// Combiner of a fold over a reduction domain.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ReduceOp {
    Sum,
    Prod,
    Max,
    Min,
}

/// An immutable symbolic scalar expression.
///
/// Expressions are trees built bottom-up and never mutated afterwards.
/// Tensors referenced by [`Access`](Expr::Access) and
/// [`TensorRef`](Expr::TensorRef) nodes are shared by handle, so a single
/// tensor may appear in any number of expressions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// A compile-time constant scalar.
    Constant(ConstantScalarValue),
    /// A reference to a bound variable.
    Var(Var),
    /// A scalar binary operation.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Read of one tensor element at the given indices.
    Access { tensor: Tensor, indices: Vec<Expr> },
    /// A fold of `value` over the domain of the bound `axes`.
    ///
    /// When `init` is `None` the fold is seeded with the first visited
    /// element.
    Reduce {
        op: ReduceOp,
        value: Box<Expr>,
        axes: Vec<Var>,
        init: Option<Box<Expr>>,
    },
    /// Call to an externally-declared function, resolved by a downstream
    /// code generator. Tensor arguments are passed as [`Expr::TensorRef`].
    CallExtern { func: String, args: Vec<Expr> },
    /// Opaque tensor handle, valid only as an extern-call argument.
    TensorRef(Tensor),
}

impl Expr {
    /// An `i32` constant zero.
    pub fn zero() -> Expr {
        Expr::from(0)
    }

    /// An `i32` constant one.
    pub fn one() -> Expr {
        Expr::from(1)
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn max(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Max, self, rhs)
    }

    pub fn min(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Min, self, rhs)
    }

    /// The value of the expression when it is an integer constant.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Expr::Constant(value) => value.try_as_i64(),
            _ => None,
        }
    }

    /// The element type of the expression, when one can be derived without
    /// a typing context. Bound variables are index-typed (`i32`).
    pub fn infer_elem(&self) -> Option<Elem> {
        match self {
            Expr::Constant(value) => Some(value.elem()),
            Expr::Var(_) => Some(Elem::Int(IntKind::I32)),
            Expr::Binary { lhs, rhs, .. } => lhs.infer_elem().or_else(|| rhs.infer_elem()),
            Expr::Access { tensor, .. } => Some(tensor.elem()),
            Expr::Reduce { value, .. } => value.infer_elem(),
            Expr::CallExtern { args, .. } => args.iter().find_map(|arg| match arg {
                Expr::TensorRef(tensor) => Some(tensor.elem()),
                _ => None,
            }),
            Expr::TensorRef(tensor) => Some(tensor.elem()),
        }
    }
}

/// Sum fold of `value` over the domain of `axes`.
pub fn reduce_sum(value: Expr, axes: &[Var], init: Option<Expr>) -> Expr {
    fold(ReduceOp::Sum, value, axes, init)
}

/// Product fold of `value` over the domain of `axes`.
pub fn reduce_mul(value: Expr, axes: &[Var], init: Option<Expr>) -> Expr {
    fold(ReduceOp::Prod, value, axes, init)
}

/// Max fold of `value` over the domain of `axes`.
pub fn reduce_max(value: Expr, axes: &[Var], init: Option<Expr>) -> Expr {
    fold(ReduceOp::Max, value, axes, init)
}

/// Min fold of `value` over the domain of `axes`.
pub fn reduce_min(value: Expr, axes: &[Var], init: Option<Expr>) -> Expr {
    fold(ReduceOp::Min, value, axes, init)
}

fn fold(op: ReduceOp, value: Expr, axes: &[Var], init: Option<Expr>) -> Expr {
    Expr::Reduce {
        op,
        value: Box::new(value),
        axes: axes.to_vec(),
        init: init.map(Box::new),
    }
}

impl From<i32> for Expr {
    fn from(value: i32) -> Self {
        Expr::Constant(ConstantScalarValue::Int(value as i64, IntKind::I32))
    }
}

impl From<i64> for Expr {
    fn from(value: i64) -> Self {
        Expr::Constant(ConstantScalarValue::Int(value, IntKind::I64))
    }
}

impl From<u64> for Expr {
    fn from(value: u64) -> Self {
        Expr::Constant(ConstantScalarValue::UInt(value, UIntKind::U64))
    }
}

impl From<f32> for Expr {
    fn from(value: f32) -> Self {
        Expr::Constant(ConstantScalarValue::Float(value as f64, FloatKind::F32))
    }
}

impl From<f64> for Expr {
    fn from(value: f64) -> Self {
        Expr::Constant(ConstantScalarValue::Float(value, FloatKind::F64))
    }
}

impl From<bool> for Expr {
    fn from(value: bool) -> Self {
        Expr::Constant(ConstantScalarValue::Bool(value))
    }
}

impl From<Var> for Expr {
    fn from(value: Var) -> Self {
        Expr::Var(value)
    }
}

impl core::ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Add, self, rhs)
    }
}

impl core::ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Sub, self, rhs)
    }
}

impl core::ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Mul, self, rhs)
    }
}

impl core::ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        Expr::binary(BinaryOp::Div, self, rhs)
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Max => write!(f, "max"),
            BinaryOp::Min => write!(f, "min"),
        }
    }
}

impl Display for ReduceOp {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReduceOp::Sum => write!(f, "sum"),
            ReduceOp::Prod => write!(f, "prod"),
            ReduceOp::Max => write!(f, "max"),
            ReduceOp::Min => write!(f, "min"),
        }
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Expr::Constant(value) => write!(f, "{value}"),
            Expr::Var(var) => write!(f, "{var}"),
            Expr::Binary { op, lhs, rhs } => match op {
                BinaryOp::Max | BinaryOp::Min => write!(f, "{op}({lhs}, {rhs})"),
                _ => write!(f, "({lhs} {op} {rhs})"),
            },
            Expr::Access { tensor, indices } => {
                write!(f, "{}[", tensor.name())?;
                for (i, index) in indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{index}")?;
                }
                write!(f, "]")
            }
            Expr::Reduce {
                op,
                value,
                axes,
                init,
            } => {
                write!(f, "reduce_{op}({value}, [")?;
                for (i, axis) in axes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}:{}", axis.name(), axis.extent())?;
                }
                write!(f, "]")?;
                if let Some(init) = init {
                    write!(f, ", init={init}")?;
                }
                write!(f, ")")
            }
            Expr::CallExtern { func, args } => {
                write!(f, "{func}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            Expr::TensorRef(tensor) => write!(f, "{}", tensor.name()),
        }
    }
}
