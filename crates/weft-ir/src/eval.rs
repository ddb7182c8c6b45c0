//! Reference interpreter for symbolic tensors and expressions.
//!
//! The interpreter enumerates a compute definition's index domain and
//! evaluates its body against placeholder buffers, so tests can check the
//! numeric behavior of built expressions without a scheduler or code
//! generator. Shapes must evaluate to compile-time constants. This is a
//! debugging and testing facility, not a runtime.

use core::fmt::Display;

use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::{BinaryOp, Expr, ReduceOp, Tensor, TensorKind};

/// Placeholder buffers, keyed by tensor name, in row-major order.
pub type Bindings = HashMap<String, Vec<f64>>;

/// Bound integer values for loop variables, keyed by variable name.
pub type Env = HashMap<String, i64>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// No buffer was bound for a placeholder tensor.
    MissingBuffer(String),
    /// A bound buffer doesn't have one value per tensor element.
    BufferSizeMismatch {
        tensor: String,
        expected: usize,
        found: usize,
    },
    /// A tensor shape doesn't evaluate to compile-time constants.
    NonConstantShape(String),
    /// A variable was referenced outside the scope binding it.
    UnboundVar(String),
    /// An extern call references a function the interpreter doesn't model.
    UnknownExtern(String),
    /// An extern call's arguments don't match the intrinsic's signature.
    ExternCallArgs(String),
    /// A fold without an identity value visited no elements.
    EmptyReduction,
    /// A tensor handle appeared where a scalar was expected.
    StrayTensorRef(String),
    /// An element read fell outside the tensor's buffer.
    OutOfBounds {
        tensor: String,
        offset: usize,
        len: usize,
    },
}

impl Display for EvalError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EvalError::MissingBuffer(name) => write!(f, "no buffer bound for tensor {name}"),
            EvalError::BufferSizeMismatch {
                tensor,
                expected,
                found,
            } => write!(
                f,
                "buffer for tensor {tensor} has {found} values, expected {expected}"
            ),
            EvalError::NonConstantShape(name) => {
                write!(f, "tensor {name} has a shape with no compile-time value")
            }
            EvalError::UnboundVar(name) => write!(f, "variable {name} isn't bound"),
            EvalError::UnknownExtern(func) => write!(f, "unknown extern function {func}"),
            EvalError::ExternCallArgs(func) => {
                write!(f, "extern call to {func} has unexpected arguments")
            }
            EvalError::EmptyReduction => {
                write!(f, "fold without an identity value over an empty domain")
            }
            EvalError::StrayTensorRef(name) => {
                write!(f, "tensor {name} referenced where a scalar was expected")
            }
            EvalError::OutOfBounds {
                tensor,
                offset,
                len,
            } => write!(
                f,
                "offset {offset} is out of bounds for tensor {tensor} of {len} elements"
            ),
        }
    }
}

impl std::error::Error for EvalError {}

/// Evaluate a tensor to a flat row-major buffer.
pub fn eval_tensor(tensor: &Tensor, bindings: &Bindings) -> Result<Vec<f64>, EvalError> {
    let dims = const_dims(tensor)?;
    let total: usize = dims.iter().map(|&d| d as usize).product();
    match tensor.kind() {
        TensorKind::Placeholder => {
            let buffer = bindings
                .get(tensor.name())
                .ok_or_else(|| EvalError::MissingBuffer(tensor.name().to_string()))?;
            if buffer.len() != total {
                return Err(EvalError::BufferSizeMismatch {
                    tensor: tensor.name().to_string(),
                    expected: total,
                    found: buffer.len(),
                });
            }
            Ok(buffer.clone())
        }
        TensorKind::Compute { axes, body } => {
            log::trace!(
                "evaluating compute definition {} ({total} elements)",
                tensor.name()
            );
            let mut out = Vec::with_capacity(total);
            let mut env = Env::new();
            let mut point: SmallVec<[i64; 4]> = SmallVec::from_elem(0, dims.len());
            for flat in 0..total {
                unflatten(flat, &dims, &mut point);
                env.clear();
                for (axis, value) in axes.iter().zip(&point) {
                    env.insert(axis.name().to_string(), *value);
                }
                out.push(eval_expr(body, &env, bindings)?);
            }
            Ok(out)
        }
    }
}

/// Evaluate a scalar expression under the given variable bindings.
pub fn eval_expr(expr: &Expr, env: &Env, bindings: &Bindings) -> Result<f64, EvalError> {
    match expr {
        Expr::Constant(value) => Ok(value.as_f64()),
        Expr::Var(var) => env
            .get(var.name())
            .map(|&value| value as f64)
            .ok_or_else(|| EvalError::UnboundVar(var.name().to_string())),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = eval_expr(lhs, env, bindings)?;
            let rhs = eval_expr(rhs, env, bindings)?;
            Ok(match op {
                BinaryOp::Add => lhs + rhs,
                BinaryOp::Sub => lhs - rhs,
                BinaryOp::Mul => lhs * rhs,
                BinaryOp::Div => lhs / rhs,
                BinaryOp::Max => lhs.max(rhs),
                BinaryOp::Min => lhs.min(rhs),
            })
        }
        Expr::Access { tensor, indices } => {
            let mut point: SmallVec<[i64; 4]> = SmallVec::with_capacity(indices.len());
            for index in indices {
                point.push(eval_expr(index, env, bindings)? as i64);
            }
            element_of(tensor, &point, bindings)
        }
        Expr::Reduce {
            op,
            value,
            axes,
            init,
        } => {
            let mut extents: SmallVec<[i64; 4]> = SmallVec::with_capacity(axes.len());
            for axis in axes {
                extents.push(eval_expr(axis.extent(), env, bindings)? as i64);
            }
            let mut acc = match init {
                Some(init) => Some(eval_expr(init, env, bindings)?),
                None => None,
            };
            let total: usize = extents.iter().map(|&e| e as usize).product();
            let mut env = env.clone();
            let mut point: SmallVec<[i64; 4]> = SmallVec::from_elem(0, extents.len());
            for flat in 0..total {
                unflatten(flat, &extents, &mut point);
                for (axis, value) in axes.iter().zip(&point) {
                    env.insert(axis.name().to_string(), *value);
                }
                let value = eval_expr(value, &env, bindings)?;
                acc = Some(match acc {
                    None => value,
                    Some(acc) => combine(*op, acc, value),
                });
            }
            acc.ok_or(EvalError::EmptyReduction)
        }
        Expr::CallExtern { func, args } => eval_extern(func, args, env, bindings),
        Expr::TensorRef(tensor) => Err(EvalError::StrayTensorRef(tensor.name().to_string())),
    }
}

fn combine(op: ReduceOp, acc: f64, value: f64) -> f64 {
    match op {
        ReduceOp::Sum => acc + value,
        ReduceOp::Prod => acc * value,
        ReduceOp::Max => acc.max(value),
        ReduceOp::Min => acc.min(value),
    }
}

/// Warp reduction intrinsics fold `lane` contiguous elements starting at a
/// flattened offset, returning the same value to every lane.
fn eval_extern(
    func: &str,
    args: &[Expr],
    env: &Env,
    bindings: &Bindings,
) -> Result<f64, EvalError> {
    let op = match func {
        "weft_warp_reduce_sum" | "weft_warp_reduce_avg" => ReduceOp::Sum,
        "weft_warp_reduce_max" => ReduceOp::Max,
        _ => return Err(EvalError::UnknownExtern(func.to_string())),
    };
    let (tensor, offset, lane) = match args {
        [Expr::TensorRef(tensor), offset, lane] => (tensor, offset, lane),
        _ => return Err(EvalError::ExternCallArgs(func.to_string())),
    };
    let offset = eval_expr(offset, env, bindings)? as usize;
    let lane = eval_expr(lane, env, bindings)? as usize;

    let buffer = eval_tensor(tensor, bindings)?;
    if offset + lane > buffer.len() {
        return Err(EvalError::OutOfBounds {
            tensor: tensor.name().to_string(),
            offset: offset + lane - 1,
            len: buffer.len(),
        });
    }
    let folded = buffer[offset..offset + lane]
        .iter()
        .copied()
        .reduce(|acc, value| combine(op, acc, value))
        .ok_or(EvalError::EmptyReduction)?;
    Ok(if func == "weft_warp_reduce_avg" {
        folded / lane as f64
    } else {
        folded
    })
}

fn element_of(tensor: &Tensor, point: &[i64], bindings: &Bindings) -> Result<f64, EvalError> {
    let dims = const_dims(tensor)?;
    let mut flat = 0usize;
    for (extent, index) in dims.iter().zip(point) {
        flat = flat * *extent as usize + *index as usize;
    }
    let buffer = eval_tensor(tensor, bindings)?;
    buffer.get(flat).copied().ok_or(EvalError::OutOfBounds {
        tensor: tensor.name().to_string(),
        offset: flat,
        len: buffer.len(),
    })
}

fn const_dims(tensor: &Tensor) -> Result<SmallVec<[i64; 4]>, EvalError> {
    let empty = Env::new();
    let none = Bindings::new();
    tensor
        .shape()
        .iter()
        .map(|size| {
            eval_expr(size, &empty, &none)
                .map(|value| value as i64)
                .map_err(|_| EvalError::NonConstantShape(tensor.name().to_string()))
        })
        .collect()
}

fn unflatten(flat: usize, dims: &[i64], point: &mut [i64]) {
    let mut rem = flat as i64;
    for d in (0..dims.len()).rev() {
        point[d] = rem % dims[d];
        rem /= dims[d];
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{compute, reduce_sum, Elem, FloatKind, Var};

    fn buffers(name: &str, data: &[f64]) -> Bindings {
        Bindings::from_iter([(name.to_string(), data.to_vec())])
    }

    fn placeholder(name: &str, dims: &[i32]) -> Tensor {
        Tensor::placeholder(
            name,
            dims.iter().map(|&d| Expr::from(d)).collect(),
            Elem::Float(FloatKind::F32),
        )
    }

    #[test]
    fn elementwise_compute() {
        let a = placeholder("a", &[2, 2]);
        let b = compute(
            a.shape().to_vec(),
            |indices| a.index(indices.to_vec()) * Expr::from(2.0),
            "b",
        );
        let out = eval_tensor(&b, &buffers("a", &[1.0, 2.0, 3.0, 4.0])).unwrap();
        assert_eq!(out, vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn fold_with_identity() {
        let a = placeholder("a", &[3]);
        let axis = Var::new(Expr::from(3), "kk_eval_0");
        let body = reduce_sum(
            a.index(vec![Expr::Var(axis.clone())]),
            &[axis],
            Some(Expr::from(0.0)),
        );
        let value = eval_expr(&body, &Env::new(), &buffers("a", &[1.0, 2.0, 4.0])).unwrap();
        assert_eq!(value, 7.0);
    }

    #[test]
    fn missing_buffer_is_reported() {
        let a = placeholder("a", &[2]);
        let err = eval_tensor(&a, &Bindings::new()).unwrap_err();
        assert_eq!(err, EvalError::MissingBuffer("a".to_string()));
    }

    #[test]
    fn buffer_length_is_checked() {
        let a = placeholder("a", &[4]);
        let err = eval_tensor(&a, &buffers("a", &[1.0, 2.0])).unwrap_err();
        assert_eq!(
            err,
            EvalError::BufferSizeMismatch {
                tensor: "a".to_string(),
                expected: 4,
                found: 2,
            }
        );
    }

    #[test]
    fn unbound_variable_is_reported() {
        let var = Expr::Var(Var::new(Expr::from(2), "loose"));
        let err = eval_expr(&var, &Env::new(), &Bindings::new()).unwrap_err();
        assert_eq!(err, EvalError::UnboundVar("loose".to_string()));
    }

    #[test]
    fn warp_intrinsics_fold_contiguous_lanes() {
        let a = placeholder("a", &[8]);
        let call = Expr::CallExtern {
            func: "weft_warp_reduce_sum".to_string(),
            args: vec![Expr::TensorRef(a.clone()), Expr::from(4), Expr::from(4)],
        };
        let data = buffers("a", &[1.0, 1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(eval_expr(&call, &Env::new(), &data).unwrap(), 14.0);

        let avg = Expr::CallExtern {
            func: "weft_warp_reduce_avg".to_string(),
            args: vec![Expr::TensorRef(a), Expr::from(4), Expr::from(4)],
        };
        assert_eq!(eval_expr(&avg, &Env::new(), &data).unwrap(), 3.5);
    }

    #[test]
    fn unknown_extern_is_rejected() {
        let a = placeholder("a", &[2]);
        let call = Expr::CallExtern {
            func: "weft_warp_reduce_median".to_string(),
            args: vec![Expr::TensorRef(a), Expr::zero(), Expr::from(2)],
        };
        let err = eval_expr(&call, &Env::new(), &buffers("a", &[1.0, 2.0])).unwrap_err();
        assert_eq!(
            err,
            EvalError::UnknownExtern("weft_warp_reduce_median".to_string())
        );
    }
}
