use core::fmt::Display;

use weft_ir::ShapeMismatch;

/// Errors raised while building reduction primitive expressions.
///
/// All of them are construction-time precondition violations: they indicate
/// a malformed compilation request and abort the construction step, never a
/// transient failure with a retry path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReduceError {
    /// The input tensor has rank 0.
    InvalidRank,

    /// An axis falls outside the admissible range after negative-index
    /// adjustment.
    InvalidAxis { axis: isize, ndim: usize },

    /// An index tuple doesn't cover every input dimension.
    ShapeMismatch(ShapeMismatch),

    /// A trailing reduced dimension has no compile-time size, so no lane
    /// count can be derived for the warp intrinsic.
    NonConstantWarpDimension { axis: usize },
}

impl From<ShapeMismatch> for ReduceError {
    fn from(value: ShapeMismatch) -> Self {
        Self::ShapeMismatch(value)
    }
}

impl Display for ReduceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ReduceError::InvalidRank => {
                write!(f, "reduced tensor must have at least one dimension")
            }
            ReduceError::InvalidAxis { axis, ndim } => {
                write!(f, "axis {axis} is out of range for a rank-{ndim} tensor")
            }
            ReduceError::ShapeMismatch(inner) => write!(f, "{inner}"),
            ReduceError::NonConstantWarpDimension { axis } => {
                write!(f, "warp-reduced dimension {axis} has no compile-time size")
            }
        }
    }
}

impl std::error::Error for ReduceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReduceError::ShapeMismatch(inner) => Some(inner),
            _ => None,
        }
    }
}
