use core::fmt::Display;

use derive_new::new;

use crate::Expr;

/// An index tuple did not cover every dimension of the shape it indexes.
#[derive(new, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShapeMismatch {
    pub expected: usize,
    pub found: usize,
}

impl Display for ShapeMismatch {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "index tuple of length {} doesn't match a rank-{} shape",
            self.found, self.expected
        )
    }
}

impl std::error::Error for ShapeMismatch {}

/// Flatten an index tuple into the absolute element offset of a row-major
/// buffer with the given shape.
pub fn indices_to_abs_offset(shape: &[Expr], indices: &[Expr]) -> Result<Expr, ShapeMismatch> {
    if shape.len() != indices.len() {
        return Err(ShapeMismatch::new(shape.len(), indices.len()));
    }
    let mut offset = Expr::zero();
    for (extent, index) in shape.iter().zip(indices) {
        offset = offset * extent.clone() + index.clone();
    }
    Ok(offset)
}
