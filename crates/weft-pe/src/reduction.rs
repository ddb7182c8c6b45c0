//! Reduction primitive expressions.
//!
//! Given a symbolic input tensor, a set of axes and a fold, these builders
//! produce a new symbolic tensor whose elements are the fold of the
//! corresponding input slice. The generic path introduces one bound variable
//! per reduced dimension; the warp path instead emits calls to hardware
//! warp-reduction intrinsics over flattened trailing dimensions.

use weft_ir::{
    compute, indices_to_abs_offset, reduce_max as max_fold, reduce_min as min_fold,
    reduce_mul as mul_fold, reduce_sum as sum_fold, Expr, NameAllocator, Tensor, Var,
};

use crate::ReduceError;

/// Number of hardware lanes cooperating in one warp-reduction intrinsic.
pub const WARP_SIZE: i32 = 32;

/// Transform a raw axis list, possibly empty or holding negative elements,
/// into a sorted, duplicate-free list of dimension indices.
///
/// An empty list selects every dimension. Negative axes are offsets from the
/// last dimension, as in Python indexing.
pub fn real_axes(ndim: usize, axes: &[isize]) -> Result<Vec<usize>, ReduceError> {
    if axes.is_empty() {
        return Ok((0..ndim).collect());
    }
    let mut real = Vec::with_capacity(axes.len());
    for &axis in axes {
        let adjusted = if axis < 0 { axis + ndim as isize } else { axis };
        // The admissible upper bound is inclusive: an axis equal to the rank
        // passes validation.
        if adjusted < 0 || adjusted > ndim as isize {
            return Err(ReduceError::InvalidAxis { axis, ndim });
        }
        real.push(adjusted as usize);
    }
    real.sort_unstable();
    real.dedup();
    Ok(real)
}

/// Calculate the reduced shape.
///
/// With `keep_dims`, reduced axes stay in the result as dimensions of size
/// one, which lets the result broadcast correctly against the input.
/// Otherwise they are dropped; a result left without any dimension becomes a
/// single dimension of size one, so a full reduction yields a rank-1 scalar.
pub fn reduce_output_shape(real_axes: &[usize], shape: &[Expr], keep_dims: bool) -> Vec<Expr> {
    let mut output = Vec::with_capacity(shape.len());
    if keep_dims {
        for (i, size) in shape.iter().enumerate() {
            if real_axes.contains(&i) {
                output.push(Expr::one());
            } else {
                output.push(size.clone());
            }
        }
    } else {
        for (i, size) in shape.iter().enumerate() {
            if !real_axes.contains(&i) {
                output.push(size.clone());
            }
        }
    }
    if output.is_empty() {
        output.push(Expr::one());
    }
    output
}

/// Rebuild the full input index tuple for one output position.
///
/// Walks the input dimensions in order with two cursors: reduced dimensions
/// take the next reduction variable, the rest take the next entry of the
/// output index tuple. A reduced dimension consumes an output index slot
/// (without reading it) exactly when it isn't squeezed, since the output
/// shape then still carries it as a size-1 dimension.
pub fn reduce_input_indices(
    ndim: usize,
    real_axes: &[usize],
    squeeze_axes: &[usize],
    out_indices: &[Expr],
    reduce_vars: &[Var],
) -> Vec<Expr> {
    let mut input_indices = Vec::with_capacity(ndim);
    let mut out_cursor = 0;
    let mut reduce_cursor = 0;

    for i in 0..ndim {
        if real_axes.contains(&i) {
            input_indices.push(Expr::Var(reduce_vars[reduce_cursor].clone()));
            reduce_cursor += 1;
            if !squeeze_axes.contains(&i) {
                out_cursor += 1;
            }
            continue;
        }
        input_indices.push(out_indices[out_cursor].clone());
        out_cursor += 1;
    }
    input_indices
}

/// Create a reduction primitive expression.
///
/// One fresh reduction variable is allocated per reduced axis, ranging over
/// the input's extent along that axis, with names drawn from `alloc`. The
/// fold receives the indexed input element, the reduction variables defining
/// the fold domain, and the identity value, and returns the scalar
/// expression stored at each output position.
pub fn do_reduce<F>(
    tensor: &Tensor,
    fold: F,
    output_shape: Vec<Expr>,
    real_axes: &[usize],
    squeeze_axes: &[usize],
    initial: Option<Expr>,
    alloc: &NameAllocator,
    output_name: &str,
) -> Tensor
where
    F: Fn(Expr, &[Var], Option<Expr>) -> Expr,
{
    let reduce_vars: Vec<Var> = real_axes
        .iter()
        .map(|&axis| Var::new(tensor.shape()[axis].clone(), alloc.unique("kk")))
        .collect();

    let ndim = tensor.ndim();
    let input = tensor.clone();
    compute(
        output_shape,
        |out_indices| {
            let input_indices =
                reduce_input_indices(ndim, real_axes, squeeze_axes, out_indices, &reduce_vars);
            fold(input.index(input_indices), &reduce_vars, initial.clone())
        },
        output_name,
    )
}

/// Reduce `tensor` over `axes` with the given fold.
///
/// Sequences axis normalization, output shape inference and expression
/// construction. With `keep_dims`, no axis is squeezed; otherwise every
/// reduced axis is.
pub fn reduce<F>(
    tensor: &Tensor,
    axes: &[isize],
    fold: F,
    keep_dims: bool,
    initial: Option<Expr>,
    output_name: &str,
) -> Result<Tensor, ReduceError>
where
    F: Fn(Expr, &[Var], Option<Expr>) -> Expr,
{
    let ndim = tensor.ndim();
    if ndim == 0 {
        return Err(ReduceError::InvalidRank);
    }
    let real = real_axes(ndim, axes)?;
    let output_shape = reduce_output_shape(&real, tensor.shape(), keep_dims);
    let squeeze: &[usize] = if keep_dims { &[] } else { &real };
    log::debug!(
        "reduce {} over axes {real:?} (keep_dims={keep_dims}) -> {output_name}",
        tensor.name()
    );
    Ok(do_reduce(
        tensor,
        fold,
        output_shape,
        &real,
        squeeze,
        initial,
        &NameAllocator::process_wide(),
        output_name,
    ))
}

/// Sum of array elements over the given axes.
///
/// The identity defaults to zero in the input's element type.
pub fn reduce_sum(
    a: &Tensor,
    axes: &[isize],
    keep_dims: bool,
    initial: Option<Expr>,
    output_name: &str,
) -> Result<Tensor, ReduceError> {
    let initial = initial.unwrap_or_else(|| a.elem().constant(0));
    reduce(a, axes, sum_fold, keep_dims, Some(initial), output_name)
}

/// Product of array elements over the given axes.
///
/// The identity defaults to one in the input's element type.
pub fn reduce_prod(
    a: &Tensor,
    axes: &[isize],
    keep_dims: bool,
    initial: Option<Expr>,
    output_name: &str,
) -> Result<Tensor, ReduceError> {
    let initial = initial.unwrap_or_else(|| a.elem().constant(1));
    reduce(a, axes, mul_fold, keep_dims, Some(initial), output_name)
}

/// Maximum of array elements over the given axes.
///
/// The fold has no identity; it is seeded with the first visited element.
pub fn reduce_max(
    a: &Tensor,
    axes: &[isize],
    keep_dims: bool,
    _initial: Option<Expr>,
    output_name: &str,
) -> Result<Tensor, ReduceError> {
    reduce(a, axes, max_fold, keep_dims, None, output_name)
}

/// Minimum of array elements over the given axes.
///
/// The fold has no identity; it is seeded with the first visited element.
pub fn reduce_min(
    a: &Tensor,
    axes: &[isize],
    keep_dims: bool,
    _initial: Option<Expr>,
    output_name: &str,
) -> Result<Tensor, ReduceError> {
    reduce(a, axes, min_fold, keep_dims, None, output_name)
}

/// Reduce the trailing `last_reduce_dim_num` dimensions with a hardware
/// warp-reduction intrinsic.
///
/// Returns `(out, tmp_out)`. `tmp_out` extends the leading dimensions with a
/// warp dimension of [`WARP_SIZE`]; every position along it calls the
/// intrinsic with the input tensor, the flattened base offset of the row
/// being reduced, and the lane count, and receives the same reduced value.
/// `out` keeps only the leading dimensions and selects lane 0. The caller is
/// expected to bind `tmp_out` to an appropriate memory scope when lowering.
///
/// The reduced dimensions must be the innermost, contiguous ones, and their
/// sizes must be compile-time constants: the intrinsic strides through
/// `lane` contiguous elements starting at the base offset.
pub fn warp_reduce(
    a: &Tensor,
    last_reduce_dim_num: usize,
    reduce_type: &str,
    output_name: &str,
) -> Result<(Tensor, Tensor), ReduceError> {
    let ndim = a.ndim();
    if ndim == 0 {
        return Err(ReduceError::InvalidRank);
    }
    if last_reduce_dim_num == 0 || last_reduce_dim_num > ndim {
        return Err(ReduceError::InvalidAxis {
            axis: last_reduce_dim_num as isize,
            ndim,
        });
    }
    let split = ndim - last_reduce_dim_num;

    let mut lane: i64 = 1;
    for (axis, size) in a.shape().iter().enumerate().skip(split) {
        lane *= size
            .as_i64()
            .ok_or(ReduceError::NonConstantWarpDimension { axis })?;
    }
    log::debug!(
        "warp reduce {} with {reduce_type}: lane={lane}, {split} leading dims",
        a.name()
    );

    // The index tuple passed to the offset computation is the leading
    // indices plus one zero per reduced dimension; check its length against
    // the rank once, before any call site is built.
    let probe = vec![Expr::zero(); split + last_reduce_dim_num];
    indices_to_abs_offset(a.shape(), &probe)?;

    let alloc = NameAllocator::process_wide();
    let input = a.clone();
    let mut tmp_shape: Vec<Expr> = a.shape()[..split].to_vec();
    tmp_shape.push(Expr::from(WARP_SIZE));
    let tmp_out = compute(
        tmp_shape,
        |indices| {
            let mut input_indices: Vec<Expr> = indices[..indices.len() - 1].to_vec();
            input_indices.extend((0..last_reduce_dim_num).map(|_| Expr::zero()));
            let offset = indices_to_abs_offset(input.shape(), &input_indices)
                .expect("index tuple covers every input dimension");
            Expr::CallExtern {
                func: reduce_type.to_string(),
                args: vec![
                    Expr::TensorRef(input.clone()),
                    offset,
                    Expr::from(lane),
                ],
            }
        },
        alloc.unique(&format!("{output_name}_{reduce_type}")),
    );

    let out_shape: Vec<Expr> = a.shape()[..split].to_vec();
    let out = compute(
        out_shape,
        |indices| {
            let mut tmp_indices: Vec<Expr> = indices.to_vec();
            tmp_indices.push(Expr::zero());
            tmp_out.index(tmp_indices)
        },
        alloc.unique(output_name),
    );

    Ok((out, tmp_out))
}

/// Find the max of array elements over the trailing dimensions with a warp
/// intrinsic.
pub fn warp_reduce_max(
    a: &Tensor,
    last_reduce_dim_num: usize,
    output_name: &str,
) -> Result<(Tensor, Tensor), ReduceError> {
    warp_reduce(a, last_reduce_dim_num, "weft_warp_reduce_max", output_name)
}

/// Compute the sum of array elements over the trailing dimensions with a
/// warp intrinsic.
pub fn warp_reduce_sum(
    a: &Tensor,
    last_reduce_dim_num: usize,
    output_name: &str,
) -> Result<(Tensor, Tensor), ReduceError> {
    warp_reduce(a, last_reduce_dim_num, "weft_warp_reduce_sum", output_name)
}

/// Compute the average of array elements over the trailing dimensions with a
/// warp intrinsic.
pub fn warp_reduce_avg(
    a: &Tensor,
    last_reduce_dim_num: usize,
    output_name: &str,
) -> Result<(Tensor, Tensor), ReduceError> {
    warp_reduce(a, last_reduce_dim_num, "weft_warp_reduce_avg", output_name)
}
