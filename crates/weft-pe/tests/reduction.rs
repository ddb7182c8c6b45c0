use pretty_assertions::assert_eq;

use weft_ir::eval::{eval_expr, eval_tensor, Bindings, Env};
use weft_ir::{Elem, Expr, FloatKind, Tensor, TensorKind};
use weft_pe::{
    reduce_max, reduce_min, reduce_prod, reduce_sum, warp_reduce_avg, warp_reduce_max,
    warp_reduce_sum,
};

fn placeholder(name: &str, dims: &[i32]) -> Tensor {
    Tensor::placeholder(
        name,
        dims.iter().map(|&d| Expr::from(d)).collect(),
        Elem::Float(FloatKind::F32),
    )
}

fn bindings(name: &str, data: Vec<f64>) -> Bindings {
    Bindings::from_iter([(name.to_string(), data)])
}

fn const_shape(tensor: &Tensor) -> Vec<i64> {
    tensor
        .shape()
        .iter()
        .map(|size| size.as_i64().unwrap())
        .collect()
}

#[test]
fn sum_over_middle_axis_squeezed() {
    let a = placeholder("a", &[2, 3, 4]);
    let data: Vec<f64> = (0..24).map(f64::from).collect();
    let out = reduce_sum(&a, &[1], false, None, "out").unwrap();

    assert_eq!(const_shape(&out), vec![2, 4]);
    let values = eval_tensor(&out, &bindings("a", data.clone())).unwrap();
    for i in 0..2 {
        for k in 0..4 {
            let expected: f64 = (0..3).map(|j| data[i * 12 + j * 4 + k]).sum();
            assert_eq!(values[i * 4 + k], expected);
        }
    }
}

#[test]
fn sum_over_middle_axis_kept() {
    let a = placeholder("a", &[2, 3, 4]);
    let data: Vec<f64> = (0..24).map(f64::from).collect();
    let out = reduce_sum(&a, &[1], true, None, "out").unwrap();

    assert_eq!(const_shape(&out), vec![2, 1, 4]);
    let values = eval_tensor(&out, &bindings("a", data.clone())).unwrap();
    let squeezed = eval_tensor(
        &reduce_sum(&a, &[1], false, None, "ref").unwrap(),
        &bindings("a", data),
    )
    .unwrap();
    // Keeping the reduced axis as size 1 changes the shape, not the values.
    assert_eq!(values, squeezed);
}

#[test]
fn full_sum_collapses_to_rank_one() {
    let a = placeholder("a", &[5]);
    let out = reduce_sum(&a, &[], false, None, "out").unwrap();

    assert_eq!(const_shape(&out), vec![1]);
    let values = eval_tensor(&out, &bindings("a", vec![1.0, 2.0, 3.0, 4.0, 5.0])).unwrap();
    assert_eq!(values, vec![15.0]);
}

#[test]
fn reducing_the_last_dimension_of_a_vector_of_one() {
    let a = placeholder("a", &[1]);
    let out = reduce_sum(&a, &[], false, None, "out").unwrap();
    assert_eq!(const_shape(&out), vec![1]);
    let values = eval_tensor(&out, &bindings("a", vec![42.0])).unwrap();
    assert_eq!(values, vec![42.0]);
}

#[test]
fn sum_over_a_size_one_axis_is_the_identity() {
    let a = placeholder("a", &[2, 1]);
    let out = reduce_sum(&a, &[1], false, None, "out").unwrap();
    let values = eval_tensor(&out, &bindings("a", vec![3.0, 5.0])).unwrap();
    assert_eq!(values, vec![3.0, 5.0]);
}

#[test]
fn prod_over_a_size_one_axis_is_the_identity() {
    let a = placeholder("a", &[2, 1]);
    let out = reduce_prod(&a, &[1], false, None, "out").unwrap();
    let values = eval_tensor(&out, &bindings("a", vec![3.0, 5.0])).unwrap();
    assert_eq!(values, vec![3.0, 5.0]);
}

#[test]
fn prod_multiplies_along_the_axis() {
    let a = placeholder("a", &[2, 3]);
    let out = reduce_prod(&a, &[1], false, None, "out").unwrap();
    let values =
        eval_tensor(&out, &bindings("a", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();
    assert_eq!(values, vec![6.0, 120.0]);
}

#[test]
fn max_seeds_from_the_first_element() {
    // Every element is negative, so a zero identity would be wrong.
    let a = placeholder("a", &[2, 2]);
    let out = reduce_max(&a, &[1], false, None, "out").unwrap();
    let values = eval_tensor(&out, &bindings("a", vec![-5.0, -3.0, -7.0, -2.0])).unwrap();
    assert_eq!(values, vec![-3.0, -2.0]);
}

#[test]
fn min_seeds_from_the_first_element() {
    let a = placeholder("a", &[2, 2]);
    let out = reduce_min(&a, &[1], false, None, "out").unwrap();
    let values = eval_tensor(&out, &bindings("a", vec![5.0, 3.0, 7.0, 2.0])).unwrap();
    assert_eq!(values, vec![3.0, 2.0]);
}

#[test]
fn negative_axis_reduces_the_last_dimension() {
    let a = placeholder("a", &[2, 3]);
    let out = reduce_sum(&a, &[-1], false, None, "out").unwrap();
    assert_eq!(const_shape(&out), vec![2]);
    let values =
        eval_tensor(&out, &bindings("a", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();
    assert_eq!(values, vec![6.0, 15.0]);
}

#[test]
fn warp_reduce_shapes_offsets_and_lanes() {
    let a = placeholder("a", &[8, 64]);
    let (out, tmp_out) = warp_reduce_sum(&a, 1, "out").unwrap();

    assert_eq!(const_shape(&tmp_out), vec![8, 32]);
    assert_eq!(const_shape(&out), vec![8]);

    let (axes, body) = match tmp_out.kind() {
        TensorKind::Compute { axes, body } => (axes, body),
        TensorKind::Placeholder => panic!("expected a compute definition"),
    };
    let (offset, lane) = match body {
        Expr::CallExtern { func, args } => {
            assert_eq!(func, "weft_warp_reduce_sum");
            (&args[1], &args[2])
        }
        other => panic!("expected an extern call, got {other}"),
    };
    assert_eq!(lane.as_i64(), Some(64));

    // Every call site along the warp dimension reads the same base offset,
    // aligned to the start of the row being reduced.
    for row in 0..8 {
        for lane_pos in [0, 31] {
            let env = Env::from_iter([
                (axes[0].name().to_string(), row),
                (axes[1].name().to_string(), lane_pos),
            ]);
            let offset = eval_expr(offset, &env, &Bindings::new()).unwrap() as i64;
            assert_eq!(offset % 64, 0);
            assert_eq!(offset, row * 64);
        }
    }
}

#[test]
fn warp_reduce_sum_matches_a_direct_fold() {
    let a = placeholder("a", &[4, 8]);
    let data: Vec<f64> = (0..32).map(f64::from).collect();
    let (out, tmp_out) = warp_reduce_sum(&a, 1, "out").unwrap();

    let values = eval_tensor(&out, &bindings("a", data.clone())).unwrap();
    for row in 0..4 {
        let expected: f64 = data[row * 8..(row + 1) * 8].iter().sum();
        assert_eq!(values[row], expected);
    }

    // The intrinsic returns the reduced value to every lane of the warp.
    let warp = eval_tensor(&tmp_out, &bindings("a", data)).unwrap();
    for row in 0..4 {
        for lane_pos in 0..32 {
            assert_eq!(warp[row * 32 + lane_pos], values[row]);
        }
    }
}

#[test]
fn warp_reduce_max_and_avg_values() {
    let a = placeholder("a", &[2, 4]);
    let data = vec![1.0, 9.0, 2.0, 4.0, -8.0, -1.0, -5.0, -2.0];

    let (max_out, _) = warp_reduce_max(&a, 1, "out").unwrap();
    let values = eval_tensor(&max_out, &bindings("a", data.clone())).unwrap();
    assert_eq!(values, vec![9.0, -1.0]);

    let (avg_out, _) = warp_reduce_avg(&a, 1, "out").unwrap();
    let values = eval_tensor(&avg_out, &bindings("a", data)).unwrap();
    assert_eq!(values, vec![4.0, -4.0]);
}

#[test]
fn warp_reduce_over_every_dimension() {
    let a = placeholder("a", &[2, 3]);
    let (out, tmp_out) = warp_reduce_sum(&a, 2, "out").unwrap();

    // No leading dimension survives: the scratch tensor is one warp wide
    // and the result is a single value.
    assert_eq!(const_shape(&tmp_out), vec![32]);
    assert_eq!(const_shape(&out), Vec::<i64>::new());
    let values = eval_tensor(&out, &bindings("a", vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])).unwrap();
    assert_eq!(values, vec![21.0]);
}

#[test]
fn caller_supplied_identity_is_used() {
    let a = placeholder("a", &[3]);
    let out = reduce_sum(&a, &[0], false, Some(Expr::from(100.0)), "out").unwrap();
    let values = eval_tensor(&out, &bindings("a", vec![1.0, 2.0, 3.0])).unwrap();
    assert_eq!(values, vec![106.0]);
}
