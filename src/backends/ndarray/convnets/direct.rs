use ndarray::{s, Array4, ArrayView3, Axis, LinalgScalar};
use tracing::trace;

use super::common::pad_array4;
use crate::backends::convnets::{ConvGeometry, Padding, Stride2};
use crate::common::types::HResult;

/// Reference convolution: every output element is the sum of the elementwise
/// product between one kernel and the matching window of the padded input.
pub fn conv2d_direct<A>(
    input_batch: &Array4<A>,
    kernels: &Array4<A>,
    strides: Stride2,
    padding: Padding,
) -> HResult<Array4<A>>
where
    A: LinalgScalar,
{
    let geometry = ConvGeometry::new(input_batch.shape(), kernels.shape(), strides, padding)?;
    trace!(?geometry, "direct convolution");

    let input = pad_array4(input_batch, geometry.pads(), A::zero());
    let (kh, kw) = geometry.kernel();
    let mut output = Array4::<A>::zeros(geometry.output_shape());

    for (r, image) in input.axis_iter(Axis(0)).enumerate() {
        for (k, kernel) in kernels.axis_iter(Axis(3)).enumerate() {
            for i in 0..geometry.out_h {
                for j in 0..geometry.out_w {
                    let (hr, wr) = (i * strides.0, j * strides.1);
                    let window: ArrayView3<A> = image.slice(s![hr..hr + kh, wr..wr + kw, ..]);
                    output[[r, i, j, k]] = (&window * &kernel).sum();
                }
            }
        }
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ndarray::convnets::common::test_utils;
    use ndarray::{array, Array3};

    #[cfg_attr(rustfmt, rustfmt_skip)]
    #[test]
    fn test_strides_1() {
        let input = test_utils::get_input();
        let kernels = test_utils::get_kernels();
        let output = conv2d_direct(&input, &kernels, (1, 1), Padding::Valid).unwrap();
        assert_eq!(output.shape(), &[2, 3, 3, 2]);
        let exp_output_s1: Array3<f64> = array![
            [[62., 45.], [73., 56.], [74., 57.]],
            [[78., 47.], [65., 67.], [75., 70.]],
            [[68., 58.], [72., 61.], [82., 61.]]
        ];
        assert_eq!(output.index_axis(Axis(0), 0), exp_output_s1);
    }

    #[cfg_attr(rustfmt, rustfmt_skip)]
    #[test]
    fn test_strides_2_1() {
        let input = test_utils::get_input();
        let kernels = test_utils::get_kernels();
        let output = conv2d_direct(&input, &kernels, (2, 1), Padding::Valid).unwrap();
        assert_eq!(output.shape(), &[2, 2, 3, 2]);
        let exp_output_s2: Array3<f64> = array![
            [[57., 45.], [61., 58.], [56., 64.]],
            [[72., 63.], [86., 68.], [97., 57.]]
        ];
        assert_eq!(output.index_axis(Axis(0), 1), exp_output_s2);
    }

    #[cfg_attr(rustfmt, rustfmt_skip)]
    #[test]
    fn test_same_padding_border() {
        let input = test_utils::get_input();
        let kernels = test_utils::get_kernels();
        let output = conv2d_direct(&input, &kernels, (1, 1), Padding::Same).unwrap();
        assert_eq!(output.shape(), &[2, 5, 5, 2]);
        assert_eq!(output.slice(s![0, 0, .., 0]).to_vec(), vec![14., 41., 55., 64., 34.]);
        assert_eq!(output.slice(s![1, 4, .., 1]).to_vec(), vec![27., 62., 49., 66., 48.]);
    }

    #[test]
    fn test_window_spans_kernel_rows() {
        // A kernel that only looks at its bottom row must see the row below
        // the window origin, not a single fixed row.
        let input = test_utils::get_ramp_input();
        let mut kernels = Array4::<f64>::zeros((2, 1, 1, 1));
        kernels[[1, 0, 0, 0]] = 1.0;
        let output = conv2d_direct(&input, &kernels, (1, 1), Padding::Valid).unwrap();
        assert_eq!(output.shape(), &[1, 3, 4, 1]);
        let exp_output: Array3<f64> = array![
            [[4.], [5.], [6.], [7.]],
            [[8.], [9.], [10.], [11.]],
            [[12.], [13.], [14.], [15.]]
        ];
        assert_eq!(output.index_axis(Axis(0), 0), exp_output);
    }
}
