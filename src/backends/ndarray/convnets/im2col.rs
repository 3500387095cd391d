use ndarray::{
    s, stack, Array, Array2, Array4, Array5, ArrayBase, ArrayView4, Axis, Data, Ix2, Ix4, Ix5,
    LinalgScalar, ShapeError,
};
use tracing::debug;

use super::common::pad_array4;
use crate::backends::convnets::{ConvGeometry, Kernel2, Padding, Stride2};
use crate::common::types::HResult;

/// Collects every receptive window of `padded` into a stack of shape
/// `(out_h * out_w, batch, kernel_h, kernel_w, channels)`.
///
/// Windows are ordered height-major: position `i * out_w + j` holds the
/// window whose top-left corner is `(i * strides.0, j * strides.1)`.
pub fn extract_windows<A, S>(
    padded: &ArrayBase<S, Ix4>,
    kernel: Kernel2,
    strides: Stride2,
    out_dims: (usize, usize),
) -> Result<Array5<A>, ShapeError>
where
    A: Clone,
    S: Data<Elem = A>,
{
    let (kh, kw) = kernel;
    let (out_h, out_w) = out_dims;
    let mut windows: Vec<ArrayView4<A>> = Vec::with_capacity(out_h * out_w);
    for i in 0..out_h {
        for j in 0..out_w {
            let (hr, wr) = (i * strides.0, j * strides.1);
            windows.push(padded.slice(s![.., hr..hr + kh, wr..wr + kw, ..]));
        }
    }
    stack(Axis(0), windows.as_slice())
}

/// Reshapes a window stack into a matrix with one window per row.
pub fn flatten_windows<A, S>(
    windows: &ArrayBase<S, Ix5>,
) -> Result<Array2<A>, ShapeError>
where
    A: Clone,
    S: Data<Elem = A>,
{
    let (p, n, kh, kw, c) = windows.dim();
    Array2::from_shape_vec((p * n, kh * kw * c), windows.iter().cloned().collect())
}

/// Inverse of `flatten_windows` for a stack of the given `dims`.
pub fn unflatten_windows<A, S>(
    matrix: &ArrayBase<S, Ix2>,
    dims: (usize, usize, usize, usize, usize),
) -> Result<Array5<A>, ShapeError>
where
    A: Clone,
    S: Data<Elem = A>,
{
    Array5::from_shape_vec(dims, matrix.iter().cloned().collect())
}

/// Flattens `(kernel_h, kernel_w, channels, n_filters)` into
/// `(kernel_h * kernel_w * channels, n_filters)`.
pub fn flatten_filters<A, S>(filters: &ArrayBase<S, Ix4>) -> Result<Array2<A>, ShapeError>
where
    A: Clone,
    S: Data<Elem = A>,
{
    let (kh, kw, c, f) = filters.dim();
    Array2::from_shape_vec((kh * kw * c, f), filters.iter().cloned().collect())
}

/// Pads the input and lays its windows out as rows of a matrix of shape
/// `(out_h * out_w * batch, kernel_h * kernel_w * channels)`.
pub fn im2col<A, S>(input_batch: &ArrayBase<S, Ix4>, geometry: &ConvGeometry) -> HResult<Array2<A>>
where
    A: LinalgScalar,
    S: Data<Elem = A>,
{
    let padded = pad_array4(input_batch, geometry.pads(), A::zero());
    let windows = extract_windows(
        &padded,
        geometry.kernel(),
        geometry.strides,
        (geometry.out_h, geometry.out_w),
    )?;
    Ok(flatten_windows(&windows)?)
}

/// Reorders the `(out_h * out_w * batch, n_filters)` product into
/// `(batch, out_h, out_w, n_filters)`.
pub(crate) fn cols_to_output<A>(z: Array2<A>, geometry: &ConvGeometry) -> HResult<Array4<A>>
where
    A: Clone,
{
    let z = z
        .into_shape((geometry.out_h, geometry.out_w, geometry.batch, geometry.n_filters))?
        .permuted_axes([2, 0, 1, 3]);
    Ok(z.as_standard_layout().into_owned())
}

/// Inverse of `cols_to_output`, used to route output gradients back to rows.
pub(crate) fn output_to_cols<A, S>(
    output: &ArrayBase<S, Ix4>,
    geometry: &ConvGeometry,
) -> HResult<Array2<A>>
where
    A: Clone,
    S: Data<Elem = A>,
{
    let reordered = output.view().permuted_axes([1, 2, 0, 3]);
    Ok(Array::from_shape_vec(
        (geometry.num_windows(), geometry.n_filters),
        reordered.iter().cloned().collect(),
    )?)
}

/// Convolution as a single matrix product between the flattened windows and
/// the flattened filters. No nonlinearity is applied.
pub fn conv2d_im2col<A>(
    input_batch: &Array4<A>,
    kernels: &Array4<A>,
    strides: Stride2,
    padding: Padding,
) -> HResult<Array4<A>>
where
    A: LinalgScalar,
{
    let geometry = ConvGeometry::new(input_batch.shape(), kernels.shape(), strides, padding)?;
    debug!(
        input = ?input_batch.shape(),
        kernels = ?kernels.shape(),
        out_h = geometry.out_h,
        out_w = geometry.out_w,
        "im2col convolution"
    );

    let cols = im2col(input_batch, &geometry)?;
    let weights = flatten_filters(kernels)?;
    cols_to_output(cols.dot(&weights), &geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::ndarray::convnets::common::test_utils;
    use ndarray::{array, Array3};

    #[test]
    fn test_ones_kernel_sums_windows() {
        let input = test_utils::get_ramp_input();
        let kernels = Array4::<f64>::ones((2, 2, 1, 1));
        let output = conv2d_im2col(&input, &kernels, (1, 1), Padding::Valid).unwrap();
        assert_eq!(output.shape(), &[1, 3, 3, 1]);
        for i in 0..3 {
            for j in 0..3 {
                let window_sum = input.slice(s![0, i..i + 2, j..j + 2, 0]).sum();
                assert_eq!(output[[0, i, j, 0]], window_sum);
            }
        }
        let exp_output: Array3<f64> = array![
            [[10.], [14.], [18.]],
            [[26.], [30.], [34.]],
            [[42.], [46.], [50.]]
        ];
        assert_eq!(output.index_axis(Axis(0), 0), exp_output);
    }

    #[test]
    fn test_window_order() {
        let input = test_utils::get_ramp_input();
        let windows = extract_windows(&input, (2, 2), (2, 2), (2, 2)).unwrap();
        assert_eq!(windows.shape(), &[4, 1, 2, 2, 1]);
        let top_left: Vec<f64> = windows
            .axis_iter(Axis(0))
            .map(|w| w[[0, 0, 0, 0]])
            .collect();
        assert_eq!(top_left, vec![0.0, 2.0, 8.0, 10.0]);
    }

    #[test]
    fn test_flatten_round_trip() {
        let windows = Array5::<f64>::from_shape_fn((6, 2, 2, 3, 2), |(p, n, i, j, c)| {
            (p * 1000 + n * 100 + i * 10 + j) as f64 + c as f64 * 0.5
        });
        let flat = flatten_windows(&windows).unwrap();
        assert_eq!(flat.shape(), &[12, 12]);
        let restored = unflatten_windows(&flat, windows.dim()).unwrap();
        assert_eq!(restored, windows);
    }

    #[test]
    fn test_flatten_rows_follow_window_order() {
        let input = test_utils::get_input();
        let windows = extract_windows(&input, (3, 3), (1, 1), (3, 3)).unwrap();
        let flat = flatten_windows(&windows).unwrap();
        assert_eq!(flat.shape(), &[18, 27]);
        // Row 3 is output position (0, 1) of the second image.
        let expected: Vec<f64> = input.slice(s![1, 0..3, 1..4, ..]).iter().cloned().collect();
        assert_eq!(flat.row(3).to_vec(), expected);
    }

    #[test]
    fn test_flatten_filters() {
        let kernels = test_utils::get_kernels();
        let flat = flatten_filters(&kernels).unwrap();
        assert_eq!(flat.shape(), &[27, 2]);
        let first: Vec<f64> = kernels.index_axis(Axis(3), 0).iter().cloned().collect();
        assert_eq!(flat.column(0).to_vec(), first);
    }

    #[test]
    fn test_kernel_covering_whole_input() {
        let input = test_utils::get_input();
        let kernels = Array4::<f64>::ones((5, 5, 3, 4));
        let output = conv2d_im2col(&input, &kernels, (1, 1), Padding::Valid).unwrap();
        assert_eq!(output.shape(), &[2, 1, 1, 4]);

        let kernels = Array4::<f64>::ones((7, 7, 3, 1));
        let output = conv2d_im2col(&input, &kernels, (1, 1), Padding::Explicit(1)).unwrap();
        assert_eq!(output.shape(), &[2, 1, 1, 1]);
        assert_eq!(output[[0, 0, 0, 0]], input.index_axis(Axis(0), 0).sum());
    }

    mod conv2d {
        use super::*;

        #[cfg_attr(rustfmt, rustfmt_skip)]
        #[test]
        fn test_strides_1() {
            let input = test_utils::get_input();
            let kernels = test_utils::get_kernels();
            let output = conv2d_im2col(&input, &kernels, (1, 1), Padding::Valid).unwrap();
            assert_eq!(output.shape(), &[2, 3, 3, 2]);
            let exp_output_s1: Array3<f64> = array![
                [[62., 45.], [73., 56.], [74., 57.]],
                [[78., 47.], [65., 67.], [75., 70.]],
                [[68., 58.], [72., 61.], [82., 61.]]
            ];
            let exp_output_s2: Array3<f64> = array![
                [[57., 45.], [61., 58.], [56., 64.]],
                [[78., 51.], [73., 53.], [81., 68.]],
                [[72., 63.], [86., 68.], [97., 57.]]
            ];
            assert_eq!(output.index_axis(Axis(0), 0), exp_output_s1);
            assert_eq!(output.index_axis(Axis(0), 1), exp_output_s2);
        }

        #[cfg_attr(rustfmt, rustfmt_skip)]
        #[test]
        fn test_strides_2() {
            let input = test_utils::get_input();
            let kernels = test_utils::get_kernels();
            let output = conv2d_im2col(&input, &kernels, (2, 2), Padding::Valid).unwrap();
            assert_eq!(output.shape(), &[2, 2, 2, 2]);
            let exp_output_s1: Array3<f64> = array![
                [[62., 45.], [74., 57.]],
                [[68., 58.], [82., 61.]]
            ];
            let exp_output_s2: Array3<f64> = array![
                [[57., 45.], [56., 64.]],
                [[72., 63.], [97., 57.]]
            ];
            assert_eq!(output.index_axis(Axis(0), 0), exp_output_s1);
            assert_eq!(output.index_axis(Axis(0), 1), exp_output_s2);
        }

        #[cfg_attr(rustfmt, rustfmt_skip)]
        #[test]
        fn test_strides_2_1() {
            let input = test_utils::get_input();
            let kernels = test_utils::get_kernels();
            let output = conv2d_im2col(&input, &kernels, (2, 1), Padding::Valid).unwrap();
            assert_eq!(output.shape(), &[2, 2, 3, 2]);
            let exp_output_s1: Array3<f64> = array![
                [[62., 45.], [73., 56.], [74., 57.]],
                [[68., 58.], [72., 61.], [82., 61.]]
            ];
            assert_eq!(output.index_axis(Axis(0), 0), exp_output_s1);
        }

        #[cfg_attr(rustfmt, rustfmt_skip)]
        #[test]
        fn test_same_padding() {
            let input = test_utils::get_input();
            let kernels = test_utils::get_kernels();
            let output = conv2d_im2col(&input, &kernels, (1, 1), Padding::Same).unwrap();
            assert_eq!(output.shape(), &[2, 5, 5, 2]);
            let exp_output_s1: Array3<f64> = array![
                [[14., 15.], [41., 27.], [55., 31.], [64., 39.], [34., 28.]],
                [[28., 22.], [62., 45.], [73., 56.], [74., 57.], [43., 51.]],
                [[44., 22.], [78., 47.], [65., 67.], [75., 70.], [47., 49.]],
                [[38., 32.], [68., 58.], [72., 61.], [82., 61.], [40., 39.]],
                [[25., 21.], [52., 47.], [44., 48.], [46., 49.], [12., 28.]]
            ];
            let exp_output_s2: Array3<f64> = array![
                [[28., 18.], [36., 34.], [52., 35.], [59., 30.], [48., 26.]],
                [[43., 25.], [57., 45.], [61., 58.], [56., 64.], [72., 51.]],
                [[31., 22.], [78., 51.], [73., 53.], [81., 68.], [71., 63.]],
                [[50., 38.], [72., 63.], [86., 68.], [97., 57.], [68., 72.]],
                [[38., 27.], [56., 62.], [60., 49.], [52., 66.], [40., 48.]]
            ];
            assert_eq!(output.index_axis(Axis(0), 0), exp_output_s1);
            assert_eq!(output.index_axis(Axis(0), 1), exp_output_s2);
        }

        #[test]
        fn test_channel_mismatch() {
            let input = test_utils::get_input();
            let kernels = Array4::<f64>::ones((3, 3, 2, 1));
            assert!(conv2d_im2col(&input, &kernels, (1, 1), Padding::Valid).is_err());
        }
    }
}
