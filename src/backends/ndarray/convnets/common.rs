use ndarray::{s, stack, Array, Array4, ArrayBase, ArrayView, Axis, Data, Dimension, Ix4, RemoveAxis, ShapeError};

type Pad2D = (usize, usize);

/// Adds a border of `pads.0` rows and `pads.1` columns filled with `elem`
/// around every image of a `(batch, height, width, channels)` tensor.
pub fn pad_array4<A, S>(arr: &ArrayBase<S, Ix4>, pads: Pad2D, elem: A) -> Array4<A>
where
    A: Clone,
    S: Data<Elem = A>,
{
    if pads == (0, 0) {
        return arr.to_owned();
    }
    let (n, h, w, c) = arr.dim();
    let (ph, pw) = pads;
    let mut new_arr = Array4::<A>::from_elem((n, h + 2 * ph, w + 2 * pw, c), elem);
    new_arr
        .slice_mut(s![.., ph..ph + h, pw..pw + w, ..])
        .assign(arr);
    new_arr
}

/// Inverse of `pad_array4`: drops `pads` rows and columns from every border.
pub(crate) fn crop_array4<A, S>(arr: &ArrayBase<S, Ix4>, pads: Pad2D) -> Array4<A>
where
    A: Clone,
    S: Data<Elem = A>,
{
    let (_, h, w, _) = arr.dim();
    let (ph, pw) = pads;
    arr.slice(s![.., ph..h - ph, pw..w - pw, ..]).to_owned()
}

// Used in a bunch of test modules and for building filter banks
pub(crate) fn join_new_axis<A, S, D>(
    arrays: &[ArrayBase<S, D>],
    axis: Axis,
) -> Result<Array<A, D::Larger>, ShapeError>
where
    A: Clone,
    S: Data<Elem = A>,
    D: Dimension,
    D::Larger: RemoveAxis,
{
    let views: Vec<ArrayView<A, D>> = arrays.iter().map(|a| a.view()).collect();
    stack(axis, views.as_slice())
}

pub(crate) mod test_utils {
    use super::join_new_axis;
    use ndarray::{array, Array3, Array4, Axis};

    #[cfg_attr(rustfmt, rustfmt_skip)]
    #[allow(dead_code)]
    pub fn get_input() -> Array4<f64> {
        let x1: Array3<f64> = array![
            [[1.0, 2.0, 1.0], [1.0, 3.0, 2.0], [2.0, 3.0, 1.0], [2.0, 1.0, 5.0], [2.0, 3.0, 4.0]],
            [[2.0, 1.0, 0.0], [2.0, 4.0, 1.0], [5.0, 6.0, 0.0], [4.0, 2.0, 3.0], [1.0, 6.0, 7.0]],
            [[5.0, 3.0, 2.0], [7.0, 1.0, 6.0], [4.0, 2.0, 7.0], [2.0, 1.0, 5.0], [1.0, 5.0, 5.0]],
            [[6.0, 1.0, 3.0], [1.0, 3.0, 2.0], [2.0, 5.0, 4.0], [1.0, 4.0, 2.0], [2.0, 3.0, 4.0]],
            [[7.0, 2.0, 3.0], [2.0, 4.0, 3.0], [5.0, 6.0, 1.0], [1.0, 1.0, 2.0], [1.0, 1.0, 2.0]]
        ];
        let x2: Array3<f64> = array![
            [[2.0, 1.0, 3.0], [5.0, 6.0, 1.0], [0.0, 5.0, 2.0], [1.0, 3.0, 1.0], [5.0, 2.0, 1.0]],
            [[5.0, 2.0, 4.0], [4.0, 1.0, 2.0], [1.0, 1.0, 1.0], [3.0, 4.0, 2.0], [2.0, 7.0, 1.0]],
            [[1.0, 2.0, 4.0], [2.0, 3.0, 4.0], [7.0, 1.0, 2.0], [4.0, 7.0, 6.0], [1.0, 5.0, 5.0]],
            [[2.0, 3.0, 7.0], [4.0, 2.0, 1.0], [1.0, 7.0, 3.0], [2.0, 3.0, 4.0], [3.0, 4.0, 5.0]],
            [[7.0, 5.0, 1.0], [5.0, 5.0, 5.0], [2.0, 1.0, 5.0], [4.0, 6.0, 4.0], [6.0, 3.0, 1.0]]
        ];
        join_new_axis(&[x1, x2], Axis(0)).unwrap()
    }

    /// Two 3x3x3 kernels stacked along the last axis, shape `(3, 3, 3, 2)`.
    #[cfg_attr(rustfmt, rustfmt_skip)]
    #[allow(dead_code)]
    pub fn get_kernels() -> Array4<f64> {
        let row_1: Array3<f64> = array![
            [[1., 0.], [0., 3.], [0., 2.]],
            [[0., 0.], [1., 1.], [0., 0.]],
            [[1., 0.], [1., 0.], [1., 1.]]
        ];
        let row_2: Array3<f64> = array![
            [[0., 1.], [4., 1.], [0., 1.]],
            [[1., 1.], [1., 2.], [1., 1.]],
            [[3., 0.], [0., 1.], [0., 0.]]
        ];
        let row_3: Array3<f64> = array![
            [[1., 0.], [4., 1.], [1., 0.]],
            [[0., 0.], [1., 1.], [0., 0.]],
            [[1., 0.], [1., 1.], [0., 1.]]
        ];
        join_new_axis(&[row_1, row_2, row_3], Axis(0)).unwrap()
    }

    /// Single-channel 4x4 image with values `0..16`, shape `(1, 4, 4, 1)`.
    #[allow(dead_code)]
    pub fn get_ramp_input() -> Array4<f64> {
        Array4::from_shape_fn((1, 4, 4, 1), |(_, i, j, _)| (i * 4 + j) as f64)
    }
}
