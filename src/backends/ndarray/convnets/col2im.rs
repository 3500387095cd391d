use ndarray::{s, Array4, ArrayBase, Axis, Data, Ix2, LinalgScalar};

use super::common::crop_array4;
use super::im2col::unflatten_windows;
use crate::backends::convnets::ConvGeometry;
use crate::common::types::HResult;

/// Adjoint of `im2col`: scatter-adds every row of `cols` back onto the input
/// position its window was read from and crops the padding.
///
/// Overlapping windows accumulate, so `col2im(im2col(x))` multiplies each
/// element of `x` by the number of windows covering it.
pub fn col2im<A, S>(cols: &ArrayBase<S, Ix2>, geometry: &ConvGeometry) -> HResult<Array4<A>>
where
    A: LinalgScalar,
    S: Data<Elem = A>,
{
    let expected = (geometry.num_windows(), geometry.window_len());
    if cols.dim() != expected {
        return Err(format_err!(
            "Incompatible shapes for col2im: {:?}, expected {:?}",
            cols.shape(),
            expected
        ));
    }

    let windows = unflatten_windows(
        cols,
        (
            geometry.out_h * geometry.out_w,
            geometry.batch,
            geometry.kernel_h,
            geometry.kernel_w,
            geometry.channels,
        ),
    )?;
    let (ph, pw) = geometry.pads();
    let (kh, kw) = geometry.kernel();
    let mut padded = Array4::<A>::zeros((
        geometry.batch,
        geometry.in_h + 2 * ph,
        geometry.in_w + 2 * pw,
        geometry.channels,
    ));

    for (p, window) in windows.axis_iter(Axis(0)).enumerate() {
        let (i, j) = (p / geometry.out_w, p % geometry.out_w);
        let (hr, wr) = (i * geometry.strides.0, j * geometry.strides.1);
        padded
            .slice_mut(s![.., hr..hr + kh, wr..wr + kw, ..])
            .zip_mut_with(&window, |acc, &x| *acc = *acc + x);
    }

    Ok(crop_array4(&padded, (ph, pw)))
}
