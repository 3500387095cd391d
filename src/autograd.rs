use ndarray::{Array2, Array4, LinalgScalar};
use tracing::trace;

use crate::backends::convnets::{ConvGeometry, Padding, Stride2};
use crate::backends::ndarray::convnets::im2col::{cols_to_output, output_to_cols};
use crate::backends::ndarray::convnets::{col2im, flatten_filters, im2col};
use crate::common::errors::ConvError;
use crate::common::types::HResult;

/// A differentiable primitive with an explicit forward/backward pair.
///
/// `forward` may stash whatever it needs in `self`; `backward` returns one
/// gradient per forward input, in the same order.
pub trait Function {
    type Tensor;

    fn forward(&mut self, inputs: &[&Self::Tensor]) -> HResult<Self::Tensor>;

    fn backward(&self, grad_output: &Self::Tensor) -> HResult<Vec<Self::Tensor>>;
}

#[derive(Clone, Debug)]
struct SavedContext<A> {
    geometry: ConvGeometry,
    cols: Array2<A>,
    kernels: Array4<A>,
}

/// Convolution over `[input, kernels]` whose backward pass yields
/// `[grad_input, grad_kernels]`.
#[derive(Clone, Debug)]
pub struct Conv2DFunction<A> {
    strides: Stride2,
    padding: Padding,
    saved: Option<SavedContext<A>>,
}

impl<A> Conv2DFunction<A> {
    pub fn new(strides: Stride2, padding: Padding) -> Conv2DFunction<A> {
        Conv2DFunction {
            strides,
            padding,
            saved: None,
        }
    }
}

impl<A: LinalgScalar> Function for Conv2DFunction<A> {
    type Tensor = Array4<A>;

    fn forward(&mut self, inputs: &[&Array4<A>]) -> HResult<Array4<A>> {
        if inputs.len() != 2 {
            return Err(format_err!(
                "Conv2DFunction expects [input, kernels], got {} tensors.",
                inputs.len()
            ));
        }
        let (input, kernels) = (inputs[0], inputs[1]);
        let geometry = ConvGeometry::new(input.shape(), kernels.shape(), self.strides, self.padding)?;
        trace!(?geometry, "conv2d function forward");

        let cols = im2col(input, &geometry)?;
        let output = cols_to_output(cols.dot(&flatten_filters(kernels)?), &geometry)?;
        self.saved = Some(SavedContext {
            geometry,
            cols,
            kernels: kernels.clone(),
        });
        Ok(output)
    }

    fn backward(&self, grad_output: &Array4<A>) -> HResult<Vec<Array4<A>>> {
        let saved = self.saved.as_ref().ok_or(ConvError::MissingForwardContext)?;
        let geometry = &saved.geometry;
        let (n, oh, ow, f) = geometry.output_shape();
        if grad_output.dim() != (n, oh, ow, f) {
            return Err(ConvError::GradShapeMismatch {
                expected: vec![n, oh, ow, f],
                got: grad_output.shape().to_vec(),
            }
            .into());
        }

        // Rows of `g` line up with rows of `cols`.
        let g = output_to_cols(grad_output, geometry)?;
        let grad_weights = saved.cols.t().dot(&g);
        let grad_kernels = grad_weights
            .into_shape((geometry.kernel_h, geometry.kernel_w, geometry.channels, f))?;

        let grad_cols = g.dot(&flatten_filters(&saved.kernels)?.t());
        let grad_input = col2im(&grad_cols, geometry)?;

        Ok(vec![grad_input, grad_kernels])
    }
}
