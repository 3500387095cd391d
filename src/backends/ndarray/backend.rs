use ndarray::{Array4, LinalgScalar};

use super::convnets::{conv2d_direct, conv2d_im2col};
use crate::backends::convnets::{Conv2D, ConvAlgorithm, Padding, Stride2};
use crate::common::types::HResult;

impl<A> Conv2D<Array4<A>> for Array4<A>
where
    A: LinalgScalar,
{
    type Output = Array4<A>;

    fn conv2d(
        &self,
        kernels: &Array4<A>,
        strides: Stride2,
        padding: Padding,
        algorithm: ConvAlgorithm,
    ) -> HResult<Array4<A>> {
        match algorithm {
            ConvAlgorithm::Direct => conv2d_direct(self, kernels, strides, padding),
            ConvAlgorithm::Im2col => conv2d_im2col(self, kernels, strides, padding),
        }
    }
}
