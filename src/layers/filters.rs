use ndarray::{Array3, Array4, Axis};
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use tracing::debug;

use crate::backends::convnets::Kernel2;
use crate::backends::ndarray::convnets::common::join_new_axis;
use crate::common::errors::ConvError;
use crate::common::types::HResult;

/// Owned convolution weights laid out as
/// `(kernel_h, kernel_w, channels, n_filters)`.
#[derive(Clone, Debug, PartialEq)]
pub struct FilterBank<A> {
    weights: Array4<A>,
}

impl<A> FilterBank<A> {
    pub fn from_array(weights: Array4<A>) -> FilterBank<A> {
        FilterBank { weights }
    }

    pub fn weights(&self) -> &Array4<A> {
        &self.weights
    }

    pub fn into_weights(self) -> Array4<A> {
        self.weights
    }

    pub fn n_filters(&self) -> usize {
        self.weights.shape()[3]
    }

    pub fn kernel_size(&self) -> Kernel2 {
        (self.weights.shape()[0], self.weights.shape()[1])
    }

    pub fn channels(&self) -> usize {
        self.weights.shape()[2]
    }
}

impl<A: Clone> FilterBank<A> {
    /// Stacks `(kernel_h, kernel_w, channels)` kernels along a new last axis.
    pub fn from_kernels(kernels: &[Array3<A>]) -> HResult<FilterBank<A>> {
        if kernels.is_empty() {
            return Err(ConvError::EmptyFilterBank.into());
        }
        Ok(FilterBank::from_array(join_new_axis(kernels, Axis(3))?))
    }

    /// Kernel `index` as `(kernel_h, kernel_w, channels)`, or `None` past the last filter.
    pub fn kernel(&self, index: usize) -> Option<Array3<A>> {
        if index >= self.n_filters() {
            return None;
        }
        Some(self.weights.index_axis(Axis(3), index).to_owned())
    }
}

impl<A> FilterBank<A>
where
    A: Clone,
    StandardNormal: Distribution<A>,
{
    /// Draws every kernel independently from the standard normal distribution.
    pub fn random_normal<R>(
        n_filters: usize,
        kernel_size: Kernel2,
        channels: usize,
        rng: &mut R,
    ) -> HResult<FilterBank<A>>
    where
        R: Rng + ?Sized,
    {
        if kernel_size.0 == 0 || kernel_size.1 == 0 || channels == 0 {
            return Err(ConvError::EmptyKernel.into());
        }
        debug!(n_filters, ?kernel_size, channels, "sampling filter bank");

        let mut kernels = Vec::with_capacity(n_filters);
        for _ in 0..n_filters {
            let kernel = Array3::from_shape_simple_fn((kernel_size.0, kernel_size.1, channels), || {
                StandardNormal.sample(rng)
            });
            kernels.push(kernel);
        }
        FilterBank::from_kernels(&kernels)
    }
}
