use ndarray::{Array4, LinalgScalar};
use num_traits::FromPrimitive;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use serde::Deserialize;
use serde_json::{from_value, Value};
use tracing::debug;

use crate::backends::convnets::{Conv2D, ConvAlgorithm, Kernel2, Padding, Stride2};
use crate::backends::ndarray::convnets::conv2d_im2col;
use crate::common::errors::ConvError;
use crate::common::traits::Name;
use crate::common::types::{HError, HResult};
use crate::config::ConvConfig;
use crate::layers::filters::FilterBank;
use crate::layers::traits::{Apply, FromJson};

/// Samples a fresh filter bank, convolves `input` with it through im2col and
/// applies `activation` elementwise.
///
/// Weights are drawn from `rng` on every call, so two calls only agree when
/// the generator is reseeded in between. Use `Conv2DLayer` to keep weights.
pub fn convolve<A, R, F>(
    input: &Array4<A>,
    n_filters: usize,
    kernel_size: Kernel2,
    padding: Padding,
    strides: Stride2,
    rng: &mut R,
    activation: F,
) -> HResult<Array4<A>>
where
    A: LinalgScalar,
    R: Rng + ?Sized,
    F: Fn(A) -> A,
    StandardNormal: Distribution<A>,
{
    let channels = input.shape()[3];
    let filters = FilterBank::random_normal(n_filters, kernel_size, channels, rng)?;
    let linear = conv2d_im2col(input, filters.weights(), strides, padding)?;
    Ok(linear.mapv(activation))
}

/// Convolution layer holding its filters across calls.
#[derive(Clone, Debug)]
pub struct Conv2DLayer<A> {
    name: String,
    filters: FilterBank<A>,
    strides: Stride2,
    padding: Padding,
    algorithm: ConvAlgorithm,
}

impl<A> Conv2DLayer<A> {
    pub fn new(
        name: String,
        filters: FilterBank<A>,
        strides: Stride2,
        padding: Padding,
    ) -> Conv2DLayer<A> {
        Conv2DLayer {
            name,
            filters,
            strides,
            padding,
            algorithm: ConvAlgorithm::default(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: ConvAlgorithm) -> Conv2DLayer<A> {
        self.algorithm = algorithm;
        self
    }

    pub fn filters(&self) -> &FilterBank<A> {
        &self.filters
    }

    pub fn strides(&self) -> Stride2 {
        self.strides
    }

    pub fn padding(&self) -> Padding {
        self.padding
    }

    pub fn algorithm(&self) -> ConvAlgorithm {
        self.algorithm
    }
}

impl<A> Conv2DLayer<A>
where
    A: Clone,
    StandardNormal: Distribution<A>,
{
    /// Builds a layer with standard-normal filters. A config without a seed
    /// draws from OS entropy.
    pub fn from_config(config: &ConvConfig, input_channels: usize) -> HResult<Conv2DLayer<A>> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let filters =
            FilterBank::random_normal(config.n_filters, config.kernel_size, input_channels, &mut rng)?;
        debug!(name = %config.name, seed = ?config.seed, "built conv layer");
        Ok(Conv2DLayer::new(config.name.clone(), filters, config.strides, config.padding()?)
            .with_algorithm(config.algorithm()?))
    }
}

impl<A: LinalgScalar> Conv2DLayer<A> {
    /// Linear map followed by `activation`.
    pub fn forward<F>(&self, input: &Array4<A>, activation: F) -> HResult<Array4<A>>
    where
        F: Fn(A) -> A,
    {
        Ok(self.apply(input)?.mapv(activation))
    }
}

impl<A> Name for Conv2DLayer<A> {
    fn name(&self) -> &String {
        &self.name
    }
}

impl<A: LinalgScalar> Apply<A> for Conv2DLayer<A> {
    fn apply(&self, input: &Array4<A>) -> HResult<Array4<A>> {
        input.conv2d(self.filters.weights(), self.strides, self.padding, self.algorithm)
    }
}

/// JSON form of a layer: a `ConvConfig` with optional explicit weights
/// flattened in `(kernel_h, kernel_w, channels, n_filters)` order.
#[derive(Deserialize)]
struct Conv2DLayerSpec {
    #[serde(flatten)]
    config: ConvConfig,
    #[serde(default)]
    filters: Option<Vec<f64>>,
}

impl<A> FromJson for Conv2DLayer<A>
where
    A: Clone + FromPrimitive,
    StandardNormal: Distribution<A>,
{
    const TYPE: &'static str = "Conv2D";

    type Error = HError;

    fn from_json(json: &Value, input_channels: usize) -> HResult<Self> {
        let spec: Conv2DLayerSpec = from_value(json.clone())?;
        let config = spec.config;
        let raw = match spec.filters {
            Some(raw) => raw,
            None => return Conv2DLayer::from_config(&config, input_channels),
        };
        config.validate()?;
        if input_channels == 0 {
            return Err(ConvError::EmptyKernel.into());
        }

        let values = raw
            .into_iter()
            .map(|v| A::from_f64(v).ok_or_else(|| format_err!("Weight {} is not representable.", v)))
            .collect::<HResult<Vec<A>>>()?;
        let shape = (
            config.kernel_size.0,
            config.kernel_size.1,
            input_channels,
            config.n_filters,
        );
        let weights = Array4::from_shape_vec(shape, values)?;
        Ok(Conv2DLayer::new(
            config.name.clone(),
            FilterBank::from_array(weights),
            config.strides,
            config.padding()?,
        )
        .with_algorithm(config.algorithm()?))
    }
}
