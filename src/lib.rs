#[cfg(feature = "blas")]
extern crate blas_src;
#[macro_use]
extern crate failure;
extern crate failure_derive;
extern crate ndarray;
extern crate num_traits;
extern crate rand;
extern crate rand_distr;
extern crate serde;
extern crate serde_json;

mod autograd;
mod backends;
mod common;
mod config;
mod layers;
mod logging;

pub use common::errors::ConvError;
pub use common::traits::Name;
pub use common::types::{HError, HResult};
pub use config::{ConvConfig, PaddingValue};
pub use logging::{init_tracing, InitError, LOG_ENV_VAR};

// Convolution primitives
pub use backends::convnets::{
    conv_output_axis_len, Conv2D, ConvAlgorithm, ConvGeometry, Kernel2, Padding, Stride2,
};
pub use backends::ndarray::convnets::{
    col2im, conv2d_direct, conv2d_im2col, extract_windows, flatten_filters, flatten_windows,
    pad_array4, unflatten_windows,
};

// Layers
pub use autograd::{Conv2DFunction, Function};
pub use layers::{convolve, Apply, Conv2DLayer, FilterBank, FromJson};
