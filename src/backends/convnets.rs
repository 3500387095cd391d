use std::convert::TryFrom;

use crate::common::errors::ConvError;
use crate::common::types::{HError, HResult};

pub type Stride2 = (usize, usize);
pub type Kernel2 = (usize, usize);

/// Output length of one spatial axis: `(axis_len + 2 * pad - kernel_size) / stride + 1`.
pub fn conv_output_axis_len(
    axis_len: usize,
    kernel_size: usize,
    stride: usize,
    pad: usize,
) -> HResult<usize> {
    if stride == 0 {
        return Err(ConvError::ZeroStride.into());
    }
    if kernel_size == 0 {
        return Err(ConvError::EmptyKernel.into());
    }
    let padded_len = pad
        .checked_mul(2)
        .and_then(|p| axis_len.checked_add(p))
        .ok_or_else(|| format_err!("Padding {} overflows axis of length {}.", pad, axis_len))?;
    if padded_len < kernel_size {
        return Err(ConvError::KernelTooLarge {
            kernel_size,
            padded_len,
        }
        .into());
    }
    Ok((padded_len - kernel_size) / stride + 1)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Padding {
    Valid,
    /// Border of `(kernel_size - 1) / 2` on each side of an axis.
    Same,
    /// Fixed border on both spatial axes regardless of the kernel size.
    Explicit(usize),
}

impl Padding {
    const VALID_STR: &'static str = "valid";
    const SAME_STR: &'static str = "same";

    pub fn axis_padding(&self, kernel_size: usize) -> usize {
        match self {
            Padding::Valid => 0,
            Padding::Same => kernel_size.saturating_sub(1) / 2,
            Padding::Explicit(pad) => *pad,
        }
    }
}

impl Default for Padding {
    fn default() -> Self {
        Padding::Valid
    }
}

impl TryFrom<&str> for Padding {
    type Error = HError;

    fn try_from(value: &str) -> HResult<Padding> {
        match value.to_ascii_lowercase().as_str() {
            Self::VALID_STR => Ok(Padding::Valid),
            Self::SAME_STR => Ok(Padding::Same),
            _ => Err(format_err!("Unknown padding value: `{}`", value)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvAlgorithm {
    /// Four nested loops over batch, filter, output row and output column.
    Direct,
    /// Window extraction followed by a single matrix product.
    Im2col,
}

impl ConvAlgorithm {
    const DIRECT_STR: &'static str = "direct";
    const IM2COL_STR: &'static str = "im2col";
}

impl Default for ConvAlgorithm {
    fn default() -> Self {
        ConvAlgorithm::Im2col
    }
}

impl TryFrom<&str> for ConvAlgorithm {
    type Error = HError;

    fn try_from(value: &str) -> HResult<ConvAlgorithm> {
        match value.to_ascii_lowercase().as_str() {
            Self::DIRECT_STR => Ok(ConvAlgorithm::Direct),
            Self::IM2COL_STR => Ok(ConvAlgorithm::Im2col),
            _ => Err(format_err!("Unknown convolution algorithm: `{}`", value)),
        }
    }
}

/// Shape bookkeeping shared by every convolution strategy.
///
/// Input is `(batch, height, width, channels)`, kernels are
/// `(kernel_h, kernel_w, channels, n_filters)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvGeometry {
    pub batch: usize,
    pub in_h: usize,
    pub in_w: usize,
    pub channels: usize,
    pub kernel_h: usize,
    pub kernel_w: usize,
    pub n_filters: usize,
    pub pad_h: usize,
    pub pad_w: usize,
    pub strides: Stride2,
    pub out_h: usize,
    pub out_w: usize,
}

impl ConvGeometry {
    pub fn new(
        input_shape: &[usize],
        kernel_shape: &[usize],
        strides: Stride2,
        padding: Padding,
    ) -> HResult<ConvGeometry> {
        if input_shape.len() != 4 || kernel_shape.len() != 4 {
            return Err(format_err!(
                "Expected rank-4 input and kernels, got {:?} and {:?}.",
                input_shape,
                kernel_shape
            ));
        }
        let (batch, in_h, in_w, channels) =
            (input_shape[0], input_shape[1], input_shape[2], input_shape[3]);
        let (kernel_h, kernel_w, kernel_c, n_filters) =
            (kernel_shape[0], kernel_shape[1], kernel_shape[2], kernel_shape[3]);
        if kernel_c != channels {
            return Err(ConvError::ChannelMismatch {
                input: channels,
                kernel: kernel_c,
            }
            .into());
        }

        let pad_h = padding.axis_padding(kernel_h);
        let pad_w = padding.axis_padding(kernel_w);
        let out_h = conv_output_axis_len(in_h, kernel_h, strides.0, pad_h)?;
        let out_w = conv_output_axis_len(in_w, kernel_w, strides.1, pad_w)?;

        Ok(ConvGeometry {
            batch,
            in_h,
            in_w,
            channels,
            kernel_h,
            kernel_w,
            n_filters,
            pad_h,
            pad_w,
            strides,
            out_h,
            out_w,
        })
    }

    pub fn kernel(&self) -> Kernel2 {
        (self.kernel_h, self.kernel_w)
    }

    pub fn pads(&self) -> (usize, usize) {
        (self.pad_h, self.pad_w)
    }

    pub fn output_shape(&self) -> (usize, usize, usize, usize) {
        (self.batch, self.out_h, self.out_w, self.n_filters)
    }

    /// Number of rows in the flattened window matrix.
    pub fn num_windows(&self) -> usize {
        self.out_h * self.out_w * self.batch
    }

    /// Number of columns in the flattened window matrix.
    pub fn window_len(&self) -> usize {
        self.kernel_h * self.kernel_w * self.channels
    }
}

pub trait Conv2D<K> {
    type Output;

    fn conv2d(
        &self,
        kernels: &K,
        strides: Stride2,
        padding: Padding,
        algorithm: ConvAlgorithm,
    ) -> HResult<Self::Output>;
}
