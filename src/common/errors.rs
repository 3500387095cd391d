use failure::Fail;

/// Geometry and state failures raised by the convolution routines.
#[derive(Debug, Fail, PartialEq, Eq)]
pub enum ConvError {
    #[fail(
        display = "Input has {} channels but kernels expect {} channels.",
        input, kernel
    )]
    ChannelMismatch { input: usize, kernel: usize },

    #[fail(
        display = "Kernel of size {} does not fit into padded axis of length {}.",
        kernel_size, padded_len
    )]
    KernelTooLarge { kernel_size: usize, padded_len: usize },

    #[fail(display = "Kernel dimensions must be positive.")]
    EmptyKernel,

    #[fail(display = "Strides must be positive.")]
    ZeroStride,

    #[fail(display = "Filter bank must contain at least one kernel.")]
    EmptyFilterBank,

    #[fail(display = "Backward pass requested before the forward pass.")]
    MissingForwardContext,

    #[fail(
        display = "Gradient shape {:?} does not match forward output shape {:?}.",
        got, expected
    )]
    GradShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },
}
