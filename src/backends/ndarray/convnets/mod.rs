mod col2im;
pub(crate) mod common;
mod direct;
pub(crate) mod im2col;

pub use col2im::col2im;
pub use common::pad_array4;
pub use direct::conv2d_direct;
pub use im2col::{
    conv2d_im2col, extract_windows, flatten_filters, flatten_windows, im2col, unflatten_windows,
};
