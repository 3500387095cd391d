mod conv;
mod filters;
mod traits;

pub use crate::layers::conv::{convolve, Conv2DLayer};
pub use crate::layers::filters::FilterBank;
pub use crate::layers::traits::{Apply, FromJson};
