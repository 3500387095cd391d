use ndarray::Array4;
use serde_json::Value;

use crate::common::types::HResult;

pub trait Apply<A> {
    fn apply(&self, input: &Array4<A>) -> HResult<Array4<A>>;
}

pub trait FromJson
where
    Self: Sized,
{
    const TYPE: &'static str;

    type Error;

    /// Builds the layer for inputs with `input_channels` channels.
    fn from_json(json: &Value, input_channels: usize) -> Result<Self, Self::Error>;
}
