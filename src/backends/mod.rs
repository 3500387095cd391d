pub(crate) mod convnets;
pub(crate) mod ndarray;
