mod backend;
pub(crate) mod convnets;
