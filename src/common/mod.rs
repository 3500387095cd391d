pub(crate) mod errors;
pub(crate) mod traits;
pub(crate) mod types;
