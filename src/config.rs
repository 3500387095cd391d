use std::convert::TryFrom;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backends::convnets::{ConvAlgorithm, Kernel2, Padding, Stride2};
use crate::common::errors::ConvError;
use crate::common::types::HResult;

/// Padding as written in a config: `"valid"`, `"same"` or a fixed border
/// width such as `1`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PaddingValue {
    Border(usize),
    Name(String),
}

impl PaddingValue {
    pub fn to_padding(&self) -> HResult<Padding> {
        match self {
            PaddingValue::Border(pad) => Ok(Padding::Explicit(*pad)),
            PaddingValue::Name(name) => Padding::try_from(name.as_str()),
        }
    }
}

/// Serialized description of a convolution layer.
///
/// Every field except `n_filters` and `kernel_size` has a default, so
/// `{"n_filters": 8, "kernel_size": [3, 3]}` is a complete config.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvConfig {
    #[serde(default = "ConvConfig::default_name")]
    pub name: String,
    pub n_filters: usize,
    pub kernel_size: Kernel2,
    #[serde(default = "ConvConfig::default_padding")]
    pub padding: PaddingValue,
    #[serde(default = "ConvConfig::default_strides")]
    pub strides: Stride2,
    #[serde(default = "ConvConfig::default_algorithm")]
    pub algorithm: String,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ConvConfig {
    fn default_name() -> String {
        String::from("conv2d")
    }

    fn default_padding() -> PaddingValue {
        PaddingValue::Name(String::from("valid"))
    }

    fn default_strides() -> Stride2 {
        (1, 1)
    }

    fn default_algorithm() -> String {
        String::from("im2col")
    }

    pub fn new(n_filters: usize, kernel_size: Kernel2) -> ConvConfig {
        ConvConfig {
            name: ConvConfig::default_name(),
            n_filters,
            kernel_size,
            padding: ConvConfig::default_padding(),
            strides: ConvConfig::default_strides(),
            algorithm: ConvConfig::default_algorithm(),
            seed: None,
        }
    }

    pub fn from_value(json: &Value) -> HResult<ConvConfig> {
        let config: ConvConfig = serde_json::from_value(json.clone())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> HResult<ConvConfig> {
        let config: ConvConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> HResult<ConvConfig> {
        let reader = BufReader::new(File::open(path)?);
        let config: ConvConfig = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }

    pub fn padding(&self) -> HResult<Padding> {
        self.padding.to_padding()
    }

    pub fn algorithm(&self) -> HResult<ConvAlgorithm> {
        ConvAlgorithm::try_from(self.algorithm.as_str())
    }

    pub fn validate(&self) -> HResult<()> {
        if self.n_filters == 0 {
            return Err(ConvError::EmptyFilterBank.into());
        }
        if self.kernel_size.0 == 0 || self.kernel_size.1 == 0 {
            return Err(ConvError::EmptyKernel.into());
        }
        if self.strides.0 == 0 || self.strides.1 == 0 {
            return Err(ConvError::ZeroStride.into());
        }
        self.padding()?;
        self.algorithm()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ConvConfig::from_json_str(r#"{"n_filters": 4, "kernel_size": [3, 3]}"#).unwrap();
        assert_eq!(config, ConvConfig::new(4, (3, 3)));
        assert_eq!(config.padding().unwrap(), Padding::Valid);
        assert_eq!(config.algorithm().unwrap(), ConvAlgorithm::Im2col);
        assert_eq!(config.seed, None);
    }

    #[test]
    fn test_full_config() {
        let config = ConvConfig::from_value(&json!({
            "name": "conv_1",
            "n_filters": 2,
            "kernel_size": [5, 3],
            "padding": "same",
            "strides": [2, 1],
            "algorithm": "direct",
            "seed": 17
        }))
        .unwrap();
        assert_eq!(config.name, "conv_1");
        assert_eq!(config.kernel_size, (5, 3));
        assert_eq!(config.strides, (2, 1));
        assert_eq!(config.padding().unwrap(), Padding::Same);
        assert_eq!(config.algorithm().unwrap(), ConvAlgorithm::Direct);
        assert_eq!(config.seed, Some(17));
    }

    #[test]
    fn test_validation_errors() {
        let err = ConvConfig::from_value(&json!({"n_filters": 0, "kernel_size": [3, 3]}))
            .unwrap_err();
        assert_eq!(err.downcast_ref::<ConvError>(), Some(&ConvError::EmptyFilterBank));

        let err = ConvConfig::from_value(&json!({
            "n_filters": 1,
            "kernel_size": [3, 3],
            "strides": [0, 1]
        }))
        .unwrap_err();
        assert_eq!(err.downcast_ref::<ConvError>(), Some(&ConvError::ZeroStride));

        let err = ConvConfig::from_value(&json!({
            "n_filters": 1,
            "kernel_size": [3, 3],
            "padding": "reflect"
        }))
        .unwrap_err();
        assert_eq!(err.to_string(), "Unknown padding value: `reflect`");
    }

    #[test]
    fn test_numeric_padding_is_a_fixed_border() {
        let config = ConvConfig::from_value(&json!({
            "n_filters": 1,
            "kernel_size": [5, 5],
            "padding": 1
        }))
        .unwrap();
        assert_eq!(config.padding, PaddingValue::Border(1));
        assert_eq!(config.padding().unwrap(), Padding::Explicit(1));

        assert!(ConvConfig::from_value(&json!({
            "n_filters": 1,
            "kernel_size": [3, 3],
            "padding": -1
        }))
        .is_err());
    }

    #[test]
    fn test_missing_required_field() {
        assert!(ConvConfig::from_json_str(r#"{"kernel_size": [3, 3]}"#).is_err());
    }

    #[test]
    fn test_from_file() {
        let path = std::env::temp_dir().join("convkit_config_test.json");
        {
            let mut file = File::create(&path).unwrap();
            write!(file, r#"{{"n_filters": 3, "kernel_size": [2, 2], "seed": 5}}"#).unwrap();
        }
        let config = ConvConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(config.n_filters, 3);
        assert_eq!(config.seed, Some(5));
    }
}
