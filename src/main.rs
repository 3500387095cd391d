extern crate convkit;
extern crate ndarray;
extern crate rand;
extern crate rand_distr;

use convkit::{init_tracing, Apply, ConvAlgorithm, ConvConfig, Conv2DLayer, HResult};
use ndarray::Array4;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};
use tracing::{info, warn};

fn run_demo() -> HResult<()> {
    let config = ConvConfig::from_json_str(
        r#"{
            "name": "demo_conv",
            "n_filters": 8,
            "kernel_size": [3, 3],
            "padding": "same",
            "strides": [1, 1],
            "seed": 42
        }"#,
    )?;

    let mut rng = StdRng::seed_from_u64(0);
    let input: Array4<f64> =
        Array4::from_shape_simple_fn((4, 28, 28, 3), || StandardNormal.sample(&mut rng));

    let layer: Conv2DLayer<f64> = Conv2DLayer::from_config(&config, input.shape()[3])?;
    let im2col = layer.forward(&input, |x: f64| x.max(0.0))?;
    let direct = layer
        .clone()
        .with_algorithm(ConvAlgorithm::Direct)
        .apply(&input)?
        .mapv(|x| x.max(0.0));

    let max_diff = im2col
        .iter()
        .zip(direct.iter())
        .fold(0.0f64, |acc, (a, b)| acc.max((a - b).abs()));
    info!(output = ?im2col.shape(), max_diff, "im2col and direct convolution compared");

    println!("{:?}", im2col.shape());
    Ok(())
}

fn main() {
    if let Err(e) = init_tracing() {
        warn!("{}", e);
    }
    if let Err(e) = run_demo() {
        println!("Error: {}", e.to_string());
    }
}
