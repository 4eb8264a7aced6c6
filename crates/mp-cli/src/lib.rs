//! `mp-cli` - the matprod runner.
//!
//! Draws two standard-normal matrices on the host, moves them to the device
//! chosen by `RunConfig::policy`, multiplies them there and hands back the
//! product.

pub mod cli;
pub mod config;

use anyhow::{Context, Result};
use log::info;
use mp_tensor::{matrix_product, Device, Tensor};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub use config::RunConfig;

/// Run one multiplication and return the device-resident product.
pub fn run(config: &RunConfig) -> Result<Tensor> {
    let device = Device::select(config.policy).context("failed to select compute device")?;
    info!("computing on {} ({})", device.name(), device.placement());

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let a = Tensor::randn((config.rows, config.inner), &mut rng);
    let b = Tensor::randn((config.inner, config.cols), &mut rng);

    let c = matrix_product(&a, &b, &device).context("matrix product failed")?;
    info!("computed {} product", c.shape());
    Ok(c)
}
