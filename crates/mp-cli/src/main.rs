use anyhow::Result;
use log::LevelFilter;

use mp_cli::cli::build_cli;
use mp_cli::{run, RunConfig};

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Warn)
        .parse_env(env_logger::Env::default().filter_or("MATPROD_LOG", "warn"))
        .init();

    let matches = build_cli().get_matches();
    let config = RunConfig::from_matches(&matches)?;

    let product = run(&config)?;
    println!("{}", product.render()?);
    Ok(())
}
