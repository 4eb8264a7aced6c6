use anyhow::{Context, Result};
use clap::ArgMatches;
use mp_tensor::DevicePolicy;

/// Everything a run needs, resolved up front and passed down explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub policy: DevicePolicy,
    /// RNG seed; `None` draws from OS entropy.
    pub seed: Option<u64>,
    pub rows: usize,
    pub inner: usize,
    pub cols: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            policy: DevicePolicy::RequireAccelerator,
            seed: None,
            rows: 3,
            inner: 3,
            cols: 3,
        }
    }
}

impl RunConfig {
    /// Build from parsed command-line arguments, keeping defaults for
    /// anything not given.
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mut config = RunConfig::default();
        if let Some(device) = matches.get_one::<String>("device") {
            config.policy = device
                .parse::<DevicePolicy>()
                .map_err(anyhow::Error::msg)
                .context("invalid --device")?;
        }
        if let Some(seed) = matches.get_one::<u64>("seed") {
            config.seed = Some(*seed);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::build_cli;

    fn parse(args: &[&str]) -> Result<RunConfig> {
        let matches = build_cli().try_get_matches_from(args)?;
        RunConfig::from_matches(&matches)
    }

    #[test]
    fn test_defaults_match_no_args() {
        let config = parse(&["matprod"]).unwrap();
        assert_eq!(config, RunConfig::default());
        assert_eq!(config.policy, DevicePolicy::RequireAccelerator);
        assert_eq!((config.rows, config.inner, config.cols), (3, 3, 3));
    }

    #[test]
    fn test_device_and_seed() {
        let config = parse(&["matprod", "--device", "auto", "--seed", "17"]).unwrap();
        assert_eq!(config.policy, DevicePolicy::PreferAccelerator);
        assert_eq!(config.seed, Some(17));
    }

    #[test]
    fn test_bad_device() {
        let err = parse(&["matprod", "--device", "tpu"]).unwrap_err();
        assert!(format!("{:#}", err).contains("unknown device policy"));
    }
}
