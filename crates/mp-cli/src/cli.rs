use clap::{Arg, Command};

/// Command-line definition. Every argument is optional; running with none
/// multiplies two random 3x3 matrices on the accelerator.
pub fn build_cli() -> Command {
    Command::new("matprod")
        .version(clap::crate_version!())
        .about("Multiply two random matrices on a compute device and print the product")
        .arg(
            Arg::new("device")
                .short('d')
                .long("device")
                .value_name("POLICY")
                .help(
                    "Where to compute: 'accelerator' (fail if none is present), \
                     'auto' (accelerator, else host) or 'host'",
                ),
        )
        .arg(
            Arg::new("seed")
                .short('s')
                .long("seed")
                .value_name("SEED")
                .value_parser(clap::value_parser!(u64))
                .help("Seed for the random inputs; defaults to OS entropy"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_is_well_formed() {
        build_cli().debug_assert();
    }

    #[test]
    fn test_rejects_non_numeric_seed() {
        assert!(build_cli()
            .try_get_matches_from(["matprod", "--seed", "abc"])
            .is_err());
    }
}
