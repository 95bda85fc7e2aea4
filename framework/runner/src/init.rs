use crate::cli::MongoperfCli;
use clap::Parser;

/// Initialise the CLI and logging for mongoperf.
pub fn init() -> MongoperfCli {
    env_logger::init();

    MongoperfCli::parse()
}
