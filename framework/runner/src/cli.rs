use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct MongoperfCli {
    /// The YAML scenario file to run
    pub scenario: PathBuf,

    /// A connection string for the MongoDB deployment to test
    #[clap(
        short,
        long,
        env = "MONGOPERF_URI",
        default_value = "mongodb://localhost:27017"
    )]
    pub uri: String,

    /// The number of seconds to run the scenario for.
    ///
    /// Queries with `Repeat: 0` run until this duration has elapsed or the run is interrupted.
    #[clap(long)]
    pub duration: Option<u64>,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// Run the scenario against an in-memory store instead of connecting to MongoDB.
    ///
    /// Useful to check that a scenario file is valid and behaves as expected.
    #[clap(long, default_value = "false")]
    pub in_memory: bool,

    /// Append a JSON summary of the run to this file, one line per run
    #[clap(long)]
    pub summary_file: Option<PathBuf>,

    /// The ID of this run, used to identify the run in the summary file.
    ///
    /// A random ID is generated when none is given.
    #[clap(long)]
    pub run_id: Option<String>,
}
