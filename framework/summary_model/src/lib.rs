use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::BTreeMap;
use std::io::{BufRead, Read, Write};
use std::path::Path;

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner. Unique for each run unless the user supplied one.
    pub run_id: String,
    /// The time the run started
    ///
    /// This is a Unix timestamp in seconds.
    pub started_at: i64,
    /// The duration that the run was configured with, in seconds
    ///
    /// Not set when the run was only bounded by the repeat counts of its operations.
    pub run_duration: Option<u64>,
    /// Where the store was reached, without credentials
    pub connection_target: String,
    pub database: String,
    pub collection: String,
    /// Number of workers
    pub parallelism: usize,
    /// Capacity of the work queue
    pub buffer_size: usize,
    /// Per-operation results, keyed by operation name
    pub operations: BTreeMap<String, OperationSummary>,
    /// Operations that were configured but could not be built, with the reason
    #[serde(default)]
    pub skipped: BTreeMap<String, String>,
    /// Whether the run was stopped by a deadline or an interrupt
    pub cancelled: bool,
    /// The version of mongoperf that produced this run
    pub mongoperf_version: String,
}

/// Results for one named operation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OperationSummary {
    pub action: String,
    pub query_count: u64,
    pub change_count: u64,
    pub error_count: u64,
    pub total_duration_ms: f64,
    pub last_error: Option<String>,
}

impl RunSummary {
    /// Create a new run summary with no operations recorded
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        run_id: String,
        started_at: i64,
        run_duration: Option<u64>,
        connection_target: String,
        database: String,
        collection: String,
        parallelism: usize,
        buffer_size: usize,
        mongoperf_version: String,
    ) -> Self {
        Self {
            run_id,
            started_at,
            run_duration,
            connection_target,
            database,
            collection,
            parallelism,
            buffer_size,
            operations: BTreeMap::new(),
            skipped: BTreeMap::new(),
            cancelled: false,
            mongoperf_version,
        }
    }

    pub fn add_operation(&mut self, name: String, operation: OperationSummary) {
        self.operations.insert(name, operation);
    }

    pub fn add_skipped(&mut self, name: String, reason: String) {
        self.skipped.insert(name, reason);
    }

    pub fn set_cancelled(&mut self, cancelled: bool) {
        self.cancelled = cancelled;
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint identifies the shape of a run rather than its timings. It uses the
    ///     - Database and collection
    ///     - Parallelism
    ///     - Name, action and query count of each operation
    ///     - Names of skipped operations
    ///
    /// Two runs of the same scenario that ran to completion have the same fingerprint. The
    /// fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.database.as_bytes());
        Digest::update(&mut hasher, self.collection.as_bytes());
        Digest::update(&mut hasher, (self.parallelism as u64).to_le_bytes());
        self.operations
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.action.as_bytes());
                Digest::update(&mut hasher, v.query_count.to_le_bytes());
            });
        self.skipped.keys().sorted().for_each(|k| {
            Digest::update(&mut hasher, k.as_bytes());
        });

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: &RunSummary, path: impl AsRef<Path>) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all("\n".as_bytes())?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: &RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line. This is the format produced by
/// [append_run_summary].
pub fn load_summary_runs(path: impl AsRef<Path>) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}
