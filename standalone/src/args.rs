use clap::Parser;

/// Run a bundled MapReduce workload over local files.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Glob spec for the input files, one split per file.
    #[arg(short, long)]
    pub input: String,

    /// Name of the workload.
    #[arg(short, long, default_value = "wc")]
    pub workload: String,

    /// Output directory, receives one `mr-out-{partition}` file per partition.
    #[arg(short, long, default_value = "out")]
    pub output: String,

    /// Number of worker threads.
    #[arg(short = 'n', long, default_value = "4")]
    pub workers: usize,

    /// Number of partitions (and reduce jobs).
    #[arg(short, long, default_value = "8")]
    pub partitions: u32,
}
