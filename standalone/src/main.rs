use clap::Parser;
use tracing::info;

mod args;
use args::Args;

mod core;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let report = core::run(args)?;

    info!(
        "Done: {} records, {} keys, {} failed splits, {} failed keys",
        report.stats.records,
        report.stats.keys,
        report.stats.failed_splits,
        report.stats.failed_keys
    );
    Ok(())
}
