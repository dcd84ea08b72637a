use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use bytesize::ByteSize;
use glob::glob;
use mrl_engine::{resolve_splits, run_job, JobConfig, JobReport};
use tracing::{info, warn};

use crate::args::Args;

const SUMMARY_FILE: &str = "_SUMMARY.json";

/// Expand the input glob into the files to map.
pub fn input_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = glob(pattern)?
        .flatten()
        .filter(|path| path.is_file())
        .collect();

    if files.is_empty() {
        warn!("no input files match `{pattern}`");
    }
    Ok(files)
}

/// Write each partition's output plus a JSON summary into `dir`.
pub fn write_outputs(dir: &Path, report: &JobReport) -> Result<()> {
    fs::create_dir_all(dir)?;

    for (index, data) in report.outputs.iter().enumerate() {
        fs::write(dir.join(format!("mr-out-{index}")), data)?;
    }
    fs::write(dir.join(SUMMARY_FILE), serde_json::to_vec_pretty(&report.stats)?)?;
    Ok(())
}

pub fn run(args: Args) -> Result<JobReport> {
    let workload = workload::try_named(&args.workload).ok_or_else(|| {
        anyhow!(
            "The workload `{}` is not a known workload (known: {})",
            args.workload,
            workload::names().collect::<Vec<_>>().join(", ")
        )
    })?;

    let splits = resolve_splits(input_files(&args.input)?);
    let total: u64 = splits.iter().filter_map(|split| split.size).sum();
    info!(
        "Running `{}` over {} splits ({})",
        args.workload,
        splits.len(),
        ByteSize(total)
    );

    let config = JobConfig::new(args.workers, args.partitions);
    let report = run_job(&splits, workload.map_fn, workload.reduce_fn, config)?;

    let output = Path::new(&args.output);
    write_outputs(output, &report)?;
    info!("Wrote {} partitions to {}", report.outputs.len(), output.display());

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(input: String, output: String, workload: &str) -> Args {
        Args {
            input,
            workload: workload.to_string(),
            output,
            workers: 2,
            partitions: 3,
        }
    }

    #[test]
    fn runs_word_count_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        fs::create_dir(&input).unwrap();
        fs::write(input.join("a.txt"), "b a b").unwrap();
        fs::write(input.join("b.txt"), "a c").unwrap();
        let out = dir.path().join("out");

        let report = run(args(
            format!("{}/*.txt", input.display()),
            out.display().to_string(),
            "wc",
        ))
        .unwrap();
        assert_eq!(report.stats.splits, 2);

        let mut lines = Vec::new();
        for index in 0..3 {
            let data = fs::read_to_string(out.join(format!("mr-out-{index}"))).unwrap();
            lines.extend(data.lines().map(str::to_string));
        }
        lines.sort();
        assert_eq!(lines, ["a 2", "b 2", "c 1"]);

        let summary: serde_json::Value =
            serde_json::from_slice(&fs::read(out.join(SUMMARY_FILE)).unwrap()).unwrap();
        assert_eq!(summary["records"], 5);
        assert_eq!(summary["partitions"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn unknown_workload_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = run(args(
            format!("{}/*", dir.path().display()),
            dir.path().join("out").display().to_string(),
            "matrix-multiply",
        ))
        .unwrap_err();
        assert!(err.to_string().contains("not a known workload"));
    }

    #[test]
    fn directories_are_not_splits() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("file.txt"), "x").unwrap();

        let files = input_files(&format!("{}/*", dir.path().display())).unwrap();
        assert_eq!(files, vec![dir.path().join("file.txt")]);
    }
}
