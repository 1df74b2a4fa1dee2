//! Status command - show review progress from the result files.

use std::path::PathBuf;

use colored::Colorize;
use exreview::ResultSink;

use super::{load_config, runtime};

pub fn run(
    config_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    json_output: bool,
    _verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(config_path.as_deref())?;
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }

    let sink = ResultSink::new(config.sink_path(), config.columns.clone())?
        .with_failure_log(config.failures_path());
    let summary = runtime()?.block_on(sink.summary())?;

    if json_output {
        let status = serde_json::json!({
            "results_file": config.sink_path(),
            "failures_file": config.failures_path(),
            "reviewed": summary.reviewed,
            "mean_correctness": summary.mean_correctness,
            "failed_attempts": summary.failed_attempts,
            "failures_by_error": summary.failures_by_error,
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "Review status for".cyan().bold(),
        config.sink_path().display().to_string().white()
    );
    println!();

    if !config.sink_path().exists() {
        println!(
            "No results yet. Run {} to start reviewing.",
            "exreview run".cyan().bold()
        );
        return Ok(());
    }

    println!("Reviewed: {}", summary.reviewed.to_string().green().bold());
    if let Some(mean) = summary.mean_correctness {
        let score = format!("{:.2}", mean);
        let score = if mean >= 0.8 {
            score.green()
        } else if mean >= 0.5 {
            score.yellow()
        } else {
            score.red()
        };
        println!("Mean correctness: {}", score);
    }
    println!();

    println!(
        "{} {}",
        "Failed attempts:".yellow().bold(),
        summary.failed_attempts.to_string().red()
    );
    for (error, count) in &summary.failures_by_error {
        println!("  {:24} {}", error, count);
    }

    Ok(())
}
