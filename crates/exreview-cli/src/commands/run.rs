//! Run command - review the next batch of exercises.

use colored::Colorize;
use exreview::input::DEFAULT_TABLE;
use exreview::{BatchCoordinator, RunConfig, RunReport, SourceConfig};

use crate::cli::RunArgs;

use super::{load_config, runtime};

pub fn run(args: RunArgs, verbose: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let source = match (&args.source_json, &args.source_sqlite) {
        (Some(path), _) => SourceConfig::Json { path: path.clone() },
        (None, Some(url)) => SourceConfig::Sqlite {
            url: url.clone(),
            table: args
                .table
                .clone()
                .unwrap_or_else(|| DEFAULT_TABLE.to_string()),
        },
        (None, None) => config.source.clone().ok_or(
            "No record source configured. Use --source-json, --source-sqlite or [source] in the config file.",
        )?,
    };

    let coordinator = BatchCoordinator::from_config(config)?;
    let config = coordinator.config();

    println!(
        "{} up to {} exercises from {} with {} (concurrency {})",
        "Reviewing".cyan().bold(),
        config.fetch_count.to_string().white().bold(),
        source.describe().white(),
        format!("{}/{}", config.model.provider, config.model.model()).white(),
        config.concurrency
    );

    let report = runtime()?.block_on(coordinator.run_with(&source))?;
    print_report(&report, config, verbose);

    Ok(())
}

fn apply_overrides(config: &mut RunConfig, args: &RunArgs) {
    if let Some(count) = args.count {
        config.fetch_count = count;
    }
    if let Some(ref start) = args.start {
        config.starting_id = Some(start.clone());
    }
    if let Some(ref category) = args.category {
        config.category_id = Some(category.clone());
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(delay) = args.delay_ms {
        config.delay_ms = delay;
    }
    if let Some(ref dir) = args.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(provider) = args.provider {
        config.model.provider = provider;
        config.model.name = None;
    }
    if let Some(ref model) = args.model {
        config.model.name = Some(model.clone());
    }
}

fn print_report(report: &RunReport, config: &RunConfig, verbose: bool) {
    println!();

    if report.fetched == 0 {
        println!("{}", "No unprocessed exercises found.".green().bold());
        return;
    }

    println!(
        "Processed {} exercises ({} succeeded, {} failed)",
        report.fetched.to_string().white().bold(),
        report.succeeded.len().to_string().green(),
        report.failed.len().to_string().red()
    );

    if verbose && !report.succeeded.is_empty() {
        println!();
        println!("{}", "Succeeded:".yellow().bold());
        for id in &report.succeeded {
            println!("  {}", id.green());
        }
    }

    if !report.failed.is_empty() {
        println!();
        println!("{}", "Failed:".yellow().bold());
        for failed in &report.failed {
            println!("  {:12} {}", failed.id.red(), failed.error.to_string().dimmed());
        }
    }

    if let Some(ref sink) = report.sink {
        println!();
        println!(
            "Results: {} ({} new, {} duplicates skipped)",
            config.sink_path().display().to_string().white(),
            sink.appended.to_string().green(),
            sink.skipped_duplicates
        );
        if sink.failures_logged > 0 {
            println!(
                "Failures: {} ({} logged)",
                config.failures_path().display().to_string().white(),
                sink.failures_logged.to_string().red()
            );
        }
    }

    if let Some(elapsed) = report.elapsed() {
        println!(
            "Finished in {:.1}s",
            elapsed.num_milliseconds() as f64 / 1000.0
        );
    }

    if !report.failed.is_empty() {
        println!();
        println!(
            "Run {} again to retry failed exercises.",
            "exreview run".cyan().bold()
        );
    }
}
