//! Kasparro command-line entry point
//!
//! Loads configuration, runs the content workflow once and exits non-zero
//! when any task failed or the workflow did not complete.

use anyhow::{Context, Result};
use kasparro::pipeline::{self, PipelineOptions};
use kasparro_core::config::{load_config, load_from_file};
use kasparro_core::telemetry::init_tracing;
use std::path::PathBuf;
use std::process::ExitCode;

const USAGE: &str = "\
Usage: kasparro [OPTIONS]

Options:
  -c, --config <FILE>     Configuration file (default: .kasparro.toml, then user config)
  -i, --input <FILE>      Product input file
  -o, --output <DIR>      Directory for JSON artifacts
      --outputs <LIST>    Comma-separated outputs: product_page,faq_page,comparison_page
      --status            Print the final system status as JSON
  -h, --help              Show this help
";

/// Command-line arguments
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    outputs: Option<Vec<String>>,
    status: bool,
    help: bool,
}

impl Args {
    /// Parse command-line arguments
    fn parse() -> Self {
        Self::parse_from(std::env::args().skip(1))
    }

    fn parse_from(args: impl IntoIterator<Item = String>) -> Self {
        let mut args = args.into_iter();
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => parsed.config = args.next().map(PathBuf::from),
                "--input" | "-i" => parsed.input = args.next().map(PathBuf::from),
                "--output" | "-o" => parsed.output = args.next().map(PathBuf::from),
                "--outputs" => {
                    parsed.outputs = args.next().map(|list| {
                        list.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    });
                }
                "--status" => parsed.status = true,
                "--help" | "-h" => parsed.help = true,
                _ => {
                    // Ignore unknown flags
                }
            }
        }

        parsed
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if args.help {
        print!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Run once; `Ok(false)` means the workflow did not fully succeed
fn run(args: &Args) -> Result<bool> {
    let config = match &args.config {
        Some(path) => load_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            load_config(&cwd).context("Failed to load config")?
        }
    };
    init_tracing(&config.logging);
    tracing::info!("Kasparro v{} starting", kasparro::version());

    let mut options = PipelineOptions::from_config(&config);
    if let Some(input) = &args.input {
        options.input = input.clone();
    }
    if let Some(output) = &args.output {
        options.output_dir = output.clone();
    }
    if let Some(outputs) = &args.outputs {
        options.outputs = outputs.clone();
    }

    let outcome = pipeline::run(&config, &options).context("Content workflow failed")?;

    for trail in &outcome.trails {
        tracing::info!("{}:", trail.agent_name);
        for decision in &trail.decisions {
            tracing::info!("  Decision: {}", decision.decision);
            tracing::info!("  Reasoning: {}", decision.reasoning);
        }
    }

    if args.status {
        println!("{}", serde_json::to_string_pretty(&outcome.status)?);
    }

    match &outcome.report {
        Some(report) if report.succeeded() => {
            tracing::info!(
                "SUCCESS: workflow {} completed, {} tasks executed",
                outcome.workflow_id,
                outcome.task_count
            );
            Ok(true)
        }
        Some(report) => {
            tracing::warn!(
                "Workflow {} completed with {} failed task(s)",
                outcome.workflow_id,
                report.failed.len()
            );
            Ok(false)
        }
        None => {
            tracing::warn!("Workflow {} did not complete", outcome.workflow_id);
            Ok(false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(args: &[&str]) -> Args {
        Args::parse_from(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_all_flags() {
        let args = parse(&[
            "--config",
            "k.toml",
            "-i",
            "data/in.json",
            "--output",
            "out",
            "--outputs",
            "faq_page, product_page,",
            "--status",
        ]);
        assert_eq!(args.config, Some(PathBuf::from("k.toml")));
        assert_eq!(args.input, Some(PathBuf::from("data/in.json")));
        assert_eq!(args.output, Some(PathBuf::from("out")));
        assert_eq!(
            args.outputs,
            Some(vec!["faq_page".to_string(), "product_page".to_string()])
        );
        assert!(args.status);
        assert!(!args.help);
    }

    #[test]
    fn test_unknown_and_dangling_flags() {
        let args = parse(&["--verbose", "-h", "--input"]);
        assert!(args.help);
        assert_eq!(args.input, None);
    }
}
