//! Command-line entry point: run the experiment and print the report.

use std::io::Write;
use std::path::PathBuf;

use studypass::config::ExperimentConfig;
use studypass::experiment::{run, save_models};
use studypass::logging;
use studypass::report::write_report;

fn main() {
    if let Err(err) = run_cli() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let mut config = match &options.config {
        Some(path) => ExperimentConfig::load(path).map_err(|err| err.to_string())?,
        None => ExperimentConfig::default(),
    };
    if let Err(err) = logging::init(&config.logging) {
        eprintln!("Logging disabled: {err}");
    }
    tracing::info!("Using {}", config_source(&options));

    if let Some(path) = options.data {
        config.data.path = Some(path);
    }
    if let Some(seed) = options.seed {
        config.data.seed = seed;
    }
    if let Some(fraction) = options.test_fraction {
        config.data.test_fraction = fraction;
    }
    if let Some(folds) = options.folds {
        config.data.folds = folds;
    }
    config.validate().map_err(|err| err.to_string())?;

    let outcome = run(&config).map_err(|err| err.to_string())?;
    if let Some(path) = &options.model_out {
        save_models(path, &outcome.models).map_err(|err| err.to_string())?;
    }

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    write_report(&mut out, &outcome).map_err(|err| format!("Failed to write report: {err}"))?;
    out.flush()
        .map_err(|err| format!("Failed to write report: {err}"))?;
    Ok(())
}

/// Where the run's settings came from, for the startup log line.
fn config_source(options: &CliOptions) -> String {
    match &options.config {
        Some(path) => format!("experiment config from {}", path.display()),
        None => "built-in experiment defaults".to_string(),
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
struct CliOptions {
    data: Option<PathBuf>,
    config: Option<PathBuf>,
    seed: Option<u64>,
    test_fraction: Option<f64>,
    folds: Option<usize>,
    model_out: Option<PathBuf>,
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--data" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--data requires a value".to_string())?;
                options.data = Some(PathBuf::from(value));
            }
            "--config" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                options.config = Some(PathBuf::from(value));
            }
            "--seed" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--seed requires a value".to_string())?;
                options.seed = Some(
                    value
                        .parse::<u64>()
                        .map_err(|_| format!("Invalid --seed value: {value}"))?,
                );
            }
            "--test-fraction" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--test-fraction requires a value".to_string())?;
                options.test_fraction = Some(
                    value
                        .parse::<f64>()
                        .map_err(|_| format!("Invalid --test-fraction value: {value}"))?,
                );
            }
            "--folds" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--folds requires a value".to_string())?;
                options.folds = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| format!("Invalid --folds value: {value}"))?,
                );
            }
            "--model-out" => {
                idx += 1;
                let value = args
                    .get(idx)
                    .ok_or_else(|| "--model-out requires a value".to_string())?;
                options.model_out = Some(PathBuf::from(value));
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }
    Ok(options)
}

fn help_text() -> String {
    [
        "studypass",
        "",
        "Trains FastTree, logistic regression and LightGBM-style classifiers on a",
        "study-hours/attendance CSV, cross-validates them and prints a majority-vote report.",
        "",
        "Usage:",
        "  studypass --data <file.csv> [options]",
        "",
        "Options:",
        "  --data <file.csv>        Input CSV (header + hours, attendance, passed).",
        "  --config <file.toml>     Experiment config; flags override its values.",
        "  --seed <u64>             Seed for the test split and folds (default 0).",
        "  --test-fraction <f64>    Held-out fraction in (0, 1) (default 0.2).",
        "  --folds <n>              Cross-validation folds (default 5).",
        "  --model-out <file.json>  Write the fitted normalizers and models as JSON.",
        "  -h, --help               Show this help.",
    ]
    .join("\n")
}
