use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use speech_pitch::{AnalysisConfig, Analyzer, EstimatorOptions};

/// Extract pitch features from WAV files and print them as JSON.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WAV files to analyze
    #[arg(required = true)]
    files: Vec<PathBuf>,
    /// Frame period in milliseconds
    #[arg(long, default_value_t = 5.0)]
    frame_period: f64,
    /// Lowest F0 searched, in Hz
    #[arg(long, default_value_t = 71.0)]
    f0_floor: f64,
    /// Highest F0 searched, in Hz
    #[arg(long, default_value_t = 800.0)]
    f0_ceil: f64,
    /// Compute features on the calling thread
    #[arg(long)]
    sequential: bool,
    /// Indent the JSON output
    #[arg(long)]
    pretty: bool,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = AnalysisConfig {
        estimator: EstimatorOptions {
            frame_period: args.frame_period,
            f0_floor: args.f0_floor,
            f0_ceil: args.f0_ceil,
            ..EstimatorOptions::default()
        },
        parallel_features: !args.sequential,
    };
    if config.estimator.frame_period <= 0.0 || config.estimator.f0_floor <= 0.0 {
        anyhow::bail!("frame period and f0 floor must be positive");
    }
    if config.estimator.f0_ceil <= config.estimator.f0_floor {
        anyhow::bail!("f0 ceiling must be above the f0 floor");
    }

    let analyzer = Analyzer::from_config(&config);
    let mut failed = false;

    for file in &args.files {
        let result = analyzer.analyze(file);
        failed |= !result.is_success();

        let json = if args.pretty {
            result.to_json_pretty()
        } else {
            result.to_json()
        }
        .with_context(|| format!("cannot serialize result for {}", file.display()))?;
        println!("{}", json);
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
