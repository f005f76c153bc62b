//! Parotid-Screen CLI - cohort assembly and univariate feature screening.
//!
//! Points the library pipeline at a study directory, runs both significance
//! screens, and prints (or writes) the resulting report as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use parotid_screen::{ScreenConfig, ScreenMethod, ScreeningPipeline};

#[derive(Parser, Debug)]
#[command(name = "parotid-screen", version, about)]
struct Cli {
    /// Study data directory (roster file next to the exams subdirectory)
    data_dir: PathBuf,

    /// Optional YAML configuration file; CLI flags override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Screen driving the selection
    #[arg(long, value_enum, default_value = "auc")]
    method: Method,

    /// Number of features to select
    #[arg(long, default_value_t = 10)]
    top_n: usize,

    /// Write the JSON report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum Method {
    Auc,
    Ttest,
}

impl From<Method> for ScreenMethod {
    fn from(method: Method) -> Self {
        match method {
            Method::Auc => Self::Auc,
            Method::Ttest => Self::TTest,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    let mut config = match &cli.config {
        Some(path) => ScreenConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => ScreenConfig::default(),
    };
    config.data.data_dir = cli.data_dir;
    config.selection.method = cli.method.into();
    config.selection.top_n = cli.top_n;

    let pipeline = ScreeningPipeline::new(config)?;
    let report = pipeline.run()?;

    let json = serde_json::to_string_pretty(&report)?;
    match &cli.output {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("writing report to {}", path.display()))?;
            eprintln!("report written to {}", path.display());
        }
        None => println!("{json}"),
    }

    Ok(())
}
