use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cumprofit::config::Config;
use cumprofit::verify::{render_lines, verify_outputs};

#[derive(Parser, Debug)]
#[command(name = "verify_outputs", about = "Check the outputs tree for missing or malformed artifacts")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `run.outputs_dir`.
    #[arg(long)]
    outputs_dir: Option<PathBuf>,

    /// Also write the verdict as JSON to this path.
    #[arg(long)]
    json_out: Option<PathBuf>,
}

fn main() -> anyhow::Result<ExitCode> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut cfg = Config::load_or_default(args.config.as_deref()).context("load config")?;
    if let Some(dir) = args.outputs_dir {
        cfg.run.outputs_dir = dir;
    }

    let verdict = verify_outputs(&cfg.run.outputs_dir, &cfg.verify);
    for line in render_lines(&verdict) {
        println!("{line}");
    }

    if let Some(path) = &args.json_out {
        let json = serde_json::to_vec_pretty(&verdict).context("serialize verdict")?;
        std::fs::write(path, json).with_context(|| format!("write {}", path.display()))?;
        println!("json_out={}", path.display());
    }

    info!(
        verified = verdict.verified,
        warnings = verdict.warnings.len(),
        failures = verdict.failures.len(),
        "verify_outputs done"
    );
    Ok(if verdict.verified {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
