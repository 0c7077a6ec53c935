use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cumprofit::config::Config;
use cumprofit::layout::normalize_curves_layout;

#[derive(Debug, Parser)]
#[command(
    name = "normalize_layout",
    about = "Publish tagged cumprofit curves (base, then smote) under the generic names"
)]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `run.outputs_dir`.
    #[arg(long)]
    outputs_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut cfg = Config::load_or_default(args.config.as_deref()).context("load config")?;
    if let Some(dir) = args.outputs_dir {
        cfg.run.outputs_dir = dir;
    }

    let res = normalize_curves_layout(&cfg.run.outputs_dir, &cfg.curves, &cfg.layout)
        .with_context(|| format!("normalize {}", cfg.run.outputs_dir.display()))?;

    match res {
        Some(r) => {
            println!("source={}", r.source_tag);
            println!("curves_dir={}", r.curves_dir.display());
            println!("files_copied={}", r.files_copied);
            for p in &r.index_copied {
                println!("index={}", p.display());
            }
            for p in &r.index_missing {
                println!("index_missing={}", p.display());
            }
        }
        None => println!("source=none"),
    }
    Ok(())
}
