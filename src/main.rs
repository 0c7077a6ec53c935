use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cumprofit::config::Config;
use cumprofit::outcome::Season;

#[derive(Parser, Debug)]
#[command(
    name = "cumprofit",
    version,
    about = "Reconcile model vs market matchlogs and build cumulative-profit curves"
)]
struct Args {
    /// Optional TOML config; built-in layout when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides `run.outputs_dir`.
    #[arg(long)]
    outputs_dir: Option<PathBuf>,

    /// Explicit seasons (comma-separated). If omitted, detected from matchlog file names.
    #[arg(long, value_delimiter = ',')]
    seasons: Vec<Season>,

    /// Build seasons one after another instead of in parallel.
    #[arg(long)]
    sequential: bool,
}

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut cfg = Config::load_or_default(args.config.as_deref()).context("load config")?;
    if let Some(dir) = args.outputs_dir {
        cfg.run.outputs_dir = dir;
    }
    if args.sequential {
        cfg.curves.parallel = false;
    }

    let seasons = if args.seasons.is_empty() {
        None
    } else {
        Some(args.seasons)
    };
    let report = cumprofit::pipeline::run_build(&cfg, seasons).context("build curves")?;

    println!("seasons_detected={}", join_seasons(&report.seasons_detected));
    println!("seasons_built={}", join_seasons(&report.index.seasons()));
    for (season, reason) in &report.skipped {
        println!("skipped.{season}={reason}");
    }
    for row in &report.index.rows {
        println!(
            "season.{}: n_matches={} profit_model={:.3} profit_bet365={:.3} roi_model={:.4} roi_bet365={:.4}",
            row.test_season,
            row.n_matches,
            row.profit_model,
            row.profit_bet365,
            row.roi_model,
            row.roi_bet365
        );
    }
    if let Some((csv_path, json_path)) = &report.index_files {
        println!("index_csv={}", csv_path.display());
        println!("index_json={}", json_path.display());
    }

    info!(
        built = report.built.len(),
        skipped = report.skipped.len(),
        "cumprofit done"
    );
    Ok(())
}

fn join_seasons(seasons: &[Season]) -> String {
    seasons
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>()
        .join(",")
}
