use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::{Config, CurvesConfig};
use crate::curve::{build_season_curve, write_curve_csv, write_curve_json, SeasonCurve, SeasonSummary};
use crate::index::{write_index, SeasonIndex};
use crate::matchlog::load_matchlog;
use crate::outcome::Season;
use crate::reconcile::{reconcile, JoinSuffixes};

/// Why a season produced no curve. Never fatal for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    ModelLogUnusable(PathBuf),
    MarketLogUnusable(PathBuf),
    EmptyLog(PathBuf),
    NoOverlap,
    WriteFailed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::ModelLogUnusable(p) => write!(f, "model log unusable: {}", p.display()),
            SkipReason::MarketLogUnusable(p) => write!(f, "market log unusable: {}", p.display()),
            SkipReason::EmptyLog(p) => write!(f, "log has no rows: {}", p.display()),
            SkipReason::NoOverlap => f.write_str("no fixture shared by model and market logs"),
            SkipReason::WriteFailed(e) => write!(f, "write failed: {e}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltSeason {
    pub curve: SeasonCurve,
    pub summary: SeasonSummary,
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub seasons_detected: Vec<Season>,
    pub built: Vec<SeasonSummary>,
    pub skipped: Vec<(Season, SkipReason)>,
    pub index: SeasonIndex,
    pub index_files: Option<(PathBuf, PathBuf)>,
}

/// First run of four consecutive digits in a file stem.
pub fn season_from_stem(stem: &str) -> Option<Season> {
    let bytes = stem.as_bytes();
    let mut run = 0usize;
    for (i, b) in bytes.iter().enumerate() {
        if b.is_ascii_digit() {
            run += 1;
            if run == 4 {
                return stem[i + 1 - 4..=i].parse().ok();
            }
        } else {
            run = 0;
        }
    }
    None
}

/// Seasons with a model log in the outputs root, ascending.
pub fn detect_seasons(outputs_dir: &Path, cfg: &CurvesConfig) -> anyhow::Result<Vec<Season>> {
    let mut seasons: BTreeSet<Season> = BTreeSet::new();
    for entry in std::fs::read_dir(outputs_dir)
        .with_context(|| format!("read {}", outputs_dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with(&cfg.model_prefix) || !name.ends_with(".csv") {
            continue;
        }
        if cfg.skip_tokens.iter().any(|t| name.contains(t.as_str())) {
            continue;
        }
        let stem = name.trim_end_matches(".csv");
        if let Some(s) = season_from_stem(stem) {
            seasons.insert(s);
        }
    }
    Ok(seasons.into_iter().collect())
}

/// Loads, joins and accumulates one season without touching the filesystem
/// beyond reading its two logs.
pub fn build_season(
    outputs_dir: &Path,
    season: Season,
    cfg: &CurvesConfig,
) -> Result<BuiltSeason, SkipReason> {
    let model_path = outputs_dir.join(cfg.model_log_name(season));
    let market_path = outputs_dir.join(cfg.market_log_name(season));

    let model = load_matchlog(&model_path).ok_or(SkipReason::ModelLogUnusable(model_path.clone()))?;
    let market =
        load_matchlog(&market_path).ok_or(SkipReason::MarketLogUnusable(market_path.clone()))?;
    if model.is_empty() {
        return Err(SkipReason::EmptyLog(model_path));
    }
    if market.is_empty() {
        return Err(SkipReason::EmptyLog(market_path));
    }

    let suffixes = JoinSuffixes {
        model: &cfg.model_suffix,
        market: &cfg.market_suffix,
    };
    let table = reconcile(&model, &market, suffixes).ok_or(SkipReason::NoOverlap)?;
    let (curve, summary) =
        build_season_curve(season, &table, suffixes).ok_or(SkipReason::NoOverlap)?;

    info!(
        season,
        model_rows = table.stats.model_rows,
        market_rows = table.stats.market_rows,
        matched = table.stats.matched,
        "season reconciled"
    );
    Ok(BuiltSeason { curve, summary })
}

fn build_and_write(
    outputs_dir: &Path,
    curves_dir: &Path,
    season: Season,
    cfg: &CurvesConfig,
) -> Result<BuiltSeason, SkipReason> {
    let built = build_season(outputs_dir, season, cfg)?;
    write_curve_csv(curves_dir, &built.curve)
        .and_then(|_| write_curve_json(curves_dir, &built.curve, &built.summary))
        .map_err(|e| SkipReason::WriteFailed(format!("{e:#}")))?;
    Ok(built)
}

/// Builds every detected (or given) season and rewrites the season index.
/// Per-season problems are logged and skipped; only failures to prepare the
/// output tree surface as errors.
pub fn run_build(cfg: &Config, seasons: Option<Vec<Season>>) -> anyhow::Result<BuildReport> {
    let outputs_dir = cfg.run.outputs_dir.as_path();
    let mut report = BuildReport::default();
    if !outputs_dir.exists() {
        info!(outputs_dir = %outputs_dir.display(), "outputs dir missing; nothing to do");
        return Ok(report);
    }

    let curves_dir = outputs_dir.join(&cfg.curves.curves_dir);
    std::fs::create_dir_all(&curves_dir)
        .with_context(|| format!("create {}", curves_dir.display()))?;

    let seasons = match seasons {
        Some(mut v) => {
            v.sort_unstable();
            v.dedup();
            v
        }
        None => detect_seasons(outputs_dir, &cfg.curves)?,
    };
    if seasons.is_empty() {
        warn!(outputs_dir = %outputs_dir.display(), "no seasons detected");
    } else {
        info!(?seasons, "seasons detected");
    }
    report.seasons_detected = seasons.clone();

    let run_one = |s: &Season| (*s, build_and_write(outputs_dir, &curves_dir, *s, &cfg.curves));
    let results: Vec<(Season, Result<BuiltSeason, SkipReason>)> = if cfg.curves.parallel {
        seasons.par_iter().map(run_one).collect()
    } else {
        seasons.iter().map(run_one).collect()
    };

    for (season, res) in results {
        match res {
            Ok(built) => {
                info!(
                    season,
                    points = built.curve.points.len(),
                    profit_model = built.summary.profit_model,
                    profit_market = built.summary.profit_market,
                    "season curve written"
                );
                report.built.push(built.summary);
            }
            Err(reason) => {
                warn!(season, reason = %reason, "season skipped");
                report.skipped.push((season, reason));
            }
        }
    }

    report.index = SeasonIndex::from_summaries(&report.built);
    let files = write_index(outputs_dir, &cfg.curves, &report.index)?;
    if report.index.is_empty() {
        warn!("no season produced a curve; index written empty");
    }
    report.index_files = Some(files);

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn season_is_first_four_digit_run() {
        assert_eq!(season_from_stem("matchlogs_2021"), Some(2021));
        assert_eq!(season_from_stem("matchlogs_v2_20192020"), Some(2019));
        assert_eq!(season_from_stem("matchlogs_12_2020"), Some(2020));
        assert_eq!(season_from_stem("matchlogs_latest"), None);
    }

    #[test]
    fn skip_reasons_render_paths() {
        let r = SkipReason::MarketLogUnusable(PathBuf::from("outputs/matchlogs_market_2020.csv"));
        assert!(r.to_string().contains("matchlogs_market_2020.csv"));
    }
}
