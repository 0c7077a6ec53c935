use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Serialize;

use crate::config::CurvesConfig;
use crate::curve::{fmt_amount, SeasonSummary};
use crate::outcome::Season;
use crate::schema::{curve_csv_name, curve_json_name, INDEX_HEADER};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonIndexRow {
    pub test_season: Season,
    pub train_until: Season,
    pub n_matches: usize,
    pub profit_model: f64,
    pub profit_bet365: f64,
    pub roi_model: f64,
    pub roi_bet365: f64,
    pub csv_file: String,
    pub json_file: String,
}

impl From<&SeasonSummary> for SeasonIndexRow {
    fn from(s: &SeasonSummary) -> Self {
        Self {
            test_season: s.test_season,
            train_until: s.train_until,
            n_matches: s.n_matches,
            profit_model: s.profit_model,
            profit_bet365: s.profit_market,
            roi_model: s.roi_model,
            roi_bet365: s.roi_market,
            csv_file: curve_csv_name(s.test_season),
            json_file: curve_json_name(s.test_season),
        }
    }
}

/// Every season with a built curve, ascending, one row per season.
#[derive(Debug, Clone, Default)]
pub struct SeasonIndex {
    pub rows: Vec<SeasonIndexRow>,
}

impl SeasonIndex {
    /// Later summaries for an already-seen season replace earlier ones.
    pub fn from_summaries<'a>(summaries: impl IntoIterator<Item = &'a SeasonSummary>) -> Self {
        let mut by_season: BTreeMap<Season, SeasonIndexRow> = BTreeMap::new();
        for s in summaries {
            by_season.insert(s.test_season, SeasonIndexRow::from(s));
        }
        Self {
            rows: by_season.into_values().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn seasons(&self) -> Vec<Season> {
        self.rows.iter().map(|r| r.test_season).collect()
    }
}

/// Writes the index pair, replacing whatever a previous run left behind.
/// The CSV shows amounts at display precision; the JSON keeps full precision.
pub fn write_index(
    out_dir: &Path,
    cfg: &CurvesConfig,
    index: &SeasonIndex,
) -> anyhow::Result<(PathBuf, PathBuf)> {
    let csv_path = out_dir.join(cfg.index_csv_name());
    let json_path = out_dir.join(cfg.index_json_name());

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&csv_path)
        .with_context(|| format!("open {}", csv_path.display()))?;
    wtr.write_record(INDEX_HEADER).context("write header")?;
    for r in &index.rows {
        wtr.write_record([
            r.test_season.to_string(),
            r.train_until.to_string(),
            r.n_matches.to_string(),
            fmt_amount(r.profit_model),
            fmt_amount(r.profit_bet365),
            fmt_amount(r.roi_model),
            fmt_amount(r.roi_bet365),
            r.csv_file.clone(),
            r.json_file.clone(),
        ])
        .context("write row")?;
    }
    wtr.flush()
        .with_context(|| format!("flush {}", csv_path.display()))?;

    let json = serde_json::to_vec_pretty(&index.rows).context("serialize season index")?;
    std::fs::write(&json_path, json)
        .with_context(|| format!("write {}", json_path.display()))?;

    Ok((csv_path, json_path))
}
