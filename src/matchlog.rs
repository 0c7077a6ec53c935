use std::path::Path;

use anyhow::Context as _;
use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::schema::{COL_AWAY, COL_DATE, COL_DATE_LEGACY, COL_HOME, COL_PROFIT, COL_PROFIT_LEGACY};

/// One fixture row of a per-season log, with the join key pulled out.
#[derive(Debug, Clone)]
pub struct MatchRow {
    /// `None` when the source date did not parse; such rows never join.
    pub date: Option<NaiveDate>,
    pub home_key: String,
    pub away_key: String,
    /// Every source column, aligned with `MatchLog::columns`.
    pub values: Vec<String>,
}

impl MatchRow {
    pub fn has_join_key(&self) -> bool {
        self.date.is_some() && !self.home_key.is_empty() && !self.away_key.is_empty()
    }
}

/// A per-season log after normalization: the profit column is `net_profit`, the
/// date column is `Date`, and both team keys are present.
#[derive(Debug, Clone)]
pub struct MatchLog {
    pub columns: Vec<String>,
    pub rows: Vec<MatchRow>,
    key_cols: [usize; 3],
    profit_col: usize,
}

impl MatchLog {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Realized unit-stake return; `None` when blank or non-numeric.
    pub fn profit(&self, row: &MatchRow) -> Option<f64> {
        row.values.get(self.profit_col).and_then(|v| parse_f64(v))
    }

    /// Columns other than the join key, in file order.
    pub fn payload_columns(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.key_cols.contains(idx))
            .map(|(idx, name)| (idx, name.as_str()))
    }
}

/// Loads a per-season log, or `None` when the file is missing, unreadable, or
/// lacks the profit/date/team columns. Never fails past this boundary.
pub fn load_matchlog(path: &Path) -> Option<MatchLog> {
    if !path.exists() {
        debug!(path = %path.display(), "matchlog missing");
        return None;
    }
    match read_matchlog(path) {
        Ok(log) => Some(log),
        Err(e) => {
            warn!(path = %path.display(), error = %format!("{e:#}"), "unusable matchlog");
            None
        }
    }
}

/// Fails on the first malformed record (bad encoding, wrong field count); a
/// damaged log is rejected whole rather than repaired.
pub fn read_matchlog(path: &Path) -> anyhow::Result<MatchLog> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;

    let mut columns: Vec<String> = rdr
        .headers()
        .with_context(|| format!("read header {}", path.display()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let profit_col = resolve_column(&mut columns, COL_PROFIT, COL_PROFIT_LEGACY)
        .context("missing profit column: net_profit or profit")?;
    let date_col = resolve_column(&mut columns, COL_DATE, COL_DATE_LEGACY)
        .context("missing date column: Date or date")?;
    let home_col = find_exact(&columns, COL_HOME).context("missing column: HomeTeam_norm")?;
    let away_col = find_exact(&columns, COL_AWAY).context("missing column: AwayTeam_norm")?;

    let mut rows = Vec::new();
    let mut dates_bad: u64 = 0;
    for (i, record) in rdr.records().enumerate() {
        let record = record.with_context(|| format!("parse row {} of {}", i + 1, path.display()))?;
        let values: Vec<String> = record.iter().map(|v| v.to_string()).collect();

        let date = parse_match_date(&values[date_col]);
        if date.is_none() {
            dates_bad += 1;
        }
        rows.push(MatchRow {
            date,
            home_key: values[home_col].clone(),
            away_key: values[away_col].clone(),
            values,
        });
    }

    if dates_bad > 0 {
        debug!(path = %path.display(), dates_bad, "matchlog rows without a usable date");
    }

    Ok(MatchLog {
        columns,
        rows,
        key_cols: [date_col, home_col, away_col],
        profit_col,
    })
}

/// Finds `canonical`, else renames `legacy` to `canonical` in place.
fn resolve_column(columns: &mut [String], canonical: &str, legacy: &str) -> Option<usize> {
    if let Some(idx) = find_exact(columns, canonical) {
        return Some(idx);
    }
    let idx = find_exact(columns, legacy)?;
    columns[idx] = canonical.to_string();
    Some(idx)
}

fn find_exact(columns: &[String], name: &str) -> Option<usize> {
    columns.iter().position(|c| c == name)
}

pub fn parse_match_date(raw: &str) -> Option<NaiveDate> {
    // %y before %Y: chrono reads "21" as year 21 under %Y.
    const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%d/%m/%y", "%d/%m/%Y", "%Y/%m/%d"];
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];

    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    None
}

pub fn parse_f64(s: &str) -> Option<f64> {
    let v = s.trim().parse::<f64>().ok()?;
    if v.is_finite() {
        Some(v)
    } else {
        None
    }
}
