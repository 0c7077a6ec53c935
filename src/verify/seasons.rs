use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Context as _;

use crate::config::{FilenameHintConfig, SeasonGroupConfig, SeasonTableConfig};
use crate::matchlog::parse_f64;
use crate::outcome::Season;

/// Seasons a group must cover, and where they came from.
#[derive(Debug, Clone, Default)]
pub struct SeasonDiscovery {
    pub seasons: BTreeSet<Season>,
    /// Human-readable origin of each contributing source.
    pub sources: Vec<String>,
    pub from_filenames: bool,
    /// Source tables that exist but could not be read.
    pub errors: Vec<String>,
}

impl SeasonDiscovery {
    pub fn is_empty(&self) -> bool {
        self.seasons.is_empty()
    }

    pub fn list(&self) -> String {
        let v: Vec<String> = self.seasons.iter().map(|s| s.to_string()).collect();
        format!("[{}]", v.join(", "))
    }

    /// Where the seasons came from, for diagnostics.
    pub fn origin(&self) -> String {
        if self.from_filenames {
            format!("from file names {}", self.sources.join(", "))
        } else {
            format!("from {}", self.sources.join(", "))
        }
    }
}

/// Union of seasons over every table; file names are the fallback when the
/// tables yield nothing.
pub fn discover_seasons(outputs_dir: &Path, group: &SeasonGroupConfig) -> SeasonDiscovery {
    let mut out = SeasonDiscovery::default();

    for table in &group.tables {
        match seasons_from_table(outputs_dir, table) {
            Ok(found) => {
                if !found.is_empty() {
                    out.sources.push(format!("{}:{}", table.file, table.column));
                    out.seasons.extend(found);
                }
            }
            Err(e) => out.errors.push(format!("{e:#}")),
        }
    }
    if !out.seasons.is_empty() {
        return out;
    }

    for hint in &group.filename_hints {
        let found = seasons_from_filenames(outputs_dir, hint);
        if !found.is_empty() {
            out.sources.push(format!("{}/{}*", hint.dir, hint.prefix));
            out.seasons.extend(found);
        }
    }
    out.from_filenames = !out.seasons.is_empty();
    out
}

/// Seasons listed in one column of an aggregate table. A missing table or
/// column yields nothing; only an unreadable table is an error.
pub fn seasons_from_table(
    outputs_dir: &Path,
    table: &SeasonTableConfig,
) -> anyhow::Result<BTreeSet<Season>> {
    let mut out = BTreeSet::new();
    let path = outputs_dir.join(&table.file);
    if !path.is_file() {
        return Ok(out);
    }

    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(&path)
        .with_context(|| format!("open {}", path.display()))?;
    let header = rdr
        .headers()
        .with_context(|| format!("read header {}", path.display()))?
        .clone();

    let Some(idx_season) = find_col(&header, &table.column) else {
        return Ok(out);
    };
    let idx_positive = table
        .positive_column
        .as_deref()
        .and_then(|c| find_col(&header, c));

    for record in rdr.records() {
        let Ok(record) = record else {
            continue;
        };
        let Some(season) = record.get(idx_season).and_then(parse_season) else {
            continue;
        };
        if let Some(n) = idx_positive.and_then(|i| record.get(i)).and_then(parse_f64) {
            if n <= 0.0 {
                continue;
            }
        }
        out.insert(season);
    }
    Ok(out)
}

/// Seasons encoded as `<prefix><season>.<ext>` inside one directory.
pub fn seasons_from_filenames(outputs_dir: &Path, hint: &FilenameHintConfig) -> BTreeSet<Season> {
    let mut out = BTreeSet::new();
    let dir = outputs_dir.join(&hint.dir);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return out;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if let Some(s) = stem.strip_prefix(hint.prefix.as_str()).and_then(|rest| rest.parse().ok()) {
            out.insert(s);
        }
    }
    out
}

/// Accepts `2021` and float renderings such as `2021.0`.
fn parse_season(raw: &str) -> Option<Season> {
    let v = parse_f64(raw)?;
    let t = v.trunc();
    if t < f64::from(Season::MIN) || t > f64::from(Season::MAX) {
        return None;
    }
    Some(t as Season)
}

fn find_col(header: &csv::StringRecord, name: &str) -> Option<usize> {
    header
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(name))
}
