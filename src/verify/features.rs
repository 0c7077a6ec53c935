use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::config::FeatureSchemaConfig;

/// Feature snapshot files in one directory, sorted by name.
pub fn feature_files(dir: &Path, cfg: &FeatureSchemaConfig) -> Vec<PathBuf> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut out: Vec<PathBuf> = entries
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            let name_ok = p
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(cfg.prefix.as_str()));
            let ext_ok = p
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&cfg.extension));
            name_ok && ext_ok
        })
        .collect();
    out.sort();
    out
}

pub fn read_header(path: &Path) -> anyhow::Result<Vec<String>> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let header = rdr
        .headers()
        .with_context(|| format!("read header {}", path.display()))?;
    Ok(header.iter().map(|h| h.to_string()).collect())
}

/// Problems with one header: required columns absent (case-insensitive) and
/// no column carrying a normalized-metric suffix. Empty when the header is fine.
pub fn header_problems(header: &[String], cfg: &FeatureSchemaConfig) -> Vec<String> {
    let present: BTreeSet<String> = header.iter().map(|h| h.trim().to_ascii_lowercase()).collect();
    let required: BTreeSet<String> = cfg
        .required_columns
        .iter()
        .map(|c| c.trim().to_ascii_lowercase())
        .collect();

    let mut problems = Vec::new();
    let missing: Vec<&str> = cfg
        .required_columns
        .iter()
        .filter(|c| !present.contains(&c.trim().to_ascii_lowercase()))
        .map(|c| c.as_str())
        .collect();
    if !missing.is_empty() {
        problems.push(format!("missing columns [{}]", missing.join(", ")));
    }

    let suffixes: Vec<String> = cfg
        .metric_suffixes
        .iter()
        .map(|s| s.to_ascii_lowercase())
        .collect();
    let has_metric = present
        .iter()
        .filter(|c| !required.contains(*c))
        .any(|c| suffixes.iter().any(|s| c.len() > s.len() && c.ends_with(s.as_str())));
    if !has_metric {
        let pattern: Vec<String> = cfg.metric_suffixes.iter().map(|s| format!("*{s}")).collect();
        problems.push(format!(
            "no normalized metric column ({})",
            pattern.join(", ")
        ));
    }
    problems
}

/// One line per offending file in `dir`, or `None` when `dir` holds no
/// feature files at all.
pub fn inspect_feature_dir(
    variant: &str,
    dir: &Path,
    cfg: &FeatureSchemaConfig,
) -> Option<Vec<String>> {
    let files = feature_files(dir, cfg);
    if files.is_empty() {
        return None;
    }
    let mut out = Vec::new();
    for path in files {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let problems = match read_header(&path) {
            Ok(header) => header_problems(&header, cfg),
            Err(e) => vec![format!("unreadable header: {e:#}")],
        };
        if !problems.is_empty() {
            out.push(format!("{variant}/{name}: {}", problems.join("; ")));
        }
    }
    Some(out)
}
