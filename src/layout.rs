use std::path::{Path, PathBuf};

use anyhow::Context as _;
use tracing::{info, warn};

use crate::config::{CurvesConfig, LayoutConfig, LayoutSourceConfig};

#[derive(Debug, Clone)]
pub struct NormalizeResult {
    pub source_tag: String,
    pub curves_dir: PathBuf,
    pub files_copied: usize,
    /// Index files copied to their generic names.
    pub index_copied: Vec<PathBuf>,
    /// Index files the source was expected to have but did not.
    pub index_missing: Vec<PathBuf>,
}

fn has_entries(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut it| it.next().is_some())
        .unwrap_or(false)
}

/// First configured source whose curves directory exists and is non-empty.
pub fn pick_source<'a>(outputs_dir: &Path, layout: &'a LayoutConfig) -> Option<&'a LayoutSourceConfig> {
    layout.sources.iter().find(|s| {
        let dir = outputs_dir.join(&s.curves_dir);
        dir.is_dir() && has_entries(&dir)
    })
}

/// Publishes a tagged curves layout (e.g. `cumprofit_curves_base/`) under the
/// generic names. The generic curves directory is replaced wholesale so no
/// stale season survives. `Ok(None)` when no source has curves.
pub fn normalize_curves_layout(
    outputs_dir: &Path,
    curves: &CurvesConfig,
    layout: &LayoutConfig,
) -> anyhow::Result<Option<NormalizeResult>> {
    if !outputs_dir.is_dir() {
        info!(outputs_dir = %outputs_dir.display(), "outputs dir missing; nothing to normalize");
        return Ok(None);
    }
    let Some(src) = pick_source(outputs_dir, layout) else {
        let tried: Vec<&str> = layout.sources.iter().map(|s| s.curves_dir.as_str()).collect();
        info!(?tried, "no source curves found");
        return Ok(None);
    };

    let mut index_copied = Vec::new();
    let mut index_missing = Vec::new();
    for (ext, generic) in [("csv", curves.index_csv_name()), ("json", curves.index_json_name())] {
        let from = outputs_dir.join(format!("{}.{ext}", src.index_stem));
        let to = outputs_dir.join(generic);
        if from.is_file() {
            std::fs::copy(&from, &to)
                .with_context(|| format!("copy {} -> {}", from.display(), to.display()))?;
            info!(from = %from.display(), to = %to.display(), "index copied");
            index_copied.push(to);
        } else {
            warn!(path = %from.display(), "source index missing");
            index_missing.push(from);
        }
    }

    let src_dir = outputs_dir.join(&src.curves_dir);
    let dst_dir = outputs_dir.join(&curves.curves_dir);
    if dst_dir.exists() {
        std::fs::remove_dir_all(&dst_dir)
            .with_context(|| format!("remove {}", dst_dir.display()))?;
    }
    std::fs::create_dir_all(&dst_dir).with_context(|| format!("create {}", dst_dir.display()))?;

    let mut files_copied = 0usize;
    for entry in std::fs::read_dir(&src_dir).with_context(|| format!("read {}", src_dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let to = dst_dir.join(entry.file_name());
        std::fs::copy(&path, &to)
            .with_context(|| format!("copy {} -> {}", path.display(), to.display()))?;
        files_copied += 1;
    }
    info!(
        source = %src.tag,
        from = %src_dir.display(),
        to = %dst_dir.display(),
        files_copied,
        "curves layout normalized"
    );

    Ok(Some(NormalizeResult {
        source_tag: src.tag.clone(),
        curves_dir: dst_dir,
        files_copied,
        index_copied,
        index_missing,
    }))
}
