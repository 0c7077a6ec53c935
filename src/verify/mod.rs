//! Post-run completeness gate for the outputs tree.
//!
//! Checks run in a fixed order and stop at the first fatal one. Each check
//! reports every offending artifact it found before the run halts, so one
//! pass gives the operator the full list for that stage. Optional artifacts
//! only warn. The tree is never modified.

pub mod features;
pub mod probe;
pub mod seasons;
pub mod verdict;

use std::path::Path;

use tracing::{info, warn};

use crate::config::{SeasonGroupConfig, VerifyConfig, SEASON_PLACEHOLDER};
use crate::verify::probe::{probe_variants, Probe};
use crate::verify::seasons::{discover_seasons, SeasonDiscovery};
use crate::verify::verdict::{CheckRecord, CheckStatus, Verdict};

pub const CHECK_OUTPUTS_DIR: &str = "outputs dir";
pub const CHECK_REQUIRED_FILES: &str = "required files";
pub const CHECK_REQUIRED_DIRS: &str = "required dirs";
pub const CHECK_COMPARISONS: &str = "comparison files";
pub const CHECK_FEATURE_SCHEMA: &str = "feature snapshot schema";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Check {
    OutputsDir,
    RequiredFiles,
    RequiredDirs,
    SeasonGroup(usize),
    Comparisons,
    FeatureSchema,
}

impl Check {
    pub fn name(self, cfg: &VerifyConfig) -> String {
        match self {
            Check::OutputsDir => CHECK_OUTPUTS_DIR.to_string(),
            Check::RequiredFiles => CHECK_REQUIRED_FILES.to_string(),
            Check::RequiredDirs => CHECK_REQUIRED_DIRS.to_string(),
            Check::SeasonGroup(i) => cfg
                .season_groups
                .get(i)
                .map(|g| g.name.clone())
                .unwrap_or_else(|| format!("season group #{i}")),
            Check::Comparisons => CHECK_COMPARISONS.to_string(),
            Check::FeatureSchema => CHECK_FEATURE_SCHEMA.to_string(),
        }
    }
}

/// The fixed check order for a config.
pub fn plan(cfg: &VerifyConfig) -> Vec<Check> {
    let mut out = vec![Check::OutputsDir, Check::RequiredFiles, Check::RequiredDirs];
    out.extend((0..cfg.season_groups.len()).map(Check::SeasonGroup));
    out.push(Check::Comparisons);
    out.push(Check::FeatureSchema);
    out
}

pub fn verify_outputs(outputs_dir: &Path, cfg: &VerifyConfig) -> Verdict {
    let mut verdict = Verdict::new(outputs_dir.to_path_buf());
    let mut halted = false;
    for check in plan(cfg) {
        let name = check.name(cfg);
        if halted {
            verdict.skip(name);
            continue;
        }
        let rec = run_check(check, &name, outputs_dir, cfg);
        let status = verdict.record(rec);
        match status {
            CheckStatus::Failed => {
                warn!(check = %name, status = status.as_str(), "fatal check failed; halting");
                halted = true;
            }
            CheckStatus::Warned => warn!(check = %name, status = status.as_str(), "check finished"),
            CheckStatus::Passed | CheckStatus::Pending => {
                info!(check = %name, status = status.as_str(), "check finished")
            }
        }
    }
    verdict.finish()
}

fn run_check(check: Check, name: &str, outputs_dir: &Path, cfg: &VerifyConfig) -> CheckRecord {
    let mut rec = CheckRecord::new(name);
    match check {
        Check::OutputsDir => check_outputs_dir(outputs_dir, &mut rec),
        Check::RequiredFiles => check_files(outputs_dir, &cfg.required_files, "required files", &mut rec),
        Check::RequiredDirs => check_nonempty_dirs(outputs_dir, &cfg.required_dirs, &mut rec),
        Check::SeasonGroup(i) => match cfg.season_groups.get(i) {
            Some(group) => check_season_group(outputs_dir, group, &mut rec),
            None => rec.fail(format!("unknown season group #{i}"), Vec::new()),
        },
        Check::Comparisons => {
            check_files(outputs_dir, &cfg.comparison_files, "per-season comparisons", &mut rec)
        }
        Check::FeatureSchema => check_feature_schema(outputs_dir, cfg, &mut rec),
    }
    rec
}

fn check_outputs_dir(outputs_dir: &Path, rec: &mut CheckRecord) {
    if outputs_dir.is_dir() {
        rec.pass(format!("{} exists", outputs_dir.display()));
    } else {
        rec.fail(
            format!("{} does not exist", outputs_dir.display()),
            vec![outputs_dir.display().to_string()],
        );
    }
}

/// All listed files must exist; every absence is reported.
fn check_files(outputs_dir: &Path, files: &[String], what: &str, rec: &mut CheckRecord) {
    let missing: Vec<String> = files
        .iter()
        .filter(|f| !outputs_dir.join(f.as_str()).is_file())
        .cloned()
        .collect();
    if missing.is_empty() {
        rec.pass(format!("{what} present ({})", files.len()));
    } else {
        rec.fail(format!("{} of {} {what} missing", missing.len(), files.len()), missing);
    }
}

fn check_nonempty_dirs(outputs_dir: &Path, dirs: &[String], rec: &mut CheckRecord) {
    let mut missing: Vec<String> = Vec::new();
    for d in dirs {
        let path = outputs_dir.join(d);
        if !path.is_dir() {
            missing.push(format!("{d}/"));
            continue;
        }
        match std::fs::read_dir(&path) {
            Ok(mut entries) => {
                if entries.next().is_none() {
                    missing.push(format!("{d}/ (empty)"));
                }
            }
            Err(e) => missing.push(format!("{d}/ (unreadable: {e})")),
        }
    }
    if missing.is_empty() {
        rec.pass(format!("required directories present and non-empty ({})", dirs.len()));
    } else {
        rec.fail("required directories missing or empty", missing);
    }
}

/// Files a season group expects in `dir`, reported as `<label>/<file>`.
fn missing_season_files(
    label: &str,
    dir: &Path,
    seasons: &SeasonDiscovery,
    group: &SeasonGroupConfig,
) -> Vec<String> {
    let mut missing = Vec::new();
    for season in &seasons.seasons {
        for template in &group.files {
            let file = template.replace(SEASON_PLACEHOLDER, &season.to_string());
            if !dir.join(&file).is_file() {
                missing.push(format!("{label}/{file}"));
            }
        }
    }
    missing
}

fn check_season_group(outputs_dir: &Path, group: &SeasonGroupConfig, rec: &mut CheckRecord) {
    let found = discover_seasons(outputs_dir, group);
    for e in &found.errors {
        rec.warn(format!("season source unreadable: {e}"));
    }
    if found.is_empty() {
        rec.warn(format!(
            "no seasons inferred for {}; strict per-season check skipped",
            group.name
        ));
        return;
    }
    let seasons = found.list();
    let origin = found.origin();

    let mut satisfied: Vec<String> = Vec::new();
    let mut missing: Vec<String> = Vec::new();
    for d in &group.required_dirs {
        let dir = outputs_dir.join(d);
        if !dir.is_dir() {
            missing.push(format!("{d}/"));
            continue;
        }
        let misses = missing_season_files(d, &dir, &found, group);
        if misses.is_empty() {
            satisfied.push(format!("{d}/"));
        }
        missing.extend(misses);
    }

    if !group.dirs.is_empty() {
        let probe = probe_variants(outputs_dir, &group.dirs, |variant, dir| {
            Some(missing_season_files(variant, dir, &found, group))
        });
        match probe {
            Probe::Complete(variant) => satisfied.push(format!("{variant}/")),
            Probe::Incomplete { problems, .. } => missing.extend(problems),
            Probe::Absent if group.required => {
                missing.extend(group.dirs.iter().map(|d| format!("{d}/")))
            }
            Probe::Absent => {
                rec.warn(format!(
                    "{}: none of [{}] exists; optional, skipped",
                    group.name,
                    group.dirs.join(", ")
                ));
                if group.required_dirs.is_empty() {
                    return;
                }
            }
        }
    }

    if missing.is_empty() {
        rec.pass(format!(
            "{} present in {} for seasons {seasons} ({origin})",
            group.name,
            satisfied.join(", ")
        ));
    } else {
        rec.fail(
            format!(
                "{}: {} file(s) missing for seasons {seasons} ({origin})",
                group.name,
                missing.len()
            ),
            missing,
        );
    }
}

fn check_feature_schema(outputs_dir: &Path, cfg: &VerifyConfig, rec: &mut CheckRecord) {
    let feat = &cfg.features;
    let probe = probe_variants(outputs_dir, &feat.dirs, |variant, dir| {
        features::inspect_feature_dir(variant, dir, feat)
    });
    match probe {
        Probe::Complete(variant) => rec.pass(format!("feature snapshots in {variant}/ meet the minimum schema")),
        Probe::Incomplete { variant, problems } => rec.fail(
            format!("{} feature snapshot(s) in {variant}/ violate the minimum schema", problems.len()),
            problems,
        ),
        Probe::Absent if feat.required => rec.fail(
            "no feature snapshot files found",
            feat.dirs.iter().map(|d| format!("{d}/{}*.{}", feat.prefix, feat.extension)).collect(),
        ),
        Probe::Absent => rec.warn(format!(
            "no feature snapshots under [{}]; optional, skipped",
            feat.dirs.join(", ")
        )),
    }
}

/// Human-readable diagnostics, one line per message or offending artifact.
pub fn render_lines(verdict: &Verdict) -> Vec<String> {
    let mut out = Vec::new();
    for c in &verdict.checks {
        match c.status {
            CheckStatus::Passed => out.extend(c.messages.iter().map(|m| format!("OK {m}"))),
            CheckStatus::Warned => out.extend(c.messages.iter().map(|m| format!("WARN {m}"))),
            CheckStatus::Failed => {
                out.extend(c.missing.iter().map(|m| format!("- {m}")));
                out.extend(c.messages.iter().map(|m| format!("FAIL {m}")));
            }
            CheckStatus::Pending => out.push(format!("SKIP {} (not attempted)", c.name)),
        }
    }
    if verdict.verified {
        out.push(format!("verified {}", verdict.outputs_dir.display()));
    } else {
        out.push(format!(
            "verification failed at: {}",
            verdict.halted_at.as_deref().unwrap_or("unknown")
        ));
    }
    out
}
