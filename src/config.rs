use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

pub const SEASON_PLACEHOLDER: &str = "{season}";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub curves: CurvesConfig,
    #[serde(default)]
    pub verify: VerifyConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("read {}", path.display()))?;
        let cfg: Config =
            toml::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// `None` means the built-in layout.
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        fn check_nonempty(name: &str, v: &str) -> anyhow::Result<()> {
            if v.trim().is_empty() {
                anyhow::bail!("{name} must not be empty");
            }
            Ok(())
        }

        check_nonempty("curves.curves_dir", &self.curves.curves_dir)?;
        check_nonempty("curves.model_prefix", &self.curves.model_prefix)?;
        check_nonempty("curves.market_prefix", &self.curves.market_prefix)?;
        check_nonempty("curves.index_stem", &self.curves.index_stem)?;
        check_nonempty("curves.model_suffix", &self.curves.model_suffix)?;
        check_nonempty("curves.market_suffix", &self.curves.market_suffix)?;
        if self.curves.model_suffix == self.curves.market_suffix {
            anyhow::bail!(
                "curves.model_suffix and curves.market_suffix must differ, both are {:?}",
                self.curves.model_suffix
            );
        }

        for g in &self.verify.season_groups {
            check_nonempty("verify.season_groups.name", &g.name)?;
            if g.dirs.is_empty() && g.required_dirs.is_empty() {
                anyhow::bail!(
                    "verify.season_groups[{}] needs dirs (variants) or required_dirs",
                    g.name
                );
            }
            if g.files.is_empty() {
                anyhow::bail!("verify.season_groups[{}].files must not be empty", g.name);
            }
            for f in &g.files {
                if !f.contains(SEASON_PLACEHOLDER) {
                    anyhow::bail!(
                        "verify.season_groups[{}].files entry {f:?} lacks {SEASON_PLACEHOLDER}",
                        g.name
                    );
                }
            }
            for h in &g.filename_hints {
                check_nonempty("verify.season_groups.filename_hints.prefix", &h.prefix)?;
            }
        }

        let feat = &self.verify.features;
        if feat.dirs.is_empty() {
            anyhow::bail!("verify.features.dirs must list at least one variant");
        }
        check_nonempty("verify.features.extension", &feat.extension)?;
        if feat.metric_suffixes.is_empty() {
            anyhow::bail!("verify.features.metric_suffixes must not be empty");
        }

        for s in &self.layout.sources {
            check_nonempty("layout.sources.tag", &s.tag)?;
            check_nonempty("layout.sources.curves_dir", &s.curves_dir)?;
            if s.curves_dir == self.curves.curves_dir {
                anyhow::bail!(
                    "layout source {} must not point at the generic curves dir {}",
                    s.tag,
                    s.curves_dir
                );
            }
        }

        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_outputs_dir")]
    pub outputs_dir: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            outputs_dir: default_outputs_dir(),
        }
    }
}

fn default_outputs_dir() -> PathBuf {
    PathBuf::from("outputs")
}

#[derive(Clone, Debug, Deserialize)]
pub struct CurvesConfig {
    #[serde(default = "default_curves_dir")]
    pub curves_dir: String,
    #[serde(default = "default_model_prefix")]
    pub model_prefix: String,
    #[serde(default = "default_market_prefix")]
    pub market_prefix: String,
    /// Files under `model_prefix` whose name contains any of these are not model logs.
    #[serde(default = "default_skip_tokens")]
    pub skip_tokens: Vec<String>,
    #[serde(default = "default_index_stem")]
    pub index_stem: String,
    #[serde(default = "default_model_suffix")]
    pub model_suffix: String,
    #[serde(default = "default_market_suffix")]
    pub market_suffix: String,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl Default for CurvesConfig {
    fn default() -> Self {
        Self {
            curves_dir: default_curves_dir(),
            model_prefix: default_model_prefix(),
            market_prefix: default_market_prefix(),
            skip_tokens: default_skip_tokens(),
            index_stem: default_index_stem(),
            model_suffix: default_model_suffix(),
            market_suffix: default_market_suffix(),
            parallel: default_parallel(),
        }
    }
}

impl CurvesConfig {
    pub fn model_log_name(&self, season: i32) -> String {
        format!("{}{season}.csv", self.model_prefix)
    }

    pub fn market_log_name(&self, season: i32) -> String {
        format!("{}{season}.csv", self.market_prefix)
    }

    pub fn index_csv_name(&self) -> String {
        format!("{}.csv", self.index_stem)
    }

    pub fn index_json_name(&self) -> String {
        format!("{}.json", self.index_stem)
    }
}

fn default_curves_dir() -> String {
    "cumprofit_curves".to_string()
}

fn default_model_prefix() -> String {
    "matchlogs_".to_string()
}

fn default_market_prefix() -> String {
    "matchlogs_market_".to_string()
}

fn default_skip_tokens() -> Vec<String> {
    vec!["market".to_string(), "smote".to_string()]
}

fn default_index_stem() -> String {
    "cumprofit_index".to_string()
}

fn default_model_suffix() -> String {
    "_model".to_string()
}

fn default_market_suffix() -> String {
    "_b365".to_string()
}

fn default_parallel() -> bool {
    true
}

#[derive(Clone, Debug, Deserialize)]
pub struct VerifyConfig {
    #[serde(default = "default_required_files")]
    pub required_files: Vec<String>,
    #[serde(default = "default_required_dirs")]
    pub required_dirs: Vec<String>,
    #[serde(default = "default_season_groups")]
    pub season_groups: Vec<SeasonGroupConfig>,
    #[serde(default = "default_comparison_files")]
    pub comparison_files: Vec<String>,
    #[serde(default)]
    pub features: FeatureSchemaConfig,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            required_files: default_required_files(),
            required_dirs: default_required_dirs(),
            season_groups: default_season_groups(),
            comparison_files: default_comparison_files(),
            features: FeatureSchemaConfig::default(),
        }
    }
}

/// One logical per-season artifact kind. `dirs` are historical layout
/// variants probed in order; the first one holding every file for every
/// season satisfies the group. Each of `required_dirs` must hold every file
/// on its own, and misses across all of them are reported together.
#[derive(Clone, Debug, Deserialize)]
pub struct SeasonGroupConfig {
    pub name: String,
    #[serde(default)]
    pub dirs: Vec<String>,
    #[serde(default)]
    pub required_dirs: Vec<String>,
    pub files: Vec<String>,
    #[serde(default)]
    pub tables: Vec<SeasonTableConfig>,
    /// Consulted only when no table yields a season.
    #[serde(default)]
    pub filename_hints: Vec<FilenameHintConfig>,
    /// Missing every `dirs` variant is fatal when set, advisory otherwise.
    #[serde(default = "default_true")]
    pub required: bool,
}

/// An aggregate CSV whose `column` lists seasons. When `positive_column` is set
/// and parses to a number <= 0 on a row, that row's season is ignored.
#[derive(Clone, Debug, Deserialize)]
pub struct SeasonTableConfig {
    pub file: String,
    pub column: String,
    #[serde(default)]
    pub positive_column: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FilenameHintConfig {
    pub dir: String,
    pub prefix: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FeatureSchemaConfig {
    #[serde(default = "default_feature_dirs")]
    pub dirs: Vec<String>,
    #[serde(default = "default_feature_prefix")]
    pub prefix: String,
    #[serde(default = "default_feature_extension")]
    pub extension: String,
    /// Matched case-insensitively.
    #[serde(default = "default_feature_required_columns")]
    pub required_columns: Vec<String>,
    #[serde(default = "default_metric_suffixes")]
    pub metric_suffixes: Vec<String>,
    #[serde(default)]
    pub required: bool,
}

impl Default for FeatureSchemaConfig {
    fn default() -> Self {
        Self {
            dirs: default_feature_dirs(),
            prefix: default_feature_prefix(),
            extension: default_feature_extension(),
            required_columns: default_feature_required_columns(),
            metric_suffixes: default_metric_suffixes(),
            required: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

fn default_required_files() -> Vec<String> {
    strings(&[
        "confusion_grid_base.json",
        "confusion_grid_smote.json",
        "classification_grid_base.json",
        "classification_grid_smote.json",
        "classification_by_season_base.csv",
        "classification_by_season_smote.csv",
        "roc_grid_base.json",
        "roc_grid_smote.json",
        "roc_by_season_base.csv",
        "roc_by_season_smote.csv",
        "roi_by_season_base.json",
        "roi_by_season_base.csv",
        "roi_by_season_smote.json",
        "roi_by_season_smote.csv",
        "bet365_grid.json",
        "bet365_metrics_by_season.csv",
    ])
}

fn default_required_dirs() -> Vec<String> {
    strings(&["matchlogs_base", "matchlogs_smote", "bet365_matchlogs"])
}

fn default_comparison_files() -> Vec<String> {
    strings(&[
        "comparison_season_base_vs_bet365.csv",
        "comparison_season_base_vs_bet365.json",
    ])
}

fn classification_tables() -> Vec<SeasonTableConfig> {
    ["classification_by_season_base.csv", "classification_by_season_smote.csv"]
        .iter()
        .map(|f| SeasonTableConfig {
            file: f.to_string(),
            column: "Season".to_string(),
            positive_column: None,
        })
        .collect()
}

fn matchlog_files() -> Vec<String> {
    strings(&["matchlog_{season}.csv", "matchlog_{season}.json"])
}

fn default_season_groups() -> Vec<SeasonGroupConfig> {
    vec![
        SeasonGroupConfig {
            name: "model matchlogs".to_string(),
            dirs: Vec::new(),
            required_dirs: strings(&["matchlogs_base", "matchlogs_smote"]),
            files: matchlog_files(),
            tables: classification_tables(),
            filename_hints: ["matchlogs_base", "matchlogs_smote"]
                .iter()
                .map(|d| FilenameHintConfig {
                    dir: d.to_string(),
                    prefix: "matchlog_".to_string(),
                })
                .collect(),
            required: true,
        },
        SeasonGroupConfig {
            name: "cumprofit curves".to_string(),
            dirs: strings(&[
                "cumprofit_curves",
                "cumprofit_curves_base",
                "cumprofit_curves_smote",
            ]),
            required_dirs: Vec::new(),
            files: strings(&["cumprofit_{season}.csv", "cumprofit_{season}.json"]),
            tables: Vec::new(),
            filename_hints: ["cumprofit_curves", "cumprofit_curves_base", "cumprofit_curves_smote"]
                .iter()
                .map(|d| FilenameHintConfig {
                    dir: d.to_string(),
                    prefix: "cumprofit_".to_string(),
                })
                .collect(),
            required: false,
        },
        SeasonGroupConfig {
            name: "bet365 matchlogs".to_string(),
            dirs: strings(&["bet365_matchlogs"]),
            required_dirs: Vec::new(),
            files: matchlog_files(),
            tables: vec![SeasonTableConfig {
                file: "bet365_metrics_by_season.csv".to_string(),
                column: "test_season".to_string(),
                positive_column: Some("n_test".to_string()),
            }],
            filename_hints: vec![FilenameHintConfig {
                dir: "bet365_matchlogs".to_string(),
                prefix: "matchlog_".to_string(),
            }],
            required: true,
        },
    ]
}

fn default_feature_dirs() -> Vec<String> {
    strings(&["features_by_season", "feature_snapshots"])
}

fn default_feature_prefix() -> String {
    "features_".to_string()
}

fn default_feature_extension() -> String {
    "csv".to_string()
}

fn default_feature_required_columns() -> Vec<String> {
    strings(&["date", "hometeam_norm", "awayteam_norm"])
}

fn default_metric_suffixes() -> Vec<String> {
    strings(&["_z", "_zscore", "_norm"])
}

#[derive(Clone, Debug, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_layout_sources")]
    pub sources: Vec<LayoutSourceConfig>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            sources: default_layout_sources(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct LayoutSourceConfig {
    pub tag: String,
    pub curves_dir: String,
    pub index_stem: String,
}

fn default_layout_sources() -> Vec<LayoutSourceConfig> {
    ["base", "smote"]
        .iter()
        .map(|tag| LayoutSourceConfig {
            tag: tag.to_string(),
            curves_dir: format!("cumprofit_curves_{tag}"),
            index_stem: format!("cumprofit_index_{tag}"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_yields_defaults() {
        let cfg: Config = toml::from_str("").expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.run.outputs_dir, PathBuf::from("outputs"));
        assert_eq!(cfg.curves.model_log_name(2020), "matchlogs_2020.csv");
        assert_eq!(cfg.curves.market_log_name(2020), "matchlogs_market_2020.csv");
        assert_eq!(cfg.verify.required_files.len(), 16);
        assert_eq!(cfg.verify.season_groups.len(), 3);
        assert_eq!(
            cfg.verify.season_groups[0].required_dirs,
            vec!["matchlogs_base".to_string(), "matchlogs_smote".to_string()]
        );
        assert!(!cfg.verify.season_groups[1].required);
        assert_eq!(cfg.layout.sources[0].curves_dir, "cumprofit_curves_base");
    }

    #[test]
    fn example_config_matches_defaults() {
        let cfg: Config =
            toml::from_str(include_str!("../config.example.toml")).expect("parse example");
        cfg.validate().expect("valid");
        let def = Config::default();
        assert_eq!(cfg.verify.required_files, def.verify.required_files);
        assert_eq!(cfg.verify.season_groups.len(), def.verify.season_groups.len());
        for (a, b) in cfg.verify.season_groups.iter().zip(&def.verify.season_groups) {
            assert_eq!(a.name, b.name);
            assert_eq!(a.dirs, b.dirs);
            assert_eq!(a.required_dirs, b.required_dirs);
            assert_eq!(a.required, b.required);
            assert_eq!(a.tables.len(), b.tables.len());
        }
        assert_eq!(
            cfg.verify.season_groups[2].tables[0].positive_column.as_deref(),
            Some("n_test")
        );
        assert_eq!(cfg.layout.sources.len(), 2);
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let raw = r#"
[run]
outputs_dir = "out"

[curves]
parallel = false
"#;
        let cfg: Config = toml::from_str(raw).expect("parse");
        cfg.validate().expect("valid");
        assert_eq!(cfg.run.outputs_dir, PathBuf::from("out"));
        assert!(!cfg.curves.parallel);
        assert_eq!(cfg.curves.curves_dir, "cumprofit_curves");
    }

    #[test]
    fn template_without_placeholder_is_rejected() {
        let raw = r#"
[[verify.season_groups]]
name = "broken"
dirs = ["x"]
files = ["matchlog.csv"]
"#;
        let cfg: Config = toml::from_str(raw).expect("parse");
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("{season}"));
    }

    #[test]
    fn group_without_any_dir_is_rejected() {
        let raw = r#"
[[verify.season_groups]]
name = "nowhere"
files = ["matchlog_{season}.csv"]
"#;
        let cfg: Config = toml::from_str(raw).expect("parse");
        let err = cfg.validate().unwrap_err();
        assert!(format!("{err:#}").contains("required_dirs"));
    }

    #[test]
    fn identical_side_suffixes_are_rejected() {
        let raw = r#"
[curves]
model_suffix = "_x"
market_suffix = "_x"
"#;
        let cfg: Config = toml::from_str(raw).expect("parse");
        assert!(cfg.validate().is_err());
    }
}
