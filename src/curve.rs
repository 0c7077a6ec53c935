use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chrono::NaiveDate;
use serde::Serialize;

use crate::matchlog::parse_f64;
use crate::outcome::{OutcomeLabel, Season};
use crate::reconcile::{JoinSuffixes, ReconciledFixture, ReconciledTable};
use crate::schema::{
    curve_csv_name, curve_json_name, COL_PROFIT, CURVE_HEADER, DATE_FORMAT_OUT,
    MARKET_LABEL_COLUMNS, MODEL_LABEL_COLUMNS, TRUE_LABEL_COLUMNS,
};

/// Cumulative values are kept at full precision; rounding happens on write.
#[derive(Debug, Clone)]
pub struct CurvePoint {
    pub match_num: usize,
    pub date: NaiveDate,
    pub model_cum: f64,
    pub market_cum: f64,
    pub model_ret: f64,
    pub market_ret: f64,
    pub home: String,
    pub away: String,
    pub true_label: OutcomeLabel,
    pub model_label: OutcomeLabel,
    pub market_label: OutcomeLabel,
}

#[derive(Debug, Clone)]
pub struct SeasonCurve {
    pub season: Season,
    pub points: Vec<CurvePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeasonSummary {
    pub train_until: Season,
    pub test_season: Season,
    pub n_matches: usize,
    pub profit_model: f64,
    pub profit_market: f64,
    pub roi_model: f64,
    pub roi_market: f64,
}

impl SeasonSummary {
    pub fn from_totals(season: Season, n_matches: usize, profit_model: f64, profit_market: f64) -> Self {
        Self {
            train_until: season - 1,
            test_season: season,
            n_matches,
            profit_model,
            profit_market,
            roi_model: roi(profit_model, n_matches),
            roi_market: roi(profit_market, n_matches),
        }
    }
}

pub fn roi(profit: f64, n_matches: usize) -> f64 {
    if n_matches == 0 {
        0.0
    } else {
        profit / (n_matches as f64)
    }
}

/// Column positions resolved once per table.
struct CurveColumns {
    model_profit: Option<usize>,
    market_profit: Option<usize>,
    true_label: Option<usize>,
    model_label: Option<usize>,
    market_label: Option<usize>,
}

impl CurveColumns {
    fn resolve(table: &ReconciledTable, suffixes: JoinSuffixes<'_>) -> Self {
        Self {
            model_profit: table.side_column(COL_PROFIT, suffixes.model),
            market_profit: table.side_column(COL_PROFIT, suffixes.market),
            true_label: table.first_present(&TRUE_LABEL_COLUMNS),
            model_label: table.first_present(&MODEL_LABEL_COLUMNS),
            market_label: table.first_present(&MARKET_LABEL_COLUMNS),
        }
    }
}

fn profit_at(fixture: &ReconciledFixture, col: Option<usize>) -> f64 {
    col.and_then(|i| fixture.values.get(i))
        .and_then(|v| parse_f64(v))
        .unwrap_or(0.0)
}

fn label_at(fixture: &ReconciledFixture, col: Option<usize>) -> OutcomeLabel {
    col.and_then(|i| fixture.values.get(i))
        .map(|v| OutcomeLabel::normalize(v))
        .unwrap_or_default()
}

/// Builds the running profit curve for both sides. `None` for an empty table.
pub fn build_season_curve(
    season: Season,
    table: &ReconciledTable,
    suffixes: JoinSuffixes<'_>,
) -> Option<(SeasonCurve, SeasonSummary)> {
    if table.is_empty() {
        return None;
    }

    let cols = CurveColumns::resolve(table, suffixes);

    let mut model_cum = 0.0f64;
    let mut market_cum = 0.0f64;
    let mut points = Vec::with_capacity(table.len());
    for (i, f) in table.fixtures.iter().enumerate() {
        let model_ret = profit_at(f, cols.model_profit);
        let market_ret = profit_at(f, cols.market_profit);
        model_cum += model_ret;
        market_cum += market_ret;

        points.push(CurvePoint {
            match_num: i + 1,
            date: f.date,
            model_cum,
            market_cum,
            model_ret,
            market_ret,
            home: f.home_key.clone(),
            away: f.away_key.clone(),
            true_label: label_at(f, cols.true_label),
            model_label: label_at(f, cols.model_label),
            market_label: label_at(f, cols.market_label),
        });
    }

    let summary = SeasonSummary::from_totals(season, points.len(), model_cum, market_cum);
    Some((SeasonCurve { season, points }, summary))
}

/// Display rounding for emitted values.
pub fn round3(v: f64) -> f64 {
    let r = (v * 1000.0).round() / 1000.0;
    if r == 0.0 {
        0.0
    } else {
        r
    }
}

/// 3-dp display form; whole amounts keep one decimal (`-1.0`).
pub fn fmt_amount(v: f64) -> String {
    let r = round3(v);
    if r.fract() == 0.0 {
        format!("{r:.1}")
    } else {
        format!("{r}")
    }
}

pub fn write_curve_csv(out_dir: &Path, curve: &SeasonCurve) -> anyhow::Result<PathBuf> {
    let path = out_dir.join(curve_csv_name(curve.season));
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .with_context(|| format!("open {}", path.display()))?;

    wtr.write_record(CURVE_HEADER).context("write header")?;
    for p in &curve.points {
        wtr.write_record([
            p.match_num.to_string(),
            p.date.format(DATE_FORMAT_OUT).to_string(),
            fmt_amount(p.model_cum),
            fmt_amount(p.market_cum),
            fmt_amount(p.model_ret),
            fmt_amount(p.market_ret),
            p.home.clone(),
            p.away.clone(),
            p.true_label.to_string(),
            p.model_label.to_string(),
            p.market_label.to_string(),
        ])
        .context("write row")?;
    }

    wtr.flush()
        .with_context(|| format!("flush {}", path.display()))?;
    Ok(path)
}

#[derive(Debug, Serialize)]
struct CurvePayload<'a> {
    train_until: Season,
    test_season: Season,
    n_matches: usize,
    series: Vec<PointPayload<'a>>,
    #[serde(rename = "final")]
    totals: TotalsPayload,
}

#[derive(Debug, Serialize)]
struct PointPayload<'a> {
    i: usize,
    d: String,
    m: f64,
    b: f64,
    hm: &'a str,
    aw: &'a str,
    t: &'a OutcomeLabel,
    pm: &'a OutcomeLabel,
    pb: &'a OutcomeLabel,
}

#[derive(Debug, Serialize)]
struct TotalsPayload {
    model: f64,
    bet365: f64,
    roi_model: f64,
    roi_bet365: f64,
}

pub fn write_curve_json(
    out_dir: &Path,
    curve: &SeasonCurve,
    summary: &SeasonSummary,
) -> anyhow::Result<PathBuf> {
    let path = out_dir.join(curve_json_name(curve.season));
    let payload = CurvePayload {
        train_until: summary.train_until,
        test_season: summary.test_season,
        n_matches: summary.n_matches,
        series: curve
            .points
            .iter()
            .map(|p| PointPayload {
                i: p.match_num,
                d: p.date.format(DATE_FORMAT_OUT).to_string(),
                m: round3(p.model_cum),
                b: round3(p.market_cum),
                hm: &p.home,
                aw: &p.away,
                t: &p.true_label,
                pm: &p.model_label,
                pb: &p.market_label,
            })
            .collect(),
        totals: TotalsPayload {
            model: summary.profit_model,
            bet365: summary.profit_market,
            roi_model: summary.roi_model,
            roi_bet365: summary.roi_market,
        },
    };

    let json = serde_json::to_vec(&payload)
        .with_context(|| format!("serialize {}", path.display()))?;
    std::fs::write(&path, json).with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::ReconcileStats;

    fn fixture(day: u32, home: &str, values: &[&str]) -> ReconciledFixture {
        ReconciledFixture {
            date: NaiveDate::from_ymd_opt(2021, 8, day).unwrap(),
            home_key: home.to_string(),
            away_key: format!("{home}_away"),
            values: values.iter().map(|v| v.to_string()).collect(),
        }
    }

    fn table(columns: &[&str], fixtures: Vec<ReconciledFixture>) -> ReconciledTable {
        ReconciledTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            fixtures,
            stats: ReconcileStats::default(),
        }
    }

    #[test]
    fn cumulative_matches_prefix_sums() {
        let t = table(
            &["net_profit_model", "net_profit_b365"],
            vec![
                fixture(1, "a", &["0.1", "-1"]),
                fixture(2, "b", &["0.2", "0.7"]),
                fixture(3, "c", &["0.3", "-1"]),
                fixture(4, "d", &["-1", "2.15"]),
            ],
        );
        let (curve, summary) = build_season_curve(2021, &t, JoinSuffixes::default()).expect("curve");
        let mut model_sum = 0.0;
        let mut market_sum = 0.0;
        for p in &curve.points {
            model_sum += p.model_ret;
            market_sum += p.market_ret;
            assert_eq!(p.model_cum, model_sum);
            assert_eq!(p.market_cum, market_sum);
        }
        assert_eq!(summary.n_matches, 4);
        assert_eq!(summary.train_until, 2020);
        assert_eq!(summary.profit_model, model_sum);
        assert_eq!(summary.roi_model, model_sum / 4.0);
        assert_eq!(
            curve.points.iter().map(|p| p.match_num).collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }

    #[test]
    fn unresolvable_profit_contributes_zero() {
        let t = table(
            &["net_profit_model", "net_profit_b365"],
            vec![fixture(1, "a", &["", "n/a"]), fixture(2, "b", &["1.5", "0.5"])],
        );
        let (curve, summary) = build_season_curve(2021, &t, JoinSuffixes::default()).expect("curve");
        assert_eq!(curve.points.len(), 2);
        assert_eq!(curve.points[0].model_ret, 0.0);
        assert_eq!(curve.points[0].market_ret, 0.0);
        assert_eq!(summary.profit_model, 1.5);
        assert_eq!(summary.profit_market, 0.5);
    }

    #[test]
    fn missing_profit_columns_yield_flat_curve() {
        let t = table(&["y_pred"], vec![fixture(1, "a", &["H"])]);
        let (curve, summary) = build_season_curve(2021, &t, JoinSuffixes::default()).expect("curve");
        assert_eq!(curve.points[0].model_cum, 0.0);
        assert_eq!(summary.roi_market, 0.0);
    }

    #[test]
    fn labels_follow_priority_lists() {
        let t = table(
            &["y_true", "true_result_model", "Pred", "y_pred_b365", "bet365_pred"],
            vec![fixture(1, "a", &["H", "A", "2", "0", "D"])],
        );
        let (curve, _) = build_season_curve(2021, &t, JoinSuffixes::default()).expect("curve");
        let p = &curve.points[0];
        assert_eq!(p.true_label.as_str(), "Home");
        assert_eq!(p.model_label.as_str(), "Away");
        assert_eq!(p.market_label.as_str(), "Draw");
    }

    #[test]
    fn absent_labels_are_empty_and_unknown_codes_pass_through() {
        let t = table(&["y_pred_model"], vec![fixture(1, "a", &["maybe"])]);
        let (curve, _) = build_season_curve(2021, &t, JoinSuffixes::default()).expect("curve");
        let p = &curve.points[0];
        assert_eq!(p.true_label.as_str(), "");
        assert_eq!(p.model_label.as_str(), "maybe");
        assert_eq!(p.market_label.as_str(), "");
    }

    #[test]
    fn empty_table_builds_nothing() {
        let t = table(&["net_profit_model"], Vec::new());
        assert!(build_season_curve(2021, &t, JoinSuffixes::default()).is_none());
    }

    #[test]
    fn roi_never_divides_by_zero() {
        assert_eq!(roi(5.0, 0), 0.0);
        assert_eq!(roi(-3.0, 4), -0.75);
        let s = SeasonSummary::from_totals(2020, 0, 0.0, 0.0);
        assert_eq!(s.roi_model, 0.0);
        assert_eq!(s.roi_market, 0.0);
    }

    #[test]
    fn rounding_is_display_only() {
        assert_eq!(round3(0.12345), 0.123);
        assert_eq!(round3(-0.0004), 0.0);
        assert_eq!(fmt_amount(-1.0), "-1.0");
        assert_eq!(fmt_amount(0.91), "0.91");
        assert_eq!(fmt_amount(1.23456), "1.235");
    }

    #[test]
    fn json_labels_serialize_as_plain_strings() {
        let dir = std::env::temp_dir().join(format!(
            "cumprofit_curve_json_{}_{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("create tmp dir");

        let t = table(
            &["y_true", "y_pred_model", "y_pred_b365"],
            vec![fixture(1, "a", &["1", "maybe", "D"])],
        );
        let (curve, summary) = build_season_curve(2021, &t, JoinSuffixes::default()).expect("curve");
        let path = write_curve_json(&dir, &curve, &summary).expect("write");
        let json: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).expect("read")).expect("json");
        let point = &json["series"][0];
        assert_eq!(point["t"], "Home");
        assert_eq!(point["pm"], "maybe");
        assert_eq!(point["pb"], "Draw");

        let _ = std::fs::remove_dir_all(&dir);
    }
}
