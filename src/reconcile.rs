use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::warn;

use crate::matchlog::{MatchLog, MatchRow};

/// Suffixes appended to a payload column present on both sides of the join.
#[derive(Debug, Clone, Copy)]
pub struct JoinSuffixes<'a> {
    pub model: &'a str,
    pub market: &'a str,
}

impl Default for JoinSuffixes<'static> {
    fn default() -> Self {
        Self {
            model: "_model",
            market: "_b365",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReconciledFixture {
    pub date: NaiveDate,
    pub home_key: String,
    pub away_key: String,
    /// Aligned with `ReconciledTable::columns`: model payload first, then market.
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub model_rows: usize,
    pub market_rows: usize,
    pub unkeyed_rows: usize,
    pub duplicate_rows: usize,
    pub matched: usize,
}

/// Inner join of a model log and a market log on (date, home key, away key),
/// one fixture per key, ordered by date with ties kept in model-file order.
#[derive(Debug, Clone)]
pub struct ReconciledTable {
    pub columns: Vec<String>,
    pub fixtures: Vec<ReconciledFixture>,
    pub stats: ReconcileStats,
}

impl ReconciledTable {
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Index of the first candidate present in the table.
    pub fn first_present(&self, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|c| self.column_index(c))
    }

    /// `base + suffix` when the join split the column, else the bare `base`.
    pub fn side_column(&self, base: &str, suffix: &str) -> Option<usize> {
        self.column_index(&format!("{base}{suffix}"))
            .or_else(|| self.column_index(base))
    }
}

type FixtureKey<'a> = (NaiveDate, &'a str, &'a str);

fn fixture_key(row: &MatchRow) -> Option<FixtureKey<'_>> {
    if !row.has_join_key() {
        return None;
    }
    Some((row.date?, row.home_key.as_str(), row.away_key.as_str()))
}

/// Last row per key; rows without a usable key are dropped.
fn last_row_per_key(log: &MatchLog) -> (HashMap<FixtureKey<'_>, usize>, usize, usize) {
    let mut by_key: HashMap<FixtureKey<'_>, usize> = HashMap::new();
    let mut unkeyed = 0usize;
    let mut duplicates = 0usize;
    for (idx, row) in log.rows.iter().enumerate() {
        let Some(key) = fixture_key(row) else {
            unkeyed += 1;
            continue;
        };
        if by_key.insert(key, idx).is_some() {
            duplicates += 1;
        }
    }
    (by_key, unkeyed, duplicates)
}

/// Returns `None` when no fixture appears on both sides.
pub fn reconcile(
    model: &MatchLog,
    market: &MatchLog,
    suffixes: JoinSuffixes<'_>,
) -> Option<ReconciledTable> {
    let model_payload: Vec<(usize, &str)> = model.payload_columns().collect();
    let market_payload: Vec<(usize, &str)> = market.payload_columns().collect();

    let model_names: HashSet<&str> = model_payload.iter().map(|(_, n)| *n).collect();
    let market_names: HashSet<&str> = market_payload.iter().map(|(_, n)| *n).collect();

    let mut columns: Vec<String> = Vec::with_capacity(model_payload.len() + market_payload.len());
    for (_, name) in &model_payload {
        if market_names.contains(name) {
            columns.push(format!("{name}{}", suffixes.model));
        } else {
            columns.push(name.to_string());
        }
    }
    for (_, name) in &market_payload {
        if model_names.contains(name) {
            columns.push(format!("{name}{}", suffixes.market));
        } else {
            columns.push(name.to_string());
        }
    }

    let (model_keys, model_unkeyed, model_dups) = last_row_per_key(model);
    let (market_keys, market_unkeyed, market_dups) = last_row_per_key(market);

    let mut stats = ReconcileStats {
        model_rows: model.len(),
        market_rows: market.len(),
        unkeyed_rows: model_unkeyed + market_unkeyed,
        duplicate_rows: model_dups + market_dups,
        matched: 0,
    };
    if stats.duplicate_rows > 0 {
        warn!(
            model_duplicates = model_dups,
            market_duplicates = market_dups,
            "duplicate fixture keys; keeping the last row per key"
        );
    }

    let mut fixtures: Vec<ReconciledFixture> = Vec::new();
    for (idx, row) in model.rows.iter().enumerate() {
        let Some(key) = fixture_key(row) else {
            continue;
        };
        if model_keys.get(&key) != Some(&idx) {
            continue;
        }
        let Some(&market_idx) = market_keys.get(&key) else {
            continue;
        };
        let market_row = &market.rows[market_idx];

        let mut values: Vec<String> = Vec::with_capacity(columns.len());
        values.extend(model_payload.iter().map(|(i, _)| row.values[*i].clone()));
        values.extend(market_payload.iter().map(|(i, _)| market_row.values[*i].clone()));

        fixtures.push(ReconciledFixture {
            date: key.0,
            home_key: row.home_key.clone(),
            away_key: row.away_key.clone(),
            values,
        });
    }

    if fixtures.is_empty() {
        return None;
    }

    fixtures.sort_by_key(|f| f.date);
    stats.matched = fixtures.len();

    Some(ReconciledTable {
        columns,
        fixtures,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matchlog::read_matchlog;

    fn log(name: &str, contents: &str) -> MatchLog {
        let mut p = std::env::temp_dir();
        p.push(format!(
            "cumprofit_reconcile_{name}_{}_{}.csv",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        std::fs::write(&p, contents).expect("write tmp csv");
        let log = read_matchlog(&p).expect("read");
        let _ = std::fs::remove_file(&p);
        log
    }

    const HEADER: &str = "Date,HomeTeam_norm,AwayTeam_norm,net_profit,y_pred\n";

    #[test]
    fn inner_join_keeps_only_shared_fixtures() {
        let model = log(
            "m",
            &format!("{HEADER}2021-08-14,a,b,0.91,H\n2021-08-15,c,d,-1.0,A\n"),
        );
        let market = log(
            "b",
            &format!("{HEADER}2021-08-14,a,b,-1.0,A\n2021-08-16,e,f,0.5,H\n"),
        );
        let t = reconcile(&model, &market, JoinSuffixes::default()).expect("overlap");
        assert_eq!(t.len(), 1);
        assert!(t.len() <= model.len().min(market.len()));
        assert_eq!(t.fixtures[0].home_key, "a");
        assert_eq!(
            t.columns,
            vec!["net_profit_model", "y_pred_model", "net_profit_b365", "y_pred_b365"]
        );
        assert_eq!(t.fixtures[0].values, vec!["0.91", "H", "-1.0", "A"]);
        assert_eq!(t.stats.matched, 1);
    }

    #[test]
    fn one_sided_columns_keep_their_names() {
        let model = log(
            "m1",
            "Date,HomeTeam_norm,AwayTeam_norm,net_profit,y_true\n2021-08-14,a,b,1,H\n",
        );
        let market = log(
            "b1",
            "Date,HomeTeam_norm,AwayTeam_norm,net_profit,bet365_pred\n2021-08-14,a,b,1,D\n",
        );
        let t = reconcile(&model, &market, JoinSuffixes::default()).expect("overlap");
        assert_eq!(t.column_index("y_true"), Some(1));
        assert_eq!(t.column_index("bet365_pred"), Some(3));
        assert_eq!(t.side_column("net_profit", "_model"), Some(0));
        assert_eq!(t.side_column("y_true", "_model"), Some(1));
    }

    #[test]
    fn empty_intersection_is_none() {
        let model = log("m2", &format!("{HEADER}2021-08-14,a,b,1,H\n"));
        let market = log("b2", &format!("{HEADER}2021-08-14,a,c,1,H\n"));
        assert!(reconcile(&model, &market, JoinSuffixes::default()).is_none());
    }

    #[test]
    fn duplicate_keys_do_not_double_count() {
        let model = log(
            "m3",
            &format!("{HEADER}2021-08-14,a,b,1,H\n2021-08-14,a,b,2,H\n"),
        );
        let market = log(
            "b3",
            &format!("{HEADER}2021-08-14,a,b,3,H\n2021-08-14,a,b,4,H\n"),
        );
        let t = reconcile(&model, &market, JoinSuffixes::default()).expect("overlap");
        assert_eq!(t.len(), 1);
        assert_eq!(t.fixtures[0].values[0], "2");
        assert_eq!(t.fixtures[0].values[2], "4");
        assert_eq!(t.stats.duplicate_rows, 2);
    }

    #[test]
    fn unparsable_dates_never_match() {
        let model = log("m4", &format!("{HEADER}garbage,a,b,1,H\n2021-08-14,c,d,1,H\n"));
        let market = log("b4", &format!("{HEADER}garbage,a,b,1,H\n2021-08-14,c,d,1,H\n"));
        let t = reconcile(&model, &market, JoinSuffixes::default()).expect("overlap");
        assert_eq!(t.len(), 1);
        assert_eq!(t.fixtures[0].home_key, "c");
        assert_eq!(t.stats.unkeyed_rows, 2);
    }

    #[test]
    fn output_is_date_ordered_and_stable() {
        let model = log(
            "m5",
            &format!(
                "{HEADER}2021-09-01,x,y,1,H\n2021-08-14,a,b,1,H\n2021-08-14,c,d,1,H\n"
            ),
        );
        let market = log(
            "b5",
            &format!(
                "{HEADER}2021-08-14,c,d,1,H\n2021-08-14,a,b,1,H\n2021-09-01,x,y,1,H\n"
            ),
        );
        let t = reconcile(&model, &market, JoinSuffixes::default()).expect("overlap");
        let homes: Vec<&str> = t.fixtures.iter().map(|f| f.home_key.as_str()).collect();
        assert_eq!(homes, vec!["a", "c", "x"]);
    }
}
