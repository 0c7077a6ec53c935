use crate::outcome::Season;

pub const COL_DATE: &str = "Date";
pub const COL_DATE_LEGACY: &str = "date";
pub const COL_HOME: &str = "HomeTeam_norm";
pub const COL_AWAY: &str = "AwayTeam_norm";
pub const COL_PROFIT: &str = "net_profit";
pub const COL_PROFIT_LEGACY: &str = "profit";

/// First present column wins.
pub const TRUE_LABEL_COLUMNS: [&str; 4] = ["y_true_model", "y_true", "true_result_model", "true_result"];
pub const MODEL_LABEL_COLUMNS: [&str; 4] = ["y_pred_model", "y_pred", "Pred", "predicted_result"];
pub const MARKET_LABEL_COLUMNS: [&str; 3] = ["y_pred_market", "bet365_pred", "y_pred_b365"];

pub const CURVE_HEADER: [&str; 11] = [
    "match_num",
    "date",
    "model_cum",
    "bet365_cum",
    "model_ret",
    "bet365_ret",
    "home",
    "away",
    "true_txt",
    "model_txt",
    "bet365_txt",
];

pub const INDEX_HEADER: [&str; 9] = [
    "test_season",
    "train_until",
    "n_matches",
    "profit_model",
    "profit_bet365",
    "roi_model",
    "roi_bet365",
    "csv_file",
    "json_file",
];

pub const DATE_FORMAT_OUT: &str = "%Y-%m-%d";

pub fn curve_csv_name(season: Season) -> String {
    format!("cumprofit_{season}.csv")
}

pub fn curve_json_name(season: Season) -> String {
    format!("cumprofit_{season}.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_header_is_frozen() {
        assert_eq!(
            CURVE_HEADER.join(","),
            "match_num,date,model_cum,bet365_cum,model_ret,bet365_ret,home,away,true_txt,model_txt,bet365_txt"
        );
    }

    #[test]
    fn index_header_is_frozen() {
        assert_eq!(
            INDEX_HEADER.join(","),
            "test_season,train_until,n_matches,profit_model,profit_bet365,roi_model,roi_bet365,csv_file,json_file"
        );
    }

    #[test]
    fn curve_names_embed_season() {
        assert_eq!(curve_csv_name(2021), "cumprofit_2021.csv");
        assert_eq!(curve_json_name(2021), "cumprofit_2021.json");
    }
}
