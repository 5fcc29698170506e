use chrono::{DateTime, Utc};

use crate::models::AlertRecord;

/// Column order of the periodic alert report.
pub const REPORT_COLUMNS: [&str; 6] = [
    "bet_size",
    "username",
    "token_id",
    "token_outcome_name",
    "market",
    "timestamp",
];

// Spreadsheet apps only detect UTF-8 CSV with a byte-order mark
const UTF8_BOM: &str = "\u{feff}";

/// CSV body for the alerts of one roll-up period, one row per alert.
pub fn alerts_csv(alerts: &[AlertRecord]) -> String {
    let mut out = String::from(UTF8_BOM);
    out.push_str(&REPORT_COLUMNS.join(","));
    out.push('\n');

    for alert in alerts {
        let row = [
            alert.usd_amount.round_dp(2).to_string(),
            alert.display_name.clone(),
            alert.token_id.clone().unwrap_or_default(),
            alert.outcome_label.clone(),
            alert.market_title.clone(),
            alert.dispatched_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ];
        let fields: Vec<String> = row.iter().map(|f| csv_field(f)).collect();
        out.push_str(&fields.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(raw: &str) -> String {
    if raw.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", raw.replace('"', "\"\""))
    } else {
        raw.to_string()
    }
}

pub fn report_filename(now: DateTime<Utc>) -> String {
    format!("polywatch_alerts_{}.csv", now.format("%Y%m%d_%H%M"))
}
