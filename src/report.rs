//! 结果展示：可排序的文本表格与 JSON 导出

use crate::config::EXPORT_FILE_NAME;
use crate::errors::{Result, WatchlistError};
use crate::models::stock::{MetricRecord, SymbolReport};
use log::info;
use std::cmp::Ordering;
use std::fs;
use std::path::Path;
use std::str::FromStr;

pub const EXPORT_MIME_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    Ticker,
    VolumeChange,
    PriceChange,
    CurrentVolume,
    CurrentPrice,
    HistoricalAvgVolume,
    PrevClosePrice,
}

impl FromStr for SortKey {
    type Err = WatchlistError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ticker" => Ok(SortKey::Ticker),
            "vol-chg" => Ok(SortKey::VolumeChange),
            "prc-chg" => Ok(SortKey::PriceChange),
            "cur-vol" => Ok(SortKey::CurrentVolume),
            "cur-prc" => Ok(SortKey::CurrentPrice),
            "avg-vol" => Ok(SortKey::HistoricalAvgVolume),
            "prev-prc" => Ok(SortKey::PrevClosePrice),
            other => Err(WatchlistError::ConfigError(format!("Unknown sort column: {}", other))),
        }
    }
}

fn compare(a: &MetricRecord, b: &MetricRecord, key: SortKey) -> Ordering {
    match key {
        SortKey::Ticker => a.symbol.cmp(&b.symbol),
        SortKey::VolumeChange => a.volume_change_pct.total_cmp(&b.volume_change_pct),
        SortKey::PriceChange => a.price_change_pct.total_cmp(&b.price_change_pct),
        SortKey::CurrentVolume => a.current_volume.cmp(&b.current_volume),
        SortKey::CurrentPrice => a.current_price.total_cmp(&b.current_price),
        SortKey::HistoricalAvgVolume => a.historical_avg_volume.total_cmp(&b.historical_avg_volume),
        SortKey::PrevClosePrice => a.prev_close_price.total_cmp(&b.prev_close_price),
    }
}

/// Orders reports for display. Successful rows are sorted by `key` (stable, so
/// ties keep watchlist order); failed rows follow in watchlist order.
pub fn sort_reports(reports: &[SymbolReport], key: Option<SortKey>, descending: bool) -> Vec<&SymbolReport> {
    let mut ok: Vec<&SymbolReport> = reports.iter().filter(|r| !r.is_failed()).collect();
    let failed = reports.iter().filter(|r| r.is_failed());

    if let Some(key) = key {
        ok.sort_by(|a, b| {
            let (Some(a), Some(b)) = (a.as_metrics(), b.as_metrics()) else {
                return Ordering::Equal;
            };
            let ordering = compare(a, b, key);
            if descending { ordering.reverse() } else { ordering }
        });
    }

    ok.into_iter().chain(failed).collect()
}

pub fn render_table(reports: &[&SymbolReport]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<10} {:>10} {:>10} {:>14} {:>10} {:>16} {:>10}  {}\n",
        "Ticker", "Vol Chg %", "Prc Chg %", "Cur Vol", "Cur Prc", "Hist Avg Vol", "Prev Prc", "Alerts"
    ));
    out.push_str(&format!("{:-<100}\n", ""));

    if reports.is_empty() {
        out.push_str("(watchlist is empty)\n");
        return out;
    }

    for report in reports {
        match report {
            SymbolReport::Metrics(r) => {
                let alerts = if r.alerts.is_empty() { "-".to_string() } else { r.alerts.join("; ") };
                out.push_str(&format!(
                    "{:<10} {:>10.2} {:>10.2} {:>14} {:>10.2} {:>16.2} {:>10.2}  {}\n",
                    r.symbol,
                    r.volume_change_pct,
                    r.price_change_pct,
                    r.current_volume,
                    r.current_price,
                    r.historical_avg_volume,
                    r.prev_close_price,
                    alerts
                ));
            }
            SymbolReport::Failed { symbol, error } => {
                out.push_str(&format!("{:<10} Error: {}\n", symbol, error));
            }
        }
    }

    out
}

/// 可下载的 JSON 导出内容
#[derive(Debug, Clone, PartialEq)]
pub struct JsonExport {
    pub file_name: &'static str,
    pub mime_type: &'static str,
    pub contents: String,
}

/// 仅导出成功的记录，两空格缩进
pub fn export_json(reports: &[SymbolReport]) -> Result<JsonExport> {
    let records: Vec<&MetricRecord> = reports.iter().filter_map(SymbolReport::as_metrics).collect();
    Ok(JsonExport {
        file_name: EXPORT_FILE_NAME,
        mime_type: EXPORT_MIME_TYPE,
        contents: serde_json::to_string_pretty(&records)?,
    })
}

/// 写入导出文件，`path` 通常来自 `Config::export_path`
pub fn write_export(export: &JsonExport, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() && !dir.exists() {
            fs::create_dir_all(dir)?;
        }
    }
    fs::write(path, &export.contents)?;
    info!("Exported {} ({}) to {}", export.file_name, export.mime_type, path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(symbol: &str, volume_change_pct: f64, price_change_pct: f64) -> SymbolReport {
        SymbolReport::Metrics(MetricRecord {
            symbol: symbol.to_string(),
            current_volume: 2000,
            historical_avg_volume: 1500.0,
            volume_change_pct,
            current_price: 110.0,
            prev_close_price: 100.0,
            price_change_pct,
            alerts: vec![],
        })
    }

    fn failed(symbol: &str) -> SymbolReport {
        SymbolReport::Failed { symbol: symbol.to_string(), error: "network down".to_string() }
    }

    fn symbols(reports: &[&SymbolReport]) -> Vec<String> {
        reports.iter().map(|r| r.symbol().to_string()).collect()
    }

    #[test]
    fn parses_sort_keys() {
        assert_eq!("VOL-CHG".parse::<SortKey>().unwrap(), SortKey::VolumeChange);
        assert_eq!("ticker".parse::<SortKey>().unwrap(), SortKey::Ticker);
        assert!("volume".parse::<SortKey>().is_err());
    }

    #[test]
    fn sorts_successful_rows_and_keeps_failures_last() {
        let reports = vec![failed("BAD"), record("MSFT", 5.0, -1.0), record("AAPL", 20.0, 3.0), record("IBM", -3.0, 3.0)];

        let sorted = sort_reports(&reports, Some(SortKey::VolumeChange), true);
        assert_eq!(symbols(&sorted), vec!["AAPL", "MSFT", "IBM", "BAD"]);

        let sorted = sort_reports(&reports, Some(SortKey::PriceChange), false);
        assert_eq!(symbols(&sorted), vec!["MSFT", "AAPL", "IBM", "BAD"]);

        let unsorted = sort_reports(&reports, None, false);
        assert_eq!(symbols(&unsorted), vec!["MSFT", "AAPL", "IBM", "BAD"]);
    }

    #[test]
    fn table_shows_rows_and_inline_errors() {
        let reports = vec![record("AAPL", 33.33, 10.0), failed("BAD")];
        let rows = sort_reports(&reports, None, false);
        let table = render_table(&rows);

        assert!(table.starts_with("Ticker"));
        assert!(table.contains("33.33"));
        assert!(table.contains("BAD        Error: network down"));
        assert!(render_table(&[]).contains("(watchlist is empty)"));
    }

    #[test]
    fn export_contains_only_successful_records() {
        let reports = vec![record("AAPL", 33.33, 10.0), failed("BAD")];
        let export = export_json(&reports).unwrap();

        assert_eq!(export.file_name, "stock_data.json");
        assert_eq!(export.mime_type, "application/json");
        assert!(export.contents.starts_with("[\n  {\n    \"symbol\": \"AAPL\""));

        let parsed: Vec<MetricRecord> = serde_json::from_str(&export.contents).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].volume_change_pct, 33.33);
        assert!(!export.contents.contains("BAD"));
    }

    #[test]
    fn writes_export_file_to_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let config = crate::config::Config::new().with_export_dir(dir.path().join("out").to_str().unwrap());
        let export = export_json(&[record("AAPL", 1.0, 1.0)]).unwrap();
        write_export(&export, &config.export_path()).unwrap();

        let written = fs::read_to_string(dir.path().join("out").join("stock_data.json")).unwrap();
        assert_eq!(written, export.contents);
    }
}
