//! 指标计算：成交量变化、价格变化与阈值告警

use crate::errors::{Result, WatchlistError};
use crate::models::stock::{Bar, MetricRecord, Thresholds};
use crate::util::round2;

/// Computes the metric record for `symbol` over a window of daily bars.
///
/// The historical average volume covers every bar in the window, the latest
/// one included. Percentages are rounded to two decimals before the alert
/// comparison, so an alert fires only when the displayed value strictly
/// exceeds its threshold.
pub fn compute_metrics(symbol: &str, bars: &[Bar], thresholds: &Thresholds) -> Result<MetricRecord> {
    if bars.len() < 2 {
        return Err(WatchlistError::InsufficientData {
            symbol: symbol.to_string(),
            bars: bars.len(),
        });
    }

    // 按日期升序，稳定排序保证同日数据保持原有顺序
    let mut ordered: Vec<&Bar> = bars.iter().collect();
    ordered.sort_by_key(|bar| bar.date);

    let last = ordered[ordered.len() - 1];
    let prev = ordered[ordered.len() - 2];

    let current_volume = last.volume;
    let historical_avg_volume =
        ordered.iter().map(|bar| bar.volume as f64).sum::<f64>() / ordered.len() as f64;
    if historical_avg_volume == 0.0 {
        return Err(WatchlistError::DataError(format!(
            "{}: historical average volume is zero",
            symbol
        )));
    }

    let current_price = last.close;
    let prev_close_price = prev.close;
    if prev_close_price == 0.0 {
        return Err(WatchlistError::DataError(format!(
            "{}: previous close price is zero",
            symbol
        )));
    }

    let volume_change_pct =
        round2((current_volume as f64 - historical_avg_volume) / historical_avg_volume * 100.0);
    let price_change_pct = round2((current_price - prev_close_price) / prev_close_price * 100.0);

    Ok(MetricRecord {
        symbol: symbol.to_string(),
        current_volume,
        historical_avg_volume,
        volume_change_pct,
        current_price,
        prev_close_price,
        price_change_pct,
        alerts: evaluate_alerts(volume_change_pct, price_change_pct, thresholds),
    })
}

/// 成交量告警在前，价格告警在后；恰好等于阈值不告警
pub fn evaluate_alerts(volume_change_pct: f64, price_change_pct: f64, thresholds: &Thresholds) -> Vec<String> {
    let mut alerts = Vec::new();

    if volume_change_pct.abs() > thresholds.volume_change_pct {
        alerts.push(format!(
            "Volume change {:.2}% exceeds ±{:.2}% threshold",
            volume_change_pct, thresholds.volume_change_pct
        ));
    }

    if price_change_pct.abs() > thresholds.price_change_pct {
        alerts.push(format!(
            "Price change {:.2}% exceeds ±{:.2}% threshold",
            price_change_pct, thresholds.price_change_pct
        ));
    }

    alerts
}
