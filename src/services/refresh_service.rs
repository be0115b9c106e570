use crate::config::Config;
use crate::metrics;
use crate::models::stock::{MetricRecord, SymbolReport, Thresholds};
use crate::scrapers::base::HistoryProvider;
use crate::errors::{Result, WatchlistError};
use crate::util;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;

/// 刷新计时状态，由会话持有并在每个刷新周期显式传入
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RefreshState {
    pub last_refreshed_at: Option<DateTime<Utc>>,
    pub next_refresh_due: Option<DateTime<Utc>>,
}

impl RefreshState {
    pub fn new() -> Self {
        Self::default()
    }

    /// A state that has never refreshed is always due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.next_refresh_due {
            Some(due) => now >= due,
            None => true,
        }
    }

    pub fn record_refresh(&mut self, now: DateTime<Utc>, interval: Duration) {
        let interval = chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::days(1));
        self.last_refreshed_at = Some(now);
        self.next_refresh_due = Some(now + interval);
    }

    /// 用户修改自选列表后立即触发刷新
    pub fn force_refresh(&mut self, now: DateTime<Utc>) {
        self.next_refresh_due = Some(now);
    }

    pub fn time_until_due(&self, now: DateTime<Utc>) -> Duration {
        self.next_refresh_due
            .and_then(|due| (due - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// `Last Refreshed: ...` 展示用，从未刷新时取 `now`
    pub fn last_refreshed_caption(&self, now: DateTime<Utc>) -> String {
        let instant = self.last_refreshed_at.unwrap_or(now);
        format!("Last Refreshed: {}", util::format_ist(&instant))
    }
}

/// Output of one refresh cycle, in watchlist order.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub refreshed_at: DateTime<Utc>,
    pub reports: Vec<SymbolReport>,
}

impl RefreshReport {
    pub fn records(&self) -> Vec<&MetricRecord> {
        self.reports.iter().filter_map(SymbolReport::as_metrics).collect()
    }

    pub fn failure_count(&self) -> usize {
        self.reports.iter().filter(|r| r.is_failed()).count()
    }

    pub fn alert_count(&self) -> usize {
        self.records().iter().map(|r| r.alerts.len()).sum()
    }
}

/// 刷新服务：逐个拉取自选股历史数据并计算指标
pub struct RefreshService {
    config: Config,
    provider: Arc<dyn HistoryProvider + Send + Sync>,
}

impl RefreshService {
    pub fn new(config: Config, provider: Arc<dyn HistoryProvider + Send + Sync>) -> Self {
        Self { config, provider }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 处理单个股票，数据源失败或超时都作为该股票的错误返回
    pub async fn process_symbol(&self, symbol: &str, thresholds: &Thresholds) -> Result<MetricRecord> {
        let seconds = self.config.request_timeout_secs;
        let fetch = self.provider.fetch_history(symbol, self.config.history_window_days);

        let bars = match tokio::time::timeout(Duration::from_secs(seconds), fetch).await {
            Ok(Ok(bars)) => bars,
            Ok(Err(WatchlistError::RequestError(e))) if e.is_timeout() => {
                return Err(WatchlistError::Timeout { symbol: symbol.to_string(), seconds });
            }
            Ok(Err(e @ WatchlistError::ProviderError { .. })) => return Err(e),
            Ok(Err(e)) => return Err(WatchlistError::provider(symbol, e.to_string())),
            Err(_) => return Err(WatchlistError::Timeout { symbol: symbol.to_string(), seconds }),
        };

        metrics::compute_metrics(symbol, &bars, thresholds)
    }

    /// Runs one refresh cycle over `symbols`. One symbol failing never aborts
    /// the others; duplicates are processed (and reported) once per occurrence.
    pub async fn run_cycle(&self, symbols: &[String], thresholds: &Thresholds) -> RefreshReport {
        info!("Refreshing {} symbols via {}", symbols.len(), self.provider.name());

        let mut reports = Vec::with_capacity(symbols.len());
        for symbol in symbols.iter().filter(|s| !s.is_empty()) {
            match self.process_symbol(symbol, thresholds).await {
                Ok(record) => {
                    if !record.alerts.is_empty() {
                        info!("{}: {}", symbol, record.alerts.join("; "));
                    }
                    reports.push(SymbolReport::Metrics(record));
                }
                Err(e) => {
                    warn!("Failed to refresh {}: {}", symbol, e);
                    reports.push(SymbolReport::Failed {
                        symbol: symbol.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = RefreshReport { refreshed_at: Utc::now(), reports };
        info!(
            "Refresh finished: {} ok, {} failed, {} alerts",
            report.reports.len() - report.failure_count(),
            report.failure_count(),
            report.alert_count()
        );
        report
    }
}
