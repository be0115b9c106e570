use serde::{Deserialize, Serialize};

/// 日线数据结构，`date` 为 YYYYMMDD 格式的整数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: i32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

/// 告警阈值（百分比），每个刷新周期由调用方传入，不做持久化
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub volume_change_pct: f64,
    pub price_change_pct: f64,
}

impl Thresholds {
    pub const DEFAULT_VOLUME_CHANGE_PCT: f64 = 10.0;
    pub const DEFAULT_PRICE_CHANGE_PCT: f64 = 5.0;

    pub fn new(volume_change_pct: f64, price_change_pct: f64) -> Self {
        Self {
            volume_change_pct,
            price_change_pct,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::new(Self::DEFAULT_VOLUME_CHANGE_PCT, Self::DEFAULT_PRICE_CHANGE_PCT)
    }
}

/// Metrics computed for one symbol in one refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub symbol: String,
    pub current_volume: i64,
    pub historical_avg_volume: f64,
    pub volume_change_pct: f64,
    pub current_price: f64,
    pub prev_close_price: f64,
    pub price_change_pct: f64,
    pub alerts: Vec<String>,
}

/// 单个股票在一次刷新中的结果：成功的指标或错误信息
#[derive(Debug, Clone, PartialEq)]
pub enum SymbolReport {
    Metrics(MetricRecord),
    Failed { symbol: String, error: String },
}

impl SymbolReport {
    pub fn symbol(&self) -> &str {
        match self {
            SymbolReport::Metrics(record) => &record.symbol,
            SymbolReport::Failed { symbol, .. } => symbol,
        }
    }

    pub fn as_metrics(&self) -> Option<&MetricRecord> {
        match self {
            SymbolReport::Metrics(record) => Some(record),
            SymbolReport::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SymbolReport::Failed { .. })
    }
}
