use crate::models::stock::Bar;
use crate::errors::{Result, WatchlistError};
use crate::scrapers::base::HistoryProvider;
use crate::util;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use log::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";

/// Yahoo Finance 日线历史数据抓取器
pub struct YahooScraper {
    client: Client,
    base_url: String,
    last_request: Mutex<Option<Instant>>,
}

impl YahooScraper {
    /// 创建抓取器，`timeout` 为单次请求超时
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(CHART_URL, timeout)
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(WatchlistError::RequestError)?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            last_request: Mutex::new(None),
        })
    }

    /// 等待请求频率限制
    async fn wait_for_rate_limit(&self) {
        const MIN_INTERVAL: Duration = Duration::from_millis(250);

        let now = Instant::now();
        let should_wait = {
            let mut last = match self.last_request.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let should_wait = last
                .map(|instant| instant.elapsed())
                .filter(|elapsed| *elapsed < MIN_INTERVAL)
                .map(|elapsed| MIN_INTERVAL - elapsed);
            *last = Some(now);
            should_wait
        };

        if let Some(wait_time) = should_wait {
            debug!("等待 {:?} 以遵守频率限制", wait_time);
            tokio::time::sleep(wait_time).await;
        }
    }
}

#[async_trait]
impl HistoryProvider for YahooScraper {
    fn name(&self) -> &'static str {
        "yahoo"
    }

    async fn fetch_history(&self, symbol: &str, window_days: u32) -> Result<Vec<Bar>> {
        debug!("获取股票 {} 最近 {} 天的日线数据", symbol, window_days);

        self.wait_for_rate_limit().await;

        let range = format!("{}d", window_days);
        let response = self.client
            .get(format!("{}/{}", self.base_url, symbol))
            .query(&[("range", range.as_str()), ("interval", "1d")])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        // Yahoo 对无效代码返回 404 但仍带有 chart.error 信息
        match parse_chart_response(symbol, &text) {
            Err(WatchlistError::JsonError(_)) if !status.is_success() => {
                Err(WatchlistError::provider(symbol, format!("HTTP status {}", status)))
            }
            result => result,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: Option<ChartMeta>,
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

/// Parses a v8 chart payload into ascending daily bars. Rows missing a close
/// or a volume are skipped; missing open/high/low fall back to the close.
pub fn parse_chart_response(symbol: &str, body: &str) -> Result<Vec<Bar>> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(error) = envelope.chart.error {
        let message = match (error.code, error.description) {
            (Some(code), Some(description)) => format!("{}: {}", code, description),
            (Some(code), None) => code,
            (None, Some(description)) => description,
            (None, None) => "unknown chart error".to_string(),
        };
        return Err(WatchlistError::provider(symbol, message));
    }

    let result = envelope
        .chart
        .result
        .and_then(|results| results.into_iter().next())
        .ok_or_else(|| WatchlistError::provider(symbol, "no chart data returned"))?;

    let gmt_offset = result.meta.and_then(|meta| meta.gmtoffset).unwrap_or_default();
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let close = quote.close.get(i).copied().flatten();
        let volume = quote.volume.get(i).copied().flatten();
        let (Some(close), Some(volume)) = (close, volume) else {
            continue;
        };

        bars.push(Bar {
            date: util::timestamp_to_date_int(*ts, gmt_offset)?,
            open: quote.open.get(i).copied().flatten().unwrap_or(close),
            high: quote.high.get(i).copied().flatten().unwrap_or(close),
            low: quote.low.get(i).copied().flatten().unwrap_or(close),
            close,
            volume,
        });
    }

    // 按日期升序排序
    bars.sort_by_key(|bar| bar.date);

    debug!("{}: 解析到 {} 条日线记录", symbol, bars.len());
    Ok(bars)
}
