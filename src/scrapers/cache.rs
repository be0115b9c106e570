use crate::models::stock::Bar;
use crate::errors::Result;
use crate::scrapers::base::HistoryProvider;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

type CacheKey = (String, u32);

/// 带过期时间的历史数据缓存，按 (代码, 窗口天数) 记忆成功的结果
pub struct CachedProvider {
    inner: Arc<dyn HistoryProvider + Send + Sync>,
    ttl: Duration,
    entries: Mutex<HashMap<CacheKey, (Instant, Vec<Bar>)>>,
}

impl CachedProvider {
    pub fn new(inner: Arc<dyn HistoryProvider + Send + Sync>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lookup(&self, key: &CacheKey) -> Option<Vec<Bar>> {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match entries.get(key) {
            Some((stored_at, bars)) if stored_at.elapsed() < self.ttl => Some(bars.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn store(&self, key: CacheKey, bars: &[Bar]) {
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.insert(key, (Instant::now(), bars.to_vec()));
    }

    /// 清空所有缓存
    pub fn invalidate(&self) {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clear();
    }
}

#[async_trait]
impl HistoryProvider for CachedProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn fetch_history(&self, symbol: &str, window_days: u32) -> Result<Vec<Bar>> {
        let key = (symbol.to_string(), window_days);
        if let Some(bars) = self.lookup(&key) {
            debug!("Cache hit for {} ({}d)", symbol, window_days);
            return Ok(bars);
        }

        // 失败结果不缓存
        let bars = self.inner.fetch_history(symbol, window_days).await?;
        self.store(key, &bars);
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::WatchlistError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl HistoryProvider for CountingProvider {
        fn name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_history(&self, symbol: &str, _window_days: u32) -> Result<Vec<Bar>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(WatchlistError::provider(symbol, "boom"));
            }
            Ok(vec![Bar { date: 20240102, open: 1.0, high: 1.0, low: 1.0, close: 1.0, volume: 10 }])
        }
    }

    fn counting(fail: bool) -> Arc<CountingProvider> {
        Arc::new(CountingProvider { calls: AtomicUsize::new(0), fail })
    }

    #[tokio::test]
    async fn serves_repeat_requests_from_cache_within_ttl() {
        let inner = counting(false);
        let cached = CachedProvider::new(inner.clone(), Duration::from_secs(60));

        cached.fetch_history("AAPL", 60).await.unwrap();
        cached.fetch_history("AAPL", 60).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);

        // 不同窗口是不同的键
        cached.fetch_history("AAPL", 30).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);

        cached.invalidate();
        cached.fetch_history("AAPL", 60).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn expired_entries_are_refetched() {
        let inner = counting(false);
        let cached = CachedProvider::new(inner.clone(), Duration::ZERO);

        cached.fetch_history("MSFT", 60).await.unwrap();
        cached.fetch_history("MSFT", 60).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let inner = counting(true);
        let cached = CachedProvider::new(inner.clone(), Duration::from_secs(60));

        assert!(cached.fetch_history("BAD", 60).await.is_err());
        assert!(cached.fetch_history("BAD", 60).await.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
