use crate::models::stock::Thresholds;
use crate::services::refresh_service::{RefreshReport, RefreshService, RefreshState};
use crate::watchlist::WatchlistStore;
use chrono::Utc;
use log::{debug, info, warn};
use std::future::Future;
use std::time::Duration;

/// 定时刷新循环：到期时重新加载自选列表并执行一次刷新周期
pub struct RefreshScheduler<'a> {
    service: &'a RefreshService,
    store: &'a WatchlistStore,
    interval: Duration,
    poll_interval: Duration,
    max_cycles: Option<usize>,
}

impl<'a> RefreshScheduler<'a> {
    pub fn new(service: &'a RefreshService, store: &'a WatchlistStore, interval: Duration) -> Self {
        Self {
            service,
            store,
            interval,
            poll_interval: Duration::from_secs(1),
            max_cycles: None,
        }
    }

    /// 检查自选列表文件是否变化的频率
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_max_cycles(mut self, cycles: usize) -> Self {
        self.max_cycles = Some(cycles);
        self
    }

    /// Runs until `shutdown` resolves or `max_cycles` refreshes have completed.
    ///
    /// The watchlist is re-read on every poll; an edit forces an immediate
    /// refresh instead of waiting for the interval. Returns the number of
    /// completed cycles.
    pub async fn run<S, F>(
        &self,
        state: &mut RefreshState,
        thresholds: &Thresholds,
        shutdown: S,
        mut on_cycle: F,
    ) -> usize
    where
        S: Future<Output = ()>,
        F: FnMut(&RefreshReport, &RefreshState),
    {
        tokio::pin!(shutdown);

        let mut cycles = 0;
        let mut symbols: Option<Vec<String>> = None;

        loop {
            if self.max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }

            let now = Utc::now();

            match self.store.load() {
                Ok(loaded) => {
                    if symbols.as_ref().is_some_and(|previous| *previous != loaded) {
                        info!("Watchlist changed, forcing refresh");
                        state.force_refresh(now);
                    }
                    symbols = Some(loaded);
                }
                // 读取失败时继续使用上一次的列表
                Err(e) => warn!("Failed to reload watchlist from {}: {}", self.store.path().display(), e),
            }

            if state.is_due(now) {
                let current = symbols.as_deref().unwrap_or_default();
                let report = self.service.run_cycle(current, thresholds).await;
                state.record_refresh(Utc::now(), self.interval);
                on_cycle(&report, state);

                cycles += 1;
                if self.max_cycles.is_some_and(|max| cycles >= max) {
                    break;
                }
            }

            let wait = state.time_until_due(Utc::now()).min(self.poll_interval);
            debug!("Next refresh check in {:?}", wait);

            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested after {} refresh cycles", cycles);
                    break;
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        cycles
    }
}
