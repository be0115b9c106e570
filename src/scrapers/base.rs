use crate::models::stock::Bar;
use crate::errors::Result;
use async_trait::async_trait;

/// Source of daily price/volume history for a symbol
#[async_trait]
pub trait HistoryProvider {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Fetch the trailing `window_days` calendar days of daily bars,
    /// ordered by date ascending
    async fn fetch_history(&self, symbol: &str, window_days: u32) -> Result<Vec<Bar>>;
}
