use crate::errors::{Result, WatchlistError};
use crate::models::stock::Thresholds;
use std::path::PathBuf;

pub const MIN_REFRESH_INTERVAL_SECS: u64 = 5;
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 3600;
pub const EXPORT_FILE_NAME: &str = "stock_data.json";

pub struct Config {
    pub watchlist_file: PathBuf,
    pub refresh_interval_secs: u64,
    pub thresholds: Thresholds,
    pub history_window_days: u32,
    pub request_timeout_secs: u64,
    pub cache_ttl_secs: u64,  // 0 表示不缓存
    pub export_dir: PathBuf,
}

impl Config {
    pub fn new() -> Self {
        Self {
            watchlist_file: PathBuf::from("watch_list.txt"),
            refresh_interval_secs: 30,
            thresholds: Thresholds::default(),
            history_window_days: 60,
            request_timeout_secs: 30,
            cache_ttl_secs: 0,
            export_dir: PathBuf::from("."),
        }
    }

    pub fn with_watchlist_file(mut self, path: &str) -> Self {
        self.watchlist_file = PathBuf::from(path);
        self
    }

    pub fn with_refresh_interval_secs(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }

    pub fn with_thresholds(mut self, thresholds: Thresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_history_window_days(mut self, days: u32) -> Self {
        self.history_window_days = days;
        self
    }

    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_cache_ttl_secs(mut self, secs: u64) -> Self {
        self.cache_ttl_secs = secs;
        self
    }

    pub fn with_export_dir(mut self, dir: &str) -> Self {
        self.export_dir = PathBuf::from(dir);
        self
    }

    pub fn export_path(&self) -> PathBuf {
        self.export_dir.join(EXPORT_FILE_NAME)
    }

    /// 校验刷新间隔、阈值等取值范围
    pub fn validate(&self) -> Result<()> {
        if !(MIN_REFRESH_INTERVAL_SECS..=MAX_REFRESH_INTERVAL_SECS).contains(&self.refresh_interval_secs) {
            return Err(WatchlistError::ConfigError(format!(
                "refresh interval must be between {} and {} seconds, got {}",
                MIN_REFRESH_INTERVAL_SECS, MAX_REFRESH_INTERVAL_SECS, self.refresh_interval_secs
            )));
        }

        validate_threshold("volume change threshold", self.thresholds.volume_change_pct)?;
        validate_threshold("price change threshold", self.thresholds.price_change_pct)?;

        if self.history_window_days < 2 {
            return Err(WatchlistError::ConfigError(format!(
                "history window must cover at least 2 days, got {}",
                self.history_window_days
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(WatchlistError::ConfigError("request timeout must be positive".to_string()));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_threshold(name: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(WatchlistError::ConfigError(format!(
            "{} must be a non-negative percentage, got {}",
            name, value
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = Config::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.thresholds, Thresholds::new(10.0, 5.0));
        assert_eq!(config.export_path(), PathBuf::from("./stock_data.json"));
    }

    #[test]
    fn export_dir_determines_export_path() {
        let config = Config::new().with_export_dir("exports/today");
        assert_eq!(config.export_path(), PathBuf::from("exports/today/stock_data.json"));
    }

    #[test]
    fn refresh_interval_bounds_are_inclusive() {
        assert!(Config::new().with_refresh_interval_secs(5).validate().is_ok());
        assert!(Config::new().with_refresh_interval_secs(3600).validate().is_ok());
        assert!(Config::new().with_refresh_interval_secs(4).validate().is_err());
        assert!(Config::new().with_refresh_interval_secs(3601).validate().is_err());
    }

    #[test]
    fn negative_or_nan_thresholds_are_rejected() {
        let config = Config::new().with_thresholds(Thresholds::new(-1.0, 5.0));
        assert!(matches!(config.validate(), Err(WatchlistError::ConfigError(_))));

        let config = Config::new().with_thresholds(Thresholds::new(10.0, f64::NAN));
        assert!(config.validate().is_err());

        let config = Config::new().with_thresholds(Thresholds::new(0.0, 0.0));
        assert!(config.validate().is_ok());
    }
}
