use thiserror::Error;
use std::path::PathBuf;

#[derive(Error, Debug)]
pub enum WatchlistError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Not enough data for {symbol}: {bars} bar(s) returned, at least 2 required")]
    InsufficientData { symbol: String, bars: usize },

    #[error("Provider error for {symbol}: {message}")]
    ProviderError { symbol: String, message: String },

    #[error("Provider timed out for {symbol} after {seconds}s")]
    Timeout { symbol: String, seconds: u64 },

    #[error("Failed to persist watchlist to {}: {source}", .path.display())]
    PersistenceError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Data error: {0}")]
    DataError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

impl WatchlistError {
    pub fn provider(symbol: &str, message: impl Into<String>) -> Self {
        WatchlistError::ProviderError {
            symbol: symbol.to_string(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchlistError>;
