// 公开导出的模块，供外部使用
pub mod models;
pub mod errors;
pub mod config;
pub mod metrics;
pub mod watchlist;
pub mod scrapers;
pub mod services;
pub mod report;
pub mod util;

// 重新导出常用类型，方便使用
pub use models::stock::{Bar, MetricRecord, SymbolReport, Thresholds};
pub use metrics::compute_metrics;
pub use watchlist::WatchlistStore;
pub use scrapers::base::HistoryProvider;
pub use services::refresh_service::{RefreshReport, RefreshService, RefreshState};
pub use services::scheduler::RefreshScheduler;
pub use errors::{Result, WatchlistError};
