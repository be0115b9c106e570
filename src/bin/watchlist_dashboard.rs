use watchlist_dashboard::config::Config;
use watchlist_dashboard::models::stock::Thresholds;
use watchlist_dashboard::report::{self, SortKey};
use watchlist_dashboard::scrapers::base::HistoryProvider;
use watchlist_dashboard::scrapers::cache::CachedProvider;
use watchlist_dashboard::scrapers::yahoo::YahooScraper;
use watchlist_dashboard::services::refresh_service::{RefreshReport, RefreshService, RefreshState};
use watchlist_dashboard::services::scheduler::RefreshScheduler;
use watchlist_dashboard::watchlist::{self, WatchlistStore};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{App, Arg, ArgMatches, SubCommand};
use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

/// 刷新类子命令共用的阈值、排序和导出参数
fn display_args<'a>(app: App<'a>) -> App<'a> {
    app.arg(
        Arg::with_name("volume-threshold")
            .long("volume-threshold")
            .value_name("PCT")
            .help("Volume change alert threshold in percent")
            .takes_value(true)
            .default_value("10.0"),
    )
    .arg(
        Arg::with_name("price-threshold")
            .long("price-threshold")
            .value_name("PCT")
            .help("Price change alert threshold in percent")
            .takes_value(true)
            .default_value("5.0"),
    )
    .arg(
        Arg::with_name("sort-by")
            .long("sort-by")
            .value_name("COLUMN")
            .help("Sort column (ticker, vol-chg, prc-chg, cur-vol, cur-prc, avg-vol, prev-prc)")
            .takes_value(true),
    )
    .arg(
        Arg::with_name("desc")
            .long("desc")
            .help("Sort in descending order")
            .takes_value(false),
    )
    .arg(
        Arg::with_name("export")
            .long("export")
            .value_name("DIR")
            .help("Write stock_data.json into DIR after each refresh")
            .takes_value(true)
            .min_values(0),
    )
}

fn parse_arg<T>(matches: &ArgMatches, name: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = matches.value_of(name).unwrap_or(default);
    raw.parse::<T>()
        .with_context(|| format!("invalid value for --{}: {}", name, raw))
}

struct DisplayOptions {
    sort_by: Option<SortKey>,
    descending: bool,
    export: bool,
}

/// `--export [DIR]` 设置导出目录，未给出目录时使用当前目录
fn apply_export_dir(config: Config, matches: &ArgMatches) -> Config {
    if matches.is_present("export") {
        config.with_export_dir(matches.value_of("export").unwrap_or("."))
    } else {
        config
    }
}

impl DisplayOptions {
    fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let sort_by = match matches.value_of("sort-by") {
            Some(column) => Some(column.parse::<SortKey>()?),
            None => None,
        };
        Ok(Self {
            sort_by,
            descending: matches.is_present("desc"),
            export: matches.is_present("export"),
        })
    }

    fn print(&self, cycle: &RefreshReport, state: &RefreshState, config: &Config) -> Result<()> {
        let rows = report::sort_reports(&cycle.reports, self.sort_by, self.descending);
        println!("{}", report::render_table(&rows));
        println!("{}", state.last_refreshed_caption(Utc::now()));

        if self.export {
            let export = report::export_json(&cycle.reports)?;
            report::write_export(&export, &config.export_path())?;
        }
        Ok(())
    }
}

fn build_provider(config: &Config) -> Result<Arc<dyn HistoryProvider + Send + Sync>> {
    let yahoo = YahooScraper::new(Duration::from_secs(config.request_timeout_secs))?;
    let provider: Arc<dyn HistoryProvider + Send + Sync> = if config.cache_ttl_secs > 0 {
        info!("Caching provider responses for {}s", config.cache_ttl_secs);
        Arc::new(CachedProvider::new(
            Arc::new(yahoo),
            Duration::from_secs(config.cache_ttl_secs),
        ))
    } else {
        Arc::new(yahoo)
    };
    Ok(provider)
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let app = App::new("Watchlist Dashboard")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Stock watch list with volume and price change alerts")
        .arg(
            Arg::with_name("file")
                .short('f')
                .long("file")
                .value_name("FILE")
                .help("Watchlist file, one symbol per line")
                .takes_value(true)
                .default_value("watch_list.txt"),
        )
        .arg(
            Arg::with_name("timeout")
                .long("timeout")
                .value_name("SECONDS")
                .help("Per-symbol data provider timeout")
                .takes_value(true)
                .default_value("30"),
        )
        .arg(
            Arg::with_name("cache-ttl")
                .long("cache-ttl")
                .value_name("SECONDS")
                .help("Cache provider responses for this long (0 disables caching)")
                .takes_value(true)
                .default_value("0"),
        )
        .arg(
            Arg::with_name("window")
                .long("window")
                .value_name("DAYS")
                .help("Trailing history window in calendar days")
                .takes_value(true)
                .default_value("60"),
        )
        .subcommand(SubCommand::with_name("show").about("Print the saved watch list"))
        .subcommand(
            SubCommand::with_name("set")
                .about("Replace the watch list with comma separated symbols")
                .arg(
                    Arg::with_name("symbols")
                        .value_name("SYMBOLS")
                        .help("Symbols separated by commas, e.g. \"aapl, msft\"")
                        .required(true)
                        .takes_value(true),
                ),
        )
        .subcommand(display_args(
            SubCommand::with_name("refresh").about("Fetch data and print the table once"),
        ))
        .subcommand(display_args(
            SubCommand::with_name("watch")
                .about("Refresh the table on a timer until interrupted")
                .arg(
                    Arg::with_name("interval")
                        .short('i')
                        .long("interval")
                        .value_name("SECONDS")
                        .help("Refresh interval in seconds (5-3600)")
                        .takes_value(true)
                        .default_value("30"),
                )
                .arg(
                    Arg::with_name("cycles")
                        .long("cycles")
                        .value_name("N")
                        .help("Stop after N refresh cycles")
                        .takes_value(true),
                ),
        ));

    let matches = app.get_matches();

    let config = Config::new()
        .with_watchlist_file(matches.value_of("file").unwrap_or("watch_list.txt"))
        .with_request_timeout_secs(parse_arg(&matches, "timeout", "30")?)
        .with_cache_ttl_secs(parse_arg(&matches, "cache-ttl", "0")?)
        .with_history_window_days(parse_arg(&matches, "window", "60")?);

    let store = WatchlistStore::new(config.watchlist_file.clone());

    match matches.subcommand() {
        Some(("show", _)) => {
            let symbols = store.load()?;
            if symbols.is_empty() {
                println!("Watch list is empty. Use `set` to add symbols.");
            } else {
                println!("{}", symbols.join(", "));
            }
        }
        Some(("set", sub)) => {
            let symbols = watchlist::parse_symbols(sub.value_of("symbols").unwrap_or_default());
            if let Err(e) = store.save(&symbols) {
                error!("Watch list not saved: {}", e);
                return Err(e.into());
            }
            println!("Watch list updated: {}", symbols.join(", "));
        }
        Some(("refresh", sub)) => {
            let thresholds = Thresholds::new(
                parse_arg(sub, "volume-threshold", "10.0")?,
                parse_arg(sub, "price-threshold", "5.0")?,
            );
            let config = apply_export_dir(config.with_thresholds(thresholds), sub);
            config.validate()?;
            let options = DisplayOptions::from_matches(sub)?;

            let symbols = store.load()?;
            let provider = build_provider(&config)?;
            let service = RefreshService::new(config, provider);
            let cycle = service.run_cycle(&symbols, &thresholds).await;

            let mut state = RefreshState::new();
            state.record_refresh(cycle.refreshed_at, Duration::from_secs(service.config().refresh_interval_secs));
            options.print(&cycle, &state, service.config())?;
        }
        Some(("watch", sub)) => {
            let thresholds = Thresholds::new(
                parse_arg(sub, "volume-threshold", "10.0")?,
                parse_arg(sub, "price-threshold", "5.0")?,
            );
            let config = apply_export_dir(config, sub)
                .with_thresholds(thresholds)
                .with_refresh_interval_secs(parse_arg(sub, "interval", "30")?);
            config.validate()?;
            let options = DisplayOptions::from_matches(sub)?;
            let interval = Duration::from_secs(config.refresh_interval_secs);

            let provider = build_provider(&config)?;
            let service = RefreshService::new(config, provider);
            let mut scheduler = RefreshScheduler::new(&service, &store, interval);
            if let Some(cycles) = sub.value_of("cycles") {
                let cycles = cycles.parse::<usize>().context("invalid value for --cycles")?;
                if cycles == 0 {
                    anyhow::bail!("--cycles must be at least 1");
                }
                scheduler = scheduler.with_max_cycles(cycles);
            }

            info!("Watching {} every {}s, press Ctrl-C to stop", store.path().display(), interval.as_secs());
            let shutdown = async {
                let _ = tokio::signal::ctrl_c().await;
            };

            let mut state = RefreshState::new();
            scheduler
                .run(&mut state, &thresholds, shutdown, |cycle, state| {
                    if let Err(e) = options.print(cycle, state, service.config()) {
                        error!("Failed to render refresh: {}", e);
                    }
                })
                .await;
        }
        _ => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}
