use crate::errors::{Result, WatchlistError};
use log::{debug, info};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// 自选股列表的文件存储，每行一个代码
pub struct WatchlistStore {
    path: PathBuf,
}

impl WatchlistStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted symbols in file order. A missing file is an empty list.
    pub fn load(&self) -> Result<Vec<String>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Watchlist file {} not found, starting empty", self.path.display());
                return Ok(Vec::new());
            }
            Err(e) => return Err(WatchlistError::IoError(e)),
        };

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// 先写临时文件再重命名，读取方不会看到写了一半的文件
    pub fn save(&self, symbols: &[String]) -> Result<()> {
        let persistence_error = |source: std::io::Error| WatchlistError::PersistenceError {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(persistence_error)?;
            }
        }

        let tmp_path = self.tmp_path();
        let write_tmp = || -> std::io::Result<()> {
            let mut file = fs::File::create(&tmp_path)?;
            for symbol in symbols {
                writeln!(file, "{}", symbol)?;
            }
            file.sync_all()
        };

        if let Err(e) = write_tmp() {
            let _ = fs::remove_file(&tmp_path);
            return Err(persistence_error(e));
        }
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            persistence_error(e)
        })?;

        info!("Saved {} symbols to {}", symbols.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "watchlist".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

/// Normalizes one user-entered symbol: trimmed and upper-cased, `None` when blank.
pub fn normalize_symbol(raw: &str) -> Option<String> {
    let symbol = raw.trim().to_uppercase();
    if symbol.is_empty() {
        None
    } else {
        Some(symbol)
    }
}

/// 解析逗号分隔的输入，保留顺序与重复项
pub fn parse_symbols(input: &str) -> Vec<String> {
    input.split(',').filter_map(normalize_symbol).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_symbols_normalizes_and_keeps_duplicates() {
        assert_eq!(
            parse_symbols(" aapl, msft ,,AAPL , brk.b"),
            vec!["AAPL", "MSFT", "AAPL", "BRK.B"]
        );
        assert!(parse_symbols("  , ,").is_empty());
        assert_eq!(normalize_symbol("  tsla "), Some("TSLA".to_string()));
        assert_eq!(normalize_symbol("   "), None);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempdir().unwrap();
        let store = WatchlistStore::new(dir.path().join("watch_list.txt"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn save_then_load_round_trips_in_order() {
        let dir = tempdir().unwrap();
        let store = WatchlistStore::new(dir.path().join("watch_list.txt"));
        let symbols = vec!["AAPL".to_string(), "MSFT".to_string()];

        store.save(&symbols).unwrap();
        assert_eq!(store.load().unwrap(), symbols);
        assert!(!dir.path().join("watch_list.txt.tmp").exists());
        assert_eq!(fs::read_to_string(store.path()).unwrap(), "AAPL\nMSFT\n");
    }

    #[test]
    fn save_overwrites_previous_list() {
        let dir = tempdir().unwrap();
        let store = WatchlistStore::new(dir.path().join("nested").join("list.txt"));

        store.save(&["AAPL".to_string(), "GOOG".to_string(), "AAPL".to_string()]).unwrap();
        store.save(&["IBM".to_string()]).unwrap();
        assert_eq!(store.load().unwrap(), vec!["IBM"]);
    }

    #[test]
    fn load_skips_blank_lines_and_tolerates_missing_trailing_newline() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("watch_list.txt");
        fs::write(&path, "AAPL\r\n\n  MSFT  \nAAPL").unwrap();

        let store = WatchlistStore::new(&path);
        assert_eq!(store.load().unwrap(), vec!["AAPL", "MSFT", "AAPL"]);
    }

    #[test]
    fn unwritable_location_is_a_persistence_error() {
        let dir = tempdir().unwrap();
        // 父路径是普通文件，无法创建目录
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "x").unwrap();

        let store = WatchlistStore::new(blocker.join("watch_list.txt"));
        match store.save(&["AAPL".to_string()]) {
            Err(WatchlistError::PersistenceError { path, .. }) => {
                assert_eq!(path, blocker.join("watch_list.txt"));
            }
            other => panic!("expected PersistenceError, got {:?}", other),
        }
    }
}
