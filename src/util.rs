use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Utc};
use chrono_tz::Asia::Kolkata;
use crate::errors::{Result, WatchlistError};

// 日期转换工具
pub fn naive_date_to_int(date: &NaiveDate) -> i32 {
    date.year() * 10000 + date.month() as i32 * 100 + date.day() as i32
}

/// 将 Unix 时间戳按交易所时区偏移（秒）换算为当地日历日期
pub fn timestamp_to_date_int(timestamp: i64, gmt_offset_secs: i32) -> Result<i32> {
    let utc = DateTime::from_timestamp(timestamp, 0)
        .ok_or_else(|| WatchlistError::DataError(format!("Invalid timestamp: {}", timestamp)))?;
    let offset = FixedOffset::east_opt(gmt_offset_secs)
        .ok_or_else(|| WatchlistError::DataError(format!("Invalid gmt offset: {}", gmt_offset_secs)))?;
    Ok(naive_date_to_int(&utc.with_timezone(&offset).date_naive()))
}

/// 显示用保留两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Formats a wall-clock instant in Indian Standard Time regardless of the process locale.
pub fn format_ist(instant: &DateTime<Utc>) -> String {
    instant
        .with_timezone(&Kolkata)
        .format("%Y-%m-%d %H:%M:%S IST")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn naive_date_to_int_packs_yyyymmdd() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(naive_date_to_int(&date), 20240307);
        let date = NaiveDate::from_ymd_opt(1999, 12, 31).unwrap();
        assert_eq!(naive_date_to_int(&date), 19991231);
    }

    #[test]
    fn timestamp_uses_exchange_offset() {
        // 2024-03-07 14:30:00 UTC，纽约为 09:30 同一天，东京为次日 00:30
        let ts = Utc.with_ymd_and_hms(2024, 3, 7, 14, 30, 0).unwrap().timestamp();
        assert_eq!(timestamp_to_date_int(ts, -5 * 3600).unwrap(), 20240307);
        assert_eq!(timestamp_to_date_int(ts, 10 * 3600).unwrap(), 20240308);
    }

    #[test]
    fn rounds_to_two_decimals() {
        assert_eq!(round2(33.333333), 33.33);
        assert_eq!(round2(-4.996), -5.0);
        assert_eq!(round2(10.0), 10.0);
        // 恰好为 .5 时远离零舍入
        assert_eq!(round2(0.125), 0.13);
        assert_eq!(round2(-0.125), -0.13);
    }

    #[test]
    fn formats_in_ist() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 31, 20, 0, 5).unwrap();
        assert_eq!(format_ist(&instant), "2024-02-01 01:30:05 IST");
    }
}
