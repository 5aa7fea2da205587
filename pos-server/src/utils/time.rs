//! 时间工具函数 — 业务时区转换
//!
//! 营业日是报表口径，不参与任何状态不变量判断。
//! repository 层只接收 `i64` Unix millis，日期→毫秒转换在这里完成。

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use chrono_tz::Tz;

use super::{AppError, AppResult};

/// 解析日期字符串 (YYYY-MM-DD)
pub fn parse_date(date: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::validation(format!("Invalid date format: {date}")))
}

/// 日期 + 时分秒 → Unix millis (业务时区)
///
/// DST gap fallback: 如果本地时间不存在 (夏令时跳跃)，fallback 到 UTC。
pub fn date_hms_to_millis(date: NaiveDate, hour: u32, min: u32, sec: u32, tz: Tz) -> i64 {
    let naive = date.and_hms_opt(hour, min, sec).unwrap();
    naive
        .and_local_timezone(tz)
        .latest()
        .map(|dt| dt.timestamp_millis())
        .unwrap_or_else(|| naive.and_utc().timestamp_millis())
}

/// 日期开始 (00:00:00) → Unix millis (业务时区)
pub fn day_start_millis(date: NaiveDate, tz: Tz) -> i64 {
    date_hms_to_millis(date, 0, 0, 0, tz)
}

/// 日期结束 → 次日 00:00:00 的 Unix millis (业务时区)
///
/// 返回次日零点时间戳，调用方使用 `< end` (不含) 语义。
pub fn day_end_millis(date: NaiveDate, tz: Tz) -> i64 {
    let next_day = date.succ_opt().unwrap_or(date);
    date_hms_to_millis(next_day, 0, 0, 0, tz)
}

/// 解析 cutoff 时间字符串 (HH:MM)，失败返回 00:00
pub fn parse_cutoff(cutoff: &str) -> NaiveTime {
    NaiveTime::parse_from_str(cutoff, "%H:%M").unwrap_or_else(|e| {
        tracing::warn!(
            "Failed to parse business_day_cutoff '{}': {}, falling back to 00:00",
            cutoff,
            e
        );
        NaiveTime::MIN
    })
}

/// 某一时刻所属的营业日 (业务时区)
///
/// 当地时间 < cutoff → 还在"昨天"的营业日。纯函数，便于测试。
pub fn business_date_at(now: DateTime<Utc>, cutoff: NaiveTime, tz: Tz) -> NaiveDate {
    let local = now.with_timezone(&tz);
    if local.time() < cutoff {
        (local - chrono::Duration::days(1)).date_naive()
    } else {
        local.date_naive()
    }
}

/// 当前营业日 (业务时区)
pub fn current_business_date(cutoff: NaiveTime, tz: Tz) -> NaiveDate {
    business_date_at(Utc::now(), cutoff, tz)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn business_date_before_cutoff_belongs_to_previous_day() {
        let tz: Tz = "Asia/Shanghai".parse().unwrap();
        let cutoff = parse_cutoff("04:00");
        // 02:30 local on 2026-03-10 = 18:30 UTC on 2026-03-09
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 18, 30, 0).unwrap();
        let date = business_date_at(now, cutoff, tz);
        assert_eq!(date.to_string(), "2026-03-09");
    }

    #[test]
    fn business_date_after_cutoff_is_local_date() {
        let tz: Tz = "Asia/Shanghai".parse().unwrap();
        let cutoff = parse_cutoff("04:00");
        // 12:00 local on 2026-03-10
        let now = Utc.with_ymd_and_hms(2026, 3, 10, 4, 0, 0).unwrap();
        let date = business_date_at(now, cutoff, tz);
        assert_eq!(date.to_string(), "2026-03-10");
    }

    #[test]
    fn midnight_cutoff_never_shifts_the_date() {
        let tz: Tz = "Asia/Shanghai".parse().unwrap();
        let cutoff = parse_cutoff("00:00");
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 17, 0, 0).unwrap(); // 01:00 local
        assert_eq!(business_date_at(now, cutoff, tz).to_string(), "2026-03-10");
    }

    #[test]
    fn invalid_cutoff_falls_back_to_midnight() {
        assert_eq!(parse_cutoff("not-a-time"), NaiveTime::MIN);
    }

    #[test]
    fn day_bounds_are_half_open() {
        let tz: Tz = "Asia/Shanghai".parse().unwrap();
        let date = parse_date("2026-03-10").unwrap();
        let start = day_start_millis(date, tz);
        let end = day_end_millis(date, tz);
        assert_eq!(end - start, 24 * 3600 * 1000);
    }
}
