use std::time::{SystemTime, UNIX_EPOCH};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};

pub const DEFAULT_DATETIME_UTC: DateTime<Utc> = NaiveDateTime::new(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(), NaiveTime::from_hms_opt(0, 0, 0).unwrap()).and_utc();
pub const NORM_DATETIME_FMT: &str = "%Y-%m-%d %H:%M:%S";

#[inline]
pub fn from_timestamp_secs_utc(secs: u64) -> DateTime<Utc> {
    i64::try_from(secs).ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or(DEFAULT_DATETIME_UTC)
}

/// `2017-05-17 19:20:10` style rendering of a unix second, used in logs.
#[inline]
pub fn format_timestamp_secs(secs: u64) -> String {
    from_timestamp_secs_utc(secs).format(NORM_DATETIME_FMT).to_string()
}

#[inline]
pub fn current_timestamp_secs() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

#[inline]
pub fn current_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
