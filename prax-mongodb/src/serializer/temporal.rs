//! Tick arithmetic and text forms for date and time values.
//!
//! A tick is 100 nanoseconds. Tick counts for instants are measured from
//! 0001-01-01T00:00:00, matching the layout other drivers write.

use chrono::{DateTime, NaiveDateTime, NaiveTime, TimeDelta, Timelike};

use crate::error::{MongoError, MongoResult};

pub(crate) const TICKS_PER_SECOND: i64 = 10_000_000;
pub(crate) const TICKS_PER_MILLISECOND: i64 = 10_000;
const NANOS_PER_TICK: i64 = 100;
const TICKS_PER_MINUTE: u64 = 60 * TICKS_PER_SECOND as u64;
const TICKS_PER_HOUR: u64 = 60 * TICKS_PER_MINUTE;
const TICKS_PER_DAY: u64 = 24 * TICKS_PER_HOUR;
/// Ticks between 0001-01-01 and the Unix epoch.
pub(crate) const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

pub(crate) fn datetime_to_ticks(dt: &NaiveDateTime) -> MongoResult<i64> {
    let utc = dt.and_utc();
    utc.timestamp()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(UNIX_EPOCH_TICKS))
        .and_then(|t| t.checked_add(i64::from(utc.timestamp_subsec_nanos()) / NANOS_PER_TICK))
        .ok_or_else(|| MongoError::serialization(format!("date `{dt}` is out of range for ticks")))
}

pub(crate) fn ticks_to_datetime(ticks: i64) -> MongoResult<NaiveDateTime> {
    let relative = ticks
        .checked_sub(UNIX_EPOCH_TICKS)
        .ok_or_else(|| out_of_range(ticks))?;
    let secs = relative.div_euclid(TICKS_PER_SECOND);
    let nanos = relative.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    DateTime::from_timestamp(secs, nanos as u32)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| out_of_range(ticks))
}

pub(crate) fn time_to_ticks(time: &NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) * TICKS_PER_SECOND
        + i64::from(time.nanosecond() % 1_000_000_000) / NANOS_PER_TICK
}

pub(crate) fn ticks_to_time(ticks: i64) -> MongoResult<NaiveTime> {
    if !(0..TICKS_PER_DAY as i64).contains(&ticks) {
        return Err(MongoError::serialization(format!(
            "{ticks} ticks is not a time of day"
        )));
    }
    let secs = (ticks / TICKS_PER_SECOND) as u32;
    let nanos = ((ticks % TICKS_PER_SECOND) * NANOS_PER_TICK) as u32;
    NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos).ok_or_else(|| out_of_range(ticks))
}

pub(crate) fn duration_to_ticks(duration: &TimeDelta) -> MongoResult<i64> {
    // subsec_nanos carries the sign of the duration
    duration
        .num_seconds()
        .checked_mul(TICKS_PER_SECOND)
        .and_then(|t| t.checked_add(i64::from(duration.subsec_nanos()) / NANOS_PER_TICK))
        .ok_or_else(|| {
            MongoError::serialization(format!("duration `{duration}` is out of range for ticks"))
        })
}

pub(crate) fn ticks_to_duration(ticks: i64) -> MongoResult<TimeDelta> {
    let secs = ticks.div_euclid(TICKS_PER_SECOND);
    let nanos = ticks.rem_euclid(TICKS_PER_SECOND) * NANOS_PER_TICK;
    TimeDelta::new(secs, nanos as u32).ok_or_else(|| out_of_range(ticks))
}

fn out_of_range(ticks: i64) -> MongoError {
    MongoError::serialization(format!("{ticks} ticks is out of range"))
}

/// Format a duration as `[-][d.]hh:mm:ss[.fffffff]`.
pub fn format_duration(duration: &TimeDelta) -> MongoResult<String> {
    let ticks = duration_to_ticks(duration)?;
    let sign = if ticks < 0 { "-" } else { "" };
    let abs = ticks.unsigned_abs();

    let days = abs / TICKS_PER_DAY;
    let hours = abs % TICKS_PER_DAY / TICKS_PER_HOUR;
    let minutes = abs % TICKS_PER_HOUR / TICKS_PER_MINUTE;
    let seconds = abs % TICKS_PER_MINUTE / TICKS_PER_SECOND as u64;
    let fraction = abs % TICKS_PER_SECOND as u64;

    let mut out = String::with_capacity(24);
    out.push_str(sign);
    if days > 0 {
        out.push_str(&format!("{days}."));
    }
    out.push_str(&format!("{hours:02}:{minutes:02}:{seconds:02}"));
    if fraction > 0 {
        out.push_str(&format!(".{fraction:07}"));
    }
    Ok(out)
}

/// Parse a duration written as `[-][d.]hh:mm:ss[.fffffff]`.
pub fn parse_duration(s: &str) -> MongoResult<TimeDelta> {
    let invalid = || MongoError::serialization(format!("`{s}` is not a valid duration"));

    let (negative, body) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };

    let (head, rest) = body.split_once(':').ok_or_else(invalid)?;
    let (days, hours) = match head.split_once('.') {
        Some((d, h)) => (d, h),
        None => ("0", head),
    };
    let (minutes, rest) = rest.split_once(':').ok_or_else(invalid)?;
    let (seconds, fraction) = match rest.split_once('.') {
        Some((sec, frac)) => (sec, frac),
        None => (rest, ""),
    };

    let field = |text: &str, limit: u64| -> MongoResult<u64> {
        if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: u64 = text.parse().map_err(|_| invalid())?;
        if value >= limit {
            return Err(invalid());
        }
        Ok(value)
    };

    let days = field(days, u64::MAX)?;
    let hours = field(hours, 24)?;
    let minutes = field(minutes, 60)?;
    let seconds = field(seconds, 60)?;
    let fraction = if fraction.is_empty() {
        0
    } else if fraction.len() > 7 {
        return Err(invalid());
    } else {
        field(fraction, u64::MAX)? * 10u64.pow(7 - fraction.len() as u32)
    };

    let ticks = days
        .checked_mul(TICKS_PER_DAY)
        .and_then(|t| t.checked_add(hours * TICKS_PER_HOUR))
        .and_then(|t| t.checked_add(minutes * TICKS_PER_MINUTE))
        .and_then(|t| t.checked_add(seconds * TICKS_PER_SECOND as u64))
        .and_then(|t| t.checked_add(fraction))
        .and_then(|t| i64::try_from(t).ok())
        .ok_or_else(invalid)?;

    ticks_to_duration(if negative { -ticks } else { ticks })
}
