//! Time source and timestamp formatting.
//!
//! Everything that reads the current time goes through [`Clock`] so the session
//! tracker and caption reconciler can be driven deterministically in tests.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use std::sync::Mutex;

/// Layout used for meeting history timestamps.
pub const HISTORY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Layout of transcript bucket keys. Sorts chronologically as text.
pub const BUCKET_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Layout bucket keys are shown in on export.
pub const BUCKET_DISPLAY_FORMAT: &str = "%H:%M:%S";

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        if let Ok(mut now) = self.now.lock() {
            *now = at;
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        if let Ok(mut now) = self.now.lock() {
            *now += by;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Local wall-clock time of `at`, without offset.
pub fn local_naive(at: DateTime<Utc>) -> NaiveDateTime {
    at.with_timezone(&Local).naive_local()
}

/// `"YYYY-MM-DD HH:MM:SS"` in local time.
pub fn format_history_time(at: DateTime<Utc>) -> String {
    local_naive(at).format(HISTORY_FORMAT).to_string()
}

/// `"YYYY-MM-DD HH:MM:SS.mmm"` in local time.
pub fn format_bucket_time(at: DateTime<Utc>) -> String {
    local_naive(at).format(BUCKET_FORMAT).to_string()
}

/// `"HH:MM:SS"` part of a bucket key. Keys in any other layout, such as bare
/// times sent by the content script, are shown unchanged.
pub fn bucket_time_of_day(key: &str) -> String {
    match NaiveDateTime::parse_from_str(key, BUCKET_FORMAT) {
        Ok(naive) => naive.format(BUCKET_DISPLAY_FORMAT).to_string(),
        Err(_) => key.to_string(),
    }
}

/// Whole minutes between `start` and `end`, rounded, never below one.
pub fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> u32 {
    let millis = (end - start).num_milliseconds();
    let minutes = (millis as f64 / 60_000.0).round();
    if minutes < 1.0 {
        1
    } else {
        minutes as u32
    }
}

/// Interprets a local `"YYYY-MM-DD HH:MM:SS"` string.
pub fn parse_history_time(text: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text, HISTORY_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

/// Serde adapter persisting a local wall-clock time as `"YYYY-MM-DD HH:MM:SS"`.
pub mod history_time {
    use super::HISTORY_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.format(HISTORY_FORMAT).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, HISTORY_FORMAT).map_err(de::Error::custom)
    }
}
