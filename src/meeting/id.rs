//! Meeting room identifiers and meeting URL recognition.

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use url::Url;

const SEGMENT_LENGTHS: [usize; 3] = [3, 4, 3];

/// Fragment that marks an explicit end of a meeting.
pub const END_MARKER: &str = "end";

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a meeting id (expected xxx-xxxx-xxx, lowercase letters)")]
pub struct MeetingIdError(pub String);

/// Identifies a meeting room (`xxx-xxxx-xxx`), not a single occurrence of it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MeetingId(String);

impl MeetingId {
    pub fn parse(raw: &str) -> Result<Self, MeetingIdError> {
        let segments: Vec<&str> = raw.split('-').collect();
        let well_formed = segments.len() == SEGMENT_LENGTHS.len()
            && segments
                .iter()
                .zip(SEGMENT_LENGTHS)
                .all(|(segment, len)| {
                    segment.len() == len && segment.bytes().all(|b| b.is_ascii_lowercase())
                });

        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(MeetingIdError(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MeetingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MeetingId {
    type Err = MeetingIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for MeetingId {
    type Error = MeetingIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<MeetingId> for String {
    fn from(id: MeetingId) -> Self {
        id.0
    }
}

/// What a tab URL means for meeting tracking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlKind {
    /// The tab is inside a meeting room.
    Meeting(MeetingId),
    /// The URL carries the explicit end marker.
    EndMarker,
    Other,
}

/// Recognises meeting room URLs for one meeting host.
#[derive(Debug, Clone)]
pub struct MeetingUrlMatcher {
    host: String,
    pattern: Regex,
}

impl MeetingUrlMatcher {
    pub fn new(host: &str) -> Result<Self> {
        let pattern = Regex::new(&format!(
            r"^https://{}/([a-z]{{3}}-[a-z]{{4}}-[a-z]{{3}})$",
            regex::escape(host)
        ))
        .context("Failed to build meeting URL pattern")?;

        Ok(Self {
            host: host.to_string(),
            pattern,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn classify(&self, raw: &str) -> UrlKind {
        if let Ok(url) = Url::parse(raw) {
            if url.fragment() == Some(END_MARKER) {
                return UrlKind::EndMarker;
            }
        }

        self.pattern
            .captures(raw)
            .and_then(|caps| caps.get(1))
            .and_then(|m| MeetingId::parse(m.as_str()).ok())
            .map(UrlKind::Meeting)
            .unwrap_or(UrlKind::Other)
    }

    /// Whether `raw` is served by the meeting host at all (lobby pages included).
    pub fn is_meeting_host(&self, raw: &str) -> bool {
        Url::parse(raw)
            .ok()
            .and_then(|url| url.host_str().map(|h| h == self.host))
            .unwrap_or(false)
    }

    pub fn meeting_url(&self, id: &MeetingId) -> String {
        format!("https://{}/{}", self.host, id)
    }
}
