//! Meeting session and history types.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BTreeMap;

use super::id::MeetingId;
use crate::clock::{self, history_time};

/// Browser tab identifier.
pub type TabId = i64;

/// An in-progress visit of one tab to one meeting room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(alias = "id")]
    pub meeting_id: MeetingId,
    pub start: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

impl Session {
    pub fn open(meeting_id: MeetingId, now: DateTime<Utc>) -> Self {
        Self {
            meeting_id,
            start: now,
            last_seen: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingHistoryEntry {
    #[serde(with = "history_time")]
    pub start_time: NaiveDateTime,
    #[serde(with = "history_time")]
    pub end_time: NaiveDateTime,
    #[serde(alias = "duration")]
    pub duration_minutes: u32,
}

impl MeetingHistoryEntry {
    pub fn between(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            start_time: clock::local_naive(start),
            end_time: clock::local_naive(end),
            duration_minutes: clock::duration_minutes(start, end),
        }
    }
}

/// Aggregated history of one meeting room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingRecord {
    pub meeting_id: MeetingId,
    pub count: u32,
    pub total_duration_minutes: u64,
    /// Most recent first.
    pub history: Vec<MeetingHistoryEntry>,
}

impl MeetingRecord {
    pub fn empty(meeting_id: MeetingId) -> Self {
        Self {
            meeting_id,
            count: 0,
            total_duration_minutes: 0,
            history: Vec::new(),
        }
    }

    pub fn latest(&self) -> Option<&MeetingHistoryEntry> {
        self.history.first()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StoreLimits {
    pub max_meetings: usize,
    pub max_history: usize,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_meetings: 10,
            max_history: 10,
        }
    }
}

pub type RecentMeetings = BTreeMap<MeetingId, MeetingRecord>;

/// Folds a finished session into the recent-meetings map, then prunes the map
/// to the most recently started meetings.
pub fn apply_completion(
    meetings: &mut RecentMeetings,
    meeting_id: &MeetingId,
    entry: MeetingHistoryEntry,
    limits: StoreLimits,
) {
    let record = meetings
        .entry(meeting_id.clone())
        .or_insert_with(|| MeetingRecord::empty(meeting_id.clone()));

    record.count += 1;
    record.total_duration_minutes += u64::from(entry.duration_minutes);
    record.history.insert(0, entry);
    record.history.truncate(limits.max_history);

    if meetings.len() > limits.max_meetings {
        let mut ranked: Vec<(MeetingId, Option<NaiveDateTime>)> = meetings
            .iter()
            .map(|(id, record)| (id.clone(), record.latest().map(|e| e.start_time)))
            .collect();
        ranked.sort_by_key(|(_, started)| Reverse(*started));

        for (id, _) in ranked.into_iter().skip(limits.max_meetings) {
            meetings.remove(&id);
        }
    }
}

/// Records ordered most recent first.
pub fn by_recency(meetings: RecentMeetings) -> Vec<MeetingRecord> {
    let mut records: Vec<MeetingRecord> = meetings.into_values().collect();
    records.sort_by_key(|record| Reverse(record.latest().map(|e| e.start_time)));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn id(raw: &str) -> MeetingId {
        MeetingId::parse(raw).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 1, 10, 0, 0).unwrap()
    }

    /// Distinct lowercase meeting ids, one per letter.
    fn nth_id(n: usize) -> MeetingId {
        let c = ('a'..='z').nth(n).unwrap();
        id(&format!("{c}{c}{c}-{c}{c}{c}{c}-{c}{c}{c}"))
    }

    #[test]
    fn test_entry_between_computes_minutes() {
        let entry = MeetingHistoryEntry::between(t0(), t0() + Duration::minutes(42));
        assert_eq!(entry.duration_minutes, 42);
        assert!(entry.end_time > entry.start_time);
    }

    #[test]
    fn test_apply_completion_creates_record() {
        let mut meetings = RecentMeetings::new();
        let entry = MeetingHistoryEntry::between(t0(), t0() + Duration::minutes(5));
        apply_completion(&mut meetings, &id("abc-defg-hij"), entry.clone(), StoreLimits::default());

        let record = &meetings[&id("abc-defg-hij")];
        assert_eq!(record.count, 1);
        assert_eq!(record.total_duration_minutes, 5);
        assert_eq!(record.history, vec![entry]);
    }

    #[test]
    fn test_history_is_newest_first_and_capped() {
        let mut meetings = RecentMeetings::new();
        let room = id("abc-defg-hij");
        for i in 0..12 {
            let start = t0() + Duration::hours(i);
            let entry = MeetingHistoryEntry::between(start, start + Duration::minutes(2));
            apply_completion(&mut meetings, &room, entry, StoreLimits::default());
        }

        let record = &meetings[&room];
        assert_eq!(record.count, 12);
        assert_eq!(record.total_duration_minutes, 24);
        assert_eq!(record.history.len(), 10);
        assert!(record.history[0].start_time > record.history[1].start_time);
    }

    #[test]
    fn test_prunes_least_recent_meeting() {
        let mut meetings = RecentMeetings::new();
        for n in 0..11 {
            let start = t0() + Duration::hours(n as i64);
            let entry = MeetingHistoryEntry::between(start, start + Duration::minutes(1));
            apply_completion(&mut meetings, &nth_id(n), entry, StoreLimits::default());
        }

        assert_eq!(meetings.len(), 10);
        assert!(!meetings.contains_key(&nth_id(0)));
        assert!(meetings.contains_key(&nth_id(10)));
    }

    #[test]
    fn test_revisited_meeting_survives_pruning() {
        let mut meetings = RecentMeetings::new();
        for n in 0..10 {
            let start = t0() + Duration::hours(n as i64);
            let entry = MeetingHistoryEntry::between(start, start + Duration::minutes(1));
            apply_completion(&mut meetings, &nth_id(n), entry, StoreLimits::default());
        }

        // Oldest room is used again, then a new room arrives
        let start = t0() + Duration::hours(20);
        apply_completion(
            &mut meetings,
            &nth_id(0),
            MeetingHistoryEntry::between(start, start + Duration::minutes(1)),
            StoreLimits::default(),
        );
        let start = t0() + Duration::hours(21);
        apply_completion(
            &mut meetings,
            &nth_id(10),
            MeetingHistoryEntry::between(start, start + Duration::minutes(1)),
            StoreLimits::default(),
        );

        assert_eq!(meetings.len(), 10);
        assert!(meetings.contains_key(&nth_id(0)));
        assert!(!meetings.contains_key(&nth_id(1)));
    }

    #[test]
    fn test_by_recency_orders_newest_first() {
        let mut meetings = RecentMeetings::new();
        for n in [2usize, 0, 1] {
            let start = t0() + Duration::hours(n as i64);
            let entry = MeetingHistoryEntry::between(start, start + Duration::minutes(1));
            apply_completion(&mut meetings, &nth_id(n), entry, StoreLimits::default());
        }

        let ordered: Vec<MeetingId> = by_recency(meetings)
            .into_iter()
            .map(|r| r.meeting_id)
            .collect();
        assert_eq!(ordered, vec![nth_id(2), nth_id(1), nth_id(0)]);
    }

    #[test]
    fn test_persisted_shape() {
        let entry = MeetingHistoryEntry::between(t0(), t0() + Duration::minutes(3));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["durationMinutes"], 3);
        assert_eq!(value["startTime"].as_str().unwrap().len(), 19);

        let legacy = serde_json::json!({
            "startTime": "2024-09-01 10:00:00",
            "endTime": "2024-09-01 10:03:00",
            "duration": 3
        });
        let parsed: MeetingHistoryEntry = serde_json::from_value(legacy).unwrap();
        assert_eq!(parsed.duration_minutes, 3);
    }

    #[test]
    fn test_session_accepts_legacy_id_field() {
        let session: Session = serde_json::from_value(serde_json::json!({
            "id": "abc-defg-hij",
            "start": "2024-09-01T10:00:00Z",
            "lastSeen": "2024-09-01T10:30:00Z"
        }))
        .unwrap();
        assert_eq!(session.meeting_id, id("abc-defg-hij"));
        assert_eq!(session.last_seen - session.start, Duration::minutes(30));
    }
}
