//! Caption snapshots through reconciliation into the transcript store and out
//! as CSV, plus settings writes racing on the shared storage lock.

use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use meetkit::clock::{Clock, ManualClock};
use meetkit::db::{MemoryKvStore, StorageLock};
use meetkit::meeting::MeetingId;
use meetkit::settings::{is_enabled, FeatureOption, SettingsStore};
use meetkit::transcript::{
    CaptionBlock, CaptionPoller, CaptionSnapshot, ScriptedSource, TranscriptEntry,
    TranscriptReconciler, TranscriptStore,
};
use std::sync::Arc;
use std::time::Duration;

fn alice(tag: &str, lines: &[&str]) -> Option<CaptionSnapshot> {
    Some(CaptionSnapshot::new(vec![CaptionBlock {
        unique_tag: tag.to_string(),
        speaker_name: "Alice".to_string(),
        utterance_lines: lines.iter().map(|l| l.to_string()).collect(),
    }]))
}

#[tokio::test]
async fn turns_bucket_by_tag() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 9, 2, 14, 30, 0).unwrap(),
    ));
    let meeting = MeetingId::parse("abc-defg-hij").unwrap();
    let store = TranscriptStore::new(
        Arc::new(MemoryKvStore::new()),
        Arc::new(StorageLock::default()),
        clock.clone(),
        10,
    );

    let frames = vec![
        alice("turn-1", &["so"]),
        alice("turn-1", &["so the"]),
        alice("turn-1", &["so the plan"]),
        alice("turn-1", &["so the plan is"]),
        alice("turn-1", &["so the plan is", "ship friday"]),
        alice("turn-2", &["questions?"]),
    ];
    let mut poller = CaptionPoller::new(
        ScriptedSource::new(frames),
        TranscriptReconciler::new(meeting.clone()),
        clock.clone(),
        Duration::from_millis(500),
    );

    let mut emitted: Vec<TranscriptEntry> = Vec::new();
    for _ in 0..6 {
        for entry in poller.poll_once() {
            store.upsert(entry.clone()).await.unwrap();
            emitted.push(entry);
        }
        clock.advance(ChronoDuration::seconds(1));
    }
    assert_eq!(emitted.len(), 6);

    let rows = store.export(&meeting).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.speaker == "Alice"));
    assert_eq!(rows[0].lines, vec!["so the plan is", "ship friday"]);
    assert_eq!(rows[1].lines, vec!["questions?"]);
    assert_ne!(rows[0].timestamp, rows[1].timestamp);
}

fn block(tag: &str, speaker: &str, lines: &[&str]) -> CaptionBlock {
    CaptionBlock {
        unique_tag: tag.to_string(),
        speaker_name: speaker.to_string(),
        utterance_lines: lines.iter().map(|l| l.to_string()).collect(),
    }
}

#[tokio::test]
async fn export_follows_turn_start_not_write_order() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap(),
    ));
    let meeting = MeetingId::parse("abc-defg-hij").unwrap();
    let store = TranscriptStore::new(
        Arc::new(MemoryKvStore::new()),
        Arc::new(StorageLock::default()),
        clock.clone(),
        10,
    );
    let mut reconciler = TranscriptReconciler::new(meeting.clone());

    let ticks = [
        (0, vec![block("a1", "Alice", &[])]),
        (2, vec![block("a1", "Alice", &[]), block("b1", "Bob", &["morning"])]),
        (4, vec![block("a1", "Alice", &["hello"]), block("b1", "Bob", &["morning"])]),
    ];
    let start = clock.now();
    for (offset, blocks) in ticks {
        let now = start + ChronoDuration::seconds(offset);
        for entry in reconciler.reconcile(&CaptionSnapshot::new(blocks), now) {
            store.upsert(entry).await.unwrap();
        }
    }

    let rows = store.export(&meeting).await.unwrap();
    let speakers: Vec<&str> = rows.iter().map(|r| r.speaker.as_str()).collect();
    assert_eq!(speakers, vec!["Alice", "Bob"]);
    assert!(rows.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[tokio::test]
async fn two_turns_in_one_second_both_survive() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap(),
    ));
    let meeting = MeetingId::parse("abc-defg-hij").unwrap();
    let store = TranscriptStore::new(
        Arc::new(MemoryKvStore::new()),
        Arc::new(StorageLock::default()),
        clock.clone(),
        10,
    );
    let mut reconciler = TranscriptReconciler::new(meeting.clone());

    let start = clock.now();
    for (millis, tag, line) in [(0, "t1", "yes"), (500, "t2", "next topic")] {
        let snapshot = CaptionSnapshot::new(vec![block(tag, "Alice", &[line])]);
        for entry in reconciler.reconcile(&snapshot, start + ChronoDuration::milliseconds(millis)) {
            store.upsert(entry).await.unwrap();
        }
    }

    let rows = store.export(&meeting).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].lines, vec!["yes"]);
    assert_eq!(rows[1].lines, vec!["next topic"]);
}

#[tokio::test]
async fn csv_export_matches_wire_format() {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap(),
    ));
    let store = TranscriptStore::new(
        Arc::new(MemoryKvStore::new()),
        Arc::new(StorageLock::default()),
        clock,
        10,
    );
    let meeting = MeetingId::parse("abc-defg-hij").unwrap();

    store
        .upsert(TranscriptEntry {
            meeting_id: meeting.clone(),
            speaker: "Bob362".to_string(),
            bucket_time: "08:00:00".to_string(),
            utterance_lines: vec!["hi".to_string(), "there".to_string()],
        })
        .await
        .unwrap();
    store
        .upsert(TranscriptEntry {
            meeting_id: meeting.clone(),
            speaker: "Ann".to_string(),
            bucket_time: "08:00:04".to_string(),
            utterance_lines: vec!["she said \"ok\"".to_string()],
        })
        .await
        .unwrap();

    assert_eq!(
        store.export_csv(&meeting).await.unwrap(),
        "Timestamp,User,Text\n08:00:00,Bob362,\"hi there\"\n08:00:04,Ann,\"she said \"\"ok\"\"\"\n"
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_setting_writes_all_land() {
    let store = SettingsStore::new(
        Arc::new(MemoryKvStore::with_latency(Duration::from_millis(20))),
        Arc::new(StorageLock::new(Duration::from_millis(100))),
    );

    let mut handles = Vec::new();
    for option in FeatureOption::ALL {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.save(option, true).await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let settings = store.load().await.unwrap();
    for option in FeatureOption::ALL {
        assert!(is_enabled(&settings, option), "{} was lost", option);
    }
}
