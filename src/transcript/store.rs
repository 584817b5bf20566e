//! Durable transcripts, one evolving entry per `(speaker, bucket_time)`.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use super::csv::{self, ExportRow};
use super::reconciler::TranscriptEntry;
use crate::clock::{self, Clock};
use crate::db::{get_json, keys, set_json, Area, KvStore, StorageLock};
use crate::meeting::MeetingId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredTurn {
    pub bucket_time: String,
    pub speaker: String,
    pub utterance_lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MeetingTranscript {
    pub updated_at: DateTime<Utc>,
    /// In the order turns were first written.
    pub turns: Vec<StoredTurn>,
}

pub type RecentTranscripts = BTreeMap<MeetingId, MeetingTranscript>;

#[derive(Clone)]
pub struct TranscriptStore {
    kv: Arc<dyn KvStore>,
    lock: Arc<StorageLock>,
    clock: Arc<dyn Clock>,
    max_meetings: usize,
}

impl TranscriptStore {
    pub fn new(
        kv: Arc<dyn KvStore>,
        lock: Arc<StorageLock>,
        clock: Arc<dyn Clock>,
        max_meetings: usize,
    ) -> Self {
        Self {
            kv,
            lock,
            clock,
            max_meetings,
        }
    }

    /// Inserts the entry, or overwrites the lines of the existing entry with the
    /// same speaker and bucket time.
    pub async fn upsert(&self, entry: TranscriptEntry) -> Result<()> {
        let _guard = self.lock.acquire().await;

        let mut transcripts = self.load().await?;
        let now = self.clock.now();
        let transcript = transcripts
            .entry(entry.meeting_id.clone())
            .or_insert_with(|| MeetingTranscript {
                updated_at: now,
                turns: Vec::new(),
            });
        transcript.updated_at = now;

        match transcript
            .turns
            .iter_mut()
            .find(|t| t.speaker == entry.speaker && t.bucket_time == entry.bucket_time)
        {
            Some(turn) => turn.utterance_lines = entry.utterance_lines,
            None => transcript.turns.push(StoredTurn {
                bucket_time: entry.bucket_time,
                speaker: entry.speaker,
                utterance_lines: entry.utterance_lines,
            }),
        }

        prune(&mut transcripts, self.max_meetings);
        set_json(
            self.kv.as_ref(),
            Area::Sync,
            keys::RECENT_TRANSCRIPTS,
            &transcripts,
        )
        .await
    }

    pub async fn transcript(&self, meeting_id: &MeetingId) -> Result<Option<MeetingTranscript>> {
        Ok(self.load().await?.remove(meeting_id))
    }

    /// Rows for one meeting ordered by bucket time. Turns sharing a bucket
    /// time keep the order they were written in.
    pub async fn export(&self, meeting_id: &MeetingId) -> Result<Vec<ExportRow>> {
        let mut turns = self
            .transcript(meeting_id)
            .await?
            .map(|transcript| transcript.turns)
            .unwrap_or_default();
        turns.sort_by(|a, b| a.bucket_time.cmp(&b.bucket_time));

        Ok(turns
            .into_iter()
            .map(|turn| ExportRow {
                timestamp: clock::bucket_time_of_day(&turn.bucket_time),
                speaker: turn.speaker,
                lines: turn.utterance_lines,
            })
            .collect())
    }

    pub async fn export_csv(&self, meeting_id: &MeetingId) -> Result<String> {
        let rows = self.export(meeting_id).await?;
        debug!("Exporting {} transcript row(s) for {}", rows.len(), meeting_id);
        Ok(csv::render(&rows))
    }

    async fn load(&self) -> Result<RecentTranscripts> {
        Ok(
            get_json(self.kv.as_ref(), Area::Sync, keys::RECENT_TRANSCRIPTS)
                .await?
                .unwrap_or_default(),
        )
    }
}

/// Keeps the `max` most recently updated transcripts.
fn prune(transcripts: &mut RecentTranscripts, max: usize) {
    if transcripts.len() <= max {
        return;
    }
    let mut ranked: Vec<(MeetingId, DateTime<Utc>)> = transcripts
        .iter()
        .map(|(id, t)| (id.clone(), t.updated_at))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    for (id, _) in ranked.into_iter().skip(max) {
        transcripts.remove(&id);
    }
}
