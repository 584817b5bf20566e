//! Turns repeated caption snapshots into one evolving entry per speaking turn.
//!
//! Live captions revise in place, so the same utterance shows up on many
//! ticks with slightly different text. Each speaker's current turn is keyed by
//! the block's unique tag; while the tag is unchanged every update overwrites
//! the same `(speaker, bucket_time)` entry. A new tag starts a new bucket.
//! Bucket keys carry the date and millisecond, and a speaker's new bucket is
//! always later than their previous one, so two turns never share a key.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use super::caption::CaptionSnapshot;
use crate::clock;
use crate::meeting::MeetingId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptEntry {
    pub meeting_id: MeetingId,
    pub speaker: String,
    pub bucket_time: String,
    pub utterance_lines: Vec<String>,
}

#[derive(Debug)]
struct Turn {
    tag: String,
    started: DateTime<Utc>,
    bucket_time: String,
    lines: Vec<String>,
}

#[derive(Debug)]
pub struct TranscriptReconciler {
    meeting_id: MeetingId,
    turns: HashMap<String, Turn>,
}

impl TranscriptReconciler {
    pub fn new(meeting_id: MeetingId) -> Self {
        Self {
            meeting_id,
            turns: HashMap::new(),
        }
    }

    pub fn meeting_id(&self) -> &MeetingId {
        &self.meeting_id
    }

    /// Entries that are new or whose lines changed since the last tick.
    pub fn reconcile(
        &mut self,
        snapshot: &CaptionSnapshot,
        now: DateTime<Utc>,
    ) -> Vec<TranscriptEntry> {
        let now = now.trunc_subsecs(3);
        let mut updates = Vec::new();

        for block in &snapshot.blocks {
            let previous = self.turns.get(&block.speaker_name);
            let continuing = previous.is_some_and(|turn| turn.tag == block.unique_tag);

            if !continuing {
                let started = match previous {
                    Some(turn) if turn.started >= now => turn.started + Duration::milliseconds(1),
                    _ => now,
                };
                let bucket_time = clock::format_bucket_time(started);
                debug!(
                    "New turn for {} at {} (tag {})",
                    block.speaker_name, bucket_time, block.unique_tag
                );
                self.turns.insert(
                    block.speaker_name.clone(),
                    Turn {
                        tag: block.unique_tag.clone(),
                        started,
                        bucket_time,
                        lines: Vec::new(),
                    },
                );
            }

            let Some(turn) = self.turns.get_mut(&block.speaker_name) else {
                continue;
            };

            if block.utterance_lines.is_empty() || turn.lines == block.utterance_lines {
                continue;
            }

            turn.lines = block.utterance_lines.clone();
            updates.push(TranscriptEntry {
                meeting_id: self.meeting_id.clone(),
                speaker: block.speaker_name.clone(),
                bucket_time: turn.bucket_time.clone(),
                utterance_lines: turn.lines.clone(),
            });
        }

        updates
    }
}
