//! Durable meeting history and the open-session recovery area.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use super::id::MeetingId;
use super::session::{
    apply_completion, by_recency, MeetingHistoryEntry, MeetingRecord, RecentMeetings, Session,
    StoreLimits, TabId,
};
use crate::db::{get_json, keys, set_json, Area, KvStore, StorageLock};

pub type OpenSessions = HashMap<TabId, Session>;

#[derive(Clone)]
pub struct SessionStore {
    kv: Arc<dyn KvStore>,
    lock: Arc<StorageLock>,
    limits: StoreLimits,
}

impl SessionStore {
    pub fn new(kv: Arc<dyn KvStore>, lock: Arc<StorageLock>, limits: StoreLimits) -> Self {
        Self { kv, lock, limits }
    }

    /// Appends `entry` to the meeting's history and prunes the recent-meetings map.
    pub async fn record_completion(
        &self,
        meeting_id: &MeetingId,
        entry: MeetingHistoryEntry,
    ) -> Result<()> {
        let _guard = self.lock.acquire().await;

        let mut meetings: RecentMeetings =
            get_json(self.kv.as_ref(), Area::Sync, keys::RECENT_MEETINGS)
                .await?
                .unwrap_or_default();

        apply_completion(&mut meetings, meeting_id, entry, self.limits);

        set_json(self.kv.as_ref(), Area::Sync, keys::RECENT_MEETINGS, &meetings).await?;
        debug!(
            "Recorded session for {} ({} meetings tracked)",
            meeting_id,
            meetings.len()
        );
        Ok(())
    }

    /// Recent meetings, most recently started first.
    pub async fn recent(&self) -> Result<Vec<MeetingRecord>> {
        let meetings: RecentMeetings =
            get_json(self.kv.as_ref(), Area::Sync, keys::RECENT_MEETINGS)
                .await?
                .unwrap_or_default();
        Ok(by_recency(meetings))
    }

    pub async fn get(&self, meeting_id: &MeetingId) -> Result<Option<MeetingRecord>> {
        let mut meetings: RecentMeetings =
            get_json(self.kv.as_ref(), Area::Sync, keys::RECENT_MEETINGS)
                .await?
                .unwrap_or_default();
        Ok(meetings.remove(meeting_id))
    }

    pub async fn load_open_sessions(&self) -> Result<OpenSessions> {
        Ok(
            get_json(self.kv.as_ref(), Area::Local, keys::ACTIVE_SESSIONS)
                .await?
                .unwrap_or_default(),
        )
    }

    pub async fn save_open_sessions(&self, sessions: &OpenSessions) -> Result<()> {
        let _guard = self.lock.acquire().await;
        set_json(self.kv.as_ref(), Area::Local, keys::ACTIVE_SESSIONS, sessions).await
    }

    pub async fn clear_open_sessions(&self) -> Result<()> {
        let _guard = self.lock.acquire().await;
        self.kv.remove(Area::Local, keys::ACTIVE_SESSIONS).await
    }
}
