//! Per-tab meeting session state machine.
//!
//! Each tab is either idle or inside exactly one meeting room. Navigation and
//! tab-close events drive the transitions; leaving a room folds the session
//! into the meeting history. Open sessions are written to the recovery area on
//! every heartbeat so a restart can complete them from their last-seen time.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::id::{MeetingId, MeetingUrlMatcher, UrlKind};
use super::session::{MeetingHistoryEntry, Session, TabId};
use super::store::{OpenSessions, SessionStore};
use crate::clock::Clock;

/// Host events the tracker reacts to, in delivery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TabEvent {
    Navigated { tab_id: TabId, url: String },
    Removed { tab_id: TabId },
}

impl TabEvent {
    pub fn tab_id(&self) -> TabId {
        match self {
            TabEvent::Navigated { tab_id, .. } | TabEvent::Removed { tab_id } => *tab_id,
        }
    }
}

/// A session that has been folded into history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedSession {
    pub tab_id: Option<TabId>,
    pub meeting_id: MeetingId,
    pub entry: MeetingHistoryEntry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed for the tab.
    Ignored,
    Started(MeetingId),
    /// The tab is still in the room it was already in.
    Continued(MeetingId),
    Completed(CompletedSession),
    /// Room-to-room hop: the previous session completed, a new one opened.
    Switched {
        completed: CompletedSession,
        started: MeetingId,
    },
}

impl Transition {
    pub fn completed(&self) -> Option<&CompletedSession> {
        match self {
            Transition::Completed(done) | Transition::Switched { completed: done, .. } => {
                Some(done)
            }
            _ => None,
        }
    }

    pub fn started(&self) -> Option<&MeetingId> {
        match self {
            Transition::Started(id) | Transition::Switched { started: id, .. } => Some(id),
            _ => None,
        }
    }
}

pub struct SessionTracker {
    sessions: OpenSessions,
    store: SessionStore,
    matcher: MeetingUrlMatcher,
    clock: Arc<dyn Clock>,
}

impl SessionTracker {
    pub fn new(store: SessionStore, matcher: MeetingUrlMatcher, clock: Arc<dyn Clock>) -> Self {
        Self {
            sessions: OpenSessions::new(),
            store,
            matcher,
            clock,
        }
    }

    pub fn session(&self, tab_id: TabId) -> Option<&Session> {
        self.sessions.get(&tab_id)
    }

    pub fn open_sessions(&self) -> &OpenSessions {
        &self.sessions
    }

    pub fn matcher(&self) -> &MeetingUrlMatcher {
        &self.matcher
    }

    pub async fn handle(&mut self, event: TabEvent) -> Transition {
        match event {
            TabEvent::Navigated { tab_id, url } => self.on_navigated(tab_id, &url).await,
            TabEvent::Removed { tab_id } => self.on_removed(tab_id).await,
        }
    }

    pub async fn on_navigated(&mut self, tab_id: TabId, url: &str) -> Transition {
        match self.matcher.classify(url) {
            UrlKind::EndMarker => match self.complete_tab(tab_id).await {
                Some(done) => Transition::Completed(done),
                None => Transition::Ignored,
            },
            UrlKind::Meeting(meeting_id) => {
                let current = self.sessions.get(&tab_id).map(|s| s.meeting_id.clone());
                let previous = match current {
                    Some(open) if open == meeting_id => {
                        return Transition::Continued(meeting_id);
                    }
                    Some(_) => self.complete_tab(tab_id).await,
                    None => None,
                };

                let now = self.clock.now();
                self.sessions
                    .insert(tab_id, Session::open(meeting_id.clone(), now));
                info!("Tab {} joined meeting {}", tab_id, meeting_id);

                match previous {
                    Some(completed) => Transition::Switched {
                        completed,
                        started: meeting_id,
                    },
                    None => Transition::Started(meeting_id),
                }
            }
            UrlKind::Other => match self.complete_tab(tab_id).await {
                Some(done) => Transition::Completed(done),
                None => Transition::Ignored,
            },
        }
    }

    pub async fn on_removed(&mut self, tab_id: TabId) -> Transition {
        match self.complete_tab(tab_id).await {
            Some(done) => Transition::Completed(done),
            None => Transition::Ignored,
        }
    }

    async fn complete_tab(&mut self, tab_id: TabId) -> Option<CompletedSession> {
        let session = self.sessions.remove(&tab_id)?;
        Some(self.complete_session(Some(tab_id), session, None).await)
    }

    /// Folds `session` into the meeting history, ending it at `end` or now.
    ///
    /// Storage failures are logged and otherwise ignored; the session is gone
    /// from the tracker either way.
    pub async fn complete_session(
        &self,
        tab_id: Option<TabId>,
        session: Session,
        end: Option<DateTime<Utc>>,
    ) -> CompletedSession {
        let end = end.unwrap_or_else(|| self.clock.now());
        let entry = MeetingHistoryEntry::between(session.start, end);

        if let Err(e) = self
            .store
            .record_completion(&session.meeting_id, entry.clone())
            .await
        {
            error!(
                "Failed to record session for {}: {:#}",
                session.meeting_id, e
            );
        }

        info!(
            "Meeting {} ended after {} min",
            session.meeting_id, entry.duration_minutes
        );

        CompletedSession {
            tab_id,
            meeting_id: session.meeting_id,
            entry,
        }
    }

    /// Refreshes every open session and writes the table to the recovery area.
    pub async fn heartbeat(&mut self) {
        let now = self.clock.now();
        for session in self.sessions.values_mut() {
            session.last_seen = now;
        }
        if let Err(e) = self.store.save_open_sessions(&self.sessions).await {
            warn!("Failed to persist open sessions: {:#}", e);
        }
    }

    /// Completes sessions abandoned by a previous process, ending each at its
    /// last-seen time, then clears the recovery area.
    pub async fn recover(&mut self) -> Result<Vec<CompletedSession>> {
        let abandoned = self.store.load_open_sessions().await?;
        if abandoned.is_empty() {
            debug!("No abandoned sessions to recover");
        }

        let mut tabs: Vec<TabId> = abandoned.keys().copied().collect();
        tabs.sort_unstable();

        let mut abandoned = abandoned;
        let mut recovered = Vec::with_capacity(tabs.len());
        for tab_id in tabs {
            if let Some(session) = abandoned.remove(&tab_id) {
                let end = session.last_seen;
                info!(
                    "Recovering abandoned session for {} (tab {})",
                    session.meeting_id, tab_id
                );
                recovered.push(self.complete_session(None, session, Some(end)).await);
            }
        }

        self.store.clear_open_sessions().await?;
        Ok(recovered)
    }

    /// Writes the open-session table one last time so a later start can recover it.
    pub async fn shutdown(&mut self) {
        info!("Persisting {} open session(s) before exit", self.sessions.len());
        self.heartbeat().await;
    }
}
