//! Per-tab background work for tabs that are inside a meeting.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::meeting::{MeetingId, TabId, Transition};
use crate::page::{PageAutomation, PhaseBoard, RemotePage};
use crate::relay::BrowserHost;
use crate::settings::SettingsStore;
use crate::transcript::{CaptionPoller, SnapshotMailbox, TranscriptEntry, TranscriptReconciler};

#[derive(Debug, Clone, Copy)]
pub struct TaskIntervals {
    pub captions: Duration,
    pub page: Duration,
}

/// Starts a caption poller and the page automation when a tab enters a
/// meeting, and cancels both when it leaves.
pub struct MeetingTasks {
    running: HashMap<TabId, CancellationToken>,
    mailbox: SnapshotMailbox,
    phases: PhaseBoard,
    host: BrowserHost,
    settings: SettingsStore,
    clock: Arc<dyn Clock>,
    transcripts: mpsc::Sender<TranscriptEntry>,
    intervals: TaskIntervals,
}

impl MeetingTasks {
    pub fn new(
        mailbox: SnapshotMailbox,
        phases: PhaseBoard,
        host: BrowserHost,
        settings: SettingsStore,
        clock: Arc<dyn Clock>,
        transcripts: mpsc::Sender<TranscriptEntry>,
        intervals: TaskIntervals,
    ) -> Self {
        Self {
            running: HashMap::new(),
            mailbox,
            phases,
            host,
            settings,
            clock,
            transcripts,
            intervals,
        }
    }

    pub fn is_running(&self, tab_id: TabId) -> bool {
        self.running.contains_key(&tab_id)
    }

    pub fn apply(&mut self, tab_id: TabId, transition: &Transition) {
        if transition.completed().is_some() {
            self.stop(tab_id);
        }
        if let Some(meeting_id) = transition.started() {
            self.start(tab_id, meeting_id.clone());
        }
    }

    fn start(&mut self, tab_id: TabId, meeting_id: MeetingId) {
        self.stop(tab_id);
        // Snapshots from an earlier room must not leak into this one.
        self.mailbox.forget(tab_id);

        let cancel = CancellationToken::new();
        self.running.insert(tab_id, cancel.clone());

        let poller = CaptionPoller::new(
            self.mailbox.source_for(tab_id),
            TranscriptReconciler::new(meeting_id.clone()),
            self.clock.clone(),
            self.intervals.captions,
        );
        tokio::spawn(poller.run(self.transcripts.clone(), cancel.clone()));

        let page = Arc::new(RemotePage::new(
            tab_id,
            self.phases.clone(),
            self.host.clone(),
        ));
        let automation = PageAutomation::new(page, self.intervals.page);
        let settings = self.settings.clone();
        tokio::spawn(async move {
            let snapshot = match settings.load().await {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    warn!("Failed to load settings for tab {}: {:#}", tab_id, e);
                    return;
                }
            };
            automation.run(&snapshot, cancel).await;
        });

        debug!("Started meeting tasks for tab {} ({})", tab_id, meeting_id);
    }

    fn stop(&mut self, tab_id: TabId) {
        if let Some(cancel) = self.running.remove(&tab_id) {
            cancel.cancel();
            debug!("Stopped meeting tasks for tab {}", tab_id);
        }
    }

    pub fn stop_all(&mut self) {
        for (_, cancel) in self.running.drain() {
            cancel.cancel();
        }
    }
}
