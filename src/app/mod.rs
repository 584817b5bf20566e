pub mod tasks;

use crate::api::{ApiServer, ApiState};
use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::db::{self, KvStore, SqliteKvStore, StorageLock};
use crate::discovery::{HttpCandidateFetcher, MeetingUrlDiscovery};
use crate::global;
use crate::links::LinkStore;
use crate::meeting::{MeetingUrlMatcher, SessionStore, SessionTracker, StoreLimits, TabEvent};
use crate::page::PhaseBoard;
use crate::relay::{BrowserHost, DirectoryDownloads, Message, Port, Relay};
use crate::settings::SettingsStore;
use crate::transcript::{SnapshotMailbox, TranscriptEntry, TranscriptStore};
use anyhow::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

pub use tasks::{MeetingTasks, TaskIntervals};

/// Owns the session tracker and drives it from tab events and the heartbeat.
pub struct Service {
    tracker: SessionTracker,
    tasks: MeetingTasks,
    heartbeat: Duration,
}

impl Service {
    pub fn new(tracker: SessionTracker, tasks: MeetingTasks, heartbeat: Duration) -> Self {
        Self {
            tracker,
            tasks,
            heartbeat,
        }
    }

    pub fn tracker(&self) -> &SessionTracker {
        &self.tracker
    }

    /// Completes sessions a previous run left open.
    pub async fn recover(&mut self) {
        match self.tracker.recover().await {
            Ok(recovered) if !recovered.is_empty() => {
                info!("Recovered {} abandoned session(s)", recovered.len())
            }
            Ok(_) => {}
            Err(e) => warn!("Session recovery failed: {:#}", e),
        }
    }

    pub async fn handle(&mut self, event: TabEvent) {
        let tab_id = event.tab_id();
        let transition = self.tracker.handle(event).await;
        self.tasks.apply(tab_id, &transition);
    }

    /// Processes events in arrival order until the channel closes or
    /// `shutdown` resolves, then persists the open sessions.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<TabEvent>,
        shutdown: impl Future<Output = ()>,
    ) -> SessionTracker {
        let mut heartbeat = tokio::time::interval(self.heartbeat);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.handle(event).await,
                    None => {
                        info!("Event channel closed");
                        break;
                    }
                },
                _ = heartbeat.tick() => self.tracker.heartbeat().await,
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break;
                }
            }
        }

        self.tasks.stop_all();
        self.tracker.shutdown().await;
        self.tracker
    }
}

pub async fn run_service() -> Result<()> {
    info!("Starting meetkit service");

    let config = Config::load()?;

    let conn = db::init_db(&config.db_path()?)?;
    let kv: Arc<dyn KvStore> = Arc::new(SqliteKvStore::new(conn));
    let lock = Arc::new(StorageLock::new(config.storage.lock_retry()));
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let matcher = MeetingUrlMatcher::new(&config.tracker.meeting_host)?;

    let sessions = SessionStore::new(
        kv.clone(),
        lock.clone(),
        StoreLimits {
            max_meetings: config.tracker.max_meetings,
            max_history: config.tracker.max_history,
        },
    );
    let transcripts = TranscriptStore::new(
        kv.clone(),
        lock.clone(),
        clock.clone(),
        config.tracker.max_meetings,
    );
    let settings = SettingsStore::new(kv.clone(), lock.clone());
    let links = LinkStore::new(kv, lock);

    let host = BrowserHost::new();
    let relay = Arc::new(Relay::new(
        Arc::new(host.clone()),
        settings.clone(),
        transcripts.clone(),
        Arc::new(DirectoryDownloads::new(global::transcripts_dir()?)),
        matcher.clone(),
        &config.relay,
    ));
    let discovery = Arc::new(
        MeetingUrlDiscovery::new(
            Arc::new(HttpCandidateFetcher::new(&config.discovery.new_meeting_url)?),
            matcher.clone(),
        )
        .with_max_count(config.discovery.max_count),
    );

    let mailbox = SnapshotMailbox::default();
    let phases = PhaseBoard::default();
    let (entry_tx, entry_rx) = mpsc::channel::<TranscriptEntry>(256);
    tokio::spawn(store_transcripts(entry_rx, relay.clone()));

    let tasks = MeetingTasks::new(
        mailbox.clone(),
        phases.clone(),
        host.clone(),
        settings,
        clock.clone(),
        entry_tx,
        TaskIntervals {
            captions: config.captions.poll_interval(),
            page: config.page.poll_interval(),
        },
    );
    let tracker = SessionTracker::new(sessions.clone(), matcher, clock);
    let mut service = Service::new(tracker, tasks, config.tracker.heartbeat_interval());
    service.recover().await;

    let (event_tx, event_rx) = mpsc::channel::<TabEvent>(64);
    let api_server = ApiServer::new(
        ApiState {
            events: event_tx,
            host,
            mailbox,
            phases,
            relay,
            sessions,
            transcripts,
            links,
            discovery,
            discovery_count: config.discovery.default_count,
        },
        config.server.port,
    );
    tokio::spawn(async move {
        if let Err(e) = api_server.start().await {
            error!("API server failed: {:#}", e);
        }
    });

    info!("meetkit is ready!");

    service
        .run(event_rx, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await;

    info!("meetkit stopped");
    Ok(())
}

/// Feeds reconciled caption updates to the relay, which stores them.
async fn store_transcripts(mut entries: mpsc::Receiver<TranscriptEntry>, relay: Arc<Relay>) {
    while let Some(entry) = entries.recv().await {
        if let Err(e) = relay
            .dispatch(Port::Content, Message::Transcript(entry))
            .await
        {
            warn!("Failed to store transcript entry: {}", e);
        }
    }
}
