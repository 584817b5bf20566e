//! Background message relay between the popup and meeting pages.
//!
//! Messages arrive on a named port. Popup messages are forwarded to the
//! active tab (checkbox changes are persisted first). Page messages ask for
//! settings, submit transcript entries or request a transcript export.

pub mod downloads;
pub mod host;
pub mod message;

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RelayConfig;
use crate::meeting::{MeetingUrlMatcher, TabId};
use crate::settings::SettingsStore;
use crate::transcript::TranscriptStore;

pub use downloads::{DirectoryDownloads, Downloads};
pub use host::BrowserHost;
pub use message::{CheckboxChange, Message};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("malformed message: {0}")]
    Malformed(String),
    #[error("unknown message type '{0}'")]
    UnknownType(String),
    #[error("unknown port '{0}'")]
    UnknownPort(String),
    #[error("no active tab")]
    NoActiveTab,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Popup,
    Content,
}

impl FromStr for Port {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popup" => Ok(Port::Popup),
            "content" => Ok(Port::Content),
            other => Err(RelayError::UnknownPort(other.to_string())),
        }
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Port::Popup => f.write_str("popup"),
            Port::Content => f.write_str("content"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

/// The browser surface the relay talks to.
#[async_trait]
pub trait TabHost: Send + Sync {
    async fn active_tab(&self) -> Option<TabId>;
    async fn tabs(&self) -> Vec<TabInfo>;
    async fn send(&self, tab_id: TabId, message: Message) -> Result<()>;
}

/// What happened to a delivered message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Delivery {
    Forwarded { tab_id: TabId },
    Broadcast { tabs: usize },
    Stored,
    Saved { path: PathBuf },
    Ignored,
}

pub struct Relay {
    host: Arc<dyn TabHost>,
    settings: SettingsStore,
    transcripts: TranscriptStore,
    downloads: Arc<dyn Downloads>,
    matcher: MeetingUrlMatcher,
    active_tab_attempts: u32,
    active_tab_retry: Duration,
}

impl Relay {
    pub fn new(
        host: Arc<dyn TabHost>,
        settings: SettingsStore,
        transcripts: TranscriptStore,
        downloads: Arc<dyn Downloads>,
        matcher: MeetingUrlMatcher,
        config: &RelayConfig,
    ) -> Self {
        Self {
            host,
            settings,
            transcripts,
            downloads,
            matcher,
            active_tab_attempts: config.active_tab_retries.max(1),
            active_tab_retry: config.active_tab_retry(),
        }
    }

    /// Entry point for raw port traffic. Malformed messages are logged and
    /// dropped.
    pub async fn receive(&self, port: Port, raw: Value) -> Result<Delivery, RelayError> {
        let message = match Message::from_value(raw) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping message on {} port: {}", port, e);
                return Err(e);
            }
        };
        self.dispatch(port, message).await
    }

    pub async fn dispatch(&self, port: Port, message: Message) -> Result<Delivery, RelayError> {
        debug!("{} port: {}", port, message.kind());
        match port {
            Port::Popup => self.from_popup(message).await,
            Port::Content => self.from_page(message).await,
        }
    }

    async fn from_popup(&self, message: Message) -> Result<Delivery, RelayError> {
        // A toggled option is persisted, then applied to the open meeting.
        let follow_up = match &message {
            Message::Checkbox(change) => {
                if let Err(e) = self.settings.save(change.option, change.checked).await {
                    warn!("Failed to persist {}: {:#}", change.option, e);
                }
                change.option.action(change.checked)
            }
            _ => None,
        };

        let tab_id = self.active_tab().await?;
        self.host.send(tab_id, message).await?;
        if let Some(action) = follow_up {
            self.host.send(tab_id, Message::PageAction(action)).await?;
        }
        Ok(Delivery::Forwarded { tab_id })
    }

    async fn from_page(&self, message: Message) -> Result<Delivery, RelayError> {
        match message {
            Message::Init => {
                let settings = self.settings.load().await?;
                let mut sent = 0;
                for tab in self.host.tabs().await {
                    if !self.matcher.is_meeting_host(&tab.url) {
                        continue;
                    }
                    match self
                        .host
                        .send(tab.id, Message::InitData(settings.clone()))
                        .await
                    {
                        Ok(()) => sent += 1,
                        Err(e) => warn!("Failed to send settings to tab {}: {:#}", tab.id, e),
                    }
                }
                Ok(Delivery::Broadcast { tabs: sent })
            }
            Message::Transcript(entry) => {
                self.transcripts.upsert(entry).await?;
                Ok(Delivery::Stored)
            }
            Message::DownloadTranscript(meeting_id) => {
                let csv = self.transcripts.export_csv(&meeting_id).await?;
                let path = self
                    .downloads
                    .save(&format!("{}.csv", meeting_id), &csv)
                    .await?;
                Ok(Delivery::Saved { path })
            }
            other => {
                debug!("Ignoring {} from a page", other.kind());
                Ok(Delivery::Ignored)
            }
        }
    }

    /// The active tab can be briefly unknown while the browser switches
    /// windows, so the lookup is retried a few times.
    async fn active_tab(&self) -> Result<TabId, RelayError> {
        for attempt in 1..=self.active_tab_attempts {
            if let Some(tab_id) = self.host.active_tab().await {
                return Ok(tab_id);
            }
            if attempt < self.active_tab_attempts {
                debug!(
                    "No active tab (attempt {}/{}), retrying",
                    attempt, self.active_tab_attempts
                );
                tokio::time::sleep(self.active_tab_retry).await;
            }
        }
        info!("Giving up on popup message: no active tab");
        Err(RelayError::NoActiveTab)
    }
}
