use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tower::ServiceExt;

use crate::api::{router, ApiState};
use crate::clock::ManualClock;
use crate::config::RelayConfig;
use crate::db::{MemoryKvStore, StorageLock};
use crate::discovery::{CandidateFetcher, DiscoveryError, MeetingUrlDiscovery};
use crate::links::LinkStore;
use crate::meeting::{MeetingUrlMatcher, SessionStore, StoreLimits, TabEvent};
use crate::page::PhaseBoard;
use crate::relay::{BrowserHost, Downloads, Relay};
use crate::settings::SettingsStore;
use crate::transcript::{SnapshotMailbox, TranscriptStore};

struct FixedFetcher;

#[async_trait]
impl CandidateFetcher for FixedFetcher {
    async fn fetch_candidate(&self) -> Result<String, DiscoveryError> {
        Ok("https://meet.google.com/abc-defg-hij".to_string())
    }
}

struct NoDownloads;

#[async_trait]
impl Downloads for NoDownloads {
    async fn save(&self, file_name: &str, _contents: &str) -> anyhow::Result<PathBuf> {
        Ok(PathBuf::from(file_name))
    }
}

pub(crate) fn fixture() -> (Router, ApiState, mpsc::Receiver<TabEvent>) {
    let kv = Arc::new(MemoryKvStore::new());
    let lock = Arc::new(StorageLock::default());
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap(),
    ));
    let matcher = MeetingUrlMatcher::new("meet.google.com").unwrap();
    let host = BrowserHost::new();
    let settings = SettingsStore::new(kv.clone(), lock.clone());
    let transcripts = TranscriptStore::new(kv.clone(), lock.clone(), clock, 10);
    let relay = Relay::new(
        Arc::new(host.clone()),
        settings,
        transcripts.clone(),
        Arc::new(NoDownloads),
        matcher.clone(),
        &RelayConfig::default(),
    );
    let (events, rx) = mpsc::channel(16);

    let state = ApiState {
        events,
        host,
        mailbox: SnapshotMailbox::default(),
        phases: PhaseBoard::default(),
        relay: Arc::new(relay),
        sessions: SessionStore::new(kv.clone(), lock.clone(), StoreLimits::default()),
        transcripts,
        links: LinkStore::new(kv, lock),
        discovery: Arc::new(MeetingUrlDiscovery::new(Arc::new(FixedFetcher), matcher)),
        discovery_count: 3,
    };
    (router(state.clone()), state, rx)
}

/// Sends one request and returns the status with the body parsed as JSON
/// (or as a JSON string when it is not JSON).
pub(crate) async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}
