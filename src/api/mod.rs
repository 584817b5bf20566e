//! Loopback HTTP API.
//!
//! Browser-side scripts report tab activity and caption snapshots here, drain
//! messages queued for their tab, and post raw port messages to the relay.
//! The same surface exposes recent meetings, transcripts, saved links and
//! meeting URL discovery.

pub mod error;
pub mod routes;

use anyhow::{Context, Result};
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;

use crate::discovery::MeetingUrlDiscovery;
use crate::links::LinkStore;
use crate::meeting::{SessionStore, TabEvent};
use crate::page::PhaseBoard;
use crate::relay::{BrowserHost, Relay};
use crate::transcript::{SnapshotMailbox, TranscriptStore};

/// Everything the handlers reach.
#[derive(Clone)]
pub struct ApiState {
    pub events: mpsc::Sender<TabEvent>,
    pub host: BrowserHost,
    pub mailbox: SnapshotMailbox,
    pub phases: PhaseBoard,
    pub relay: Arc<Relay>,
    pub sessions: SessionStore,
    pub transcripts: TranscriptStore,
    pub links: LinkStore,
    pub discovery: Arc<MeetingUrlDiscovery>,
    pub discovery_count: usize,
}

pub struct ApiServer {
    port: u16,
    state: ApiState,
}

impl ApiServer {
    pub fn new(state: ApiState, port: u16) -> Self {
        Self { port, state }
    }

    pub async fn start(self) -> Result<()> {
        let app = router(self.state);

        let addr = format!("127.0.0.1:{}", self.port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;

        info!("API server listening on http://{}", addr);
        info!("Endpoints:");
        info!("  GET    /                               - Service info");
        info!("  POST   /tabs/:tab_id/navigate          - Report a navigation");
        info!("  POST   /tabs/:tab_id/activate          - Mark a tab active");
        info!("  DELETE /tabs/:tab_id                   - Report a closed tab");
        info!("  GET    /tabs/:tab_id/messages          - Drain queued messages");
        info!("  POST   /tabs/:tab_id/captions          - Latest caption snapshot");
        info!("  POST   /tabs/:tab_id/phase             - Latest page phase");
        info!("  POST   /ports/:port/messages           - Relay a popup/content message");
        info!("  GET    /meetings                       - Recent meetings");
        info!("  GET    /meetings/:id/transcript.csv    - Transcript export");
        info!("  GET    /links                          - Saved links");
        info!("  POST   /discover?count=N               - Discover meeting URLs");

        axum::serve(listener, app).await?;

        Ok(())
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(status))
        .nest("/tabs", routes::tabs::router(state.clone()))
        .nest("/ports", routes::ports::router(state.clone()))
        .nest("/meetings", routes::meetings::router(state.clone()))
        .nest("/links", routes::links::router(state.clone()))
        .nest("/discover", routes::discover::router(state))
}

async fn status() -> Json<Value> {
    Json(json!({
        "service": "meetkit",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}
