//! Tab lifecycle and per-tab traffic.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{delete, get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::meeting::{TabEvent, TabId};
use crate::page::PhaseIndicators;
use crate::relay::Message;
use crate::transcript::CaptionSnapshot;

#[derive(Debug, Deserialize)]
pub struct NavigateRequest {
    pub url: String,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/:tab_id", delete(close_tab))
        .route("/:tab_id/navigate", post(navigate))
        .route("/:tab_id/activate", post(activate))
        .route("/:tab_id/messages", get(drain_messages))
        .route("/:tab_id/captions", post(publish_captions))
        .route("/:tab_id/phase", post(report_phase))
        .with_state(state)
}

/// POST /tabs/:tab_id/navigate - The tab committed a new URL.
async fn navigate(
    State(state): State<ApiState>,
    Path(tab_id): Path<TabId>,
    Json(req): Json<NavigateRequest>,
) -> ApiResult<Json<Value>> {
    state.host.navigated(tab_id, &req.url);
    forward(&state, TabEvent::Navigated {
        tab_id,
        url: req.url,
    })
    .await?;
    Ok(Json(json!({ "success": true })))
}

async fn activate(
    State(state): State<ApiState>,
    Path(tab_id): Path<TabId>,
) -> ApiResult<Json<Value>> {
    if !state.host.activate(tab_id) {
        return Err(ApiError::not_found(format!("Tab {} is not open", tab_id)));
    }
    Ok(Json(json!({ "success": true, "active": tab_id })))
}

/// DELETE /tabs/:tab_id - The tab was closed.
async fn close_tab(
    State(state): State<ApiState>,
    Path(tab_id): Path<TabId>,
) -> ApiResult<Json<Value>> {
    state.host.remove(tab_id);
    state.mailbox.forget(tab_id);
    state.phases.forget(tab_id);
    forward(&state, TabEvent::Removed { tab_id }).await?;
    Ok(Json(json!({ "success": true })))
}

async fn drain_messages(
    State(state): State<ApiState>,
    Path(tab_id): Path<TabId>,
) -> Json<Vec<Message>> {
    Json(state.host.drain(tab_id))
}

async fn publish_captions(
    State(state): State<ApiState>,
    Path(tab_id): Path<TabId>,
    Json(snapshot): Json<CaptionSnapshot>,
) -> Json<Value> {
    debug!(
        "Tab {} reported {} caption block(s)",
        tab_id,
        snapshot.blocks.len()
    );
    state.mailbox.publish(tab_id, snapshot);
    Json(json!({ "success": true }))
}

async fn report_phase(
    State(state): State<ApiState>,
    Path(tab_id): Path<TabId>,
    Json(phase): Json<PhaseIndicators>,
) -> Json<Value> {
    state.phases.report(tab_id, phase);
    Json(json!({ "success": true }))
}

async fn forward(state: &ApiState, event: TabEvent) -> ApiResult<()> {
    state.events.send(event).await.map_err(|e| {
        error!("Failed to forward tab event: {}", e);
        ApiError::internal("Session tracker is not running")
    })
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{call, fixture};
    use crate::meeting::TabEvent;
    use crate::relay::Message;
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_navigate_records_tab_and_forwards_event() {
        let (app, state, mut events) = fixture();

        let (status, _) = call(
            &app,
            Method::POST,
            "/tabs/3/navigate",
            Some(json!({"url": "https://meet.google.com/abc-defg-hij"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            events.recv().await.unwrap(),
            TabEvent::Navigated {
                tab_id: 3,
                url: "https://meet.google.com/abc-defg-hij".to_string()
            }
        );
        assert_eq!(
            state.host.url(3).as_deref(),
            Some("https://meet.google.com/abc-defg-hij")
        );
    }

    #[tokio::test]
    async fn test_close_forwards_removal() {
        let (app, _, mut events) = fixture();
        let (status, _) = call(&app, Method::DELETE, "/tabs/8", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(events.recv().await.unwrap(), TabEvent::Removed { tab_id: 8 });
    }

    #[tokio::test]
    async fn test_activate_unknown_tab_is_404() {
        let (app, _, _events) = fixture();
        let (status, body) = call(&app, Method::POST, "/tabs/5/activate", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], true);
    }

    #[tokio::test]
    async fn test_messages_are_drained_once() {
        let (app, state, _events) = fixture();
        state.host.navigated(2, "https://meet.google.com/abc-defg-hij");
        state.host.enqueue(2, Message::Init);

        let (_, body) = call(&app, Method::GET, "/tabs/2/messages", None).await;
        assert_eq!(body, json!([{"type": "init", "data": "init"}]));

        let (_, body) = call(&app, Method::GET, "/tabs/2/messages", None).await;
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_captions_land_in_mailbox() {
        let (app, state, _events) = fixture();
        let (status, _) = call(
            &app,
            Method::POST,
            "/tabs/4/captions",
            Some(json!([{"uniqueTag": "t1", "speakerName": "Alice", "utteranceLines": ["hi"]}])),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let latest = state.mailbox.latest(4).unwrap();
        assert_eq!(latest.blocks[0].speaker_name, "Alice");
    }

    #[tokio::test]
    async fn test_phase_report() {
        let (app, state, _events) = fixture();
        call(
            &app,
            Method::POST,
            "/tabs/4/phase",
            Some(json!({"joinReady": true, "inCall": false, "leaveAvailable": false})),
        )
        .await;
        assert!(state.phases.get(4).join_ready);
    }
}
