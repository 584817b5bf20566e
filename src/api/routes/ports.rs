//! Raw relay traffic from the popup and meeting pages.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::post,
    Router,
};
use serde_json::Value;

use crate::api::error::ApiResult;
use crate::api::ApiState;
use crate::relay::{Delivery, Port};

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/:port/messages", post(post_message))
        .with_state(state)
}

/// POST /ports/:port/messages - `{type, data}` message for the relay.
async fn post_message(
    State(state): State<ApiState>,
    Path(port): Path<String>,
    Json(message): Json<Value>,
) -> ApiResult<Json<Delivery>> {
    let port: Port = port.parse()?;
    let delivery = state.relay.receive(port, message).await?;
    Ok(Json(delivery))
}
