//! Meeting URL discovery.

use axum::{
    extract::{Query, State},
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use crate::api::error::ApiResult;
use crate::api::ApiState;

#[derive(Debug, Deserialize, Default)]
pub struct DiscoverParams {
    pub count: Option<usize>,
}

pub fn router(state: ApiState) -> Router {
    Router::new().route("/", post(discover)).with_state(state)
}

/// POST /discover?count=N - A new run supersedes any run still in flight.
async fn discover(
    State(state): State<ApiState>,
    Query(params): Query<DiscoverParams>,
) -> ApiResult<Json<Value>> {
    let count = params.count.unwrap_or(state.discovery_count);
    info!("Discovering {} meeting URL(s)", count);

    let ids = state.discovery.discover(count).await?;
    let urls: Vec<String> = ids
        .iter()
        .map(|id| state.discovery.meeting_url(id))
        .collect();

    Ok(Json(json!({ "urls": urls })))
}
