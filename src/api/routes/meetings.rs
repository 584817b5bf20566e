//! Recent meetings and transcript export.

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::meeting::{MeetingId, MeetingRecord};

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(list_meetings))
        .route("/:meeting_id", get(get_meeting))
        .route("/:meeting_id/transcript.csv", get(transcript_csv))
        .with_state(state)
}

/// GET /meetings - Most recently started first.
async fn list_meetings(State(state): State<ApiState>) -> ApiResult<Json<Vec<MeetingRecord>>> {
    Ok(Json(state.sessions.recent().await?))
}

async fn get_meeting(
    State(state): State<ApiState>,
    Path(meeting_id): Path<String>,
) -> ApiResult<Json<MeetingRecord>> {
    let meeting_id = parse_id(&meeting_id)?;
    let record = state
        .sessions
        .get(&meeting_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Meeting {} not found", meeting_id)))?;
    Ok(Json(record))
}

/// GET /meetings/:meeting_id/transcript.csv
async fn transcript_csv(
    State(state): State<ApiState>,
    Path(meeting_id): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let meeting_id = parse_id(&meeting_id)?;
    let csv = state.transcripts.export_csv(&meeting_id).await?;
    Ok(([(header::CONTENT_TYPE, "text/csv; charset=utf-8")], csv))
}

fn parse_id(raw: &str) -> ApiResult<MeetingId> {
    MeetingId::parse(raw).map_err(|e| ApiError::bad_request(e.to_string()))
}
