//! Saved meeting links.

use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, put},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::api::error::{ApiError, ApiResult};
use crate::api::ApiState;
use crate::links::SavedLink;

#[derive(Debug, Deserialize)]
pub struct LinkRequest {
    pub name: String,
    pub url: String,
}

impl LinkRequest {
    fn into_link(self) -> ApiResult<SavedLink> {
        SavedLink::new(&self.name, &self.url).map_err(|e| ApiError::bad_request(e.to_string()))
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(list_links).post(add_link))
        .route("/:index", put(update_link).delete(remove_link))
        .with_state(state)
}

async fn list_links(State(state): State<ApiState>) -> ApiResult<Json<Vec<SavedLink>>> {
    Ok(Json(state.links.list().await?))
}

async fn add_link(
    State(state): State<ApiState>,
    Json(req): Json<LinkRequest>,
) -> ApiResult<Json<Value>> {
    let index = state.links.add(req.into_link()?).await?;
    Ok(Json(json!({ "success": true, "index": index })))
}

async fn update_link(
    State(state): State<ApiState>,
    Path(index): Path<usize>,
    Json(req): Json<LinkRequest>,
) -> ApiResult<Json<Value>> {
    let link = req.into_link()?;
    state
        .links
        .update(index, link)
        .await
        .map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(Json(json!({ "success": true })))
}

async fn remove_link(
    State(state): State<ApiState>,
    Path(index): Path<usize>,
) -> ApiResult<Json<SavedLink>> {
    let removed = state
        .links
        .remove(index)
        .await
        .map_err(|e| ApiError::not_found(e.to_string()))?;
    Ok(Json(removed))
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{call, fixture};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_link_crud() {
        let (app, _, _events) = fixture();

        let (status, body) = call(
            &app,
            Method::POST,
            "/links",
            Some(json!({"name": "Standup", "url": "https://meet.google.com/abc-defg-hij"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["index"], 0);

        let (status, _) = call(
            &app,
            Method::POST,
            "/links",
            Some(json!({"name": " ", "url": "https://x"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = call(
            &app,
            Method::PUT,
            "/links/0",
            Some(json!({"name": "Daily", "url": "https://meet.google.com/abc-defg-hij"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, Method::GET, "/links", None).await;
        assert_eq!(body[0]["name"], "Daily");

        let (status, _) = call(&app, Method::DELETE, "/links/3", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, Method::DELETE, "/links/0", None).await;
        assert_eq!(status, StatusCode::OK);
    }
}
