//! Bulk complete / verify / save endpoints

use axum::{
    extract::State,
    http::HeaderMap,
    routing::post,
    Json, Router,
};
use tracing::info;

use super::cavs::cavs_search;
use crate::bulk::service::BulkService;
use crate::bulk::BulkRequest;
use crate::notifications::BulkNotificationData;
use crate::{ApiResult, AppState};

/// Header carrying the email of the user the result is reported to
pub const USER_HEADER: &str = "x-ggrc-user";

fn recipient(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// POST /api/bulk_operations/complete
pub async fn bulk_complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BulkRequest>,
) -> ApiResult<Json<BulkNotificationData>> {
    info!(
        ids = request.assessments_ids.len(),
        attributes = request.attributes.len(),
        "Bulk complete requested"
    );
    let data = BulkService::new(&state)
        .with_recipient(recipient(&headers))
        .complete(&request)
        .await?;
    Ok(Json(data))
}

/// POST /api/bulk_operations/verify
pub async fn bulk_verify(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BulkRequest>,
) -> ApiResult<Json<BulkNotificationData>> {
    info!(ids = request.assessments_ids.len(), "Bulk verify requested");
    let data = BulkService::new(&state)
        .with_recipient(recipient(&headers))
        .verify(&request)
        .await?;
    Ok(Json(data))
}

/// POST /api/bulk_operations/cavs/save
pub async fn bulk_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BulkRequest>,
) -> ApiResult<Json<BulkNotificationData>> {
    info!(attributes = request.attributes.len(), "Bulk save requested");
    let data = BulkService::new(&state)
        .with_recipient(recipient(&headers))
        .save(&request)
        .await?;
    Ok(Json(data))
}

/// Build bulk operation routes
pub fn bulk_routes() -> Router<AppState> {
    Router::new()
        .route("/api/bulk_operations/complete", post(bulk_complete))
        .route("/api/bulk_operations/verify", post(bulk_verify))
        .route("/api/bulk_operations/cavs/save", post(bulk_save))
        .route("/api/bulk_operations/cavs/search", post(cavs_search))
}
