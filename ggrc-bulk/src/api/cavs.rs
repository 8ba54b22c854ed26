//! Attribute matrix for the bulk edit grid

use axum::{extract::State, Json};
use tracing::debug;

use crate::bulk::aggregator::{self, CavsSearchResponse};
use crate::bulk::CavsSearchRequest;
use crate::{ApiResult, AppState};

/// POST /api/bulk_operations/cavs/search
///
/// Local custom attributes of the requested assessments grouped into
/// columns, plus one summary per requested id. An empty id list yields an
/// empty matrix.
pub async fn cavs_search(
    State(state): State<AppState>,
    Json(request): Json<CavsSearchRequest>,
) -> ApiResult<Json<CavsSearchResponse>> {
    debug!(ids = request.ids.len(), "cavs search");
    let response = aggregator::search(&state.db, &request.ids).await?;
    Ok(Json(response))
}
