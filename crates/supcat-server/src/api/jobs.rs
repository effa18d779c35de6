use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use supcat_core::IngestJob;
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Deserialize)]
pub(super) struct IngestJobsQuery {
    pub supplier_id: Option<String>,
    pub limit: Option<i64>,
}

/// Most recent jobs first, optionally for one supplier.
pub(super) async fn list_ingest_jobs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<IngestJobsQuery>,
) -> Result<Json<ApiResponse<Vec<IngestJob>>>, ApiError> {
    let supplier_id = match query.supplier_id.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(raw) => Some(Uuid::parse_str(raw).map_err(|_| {
            ApiError::new(
                req_id.0.clone(),
                "bad_request",
                format!("supplier_id '{raw}' is not a valid UUID"),
            )
        })?),
    };

    let data = state
        .runner
        .store()
        .list_jobs(supplier_id, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_ingest_job(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<IngestJob>>, ApiError> {
    let job = state
        .runner
        .store()
        .get_job(job_id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| {
            ApiError::new(
                req_id.0.clone(),
                "not_found",
                format!("ingest job {job_id} not found"),
            )
        })?;

    Ok(Json(ApiResponse {
        data: job,
        meta: ResponseMeta::new(req_id.0),
    }))
}
