//! HTTP-triggered ingestion.
//!
//! Unlike the read endpoints, responses here are the flat `{success, ...}` /
//! `{error}` objects browser capture scripts and supplier push jobs expect.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use supcat_core::JobTrigger;
use supcat_ingest::{adapter_for_payload, IngestError, PayloadFormat};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::AppState;

#[derive(Debug, Deserialize)]
pub(super) struct IngestQuery {
    pub supplier_id: Option<String>,
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct IngestAccepted {
    success: bool,
    count: i32,
    job_id: Uuid,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct IngestFailure {
    error: String,
}

impl IngestFailure {
    fn response(status: StatusCode, error: impl Into<String>) -> Response {
        (
            status,
            Json(Self {
                error: error.into(),
            }),
        )
            .into_response()
    }
}

pub(super) async fn ingest_payload(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<IngestQuery>,
    body: Bytes,
) -> Response {
    let Some(raw_supplier_id) = query.supplier_id.filter(|s| !s.trim().is_empty()) else {
        return IngestFailure::response(StatusCode::BAD_REQUEST, "supplier_id is required");
    };
    let Ok(supplier_id) = Uuid::parse_str(raw_supplier_id.trim()) else {
        return IngestFailure::response(
            StatusCode::BAD_REQUEST,
            format!("supplier_id '{raw_supplier_id}' is not a valid UUID"),
        );
    };
    let format = match query.format.as_deref().map(str::parse::<PayloadFormat>) {
        None => PayloadFormat::default(),
        Some(Ok(format)) => format,
        Some(Err(e)) => return IngestFailure::response(StatusCode::BAD_REQUEST, e.to_string()),
    };
    let Ok(payload) = String::from_utf8(body.to_vec()) else {
        return IngestFailure::response(StatusCode::BAD_REQUEST, "payload is not valid UTF-8");
    };

    tracing::info!(
        request_id = %req_id.0,
        %supplier_id,
        %format,
        bytes = payload.len(),
        "ingest payload received"
    );

    let adapter = adapter_for_payload(supplier_id, format, payload);
    match state
        .runner
        .run(supplier_id, JobTrigger::Http, adapter.as_ref())
        .await
    {
        Ok(report) => Json(IngestAccepted {
            success: true,
            count: report.summary.items_upserted,
            job_id: report.job_id,
            warnings: report.summary.warnings,
        })
        .into_response(),
        Err(e) => {
            log_failure(&req_id, supplier_id, &e);
            IngestFailure::response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn log_failure(req_id: &RequestId, supplier_id: Uuid, error: &IngestError) {
    tracing::error!(
        request_id = %req_id.0,
        %supplier_id,
        error = %error,
        "http ingest failed"
    );
}

/// Bare `OPTIONS` without CORS request headers still gets the permissive
/// answer browsers would.
pub(super) async fn ingest_preflight() -> impl IntoResponse {
    (
        StatusCode::OK,
        [
            (
                header::ACCESS_CONTROL_ALLOW_ORIGIN,
                HeaderValue::from_static("*"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_METHODS,
                HeaderValue::from_static("POST, OPTIONS"),
            ),
            (
                header::ACCESS_CONTROL_ALLOW_HEADERS,
                HeaderValue::from_static("content-type, authorization, x-request-id"),
            ),
        ],
    )
}
