// Error -> HTTP status mapping. Body is always {"error": "..."}.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::orchestrator::RunError;
use crate::topology::TopologyError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(anyhow::Error),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        if let Some(topology) = e.downcast_ref::<TopologyError>() {
            return ApiError::BadRequest(topology.to_string());
        }
        if let Some(sqlx::Error::Database(db)) = e.downcast_ref::<sqlx::Error>()
            && db.is_unique_violation()
        {
            return ApiError::Conflict("already exists".into());
        }
        ApiError::Internal(e)
    }
}

impl From<TopologyError> for ApiError {
    fn from(e: TopologyError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<RunError> for ApiError {
    fn from(e: RunError) -> Self {
        match e {
            RunError::SiteNotFound(id) => ApiError::NotFound(format!("site {} not found", id)),
            RunError::Topology(e) => ApiError::from(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m),
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Conflict(m) => (StatusCode::CONFLICT, m),
            ApiError::Internal(e) => {
                tracing::warn!(error = %e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
