// POST /api/inventory/refresh: re-import the configured inventory file

use axum::Json;
use axum::extract::State;

use super::{AppState, ApiError};
use crate::inventory::{ApplySummary, import_file};

pub(super) async fn refresh(
    State(state): State<AppState>,
) -> Result<Json<ApplySummary>, ApiError> {
    let path = state
        .inventory_path
        .as_deref()
        .ok_or_else(|| ApiError::BadRequest("inventory.path is not configured".into()))?;
    Ok(Json(import_file(&state.store, path).await?))
}
