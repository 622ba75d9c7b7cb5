// POST /execute/ping/{site_id}, POST /execute/diagnose/{site_id}

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use super::{AppState, ApiError};
use crate::diagnosis::{Diagnosis, diagnose};
use crate::models::SiteReport;
use crate::orchestrator::RunError;

pub(super) async fn ping_site(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> Result<Json<SiteReport>, ApiError> {
    let report = state
        .orchestrator
        .run_site_by_id(state.store.as_ref(), site_id)
        .await?;
    Ok(Json(report))
}

#[derive(Serialize)]
pub(super) struct DiagnoseResponse {
    #[serde(flatten)]
    report: SiteReport,
    diagnosis: Diagnosis,
}

pub(super) async fn diagnose_site(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> Result<Json<DiagnoseResponse>, ApiError> {
    let site = state
        .store
        .get_site(site_id)
        .await?
        .ok_or(RunError::SiteNotFound(site_id))?;
    let report = state.orchestrator.run_site(&site).await;
    let diagnosis = diagnose(&site, &report);
    tracing::info!(site_id, verdict = ?diagnosis.verdict, "site diagnosed");
    Ok(Json(DiagnoseResponse { report, diagnosis }))
}
