// Topology endpoints. Addresses are validated in the store; gateways are derived, never accepted.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AppState, ApiError};
use crate::models::{ProbeMetric, Site, SiteType};
use crate::store::NewSite;
use crate::topology::derive_gateway_str;

const DEFAULT_RESULTS_LIMIT: u32 = 100;
const MAX_RESULTS_LIMIT: u32 = 1000;

#[derive(Deserialize)]
pub(super) struct CreateSiteRequest {
    name: String,
    site_type: String,
    location: Option<String>,
    description: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct AddressRequest {
    address: String,
}

#[derive(Deserialize)]
pub(super) struct ResultsQuery {
    limit: Option<u32>,
}

pub(super) async fn list_sites(State(state): State<AppState>) -> Result<Json<Vec<Site>>, ApiError> {
    Ok(Json(state.store.list_sites().await?))
}

pub(super) async fn create_site(
    State(state): State<AppState>,
    Json(req): Json<CreateSiteRequest>,
) -> Result<(StatusCode, Json<Site>), ApiError> {
    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("name must be non-empty".into()));
    }
    let site_type = SiteType::from_tag(&req.site_type).ok_or_else(|| {
        ApiError::BadRequest(format!("site_type must be BTS or POP, got {:?}", req.site_type))
    })?;
    let id = state
        .store
        .create_site(&NewSite {
            name: name.to_string(),
            site_type,
            location: req.location,
            description: req.description,
        })
        .await?;
    let site = state
        .store
        .get_site(id)
        .await?
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("site {} vanished after insert", id)))?;
    Ok((StatusCode::CREATED, Json(site)))
}

pub(super) async fn get_site(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> Result<Json<Site>, ApiError> {
    state
        .store
        .get_site(site_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("site {} not found", site_id)))
}

pub(super) async fn delete_site(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete_site(site_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!("site {} not found", site_id)))
    }
}

pub(super) async fn add_base(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
    Json(req): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let gateway = derive_gateway_str(&req.address)?;
    let id = state
        .store
        .add_base_address(site_id, &req.address)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("site {} not found", site_id)))?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "id": id, "address": req.address, "gateway": gateway })),
    ))
}

pub(super) async fn add_client(
    State(state): State<AppState>,
    Path(base_id): Path<i64>,
    Json(req): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = state
        .store
        .add_client_address(base_id, &req.address)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("base address {} not found", base_id)))?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "address": req.address }))))
}

pub(super) async fn add_loopback(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
    Json(req): Json<AddressRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let id = state
        .store
        .add_loopback_address(site_id, &req.address)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("site {} not found", site_id)))?;
    Ok((StatusCode::CREATED, Json(json!({ "id": id, "address": req.address }))))
}

pub(super) async fn recent_results(
    State(state): State<AppState>,
    Path(site_id): Path<i64>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<Vec<ProbeMetric>>, ApiError> {
    if state.store.get_site(site_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("site {} not found", site_id)));
    }
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RESULTS_LIMIT)
        .clamp(1, MAX_RESULTS_LIMIT);
    Ok(Json(state.store.get_recent_results(site_id, limit).await?))
}
