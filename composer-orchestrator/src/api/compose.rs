//! Compose API Handlers
//!
//! HTTP endpoints for submitting composes and following them.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use composer_core::dto::compose::{ComposeId, ComposeRequest};
use composer_core::dto::status::{ComposeLogs, ComposeManifests, ComposeMetadata, ComposeStatus};
use uuid::Uuid;

use crate::api::AppState;
use crate::api::channel::TenantChannel;
use crate::api::error::ApiResult;
use crate::service::error::ComposerError;
use crate::service::{compose, logs, metadata, status};

/// POST /compose
pub async fn post_compose(
    State(state): State<AppState>,
    channel: TenantChannel,
    body: Result<Json<ComposeRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ComposeId>)> {
    let Json(request) = body.map_err(|e| ComposerError::BodyDecoding(e.body_text()))?;
    tracing::info!("Compose requested for {}", request.distribution);

    let id = compose::submit_compose(&state.workers, &state.config, request, channel.as_str())
        .await?;

    Ok((StatusCode::CREATED, Json(id)))
}

/// GET /composes/{id}
pub async fn get_compose_status(
    State(state): State<AppState>,
    channel: TenantChannel,
    Path(id): Path<String>,
) -> ApiResult<Json<ComposeStatus>> {
    tracing::debug!("Getting compose status: {}", id);

    let id = parse_id(&id)?;
    let status = status::get_compose_status(&state.workers, id, channel.as_str()).await?;

    Ok(Json(status))
}

/// GET /composes/{id}/metadata
pub async fn get_compose_metadata(
    State(state): State<AppState>,
    channel: TenantChannel,
    Path(id): Path<String>,
) -> ApiResult<Json<ComposeMetadata>> {
    tracing::debug!("Getting compose metadata: {}", id);

    let id = parse_id(&id)?;
    let metadata = metadata::get_compose_metadata(&state.workers, id, channel.as_str()).await?;

    Ok(Json(metadata))
}

/// GET /composes/{id}/logs
pub async fn get_compose_logs(
    State(state): State<AppState>,
    channel: TenantChannel,
    Path(id): Path<String>,
) -> ApiResult<Json<ComposeLogs>> {
    tracing::debug!("Getting compose logs: {}", id);

    let id = parse_id(&id)?;
    let logs = logs::get_compose_logs(&state.workers, id, channel.as_str()).await?;

    Ok(Json(logs))
}

/// GET /composes/{id}/manifests
pub async fn get_compose_manifests(
    State(state): State<AppState>,
    channel: TenantChannel,
    Path(id): Path<String>,
) -> ApiResult<Json<ComposeManifests>> {
    tracing::debug!("Getting compose manifests: {}", id);

    let id = parse_id(&id)?;
    let manifests = logs::get_compose_manifests(&state.workers, id, channel.as_str()).await?;

    Ok(Json(manifests))
}

pub(crate) fn parse_id(raw: &str) -> Result<Uuid, ComposerError> {
    Uuid::parse_str(raw).map_err(|_| ComposerError::InvalidComposeId(raw.to_string()))
}
