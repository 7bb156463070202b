//! Clone API Handlers
//!
//! HTTP endpoints for delivering built images to more regions and accounts.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use composer_core::dto::clone::{AwsEc2CloneCompose, CloneComposeResponse, CloneStatus};

use crate::api::AppState;
use crate::api::channel::TenantChannel;
use crate::api::compose::parse_id;
use crate::api::error::ApiResult;
use crate::service::clone;
use crate::service::error::ComposerError;

/// POST /composes/{id}/clone
pub async fn post_clone_compose(
    State(state): State<AppState>,
    channel: TenantChannel,
    Path(id): Path<String>,
    body: Result<Json<AwsEc2CloneCompose>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<CloneComposeResponse>)> {
    let id = parse_id(&id)?;
    let Json(request) = body.map_err(|e| ComposerError::BodyDecoding(e.body_text()))?;
    tracing::info!("Clone of compose {} to {} requested", id, request.region);

    let response = clone::clone_compose(&state.workers, id, request, channel.as_str()).await?;

    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /clones/{id}
pub async fn get_clone_status(
    State(state): State<AppState>,
    channel: TenantChannel,
    Path(id): Path<String>,
) -> ApiResult<Json<CloneStatus>> {
    tracing::debug!("Getting clone status: {}", id);

    let id = parse_id(&id)?;
    let status = clone::get_clone_status(&state.workers, id, channel.as_str()).await?;

    Ok(Json(status))
}
