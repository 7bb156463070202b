//! Tenant channel extractor
//!
//! Jobs are scoped to the channel they were submitted on. The channel of a
//! request is read from the `X-Tenant-Channel` header; without one the
//! request sees every job.

use axum::extract::FromRequestParts;
use axum::http::HeaderMap;
use axum::http::request::Parts;
use std::convert::Infallible;

pub const TENANT_CHANNEL_HEADER: &str = "X-Tenant-Channel";

/// Channel of the request, empty when it is not scoped to a tenant
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TenantChannel(pub String);

impl TenantChannel {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<S> FromRequestParts<S> for TenantChannel
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(
            header_string(&parts.headers, TENANT_CHANNEL_HEADER).unwrap_or_default(),
        ))
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
