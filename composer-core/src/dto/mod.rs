//! Data Transfer Objects for the compose API
//!
//! Request and response shapes exchanged between the orchestrator and its
//! clients. Every response carries an [`ObjectReference`] describing itself.

pub mod clone;
pub mod compose;
pub mod error;
pub mod status;
pub mod upload;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix of every route and `href` of the compose API
pub const BASE_PATH: &str = "/api/image-builder-composer/v2";

/// Self-description of an API object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectReference {
    pub href: String,
    pub id: Uuid,
    pub kind: String,
}

impl ObjectReference {
    pub fn new(href: impl Into<String>, id: Uuid, kind: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            id,
            kind: kind.into(),
        }
    }
}
